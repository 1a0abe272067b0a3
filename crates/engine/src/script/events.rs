use crate::mob::MobId;

/// Semantic events a mob's FSM can bind actions to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MobEventType {
    OnEnter,
    OnLeave,
    OnTick,
    OnReady,
    AnimationEnd,
    Damage,
    Death,
    FocusOffReach,
    FrameSignal,
    Itch,
    Landed,
    ObjectInReach,
    OpponentInReach,
    ReachedDestination,
    ReceiveMessage,
    Released,
    Swallowed,
    Timer,
    TouchObject,
    TouchOpponent,
    TouchWall,
    FinishReceivingDelivery,
    CarrierAdded,
    CarrierRemoved,
    CarryBeginMove,
    CarryStopMove,
    CarryKeepGoing,
    CarryWaitUp,
    CarryDelivered,
}

impl MobEventType {
    pub const ALL: [MobEventType; 29] = [
        MobEventType::OnEnter,
        MobEventType::OnLeave,
        MobEventType::OnTick,
        MobEventType::OnReady,
        MobEventType::AnimationEnd,
        MobEventType::Damage,
        MobEventType::Death,
        MobEventType::FocusOffReach,
        MobEventType::FrameSignal,
        MobEventType::Itch,
        MobEventType::Landed,
        MobEventType::ObjectInReach,
        MobEventType::OpponentInReach,
        MobEventType::ReachedDestination,
        MobEventType::ReceiveMessage,
        MobEventType::Released,
        MobEventType::Swallowed,
        MobEventType::Timer,
        MobEventType::TouchObject,
        MobEventType::TouchOpponent,
        MobEventType::TouchWall,
        MobEventType::FinishReceivingDelivery,
        MobEventType::CarrierAdded,
        MobEventType::CarrierRemoved,
        MobEventType::CarryBeginMove,
        MobEventType::CarryStopMove,
        MobEventType::CarryKeepGoing,
        MobEventType::CarryWaitUp,
        MobEventType::CarryDelivered,
    ];

    /// Name used in script files.
    pub const fn script_name(self) -> &'static str {
        match self {
            MobEventType::OnEnter => "on_enter",
            MobEventType::OnLeave => "on_leave",
            MobEventType::OnTick => "on_tick",
            MobEventType::OnReady => "on_ready",
            MobEventType::AnimationEnd => "on_animation_end",
            MobEventType::Damage => "on_damage",
            MobEventType::Death => "on_death",
            MobEventType::FocusOffReach => "on_focus_off_reach",
            MobEventType::FrameSignal => "on_frame_signal",
            MobEventType::Itch => "on_itch",
            MobEventType::Landed => "on_land",
            MobEventType::ObjectInReach => "on_object_in_reach",
            MobEventType::OpponentInReach => "on_opponent_in_reach",
            MobEventType::ReachedDestination => "on_reach_destination",
            MobEventType::ReceiveMessage => "on_receive_message",
            MobEventType::Released => "on_released",
            MobEventType::Swallowed => "on_swallowed",
            MobEventType::Timer => "on_timer",
            MobEventType::TouchObject => "on_touch_object",
            MobEventType::TouchOpponent => "on_touch_opponent",
            MobEventType::TouchWall => "on_touch_wall",
            MobEventType::FinishReceivingDelivery => "on_finish_receiving_delivery",
            MobEventType::CarrierAdded => "on_carrier_added",
            MobEventType::CarrierRemoved => "on_carrier_removed",
            MobEventType::CarryBeginMove => "on_carry_begin_move",
            MobEventType::CarryStopMove => "on_carry_stop_move",
            MobEventType::CarryKeepGoing => "on_carry_keep_going",
            MobEventType::CarryWaitUp => "on_carry_wait_up",
            MobEventType::CarryDelivered => "on_carry_delivered",
        }
    }

    pub fn from_script_name(name: &str) -> Option<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|event| event.script_name() == name)
    }
}

/// Side-channel data delivered with an event.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EventPayload {
    /// Mob that caused the event: attacker, message sender, touched mob, carrier.
    pub other: Option<MobId>,
    pub message: Option<String>,
    pub signal: Option<u32>,
    pub body_part: Option<String>,
    pub other_body_part: Option<String>,
    pub amount: f32,
}

impl EventPayload {
    pub fn from_mob(other: MobId) -> Self {
        Self {
            other: Some(other),
            ..Self::default()
        }
    }

    pub fn message(sender: MobId, message: &str) -> Self {
        Self {
            other: Some(sender),
            message: Some(message.to_string()),
            ..Self::default()
        }
    }

    pub fn signal(signal: u32) -> Self {
        Self {
            signal: Some(signal),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct QueuedEvent {
    pub event: MobEventType,
    pub payload: EventPayload,
}

impl QueuedEvent {
    pub fn new(event: MobEventType) -> Self {
        Self {
            event,
            payload: EventPayload::default(),
        }
    }

    pub fn with_payload(event: MobEventType, payload: EventPayload) -> Self {
        Self { event, payload }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn script_names_are_unique_and_round_trip() {
        for event in MobEventType::ALL {
            assert_eq!(
                MobEventType::from_script_name(event.script_name()),
                Some(event)
            );
        }
        assert_eq!(MobEventType::from_script_name("on_nap"), None);
    }
}
