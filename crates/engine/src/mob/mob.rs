use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;

use crate::content::StatusType;
use crate::fsm::MobFsm;
use crate::geometry::Vec2;
use crate::script::{EventPayload, MobEventType, QueuedEvent, ScriptVars};

use super::category::CategoryState;
use super::mob_type::{AnimationDef, MobType};
use super::team::MobTeam;

/// Distance at which a chase counts as arrived.
pub const CHASE_ARRIVAL_DISTANCE: f32 = 3.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MobId(pub u64);

impl fmt::Display for MobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Hands out mob ids. Ids are never reused within a session.
#[derive(Debug, Default)]
pub struct MobIdAllocator {
    next: u64,
}

impl MobIdAllocator {
    pub fn allocate(&mut self) -> MobId {
        let id = MobId(self.next);
        self.next = self.next.saturating_add(1);
        id
    }
}

/// Countdown driving the `on_timer` event.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ScriptTimer {
    pub duration: f32,
    pub time_left: f32,
}

impl ScriptTimer {
    pub fn start(&mut self, duration: f32) {
        self.duration = duration.max(0.0);
        self.time_left = self.duration;
    }

    pub fn stop(&mut self) {
        self.time_left = 0.0;
    }

    pub fn is_running(&self) -> bool {
        self.time_left > 0.0
    }

    /// Returns true on the tick the timer runs out.
    pub fn tick(&mut self, dt: f32) -> bool {
        if self.time_left <= 0.0 {
            return false;
        }
        self.time_left -= dt;
        if self.time_left <= 0.0 {
            self.time_left = 0.0;
            return true;
        }
        false
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ChaseTarget {
    Position(Vec2),
    /// Follows another mob's position plus an offset, re-read every tick.
    Mob { id: MobId, offset: Vec2 },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChaseInfo {
    pub target: ChaseTarget,
    pub speed: f32,
    pub arrival_distance: f32,
    pub reached: bool,
}

/// Waypoints produced by the pathfinder; chased one at a time.
#[derive(Debug, Clone, PartialEq)]
pub struct PathInfo {
    pub waypoints: Vec<Vec2>,
    pub next: usize,
}

impl PathInfo {
    pub fn current(&self) -> Option<Vec2> {
        self.waypoints.get(self.next).copied()
    }

    pub fn is_last(&self) -> bool {
        self.next + 1 >= self.waypoints.len()
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CarryInfo {
    pub carriers: Vec<MobId>,
    /// Onion (or other receiver) the object is heading to.
    pub destination: Option<MobId>,
    pub is_moving: bool,
    pub stuck: bool,
}

#[derive(Debug, Clone)]
pub struct MobStatus {
    pub status_type: Arc<StatusType>,
    /// None lasts until removed.
    pub time_left: Option<f32>,
    pub from_hazard: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParticleGenerator {
    pub name: String,
    pub offset: [f32; 3],
    pub time_left: Option<f32>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct AnimationInstance {
    pub index: Option<usize>,
    pub elapsed: f32,
    pub finished: bool,
}

#[derive(Debug, Clone)]
pub struct Mob {
    pub id: MobId,
    pub mob_type: Arc<MobType>,
    pub pos: Vec2,
    pub z: f32,
    pub angle: f32,
    pub intended_turn_angle: f32,
    pub speed: Vec2,
    pub speed_z: f32,
    pub gravity_mult: f32,
    pub radius: f32,
    pub height: f32,
    pub health: f32,
    pub max_health: f32,
    pub team: MobTeam,
    pub home: Vec2,
    pub far_reach: Option<usize>,
    pub near_reach: Option<usize>,

    pub fsm: MobFsm,
    pub script_timer: ScriptTimer,
    pub vars: ScriptVars,
    pub focused_mob: Option<MobId>,

    pub chase: Option<ChaseInfo>,
    pub path: Option<PathInfo>,
    pub carry: Option<CarryInfo>,

    pub links: Vec<MobId>,
    pub parent: Option<MobId>,
    pub holder: Option<MobId>,
    pub holding: Vec<MobId>,
    pub chomp_body_parts: Vec<String>,
    pub chomping: Vec<MobId>,
    pub chomp_max: usize,
    pub following_group: Option<MobId>,
    pub group: Vec<MobId>,
    /// Mobs overlapping this one last tick, for touch events on contact start.
    pub touching: Vec<MobId>,

    pub statuses: Vec<MobStatus>,
    pub particle_generators: Vec<ParticleGenerator>,
    pub animation: AnimationInstance,
    pub limb_animation: Option<String>,

    pub hiding: bool,
    pub tangible: bool,
    pub height_effect: bool,
    pub holdable_by_pikmin: bool,
    pub holdable_by_enemies: bool,
    pub dead: bool,
    pub to_delete: bool,

    pub invuln_time_left: f32,
    pub itch_damage: f32,
    pub itch_time: f32,
    pub time_alive: f32,
    pub category_state: CategoryState,
    pub events: VecDeque<QueuedEvent>,
}

impl Mob {
    pub fn new(id: MobId, mob_type: Arc<MobType>, pos: Vec2, angle: f32) -> Self {
        let carry = mob_type.is_carriable().then(CarryInfo::default);
        Self {
            id,
            pos,
            z: 0.0,
            angle,
            intended_turn_angle: angle,
            speed: Vec2::ZERO,
            speed_z: 0.0,
            gravity_mult: 1.0,
            radius: mob_type.radius,
            height: mob_type.height,
            health: mob_type.max_health,
            max_health: mob_type.max_health,
            team: mob_type.team,
            home: pos,
            far_reach: None,
            near_reach: None,
            fsm: MobFsm::default(),
            script_timer: ScriptTimer::default(),
            vars: ScriptVars::default(),
            focused_mob: None,
            chase: None,
            path: None,
            carry,
            links: Vec::new(),
            parent: None,
            holder: None,
            holding: Vec::new(),
            chomp_body_parts: Vec::new(),
            chomping: Vec::new(),
            chomp_max: 0,
            following_group: None,
            group: Vec::new(),
            touching: Vec::new(),
            statuses: Vec::new(),
            particle_generators: Vec::new(),
            animation: AnimationInstance::default(),
            limb_animation: None,
            hiding: false,
            tangible: true,
            height_effect: false,
            holdable_by_pikmin: false,
            holdable_by_enemies: false,
            dead: false,
            to_delete: false,
            invuln_time_left: 0.0,
            itch_damage: 0.0,
            itch_time: 0.0,
            time_alive: 0.0,
            category_state: CategoryState::initial(&mob_type.properties),
            events: VecDeque::new(),
            mob_type,
        }
    }

    pub fn is_alive(&self) -> bool {
        !self.dead && self.health > 0.0
    }

    pub fn set_health(&mut self, value: f32) {
        self.health = value.clamp(0.0, self.max_health);
    }

    pub fn add_health(&mut self, delta: f32) {
        self.set_health(self.health + delta);
    }

    pub fn queue_event(&mut self, event: MobEventType) {
        self.events.push_back(QueuedEvent::new(event));
    }

    pub fn queue_event_with(&mut self, event: MobEventType, payload: EventPayload) {
        self.events.push_back(QueuedEvent::with_payload(event, payload));
    }

    /// Horizontal speed after status multipliers.
    pub fn move_speed(&self) -> f32 {
        self.mob_type.move_speed * self.speed_multiplier()
    }

    pub fn speed_multiplier(&self) -> f32 {
        self.statuses
            .iter()
            .map(|status| status.status_type.speed_multiplier)
            .product()
    }

    pub fn chase_position(&mut self, target: Vec2, speed: f32) {
        self.path = None;
        self.chase = Some(ChaseInfo {
            target: ChaseTarget::Position(target),
            speed,
            arrival_distance: CHASE_ARRIVAL_DISTANCE,
            reached: false,
        });
    }

    pub fn chase_mob(&mut self, id: MobId, offset: Vec2, speed: f32) {
        self.path = None;
        self.chase = Some(ChaseInfo {
            target: ChaseTarget::Mob { id, offset },
            speed,
            arrival_distance: CHASE_ARRIVAL_DISTANCE,
            reached: false,
        });
    }

    /// Walks a waypoint list; `ReachedDestination` fires after the last one.
    pub fn follow_path(&mut self, waypoints: Vec<Vec2>, speed: f32) {
        let Some(first) = waypoints.first().copied() else {
            self.stop_chasing();
            return;
        };
        self.chase_position(first, speed);
        self.path = Some(PathInfo { waypoints, next: 0 });
    }

    pub fn stop_chasing(&mut self) {
        self.chase = None;
        self.path = None;
        self.speed = Vec2::ZERO;
    }

    pub fn face(&mut self, angle: f32) {
        self.intended_turn_angle = crate::geometry::normalize_angle(angle);
    }

    pub fn animation(&self) -> Option<&AnimationDef> {
        self.animation
            .index
            .and_then(|index| self.mob_type.animations.get(index))
    }

    pub fn set_animation(&mut self, index: usize, restart: bool, start_time: f32) {
        if !restart && self.animation.index == Some(index) {
            return;
        }
        self.animation = AnimationInstance {
            index: Some(index),
            elapsed: start_time,
            finished: false,
        };
    }

    pub fn has_status(&self, name: &str) -> bool {
        self.statuses
            .iter()
            .any(|status| status.status_type.name == name)
    }

    /// Applies or refreshes a status effect.
    pub fn apply_status(&mut self, status_type: Arc<StatusType>, from_hazard: bool) {
        let time_left = (status_type.duration > 0.0).then_some(status_type.duration);
        if let Some(existing) = self
            .statuses
            .iter_mut()
            .find(|status| status.status_type.name == status_type.name)
        {
            existing.time_left = time_left;
            existing.from_hazard = from_hazard;
            return;
        }
        if let Some(generator) = &status_type.particle_generator {
            self.particle_generators.push(ParticleGenerator {
                name: generator.clone(),
                offset: [0.0; 3],
                time_left,
            });
        }
        if status_type.turns_invisible {
            self.hiding = true;
        }
        self.statuses.push(MobStatus {
            status_type,
            time_left,
            from_hazard,
        });
    }

    pub fn remove_status(&mut self, name: &str) -> bool {
        let before = self.statuses.len();
        self.statuses
            .retain(|status| status.status_type.name != name);
        before != self.statuses.len()
    }

    pub fn is_held(&self) -> bool {
        self.holder.is_some()
    }
}
