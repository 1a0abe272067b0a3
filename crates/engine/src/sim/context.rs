use std::collections::BTreeMap;
use std::sync::Arc;

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use crate::content::ContentManager;
use crate::geometry::Vec2;
use crate::mob::{Mob, MobCategory, MobId, MobType};
use crate::script::{EventPayload, MobEventType, QueuedEvent, ScriptVars};
use crate::world::WorldGeometry;

/// Seeded generator behind every random script action.
#[derive(Debug, Clone)]
pub struct SimRng(SmallRng);

impl SimRng {
    pub fn new(seed: u64) -> Self {
        Self(SmallRng::seed_from_u64(seed))
    }

    /// Inclusive on both ends; swapped bounds are put in order. A non-finite
    /// bound collapses the range onto the other one, and spans wider than
    /// `f32::MAX` are drawn at half scale.
    pub fn range_f32(&mut self, min: f32, max: f32) -> f32 {
        let (min, max) = match (min.is_finite(), max.is_finite()) {
            (true, true) => (min, max),
            (true, false) => return min,
            (false, true) => return max,
            (false, false) => return 0.0,
        };
        let (low, high) = if min <= max { (min, max) } else { (max, min) };
        if low == high {
            return low;
        }
        if !(high - low).is_finite() {
            return self.0.gen_range(low / 2.0..=high / 2.0) * 2.0;
        }
        self.0.gen_range(low..=high)
    }

    pub fn range_i32(&mut self, min: i32, max: i32) -> i32 {
        let (low, high) = if min <= max { (min, max) } else { (max, min) };
        self.0.gen_range(low..=high)
    }
}

/// Sound an audio backend should start, drained once per frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SoundCue {
    pub mob: MobId,
    pub sound_index: usize,
    pub sample: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HudMessage {
    pub mob: MobId,
    pub text: String,
}

/// Mob creation asked for by a script, applied right after the acting mob.
#[derive(Debug, Clone)]
pub struct SpawnRequest {
    pub mob_type: Arc<MobType>,
    pub pos: Vec2,
    pub z: f32,
    pub angle: f32,
    pub vars: ScriptVars,
    pub parent: Option<MobId>,
    pub link_parent_to_child: bool,
    pub link_child_to_parent: bool,
    pub momentum: f32,
    /// Direction the momentum throws the mob in. Random when unset.
    pub launch_angle: Option<f32>,
}

impl SpawnRequest {
    /// Parentless spawn on the ground with no variables.
    pub fn new(mob_type: Arc<MobType>, pos: Vec2, angle: f32) -> Self {
        Self {
            mob_type,
            pos,
            z: 0.0,
            angle,
            vars: ScriptVars::default(),
            parent: None,
            link_parent_to_child: false,
            link_child_to_parent: false,
            momentum: 0.0,
            launch_angle: None,
        }
    }
}

/// An object that reached its carry destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Delivery {
    pub object: MobId,
    pub category: MobCategory,
    pub points: u32,
}

/// Tallies raised during a tick, drained by the mission tracker after it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SimStats {
    pub pikmin_born: u32,
    pub deliveries: Vec<Delivery>,
}

/// Live mobs keyed by id. The mob currently ticking is taken out while it runs.
#[derive(Debug, Default)]
pub struct MobStore {
    mobs: BTreeMap<MobId, Mob>,
}

impl MobStore {
    pub fn get(&self, id: MobId) -> Option<&Mob> {
        self.mobs.get(&id)
    }

    pub fn get_mut(&mut self, id: MobId) -> Option<&mut Mob> {
        self.mobs.get_mut(&id)
    }

    pub fn contains(&self, id: MobId) -> bool {
        self.mobs.contains_key(&id)
    }

    pub fn insert(&mut self, mob: Mob) {
        self.mobs.insert(mob.id, mob);
    }

    pub fn remove(&mut self, id: MobId) -> Option<Mob> {
        self.mobs.remove(&id)
    }

    pub fn ids(&self) -> Vec<MobId> {
        self.mobs.keys().copied().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Mob> {
        self.mobs.values()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Mob> {
        self.mobs.values_mut()
    }

    pub fn len(&self) -> usize {
        self.mobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mobs.is_empty()
    }

    pub(crate) fn retain(&mut self, keep: impl FnMut(&MobId, &mut Mob) -> bool) {
        self.mobs.retain(keep);
    }

    pub fn clear(&mut self) {
        self.mobs.clear();
    }
}

/// Per-session services scripts may use besides mob state.
#[derive(Debug)]
pub struct SimServices {
    pub rng: SimRng,
    pub sound_cues: Vec<SoundCue>,
    pub hud_messages: Vec<HudMessage>,
    pub spawn_requests: Vec<SpawnRequest>,
    /// Events for mobs that were out of the store when sent.
    pub deferred_events: Vec<(MobId, QueuedEvent)>,
    pub stats: SimStats,
    pub day_minutes: f32,
    pub day_speed: f32,
    pub frame: u64,
}

impl SimServices {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: SimRng::new(seed),
            sound_cues: Vec::new(),
            hud_messages: Vec::new(),
            spawn_requests: Vec::new(),
            deferred_events: Vec::new(),
            stats: SimStats::default(),
            day_minutes: 0.0,
            day_speed: 0.0,
            frame: 0,
        }
    }
}

/// What an action may touch beyond its own mob.
pub struct ScriptContext<'w> {
    pub mobs: &'w mut MobStore,
    pub geometry: &'w dyn WorldGeometry,
    pub services: &'w mut SimServices,
    pub content: &'w ContentManager,
}

impl<'w> ScriptContext<'w> {
    /// Queues an event on another mob. Events for mobs out of the store are
    /// held until that mob is put back.
    pub fn send_event(&mut self, target: MobId, event: MobEventType, payload: EventPayload) {
        match self.mobs.get_mut(target) {
            Some(mob) => mob.queue_event_with(event, payload),
            None => self
                .services
                .deferred_events
                .push((target, QueuedEvent::with_payload(event, payload))),
        }
    }

    pub fn mob_exists(&self, id: MobId) -> bool {
        self.mobs.contains(id)
    }
}
