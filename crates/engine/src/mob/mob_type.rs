use std::f32::consts::PI;

use crate::fsm::FsmDefinition;
use crate::geometry::Vec2;

use super::category::{CategoryProperties, MobCategory};
use super::team::MobTeam;

/// Named two-zone reach. An object is in reach when it is inside either zone.
#[derive(Debug, Clone, PartialEq)]
pub struct MobReach {
    pub name: String,
    pub radius_1: f32,
    /// Full cone width in radians.
    pub angle_1: f32,
    pub radius_2: f32,
    pub angle_2: f32,
}

impl MobReach {
    pub fn contains(&self, facing: f32, distance: f32, angle_to_target: f32) -> bool {
        let deviation = crate::geometry::angle_difference(facing, angle_to_target).abs();
        let in_zone = |radius: f32, angle: f32| {
            radius > 0.0 && distance <= radius && deviation <= angle / 2.0
        };
        in_zone(self.radius_1, self.angle_1) || in_zone(self.radius_2, self.angle_2)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FrameSignal {
    pub time: f32,
    pub signal: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AnimationDef {
    pub name: String,
    pub duration: f32,
    pub loops: bool,
    pub signals: Vec<FrameSignal>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SoundDef {
    pub name: String,
    pub sample: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SpawnDef {
    pub name: String,
    /// `<category folder>/<type folder>` of the spawned mob.
    pub mob_type: String,
    pub relative: bool,
    pub coords: Vec2,
    pub z: f32,
    pub angle: f32,
    pub vars: String,
    pub link_object_to_spawn: bool,
    pub link_spawn_to_object: bool,
    pub momentum: f32,
}

/// Immutable template every mob is created from.
#[derive(Debug, Clone)]
pub struct MobType {
    pub internal_name: String,
    pub name: String,
    pub category: MobCategory,
    pub pack: String,
    pub radius: f32,
    pub height: f32,
    pub move_speed: f32,
    /// Radians per second.
    pub rotation_speed: f32,
    pub max_health: f32,
    pub health_regen: f32,
    pub weight: f32,
    pub max_carriers: usize,
    pub pushes: bool,
    pub pushable: bool,
    pub team: MobTeam,
    pub territory_radius: f32,
    pub itch_damage: f32,
    pub itch_time: f32,
    pub always_active: bool,
    pub show_health: bool,
    pub casts_shadow: bool,
    pub reaches: Vec<MobReach>,
    pub animations: Vec<AnimationDef>,
    pub body_parts: Vec<String>,
    pub sounds: Vec<SoundDef>,
    pub spawns: Vec<SpawnDef>,
    pub resistances: Vec<String>,
    pub properties: CategoryProperties,
    pub fsm: FsmDefinition,
}

impl MobType {
    /// Type with default stats and no states, filled in by the loader.
    pub fn blank(internal_name: &str, category: MobCategory) -> Self {
        Self {
            internal_name: internal_name.to_string(),
            name: internal_name
                .rsplit('/')
                .next()
                .unwrap_or(internal_name)
                .to_string(),
            category,
            pack: String::new(),
            radius: 16.0,
            height: 16.0,
            move_speed: 100.0,
            rotation_speed: PI,
            max_health: 100.0,
            health_regen: 0.0,
            weight: 1.0,
            max_carriers: 0,
            pushes: false,
            pushable: false,
            team: MobTeam::None,
            territory_radius: 0.0,
            itch_damage: 0.0,
            itch_time: 0.0,
            always_active: false,
            show_health: true,
            casts_shadow: true,
            reaches: Vec::new(),
            animations: Vec::new(),
            body_parts: Vec::new(),
            sounds: Vec::new(),
            spawns: Vec::new(),
            resistances: Vec::new(),
            properties: CategoryProperties::defaults_for(category),
            fsm: FsmDefinition::default(),
        }
    }

    pub fn is_carriable(&self) -> bool {
        self.max_carriers > 0
    }

    pub fn animation_index(&self, name: &str) -> Option<usize> {
        self.animations.iter().position(|anim| anim.name == name)
    }

    pub fn resists(&self, hazard: &str) -> bool {
        self.resistances.iter().any(|name| name == hazard)
    }

    pub(crate) fn name_lists(&self) -> MobTypeNames {
        MobTypeNames {
            animations: self.animations.iter().map(|a| a.name.clone()).collect(),
            reaches: self.reaches.iter().map(|r| r.name.clone()).collect(),
            sounds: self.sounds.iter().map(|s| s.name.clone()).collect(),
            spawns: self.spawns.iter().map(|s| s.name.clone()).collect(),
            body_parts: self.body_parts.clone(),
        }
    }
}

/// Owned name lists a script load context borrows from.
#[derive(Debug, Clone, Default)]
pub(crate) struct MobTypeNames {
    pub animations: Vec<String>,
    pub reaches: Vec<String>,
    pub sounds: Vec<String>,
    pub spawns: Vec<String>,
    pub body_parts: Vec<String>,
}
