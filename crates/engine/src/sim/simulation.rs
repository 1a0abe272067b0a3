use std::mem;

use thiserror::Error;
use tracing::{info, warn};

use crate::content::ContentManager;
use crate::geometry::Vec2;
use crate::mob::{Mob, MobCategory, MobId};
use crate::script::{EventPayload, MobEventType, ScriptVars};
use crate::world::AreaGeometry;

use super::context::{HudMessage, MobStore, SimServices, SoundCue, SpawnRequest};
use super::mission::{MissionResult, MissionStatus, MissionTracker};
use super::registry::MobRegistry;

#[derive(Debug, Error, PartialEq)]
pub enum SimulationError {
    #[error("no area is loaded")]
    NoArea,
    #[error("area '{0}' is not loaded")]
    UnknownArea(String),
    #[error("area '{0}' was loaded without its contents")]
    AreaNotFullyLoaded(String),
    #[error("mob type '{0}' is not loaded")]
    UnknownMobType(String),
    #[error("mob {0} does not exist")]
    UnknownMob(MobId),
    #[error("area '{0}' has no mission")]
    NoMission(String),
}

/// Live state of the area being played.
#[derive(Debug)]
pub struct AreaSession {
    pub area_name: String,
    pub geometry: AreaGeometry,
    pub registry: MobRegistry,
    pub services: SimServices,
    pub mission: Option<MissionTracker>,
}

/// Owns the loaded content and the current area session. Scripts see both
/// through a [`super::ScriptContext`] built per mob tick.
#[derive(Debug)]
pub struct Simulation {
    content: ContentManager,
    session: Option<AreaSession>,
    seed: u64,
}

impl Simulation {
    pub fn new(content: ContentManager, seed: u64) -> Self {
        Self {
            content,
            session: None,
            seed,
        }
    }

    pub fn content(&self) -> &ContentManager {
        &self.content
    }

    /// Content can only change while no area is running.
    pub fn content_mut(&mut self) -> Option<&mut ContentManager> {
        if self.session.is_some() {
            return None;
        }
        Some(&mut self.content)
    }

    pub fn into_content(self) -> ContentManager {
        self.content
    }

    pub fn session(&self) -> Option<&AreaSession> {
        self.session.as_ref()
    }

    /// Builds the area's geometry and places its mobs. Mobs whose type is not
    /// loaded are skipped with a warning.
    pub fn start_area(&mut self, area_name: &str) -> Result<(), SimulationError> {
        let area = self
            .content
            .area(area_name)
            .ok_or_else(|| SimulationError::UnknownArea(area_name.to_string()))?;
        let geometry = area
            .geometry
            .clone()
            .ok_or_else(|| SimulationError::AreaNotFullyLoaded(area_name.to_string()))?;

        let mut services = SimServices::new(self.seed);
        services.day_minutes = area.day_start_minutes;
        services.day_speed = area.day_speed;
        let mut registry = MobRegistry::new();
        let mut placed = Vec::with_capacity(area.mobs.len());

        for placement in &area.mobs {
            let Some(mob_type) = self.content.mob_types().find(&placement.mob_type) else {
                warn!(
                    area = %area.name,
                    mob_type = %placement.mob_type,
                    "area_mob_type_missing"
                );
                placed.push(None);
                continue;
            };
            let mut request = SpawnRequest::new(mob_type.clone(), placement.pos, placement.angle);
            request.vars = ScriptVars::parse_assignments(&placement.vars);
            request.z = crate::world::WorldGeometry::ground_z_at(&geometry, placement.pos);
            placed.push(Some(registry.spawn(
                request,
                &geometry,
                &mut services,
                &self.content,
            )));
        }
        let mission = area.mission.clone().map(|mission| {
            info!(area = %area.name, goal = mission.goal.name(), "mission_started");
            MissionTracker::new(mission, &placed, registry.mobs())
        });

        info!(
            area = %area.name,
            pack = %area.pack,
            mobs = registry.len(),
            "area_started"
        );
        self.session = Some(AreaSession {
            area_name: area.name.clone(),
            geometry,
            registry,
            services,
            mission,
        });
        Ok(())
    }

    pub fn end_area(&mut self) {
        if let Some(session) = self.session.take() {
            info!(area = %session.area_name, "area_ended");
        }
    }

    pub fn spawn_mob(
        &mut self,
        type_reference: &str,
        pos: Vec2,
        angle: f32,
        vars: &str,
    ) -> Result<MobId, SimulationError> {
        let session = self.session.as_mut().ok_or(SimulationError::NoArea)?;
        let mob_type = self
            .content
            .mob_types()
            .find(type_reference)
            .ok_or_else(|| SimulationError::UnknownMobType(type_reference.to_string()))?
            .clone();
        let mut request = SpawnRequest::new(mob_type, pos, angle);
        request.vars = ScriptVars::parse_assignments(vars);
        request.z = crate::world::WorldGeometry::ground_z_at(&session.geometry, pos);
        Ok(session.registry.spawn(
            request,
            &session.geometry,
            &mut session.services,
            &self.content,
        ))
    }

    /// Advances one fixed step: every mob ticks once, deleted mobs are swept,
    /// then the mission looks at the result. Returns the ids removed this
    /// frame.
    pub fn tick(&mut self, dt: f32) -> Result<Vec<MobId>, SimulationError> {
        let session = self.session.as_mut().ok_or(SimulationError::NoArea)?;
        session.services.frame += 1;
        session.services.day_minutes += session.services.day_speed * dt / 60.0;
        let removed = session.registry.tick(
            dt,
            &session.geometry,
            &mut session.services,
            &self.content,
        );
        let stats = mem::take(&mut session.services.stats);
        if let Some(mission) = session.mission.as_mut() {
            mission.update(session.registry.mobs(), stats, dt);
        }
        Ok(removed)
    }

    pub fn mission(&self) -> Option<&MissionTracker> {
        self.session.as_ref()?.mission.as_ref()
    }

    pub fn mission_status(&self) -> Option<MissionStatus> {
        self.mission().map(MissionTracker::status)
    }

    pub fn mission_result(&self) -> Option<MissionResult> {
        self.mission().map(MissionTracker::result)
    }

    /// Ends the running mission as the pause menu would.
    pub fn end_mission_from_menu(&mut self) -> Result<MissionStatus, SimulationError> {
        let session = self.session.as_mut().ok_or(SimulationError::NoArea)?;
        let mission = session
            .mission
            .as_mut()
            .ok_or_else(|| SimulationError::NoMission(session.area_name.clone()))?;
        Ok(mission.end_from_menu())
    }

    pub fn mob(&self, id: MobId) -> Option<&Mob> {
        self.session.as_ref()?.registry.get(id)
    }

    pub fn mobs(&self) -> Option<&MobStore> {
        self.session.as_ref().map(|session| session.registry.mobs())
    }

    pub fn mob_count(&self) -> usize {
        self.session
            .as_ref()
            .map_or(0, |session| session.registry.len())
    }

    pub fn frame(&self) -> u64 {
        self.session
            .as_ref()
            .map_or(0, |session| session.services.frame)
    }

    pub fn day_minutes(&self) -> Option<f32> {
        self.session
            .as_ref()
            .map(|session| session.services.day_minutes)
    }

    fn mob_mut(&mut self, id: MobId) -> Result<&mut Mob, SimulationError> {
        self.session
            .as_mut()
            .ok_or(SimulationError::NoArea)?
            .registry
            .get_mut(id)
            .ok_or(SimulationError::UnknownMob(id))
    }

    /// Queues an event from outside the scripts, such as player input.
    pub fn send_event(
        &mut self,
        target: MobId,
        event: MobEventType,
        payload: EventPayload,
    ) -> Result<(), SimulationError> {
        self.mob_mut(target)?.queue_event_with(event, payload);
        Ok(())
    }

    /// Deals damage unless the target is invulnerable, and queues `on_damage`.
    pub fn apply_attack(
        &mut self,
        attacker: MobId,
        target: MobId,
        damage: f32,
    ) -> Result<bool, SimulationError> {
        let mob = self.mob_mut(target)?;
        if mob.invuln_time_left > 0.0 || mob.dead {
            return Ok(false);
        }
        mob.add_health(-damage);
        mob.itch_damage += damage;
        mob.queue_event_with(
            MobEventType::Damage,
            EventPayload {
                amount: damage,
                ..EventPayload::from_mob(attacker)
            },
        );
        Ok(true)
    }

    /// Makes `member` follow `leader`.
    pub fn add_to_group(&mut self, leader: MobId, member: MobId) -> Result<(), SimulationError> {
        if self.mob(member).is_none() {
            return Err(SimulationError::UnknownMob(member));
        }
        let leader_mob = self.mob_mut(leader)?;
        if !leader_mob.group.contains(&member) {
            leader_mob.group.push(member);
        }
        self.mob_mut(member)?.following_group = Some(leader);
        Ok(())
    }

    pub fn remove_from_group(&mut self, member: MobId) -> Result<(), SimulationError> {
        let Some(leader) = self.mob_mut(member)?.following_group.take() else {
            return Ok(());
        };
        if let Ok(leader_mob) = self.mob_mut(leader) {
            leader_mob.group.retain(|id| *id != member);
        }
        Ok(())
    }

    /// Puts a Pikmin on a carriable object. Returns false when the object is
    /// full, not carriable, or the carrier is not a Pikmin.
    pub fn add_carrier(&mut self, object: MobId, carrier: MobId) -> Result<bool, SimulationError> {
        let is_pikmin = self
            .mob(carrier)
            .ok_or(SimulationError::UnknownMob(carrier))?
            .mob_type
            .category
            == MobCategory::Pikmin;
        let mob = self.mob_mut(object)?;
        let max_carriers = mob.mob_type.max_carriers;
        let Some(carry) = mob.carry.as_mut() else {
            return Ok(false);
        };
        if !is_pikmin || carry.carriers.len() >= max_carriers || carry.carriers.contains(&carrier)
        {
            return Ok(false);
        }
        carry.carriers.push(carrier);
        mob.queue_event_with(MobEventType::CarrierAdded, EventPayload::from_mob(carrier));
        Ok(true)
    }

    pub fn remove_carrier(
        &mut self,
        object: MobId,
        carrier: MobId,
    ) -> Result<bool, SimulationError> {
        let mob = self.mob_mut(object)?;
        let Some(carry) = mob.carry.as_mut() else {
            return Ok(false);
        };
        let before = carry.carriers.len();
        carry.carriers.retain(|id| *id != carrier);
        if carry.carriers.len() == before {
            return Ok(false);
        }
        mob.queue_event_with(MobEventType::CarrierRemoved, EventPayload::from_mob(carrier));
        Ok(true)
    }

    /// Sound cues raised since the last drain, in emission order.
    pub fn drain_sound_cues(&mut self) -> Vec<SoundCue> {
        self.session
            .as_mut()
            .map(|session| std::mem::take(&mut session.services.sound_cues))
            .unwrap_or_default()
    }

    pub fn drain_hud_messages(&mut self) -> Vec<HudMessage> {
        self.session
            .as_mut()
            .map(|session| std::mem::take(&mut session.services.hud_messages))
            .unwrap_or_default()
    }
}
