use std::f32::consts::TAU;
use std::sync::Arc;

use tracing::debug;

use crate::content::ContentManager;
use crate::fsm::runtime;
use crate::geometry::Vec2;
use crate::mob::{tick::tick_mob, Mob, MobId, MobIdAllocator};
use crate::world::WorldGeometry;

use super::context::{MobStore, ScriptContext, SimServices, SpawnRequest};

/// Owns every live mob of an area. Ids come from a never-reusing allocator.
/// Deletion is deferred: flagged mobs stay visible until [`MobRegistry::sweep`].
#[derive(Debug, Default)]
pub struct MobRegistry {
    allocator: MobIdAllocator,
    mobs: MobStore,
}

impl MobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mobs(&self) -> &MobStore {
        &self.mobs
    }

    pub fn get(&self, id: MobId) -> Option<&Mob> {
        self.mobs.get(id)
    }

    pub fn get_mut(&mut self, id: MobId) -> Option<&mut Mob> {
        self.mobs.get_mut(id)
    }

    pub fn len(&self) -> usize {
        self.mobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mobs.is_empty()
    }

    /// Creates a mob and runs its first state's `on_enter` before it joins the
    /// registry.
    pub fn spawn(
        &mut self,
        request: SpawnRequest,
        geometry: &dyn WorldGeometry,
        services: &mut SimServices,
        content: &ContentManager,
    ) -> MobId {
        let id = self.allocator.allocate();
        let mut mob = Mob::new(id, Arc::clone(&request.mob_type), request.pos, request.angle);
        mob.z = request.z;
        mob.vars = request.vars;
        mob.parent = request.parent;

        if let Some(parent_id) = request.parent {
            if request.link_child_to_parent {
                mob.links.push(parent_id);
            }
            if request.link_parent_to_child {
                if let Some(parent) = self.mobs.get_mut(parent_id) {
                    parent.links.push(id);
                }
            }
        }
        if request.momentum > 0.0 {
            let direction = request
                .launch_angle
                .unwrap_or_else(|| services.rng.range_f32(0.0, TAU));
            let landing = mob.pos + Vec2::from_angle(direction, request.momentum);
            mob.chase_position(landing, request.momentum);
            mob.speed_z = request.momentum * 7.0;
        }

        {
            let mut ctx = ScriptContext {
                mobs: &mut self.mobs,
                geometry,
                services: &mut *services,
                content,
            };
            runtime::start(&mut mob, &mut ctx);
        }
        debug!(
            mob_id = id.0,
            mob_type = %mob.mob_type.internal_name,
            x = mob.pos.x,
            y = mob.pos.y,
            "mob_spawned"
        );
        self.mobs.insert(mob);
        self.flush_deferred_events(services);
        id
    }

    /// Ticks every mob alive at the start of the frame in ascending id order,
    /// then sweeps flagged mobs. Mobs spawned mid-frame first tick next frame.
    pub fn tick(
        &mut self,
        dt: f32,
        geometry: &dyn WorldGeometry,
        services: &mut SimServices,
        content: &ContentManager,
    ) -> Vec<MobId> {
        for id in self.mobs.ids() {
            if self.mobs.get(id).map_or(true, |mob| mob.to_delete) {
                continue;
            }
            let Some(mut mob) = self.mobs.remove(id) else {
                continue;
            };
            {
                let mut ctx = ScriptContext {
                    mobs: &mut self.mobs,
                    geometry,
                    services: &mut *services,
                    content,
                };
                tick_mob(&mut mob, &mut ctx, dt);
            }
            self.mobs.insert(mob);
            self.flush_deferred_events(services);
            self.apply_spawn_requests(geometry, services, content);
        }
        self.sweep()
    }

    fn apply_spawn_requests(
        &mut self,
        geometry: &dyn WorldGeometry,
        services: &mut SimServices,
        content: &ContentManager,
    ) {
        let requests = std::mem::take(&mut services.spawn_requests);
        for request in requests {
            self.spawn(request, geometry, services, content);
        }
    }

    fn flush_deferred_events(&mut self, services: &mut SimServices) {
        for (target, queued) in std::mem::take(&mut services.deferred_events) {
            match self.mobs.get_mut(target) {
                Some(mob) => mob.events.push_back(queued),
                None => debug!(
                    mob_id = target.0,
                    event = queued.event.script_name(),
                    "event_target_missing"
                ),
            }
        }
    }

    /// Removes flagged mobs and every reference other mobs hold to them.
    pub fn sweep(&mut self) -> Vec<MobId> {
        let removed = self
            .mobs
            .iter()
            .filter(|mob| mob.to_delete)
            .map(|mob| mob.id)
            .collect::<Vec<_>>();
        if removed.is_empty() {
            return removed;
        }
        self.mobs.retain(|_, mob| !mob.to_delete);

        let gone = |id: &MobId| removed.contains(id);
        for mob in self.mobs.iter_mut() {
            mob.links.retain(|id| !gone(id));
            mob.holding.retain(|id| !gone(id));
            mob.chomping.retain(|id| !gone(id));
            mob.group.retain(|id| !gone(id));
            mob.touching.retain(|id| !gone(id));
            if let Some(carry) = mob.carry.as_mut() {
                carry.carriers.retain(|id| !gone(id));
                if carry.destination.is_some_and(|id| gone(&id)) {
                    carry.destination = None;
                }
            }
            for reference in [
                &mut mob.holder,
                &mut mob.focused_mob,
                &mut mob.parent,
                &mut mob.following_group,
            ] {
                if reference.is_some_and(|id| gone(&id)) {
                    *reference = None;
                }
            }
        }
        for id in &removed {
            debug!(mob_id = id.0, "mob_deleted");
        }
        removed
    }

    pub fn clear(&mut self) {
        self.mobs.clear();
    }
}
