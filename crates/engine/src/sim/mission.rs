//! Follows a running mission: counts what happened on the field after every
//! tick, then checks the goal before the fail conditions.

use std::collections::{BTreeMap, BTreeSet};

use tracing::info;

use crate::content::{
    MissionData, MissionFailCondition, MissionGoal, MissionGradingMode, MissionMedal,
    MissionPointCriterion,
};
use crate::mob::{CategoryProperties, Mob, MobCategory, MobId};

use super::context::{MobStore, SimStats};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissionStatus {
    Ongoing,
    Cleared,
    Failed(MissionFailCondition),
    /// Ended from the menu with nothing to grade it against.
    Quit,
}

impl MissionStatus {
    pub fn is_over(self) -> bool {
        self != MissionStatus::Ongoing
    }
}

/// What the mission has counted so far.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MissionCounts {
    pub pikmin_born: u32,
    pub pikmin_deaths: u32,
    pub leaders_lost: u32,
    pub leader_damaged: bool,
    pub enemies_killed: u32,
    pub enemy_points: u32,
    pub treasures_collected: u32,
    pub treasure_points: u32,
    pub field_pikmin: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MissionResult {
    pub status: MissionStatus,
    pub score: i64,
    pub medal: MissionMedal,
}

#[derive(Debug, Clone)]
pub struct MissionTracker {
    mission: MissionData,
    status: MissionStatus,
    time_passed: f32,
    counts: MissionCounts,
    goal_mobs: BTreeSet<MobId>,
    collected: BTreeSet<MobId>,
    pikmin: BTreeSet<MobId>,
    /// Last health seen per live leader.
    leaders: BTreeMap<MobId, f32>,
    /// Points each live enemy is worth.
    enemies: BTreeMap<MobId, u32>,
}

impl MissionTracker {
    /// `placed` maps each area placement index to the mob it spawned, if any.
    pub fn new(mission: MissionData, placed: &[Option<MobId>], mobs: &MobStore) -> Self {
        let goal_mobs = if mission.goal_all_mobs {
            let category = match mission.goal {
                MissionGoal::CollectTreasure => Some(MobCategory::Treasures),
                MissionGoal::BattleEnemies => Some(MobCategory::Enemies),
                MissionGoal::GetToExit => Some(MobCategory::Leaders),
                _ => None,
            };
            mobs.iter()
                .filter(|mob| Some(mob.mob_type.category) == category)
                .map(|mob| mob.id)
                .collect()
        } else {
            mission
                .goal_mobs
                .iter()
                .filter_map(|index| placed.get(*index).copied().flatten())
                .collect()
        };
        let mut tracker = Self {
            mission,
            status: MissionStatus::Ongoing,
            time_passed: 0.0,
            counts: MissionCounts::default(),
            goal_mobs,
            collected: BTreeSet::new(),
            pikmin: BTreeSet::new(),
            leaders: BTreeMap::new(),
            enemies: BTreeMap::new(),
        };
        tracker.observe(mobs);
        tracker
    }

    pub fn mission(&self) -> &MissionData {
        &self.mission
    }

    pub fn status(&self) -> MissionStatus {
        self.status
    }

    pub fn counts(&self) -> MissionCounts {
        self.counts
    }

    pub fn time_passed(&self) -> f32 {
        self.time_passed
    }

    pub fn goal_mobs(&self) -> &BTreeSet<MobId> {
        &self.goal_mobs
    }

    /// Folds one tick into the counts and settles the status. Nothing changes
    /// once the mission is over.
    pub fn update(&mut self, mobs: &MobStore, stats: SimStats, dt: f32) -> MissionStatus {
        if self.status.is_over() {
            return self.status;
        }
        self.time_passed += dt;
        self.counts.pikmin_born += stats.pikmin_born;
        for delivery in stats.deliveries {
            let is_treasure = delivery.category == MobCategory::Treasures;
            if is_treasure && self.collected.insert(delivery.object) {
                self.counts.treasures_collected += 1;
                self.counts.treasure_points += delivery.points;
            }
        }
        self.observe(mobs);

        if self.goal_met(mobs) {
            self.finish(MissionStatus::Cleared);
        } else if let Some(condition) = self
            .mission
            .fail_conditions
            .iter()
            .copied()
            .find(|condition| self.fail_met(*condition))
        {
            self.finish(MissionStatus::Failed(condition));
        }
        self.status
    }

    /// Ends the mission from the pause menu.
    pub fn end_from_menu(&mut self) -> MissionStatus {
        if self.status.is_over() {
            return self.status;
        }
        let status = if self.mission.goal == MissionGoal::EndManually {
            MissionStatus::Cleared
        } else if self.mission.has_fail_condition("pause_menu") {
            MissionStatus::Failed(MissionFailCondition::PauseMenu)
        } else {
            MissionStatus::Quit
        };
        self.finish(status);
        status
    }

    /// Current amount and required amount for the goal.
    pub fn goal_progress(&self, mobs: &MobStore) -> (u32, u32) {
        let goal_count = self.goal_mobs.len() as u32;
        match self.mission.goal {
            MissionGoal::EndManually => (0, 0),
            MissionGoal::CollectTreasure => (
                self.goal_mobs.intersection(&self.collected).count() as u32,
                goal_count,
            ),
            MissionGoal::BattleEnemies => (
                self.goal_mobs
                    .iter()
                    .filter(|id| !mobs.get(**id).is_some_and(is_standing))
                    .count() as u32,
                goal_count,
            ),
            MissionGoal::TimedSurvival => (self.time_passed as u32, self.mission.goal_amount),
            MissionGoal::GetToExit => (
                self.goal_mobs
                    .iter()
                    .filter_map(|id| mobs.get(*id))
                    .filter(|leader| is_standing(leader) && self.in_exit(leader))
                    .count() as u32,
                goal_count,
            ),
            MissionGoal::GrowPikmin => (self.counts.field_pikmin, self.mission.goal_amount),
        }
    }

    pub fn result(&self) -> MissionResult {
        let grading = &self.mission.grading;
        let score = self.score();
        let medal = match grading.mode {
            MissionGradingMode::Points => grading.medals.medal_for(score),
            MissionGradingMode::Goal if self.status == MissionStatus::Cleared => {
                MissionMedal::Platinum
            }
            MissionGradingMode::Goal => MissionMedal::None,
            MissionGradingMode::Participation => MissionMedal::Platinum,
        };
        MissionResult {
            status: self.status,
            score,
            medal,
        }
    }

    /// Starting points plus every criterion's amount times its multiplier.
    /// Criteria in the point-loss list score nothing on a failure.
    pub fn score(&self) -> i64 {
        let grading = &self.mission.grading;
        let failed = matches!(self.status, MissionStatus::Failed(_));
        grading
            .points_per
            .iter()
            .filter(|(criterion, _)| !(failed && grading.point_loss.contains(*criterion)))
            .fold(grading.starting_points, |score, (criterion, per)| {
                score.saturating_add(per.saturating_mul(self.criterion_amount(*criterion)))
            })
    }

    fn criterion_amount(&self, criterion: MissionPointCriterion) -> i64 {
        let seconds_passed = self.time_passed as i64;
        match criterion {
            MissionPointCriterion::PikminBorn => self.counts.pikmin_born.into(),
            MissionPointCriterion::PikminDeath => self.counts.pikmin_deaths.into(),
            MissionPointCriterion::SecondsLeft => self
                .mission
                .time_limit()
                .map_or(0, |limit| (i64::from(limit) - seconds_passed).max(0)),
            MissionPointCriterion::SecondsPassed => seconds_passed,
            MissionPointCriterion::TreasurePoints => self.counts.treasure_points.into(),
            MissionPointCriterion::EnemyPoints => self.counts.enemy_points.into(),
        }
    }

    /// Picks up new Pikmin, leaders and enemies and counts the ones that are
    /// dead or gone since the last look.
    fn observe(&mut self, mobs: &MobStore) {
        let mut field_pikmin = 0;
        for mob in mobs.iter().filter(|mob| is_standing(mob)) {
            match mob.mob_type.category {
                MobCategory::Pikmin => {
                    field_pikmin += 1;
                    self.pikmin.insert(mob.id);
                }
                MobCategory::Leaders => {
                    if let Some(last_health) = self.leaders.insert(mob.id, mob.health) {
                        if mob.health < last_health {
                            self.counts.leader_damaged = true;
                        }
                    }
                }
                MobCategory::Enemies => {
                    let points = match mob.mob_type.properties {
                        CategoryProperties::Enemy { points, .. } => points,
                        _ => 0,
                    };
                    self.enemies.insert(mob.id, points);
                }
                _ => {}
            }
        }
        self.counts.field_pikmin = field_pikmin;

        let gone = |id: &MobId| !mobs.get(*id).is_some_and(is_standing);
        let lost_pikmin = self.pikmin.iter().filter(|id| gone(*id)).count() as u32;
        self.pikmin.retain(|id| !gone(id));
        self.counts.pikmin_deaths += lost_pikmin;

        let lost_leaders = self.leaders.keys().filter(|id| gone(*id)).count() as u32;
        self.leaders.retain(|id, _| !gone(id));
        self.counts.leaders_lost += lost_leaders;

        for (_, points) in self.enemies.iter().filter(|(id, _)| gone(*id)) {
            self.counts.enemies_killed += 1;
            self.counts.enemy_points += points;
        }
        self.enemies.retain(|id, _| !gone(id));
    }

    fn goal_met(&self, mobs: &MobStore) -> bool {
        let (current, required) = self.goal_progress(mobs);
        match self.mission.goal {
            MissionGoal::EndManually => false,
            MissionGoal::GetToExit => {
                let standing = self
                    .goal_mobs
                    .iter()
                    .filter(|id| mobs.get(**id).is_some_and(is_standing))
                    .count() as u32;
                standing > 0 && current == standing
            }
            _ => required > 0 && current >= required,
        }
    }

    fn fail_met(&self, condition: MissionFailCondition) -> bool {
        let counts = &self.counts;
        match condition {
            MissionFailCondition::TimeLimit { seconds } => self.time_passed >= seconds as f32,
            MissionFailCondition::PikminAmount {
                amount,
                higher_than: true,
            } => counts.field_pikmin >= amount,
            MissionFailCondition::PikminAmount {
                amount,
                higher_than: false,
            } => counts.field_pikmin <= amount,
            MissionFailCondition::LosePikmin { amount } => counts.pikmin_deaths >= amount,
            MissionFailCondition::TakeDamage => counts.leader_damaged,
            MissionFailCondition::LoseLeaders { amount } => counts.leaders_lost >= amount,
            MissionFailCondition::KillEnemies { amount } => counts.enemies_killed >= amount,
            MissionFailCondition::PauseMenu => false,
        }
    }

    fn in_exit(&self, mob: &Mob) -> bool {
        self.mission
            .goal_exit
            .is_some_and(|exit| exit.contains(mob.pos))
    }

    fn finish(&mut self, status: MissionStatus) {
        self.status = status;
        let result = self.result();
        info!(
            goal = self.mission.goal.name(),
            status = ?status,
            seconds = self.time_passed,
            score = result.score,
            medal = ?result.medal,
            "mission_ended"
        );
    }
}

fn is_standing(mob: &Mob) -> bool {
    mob.is_alive() && !mob.to_delete
}
