//! Mission data an area may carry: what clears it, what fails it and how the
//! result is graded.

use std::collections::{BTreeMap, BTreeSet};

use roxmltree::Node;

use crate::geometry::Vec2;

use super::document::{ContentErrorCode, ContentLoadError, XmlSource};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MissionGoal {
    /// Only ends from the pause menu.
    EndManually,
    CollectTreasure,
    BattleEnemies,
    /// Survive `goal_amount` seconds.
    TimedSurvival,
    GetToExit,
    /// Have `goal_amount` Pikmin on the field.
    GrowPikmin,
}

impl MissionGoal {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "end_manually" => Some(MissionGoal::EndManually),
            "collect_treasure" => Some(MissionGoal::CollectTreasure),
            "battle_enemies" => Some(MissionGoal::BattleEnemies),
            "timed_survival" => Some(MissionGoal::TimedSurvival),
            "get_to_exit" => Some(MissionGoal::GetToExit),
            "grow_pikmin" => Some(MissionGoal::GrowPikmin),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            MissionGoal::EndManually => "end_manually",
            MissionGoal::CollectTreasure => "collect_treasure",
            MissionGoal::BattleEnemies => "battle_enemies",
            MissionGoal::TimedSurvival => "timed_survival",
            MissionGoal::GetToExit => "get_to_exit",
            MissionGoal::GrowPikmin => "grow_pikmin",
        }
    }

    /// Whether the goal is about specific placed mobs.
    pub fn uses_mobs(self) -> bool {
        matches!(
            self,
            MissionGoal::CollectTreasure | MissionGoal::BattleEnemies | MissionGoal::GetToExit
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissionFailCondition {
    TimeLimit { seconds: u32 },
    /// Field Pikmin reaching `amount`, from above or from below.
    PikminAmount { amount: u32, higher_than: bool },
    LosePikmin { amount: u32 },
    TakeDamage,
    LoseLeaders { amount: u32 },
    KillEnemies { amount: u32 },
    PauseMenu,
}

impl MissionFailCondition {
    pub fn name(self) -> &'static str {
        match self {
            MissionFailCondition::TimeLimit { .. } => "time_limit",
            MissionFailCondition::PikminAmount { .. } => "pikmin_amount",
            MissionFailCondition::LosePikmin { .. } => "lose_pikmin",
            MissionFailCondition::TakeDamage => "take_damage",
            MissionFailCondition::LoseLeaders { .. } => "lose_leaders",
            MissionFailCondition::KillEnemies { .. } => "kill_enemies",
            MissionFailCondition::PauseMenu => "pause_menu",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissionGradingMode {
    Points,
    /// Platinum on a clear, nothing otherwise.
    Goal,
    /// Platinum for playing at all.
    Participation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MissionPointCriterion {
    PikminBorn,
    PikminDeath,
    /// Only scores when the mission has a time limit.
    SecondsLeft,
    SecondsPassed,
    TreasurePoints,
    EnemyPoints,
}

impl MissionPointCriterion {
    pub const ALL: [MissionPointCriterion; 6] = [
        MissionPointCriterion::PikminBorn,
        MissionPointCriterion::PikminDeath,
        MissionPointCriterion::SecondsLeft,
        MissionPointCriterion::SecondsPassed,
        MissionPointCriterion::TreasurePoints,
        MissionPointCriterion::EnemyPoints,
    ];

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|criterion| criterion.name() == name)
    }

    pub fn name(self) -> &'static str {
        match self {
            MissionPointCriterion::PikminBorn => "pikmin_born",
            MissionPointCriterion::PikminDeath => "pikmin_death",
            MissionPointCriterion::SecondsLeft => "sec_left",
            MissionPointCriterion::SecondsPassed => "sec_passed",
            MissionPointCriterion::TreasurePoints => "treasure_points",
            MissionPointCriterion::EnemyPoints => "enemy_points",
        }
    }

    fn field_name(self) -> &'static str {
        match self {
            MissionPointCriterion::PikminBorn => "pointsPerPikminBorn",
            MissionPointCriterion::PikminDeath => "pointsPerPikminDeath",
            MissionPointCriterion::SecondsLeft => "pointsPerSecLeft",
            MissionPointCriterion::SecondsPassed => "pointsPerSecPassed",
            MissionPointCriterion::TreasurePoints => "pointsPerTreasurePoint",
            MissionPointCriterion::EnemyPoints => "pointsPerEnemyPoint",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum MissionMedal {
    None,
    Bronze,
    Silver,
    Gold,
    Platinum,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MedalRequirements {
    pub bronze: i64,
    pub silver: i64,
    pub gold: i64,
    pub platinum: i64,
}

impl MedalRequirements {
    pub fn medal_for(&self, score: i64) -> MissionMedal {
        if score >= self.platinum {
            MissionMedal::Platinum
        } else if score >= self.gold {
            MissionMedal::Gold
        } else if score >= self.silver {
            MissionMedal::Silver
        } else if score >= self.bronze {
            MissionMedal::Bronze
        } else {
            MissionMedal::None
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MissionGrading {
    pub mode: MissionGradingMode,
    pub starting_points: i64,
    /// Points per unit of each criterion. Missing criteria score nothing.
    pub points_per: BTreeMap<MissionPointCriterion, i64>,
    /// Criteria that score nothing when the mission fails.
    pub point_loss: BTreeSet<MissionPointCriterion>,
    pub medals: MedalRequirements,
}

impl Default for MissionGrading {
    fn default() -> Self {
        Self {
            mode: MissionGradingMode::Goal,
            starting_points: 0,
            points_per: BTreeMap::new(),
            point_loss: BTreeSet::new(),
            medals: MedalRequirements::default(),
        }
    }
}

/// Axis-aligned box leaders must stand in to clear a get-to-exit mission.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExitRegion {
    pub center: Vec2,
    pub size: Vec2,
}

impl ExitRegion {
    pub fn contains(&self, pos: Vec2) -> bool {
        (pos.x - self.center.x).abs() <= self.size.x / 2.0
            && (pos.y - self.center.y).abs() <= self.size.y / 2.0
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MissionData {
    pub goal: MissionGoal,
    /// Every mob of the goal's category counts, instead of `goal_mobs`.
    pub goal_all_mobs: bool,
    /// Indexes into the area's mob placements.
    pub goal_mobs: BTreeSet<usize>,
    pub goal_amount: u32,
    pub goal_exit: Option<ExitRegion>,
    pub fail_conditions: Vec<MissionFailCondition>,
    pub grading: MissionGrading,
}

impl MissionData {
    pub fn new(goal: MissionGoal) -> Self {
        Self {
            goal,
            goal_all_mobs: true,
            goal_mobs: BTreeSet::new(),
            goal_amount: 0,
            goal_exit: None,
            fail_conditions: Vec::new(),
            grading: MissionGrading::default(),
        }
    }

    pub fn time_limit(&self) -> Option<u32> {
        self.fail_conditions.iter().find_map(|condition| match condition {
            MissionFailCondition::TimeLimit { seconds } => Some(*seconds),
            _ => None,
        })
    }

    pub fn has_fail_condition(&self, name: &str) -> bool {
        self.fail_conditions
            .iter()
            .any(|condition| condition.name() == name)
    }
}

/// Parses `<mission>`. `placements` is the number of placed mobs goal indexes
/// may point at.
pub(crate) fn parse_mission(
    source: &XmlSource<'_, '_>,
    node: Node<'_, '_>,
    placements: usize,
) -> Result<MissionData, ContentLoadError> {
    let mut mission = MissionData::new(MissionGoal::EndManually);
    let mut goal_node = None;

    for field in source.unique_fields(node)? {
        match field.tag_name().name() {
            "goal" => {
                let name = source.required_text(field)?;
                mission.goal = MissionGoal::from_name(&name).ok_or_else(|| {
                    source.error_at(
                        ContentErrorCode::InvalidValue,
                        format!("unknown mission goal '{name}'"),
                        field,
                    )
                })?;
                goal_node = Some(field);
            }
            "goalAllMobs" => mission.goal_all_mobs = source.parse_bool(field)?,
            "goalMobs" => {
                for index in source.text_list(field, "mob")? {
                    let index = index
                        .parse::<usize>()
                        .ok()
                        .filter(|index| *index < placements)
                        .ok_or_else(|| {
                            source.error_at(
                                ContentErrorCode::InvalidValue,
                                format!("goal mob '{index}' is not a placed mob index"),
                                field,
                            )
                        })?;
                    mission.goal_mobs.insert(index);
                }
            }
            "goalAmount" => mission.goal_amount = source.parse_field(field)?,
            "goalExit" => {
                mission.goal_exit = Some(ExitRegion {
                    center: Vec2::new(
                        source.attr_f32(field, "x", 0.0)?,
                        source.attr_f32(field, "y", 0.0)?,
                    ),
                    size: Vec2::new(
                        source.attr_f32(field, "width", 0.0)?.abs(),
                        source.attr_f32(field, "height", 0.0)?.abs(),
                    ),
                })
            }
            "failConditions" => mission.fail_conditions = parse_fail_conditions(source, field)?,
            "grading" => mission.grading = parse_grading(source, field)?,
            _ => return Err(source.unknown_field(field)),
        }
    }

    let anchor = goal_node.unwrap_or(node);
    let problem = match mission.goal {
        MissionGoal::TimedSurvival | MissionGoal::GrowPikmin if mission.goal_amount == 0 => {
            Some("needs a <goalAmount> above zero")
        }
        MissionGoal::GetToExit if mission.goal_exit.is_none() => Some("needs a <goalExit>"),
        goal if goal.uses_mobs() && !mission.goal_all_mobs && mission.goal_mobs.is_empty() => {
            Some("names no <goalMobs>")
        }
        _ => None,
    };
    if let Some(problem) = problem {
        return Err(source.error_at(
            ContentErrorCode::MissingField,
            format!("mission goal '{}' {problem}", mission.goal.name()),
            anchor,
        ));
    }
    Ok(mission)
}

fn parse_fail_conditions(
    source: &XmlSource<'_, '_>,
    node: Node<'_, '_>,
) -> Result<Vec<MissionFailCondition>, ContentLoadError> {
    let mut conditions = Vec::new();
    for field in source.unique_fields(node)? {
        let condition = match field.tag_name().name() {
            "timeLimit" => MissionFailCondition::TimeLimit {
                seconds: source.parse_field(field)?,
            },
            "pikminAmount" => MissionFailCondition::PikminAmount {
                amount: source.parse_field(field)?,
                higher_than: source.attr_bool(field, "higherThan", false)?,
            },
            "losePikmin" => MissionFailCondition::LosePikmin {
                amount: source.parse_field(field)?,
            },
            "takeDamage" => MissionFailCondition::TakeDamage,
            "loseLeaders" => MissionFailCondition::LoseLeaders {
                amount: source.parse_field(field)?,
            },
            "killEnemies" => MissionFailCondition::KillEnemies {
                amount: source.parse_field(field)?,
            },
            "pauseMenu" => MissionFailCondition::PauseMenu,
            _ => return Err(source.unknown_field(field)),
        };
        conditions.push(condition);
    }
    Ok(conditions)
}

fn parse_grading(
    source: &XmlSource<'_, '_>,
    node: Node<'_, '_>,
) -> Result<MissionGrading, ContentLoadError> {
    let mode = match node.attribute("mode").map(str::trim) {
        None | Some("goal") => MissionGradingMode::Goal,
        Some("points") => MissionGradingMode::Points,
        Some("participation") => MissionGradingMode::Participation,
        Some(other) => {
            return Err(source.error_at(
                ContentErrorCode::InvalidValue,
                format!("unknown grading mode '{other}'"),
                node,
            ))
        }
    };
    let mut grading = MissionGrading {
        mode,
        ..MissionGrading::default()
    };

    for field in source.unique_fields(node)? {
        let name = field.tag_name().name();
        if let Some(criterion) = MissionPointCriterion::ALL
            .into_iter()
            .find(|criterion| criterion.field_name() == name)
        {
            grading.points_per.insert(criterion, source.parse_field(field)?);
            continue;
        }
        match name {
            "startingPoints" => grading.starting_points = source.parse_field(field)?,
            "pointLoss" => {
                for criterion in source.text_list(field, "criterion")? {
                    let parsed = MissionPointCriterion::from_name(&criterion).ok_or_else(|| {
                        source.error_at(
                            ContentErrorCode::InvalidValue,
                            format!("unknown point criterion '{criterion}'"),
                            field,
                        )
                    })?;
                    grading.point_loss.insert(parsed);
                }
            }
            "medals" => {
                grading.medals = MedalRequirements {
                    bronze: medal_attr(source, field, "bronze")?,
                    silver: medal_attr(source, field, "silver")?,
                    gold: medal_attr(source, field, "gold")?,
                    platinum: medal_attr(source, field, "platinum")?,
                };
                let medals = grading.medals;
                if !(medals.bronze <= medals.silver
                    && medals.silver <= medals.gold
                    && medals.gold <= medals.platinum)
                {
                    return Err(source.error_at(
                        ContentErrorCode::InvalidValue,
                        "medal requirements must not decrease".to_string(),
                        field,
                    ));
                }
            }
            _ => return Err(source.unknown_field(field)),
        }
    }
    Ok(grading)
}

fn medal_attr(
    source: &XmlSource<'_, '_>,
    node: Node<'_, '_>,
    name: &str,
) -> Result<i64, ContentLoadError> {
    let raw = source.required_attr(node, name)?;
    raw.parse::<i64>().map_err(|_| {
        source.error_at(
            ContentErrorCode::InvalidValue,
            format!("attribute {name}='{raw}' is not a whole number"),
            node,
        )
    })
}
