use std::collections::BTreeMap;
use std::sync::Arc;

use super::mob_type::MobType;
use super::onion::OnionState;

/// Closed set of mob categories. Each category maps to a folder under
/// `mob_types/` and selects category-specific properties and behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MobCategory {
    Leaders,
    Pikmin,
    Enemies,
    Treasures,
    Pellets,
    Onions,
    Tools,
    Drops,
    Custom,
}

impl MobCategory {
    pub const ALL: [MobCategory; 9] = [
        MobCategory::Leaders,
        MobCategory::Pikmin,
        MobCategory::Enemies,
        MobCategory::Treasures,
        MobCategory::Pellets,
        MobCategory::Onions,
        MobCategory::Tools,
        MobCategory::Drops,
        MobCategory::Custom,
    ];

    pub const fn folder_name(self) -> &'static str {
        match self {
            MobCategory::Leaders => "leaders",
            MobCategory::Pikmin => "pikmin",
            MobCategory::Enemies => "enemies",
            MobCategory::Treasures => "treasures",
            MobCategory::Pellets => "pellets",
            MobCategory::Onions => "onions",
            MobCategory::Tools => "tools",
            MobCategory::Drops => "drops",
            MobCategory::Custom => "custom",
        }
    }

    /// Singular name used by the `mob_category` script comparand.
    pub const fn script_name(self) -> &'static str {
        match self {
            MobCategory::Leaders => "leader",
            MobCategory::Pikmin => "pikmin",
            MobCategory::Enemies => "enemy",
            MobCategory::Treasures => "treasure",
            MobCategory::Pellets => "pellet",
            MobCategory::Onions => "onion",
            MobCategory::Tools => "tool",
            MobCategory::Drops => "drop",
            MobCategory::Custom => "custom",
        }
    }

    pub fn from_folder(folder: &str) -> Option<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|category| category.folder_name() == folder)
    }

    /// Categories that get a generated `idle_waiting` first state when they
    /// ship without a script.
    pub const fn has_builtin_idle(self) -> bool {
        matches!(self, MobCategory::Treasures | MobCategory::Pellets)
    }

    /// Categories whose mobs can be picked up and delivered by Pikmin.
    pub const fn is_carriable_by_default(self) -> bool {
        matches!(self, MobCategory::Treasures | MobCategory::Pellets)
    }
}

/// Which mobs may drink from a drop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropConsumer {
    Pikmin,
    Leaders,
}

impl DropConsumer {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "pikmin" => Some(DropConsumer::Pikmin),
            "leaders" => Some(DropConsumer::Leaders),
            _ => None,
        }
    }

    pub fn accepts(self, category: MobCategory) -> bool {
        match self {
            DropConsumer::Pikmin => category == MobCategory::Pikmin,
            DropConsumer::Leaders => category == MobCategory::Leaders,
        }
    }
}

/// Category-specific data parsed from a mob type's data file.
#[derive(Debug, Clone, PartialEq)]
pub enum CategoryProperties {
    Leader,
    Pikmin {
        carry_strength: f32,
    },
    Enemy {
        pikmin_seeds: u32,
        drops_corpse: bool,
        points: u32,
    },
    Treasure {
        points: u32,
    },
    Pellet {
        pikmin_type: String,
        number: u32,
        match_seeds: u32,
        non_match_seeds: u32,
    },
    Onion {
        pikmin_types: Vec<String>,
    },
    Tool,
    Drop {
        total_doses: u32,
        consumer: DropConsumer,
        /// Health given to the consumer per dose. May be negative.
        health_change: f32,
        status_to_give: Option<String>,
    },
    Custom,
}

impl CategoryProperties {
    pub fn defaults_for(category: MobCategory) -> Self {
        match category {
            MobCategory::Leaders => CategoryProperties::Leader,
            MobCategory::Pikmin => CategoryProperties::Pikmin {
                carry_strength: 1.0,
            },
            MobCategory::Enemies => CategoryProperties::Enemy {
                pikmin_seeds: 0,
                drops_corpse: true,
                points: 0,
            },
            MobCategory::Treasures => CategoryProperties::Treasure { points: 0 },
            MobCategory::Pellets => CategoryProperties::Pellet {
                pikmin_type: String::new(),
                number: 1,
                match_seeds: 2,
                non_match_seeds: 1,
            },
            MobCategory::Onions => CategoryProperties::Onion {
                pikmin_types: Vec::new(),
            },
            MobCategory::Tools => CategoryProperties::Tool,
            MobCategory::Drops => CategoryProperties::Drop {
                total_doses: 1,
                consumer: DropConsumer::Pikmin,
                health_change: 0.0,
                status_to_give: None,
            },
            MobCategory::Custom => CategoryProperties::Custom,
        }
    }

    pub fn carry_strength(&self) -> f32 {
        match self {
            CategoryProperties::Pikmin { carry_strength, .. } => *carry_strength,
            _ => 0.0,
        }
    }
}

/// Per-mob runtime data that only some categories carry.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum CategoryState {
    #[default]
    None,
    Onion(OnionState),
    Drop {
        doses_left: u32,
    },
}

impl CategoryState {
    pub fn initial(properties: &CategoryProperties) -> Self {
        match properties {
            CategoryProperties::Onion { .. } => CategoryState::Onion(OnionState::default()),
            CategoryProperties::Drop { total_doses, .. } => CategoryState::Drop {
                doses_left: *total_doses,
            },
            _ => CategoryState::None,
        }
    }
}

/// Mob types registered per category, keyed by internal name.
#[derive(Debug, Default, Clone)]
pub struct MobTypeRegistry {
    by_category: BTreeMap<MobCategory, BTreeMap<String, Arc<MobType>>>,
}

impl MobTypeRegistry {
    pub fn register_type(&mut self, mob_type: MobType) -> Arc<MobType> {
        let mob_type = Arc::new(mob_type);
        self.by_category
            .entry(mob_type.category)
            .or_default()
            .insert(mob_type.internal_name.clone(), Arc::clone(&mob_type));
        mob_type
    }

    pub fn get_type(&self, category: MobCategory, internal_name: &str) -> Option<&Arc<MobType>> {
        self.by_category.get(&category)?.get(internal_name)
    }

    /// Looks a type up by its `<category folder>/<type folder>` reference.
    pub fn find(&self, reference: &str) -> Option<&Arc<MobType>> {
        let (folder, _) = reference.split_once('/')?;
        let category = MobCategory::from_folder(folder)?;
        self.get_type(category, reference)
    }

    pub fn type_names(&self, category: MobCategory) -> Vec<&str> {
        self.by_category
            .get(&category)
            .map(|types| types.keys().map(String::as_str).collect())
            .unwrap_or_default()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<MobType>> {
        self.by_category.values().flat_map(|types| types.values())
    }

    pub fn len(&self) -> usize {
        self.by_category.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&mut self) {
        self.by_category.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn folders_round_trip() {
        for category in MobCategory::ALL {
            assert_eq!(MobCategory::from_folder(category.folder_name()), Some(category));
        }
        assert_eq!(MobCategory::from_folder("ships"), None);
    }

    #[test]
    fn registry_lists_and_finds_by_reference() {
        let mut registry = MobTypeRegistry::default();
        registry.register_type(MobType::blank("enemies/red_bulborb", MobCategory::Enemies));
        registry.register_type(MobType::blank("enemies/dwarf_bulborb", MobCategory::Enemies));
        registry.register_type(MobType::blank("treasures/sun_pendant", MobCategory::Treasures));

        assert_eq!(registry.len(), 3);
        assert_eq!(
            registry.type_names(MobCategory::Enemies),
            vec!["enemies/dwarf_bulborb", "enemies/red_bulborb"]
        );
        assert!(registry.find("enemies/red_bulborb").is_some());
        assert!(registry.find("pikmin/red_bulborb").is_none());
        assert!(registry.find("nonsense").is_none());
        assert!(registry.type_names(MobCategory::Onions).is_empty());
    }

    #[test]
    fn re_registering_replaces() {
        let mut registry = MobTypeRegistry::default();
        registry.register_type(MobType::blank("enemies/red_bulborb", MobCategory::Enemies));
        let mut replacement = MobType::blank("enemies/red_bulborb", MobCategory::Enemies);
        replacement.name = "Overridden".to_string();
        registry.register_type(replacement);
        assert_eq!(registry.len(), 1);
        assert_eq!(
            registry.find("enemies/red_bulborb").map(|t| t.name.as_str()),
            Some("Overridden")
        );
    }
}
