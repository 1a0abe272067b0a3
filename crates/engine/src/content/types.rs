use std::collections::BTreeMap;
use std::path::PathBuf;

use thiserror::Error;

use super::document::ContentLoadError;

/// Kinds of content a pack can ship, each with its own folder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ContentType {
    Liquid,
    StatusType,
    Hazard,
    Sample,
    MobType,
    Area,
}

impl ContentType {
    /// In dependency order: later types may reference earlier ones.
    pub const ALL: [ContentType; 6] = [
        ContentType::Liquid,
        ContentType::StatusType,
        ContentType::Hazard,
        ContentType::Sample,
        ContentType::MobType,
        ContentType::Area,
    ];

    pub const fn folder_name(self) -> &'static str {
        match self {
            ContentType::Area => "areas",
            ContentType::Hazard => "hazards",
            ContentType::Liquid => "liquids",
            ContentType::MobType => "mob_types",
            ContentType::Sample => "samples",
            ContentType::StatusType => "status_types",
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            ContentType::Area => "area",
            ContentType::Hazard => "hazard",
            ContentType::Liquid => "liquid",
            ContentType::MobType => "mob_type",
            ContentType::Sample => "sample",
            ContentType::StatusType => "status_type",
        }
    }
}

/// How much of a content type is in memory. `Basic` keeps metadata only:
/// mob types without scripts, areas without tiles or mobs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub enum ContentLoadLevel {
    #[default]
    Unloaded,
    Basic,
    Full,
}

#[derive(Debug, Error)]
pub enum ContentError {
    #[error("content type '{}' is already loaded", .0.label())]
    AlreadyLoaded(ContentType),
    #[error("content type '{}' is not loaded", .0.label())]
    NotLoaded(ContentType),
    #[error("content cannot be loaded at level Unloaded")]
    InvalidLevel,
    #[error("failed to read directory {path}: {source}")]
    ReadDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Outcome of one `load_all` call. Item failures are collected, not fatal.
#[derive(Debug, Clone, Default)]
pub struct ContentLoadReport {
    pub loaded: BTreeMap<ContentType, usize>,
    pub errors: Vec<ContentLoadError>,
    pub pack_fingerprint: String,
}

impl ContentLoadReport {
    pub fn loaded_count(&self, content_type: ContentType) -> usize {
        self.loaded.get(&content_type).copied().unwrap_or(0)
    }

    pub fn total_loaded(&self) -> usize {
        self.loaded.values().sum()
    }

    pub fn render_human_readable(&self) -> String {
        let mut output = format!(
            "loaded={} errors={} packs_hash={}",
            self.total_loaded(),
            self.errors.len(),
            self.pack_fingerprint
        );
        for (content_type, count) in &self.loaded {
            output.push_str(&format!("\n{}={}", content_type.label(), count));
        }
        for error in &self.errors {
            output.push('\n');
            output.push_str(&error.to_string());
        }
        output
    }
}
