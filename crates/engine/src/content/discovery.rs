use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::warn;

use super::types::ContentError;

/// Pack that is always loaded first and that every other pack layers over.
pub const BASE_PACK_NAME: &str = "base";
pub const PACK_METADATA_FILE: &str = "pack.json";

/// Contents of a pack's `pack.json`. Every field is optional on disk.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct PackMetadata {
    pub name: String,
    pub description: String,
    pub maker: String,
    pub version: String,
    pub engine_version: String,
    pub tags: Vec<String>,
    pub dependencies: Vec<String>,
    pub conflicts: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PackInfo {
    /// Folder name under the game data directory.
    pub internal_name: String,
    pub path: PathBuf,
    pub metadata: PackMetadata,
}

/// Lists installed packs: `base` first, then the rest by folder name.
pub(crate) fn discover_packs(game_data_dir: &Path) -> Result<Vec<PackInfo>, ContentError> {
    let entries = fs::read_dir(game_data_dir).map_err(|source| ContentError::ReadDir {
        path: game_data_dir.to_path_buf(),
        source,
    })?;

    let mut names = Vec::<String>::new();
    for entry in entries {
        let entry = entry.map_err(|source| ContentError::ReadDir {
            path: game_data_dir.to_path_buf(),
            source,
        })?;
        if !entry.path().is_dir() {
            continue;
        }
        if let Some(name) = entry.file_name().to_str() {
            names.push(name.to_string());
        }
    }
    names.sort_by(|a, b| {
        (a != BASE_PACK_NAME)
            .cmp(&(b != BASE_PACK_NAME))
            .then_with(|| a.cmp(b))
    });

    if names.first().map(String::as_str) != Some(BASE_PACK_NAME) {
        warn!(
            game_data_dir = %game_data_dir.display(),
            "base_pack_missing"
        );
    }

    Ok(names
        .into_iter()
        .map(|name| {
            let path = game_data_dir.join(&name);
            let metadata = read_pack_metadata(&name, &path);
            PackInfo {
                internal_name: name,
                path,
                metadata,
            }
        })
        .collect())
}

/// Falls back to defaults named after the folder when the file is missing or
/// unreadable.
fn read_pack_metadata(internal_name: &str, pack_dir: &Path) -> PackMetadata {
    let path = pack_dir.join(PACK_METADATA_FILE);
    let parsed = fs::read_to_string(&path)
        .map_err(|error| error.to_string())
        .and_then(|raw| {
            let deserializer = &mut serde_json::Deserializer::from_str(&raw);
            serde_path_to_error::deserialize::<_, PackMetadata>(deserializer)
                .map_err(|error| error.to_string())
        });
    let mut metadata = match parsed {
        Ok(metadata) => metadata,
        Err(reason) => {
            warn!(
                pack = internal_name,
                path = %path.display(),
                reason = %reason,
                "pack_metadata_missing"
            );
            PackMetadata::default()
        }
    };
    if metadata.name.trim().is_empty() {
        metadata.name = internal_name.to_string();
    }
    metadata
}
