use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::mob::MobCategory;

use super::discovery::PackInfo;
use super::types::ContentType;

pub const AREA_FILE: &str = "area.xml";
pub const MOB_DATA_FILE: &str = "data.xml";
pub const MOB_SCRIPT_FILE: &str = "script.xml";

const SAMPLE_EXTENSIONS: [&str; 2] = ["ogg", "wav"];

/// Where one content item lives. Mob type manifests point at the type's
/// folder; every other type points at its file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentManifest {
    pub internal_name: String,
    pub pack: String,
    pub path: PathBuf,
}

/// Manifests of one content type keyed by internal name. Later packs replace
/// entries of earlier ones.
#[derive(Debug, Clone, Default)]
pub(crate) struct ManifestSet {
    entries: BTreeMap<String, ContentManifest>,
}

impl ManifestSet {
    pub(crate) fn fill(content_type: ContentType, packs: &[PackInfo]) -> Self {
        let mut set = Self::default();
        for pack in packs {
            let folder = pack.path.join(content_type.folder_name());
            if !folder.is_dir() {
                continue;
            }
            for (internal_name, path) in list_items(content_type, &folder) {
                let manifest = ContentManifest {
                    internal_name: internal_name.clone(),
                    pack: pack.internal_name.clone(),
                    path,
                };
                if let Some(previous) = set.entries.insert(internal_name.clone(), manifest) {
                    debug!(
                        content_type = content_type.label(),
                        name = %internal_name,
                        overridden_pack = %previous.pack,
                        pack = %pack.internal_name,
                        "content_manifest_override"
                    );
                }
            }
        }
        set
    }

    pub(crate) fn get(&self, internal_name: &str) -> Option<&ContentManifest> {
        self.entries.get(internal_name)
    }

    pub(crate) fn contains(&self, internal_name: &str) -> bool {
        self.entries.contains_key(internal_name)
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = &ContentManifest> {
        self.entries.values()
    }

    pub(crate) fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }
}

fn list_items(content_type: ContentType, folder: &Path) -> Vec<(String, PathBuf)> {
    match content_type {
        ContentType::Area => sorted_dirs(folder)
            .into_iter()
            .filter(|(_, dir)| dir.join(AREA_FILE).is_file())
            .map(|(name, dir)| (name, dir.join(AREA_FILE)))
            .collect(),
        ContentType::MobType => {
            let mut items = Vec::new();
            for (category_folder, category_dir) in sorted_dirs(folder) {
                if MobCategory::from_folder(&category_folder).is_none() {
                    warn!(
                        path = %category_dir.display(),
                        "mob_category_folder_unknown"
                    );
                    continue;
                }
                for (type_folder, type_dir) in sorted_dirs(&category_dir) {
                    if type_dir.join(MOB_DATA_FILE).is_file() {
                        items.push((format!("{category_folder}/{type_folder}"), type_dir));
                    }
                }
            }
            items
        }
        ContentType::Sample => sorted_files(folder, &SAMPLE_EXTENSIONS),
        ContentType::Hazard | ContentType::Liquid | ContentType::StatusType => {
            sorted_files(folder, &["xml"])
        }
    }
}

fn sorted_dirs(folder: &Path) -> Vec<(String, PathBuf)> {
    let mut dirs = read_entries(folder)
        .into_iter()
        .filter(|path| path.is_dir())
        .filter_map(|path| {
            let name = path.file_name()?.to_str()?.to_string();
            Some((name, path))
        })
        .collect::<Vec<_>>();
    dirs.sort();
    dirs
}

fn sorted_files(folder: &Path, extensions: &[&str]) -> Vec<(String, PathBuf)> {
    let mut files = read_entries(folder)
        .into_iter()
        .filter(|path| path.is_file())
        .filter(|path| {
            path.extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| extensions.iter().any(|want| ext.eq_ignore_ascii_case(want)))
        })
        .filter_map(|path| {
            let name = path.file_stem()?.to_str()?.to_string();
            Some((name, path))
        })
        .collect::<Vec<_>>();
    files.sort();
    files
}

fn read_entries(folder: &Path) -> Vec<PathBuf> {
    match fs::read_dir(folder) {
        Ok(entries) => entries
            .filter_map(|entry| entry.ok().map(|entry| entry.path()))
            .collect(),
        Err(source) => {
            warn!(path = %folder.display(), error = %source, "content_folder_unreadable");
            Vec::new()
        }
    }
}
