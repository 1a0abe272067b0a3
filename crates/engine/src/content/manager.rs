use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{error, info};

use crate::mob::MobTypeRegistry;
use crate::script::ActionLibrary;

use super::area::{load_area, AreaData};
use super::discovery::{discover_packs, PackInfo};
use super::document::{ContentErrorCode, ContentLoadError};
use super::hashing::pack_fingerprint;
use super::manifest::{ContentManifest, ManifestSet};
use super::status::{load_hazard, load_liquid, load_status_type, Hazard, Liquid, StatusType};
use super::type_loader::{load_mob_type, MobTypeRefs};
use super::types::{ContentError, ContentLoadLevel, ContentLoadReport, ContentType};

/// An audio file. Decoding belongs to the audio backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sample {
    pub name: String,
    pub pack: String,
    pub path: PathBuf,
    pub byte_len: u64,
}

/// Every content registry, filled from the installed packs one content type
/// at a time. A type moves `Unloaded -> Basic|Full -> Unloaded`; loading a
/// loaded type or unloading an unloaded one is refused.
#[derive(Debug)]
pub struct ContentManager {
    game_data_dir: PathBuf,
    packs: Vec<PackInfo>,
    levels: BTreeMap<ContentType, ContentLoadLevel>,
    manifests: BTreeMap<ContentType, ManifestSet>,
    mob_types: MobTypeRegistry,
    status_types: BTreeMap<String, Arc<StatusType>>,
    hazards: BTreeMap<String, Hazard>,
    liquids: BTreeMap<String, Liquid>,
    samples: BTreeMap<String, Sample>,
    areas: BTreeMap<String, AreaData>,
    action_library: ActionLibrary,
}

impl ContentManager {
    pub fn new(game_data_dir: PathBuf) -> Self {
        Self {
            game_data_dir,
            packs: Vec::new(),
            levels: BTreeMap::new(),
            manifests: BTreeMap::new(),
            mob_types: MobTypeRegistry::default(),
            status_types: BTreeMap::new(),
            hazards: BTreeMap::new(),
            liquids: BTreeMap::new(),
            samples: BTreeMap::new(),
            areas: BTreeMap::new(),
            action_library: ActionLibrary::standard(),
        }
    }

    pub fn game_data_dir(&self) -> &Path {
        &self.game_data_dir
    }

    /// Packs found by the last manifest fill, `base` first.
    pub fn packs(&self) -> &[PackInfo] {
        &self.packs
    }

    pub fn load_level(&self, content_type: ContentType) -> ContentLoadLevel {
        self.levels.get(&content_type).copied().unwrap_or_default()
    }

    pub fn action_library(&self) -> &ActionLibrary {
        &self.action_library
    }

    pub fn manifest(&self, content_type: ContentType, internal_name: &str) -> Option<&ContentManifest> {
        self.manifests.get(&content_type)?.get(internal_name)
    }

    pub fn manifest_names(&self, content_type: ContentType) -> Vec<&str> {
        self.manifests
            .get(&content_type)
            .map(|set| set.names().collect())
            .unwrap_or_default()
    }

    /// Rediscovers packs and rebuilds the manifests of `types`, so loaders can
    /// check references against every requested type before any of them loads.
    pub fn fill_manifests(&mut self, types: &[ContentType]) -> Result<(), ContentError> {
        self.packs = discover_packs(&self.game_data_dir)?;
        for &content_type in types {
            let set = ManifestSet::fill(content_type, &self.packs);
            info!(
                content_type = content_type.label(),
                items = set.len(),
                "content_manifests_filled"
            );
            self.manifests.insert(content_type, set);
        }
        Ok(())
    }

    /// Loads `types` in dependency order. Every type must be unloaded; this is
    /// checked before anything changes. Broken items are reported and skipped.
    pub fn load_all(
        &mut self,
        types: &[ContentType],
        level: ContentLoadLevel,
    ) -> Result<ContentLoadReport, ContentError> {
        if level == ContentLoadLevel::Unloaded {
            error!("content_load_invalid_level");
            return Err(ContentError::InvalidLevel);
        }
        if let Some(&loaded) = types
            .iter()
            .find(|&&content_type| self.load_level(content_type) != ContentLoadLevel::Unloaded)
        {
            error!(content_type = loaded.label(), "content_already_loaded");
            return Err(ContentError::AlreadyLoaded(loaded));
        }

        let mut ordered = types.to_vec();
        ordered.sort();
        ordered.dedup();
        self.fill_manifests(&ordered)?;

        let mut report = ContentLoadReport {
            pack_fingerprint: pack_fingerprint(&self.packs),
            ..ContentLoadReport::default()
        };
        for &content_type in &ordered {
            let errors_before = report.errors.len();
            let loaded = self.load_type(content_type, level, &mut report);
            self.levels.insert(content_type, level);
            report.loaded.insert(content_type, loaded);
            info!(
                content_type = content_type.label(),
                level = ?level,
                loaded,
                errors = report.errors.len() - errors_before,
                "content_type_loaded"
            );
        }

        info!(
            packs = self.packs.len(),
            loaded = report.total_loaded(),
            errors = report.errors.len(),
            packs_hash = %report.pack_fingerprint,
            "content_load_summary"
        );
        Ok(report)
    }

    /// Clears `types`. Every type must be loaded; this is checked first.
    pub fn unload_all(&mut self, types: &[ContentType]) -> Result<(), ContentError> {
        if let Some(&unloaded) = types
            .iter()
            .find(|&&content_type| self.load_level(content_type) == ContentLoadLevel::Unloaded)
        {
            error!(content_type = unloaded.label(), "content_not_loaded");
            return Err(ContentError::NotLoaded(unloaded));
        }

        for &content_type in types {
            match content_type {
                ContentType::Area => self.areas.clear(),
                ContentType::Hazard => self.hazards.clear(),
                ContentType::Liquid => self.liquids.clear(),
                ContentType::MobType => self.mob_types.clear(),
                ContentType::Sample => self.samples.clear(),
                ContentType::StatusType => self.status_types.clear(),
            }
            self.manifests.remove(&content_type);
            self.levels.remove(&content_type);
            info!(content_type = content_type.label(), "content_type_unloaded");
        }
        Ok(())
    }

    fn load_type(
        &mut self,
        content_type: ContentType,
        level: ContentLoadLevel,
        report: &mut ContentLoadReport,
    ) -> usize {
        let manifests = self
            .manifests
            .get(&content_type)
            .map(|set| set.iter().cloned().collect::<Vec<_>>())
            .unwrap_or_default();
        let known = |ty: ContentType, name: &str| {
            self.manifests
                .get(&ty)
                .is_some_and(|set| set.contains(name))
        };

        match content_type {
            ContentType::Liquid => {
                let items = load_items(&manifests, report, |m| {
                    load_liquid(&m.pack, &m.internal_name, &m.path)
                });
                let count = items.len();
                self.liquids = items
                    .into_iter()
                    .map(|liquid| (liquid.name.clone(), liquid))
                    .collect();
                count
            }
            ContentType::StatusType => {
                let items = load_items(&manifests, report, |m| {
                    load_status_type(&m.pack, &m.internal_name, &m.path)
                });
                let count = items.len();
                self.status_types = items
                    .into_iter()
                    .map(|status| (status.name.clone(), Arc::new(status)))
                    .collect();
                count
            }
            ContentType::Hazard => {
                let known_liquid = |name: &str| known(ContentType::Liquid, name);
                let items = load_items(&manifests, report, |m| {
                    let hazard = load_hazard(&m.pack, &m.internal_name, &m.path, &known_liquid)?;
                    match hazard
                        .effects
                        .iter()
                        .find(|effect| !known(ContentType::StatusType, effect))
                    {
                        Some(effect) => Err(ContentLoadError::new(
                            ContentErrorCode::UnknownReference,
                            format!("unknown status type '{effect}'"),
                            &m.pack,
                            &m.path,
                        )),
                        None => Ok(hazard),
                    }
                });
                let count = items.len();
                self.hazards = items
                    .into_iter()
                    .map(|hazard| (hazard.name.clone(), hazard))
                    .collect();
                count
            }
            ContentType::Sample => {
                let items = load_items(&manifests, report, |m| {
                    let metadata = fs::metadata(&m.path).map_err(|source| {
                        ContentLoadError::new(
                            ContentErrorCode::ReadFile,
                            format!("failed to read sample: {source}"),
                            &m.pack,
                            &m.path,
                        )
                    })?;
                    Ok(Sample {
                        name: m.internal_name.clone(),
                        pack: m.pack.clone(),
                        path: m.path.clone(),
                        byte_len: metadata.len(),
                    })
                });
                let count = items.len();
                self.samples = items
                    .into_iter()
                    .map(|sample| (sample.name.clone(), sample))
                    .collect();
                count
            }
            ContentType::MobType => {
                let status_types = self.status_type_names();
                let is_mob_type = |name: &str| known(ContentType::MobType, name);
                let is_sample = |name: &str| known(ContentType::Sample, name);
                let is_hazard = |name: &str| known(ContentType::Hazard, name);
                let refs = MobTypeRefs {
                    library: &self.action_library,
                    status_types: &status_types,
                    is_mob_type: &is_mob_type,
                    is_sample: &is_sample,
                    is_hazard: &is_hazard,
                };
                let items = load_items(&manifests, report, |m| load_mob_type(m, level, &refs));
                let count = items.len();
                self.mob_types.clear();
                for mob_type in items {
                    self.mob_types.register_type(mob_type);
                }
                count
            }
            ContentType::Area => {
                let known_hazard = |name: &str| known(ContentType::Hazard, name);
                let items = load_items(&manifests, report, |m| {
                    load_area(&m.pack, &m.internal_name, &m.path, level, &known_hazard)
                });
                let count = items.len();
                self.areas = items
                    .into_iter()
                    .map(|area| (area.internal_name.clone(), area))
                    .collect();
                count
            }
        }
    }

    pub fn mob_types(&self) -> &MobTypeRegistry {
        &self.mob_types
    }

    pub fn status_type(&self, name: &str) -> Option<&Arc<StatusType>> {
        self.status_types.get(name)
    }

    /// Names scripts may refer to: loaded status types plus any still only in
    /// the manifests.
    pub fn status_type_names(&self) -> BTreeSet<String> {
        let mut names = self.status_types.keys().cloned().collect::<BTreeSet<_>>();
        if let Some(set) = self.manifests.get(&ContentType::StatusType) {
            names.extend(set.names().map(str::to_string));
        }
        names
    }

    pub fn hazard(&self, name: &str) -> Option<&Hazard> {
        self.hazards.get(name)
    }

    pub fn liquid(&self, name: &str) -> Option<&Liquid> {
        self.liquids.get(name)
    }

    pub fn sample(&self, name: &str) -> Option<&Sample> {
        self.samples.get(name)
    }

    pub fn area(&self, name: &str) -> Option<&AreaData> {
        self.areas.get(name)
    }

    pub fn area_names(&self) -> Vec<&str> {
        self.areas.keys().map(String::as_str).collect()
    }

    #[cfg(test)]
    pub(crate) fn insert_status_type(&mut self, status_type: StatusType) {
        self.status_types
            .insert(status_type.name.clone(), Arc::new(status_type));
    }

    #[cfg(test)]
    pub(crate) fn insert_hazard(&mut self, hazard: Hazard) {
        self.hazards.insert(hazard.name.clone(), hazard);
    }

    #[cfg(test)]
    pub(crate) fn insert_mob_type(
        &mut self,
        mob_type: crate::mob::MobType,
    ) -> Arc<crate::mob::MobType> {
        self.mob_types.register_type(mob_type)
    }
}

/// Runs `load` over every manifest, logging and recording the failures.
fn load_items<T>(
    manifests: &[ContentManifest],
    report: &mut ContentLoadReport,
    mut load: impl FnMut(&ContentManifest) -> Result<T, ContentLoadError>,
) -> Vec<T> {
    let mut items = Vec::with_capacity(manifests.len());
    for manifest in manifests {
        match load(manifest) {
            Ok(item) => items.push(item),
            Err(load_error) => {
                error!(
                    pack = %load_error.pack,
                    item = %manifest.internal_name,
                    error = %load_error,
                    "content_load_error"
                );
                report.errors.push(load_error);
            }
        }
    }
    items
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;
    use crate::sim::test_support::{write_pack_file, write_test_game_data};

    fn loaded(temp: &TempDir, level: ContentLoadLevel) -> (ContentManager, ContentLoadReport) {
        let mut content = ContentManager::new(temp.path().to_path_buf());
        let report = content.load_all(&ContentType::ALL, level).expect("load");
        (content, report)
    }

    #[test]
    fn full_load_fills_every_registry() {
        let temp = TempDir::new().expect("temp");
        write_test_game_data(temp.path());
        let (content, report) = loaded(&temp, ContentLoadLevel::Full);

        assert!(report.errors.is_empty(), "{}", report.render_human_readable());
        assert_eq!(report.loaded_count(ContentType::Liquid), 1);
        assert_eq!(report.loaded_count(ContentType::Sample), 1);
        assert_eq!(report.pack_fingerprint.len(), 64);
        assert!(content.hazard("water").is_some());
        assert!(content.status_type("soaked").is_some());
        assert_eq!(content.sample("bulborb_roar").map(|s| s.byte_len), Some(4));
        let area = content.area("test_field").expect("area");
        assert!(area.geometry.is_some());
        let bulborb = content.mob_types().find("enemies/red_bulborb").expect("bulborb");
        assert!(bulborb.fsm.first_state.is_some());
        assert_eq!(content.load_level(ContentType::MobType), ContentLoadLevel::Full);
    }

    #[test]
    fn overriding_pack_replaces_the_base_type() {
        let temp = TempDir::new().expect("temp");
        write_test_game_data(temp.path());
        write_pack_file(
            temp.path(),
            "zz_bulborbs",
            "mob_types/enemies/red_bulborb/data.xml",
            "<MobType><name>Giant Red Bulborb</name><maxHealth>2000</maxHealth></MobType>",
        );
        let (content, report) = loaded(&temp, ContentLoadLevel::Full);

        assert!(report.errors.is_empty(), "{}", report.render_human_readable());
        let bulborbs = content
            .mob_types()
            .iter()
            .filter(|mob_type| mob_type.internal_name == "enemies/red_bulborb")
            .collect::<Vec<_>>();
        assert_eq!(bulborbs.len(), 1);
        assert_eq!(bulborbs[0].pack, "zz_bulborbs");
        assert_eq!(bulborbs[0].name, "Giant Red Bulborb");
        assert_eq!(bulborbs[0].max_health, 2000.0);
        assert_eq!(
            content
                .manifest(ContentType::MobType, "enemies/red_bulborb")
                .map(|m| m.pack.as_str()),
            Some("zz_bulborbs")
        );
    }

    #[test]
    fn loading_twice_is_refused_without_changes() {
        let temp = TempDir::new().expect("temp");
        write_test_game_data(temp.path());
        let (mut content, _) = loaded(&temp, ContentLoadLevel::Full);
        let before = content.mob_types().len();

        let err = content
            .load_all(&[ContentType::Area, ContentType::MobType], ContentLoadLevel::Basic)
            .expect_err("double load");
        assert!(matches!(err, ContentError::AlreadyLoaded(ContentType::Area)));
        assert_eq!(content.mob_types().len(), before);
        assert_eq!(content.load_level(ContentType::Area), ContentLoadLevel::Full);

        let err = content
            .load_all(&[ContentType::Area], ContentLoadLevel::Unloaded)
            .expect_err("unloaded level");
        assert!(matches!(err, ContentError::InvalidLevel));
    }

    #[test]
    fn unloading_twice_is_refused() {
        let temp = TempDir::new().expect("temp");
        write_test_game_data(temp.path());
        let (mut content, _) = loaded(&temp, ContentLoadLevel::Full);

        content
            .unload_all(&[ContentType::Area, ContentType::MobType])
            .expect("unload");
        assert!(content.mob_types().is_empty());
        assert!(content.area("test_field").is_none());
        assert!(content.manifest(ContentType::MobType, "enemies/red_bulborb").is_none());

        let err = content
            .unload_all(&[ContentType::MobType])
            .expect_err("double unload");
        assert!(matches!(err, ContentError::NotLoaded(ContentType::MobType)));

        content
            .load_all(&[ContentType::MobType], ContentLoadLevel::Basic)
            .expect("reload");
        let bulborb = content.mob_types().find("enemies/red_bulborb").expect("bulborb");
        assert!(bulborb.fsm.is_empty());
    }

    #[test]
    fn broken_items_are_reported_and_skipped() {
        let temp = TempDir::new().expect("temp");
        write_test_game_data(temp.path());
        write_pack_file(
            temp.path(),
            "base",
            "mob_types/enemies/broken/data.xml",
            "<MobType><name>Broken</name>",
        );
        write_pack_file(
            temp.path(),
            "base",
            "hazards/lava.xml",
            "<Hazard><effects><effect>melting</effect></effects></Hazard>",
        );
        let (content, report) = loaded(&temp, ContentLoadLevel::Full);

        assert_eq!(report.errors.len(), 2);
        let codes = report.errors.iter().map(|e| e.code).collect::<Vec<_>>();
        assert!(codes.contains(&ContentErrorCode::XmlMalformed));
        assert!(codes.contains(&ContentErrorCode::UnknownReference));
        assert!(content.mob_types().find("enemies/broken").is_none());
        assert!(content.mob_types().find("enemies/red_bulborb").is_some());
        assert!(content.hazard("lava").is_none());
        assert!(content.hazard("water").is_some());
    }
}
