mod area;
mod discovery;
pub(crate) mod document;
mod hashing;
mod manager;
mod manifest;
mod mission;
mod pack;
mod status;
mod type_loader;
mod types;

pub use area::{AreaData, AreaMobPlacement, DEFAULT_TILE_SIZE};
pub use discovery::{PackInfo, PackMetadata, BASE_PACK_NAME, PACK_METADATA_FILE};
pub use document::{ContentErrorCode, ContentLoadError, SourceLocation};
pub use manager::{ContentManager, Sample};
pub use manifest::{ContentManifest, AREA_FILE, MOB_DATA_FILE, MOB_SCRIPT_FILE};
pub use mission::{
    ExitRegion, MedalRequirements, MissionData, MissionFailCondition, MissionGoal,
    MissionGrading, MissionGradingMode, MissionMedal, MissionPointCriterion,
};
pub use pack::create_pack;
pub use status::{Hazard, Liquid, StatusType};
pub use types::{ContentError, ContentLoadLevel, ContentLoadReport, ContentType};
