use std::collections::BTreeMap;
use std::path::Path;

use roxmltree::Node;

use crate::geometry::Vec2;
use crate::world::{AreaGeometry, Tilemap};

use super::document::{parse_xml, read_text, ContentErrorCode, ContentLoadError, XmlSource};
use super::mission::{parse_mission, MissionData};
use super::types::ContentLoadLevel;

pub const DEFAULT_TILE_SIZE: f32 = 32.0;

/// A mob placed in an area file. Angles are stored in radians.
#[derive(Debug, Clone, PartialEq)]
pub struct AreaMobPlacement {
    pub mob_type: String,
    pub pos: Vec2,
    pub angle: f32,
    pub vars: String,
}

#[derive(Debug, Clone)]
pub struct AreaData {
    pub internal_name: String,
    pub name: String,
    pub pack: String,
    /// `None` when loaded at the basic level.
    pub geometry: Option<AreaGeometry>,
    pub mobs: Vec<AreaMobPlacement>,
    pub day_start_minutes: f32,
    /// In-game minutes per real minute.
    pub day_speed: f32,
    pub mission: Option<MissionData>,
}

pub(crate) fn load_area(
    pack: &str,
    internal_name: &str,
    path: &Path,
    level: ContentLoadLevel,
    known_hazard: &dyn Fn(&str) -> bool,
) -> Result<AreaData, ContentLoadError> {
    let raw = read_text(pack, path)?;
    let doc = parse_xml(pack, path, &raw)?;
    let source = XmlSource {
        pack,
        path,
        doc: &doc,
    };
    let root = source.expect_root("Area")?;

    let mut area = AreaData {
        internal_name: internal_name.to_string(),
        name: internal_name.to_string(),
        pack: pack.to_string(),
        geometry: None,
        mobs: Vec::new(),
        day_start_minutes: 0.0,
        day_speed: 0.0,
        mission: None,
    };
    let mut tiles = None;
    let mut mission = None;
    let mut heights = None;
    let mut hazards = BTreeMap::new();

    for field in source.unique_fields(root)? {
        match field.tag_name().name() {
            "name" => area.name = source.required_text(field)?,
            "dayStartMinutes" => area.day_start_minutes = source.parse_non_negative(field)?,
            "daySpeed" => area.day_speed = source.parse_non_negative(field)?,
            _ if level == ContentLoadLevel::Basic => {}
            "tiles" => tiles = Some((field, parse_tile_rows(&source, field)?)),
            "tileHeights" => heights = Some(parse_height_rows(&source, field)?),
            "tileHazards" => hazards = parse_tile_hazards(&source, field, known_hazard)?,
            "mobs" => area.mobs = parse_mobs(&source, field)?,
            "mission" => mission = Some(field),
            _ => return Err(source.unknown_field(field)),
        }
    }
    if let Some(node) = mission {
        area.mission = Some(parse_mission(&source, node, area.mobs.len())?);
    }

    if level == ContentLoadLevel::Full {
        let Some((tiles_node, rows)) = tiles else {
            return Err(source.error_at(
                ContentErrorCode::MissingField,
                "area requires a <tiles> field".to_string(),
                root,
            ));
        };
        let width = source.required_attr(tiles_node, "width")?;
        let height = source.required_attr(tiles_node, "height")?;
        let (Ok(width), Ok(height)) = (width.parse::<u32>(), height.parse::<u32>()) else {
            return Err(source.error_at(
                ContentErrorCode::InvalidValue,
                "tile width and height must be whole numbers".to_string(),
                tiles_node,
            ));
        };
        let origin = Vec2::new(
            source.attr_f32(tiles_node, "originX", 0.0)?,
            source.attr_f32(tiles_node, "originY", 0.0)?,
        );
        let tile_size = source.attr_f32(tiles_node, "tileSize", DEFAULT_TILE_SIZE)?;
        let geometry = Tilemap::new(width, height, origin, rows)
            .and_then(|tilemap| AreaGeometry::new(tilemap, tile_size, heights, hazards))
            .map_err(|error| {
                source.error_at(ContentErrorCode::InvalidValue, error.to_string(), tiles_node)
            })?;
        area.geometry = Some(geometry);
    }

    Ok(area)
}

fn parse_tile_rows(
    source: &XmlSource<'_, '_>,
    node: Node<'_, '_>,
) -> Result<Vec<u16>, ContentLoadError> {
    parse_rows(source, node, |token| token.parse::<u16>().ok())
}

fn parse_height_rows(
    source: &XmlSource<'_, '_>,
    node: Node<'_, '_>,
) -> Result<Vec<f32>, ContentLoadError> {
    parse_rows(source, node, |token| {
        token.parse::<f32>().ok().filter(|value| value.is_finite())
    })
}

/// `<row>` children of whitespace-separated values, first row at the origin.
fn parse_rows<T>(
    source: &XmlSource<'_, '_>,
    node: Node<'_, '_>,
    parse: impl Fn(&str) -> Option<T>,
) -> Result<Vec<T>, ContentLoadError> {
    let mut values = Vec::new();
    for row in node.children().filter(|child| child.is_element()) {
        if row.tag_name().name() != "row" {
            return Err(source.unknown_field(row));
        }
        for token in source.text(row).split_whitespace() {
            let value = parse(token).ok_or_else(|| {
                source.error_at(
                    ContentErrorCode::InvalidValue,
                    format!("'{token}' is not a valid cell value"),
                    row,
                )
            })?;
            values.push(value);
        }
    }
    Ok(values)
}

fn parse_tile_hazards(
    source: &XmlSource<'_, '_>,
    node: Node<'_, '_>,
    known_hazard: &dyn Fn(&str) -> bool,
) -> Result<BTreeMap<u16, String>, ContentLoadError> {
    let mut hazards = BTreeMap::new();
    for child in node.children().filter(|child| child.is_element()) {
        if child.tag_name().name() != "hazard" {
            return Err(source.unknown_field(child));
        }
        let tile = source.required_attr(child, "tile")?;
        let Ok(tile) = tile.parse::<u16>() else {
            return Err(source.error_at(
                ContentErrorCode::InvalidValue,
                format!("hazard tile id '{tile}' is not valid"),
                child,
            ));
        };
        let hazard = source.required_text(child)?;
        if !known_hazard(&hazard) {
            return Err(source.error_at(
                ContentErrorCode::UnknownReference,
                format!("unknown hazard '{hazard}'"),
                child,
            ));
        }
        hazards.insert(tile, hazard);
    }
    Ok(hazards)
}

fn parse_mobs(
    source: &XmlSource<'_, '_>,
    node: Node<'_, '_>,
) -> Result<Vec<AreaMobPlacement>, ContentLoadError> {
    let mut mobs = Vec::new();
    for child in node.children().filter(|child| child.is_element()) {
        if child.tag_name().name() != "mob" {
            return Err(source.unknown_field(child));
        }
        mobs.push(AreaMobPlacement {
            mob_type: source.required_attr(child, "type")?,
            pos: Vec2::new(
                source.attr_f32(child, "x", 0.0)?,
                source.attr_f32(child, "y", 0.0)?,
            ),
            angle: source.attr_f32(child, "angle", 0.0)?.to_radians(),
            vars: child.attribute("vars").unwrap_or_default().to_string(),
        });
    }
    Ok(mobs)
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::TempDir;

    use super::*;
    use crate::content::MissionGoal;
    use crate::world::WorldGeometry;

    const AREA: &str = r#"<Area>
        <name>Test Field</name>
        <dayStartMinutes>420</dayStartMinutes>
        <daySpeed>2</daySpeed>
        <tiles width="3" height="2" tileSize="10">
            <row>0 0 5</row>
            <row>2 0 0</row>
        </tiles>
        <tileHazards><hazard tile="5">water</hazard></tileHazards>
        <mobs>
            <mob type="enemies/red_bulborb" x="15" y="5" angle="90" vars="sleep=true"/>
        </mobs>
        <mission>
            <goal>battle_enemies</goal>
            <goalAllMobs>false</goalAllMobs>
            <goalMobs><mob>0</mob></goalMobs>
            <failConditions><timeLimit>120</timeLimit></failConditions>
        </mission>
    </Area>"#;

    fn write_area(temp: &TempDir, content: &str) -> std::path::PathBuf {
        let path = temp.path().join("area.xml");
        fs::write(&path, content).expect("write");
        path
    }

    #[test]
    fn full_area_builds_geometry_and_mobs() {
        let temp = TempDir::new().expect("temp");
        let path = write_area(&temp, AREA);
        let area = load_area("base", "test_field", &path, ContentLoadLevel::Full, &|name| {
            name == "water"
        })
        .expect("load");
        assert_eq!(area.name, "Test Field");
        assert_eq!(area.day_start_minutes, 420.0);
        let geometry = area.geometry.expect("geometry");
        assert_eq!(geometry.hazard_at(Vec2::new(25.0, 5.0)), Some("water"));
        assert_eq!(geometry.hazard_at(Vec2::new(5.0, 5.0)), None);
        assert_eq!(area.mobs.len(), 1);
        assert!((area.mobs[0].angle - std::f32::consts::FRAC_PI_2).abs() < 1.0e-5);
        assert_eq!(area.mobs[0].vars, "sleep=true");
        let mission = area.mission.expect("mission");
        assert_eq!(mission.goal, MissionGoal::BattleEnemies);
        assert!(mission.goal_mobs.contains(&0));
        assert_eq!(mission.time_limit(), Some(120));
    }

    #[test]
    fn mission_goal_mobs_must_be_placed() {
        let temp = TempDir::new().expect("temp");
        let path = write_area(&temp, &AREA.replace("<mob>0</mob>", "<mob>1</mob>"));
        let err = load_area("base", "test_field", &path, ContentLoadLevel::Full, &|name| {
            name == "water"
        })
        .expect_err("goal mob");
        assert_eq!(err.code, ContentErrorCode::InvalidValue);
    }

    #[test]
    fn basic_level_keeps_only_metadata() {
        let temp = TempDir::new().expect("temp");
        let path = write_area(&temp, AREA);
        let area = load_area("base", "test_field", &path, ContentLoadLevel::Basic, &|_| false)
            .expect("load");
        assert_eq!(area.name, "Test Field");
        assert!(area.geometry.is_none());
        assert!(area.mobs.is_empty());
        assert!(area.mission.is_none());
    }

    #[test]
    fn tile_count_must_match_dimensions() {
        let temp = TempDir::new().expect("temp");
        let path = write_area(
            &temp,
            r#"<Area><tiles width="3" height="2"><row>0 0</row></tiles></Area>"#,
        );
        let err = load_area("base", "broken", &path, ContentLoadLevel::Full, &|_| true)
            .expect_err("mismatch");
        assert_eq!(err.code, ContentErrorCode::InvalidValue);
    }

    #[test]
    fn unknown_hazard_reference_fails() {
        let temp = TempDir::new().expect("temp");
        let path = write_area(&temp, AREA);
        let err = load_area("base", "test_field", &path, ContentLoadLevel::Full, &|_| false)
            .expect_err("hazard");
        assert_eq!(err.code, ContentErrorCode::UnknownReference);
    }
}
