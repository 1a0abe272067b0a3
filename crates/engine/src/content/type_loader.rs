//! Mob type loading. `data.xml` holds stats, named lists and category
//! fields; at the full level the optional `script.xml` is compiled and the
//! generated states are appended before state names are resolved.

use std::collections::BTreeSet;
use std::path::Path;

use roxmltree::Node;

use crate::fsm::{load_script_file, FsmError};
use crate::geometry::Vec2;
use crate::mob::{
    carrying_states, idle_waiting_state, AnimationDef, CategoryProperties, DropConsumer,
    FrameSignal, MobCategory, MobReach, MobTeam, MobType, SoundDef, SpawnDef, IDLE_WAITING_STATE,
};
use crate::script::{ActionLibrary, ScriptLoadContext};

use super::document::{parse_xml, read_text, ContentErrorCode, ContentLoadError, XmlSource};
use super::manifest::{ContentManifest, MOB_DATA_FILE, MOB_SCRIPT_FILE};
use super::types::ContentLoadLevel;

/// Everything a mob type may refer to outside its own folder.
pub(crate) struct MobTypeRefs<'a> {
    pub library: &'a ActionLibrary,
    pub status_types: &'a BTreeSet<String>,
    pub is_mob_type: &'a dyn Fn(&str) -> bool,
    pub is_sample: &'a dyn Fn(&str) -> bool,
    pub is_hazard: &'a dyn Fn(&str) -> bool,
}

pub(crate) fn load_mob_type(
    manifest: &ContentManifest,
    level: ContentLoadLevel,
    refs: &MobTypeRefs<'_>,
) -> Result<MobType, ContentLoadError> {
    let pack = manifest.pack.as_str();
    let Some(category) = manifest
        .internal_name
        .split_once('/')
        .and_then(|(folder, _)| MobCategory::from_folder(folder))
    else {
        return Err(ContentLoadError::new(
            ContentErrorCode::InvalidValue,
            format!("'{}' is not in a mob category folder", manifest.internal_name),
            pack,
            &manifest.path,
        ));
    };

    let mut mob_type = MobType::blank(&manifest.internal_name, category);
    mob_type.pack = manifest.pack.clone();
    if category.is_carriable_by_default() {
        mob_type.max_carriers = 1;
    }
    load_data(&mut mob_type, pack, &manifest.path.join(MOB_DATA_FILE), refs)?;

    if level == ContentLoadLevel::Full {
        build_fsm(&mut mob_type, pack, &manifest.path, refs)?;
    }
    Ok(mob_type)
}

fn load_data(
    mob_type: &mut MobType,
    pack: &str,
    path: &Path,
    refs: &MobTypeRefs<'_>,
) -> Result<(), ContentLoadError> {
    let raw = read_text(pack, path)?;
    let doc = parse_xml(pack, path, &raw)?;
    let source = XmlSource {
        pack,
        path,
        doc: &doc,
    };
    let root = source.expect_root("MobType")?;

    for field in source.unique_fields(root)? {
        match field.tag_name().name() {
            "name" => mob_type.name = source.required_text(field)?,
            "alwaysActive" => mob_type.always_active = source.parse_bool(field)?,
            "maxCarriers" => mob_type.max_carriers = source.parse_field::<usize>(field)?,
            "maxHealth" => mob_type.max_health = source.parse_non_negative(field)?,
            "healthRegen" => mob_type.health_regen = source.parse_f32(field)?,
            "moveSpeed" => mob_type.move_speed = source.parse_non_negative(field)?,
            "rotationSpeed" => {
                mob_type.rotation_speed = source.parse_non_negative(field)?.to_radians()
            }
            "territoryRadius" => mob_type.territory_radius = source.parse_non_negative(field)?,
            "radius" => mob_type.radius = source.parse_non_negative(field)?,
            "height" => mob_type.height = source.parse_non_negative(field)?,
            "weight" => mob_type.weight = source.parse_non_negative(field)?,
            "pushes" => mob_type.pushes = source.parse_bool(field)?,
            "pushable" => mob_type.pushable = source.parse_bool(field)?,
            "showHealth" => mob_type.show_health = source.parse_bool(field)?,
            "castsShadow" => mob_type.casts_shadow = source.parse_bool(field)?,
            "itchDamage" => mob_type.itch_damage = source.parse_non_negative(field)?,
            "itchTime" => mob_type.itch_time = source.parse_non_negative(field)?,
            "team" => {
                let name = source.required_text(field)?;
                mob_type.team = MobTeam::parse(&name).ok_or_else(|| {
                    source.error_at(
                        ContentErrorCode::InvalidValue,
                        format!("unknown team '{name}'"),
                        field,
                    )
                })?;
            }
            "reaches" => mob_type.reaches = parse_reaches(&source, field)?,
            "animations" => mob_type.animations = parse_animations(&source, field)?,
            "bodyParts" => mob_type.body_parts = source.text_list(field, "part")?,
            "sounds" => mob_type.sounds = parse_sounds(&source, field, refs)?,
            "spawns" => mob_type.spawns = parse_spawns(&source, field, refs)?,
            "resistances" => {
                let hazards = source.text_list(field, "hazard")?;
                if let Some(unknown) = hazards.iter().find(|name| !(refs.is_hazard)(name)) {
                    return Err(source.error_at(
                        ContentErrorCode::UnknownReference,
                        format!("unknown hazard '{unknown}'"),
                        field,
                    ));
                }
                mob_type.resistances = hazards;
            }
            _ => {
                if !parse_category_field(&source, &mut mob_type.properties, field, refs)? {
                    return Err(source.unknown_field(field));
                }
            }
        }
    }
    Ok(())
}

/// Returns false when `field` is not a property of the type's category.
fn parse_category_field(
    source: &XmlSource<'_, '_>,
    properties: &mut CategoryProperties,
    field: Node<'_, '_>,
    refs: &MobTypeRefs<'_>,
) -> Result<bool, ContentLoadError> {
    let name = field.tag_name().name();
    match (properties, name) {
        (CategoryProperties::Pikmin { carry_strength }, "carryStrength") => {
            *carry_strength = source.parse_non_negative(field)?
        }
        (CategoryProperties::Enemy { pikmin_seeds, .. }, "pikminSeeds") => {
            *pikmin_seeds = source.parse_field(field)?
        }
        (CategoryProperties::Enemy { drops_corpse, .. }, "dropsCorpse") => {
            *drops_corpse = source.parse_bool(field)?
        }
        (CategoryProperties::Enemy { points, .. }, "points")
        | (CategoryProperties::Treasure { points }, "points") => {
            *points = source.parse_field(field)?
        }
        (CategoryProperties::Pellet { pikmin_type, .. }, "pikminType") => {
            *pikmin_type = pikmin_reference(source, field, refs)?
        }
        (CategoryProperties::Pellet { number, .. }, "number") => {
            *number = source.parse_field(field)?
        }
        (CategoryProperties::Pellet { match_seeds, .. }, "matchSeeds") => {
            *match_seeds = source.parse_field(field)?
        }
        (CategoryProperties::Pellet { non_match_seeds, .. }, "nonMatchSeeds") => {
            *non_match_seeds = source.parse_field(field)?
        }
        (CategoryProperties::Onion { pikmin_types }, "pikminTypes") => {
            let mut types = Vec::new();
            for child in field.children().filter(|child| child.is_element()) {
                if child.tag_name().name() != "type" {
                    return Err(source.unknown_field(child));
                }
                types.push(pikmin_reference(source, child, refs)?);
            }
            *pikmin_types = types;
        }
        (CategoryProperties::Drop { total_doses, .. }, "totalDoses") => {
            *total_doses = source.parse_field(field)?
        }
        (CategoryProperties::Drop { consumer, .. }, "consumer") => {
            let name = source.required_text(field)?;
            *consumer = DropConsumer::from_name(&name).ok_or_else(|| {
                source.error_at(
                    ContentErrorCode::InvalidValue,
                    format!("unknown drop consumer '{name}'"),
                    field,
                )
            })?;
        }
        (CategoryProperties::Drop { health_change, .. }, "healthIncrease") => {
            *health_change = source.parse_f32(field)?
        }
        (CategoryProperties::Drop { status_to_give, .. }, "statusToGive") => {
            let name = source.required_text(field)?;
            if !refs.status_types.contains(&name) {
                return Err(source.error_at(
                    ContentErrorCode::UnknownReference,
                    format!("unknown status type '{name}'"),
                    field,
                ));
            }
            *status_to_give = Some(name);
        }
        _ => return Ok(false),
    }
    Ok(true)
}

fn pikmin_reference(
    source: &XmlSource<'_, '_>,
    node: Node<'_, '_>,
    refs: &MobTypeRefs<'_>,
) -> Result<String, ContentLoadError> {
    let reference = source.required_text(node)?;
    let is_pikmin = reference
        .split_once('/')
        .is_some_and(|(folder, _)| folder == MobCategory::Pikmin.folder_name());
    if !is_pikmin || !(refs.is_mob_type)(&reference) {
        return Err(source.error_at(
            ContentErrorCode::UnknownReference,
            format!("unknown Pikmin type '{reference}'"),
            node,
        ));
    }
    Ok(reference)
}

/// Each element child of `node` must be `<item>`.
fn items<'n, 'input>(
    source: &XmlSource<'_, 'input>,
    node: Node<'n, 'input>,
    item: &str,
) -> Result<Vec<Node<'n, 'input>>, ContentLoadError> {
    let mut nodes = Vec::new();
    for child in node.children().filter(|child| child.is_element()) {
        if child.tag_name().name() != item {
            return Err(source.unknown_field(child));
        }
        nodes.push(child);
    }
    Ok(nodes)
}

fn parse_reaches(
    source: &XmlSource<'_, '_>,
    node: Node<'_, '_>,
) -> Result<Vec<MobReach>, ContentLoadError> {
    items(source, node, "reach")?
        .into_iter()
        .map(|reach| {
            Ok::<_, ContentLoadError>(MobReach {
                name: source.required_attr(reach, "name")?,
                radius_1: source.attr_f32(reach, "radius1", 0.0)?,
                angle_1: source.attr_f32(reach, "angle1", 0.0)?.to_radians(),
                radius_2: source.attr_f32(reach, "radius2", 0.0)?,
                angle_2: source.attr_f32(reach, "angle2", 0.0)?.to_radians(),
            })
        })
        .collect()
}

fn parse_animations(
    source: &XmlSource<'_, '_>,
    node: Node<'_, '_>,
) -> Result<Vec<AnimationDef>, ContentLoadError> {
    let mut animations = Vec::new();
    for animation in items(source, node, "animation")? {
        let mut signals = Vec::new();
        for signal in items(source, animation, "signal")? {
            let value = source.required_attr(signal, "value")?;
            let Ok(value) = value.parse::<u32>() else {
                return Err(source.error_at(
                    ContentErrorCode::InvalidValue,
                    format!("signal value '{value}' must be a whole number"),
                    signal,
                ));
            };
            signals.push(FrameSignal {
                time: source.attr_f32(signal, "time", 0.0)?,
                signal: value,
            });
        }
        signals.sort_by(|a, b| a.time.total_cmp(&b.time));
        animations.push(AnimationDef {
            name: source.required_attr(animation, "name")?,
            duration: source.attr_f32(animation, "duration", 1.0)?.max(0.0),
            loops: source.attr_bool(animation, "loops", true)?,
            signals,
        });
    }
    Ok(animations)
}

fn parse_sounds(
    source: &XmlSource<'_, '_>,
    node: Node<'_, '_>,
    refs: &MobTypeRefs<'_>,
) -> Result<Vec<SoundDef>, ContentLoadError> {
    let mut sounds = Vec::new();
    for sound in items(source, node, "sound")? {
        let sample = source.required_attr(sound, "sample")?;
        if !(refs.is_sample)(&sample) {
            return Err(source.error_at(
                ContentErrorCode::UnknownReference,
                format!("unknown sample '{sample}'"),
                sound,
            ));
        }
        sounds.push(SoundDef {
            name: source.required_attr(sound, "name")?,
            sample,
        });
    }
    Ok(sounds)
}

fn parse_spawns(
    source: &XmlSource<'_, '_>,
    node: Node<'_, '_>,
    refs: &MobTypeRefs<'_>,
) -> Result<Vec<SpawnDef>, ContentLoadError> {
    let mut spawns = Vec::new();
    for spawn in items(source, node, "spawn")? {
        let mob_type = source.required_attr(spawn, "type")?;
        if !(refs.is_mob_type)(&mob_type) {
            return Err(source.error_at(
                ContentErrorCode::UnknownReference,
                format!("unknown mob type '{mob_type}'"),
                spawn,
            ));
        }
        spawns.push(SpawnDef {
            name: source.required_attr(spawn, "name")?,
            mob_type,
            relative: source.attr_bool(spawn, "relative", true)?,
            coords: Vec2::new(
                source.attr_f32(spawn, "x", 0.0)?,
                source.attr_f32(spawn, "y", 0.0)?,
            ),
            z: source.attr_f32(spawn, "z", 0.0)?,
            angle: source.attr_f32(spawn, "angle", 0.0)?.to_radians(),
            vars: spawn.attribute("vars").unwrap_or_default().to_string(),
            link_object_to_spawn: source.attr_bool(spawn, "linkObjectToSpawn", false)?,
            link_spawn_to_object: source.attr_bool(spawn, "linkSpawnToObject", false)?,
            momentum: source.attr_f32(spawn, "momentum", 0.0)?.max(0.0),
        });
    }
    Ok(spawns)
}

/// Authored states first, then the generated ones, then name resolution.
/// Scriptless types outside the idle categories keep an empty machine.
fn build_fsm(
    mob_type: &mut MobType,
    pack: &str,
    type_dir: &Path,
    refs: &MobTypeRefs<'_>,
) -> Result<(), ContentLoadError> {
    let script_path = type_dir.join(MOB_SCRIPT_FILE);
    let (states, first_state) = if script_path.is_file() {
        let names = mob_type.name_lists();
        let load_ctx = ScriptLoadContext {
            animations: &names.animations,
            reaches: &names.reaches,
            sounds: &names.sounds,
            spawns: &names.spawns,
            body_parts: &names.body_parts,
            status_types: refs.status_types,
        };
        let parsed = load_script_file(pack, &script_path, refs.library, &load_ctx)?;
        (parsed.states, parsed.first_state)
    } else if mob_type.category.has_builtin_idle() {
        (idle_waiting_state(), Some(IDLE_WAITING_STATE.to_string()))
    } else {
        return Ok(());
    };

    let fsm_error = |error: FsmError| {
        ContentLoadError::new(ContentErrorCode::Script, error.to_string(), pack, &script_path)
    };
    mob_type.fsm.append_states(states).map_err(fsm_error)?;
    if mob_type.is_carriable() {
        mob_type.fsm.append_states(carrying_states()).map_err(fsm_error)?;
    }
    mob_type
        .fsm
        .finalize(first_state.as_deref())
        .map_err(fsm_error)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::f32::consts::FRAC_PI_2;
    use std::fs;
    use std::path::PathBuf;

    use tempfile::TempDir;

    use super::*;
    use crate::mob::{CARRY_MOVING_STATE, CARRY_WAITING_STATE};

    const BULBORB_DATA: &str = r#"<MobType>
        <name>Red Bulborb</name>
        <maxHealth>750</maxHealth>
        <moveSpeed>60</moveSpeed>
        <rotationSpeed>180</rotationSpeed>
        <team>enemy_1</team>
        <pikminSeeds>10</pikminSeeds>
        <reaches><reach name="search" radius1="200" angle1="90"/></reaches>
        <animations>
            <animation name="idling" duration="2" loops="true">
                <signal time="1.5" value="2"/>
                <signal time="0.5" value="1"/>
            </animation>
        </animations>
        <sounds><sound name="roar" sample="bulborb_roar"/></sounds>
        <resistances><hazard>water</hazard></resistances>
    </MobType>"#;

    const BULBORB_SCRIPT: &str = r#"<MobScript>
        <firstState>idling</firstState>
        <script>
            <state name="idling">
                <event name="on_enter">
                    set_animation idling
                </event>
                <event name="on_death">
                    set_state carriable_waiting
                </event>
            </state>
        </script>
    </MobScript>"#;

    struct Fixture {
        _temp: TempDir,
        manifest: ContentManifest,
    }

    fn fixture(internal_name: &str, data: &str, script: Option<&str>) -> Fixture {
        let temp = TempDir::new().expect("temp");
        let dir: PathBuf = temp.path().join(internal_name);
        fs::create_dir_all(&dir).expect("mkdir");
        fs::write(dir.join(MOB_DATA_FILE), data).expect("data");
        if let Some(script) = script {
            fs::write(dir.join(MOB_SCRIPT_FILE), script).expect("script");
        }
        Fixture {
            _temp: temp,
            manifest: ContentManifest {
                internal_name: internal_name.to_string(),
                pack: "base".to_string(),
                path: dir,
            },
        }
    }

    fn load(fixture: &Fixture, level: ContentLoadLevel) -> Result<MobType, ContentLoadError> {
        let library = ActionLibrary::standard();
        let statuses = BTreeSet::from(["sweet".to_string()]);
        let refs = MobTypeRefs {
            library: &library,
            status_types: &statuses,
            is_mob_type: &|name| name == "pikmin/red_pikmin",
            is_sample: &|name| name == "bulborb_roar",
            is_hazard: &|name| name == "water",
        };
        load_mob_type(&fixture.manifest, level, &refs)
    }

    #[test]
    fn enemy_data_and_script_load() {
        let fixture = fixture(
            "enemies/red_bulborb",
            &BULBORB_DATA.replace("<pikminSeeds>", "<maxCarriers>4</maxCarriers><pikminSeeds>"),
            Some(BULBORB_SCRIPT),
        );
        let mob_type = load(&fixture, ContentLoadLevel::Full).expect("load");

        assert_eq!(mob_type.name, "Red Bulborb");
        assert_eq!(mob_type.category, MobCategory::Enemies);
        assert_eq!(mob_type.team, MobTeam::Enemy1);
        assert_eq!(mob_type.max_health, 750.0);
        assert!((mob_type.reaches[0].angle_1 - FRAC_PI_2).abs() < 1.0e-5);
        assert_eq!(mob_type.animations[0].signals[0].signal, 1);
        assert!(mob_type.resists("water"));
        assert!(matches!(
            mob_type.properties,
            CategoryProperties::Enemy {
                pikmin_seeds: 10,
                ..
            }
        ));

        let fsm = &mob_type.fsm;
        assert_eq!(fsm.first_state, fsm.state_index("idling"));
        assert!(fsm.state_index(CARRY_WAITING_STATE).is_some());
        assert!(fsm.state_index(CARRY_MOVING_STATE).is_some());
    }

    #[test]
    fn scriptless_treasure_starts_idle_waiting() {
        let fixture = fixture(
            "treasures/sun_pendant",
            "<MobType><points>50</points><weight>3</weight></MobType>",
            None,
        );
        let mob_type = load(&fixture, ContentLoadLevel::Full).expect("load");
        assert!(mob_type.is_carriable());
        assert_eq!(mob_type.fsm.first_state, Some(0));
        assert_eq!(mob_type.fsm.states[0].name, IDLE_WAITING_STATE);
        assert!(mob_type.fsm.state_index(CARRY_MOVING_STATE).is_some());
    }

    #[test]
    fn scriptless_enemy_has_no_states() {
        let fixture = fixture("enemies/rock", "<MobType><name>Rock</name></MobType>", None);
        let mob_type = load(&fixture, ContentLoadLevel::Full).expect("load");
        assert!(mob_type.fsm.is_empty());
        assert_eq!(mob_type.fsm.first_state, None);
    }

    #[test]
    fn basic_level_skips_the_script() {
        let fixture = fixture(
            "enemies/red_bulborb",
            BULBORB_DATA,
            Some("<MobScript><script><broken/></script></MobScript>"),
        );
        let mob_type = load(&fixture, ContentLoadLevel::Basic).expect("load");
        assert_eq!(mob_type.name, "Red Bulborb");
        assert!(mob_type.fsm.is_empty());
    }

    #[test]
    fn set_state_to_missing_state_fails_the_type() {
        let fixture = fixture(
            "enemies/red_bulborb",
            BULBORB_DATA,
            Some(BULBORB_SCRIPT),
        );
        let err = load(&fixture, ContentLoadLevel::Full).expect_err("no carrying states");
        assert_eq!(err.code, ContentErrorCode::Script);
        assert!(err.message.contains("carriable_waiting"));
    }

    #[test]
    fn references_are_validated() {
        let unknown_spawn = fixture(
            "enemies/egg_layer",
            r#"<MobType><spawns><spawn name="egg" type="enemies/egg"/></spawns></MobType>"#,
            None,
        );
        let err = load(&unknown_spawn, ContentLoadLevel::Full).expect_err("spawn");
        assert_eq!(err.code, ContentErrorCode::UnknownReference);

        let pellet = fixture(
            "pellets/red_1",
            "<MobType><pikminType>pikmin/red_pikmin</pikminType><number>1</number></MobType>",
            None,
        );
        let mob_type = load(&pellet, ContentLoadLevel::Basic).expect("pellet");
        assert!(matches!(
            mob_type.properties,
            CategoryProperties::Pellet { ref pikmin_type, .. } if pikmin_type == "pikmin/red_pikmin"
        ));

        let foreign_field = fixture(
            "pikmin/red_pikmin",
            "<MobType><pikminSeeds>3</pikminSeeds></MobType>",
            None,
        );
        let err = load(&foreign_field, ContentLoadLevel::Basic).expect_err("field");
        assert_eq!(err.code, ContentErrorCode::UnknownField);
    }

    #[test]
    fn drop_fields_load_and_unused_throw_fields_are_rejected() {
        let nectar = fixture(
            "drops/ultra_spicy_spray",
            "<MobType><totalDoses>3</totalDoses><consumer>leaders</consumer>\
             <healthIncrease>-5</healthIncrease><statusToGive>sweet</statusToGive></MobType>",
            None,
        );
        let mob_type = load(&nectar, ContentLoadLevel::Basic).expect("drop");
        assert_eq!(
            mob_type.properties,
            CategoryProperties::Drop {
                total_doses: 3,
                consumer: DropConsumer::Leaders,
                health_change: -5.0,
                status_to_give: Some("sweet".to_string()),
            }
        );

        let bad_status = fixture(
            "drops/nectar",
            "<MobType><statusToGive>sour</statusToGive></MobType>",
            None,
        );
        let err = load(&bad_status, ContentLoadLevel::Basic).expect_err("status");
        assert_eq!(err.code, ContentErrorCode::UnknownReference);

        let bad_consumer = fixture(
            "drops/nectar",
            "<MobType><consumer>enemies</consumer></MobType>",
            None,
        );
        let err = load(&bad_consumer, ContentLoadLevel::Basic).expect_err("consumer");
        assert_eq!(err.code, ContentErrorCode::InvalidValue);

        let thrower = fixture(
            "pikmin/red_pikmin",
            "<MobType><maxThrowHeight>260</maxThrowHeight></MobType>",
            None,
        );
        let err = load(&thrower, ContentLoadLevel::Basic).expect_err("throw height");
        assert_eq!(err.code, ContentErrorCode::UnknownField);
    }
}
