//! Status types, hazards and liquids: small single-file content items.

use std::path::Path;

use super::document::{parse_xml, read_text, ContentErrorCode, ContentLoadError, XmlSource};

#[derive(Debug, Clone, PartialEq)]
pub struct StatusType {
    /// Internal name scripts and hazards refer to.
    pub name: String,
    pub display_name: String,
    /// Health added per second; negative values drain.
    pub health_change: f32,
    pub speed_multiplier: f32,
    /// Seconds; 0 lasts until removed.
    pub duration: f32,
    pub removable_with_whistle: bool,
    pub turns_invisible: bool,
    pub particle_generator: Option<String>,
}

impl StatusType {
    pub fn named(name: &str) -> Self {
        Self {
            name: name.to_string(),
            display_name: name.to_string(),
            health_change: 0.0,
            speed_multiplier: 1.0,
            duration: 0.0,
            removable_with_whistle: false,
            turns_invisible: false,
            particle_generator: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Hazard {
    pub name: String,
    pub display_name: String,
    /// Status types applied to non-resistant mobs standing in the hazard.
    pub effects: Vec<String>,
    pub liquid: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Liquid {
    pub name: String,
    pub display_name: String,
    pub color: [u8; 4],
    pub surface_speed: [f32; 2],
}

pub(crate) fn load_status_type(
    pack: &str,
    internal_name: &str,
    path: &Path,
) -> Result<StatusType, ContentLoadError> {
    let raw = read_text(pack, path)?;
    let doc = parse_xml(pack, path, &raw)?;
    let source = XmlSource {
        pack,
        path,
        doc: &doc,
    };
    let root = source.expect_root("StatusType")?;

    let mut status = StatusType::named(internal_name);
    for field in source.unique_fields(root)? {
        match field.tag_name().name() {
            "name" => status.display_name = source.required_text(field)?,
            "healthChange" => status.health_change = source.parse_f32(field)?,
            "speedMultiplier" => status.speed_multiplier = source.parse_non_negative(field)?,
            "duration" => status.duration = source.parse_non_negative(field)?,
            "removableWithWhistle" => status.removable_with_whistle = source.parse_bool(field)?,
            "turnsInvisible" => status.turns_invisible = source.parse_bool(field)?,
            "particleGenerator" => status.particle_generator = Some(source.required_text(field)?),
            _ => return Err(source.unknown_field(field)),
        }
    }
    Ok(status)
}

pub(crate) fn load_hazard(
    pack: &str,
    internal_name: &str,
    path: &Path,
    known_liquids: &dyn Fn(&str) -> bool,
) -> Result<Hazard, ContentLoadError> {
    let raw = read_text(pack, path)?;
    let doc = parse_xml(pack, path, &raw)?;
    let source = XmlSource {
        pack,
        path,
        doc: &doc,
    };
    let root = source.expect_root("Hazard")?;

    let mut hazard = Hazard {
        name: internal_name.to_string(),
        display_name: internal_name.to_string(),
        effects: Vec::new(),
        liquid: None,
    };
    for field in source.unique_fields(root)? {
        match field.tag_name().name() {
            "name" => hazard.display_name = source.required_text(field)?,
            "effects" => hazard.effects = source.text_list(field, "effect")?,
            "liquid" => {
                let liquid = source.required_text(field)?;
                if !known_liquids(&liquid) {
                    return Err(source.error_at(
                        ContentErrorCode::UnknownReference,
                        format!("unknown liquid '{liquid}'"),
                        field,
                    ));
                }
                hazard.liquid = Some(liquid);
            }
            _ => return Err(source.unknown_field(field)),
        }
    }
    Ok(hazard)
}

pub(crate) fn load_liquid(
    pack: &str,
    internal_name: &str,
    path: &Path,
) -> Result<Liquid, ContentLoadError> {
    let raw = read_text(pack, path)?;
    let doc = parse_xml(pack, path, &raw)?;
    let source = XmlSource {
        pack,
        path,
        doc: &doc,
    };
    let root = source.expect_root("Liquid")?;

    let mut liquid = Liquid {
        name: internal_name.to_string(),
        display_name: internal_name.to_string(),
        color: [255, 255, 255, 255],
        surface_speed: [0.0, 0.0],
    };
    for field in source.unique_fields(root)? {
        match field.tag_name().name() {
            "name" => liquid.display_name = source.required_text(field)?,
            "color" => {
                let text = source.required_text(field)?;
                let parts = text
                    .split_whitespace()
                    .map(str::parse::<u8>)
                    .collect::<Result<Vec<_>, _>>();
                match parts.as_deref() {
                    Ok([r, g, b]) => liquid.color = [*r, *g, *b, 255],
                    Ok([r, g, b, a]) => liquid.color = [*r, *g, *b, *a],
                    _ => {
                        return Err(source.error_at(
                            ContentErrorCode::InvalidValue,
                            format!("color '{text}' must be 3 or 4 values in 0-255"),
                            field,
                        ))
                    }
                }
            }
            "surfaceSpeed" => {
                liquid.surface_speed = [
                    source.attr_f32(field, "x", 0.0)?,
                    source.attr_f32(field, "y", 0.0)?,
                ];
            }
            _ => return Err(source.unknown_field(field)),
        }
    }
    Ok(liquid)
}
