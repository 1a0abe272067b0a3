use std::collections::BTreeMap;

/// Per-mob script variables. Values stay strings so scripts remain untyped;
/// the typed getters parse on read and fall back to a zero value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScriptVars {
    values: BTreeMap<String, String>,
}

impl ScriptVars {
    /// Parses `name=value;name=value` as written in area files and spawn data.
    pub fn parse_assignments(raw: &str) -> Self {
        let mut vars = Self::default();
        for pair in raw.split(';') {
            let Some((name, value)) = pair.split_once('=') else {
                continue;
            };
            let name = name.trim();
            if !name.is_empty() {
                vars.set(name, value.trim());
            }
        }
        vars
    }

    pub fn set(&mut self, name: &str, value: impl Into<String>) {
        self.values.insert(name.to_string(), value.into());
    }

    pub fn extend(&mut self, other: &ScriptVars) {
        for (name, value) in &other.values {
            self.values.insert(name.clone(), value.clone());
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    /// Missing variables read as "".
    pub fn get_str(&self, name: &str) -> &str {
        self.get(name).unwrap_or_default()
    }

    /// Missing or non-numeric variables read as 0.
    pub fn get_i32(&self, name: &str) -> i32 {
        parse_i32(self.get_str(name))
    }

    /// Missing or non-numeric variables read as 0.0.
    pub fn get_f32(&self, name: &str) -> f32 {
        parse_f32(self.get_str(name))
    }

    /// Only "true" and non-zero integers read as true.
    pub fn get_bool(&self, name: &str) -> bool {
        parse_bool(self.get_str(name))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_str()))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

pub(crate) fn parse_i32(raw: &str) -> i32 {
    let trimmed = raw.trim();
    trimmed
        .parse::<i32>()
        .or_else(|_| trimmed.parse::<f32>().map(|value| value as i32))
        .unwrap_or(0)
}

pub(crate) fn parse_f32(raw: &str) -> f32 {
    raw.trim()
        .parse::<f32>()
        .ok()
        .filter(|value| value.is_finite())
        .unwrap_or(0.0)
}

pub(crate) fn parse_bool(raw: &str) -> bool {
    match raw.trim() {
        "true" => true,
        other => other.parse::<i32>().map(|value| value != 0).unwrap_or(false),
    }
}
