//! Pack manifest (`Info.json`).

use serde_json::{Map, Value};

/// Manifest file name at the root of every pack.
pub const MANIFEST_NAME: &str = "Info.json";

/// Declared pack properties.
///
/// Every field is optional in the file. Missing fields, and fields of the
/// wrong JSON type, keep the values the pack started with.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PackManifest {
    pub id: String,
    pub display_name: String,
    pub author: String,
    pub version: String,
    pub target_build: Option<i64>,
}

impl PackManifest {
    /// Manifest defaults derived from the pack's file name.
    pub fn with_name(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            id: name.clone(),
            display_name: name,
            ..Default::default()
        }
    }

    /// Overlay the fields present in `object`.
    ///
    /// Returns the names of fields that were present but ignored.
    pub fn apply(&mut self, object: &Map<String, Value>) -> Vec<&'static str> {
        let mut ignored = Vec::new();

        overlay_string(object, "Id", &mut self.id, &mut ignored);
        overlay_string(object, "DisplayName", &mut self.display_name, &mut ignored);
        overlay_string(object, "Author", &mut self.author, &mut ignored);
        overlay_string(object, "Version", &mut self.version, &mut ignored);

        match object.get("TargetBuild") {
            None | Some(Value::Null) => {}
            Some(value) => match value.as_i64() {
                Some(build) => self.target_build = Some(build),
                None => ignored.push("TargetBuild"),
            },
        }

        ignored
    }
}

fn overlay_string(
    object: &Map<String, Value>,
    key: &'static str,
    target: &mut String,
    ignored: &mut Vec<&'static str>,
) {
    match object.get(key) {
        None | Some(Value::Null) => {}
        // Blank identities keep the file name
        Some(Value::String(s)) if s.trim().is_empty() && key == "Id" => ignored.push(key),
        Some(Value::String(s)) => *target = s.clone(),
        Some(_) => ignored.push(key),
    }
}
