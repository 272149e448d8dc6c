use serde::{Deserialize, Serialize};

/// The fixed set of parameter types an action may declare.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq, strum::AsRefStr, strum::EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ParameterKind {
    #[default]
    String,
    Int,
    Float,
    File,
    Directory,
    #[serde(rename = "xmlcontent")]
    #[strum(serialize = "xmlcontent")]
    XmlContent,
}

/// One declared parameter of an action template.
///
/// Specs are created once from the catalog at node construction time and
/// never mutated. `info`, `min` and `max` are presentation metadata carried
/// through for tooltips.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ParameterSpec {
    pub name: String,
    #[serde(rename = "type", default)]
    pub kind: ParameterKind,
    #[serde(default)]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub info: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<String>,
}

impl ParameterSpec {
    /// Tooltip text assembled from the spec metadata, empty when none is set.
    pub fn tooltip(&self) -> String {
        let mut parts = Vec::new();
        if let Some(info) = &self.info {
            parts.push(info.clone());
        }
        if let Some(min) = &self.min {
            parts.push(format!("min : {}", min));
        }
        if let Some(max) = &self.max {
            parts.push(format!("max : {}", max));
        }
        if let Some(default_value) = &self.default_value {
            parts.push(format!("default : {}", default_value));
        }
        parts.join("\n")
    }
}
