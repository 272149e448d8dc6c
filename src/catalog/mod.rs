//! Action catalog: the externally supplied description of available actions.
//!
//! The catalog names every action the backend can run together with its
//! parameter list; nodes are instantiated from catalog templates and keep the
//! template's parameter specs for the rest of their life.

mod parameter;
mod validate;

pub use parameter::{ParameterKind, ParameterSpec};
pub use validate::{ValidationError, ValidationFailure, validate, validate_all};

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// One action type as declared by the backend.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ActionTemplate {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub parameters: Vec<ParameterSpec>,
    #[serde(default)]
    pub attributes: ActionAttributes,
}

/// Backend-declared attributes of an action type.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ActionAttributes {
    /// The action produces no addressable output directory.
    #[serde(default)]
    pub void_action: bool,
}

/// Lookup table of action templates, keyed by action name.
#[derive(Debug, Clone, Default)]
pub struct ActionCatalog {
    actions: HashMap<String, ActionTemplate>,
}

#[derive(Deserialize)]
struct CatalogDocument {
    actions: Vec<ActionTemplate>,
}

impl ActionCatalog {
    /// Parse a catalog from its JSON document (`{"actions": [...]}`).
    ///
    /// Unknown parameter types fail here, before any node is built or
    /// triggered.
    pub fn from_json(s: &str) -> Result<Self> {
        let document = serde_json::from_str::<CatalogDocument>(s).map_err(|e| Error::Catalog(format!("{}", e)))?;

        let mut actions = HashMap::new();
        for template in document.actions {
            if template.name.is_empty() {
                return Err(Error::Catalog("missing name in action template".to_string()));
            }
            actions.insert(template.name.clone(), template);
        }
        Ok(Self {
            actions,
        })
    }

    /// Look up an action template by name.
    pub fn get(
        &self,
        name: &str,
    ) -> Option<&ActionTemplate> {
        self.actions.get(name)
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_from_json() {
        let catalog = ActionCatalog::from_json(
            r#"{
                "actions": [
                    {
                        "name": "mesh_extraction",
                        "parameters": [
                            {"name": "input_volume", "type": "file", "required": true},
                            {"name": "threshold", "type": "float", "default_value": "0.5"}
                        ]
                    },
                    {
                        "name": "cleanup",
                        "attributes": {"void_action": true}
                    }
                ]
            }"#,
        )
        .unwrap();

        assert_eq!(catalog.len(), 2);
        let mesh = catalog.get("mesh_extraction").unwrap();
        assert_eq!(mesh.parameters.len(), 2);
        assert_eq!(mesh.parameters[0].kind, ParameterKind::File);
        assert!(mesh.parameters[0].required);
        assert_eq!(mesh.parameters[1].default_value.as_deref(), Some("0.5"));
        assert!(!mesh.attributes.void_action);
        assert!(catalog.get("cleanup").unwrap().attributes.void_action);
        assert!(catalog.get("unknown").is_none());
    }

    #[test]
    fn test_catalog_rejects_unknown_parameter_type() {
        let result = ActionCatalog::from_json(
            r#"{
                "actions": [
                    {
                        "name": "broken",
                        "parameters": [{"name": "x", "type": "matrix"}]
                    }
                ]
            }"#,
        );
        assert!(matches!(result, Err(Error::Catalog(_))));
    }
}
