use serde::{Deserialize, Serialize};

use crate::{
    catalog::{ActionTemplate, ParameterSpec},
    common::Vars,
};

/// node id
pub type NodeId = String;

/// State of a node during graph execution.
///
/// A trigger walks `Idle → Validating → WaitingOnParents → Dispatching` and
/// ends in `Completed` or `Failed`; a fresh trigger always restarts from
/// `Validating`, whatever the previous run left behind.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq, strum::AsRefStr, strum::EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum NodeState {
    #[default]
    Idle,
    Validating,
    WaitingOnParents,
    Dispatching,
    Completed,
    Failed,
}

/// One action invocation site.
///
/// The node keeps its catalog parameter specs for life and layers three
/// parameter sources on top: externally `provided` values (authoritative,
/// hidden from presentation), locally entered `values`, and `loaded` values
/// read back from a prior run's cache descriptor.
#[derive(Debug, Clone)]
pub struct ActionNode {
    /// node instance id
    pub id: NodeId,
    /// action type name, as listed in the catalog
    pub name: String,
    /// parameter specs from the catalog, immutable after construction
    pub parameters: Vec<ParameterSpec>,
    /// the action produces no addressable output
    pub void_action: bool,
    /// current execution state
    pub state: NodeState,
    /// locally entered parameter values
    pub values: Vars,
    /// externally provided parameters, take precedence over local entry
    pub provided: Option<Vars>,
    /// parameter values recovered from a cache descriptor
    pub loaded: Option<Vars>,
    /// base output directory, set once execution succeeds or pre-supplied
    pub output_base_directory: Option<String>,
    /// optional fixed suffix namespacing this node's output
    pub output_subdirectory: Option<String>,
}

impl ActionNode {
    /// Build a node from its catalog template.
    pub fn from_template(
        id: &str,
        template: &ActionTemplate,
    ) -> Self {
        Self {
            id: id.to_string(),
            name: template.name.clone(),
            parameters: template.parameters.clone(),
            void_action: template.attributes.void_action,
            state: NodeState::Idle,
            values: Vars::new(),
            provided: None,
            loaded: None,
            output_base_directory: None,
            output_subdirectory: None,
        }
    }

    /// The spec of a declared parameter.
    pub fn spec(
        &self,
        name: &str,
    ) -> Option<&ParameterSpec> {
        self.parameters.iter().find(|p| p.name == name)
    }

    /// Whether a parameter was externally provided.
    ///
    /// Provided parameters are suppressed from any presentation layer when
    /// the node is driven non-interactively.
    pub fn is_provided(
        &self,
        name: &str,
    ) -> bool {
        self.provided.as_ref().map(|p| p.contains_key(name)).unwrap_or(false)
    }

    /// Resolve the value a parameter would dispatch with.
    ///
    /// Precedence: provided > locally entered (non-empty) > loaded from a
    /// descriptor > catalog default. Dependency-resolved values are not
    /// known here; the executor substitutes them at dispatch time.
    pub fn effective_value(
        &self,
        name: &str,
    ) -> Option<String> {
        if let Some(provided) = &self.provided {
            if let Some(value) = provided.get_str(name) {
                return Some(value);
            }
        }
        if let Some(value) = self.values.get_str(name) {
            if !value.is_empty() {
                return Some(value);
            }
        }
        if let Some(loaded) = &self.loaded {
            if let Some(value) = loaded.get_str(name) {
                return Some(value);
            }
        }
        self.spec(name).and_then(|spec| spec.default_value.clone())
    }

    /// The resolved output directory, normalized with a trailing separator.
    pub fn output_directory(&self) -> Option<String> {
        self.output_base_directory.as_ref().map(|base| resolve_output_directory(base, self.output_subdirectory.as_deref()))
    }
}

/// Compose `base[/sub]` and normalize to end with a single `/`.
pub fn resolve_output_directory(
    base: &str,
    sub: Option<&str>,
) -> String {
    let mut directory = base.to_string();
    if let Some(sub) = sub {
        if !directory.ends_with('/') {
            directory.push('/');
        }
        directory.push_str(sub);
    }
    if !directory.ends_with('/') {
        directory.push('/');
    }
    directory
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{ActionAttributes, ParameterKind};

    fn template() -> ActionTemplate {
        ActionTemplate {
            name: "mesh_extraction".to_string(),
            description: String::new(),
            parameters: vec![
                ParameterSpec {
                    name: "threshold".to_string(),
                    kind: ParameterKind::Float,
                    default_value: Some("0.5".to_string()),
                    ..Default::default()
                },
                ParameterSpec {
                    name: "input_volume".to_string(),
                    kind: ParameterKind::File,
                    required: true,
                    ..Default::default()
                },
            ],
            attributes: ActionAttributes::default(),
        }
    }

    #[test]
    fn test_effective_value_precedence() {
        let mut node = ActionNode::from_template("mesh", &template());
        assert_eq!(node.effective_value("threshold").as_deref(), Some("0.5"));

        let mut loaded = Vars::new();
        loaded.set("threshold", "0.7");
        node.loaded = Some(loaded);
        assert_eq!(node.effective_value("threshold").as_deref(), Some("0.7"));

        node.values.set("threshold", "0.8");
        assert_eq!(node.effective_value("threshold").as_deref(), Some("0.8"));

        let mut provided = Vars::new();
        provided.set("threshold", "0.9");
        node.provided = Some(provided);
        assert_eq!(node.effective_value("threshold").as_deref(), Some("0.9"));
        assert!(node.is_provided("threshold"));
        assert!(!node.is_provided("input_volume"));
    }

    #[test]
    fn test_blank_local_value_falls_through() {
        let mut node = ActionNode::from_template("mesh", &template());
        node.values.set("threshold", "");
        assert_eq!(node.effective_value("threshold").as_deref(), Some("0.5"));
        assert!(node.effective_value("input_volume").is_none());
    }

    #[test]
    fn test_resolve_output_directory() {
        assert_eq!(resolve_output_directory("out/a", None), "out/a/");
        assert_eq!(resolve_output_directory("out/a/", None), "out/a/");
        assert_eq!(resolve_output_directory("out/a", Some("meshes")), "out/a/meshes/");
        assert_eq!(resolve_output_directory("out/a/", Some("meshes")), "out/a/meshes/");
    }

    #[test]
    fn test_output_directory_requires_base() {
        let mut node = ActionNode::from_template("mesh", &template());
        assert!(node.output_directory().is_none());

        node.output_subdirectory = Some("meshes".to_string());
        assert!(node.output_directory().is_none());

        node.output_base_directory = Some("out/mesh".to_string());
        assert_eq!(node.output_directory().as_deref(), Some("out/mesh/meshes/"));
    }
}
