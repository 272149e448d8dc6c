use serde::{Deserialize, Serialize};

/// A data dependency: one parameter of a child node is produced by a parent.
///
/// Stored as the weight of a `child → parent` graph edge, annotated with the
/// literal output file expected from the parent. A parameter carries at most
/// one edge; declaring a second one replaces the first.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct DependencyEdge {
    /// Name of the child parameter the parent output fills.
    pub parameter: String,
    /// Output file name expected inside the parent's output directory.
    pub file: String,
}

impl DependencyEdge {
    pub fn new(
        parameter: &str,
        file: &str,
    ) -> Self {
        Self {
            parameter: parameter.to_string(),
            file: file.to_string(),
        }
    }
}
