//! Output cache probe.
//!
//! A successful run leaves a descriptor file (`action.json` by default)
//! inside the node's resolved output directory, written by the backend. The
//! probe reads it back to pre-populate parameters and to short-circuit
//! re-triggers of already-computed work.

use std::sync::Arc;

use tracing::debug;

use crate::{common::Vars, fs::FileSystem, graph::resolve_output_directory};

/// The persisted record of a prior successful run: the flat resolved
/// parameter map the backend saved next to its outputs.
///
/// The schema is owned by the backend; this crate only reads keys back.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CacheDescriptor {
    parameters: Vars,
}

impl CacheDescriptor {
    pub fn from_json(s: &str) -> Option<Self> {
        let value = serde_json::from_str::<serde_json::Value>(s).ok()?;
        value.is_object().then(|| Self {
            parameters: Vars::from(value),
        })
    }

    /// The action type recorded for the run, when present.
    pub fn action(&self) -> Option<String> {
        self.parameters.get_str("action")
    }

    /// The recorded value of one parameter.
    pub fn get(
        &self,
        name: &str,
    ) -> Option<String> {
        self.parameters.get_str(name)
    }

    /// The full recorded parameter map.
    pub fn parameters(&self) -> &Vars {
        &self.parameters
    }

    pub fn into_parameters(self) -> Vars {
        self.parameters
    }
}

/// Probes output directories for prior-run descriptors.
#[derive(Clone)]
pub struct CacheProbe {
    fs: Arc<dyn FileSystem>,
    descriptor_file: String,
}

impl CacheProbe {
    pub fn new(
        fs: Arc<dyn FileSystem>,
        descriptor_file: &str,
    ) -> Self {
        Self {
            fs,
            descriptor_file: descriptor_file.to_string(),
        }
    }

    /// Read the descriptor under `base[/sub]`.
    ///
    /// A missing file or a parse failure is a cache miss, not an error.
    pub async fn probe(
        &self,
        base: &str,
        sub: Option<&str>,
    ) -> Option<CacheDescriptor> {
        let path = format!("{}{}", resolve_output_directory(base, sub), self.descriptor_file);
        let content = match self.fs.read_to_string(&path).await {
            Ok(content) => content,
            Err(_) => {
                debug!("cache miss: no descriptor at {}", path);
                return None;
            }
        };
        let descriptor = CacheDescriptor::from_json(&content);
        if descriptor.is_none() {
            debug!("cache miss: unreadable descriptor at {}", path);
        }
        descriptor
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;
    use crate::{Error, Result};

    #[derive(Default)]
    struct MapFileSystem {
        files: Mutex<HashMap<String, String>>,
    }

    impl MapFileSystem {
        fn insert(
            &self,
            path: &str,
            content: &str,
        ) {
            self.files.lock().unwrap().insert(path.to_string(), content.to_string());
        }
    }

    #[async_trait]
    impl FileSystem for MapFileSystem {
        async fn exists(
            &self,
            path: &str,
        ) -> bool {
            self.files.lock().unwrap().contains_key(path)
        }

        async fn create_subdirectory(
            &self,
            _parent: &str,
            _name: &str,
        ) -> Result<()> {
            Ok(())
        }

        async fn read_to_string(
            &self,
            path: &str,
        ) -> Result<String> {
            self.files.lock().unwrap().get(path).cloned().ok_or(Error::Filesystem(format!("{}: not found", path)))
        }
    }

    #[test]
    fn test_probe_hit_and_miss() {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let fs = Arc::new(MapFileSystem::default());
        fs.insert("out/a/action.json", r#"{"action": "mesh_extraction", "threshold": "0.5"}"#);
        fs.insert("out/b/sub/action.json", "not json");

        let probe = CacheProbe::new(fs.clone(), "action.json");
        runtime.block_on(async {
            let descriptor = probe.probe("out/a", None).await.unwrap();
            assert_eq!(descriptor.action().as_deref(), Some("mesh_extraction"));
            assert_eq!(descriptor.get("threshold").as_deref(), Some("0.5"));

            // parse failure is a miss
            assert!(probe.probe("out/b", Some("sub")).await.is_none());
            // absent descriptor is a miss
            assert!(probe.probe("out/c", None).await.is_none());
        });
    }

    #[test]
    fn test_descriptor_rejects_non_object() {
        assert!(CacheDescriptor::from_json("[1, 2]").is_none());
        assert!(CacheDescriptor::from_json("{}").is_some());
    }
}
