use std::{fs, path::Path};

use serde::Deserialize;

/// Default descriptor file name written by the backend after a successful run.
pub const DEFAULT_DESCRIPTOR_FILE: &str = "action.json";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// number of async worker threads, range [1, 32768), defaults to 16
    #[serde(default = "default_worker_threads")]
    pub async_worker_thread_number: u16,
    /// name of the cached-run descriptor file inside an output directory
    #[serde(default = "default_descriptor_file")]
    pub descriptor_file: String,
    /// remote dispatch backend config
    #[serde(default)]
    pub backend: Option<BackendConfig>,
    /// filesystem config
    #[serde(default)]
    pub filesystem: Option<FilesystemConfig>,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct BackendConfig {
    /// base url of the action RPC server
    pub base_url: String,
    /// request timeout in milliseconds, no timeout when unset
    #[serde(default)]
    pub request_timeout_ms: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct FilesystemConfig {
    /// root directory all relative output paths resolve against
    pub root: String,
}

fn default_worker_threads() -> u16 {
    16
}

fn default_descriptor_file() -> String {
    DEFAULT_DESCRIPTOR_FILE.to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            async_worker_thread_number: default_worker_threads(),
            descriptor_file: default_descriptor_file(),
            backend: None,
            filesystem: None,
        }
    }
}

impl Config {
    pub fn create<T: AsRef<Path>>(path: T) -> Self {
        let data = fs::read_to_string(path.as_ref()).expect(&format!("failed to load config file {:?}", path.as_ref()));

        Self::load_from_str(data.as_str())
    }

    pub fn load_from_str(toml_str: &str) -> Self {
        let config = toml::from_str::<Config>(toml_str).expect("failed to parse the toml str");
        config
    }
}
