//! Remote dispatch: the sole I/O boundary performing actual work.
//!
//! The executor hands a flat parameter map to the backend and receives a
//! status plus the directory the outputs landed in. The production backend
//! POSTs to the action RPC server; tests substitute stubs.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{Error, Result, common::Vars, config::BackendConfig};

/// Response of a launched action.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LaunchResponse {
    /// Backend status string, surfaced verbatim to callers.
    #[serde(default)]
    pub status: String,
    /// Directory the action wrote its outputs to, relative to the data root.
    #[serde(default, rename = "outputDirectory")]
    pub output_directory: Option<String>,
    /// Error text when the backend rejected the launch.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// The remote dispatch boundary.
#[async_trait]
pub trait Dispatch: Send + Sync {
    /// Launch an action with the given parameter map.
    async fn launch(
        &self,
        parameters: Vars,
    ) -> Result<LaunchResponse>;
}

/// HTTP dispatch against the action RPC server (`POST {base_url}/rpc/action`).
pub struct HttpBackend {
    client: reqwest::Client,
    base_url: String,
}

impl HttpBackend {
    pub fn new(config: &BackendConfig) -> Result<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = config.request_timeout_ms {
            builder = builder.timeout(Duration::from_millis(timeout));
        }
        let client = builder.build().map_err(|e| Error::Engine(format!("failed to build http client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl Dispatch for HttpBackend {
    async fn launch(
        &self,
        parameters: Vars,
    ) -> Result<LaunchResponse> {
        let url = format!("{}/rpc/action", self.base_url);
        debug!("launching action {:?} via {}", parameters.get_str("action"), url);

        let response = self.client.post(&url).json(&parameters).send().await.map_err(|e| Error::Dispatch(e.to_string()))?;
        if !response.status().is_success() {
            return Err(Error::Dispatch(format!("backend returned {}", response.status())));
        }

        let answer = response.json::<LaunchResponse>().await.map_err(|e| Error::Dispatch(e.to_string()))?;
        if let Some(error) = answer.error {
            return Err(Error::Dispatch(error));
        }
        Ok(answer)
    }
}
