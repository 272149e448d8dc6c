use std::sync::Arc;

use tokio::runtime::{Builder, Runtime};

use crate::{
    Config, Engine, Error, Result,
    backend::{Dispatch, HttpBackend},
    catalog::ActionCatalog,
    fs::{FileSystem, LocalFileSystem},
};

/// Builds an [`Engine`] from configuration and optional custom boundaries.
///
/// The dispatch backend and filesystem default to the configured HTTP
/// backend and local data root; embedders and tests inject their own
/// implementations instead.
pub struct EngineBuilder {
    config: Config,
    catalog: Option<ActionCatalog>,
    rt: Option<Arc<Runtime>>,
    dispatch: Option<Arc<dyn Dispatch>>,
    filesystem: Option<Arc<dyn FileSystem>>,
}

impl Default for EngineBuilder {
    fn default() -> Self {
        Self {
            config: Config::default(),
            catalog: None,
            rt: None,
            dispatch: None,
            filesystem: None,
        }
    }
}

impl EngineBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn config(
        mut self,
        config: Config,
    ) -> Self {
        self.config = config;
        self
    }

    pub fn async_worker_thread_number(
        mut self,
        n: u16,
    ) -> Self {
        self.config.async_worker_thread_number = n;
        self
    }

    pub fn catalog(
        mut self,
        catalog: ActionCatalog,
    ) -> Self {
        self.catalog = Some(catalog);
        self
    }

    pub fn runtime(
        mut self,
        runtime: Arc<Runtime>,
    ) -> Self {
        self.rt = Some(runtime);
        self
    }

    pub fn dispatch(
        mut self,
        dispatch: Arc<dyn Dispatch>,
    ) -> Self {
        self.dispatch = Some(dispatch);
        self
    }

    pub fn filesystem(
        mut self,
        filesystem: Arc<dyn FileSystem>,
    ) -> Self {
        self.filesystem = Some(filesystem);
        self
    }

    pub fn build(self) -> Result<Engine> {
        let runtime = match self.rt {
            Some(runtime) => runtime,
            None => Arc::new(
                Builder::new_multi_thread()
                    .worker_threads(self.config.async_worker_thread_number.into())
                    .enable_all()
                    .build()
                    .map_err(|e| Error::Engine(format!("failed to build runtime: {}", e)))?,
            ),
        };

        let dispatch = match (self.dispatch, &self.config.backend) {
            (Some(dispatch), _) => dispatch,
            (None, Some(backend)) => Arc::new(HttpBackend::new(backend)?) as Arc<dyn Dispatch>,
            (None, None) => return Err(Error::Engine("no dispatch backend configured".to_string())),
        };

        let filesystem = match (self.filesystem, &self.config.filesystem) {
            (Some(filesystem), _) => filesystem,
            (None, Some(fs_config)) => Arc::new(LocalFileSystem::new(&fs_config.root)) as Arc<dyn FileSystem>,
            (None, None) => Arc::new(LocalFileSystem::new(".")) as Arc<dyn FileSystem>,
        };

        let catalog = self.catalog.unwrap_or_default();

        Ok(Engine::new(runtime, catalog, dispatch, filesystem, &self.config.descriptor_file))
    }
}
