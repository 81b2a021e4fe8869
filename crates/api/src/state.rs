use std::sync::Arc;

use scenegen_events::EventBus;
use scenegen_pipeline::{ArtifactStore, GenerationBackend};

use crate::config::ServerConfig;
use crate::engine::{Dispatcher, JobExecutor, JobRegistry};

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc` or is already `Clone`).
#[derive(Clone)]
pub struct AppState {
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// Every job record, live for the whole process.
    pub registry: Arc<JobRegistry>,
    /// Admits submissions and launches their executors.
    pub dispatcher: Arc<Dispatcher>,
    /// Finished artifacts on disk.
    pub store: ArtifactStore,
    /// Job lifecycle events.
    pub event_bus: Arc<EventBus>,
}

impl AppState {
    /// Wire the job engine around `backend`.
    pub fn new(config: ServerConfig, backend: Arc<dyn GenerationBackend>) -> Self {
        let registry = Arc::new(JobRegistry::new());
        let event_bus = Arc::new(EventBus::default());
        let store = ArtifactStore::new(config.output_dir.clone());

        let executor = Arc::new(JobExecutor::new(
            Arc::clone(&registry),
            backend,
            store.clone(),
            Arc::clone(&event_bus),
        ));
        let dispatcher = Arc::new(Dispatcher::new(
            Arc::clone(&registry),
            executor,
            store.clone(),
            Arc::clone(&event_bus),
        ));

        Self {
            config: Arc::new(config),
            registry,
            dispatcher,
            store,
            event_bus,
        }
    }
}
