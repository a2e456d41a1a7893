/// Engine wiring shared by the integration tests
use super::fakes::{CollectingSink, ScriptedBackend, ScriptedUploader};
use reelflow_lib::modules::jobs::{FileSnapshotRepository, JobSnapshotRepository, JobStore};
use reelflow_lib::modules::publish::PlatformRegistry;
use reelflow_lib::shared::domain::value_objects::Platform;
use reelflow_lib::{EngineConfig, EngineService};
use std::sync::Arc;

pub struct TestEngine {
    pub engine: Arc<EngineService>,
    pub backend: Arc<ScriptedBackend>,
    pub registry: Arc<PlatformRegistry>,
    pub sink: Arc<CollectingSink>,
}

/// Engine over an in-memory store and fresh fakes
pub async fn build_test_engine(config: &EngineConfig) -> TestEngine {
    build_with_store(config, Arc::new(JobStore::in_memory()), ScriptedBackend::new()).await
}

/// Engine over the JSON snapshot in `config.state_dir`
pub async fn build_persistent_engine(
    config: &EngineConfig,
    backend: Arc<ScriptedBackend>,
) -> TestEngine {
    let repository: Arc<dyn JobSnapshotRepository> = Arc::new(FileSnapshotRepository::new(
        &config.state_dir,
        &config.namespace,
    ));
    build_with_store(config, Arc::new(JobStore::new(Some(repository))), backend).await
}

async fn build_with_store(
    config: &EngineConfig,
    store: Arc<JobStore>,
    backend: Arc<ScriptedBackend>,
) -> TestEngine {
    let registry = Arc::new(PlatformRegistry::new());
    let sink = CollectingSink::new();
    let engine = EngineService::new(config, store, backend.clone(), registry.clone(), sink.clone())
        .await
        .expect("engine should build from a valid config");

    TestEngine {
        engine: Arc::new(engine),
        backend,
        registry,
        sink,
    }
}

/// Register a scripted uploader and hand it back for call assertions
pub fn register(
    registry: &PlatformRegistry,
    platform: Platform,
    uploader: Arc<ScriptedUploader>,
) -> Arc<ScriptedUploader> {
    registry.register(platform, uploader.clone());
    uploader
}

/// Yield until `condition` holds, giving spawned tasks a chance to run
pub async fn wait_until<F, Fut>(mut condition: F)
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    for _ in 0..1_000 {
        if condition().await {
            return;
        }
        tokio::task::yield_now().await;
    }
    panic!("condition not reached");
}
