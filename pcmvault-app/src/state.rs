//! Application state shared by every command.
//!
//! `AppState` is cheap to clone and `Send + Sync`; the batch runner wraps it
//! in an `Arc` and hands it to blocking tasks.

use anyhow::Context;
use pcmvault_core::records::new_id;
use pcmvault_core::{AudioEngine, RunContext};
use tracing::info;

use crate::settings::AppSettings;
use crate::storage::AssetStore;

#[derive(Debug, Clone)]
pub struct AppState {
    /// Engine configured from settings.
    pub engine: AudioEngine,
    /// SQLite asset/feature store.
    pub store: AssetStore,
    /// Normalized settings this process started with.
    pub settings: AppSettings,
    /// Workflow/run ids stamped on every asset created by this process.
    pub run: RunContext,
}

impl AppState {
    pub fn new(settings: AppSettings) -> anyhow::Result<Self> {
        let db_path = settings.database_path();
        let store = AssetStore::new(db_path.clone())
            .with_context(|| format!("opening asset store at {}", db_path.display()))?;
        let run = RunContext::new(settings.workflow_id.clone(), new_id("run"));
        info!(
            db = %db_path.display(),
            workflow_id = %run.workflow_id,
            workflow_run_id = %run.workflow_run_id,
            "app state ready"
        );
        Ok(Self {
            engine: AudioEngine::new(settings.engine_config()),
            store,
            settings,
            run,
        })
    }
}
