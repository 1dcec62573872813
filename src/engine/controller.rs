use anyhow::{bail, Context, Result};
use log::info;
use std::sync::Arc;
use tokio::task::JoinHandle;

use super::driver::PulseEngine;

/// Owns the engine's background task: starts the frame source, spawns the
/// tick loop, and joins it on shutdown.
pub struct EngineController {
    engine: Arc<PulseEngine>,
    handle: Option<JoinHandle<()>>,
}

impl EngineController {
    pub fn new(engine: Arc<PulseEngine>) -> Self {
        Self {
            engine,
            handle: None,
        }
    }

    pub fn engine(&self) -> Arc<PulseEngine> {
        Arc::clone(&self.engine)
    }

    pub fn start(&mut self) -> Result<()> {
        if self.handle.is_some() {
            bail!("engine already running");
        }

        // A source that cannot start is fatal; never spawn the loop.
        self.engine.start_source()?;

        info!("Starting pulse engine loop");
        let engine = Arc::clone(&self.engine);
        self.handle = Some(tokio::spawn(engine.run_loop()));
        Ok(())
    }

    pub async fn stop(&mut self) -> Result<()> {
        self.engine.shutdown();

        if let Some(handle) = self.handle.take() {
            handle
                .await
                .context("engine loop task failed to join")?;
        }
        Ok(())
    }
}
