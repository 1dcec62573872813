//! Headless driver binary.
//!
//! Wires the platform sensor, capture source, cloud client and synthesizer
//! into the engine, logs engine events, and shuts down cleanly on Ctrl-C.
//! The overlay/tray front end talks to the same engine surface (events in,
//! `approve`/`dismiss` out); this binary stands in for it during bring-up.

#[cfg(windows)]
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    windows_main::run().await
}

#[cfg(not(windows))]
fn main() -> anyhow::Result<()> {
    anyhow::bail!("deskpulse drives Win32 capture and input APIs; run it on Windows")
}

#[cfg(windows)]
mod windows_main {
    use anyhow::Result;
    use log::{info, warn};
    use std::{path::PathBuf, sync::Arc};

    use deskpulse::action::SendInputSynthesizer;
    use deskpulse::capture::DuplicationSource;
    use deskpulse::idle::SystemIdleSensor;
    use deskpulse::{
        CloudBrainClient, EngineController, Journal, PulseEngine, PulseEvent, SettingsStore,
    };

    pub async fn run() -> Result<()> {
        env_logger::Builder::from_default_env()
            .filter_level(log::LevelFilter::Info)
            .init();

        info!("DeskPulse starting up...");

        let data_dir = std::env::var("DESKPULSE_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("."));
        std::fs::create_dir_all(&data_dir)?;

        let store = SettingsStore::new(data_dir.join("settings.json"))?;
        let settings = store.settings();
        if settings.cloud_brain.api_key.is_empty() {
            warn!("no API key configured; the prediction service will reject requests");
        }

        let journal = Journal::new(data_dir.join("deskpulse.sqlite3"))?;

        let engine = PulseEngine::new(
            settings.clone(),
            Arc::new(SystemIdleSensor::new()),
            Box::new(DuplicationSource::new()),
            Arc::new(CloudBrainClient::new(&settings.cloud_brain)),
            Arc::new(SendInputSynthesizer::new()),
            Some(journal),
        );

        let mut events = engine.subscribe();
        tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(PulseEvent::SuggestionReady(suggestion)) => {
                        info!(
                            "suggestion ready: '{}' (confidence {:.2}, {} steps)",
                            suggestion.description,
                            suggestion.confidence,
                            suggestion.plan.len()
                        );
                    }
                    Ok(PulseEvent::SuggestionDismissed) => info!("suggestion dismissed"),
                    Ok(PulseEvent::ExecutionError(message)) => {
                        warn!("execution failed: {message}");
                    }
                    Ok(PulseEvent::StateChanged { .. }) => {}
                    Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!("event logger lagged, skipped {skipped} events");
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
                }
            }
        });

        let mut controller = EngineController::new(engine);
        controller.start()?;

        tokio::signal::ctrl_c().await?;
        info!("Ctrl-C received, shutting down");
        controller.stop().await?;

        Ok(())
    }
}
