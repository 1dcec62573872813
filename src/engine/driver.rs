//! The long-running driver that ties sensor, source, ring, predictor and
//! executor together.
//!
//! One cycle is strictly sequential: capture before predict, predict
//! before approval, approval before execution, execution before cooling.
//! The per-tick loop only ever advances the machine; `approve` and
//! `dismiss` are the two external entry points the UI layer may call.

use anyhow::{Context, Result};
use chrono::Utc;
use std::sync::{Arc, Mutex as StdMutex};
use std::time::{Duration, Instant};
use tokio::sync::{broadcast, Mutex};
use tokio::time::{sleep, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::action::{ActionExecutor, InputSynthesizer, RunOutcome};
use crate::brain::{translate, Predictor};
use crate::capture::{CaptureContext, FrameRing, FrameSource};
use crate::idle::IdleSensor;
use crate::journal::{Journal, SuggestionRecord};
use crate::metrics::{CaptureMetrics, MetricsCollector};
use crate::settings::Settings;
use crate::{log_debug, log_info, log_warn};

use super::events::{EventBus, PulseEvent};
use super::machine::{PulseMachine, PulseState};
use super::suggestion::{Suggestion, SuggestionState};

const ENABLE_LOGS: bool = true;

/// Backoff after a failed tick before the loop resumes.
const TICK_BACKOFF: Duration = Duration::from_secs(1);

pub struct PulseEngine {
    settings: Settings,
    machine: PulseMachine,
    ring: FrameRing,
    sensor: Arc<dyn IdleSensor>,
    source: Arc<StdMutex<Box<dyn FrameSource>>>,
    predictor: Arc<dyn Predictor>,
    executor: Mutex<ActionExecutor>,
    events: EventBus,
    journal: Option<Journal>,
    metrics: MetricsCollector,
    cancel: CancellationToken,
}

impl PulseEngine {
    pub fn new(
        settings: Settings,
        sensor: Arc<dyn IdleSensor>,
        source: Box<dyn FrameSource>,
        predictor: Arc<dyn Predictor>,
        synth: Arc<dyn InputSynthesizer>,
        journal: Option<Journal>,
    ) -> Arc<Self> {
        let events = EventBus::new();
        let executor = ActionExecutor::new(synth, &settings.execution);
        let ring = FrameRing::new(settings.capture.ring_capacity());

        Arc::new(Self {
            machine: PulseMachine::new(events.clone()),
            ring,
            sensor,
            source: Arc::new(StdMutex::new(source)),
            predictor,
            executor: Mutex::new(executor),
            events,
            journal,
            metrics: MetricsCollector::new(),
            cancel: CancellationToken::new(),
            settings,
        })
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PulseEvent> {
        self.events.subscribe()
    }

    pub fn state(&self) -> PulseState {
        self.machine.state()
    }

    pub fn suggestion(&self) -> Option<Suggestion> {
        self.machine.suggestion()
    }

    pub fn metrics(&self) -> MetricsCollector {
        self.metrics.clone()
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Acquire platform capture resources. A failure here is fatal and
    /// must prevent the loop from ever starting.
    pub fn start_source(&self) -> Result<()> {
        self.source
            .lock()
            .unwrap()
            .start()
            .context("frame source failed to start")
    }

    /// Request shutdown. The loop unwinds at its next suspension point.
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }

    /// The per-tick loop. Runs until cancelled; a tick error logs and
    /// backs off rather than killing the engine.
    pub async fn run_loop(self: Arc<Self>) {
        let mut ticker = tokio::time::interval(self.settings.capture.frame_interval());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        log_info!(
            "pulse engine running at {} fps, pause threshold {} ms",
            self.settings.capture.frames_per_second,
            self.settings.capture.pause_threshold_ms
        );

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if let Err(err) = self.tick().await {
                        log_warn!("engine tick failed: {err:#}");
                        tokio::select! {
                            _ = sleep(TICK_BACKOFF) => {}
                            _ = self.cancel.cancelled() => break,
                        }
                    }
                }
                _ = self.cancel.cancelled() => break,
            }
        }

        self.machine.reset();
        self.source.lock().unwrap().stop();
        log_info!("pulse engine stopped");
    }

    async fn tick(&self) -> Result<()> {
        match self.machine.state() {
            PulseState::Idle => {
                self.machine.transition(PulseState::Capturing);
            }
            PulseState::Capturing => self.capture_tick().await?,
            PulseState::IntentDetected => self.predict_tick().await?,
            // Waiting on an external event; nothing to drive.
            PulseState::ProcessingCloud | PulseState::AwaitingApproval | PulseState::Executing => {}
            PulseState::Cooling => self.cooling_tick().await,
        }
        Ok(())
    }

    /// Pull one frame, then decide whether the user has paused long enough
    /// to escalate.
    async fn capture_tick(&self) -> Result<()> {
        let acquire_start = Instant::now();
        let source = Arc::clone(&self.source);
        let frame = tokio::task::spawn_blocking(move || source.lock().unwrap().capture_one())
            .await
            .context("capture worker join failed")?;
        let acquire_ms = acquire_start.elapsed().as_millis() as u64;

        if let Some(frame) = frame {
            let frame_bytes = frame.jpeg.len();
            log_debug!(
                "captured {}x{} frame, {} bytes in {acquire_ms}ms",
                frame.width,
                frame.height,
                frame_bytes
            );
            self.ring.push(frame);

            let (cpu_percent, memory_mb) = self.metrics.sample_system_metrics().await;
            self.metrics
                .record_capture(CaptureMetrics {
                    timestamp: Utc::now(),
                    acquire_ms,
                    frame_bytes,
                    cpu_percent,
                    memory_mb,
                })
                .await;
        }

        if self
            .sensor
            .is_idle(self.settings.capture.pause_threshold())
        {
            log_info!(
                "user paused for >= {} ms, escalating",
                self.settings.capture.pause_threshold_ms
            );
            self.machine.transition(PulseState::IntentDetected);
        } else {
            self.machine.transition(PulseState::Idle);
        }
        Ok(())
    }

    /// Ask the remote predictor what the user wants next. Anything short
    /// of a confident, non-empty plan quietly returns the machine to Idle.
    async fn predict_tick(&self) -> Result<()> {
        self.machine.transition(PulseState::ProcessingCloud);

        let batch = self.ring.recent(self.settings.capture.ring_capacity());
        let Some(latest) = batch.last() else {
            log_info!("no frames buffered, abandoning prediction");
            self.machine.transition(PulseState::Idle);
            return Ok(());
        };

        let context =
            CaptureContext::from_frame(latest, self.sensor.cursor_position(), Utc::now());

        let round_trip = Instant::now();
        let response = self.predictor.predict(&batch, &context).await;
        self.metrics
            .record_prediction(
                round_trip.elapsed().as_millis() as u64,
                response.as_ref().map(|r| r.confidence),
            )
            .await;

        let Some(response) = response else {
            log_info!("no prediction available");
            self.machine.transition(PulseState::Idle);
            return Ok(());
        };

        if response.confidence < self.settings.capture.min_confidence {
            log_info!(
                "prediction below confidence floor: {:.2} < {:.2}",
                response.confidence,
                self.settings.capture.min_confidence
            );
            self.machine.transition(PulseState::Idle);
            return Ok(());
        }

        let plan = translate(&response);
        if plan.is_empty() {
            log_info!("prediction translated to an empty plan");
            self.machine.transition(PulseState::Idle);
            return Ok(());
        }

        let description = if response.description.is_empty() {
            response
                .suggestion
                .clone()
                .unwrap_or_else(|| "Predicted action".to_string())
        } else {
            response.description.clone()
        };

        let suggestion = Suggestion::new(description, response.confidence, plan);
        log_info!(
            "suggestion ready: '{}' ({} steps, confidence {:.2})",
            suggestion.description,
            suggestion.plan.len(),
            suggestion.confidence
        );

        self.metrics.record_suggestion().await;
        self.machine.set_suggestion(suggestion.clone());
        self.machine.transition(PulseState::AwaitingApproval);
        self.events.emit(PulseEvent::SuggestionReady(suggestion));
        Ok(())
    }

    async fn cooling_tick(&self) {
        tokio::select! {
            _ = sleep(self.settings.capture.cooling_period()) => {}
            _ = self.cancel.cancelled() => return,
        }
        self.machine.transition(PulseState::Idle);
        self.machine.clear_suggestion();
    }

    /// Execute the current suggestion. Valid only in AwaitingApproval;
    /// anywhere else this logs and returns.
    pub async fn approve(&self) {
        if self.cancel.is_cancelled() {
            return;
        }
        if self.machine.state() != PulseState::AwaitingApproval {
            log_warn!("approve called outside AwaitingApproval, ignoring");
            return;
        }
        let Some(suggestion) = self.machine.suggestion() else {
            log_warn!("approve called with no live suggestion");
            self.machine.reset();
            return;
        };

        if !self.machine.transition(PulseState::Executing) {
            return;
        }

        let outcome = {
            let mut executor = self.executor.lock().await;
            executor.run(&suggestion.plan, &self.cancel).await
        };

        match outcome {
            Ok(RunOutcome::Completed) => {
                log_info!("suggestion '{}' executed", suggestion.description);
                if let Some(updated) = self.machine.mark_suggestion(SuggestionState::Executed) {
                    self.journal_suggestion(&updated).await;
                }
                self.machine.transition(PulseState::Cooling);
            }
            Ok(RunOutcome::Cancelled) => {
                // Shutdown raced the execution; reset handles the rest.
            }
            Err(err) => {
                log_warn!("suggestion '{}' failed: {err:#}", suggestion.description);
                if let Some(updated) = self.machine.mark_suggestion(SuggestionState::Failed) {
                    self.journal_suggestion(&updated).await;
                }
                self.events.emit(PulseEvent::ExecutionError(format!("{err:#}")));
                self.machine.transition(PulseState::Idle);
                self.machine.clear_suggestion();
            }
        }
    }

    /// Reject the current suggestion. Valid only in AwaitingApproval.
    pub async fn dismiss(&self) {
        if self.cancel.is_cancelled() {
            return;
        }
        if self.machine.state() != PulseState::AwaitingApproval {
            log_warn!("dismiss called outside AwaitingApproval, ignoring");
            return;
        }

        if let Some(updated) = self.machine.mark_suggestion(SuggestionState::Dismissed) {
            log_info!("suggestion '{}' dismissed", updated.description);
            self.journal_suggestion(&updated).await;
        }
        self.machine.clear_suggestion();
        self.machine.transition(PulseState::Idle);
        self.events.emit(PulseEvent::SuggestionDismissed);
    }

    /// Best-effort undo of the most recently executed action.
    pub async fn undo_last(&self) {
        let mut executor = self.executor.lock().await;
        if let Err(err) = executor.undo_last().await {
            log_warn!("undo failed: {err:#}");
        }
    }

    async fn journal_suggestion(&self, suggestion: &Suggestion) {
        let Some(journal) = &self.journal else {
            return;
        };
        if let Err(err) = journal
            .append_suggestion(SuggestionRecord::from(suggestion))
            .await
        {
            log_warn!("failed to journal suggestion {}: {err:#}", suggestion.id);
        }
    }
}
