mod types;

pub use types::{CaptureMetrics, MetricsSnapshot, PredictionMetrics, SystemMetrics};

use chrono::Utc;
use std::sync::Arc;
use sysinfo::{Pid, ProcessesToUpdate, System};
use tokio::sync::Mutex;

const MAX_RECENT_SAMPLES: usize = 20;

/// Rolling capture/prediction timings plus process CPU and RSS.
///
/// Purely observational; nothing in the pipeline consults it.
pub struct MetricsCollector {
    inner: Arc<Mutex<MetricsState>>,
}

struct MetricsState {
    recent_captures: Vec<CaptureMetrics>,
    recent_predictions: Vec<PredictionMetrics>,
    capture_count: u64,
    prediction_count: u64,
    suggestion_count: u64,
    system: System,
    pid: Pid,
}

impl MetricsCollector {
    pub fn new() -> Self {
        let mut system = System::new();
        let pid = Pid::from_u32(std::process::id());

        // First refresh establishes the baseline the CPU delta needs.
        system.refresh_processes(ProcessesToUpdate::Some(&[pid]));

        Self {
            inner: Arc::new(Mutex::new(MetricsState {
                recent_captures: Vec::with_capacity(MAX_RECENT_SAMPLES),
                recent_predictions: Vec::with_capacity(MAX_RECENT_SAMPLES),
                capture_count: 0,
                prediction_count: 0,
                suggestion_count: 0,
                system,
                pid,
            })),
        }
    }

    pub async fn sample_system_metrics(&self) -> (f32, f64) {
        let mut state = self.inner.lock().await;
        let pid = state.pid;
        state.system.refresh_processes(ProcessesToUpdate::Some(&[pid]));

        if let Some(process) = state.system.process(pid) {
            (
                process.cpu_usage(),
                process.memory() as f64 / 1024.0 / 1024.0,
            )
        } else {
            (0.0, 0.0)
        }
    }

    pub async fn record_capture(&self, metrics: CaptureMetrics) {
        let mut state = self.inner.lock().await;
        state.capture_count += 1;
        state.recent_captures.push(metrics);
        if state.recent_captures.len() > MAX_RECENT_SAMPLES {
            state.recent_captures.remove(0);
        }
    }

    pub async fn record_prediction(&self, round_trip_ms: u64, confidence: Option<f64>) {
        let mut state = self.inner.lock().await;
        state.prediction_count += 1;
        state.recent_predictions.push(PredictionMetrics {
            timestamp: Utc::now(),
            round_trip_ms,
            confidence,
        });
        if state.recent_predictions.len() > MAX_RECENT_SAMPLES {
            state.recent_predictions.remove(0);
        }
    }

    pub async fn record_suggestion(&self) {
        self.inner.lock().await.suggestion_count += 1;
    }

    pub async fn get_snapshot(&self) -> MetricsSnapshot {
        let mut state = self.inner.lock().await;
        let pid = state.pid;
        state.system.refresh_processes(ProcessesToUpdate::Some(&[pid]));

        let system = if let Some(process) = state.system.process(pid) {
            SystemMetrics {
                cpu_percent: process.cpu_usage(),
                memory_mb: process.memory() as f64 / 1024.0 / 1024.0,
            }
        } else {
            SystemMetrics::default()
        };

        MetricsSnapshot {
            system,
            recent_captures: state.recent_captures.clone(),
            recent_predictions: state.recent_predictions.clone(),
            capture_count: state.capture_count,
            prediction_count: state.prediction_count,
            suggestion_count: state.suggestion_count,
        }
    }
}

impl Clone for MetricsCollector {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn capture_samples_are_bounded() {
        let collector = MetricsCollector::new();
        for i in 0..30 {
            collector
                .record_capture(CaptureMetrics {
                    timestamp: Utc::now(),
                    acquire_ms: i,
                    frame_bytes: 1000,
                    cpu_percent: 0.0,
                    memory_mb: 0.0,
                })
                .await;
        }
        let snapshot = collector.get_snapshot().await;
        assert_eq!(snapshot.capture_count, 30);
        assert_eq!(snapshot.recent_captures.len(), MAX_RECENT_SAMPLES);
        // Oldest samples were evicted first.
        assert_eq!(snapshot.recent_captures[0].acquire_ms, 10);
    }

    #[tokio::test]
    async fn prediction_counters_track_misses_too() {
        let collector = MetricsCollector::new();
        collector.record_prediction(120, Some(0.92)).await;
        collector.record_prediction(5000, None).await;
        let snapshot = collector.get_snapshot().await;
        assert_eq!(snapshot.prediction_count, 2);
        assert_eq!(snapshot.recent_predictions[1].confidence, None);
    }
}
