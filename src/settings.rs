use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf, sync::RwLock, time::Duration};

/// Capture-loop tuning: cadence, buffer depth, and the thresholds that
/// decide when an idle user becomes a prediction request.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CaptureSettings {
    pub frames_per_second: u32,
    pub buffer_seconds: u32,
    /// Idle duration after which the engine escalates to prediction.
    pub pause_threshold_ms: u64,
    /// Predictions below this confidence never become suggestions.
    pub min_confidence: f64,
    /// Quiet interval after a successful execution.
    pub cooling_period_ms: u64,
}

impl Default for CaptureSettings {
    fn default() -> Self {
        Self {
            frames_per_second: 3,
            buffer_seconds: 4,
            pause_threshold_ms: 1000,
            min_confidence: 0.80,
            cooling_period_ms: 500,
        }
    }
}

impl CaptureSettings {
    pub fn frame_interval(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.frames_per_second.max(1) as f64)
    }

    pub fn ring_capacity(&self) -> usize {
        (self.frames_per_second * self.buffer_seconds).max(1) as usize
    }

    pub fn pause_threshold(&self) -> Duration {
        Duration::from_millis(self.pause_threshold_ms)
    }

    pub fn cooling_period(&self) -> Duration {
        Duration::from_millis(self.cooling_period_ms)
    }
}

/// Pacing of synthesized input: each plan step is followed by a uniform
/// random delay drawn from `[min_delay_ms, max_delay_ms]`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ExecutionSettings {
    pub min_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for ExecutionSettings {
    fn default() -> Self {
        Self {
            min_delay_ms: 100,
            max_delay_ms: 300,
        }
    }
}

/// Remote predictor endpoint.
///
/// `timeout_ms` defaults to 5000: a remote vision model round-trip does not
/// complete in the hundreds of milliseconds, and the call is a single
/// attempt with no retries.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CloudBrainSettings {
    pub prediction_endpoint: String,
    pub api_key: String,
    pub timeout_ms: u64,
    /// Client-side floor; responses below it are discarded before the
    /// engine ever sees them.
    pub min_confidence: f64,
}

impl Default for CloudBrainSettings {
    fn default() -> Self {
        Self {
            prediction_endpoint: "http://127.0.0.1:8080/api/predict".into(),
            api_key: String::new(),
            timeout_ms: 5000,
            min_confidence: 0.80,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    pub capture: CaptureSettings,
    pub execution: ExecutionSettings,
    pub cloud_brain: CloudBrainSettings,
}

pub struct SettingsStore {
    path: PathBuf,
    data: RwLock<Settings>,
}

impl SettingsStore {
    /// Load settings from `path`, falling back to defaults when the file is
    /// absent or unparseable. A missing file is not an error; first launch
    /// has no config yet.
    pub fn new(path: PathBuf) -> Result<Self> {
        let data = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read settings from {}", path.display()))?;
            serde_json::from_str(&contents).unwrap_or_default()
        } else {
            Settings::default()
        };

        Ok(Self {
            path,
            data: RwLock::new(data),
        })
    }

    pub fn settings(&self) -> Settings {
        self.data.read().unwrap().clone()
    }

    pub fn reload(&self) -> Result<()> {
        let contents = fs::read_to_string(&self.path)?;
        let data: Settings = serde_json::from_str(&contents)?;
        let mut guard = self.data.write().unwrap();
        *guard = data;
        Ok(())
    }

    pub fn persist(&self) -> Result<()> {
        let serialized = serde_json::to_string_pretty(&*self.data.read().unwrap())?;
        fs::write(&self.path, serialized)
            .with_context(|| format!("Failed to write settings to {}", self.path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let settings = Settings::default();
        assert_eq!(settings.capture.frames_per_second, 3);
        assert_eq!(settings.capture.buffer_seconds, 4);
        assert_eq!(settings.capture.pause_threshold_ms, 1000);
        assert_eq!(settings.capture.cooling_period_ms, 500);
        assert!((settings.capture.min_confidence - 0.80).abs() < f64::EPSILON);
        assert_eq!(settings.execution.min_delay_ms, 100);
        assert_eq!(settings.execution.max_delay_ms, 300);
        assert_eq!(settings.cloud_brain.timeout_ms, 5000);
    }

    #[test]
    fn ring_capacity_is_fps_times_buffer() {
        let capture = CaptureSettings::default();
        assert_eq!(capture.ring_capacity(), 12);
    }

    #[test]
    fn partial_json_fills_in_defaults() {
        let settings: Settings = serde_json::from_str(
            r#"{"capture": {"framesPerSecond": 5}, "cloudBrain": {"apiKey": "k"}}"#,
        )
        .unwrap();
        assert_eq!(settings.capture.frames_per_second, 5);
        assert_eq!(settings.capture.buffer_seconds, 4);
        assert_eq!(settings.cloud_brain.api_key, "k");
        assert_eq!(settings.cloud_brain.timeout_ms, 5000);
    }
}
