use async_trait::async_trait;
use base64::Engine;
use chrono::Utc;
use log::{debug, warn};
use reqwest::StatusCode;
use std::time::Duration;

use crate::capture::{CaptureContext, Frame};
use crate::settings::CloudBrainSettings;

use super::protocol::{PredictionRequest, PredictionResponse};

/// The remote prediction service never accepts more frames than this.
const MAX_FRAMES_PER_REQUEST: usize = 20;

/// Remote intent prediction, seen only as a request/response contract.
///
/// `None` covers every way a prediction can fail to materialize: timeout,
/// transport error, non-2xx status, unparseable body, or a confidence
/// below the client's floor. Callers treat all of them identically.
#[async_trait]
pub trait Predictor: Send + Sync {
    async fn predict(
        &self,
        frames: &[Frame],
        context: &CaptureContext,
    ) -> Option<PredictionResponse>;
}

/// HTTP client for the cloud prediction endpoint.
///
/// A prediction is a single attempt bounded by the configured timeout;
/// there are no retries, because by the next pause the frames are stale.
pub struct CloudBrainClient {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    min_confidence: f64,
}

impl CloudBrainClient {
    pub fn new(settings: &CloudBrainSettings) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(settings.timeout_ms))
            .build()
            .unwrap_or_default();

        Self {
            client,
            endpoint: settings.prediction_endpoint.clone(),
            api_key: settings.api_key.clone(),
            min_confidence: settings.min_confidence,
        }
    }

    fn build_request(frames: &[Frame], context: &CaptureContext) -> PredictionRequest {
        let skip = frames.len().saturating_sub(MAX_FRAMES_PER_REQUEST);
        if skip > 0 {
            debug!("clamping prediction batch from {} to {MAX_FRAMES_PER_REQUEST} frames", frames.len());
        }
        let encoded = frames
            .iter()
            .skip(skip)
            .map(|frame| base64::engine::general_purpose::STANDARD.encode(frame.jpeg.as_slice()))
            .collect();

        PredictionRequest {
            frames: encoded,
            timestamp: Utc::now().to_rfc3339(),
            context: context.clone(),
        }
    }
}

#[async_trait]
impl Predictor for CloudBrainClient {
    async fn predict(
        &self,
        frames: &[Frame],
        context: &CaptureContext,
    ) -> Option<PredictionResponse> {
        let request = Self::build_request(frames, context);

        let response = match self
            .client
            .post(&self.endpoint)
            .header("X-API-Key", &self.api_key)
            .json(&request)
            .send()
            .await
        {
            Ok(response) => response,
            Err(err) => {
                warn!("prediction request failed: {err}");
                return None;
            }
        };

        let status = response.status();
        if !status.is_success() {
            if status == StatusCode::UNAUTHORIZED {
                warn!("prediction service rejected the API key");
            } else {
                warn!("prediction service returned {status}");
            }
            return None;
        }

        let parsed: PredictionResponse = match response.json().await {
            Ok(parsed) => parsed,
            Err(err) => {
                warn!("unparseable prediction response: {err}");
                return None;
            }
        };

        if parsed.confidence < self.min_confidence {
            debug!(
                "discarding prediction below client floor: {:.2} < {:.2}",
                parsed.confidence, self.min_confidence
            );
            return None;
        }

        Some(parsed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(byte: u8) -> Frame {
        Frame::new(vec![byte], Utc::now(), 1920, 1080, 0, 0)
    }

    fn context() -> CaptureContext {
        CaptureContext {
            monitor_width: 1920,
            monitor_height: 1080,
            cursor_x: 10,
            cursor_y: 20,
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn request_encodes_frames_as_base64() {
        let frames = vec![frame(1), frame(2)];
        let request = CloudBrainClient::build_request(&frames, &context());
        assert_eq!(request.frames.len(), 2);
        assert_eq!(
            request.frames[0],
            base64::engine::general_purpose::STANDARD.encode([1u8])
        );
        let body = serde_json::to_value(&request).unwrap();
        assert_eq!(body["context"]["cursorX"], 10);
    }

    #[test]
    fn request_clamps_to_twenty_newest_frames() {
        let frames: Vec<Frame> = (0..30).map(|i| frame(i as u8)).collect();
        let request = CloudBrainClient::build_request(&frames, &context());
        assert_eq!(request.frames.len(), MAX_FRAMES_PER_REQUEST);
        // The newest frames survive the clamp.
        assert_eq!(
            request.frames.last().unwrap(),
            &base64::engine::general_purpose::STANDARD.encode([29u8])
        );
    }
}
