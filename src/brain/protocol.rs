//! Wire types for the prediction service.
//!
//! The response is accepted in two shapes: the current `actions` array and
//! the legacy single `(action, coordinates)` pair with an optional
//! top-level `suggestion` label. Unknown fields are ignored so server-side
//! additions never break parsing.

use serde::{Deserialize, Serialize};

use crate::action::Region;
use crate::capture::CaptureContext;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PredictionRequest {
    /// Base64-encoded JPEG frames, most recent last.
    pub frames: Vec<String>,
    /// ISO-8601 UTC request timestamp.
    pub timestamp: String,
    pub context: CaptureContext,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CloudAction {
    #[serde(rename = "type")]
    pub kind: String,
    pub target: Option<String>,
    pub region: Option<Region>,
    pub x: Option<i32>,
    pub y: Option<i32>,
    pub text: Option<String>,
    pub keys: Option<String>,
    pub source_region: Option<Region>,
    pub target_region: Option<Region>,
    pub end_x: Option<i32>,
    pub end_y: Option<i32>,
    pub direction: Option<String>,
    pub amount: Option<i32>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PredictionResponse {
    pub confidence: f64,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub actions: Vec<CloudAction>,
    /// Legacy shape: label for the single predicted action.
    #[serde(default)]
    pub suggestion: Option<String>,
    /// Legacy shape: single action verb, e.g. `CLICK`.
    #[serde(default)]
    pub action: Option<String>,
    /// Legacy shape: where the single action lands.
    #[serde(default)]
    pub coordinates: Option<Point>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_array_shape() {
        let response: PredictionResponse = serde_json::from_str(
            r#"{
                "confidence": 0.92,
                "description": "Save the document",
                "actions": [
                    {"type": "click", "target": "Save button", "region": {"x": 10, "y": 20, "width": 50, "height": 30}},
                    {"type": "key", "keys": "ctrl+s"}
                ]
            }"#,
        )
        .unwrap();
        assert_eq!(response.actions.len(), 2);
        assert_eq!(response.actions[0].kind, "click");
        assert_eq!(
            response.actions[0].region,
            Some(Region::new(10, 20, 50, 30))
        );
        assert_eq!(response.actions[1].keys.as_deref(), Some("ctrl+s"));
        assert!(response.action.is_none());
    }

    #[test]
    fn parses_legacy_shape() {
        let response: PredictionResponse = serde_json::from_str(
            r#"{
                "confidence": 0.92,
                "description": "Click Save",
                "suggestion": "Click Save",
                "action": "CLICK",
                "coordinates": {"x": 450, "y": 320}
            }"#,
        )
        .unwrap();
        assert!(response.actions.is_empty());
        assert_eq!(response.action.as_deref(), Some("CLICK"));
        assert_eq!(response.coordinates, Some(Point { x: 450, y: 320 }));
    }

    #[test]
    fn tolerates_unknown_fields_and_drag_endpoints() {
        let response: PredictionResponse = serde_json::from_str(
            r#"{
                "confidence": 0.9,
                "description": "Move file",
                "modelVersion": "vl-2",
                "actions": [
                    {"type": "drag", "target": "File", "x": 100, "y": 100, "endX": 500, "endY": 500}
                ]
            }"#,
        )
        .unwrap();
        let action = &response.actions[0];
        assert_eq!(action.end_x, Some(500));
        assert_eq!(action.end_y, Some(500));
    }
}
