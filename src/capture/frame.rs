use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;

/// A single captured screen frame.
///
/// Immutable once produced; the compressed bytes are shared, not copied,
/// when a frame moves between the ring and a prediction batch.
#[derive(Debug, Clone)]
pub struct Frame {
    /// Lossy-compressed (JPEG) image bytes, typically well under 100 KB.
    pub jpeg: Arc<Vec<u8>>,
    pub captured_at: DateTime<Utc>,
    pub width: u32,
    pub height: u32,
    pub cursor_x: i32,
    pub cursor_y: i32,
}

impl Frame {
    pub fn new(
        jpeg: Vec<u8>,
        captured_at: DateTime<Utc>,
        width: u32,
        height: u32,
        cursor_x: i32,
        cursor_y: i32,
    ) -> Self {
        Self {
            jpeg: Arc::new(jpeg),
            captured_at,
            width,
            height,
            cursor_x,
            cursor_y,
        }
    }
}

/// Snapshot of the monitor and cursor at prediction time, sent alongside
/// the frame batch.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptureContext {
    pub monitor_width: u32,
    pub monitor_height: u32,
    pub cursor_x: i32,
    pub cursor_y: i32,
    pub timestamp: DateTime<Utc>,
}

impl CaptureContext {
    /// Build from the most recent frame plus the cursor position right now.
    pub fn from_frame(frame: &Frame, cursor: (i32, i32), now: DateTime<Utc>) -> Self {
        Self {
            monitor_width: frame.width,
            monitor_height: frame.height,
            cursor_x: cursor.0,
            cursor_y: cursor.1,
            timestamp: now,
        }
    }
}
