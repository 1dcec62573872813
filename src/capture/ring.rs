use chrono::{DateTime, Utc};
use std::collections::VecDeque;
use std::sync::Mutex;

use super::frame::Frame;

/// Bounded, time-ordered buffer of recent frames.
///
/// Capacity is fixed at construction (`fps × buffer_seconds`); pushing at
/// capacity evicts the oldest frame. Insertion order equals timestamp order
/// because only the capture loop appends.
pub struct FrameRing {
    frames: Mutex<VecDeque<Frame>>,
    capacity: usize,
}

impl FrameRing {
    pub fn new(capacity: usize) -> Self {
        Self {
            frames: Mutex::new(VecDeque::with_capacity(capacity.max(1))),
            capacity: capacity.max(1),
        }
    }

    pub fn push(&self, frame: Frame) {
        let mut frames = self.frames.lock().unwrap();
        if frames.len() == self.capacity {
            frames.pop_front();
        }
        frames.push_back(frame);
    }

    /// Up to the `n` most recently appended frames, oldest first.
    pub fn recent(&self, n: usize) -> Vec<Frame> {
        let frames = self.frames.lock().unwrap();
        let skip = frames.len().saturating_sub(n);
        frames.iter().skip(skip).cloned().collect()
    }

    /// Frames captured at or after `t`, oldest first.
    pub fn since(&self, t: DateTime<Utc>) -> Vec<Frame> {
        let frames = self.frames.lock().unwrap();
        frames
            .iter()
            .filter(|frame| frame.captured_at >= t)
            .cloned()
            .collect()
    }

    pub fn clear(&self) {
        self.frames.lock().unwrap().clear();
    }

    pub fn len(&self) -> usize {
        self.frames.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn frame_at(offset_ms: i64) -> Frame {
        let at = Utc::now() + Duration::milliseconds(offset_ms);
        Frame::new(vec![0], at, 100, 100, 0, 0)
    }

    #[test]
    fn push_evicts_oldest_at_capacity() {
        let ring = FrameRing::new(3);
        for i in 0..5 {
            ring.push(frame_at(i * 10));
        }
        assert_eq!(ring.len(), 3);
        let frames = ring.recent(10);
        assert_eq!(frames.len(), 3);
        for pair in frames.windows(2) {
            assert!(pair[0].captured_at <= pair[1].captured_at);
        }
    }

    #[test]
    fn recent_returns_newest_in_chronological_order() {
        let ring = FrameRing::new(12);
        for i in 0..6 {
            ring.push(frame_at(i * 10));
        }
        let two = ring.recent(2);
        assert_eq!(two.len(), 2);
        assert!(two[0].captured_at < two[1].captured_at);
        let all = ring.recent(100);
        assert_eq!(all.len(), 6);
    }

    #[test]
    fn since_filters_by_timestamp() {
        let ring = FrameRing::new(12);
        let cutoff = Utc::now() + Duration::milliseconds(25);
        for i in 0..6 {
            ring.push(frame_at(i * 10));
        }
        let newer = ring.since(cutoff);
        assert!(newer.len() < 6);
        assert!(newer.iter().all(|f| f.captured_at >= cutoff));
    }

    #[test]
    fn clear_drops_everything() {
        let ring = FrameRing::new(4);
        ring.push(frame_at(0));
        ring.push(frame_at(10));
        ring.clear();
        assert!(ring.is_empty());
        assert_eq!(ring.capacity(), 4);
    }

    #[test]
    fn len_never_exceeds_capacity() {
        let ring = FrameRing::new(2);
        for i in 0..50 {
            ring.push(frame_at(i));
            assert!(ring.len() <= ring.capacity());
        }
    }
}
