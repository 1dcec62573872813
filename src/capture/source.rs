use anyhow::Result;

use super::frame::Frame;

/// Produces screen frames on demand.
///
/// Only the engine's capture tick calls `capture_one`, always through a
/// mutex + `spawn_blocking`, so implementations need not be internally
/// thread-safe.
pub trait FrameSource: Send {
    /// Acquire platform resources. A failure here is fatal for the engine.
    fn start(&mut self) -> Result<()>;

    /// Release platform resources. Idempotent.
    fn stop(&mut self);

    /// Fetch the next frame. `None` covers the normal quiet cases: the
    /// platform timed out, nothing changed on screen, or a recoverable
    /// error forced a lazy reinitialization this tick.
    fn capture_one(&mut self) -> Option<Frame>;
}
