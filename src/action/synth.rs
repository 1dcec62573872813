use anyhow::Result;
use async_trait::async_trait;

/// Low-level input event synthesis.
///
/// Methods may suspend briefly for settle delays but never hold the
/// pipeline for more than tens of milliseconds per event. Per-event
/// platform failures are swallowed inside the implementation; an `Err`
/// from any method is catastrophic and aborts the whole plan.
#[async_trait]
pub trait InputSynthesizer: Send + Sync {
    /// Set the cursor to absolute screen coordinates.
    async fn move_mouse(&self, x: i32, y: i32) -> Result<()>;

    async fn click(&self, x: i32, y: i32) -> Result<()>;

    async fn right_click(&self, x: i32, y: i32) -> Result<()>;

    async fn double_click(&self, x: i32, y: i32) -> Result<()>;

    /// Type `text` as unicode keyboard events, one code unit at a time.
    async fn type_text(&self, text: &str) -> Result<()>;

    /// Press a `+`-separated chord: tokens go down in order, up in reverse.
    async fn press_keys(&self, spec: &str) -> Result<()>;

    /// Press at the source, glide to the destination, release.
    async fn drag(&self, sx: i32, sy: i32, ex: i32, ey: i32) -> Result<()>;

    /// Wheel scroll at a point; `amount` is signed, positive scrolls up.
    async fn scroll(&self, x: i32, y: i32, amount: i32) -> Result<()>;
}
