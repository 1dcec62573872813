#[cfg(windows)]
mod duplication;
mod frame;
mod ring;
mod source;

#[cfg(windows)]
pub use duplication::DuplicationSource;
pub use frame::{CaptureContext, Frame};
pub use ring::FrameRing;
pub use source::FrameSource;
