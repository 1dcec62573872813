//! Time-since-last-input and cursor queries.
//!
//! A failing OS query degrades to "user is active" / origin cursor rather
//! than erroring: a broken sensor must never cause a spurious escalation.

use std::time::Duration;

pub trait IdleSensor: Send + Sync {
    /// Time since the last OS-level input event. Never blocks.
    fn idle_duration(&self) -> Duration;

    /// Current cursor position in screen coordinates. Never blocks.
    fn cursor_position(&self) -> (i32, i32);

    fn is_idle(&self, threshold: Duration) -> bool {
        self.idle_duration() >= threshold
    }
}

#[cfg(windows)]
pub use platform::SystemIdleSensor;

#[cfg(windows)]
mod platform {
    use std::time::Duration;

    use windows::Win32::Foundation::POINT;
    use windows::Win32::System::SystemInformation::GetTickCount;
    use windows::Win32::UI::Input::KeyboardAndMouse::{GetLastInputInfo, LASTINPUTINFO};
    use windows::Win32::UI::WindowsAndMessaging::GetCursorPos;

    use super::IdleSensor;

    pub struct SystemIdleSensor;

    impl SystemIdleSensor {
        pub fn new() -> Self {
            Self
        }
    }

    impl IdleSensor for SystemIdleSensor {
        fn idle_duration(&self) -> Duration {
            let mut info = LASTINPUTINFO {
                cbSize: std::mem::size_of::<LASTINPUTINFO>() as u32,
                dwTime: 0,
            };
            if !unsafe { GetLastInputInfo(&mut info) }.as_bool() {
                return Duration::ZERO;
            }
            // Tick counts wrap every ~49 days; wrapping_sub keeps the delta
            // correct across the boundary.
            let elapsed = unsafe { GetTickCount() }.wrapping_sub(info.dwTime);
            Duration::from_millis(u64::from(elapsed))
        }

        fn cursor_position(&self) -> (i32, i32) {
            let mut point = POINT::default();
            match unsafe { GetCursorPos(&mut point) } {
                Ok(()) => (point.x, point.y),
                Err(_) => (0, 0),
            }
        }
    }
}
