//! `SendInput`-backed synthesizer.
//!
//! Every public method degrades gracefully: a rejected `SendInput` batch is
//! logged and skipped rather than failing the plan. Pacing inside a gesture
//! (settle before click, glide steps during drag) lives here; pacing
//! between plan steps belongs to the executor.

use anyhow::Result;
use async_trait::async_trait;
use log::warn;
use std::time::Duration;
use tokio::time::sleep;

use windows::Win32::UI::Input::KeyboardAndMouse::{
    SendInput, INPUT, INPUT_0, INPUT_KEYBOARD, INPUT_MOUSE, KEYBDINPUT, KEYEVENTF_KEYUP,
    KEYEVENTF_UNICODE, MOUSEEVENTF_ABSOLUTE, MOUSEEVENTF_LEFTDOWN, MOUSEEVENTF_LEFTUP,
    MOUSEEVENTF_MOVE, MOUSEEVENTF_RIGHTDOWN, MOUSEEVENTF_RIGHTUP, MOUSEEVENTF_WHEEL, MOUSEINPUT,
    VIRTUAL_KEY, VK_BACK, VK_CONTROL, VK_DELETE, VK_DOWN, VK_END, VK_ESCAPE, VK_F1, VK_HOME,
    VK_INSERT, VK_LEFT, VK_LWIN, VK_MENU, VK_NEXT, VK_PRIOR, VK_RETURN, VK_RIGHT, VK_SHIFT,
    VK_SPACE, VK_TAB, VK_UP,
};
use windows::Win32::UI::WindowsAndMessaging::{GetSystemMetrics, SM_CXSCREEN, SM_CYSCREEN};

use super::keys::{parse_chord, KeyToken};
use super::synth::InputSynthesizer;

/// Cursor settle before a button event.
const SETTLE_DELAY: Duration = Duration::from_millis(50);
/// Gap between the two clicks of a double click.
const DOUBLE_CLICK_GAP: Duration = Duration::from_millis(100);
const DRAG_STEPS: i32 = 20;
const DRAG_STEP_DELAY: Duration = Duration::from_millis(10);
const WHEEL_DELTA: i32 = 120;

pub struct SendInputSynthesizer;

impl SendInputSynthesizer {
    pub fn new() -> Self {
        Self
    }

    fn send(inputs: &[INPUT]) {
        let sent = unsafe { SendInput(inputs, std::mem::size_of::<INPUT>() as i32) };
        if sent as usize != inputs.len() {
            warn!(
                "SendInput accepted {sent} of {} events; input may be blocked",
                inputs.len()
            );
        }
    }

    fn mouse_event(dx: i32, dy: i32, data: i32, flags: u32) -> INPUT {
        INPUT {
            r#type: INPUT_MOUSE,
            Anonymous: INPUT_0 {
                mi: MOUSEINPUT {
                    dx,
                    dy,
                    mouseData: data,
                    dwFlags: windows::Win32::UI::Input::KeyboardAndMouse::MOUSE_EVENT_FLAGS(flags),
                    time: 0,
                    dwExtraInfo: 0,
                },
            },
        }
    }

    fn key_event(vk: VIRTUAL_KEY, scan: u16, flags: u32) -> INPUT {
        INPUT {
            r#type: INPUT_KEYBOARD,
            Anonymous: INPUT_0 {
                ki: KEYBDINPUT {
                    wVk: vk,
                    wScan: scan,
                    dwFlags: windows::Win32::UI::Input::KeyboardAndMouse::KEYBD_EVENT_FLAGS(flags),
                    time: 0,
                    dwExtraInfo: 0,
                },
            },
        }
    }

    fn move_abs(x: i32, y: i32) {
        let width = unsafe { GetSystemMetrics(SM_CXSCREEN) }.max(2);
        let height = unsafe { GetSystemMetrics(SM_CYSCREEN) }.max(2);
        let nx = x.clamp(0, width - 1) * 65535 / (width - 1);
        let ny = y.clamp(0, height - 1) * 65535 / (height - 1);
        Self::send(&[Self::mouse_event(
            nx,
            ny,
            0,
            MOUSEEVENTF_MOVE.0 | MOUSEEVENTF_ABSOLUTE.0,
        )]);
    }

    fn button_pair(down: u32, up: u32) {
        Self::send(&[
            Self::mouse_event(0, 0, 0, down),
            Self::mouse_event(0, 0, 0, up),
        ]);
    }
}

#[async_trait]
impl InputSynthesizer for SendInputSynthesizer {
    async fn move_mouse(&self, x: i32, y: i32) -> Result<()> {
        Self::move_abs(x, y);
        Ok(())
    }

    async fn click(&self, x: i32, y: i32) -> Result<()> {
        Self::move_abs(x, y);
        sleep(SETTLE_DELAY).await;
        Self::button_pair(MOUSEEVENTF_LEFTDOWN.0, MOUSEEVENTF_LEFTUP.0);
        Ok(())
    }

    async fn right_click(&self, x: i32, y: i32) -> Result<()> {
        Self::move_abs(x, y);
        sleep(SETTLE_DELAY).await;
        Self::button_pair(MOUSEEVENTF_RIGHTDOWN.0, MOUSEEVENTF_RIGHTUP.0);
        Ok(())
    }

    async fn double_click(&self, x: i32, y: i32) -> Result<()> {
        self.click(x, y).await?;
        sleep(DOUBLE_CLICK_GAP).await;
        Self::button_pair(MOUSEEVENTF_LEFTDOWN.0, MOUSEEVENTF_LEFTUP.0);
        Ok(())
    }

    async fn type_text(&self, text: &str) -> Result<()> {
        for unit in text.encode_utf16() {
            Self::send(&[
                Self::key_event(VIRTUAL_KEY(0), unit, KEYEVENTF_UNICODE.0),
                Self::key_event(VIRTUAL_KEY(0), unit, KEYEVENTF_UNICODE.0 | KEYEVENTF_KEYUP.0),
            ]);
        }
        Ok(())
    }

    async fn press_keys(&self, spec: &str) -> Result<()> {
        let tokens = parse_chord(spec);
        let codes: Vec<VIRTUAL_KEY> = tokens.iter().map(|t| virtual_key(*t)).collect();

        for vk in &codes {
            Self::send(&[Self::key_event(*vk, 0, 0)]);
        }
        for vk in codes.iter().rev() {
            Self::send(&[Self::key_event(*vk, 0, KEYEVENTF_KEYUP.0)]);
        }
        Ok(())
    }

    async fn drag(&self, sx: i32, sy: i32, ex: i32, ey: i32) -> Result<()> {
        Self::move_abs(sx, sy);
        sleep(SETTLE_DELAY).await;
        Self::send(&[Self::mouse_event(0, 0, 0, MOUSEEVENTF_LEFTDOWN.0)]);

        for step in 1..=DRAG_STEPS {
            let x = sx + (ex - sx) * step / DRAG_STEPS;
            let y = sy + (ey - sy) * step / DRAG_STEPS;
            Self::move_abs(x, y);
            sleep(DRAG_STEP_DELAY).await;
        }

        Self::send(&[Self::mouse_event(0, 0, 0, MOUSEEVENTF_LEFTUP.0)]);
        Ok(())
    }

    async fn scroll(&self, x: i32, y: i32, amount: i32) -> Result<()> {
        Self::move_abs(x, y);
        sleep(SETTLE_DELAY).await;
        Self::send(&[Self::mouse_event(
            0,
            0,
            amount * WHEEL_DELTA,
            MOUSEEVENTF_WHEEL.0,
        )]);
        Ok(())
    }
}

fn virtual_key(token: KeyToken) -> VIRTUAL_KEY {
    match token {
        KeyToken::Ctrl => VK_CONTROL,
        KeyToken::Shift => VK_SHIFT,
        KeyToken::Alt => VK_MENU,
        KeyToken::Win => VK_LWIN,
        KeyToken::Enter => VK_RETURN,
        KeyToken::Tab => VK_TAB,
        KeyToken::Escape => VK_ESCAPE,
        KeyToken::Backspace => VK_BACK,
        KeyToken::Delete => VK_DELETE,
        KeyToken::Insert => VK_INSERT,
        KeyToken::Home => VK_HOME,
        KeyToken::End => VK_END,
        KeyToken::PageUp => VK_PRIOR,
        KeyToken::PageDown => VK_NEXT,
        KeyToken::ArrowUp => VK_UP,
        KeyToken::ArrowDown => VK_DOWN,
        KeyToken::ArrowLeft => VK_LEFT,
        KeyToken::ArrowRight => VK_RIGHT,
        KeyToken::Space => VK_SPACE,
        KeyToken::Function(n) => VIRTUAL_KEY(VK_F1.0 + u16::from(n) - 1),
        KeyToken::Char(c) => VIRTUAL_KEY(c.to_ascii_uppercase() as u16),
    }
}
