//! Key-chord spec parsing: `"ctrl+shift+s"` → press order.
//!
//! Tokens map to a platform-neutral [`KeyToken`]; the synthesizer turns
//! them into virtual-key codes. Unknown tokens are skipped with a warning
//! so a partially bad chord still presses what it can.

use log::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyToken {
    Ctrl,
    Shift,
    Alt,
    Win,
    Enter,
    Tab,
    Escape,
    Backspace,
    Delete,
    Insert,
    Home,
    End,
    PageUp,
    PageDown,
    ArrowUp,
    ArrowDown,
    ArrowLeft,
    ArrowRight,
    Space,
    /// F1–F12.
    Function(u8),
    /// `a`–`z` or `0`–`9`.
    Char(char),
}

/// Parse a `+`-separated chord spec into press-order tokens.
pub fn parse_chord(spec: &str) -> Vec<KeyToken> {
    spec.split('+')
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .filter_map(|token| {
            let parsed = parse_token(token);
            if parsed.is_none() {
                warn!("unknown key token '{token}' in chord '{spec}', skipping");
            }
            parsed
        })
        .collect()
}

fn parse_token(token: &str) -> Option<KeyToken> {
    let lower = token.to_ascii_lowercase();
    let parsed = match lower.as_str() {
        "ctrl" | "control" => KeyToken::Ctrl,
        "shift" => KeyToken::Shift,
        "alt" => KeyToken::Alt,
        "win" | "meta" | "super" => KeyToken::Win,
        "enter" | "return" => KeyToken::Enter,
        "tab" => KeyToken::Tab,
        "esc" | "escape" => KeyToken::Escape,
        "backspace" => KeyToken::Backspace,
        "delete" | "del" => KeyToken::Delete,
        "insert" | "ins" => KeyToken::Insert,
        "home" => KeyToken::Home,
        "end" => KeyToken::End,
        "pageup" => KeyToken::PageUp,
        "pagedown" => KeyToken::PageDown,
        "up" => KeyToken::ArrowUp,
        "down" => KeyToken::ArrowDown,
        "left" => KeyToken::ArrowLeft,
        "right" => KeyToken::ArrowRight,
        "space" => KeyToken::Space,
        _ => {
            if let Some(number) = lower.strip_prefix('f') {
                if let Ok(n) = number.parse::<u8>() {
                    if (1..=12).contains(&n) {
                        return Some(KeyToken::Function(n));
                    }
                    return None;
                }
            }
            let mut chars = lower.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) if c.is_ascii_lowercase() || c.is_ascii_digit() => {
                    return Some(KeyToken::Char(c));
                }
                _ => return None,
            }
        }
    };
    Some(parsed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_modifier_chord_in_order() {
        assert_eq!(
            parse_chord("ctrl+shift+s"),
            vec![KeyToken::Ctrl, KeyToken::Shift, KeyToken::Char('s')]
        );
    }

    #[test]
    fn parses_aliases_and_case_insensitive() {
        assert_eq!(
            parse_chord("Control+ESC"),
            vec![KeyToken::Ctrl, KeyToken::Escape]
        );
        assert_eq!(parse_chord("del"), vec![KeyToken::Delete]);
        assert_eq!(parse_chord("Return"), vec![KeyToken::Enter]);
    }

    #[test]
    fn parses_function_and_navigation_keys() {
        assert_eq!(parse_chord("f5"), vec![KeyToken::Function(5)]);
        assert_eq!(
            parse_chord("ctrl+pagedown"),
            vec![KeyToken::Ctrl, KeyToken::PageDown]
        );
        assert_eq!(parse_chord("alt+f4"), vec![KeyToken::Alt, KeyToken::Function(4)]);
        // A bare `f` is the letter, not a truncated function key.
        assert_eq!(parse_chord("ctrl+f"), vec![KeyToken::Ctrl, KeyToken::Char('f')]);
    }

    #[test]
    fn unknown_tokens_are_skipped() {
        assert_eq!(
            parse_chord("ctrl+flux+s"),
            vec![KeyToken::Ctrl, KeyToken::Char('s')]
        );
        assert_eq!(parse_chord("f13"), Vec::<KeyToken>::new());
        assert_eq!(parse_chord(""), Vec::<KeyToken>::new());
    }

    #[test]
    fn repeated_tokens_are_preserved() {
        assert_eq!(
            parse_chord("backspace+backspace+backspace"),
            vec![KeyToken::Backspace; 3]
        );
    }
}
