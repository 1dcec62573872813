mod executor;
mod keys;
#[cfg(windows)]
mod send_input;
mod synth;

pub use executor::{ActionExecutor, RunOutcome};
pub use keys::{parse_chord, KeyToken};
#[cfg(windows)]
pub use send_input::SendInputSynthesizer;
pub use synth::InputSynthesizer;

use serde::{Deserialize, Serialize};

/// Maximum backspaces a Type reverse will press. Longer text gets a
/// partial undo only.
pub const TYPE_REVERSE_CAP: usize = 10;

/// Screen-space rectangle targeted by an action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Region {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Region {
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Synthetic 50×30 region centered on a point, used when the predictor
    /// supplies bare coordinates.
    pub fn around_point(x: i32, y: i32) -> Self {
        Self::new(x - 25, y - 15, 50, 30)
    }

    pub fn center(&self) -> (i32, i32) {
        (self.x + self.width / 2, self.y + self.height / 2)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ScrollDirection {
    Up,
    Down,
}

impl ScrollDirection {
    pub fn opposite(self) -> Self {
        match self {
            Self::Up => Self::Down,
            Self::Down => Self::Up,
        }
    }
}

/// One executable step of a plan.
///
/// Every variant carries a human-readable target label; all but `Drag` and
/// `KeyChord` carry an optional target region (an action whose region is
/// required but absent dispatches as a no-op).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Action {
    Click {
        target: String,
        region: Option<Region>,
    },
    RightClick {
        target: String,
        region: Option<Region>,
    },
    DoubleClick {
        target: String,
        region: Option<Region>,
    },
    Type {
        target: String,
        region: Option<Region>,
        text: String,
    },
    KeyChord {
        target: String,
        keys: String,
    },
    Drag {
        target: String,
        source: Region,
        dest: Region,
    },
    Scroll {
        target: String,
        region: Option<Region>,
        direction: ScrollDirection,
        amount: i32,
    },
}

/// Ordered, finite sequence of actions. Empty plans are valid but are
/// never executed.
pub type ActionPlan = Vec<Action>;

impl Action {
    pub fn target(&self) -> &str {
        match self {
            Self::Click { target, .. }
            | Self::RightClick { target, .. }
            | Self::DoubleClick { target, .. }
            | Self::Type { target, .. }
            | Self::KeyChord { target, .. }
            | Self::Drag { target, .. }
            | Self::Scroll { target, .. } => target,
        }
    }

    /// Best-effort inverse of this action, when one exists.
    ///
    /// Type's reverse is capped at [`TYPE_REVERSE_CAP`] backspaces, so undo
    /// of longer text is partial. Clicks and chords have no inverse.
    pub fn reverse(&self) -> Option<Action> {
        match self {
            Self::Click { .. }
            | Self::RightClick { .. }
            | Self::DoubleClick { .. }
            | Self::KeyChord { .. } => None,
            Self::Type { target, text, .. } => {
                let presses = text.chars().count().min(TYPE_REVERSE_CAP);
                if presses == 0 {
                    return None;
                }
                let keys = vec!["backspace"; presses].join("+");
                Some(Self::KeyChord {
                    target: target.clone(),
                    keys,
                })
            }
            Self::Drag {
                target,
                source,
                dest,
            } => Some(Self::Drag {
                target: target.clone(),
                source: *dest,
                dest: *source,
            }),
            Self::Scroll {
                target,
                region,
                direction,
                amount,
            } => Some(Self::Scroll {
                target: target.clone(),
                region: *region,
                direction: direction.opposite(),
                amount: *amount,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn around_point_centers_a_50x30_region() {
        let region = Region::around_point(450, 320);
        assert_eq!(region, Region::new(425, 305, 50, 30));
        assert_eq!(region.center(), (450, 320));
    }

    #[test]
    fn clicks_and_chords_have_no_reverse() {
        let click = Action::Click {
            target: "Save".into(),
            region: Some(Region::around_point(10, 10)),
        };
        assert_eq!(click.reverse(), None);
        let chord = Action::KeyChord {
            target: "Save".into(),
            keys: "ctrl+s".into(),
        };
        assert_eq!(chord.reverse(), None);
    }

    #[test]
    fn type_reverse_caps_at_ten_backspaces() {
        let action = Action::Type {
            target: "Search".into(),
            region: None,
            text: "hello".into(),
        };
        match action.reverse() {
            Some(Action::KeyChord { keys, .. }) => {
                assert_eq!(keys.split('+').count(), 5);
            }
            other => panic!("unexpected reverse: {other:?}"),
        }

        let long = Action::Type {
            target: "Search".into(),
            region: None,
            text: "a much longer piece of text".into(),
        };
        match long.reverse() {
            Some(Action::KeyChord { keys, .. }) => {
                assert_eq!(keys.split('+').count(), TYPE_REVERSE_CAP);
            }
            other => panic!("unexpected reverse: {other:?}"),
        }
    }

    #[test]
    fn drag_reverse_swaps_endpoints() {
        let src = Region::new(100, 100, 10, 10);
        let dst = Region::new(500, 500, 10, 10);
        let drag = Action::Drag {
            target: "File".into(),
            source: src,
            dest: dst,
        };
        match drag.reverse() {
            Some(Action::Drag { source, dest, .. }) => {
                assert_eq!(source, dst);
                assert_eq!(dest, src);
            }
            other => panic!("unexpected reverse: {other:?}"),
        }
    }

    #[test]
    fn scroll_reverse_flips_direction() {
        let scroll = Action::Scroll {
            target: "Feed".into(),
            region: Some(Region::around_point(200, 200)),
            direction: ScrollDirection::Down,
            amount: 3,
        };
        match scroll.reverse() {
            Some(Action::Scroll {
                direction, amount, ..
            }) => {
                assert_eq!(direction, ScrollDirection::Up);
                assert_eq!(amount, 3);
            }
            other => panic!("unexpected reverse: {other:?}"),
        }
    }
}
