//! Normalizes a predictor response into an executable [`ActionPlan`].
//!
//! Malformed entries never fail the whole plan: an unknown verb or a drag
//! with no resolvable endpoints is dropped with a warning and the rest of
//! the steps survive.

use log::warn;

use crate::action::{Action, ActionPlan, Region, ScrollDirection};

use super::protocol::{CloudAction, PredictionResponse};

const DEFAULT_TARGET: &str = "UI element";
const DEFAULT_SCROLL_AMOUNT: i32 = 3;

pub fn translate(response: &PredictionResponse) -> ActionPlan {
    if !response.actions.is_empty() {
        return translate_actions(&response.actions);
    }
    if let (Some(verb), Some(coords)) = (&response.action, &response.coordinates) {
        return translate_legacy(response, verb, coords.x, coords.y);
    }
    Vec::new()
}

/// Legacy single-action shape: a verb plus bare coordinates, labelled by
/// the top-level `suggestion` when present.
fn translate_legacy(
    response: &PredictionResponse,
    verb: &str,
    x: i32,
    y: i32,
) -> ActionPlan {
    let target = response
        .suggestion
        .clone()
        .unwrap_or_else(|| DEFAULT_TARGET.to_string());
    let region = Some(Region::around_point(x, y));

    let action = match verb.to_ascii_uppercase().as_str() {
        "CLICK" => Action::Click { target, region },
        "RIGHT_CLICK" => Action::RightClick { target, region },
        "DOUBLE_CLICK" => Action::DoubleClick { target, region },
        "TYPE" => Action::Type {
            target,
            region,
            text: String::new(),
        },
        "SCROLL_UP" => Action::Scroll {
            target,
            region,
            direction: ScrollDirection::Up,
            amount: DEFAULT_SCROLL_AMOUNT,
        },
        "SCROLL_DOWN" => Action::Scroll {
            target,
            region,
            direction: ScrollDirection::Down,
            amount: DEFAULT_SCROLL_AMOUNT,
        },
        other => {
            warn!("unknown legacy verb '{other}', falling back to click");
            Action::Click { target, region }
        }
    };

    vec![action]
}

fn translate_actions(entries: &[CloudAction]) -> ActionPlan {
    entries
        .iter()
        .filter_map(translate_entry)
        .collect()
}

fn translate_entry(entry: &CloudAction) -> Option<Action> {
    let target = entry
        .target
        .clone()
        .unwrap_or_else(|| DEFAULT_TARGET.to_string());
    let region = entry_region(entry);

    let action = match entry.kind.to_ascii_lowercase().as_str() {
        "click" => Action::Click { target, region },
        "right_click" => Action::RightClick { target, region },
        "double_click" => Action::DoubleClick { target, region },
        "type" => Action::Type {
            target,
            region,
            text: entry.text.clone().unwrap_or_default(),
        },
        "key" => Action::KeyChord {
            target,
            keys: entry.keys.clone().unwrap_or_default(),
        },
        "drag" => {
            let source = entry.source_region.or(region);
            let dest = entry.target_region.or_else(|| drag_endpoint(entry));
            match (source, dest) {
                (Some(source), Some(dest)) => Action::Drag {
                    target,
                    source,
                    dest,
                },
                _ => {
                    warn!("dropping drag on '{target}': missing source or destination region");
                    return None;
                }
            }
        }
        "scroll" => Action::Scroll {
            target,
            region,
            direction: scroll_direction(entry.direction.as_deref()),
            amount: entry.amount.unwrap_or(DEFAULT_SCROLL_AMOUNT),
        },
        other => {
            warn!("dropping step with unknown action type '{other}'");
            return None;
        }
    };

    Some(action)
}

/// Bare `x`,`y` win over an explicit region, matching the legacy shape's
/// synthetic 50×30 box.
fn entry_region(entry: &CloudAction) -> Option<Region> {
    match (entry.x, entry.y) {
        (Some(x), Some(y)) => Some(Region::around_point(x, y)),
        _ => entry.region,
    }
}

/// Older servers describe a drag destination as `endX`/`endY`.
fn drag_endpoint(entry: &CloudAction) -> Option<Region> {
    match (entry.end_x, entry.end_y) {
        (Some(x), Some(y)) => Some(Region::around_point(x, y)),
        _ => None,
    }
}

fn scroll_direction(raw: Option<&str>) -> ScrollDirection {
    match raw {
        Some(value) if value.eq_ignore_ascii_case("up") => ScrollDirection::Up,
        _ => ScrollDirection::Down,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::brain::protocol::Point;

    fn legacy(verb: &str, suggestion: Option<&str>) -> PredictionResponse {
        PredictionResponse {
            confidence: 0.9,
            description: "test".into(),
            actions: Vec::new(),
            suggestion: suggestion.map(Into::into),
            action: Some(verb.into()),
            coordinates: Some(Point { x: 450, y: 320 }),
        }
    }

    fn array(actions: Vec<CloudAction>) -> PredictionResponse {
        PredictionResponse {
            confidence: 0.9,
            description: "test".into(),
            actions,
            suggestion: None,
            action: None,
            coordinates: None,
        }
    }

    #[test]
    fn legacy_click_builds_synthetic_region() {
        let plan = translate(&legacy("CLICK", Some("Click Save")));
        assert_eq!(
            plan,
            vec![Action::Click {
                target: "Click Save".into(),
                region: Some(Region::new(425, 305, 50, 30)),
            }]
        );
    }

    #[test]
    fn legacy_verbs_map_case_insensitively() {
        match &translate(&legacy("scroll_up", None))[0] {
            Action::Scroll {
                target,
                direction,
                amount,
                ..
            } => {
                assert_eq!(target, "UI element");
                assert_eq!(*direction, ScrollDirection::Up);
                assert_eq!(*amount, 3);
            }
            other => panic!("unexpected action: {other:?}"),
        }
        assert!(matches!(
            translate(&legacy("TYPE", None))[0],
            Action::Type { ref text, .. } if text.is_empty()
        ));
    }

    #[test]
    fn unknown_legacy_verb_falls_back_to_click() {
        assert!(matches!(
            translate(&legacy("HOVER", None))[0],
            Action::Click { .. }
        ));
    }

    #[test]
    fn array_entries_translate_and_unknown_are_dropped() {
        let plan = translate(&array(vec![
            CloudAction {
                kind: "click".into(),
                target: Some("Save".into()),
                x: Some(100),
                y: Some(100),
                ..Default::default()
            },
            CloudAction {
                kind: "hover".into(),
                ..Default::default()
            },
            CloudAction {
                kind: "KEY".into(),
                keys: Some("ctrl+s".into()),
                ..Default::default()
            },
        ]));
        assert_eq!(plan.len(), 2);
        assert!(matches!(plan[0], Action::Click { .. }));
        assert!(matches!(plan[1], Action::KeyChord { ref keys, .. } if keys == "ctrl+s"));
    }

    #[test]
    fn bare_coordinates_beat_explicit_region() {
        let plan = translate(&array(vec![CloudAction {
            kind: "click".into(),
            x: Some(60),
            y: Some(60),
            region: Some(Region::new(0, 0, 400, 400)),
            ..Default::default()
        }]));
        assert!(matches!(
            plan[0],
            Action::Click { region: Some(region), .. } if region == Region::new(35, 45, 50, 30)
        ));
    }

    #[test]
    fn drag_without_endpoints_is_dropped_but_plan_survives() {
        let plan = translate(&array(vec![
            CloudAction {
                kind: "drag".into(),
                source_region: Some(Region::new(0, 0, 10, 10)),
                ..Default::default()
            },
            CloudAction {
                kind: "scroll".into(),
                x: Some(10),
                y: Some(10),
                direction: Some("UP".into()),
                amount: Some(5),
                ..Default::default()
            },
        ]));
        assert_eq!(plan.len(), 1);
        assert!(matches!(
            plan[0],
            Action::Scroll { direction: ScrollDirection::Up, amount: 5, .. }
        ));
    }

    #[test]
    fn drag_accepts_legacy_end_coordinates() {
        let plan = translate(&array(vec![CloudAction {
            kind: "drag".into(),
            x: Some(100),
            y: Some(100),
            end_x: Some(500),
            end_y: Some(500),
            ..Default::default()
        }]));
        match &plan[0] {
            Action::Drag { source, dest, .. } => {
                assert_eq!(source.center(), (100, 100));
                assert_eq!(dest.center(), (500, 500));
            }
            other => panic!("unexpected action: {other:?}"),
        }
    }

    #[test]
    fn empty_response_translates_to_empty_plan() {
        let plan = translate(&array(Vec::new()));
        assert!(plan.is_empty());
    }
}
