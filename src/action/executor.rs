use anyhow::Result;
use log::{debug, info, warn};
use rand::{rngs::StdRng, Rng, SeedableRng};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;

use super::synth::InputSynthesizer;
use super::{Action, ScrollDirection, TYPE_REVERSE_CAP};
use crate::settings::ExecutionSettings;

/// How a plan run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    Completed,
    /// Cancelled between actions; the in-flight action was allowed to
    /// finish, nothing after it was dispatched.
    Cancelled,
}

/// Sequences a plan through the synthesizer with human-like pacing.
///
/// Steps are separated by a uniform random delay from
/// `[min_delay, max_delay]`. After a completed run the final action's
/// reverse (when it has one) is retained for `undo_last`; each new run
/// overwrites it.
pub struct ActionExecutor {
    synth: Arc<dyn InputSynthesizer>,
    min_delay: Duration,
    max_delay: Duration,
    rng: StdRng,
    last_reverse: Option<Action>,
}

impl ActionExecutor {
    pub fn new(synth: Arc<dyn InputSynthesizer>, settings: &ExecutionSettings) -> Self {
        Self::with_rng(synth, settings, StdRng::from_entropy())
    }

    /// Deterministic pacing for tests.
    pub fn with_seed(
        synth: Arc<dyn InputSynthesizer>,
        settings: &ExecutionSettings,
        seed: u64,
    ) -> Self {
        Self::with_rng(synth, settings, StdRng::seed_from_u64(seed))
    }

    fn with_rng(synth: Arc<dyn InputSynthesizer>, settings: &ExecutionSettings, rng: StdRng) -> Self {
        let min = Duration::from_millis(settings.min_delay_ms.min(settings.max_delay_ms));
        let max = Duration::from_millis(settings.max_delay_ms.max(settings.min_delay_ms));
        Self {
            synth,
            min_delay: min,
            max_delay: max,
            rng,
            last_reverse: None,
        }
    }

    /// Execute `plan` in order. An `Err` from the synthesizer is fatal for
    /// the plan and leaves the previous undo untouched.
    pub async fn run(&mut self, plan: &[Action], cancel: &CancellationToken) -> Result<RunOutcome> {
        for (index, action) in plan.iter().enumerate() {
            if cancel.is_cancelled() {
                info!("plan cancelled before step {} of {}", index + 1, plan.len());
                return Ok(RunOutcome::Cancelled);
            }

            debug!("executing step {}/{}: {}", index + 1, plan.len(), action.target());
            self.dispatch(action).await?;

            if index + 1 < plan.len() {
                let jitter = self.rng.gen_range(self.min_delay..=self.max_delay);
                tokio::select! {
                    _ = sleep(jitter) => {}
                    _ = cancel.cancelled() => {
                        info!("plan cancelled after step {} of {}", index + 1, plan.len());
                        return Ok(RunOutcome::Cancelled);
                    }
                }
            }
        }

        if let Some(last) = plan.last() {
            self.last_reverse = last.reverse();
            if let Action::Type { text, .. } = last {
                if text.chars().count() > TYPE_REVERSE_CAP {
                    warn!(
                        "stored undo erases only {TYPE_REVERSE_CAP} of {} typed characters",
                        text.chars().count()
                    );
                }
            }
        }

        Ok(RunOutcome::Completed)
    }

    /// Perform the retained reverse action, if any. Consumes it.
    pub async fn undo_last(&mut self) -> Result<()> {
        match self.last_reverse.take() {
            Some(reverse) => {
                info!("undoing last action via {}", reverse.target());
                self.dispatch(&reverse).await
            }
            None => {
                warn!("undo requested but the last action has no reverse");
                Ok(())
            }
        }
    }

    pub fn has_undo(&self) -> bool {
        self.last_reverse.is_some()
    }

    async fn dispatch(&self, action: &Action) -> Result<()> {
        match action {
            Action::Click { target, region } => match region {
                Some(region) => {
                    let (x, y) = region.center();
                    self.synth.click(x, y).await
                }
                None => skip_unplaced(target, "click"),
            },
            Action::RightClick { target, region } => match region {
                Some(region) => {
                    let (x, y) = region.center();
                    self.synth.right_click(x, y).await
                }
                None => skip_unplaced(target, "right click"),
            },
            Action::DoubleClick { target, region } => match region {
                Some(region) => {
                    let (x, y) = region.center();
                    self.synth.double_click(x, y).await
                }
                None => skip_unplaced(target, "double click"),
            },
            Action::Type { text, .. } => self.synth.type_text(text).await,
            Action::KeyChord { keys, .. } => self.synth.press_keys(keys).await,
            Action::Drag { source, dest, .. } => {
                let (sx, sy) = source.center();
                let (ex, ey) = dest.center();
                self.synth.drag(sx, sy, ex, ey).await
            }
            Action::Scroll {
                target,
                region,
                direction,
                amount,
            } => match region {
                Some(region) => {
                    let (x, y) = region.center();
                    let signed = match direction {
                        ScrollDirection::Up => *amount,
                        ScrollDirection::Down => -*amount,
                    };
                    self.synth.scroll(x, y, signed).await
                }
                None => skip_unplaced(target, "scroll"),
            },
        }
    }
}

fn skip_unplaced(target: &str, kind: &str) -> Result<()> {
    warn!("skipping {kind} on '{target}': no target region");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::Region;
    use anyhow::anyhow;
    use async_trait::async_trait;
    use std::sync::Mutex;

    #[derive(Debug, Clone, PartialEq)]
    enum Call {
        Click(i32, i32),
        RightClick(i32, i32),
        DoubleClick(i32, i32),
        Type(String),
        Keys(String),
        Drag(i32, i32, i32, i32),
        Scroll(i32, i32, i32),
    }

    #[derive(Default)]
    struct RecordingSynth {
        calls: Mutex<Vec<Call>>,
        fail: bool,
    }

    impl RecordingSynth {
        fn failing() -> Self {
            Self {
                calls: Mutex::new(Vec::new()),
                fail: true,
            }
        }

        fn record(&self, call: Call) -> Result<()> {
            if self.fail {
                return Err(anyhow!("synthesis backend gone"));
            }
            self.calls.lock().unwrap().push(call);
            Ok(())
        }

        fn calls(&self) -> Vec<Call> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl InputSynthesizer for RecordingSynth {
        async fn move_mouse(&self, _x: i32, _y: i32) -> Result<()> {
            Ok(())
        }
        async fn click(&self, x: i32, y: i32) -> Result<()> {
            self.record(Call::Click(x, y))
        }
        async fn right_click(&self, x: i32, y: i32) -> Result<()> {
            self.record(Call::RightClick(x, y))
        }
        async fn double_click(&self, x: i32, y: i32) -> Result<()> {
            self.record(Call::DoubleClick(x, y))
        }
        async fn type_text(&self, text: &str) -> Result<()> {
            self.record(Call::Type(text.into()))
        }
        async fn press_keys(&self, spec: &str) -> Result<()> {
            self.record(Call::Keys(spec.into()))
        }
        async fn drag(&self, sx: i32, sy: i32, ex: i32, ey: i32) -> Result<()> {
            self.record(Call::Drag(sx, sy, ex, ey))
        }
        async fn scroll(&self, x: i32, y: i32, amount: i32) -> Result<()> {
            self.record(Call::Scroll(x, y, amount))
        }
    }

    fn executor(synth: Arc<RecordingSynth>) -> ActionExecutor {
        ActionExecutor::with_seed(synth, &ExecutionSettings::default(), 7)
    }

    #[tokio::test(start_paused = true)]
    async fn executes_steps_in_order() {
        let synth = Arc::new(RecordingSynth::default());
        let mut exec = executor(synth.clone());
        let plan = vec![
            Action::Click {
                target: "Save".into(),
                region: Some(Region::around_point(450, 320)),
            },
            Action::Type {
                target: "Name".into(),
                region: None,
                text: "report".into(),
            },
            Action::KeyChord {
                target: "Confirm".into(),
                keys: "enter".into(),
            },
        ];

        let outcome = exec.run(&plan, &CancellationToken::new()).await.unwrap();
        assert_eq!(outcome, RunOutcome::Completed);
        assert_eq!(
            synth.calls(),
            vec![
                Call::Click(450, 320),
                Call::Type("report".into()),
                Call::Keys("enter".into()),
            ]
        );
        // KeyChord has no reverse, so nothing is retained.
        assert!(!exec.has_undo());
    }

    #[tokio::test(start_paused = true)]
    async fn drag_plan_round_trips_through_undo() {
        let synth = Arc::new(RecordingSynth::default());
        let mut exec = executor(synth.clone());
        let plan = vec![Action::Drag {
            target: "File".into(),
            source: Region::new(100, 100, 10, 10),
            dest: Region::new(500, 500, 10, 10),
        }];

        exec.run(&plan, &CancellationToken::new()).await.unwrap();
        assert!(exec.has_undo());
        exec.undo_last().await.unwrap();

        assert_eq!(
            synth.calls(),
            vec![
                Call::Drag(105, 105, 505, 505),
                Call::Drag(505, 505, 105, 105),
            ]
        );
        assert!(!exec.has_undo());
    }

    #[tokio::test(start_paused = true)]
    async fn undo_without_reverse_is_a_noop() {
        let synth = Arc::new(RecordingSynth::default());
        let mut exec = executor(synth.clone());
        exec.undo_last().await.unwrap();
        assert!(synth.calls().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn missing_region_skips_the_step() {
        let synth = Arc::new(RecordingSynth::default());
        let mut exec = executor(synth.clone());
        let plan = vec![
            Action::Click {
                target: "Ghost".into(),
                region: None,
            },
            Action::Scroll {
                target: "Feed".into(),
                region: Some(Region::around_point(200, 200)),
                direction: ScrollDirection::Down,
                amount: 3,
            },
        ];

        exec.run(&plan, &CancellationToken::new()).await.unwrap();
        assert_eq!(synth.calls(), vec![Call::Scroll(200, 200, -3)]);
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_stops_further_dispatch() {
        let synth = Arc::new(RecordingSynth::default());
        let mut exec = executor(synth.clone());
        let cancel = CancellationToken::new();
        cancel.cancel();

        let plan = vec![Action::Click {
            target: "Save".into(),
            region: Some(Region::around_point(10, 10)),
        }];
        let outcome = exec.run(&plan, &cancel).await.unwrap();
        assert_eq!(outcome, RunOutcome::Cancelled);
        assert!(synth.calls().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn synthesizer_error_is_fatal_for_the_plan() {
        let synth = Arc::new(RecordingSynth::failing());
        let mut exec = executor(synth);
        let plan = vec![Action::Type {
            target: "Field".into(),
            region: None,
            text: "abc".into(),
        }];
        assert!(exec.run(&plan, &CancellationToken::new()).await.is_err());
        assert!(!exec.has_undo());
    }
}
