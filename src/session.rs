use std::sync::mpsc::{self, Receiver};
use std::sync::{Arc, OnceLock};
use std::time::{Duration, Instant};

use tracing::{debug, info};

use crate::clock::{SessionClock, Ticker};
use crate::error::{Error, Result};
use crate::metrics::{self, Speed};
use crate::terminal::{Key, Terminal};
use crate::typing_policy::{apply_key, AppendPolicy};

pub const DEFAULT_DURATION_SECS: u64 = 60;

// upper bound on how long a key poll may delay a clock update
const KEY_POLL: Duration = Duration::from_millis(50);

const TIME_ROW: u16 = 1;
const TARGET_ROW: u16 = 3;
const TYPED_ROW: u16 = 4;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    pub target_text: String,
    /// Length of the session in clock ticks (seconds in production).
    pub duration_secs: u64,
    pub append_policy: AppendPolicy,
}

impl SessionConfig {
    pub fn new(target_text: impl Into<String>) -> Self {
        Self {
            target_text: target_text.into(),
            duration_secs: DEFAULT_DURATION_SECS,
            append_policy: AppendPolicy::Once,
        }
    }

    pub fn with_duration(mut self, duration_secs: u64) -> Self {
        self.duration_secs = duration_secs;
        self
    }

    pub fn with_append_policy(mut self, append_policy: AppendPolicy) -> Self {
        self.append_policy = append_policy;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
pub enum TerminationReason {
    #[strum(serialize = "finished")]
    UserFinished,
    #[strum(serialize = "time is up")]
    TimedOut,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SessionResult {
    pub typed_text: String,
    pub elapsed_secs: f64,
    pub termination_reason: TerminationReason,
}

impl SessionResult {
    /// Number of characters typed, not bytes.
    pub fn typed_len(&self) -> usize {
        self.typed_text.chars().count()
    }

    pub fn speed(&self) -> Speed {
        metrics::compute(self.typed_len(), self.elapsed_secs)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    NotStarted,
    AwaitingKey,
    Finished,
}

/// Set-once record of why a session ended, shared by the clock thread and the
/// input loop. Whichever side settles it first decides the reason.
#[derive(Debug, Default)]
pub struct FinishLatch {
    reason: OnceLock<TerminationReason>,
}

impl FinishLatch {
    /// Returns true if this call ended the session.
    pub fn try_finish(&self, reason: TerminationReason) -> bool {
        self.reason.set(reason).is_ok()
    }

    /// Attempts to finish with `reason` and returns the reason that won.
    pub fn settle(&self, reason: TerminationReason) -> TerminationReason {
        self.try_finish(reason);
        self.reason().unwrap_or(reason)
    }

    pub fn reason(&self) -> Option<TerminationReason> {
        self.reason.get().copied()
    }
}

enum ClockSignal {
    Tick(u64),
    Expired,
}

/// One attempt at typing the target text.
///
/// The clock thread only forwards ticks over a channel; every terminal write
/// happens on the thread calling [`TypingSession::run`].
pub struct TypingSession<'t, T: Terminal, K: Ticker + Clone> {
    terminal: &'t mut T,
    config: SessionConfig,
    ticker: K,
    state: SessionState,
    typed: String,
    result: Option<SessionResult>,
}

impl<'t, T: Terminal, K: Ticker + Clone> TypingSession<'t, T, K> {
    pub fn new(terminal: &'t mut T, config: SessionConfig, ticker: K) -> Self {
        Self {
            terminal,
            config,
            ticker,
            state: SessionState::NotStarted,
            typed: String::new(),
            result: None,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn typed_text(&self) -> &str {
        &self.typed
    }

    /// Runs the session until the finish key, the clock running out, or an
    /// interrupt. A session finishes once; later calls return the same result.
    pub fn run(&mut self) -> Result<SessionResult> {
        if let Some(result) = &self.result {
            return Ok(result.clone());
        }

        let latch = Arc::new(FinishLatch::default());
        let (tx, signals) = mpsc::channel();
        let tick_tx = tx.clone();
        let clock_latch = Arc::clone(&latch);

        let started = Instant::now();
        let mut clock = SessionClock::start(
            self.config.duration_secs,
            self.ticker.clone(),
            move |remaining| {
                let _ = tick_tx.send(ClockSignal::Tick(remaining));
            },
            move || {
                if clock_latch.try_finish(TerminationReason::TimedOut) {
                    let _ = tx.send(ClockSignal::Expired);
                }
            },
        )
        .map_err(Error::ClockStart)?;

        self.state = SessionState::AwaitingKey;
        info!(
            target_len = self.config.target_text.chars().count(),
            duration = self.config.duration_secs,
            "session started"
        );

        let outcome = self.await_finish(&signals, &latch, started);
        clock.cancel();
        let elapsed_secs = started.elapsed().as_secs_f64();
        let restored = self.terminal.set_cursor_visible(true);

        let termination_reason = outcome?;
        restored?;

        self.state = SessionState::Finished;
        let result = SessionResult {
            typed_text: self.typed.clone(),
            elapsed_secs,
            termination_reason,
        };
        info!(
            reason = ?result.termination_reason,
            typed = result.typed_len(),
            elapsed_secs = result.elapsed_secs,
            "session finished"
        );
        self.result = Some(result.clone());
        Ok(result)
    }

    fn await_finish(
        &mut self,
        signals: &Receiver<ClockSignal>,
        latch: &FinishLatch,
        started: Instant,
    ) -> Result<TerminationReason> {
        self.terminal.clear_screen()?;
        self.terminal.set_cursor_visible(false)?;

        let interval = self.ticker.interval();
        let deadline = u32::try_from(self.config.duration_secs)
            .ok()
            .and_then(|n| interval.checked_mul(n))
            .unwrap_or(Duration::MAX);
        let poll = interval.min(KEY_POLL);

        loop {
            self.render()?;

            let key = loop {
                for signal in signals.try_iter() {
                    match signal {
                        ClockSignal::Tick(remaining) => {
                            debug!(remaining, "tick");
                            self.terminal
                                .write_at(TIME_ROW, &format!("Time left: {remaining} s"))?;
                        }
                        ClockSignal::Expired => {
                            return Ok(latch.settle(TerminationReason::TimedOut));
                        }
                    }
                }
                if let Some(key) = self.terminal.read_key(poll)? {
                    break key;
                }
            };

            match key {
                Key::Interrupt => return Err(Error::InputInterrupted),
                Key::Enter => return Ok(latch.settle(TerminationReason::UserFinished)),
                _ if started.elapsed() >= deadline => {
                    return Ok(latch.settle(TerminationReason::TimedOut));
                }
                Key::Char(c) => {
                    apply_key(
                        self.config.append_policy,
                        &self.config.target_text,
                        &mut self.typed,
                        c,
                    );
                }
                Key::Other => {}
            }
        }
    }

    fn render(&mut self) -> Result<()> {
        self.terminal.write_at(
            TARGET_ROW,
            &format!("Type the text: \"{}\"", self.config.target_text),
        )?;
        self.terminal.write_at(TYPED_ROW, &self.typed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedTicker;
    use crate::terminal::ScriptedTerminal;
    use assert_matches::assert_matches;
    use std::sync::Barrier;
    use std::thread;

    fn slow() -> FixedTicker {
        FixedTicker::seconds()
    }

    fn fast() -> FixedTicker {
        FixedTicker::new(Duration::from_millis(1))
    }

    #[test]
    fn typed_keys_then_enter_finishes() {
        let mut term = ScriptedTerminal::new().type_str("abc").press(Key::Enter);
        let mut session = TypingSession::new(&mut term, SessionConfig::new("abc"), slow());

        let result = session.run().unwrap();
        assert_eq!(result.typed_text, "abc");
        assert_eq!(result.termination_reason, TerminationReason::UserFinished);
        assert_eq!(session.state(), SessionState::Finished);
    }

    #[test]
    fn no_keys_times_out_after_every_tick() {
        let mut term = ScriptedTerminal::new();
        let config = SessionConfig::new("abc").with_duration(60);
        let result = TypingSession::new(&mut term, config, fast()).run().unwrap();

        assert_eq!(result.termination_reason, TerminationReason::TimedOut);
        assert_eq!(result.typed_text, "");
        assert_eq!(term.row(TIME_ROW), Some("Time left: 1 s"));
        assert!(term.cursor_visible());
    }

    #[test]
    fn keys_outside_target_are_dropped() {
        let mut term = ScriptedTerminal::new()
            .type_str("axbzc")
            .press(Key::Other)
            .press(Key::Enter);
        let result = TypingSession::new(&mut term, SessionConfig::new("abc"), slow())
            .run()
            .unwrap();
        assert_eq!(result.typed_text, "abc");
    }

    #[test]
    fn any_target_character_counts_regardless_of_position() {
        let mut term = ScriptedTerminal::new().type_str("ccba").press(Key::Enter);
        let result = TypingSession::new(&mut term, SessionConfig::new("abc"), slow())
            .run()
            .unwrap();
        assert_eq!(result.typed_text, "ccba");
    }

    #[test]
    fn double_append_policy_records_keys_twice() {
        let mut term = ScriptedTerminal::new().type_str("ab").press(Key::Enter);
        let config = SessionConfig::new("abc").with_append_policy(AppendPolicy::Twice);
        let result = TypingSession::new(&mut term, config, slow()).run().unwrap();
        assert_eq!(result.typed_text, "aabb");
        assert_eq!(result.typed_len(), 4);
    }

    #[test]
    fn single_append_is_the_default() {
        let mut term = ScriptedTerminal::new().type_str("ab").press(Key::Enter);
        let result = TypingSession::new(&mut term, SessionConfig::new("abc"), slow())
            .run()
            .unwrap();
        assert_eq!(result.typed_text, "ab");
    }

    #[test]
    fn interrupt_aborts_without_result() {
        let mut term = ScriptedTerminal::new().type_str("ab").press(Key::Interrupt);
        let mut session = TypingSession::new(&mut term, SessionConfig::new("abc"), slow());

        assert_matches!(session.run(), Err(Error::InputInterrupted));
        assert_eq!(session.state(), SessionState::AwaitingKey);
        drop(session);
        assert!(term.cursor_visible());
    }

    #[test]
    fn screen_shows_target_and_typed_text() {
        let mut term = ScriptedTerminal::new().type_str("ab").press(Key::Enter);
        TypingSession::new(&mut term, SessionConfig::new("abc"), slow())
            .run()
            .unwrap();

        assert_eq!(term.row(TARGET_ROW), Some("Type the text: \"abc\""));
        assert_eq!(term.row(TYPED_ROW), Some("ab"));
    }

    #[test]
    fn finished_session_returns_the_same_result() {
        let mut term = ScriptedTerminal::new().type_str("a").press(Key::Enter);
        let mut session = TypingSession::new(&mut term, SessionConfig::new("abc"), slow());

        let first = session.run().unwrap();
        let second = session.run().unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn expiry_racing_enter_yields_one_result() {
        // a zero-length session expires as soon as the clock starts, while
        // Enter is already waiting in the input queue
        for _ in 0..20 {
            let mut term = ScriptedTerminal::new().press(Key::Enter);
            let config = SessionConfig::new("abc").with_duration(0);
            let mut session = TypingSession::new(&mut term, config, fast());

            let result = session.run().unwrap();
            assert_matches!(
                result.termination_reason,
                TerminationReason::UserFinished | TerminationReason::TimedOut
            );
            assert_eq!(session.run().unwrap(), result);
        }
    }

    #[test]
    fn latch_admits_exactly_one_finisher() {
        for _ in 0..50 {
            let latch = Arc::new(FinishLatch::default());
            let barrier = Arc::new(Barrier::new(2));

            let handles: Vec<_> = [TerminationReason::TimedOut, TerminationReason::UserFinished]
                .into_iter()
                .map(|reason| {
                    let latch = Arc::clone(&latch);
                    let barrier = Arc::clone(&barrier);
                    thread::spawn(move || {
                        barrier.wait();
                        (reason, latch.try_finish(reason))
                    })
                })
                .collect();

            let outcomes: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
            let winners: Vec<_> = outcomes.iter().filter(|(_, won)| *won).collect();
            assert_eq!(winners.len(), 1);
            assert_eq!(latch.reason(), Some(winners[0].0));
        }
    }

    #[test]
    fn settle_reports_first_reason() {
        let latch = FinishLatch::default();
        assert_eq!(latch.reason(), None);
        assert_eq!(
            latch.settle(TerminationReason::TimedOut),
            TerminationReason::TimedOut
        );
        assert_eq!(
            latch.settle(TerminationReason::UserFinished),
            TerminationReason::TimedOut
        );
    }

    #[test]
    fn result_speed_uses_character_count() {
        let result = SessionResult {
            typed_text: "ééé".to_string(),
            elapsed_secs: 3.0,
            termination_reason: TerminationReason::UserFinished,
        };
        assert_eq!(result.typed_len(), 3);
        assert_eq!(
            result.speed(),
            Speed {
                chars_per_minute: 60,
                chars_per_second: 1
            }
        );
    }

    #[test]
    fn reason_display() {
        assert_eq!(TerminationReason::UserFinished.to_string(), "finished");
        assert_eq!(TerminationReason::TimedOut.to_string(), "time is up");
    }
}
