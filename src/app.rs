use tracing::info;

use crate::clock::Ticker;
use crate::error::Result;
use crate::leaderboard::{Leaderboard, ScoreEntry, ScoreStore};
use crate::session::{SessionConfig, TerminationReason, TypingSession, DEFAULT_DURATION_SECS};
use crate::terminal::Terminal;
use crate::typing_policy::AppendPolicy;

const ANONYMOUS: &str = "anonymous";

/// What every round uses. `None` fields are asked for at the start of each round.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoundSettings {
    pub prompt: Option<String>,
    pub name: Option<String>,
    pub duration_secs: u64,
    pub append_policy: AppendPolicy,
}

impl Default for RoundSettings {
    fn default() -> Self {
        Self {
            prompt: None,
            name: None,
            duration_secs: DEFAULT_DURATION_SECS,
            append_policy: AppendPolicy::Once,
        }
    }
}

/// The interactive game: prompts, a typing session, scoring and the leaderboard.
pub struct App<T: Terminal, S: ScoreStore, K: Ticker + Clone> {
    terminal: T,
    leaderboard: Leaderboard<S>,
    ticker: K,
    settings: RoundSettings,
}

impl<T: Terminal, S: ScoreStore, K: Ticker + Clone> App<T, S, K> {
    pub fn new(terminal: T, leaderboard: Leaderboard<S>, ticker: K, settings: RoundSettings) -> Self {
        Self {
            terminal,
            leaderboard,
            ticker,
            settings,
        }
    }

    /// Plays rounds until the player declines another one.
    pub fn run(&mut self) -> Result<()> {
        loop {
            self.play_round()?;
            if !self.ask_replay()? {
                return Ok(());
            }
        }
    }

    /// Plays one round and records its score.
    pub fn play_round(&mut self) -> Result<ScoreEntry> {
        self.terminal.clear_screen()?;

        let target = match &self.settings.prompt {
            Some(prompt) => prompt.clone(),
            None => self.ask("Enter the text for the test: ")?,
        };
        let name = match &self.settings.name {
            Some(name) => name.clone(),
            None => self.ask("Enter your name: ")?,
        };
        let name = match name.trim() {
            "" => ANONYMOUS.to_string(),
            trimmed => trimmed.to_string(),
        };

        self.terminal
            .write_line("You will need to type the following text:")?;
        self.terminal.write_line(&target)?;
        self.terminal.write_line("")?;
        self.terminal.write_line("Press Enter to start typing...")?;
        self.terminal.read_line()?;

        let config = SessionConfig::new(target)
            .with_duration(self.settings.duration_secs)
            .with_append_policy(self.settings.append_policy);

        self.terminal.set_raw_mode(true)?;
        let outcome = TypingSession::new(&mut self.terminal, config, self.ticker.clone()).run();
        self.terminal.set_raw_mode(false)?;
        let result = outcome?;

        let entry = ScoreEntry::from_speed(name, result.speed());
        info!(
            name = %entry.name,
            cpm = entry.chars_per_minute,
            cps = entry.chars_per_second,
            "round scored"
        );
        self.leaderboard.append(entry.clone())?;
        self.show_leaderboard(result.termination_reason)?;

        Ok(entry)
    }

    fn show_leaderboard(&mut self, reason: TerminationReason) -> Result<()> {
        self.terminal.clear_screen()?;
        self.terminal.write_line(&format!("Round over: {reason}."))?;
        self.terminal.write_line("Leaderboard:")?;
        for entry in self.leaderboard.all() {
            self.terminal.write_line(&format!(
                "Name: {}, CPM: {}, CPS: {}",
                entry.name, entry.chars_per_minute, entry.chars_per_second
            ))?;
        }
        Ok(())
    }

    fn ask_replay(&mut self) -> Result<bool> {
        let answer = self.ask("Play again? (yes/no): ")?;
        Ok(is_yes(&answer))
    }

    fn ask(&mut self, question: &str) -> Result<String> {
        self.terminal.write(question)?;
        self.terminal.read_line()
    }

    pub fn leaderboard(&self) -> &Leaderboard<S> {
        &self.leaderboard
    }

    pub fn terminal(&self) -> &T {
        &self.terminal
    }

    pub fn terminal_mut(&mut self) -> &mut T {
        &mut self.terminal
    }
}

pub fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_lowercase().as_str(), "y" | "yes")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedTicker;
    use crate::error::Error;
    use crate::leaderboard::FileScoreStore;
    use crate::terminal::{Key, ScriptedTerminal};
    use assert_matches::assert_matches;
    use tempfile::tempdir;

    fn app(
        term: ScriptedTerminal,
        dir: &tempfile::TempDir,
        settings: RoundSettings,
    ) -> App<ScriptedTerminal, FileScoreStore, FixedTicker> {
        let store = FileScoreStore::with_path(dir.path().join("leaderboard.json"));
        App::new(
            term,
            Leaderboard::load(store).unwrap(),
            FixedTicker::seconds(),
            settings,
        )
    }

    #[test]
    fn test_is_yes() {
        assert!(is_yes("yes"));
        assert!(is_yes(" Y \n"));
        assert!(is_yes("YES"));
        assert!(!is_yes("no"));
        assert!(!is_yes(""));
        assert!(!is_yes("yess"));
    }

    #[test]
    fn round_records_score() {
        let dir = tempdir().unwrap();
        let term = ScriptedTerminal::new()
            .with_lines(["abc", "Ann", ""])
            .type_str("abc")
            .press(Key::Enter);
        let mut app = app(term, &dir, RoundSettings::default());

        let entry = app.play_round().unwrap();
        assert_eq!(entry.name, "Ann");
        assert_eq!(app.leaderboard().all(), [entry]);
        assert!(!app.terminal().is_raw());
        assert!(app
            .terminal()
            .output()
            .iter()
            .any(|line| line.starts_with("Name: Ann, CPM: ")));
    }

    #[test]
    fn preset_prompt_and_name_skip_questions() {
        let dir = tempdir().unwrap();
        let term = ScriptedTerminal::new()
            .with_lines([""])
            .press(Key::Enter);
        let settings = RoundSettings {
            prompt: Some("xyz".into()),
            name: Some("Bo".into()),
            ..RoundSettings::default()
        };
        let mut app = app(term, &dir, settings);

        let entry = app.play_round().unwrap();
        assert_eq!(entry, ScoreEntry::new("Bo", 0, 0));
    }

    #[test]
    fn blank_name_is_anonymous() {
        let dir = tempdir().unwrap();
        let term = ScriptedTerminal::new()
            .with_lines(["abc", "  ", ""])
            .press(Key::Enter);
        let mut app = app(term, &dir, RoundSettings::default());
        assert_eq!(app.play_round().unwrap().name, ANONYMOUS);
    }

    #[test]
    fn run_repeats_until_declined() {
        let dir = tempdir().unwrap();
        let term = ScriptedTerminal::new()
            .with_lines(["", "yes", "", "no"])
            .type_str("a")
            .press(Key::Enter)
            .type_str("b")
            .press(Key::Enter);
        let settings = RoundSettings {
            prompt: Some("ab".into()),
            name: Some("Cy".into()),
            ..RoundSettings::default()
        };
        let mut app = app(term, &dir, settings);

        app.run().unwrap();
        assert_eq!(app.leaderboard().all().len(), 2);
    }

    #[test]
    fn interrupted_round_records_nothing() {
        let dir = tempdir().unwrap();
        let term = ScriptedTerminal::new()
            .with_lines(["abc", "Ann", ""])
            .type_str("ab")
            .press(Key::Interrupt);
        let mut app = app(term, &dir, RoundSettings::default());

        assert_matches!(app.play_round(), Err(Error::InputInterrupted));
        assert!(app.leaderboard().all().is_empty());
        assert!(!app.terminal().is_raw());
    }

    #[test]
    fn closed_input_interrupts_prompting() {
        let dir = tempdir().unwrap();
        let mut app = app(ScriptedTerminal::new(), &dir, RoundSettings::default());
        assert_matches!(app.play_round(), Err(Error::InputInterrupted));
    }
}
