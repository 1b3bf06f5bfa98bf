use clap::{error::ErrorKind, CommandFactory, Parser};
use crossterm::tty::IsTty;
use keysprint::{
    app::{App, RoundSettings},
    app_dirs::AppDirs,
    clock::FixedTicker,
    config::{Config, ConfigStore, FileConfigStore},
    leaderboard::{FileScoreStore, Leaderboard},
    logging,
    terminal::{CrosstermTerminal, Terminal},
    typing_policy::AppendPolicy,
    Error,
};
use std::{error::Error as StdError, io::stdin, path::PathBuf};
use tracing::{info, warn};

/// console typing-speed test with a persistent leaderboard
#[derive(Parser, Debug, Clone)]
#[clap(
    version,
    about,
    long_about = "Type a given text as fast as you can within a fixed time window. Every result is appended to a leaderboard file."
)]
pub struct Cli {
    /// text to type (asked for each round when omitted)
    #[clap(short = 'p', long)]
    prompt: Option<String>,

    /// player name (asked for each round when omitted)
    #[clap(short = 'n', long)]
    name: Option<String>,

    /// number of seconds a round lasts
    #[clap(short = 's', long = "secs")]
    number_of_secs: Option<u64>,

    /// leaderboard file to read and append to
    #[clap(short = 'l', long)]
    leaderboard: Option<PathBuf>,

    /// record every accepted keystroke twice, like the first versions of the game
    #[clap(long)]
    double_append: bool,

    /// remember --secs, --leaderboard and --double-append as the new defaults
    #[clap(long)]
    save_config: bool,
}

impl Cli {
    /// Overlays the command-line flags on the stored configuration.
    fn merge(&self, config: &Config) -> Config {
        Config {
            duration_secs: self.number_of_secs.unwrap_or(config.duration_secs),
            leaderboard_path: self
                .leaderboard
                .clone()
                .or_else(|| config.leaderboard_path.clone()),
            double_append: self.double_append || config.double_append,
        }
    }

    fn round_settings(&self, config: &Config) -> RoundSettings {
        RoundSettings {
            prompt: self.prompt.clone(),
            name: self.name.clone(),
            duration_secs: config.duration_secs,
            append_policy: AppendPolicy::from_double_append(config.double_append),
        }
    }
}

fn main() -> Result<(), Box<dyn StdError>> {
    let cli = Cli::parse();

    if !stdin().is_tty() {
        let mut cmd = Cli::command();
        cmd.error(ErrorKind::Io, "stdin must be a tty").exit();
    }

    if let Some(log_path) = AppDirs::log_path() {
        // the game works without a log file
        let _ = logging::init(&log_path);
    }

    let config_store = FileConfigStore::new();
    let config = cli.merge(&config_store.load());
    if cli.save_config {
        config_store.save(&config)?;
        info!(path = %config_store.path().display(), "config saved");
    }

    let store = FileScoreStore::with_path(config.leaderboard_path());
    let leaderboard = match Leaderboard::load(store) {
        Ok(leaderboard) => leaderboard,
        Err(e) => {
            warn!(error = %e, "cannot start");
            let mut cmd = Cli::command();
            cmd.error(ErrorKind::Io, e.to_string()).exit();
        }
    };

    let mut app = App::new(
        CrosstermTerminal::new(),
        leaderboard,
        FixedTicker::seconds(),
        cli.round_settings(&config),
    );
    let outcome = app.run();

    let terminal = app.terminal_mut();
    terminal.set_raw_mode(false)?;
    terminal.set_cursor_visible(true)?;

    match outcome {
        Err(Error::InputInterrupted) => {
            info!("input closed, exiting");
            terminal.write_line("")?;
            Ok(())
        }
        other => Ok(other?),
    }
}
