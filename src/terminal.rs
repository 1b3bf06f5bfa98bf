use std::collections::{BTreeMap, VecDeque};
use std::io::{self, Stdout, Write};
use std::thread;
use std::time::Duration;

use crossterm::{
    cursor::{Hide, MoveTo, Show},
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute, queue,
    style::Print,
    terminal::{disable_raw_mode, enable_raw_mode, Clear, ClearType},
};

use crate::error::{Error, Result};

/// A keystroke as seen by the typing session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Char(char),
    Enter,
    /// Ctrl-C or Ctrl-D: the user wants out.
    Interrupt,
    Other,
}

impl From<KeyEvent> for Key {
    fn from(key: KeyEvent) -> Self {
        match key.code {
            KeyCode::Char('c') | KeyCode::Char('d')
                if key.modifiers.contains(KeyModifiers::CONTROL) =>
            {
                Key::Interrupt
            }
            KeyCode::Char(c) => Key::Char(c),
            KeyCode::Enter => Key::Enter,
            _ => Key::Other,
        }
    }
}

/// Console operations the game needs. Rows are zero-based.
pub trait Terminal {
    /// Reads one line without its terminator. EOF is [`Error::InputInterrupted`].
    fn read_line(&mut self) -> Result<String>;
    /// Waits up to `timeout` for a keystroke.
    fn read_key(&mut self, timeout: Duration) -> Result<Option<Key>>;
    /// Replaces the contents of `row` with `text`.
    fn write_at(&mut self, row: u16, text: &str) -> Result<()>;
    /// Writes `text` followed by a newline at the cursor.
    fn write_line(&mut self, text: &str) -> Result<()>;
    /// Writes `text` at the cursor, leaving it on the same line.
    fn write(&mut self, text: &str) -> Result<()>;
    fn clear_screen(&mut self) -> Result<()>;
    fn set_cursor_visible(&mut self, visible: bool) -> Result<()>;
    /// Switches single-keystroke input on or off.
    fn set_raw_mode(&mut self, _enabled: bool) -> Result<()> {
        Ok(())
    }
}

/// Production terminal using crossterm
pub struct CrosstermTerminal {
    stdout: Stdout,
    raw: bool,
}

impl CrosstermTerminal {
    pub fn new() -> Self {
        Self {
            stdout: io::stdout(),
            raw: false,
        }
    }
}

impl Default for CrosstermTerminal {
    fn default() -> Self {
        Self::new()
    }
}

impl Terminal for CrosstermTerminal {
    fn read_line(&mut self) -> Result<String> {
        self.stdout.flush()?;
        let mut line = String::new();
        if io::stdin().read_line(&mut line)? == 0 {
            return Err(Error::InputInterrupted);
        }
        Ok(line.trim_end_matches(&['\r', '\n'][..]).to_string())
    }

    fn read_key(&mut self, timeout: Duration) -> Result<Option<Key>> {
        if !event::poll(timeout)? {
            return Ok(None);
        }
        match event::read()? {
            Event::Key(key) if key.kind != KeyEventKind::Release => Ok(Some(key.into())),
            _ => Ok(None),
        }
    }

    fn write_at(&mut self, row: u16, text: &str) -> Result<()> {
        queue!(
            self.stdout,
            MoveTo(0, row),
            Clear(ClearType::CurrentLine),
            Print(text)
        )?;
        self.stdout.flush()?;
        Ok(())
    }

    fn write_line(&mut self, text: &str) -> Result<()> {
        // raw mode does not translate \n into a carriage return
        let eol = if self.raw { "\r\n" } else { "\n" };
        queue!(self.stdout, Print(text), Print(eol))?;
        self.stdout.flush()?;
        Ok(())
    }

    fn write(&mut self, text: &str) -> Result<()> {
        queue!(self.stdout, Print(text))?;
        self.stdout.flush()?;
        Ok(())
    }

    fn clear_screen(&mut self) -> Result<()> {
        execute!(self.stdout, Clear(ClearType::All), MoveTo(0, 0))?;
        Ok(())
    }

    fn set_cursor_visible(&mut self, visible: bool) -> Result<()> {
        if visible {
            execute!(self.stdout, Show)?;
        } else {
            execute!(self.stdout, Hide)?;
        }
        Ok(())
    }

    fn set_raw_mode(&mut self, enabled: bool) -> Result<()> {
        if enabled == self.raw {
            return Ok(());
        }
        if enabled {
            enable_raw_mode()?;
        } else {
            disable_raw_mode()?;
        }
        self.raw = enabled;
        Ok(())
    }
}

/// Terminal for headless tests: replays queued input and records output.
///
/// A queued `None` key means "no keystroke during this poll". Once the key
/// queue runs dry `read_key` idles for its timeout, and `read_line` reports
/// [`Error::InputInterrupted`] once the line queue does.
#[derive(Debug, Default)]
pub struct ScriptedTerminal {
    lines: VecDeque<String>,
    keys: VecDeque<Option<Key>>,
    rows: BTreeMap<u16, String>,
    output: Vec<String>,
    cursor_visible: bool,
    raw: bool,
    clears: usize,
}

impl ScriptedTerminal {
    pub fn new() -> Self {
        Self {
            cursor_visible: true,
            ..Self::default()
        }
    }

    pub fn with_lines<I, S>(mut self, lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.lines.extend(lines.into_iter().map(Into::into));
        self
    }

    pub fn with_keys<I: IntoIterator<Item = Option<Key>>>(mut self, keys: I) -> Self {
        self.keys.extend(keys);
        self
    }

    /// Queues each character of `text` as a keystroke.
    pub fn type_str(mut self, text: &str) -> Self {
        self.keys.extend(text.chars().map(|c| Some(Key::Char(c))));
        self
    }

    pub fn press(mut self, key: Key) -> Self {
        self.keys.push_back(Some(key));
        self
    }

    /// Last text written to `row` since the screen was cleared.
    pub fn row(&self, row: u16) -> Option<&str> {
        self.rows.get(&row).map(String::as_str)
    }

    /// Everything written with `write`/`write_line`, one entry per call.
    pub fn output(&self) -> &[String] {
        &self.output
    }

    pub fn cursor_visible(&self) -> bool {
        self.cursor_visible
    }

    pub fn is_raw(&self) -> bool {
        self.raw
    }

    pub fn clears(&self) -> usize {
        self.clears
    }
}

impl Terminal for ScriptedTerminal {
    fn read_line(&mut self) -> Result<String> {
        self.lines.pop_front().ok_or(Error::InputInterrupted)
    }

    fn read_key(&mut self, timeout: Duration) -> Result<Option<Key>> {
        match self.keys.pop_front() {
            Some(key) => Ok(key),
            None => {
                thread::sleep(timeout);
                Ok(None)
            }
        }
    }

    fn write_at(&mut self, row: u16, text: &str) -> Result<()> {
        self.rows.insert(row, text.to_string());
        Ok(())
    }

    fn write_line(&mut self, text: &str) -> Result<()> {
        self.output.push(text.to_string());
        Ok(())
    }

    fn write(&mut self, text: &str) -> Result<()> {
        self.output.push(text.to_string());
        Ok(())
    }

    fn clear_screen(&mut self) -> Result<()> {
        self.rows.clear();
        self.clears += 1;
        Ok(())
    }

    fn set_cursor_visible(&mut self, visible: bool) -> Result<()> {
        self.cursor_visible = visible;
        Ok(())
    }

    fn set_raw_mode(&mut self, enabled: bool) -> Result<()> {
        self.raw = enabled;
        Ok(())
    }
}
