//! Session pipeline
//!
//! Bytes from the PTY go through the tokenizer and the state machine into
//! a [`Screen`]. This is the single mutation context: one session owns its
//! tokenizer, state and screen.

use crate::config::Config;
use crate::core::{Screen, ScreenSnapshot, TextSnapshot};
use crate::error::Result;
use crate::parser::Tokenizer;
use crate::terminal::{PromptPolicy, Terminal};

/// A tokenizer, state machine and screen wired together
#[derive(Debug)]
pub struct Session {
    tokenizer: Tokenizer,
    terminal: Terminal,
    screen: Screen,
}

impl Session {
    /// Session with default configuration at the given size
    pub fn new(columns: usize, rows: usize) -> Result<Self> {
        let config = Config {
            columns,
            rows,
            ..Config::default()
        };
        Self::from_config(&config)
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        config.validate()?;
        let mut tokenizer = Tokenizer::with_encoding(config.encoding);
        tokenizer.set_max_sequence_length(config.max_sequence_length);
        let mut terminal = Terminal::new(config.encoding);
        terminal.set_show_control_codes(config.show_control_codes);
        Ok(Self {
            tokenizer,
            terminal,
            screen: Screen::from_config(config)?,
        })
    }

    /// Session around a restored screen; the state machine starts fresh
    pub fn restore(config: &Config, snapshot: &ScreenSnapshot) -> Result<Self> {
        let config = Config {
            columns: snapshot.columns,
            rows: snapshot.rows,
            ..config.clone()
        };
        let mut session = Self::from_config(&config)?;
        session.screen = Screen::restore(snapshot)?;
        Ok(session)
    }

    /// Process bytes read from the PTY. Incomplete trailing sequences are
    /// kept until the next call.
    pub fn feed(&mut self, bytes: &[u8]) {
        self.tokenizer.feed(bytes);
        while let Some(token) = self.tokenizer.next_token() {
            self.terminal.execute(token, &mut self.screen);
            let encoding = self.terminal.active_encoding();
            if encoding != self.tokenizer.encoding() {
                tracing::debug!(encoding = encoding.name(), "switching input encoding");
                self.tokenizer.set_encoding(encoding);
            }
        }
    }

    pub fn screen(&self) -> &Screen {
        &self.screen
    }

    pub fn screen_mut(&mut self) -> &mut Screen {
        &mut self.screen
    }

    pub fn terminal(&self) -> &Terminal {
        &self.terminal
    }

    pub fn terminal_mut(&mut self) -> &mut Terminal {
        &mut self.terminal
    }

    /// Replies the application should receive on its input
    pub fn take_responses(&mut self) -> Vec<u8> {
        self.terminal.take_responses()
    }

    pub fn resize(&mut self, columns: usize, rows: usize) -> Result<()> {
        self.screen.resize(columns, rows)
    }

    pub fn set_prompt_policy(&mut self, policy: PromptPolicy) {
        self.terminal.set_prompt_policy(policy);
    }

    /// Reset requested by the user; pending input is discarded
    pub fn user_reset(&mut self) {
        self.tokenizer.clear();
        self.terminal.user_reset(&mut self.screen);
        self.tokenizer.set_encoding(self.terminal.active_encoding());
    }

    /// The program in the session was relaunched
    pub fn relaunch_reset(&mut self) {
        self.terminal.relaunch_reset(&mut self.screen);
        self.tokenizer.set_encoding(self.terminal.active_encoding());
    }

    pub fn text_snapshot(&self) -> TextSnapshot {
        self.screen.text_snapshot()
    }
}
