use std::collections::VecDeque;
use std::fmt::Debug;
use std::io::{self, BufRead, Write};
use std::time::Duration;

use crossterm::{
    event::{self, Event, KeyCode, KeyEvent},
    terminal,
};
use tracing::debug;

use crate::config::PromptMode;

/// The only answer that counts as yes (compared case-insensitively).
pub const AFFIRMATIVE: &str = "y";

/// Asks the user a yes/no question. Anything but the affirmative token is a no.
pub trait Confirm: Debug {
    fn confirm(&mut self, question: &str) -> bool;
}

pub fn is_affirmative(answer: &str) -> bool {
    answer.trim().to_lowercase() == AFFIRMATIVE
}

/// Line-based prompt over any reader/writer pair.
#[derive(Debug)]
pub struct LineConfirm<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> LineConfirm<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }
}

impl LineConfirm<io::StdinLock<'static>, io::Stdout> {
    pub fn stdio() -> Self {
        Self::new(io::stdin().lock(), io::stdout())
    }
}

impl<R: BufRead + Debug, W: Write + Debug> Confirm for LineConfirm<R, W> {
    fn confirm(&mut self, question: &str) -> bool {
        let _ = write!(self.output, "\n{} (y/n): ", question);
        let _ = self.output.flush();

        let mut answer = String::new();
        match self.input.read_line(&mut answer) {
            Ok(_) => is_affirmative(&answer),
            Err(e) => {
                debug!(error = %e, "failed to read confirmation; treating as no");
                false
            }
        }
    }
}

/// Single keystroke prompt. Falls back to reading a line when raw mode is unavailable
/// (e.g. stdin is not a terminal).
#[derive(Debug, Default)]
pub struct KeyConfirm;

impl KeyConfirm {
    fn read_single_key() -> io::Result<bool> {
        terminal::enable_raw_mode()?;
        let result = Self::poll_answer();
        terminal::disable_raw_mode()?;
        result
    }

    fn poll_answer() -> io::Result<bool> {
        if !event::poll(Duration::from_secs(30))? {
            // Timeout defaults to no
            return Ok(false);
        }
        match event::read()? {
            Event::Key(KeyEvent { code: KeyCode::Char(c), .. }) => Ok(c.eq_ignore_ascii_case(&'y')),
            _ => Ok(false),
        }
    }
}

impl Confirm for KeyConfirm {
    fn confirm(&mut self, question: &str) -> bool {
        print!("\n{} (y/n): ", question);
        let _ = io::stdout().flush();

        match Self::read_single_key() {
            Ok(answer) => {
                println!("{}", if answer { "y" } else { "n" });
                answer
            }
            Err(e) => {
                debug!(error = %e, "single key read unavailable, falling back to line input");
                let mut input = String::new();
                io::stdin().read_line(&mut input).is_ok() && is_affirmative(&input)
            }
        }
    }
}

/// Always says yes. Backs `--yes`.
#[derive(Debug, Default)]
pub struct AssumeYes;

impl Confirm for AssumeYes {
    fn confirm(&mut self, question: &str) -> bool {
        println!("\n{} (y/n): y", question);
        true
    }
}

/// Replays canned answers in order, then declines. Records every question asked.
#[derive(Debug, Default)]
pub struct ScriptedConfirm {
    answers: VecDeque<String>,
    pub asked: Vec<String>,
}

impl ScriptedConfirm {
    pub fn new<I, S>(answers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self { answers: answers.into_iter().map(Into::into).collect(), asked: Vec::new() }
    }
}

impl Confirm for ScriptedConfirm {
    fn confirm(&mut self, question: &str) -> bool {
        self.asked.push(question.to_string());
        self.answers.pop_front().is_some_and(|a| is_affirmative(&a))
    }
}

/// Interactive confirmer for the configured mode.
pub fn interactive(mode: PromptMode, assume_yes: bool) -> Box<dyn Confirm> {
    match (assume_yes, mode) {
        (true, _) => Box::new(AssumeYes),
        (false, PromptMode::Line) => Box::new(LineConfirm::stdio()),
        (false, PromptMode::Key) => Box::new(KeyConfirm),
    }
}
