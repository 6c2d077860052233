use std::env;
use std::path::PathBuf;

use clap::ValueEnum;
use tracing::warn;

use crate::comments::TimeFormat;
use crate::json_utils::ExtractStrategy;

/// Raw dumps captured by the browser script.
pub const INPUT_PATTERN: &str = "main_*.json";
/// Looser pattern used only to decide whether the conversion flow should run.
pub const DISPATCH_PATTERN: &str = "main*.json";
pub const OUTPUT_PREFIX: &str = "bilibili_comments_";
pub const MERGE_PATTERN: &str = "bilibili_comment*.csv";
pub const MERGE_OUTPUT: &str = "comments_all.csv";

/// How yes/no confirmations are read.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum PromptMode {
    /// Read a full line from stdin.
    #[default]
    Line,
    /// Single keystroke in raw mode, falling back to a line read.
    Key,
}

/// Names of the environment variables consulted by [`AppConfig::from_env`].
pub trait EnvKeys {
    const DIR: &'static str = "BILI_COMMENTS_DIR";
    const TZ: &'static str = "BILI_COMMENTS_TZ";
    const STRATEGY: &'static str = "BILI_COMMENTS_STRATEGY";
    const PROMPT: &'static str = "BILI_COMMENTS_PROMPT";
    const MERGE_PATTERN: &'static str = "BILI_COMMENTS_MERGE_PATTERN";
    const MERGE_OUTPUT: &'static str = "BILI_COMMENTS_MERGE_OUTPUT";
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    /// Directory scanned for inputs; outputs are written here too.
    pub dir: PathBuf,
    pub time_format: TimeFormat,
    pub strategy: ExtractStrategy,
    pub prompt: PromptMode,
    /// Answer every confirmation with yes.
    pub assume_yes: bool,
    pub merge_pattern: String,
    pub merge_output: String,
}

impl EnvKeys for AppConfig {}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("."),
            time_format: TimeFormat::default(),
            strategy: ExtractStrategy::default(),
            prompt: PromptMode::default(),
            assume_yes: false,
            merge_pattern: MERGE_PATTERN.to_string(),
            merge_output: MERGE_OUTPUT.to_string(),
        }
    }
}

impl AppConfig {
    /// Defaults overlaid with environment variables (a `.env` file is loaded first
    /// and silently ignored when absent). Unparseable values are warned about and
    /// left at their default.
    pub fn from_env() -> Self {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) with an explicit variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        if let Some(dir) = lookup(Self::DIR) {
            config.dir = PathBuf::from(dir);
        }
        if let Some(tz) = parse_enum(&lookup, Self::TZ) {
            config.time_format = tz;
        }
        if let Some(strategy) = parse_enum(&lookup, Self::STRATEGY) {
            config.strategy = strategy;
        }
        if let Some(prompt) = parse_enum(&lookup, Self::PROMPT) {
            config.prompt = prompt;
        }
        if let Some(pattern) = lookup(Self::MERGE_PATTERN) {
            config.merge_pattern = pattern;
        }
        if let Some(output) = lookup(Self::MERGE_OUTPUT) {
            config.merge_output = output;
        }
        config
    }

    #[must_use]
    pub fn with_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.dir = dir.into();
        self
    }

    #[must_use]
    pub const fn with_time_format(mut self, time_format: TimeFormat) -> Self {
        self.time_format = time_format;
        self
    }

    #[must_use]
    pub const fn with_strategy(mut self, strategy: ExtractStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    #[must_use]
    pub const fn with_prompt(mut self, prompt: PromptMode) -> Self {
        self.prompt = prompt;
        self
    }

    #[must_use]
    pub const fn with_assume_yes(mut self, assume_yes: bool) -> Self {
        self.assume_yes = assume_yes;
        self
    }

    #[must_use]
    pub fn with_merge(mut self, pattern: impl Into<String>, output: impl Into<String>) -> Self {
        self.merge_pattern = pattern.into();
        self.merge_output = output.into();
        self
    }
}

fn parse_enum<T: ValueEnum>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
    let raw = lookup(key)?;
    match T::from_str(raw.trim(), true) {
        Ok(value) => Some(value),
        Err(e) => {
            warn!(key, value = %raw, "ignoring invalid setting: {}", e);
            None
        }
    }
}
