use std::path::PathBuf;
use std::process::exit;

use anyhow::Context;
use bili_comments::comments::TimeFormat;
use bili_comments::config::{AppConfig, PromptMode};
use bili_comments::discovery::GlobDiscovery;
use bili_comments::driver::{run, run_merge, Converter};
use bili_comments::json_utils::ExtractStrategy;
use bili_comments::prompt;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "📝 Convert captured comment dumps (main_*.json) into deduplicated CSV", long_about = None)]
#[command(after_help = "ENVIRONMENT VARIABLES:
    BILI_COMMENTS_DIR             Working directory [default: .]
    BILI_COMMENTS_TZ              Timestamp zone (local|utc)
    BILI_COMMENTS_STRATEGY        Extraction strategy (offset-scan|structural)
    BILI_COMMENTS_PROMPT          Confirmation style (line|key)
    BILI_COMMENTS_MERGE_PATTERN   Files to merge [default: bilibili_comment*.csv]
    BILI_COMMENTS_MERGE_OUTPUT    Merged file [default: comments_all.csv]
    RUST_LOG                      Log filter, e.g. bili_comments=debug

EXAMPLES:
    bili-comments                         # Convert dumps if present, otherwise merge CSVs
    bili-comments --dir ~/Downloads       # Work in another directory
    bili-comments --yes convert           # Convert and delete originals without asking
    bili-comments merge --output all.csv  # Merge only")]
struct Args {
    /// Directory to scan for inputs and write outputs to
    #[arg(short, long)]
    dir: Option<PathBuf>,

    /// Answer yes to every confirmation
    #[arg(short, long)]
    yes: bool,

    /// Render timestamps in UTC instead of local time
    #[arg(long)]
    utc: bool,

    /// How objects are recovered from non-array dumps
    #[arg(long, value_enum)]
    strategy: Option<ExtractStrategy>,

    /// Confirmation input style
    #[arg(long, value_enum)]
    prompt: Option<PromptMode>,

    #[command(subcommand)]
    command: Option<Mode>,
}

#[derive(Subcommand)]
enum Mode {
    /// Convert if dumps exist, else merge if CSVs exist (default)
    Auto,
    /// Convert main_*.json dumps to CSV
    Convert,
    /// Merge CSV files, deduplicating by (UserID, Timestamp)
    Merge {
        #[arg(long)]
        pattern: Option<String>,
        #[arg(long)]
        output: Option<String>,
    },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let mut config = AppConfig::from_env().with_assume_yes(args.yes);
    if let Some(dir) = args.dir {
        config = config.with_dir(dir);
    }
    if args.utc {
        config = config.with_time_format(TimeFormat::Utc);
    }
    if let Some(strategy) = args.strategy {
        config = config.with_strategy(strategy);
    }
    if let Some(mode) = args.prompt {
        config = config.with_prompt(mode);
    }
    if let Some(Mode::Merge { pattern, output }) = &args.command {
        let pattern = pattern.clone().unwrap_or_else(|| config.merge_pattern.clone());
        let output = output.clone().unwrap_or_else(|| config.merge_output.clone());
        config = config.with_merge(pattern, output);
    }

    let discovery = GlobDiscovery::new(&config.dir);
    let mut confirm = prompt::interactive(config.prompt, config.assume_yes);

    match args.command.unwrap_or(Mode::Auto) {
        Mode::Auto => {
            if let Err(e) = run(&config, &discovery, confirm.as_mut()) {
                eprintln!("❌ {}", e);
                exit(1);
            }
        }
        Mode::Convert => {
            Converter::new(&config, &discovery, confirm.as_mut())
                .run_conversion()
                .with_context(|| format!("Failed to scan {}", config.dir.display()))?;
        }
        Mode::Merge { .. } => {
            if run_merge(&config, &discovery).is_err() {
                exit(1);
            }
        }
    }

    Ok(())
}
