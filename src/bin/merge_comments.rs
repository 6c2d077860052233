use std::path::PathBuf;
use std::process::exit;

use bili_comments::config::AppConfig;
use bili_comments::discovery::GlobDiscovery;
use bili_comments::driver::run_merge;
use clap::Parser;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "🔗 Merge comment CSVs, keeping the first row per (UserID, Timestamp)", long_about = None)]
struct Args {
    /// Directory holding the CSV files
    #[arg(short, long)]
    dir: Option<PathBuf>,

    /// Glob of files to merge [default: bilibili_comment*.csv]
    #[arg(long)]
    pattern: Option<String>,

    /// Merged output file [default: comments_all.csv]
    #[arg(long)]
    output: Option<String>,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let mut config = AppConfig::from_env();
    if let Some(dir) = args.dir {
        config = config.with_dir(dir);
    }
    let pattern = args.pattern.unwrap_or_else(|| config.merge_pattern.clone());
    let output = args.output.unwrap_or_else(|| config.merge_output.clone());
    let config = config.with_merge(pattern, output);

    if run_merge(&config, &GlobDiscovery::new(&config.dir)).is_err() {
        exit(1);
    }
}
