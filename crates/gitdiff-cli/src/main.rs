use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use gitdiff::{DiffLimits, DiffOptions, DiffService, GitRepository};
use gitdiff_config::{DiffTool, IngestConfig, WhitespaceBehavior};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ToolArg {
    Difftastic,
    Mydt,
}

impl From<ToolArg> for DiffTool {
    fn from(arg: ToolArg) -> Self {
        match arg {
            ToolArg::Difftastic => DiffTool::Difftastic,
            ToolArg::Mydt => DiffTool::Mydt,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum WhitespaceArg {
    ShowAll,
    IgnoreAll,
    IgnoreChange,
    IgnoreEol,
}

impl From<WhitespaceArg> for WhitespaceBehavior {
    fn from(arg: WhitespaceArg) -> Self {
        match arg {
            WhitespaceArg::ShowAll => WhitespaceBehavior::ShowAll,
            WhitespaceArg::IgnoreAll => WhitespaceBehavior::IgnoreAll,
            WhitespaceArg::IgnoreChange => WhitespaceBehavior::IgnoreChange,
            WhitespaceArg::IgnoreEol => WhitespaceBehavior::IgnoreEol,
        }
    }
}

#[derive(Parser)]
#[command(name = "gitdiff", about = "Structured diff of a commit range as JSON")]
struct Cli {
    /// Commit to diff against (defaults to the first parent of <AFTER>)
    #[arg(long)]
    before: Option<String>,

    /// Diff tool (defaults to the configured one)
    #[arg(long, value_enum)]
    tool: Option<ToolArg>,

    /// Start the diff at this file
    #[arg(long)]
    skip_to: Option<String>,

    /// Whitespace handling (defaults to the configured one)
    #[arg(long, value_enum)]
    whitespace: Option<WhitespaceArg>,

    /// Path to the git repository
    #[arg(long, default_value = ".")]
    repo: PathBuf,

    /// Commit to show
    after: String,

    /// Only diff these paths
    #[arg(last = true)]
    files: Vec<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let dotenv = dotenvy::dotenv();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    match dotenv {
        Ok(path) => log::debug!("Loaded .env file from: {:?}", path),
        Err(_) => log::debug!(".env file not found, using the process environment"),
    }

    let cli = Cli::parse();
    let config = IngestConfig::load()
        .validated()
        .context("Invalid gitdiff configuration")?;

    let repo = GitRepository::open(&cli.repo, config.git_binary.clone())
        .with_context(|| format!("Cannot open repository {}", cli.repo.display()))?;

    let tool = cli.tool.map(DiffTool::from).unwrap_or(config.default_tool);
    let mut opts = DiffOptions {
        before_commit_id: cli.before,
        whitespace: cli
            .whitespace
            .map(WhitespaceBehavior::from)
            .unwrap_or(config.whitespace),
        skip_to: cli.skip_to,
        limits: DiffLimits::from(&config.limits),
        ..DiffOptions::new(cli.after)
    };

    let outcome = DiffService::new(&config)
        .get_diff(&repo, tool, &mut opts, &cli.files)
        .await
        .with_context(|| format!("Failed to diff {}", opts.after_commit_id))?;

    log::info!(
        "{} file(s), +{} -{} ({:?}..{})",
        outcome.diff.num_files,
        outcome.diff.total_additions,
        outcome.diff.total_deletions,
        opts.before_commit_id,
        opts.after_commit_id
    );

    let json = serde_json::to_string_pretty(&outcome.diff).context("Failed to serialize diff")?;
    println!("{json}");

    if let Some(err) = outcome.error {
        return Err(err).context("Diff is incomplete");
    }
    Ok(())
}
