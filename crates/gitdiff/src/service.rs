//! Entry point tying command building, the runner and the parsers together.

use gitdiff_config::{DiffTool, IngestConfig};
use thiserror::Error;
use tokio::process::ChildStdout;

use crate::command::{build_diff_command, DiffOptions, ToolSettings};
use crate::git::{GitError, GitRepository};
use crate::parser::{
    parse_stream, DifftasticAdapter, MydtAdapter, ParseError, ParseOptions, ParseOutcome,
};
use crate::runner::{ProcessError, ProcessRunner};

/// Failures before any diff output could be read.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error(transparent)]
    Git(#[from] GitError),

    #[error(transparent)]
    Process(#[from] ProcessError),
}

/// Produces diffs of a repository with one of the supported tools.
#[derive(Debug, Clone)]
pub struct DiffService {
    runner: ProcessRunner,
    tools: ToolSettings,
}

impl DiffService {
    pub fn new(config: &IngestConfig) -> Self {
        Self {
            runner: ProcessRunner::new(config.timeout()),
            tools: ToolSettings::from(config),
        }
    }

    /// Diff `opts.before_commit_id..opts.after_commit_id`, optionally limited
    /// to `files`.
    ///
    /// `opts.before_commit_id` is replaced by the first parent of the after
    /// commit when it was not given. A diff process failing after the whole
    /// output was parsed is reported in [`ParseOutcome::error`]; the diff
    /// read up to then is still returned.
    pub async fn get_diff(
        &self,
        repo: &GitRepository,
        tool: DiffTool,
        opts: &mut DiffOptions,
        files: &[String],
    ) -> Result<ParseOutcome, IngestError> {
        let after = repo.commit(&opts.after_commit_id).await?;
        let version = repo.version().await?;
        let invocation = build_diff_command(tool, &self.tools, repo, &after, version, opts, files)?;

        log::debug!(
            "get_diff({}) {:?}..{} with git {}",
            repo.path().display(),
            opts.before_commit_id,
            opts.after_commit_id,
            version
        );

        let parse_options = ParseOptions {
            limits: opts.limits,
            skip_to: invocation.software_skip_to,
        };
        let (stdout, handle) = self.runner.spawn(&invocation.command)?;
        let mut outcome = parse(tool, stdout, &parse_options).await;

        if let Err(err) = handle.wait().await {
            if outcome.stopped_early() {
                log::debug!(
                    "Diff process of {} ended after parsing stopped early: {}",
                    repo.path().display(),
                    err
                );
            } else {
                log::error!(
                    "Diff process failed [repo_path: {}]: {}",
                    repo.path().display(),
                    err
                );
                outcome.error = Some(ParseError::Process(err));
            }
        }

        Ok(outcome)
    }
}

async fn parse(tool: DiffTool, stdout: ChildStdout, options: &ParseOptions) -> ParseOutcome {
    match tool {
        DiffTool::Difftastic => parse_stream::<DifftasticAdapter, _>(stdout, options).await,
        DiffTool::Mydt => parse_stream::<MydtAdapter, _>(stdout, options).await,
    }
}
