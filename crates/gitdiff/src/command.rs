//! Assembles the git invocation for one diff request.

use std::path::PathBuf;

use gitdiff_config::{DiffTool, IngestConfig, WhitespaceBehavior};

use crate::git::{check_dynamic_argument, Commit, GitError, GitRepository, GitVersion, EMPTY_SHA, EMPTY_TREE_SHA};
use crate::parser::DiffLimits;

/// First git release with `git diff --skip-to`.
pub const SKIP_TO_MIN_VERSION: (u32, u32) = (2, 31);

/// What the caller wants diffed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiffOptions {
    /// Older revision; `None`, empty or all-zero means "the first parent of
    /// the after commit". Filled in by [`build_diff_command`].
    pub before_commit_id: Option<String>,
    pub after_commit_id: String,
    pub whitespace: WhitespaceBehavior,
    /// Start the diff at this file (pagination).
    pub skip_to: Option<String>,
    pub limits: DiffLimits,
}

impl DiffOptions {
    pub fn new(after_commit_id: impl Into<String>) -> Self {
        Self {
            after_commit_id: after_commit_id.into(),
            ..Self::default()
        }
    }

    fn has_before_commit(&self) -> bool {
        self.before_commit_id
            .as_deref()
            .is_some_and(|id| !id.is_empty() && id != EMPTY_SHA)
    }
}

/// Tool binaries taken from the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolSettings {
    pub difftastic_binary: String,
    pub mydt_subcommand: String,
}

impl From<&IngestConfig> for ToolSettings {
    fn from(config: &IngestConfig) -> Self {
        Self {
            difftastic_binary: config.difftastic_binary.clone(),
            mydt_subcommand: config.mydt_subcommand.clone(),
        }
    }
}

/// A fully specified subprocess.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffCommand {
    pub program: String,
    pub args: Vec<String>,
    /// Set for the child only, on top of the inherited environment.
    pub envs: Vec<(String, String)>,
    pub dir: PathBuf,
    /// Human readable label for logs and errors.
    pub description: String,
}

impl DiffCommand {
    pub fn env(&self, key: &str) -> Option<&str> {
        self.envs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// The command plus the skip-to work git could not do itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffInvocation {
    pub command: DiffCommand,
    /// Skip-to target the parser has to apply; `None` when git handles it
    /// natively or no skip was requested.
    pub software_skip_to: Option<String>,
}

/// Build the git command diffing `opts` with `tool`.
///
/// `after` is the looked-up after commit. Writes the resolved before commit
/// back into `opts.before_commit_id` when it had to be derived from the
/// first parent. A root commit without an explicit before commit is diffed
/// against the empty tree and leaves `opts.before_commit_id` untouched.
pub fn build_diff_command(
    tool: DiffTool,
    settings: &ToolSettings,
    repo: &GitRepository,
    after: &Commit,
    git_version: GitVersion,
    opts: &mut DiffOptions,
    files: &[String],
) -> Result<DiffInvocation, GitError> {
    let after_id = check_dynamic_argument(&opts.after_commit_id)?.to_string();

    let mut args: Vec<String> = match tool {
        DiffTool::Difftastic => ["diff", "--src-prefix=\\a/", "--dst-prefix=\\b/", "-M"]
            .iter()
            .map(|s| s.to_string())
            .collect(),
        DiffTool::Mydt => vec![settings.mydt_subcommand.clone()],
    };
    args.extend(opts.whitespace.args().iter().map(|s| s.to_string()));

    let mut software_skip_to = opts.skip_to.clone().filter(|name| !name.is_empty());
    if let Some(name) = &software_skip_to {
        let (major, minor) = SKIP_TO_MIN_VERSION;
        if git_version.at_least(major, minor) {
            args.push(format!("--skip-to={name}"));
            software_skip_to = None;
        }
    }

    if !opts.has_before_commit() && after.parent_count() == 0 {
        args.push(EMPTY_TREE_SHA.to_string());
        args.push(after_id);
    } else {
        let before_id = match (opts.has_before_commit(), &opts.before_commit_id) {
            (true, Some(id)) => id.clone(),
            _ => after.parent(0).unwrap_or(EMPTY_TREE_SHA).to_string(),
        };
        check_dynamic_argument(&before_id)?;
        args.push(before_id.clone());
        args.push(after_id);
        opts.before_commit_id = Some(before_id);
    }

    args.push("--".to_string());
    for file in files {
        args.push(check_dynamic_argument(file)?.to_string());
    }

    let envs = match tool {
        DiffTool::Difftastic => vec![
            ("DFT_UNSTABLE".to_string(), "yes".to_string()),
            ("DFT_DISPLAY".to_string(), "json".to_string()),
            ("GIT_EXTERNAL_DIFF".to_string(), settings.difftastic_binary.clone()),
        ],
        DiffTool::Mydt => {
            let mut envs = Vec::with_capacity(2);
            if let Ok(path) = std::env::var("PATH") {
                envs.push(("PATH".to_string(), path));
            }
            envs.push(("MYDT_FORMAT".to_string(), "json".to_string()));
            envs
        }
    };

    let description = format!(
        "git diff ({:?}) [repo_path: {}]",
        tool,
        repo.path().display()
    );

    Ok(DiffInvocation {
        command: DiffCommand {
            program: repo.git_binary().to_string(),
            args,
            envs,
            dir: repo.path().to_path_buf(),
            description,
        },
        software_skip_to,
    })
}
