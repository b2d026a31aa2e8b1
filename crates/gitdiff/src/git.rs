//! The few git queries the diff pipeline needs before it can start.

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tokio::process::Command;

/// Tree object id of an empty tree, the base when diffing a root commit.
pub const EMPTY_TREE_SHA: &str = "4b825dc642cb6eb9a060e54bf8d69288fbee4904";

/// All-zero object id, used by callers to mean "no commit".
pub const EMPTY_SHA: &str = "0000000000000000000000000000000000000000";

#[derive(Debug, Error)]
pub enum GitError {
    #[error("{0} is not a directory")]
    NotADirectory(PathBuf),

    #[error("Refusing argument that looks like an option: {0}")]
    InvalidArgument(String),

    #[error("Failed to run git {args}: {source}")]
    Io {
        args: String,
        #[source]
        source: io::Error,
    },

    #[error("git {args} failed: {stderr}")]
    Command { args: String, stderr: String },

    #[error("Unexpected output from git {args}: {output:?}")]
    UnexpectedOutput { args: String, output: String },
}

/// A commit and its parents, as reported by `git rev-list --parents`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Commit {
    pub id: String,
    pub parents: Vec<String>,
}

impl Commit {
    pub fn parent_count(&self) -> usize {
        self.parents.len()
    }

    /// The `n`-th parent (0 is the first parent).
    pub fn parent(&self, n: usize) -> Option<&str> {
        self.parents.get(n).map(String::as_str)
    }
}

/// Installed git version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct GitVersion {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

impl GitVersion {
    pub const fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }

    /// Parse `git --version` output, e.g. `git version 2.39.2 (Apple Git-143)`.
    pub fn parse(output: &str) -> Option<Self> {
        let version = output.trim().strip_prefix("git version ")?;
        let token = version.split_whitespace().next()?;
        let mut numbers = token.split('.').map(|part| part.parse::<u32>().ok());

        let major = numbers.next()??;
        let minor = numbers.next().flatten().unwrap_or(0);
        let patch = numbers.next().flatten().unwrap_or(0);
        Some(Self::new(major, minor, patch))
    }

    pub fn at_least(&self, major: u32, minor: u32) -> bool {
        (self.major, self.minor) >= (major, minor)
    }
}

impl fmt::Display for GitVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

/// Reject revisions and paths git would read as options.
pub fn check_dynamic_argument(arg: &str) -> Result<&str, GitError> {
    if arg.starts_with('-') {
        return Err(GitError::InvalidArgument(arg.to_string()));
    }
    Ok(arg)
}

/// A repository on disk plus the git binary used to query it.
#[derive(Debug, Clone)]
pub struct GitRepository {
    path: PathBuf,
    git_binary: String,
}

impl GitRepository {
    pub fn open(path: impl Into<PathBuf>, git_binary: impl Into<String>) -> Result<Self, GitError> {
        let path = path.into();
        if !path.is_dir() {
            return Err(GitError::NotADirectory(path));
        }
        Ok(Self {
            path,
            git_binary: git_binary.into(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn git_binary(&self) -> &str {
        &self.git_binary
    }

    /// Look up a commit and its parents.
    pub async fn commit(&self, id: &str) -> Result<Commit, GitError> {
        let id = check_dynamic_argument(id)?;
        let out = self.run(&["rev-list", "--parents", "-n", "1", id, "--"]).await?;

        let mut ids = out.split_whitespace().map(str::to_string);
        let Some(commit_id) = ids.next() else {
            return Err(GitError::UnexpectedOutput {
                args: format!("rev-list --parents -n 1 {id}"),
                output: out,
            });
        };
        Ok(Commit {
            id: commit_id,
            parents: ids.collect(),
        })
    }

    /// The version of the configured git binary.
    pub async fn version(&self) -> Result<GitVersion, GitError> {
        let out = self.run(&["--version"]).await?;
        GitVersion::parse(&out).ok_or_else(|| GitError::UnexpectedOutput {
            args: "--version".to_string(),
            output: out,
        })
    }

    async fn run(&self, args: &[&str]) -> Result<String, GitError> {
        let output = Command::new(&self.git_binary)
            .args(args)
            .current_dir(&self.path)
            .output()
            .await
            .map_err(|source| GitError::Io {
                args: args.join(" "),
                source,
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(GitError::Command {
                args: args.join(" "),
                stderr: stderr.trim().to_string(),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }
}
