//! Diff ingestion for git repositories
//!
//! This crate runs an external structured-diff tool through git, streams its
//! line-delimited JSON output and builds a tool-neutral [`Diff`]:
//!
//! - [`command`] assembles the git invocation for a tool
//! - [`runner`] runs it with a timeout, stdout piped straight into a parser
//! - [`parser`] decodes difftastic and mydt records into the shared model
//! - [`encoding`] repairs content that was not UTF-8
//! - [`service`] ties these together

pub mod command;
pub mod encoding;
pub mod git;
pub mod model;
pub mod parser;
pub mod runner;
pub mod service;

pub use command::{build_diff_command, DiffCommand, DiffInvocation, DiffOptions, ToolSettings};
pub use git::{Commit, GitError, GitRepository, GitVersion, EMPTY_SHA, EMPTY_TREE_SHA};
pub use model::{Diff, DiffFile, DiffLine, DiffSection, FileStatus, LineKind, SectionInfo};
pub use parser::{parse_stream, DiffLimits, ParseError, ParseOptions, ParseOutcome};
pub use runner::{ProcessError, ProcessRunner};
pub use service::{DiffService, IngestError};
