//! Streaming parsers for line-delimited JSON diff output.
//!
//! Each external tool has its own record shape. A [`RecordAdapter`] turns one
//! decoded record into tool-neutral file and hunk events, and a single
//! [`parse_stream`] loop folds those events into a [`Diff`] through the shared
//! builder, so skip-to, limits, counting and encoding repair exist once.

mod builder;
pub mod difftastic;
mod hunk_header;
pub mod mydt;

use gitdiff_config::LimitsConfig;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};

use crate::encoding::escape_invalid_utf8;
use crate::model::{Diff, LineKind};
use crate::runner::ProcessError;
use builder::{DiffBuilder, Flow};

pub use difftastic::DifftasticAdapter;
pub use hunk_header::{parse_hunk_header, section_info, HunkRange};
pub use mydt::MydtAdapter;

/// Errors that stop a parse; the diff built so far is kept in [`ParseOutcome`].
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("Failed to read diff stream: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to decode record {record}: {source}")]
    Decode {
        record: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("Record {record} does not name a file")]
    MissingFileName { record: usize },

    #[error("Diff process failed after producing output: {0}")]
    Process(#[from] ProcessError),
}

/// Truncation limits; `None` means unlimited.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DiffLimits {
    /// Maximum content lines kept per file, not across the whole diff.
    /// Whole-diff size is bounded by `max_files`.
    pub max_lines: Option<usize>,
    /// Maximum characters kept per line.
    pub max_line_characters: Option<usize>,
    /// Maximum number of files kept in the diff.
    pub max_files: Option<usize>,
}

impl DiffLimits {
    /// No limits at all.
    pub fn unlimited() -> Self {
        Self::default()
    }

    /// Read buffer size: the line character limit, but at least 4096 bytes.
    pub fn reader_capacity(&self) -> usize {
        self.max_line_characters.unwrap_or(0).max(4096)
    }
}

impl From<&LimitsConfig> for DiffLimits {
    fn from(config: &LimitsConfig) -> Self {
        let limit = |value: usize| (value > 0).then_some(value);
        Self {
            max_lines: limit(config.max_lines),
            max_line_characters: limit(config.max_line_characters),
            max_files: limit(config.max_files),
        }
    }
}

/// Tunables shared by both decoders.
#[derive(Debug, Clone, Default)]
pub struct ParseOptions {
    pub limits: DiffLimits,
    /// Drop every file before the first one with this name.
    pub skip_to: Option<String>,
}

/// Result of a parse: always a diff, plus the error that stopped it early.
#[derive(Debug)]
pub struct ParseOutcome {
    pub diff: Diff,
    pub error: Option<ParseError>,
}

impl ParseOutcome {
    /// Whether the stream was abandoned before its end, either by an error
    /// or because the file limit was reached.
    pub fn stopped_early(&self) -> bool {
        self.error.is_some() || self.diff.is_incomplete
    }

    /// Discard the partial diff when an error occurred.
    pub fn into_result(self) -> Result<Diff, ParseError> {
        match self.error {
            Some(err) => Err(err),
            None => Ok(self.diff),
        }
    }
}

/// Identity of one file record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileHeader {
    pub name: String,
    pub old_name: Option<String>,
    pub language: Option<String>,
}

impl FileHeader {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            old_name: None,
            language: None,
        }
    }
}

/// How a tool introduces a hunk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HunkHeader {
    /// The tool reports no line ranges; the header line shows this marker
    /// and lines are not numbered.
    Marker(&'static str),
    /// A unified `@@` header. `range` is what the tool reported next to the
    /// raw text and is used when the raw text does not parse.
    Unified { raw: String, range: HunkRange },
}

/// One classified line inside a hunk, text without prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineRecord {
    pub kind: LineKind,
    pub text: String,
}

impl LineRecord {
    pub fn new(kind: LineKind, text: impl Into<String>) -> Self {
        Self {
            kind,
            text: text.into(),
        }
    }
}

/// One hunk of a record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HunkRecord {
    pub header: HunkHeader,
    pub lines: Vec<LineRecord>,
}

/// Translates one tool's record shape into tool-neutral events.
pub trait RecordAdapter {
    /// One line of the tool's output.
    type Record: DeserializeOwned;

    /// Tool name used in log messages.
    const TOOL: &'static str;

    /// The file the record describes, `None` if it names none.
    fn file_header(record: &Self::Record) -> Option<FileHeader>;

    /// The record's hunks, in order.
    fn into_hunks(record: Self::Record) -> Vec<HunkRecord>;
}

/// Build a [`Diff`] from a stream of newline-delimited records.
///
/// Reading stops at end of stream, at the first record that fails to decode,
/// or once the file limit is reached. Whatever was built up to that point is
/// returned, followed by one pass of per-file encoding repair. The reader is
/// dropped before returning, which closes a pipe's read end.
pub async fn parse_stream<A, R>(reader: R, options: &ParseOptions) -> ParseOutcome
where
    A: RecordAdapter,
    R: AsyncRead + Unpin,
{
    log::debug!(
        "parse_stream[{}]({:?}, skip_to: {:?})",
        A::TOOL,
        options.limits,
        options.skip_to
    );

    let capacity = options.limits.reader_capacity();
    let mut input = BufReader::with_capacity(capacity, reader);
    let mut builder = DiffBuilder::new(options);
    let mut buf = Vec::with_capacity(capacity);
    let mut record = 0;

    let error = loop {
        buf.clear();
        match input.read_until(b'\n', &mut buf).await {
            Ok(0) => break None,
            Ok(_) => {}
            Err(err) => break Some(ParseError::Io(err)),
        }
        record += 1;

        if buf.iter().all(u8::is_ascii_whitespace) {
            continue;
        }

        let text = escape_invalid_utf8(&buf);
        let decoded: A::Record = match serde_json::from_str(&text) {
            Ok(decoded) => decoded,
            Err(source) => break Some(ParseError::Decode { record, source }),
        };
        let Some(header) = A::file_header(&decoded) else {
            break Some(ParseError::MissingFileName { record });
        };

        match builder.add_file(header, || A::into_hunks(decoded)) {
            Flow::Continue => {}
            Flow::Stop => break None,
        }
    };

    drop(input);
    ParseOutcome {
        diff: builder.finish(),
        error,
    }
}
