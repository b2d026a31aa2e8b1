//! Diff data structures produced by the ingestion pipeline.

use serde::Serialize;
use sha1::{Digest, Sha1};

/// A complete diff between two revisions.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Diff {
    /// Files in the order the tool emitted them.
    pub files: Vec<DiffFile>,
    /// Total additions across all files.
    pub total_additions: usize,
    /// Total deletions across all files.
    pub total_deletions: usize,
    /// Number of retained files.
    pub num_files: usize,
    /// Set when a file limit cut the diff short.
    pub is_incomplete: bool,
    /// Name of the first file that was not included because of the file
    /// limit. Usable as the skip-to hint of the next page.
    pub end: Option<String>,
}

impl Diff {
    /// Create an empty diff.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a fully built file, keeping the totals in step.
    pub fn push_file(&mut self, file: DiffFile) {
        self.total_additions += file.additions;
        self.total_deletions += file.deletions;
        self.files.push(file);
        self.num_files = self.files.len();
    }

    /// Recalculate totals from files.
    pub fn recalculate_totals(&mut self) {
        self.total_additions = self.files.iter().map(|f| f.additions).sum();
        self.total_deletions = self.files.iter().map(|f| f.deletions).sum();
        self.num_files = self.files.len();
    }
}

/// A single file's diff.
#[derive(Debug, Clone, Serialize)]
pub struct DiffFile {
    /// Display name (path after the change).
    pub name: String,
    /// Previous path, when the tool reported a different one.
    pub old_name: Option<String>,
    /// Hex SHA-1 of `name`, a stable anchor for renderers.
    pub name_hash: String,
    /// 1-based position among retained files.
    pub index: usize,
    pub status: FileStatus,
    /// Language detected by the tool, if it reports one.
    pub language: Option<String>,
    pub sections: Vec<DiffSection>,
    /// Number of added lines (including moved additions).
    pub additions: usize,
    /// Number of deleted lines (including moved deletions).
    pub deletions: usize,
    /// Lines were dropped because of the per-file line limit.
    pub is_incomplete: bool,
    /// At least one line was cut at the per-line character limit.
    pub is_incomplete_line_too_long: bool,
}

impl DiffFile {
    /// Create a new file diff at the given 1-based index.
    pub fn new(name: impl Into<String>, index: usize) -> Self {
        let name = name.into();
        Self {
            name_hash: name_hash(&name),
            name,
            old_name: None,
            index,
            status: FileStatus::Modified,
            language: None,
            sections: Vec::new(),
            additions: 0,
            deletions: 0,
            is_incomplete: false,
            is_incomplete_line_too_long: false,
        }
    }

    /// Recalculate line statistics from sections.
    pub fn recalculate_stats(&mut self) {
        self.additions = self
            .lines()
            .filter(|l| l.kind.is_addition())
            .count();
        self.deletions = self
            .lines()
            .filter(|l| l.kind.is_deletion())
            .count();
    }

    /// All lines of all sections, section headers included.
    pub fn lines(&self) -> impl Iterator<Item = &DiffLine> {
        self.sections.iter().flat_map(|s| s.lines.iter())
    }
}

fn name_hash(name: &str) -> String {
    Sha1::digest(name.as_bytes())
        .iter()
        .map(|byte| format!("{:02x}", byte))
        .collect()
}

/// File status in the diff.
///
/// Ingestion always reports [`FileStatus::Modified`]; the other variants are
/// assigned by callers that classify renames, additions and deletions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FileStatus {
    Added,
    Modified,
    Deleted,
    Renamed,
    Copied,
}

/// A contiguous region of changes (hunk).
#[derive(Debug, Clone, Serialize)]
pub struct DiffSection {
    /// Index of the owning file (see [`DiffFile::index`]).
    pub file_index: usize,
    /// Name of the owning file.
    pub file_name: String,
    /// Lines in this section; the first one is always the section header.
    pub lines: Vec<DiffLine>,
}

impl DiffSection {
    /// Create a section for `file` holding only its header line.
    pub fn new(file: &DiffFile, header: DiffLine) -> Self {
        Self {
            file_index: file.index,
            file_name: file.name.clone(),
            lines: vec![header],
        }
    }
}

/// Parsed hunk header, seeding the line counters of its section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SectionInfo {
    /// Path of the owning file.
    pub path: String,
    /// Old-side line where the previous hunk of the file ended (0 for the first).
    pub last_left_idx: u32,
    /// New-side line where the previous hunk of the file ended (0 for the first).
    pub last_right_idx: u32,
    /// Old-side start line.
    pub left_idx: u32,
    /// New-side start line.
    pub right_idx: u32,
    /// Old-side line count.
    pub left_hunk_size: u32,
    /// New-side line count.
    pub right_hunk_size: u32,
}

/// A single rendered row in the diff.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiffLine {
    pub kind: LineKind,
    /// Line content including its one-character prefix (" ", "+" or "-").
    /// Section headers hold the raw header text instead.
    pub content: String,
    /// Old-side line number.
    pub left_idx: Option<u32>,
    /// New-side line number.
    pub right_idx: Option<u32>,
    /// Counterpart line on the other side; only set on context lines.
    pub match_idx: Option<u32>,
    /// Only present on section headers that carried a unified hunk header.
    pub section_info: Option<SectionInfo>,
}

impl DiffLine {
    /// Create a section header line.
    pub fn section_header(content: impl Into<String>, section_info: Option<SectionInfo>) -> Self {
        Self {
            kind: LineKind::SectionHeader,
            content: content.into(),
            left_idx: None,
            right_idx: None,
            match_idx: None,
            section_info,
        }
    }

    /// Create a content line of the given kind with the matching prefix.
    pub fn with_kind(kind: LineKind, text: &str) -> Self {
        let mut content = String::with_capacity(text.len() + 1);
        content.push(kind.prefix());
        content.push_str(text);
        Self {
            kind,
            content,
            left_idx: None,
            right_idx: None,
            match_idx: None,
            section_info: None,
        }
    }

    /// Create a new context line.
    pub fn context(text: &str, left_idx: u32, right_idx: u32) -> Self {
        Self {
            left_idx: Some(left_idx),
            right_idx: Some(right_idx),
            match_idx: Some(left_idx),
            ..Self::with_kind(LineKind::Plain, text)
        }
    }

    /// Create a new addition line.
    pub fn addition(text: &str, right_idx: Option<u32>) -> Self {
        Self {
            right_idx,
            ..Self::with_kind(LineKind::Addition, text)
        }
    }

    /// Create a new deletion line.
    pub fn deletion(text: &str, left_idx: Option<u32>) -> Self {
        Self {
            left_idx,
            ..Self::with_kind(LineKind::Deletion, text)
        }
    }

    /// Content without the one-character prefix.
    pub fn text(&self) -> &str {
        match self.kind {
            LineKind::SectionHeader => &self.content,
            _ => self.content.get(1..).unwrap_or_default(),
        }
    }
}

/// Line type in the diff.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LineKind {
    /// @@ header line.
    SectionHeader,
    /// Unchanged line (for context).
    Plain,
    /// Added line (+).
    Addition,
    /// Removed line (-).
    Deletion,
    /// Added line the tool recognised as moved from elsewhere.
    MovedAddition,
    /// Removed line the tool recognised as moved elsewhere.
    MovedDeletion,
}

impl LineKind {
    /// Get the prefix character for this line type.
    pub fn prefix(&self) -> char {
        match self {
            LineKind::Plain => ' ',
            LineKind::Addition | LineKind::MovedAddition => '+',
            LineKind::Deletion | LineKind::MovedDeletion => '-',
            LineKind::SectionHeader => '@',
        }
    }

    pub fn is_addition(&self) -> bool {
        matches!(self, LineKind::Addition | LineKind::MovedAddition)
    }

    pub fn is_deletion(&self) -> bool {
        matches!(self, LineKind::Deletion | LineKind::MovedDeletion)
    }
}
