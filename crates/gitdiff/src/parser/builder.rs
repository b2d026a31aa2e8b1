//! Folds tool-neutral file and hunk events into the diff model.

use super::hunk_header::{parse_hunk_header, section_info};
use super::{DiffLimits, FileHeader, HunkHeader, HunkRecord, LineRecord, ParseOptions};
use crate::encoding::normalize_file;
use crate::model::{Diff, DiffFile, DiffLine, DiffSection, LineKind};

/// Whether the parse loop should keep reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Flow {
    Continue,
    Stop,
}

pub(crate) struct DiffBuilder {
    diff: Diff,
    limits: DiffLimits,
    /// Pending software-side skip-to target.
    skip_to: Option<String>,
}

impl DiffBuilder {
    pub(crate) fn new(options: &ParseOptions) -> Self {
        Self {
            diff: Diff::new(),
            limits: options.limits,
            skip_to: options.skip_to.clone().filter(|name| !name.is_empty()),
        }
    }

    /// Add one file record. `hunks` is only evaluated for files that are kept.
    pub(crate) fn add_file<F>(&mut self, header: FileHeader, hunks: F) -> Flow
    where
        F: FnOnce() -> Vec<HunkRecord>,
    {
        if let Some(target) = &self.skip_to {
            if *target != header.name {
                log::debug!("Skipping {} while looking for {}", header.name, target);
                return Flow::Continue;
            }
            self.skip_to = None;
        }

        if let Some(max_files) = self.limits.max_files {
            if self.diff.files.len() >= max_files {
                log::debug!(
                    "File limit of {} reached, diff ends before {}",
                    max_files,
                    header.name
                );
                self.diff.is_incomplete = true;
                self.diff.end = Some(header.name);
                return Flow::Stop;
            }
        }

        let mut file = DiffFile::new(header.name, self.diff.files.len() + 1);
        file.old_name = header.old_name;
        file.language = header.language;

        let mut state = FileState::default();
        for hunk in hunks() {
            let section = self.build_section(&mut file, &mut state, hunk);
            file.sections.push(section);
        }
        file.recalculate_stats();

        self.diff.push_file(file);
        Flow::Continue
    }

    fn build_section(
        &self,
        file: &mut DiffFile,
        state: &mut FileState,
        hunk: HunkRecord,
    ) -> DiffSection {
        let (header, mut counters) = match hunk.header {
            HunkHeader::Marker(marker) => (DiffLine::section_header(marker, None), None),
            HunkHeader::Unified { raw, range } => {
                let range = parse_hunk_header(&raw).unwrap_or(range);
                let info = section_info(&file.name, range, state.last_left, state.last_right);
                let counters = Counters {
                    left: range.old_start,
                    right: range.new_start,
                };
                (DiffLine::section_header(raw, Some(info)), Some(counters))
            }
        };

        let mut section = DiffSection::new(file, header);
        for line in hunk.lines {
            let keep = self
                .limits
                .max_lines
                .is_none_or(|max_lines| state.kept_lines < max_lines);
            // Dropped lines still advance the counters.
            let Some(mut diff_line) = number_line(&line, counters.as_mut()) else {
                log::warn!("Dropping header line inside a hunk of {}", file.name);
                continue;
            };
            if !keep {
                file.is_incomplete = true;
                continue;
            }
            state.kept_lines += 1;

            if let Some(max_chars) = self.limits.max_line_characters {
                if truncate_text(&mut diff_line, max_chars) {
                    file.is_incomplete_line_too_long = true;
                }
            }
            section.lines.push(diff_line);
        }

        if let Some(counters) = counters {
            state.last_left = counters.left.saturating_sub(1);
            state.last_right = counters.right.saturating_sub(1);
        }
        section
    }

    /// Repair encodings file by file and hand out the diff.
    pub(crate) fn finish(mut self) -> Diff {
        for file in &mut self.diff.files {
            normalize_file(file);
        }
        self.diff.recalculate_totals();
        self.diff
    }
}

/// Per-file bookkeeping across hunks.
#[derive(Debug, Default)]
struct FileState {
    kept_lines: usize,
    last_left: u32,
    last_right: u32,
}

/// Running old/new line numbers inside a unified hunk.
#[derive(Debug, Clone, Copy)]
struct Counters {
    left: u32,
    right: u32,
}

/// Turn a line record into a diff line, advancing the counters of its side.
///
/// Returns `None` for header records, a section has exactly one header.
fn number_line(line: &LineRecord, counters: Option<&mut Counters>) -> Option<DiffLine> {
    if line.kind == LineKind::SectionHeader {
        return None;
    }
    let Some(c) = counters else {
        return Some(DiffLine::with_kind(line.kind, &line.text));
    };

    let diff_line = match line.kind {
        LineKind::Addition | LineKind::MovedAddition => {
            let diff_line = DiffLine {
                right_idx: Some(c.right),
                ..DiffLine::with_kind(line.kind, &line.text)
            };
            c.right = c.right.saturating_add(1);
            diff_line
        }
        LineKind::Deletion | LineKind::MovedDeletion => {
            let diff_line = DiffLine {
                left_idx: Some(c.left),
                ..DiffLine::with_kind(line.kind, &line.text)
            };
            c.left = c.left.saturating_add(1);
            diff_line
        }
        LineKind::Plain | LineKind::SectionHeader => {
            let diff_line = DiffLine::context(&line.text, c.left, c.right);
            c.left = c.left.saturating_add(1);
            c.right = c.right.saturating_add(1);
            diff_line
        }
    };
    Some(diff_line)
}

/// Cut the line's text after `max_chars` characters, keeping the prefix.
fn truncate_text(line: &mut DiffLine, max_chars: usize) -> bool {
    let prefix_len = line.kind.prefix().len_utf8();
    let cut = line.content[prefix_len..]
        .char_indices()
        .nth(max_chars)
        .map(|(idx, _)| prefix_len + idx);
    match cut {
        Some(idx) => {
            line.content.truncate(idx);
            true
        }
        None => false,
    }
}
