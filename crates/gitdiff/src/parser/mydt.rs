//! JSON records of the `git mydt` subcommand (`MYDT_FORMAT=json`).
//!
//! Each record is one file with unified hunks; every line carries an explicit
//! change marker, including markers for moved lines.

use serde::Deserialize;

use super::{FileHeader, HunkHeader, HunkRange, HunkRecord, LineRecord, RecordAdapter};
use crate::model::LineKind;

const DEV_NULL: &str = "/dev/null";

/// Change marker of one line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum MydtLineType {
    #[serde(rename = " ")]
    Context,
    #[serde(rename = "+")]
    Addition,
    #[serde(rename = "-")]
    Deletion,
    #[serde(rename = "m+")]
    MovedAddition,
    #[serde(rename = "m-")]
    MovedDeletion,
    #[serde(other)]
    Unknown,
}

impl MydtLineType {
    fn kind(self) -> Option<LineKind> {
        match self {
            MydtLineType::Context => Some(LineKind::Plain),
            MydtLineType::Addition => Some(LineKind::Addition),
            MydtLineType::Deletion => Some(LineKind::Deletion),
            MydtLineType::MovedAddition => Some(LineKind::MovedAddition),
            MydtLineType::MovedDeletion => Some(LineKind::MovedDeletion),
            MydtLineType::Unknown => None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct MydtLine {
    #[serde(rename = "type")]
    pub line_type: MydtLineType,
    #[serde(default)]
    pub text: String,
}

/// Structured copy of the `@@` header; offsets are line counts.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MydtHunkHeader {
    #[serde(default)]
    pub raw: String,
    #[serde(default)]
    pub old_start: u32,
    #[serde(default)]
    pub old_offset: u32,
    #[serde(default)]
    pub new_start: u32,
    #[serde(default)]
    pub new_offset: u32,
}

impl MydtHunkHeader {
    fn range(&self) -> HunkRange {
        HunkRange {
            old_start: self.old_start,
            old_len: self.old_offset,
            new_start: self.new_start,
            new_len: self.new_offset,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct MydtHunk {
    #[serde(default)]
    pub headers: Vec<String>,
    #[serde(default)]
    pub header: MydtHunkHeader,
    #[serde(default)]
    pub lines: Vec<MydtLine>,
}

/// One output line: a whole file.
#[derive(Debug, Clone, Deserialize)]
pub struct MydtFile {
    #[serde(default)]
    pub headers: Vec<String>,
    #[serde(default)]
    pub old_path: String,
    #[serde(default)]
    pub new_path: String,
    #[serde(default)]
    pub hunks: Vec<MydtHunk>,
}

/// Adapter for [`MydtFile`] records.
#[derive(Debug, Clone, Copy, Default)]
pub struct MydtAdapter;

impl RecordAdapter for MydtAdapter {
    type Record = MydtFile;

    const TOOL: &'static str = "mydt";

    fn file_header(record: &MydtFile) -> Option<FileHeader> {
        let old_path = real_path(&record.old_path);
        let new_path = real_path(&record.new_path);

        let name = new_path
            .or(old_path)
            .map(str::to_string)
            .or_else(|| record.headers.first().and_then(|h| name_from_git_header(h)))?;

        let old_name = match (old_path, new_path) {
            (Some(old), Some(new)) if old != new => Some(old.to_string()),
            _ => None,
        };

        Some(FileHeader {
            name,
            old_name,
            language: None,
        })
    }

    fn into_hunks(record: MydtFile) -> Vec<HunkRecord> {
        record
            .hunks
            .into_iter()
            .map(|hunk| {
                let range = hunk.header.range();
                let raw = if hunk.header.raw.is_empty() {
                    format!(
                        "@@ -{},{} +{},{} @@",
                        range.old_start, range.old_len, range.new_start, range.new_len
                    )
                } else {
                    hunk.header.raw
                };

                let lines = hunk
                    .lines
                    .into_iter()
                    .filter_map(|line| match line.line_type.kind() {
                        Some(kind) => Some(LineRecord::new(kind, line.text)),
                        None => {
                            log::warn!("Dropping line with unknown change marker: {:?}", line.text);
                            None
                        }
                    })
                    .collect();

                HunkRecord {
                    header: HunkHeader::Unified { raw, range },
                    lines,
                }
            })
            .collect()
    }
}

fn real_path(path: &str) -> Option<&str> {
    (!path.is_empty() && path != DEV_NULL).then_some(path)
}

/// Take the new-side name out of a `diff --git a/X b/Y` line.
fn name_from_git_header(header: &str) -> Option<String> {
    let paths = header.strip_prefix("diff --git ")?;
    let (_, new) = paths.rsplit_once(" b/")?;
    (!new.is_empty()).then(|| new.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Diff, LineKind};
    use crate::parser::{parse_stream, ParseError, ParseOptions};
    use pretty_assertions::assert_eq;

    const SCENARIO: &str = r#"{"old_path":"a.txt","new_path":"a.txt","hunks":[{"header":{"raw":"@@ -1,1 +1,2 @@","old_start":1,"old_offset":1,"new_start":1,"new_offset":2},"lines":[{"type":" ","text":"keep"},{"type":"+","text":"added"}]}]}"#;

    async fn parse(input: &str) -> (Diff, Option<ParseError>) {
        let outcome =
            parse_stream::<MydtAdapter, _>(input.as_bytes(), &ParseOptions::default()).await;
        (outcome.diff, outcome.error)
    }

    fn record(name: &str) -> String {
        format!(
            r#"{{"old_path":"{name}","new_path":"{name}","hunks":[{{"header":{{"raw":"@@ -1 +1 @@","old_start":1,"old_offset":1,"new_start":1,"new_offset":1}},"lines":[{{"type":"-","text":"a"}},{{"type":"+","text":"b"}}]}}]}}"#
        )
    }

    #[tokio::test]
    async fn test_context_and_addition_scenario() {
        let (diff, error) = parse(&format!("{SCENARIO}\n")).await;
        assert!(error.is_none());
        assert_eq!(diff.num_files, 1);

        let file = &diff.files[0];
        assert_eq!(file.name, "a.txt");
        assert_eq!(file.old_name, None);
        assert_eq!(file.additions, 1);
        assert_eq!(file.deletions, 0);

        let lines = &file.sections[0].lines;
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0].kind, LineKind::SectionHeader);
        assert_eq!(lines[0].content, "@@ -1,1 +1,2 @@");

        assert_eq!(lines[1].kind, LineKind::Plain);
        assert_eq!(lines[1].content, " keep");
        assert_eq!(lines[1].left_idx, Some(1));
        assert_eq!(lines[1].right_idx, Some(1));
        assert_eq!(lines[1].match_idx, Some(1));

        assert_eq!(lines[2].kind, LineKind::Addition);
        assert_eq!(lines[2].content, "+added");
        assert_eq!(lines[2].right_idx, Some(2));
        assert_eq!(lines[2].left_idx, None);
        assert_eq!(lines[2].match_idx, None);
    }

    #[tokio::test]
    async fn test_empty_stream() {
        let (diff, error) = parse("").await;
        assert!(error.is_none());
        assert_eq!(diff.num_files, 0);
        assert_eq!(diff.total_additions, 0);
        assert_eq!(diff.total_deletions, 0);
    }

    #[tokio::test]
    async fn test_bad_record_keeps_earlier_files() {
        let input = format!("{SCENARIO}\n{{\"old_path\": oops\n");
        let (diff, error) = parse(&input).await;
        assert_eq!(diff.num_files, 1);
        assert_eq!(diff.files[0].name, "a.txt");
        assert!(matches!(error, Some(ParseError::Decode { record: 2, .. })));
    }

    #[tokio::test]
    async fn test_last_record_without_newline() {
        let (diff, error) = parse(SCENARIO).await;
        assert!(error.is_none());
        assert_eq!(diff.num_files, 1);
    }

    #[tokio::test]
    async fn test_skip_to_resumes_at_named_file() {
        let input: String = ["one", "two", "three", "four"]
            .iter()
            .map(|name| record(name) + "\n")
            .collect();
        let options = ParseOptions {
            skip_to: Some("three".to_string()),
            ..ParseOptions::default()
        };
        let outcome = parse_stream::<MydtAdapter, _>(input.as_bytes(), &options).await;
        assert!(outcome.error.is_none());
        let names: Vec<_> = outcome.diff.files.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["three", "four"]);
        assert_eq!(outcome.diff.total_additions, 2);
        assert_eq!(outcome.diff.total_deletions, 2);
    }

    #[tokio::test]
    async fn test_moved_lines_count_as_changes() {
        let input = r#"{"new_path":"m.rs","hunks":[{"header":{"raw":"@@ -4,2 +4,2 @@"},"lines":[{"type":"m-","text":"fn a() {}"},{"type":" ","text":"ctx"},{"type":"m+","text":"fn a() {}"}]}]}"#;
        let (diff, error) = parse(input).await;
        assert!(error.is_none());
        let file = &diff.files[0];
        assert_eq!(file.additions, 1);
        assert_eq!(file.deletions, 1);

        let lines = &file.sections[0].lines;
        assert_eq!(lines[1].kind, LineKind::MovedDeletion);
        assert_eq!(lines[1].content, "-fn a() {}");
        assert_eq!(lines[1].left_idx, Some(4));
        assert_eq!(lines[2].left_idx, Some(5));
        assert_eq!(lines[2].right_idx, Some(4));
        assert_eq!(lines[3].kind, LineKind::MovedAddition);
        assert_eq!(lines[3].content, "+fn a() {}");
        assert_eq!(lines[3].right_idx, Some(5));
    }

    #[tokio::test]
    async fn test_unknown_marker_is_dropped() {
        let input = r#"{"new_path":"x","hunks":[{"header":{"raw":"@@ -1 +1 @@"},"lines":[{"type":"\\","text":"No newline at end of file"},{"type":"+","text":"y"}]}]}"#;
        let (diff, error) = parse(input).await;
        assert!(error.is_none());
        assert_eq!(diff.files[0].sections[0].lines.len(), 2);
        assert_eq!(diff.files[0].sections[0].lines[1].right_idx, Some(1));
    }

    #[tokio::test]
    async fn test_structured_header_used_when_raw_missing() {
        let input = r#"{"new_path":"x","hunks":[{"header":{"old_start":7,"old_offset":1,"new_start":8,"new_offset":1},"lines":[{"type":" ","text":"z"}]}]}"#;
        let (diff, _) = parse(input).await;
        let lines = &diff.files[0].sections[0].lines;
        assert_eq!(lines[0].content, "@@ -7,1 +8,1 @@");
        assert_eq!(lines[1].left_idx, Some(7));
        assert_eq!(lines[1].right_idx, Some(8));
    }

    #[test]
    fn test_file_header_naming() {
        let renamed: MydtFile =
            serde_json::from_str(r#"{"old_path":"old.rs","new_path":"new.rs"}"#).unwrap();
        let header = MydtAdapter::file_header(&renamed).unwrap();
        assert_eq!(header.name, "new.rs");
        assert_eq!(header.old_name.as_deref(), Some("old.rs"));

        let deleted: MydtFile =
            serde_json::from_str(r#"{"old_path":"gone.rs","new_path":"/dev/null"}"#).unwrap();
        let header = MydtAdapter::file_header(&deleted).unwrap();
        assert_eq!(header.name, "gone.rs");
        assert_eq!(header.old_name, None);

        let from_git_header: MydtFile =
            serde_json::from_str(r#"{"headers":["diff --git a/dir/f.txt b/dir/f.txt"]}"#)
                .unwrap();
        assert_eq!(
            MydtAdapter::file_header(&from_git_header).unwrap().name,
            "dir/f.txt"
        );

        let nameless: MydtFile = serde_json::from_str(r#"{"hunks":[]}"#).unwrap();
        assert_eq!(MydtAdapter::file_header(&nameless), None);
    }
}
