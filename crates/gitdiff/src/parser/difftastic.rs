//! difftastic JSON records (`DFT_DISPLAY=json`).
//!
//! difftastic reports changed character ranges per side rather than aligned
//! lines, so every left-side change becomes a deletion and every right-side
//! change an addition, without line numbers.

use serde::Deserialize;

use super::{FileHeader, HunkHeader, HunkRecord, LineRecord, RecordAdapter};
use crate::model::LineKind;

/// Header shown for every difftastic hunk.
pub const HUNK_MARKER: &str = "@";

/// One changed character range.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DifftChange {
    #[serde(default)]
    pub start: u32,
    #[serde(default)]
    pub end: u32,
    #[serde(default)]
    pub content: String,
}

/// One side (lhs or rhs) of an aligned line.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DifftSide {
    #[serde(default)]
    pub line_number: u32,
    #[serde(default)]
    pub changes: Vec<DifftChange>,
}

/// An aligned line pair; either side may be missing.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DifftLine {
    #[serde(default)]
    pub lhs: DifftSide,
    #[serde(default)]
    pub rhs: DifftSide,
}

/// One output line: a whole file.
#[derive(Debug, Clone, Deserialize)]
pub struct DifftFile {
    pub path: String,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub chunks: Vec<Vec<DifftLine>>,
}

/// Adapter for [`DifftFile`] records.
#[derive(Debug, Clone, Copy, Default)]
pub struct DifftasticAdapter;

impl RecordAdapter for DifftasticAdapter {
    type Record = DifftFile;

    const TOOL: &'static str = "difftastic";

    fn file_header(record: &DifftFile) -> Option<FileHeader> {
        if record.path.is_empty() {
            return None;
        }
        Some(FileHeader {
            name: record.path.clone(),
            old_name: None,
            language: record.language.clone().filter(|l| !l.is_empty()),
        })
    }

    fn into_hunks(record: DifftFile) -> Vec<HunkRecord> {
        record
            .chunks
            .into_iter()
            .map(|chunk| {
                let mut lines = Vec::new();
                for line in chunk {
                    lines.extend(
                        line.lhs
                            .changes
                            .into_iter()
                            .map(|change| LineRecord::new(LineKind::Deletion, change.content)),
                    );
                    lines.extend(
                        line.rhs
                            .changes
                            .into_iter()
                            .map(|change| LineRecord::new(LineKind::Addition, change.content)),
                    );
                }
                HunkRecord {
                    header: HunkHeader::Marker(HUNK_MARKER),
                    lines,
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::{parse_stream, ParseError, ParseOptions};
    use pretty_assertions::assert_eq;

    const TWO_FILES: &str = concat!(
        r#"{"path":"src/main.rs","language":"Rust","status":"changed","chunks":[[{"lhs":{"line_number":1,"changes":[{"start":4,"end":7,"content":"old"}]},"rhs":{"line_number":1,"changes":[{"start":4,"end":7,"content":"new"},{"start":8,"end":9,"content":"x"}]}}]]}"#,
        "\n",
        r#"{"path":"README.md","language":"Text","status":"created","chunks":[[{"rhs":{"line_number":0,"changes":[{"start":0,"end":5,"content":"hello"}]}}],[{"lhs":{"line_number":9,"changes":[{"start":0,"end":3,"content":"bye"}]}}]]}"#,
        "\n",
    );

    #[tokio::test]
    async fn test_parse_two_files() {
        let outcome =
            parse_stream::<DifftasticAdapter, _>(TWO_FILES.as_bytes(), &ParseOptions::default())
                .await;
        assert!(outcome.error.is_none());
        let diff = outcome.diff;

        assert_eq!(diff.num_files, 2);
        assert_eq!(diff.total_additions, 3);
        assert_eq!(diff.total_deletions, 2);

        let main = &diff.files[0];
        assert_eq!(main.name, "src/main.rs");
        assert_eq!(main.language.as_deref(), Some("Rust"));
        assert_eq!(main.additions, 2);
        assert_eq!(main.deletions, 1);
        let contents: Vec<_> = main.sections[0]
            .lines
            .iter()
            .map(|l| l.content.as_str())
            .collect();
        assert_eq!(contents, vec!["@", "-old", "+new", "+x"]);
        assert!(main.lines().all(|l| l.left_idx.is_none() && l.right_idx.is_none()));

        let readme = &diff.files[1];
        assert_eq!(readme.index, 2);
        assert_eq!(readme.sections.len(), 2);
        assert_eq!(readme.sections[0].lines[0].kind, LineKind::SectionHeader);
        assert_eq!(readme.sections[1].lines[1].content, "-bye");
    }

    #[tokio::test]
    async fn test_missing_path_is_an_error() {
        let input = "{\"path\":\"\",\"chunks\":[]}\n";
        let outcome =
            parse_stream::<DifftasticAdapter, _>(input.as_bytes(), &ParseOptions::default()).await;
        assert!(matches!(
            outcome.error,
            Some(ParseError::MissingFileName { record: 1 })
        ));
        assert_eq!(outcome.diff.num_files, 0);
    }

    #[tokio::test]
    async fn test_skip_to_software_side() {
        let options = ParseOptions {
            skip_to: Some("README.md".to_string()),
            ..ParseOptions::default()
        };
        let outcome = parse_stream::<DifftasticAdapter, _>(TWO_FILES.as_bytes(), &options).await;
        assert!(outcome.error.is_none());
        assert_eq!(outcome.diff.num_files, 1);
        assert_eq!(outcome.diff.files[0].name, "README.md");
        assert_eq!(outcome.diff.files[0].index, 1);
        assert_eq!(outcome.diff.total_deletions, 1);
    }
}
