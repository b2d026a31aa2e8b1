//! Unified hunk header parsing (`@@ -old_start,old_len +new_start,new_len @@`).

use std::sync::LazyLock;

use regex::Regex;

use crate::model::SectionInfo;

/// Compiled once, reused for every hunk of every file
static HUNK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^@@ -(\d+)(?:,(\d+))?(?: \+(\d+)(?:,(\d+))?)? @@").expect("hardcoded hunk regex")
});

/// Line ranges of one hunk
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HunkRange {
    pub old_start: u32,
    pub old_len: u32,
    pub new_start: u32,
    pub new_len: u32,
}

/// Parse a hunk header into its old/new ranges.
///
/// - A missing length means a length of 1 (`@@ -3 +3 @@`)
/// - A header without a new-side range reuses the old-side range
/// - Trailing function context after the closing `@@` is ignored
///
/// Returns `None` when the text is not a hunk header.
pub fn parse_hunk_header(raw: &str) -> Option<HunkRange> {
    let caps = HUNK_RE.captures(raw.trim_start())?;
    let number = |idx: usize| caps.get(idx).and_then(|m| m.as_str().parse::<u32>().ok());

    let old_start = number(1)?;
    let old_len = match caps.get(2) {
        Some(_) => number(2)?,
        None => 1,
    };
    let (new_start, new_len) = match caps.get(3) {
        Some(_) => {
            let new_start = number(3)?;
            let new_len = match caps.get(4) {
                Some(_) => number(4)?,
                None => 1,
            };
            (new_start, new_len)
        }
        None => {
            log::debug!("Hunk header without new-side range: {}", raw);
            (old_start, old_len)
        }
    };

    Some(HunkRange {
        old_start,
        old_len,
        new_start,
        new_len,
    })
}

/// Build the section info for a hunk of `path`.
///
/// `last_left_idx`/`last_right_idx` are the counters where the previous hunk
/// of the same file stopped (0 for the first hunk).
pub fn section_info(
    path: &str,
    range: HunkRange,
    last_left_idx: u32,
    last_right_idx: u32,
) -> SectionInfo {
    SectionInfo {
        path: path.to_string(),
        last_left_idx,
        last_right_idx,
        left_idx: range.old_start,
        right_idx: range.new_start,
        left_hunk_size: range.old_len,
        right_hunk_size: range.new_len,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_header() {
        let range = parse_hunk_header("@@ -1,1 +1,2 @@").unwrap();
        assert_eq!(
            range,
            HunkRange {
                old_start: 1,
                old_len: 1,
                new_start: 1,
                new_len: 2,
            }
        );
    }

    #[test]
    fn test_parse_header_with_context() {
        let range = parse_hunk_header("@@ -10,7 +10,6 @@ impl Foo {").unwrap();
        assert_eq!(range.old_start, 10);
        assert_eq!(range.old_len, 7);
        assert_eq!(range.new_start, 10);
        assert_eq!(range.new_len, 6);
    }

    #[test]
    fn test_omitted_length_defaults_to_one() {
        let range = parse_hunk_header("@@ -3 +4 @@").unwrap();
        assert_eq!(range.old_len, 1);
        assert_eq!(range.new_len, 1);
        assert_eq!(range.old_start, 3);
        assert_eq!(range.new_start, 4);
    }

    #[test]
    fn test_new_file_header() {
        let range = parse_hunk_header("@@ -0,0 +1,3 @@").unwrap();
        assert_eq!(range.old_start, 0);
        assert_eq!(range.old_len, 0);
        assert_eq!(range.new_start, 1);
        assert_eq!(range.new_len, 3);
    }

    #[test]
    fn test_old_side_only_reuses_range() {
        let range = parse_hunk_header("@@ -5,2 @@").unwrap();
        assert_eq!(range.new_start, 5);
        assert_eq!(range.new_len, 2);
    }

    #[test]
    fn test_rejects_non_headers() {
        assert_eq!(parse_hunk_header("diff --git a/x b/x"), None);
        assert_eq!(parse_hunk_header("@@ nonsense @@"), None);
        assert_eq!(parse_hunk_header(""), None);
    }

    #[test]
    fn test_section_info_carries_previous_end() {
        let range = parse_hunk_header("@@ -20,3 +22,4 @@").unwrap();
        let info = section_info("src/lib.rs", range, 12, 13);
        assert_eq!(info.path, "src/lib.rs");
        assert_eq!(info.last_left_idx, 12);
        assert_eq!(info.last_right_idx, 13);
        assert_eq!(info.left_idx, 20);
        assert_eq!(info.right_idx, 22);
        assert_eq!(info.left_hunk_size, 3);
        assert_eq!(info.right_hunk_size, 4);
    }
}
