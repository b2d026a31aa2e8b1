//! Charset repair for diff content.
//!
//! External tools copy file content into their JSON verbatim, so a file stored
//! in a legacy encoding arrives as bytes that are not valid UTF-8. Such bytes
//! are escaped to private-use code points while decoding records
//! ([`escape_invalid_utf8`]) and turned back into bytes here, where the
//! encoding of each change category of a file is detected as a whole.
//!
//! Detection works per file and per category (context, additions, deletions).
//! Two encodings mixed inside one category of one file cannot be told apart.

use std::borrow::Cow;

use chardetng::EncodingDetector;
use encoding_rs::{Encoding, UTF_8};

use crate::model::{DiffFile, LineKind};

/// Escaped byte `b` is stored as `ESCAPE_BASE + b`; only bytes >= 0x80 occur.
const ESCAPE_BASE: u32 = 0xF700;
const ESCAPE_FIRST: u32 = ESCAPE_BASE + 0x80;
const ESCAPE_LAST: u32 = ESCAPE_BASE + 0xFF;

/// Decode bytes as UTF-8, escaping every invalid byte to a private-use char.
pub fn escape_invalid_utf8(bytes: &[u8]) -> Cow<'_, str> {
    if let Ok(text) = std::str::from_utf8(bytes) {
        return Cow::Borrowed(text);
    }

    let mut out = String::with_capacity(bytes.len() + 16);
    for chunk in bytes.utf8_chunks() {
        out.push_str(chunk.valid());
        for &byte in chunk.invalid() {
            out.push(char::from_u32(ESCAPE_BASE + u32::from(byte)).unwrap_or(char::REPLACEMENT_CHARACTER));
        }
    }
    Cow::Owned(out)
}

/// Append the original bytes of `text` to `out`, undoing [`escape_invalid_utf8`].
pub fn push_raw_bytes(text: &str, out: &mut Vec<u8>) {
    let mut utf8 = [0u8; 4];
    for ch in text.chars() {
        let code = u32::from(ch);
        if (ESCAPE_FIRST..=ESCAPE_LAST).contains(&code) {
            out.push((code - ESCAPE_BASE) as u8);
        } else {
            out.extend_from_slice(ch.encode_utf8(&mut utf8).as_bytes());
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Category {
    Context = 0,
    Addition = 1,
    Deletion = 2,
}

impl Category {
    fn of(kind: LineKind) -> Option<Self> {
        match kind {
            LineKind::Plain => Some(Category::Context),
            LineKind::Addition | LineKind::MovedAddition => Some(Category::Addition),
            LineKind::Deletion | LineKind::MovedDeletion => Some(Category::Deletion),
            LineKind::SectionHeader => None,
        }
    }
}

/// Re-decode the content lines of `file` whose category is not UTF-8.
///
/// Lines that fail to decode keep their content. Running this on a file whose
/// content is already valid UTF-8 changes nothing.
pub fn normalize_file(file: &mut DiffFile) {
    let mut buffers: [Vec<u8>; 3] = Default::default();
    for line in file.lines() {
        if let Some(category) = Category::of(line.kind) {
            let buffer = &mut buffers[category as usize];
            push_raw_bytes(line.text(), buffer);
            buffer.push(b'\n');
        }
    }

    let encodings = buffers.map(|buffer| detect_encoding(&buffer));
    if encodings.iter().all(Option::is_none) {
        return;
    }

    let mut raw = Vec::new();
    for line in file.sections.iter_mut().flat_map(|s| s.lines.iter_mut()) {
        let Some(category) = Category::of(line.kind) else {
            continue;
        };
        let Some(encoding) = encodings[category as usize] else {
            continue;
        };

        raw.clear();
        push_raw_bytes(line.text(), &mut raw);
        match encoding.decode_without_bom_handling_and_without_replacement(&raw) {
            Some(decoded) => {
                let mut content = String::with_capacity(decoded.len() + 1);
                content.push(line.kind.prefix());
                content.push_str(&decoded);
                line.content = content;
            }
            None => log::debug!(
                "Leaving line of {} as is, not valid {}",
                file.name,
                encoding.name()
            ),
        }
    }
}

/// The encoding of a category buffer, `None` when it is already UTF-8 or
/// nothing better can be determined.
fn detect_encoding(buffer: &[u8]) -> Option<&'static Encoding> {
    if buffer.is_empty() || std::str::from_utf8(buffer).is_ok() {
        return None;
    }

    let mut detector = EncodingDetector::new();
    detector.feed(buffer, true);
    let encoding = detector.guess(None, true);
    (encoding != UTF_8).then_some(encoding)
}
