//! Data models for diff representation.

mod diff;

pub use diff::{Diff, DiffFile, DiffLine, DiffSection, FileStatus, LineKind, SectionInfo};
