//! Source positions and the file set.
//!
//! A [`Pos`] is an opaque offset into a [`FileSet`]. Each file added to the
//! set is assigned a contiguous base range, so a single `u32` identifies both
//! the file and the byte offset within it. `Pos` values convert back to
//! human-readable [`Position`]s (file, 1-indexed line, 1-indexed column)
//! through the set.
//!
//! ## Coordinate Conventions
//!
//! - Lines and columns are **1-indexed** (matching editor conventions)
//! - Byte offsets within a file are **0-indexed**
//! - `Pos` 0 is the "no position" sentinel ([`NO_POS`])

use memchr::memchr_iter;
use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// Pos
// ============================================================================

/// Compact source position: an offset into a [`FileSet`].
///
/// `Pos` values are only meaningful relative to the file set that produced
/// them. The zero value is the "unknown position" sentinel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Pos(pub u32);

/// The "no position" sentinel.
pub const NO_POS: Pos = Pos(0);

impl Pos {
    /// True unless this is the [`NO_POS`] sentinel.
    pub fn is_valid(self) -> bool {
        self.0 != 0
    }
}

impl fmt::Display for Pos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Position
// ============================================================================

/// Resolved source position: file name, 1-indexed line and column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    /// File name as registered with the file set.
    pub file: String,
    /// Line number (1-indexed); 0 when unknown.
    pub line: u32,
    /// Column number (1-indexed, UTF-8 bytes); 0 when unknown.
    pub col: u32,
}

impl Position {
    /// The unknown position.
    pub fn unknown() -> Self {
        Position {
            file: String::new(),
            line: 0,
            col: 0,
        }
    }

    /// True if this position names a file.
    pub fn is_valid(&self) -> bool {
        !self.file.is_empty()
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.is_valid() {
            return write!(f, "-");
        }
        write!(f, "{}:{}:{}", self.file, self.line, self.col)
    }
}

// ============================================================================
// SourceFile
// ============================================================================

/// A single file registered in a [`FileSet`].
///
/// Owns the file's base offset and a line-start table built once at
/// registration time.
#[derive(Debug, Clone)]
pub struct SourceFile {
    name: String,
    base: u32,
    size: u32,
    /// Byte offsets (file-local) of the first byte of each line.
    /// `line_starts[0]` is always 0.
    line_starts: Vec<u32>,
}

impl SourceFile {
    fn new(name: String, base: u32, src: &str) -> Self {
        let mut line_starts = Vec::with_capacity(16);
        line_starts.push(0);
        for nl in memchr_iter(b'\n', src.as_bytes()) {
            line_starts.push((nl + 1) as u32);
        }
        SourceFile {
            name,
            base,
            size: src.len() as u32,
            line_starts,
        }
    }

    /// The registered file name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The file's base offset in the owning set.
    pub fn base(&self) -> u32 {
        self.base
    }

    /// File size in bytes.
    pub fn size(&self) -> u32 {
        self.size
    }

    /// The position of the first byte of this file.
    pub fn start(&self) -> Pos {
        Pos(self.base)
    }

    /// The position one past the last byte of this file.
    pub fn end(&self) -> Pos {
        Pos(self.base + self.size)
    }

    /// Convert a file-local byte offset to a set-wide position.
    ///
    /// # Panics
    /// Panics if `offset` exceeds the file size.
    pub fn pos(&self, offset: usize) -> Pos {
        assert!(
            offset <= self.size as usize,
            "offset {} out of file bounds (size {})",
            offset,
            self.size
        );
        Pos(self.base + offset as u32)
    }

    /// Convert a set-wide position back to a file-local byte offset.
    pub fn offset(&self, pos: Pos) -> usize {
        debug_assert!(self.contains(pos));
        (pos.0 - self.base) as usize
    }

    /// True if `pos` falls within this file (end-inclusive, so EOF positions
    /// resolve to the file that produced them).
    pub fn contains(&self, pos: Pos) -> bool {
        pos.0 >= self.base && pos.0 <= self.base + self.size
    }

    /// Resolve a position to (1-indexed line, 1-indexed byte column).
    pub fn line_col(&self, pos: Pos) -> (u32, u32) {
        let offset = (pos.0 - self.base).min(self.size);
        let line_idx = self.line_starts.partition_point(|&s| s <= offset) - 1;
        let col = offset - self.line_starts[line_idx] + 1;
        (line_idx as u32 + 1, col)
    }

    /// File-local byte offset of the start of a 1-indexed line, clamped to
    /// the last line.
    pub fn line_start(&self, line: u32) -> usize {
        let idx = (line.max(1) as usize - 1).min(self.line_starts.len() - 1);
        self.line_starts[idx] as usize
    }

    /// Number of lines in the file.
    pub fn line_count(&self) -> u32 {
        self.line_starts.len() as u32
    }
}

// ============================================================================
// FileSet
// ============================================================================

/// The set of files under analysis.
///
/// Bases are allocated contiguously starting at 1, so `Pos` 0 stays free as
/// the sentinel. Files are stored in registration order; lookup by position
/// is a binary search over bases.
#[derive(Debug, Default)]
pub struct FileSet {
    files: Vec<SourceFile>,
    next_base: u32,
}

impl FileSet {
    /// Create an empty file set.
    pub fn new() -> Self {
        FileSet {
            files: Vec::new(),
            next_base: 1,
        }
    }

    /// Register a file and build its line table. Returns the index of the
    /// new [`SourceFile`].
    pub fn add(&mut self, name: impl Into<String>, src: &str) -> usize {
        let file = SourceFile::new(name.into(), self.next_base, src);
        // +1 so a file's EOF position does not collide with the next base.
        self.next_base = file.base + file.size + 1;
        self.files.push(file);
        self.files.len() - 1
    }

    /// All registered files, in registration order.
    pub fn files(&self) -> &[SourceFile] {
        &self.files
    }

    /// The file at a registration index.
    pub fn file(&self, idx: usize) -> &SourceFile {
        &self.files[idx]
    }

    /// Find the file containing `pos`.
    pub fn file_containing(&self, pos: Pos) -> Option<&SourceFile> {
        if !pos.is_valid() {
            return None;
        }
        let idx = self.files.partition_point(|f| f.base <= pos.0);
        if idx == 0 {
            return None;
        }
        let f = &self.files[idx - 1];
        f.contains(pos).then_some(f)
    }

    /// Resolve `pos` to a [`Position`], or the unknown position if `pos` is
    /// invalid or out of range.
    pub fn position(&self, pos: Pos) -> Position {
        match self.file_containing(pos) {
            Some(f) => {
                let (line, col) = f.line_col(pos);
                Position {
                    file: f.name().to_string(),
                    line,
                    col,
                }
            }
            None => Position::unknown(),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    mod single_file {
        use super::*;

        #[test]
        fn positions_resolve_to_line_and_column() {
            let mut fset = FileSet::new();
            let idx = fset.add("a.go", "package a\n\nvar x int\n");
            let f = fset.file(idx);

            let p = fset.position(f.pos(0));
            assert_eq!((p.line, p.col), (1, 1));
            let p = fset.position(f.pos(8));
            assert_eq!((p.line, p.col), (1, 9));
            // First byte of "var" on line 3.
            let p = fset.position(f.pos(11));
            assert_eq!((p.line, p.col), (3, 1));
        }

        #[test]
        fn display_renders_file_line_col() {
            let mut fset = FileSet::new();
            let idx = fset.add("pkg/a.go", "x");
            let p = fset.position(fset.file(idx).pos(0));
            assert_eq!(p.to_string(), "pkg/a.go:1:1");
        }

        #[test]
        fn eof_position_still_resolves() {
            let mut fset = FileSet::new();
            let idx = fset.add("a.go", "ab\n");
            let f = fset.file(idx);
            let p = fset.position(f.pos(3));
            assert_eq!((p.line, p.col), (2, 1));
        }
    }

    mod multiple_files {
        use super::*;

        #[test]
        fn bases_do_not_overlap() {
            let mut fset = FileSet::new();
            let a = fset.add("a.go", "package a\n");
            let b = fset.add("b.go", "package a\n");
            let pa = fset.file(a).pos(0);
            let pb = fset.file(b).pos(0);
            assert_ne!(pa, pb);
            assert_eq!(fset.file_containing(pa).unwrap().name(), "a.go");
            assert_eq!(fset.file_containing(pb).unwrap().name(), "b.go");
        }

        #[test]
        fn no_pos_resolves_to_unknown() {
            let fset = FileSet::new();
            assert!(!fset.position(NO_POS).is_valid());
            assert_eq!(fset.position(NO_POS).to_string(), "-");
        }
    }
}
