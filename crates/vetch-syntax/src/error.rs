//! Syntax error type and source-window rendering.

use crate::fileset::{FileSet, Pos};
use thiserror::Error;

/// A scan or parse error with its position.
///
/// Positions are file-set offsets; use [`SyntaxError::render`] or the
/// owning `FileSet` to produce `file:line:col` text.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct SyntaxError {
    pub pos: Pos,
    pub message: String,
}

impl SyntaxError {
    pub fn new(pos: Pos, message: impl Into<String>) -> Self {
        SyntaxError {
            pos,
            message: message.into(),
        }
    }

    /// Render as `file:line:col: message`.
    pub fn render(&self, fset: &FileSet) -> String {
        let p = fset.position(self.pos);
        if p.is_valid() {
            format!("{}: {}", p, self.message)
        } else {
            self.message.clone()
        }
    }
}

// ============================================================================
// Context windows
// ============================================================================

/// Render a snippet of `src` around the byte range `[start, end)` with the
/// given label, showing `context` lines on each side.
///
/// Used for parse errors and for the driver's `-c=N` diagnostic display.
pub fn annotate_window(
    src: &str,
    title: &str,
    start: usize,
    end: usize,
    label: &str,
    context: usize,
) -> String {
    use annotate_snippets::{Level, Renderer, Snippet};

    let start = start.min(src.len());
    let end = end.clamp(start, src.len());

    // Expand to whole lines `context` lines out in both directions.
    let line_of = |off: usize| src[..off].bytes().filter(|&b| b == b'\n').count(); // 0-indexed
    let first_line = line_of(start).saturating_sub(context);
    let last_line = line_of(end) + context;

    let mut window_start = 0;
    let mut window_end = src.len();
    for (i, line_start) in line_starts(src).enumerate() {
        if i == first_line {
            window_start = line_start;
        }
        if i == last_line + 1 {
            window_end = line_start;
            break;
        }
    }
    let source = &src[window_start..window_end];
    let a_start = start - window_start;
    // Zero-width ranges render poorly; widen by one where possible.
    let a_end = if end == start {
        (a_start + 1).min(source.len().max(a_start + 1))
    } else {
        end - window_start
    };

    Renderer::styled()
        .render(
            Level::Error.title(title).snippet(
                Snippet::source(source)
                    .line_start(first_line + 1)
                    .fold(false)
                    .annotations(vec![Level::Error.span(a_start..a_end).label(label)]),
            ),
        )
        .to_string()
}

fn line_starts(src: &str) -> impl Iterator<Item = usize> + '_ {
    std::iter::once(0).chain(
        src.bytes()
            .enumerate()
            .filter(|&(_, b)| b == b'\n')
            .map(|(i, _)| i + 1),
    )
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fileset::FileSet;

    #[test]
    fn render_includes_position() {
        let mut fset = FileSet::new();
        let idx = fset.add("a.go", "package a\nvar x = \n");
        let err = SyntaxError::new(fset.file(idx).pos(18), "expected expression");
        let rendered = err.render(&fset);
        assert!(rendered.starts_with("a.go:2:9:"), "got {rendered}");
    }

    #[test]
    fn annotate_window_contains_source_line() {
        let src = "package a\nvar x = 1\nvar y = 2\n";
        let out = annotate_window(src, "a.go", 14, 15, "here", 1);
        assert!(out.contains("var x = 1"));
    }
}
