//! Language-version comparison and the per-file version gate.
//!
//! Version strings have the shape `go1.NN`; malformed or empty strings
//! compare as the oldest possible version so checks that gate on a minimum
//! version stay conservative.

use crate::info::TypesInfo;
use std::cmp::Ordering;
use vetch_syntax::ast::NodeId;

/// Parse `goX.Y` into `(X, Y)`. Unknown shapes yield `(0, 0)`.
fn parse(v: &str) -> (u32, u32) {
    let Some(rest) = v.strip_prefix("go") else {
        return (0, 0);
    };
    let mut it = rest.splitn(2, '.');
    let major = it.next().and_then(|s| s.parse().ok()).unwrap_or(0);
    let minor = it
        .next()
        .map(|s| {
            // Tolerate patch suffixes like "1.21.3".
            s.split('.').next().unwrap_or(s)
        })
        .and_then(|s| s.parse().ok())
        .unwrap_or(0);
    (major, minor)
}

/// Compare two version strings.
pub fn compare(a: &str, b: &str) -> Ordering {
    parse(a).cmp(&parse(b))
}

/// True if `v` is at least `min`.
pub fn at_least(v: &str, min: &str) -> bool {
    compare(v, min) != Ordering::Less
}

/// True if the file's declared language version is at least `min`.
///
/// This is the single gate analyzers use for version-dependent behavior;
/// files with no recorded version are treated as predating every `min`.
pub fn file_uses_version(info: &TypesInfo, file: NodeId, min: &str) -> bool {
    info.file_versions
        .get(&file)
        .is_some_and(|v| at_least(v, min))
}
