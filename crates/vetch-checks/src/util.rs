//! Small helpers shared by the built-in analyzers.

use vetch_syntax::ast::{Ast, NodeId};
use vetch_syntax::fileset::FileSet;

/// The exact source text of a node's range, when the range lies in a
/// registered file.
pub(crate) fn source_text<'a>(ast: &'a Ast, fset: &FileSet, node: NodeId) -> Option<&'a str> {
    let pos = ast.pos(node);
    let file = fset.file_containing(pos)?;
    let entry = ast.files().iter().find(|e| e.name == file.name())?;
    let start = file.offset(pos);
    let end = file.offset(ast.end(node));
    entry.source.get(start..end)
}
