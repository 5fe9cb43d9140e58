//! Syntax layer for the vetch analysis engine.
//!
//! This crate owns everything between raw source text and the typed layers
//! above: the token set, the scanner with automatic semicolon insertion,
//! the arena-allocated AST, the recursive-descent parser, and the file set
//! that maps compact [`fileset::Pos`] values back to `file:line:col`
//! positions.
//!
//! # Quick Start
//!
//! ```
//! use vetch_syntax::{parse_file, Ast, FileSet};
//!
//! let mut fset = FileSet::new();
//! let mut ast = Ast::new();
//! let parsed = parse_file(&mut fset, &mut ast, "main.go", "package main\nfunc main() {}\n");
//! assert!(parsed.errors.is_empty());
//! ```

pub mod ast;
pub mod error;
pub mod fileset;
pub mod parser;
pub mod scanner;
pub mod token;

pub use ast::{
    Ast, BranchKind, ChanDir, DeclKeyword, EdgeKind, FileEntry, LitKind, Node, NodeId, NodeKind,
    NodeTag, TagSet,
};
pub use error::{annotate_window, SyntaxError};
pub use fileset::{FileSet, Pos, Position, SourceFile, NO_POS};
pub use parser::{parse_file, ParsedFile};
pub use token::{unquote, Token};
