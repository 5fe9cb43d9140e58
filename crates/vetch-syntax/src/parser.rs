//! Recursive-descent parser producing arena AST nodes.
//!
//! Covers the declaration, statement, and expression grammar exercised by
//! the analyzers: package/import clauses, const/var/type declarations,
//! functions with receivers and simple type-parameter lists, the full
//! statement set (if/for/range/switch/type-switch/select/go/defer/labeled/
//! send/incdec/assign), and expressions including composite and function
//! literals.
//!
//! Parsing is best-effort: errors are collected and the parser synchronizes
//! at statement boundaries, so a file with errors still yields a partial
//! tree. The composite-literal ambiguity in control-clause headers is
//! resolved the conventional way: a bare identifier followed by `{` is only
//! a composite literal where composite literals are permitted.

use crate::ast::{
    Ast, BranchKind, ChanDir, DeclKeyword, FileEntry, LitKind, NodeId, NodeKind,
};
use crate::error::SyntaxError;
use crate::fileset::{FileSet, Pos};
use crate::scanner::{ScannedToken, Scanner};
use crate::token::{unquote, Token};

/// Result of parsing one file: the `File` node plus accumulated errors.
#[derive(Debug)]
pub struct ParsedFile {
    pub file: NodeId,
    pub errors: Vec<SyntaxError>,
}

/// Parse a single file into `ast`, registering it in `fset`.
pub fn parse_file(fset: &mut FileSet, ast: &mut Ast, name: &str, src: &str) -> ParsedFile {
    let fset_index = fset.add(name, src);
    let base = fset.file(fset_index).base();
    let (toks, scan_errors) = Scanner::new(src, base).scan_all();

    let mut p = Parser {
        ast,
        toks,
        i: 0,
        base,
        src_len: src.len(),
        prev_end: 0,
        errors: scan_errors,
        allow_composite: true,
    };
    let file = p.file(name);
    let errors = std::mem::take(&mut p.errors);

    ast.push_file(FileEntry {
        node: file,
        fset_index,
        name: name.to_string(),
        source: src.to_string(),
    });
    ParsedFile { file, errors }
}

struct Parser<'a> {
    ast: &'a mut Ast,
    toks: Vec<ScannedToken>,
    i: usize,
    base: u32,
    src_len: usize,
    /// File-local end offset of the previously consumed token.
    prev_end: usize,
    errors: Vec<SyntaxError>,
    /// Whether a bare type name followed by `{` starts a composite literal.
    allow_composite: bool,
}

/// Outcome of a simple-statement parse inside a `for` header.
enum SimpleStmt {
    Stmt(NodeId),
    RangeClause {
        key: Option<NodeId>,
        value: Option<NodeId>,
        define: bool,
        x: NodeId,
    },
}

impl<'a> Parser<'a> {
    // ------------------------------------------------------------------
    // Token plumbing
    // ------------------------------------------------------------------

    fn cur(&self) -> &ScannedToken {
        &self.toks[self.i]
    }

    fn tok(&self) -> Token {
        self.toks[self.i].tok
    }

    fn peek(&self) -> Token {
        self.toks
            .get(self.i + 1)
            .map(|t| t.tok)
            .unwrap_or(Token::Eof)
    }

    fn pos(&self) -> Pos {
        Pos(self.base + self.cur().offset as u32)
    }

    /// End position of the last consumed token.
    fn prev_end_pos(&self) -> Pos {
        Pos(self.base + self.prev_end as u32)
    }

    fn token_len(t: &ScannedToken) -> usize {
        match t.tok {
            Token::Eof => 0,
            Token::Semicolon if t.lit == "\n" => 0,
            _ if !t.lit.is_empty() => t.lit.len(),
            tok => tok.text().len(),
        }
    }

    fn advance(&mut self) {
        let t = self.cur();
        self.prev_end = t.offset + Self::token_len(t);
        if self.i + 1 < self.toks.len() {
            self.i += 1;
        }
    }

    fn got(&mut self, tok: Token) -> bool {
        if self.tok() == tok {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, tok: Token, context: &str) -> Pos {
        let p = self.pos();
        if self.tok() == tok {
            self.advance();
        } else {
            self.error_here(format!(
                "expected '{}' in {}, found '{}'",
                tok,
                context,
                self.tok()
            ));
        }
        p
    }

    /// Consume a statement terminator; closers terminate implicitly.
    fn expect_semi(&mut self) {
        match self.tok() {
            Token::Semicolon => self.advance(),
            Token::Rbrace | Token::Rparen | Token::Eof => {}
            other => {
                self.error_here(format!("expected ';', found '{}'", other));
                self.sync_stmt();
            }
        }
    }

    fn error_here(&mut self, message: String) {
        self.errors.push(SyntaxError::new(self.pos(), message));
    }

    /// Skip to the next statement boundary.
    fn sync_stmt(&mut self) {
        loop {
            match self.tok() {
                Token::Semicolon => {
                    self.advance();
                    return;
                }
                Token::Rbrace | Token::Eof | Token::Case | Token::Default => return,
                _ => self.advance(),
            }
        }
    }

    fn alloc(&mut self, kind: NodeKind, pos: Pos, end: Pos) -> NodeId {
        self.ast.alloc(kind, pos, end)
    }

    /// Placeholder node for unparsable expressions.
    fn bad_expr(&mut self) -> NodeId {
        let p = self.pos();
        self.alloc(NodeKind::Ident { name: String::new() }, p, p)
    }

    fn starts_type(&self) -> bool {
        matches!(
            self.tok(),
            Token::Ident
                | Token::Lparen
                | Token::Lbrack
                | Token::Mul
                | Token::Map
                | Token::Chan
                | Token::Arrow
                | Token::Func
                | Token::Struct
                | Token::Interface
        )
    }

    // ------------------------------------------------------------------
    // File and declarations
    // ------------------------------------------------------------------

    fn file(&mut self, name: &str) -> NodeId {
        let start = Pos(self.base);
        self.expect(Token::Package, "package clause");
        let package = self.ident();
        self.expect_semi();

        let mut decls = Vec::new();
        while self.tok() != Token::Eof {
            let before = self.i;
            match self.tok() {
                Token::Import | Token::Const | Token::Var | Token::Type => {
                    decls.push(self.gen_decl());
                }
                Token::Func => decls.push(self.func_decl()),
                Token::Semicolon => self.advance(),
                other => {
                    self.error_here(format!("expected declaration, found '{}'", other));
                    self.sync_stmt();
                }
            }
            if self.i == before {
                self.advance();
            }
        }
        self.alloc(
            NodeKind::File {
                name: name.to_string(),
                package,
                decls,
            },
            start,
            Pos(self.base + self.src_len as u32),
        )
    }

    fn ident(&mut self) -> NodeId {
        let pos = self.pos();
        if self.tok() == Token::Ident {
            let name = self.cur().lit.clone();
            self.advance();
            let end = self.prev_end_pos();
            self.alloc(NodeKind::Ident { name }, pos, end)
        } else {
            self.error_here(format!("expected identifier, found '{}'", self.tok()));
            self.alloc(NodeKind::Ident { name: String::new() }, pos, pos)
        }
    }

    fn gen_decl(&mut self) -> NodeId {
        let pos = self.pos();
        let keyword = match self.tok() {
            Token::Import => DeclKeyword::Import,
            Token::Const => DeclKeyword::Const,
            Token::Var => DeclKeyword::Var,
            _ => DeclKeyword::Type,
        };
        self.advance();

        let mut specs = Vec::new();
        if self.got(Token::Lparen) {
            while self.tok() != Token::Rparen && self.tok() != Token::Eof {
                let before = self.i;
                specs.push(self.spec(keyword));
                self.expect_semi();
                if self.i == before {
                    self.advance();
                }
            }
            self.expect(Token::Rparen, "declaration group");
        } else {
            specs.push(self.spec(keyword));
        }
        let end = self.prev_end_pos();
        let decl = self.alloc(NodeKind::GenDecl { keyword, specs }, pos, end);
        self.expect_semi();
        decl
    }

    fn spec(&mut self, keyword: DeclKeyword) -> NodeId {
        match keyword {
            DeclKeyword::Import => self.import_spec(),
            DeclKeyword::Type => self.type_spec(),
            DeclKeyword::Const | DeclKeyword::Var => self.value_spec(),
        }
    }

    fn import_spec(&mut self) -> NodeId {
        let pos = self.pos();
        let name = match self.tok() {
            Token::Ident => Some(self.ident()),
            Token::Period => {
                // Dot imports resolve like unnamed imports here.
                self.advance();
                None
            }
            _ => None,
        };
        let path = if self.tok() == Token::Str {
            let lit = self.cur().lit.clone();
            self.advance();
            unquote(&lit)
        } else {
            self.error_here("expected import path string".to_string());
            String::new()
        };
        let end = self.prev_end_pos();
        self.alloc(NodeKind::ImportSpec { name, path }, pos, end)
    }

    fn value_spec(&mut self) -> NodeId {
        let pos = self.pos();
        let mut names = vec![self.ident()];
        while self.got(Token::Comma) {
            names.push(self.ident());
        }
        let typ = if self.tok() != Token::Assign && self.starts_type() {
            Some(self.typ())
        } else {
            None
        };
        let mut values = Vec::new();
        if self.got(Token::Assign) {
            values = self.expr_list();
        }
        let end = self.prev_end_pos();
        self.alloc(NodeKind::ValueSpec { names, typ, values }, pos, end)
    }

    fn type_spec(&mut self) -> NodeId {
        let pos = self.pos();
        let name = self.ident();
        // `type A[T any] ...` vs `type A [N]int`: treat `[` as type
        // parameters when an identifier pair follows.
        let type_params = if self.tok() == Token::Lbrack
            && self.peek() == Token::Ident
            && self
                .toks
                .get(self.i + 2)
                .map(|t| {
                    matches!(
                        t.tok,
                        Token::Ident
                            | Token::Interface
                            | Token::Comma
                            | Token::Mul
                            | Token::Lbrack
                    )
                })
                .unwrap_or(false)
        {
            Some(self.bracketed_field_list())
        } else {
            None
        };
        let alias = self.got(Token::Assign);
        let typ = self.typ();
        let end = self.prev_end_pos();
        self.alloc(
            NodeKind::TypeSpec {
                name,
                type_params,
                alias,
                typ,
            },
            pos,
            end,
        )
    }

    fn func_decl(&mut self) -> NodeId {
        let pos = self.pos();
        self.advance(); // func
        let recv = if self.tok() == Token::Lparen {
            Some(self.paren_field_list())
        } else {
            None
        };
        let name = self.ident();
        let type_params = if self.tok() == Token::Lbrack {
            Some(self.bracketed_field_list())
        } else {
            None
        };
        let typ = self.func_type_tail(pos, type_params);
        let body = if self.tok() == Token::Lbrace {
            Some(self.block())
        } else {
            None
        };
        let end = self.prev_end_pos();
        let decl = self.alloc(
            NodeKind::FuncDecl {
                recv,
                name,
                typ,
                body,
            },
            pos,
            end,
        );
        self.expect_semi();
        decl
    }

    /// Parameters and results after the func keyword / name / type params.
    fn func_type_tail(&mut self, pos: Pos, type_params: Option<NodeId>) -> NodeId {
        let params = self.paren_field_list();
        let results = self.results();
        let end = self.prev_end_pos();
        self.alloc(
            NodeKind::FuncType {
                type_params,
                params,
                results,
            },
            pos,
            end,
        )
    }

    fn results(&mut self) -> Option<NodeId> {
        if self.tok() == Token::Lparen {
            Some(self.paren_field_list())
        } else if self.starts_type() {
            let pos = self.pos();
            let t = self.typ();
            let end = self.prev_end_pos();
            let field = self.alloc(
                NodeKind::Field {
                    names: Vec::new(),
                    typ: Some(t),
                    tag: None,
                },
                pos,
                end,
            );
            Some(self.alloc(NodeKind::FieldList { fields: vec![field] }, pos, end))
        } else {
            None
        }
    }

    // ------------------------------------------------------------------
    // Field lists
    // ------------------------------------------------------------------

    fn paren_field_list(&mut self) -> NodeId {
        self.field_list(Token::Lparen, Token::Rparen)
    }

    fn bracketed_field_list(&mut self) -> NodeId {
        self.field_list(Token::Lbrack, Token::Rbrack)
    }

    /// Parameter-style field list: handles `(T, U)`, `(a T, b U)`, and
    /// `(a, b T)` via the usual post-pass that folds bare leading
    /// identifiers into the following named group.
    fn field_list(&mut self, open: Token, close: Token) -> NodeId {
        let pos = self.pos();
        self.expect(open, "parameter list");
        let mut fields: Vec<NodeId> = Vec::new();
        while self.tok() != close && self.tok() != Token::Eof {
            let fpos = self.pos();
            if self.tok() == Token::Ellipsis {
                self.advance();
                let elt = if self.starts_type() {
                    Some(self.typ())
                } else {
                    None
                };
                let fend = self.prev_end_pos();
                let ell = self.alloc(NodeKind::EllipsisField { elt }, fpos, fend);
                let field = self.alloc(
                    NodeKind::Field {
                        names: Vec::new(),
                        typ: Some(ell),
                        tag: None,
                    },
                    fpos,
                    fend,
                );
                fields.push(field);
            } else if self.tok() == Token::Ident && self.peek() == Token::Lbrack {
                // `name [n]T`: the brackets open an array type here, not a
                // type-argument list.
                let name = self.ident();
                let typ = self.typ();
                let fend = self.prev_end_pos();
                let field = self.alloc(
                    NodeKind::Field {
                        names: vec![name],
                        typ: Some(typ),
                        tag: None,
                    },
                    fpos,
                    fend,
                );
                fields.push(field);
            } else {
                let first = self.typ();
                let field = if self.starts_type() || self.tok() == Token::Ellipsis {
                    // `first` was a name.
                    let typ = if self.tok() == Token::Ellipsis {
                        let epos = self.pos();
                        self.advance();
                        let elt = Some(self.typ());
                        let eend = self.prev_end_pos();
                        self.alloc(NodeKind::EllipsisField { elt }, epos, eend)
                    } else {
                        self.typ()
                    };
                    let fend = self.prev_end_pos();
                    self.alloc(
                        NodeKind::Field {
                            names: vec![first],
                            typ: Some(typ),
                            tag: None,
                        },
                        fpos,
                        fend,
                    )
                } else {
                    let fend = self.prev_end_pos();
                    self.alloc(
                        NodeKind::Field {
                            names: Vec::new(),
                            typ: Some(first),
                            tag: None,
                        },
                        fpos,
                        fend,
                    )
                };
                fields.push(field);
            }
            if !self.got(Token::Comma) {
                break;
            }
        }
        self.expect(close, "parameter list");
        let end = self.prev_end_pos();

        self.fold_param_names(&mut fields);
        self.alloc(NodeKind::FieldList { fields }, pos, end)
    }

    /// Fold `(a, b T)`: unnamed bare-identifier fields immediately before a
    /// named field become extra names of that field.
    fn fold_param_names(&mut self, fields: &mut Vec<NodeId>) {
        let any_named = fields.iter().any(|&f| {
            matches!(self.ast.kind(f), NodeKind::Field { names, .. } if !names.is_empty())
        });
        if !any_named {
            return;
        }
        let mut folded: Vec<NodeId> = Vec::with_capacity(fields.len());
        let mut pending: Vec<NodeId> = Vec::new();
        for &f in fields.iter() {
            let (names, typ) = match self.ast.kind(f) {
                NodeKind::Field { names, typ, .. } => (names.clone(), *typ),
                _ => (Vec::new(), None),
            };
            let bare_ident = names.is_empty()
                && typ.is_some_and(|t| matches!(self.ast.kind(t), NodeKind::Ident { .. }));
            if bare_ident {
                pending.push(typ.unwrap());
            } else if !names.is_empty() && !pending.is_empty() {
                let mut all = std::mem::take(&mut pending);
                all.extend(names);
                let pos = self.ast.pos(all[0]);
                let end = self.ast.end(f);
                let merged = self.alloc(
                    NodeKind::Field {
                        names: all,
                        typ,
                        tag: None,
                    },
                    pos,
                    end,
                );
                folded.push(merged);
            } else {
                folded.push(f);
            }
        }
        // Trailing bare identifiers stay as unnamed type fields.
        for t in pending {
            let pos = self.ast.pos(t);
            let end = self.ast.end(t);
            let f = self.alloc(
                NodeKind::Field {
                    names: Vec::new(),
                    typ: Some(t),
                    tag: None,
                },
                pos,
                end,
            );
            folded.push(f);
        }
        *fields = folded;
    }

    // ------------------------------------------------------------------
    // Types
    // ------------------------------------------------------------------

    fn typ(&mut self) -> NodeId {
        let pos = self.pos();
        match self.tok() {
            Token::Ident => {
                let mut x = self.ident();
                if self.got(Token::Period) {
                    let sel = self.ident();
                    let end = self.prev_end_pos();
                    x = self.alloc(NodeKind::SelectorExpr { x, sel }, pos, end);
                }
                if self.tok() == Token::Lbrack && self.peek() != Token::Rbrack {
                    // Generic instantiation: N[A, B].
                    self.advance();
                    let mut indices = vec![self.typ()];
                    while self.got(Token::Comma) {
                        indices.push(self.typ());
                    }
                    self.expect(Token::Rbrack, "type arguments");
                    let end = self.prev_end_pos();
                    x = self.alloc(NodeKind::IndexExpr { x, indices }, pos, end);
                }
                x
            }
            Token::Lparen => {
                self.advance();
                let x = self.typ();
                self.expect(Token::Rparen, "parenthesized type");
                let end = self.prev_end_pos();
                self.alloc(NodeKind::ParenExpr { x }, pos, end)
            }
            Token::Mul => {
                self.advance();
                let x = self.typ();
                let end = self.prev_end_pos();
                self.alloc(NodeKind::StarExpr { x }, pos, end)
            }
            Token::Lbrack => {
                self.advance();
                if self.got(Token::Rbrack) {
                    let elt = self.typ();
                    let end = self.prev_end_pos();
                    self.alloc(NodeKind::ArrayType { len: None, elt }, pos, end)
                } else if self.got(Token::Ellipsis) {
                    self.expect(Token::Rbrack, "array type");
                    let elt = self.typ();
                    let end = self.prev_end_pos();
                    self.alloc(NodeKind::ArrayType { len: None, elt }, pos, end)
                } else {
                    let len = self.expr();
                    self.expect(Token::Rbrack, "array type");
                    let elt = self.typ();
                    let end = self.prev_end_pos();
                    self.alloc(
                        NodeKind::ArrayType {
                            len: Some(len),
                            elt,
                        },
                        pos,
                        end,
                    )
                }
            }
            Token::Map => {
                self.advance();
                self.expect(Token::Lbrack, "map type");
                let key = self.typ();
                self.expect(Token::Rbrack, "map type");
                let value = self.typ();
                let end = self.prev_end_pos();
                self.alloc(NodeKind::MapType { key, value }, pos, end)
            }
            Token::Chan => {
                self.advance();
                let dir = if self.got(Token::Arrow) {
                    ChanDir::Send
                } else {
                    ChanDir::Both
                };
                let value = self.typ();
                let end = self.prev_end_pos();
                self.alloc(NodeKind::ChanType { dir, value }, pos, end)
            }
            Token::Arrow => {
                self.advance();
                self.expect(Token::Chan, "channel type");
                let value = self.typ();
                let end = self.prev_end_pos();
                self.alloc(
                    NodeKind::ChanType {
                        dir: ChanDir::Recv,
                        value,
                    },
                    pos,
                    end,
                )
            }
            Token::Func => {
                self.advance();
                self.func_type_tail(pos, None)
            }
            Token::Struct => self.struct_type(),
            Token::Interface => self.interface_type(),
            other => {
                self.error_here(format!("expected type, found '{}'", other));
                self.bad_expr()
            }
        }
    }

    fn struct_type(&mut self) -> NodeId {
        let pos = self.pos();
        self.advance(); // struct
        let lpos = self.pos();
        self.expect(Token::Lbrace, "struct type");
        let mut fields = Vec::new();
        while self.tok() != Token::Rbrace && self.tok() != Token::Eof {
            let before = self.i;
            fields.push(self.struct_field());
            if self.tok() == Token::Semicolon {
                self.advance();
            }
            if self.i == before {
                self.advance();
            }
        }
        self.expect(Token::Rbrace, "struct type");
        let end = self.prev_end_pos();
        let list = self.alloc(NodeKind::FieldList { fields }, lpos, end);
        self.alloc(NodeKind::StructType { fields: list }, pos, end)
    }

    fn struct_field(&mut self) -> NodeId {
        let pos = self.pos();
        if self.tok() == Token::Mul {
            // Embedded pointer type.
            let t = self.typ();
            let tag = self.field_tag();
            let end = self.prev_end_pos();
            return self.alloc(
                NodeKind::Field {
                    names: Vec::new(),
                    typ: Some(t),
                    tag,
                },
                pos,
                end,
            );
        }
        if self.tok() == Token::Ident && self.peek() == Token::Lbrack {
            // `name [n]T` field: brackets open an array type.
            let name = self.ident();
            let typ = self.typ();
            let tag = self.field_tag();
            let end = self.prev_end_pos();
            return self.alloc(
                NodeKind::Field {
                    names: vec![name],
                    typ: Some(typ),
                    tag,
                },
                pos,
                end,
            );
        }
        let first = self.typ();
        match self.tok() {
            Token::Semicolon | Token::Rbrace | Token::Str => {
                // Embedded field.
                let tag = self.field_tag();
                let end = self.prev_end_pos();
                self.alloc(
                    NodeKind::Field {
                        names: Vec::new(),
                        typ: Some(first),
                        tag,
                    },
                    pos,
                    end,
                )
            }
            _ => {
                let mut names = vec![first];
                while self.got(Token::Comma) {
                    names.push(self.ident());
                }
                let typ = self.typ();
                let tag = self.field_tag();
                let end = self.prev_end_pos();
                self.alloc(
                    NodeKind::Field {
                        names,
                        typ: Some(typ),
                        tag,
                    },
                    pos,
                    end,
                )
            }
        }
    }

    fn field_tag(&mut self) -> Option<String> {
        if self.tok() == Token::Str {
            let lit = self.cur().lit.clone();
            self.advance();
            Some(unquote(&lit))
        } else {
            None
        }
    }

    fn interface_type(&mut self) -> NodeId {
        let pos = self.pos();
        self.advance(); // interface
        let lpos = self.pos();
        self.expect(Token::Lbrace, "interface type");
        let mut fields = Vec::new();
        while self.tok() != Token::Rbrace && self.tok() != Token::Eof {
            let before = self.i;
            let fpos = self.pos();
            if self.tok() == Token::Ident && self.peek() == Token::Lparen {
                // Method: Name(params) results.
                let name = self.ident();
                let typ = self.func_type_tail(fpos, None);
                let end = self.prev_end_pos();
                let f = self.alloc(
                    NodeKind::Field {
                        names: vec![name],
                        typ: Some(typ),
                        tag: None,
                    },
                    fpos,
                    end,
                );
                fields.push(f);
            } else {
                // Embedded interface or constraint element; unions are
                // accepted but only the first term is retained.
                let t = self.typ();
                while self.got(Token::Or) {
                    let _ = self.typ();
                }
                let end = self.prev_end_pos();
                let f = self.alloc(
                    NodeKind::Field {
                        names: Vec::new(),
                        typ: Some(t),
                        tag: None,
                    },
                    fpos,
                    end,
                );
                fields.push(f);
            }
            if self.tok() == Token::Semicolon {
                self.advance();
            }
            if self.i == before {
                self.advance();
            }
        }
        self.expect(Token::Rbrace, "interface type");
        let end = self.prev_end_pos();
        let list = self.alloc(NodeKind::FieldList { fields }, lpos, end);
        self.alloc(NodeKind::InterfaceType { methods: list }, pos, end)
    }

    // ------------------------------------------------------------------
    // Statements
    // ------------------------------------------------------------------

    fn block(&mut self) -> NodeId {
        let pos = self.pos();
        self.expect(Token::Lbrace, "block");
        let saved = self.allow_composite;
        self.allow_composite = true;
        let stmts = self.stmt_list(Token::Rbrace);
        self.allow_composite = saved;
        self.expect(Token::Rbrace, "block");
        let end = self.prev_end_pos();
        self.alloc(NodeKind::BlockStmt { stmts }, pos, end)
    }

    fn stmt_list(&mut self, close: Token) -> Vec<NodeId> {
        let mut stmts = Vec::new();
        loop {
            while self.tok() == Token::Semicolon {
                self.advance();
            }
            if self.tok() == close
                || self.tok() == Token::Eof
                || self.tok() == Token::Case
                || self.tok() == Token::Default
            {
                break;
            }
            let before = self.i;
            stmts.push(self.stmt());
            match self.tok() {
                Token::Semicolon => self.advance(),
                t if t == close || matches!(t, Token::Case | Token::Default | Token::Eof) => {}
                _ => {
                    self.error_here(format!("expected ';', found '{}'", self.tok()));
                    self.sync_stmt();
                }
            }
            if self.i == before {
                self.advance();
            }
        }
        stmts
    }

    fn stmt(&mut self) -> NodeId {
        let pos = self.pos();
        match self.tok() {
            Token::Const | Token::Var | Token::Type => {
                let decl = self.gen_decl_no_semi();
                let end = self.prev_end_pos();
                self.alloc(NodeKind::DeclStmt { decl }, pos, end)
            }
            Token::If => self.if_stmt(),
            Token::For => self.for_stmt(),
            Token::Switch => self.switch_stmt(),
            Token::Select => self.select_stmt(),
            Token::Go => {
                self.advance();
                let call = self.expr();
                if !matches!(self.ast.kind(self.ast.unparen(call)), NodeKind::CallExpr { .. }) {
                    self.error_here("expression in go must be function call".to_string());
                }
                let end = self.prev_end_pos();
                self.alloc(NodeKind::GoStmt { call }, pos, end)
            }
            Token::Defer => {
                self.advance();
                let call = self.expr();
                if !matches!(self.ast.kind(self.ast.unparen(call)), NodeKind::CallExpr { .. }) {
                    self.error_here("expression in defer must be function call".to_string());
                }
                let end = self.prev_end_pos();
                self.alloc(NodeKind::DeferStmt { call }, pos, end)
            }
            Token::Return => {
                self.advance();
                let results = if !matches!(
                    self.tok(),
                    Token::Semicolon | Token::Rbrace | Token::Case | Token::Default | Token::Eof
                ) {
                    self.expr_list()
                } else {
                    Vec::new()
                };
                let end = self.prev_end_pos();
                self.alloc(NodeKind::ReturnStmt { results }, pos, end)
            }
            Token::Break | Token::Continue | Token::Goto | Token::Fallthrough => {
                let keyword = match self.tok() {
                    Token::Break => BranchKind::Break,
                    Token::Continue => BranchKind::Continue,
                    Token::Goto => BranchKind::Goto,
                    _ => BranchKind::Fallthrough,
                };
                self.advance();
                let label = if self.tok() == Token::Ident && keyword != BranchKind::Fallthrough {
                    Some(self.ident())
                } else {
                    None
                };
                let end = self.prev_end_pos();
                self.alloc(NodeKind::BranchStmt { keyword, label }, pos, end)
            }
            Token::Lbrace => self.block(),
            Token::Semicolon => {
                let end = self.pos();
                self.alloc(NodeKind::EmptyStmt, pos, end)
            }
            Token::Ident if self.peek() == Token::Colon => {
                let label = self.ident();
                self.expect(Token::Colon, "labeled statement");
                let stmt = self.stmt();
                let end = self.prev_end_pos();
                self.alloc(NodeKind::LabeledStmt { label, stmt }, pos, end)
            }
            _ => match self.simple_stmt(false) {
                SimpleStmt::Stmt(s) => s,
                SimpleStmt::RangeClause { .. } => unreachable!("range outside for header"),
            },
        }
    }

    /// Like [`Parser::gen_decl`] but without the trailing semicolon, for use
    /// inside statement lists.
    fn gen_decl_no_semi(&mut self) -> NodeId {
        let pos = self.pos();
        let keyword = match self.tok() {
            Token::Const => DeclKeyword::Const,
            Token::Var => DeclKeyword::Var,
            _ => DeclKeyword::Type,
        };
        self.advance();
        let mut specs = Vec::new();
        if self.got(Token::Lparen) {
            while self.tok() != Token::Rparen && self.tok() != Token::Eof {
                let before = self.i;
                specs.push(self.spec(keyword));
                if self.tok() == Token::Semicolon {
                    self.advance();
                }
                if self.i == before {
                    self.advance();
                }
            }
            self.expect(Token::Rparen, "declaration group");
        } else {
            specs.push(self.spec(keyword));
        }
        let end = self.prev_end_pos();
        self.alloc(NodeKind::GenDecl { keyword, specs }, pos, end)
    }

    fn simple_stmt(&mut self, allow_range: bool) -> SimpleStmt {
        let pos = self.pos();
        let lhs = self.expr_list();
        match self.tok() {
            Token::Define
            | Token::Assign
            | Token::AddAssign
            | Token::SubAssign
            | Token::MulAssign
            | Token::QuoAssign
            | Token::RemAssign
            | Token::AndAssign
            | Token::OrAssign
            | Token::XorAssign
            | Token::ShlAssign
            | Token::ShrAssign
            | Token::AndNotAssign => {
                let op = self.tok();
                self.advance();
                if allow_range && self.tok() == Token::Range {
                    self.advance();
                    let x = self.expr();
                    let mut it = lhs.into_iter();
                    return SimpleStmt::RangeClause {
                        key: it.next(),
                        value: it.next(),
                        define: op == Token::Define,
                        x,
                    };
                }
                let rhs = self.expr_list();
                let end = self.prev_end_pos();
                SimpleStmt::Stmt(self.alloc(NodeKind::AssignStmt { lhs, op, rhs }, pos, end))
            }
            Token::Arrow => {
                self.advance();
                let value = self.expr();
                let end = self.prev_end_pos();
                let chan = lhs[0];
                SimpleStmt::Stmt(self.alloc(NodeKind::SendStmt { chan, value }, pos, end))
            }
            Token::Inc | Token::Dec => {
                let inc = self.tok() == Token::Inc;
                self.advance();
                let end = self.prev_end_pos();
                let x = lhs[0];
                SimpleStmt::Stmt(self.alloc(NodeKind::IncDecStmt { x, inc }, pos, end))
            }
            _ => {
                if lhs.len() > 1 {
                    self.error_here("expected assignment after expression list".to_string());
                }
                let x = lhs[0];
                let end = self.prev_end_pos();
                SimpleStmt::Stmt(self.alloc(NodeKind::ExprStmt { x }, pos, end))
            }
        }
    }

    fn if_stmt(&mut self) -> NodeId {
        let pos = self.pos();
        self.advance(); // if
        let saved = self.allow_composite;
        self.allow_composite = false;

        let mut init = None;
        let cond;
        match self.simple_stmt(false) {
            SimpleStmt::Stmt(s) => {
                if self.got(Token::Semicolon) {
                    init = Some(s);
                    cond = self.expr();
                } else {
                    cond = self.expr_of_stmt(s);
                }
            }
            SimpleStmt::RangeClause { .. } => unreachable!(),
        }
        self.allow_composite = saved;

        let body = self.block();
        let els = if self.got(Token::Else) {
            Some(if self.tok() == Token::If {
                self.if_stmt()
            } else {
                self.block()
            })
        } else {
            None
        };
        let end = self.prev_end_pos();
        self.alloc(
            NodeKind::IfStmt {
                init,
                cond,
                body,
                els,
            },
            pos,
            end,
        )
    }

    /// Extract the expression of an `ExprStmt`, diagnosing other shapes.
    fn expr_of_stmt(&mut self, s: NodeId) -> NodeId {
        match self.ast.kind(s) {
            NodeKind::ExprStmt { x } => *x,
            _ => {
                self.errors.push(SyntaxError::new(
                    self.ast.pos(s),
                    "expected expression, found statement".to_string(),
                ));
                s
            }
        }
    }

    fn for_stmt(&mut self) -> NodeId {
        let pos = self.pos();
        self.advance(); // for
        let saved = self.allow_composite;
        self.allow_composite = false;

        if self.tok() == Token::Lbrace {
            self.allow_composite = saved;
            let body = self.block();
            let end = self.prev_end_pos();
            return self.alloc(
                NodeKind::ForStmt {
                    init: None,
                    cond: None,
                    post: None,
                    body,
                },
                pos,
                end,
            );
        }

        if self.got(Token::Range) {
            let x = self.expr();
            self.allow_composite = saved;
            let body = self.block();
            let end = self.prev_end_pos();
            return self.alloc(
                NodeKind::RangeStmt {
                    key: None,
                    value: None,
                    define: false,
                    x,
                    body,
                },
                pos,
                end,
            );
        }

        // Either `for cond {`, `for init; cond; post {`, or a range clause.
        let first = if self.tok() == Token::Semicolon {
            None
        } else {
            Some(self.simple_stmt(true))
        };

        if let Some(SimpleStmt::RangeClause {
            key,
            value,
            define,
            x,
        }) = first
        {
            self.allow_composite = saved;
            let body = self.block();
            let end = self.prev_end_pos();
            return self.alloc(
                NodeKind::RangeStmt {
                    key,
                    value,
                    define,
                    x,
                    body,
                },
                pos,
                end,
            );
        }
        let first = first.map(|s| match s {
            SimpleStmt::Stmt(s) => s,
            SimpleStmt::RangeClause { .. } => unreachable!(),
        });

        if self.tok() == Token::Semicolon {
            self.advance();
            let cond = if self.tok() != Token::Semicolon {
                Some(self.expr())
            } else {
                None
            };
            self.expect(Token::Semicolon, "for clause");
            let post = if self.tok() != Token::Lbrace {
                match self.simple_stmt(false) {
                    SimpleStmt::Stmt(s) => Some(s),
                    SimpleStmt::RangeClause { .. } => unreachable!(),
                }
            } else {
                None
            };
            self.allow_composite = saved;
            let body = self.block();
            let end = self.prev_end_pos();
            self.alloc(
                NodeKind::ForStmt {
                    init: first,
                    cond,
                    post,
                    body,
                },
                pos,
                end,
            )
        } else {
            let cond = first.map(|s| self.expr_of_stmt(s));
            self.allow_composite = saved;
            let body = self.block();
            let end = self.prev_end_pos();
            self.alloc(
                NodeKind::ForStmt {
                    init: None,
                    cond,
                    post: None,
                    body,
                },
                pos,
                end,
            )
        }
    }

    fn switch_stmt(&mut self) -> NodeId {
        let pos = self.pos();
        self.advance(); // switch
        let saved = self.allow_composite;
        self.allow_composite = false;

        let mut init = None;
        let mut tag_stmt = None;
        if self.tok() != Token::Lbrace {
            let s = match self.simple_stmt(false) {
                SimpleStmt::Stmt(s) => s,
                SimpleStmt::RangeClause { .. } => unreachable!(),
            };
            if self.got(Token::Semicolon) {
                init = Some(s);
                if self.tok() != Token::Lbrace {
                    tag_stmt = Some(match self.simple_stmt(false) {
                        SimpleStmt::Stmt(s) => s,
                        SimpleStmt::RangeClause { .. } => unreachable!(),
                    });
                }
            } else {
                tag_stmt = Some(s);
            }
        }
        self.allow_composite = saved;

        let is_type_switch = tag_stmt.is_some_and(|s| self.is_type_switch_guard(s));
        let body = self.case_body();
        let end = self.prev_end_pos();

        if is_type_switch {
            self.alloc(
                NodeKind::TypeSwitchStmt {
                    init,
                    assign: tag_stmt.unwrap(),
                    body,
                },
                pos,
                end,
            )
        } else {
            let tag = tag_stmt.map(|s| self.expr_of_stmt(s));
            self.alloc(NodeKind::SwitchStmt { init, tag, body }, pos, end)
        }
    }

    /// `x := y.(type)` or `y.(type)`.
    fn is_type_switch_guard(&self, s: NodeId) -> bool {
        let expr = match self.ast.kind(s) {
            NodeKind::ExprStmt { x } => Some(*x),
            NodeKind::AssignStmt { rhs, .. } if rhs.len() == 1 => Some(rhs[0]),
            _ => None,
        };
        expr.is_some_and(|e| {
            matches!(
                self.ast.kind(self.ast.unparen(e)),
                NodeKind::TypeAssertExpr { typ: None, .. }
            )
        })
    }

    /// `{ case ...: stmts ... }` shared by switch variants.
    fn case_body(&mut self) -> NodeId {
        let pos = self.pos();
        self.expect(Token::Lbrace, "switch body");
        let saved = self.allow_composite;
        self.allow_composite = true;
        let mut clauses = Vec::new();
        while matches!(self.tok(), Token::Case | Token::Default) {
            let cpos = self.pos();
            let values = if self.got(Token::Case) {
                self.expr_list()
            } else {
                self.advance(); // default
                Vec::new()
            };
            self.expect(Token::Colon, "case clause");
            let body = self.stmt_list(Token::Rbrace);
            let cend = self.prev_end_pos();
            clauses.push(self.alloc(NodeKind::CaseClause { values, body }, cpos, cend));
        }
        self.allow_composite = saved;
        self.expect(Token::Rbrace, "switch body");
        let end = self.prev_end_pos();
        self.alloc(NodeKind::BlockStmt { stmts: clauses }, pos, end)
    }

    fn select_stmt(&mut self) -> NodeId {
        let pos = self.pos();
        self.advance(); // select
        let bpos = self.pos();
        self.expect(Token::Lbrace, "select body");
        let mut clauses = Vec::new();
        while matches!(self.tok(), Token::Case | Token::Default) {
            let cpos = self.pos();
            let comm = if self.got(Token::Case) {
                Some(match self.simple_stmt(false) {
                    SimpleStmt::Stmt(s) => s,
                    SimpleStmt::RangeClause { .. } => unreachable!(),
                })
            } else {
                self.advance(); // default
                None
            };
            self.expect(Token::Colon, "select clause");
            let body = self.stmt_list(Token::Rbrace);
            let cend = self.prev_end_pos();
            clauses.push(self.alloc(NodeKind::CommClause { comm, body }, cpos, cend));
        }
        self.expect(Token::Rbrace, "select body");
        let end = self.prev_end_pos();
        let body = self.alloc(NodeKind::BlockStmt { stmts: clauses }, bpos, end);
        self.alloc(NodeKind::SelectStmt { body }, pos, end)
    }

    // ------------------------------------------------------------------
    // Expressions
    // ------------------------------------------------------------------

    fn expr_list(&mut self) -> Vec<NodeId> {
        let mut list = vec![self.expr()];
        while self.got(Token::Comma) {
            list.push(self.expr());
        }
        list
    }

    fn expr(&mut self) -> NodeId {
        self.binary_expr(1)
    }

    fn binary_expr(&mut self, min_prec: u8) -> NodeId {
        let pos = self.pos();
        let mut x = self.unary_expr();
        loop {
            let prec = self.tok().precedence();
            if prec < min_prec || prec == 0 {
                return x;
            }
            let op = self.tok();
            self.advance();
            let y = self.binary_expr(prec + 1);
            let end = self.prev_end_pos();
            x = self.alloc(NodeKind::BinaryExpr { op, x, y }, pos, end);
        }
    }

    fn unary_expr(&mut self) -> NodeId {
        let pos = self.pos();
        match self.tok() {
            Token::Add | Token::Sub | Token::Not | Token::Xor | Token::And | Token::Arrow => {
                let op = self.tok();
                self.advance();
                let x = self.unary_expr();
                let end = self.prev_end_pos();
                self.alloc(NodeKind::UnaryExpr { op, x }, pos, end)
            }
            Token::Mul => {
                self.advance();
                let x = self.unary_expr();
                let end = self.prev_end_pos();
                self.alloc(NodeKind::StarExpr { x }, pos, end)
            }
            _ => self.primary_expr(),
        }
    }

    fn primary_expr(&mut self) -> NodeId {
        let pos = self.pos();
        let mut x = self.operand();
        loop {
            match self.tok() {
                Token::Period => {
                    self.advance();
                    if self.got(Token::Lparen) {
                        // Type assertion: x.(T) or x.(type).
                        let typ = if self.got(Token::Type) {
                            None
                        } else {
                            Some(self.typ())
                        };
                        self.expect(Token::Rparen, "type assertion");
                        let end = self.prev_end_pos();
                        x = self.alloc(NodeKind::TypeAssertExpr { x, typ }, pos, end);
                    } else {
                        let sel = self.ident();
                        let end = self.prev_end_pos();
                        x = self.alloc(NodeKind::SelectorExpr { x, sel }, pos, end);
                    }
                }
                Token::Lparen => {
                    self.advance();
                    let saved = self.allow_composite;
                    self.allow_composite = true;
                    let mut args = Vec::new();
                    let mut has_ellipsis = false;
                    while self.tok() != Token::Rparen && self.tok() != Token::Eof {
                        args.push(self.expr());
                        if self.got(Token::Ellipsis) {
                            has_ellipsis = true;
                        }
                        if !self.got(Token::Comma) {
                            break;
                        }
                    }
                    self.allow_composite = saved;
                    self.expect(Token::Rparen, "argument list");
                    let end = self.prev_end_pos();
                    x = self.alloc(
                        NodeKind::CallExpr {
                            fun: x,
                            args,
                            has_ellipsis,
                        },
                        pos,
                        end,
                    );
                }
                Token::Lbrack => {
                    self.advance();
                    let saved = self.allow_composite;
                    self.allow_composite = true;
                    if self.tok() == Token::Colon {
                        // x[:...]
                        self.advance();
                        x = self.slice_tail(pos, x, None);
                    } else {
                        let first = self.expr();
                        if self.got(Token::Colon) {
                            x = self.slice_tail(pos, x, Some(first));
                        } else {
                            let mut indices = vec![first];
                            while self.got(Token::Comma) {
                                indices.push(self.expr());
                            }
                            self.expect(Token::Rbrack, "index expression");
                            let end = self.prev_end_pos();
                            x = self.alloc(NodeKind::IndexExpr { x, indices }, pos, end);
                        }
                    }
                    self.allow_composite = saved;
                }
                Token::Lbrace => {
                    // Composite literal over a named type, when permitted.
                    let is_type_name = matches!(
                        self.ast.kind(x),
                        NodeKind::Ident { .. }
                            | NodeKind::SelectorExpr { .. }
                            | NodeKind::IndexExpr { .. }
                    );
                    if !(self.allow_composite && is_type_name) {
                        return x;
                    }
                    let elts = self.composite_body();
                    let end = self.prev_end_pos();
                    x = self.alloc(
                        NodeKind::CompositeLit {
                            typ: Some(x),
                            elts,
                        },
                        pos,
                        end,
                    );
                }
                _ => return x,
            }
        }
    }

    fn slice_tail(&mut self, pos: Pos, x: NodeId, low: Option<NodeId>) -> NodeId {
        let high = if !matches!(self.tok(), Token::Rbrack | Token::Colon) {
            Some(self.expr())
        } else {
            None
        };
        let max = if self.got(Token::Colon) {
            Some(self.expr())
        } else {
            None
        };
        self.expect(Token::Rbrack, "slice expression");
        let end = self.prev_end_pos();
        self.alloc(NodeKind::SliceExpr { x, low, high, max }, pos, end)
    }

    fn operand(&mut self) -> NodeId {
        let pos = self.pos();
        match self.tok() {
            Token::Ident => self.ident(),
            Token::Int | Token::Float | Token::Imag | Token::Char | Token::Str => {
                let lit = match self.tok() {
                    Token::Int => LitKind::Int,
                    Token::Float => LitKind::Float,
                    Token::Imag => LitKind::Imag,
                    Token::Char => LitKind::Char,
                    _ => LitKind::Str,
                };
                let value = self.cur().lit.clone();
                self.advance();
                let end = self.prev_end_pos();
                self.alloc(NodeKind::BasicLit { lit, value }, pos, end)
            }
            Token::Lparen => {
                self.advance();
                let saved = self.allow_composite;
                self.allow_composite = true;
                let x = self.expr();
                self.allow_composite = saved;
                self.expect(Token::Rparen, "parenthesized expression");
                let end = self.prev_end_pos();
                self.alloc(NodeKind::ParenExpr { x }, pos, end)
            }
            Token::Func => {
                self.advance();
                let typ = self.func_type_tail(pos, None);
                if self.tok() == Token::Lbrace {
                    let saved = self.allow_composite;
                    self.allow_composite = true;
                    let body = self.block();
                    self.allow_composite = saved;
                    let end = self.prev_end_pos();
                    self.alloc(NodeKind::FuncLit { typ, body }, pos, end)
                } else {
                    typ
                }
            }
            Token::Lbrack | Token::Map | Token::Chan | Token::Struct | Token::Interface => {
                // Literal type: []T{...}, map[K]V{...}, struct{...}{...}.
                let t = self.typ();
                if self.tok() == Token::Lbrace {
                    let elts = self.composite_body();
                    let end = self.prev_end_pos();
                    self.alloc(
                        NodeKind::CompositeLit {
                            typ: Some(t),
                            elts,
                        },
                        pos,
                        end,
                    )
                } else {
                    t
                }
            }
            other => {
                self.error_here(format!("expected operand, found '{}'", other));
                self.advance();
                self.bad_expr()
            }
        }
    }

    fn composite_body(&mut self) -> Vec<NodeId> {
        self.expect(Token::Lbrace, "composite literal");
        let saved = self.allow_composite;
        self.allow_composite = true;
        let mut elts = Vec::new();
        while self.tok() != Token::Rbrace && self.tok() != Token::Eof {
            let before = self.i;
            elts.push(self.composite_elt());
            if !self.got(Token::Comma) {
                // A newline-inserted semicolon may stand in for the comma
                // before the closing brace.
                if self.tok() == Token::Semicolon {
                    self.advance();
                }
                if self.tok() != Token::Rbrace {
                    break;
                }
            }
            if self.i == before {
                self.advance();
            }
        }
        self.allow_composite = saved;
        self.expect(Token::Rbrace, "composite literal");
        elts
    }

    fn composite_elt(&mut self) -> NodeId {
        let pos = self.pos();
        let value = self.composite_value();
        if self.got(Token::Colon) {
            let v = self.composite_value();
            let end = self.prev_end_pos();
            self.alloc(
                NodeKind::KeyValueExpr {
                    key: value,
                    value: v,
                },
                pos,
                end,
            )
        } else {
            value
        }
    }

    fn composite_value(&mut self) -> NodeId {
        if self.tok() == Token::Lbrace {
            // Nested literal with elided element type.
            let pos = self.pos();
            let elts = self.composite_body();
            let end = self.prev_end_pos();
            self.alloc(NodeKind::CompositeLit { typ: None, elts }, pos, end)
        } else {
            self.expr()
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
