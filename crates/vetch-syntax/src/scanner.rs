//! Scanner: Go source text to a token stream.
//!
//! Follows the reference language scanner closely: UTF-8 aware identifiers,
//! the full numeric literal grammar (binary/octal/hex, underscores, floats,
//! imaginary suffix), interpreted/raw strings, rune literals, and automatic
//! semicolon insertion at newlines after terminating tokens.
//!
//! Comments are skipped but do participate in semicolon insertion: a line
//! comment terminates its line, and a general comment spanning a newline
//! acts as a newline.

use crate::error::SyntaxError;
use crate::fileset::Pos;
use crate::token::Token;

/// One scanned token: file-local byte offset, kind, and literal text for
/// literal tokens (empty otherwise, except inserted semicolons which carry
/// `"\n"`).
#[derive(Debug, Clone)]
pub struct ScannedToken {
    pub offset: usize,
    pub tok: Token,
    pub lit: String,
}

/// Scanner state over a single file's source.
pub struct Scanner<'src> {
    src: &'src str,
    offset: usize,
    /// Pending semicolon insertion if a newline is reached.
    insert_semi: bool,
    /// File base, used only to produce error positions.
    base: u32,
    errors: Vec<SyntaxError>,
}

impl<'src> Scanner<'src> {
    /// Create a scanner for `src`. `base` is the owning file's base offset
    /// in the file set, used to position scan errors.
    pub fn new(src: &'src str, base: u32) -> Self {
        Scanner {
            src,
            offset: 0,
            insert_semi: false,
            base,
            errors: Vec::new(),
        }
    }

    /// Scan the entire source. The returned stream always ends with an
    /// explicit `Eof` token (preceded by an inserted semicolon if needed).
    pub fn scan_all(mut self) -> (Vec<ScannedToken>, Vec<SyntaxError>) {
        let mut out = Vec::with_capacity(self.src.len() / 4 + 8);
        loop {
            let t = self.next_token();
            let is_eof = t.tok == Token::Eof;
            out.push(t);
            if is_eof {
                break;
            }
        }
        (out, self.errors)
    }

    fn error(&mut self, offset: usize, message: impl Into<String>) {
        self.errors.push(SyntaxError {
            pos: Pos(self.base + offset as u32),
            message: message.into(),
        });
    }

    fn peek_char(&self) -> Option<char> {
        self.src[self.offset..].chars().next()
    }

    fn peek_char2(&self) -> Option<char> {
        let mut it = self.src[self.offset..].chars();
        it.next();
        it.next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek_char()?;
        self.offset += c.len_utf8();
        Some(c)
    }

    fn eat(&mut self, c: char) -> bool {
        if self.peek_char() == Some(c) {
            self.offset += c.len_utf8();
            true
        } else {
            false
        }
    }

    /// Skip whitespace and comments. Returns `true` if a semicolon should be
    /// inserted (newline crossed while `insert_semi` was set).
    fn skip_trivia(&mut self) -> Option<usize> {
        loop {
            match self.peek_char() {
                Some(' ') | Some('\t') | Some('\r') => {
                    self.bump();
                }
                Some('\n') => {
                    if self.insert_semi {
                        return Some(self.offset);
                    }
                    self.bump();
                }
                Some('/') if self.peek_char2() == Some('/') => {
                    // Line comment: runs to end of line. The newline itself
                    // is left in the input so insertion logic sees it.
                    while let Some(c) = self.peek_char() {
                        if c == '\n' {
                            break;
                        }
                        self.bump();
                    }
                }
                Some('/') if self.peek_char2() == Some('*') => {
                    let start = self.offset;
                    self.bump();
                    self.bump();
                    let mut crossed_newline = false;
                    let mut closed = false;
                    while let Some(c) = self.bump() {
                        if c == '\n' {
                            crossed_newline = true;
                        }
                        if c == '*' && self.eat('/') {
                            closed = true;
                            break;
                        }
                    }
                    if !closed {
                        self.error(start, "comment not terminated");
                    }
                    if crossed_newline && self.insert_semi {
                        return Some(start);
                    }
                }
                _ => return None,
            }
        }
    }

    fn next_token(&mut self) -> ScannedToken {
        if let Some(at) = self.skip_trivia() {
            self.insert_semi = false;
            // Consume the newline the insertion stands for, if present.
            self.eat('\n');
            return ScannedToken {
                offset: at,
                tok: Token::Semicolon,
                lit: "\n".to_string(),
            };
        }

        let offset = self.offset;
        let c = match self.peek_char() {
            Some(c) => c,
            None => {
                if self.insert_semi {
                    self.insert_semi = false;
                    return ScannedToken {
                        offset,
                        tok: Token::Semicolon,
                        lit: "\n".to_string(),
                    };
                }
                return ScannedToken {
                    offset,
                    tok: Token::Eof,
                    lit: String::new(),
                };
            }
        };

        if is_letter(c) {
            let lit = self.scan_identifier();
            let tok = Token::lookup(&lit);
            self.insert_semi = matches!(
                tok,
                Token::Ident
                    | Token::Break
                    | Token::Continue
                    | Token::Fallthrough
                    | Token::Return
            );
            return ScannedToken {
                offset,
                tok,
                lit: if tok == Token::Ident { lit } else { String::new() },
            };
        }

        if c.is_ascii_digit() || (c == '.' && self.peek_char2().is_some_and(|d| d.is_ascii_digit()))
        {
            let (tok, lit) = self.scan_number();
            self.insert_semi = true;
            return ScannedToken { offset, tok, lit };
        }

        self.bump();
        let (tok, lit) = match c {
            '"' => {
                self.insert_semi = true;
                (Token::Str, self.scan_string(offset, '"'))
            }
            '`' => {
                self.insert_semi = true;
                (Token::Str, self.scan_raw_string(offset))
            }
            '\'' => {
                self.insert_semi = true;
                (Token::Char, self.scan_string(offset, '\''))
            }
            '+' => {
                if self.eat('+') {
                    self.insert_semi = true;
                    (Token::Inc, String::new())
                } else if self.eat('=') {
                    self.insert_semi = false;
                    (Token::AddAssign, String::new())
                } else {
                    self.insert_semi = false;
                    (Token::Add, String::new())
                }
            }
            '-' => {
                if self.eat('-') {
                    self.insert_semi = true;
                    (Token::Dec, String::new())
                } else if self.eat('=') {
                    self.insert_semi = false;
                    (Token::SubAssign, String::new())
                } else {
                    self.insert_semi = false;
                    (Token::Sub, String::new())
                }
            }
            '*' => {
                self.insert_semi = false;
                if self.eat('=') {
                    (Token::MulAssign, String::new())
                } else {
                    (Token::Mul, String::new())
                }
            }
            '/' => {
                self.insert_semi = false;
                if self.eat('=') {
                    (Token::QuoAssign, String::new())
                } else {
                    (Token::Quo, String::new())
                }
            }
            '%' => {
                self.insert_semi = false;
                if self.eat('=') {
                    (Token::RemAssign, String::new())
                } else {
                    (Token::Rem, String::new())
                }
            }
            '^' => {
                self.insert_semi = false;
                if self.eat('=') {
                    (Token::XorAssign, String::new())
                } else {
                    (Token::Xor, String::new())
                }
            }
            '<' => {
                self.insert_semi = false;
                if self.eat('-') {
                    (Token::Arrow, String::new())
                } else if self.eat('<') {
                    if self.eat('=') {
                        (Token::ShlAssign, String::new())
                    } else {
                        (Token::Shl, String::new())
                    }
                } else if self.eat('=') {
                    (Token::Leq, String::new())
                } else {
                    (Token::Lss, String::new())
                }
            }
            '>' => {
                self.insert_semi = false;
                if self.eat('>') {
                    if self.eat('=') {
                        (Token::ShrAssign, String::new())
                    } else {
                        (Token::Shr, String::new())
                    }
                } else if self.eat('=') {
                    (Token::Geq, String::new())
                } else {
                    (Token::Gtr, String::new())
                }
            }
            '=' => {
                self.insert_semi = false;
                if self.eat('=') {
                    (Token::Eql, String::new())
                } else {
                    (Token::Assign, String::new())
                }
            }
            '!' => {
                self.insert_semi = false;
                if self.eat('=') {
                    (Token::Neq, String::new())
                } else {
                    (Token::Not, String::new())
                }
            }
            '&' => {
                self.insert_semi = false;
                if self.eat('&') {
                    (Token::LAnd, String::new())
                } else if self.eat('^') {
                    if self.eat('=') {
                        (Token::AndNotAssign, String::new())
                    } else {
                        (Token::AndNot, String::new())
                    }
                } else if self.eat('=') {
                    (Token::AndAssign, String::new())
                } else {
                    (Token::And, String::new())
                }
            }
            '|' => {
                self.insert_semi = false;
                if self.eat('|') {
                    (Token::LOr, String::new())
                } else if self.eat('=') {
                    (Token::OrAssign, String::new())
                } else {
                    (Token::Or, String::new())
                }
            }
            ':' => {
                self.insert_semi = false;
                if self.eat('=') {
                    (Token::Define, String::new())
                } else {
                    (Token::Colon, String::new())
                }
            }
            '.' => {
                self.insert_semi = false;
                if self.src[self.offset..].starts_with("..") {
                    self.offset += 2;
                    (Token::Ellipsis, String::new())
                } else {
                    (Token::Period, String::new())
                }
            }
            '(' => {
                self.insert_semi = false;
                (Token::Lparen, String::new())
            }
            '[' => {
                self.insert_semi = false;
                (Token::Lbrack, String::new())
            }
            '{' => {
                self.insert_semi = false;
                (Token::Lbrace, String::new())
            }
            ')' => {
                self.insert_semi = true;
                (Token::Rparen, String::new())
            }
            ']' => {
                self.insert_semi = true;
                (Token::Rbrack, String::new())
            }
            '}' => {
                self.insert_semi = true;
                (Token::Rbrace, String::new())
            }
            ',' => {
                self.insert_semi = false;
                (Token::Comma, String::new())
            }
            ';' => {
                self.insert_semi = false;
                (Token::Semicolon, ";".to_string())
            }
            other => {
                self.insert_semi = false;
                self.error(offset, format!("illegal character {:?}", other));
                // Re-scan from the next character.
                return self.next_token();
            }
        };
        ScannedToken { offset, tok, lit }
    }

    fn scan_identifier(&mut self) -> String {
        let start = self.offset;
        while let Some(c) = self.peek_char() {
            if is_letter(c) || c.is_ascii_digit() || (!c.is_ascii() && c.is_numeric()) {
                self.bump();
            } else {
                break;
            }
        }
        self.src[start..self.offset].to_string()
    }

    fn scan_number(&mut self) -> (Token, String) {
        let start = self.offset;
        let mut tok = Token::Int;

        if self.eat('0') && matches!(self.peek_char(), Some('x' | 'X' | 'o' | 'O' | 'b' | 'B')) {
            let radix_char = self.bump().unwrap().to_ascii_lowercase();
            let digits_ok: fn(char) -> bool = match radix_char {
                'x' => |c| c.is_ascii_hexdigit(),
                'o' => |c| ('0'..='7').contains(&c),
                _ => |c| c == '0' || c == '1',
            };
            let mut any = false;
            while let Some(c) = self.peek_char() {
                if digits_ok(c) || c == '_' {
                    any = any || c != '_';
                    self.bump();
                } else {
                    break;
                }
            }
            if !any {
                self.error(start, "number has no digits");
            }
        } else {
            self.scan_decimal_digits();
            if self.eat('.') {
                tok = Token::Float;
                self.scan_decimal_digits();
            }
            if matches!(self.peek_char(), Some('e' | 'E')) {
                tok = Token::Float;
                self.bump();
                if matches!(self.peek_char(), Some('+' | '-')) {
                    self.bump();
                }
                if !self.peek_char().is_some_and(|c| c.is_ascii_digit()) {
                    self.error(self.offset, "exponent has no digits");
                }
                self.scan_decimal_digits();
            }
        }
        if self.eat('i') {
            tok = Token::Imag;
        }
        (tok, self.src[start..self.offset].to_string())
    }

    fn scan_decimal_digits(&mut self) {
        while let Some(c) = self.peek_char() {
            if c.is_ascii_digit() || c == '_' {
                self.bump();
            } else {
                break;
            }
        }
    }

    /// Scan an interpreted string or rune literal; the opening quote has
    /// been consumed. Returns the literal including both quotes.
    fn scan_string(&mut self, start: usize, quote: char) -> String {
        loop {
            match self.bump() {
                None | Some('\n') => {
                    self.error(start, "string literal not terminated");
                    break;
                }
                Some('\\') => {
                    self.bump();
                }
                Some(c) if c == quote => break,
                Some(_) => {}
            }
        }
        self.src[start..self.offset].to_string()
    }

    fn scan_raw_string(&mut self, start: usize) -> String {
        loop {
            match self.bump() {
                None => {
                    self.error(start, "raw string literal not terminated");
                    break;
                }
                Some('`') => break,
                Some(_) => {}
            }
        }
        self.src[start..self.offset].to_string()
    }
}

fn is_letter(c: char) -> bool {
    c == '_' || c.is_ascii_alphabetic() || (!c.is_ascii() && c.is_alphabetic())
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(src: &str) -> Vec<Token> {
        let (toks, errs) = Scanner::new(src, 1).scan_all();
        assert!(errs.is_empty(), "scan errors: {:?}", errs);
        toks.into_iter().map(|t| t.tok).collect()
    }

    mod basics {
        use super::*;

        #[test]
        fn identifiers_and_keywords() {
            assert_eq!(
                kinds("func main"),
                vec![Token::Func, Token::Ident, Token::Semicolon, Token::Eof]
            );
        }

        #[test]
        fn operators_longest_match() {
            assert_eq!(
                kinds("a &^= b"),
                vec![
                    Token::Ident,
                    Token::AndNotAssign,
                    Token::Ident,
                    Token::Semicolon,
                    Token::Eof
                ]
            );
            assert_eq!(
                kinds("x <<= 1"),
                vec![
                    Token::Ident,
                    Token::ShlAssign,
                    Token::Int,
                    Token::Semicolon,
                    Token::Eof
                ]
            );
        }

        #[test]
        fn numbers() {
            let (toks, errs) = Scanner::new("0x1f 0b10 1_000 3.14 1e9 2i", 1).scan_all();
            assert!(errs.is_empty());
            let kinds: Vec<Token> = toks.iter().map(|t| t.tok).collect();
            assert_eq!(
                kinds,
                vec![
                    Token::Int,
                    Token::Int,
                    Token::Int,
                    Token::Float,
                    Token::Float,
                    Token::Imag,
                    Token::Semicolon,
                    Token::Eof
                ]
            );
            assert_eq!(toks[3].lit, "3.14");
        }

        #[test]
        fn strings() {
            let (toks, errs) = Scanner::new(r#"x := "a\"b""#, 1).scan_all();
            assert!(errs.is_empty());
            assert_eq!(toks[2].tok, Token::Str);
            assert_eq!(toks[2].lit, r#""a\"b""#);
        }
    }

    mod semicolon_insertion {
        use super::*;

        #[test]
        fn after_ident_at_newline() {
            assert_eq!(
                kinds("x\ny"),
                vec![
                    Token::Ident,
                    Token::Semicolon,
                    Token::Ident,
                    Token::Semicolon,
                    Token::Eof
                ]
            );
        }

        #[test]
        fn not_after_operator() {
            assert_eq!(
                kinds("x +\ny"),
                vec![
                    Token::Ident,
                    Token::Add,
                    Token::Ident,
                    Token::Semicolon,
                    Token::Eof
                ]
            );
        }

        #[test]
        fn after_closing_delimiters() {
            assert_eq!(
                kinds("f()\n"),
                vec![
                    Token::Ident,
                    Token::Lparen,
                    Token::Rparen,
                    Token::Semicolon,
                    Token::Eof
                ]
            );
        }

        #[test]
        fn line_comment_terminates_line() {
            assert_eq!(
                kinds("x // trailing\ny"),
                vec![
                    Token::Ident,
                    Token::Semicolon,
                    Token::Ident,
                    Token::Semicolon,
                    Token::Eof
                ]
            );
        }

        #[test]
        fn at_eof_without_newline() {
            assert_eq!(kinds("return"), vec![Token::Return, Token::Semicolon, Token::Eof]);
        }
    }

    mod errors {
        use super::*;

        #[test]
        fn unterminated_string_is_reported() {
            let (_, errs) = Scanner::new("x := \"abc\n", 1).scan_all();
            assert_eq!(errs.len(), 1);
            assert!(errs[0].message.contains("not terminated"));
        }
    }
}
