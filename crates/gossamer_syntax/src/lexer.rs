//! Mustache lexer.
//!
//! A raw-character lexer specialized for `{{...}}` syntax, separate from the
//! HTML tokenizer. Outside mustaches it accumulates content runs (INITIAL);
//! inside them it produces the expression token alphabet (mu); comments and
//! raw blocks have their own scanning modes (com, raw).

use compact_str::CompactString;
use gossamer_ast::ast::{Position, SourceLocation, Strip};
use gossamer_ast::errors::{CompilerError, ErrorCode};

/// What kind of mustache an `Open` token begins
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenKind {
    /// `{{expr}}`
    Expr,
    /// `{{{expr}}}`
    Unescaped,
    /// `{{#block}}`
    Block,
    /// `{{/block}}`
    EndBlock,
    /// `{{^}}` / `{{^inverse}}`
    Inverse,
    /// `{{> partial}}`
    Partial,
    /// `{{{{raw}}}}`
    RawBlock,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TokKind {
    Content(CompactString),
    Comment { value: CompactString, strip: Strip },
    Open { kind: OpenKind, strip: bool },
    Close { strip: bool },
    Ident(CompactString),
    StringLit(CompactString),
    NumberLit(f64),
    BoolLit(bool),
    /// `.` or `/` between path segments
    Sep(char),
    /// `@` data prefix
    Data,
    Equals,
    OpenSexpr,
    CloseSexpr,
    /// `as |`
    OpenBlockParams,
    /// closing `|`
    CloseBlockParams,
    Eof,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Tok {
    pub kind: TokKind,
    pub loc: SourceLocation,
}

/// Characters that terminate an identifier in mustache context
fn is_ident_terminator(c: char) -> bool {
    c.is_whitespace()
        || matches!(
            c,
            '!' | '"' | '#' | '%' | '&' | '\'' | '(' | ')' | '*' | '+' | ','
                | '.' | '/' | ';' | '<' | '=' | '>' | '@' | '[' | '\\' | ']'
                | '^' | '`' | '{' | '|' | '}' | '~'
        )
}

pub struct Lexer {
    chars: Vec<char>,
    i: usize,
    line: u32,
    column: u32,
    in_mustache: bool,
    /// Braces expected to close the current mustache (2, 3 or 4)
    close_braces: usize,
}

impl Lexer {
    pub fn new(src: &str) -> Self {
        Self {
            chars: src.chars().collect(),
            i: 0,
            line: 1,
            column: 0,
            in_mustache: false,
            close_braces: 2,
        }
    }

    fn pos(&self) -> Position {
        Position::new(self.line, self.column)
    }

    fn peek(&self, ahead: usize) -> Option<char> {
        self.chars.get(self.i + ahead).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.chars.get(self.i).copied()?;
        self.i += 1;
        if c == '\n' {
            self.line += 1;
            self.column = 0;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    fn bump_n(&mut self, n: usize) {
        for _ in 0..n {
            self.bump();
        }
    }

    fn starts_with(&self, s: &str) -> bool {
        s.chars()
            .enumerate()
            .all(|(k, c)| self.peek(k) == Some(c))
    }

    fn tok(&self, kind: TokKind, start: Position) -> Tok {
        Tok {
            kind,
            loc: SourceLocation::new(start, self.pos()),
        }
    }

    pub fn next_token(&mut self) -> Result<Tok, CompilerError> {
        if self.i >= self.chars.len() {
            return Ok(self.tok(TokKind::Eof, self.pos()));
        }
        if self.in_mustache {
            self.lex_mustache()
        } else {
            self.lex_content()
        }
    }

    // ========== INITIAL: content ==========

    fn lex_content(&mut self) -> Result<Tok, CompilerError> {
        let start = self.pos();
        let mut value = CompactString::default();
        while self.i < self.chars.len() {
            if self.starts_with("\\{{") {
                // Escaped mustache: emit it literally, minus the backslash
                self.bump();
                while self.i < self.chars.len() && !self.starts_with("}}") {
                    let c = self.bump().unwrap();
                    value.push(c);
                }
                if self.starts_with("}}") {
                    self.bump_n(2);
                    value.push_str("}}");
                }
                continue;
            }
            if self.starts_with("{{") {
                if value.is_empty() {
                    return self.lex_open();
                }
                return Ok(self.tok(TokKind::Content(value), start));
            }
            value.push(self.bump().unwrap());
        }
        Ok(self.tok(TokKind::Content(value), start))
    }

    fn lex_open(&mut self) -> Result<Tok, CompilerError> {
        let start = self.pos();
        self.bump_n(2);

        let (kind_braces, close_braces) = if self.starts_with("{{") {
            self.bump_n(2);
            (OpenKind::RawBlock, 4)
        } else if self.peek(0) == Some('{') {
            self.bump();
            (OpenKind::Unescaped, 3)
        } else {
            (OpenKind::Expr, 2)
        };

        let strip = if self.peek(0) == Some('~') {
            self.bump();
            true
        } else {
            false
        };

        let kind = if kind_braces == OpenKind::Expr {
            match self.peek(0) {
                Some('#') => {
                    self.bump();
                    OpenKind::Block
                }
                Some('/') => {
                    self.bump();
                    OpenKind::EndBlock
                }
                Some('^') => {
                    self.bump();
                    OpenKind::Inverse
                }
                Some('>') => {
                    self.bump();
                    OpenKind::Partial
                }
                Some('!') => {
                    self.bump();
                    return self.lex_comment(strip, start);
                }
                _ => OpenKind::Expr,
            }
        } else {
            kind_braces
        };

        self.in_mustache = true;
        self.close_braces = close_braces;
        Ok(self.tok(TokKind::Open { kind, strip }, start))
    }

    // ========== com: comments ==========

    fn lex_comment(&mut self, open_strip: bool, start: Position) -> Result<Tok, CompilerError> {
        let long_form = self.starts_with("--");
        if long_form {
            self.bump_n(2);
        }
        let mut value = CompactString::default();
        loop {
            if self.i >= self.chars.len() {
                return Err(CompilerError::at(
                    ErrorCode::UnexpectedEof,
                    "unterminated comment",
                    SourceLocation::new(start, self.pos()),
                ));
            }
            let close = if long_form {
                if self.starts_with("--~}}") {
                    Some((5, true))
                } else if self.starts_with("--}}") {
                    Some((4, false))
                } else {
                    None
                }
            } else if self.starts_with("~}}") {
                Some((3, true))
            } else if self.starts_with("}}") {
                Some((2, false))
            } else {
                None
            };
            if let Some((n, close_strip)) = close {
                self.bump_n(n);
                return Ok(self.tok(
                    TokKind::Comment {
                        value,
                        strip: Strip::new(open_strip, close_strip),
                    },
                    start,
                ));
            }
            value.push(self.bump().unwrap());
        }
    }

    // ========== mu: inside a mustache ==========

    fn lex_mustache(&mut self) -> Result<Tok, CompilerError> {
        while self.peek(0).is_some_and(|c| c.is_whitespace()) {
            self.bump();
        }
        let start = self.pos();
        let Some(c) = self.peek(0) else {
            return Err(CompilerError::at(
                ErrorCode::UnexpectedEof,
                "unterminated mustache",
                SourceLocation::new(start, start),
            ));
        };

        // Closing delimiter, with optional strip marker
        let close = "}".repeat(self.close_braces);
        if c == '~' && self.chars[self.i + 1..].starts_with(&close.chars().collect::<Vec<_>>()[..])
        {
            self.bump_n(1 + self.close_braces);
            self.in_mustache = false;
            return Ok(self.tok(TokKind::Close { strip: true }, start));
        }
        if self.starts_with(&close) {
            self.bump_n(self.close_braces);
            self.in_mustache = false;
            return Ok(self.tok(TokKind::Close { strip: false }, start));
        }

        match c {
            '(' => {
                self.bump();
                Ok(self.tok(TokKind::OpenSexpr, start))
            }
            ')' => {
                self.bump();
                Ok(self.tok(TokKind::CloseSexpr, start))
            }
            '=' => {
                self.bump();
                Ok(self.tok(TokKind::Equals, start))
            }
            '@' => {
                self.bump();
                Ok(self.tok(TokKind::Data, start))
            }
            '|' => {
                self.bump();
                Ok(self.tok(TokKind::CloseBlockParams, start))
            }
            '/' => {
                self.bump();
                Ok(self.tok(TokKind::Sep('/'), start))
            }
            '.' => {
                self.bump();
                if self.peek(0) == Some('.') {
                    self.bump();
                    Ok(self.tok(TokKind::Ident("..".into()), start))
                } else if self
                    .peek(0)
                    .is_some_and(|n| !is_ident_terminator(n) || n == '[')
                {
                    Ok(self.tok(TokKind::Sep('.'), start))
                } else {
                    Ok(self.tok(TokKind::Ident(".".into()), start))
                }
            }
            '"' | '\'' => self.lex_string(c, start),
            '[' => {
                self.bump();
                let mut value = CompactString::default();
                while let Some(n) = self.peek(0) {
                    if n == ']' {
                        break;
                    }
                    value.push(self.bump().unwrap());
                }
                if self.peek(0) != Some(']') {
                    return Err(CompilerError::at(
                        ErrorCode::UnexpectedEof,
                        "unterminated [segment] literal",
                        SourceLocation::new(start, self.pos()),
                    ));
                }
                self.bump();
                Ok(self.tok(TokKind::Ident(value), start))
            }
            _ if c.is_ascii_digit() || (c == '-' && self.peek(1).is_some_and(|n| n.is_ascii_digit())) => {
                self.lex_number(start)
            }
            _ if !is_ident_terminator(c) => self.lex_ident(start),
            _ => Err(CompilerError::at(
                ErrorCode::UnexpectedToken,
                format!("unexpected character `{c}` in mustache"),
                SourceLocation::new(start, start),
            )),
        }
    }

    fn lex_string(&mut self, quote: char, start: Position) -> Result<Tok, CompilerError> {
        self.bump();
        let mut value = CompactString::default();
        loop {
            let Some(c) = self.bump() else {
                return Err(CompilerError::at(
                    ErrorCode::UnexpectedEof,
                    "unterminated string literal",
                    SourceLocation::new(start, self.pos()),
                ));
            };
            if c == quote {
                return Ok(self.tok(TokKind::StringLit(value), start));
            }
            if c == '\\' {
                match self.bump() {
                    Some('n') => value.push('\n'),
                    Some(other) => value.push(other),
                    None => continue,
                }
            } else {
                value.push(c);
            }
        }
    }

    fn lex_number(&mut self, start: Position) -> Result<Tok, CompilerError> {
        let mut text = CompactString::default();
        if self.peek(0) == Some('-') {
            text.push(self.bump().unwrap());
        }
        let mut seen_dot = false;
        while let Some(c) = self.peek(0) {
            if c.is_ascii_digit() {
                text.push(self.bump().unwrap());
            } else if c == '.' && !seen_dot && self.peek(1).is_some_and(|n| n.is_ascii_digit()) {
                seen_dot = true;
                text.push(self.bump().unwrap());
            } else {
                break;
            }
        }
        let value: f64 = text.parse().map_err(|_| {
            CompilerError::at(
                ErrorCode::UnexpectedToken,
                format!("invalid number literal `{text}`"),
                SourceLocation::new(start, self.pos()),
            )
        })?;
        Ok(self.tok(TokKind::NumberLit(value), start))
    }

    fn lex_ident(&mut self, start: Position) -> Result<Tok, CompilerError> {
        let mut word = CompactString::default();
        while let Some(c) = self.peek(0) {
            if is_ident_terminator(c) {
                break;
            }
            word.push(self.bump().unwrap());
        }
        match word.as_str() {
            "true" => Ok(self.tok(TokKind::BoolLit(true), start)),
            "false" => Ok(self.tok(TokKind::BoolLit(false), start)),
            "as" => {
                // `as |` opens block params; a bare `as` is an ordinary ident
                let mut k = 0;
                while self.peek(k).is_some_and(|c| c.is_whitespace()) {
                    k += 1;
                }
                if self.peek(k) == Some('|') {
                    self.bump_n(k + 1);
                    Ok(self.tok(TokKind::OpenBlockParams, start))
                } else {
                    Ok(self.tok(TokKind::Ident(word), start))
                }
            }
            _ => Ok(self.tok(TokKind::Ident(word), start)),
        }
    }

    // ========== raw: raw block content ==========

    /// Consume raw content up to and including `{{{{/name}}}}`.
    pub fn consume_raw_content(
        &mut self,
        name: &str,
    ) -> Result<CompactString, CompilerError> {
        let start = self.pos();
        let terminator = format!("{{{{{{{{/{name}}}}}}}}}");
        let mut value = CompactString::default();
        while self.i < self.chars.len() {
            if self.starts_with(&terminator) {
                self.bump_n(terminator.chars().count());
                return Ok(value);
            }
            value.push(self.bump().unwrap());
        }
        Err(CompilerError::at(
            ErrorCode::UnexpectedEof,
            format!("unterminated raw block `{name}`"),
            SourceLocation::new(start, self.pos()),
        ))
    }
}
