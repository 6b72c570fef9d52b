//! Mustache grammar parser.
//!
//! Consumes the mustache lexer's token stream and produces `Program`s whose
//! bodies contain `ContentStatement`s for the raw HTML runs between
//! mustaches. Block open/close tag matching, path validation and block
//! parameter syntax are enforced here; all failures are fatal.

use std::collections::VecDeque;

use compact_str::CompactString;
use gossamer_ast::ast::*;
use gossamer_ast::errors::{CompilerError, ErrorCode};

use crate::lexer::{Lexer, OpenKind, Tok, TokKind};

pub fn parse(source: &str) -> Result<Program, CompilerError> {
    GrammarParser::new(source).parse_root()
}

/// How a program's statement run ended
enum Terminator {
    Eof,
    Else { strip: Strip },
    EndBlock { path: PathExpression, strip: Strip },
}

struct GrammarParser {
    lexer: Lexer,
    buf: VecDeque<Tok>,
}

impl GrammarParser {
    fn new(source: &str) -> Self {
        Self {
            lexer: Lexer::new(source),
            buf: VecDeque::new(),
        }
    }

    fn fill(&mut self, n: usize) -> Result<(), CompilerError> {
        while self.buf.len() < n {
            let tok = self.lexer.next_token()?;
            self.buf.push_back(tok);
        }
        Ok(())
    }

    fn peek(&mut self) -> Result<&Tok, CompilerError> {
        self.fill(1)?;
        Ok(&self.buf[0])
    }

    fn peek2(&mut self) -> Result<&Tok, CompilerError> {
        self.fill(2)?;
        Ok(&self.buf[1])
    }

    fn peek_kind(&mut self) -> Result<TokKind, CompilerError> {
        Ok(self.peek()?.kind.clone())
    }

    fn next(&mut self) -> Result<Tok, CompilerError> {
        self.fill(1)?;
        Ok(self.buf.pop_front().unwrap())
    }

    fn unexpected(tok: &Tok, expected: &str) -> CompilerError {
        CompilerError::at(
            ErrorCode::UnexpectedToken,
            format!("expected {expected}, found {:?}", tok.kind),
            tok.loc,
        )
    }

    fn parse_root(&mut self) -> Result<Program, CompilerError> {
        let (program, terminator) = self.parse_program(Vec::new())?;
        match terminator {
            Terminator::Eof => Ok(program),
            Terminator::Else { .. } => Err(CompilerError::new(
                ErrorCode::UnexpectedToken,
                "{{else}} may only be used inside a block",
            )),
            Terminator::EndBlock { path, .. } => Err(CompilerError::at(
                ErrorCode::MismatchedBlock,
                format!("closing tag {{{{/{}}}}} has no matching open tag", path.original),
                path.loc,
            )),
        }
    }

    fn parse_program(
        &mut self,
        block_params: Vec<CompactString>,
    ) -> Result<(Program, Terminator), CompilerError> {
        let start = self.peek()?.loc;
        let mut body = Vec::new();
        loop {
            let tok = self.next()?;
            let end = tok.loc;
            match tok.kind {
                TokKind::Eof => {
                    let program = Program::new(
                        body,
                        block_params,
                        SourceLocation::new(start.start, end.end),
                    );
                    return Ok((program, Terminator::Eof));
                }
                TokKind::Content(value) => {
                    if !value.is_empty() {
                        body.push(Statement::Content(ContentStatement {
                            value: value.clone(),
                            original: value,
                            left_stripped: false,
                            right_stripped: false,
                            loc: tok.loc,
                        }));
                    }
                }
                TokKind::Comment { value, strip } => {
                    body.push(Statement::Comment(CommentStatement {
                        value,
                        strip,
                        loc: tok.loc,
                    }));
                }
                TokKind::Open { kind, strip } => match kind {
                    OpenKind::Expr | OpenKind::Unescaped => {
                        match self.parse_mustache(kind, strip, tok.loc)? {
                            MustacheOrElse::Mustache(mustache) => {
                                body.push(Statement::Mustache(mustache));
                            }
                            MustacheOrElse::Else(else_strip) => {
                                let program = Program::new(
                                    body,
                                    block_params,
                                    SourceLocation::new(start.start, end.end),
                                );
                                return Ok((program, Terminator::Else { strip: else_strip }));
                            }
                        }
                    }
                    OpenKind::Block => {
                        let block = self.parse_block(strip, tok.loc, false)?;
                        body.push(Statement::Block(Box::new(block)));
                    }
                    OpenKind::Inverse => {
                        let at_close = matches!(self.peek_kind()?, TokKind::Close { .. });
                        if at_close {
                            let close = self.next()?;
                            let TokKind::Close { strip: close_strip } = close.kind else {
                                unreachable!()
                            };
                            let program = Program::new(
                                body,
                                block_params,
                                SourceLocation::new(start.start, end.end),
                            );
                            return Ok((
                                program,
                                Terminator::Else {
                                    strip: Strip::new(strip, close_strip),
                                },
                            ));
                        }
                        let block = self.parse_block(strip, tok.loc, true)?;
                        body.push(Statement::Block(Box::new(block)));
                    }
                    OpenKind::EndBlock => {
                        let path = self.parse_path()?;
                        let close = self.next()?;
                        let TokKind::Close { strip: close_strip } = close.kind else {
                            return Err(Self::unexpected(&close, "`}}`"));
                        };
                        let program = Program::new(
                            body,
                            block_params,
                            SourceLocation::new(start.start, end.end),
                        );
                        return Ok((
                            program,
                            Terminator::EndBlock {
                                path,
                                strip: Strip::new(strip, close_strip),
                            },
                        ));
                    }
                    OpenKind::Partial => {
                        let partial = self.parse_partial(strip, tok.loc)?;
                        body.push(Statement::Partial(partial));
                    }
                    OpenKind::RawBlock => {
                        let block = self.parse_raw_block(tok.loc)?;
                        body.push(Statement::Block(Box::new(block)));
                    }
                },
                other => {
                    return Err(CompilerError::at(
                        ErrorCode::UnexpectedToken,
                        format!("expected a statement, found {other:?}"),
                        tok.loc,
                    ));
                }
            }
        }
    }

    fn parse_mustache(
        &mut self,
        kind: OpenKind,
        open_strip: bool,
        open_loc: SourceLocation,
    ) -> Result<MustacheOrElse, CompilerError> {
        let sexpr = self.parse_sexpr()?;
        let close = self.next()?;
        let TokKind::Close { strip: close_strip } = close.kind else {
            return Err(Self::unexpected(&close, "`}}`"));
        };

        if kind == OpenKind::Expr && sexpr.path.original == "else" && !sexpr.path.data {
            if sexpr.is_helper() {
                return Err(CompilerError::at(
                    ErrorCode::UnexpectedToken,
                    "{{else}} does not take arguments",
                    open_loc,
                ));
            }
            return Ok(MustacheOrElse::Else(Strip::new(open_strip, close_strip)));
        }

        Ok(MustacheOrElse::Mustache(MustacheStatement {
            sexpr,
            escaped: kind != OpenKind::Unescaped,
            strip: Strip::new(open_strip, close_strip),
            loc: SourceLocation::new(open_loc.start, close.loc.end),
        }))
    }

    fn parse_block(
        &mut self,
        open_strip: bool,
        open_loc: SourceLocation,
        inverted: bool,
    ) -> Result<BlockStatement, CompilerError> {
        let sexpr = self.parse_sexpr()?;

        let mut block_params = Vec::new();
        let has_block_params = matches!(self.peek_kind()?, TokKind::OpenBlockParams);
        if has_block_params {
            self.next()?;
            loop {
                let tok = self.next()?;
                let tok_loc = tok.loc;
                match tok.kind {
                    TokKind::Ident(name) => block_params.push(name),
                    TokKind::CloseBlockParams => break,
                    other => {
                        return Err(CompilerError::at(
                            ErrorCode::UnexpectedToken,
                            format!("expected a block parameter name, found {other:?}"),
                            tok_loc,
                        ));
                    }
                }
            }
            if block_params.is_empty() {
                return Err(CompilerError::at(
                    ErrorCode::InvalidBlockParams,
                    "block params must name at least one binding",
                    open_loc,
                ));
            }
        }

        let close = self.next()?;
        let TokKind::Close {
            strip: open_close_strip,
        } = close.kind
        else {
            return Err(Self::unexpected(&close, "`}}`"));
        };
        let open_tag_strip = Strip::new(open_strip, open_close_strip);

        let (first, terminator) = self.parse_program(block_params)?;

        let (program, inverse, inverse_strip, close_strip) = match terminator {
            Terminator::Else { strip: else_strip } => {
                if inverted {
                    return Err(CompilerError::at(
                        ErrorCode::UnexpectedToken,
                        "{{else}} is not allowed in an inverted section",
                        open_loc,
                    ));
                }
                let (inverse, terminator) = self.parse_program(Vec::new())?;
                match terminator {
                    Terminator::EndBlock { path, strip } => {
                        self.check_block_close(&sexpr, &path)?;
                        (first, Some(inverse), else_strip, strip)
                    }
                    _ => {
                        return Err(CompilerError::at(
                            ErrorCode::UnexpectedEof,
                            format!("unclosed block {{{{#{}}}}}", sexpr.path.original),
                            open_loc,
                        ));
                    }
                }
            }
            Terminator::EndBlock { path, strip } => {
                self.check_block_close(&sexpr, &path)?;
                (first, None, Strip::default(), strip)
            }
            Terminator::Eof => {
                return Err(CompilerError::at(
                    ErrorCode::UnexpectedEof,
                    format!("unclosed block {{{{#{}}}}}", sexpr.path.original),
                    open_loc,
                ));
            }
        };

        let loc = SourceLocation::new(open_loc.start, program.loc.end);
        let (program, inverse) = if inverted {
            (Program::default(), Some(program))
        } else {
            (program, inverse)
        };

        Ok(BlockStatement {
            sexpr,
            program,
            inverse,
            open_strip: open_tag_strip,
            inverse_strip,
            close_strip,
            loc,
        })
    }

    fn check_block_close(
        &self,
        sexpr: &SubExpression,
        close_path: &PathExpression,
    ) -> Result<(), CompilerError> {
        if sexpr.path.original != close_path.original {
            return Err(CompilerError::at(
                ErrorCode::MismatchedBlock,
                format!(
                    "{} doesn't match {}",
                    sexpr.path.original, close_path.original
                ),
                close_path.loc,
            ));
        }
        Ok(())
    }

    fn parse_partial(
        &mut self,
        open_strip: bool,
        open_loc: SourceLocation,
    ) -> Result<PartialStatement, CompilerError> {
        let string_name = matches!(self.peek_kind()?, TokKind::StringLit(_));
        let name = if string_name {
            let tok = self.next()?;
            let TokKind::StringLit(value) = tok.kind else {
                unreachable!()
            };
            PathExpression {
                original: value.clone(),
                parts: vec![value],
                data: false,
                loc: tok.loc,
            }
        } else {
            self.parse_path()?
        };

        let (params, hash) = self.parse_params_and_hash()?;
        let close = self.next()?;
        let TokKind::Close { strip: close_strip } = close.kind else {
            return Err(Self::unexpected(&close, "`}}`"));
        };

        let loc = SourceLocation::new(open_loc.start, close.loc.end);
        Ok(PartialStatement {
            sexpr: SubExpression {
                path: name,
                params,
                hash,
                loc,
            },
            indent: CompactString::default(),
            strip: Strip::new(open_strip, close_strip),
            loc,
        })
    }

    fn parse_raw_block(&mut self, open_loc: SourceLocation) -> Result<BlockStatement, CompilerError> {
        let sexpr = self.parse_sexpr()?;
        let close = self.next()?;
        if !matches!(close.kind, TokKind::Close { .. }) {
            return Err(Self::unexpected(&close, "`}}}}`"));
        }
        let content = self.lexer.consume_raw_content(&sexpr.path.original)?;
        let content_stmt = ContentStatement {
            value: content.clone(),
            original: content,
            left_stripped: false,
            right_stripped: false,
            loc: close.loc,
        };
        let loc = SourceLocation::new(open_loc.start, close.loc.end);
        Ok(BlockStatement {
            sexpr,
            program: Program::new(vec![Statement::Content(content_stmt)], Vec::new(), loc),
            inverse: None,
            open_strip: Strip::default(),
            inverse_strip: Strip::default(),
            close_strip: Strip::default(),
            loc,
        })
    }

    fn parse_sexpr(&mut self) -> Result<SubExpression, CompilerError> {
        let path = self.parse_path()?;
        let (params, hash) = self.parse_params_and_hash()?;
        let loc = path.loc;
        Ok(SubExpression {
            path,
            params,
            hash,
            loc,
        })
    }

    fn parse_params_and_hash(
        &mut self,
    ) -> Result<(Vec<Expression>, Hash), CompilerError> {
        let mut params = Vec::new();
        loop {
            let kind = self.peek_kind()?;
            match kind {
                TokKind::Close { .. }
                | TokKind::CloseSexpr
                | TokKind::OpenBlockParams
                | TokKind::Eof => return Ok((params, Hash::default())),
                TokKind::Ident(_) => {
                    if matches!(self.peek2()?.kind, TokKind::Equals) {
                        break;
                    }
                    params.push(self.parse_expression()?);
                }
                _ => params.push(self.parse_expression()?),
            }
        }

        let mut pairs = Vec::new();
        loop {
            let kind = self.peek_kind()?;
            match kind {
                TokKind::Ident(_) if matches!(self.peek2()?.kind, TokKind::Equals) => {
                    let key_tok = self.next()?;
                    let TokKind::Ident(key) = key_tok.kind else {
                        unreachable!()
                    };
                    self.next()?; // =
                    let value = self.parse_expression()?;
                    pairs.push(HashPair {
                        key,
                        value,
                        loc: key_tok.loc,
                    });
                }
                TokKind::Close { .. }
                | TokKind::CloseSexpr
                | TokKind::OpenBlockParams
                | TokKind::Eof => break,
                _ => {
                    let tok = self.next()?;
                    return Err(Self::unexpected(&tok, "a hash pair or `}}`"));
                }
            }
        }
        Ok((params, Hash { pairs }))
    }

    fn parse_expression(&mut self) -> Result<Expression, CompilerError> {
        let kind = self.peek()?.kind.clone();
        match kind {
            TokKind::Ident(_) | TokKind::Data => Ok(Expression::Path(self.parse_path()?)),
            TokKind::StringLit(value) => {
                let tok = self.next()?;
                Ok(Expression::String(StringLiteral {
                    value,
                    loc: tok.loc,
                }))
            }
            TokKind::NumberLit(value) => {
                let tok = self.next()?;
                Ok(Expression::Number(NumberLiteral {
                    value,
                    loc: tok.loc,
                }))
            }
            TokKind::BoolLit(value) => {
                let tok = self.next()?;
                Ok(Expression::Boolean(BooleanLiteral {
                    value,
                    loc: tok.loc,
                }))
            }
            TokKind::OpenSexpr => {
                self.next()?;
                let sexpr = self.parse_sexpr()?;
                let close = self.next()?;
                if !matches!(close.kind, TokKind::CloseSexpr) {
                    return Err(Self::unexpected(&close, "`)`"));
                }
                Ok(Expression::SubExpression(Box::new(sexpr)))
            }
            _ => {
                let tok = self.next()?;
                Err(Self::unexpected(&tok, "an expression"))
            }
        }
    }

    fn parse_path(&mut self) -> Result<PathExpression, CompilerError> {
        let mut data = false;
        let mut original = CompactString::default();
        let start_loc;

        let leading_data = matches!(self.peek_kind()?, TokKind::Data);
        if leading_data {
            let tok = self.next()?;
            start_loc = tok.loc;
            data = true;
            original.push('@');
        } else {
            start_loc = self.peek()?.loc;
        }

        let first = self.next()?;
        let first_loc = first.loc;
        let name = match first.kind {
            TokKind::Ident(name) => name,
            other => {
                return Err(CompilerError::at(
                    ErrorCode::UnexpectedToken,
                    format!("expected a path segment, found {other:?}"),
                    first_loc,
                ));
            }
        };
        original.push_str(&name);
        let mut segments = vec![name];
        let mut end_loc = first_loc;

        while let TokKind::Sep(sep) = self.peek_kind()? {
            self.next()?;
            original.push(sep);
            let tok = self.next()?;
            let tok_loc = tok.loc;
            let name = match tok.kind {
                TokKind::Ident(name) => name,
                other => {
                    return Err(CompilerError::at(
                        ErrorCode::UnexpectedToken,
                        format!("expected a path segment, found {other:?}"),
                        tok_loc,
                    ));
                }
            };
            original.push_str(&name);
            end_loc = tok_loc;
            segments.push(name);
        }

        let loc = SourceLocation::new(start_loc.start, end_loc.end);

        // `this`, `.` and `..` may only lead a path
        let mut parts = Vec::new();
        let mut seen_named = false;
        for segment in segments {
            let is_scope_ref = matches!(segment.as_str(), "this" | "." | "..");
            if is_scope_ref {
                if seen_named {
                    return Err(CompilerError::at(
                        ErrorCode::InvalidPath,
                        format!("Invalid path: {original}"),
                        loc,
                    ));
                }
            } else {
                seen_named = true;
                parts.push(segment);
            }
        }

        Ok(PathExpression {
            original,
            parts,
            data,
            loc,
        })
    }
}

enum MustacheOrElse {
    Mustache(MustacheStatement),
    Else(Strip),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_ok(src: &str) -> Program {
        parse(src).expect("parse error")
    }

    #[test]
    fn content_and_mustache() {
        let program = parse_ok("a {{foo.bar}} b");
        assert_eq!(program.body.len(), 3);
        let Statement::Mustache(m) = &program.body[1] else {
            panic!("expected mustache");
        };
        assert_eq!(m.sexpr.path.original, "foo.bar");
        assert_eq!(m.sexpr.path.parts, vec!["foo", "bar"]);
        assert!(m.escaped);
        assert!(!m.sexpr.is_helper());
    }

    #[test]
    fn unescaped_mustache() {
        let program = parse_ok("{{{html}}}");
        let Statement::Mustache(m) = &program.body[0] else {
            panic!("expected mustache");
        };
        assert!(!m.escaped);
    }

    #[test]
    fn helper_with_params_and_hash() {
        let program = parse_ok(r#"{{link-to "about" id=3 active=true}}"#);
        let Statement::Mustache(m) = &program.body[0] else {
            panic!("expected mustache");
        };
        assert!(m.sexpr.is_helper());
        assert_eq!(m.sexpr.params.len(), 1);
        assert_eq!(m.sexpr.hash.pairs.len(), 2);
        assert_eq!(m.sexpr.hash.pairs[0].key, "id");
    }

    #[test]
    fn block_with_else() {
        let program = parse_ok("{{#if ok}}yes{{else}}no{{/if}}");
        let Statement::Block(block) = &program.body[0] else {
            panic!("expected block");
        };
        assert_eq!(block.sexpr.path.original, "if");
        assert_eq!(block.program.body.len(), 1);
        let inverse = block.inverse.as_ref().expect("inverse");
        assert_eq!(inverse.body.len(), 1);
    }

    #[test]
    fn block_params() {
        let program = parse_ok("{{#each items as |item index|}}{{item}}{{/each}}");
        let Statement::Block(block) = &program.body[0] else {
            panic!("expected block");
        };
        assert_eq!(block.program.block_params, vec!["item", "index"]);
    }

    #[test]
    fn mismatched_block_close_is_fatal() {
        let err = parse("{{#foo}}x{{/bar}}").unwrap_err();
        assert_eq!(err.code, ErrorCode::MismatchedBlock);
        assert!(err.message.contains("foo doesn't match bar"));
    }

    #[test]
    fn invalid_path_mixing() {
        let err = parse("{{foo.this.bar}}").unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidPath);
        assert!(err.message.contains("Invalid path: foo.this.bar"));
    }

    #[test]
    fn leading_scope_refs_are_valid() {
        let program = parse_ok("{{this.foo}}{{../bar}}");
        let Statement::Mustache(m) = &program.body[0] else {
            panic!("expected mustache");
        };
        assert_eq!(m.sexpr.path.parts, vec!["foo"]);
    }

    #[test]
    fn subexpression() {
        let program = parse_ok("{{outer (inner arg) key=(helper)}}");
        let Statement::Mustache(m) = &program.body[0] else {
            panic!("expected mustache");
        };
        let Expression::SubExpression(sub) = &m.sexpr.params[0] else {
            panic!("expected subexpression param");
        };
        assert_eq!(sub.path.original, "inner");
        assert_eq!(sub.params.len(), 1);
        let Expression::SubExpression(hash_sub) = &m.sexpr.hash.pairs[0].value else {
            panic!("expected subexpression hash value");
        };
        assert!(!hash_sub.is_helper());
    }

    #[test]
    fn inverted_section() {
        let program = parse_ok("{{^missing}}fallback{{/missing}}");
        let Statement::Block(block) = &program.body[0] else {
            panic!("expected block");
        };
        assert!(block.program.body.is_empty());
        assert_eq!(block.inverse.as_ref().unwrap().body.len(), 1);
    }

    #[test]
    fn partial_statement() {
        let program = parse_ok("{{> header title=name}}");
        let Statement::Partial(partial) = &program.body[0] else {
            panic!("expected partial");
        };
        assert_eq!(partial.sexpr.path.original, "header");
        assert_eq!(partial.sexpr.hash.pairs.len(), 1);
    }

    #[test]
    fn strip_flags_recorded() {
        let program = parse_ok("a {{~foo~}} b");
        let Statement::Mustache(m) = &program.body[1] else {
            panic!("expected mustache");
        };
        assert!(m.strip.open);
        assert!(m.strip.close);
    }

    #[test]
    fn else_outside_block_is_fatal() {
        let err = parse("{{else}}").unwrap_err();
        assert_eq!(err.code, ErrorCode::UnexpectedToken);
    }

    #[test]
    fn unclosed_block_is_fatal() {
        let err = parse("{{#if x}}y").unwrap_err();
        assert_eq!(err.code, ErrorCode::UnexpectedEof);
    }

    #[test]
    fn raw_block() {
        let program = parse_ok("{{{{raw}}}}{{not parsed}}{{{{/raw}}}}");
        let Statement::Block(block) = &program.body[0] else {
            panic!("expected block");
        };
        assert_eq!(block.sexpr.path.original, "raw");
        let Statement::Content(content) = &block.program.body[0] else {
            panic!("expected content");
        };
        assert_eq!(content.value, "{{not parsed}}");
    }
}
