//! HTML/mustache merging parser.
//!
//! Walks the whitespace-controlled grammar AST and streams each content run
//! through the HTML tokenizer, maintaining an explicit stack of open
//! elements. Where a mustache lands depends on the tokenizer's state when it
//! is encountered: mid-tag it becomes an element modifier, in an attribute
//! value it joins that attribute's parts, inside an HTML comment it is
//! serialized back to literal source, and otherwise it is content.

use compact_str::CompactString;
use gossamer_ast::ast::*;
use gossamer_ast::errors::{CompilerError, ErrorCode};
use gossamer_ast::options::ParserOptions;

use crate::entity::HtmlEntities;
use crate::grammar;
use crate::tag_config::is_void_tag;
use crate::tokenizer::{AttrPart, Attribute, EndTag, StartTag, Token, Tokenizer};
use crate::whitespace::WhitespaceControl;

static ENTITIES: HtmlEntities = HtmlEntities;

/// Parse template source into the unified AST.
pub fn parse(source: &str, options: &ParserOptions) -> Result<Program, CompilerError> {
    let mut program = grammar::parse(source)?;
    WhitespaceControl::new().strip(&mut program);
    Merger::new(options).merge(program)
}

enum Container {
    Program { body: Vec<Statement> },
    Element { start: StartTag, children: Vec<Statement> },
}

struct Merger<'o> {
    options: &'o ParserOptions,
    tokenizer: Tokenizer<'static>,
    stack: Vec<Container>,
}

impl<'o> Merger<'o> {
    fn new(options: &'o ParserOptions) -> Self {
        Self {
            options,
            tokenizer: Tokenizer::new(&ENTITIES),
            stack: Vec::new(),
        }
    }

    fn merge(mut self, program: Program) -> Result<Program, CompilerError> {
        self.accept_program(program, true)
    }

    fn accept_program(&mut self, program: Program, root: bool) -> Result<Program, CompilerError> {
        let Program {
            body,
            block_params,
            loc,
        } = program;

        let entry_depth = self.stack.len();
        self.stack.push(Container::Program { body: Vec::new() });

        for statement in body {
            self.accept_statement(statement)?;
        }
        if root {
            if let Some(token) = self.tokenizer.flush_eof() {
                self.accept_token(token)?;
            }
        } else {
            self.flush_chars();
        }

        match self.stack.pop() {
            Some(Container::Program { body }) => {
                debug_assert_eq!(self.stack.len(), entry_depth);
                Ok(Program {
                    body,
                    block_params,
                    loc,
                })
            }
            Some(Container::Element { start, .. }) => Err(CompilerError::at(
                ErrorCode::UnclosedElement,
                format!("Unclosed element `{}`", start.tag_name),
                start.loc,
            )),
            None => unreachable!("program container missing"),
        }
    }

    fn accept_statement(&mut self, statement: Statement) -> Result<(), CompilerError> {
        match statement {
            Statement::Content(content) => {
                if content.value.is_empty() {
                    return Ok(());
                }
                self.tokenizer.set_position(content.loc.start);
                let tokens = self.tokenizer.tokenize_part(&content.value);
                for token in tokens {
                    self.accept_token(token)?;
                }
                Ok(())
            }
            Statement::Mustache(mustache) => self.accept_mustache(mustache),
            Statement::Block(block) => self.accept_block(*block),
            Statement::Partial(partial) => self.accept_partial(partial),
            Statement::Comment(comment) => {
                // Mustache comments disappear from the merged tree; inside an
                // HTML comment their source is preserved verbatim.
                if self.tokenizer.state().is_in_comment() {
                    let text = format!("{{{{!{}}}}}", comment.value);
                    self.tokenizer.append_comment_text(&text);
                }
                Ok(())
            }
            // Pre-built nodes (from plugins or builders) pass straight through
            other => {
                self.flush_chars();
                self.push_child(other);
                Ok(())
            }
        }
    }

    fn accept_mustache(&mut self, mustache: MustacheStatement) -> Result<(), CompilerError> {
        let state = self.tokenizer.state();
        if state.is_in_tag() {
            self.tokenizer.add_element_modifier(mustache.sexpr);
        } else if state.is_in_attribute_value() {
            self.tokenizer.add_attr_mustache(mustache);
        } else if state.is_in_comment() {
            let text = print_mustache(&mustache);
            self.tokenizer.append_comment_text(&text);
        } else {
            self.flush_chars();
            self.push_child(Statement::Mustache(mustache));
        }
        Ok(())
    }

    fn accept_block(&mut self, block: BlockStatement) -> Result<(), CompilerError> {
        let state = self.tokenizer.state();
        if state.is_in_comment() {
            let text = print_block(&block);
            self.tokenizer.append_comment_text(&text);
            return Ok(());
        }
        if state.is_in_tag() || state.is_in_attribute_value() {
            return Err(CompilerError::at(
                ErrorCode::UnexpectedToken,
                format!(
                    "{{{{#{}}}}} is not allowed inside an HTML tag",
                    block.sexpr.path.original
                ),
                block.loc,
            ));
        }

        self.flush_chars();
        let program = self.accept_program(block.program, false)?;
        let inverse = match block.inverse {
            Some(inverse) => Some(self.accept_program(inverse, false)?),
            None => None,
        };
        self.push_child(Statement::Block(Box::new(BlockStatement {
            sexpr: block.sexpr,
            program,
            inverse,
            open_strip: block.open_strip,
            inverse_strip: block.inverse_strip,
            close_strip: block.close_strip,
            loc: block.loc,
        })));
        Ok(())
    }

    fn accept_partial(&mut self, partial: PartialStatement) -> Result<(), CompilerError> {
        let state = self.tokenizer.state();
        if state.is_in_comment() {
            let text = format!("{{{{> {}}}}}", partial.sexpr.path.original);
            self.tokenizer.append_comment_text(&text);
            return Ok(());
        }
        if state.is_in_tag() || state.is_in_attribute_value() {
            return Err(CompilerError::at(
                ErrorCode::UnexpectedToken,
                "a partial is not allowed inside an HTML tag",
                partial.loc,
            ));
        }
        self.flush_chars();
        self.push_child(Statement::Partial(partial));
        Ok(())
    }

    fn accept_token(&mut self, token: Token) -> Result<(), CompilerError> {
        match token {
            Token::StartTag(start) => {
                self.stack.push(Container::Element {
                    start,
                    children: Vec::new(),
                });
                Ok(())
            }
            Token::EndTag(end) => self.close_element(end),
            Token::Chars(chars) => {
                self.push_child(Statement::Text(TextNode {
                    chars: chars.chars,
                    loc: chars.loc,
                }));
                Ok(())
            }
            Token::Comment(comment) => {
                self.push_child(Statement::Comment(CommentStatement {
                    value: comment.chars,
                    strip: Strip::default(),
                    loc: comment.loc,
                }));
                Ok(())
            }
        }
    }

    fn close_element(&mut self, end: EndTag) -> Result<(), CompilerError> {
        if !end.synthetic && is_void_tag(&end.tag_name) {
            return Err(CompilerError::at(
                ErrorCode::EndTagForVoidElement,
                format!("Invalid end tag `{}` (void elements cannot have end tags)", end.tag_name),
                end.loc,
            ));
        }

        let (start, children) = match self.stack.pop() {
            Some(Container::Element { start, children }) => (start, children),
            _ => {
                return Err(CompilerError::at(
                    ErrorCode::InvalidEndTag,
                    format!("Closing tag `{}` without an open tag", end.tag_name),
                    end.loc,
                ));
            }
        };

        if !start.tag_name.eq_ignore_ascii_case(&end.tag_name) {
            return Err(CompilerError::at(
                ErrorCode::InvalidEndTag,
                format!(
                    "Closing tag `{}` did not match last open tag `{}`",
                    end.tag_name, start.tag_name
                ),
                end.loc,
            ));
        }

        let loc = SourceLocation::new(start.loc.start, end.loc.end);
        let as_component =
            start.tag_name.contains('-') && !self.options.disable_component_generation;

        if as_component {
            let (attributes, block_params) = split_block_params(start.attributes, loc)?;
            let attributes = convert_attributes(attributes, loc)?;
            self.push_child(Statement::Component(Box::new(ComponentNode {
                tag: start.tag_name,
                attributes,
                program: Program {
                    body: children,
                    block_params,
                    loc,
                },
                loc,
            })));
        } else {
            let attributes = convert_attributes(start.attributes, loc)?;
            self.push_child(Statement::Element(Box::new(ElementNode {
                tag: start.tag_name,
                attributes,
                modifiers: start.modifiers,
                children,
                loc,
            })));
        }
        Ok(())
    }

    fn push_child(&mut self, statement: Statement) {
        match self.stack.last_mut() {
            Some(Container::Element { children, .. }) => children.push(statement),
            Some(Container::Program { body }) => body.push(statement),
            None => unreachable!("no open container"),
        }
    }

    fn flush_chars(&mut self) {
        if let Some(Token::Chars(chars)) = self.tokenizer.flush_pending_chars() {
            self.push_child(Statement::Text(TextNode {
                chars: chars.chars,
                loc: chars.loc,
            }));
        }
    }
}

/// Convert tokenizer attributes into AST attribute nodes, enforcing that an
/// unquoted value is a single string or mustache.
fn convert_attributes(
    attributes: Vec<Attribute>,
    loc: SourceLocation,
) -> Result<Vec<AttrNode>, CompilerError> {
    attributes
        .into_iter()
        .map(|attr| {
            let value = match attr.parts.len() {
                0 => AttrValue::Text(TextNode {
                    chars: CompactString::default(),
                    loc,
                }),
                1 => match attr.parts.into_iter().next().unwrap() {
                    AttrPart::Text(text) => AttrValue::Text(TextNode { chars: text, loc }),
                    AttrPart::Mustache(mustache) => AttrValue::Mustache(mustache),
                },
                _ => {
                    if !attr.quoted {
                        return Err(CompilerError::at(
                            ErrorCode::UnquotedAttributeConcat,
                            format!(
                                "An unquoted attribute value must be a single string or mustache (in attribute `{}`)",
                                attr.name
                            ),
                            loc,
                        ));
                    }
                    let parts = attr
                        .parts
                        .into_iter()
                        .map(|part| match part {
                            AttrPart::Text(text) => {
                                ConcatPart::Text(TextNode { chars: text, loc })
                            }
                            AttrPart::Mustache(mustache) => ConcatPart::Mustache(mustache),
                        })
                        .collect();
                    AttrValue::Concat(ConcatStatement { parts, loc })
                }
            };
            Ok(AttrNode {
                name: attr.name,
                value,
                loc,
            })
        })
        .collect()
}

/// Extract `as |param1 param2|` block-parameter syntax from a component's
/// attribute list.
fn split_block_params(
    attributes: Vec<Attribute>,
    loc: SourceLocation,
) -> Result<(Vec<Attribute>, Vec<CompactString>), CompilerError> {
    let as_index = attributes
        .iter()
        .position(|attr| attr.name == "as" && attr.parts.is_empty());
    let Some(as_index) = as_index else {
        return Ok((attributes, Vec::new()));
    };
    if attributes
        .get(as_index + 1)
        .map_or(true, |attr| !attr.name.starts_with('|'))
    {
        return Ok((attributes, Vec::new()));
    }

    let mut kept = attributes;
    let param_attrs = kept.split_off(as_index + 1);
    kept.pop(); // the `as` attribute itself

    let joined = param_attrs
        .iter()
        .map(|attr| attr.name.as_str())
        .collect::<Vec<_>>()
        .join(" ");
    let inner = joined
        .strip_prefix('|')
        .and_then(|rest| rest.strip_suffix('|'));
    let Some(inner) = inner else {
        return Err(CompilerError::at(
            ErrorCode::InvalidBlockParams,
            format!("Invalid block parameters syntax: `as {joined}`"),
            loc,
        ));
    };
    if inner.contains('|') {
        return Err(CompilerError::at(
            ErrorCode::InvalidBlockParams,
            format!("Invalid block parameters syntax: `as {joined}`"),
            loc,
        ));
    }
    let params: Vec<CompactString> = inner
        .split_whitespace()
        .map(CompactString::from)
        .collect();
    if params.is_empty() {
        return Err(CompilerError::at(
            ErrorCode::InvalidBlockParams,
            "block params must name at least one binding",
            loc,
        ));
    }
    Ok((kept, params))
}

// ========== Source printers (for mustaches inside HTML comments) ==========

fn print_mustache(mustache: &MustacheStatement) -> std::string::String {
    if mustache.escaped {
        format!("{{{{{}}}}}", print_sexpr(&mustache.sexpr))
    } else {
        format!("{{{{{{{}}}}}}}", print_sexpr(&mustache.sexpr))
    }
}

fn print_block(block: &BlockStatement) -> std::string::String {
    let mut out = format!("{{{{#{}}}}}", print_sexpr(&block.sexpr));
    print_program_into(&block.program, &mut out);
    if let Some(inverse) = &block.inverse {
        out.push_str("{{else}}");
        print_program_into(inverse, &mut out);
    }
    out.push_str(&format!("{{{{/{}}}}}", block.sexpr.path.original));
    out
}

fn print_program_into(program: &Program, out: &mut std::string::String) {
    for statement in &program.body {
        match statement {
            Statement::Content(content) => out.push_str(&content.value),
            Statement::Mustache(mustache) => out.push_str(&print_mustache(mustache)),
            Statement::Block(block) => out.push_str(&print_block(block)),
            _ => {}
        }
    }
}

fn print_sexpr(sexpr: &SubExpression) -> std::string::String {
    let mut out = sexpr.path.original.to_string();
    for param in &sexpr.params {
        out.push(' ');
        out.push_str(&print_expr(param));
    }
    for pair in &sexpr.hash.pairs {
        out.push(' ');
        out.push_str(&pair.key);
        out.push('=');
        out.push_str(&print_expr(&pair.value));
    }
    out
}

fn print_expr(expr: &Expression) -> std::string::String {
    match expr {
        Expression::Path(path) => path.original.to_string(),
        Expression::String(s) => format!("\"{}\"", s.value),
        Expression::Number(n) => {
            if n.value.fract() == 0.0 {
                format!("{}", n.value as i64)
            } else {
                n.value.to_string()
            }
        }
        Expression::Boolean(b) => b.value.to_string(),
        Expression::SubExpression(sub) => format!("({})", print_sexpr(sub)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_ok(src: &str) -> Program {
        parse(src, &ParserOptions::default()).expect("parse error")
    }

    #[test]
    fn merges_elements_and_text() {
        let program = parse_ok("<div>hello {{name}}</div>");
        assert_eq!(program.body.len(), 1);
        let Statement::Element(el) = &program.body[0] else {
            panic!("expected element");
        };
        assert_eq!(el.tag, "div");
        assert_eq!(el.children.len(), 2);
        assert!(matches!(&el.children[0], Statement::Text(t) if t.chars == "hello "));
        assert!(matches!(&el.children[1], Statement::Mustache(_)));
    }

    #[test]
    fn mustache_mid_tag_becomes_modifier() {
        let program = parse_ok(r#"<button {{action "go"}}>x</button>"#);
        let Statement::Element(el) = &program.body[0] else {
            panic!("expected element");
        };
        assert_eq!(el.modifiers.len(), 1);
        assert_eq!(el.modifiers[0].path.original, "action");
    }

    #[test]
    fn attribute_concat_parts() {
        let program = parse_ok(r#"<div class="a {{b}} c"></div>"#);
        let Statement::Element(el) = &program.body[0] else {
            panic!("expected element");
        };
        let AttrValue::Concat(concat) = &el.attributes[0].value else {
            panic!("expected concat value");
        };
        assert_eq!(concat.parts.len(), 3);
        assert!(matches!(&concat.parts[0], ConcatPart::Text(t) if t.chars == "a "));
        assert!(matches!(&concat.parts[1], ConcatPart::Mustache(_)));
        assert!(matches!(&concat.parts[2], ConcatPart::Text(t) if t.chars == " c"));
    }

    #[test]
    fn single_mustache_attribute_value() {
        let program = parse_ok(r#"<div class={{cls}}></div>"#);
        let Statement::Element(el) = &program.body[0] else {
            panic!("expected element");
        };
        assert!(matches!(&el.attributes[0].value, AttrValue::Mustache(_)));
    }

    #[test]
    fn unquoted_concat_is_fatal() {
        let err = parse(r#"<div class=a{{b}}></div>"#, &ParserOptions::default()).unwrap_err();
        assert_eq!(err.code, ErrorCode::UnquotedAttributeConcat);
    }

    #[test]
    fn hyphenated_tag_becomes_component() {
        let program = parse_ok("<x-item title={{t}}>body</x-item>");
        let Statement::Component(component) = &program.body[0] else {
            panic!("expected component");
        };
        assert_eq!(component.tag, "x-item");
        assert_eq!(component.attributes.len(), 1);
        assert_eq!(component.program.body.len(), 1);
    }

    #[test]
    fn component_generation_can_be_disabled() {
        let options = ParserOptions {
            disable_component_generation: true,
            ..ParserOptions::default()
        };
        let program = parse("<x-item></x-item>", &options).expect("parse error");
        assert!(matches!(&program.body[0], Statement::Element(_)));
    }

    #[test]
    fn component_block_params() {
        let program = parse_ok("<x-list as |item index|>{{item}}</x-list>");
        let Statement::Component(component) = &program.body[0] else {
            panic!("expected component");
        };
        assert!(component.attributes.is_empty());
        assert_eq!(component.program.block_params, vec!["item", "index"]);
    }

    #[test]
    fn mustache_inside_html_comment_is_preserved() {
        let program = parse_ok("<!-- hi {{name}} bye -->");
        let Statement::Comment(comment) = &program.body[0] else {
            panic!("expected comment");
        };
        assert_eq!(comment.value, " hi {{name}} bye ");
    }

    #[test]
    fn mustache_comment_disappears() {
        let program = parse_ok("a{{! note }}b");
        assert_eq!(program.body.len(), 1);
        assert!(matches!(&program.body[0], Statement::Text(t) if t.chars == "ab"));
    }

    #[test]
    fn block_spanning_element_content() {
        let program = parse_ok("<ul>{{#each items}}<li>{{name}}</li>{{/each}}</ul>");
        let Statement::Element(ul) = &program.body[0] else {
            panic!("expected element");
        };
        let Statement::Block(block) = &ul.children[0] else {
            panic!("expected block");
        };
        let Statement::Element(li) = &block.program.body[0] else {
            panic!("expected li");
        };
        assert_eq!(li.tag, "li");
    }

    #[test]
    fn unclosed_element_is_fatal() {
        let err = parse("<div><p></div>", &ParserOptions::default()).unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidEndTag);

        let err = parse("{{#if x}}<div>{{/if}}", &ParserOptions::default()).unwrap_err();
        assert_eq!(err.code, ErrorCode::UnclosedElement);
    }

    #[test]
    fn end_tag_for_void_element_is_fatal() {
        let err = parse("<input></input>", &ParserOptions::default()).unwrap_err();
        assert_eq!(err.code, ErrorCode::EndTagForVoidElement);
    }

    #[test]
    fn void_and_self_closing_elements() {
        let program = parse_ok("<br><img src=\"x\">");
        assert_eq!(program.body.len(), 2);
        assert!(matches!(&program.body[0], Statement::Element(e) if e.tag == "br"));
        assert!(matches!(&program.body[1], Statement::Element(e) if e.tag == "img"));
    }

    #[test]
    fn block_inside_tag_is_fatal() {
        let err = parse("<div {{#if a}}x{{/if}}></div>", &ParserOptions::default()).unwrap_err();
        assert_eq!(err.code, ErrorCode::UnexpectedToken);
    }

    #[test]
    fn whitespace_control_applies_before_merge() {
        let program = parse_ok("  {{#if x}}\n  foo\n  {{/if}}\n");
        let Statement::Block(block) = &program.body[0] else {
            panic!("expected block");
        };
        let Statement::Text(text) = &block.program.body[0] else {
            panic!("expected text");
        };
        assert_eq!(text.chars, "  foo\n");
    }
}
