//! Whitespace control.
//!
//! Applies `~` strip flags and standalone-line detection to the grammar AST
//! before merging and before AST plugins run. A block, comment or partial
//! occupying a source line by itself has that line's surrounding whitespace
//! removed; explicit `~` markers strip whitespace greedily.

use gossamer_ast::ast::{BlockStatement, Program, Statement};

#[derive(Debug, Default)]
pub struct WhitespaceControl {
    root_seen: bool,
}

/// Strip decisions for one statement, as seen from its containing program.
#[derive(Debug, Default, Clone, Copy)]
struct StripInfo {
    open: bool,
    close: bool,
    open_standalone: bool,
    close_standalone: bool,
    inline_standalone: bool,
}

impl WhitespaceControl {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn strip(mut self, program: &mut Program) {
        self.accept_program(program);
    }

    fn accept_program(&mut self, program: &mut Program) {
        let is_root = !self.root_seen;
        self.root_seen = true;

        for i in 0..program.body.len() {
            let Some(strip) = self.accept_statement(&mut program.body[i]) else {
                continue;
            };

            let prev_ws = is_prev_whitespace(&program.body, Some(i), is_root);
            let next_ws = is_next_whitespace(&program.body, Some(i), is_root);

            let open_standalone = strip.open_standalone && prev_ws;
            let close_standalone = strip.close_standalone && next_ws;
            let inline_standalone = strip.inline_standalone && prev_ws && next_ws;

            if strip.close {
                omit_right(&mut program.body, Some(i), true);
            }
            if strip.open {
                omit_left(&mut program.body, Some(i), true);
            }

            if inline_standalone {
                omit_right(&mut program.body, Some(i), false);
                let indent = if i > 0 {
                    trailing_indent(&program.body[i - 1])
                } else {
                    None
                };
                if omit_left(&mut program.body, Some(i), false) {
                    if let Statement::Partial(partial) = &mut program.body[i] {
                        partial.indent = indent.unwrap_or_default();
                    }
                }
            }

            if open_standalone {
                if let Statement::Block(block) = &mut program.body[i] {
                    omit_right(&mut first_section_mut(block).body, None, false);
                }
                omit_left(&mut program.body, Some(i), false);
            }

            if close_standalone {
                omit_right(&mut program.body, Some(i), false);
                if let Statement::Block(block) = &mut program.body[i] {
                    omit_left(&mut last_section_mut(block).body, None, false);
                }
            }
        }
    }

    fn accept_statement(&mut self, statement: &mut Statement) -> Option<StripInfo> {
        match statement {
            Statement::Mustache(mustache) => Some(StripInfo {
                open: mustache.strip.open,
                close: mustache.strip.close,
                ..StripInfo::default()
            }),
            Statement::Comment(comment) => Some(StripInfo {
                open: comment.strip.open,
                close: comment.strip.close,
                inline_standalone: true,
                ..StripInfo::default()
            }),
            Statement::Partial(partial) => Some(StripInfo {
                open: partial.strip.open,
                close: partial.strip.close,
                inline_standalone: true,
                ..StripInfo::default()
            }),
            Statement::Block(block) => Some(self.accept_block(block)),
            _ => None,
        }
    }

    fn accept_block(&mut self, block: &mut BlockStatement) -> StripInfo {
        self.accept_program(&mut block.program);
        if let Some(inverse) = &mut block.inverse {
            self.accept_program(inverse);
        }

        if block.open_strip.close {
            omit_right(&mut first_section_mut(block).body, None, true);
        }

        if block.inverse.is_some() {
            if block.inverse_strip.open {
                omit_left(&mut block.program.body, None, true);
            }
            if block.inverse_strip.close {
                omit_right(&mut block.inverse.as_mut().unwrap().body, None, true);
            }
            if block.close_strip.open {
                omit_left(&mut block.inverse.as_mut().unwrap().body, None, true);
            }

            // A standalone {{else}} strips its own line
            let standalone_else = is_prev_whitespace(&block.program.body, None, false)
                && is_next_whitespace(&block.inverse.as_ref().unwrap().body, None, false);
            if standalone_else {
                omit_left(&mut block.program.body, None, false);
                omit_right(&mut block.inverse.as_mut().unwrap().body, None, false);
            }
        } else if block.close_strip.open {
            omit_left(&mut block.program.body, None, true);
        }

        StripInfo {
            open: block.open_strip.open,
            close: block.close_strip.close,
            open_standalone: is_next_whitespace(&first_section(block).body, None, false),
            close_standalone: is_prev_whitespace(&last_section(block).body, None, false),
            inline_standalone: false,
        }
    }
}

/// The section rendered first: the program, or the inverse for `{{^x}}` blocks
fn first_section(block: &BlockStatement) -> &Program {
    match &block.inverse {
        Some(inverse) if block.program.body.is_empty() => inverse,
        _ => &block.program,
    }
}

fn first_section_mut(block: &mut BlockStatement) -> &mut Program {
    if block.program.body.is_empty() && block.inverse.is_some() {
        block.inverse.as_mut().unwrap()
    } else {
        &mut block.program
    }
}

fn last_section(block: &BlockStatement) -> &Program {
    block.inverse.as_ref().unwrap_or(&block.program)
}

fn last_section_mut(block: &mut BlockStatement) -> &mut Program {
    if block.inverse.is_some() {
        block.inverse.as_mut().unwrap()
    } else {
        &mut block.program
    }
}

/// Does the statement before `i` end on a line of its own?
fn is_prev_whitespace(body: &[Statement], i: Option<usize>, is_root: bool) -> bool {
    let i = i.unwrap_or(body.len());
    if i == 0 {
        return is_root;
    }
    let has_sibling = i >= 2;
    let Statement::Content(content) = &body[i - 1] else {
        return false;
    };
    let original = content.original.as_str();
    if has_sibling || !is_root {
        ends_with_newline_then_ws(original)
    } else {
        all_whitespace(original) || ends_with_newline_then_ws(original)
    }
}

/// Does the statement after `i` start on a fresh line?
fn is_next_whitespace(body: &[Statement], i: Option<usize>, is_root: bool) -> bool {
    let next_index = match i {
        Some(i) => i + 1,
        None => 0,
    };
    if next_index >= body.len() {
        return is_root;
    }
    let has_sibling = next_index + 1 < body.len();
    let Statement::Content(content) = &body[next_index] else {
        return false;
    };
    let original = content.original.as_str();
    if has_sibling || !is_root {
        starts_with_ws_then_newline(original)
    } else {
        all_whitespace(original) || starts_with_ws_then_newline(original)
    }
}

/// Strip whitespace at the start of the content after `i` (the whole run for
/// `multiple`, otherwise one line's worth).
fn omit_right(body: &mut [Statement], i: Option<usize>, multiple: bool) {
    let index = match i {
        Some(i) => i + 1,
        None => 0,
    };
    let Some(Statement::Content(content)) = body.get_mut(index) else {
        return;
    };
    if !multiple && content.right_stripped {
        return;
    }
    let before = content.value.clone();
    content.value = if multiple {
        content.value.trim_start().into()
    } else {
        strip_leading_line(&content.value).into()
    };
    content.right_stripped = content.value != before;
}

/// Strip whitespace at the end of the content before `i`. Returns whether
/// anything was removed.
fn omit_left(body: &mut [Statement], i: Option<usize>, multiple: bool) -> bool {
    let index = match i {
        Some(0) => return false,
        Some(i) => i - 1,
        None => match body.len() {
            0 => return false,
            len => len - 1,
        },
    };
    let Some(Statement::Content(content)) = body.get_mut(index) else {
        return false;
    };
    if !multiple && content.left_stripped {
        return false;
    }
    let before = content.value.clone();
    content.value = if multiple {
        content.value.trim_end().into()
    } else {
        content
            .value
            .trim_end_matches([' ', '\t'])
            .into()
    };
    content.left_stripped = content.value != before;
    content.left_stripped
}

fn trailing_indent(statement: &Statement) -> Option<compact_str::CompactString> {
    let Statement::Content(content) = statement else {
        return None;
    };
    let original = content.original.as_str();
    let trimmed = original.trim_end_matches([' ', '\t']);
    if trimmed.len() < original.len() {
        Some(original[trimmed.len()..].into())
    } else {
        None
    }
}

fn all_whitespace(s: &str) -> bool {
    s.chars().all(char::is_whitespace)
}

fn ends_with_newline_then_ws(s: &str) -> bool {
    match s.rfind('\n') {
        Some(index) => s[index + 1..].chars().all(char::is_whitespace),
        None => false,
    }
}

fn starts_with_ws_then_newline(s: &str) -> bool {
    match s.find('\n') {
        Some(index) => s[..index].chars().all(char::is_whitespace),
        None => false,
    }
}

/// Remove leading spaces/tabs and at most one newline
fn strip_leading_line(s: &str) -> &str {
    let rest = s.trim_start_matches([' ', '\t']);
    let rest = rest.strip_prefix("\r\n").or_else(|| rest.strip_prefix('\n'));
    match rest {
        Some(rest) => rest,
        None => s.trim_start_matches([' ', '\t']),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar;
    use gossamer_ast::ast::Statement;

    fn stripped(src: &str) -> Program {
        let mut program = grammar::parse(src).expect("parse error");
        WhitespaceControl::new().strip(&mut program);
        program
    }

    fn content_values(program: &Program) -> Vec<&str> {
        program
            .body
            .iter()
            .filter_map(|s| match s {
                Statement::Content(c) => Some(c.value.as_str()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn standalone_block_lines_are_stripped() {
        let program = stripped("  {{#if x}}\n  foo\n  {{/if}}\n");
        assert_eq!(content_values(&program), vec!["", ""]);
        let Statement::Block(block) = &program.body[1] else {
            panic!("expected block");
        };
        assert_eq!(content_values(&block.program), vec!["  foo\n"]);
    }

    #[test]
    fn inline_mustache_keeps_whitespace() {
        let program = stripped("  {{name}}\n");
        assert_eq!(content_values(&program), vec!["  ", "\n"]);
    }

    #[test]
    fn explicit_strip_markers() {
        let program = stripped("a  {{~name~}}  b");
        assert_eq!(content_values(&program), vec!["a", "b"]);
    }

    #[test]
    fn standalone_comment_is_stripped() {
        let program = stripped("a\n  {{! note }}\nb");
        assert_eq!(content_values(&program), vec!["a\n", "b"]);
    }

    #[test]
    fn standalone_else_is_stripped() {
        let program = stripped("{{#if x}}\n  yes\n{{else}}\n  no\n{{/if}}");
        let Statement::Block(block) = &program.body[0] else {
            panic!("expected block");
        };
        assert_eq!(content_values(&block.program), vec!["  yes\n"]);
        assert_eq!(
            content_values(block.inverse.as_ref().unwrap()),
            vec!["  no\n"]
        );
    }

    #[test]
    fn standalone_partial_records_indent() {
        let program = stripped("a\n  {{> item}}\nb");
        let Statement::Partial(partial) = &program.body[1] else {
            panic!("expected partial");
        };
        assert_eq!(partial.indent, "  ");
    }
}
