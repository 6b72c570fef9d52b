//! AST plugin pipeline.
//!
//! Plugins run in registration order after parsing, each receiving the
//! unified AST; the syntax toolkit is `gossamer_ast`'s `Walker` and
//! `builders`. A plugin must return a valid AST (usually the same tree,
//! mutated in place).

use gossamer_ast::ast::*;
use gossamer_ast::builders as b;
use gossamer_ast::errors::{CompilerError, ErrorCode};
use gossamer_ast::Walker;

pub trait AstPlugin {
    fn transform(
        &mut self,
        program: Program,
        ctx: &mut PluginContext<'_>,
    ) -> Result<Program, CompilerError>;
}

/// Context handed to each plugin invocation.
pub struct PluginContext<'a> {
    pub warnings: &'a mut Vec<CompilerError>,
}

pub type PluginFactory = fn() -> Box<dyn AstPlugin>;

/// The plugins registered by default, in execution order.
pub fn builtin_plugins() -> Vec<PluginFactory> {
    vec![each_in_factory, with_as_factory]
}

fn each_in_factory() -> Box<dyn AstPlugin> {
    Box::new(TransformEachInToHash)
}

fn with_as_factory() -> Box<dyn AstPlugin> {
    Box::new(TransformWithAsToBlockParams)
}

/// Rewrites `{{#each item in items}}` to `{{#each items keyword="item"}}`.
/// Combining the keyword form with block params is a hard error.
pub struct TransformEachInToHash;

impl AstPlugin for TransformEachInToHash {
    fn transform(
        &mut self,
        mut program: Program,
        _ctx: &mut PluginContext<'_>,
    ) -> Result<Program, CompilerError> {
        let mut error = None;
        Walker::new().visit(&mut program, &mut |node| {
            if error.is_some() {
                return;
            }
            let Statement::Block(block) = node else {
                return;
            };
            if !is_each_in(&block.sexpr) {
                return;
            }
            if !block.program.block_params.is_empty() {
                error = Some(CompilerError::at(
                    ErrorCode::KeywordAndBlockParams,
                    "you cannot use keyword (`{{#each foo in bar}}`) and block params (`{{#each bar as |foo|}}`) at the same time",
                    block.loc,
                ));
                return;
            }

            let Expression::Path(keyword_path) = &block.sexpr.params[0] else {
                return;
            };
            let keyword = keyword_path.original.clone();
            let source = block.sexpr.params.pop().unwrap();
            block.sexpr.params.clear();
            block.sexpr.params.push(source);
            block
                .sexpr
                .hash
                .pairs
                .push(b::pair("keyword", Expression::String(StringLiteral {
                    value: keyword,
                    loc: block.sexpr.loc,
                })));
        });
        match error {
            Some(error) => Err(error),
            None => Ok(program),
        }
    }
}

fn is_each_in(sexpr: &SubExpression) -> bool {
    sexpr.path.original == "each"
        && sexpr.params.len() == 3
        && matches!(&sexpr.params[1], Expression::Path(p) if p.original == "in")
        && matches!(&sexpr.params[0], Expression::Path(_))
}

/// Rewrites the legacy `{{#with foo as bar}}` form to block-params form
/// `{{#with foo as |bar|}}`, emitting a deprecation notice.
pub struct TransformWithAsToBlockParams;

impl AstPlugin for TransformWithAsToBlockParams {
    fn transform(
        &mut self,
        mut program: Program,
        ctx: &mut PluginContext<'_>,
    ) -> Result<Program, CompilerError> {
        let mut deprecations = 0usize;
        Walker::new().visit(&mut program, &mut |node| {
            let Statement::Block(block) = node else {
                return;
            };
            let sexpr = &block.sexpr;
            let is_with_as = sexpr.path.original == "with"
                && sexpr.params.len() == 3
                && matches!(&sexpr.params[1], Expression::Path(p) if p.original == "as")
                && matches!(&sexpr.params[2], Expression::Path(_));
            if !is_with_as {
                return;
            }

            let Expression::Path(binding) = &block.sexpr.params[2] else {
                return;
            };
            let binding = binding.original.clone();
            block.sexpr.params.truncate(1);
            block.program.block_params = vec![binding];
            deprecations += 1;
        });
        for _ in 0..deprecations {
            ctx.warnings.push(CompilerError::new(
                ErrorCode::Deprecated,
                "Using {{#with foo as bar}} is deprecated, use {{#with foo as |bar|}} instead",
            ));
        }
        Ok(program)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gossamer_ast::options::ParserOptions;

    fn run_plugin(
        plugin: &mut dyn AstPlugin,
        src: &str,
    ) -> Result<(Program, Vec<CompilerError>), CompilerError> {
        let program = gossamer_syntax::parse(src, &ParserOptions::default()).expect("parse");
        let mut warnings = Vec::new();
        let mut ctx = PluginContext {
            warnings: &mut warnings,
        };
        let program = plugin.transform(program, &mut ctx)?;
        Ok((program, warnings))
    }

    #[test]
    fn each_in_rewrites_to_keyword_hash() {
        let (program, _) =
            run_plugin(&mut TransformEachInToHash, "{{#each item in items}}{{item}}{{/each}}")
                .unwrap();
        let Statement::Block(block) = &program.body[0] else {
            panic!("expected block");
        };
        assert_eq!(block.sexpr.params.len(), 1);
        assert!(
            matches!(&block.sexpr.params[0], Expression::Path(p) if p.original == "items")
        );
        assert_eq!(block.sexpr.hash.pairs.len(), 1);
        assert_eq!(block.sexpr.hash.pairs[0].key, "keyword");
        assert!(matches!(
            &block.sexpr.hash.pairs[0].value,
            Expression::String(s) if s.value == "item"
        ));
    }

    #[test]
    fn each_in_with_block_params_is_fatal() {
        let err = run_plugin(
            &mut TransformEachInToHash,
            "{{#each item in items as |x|}}{{x}}{{/each}}",
        )
        .unwrap_err();
        assert_eq!(err.code, ErrorCode::KeywordAndBlockParams);
    }

    #[test]
    fn plain_each_untouched() {
        let (program, _) =
            run_plugin(&mut TransformEachInToHash, "{{#each items}}{{this}}{{/each}}").unwrap();
        let Statement::Block(block) = &program.body[0] else {
            panic!("expected block");
        };
        assert_eq!(block.sexpr.params.len(), 1);
        assert!(block.sexpr.hash.pairs.is_empty());
    }

    #[test]
    fn with_as_rewrites_to_block_params() {
        let (program, warnings) = run_plugin(
            &mut TransformWithAsToBlockParams,
            "{{#with user as u}}{{u.name}}{{/with}}",
        )
        .unwrap();
        let Statement::Block(block) = &program.body[0] else {
            panic!("expected block");
        };
        assert_eq!(block.sexpr.params.len(), 1);
        assert_eq!(block.program.block_params, vec!["u"]);
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].code, ErrorCode::Deprecated);
    }

    #[test]
    fn rewrites_nested_blocks() {
        let (program, _) = run_plugin(
            &mut TransformEachInToHash,
            "<ul>{{#if ok}}{{#each item in items}}{{item}}{{/each}}{{/if}}</ul>",
        )
        .unwrap();
        let Statement::Element(ul) = &program.body[0] else {
            panic!("expected element");
        };
        let Statement::Block(if_block) = &ul.children[0] else {
            panic!("expected if block");
        };
        let Statement::Block(each_block) = &if_block.program.body[0] else {
            panic!("expected each block");
        };
        assert_eq!(each_block.sexpr.hash.pairs[0].key, "keyword");
    }
}
