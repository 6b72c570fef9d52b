//! Template compiler.
//!
//! Runs one visitor pass over the whole AST, then processes each
//! `StartProgram`/`EndProgram` run (innermost first, as the visitor orders
//! them) through both opcode compilers. Completed child templates stack up
//! and are popped by their parent's `StartProgram` child count, so a block's
//! `template`/`inverse` ids index into `children` in document order.

use compact_str::CompactString;
use gossamer_ast::errors::{CompilerError, ErrorCode};
use gossamer_ast::Program;
use serde::{Deserialize, Serialize};

use crate::fragment::{FragmentOpcode, FragmentOpcodeCompiler};
use crate::hydration::{HydrationOpcode, HydrationOpcodeCompiler};
use crate::options::CompilerOptions;
use crate::visitor::{Action, TemplateVisitor};

/// The compiled, serializable form of one template level. This record (JSON
/// encoded) is the precompile wire format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompiledTemplate {
    pub revision: CompactString,
    /// Block parameter names introduced by the enclosing block
    pub block_params: Vec<CompactString>,
    pub fragment: Vec<FragmentOpcode>,
    pub hydration: Vec<HydrationOpcode>,
    /// Nested block/component templates, in document order
    pub children: Vec<CompiledTemplate>,
}

impl CompiledTemplate {
    /// Parse a serialized template spec back into the record.
    pub fn from_spec(spec: &str) -> Result<Self, CompilerError> {
        serde_json::from_str(spec).map_err(|err| {
            CompilerError::new(
                ErrorCode::InvalidSpec,
                format!("invalid template spec: {err}"),
            )
        })
    }
}

/// Compile a merged, plugin-transformed program.
pub fn compile(
    program: &Program,
    options: &CompilerOptions,
) -> Result<CompiledTemplate, CompilerError> {
    let actions = TemplateVisitor::visit(program);

    let mut fragment_compiler = FragmentOpcodeCompiler::new();
    let mut hydration_compiler = HydrationOpcodeCompiler::new();
    let mut template_stack: Vec<CompiledTemplate> = Vec::new();
    let mut pending: Vec<(usize, Vec<CompactString>)> = Vec::new();

    for action in &actions {
        fragment_compiler.accept(action);
        hydration_compiler.accept(action);
        match action {
            Action::StartProgram {
                program,
                child_template_count,
                ..
            } => {
                pending.push((*child_template_count, program.block_params.clone()));
            }
            Action::EndProgram { .. } => {
                let (child_template_count, block_params) =
                    pending.pop().expect("unbalanced program actions");
                let fragment = fragment_compiler.finish();
                let hydration = hydration_compiler.finish();
                let mut children =
                    template_stack.split_off(template_stack.len() - child_template_count);
                children.reverse();
                template_stack.push(CompiledTemplate {
                    revision: options.revision.clone(),
                    block_params,
                    fragment,
                    hydration,
                    children,
                });
            }
            _ => {}
        }
    }

    let root = template_stack.pop().expect("no root template produced");
    debug_assert!(template_stack.is_empty());
    Ok(root)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compile_source;

    fn compile_ok(src: &str) -> CompiledTemplate {
        compile_source(src, &CompilerOptions::default()).expect("compile error")
    }

    #[test]
    fn leaf_template_has_no_children() {
        let template = compile_ok("<div>{{a}}</div>");
        assert!(template.children.is_empty());
        assert!(template.block_params.is_empty());
    }

    #[test]
    fn children_in_document_order() {
        let template = compile_ok("{{#if a}}{{one}}{{/if}}{{#if b}}{{two}}{{/if}}");
        assert_eq!(template.children.len(), 2);
        let first_print = &template.children[0].hydration;
        assert!(first_print.iter().any(|op| matches!(
            op,
            HydrationOpcode::PrintContentHook { path, .. } if path == "one"
        )));
        let second_print = &template.children[1].hydration;
        assert!(second_print.iter().any(|op| matches!(
            op,
            HydrationOpcode::PrintContentHook { path, .. } if path == "two"
        )));
    }

    #[test]
    fn inverse_template_follows_program() {
        let template = compile_ok("{{#if a}}{{yes}}{{else}}{{no}}{{/if}}");
        assert_eq!(template.children.len(), 2);
        assert!(template.children[0].hydration.iter().any(|op| matches!(
            op,
            HydrationOpcode::PrintContentHook { path, .. } if path == "yes"
        )));
        assert!(template.children[1].hydration.iter().any(|op| matches!(
            op,
            HydrationOpcode::PrintContentHook { path, .. } if path == "no"
        )));
    }

    #[test]
    fn deep_nesting_compiles_bottom_up() {
        let template = compile_ok("{{#if a}}{{#if b}}{{deep}}{{/if}}{{/if}}");
        assert_eq!(template.children.len(), 1);
        assert_eq!(template.children[0].children.len(), 1);
        let leaf = &template.children[0].children[0];
        assert!(leaf.children.is_empty());
        assert!(leaf.hydration.iter().any(|op| matches!(
            op,
            HydrationOpcode::PrintContentHook { path, .. } if path == "deep"
        )));
    }

    #[test]
    fn block_params_recorded_on_child() {
        let template = compile_ok("{{#each items as |item|}}{{item}}{{/each}}");
        assert_eq!(template.children[0].block_params, vec!["item"]);
    }

    #[test]
    fn revision_is_stamped() {
        let template = compile_ok("hi");
        assert!(template.revision.starts_with("gossamer@"));
    }

    #[test]
    fn spec_round_trips_through_json() {
        let template = compile_ok("<div class={{a}}>{{#if x}}y{{/if}}</div>");
        let spec = serde_json::to_string(&template).unwrap();
        let restored = CompiledTemplate::from_spec(&spec).unwrap();
        assert_eq!(template, restored);
    }

    #[test]
    fn component_child_template() {
        let template = compile_ok("<x-card title={{t}}>{{body}}</x-card>");
        assert_eq!(template.children.len(), 1);
        assert!(template.children[0].hydration.iter().any(|op| matches!(
            op,
            HydrationOpcode::PrintContentHook { path, .. } if path == "body"
        )));
    }

    #[test]
    fn each_in_compiles_like_keyword_form() {
        let rewritten = compile_ok("{{#each item in items}}{{item}}{{/each}}");
        let keyword = compile_ok("{{#each items keyword=\"item\"}}{{item}}{{/each}}");
        assert_eq!(rewritten.fragment, keyword.fragment);
        assert_eq!(rewritten.hydration, keyword.hydration);
        assert_eq!(rewritten.children, keyword.children);
    }
}
