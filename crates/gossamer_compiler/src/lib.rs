//! Template compilation.
//!
//! Drives the pipeline from source to a `CompiledTemplate`: parse + merge
//! (syntax crate), AST plugins, the template visitor's action list, and the
//! two opcode compilers that stay positionally synchronized against the same
//! DOM tree — one building the static fragment, one wiring hydration.

pub mod fragment;
pub mod hydration;
pub mod options;
pub mod plugins;
pub mod template;
pub mod visitor;

pub use fragment::FragmentOpcode;
pub use hydration::{ElementRef, HydrationOpcode, Literal};
pub use options::CompilerOptions;
pub use plugins::{AstPlugin, PluginContext, PluginFactory};
pub use template::CompiledTemplate;

use gossamer_ast::errors::CompilerError;
use gossamer_ast::options::ParserOptions;
use gossamer_ast::Program;

/// Parse, run AST plugins, and compile a template source into a
/// `CompiledTemplate` record.
pub fn compile_source(
    source: &str,
    options: &CompilerOptions,
) -> Result<CompiledTemplate, CompilerError> {
    let program = build_ast(source, options)?;
    template::compile(&program, options)
}

/// Parse and run AST plugins, returning the transformed AST.
pub fn build_ast(source: &str, options: &CompilerOptions) -> Result<Program, CompilerError> {
    let parser_options = ParserOptions {
        disable_component_generation: options.disable_component_generation,
        on_warn: options.on_warn,
    };
    let mut program = gossamer_syntax::parse(source, &parser_options)?;

    let mut warnings = Vec::new();
    for factory in &options.plugins.ast {
        let mut plugin = factory();
        let mut ctx = PluginContext {
            warnings: &mut warnings,
        };
        program = plugin.transform(program, &mut ctx)?;
    }
    if let Some(on_warn) = options.on_warn {
        for warning in &warnings {
            on_warn(warning);
        }
    }
    Ok(program)
}

/// Compile to the serialized spec form consumed by `template()` at load
/// time. The spec string is the JSON encoding of the compiled record.
pub fn precompile(source: &str, options: &CompilerOptions) -> Result<String, CompilerError> {
    let compiled = compile_source(source, options)?;
    serde_json::to_string(&compiled).map_err(|err| {
        CompilerError::new(
            gossamer_ast::errors::ErrorCode::InvalidSpec,
            format!("failed to serialize template spec: {err}"),
        )
    })
}
