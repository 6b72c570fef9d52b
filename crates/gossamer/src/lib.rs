//! gossamer: an HTML/mustache template compiler.
//!
//! A template string is lexed, parsed into an AST, transformed by pluggable
//! AST plugins, and lowered into two cooperating opcode streams: one that
//! builds a static DOM fragment, one that hydrates it by wiring live
//! bindings (morphs) to mustache, block and attribute positions. The
//! reassembled result is an executable [`Template`] exposing `build(dom)`
//! and `render(context, env, contextual_element, block_args)`.
//!
//! ```
//! use gossamer::{compile, CompilerOptions, Env, SimpleDom};
//! use serde_json::json;
//!
//! let mut template = compile("<p>hello {{name}}</p>", &CompilerOptions::default()).unwrap();
//! let mut dom = SimpleDom::new();
//! let body = dom.body();
//! let mut env = Env::new(&mut dom);
//! let mut context = json!({"name": "world"});
//! let fragment = template.render(&mut context, &mut env, body, &[]);
//! assert_eq!(dom.to_html(fragment), "<p>hello world</p>");
//! ```

pub use gossamer_ast::{ast, builders, CompilerError, ErrorCode, Walker};
pub use gossamer_compiler::{
    compile_source, AstPlugin, CompiledTemplate, CompilerOptions, ElementRef, FragmentOpcode,
    HydrationOpcode, PluginContext,
};
pub use gossamer_runtime::{
    hooks, AttrMorph, BlockTemplates, Dom, Env, Helper, HelperOptions, HelperResult, Hooks, Morph,
    NodeId, SimpleDom, Template, Value, ValueMap,
};
pub use gossamer_syntax::parse;

/// Compile a template into a serialized spec string for out-of-process
/// precompilation. Reconstitute it with [`template`].
pub fn precompile(source: &str, options: &CompilerOptions) -> Result<String, CompilerError> {
    gossamer_compiler::precompile(source, options)
}

/// Compile a template into a renderable [`Template`] object.
pub fn compile(source: &str, options: &CompilerOptions) -> Result<Template, CompilerError> {
    let compiled = gossamer_compiler::compile_source(source, options)?;
    Ok(Template::from_compiled(compiled))
}

/// Wrap a precompiled spec string as an executable [`Template`].
pub fn template(spec: &str) -> Result<Template, CompilerError> {
    let compiled = CompiledTemplate::from_spec(spec)?;
    Ok(Template::from_compiled(compiled))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compile_errors_propagate() {
        let err = compile("{{#foo}}{{/bar}}", &CompilerOptions::default()).unwrap_err();
        assert_eq!(err.code, ErrorCode::MismatchedBlock);
    }

    #[test]
    fn template_rejects_bad_specs() {
        let err = template("not json").unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidSpec);
    }
}
