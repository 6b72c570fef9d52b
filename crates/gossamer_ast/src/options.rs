//! Parser options.

use crate::errors::CompilerError;

/// Options consumed by the syntax crate's `parse` entry point.
#[derive(Debug, Clone, Copy)]
pub struct ParserOptions {
    /// When true, hyphenated tags stay plain elements instead of becoming
    /// `ComponentNode`s.
    pub disable_component_generation: bool,
    /// Warning handler for non-fatal notices
    pub on_warn: Option<fn(&CompilerError)>,
}

impl Default for ParserOptions {
    fn default() -> Self {
        Self {
            disable_component_generation: false,
            on_warn: None,
        }
    }
}
