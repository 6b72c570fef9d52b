//! Compiler options.

use compact_str::CompactString;
use gossamer_ast::errors::CompilerError;

use crate::plugins::{self, PluginFactory};

/// Options consumed by the compile entry points.
#[derive(Debug, Clone)]
pub struct CompilerOptions {
    /// Revision tag stamped into every compiled template record.
    pub revision: CompactString,
    /// When true, hyphenated tags stay plain elements.
    pub disable_component_generation: bool,
    /// Plugin registrations, run in list order after parsing.
    pub plugins: Plugins,
    /// Warning handler for non-fatal notices (deprecations).
    pub on_warn: Option<fn(&CompilerError)>,
}

#[derive(Debug, Clone)]
pub struct Plugins {
    pub ast: Vec<PluginFactory>,
}

impl Default for CompilerOptions {
    fn default() -> Self {
        Self {
            revision: CompactString::from(concat!("gossamer@", env!("CARGO_PKG_VERSION"))),
            disable_component_generation: false,
            plugins: Plugins {
                ast: plugins::builtin_plugins(),
            },
            on_warn: None,
        }
    }
}
