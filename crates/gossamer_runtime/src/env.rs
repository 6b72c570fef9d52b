//! Render environment.
//!
//! `Env` carries the DOM implementation, the hook table, and the helper and
//! partial registries. Hooks are plain function pointers defaulting to the
//! implementations in [`crate::hooks`], so an embedder can swap individual
//! hooks without reimplementing the rest.

use compact_str::CompactString;
use gossamer_compiler::CompiledTemplate;
use rustc_hash::FxHashMap;

use crate::dom::{Dom, NodeId};
use crate::morph::{AttrMorph, Morph};
use crate::template::Template;
use crate::{hooks, Value, ValueMap};

pub struct Env<'d> {
    pub dom: &'d mut dyn Dom,
    pub hooks: Hooks,
    pub helpers: FxHashMap<CompactString, Helper>,
    pub partials: FxHashMap<CompactString, CompiledTemplate>,
    pub use_fragment_cache: bool,
}

impl<'d> Env<'d> {
    pub fn new(dom: &'d mut dyn Dom) -> Self {
        Self {
            dom,
            hooks: Hooks::default(),
            helpers: FxHashMap::default(),
            partials: FxHashMap::default(),
            use_fragment_cache: true,
        }
    }

    pub fn register_helper(&mut self, name: &str, helper: Helper) {
        self.helpers.insert(name.into(), helper);
    }

    pub fn register_partial(&mut self, name: &str, compiled: CompiledTemplate) {
        self.partials.insert(name.into(), compiled);
    }
}

/// The hook table the hydration executor calls into.
pub struct Hooks {
    pub get: fn(&mut Env<'_>, &Value, &str) -> Value,
    pub set: fn(&mut Env<'_>, &mut Value, &str, Value),
    pub subexpr: fn(&mut Env<'_>, &mut Value, &str, &[Value], &ValueMap) -> Value,
    pub concat: fn(&mut Env<'_>, &[Value]) -> Value,
    pub content: fn(&mut Env<'_>, &mut Morph, &mut Value, &str, NodeId),
    pub inline: fn(&mut Env<'_>, &mut Morph, &mut Value, &str, &[Value], &ValueMap, NodeId),
    #[allow(clippy::type_complexity)]
    pub block: fn(
        &mut Env<'_>,
        &mut Morph,
        &mut Value,
        &str,
        &[Value],
        &ValueMap,
        BlockTemplates<'_>,
        NodeId,
    ),
    #[allow(clippy::type_complexity)]
    pub component:
        fn(&mut Env<'_>, &mut Morph, &mut Value, &str, &ValueMap, Option<&mut Template>, NodeId),
    pub element: fn(&mut Env<'_>, NodeId, &mut Value, &str, &[Value], &ValueMap),
    pub attribute: fn(&mut Env<'_>, &AttrMorph, &Value),
    pub partial: fn(&mut Env<'_>, &mut Morph, &mut Value, &str, NodeId),
}

impl Default for Hooks {
    fn default() -> Self {
        Self {
            get: hooks::get,
            set: hooks::set,
            subexpr: hooks::subexpr,
            concat: hooks::concat,
            content: hooks::content,
            inline: hooks::inline,
            block: hooks::block,
            component: hooks::component,
            element: hooks::element,
            attribute: hooks::attribute,
            partial: hooks::partial,
        }
    }
}

/// The block/inverse templates handed to the block hook.
pub struct BlockTemplates<'t> {
    pub template: Option<&'t mut Template>,
    pub inverse: Option<&'t mut Template>,
}

/// A helper: `(params, hash, options, env)`.
pub type Helper = fn(&[Value], &ValueMap, &mut HelperOptions<'_, '_>, &mut Env<'_>) -> HelperResult;

/// Invocation context handed to helpers.
pub struct HelperOptions<'t, 'v> {
    pub template: Option<&'t mut Template>,
    pub inverse: Option<&'t mut Template>,
    pub context: Option<&'v mut Value>,
    pub contextual_element: NodeId,
}

pub enum HelperResult {
    Value(Value),
    Fragment(NodeId),
    None,
}
