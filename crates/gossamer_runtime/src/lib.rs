//! Template runtime.
//!
//! Executes compiled templates: the fragment executor interprets the static
//! DOM opcodes against a `Dom` implementation, the hydration executor wires
//! morphs and calls the runtime hooks, and the `Template` record ties both
//! together with fragment caching.

pub mod dom;
pub mod env;
pub mod hooks;
pub mod morph;
pub mod simple_dom;
pub mod template;

pub use dom::{Dom, NodeId};
pub use env::{BlockTemplates, Env, Helper, HelperOptions, HelperResult, Hooks};
pub use morph::{AttrMorph, Morph};
pub use simple_dom::SimpleDom;
pub use template::Template;

/// The opaque context/value model threaded through hooks and helpers.
pub type Value = serde_json::Value;

/// An ordered hash of evaluated values (document order is significant for
/// component attributes).
pub type ValueMap = Vec<(compact_str::CompactString, Value)>;
