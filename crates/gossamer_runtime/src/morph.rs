//! Morphs: runtime-attached binding handles.
//!
//! A morph marks one content range (or one attribute) as dynamically
//! updatable. Content morphs capture node identities rather than indices at
//! creation time, so setting an earlier sibling morph's content cannot skew
//! a later one.

use compact_str::CompactString;

use crate::dom::{Dom, NodeId};
use crate::hooks::value_to_string;
use crate::Value;

/// A content-binding site covering the sibling range [first, last].
#[derive(Debug, Clone)]
pub struct Morph {
    pub parent: NodeId,
    pub first: NodeId,
    pub last: NodeId,
    /// When false, string content is inserted as raw HTML.
    pub escaped: bool,
    pub contextual_element: Option<NodeId>,
}

impl Morph {
    /// Replace the morph's range with a single node (or a fragment, whose
    /// children are spliced in).
    pub fn set_node(&mut self, dom: &mut dyn Dom, node: NodeId) {
        let (first, last) = dom.replace_range(self.parent, self.first, self.last, node);
        self.first = first;
        self.last = last;
    }

    pub fn set_value(&mut self, dom: &mut dyn Dom, value: &Value) {
        let text = value_to_string(value);
        let node = if self.escaped {
            dom.create_text_node(&text)
        } else {
            dom.create_raw_html_node(&text)
        };
        self.set_node(dom, node);
    }

    pub fn set_fragment(&mut self, dom: &mut dyn Dom, fragment: NodeId) {
        self.set_node(dom, fragment);
    }

    pub fn clear(&mut self, dom: &mut dyn Dom) {
        let empty = dom.create_text_node("");
        self.set_node(dom, empty);
    }
}

/// An attribute-binding site.
#[derive(Debug, Clone)]
pub struct AttrMorph {
    pub element: NodeId,
    pub name: CompactString,
    pub namespace: Option<CompactString>,
    pub escaped: bool,
}

impl AttrMorph {
    pub fn set_value(&self, dom: &mut dyn Dom, value: &Value) {
        let text = value_to_string(value);
        match &self.namespace {
            Some(namespace) => dom.set_attribute_ns(self.element, namespace, &self.name, &text),
            None => dom.set_attribute(self.element, &self.name, &text),
        }
    }
}
