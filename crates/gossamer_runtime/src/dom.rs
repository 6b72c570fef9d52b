//! DOM abstraction consumed by the executors.
//!
//! The trait mirrors the calls compiled templates issue: node construction,
//! attribute application, namespace switching, cloning, child-index lookup,
//! morph construction, cloned-node repair and boundary insertion. Nodes are
//! referred to by opaque ids so implementations can back them however they
//! like.

use gossamer_ast::ast::Namespace;

use crate::morph::{AttrMorph, Morph};

/// Opaque node handle.
pub type NodeId = usize;

pub trait Dom {
    fn create_document_fragment(&mut self) -> NodeId;
    fn create_element(&mut self, tag: &str) -> NodeId;
    fn create_text_node(&mut self, text: &str) -> NodeId;
    /// A node whose contents are emitted verbatim; used by unsafe morphs.
    fn create_raw_html_node(&mut self, html: &str) -> NodeId;
    fn create_comment(&mut self, text: &str) -> NodeId;

    fn set_attribute(&mut self, element: NodeId, name: &str, value: &str);
    fn set_attribute_ns(&mut self, element: NodeId, namespace: &str, name: &str, value: &str);

    /// Namespace for subsequently created elements; `None` is HTML.
    fn set_namespace(&mut self, namespace: Option<Namespace>);
    /// Adopt the namespace of the element a fragment will be inserted into.
    fn detect_namespace(&mut self, contextual_element: NodeId);

    fn append_child(&mut self, parent: NodeId, child: NodeId);
    fn child_count(&self, node: NodeId) -> usize;
    fn child_node_at(&self, parent: NodeId, index: usize) -> NodeId;
    fn index_of_child(&self, parent: NodeId, child: NodeId) -> Option<usize>;

    /// Resolve a child-index path from a root node.
    fn child_at(&self, node: NodeId, path: &[usize]) -> NodeId {
        path.iter()
            .fold(node, |current, &index| self.child_node_at(current, index))
    }

    fn can_clone(&self) -> bool;
    fn clone_node(&mut self, node: NodeId, deep: bool) -> NodeId;

    /// Replace the sibling range [first, last] under `parent` with the given
    /// node (a fragment's children are spliced in). Returns the new first
    /// and last nodes of the range.
    fn replace_range(
        &mut self,
        parent: NodeId,
        first: NodeId,
        last: NodeId,
        replacement: NodeId,
    ) -> (NodeId, NodeId);

    /// Recreate blank text nodes that a clone may have dropped.
    fn repair_cloned_node(
        &mut self,
        parent: NodeId,
        blank_indices: &[usize],
        is_element_checked: bool,
    );

    /// Mark an un-clonable boundary position with an empty text node;
    /// `None` means the end of the fragment.
    fn insert_boundary(&mut self, fragment: NodeId, index: Option<usize>);

    fn create_morph_at(
        &self,
        parent: NodeId,
        start: usize,
        end: usize,
        contextual_element: Option<NodeId>,
    ) -> Morph {
        Morph {
            parent,
            first: self.child_node_at(parent, start),
            last: self.child_node_at(parent, end),
            escaped: true,
            contextual_element,
        }
    }

    fn create_unsafe_morph_at(
        &self,
        parent: NodeId,
        start: usize,
        end: usize,
        contextual_element: Option<NodeId>,
    ) -> Morph {
        Morph {
            escaped: false,
            ..self.create_morph_at(parent, start, end, contextual_element)
        }
    }

    fn create_attr_morph(
        &self,
        element: NodeId,
        name: &str,
        namespace: Option<&str>,
    ) -> AttrMorph {
        AttrMorph {
            element,
            name: name.into(),
            namespace: namespace.map(Into::into),
            escaped: true,
        }
    }

    fn create_unsafe_attr_morph(
        &self,
        element: NodeId,
        name: &str,
        namespace: Option<&str>,
    ) -> AttrMorph {
        AttrMorph {
            escaped: false,
            ..self.create_attr_morph(element, name, namespace)
        }
    }
}
