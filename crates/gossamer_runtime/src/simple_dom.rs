//! Reference in-memory DOM.
//!
//! An id-indexed node arena implementing the `Dom` trait, with HTML
//! serialization for inspecting rendered output. Node 0 is a plain `body`
//! element usable as the default contextual element.

use compact_str::CompactString;
use gossamer_ast::ast::Namespace;
use gossamer_syntax::tag_config::is_void_tag;

use crate::dom::{Dom, NodeId};

#[derive(Debug, Clone)]
pub enum NodeKind {
    Fragment,
    Element {
        tag: CompactString,
        namespace: Option<Namespace>,
        attributes: Vec<(CompactString, CompactString)>,
    },
    Text(CompactString),
    RawHtml(CompactString),
    Comment(CompactString),
}

#[derive(Debug, Clone)]
struct NodeData {
    kind: NodeKind,
    children: Vec<NodeId>,
    parent: Option<NodeId>,
}

#[derive(Debug)]
pub struct SimpleDom {
    nodes: Vec<NodeData>,
    namespace: Option<Namespace>,
}

impl Default for SimpleDom {
    fn default() -> Self {
        Self::new()
    }
}

impl SimpleDom {
    pub fn new() -> Self {
        let mut dom = Self {
            nodes: Vec::new(),
            namespace: None,
        };
        // Node 0: default contextual element
        dom.alloc(NodeKind::Element {
            tag: "body".into(),
            namespace: None,
            attributes: Vec::new(),
        });
        dom
    }

    pub fn body(&self) -> NodeId {
        0
    }

    pub fn kind(&self, node: NodeId) -> &NodeKind {
        &self.nodes[node].kind
    }

    pub fn children(&self, node: NodeId) -> &[NodeId] {
        &self.nodes[node].children
    }

    pub fn attribute(&self, node: NodeId, name: &str) -> Option<&str> {
        match &self.nodes[node].kind {
            NodeKind::Element { attributes, .. } => attributes
                .iter()
                .find(|(n, _)| n == name)
                .map(|(_, v)| v.as_str()),
            _ => None,
        }
    }

    fn alloc(&mut self, kind: NodeKind) -> NodeId {
        self.nodes.push(NodeData {
            kind,
            children: Vec::new(),
            parent: None,
        });
        self.nodes.len() - 1
    }

    /// Serialize a node's contents to HTML (fragments serialize their
    /// children; elements serialize the full tag).
    pub fn to_html(&self, node: NodeId) -> String {
        let mut out = String::new();
        match &self.nodes[node].kind {
            NodeKind::Fragment => {
                for &child in &self.nodes[node].children {
                    out.push_str(&self.node_to_html(child));
                }
            }
            _ => out.push_str(&self.node_to_html(node)),
        }
        out
    }

    /// Serialize only an element's children.
    pub fn inner_html(&self, node: NodeId) -> String {
        let mut out = String::new();
        for &child in &self.nodes[node].children {
            out.push_str(&self.node_to_html(child));
        }
        out
    }

    fn node_to_html(&self, node: NodeId) -> String {
        match &self.nodes[node].kind {
            NodeKind::Fragment => self.inner_html(node),
            NodeKind::Text(text) => escape_text(text),
            NodeKind::RawHtml(html) => html.to_string(),
            NodeKind::Comment(text) => format!("<!--{text}-->"),
            NodeKind::Element {
                tag, attributes, ..
            } => {
                let mut out = String::new();
                out.push('<');
                out.push_str(tag);
                for (name, value) in attributes {
                    out.push(' ');
                    out.push_str(name);
                    out.push_str("=\"");
                    out.push_str(&escape_attribute(value));
                    out.push('"');
                }
                out.push('>');
                if is_void_tag(tag) {
                    return out;
                }
                out.push_str(&self.inner_html(node));
                out.push_str("</");
                out.push_str(tag);
                out.push('>');
                out
            }
        }
    }

    fn clone_subtree(&mut self, node: NodeId) -> NodeId {
        let kind = self.nodes[node].kind.clone();
        let children = self.nodes[node].children.clone();
        let copy = self.alloc(kind);
        for child in children {
            let child_copy = self.clone_subtree(child);
            self.nodes[child_copy].parent = Some(copy);
            self.nodes[copy].children.push(child_copy);
        }
        copy
    }
}

fn escape_text(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

fn escape_attribute(value: &str) -> String {
    value.replace('&', "&amp;").replace('"', "&quot;")
}

impl Dom for SimpleDom {
    fn create_document_fragment(&mut self) -> NodeId {
        self.alloc(NodeKind::Fragment)
    }

    fn create_element(&mut self, tag: &str) -> NodeId {
        let namespace = self.namespace;
        self.alloc(NodeKind::Element {
            tag: tag.into(),
            namespace,
            attributes: Vec::new(),
        })
    }

    fn create_text_node(&mut self, text: &str) -> NodeId {
        self.alloc(NodeKind::Text(text.into()))
    }

    fn create_raw_html_node(&mut self, html: &str) -> NodeId {
        self.alloc(NodeKind::RawHtml(html.into()))
    }

    fn create_comment(&mut self, text: &str) -> NodeId {
        self.alloc(NodeKind::Comment(text.into()))
    }

    fn set_attribute(&mut self, element: NodeId, name: &str, value: &str) {
        if let NodeKind::Element { attributes, .. } = &mut self.nodes[element].kind {
            if let Some(existing) = attributes.iter_mut().find(|(n, _)| n == name) {
                existing.1 = value.into();
            } else {
                attributes.push((name.into(), value.into()));
            }
        }
    }

    fn set_attribute_ns(&mut self, element: NodeId, _namespace: &str, name: &str, value: &str) {
        self.set_attribute(element, name, value);
    }

    fn set_namespace(&mut self, namespace: Option<Namespace>) {
        self.namespace = namespace;
    }

    fn detect_namespace(&mut self, contextual_element: NodeId) {
        self.namespace = match &self.nodes[contextual_element].kind {
            NodeKind::Element { namespace, .. } => *namespace,
            _ => None,
        };
    }

    fn append_child(&mut self, parent: NodeId, child: NodeId) {
        if matches!(self.nodes[child].kind, NodeKind::Fragment) {
            let children = std::mem::take(&mut self.nodes[child].children);
            for grandchild in children {
                self.nodes[grandchild].parent = Some(parent);
                self.nodes[parent].children.push(grandchild);
            }
        } else {
            self.nodes[child].parent = Some(parent);
            self.nodes[parent].children.push(child);
        }
    }

    fn child_count(&self, node: NodeId) -> usize {
        self.nodes[node].children.len()
    }

    fn child_node_at(&self, parent: NodeId, index: usize) -> NodeId {
        self.nodes[parent].children[index]
    }

    fn index_of_child(&self, parent: NodeId, child: NodeId) -> Option<usize> {
        self.nodes[parent].children.iter().position(|&c| c == child)
    }

    fn can_clone(&self) -> bool {
        true
    }

    fn clone_node(&mut self, node: NodeId, deep: bool) -> NodeId {
        if deep {
            self.clone_subtree(node)
        } else {
            let kind = self.nodes[node].kind.clone();
            self.alloc(kind)
        }
    }

    fn replace_range(
        &mut self,
        parent: NodeId,
        first: NodeId,
        last: NodeId,
        replacement: NodeId,
    ) -> (NodeId, NodeId) {
        let start = self
            .index_of_child(parent, first)
            .expect("morph first node not under parent");
        let end = self
            .index_of_child(parent, last)
            .expect("morph last node not under parent");

        let mut new_children = if matches!(self.nodes[replacement].kind, NodeKind::Fragment) {
            std::mem::take(&mut self.nodes[replacement].children)
        } else {
            vec![replacement]
        };
        if new_children.is_empty() {
            new_children.push(self.create_text_node(""));
        }
        for &child in &new_children {
            self.nodes[child].parent = Some(parent);
        }

        let new_first = *new_children.first().unwrap();
        let new_last = *new_children.last().unwrap();
        self.nodes[parent]
            .children
            .splice(start..=end, new_children);
        (new_first, new_last)
    }

    fn repair_cloned_node(
        &mut self,
        parent: NodeId,
        blank_indices: &[usize],
        _is_element_checked: bool,
    ) {
        for &index in blank_indices {
            let present = self.nodes[parent]
                .children
                .get(index)
                .map(|&child| matches!(&self.nodes[child].kind, NodeKind::Text(t) if t.is_empty()))
                .unwrap_or(false);
            if !present {
                let blank = self.create_text_node("");
                self.nodes[blank].parent = Some(parent);
                let insert_at = index.min(self.nodes[parent].children.len());
                self.nodes[parent].children.insert(insert_at, blank);
            }
        }
    }

    fn insert_boundary(&mut self, fragment: NodeId, index: Option<usize>) {
        let boundary = self.create_text_node("");
        self.nodes[boundary].parent = Some(fragment);
        match index {
            Some(index) => {
                let insert_at = index.min(self.nodes[fragment].children.len());
                self.nodes[fragment].children.insert(insert_at, boundary);
            }
            None => self.nodes[fragment].children.push(boundary),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_and_serialize() {
        let mut dom = SimpleDom::new();
        let fragment = dom.create_document_fragment();
        let div = dom.create_element("div");
        dom.set_attribute(div, "id", "x");
        let text = dom.create_text_node("a < b");
        dom.append_child(div, text);
        dom.append_child(fragment, div);
        assert_eq!(dom.to_html(fragment), "<div id=\"x\">a &lt; b</div>");
    }

    #[test]
    fn fragment_append_splices_children() {
        let mut dom = SimpleDom::new();
        let outer = dom.create_document_fragment();
        let inner = dom.create_document_fragment();
        let a = dom.create_text_node("a");
        let b = dom.create_text_node("b");
        dom.append_child(inner, a);
        dom.append_child(inner, b);
        dom.append_child(outer, inner);
        assert_eq!(dom.child_count(outer), 2);
        assert_eq!(dom.to_html(outer), "ab");
    }

    #[test]
    fn clone_is_deep_and_independent() {
        let mut dom = SimpleDom::new();
        let fragment = dom.create_document_fragment();
        let div = dom.create_element("div");
        dom.append_child(fragment, div);
        let copy = dom.clone_node(fragment, true);
        let extra = dom.create_text_node("x");
        let copied_div = dom.child_node_at(copy, 0);
        dom.append_child(copied_div, extra);
        assert_eq!(dom.to_html(fragment), "<div></div>");
        assert_eq!(dom.to_html(copy), "<div>x</div>");
    }

    #[test]
    fn replace_range_with_fragment() {
        let mut dom = SimpleDom::new();
        let parent = dom.create_element("p");
        let anchor = dom.create_comment("");
        dom.append_child(parent, anchor);
        let replacement = dom.create_document_fragment();
        let a = dom.create_text_node("a");
        let b = dom.create_text_node("b");
        dom.append_child(replacement, a);
        dom.append_child(replacement, b);
        let (first, last) = dom.replace_range(parent, anchor, anchor, replacement);
        assert_eq!((first, last), (a, b));
        assert_eq!(dom.to_html(parent), "<p>ab</p>");
    }

    #[test]
    fn repair_reinserts_missing_blank_text() {
        let mut dom = SimpleDom::new();
        let parent = dom.create_element("div");
        let text = dom.create_text_node("x");
        dom.append_child(parent, text);
        dom.repair_cloned_node(parent, &[0], false);
        assert_eq!(dom.child_count(parent), 2);
        assert!(matches!(
            dom.kind(dom.child_node_at(parent, 0)),
            NodeKind::Text(t) if t.is_empty()
        ));
    }

    #[test]
    fn void_elements_serialize_without_end_tag() {
        let mut dom = SimpleDom::new();
        let fragment = dom.create_document_fragment();
        let br = dom.create_element("br");
        dom.append_child(fragment, br);
        assert_eq!(dom.to_html(fragment), "<br>");
    }

    #[test]
    fn raw_html_is_verbatim() {
        let mut dom = SimpleDom::new();
        let fragment = dom.create_document_fragment();
        let raw = dom.create_raw_html_node("<b>bold</b>");
        dom.append_child(fragment, raw);
        assert_eq!(dom.to_html(fragment), "<b>bold</b>");
    }
}
