//! Fragment opcode compiler.
//!
//! Lowers the action list into "build static DOM" opcodes. Fragment
//! construction is append-only and tree shaped, so the compiler needs no
//! stack of its own beyond the namespace frames: each create pushes a node,
//! `AppendChild` attaches the top node to its parent. Dynamic content
//! positions materialize an empty comment so the built fragment has an
//! anchor at every morph location.

use compact_str::CompactString;
use gossamer_ast::ast::{AttrValue, ElementNode, Namespace};
use gossamer_syntax::tag_config::{attr_namespace, is_svg_integration_point};
use serde::{Deserialize, Serialize};

use crate::visitor::Action;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FragmentOpcode {
    CreateFragment,
    CreateElement {
        tag: CompactString,
    },
    CreateText {
        text: CompactString,
    },
    CreateComment {
        text: CompactString,
    },
    SetAttribute {
        name: CompactString,
        value: CompactString,
        namespace: Option<CompactString>,
    },
    /// Emitted only when the namespace changes; `None` is the HTML namespace.
    SetNamespace {
        namespace: Option<Namespace>,
    },
    AppendChild,
    ReturnNode,
}

#[derive(Debug, Default)]
pub struct FragmentOpcodeCompiler {
    opcodes: Vec<FragmentOpcode>,
    namespace_stack: Vec<Option<Namespace>>,
    /// Last namespace actually emitted; `None` means nothing emitted yet.
    emitted_namespace: Option<Option<Namespace>>,
}

impl FragmentOpcodeCompiler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn accept(&mut self, action: &Action<'_>) {
        match action {
            Action::StartProgram { .. } => self.start_program(),
            Action::EndProgram { .. } => self.opcodes.push(FragmentOpcode::ReturnNode),
            Action::Text { text, .. } => {
                self.opcodes.push(FragmentOpcode::CreateText {
                    text: text.chars.clone(),
                });
                self.opcodes.push(FragmentOpcode::AppendChild);
            }
            Action::Comment { comment, .. } => {
                self.opcodes.push(FragmentOpcode::CreateComment {
                    text: comment.value.clone(),
                });
                self.opcodes.push(FragmentOpcode::AppendChild);
            }
            // Anchor comment for every dynamic content position
            Action::Mustache { .. }
            | Action::Block { .. }
            | Action::Component { .. }
            | Action::Partial { .. } => {
                self.opcodes.push(FragmentOpcode::CreateComment {
                    text: CompactString::default(),
                });
                self.opcodes.push(FragmentOpcode::AppendChild);
            }
            Action::OpenElement { element, .. } => self.open_element(element),
            Action::CloseElement { element, .. } => self.close_element(element),
        }
    }

    /// Take the finished opcode program for the current template level.
    pub fn finish(&mut self) -> Vec<FragmentOpcode> {
        std::mem::take(&mut self.opcodes)
    }

    fn start_program(&mut self) {
        self.opcodes.clear();
        self.namespace_stack.clear();
        self.emitted_namespace = None;
        self.opcodes.push(FragmentOpcode::CreateFragment);
    }

    fn open_element(&mut self, element: &ElementNode) {
        match element.tag.as_str() {
            "svg" => self.namespace_stack.push(Some(Namespace::Svg)),
            "math" => self.namespace_stack.push(Some(Namespace::MathMl)),
            _ => {}
        }

        let current = self.namespace_stack.last().copied().unwrap_or(None);
        if self.emitted_namespace != Some(current) {
            self.opcodes.push(FragmentOpcode::SetNamespace {
                namespace: current,
            });
            self.emitted_namespace = Some(current);
        }

        self.opcodes.push(FragmentOpcode::CreateElement {
            tag: element.tag.clone(),
        });

        for attr in &element.attributes {
            if let AttrValue::Text(text) = &attr.value {
                self.opcodes.push(FragmentOpcode::SetAttribute {
                    name: attr.name.clone(),
                    value: text.chars.clone(),
                    namespace: attr_namespace(&attr.name).map(CompactString::from),
                });
            }
        }

        // Children of HTML integration points leave the foreign namespace
        if is_svg_integration_point(&element.tag) {
            self.namespace_stack.push(None);
        }
    }

    fn close_element(&mut self, element: &ElementNode) {
        if is_svg_integration_point(&element.tag) {
            self.namespace_stack.pop();
        }
        if matches!(element.tag.as_str(), "svg" | "math") {
            self.namespace_stack.pop();
        }
        self.opcodes.push(FragmentOpcode::AppendChild);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::visitor::TemplateVisitor;
    use gossamer_ast::options::ParserOptions;
    use gossamer_ast::Program;

    fn compile_root(src: &str) -> Vec<FragmentOpcode> {
        let program: Program =
            gossamer_syntax::parse(src, &ParserOptions::default()).expect("parse");
        let actions = TemplateVisitor::visit(&program);
        let mut compiler = FragmentOpcodeCompiler::new();
        let mut result = Vec::new();
        for action in &actions {
            compiler.accept(action);
            if matches!(action, Action::EndProgram { depth: 0, .. }) {
                result = compiler.finish();
            }
        }
        result
    }

    #[test]
    fn static_element_opcodes() {
        let opcodes = compile_root("<div id=\"a\">hi</div>");
        assert_eq!(
            opcodes,
            vec![
                FragmentOpcode::CreateFragment,
                FragmentOpcode::SetNamespace { namespace: None },
                FragmentOpcode::CreateElement { tag: "div".into() },
                FragmentOpcode::SetAttribute {
                    name: "id".into(),
                    value: "a".into(),
                    namespace: None,
                },
                FragmentOpcode::CreateText { text: "hi".into() },
                FragmentOpcode::AppendChild,
                FragmentOpcode::AppendChild,
                FragmentOpcode::ReturnNode,
            ]
        );
    }

    #[test]
    fn mustache_gets_anchor_comment() {
        let opcodes = compile_root("{{name}}");
        assert_eq!(
            opcodes,
            vec![
                FragmentOpcode::CreateFragment,
                FragmentOpcode::CreateComment { text: "".into() },
                FragmentOpcode::AppendChild,
                FragmentOpcode::ReturnNode,
            ]
        );
    }

    #[test]
    fn dynamic_attribute_is_not_static() {
        let opcodes = compile_root(r#"<div class="a {{b}} c"></div>"#);
        assert!(!opcodes
            .iter()
            .any(|op| matches!(op, FragmentOpcode::SetAttribute { .. })));
    }

    #[test]
    fn svg_namespace_transitions() {
        let opcodes = compile_root("<svg><foreignObject><div></div></foreignObject></svg>");
        let namespaces: Vec<&FragmentOpcode> = opcodes
            .iter()
            .filter(|op| matches!(op, FragmentOpcode::SetNamespace { .. }))
            .collect();
        assert_eq!(
            namespaces,
            vec![
                &FragmentOpcode::SetNamespace {
                    namespace: Some(Namespace::Svg)
                },
                &FragmentOpcode::SetNamespace { namespace: None },
            ]
        );
        // setNamespace(svg) must precede createElement(svg)
        let svg_ns_index = opcodes
            .iter()
            .position(|op| {
                matches!(
                    op,
                    FragmentOpcode::SetNamespace {
                        namespace: Some(Namespace::Svg)
                    }
                )
            })
            .unwrap();
        let svg_el_index = opcodes
            .iter()
            .position(|op| matches!(op, FragmentOpcode::CreateElement { tag } if tag == "svg"))
            .unwrap();
        assert!(svg_ns_index < svg_el_index);
    }

    #[test]
    fn no_redundant_namespace_between_same_namespace_siblings() {
        let opcodes = compile_root("<svg><circle></circle><rect></rect></svg>");
        let count = opcodes
            .iter()
            .filter(|op| matches!(op, FragmentOpcode::SetNamespace { .. }))
            .count();
        assert_eq!(count, 1);
    }

    #[test]
    fn xlink_attribute_namespace() {
        let opcodes = compile_root(r##"<svg><a xlink:href="#x"></a></svg>"##);
        assert!(opcodes.iter().any(|op| matches!(
            op,
            FragmentOpcode::SetAttribute { name, namespace: Some(ns), .. }
                if name == "xlink:href" && ns == "http://www.w3.org/1999/xlink"
        )));
    }
}
