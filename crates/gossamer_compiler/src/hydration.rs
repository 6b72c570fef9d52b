//! Hydration opcode compiler.
//!
//! Lowers the same action list the fragment compiler consumes into "wire up
//! dynamic behavior" opcodes: expression-stack pushes for params/hash trees,
//! parent-path bookkeeping to locate nodes by DOM child index, morph
//! creation, and the print ops that invoke runtime hooks. Morph descriptors
//! buffer until the parent context is final and are then spliced in directly
//! after the most recent parent-context opcode, so every morph creation
//! precedes the prints that reference it.

use compact_str::CompactString;
use gossamer_ast::ast::*;
use gossamer_syntax::tag_config::attr_namespace;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::visitor::Action;

/// A reference to an element in the built fragment: an absolute child-index
/// path from the fragment root, or a previously shared element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ElementRef {
    Path(Vec<usize>),
    Shared(u16),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Literal {
    String(CompactString),
    Number(f64),
    Boolean(bool),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum HydrationOpcode {
    ConsumeParent {
        index: usize,
    },
    PopParent,
    ShareElement {
        element: u16,
    },
    /// Recreate blank text nodes that some DOM implementations drop when
    /// cloning; applied only to cloned fragments.
    RepairClonedNode {
        parent: ElementRef,
        blank_indices: Vec<usize>,
        is_element_checked: bool,
    },
    OpenBoundary,
    CloseBoundary,
    CreateMorph {
        morph: u16,
        parent: ElementRef,
        start: usize,
        end: usize,
        escaped: bool,
    },
    CreateAttrMorph {
        morph: u16,
        parent: ElementRef,
        name: CompactString,
        escaped: bool,
        namespace: Option<CompactString>,
    },
    PushLiteral {
        value: Literal,
    },
    PushGetHook {
        path: CompactString,
    },
    PushSexprHook {
        path: CompactString,
        param_count: u16,
        hash_keys: Vec<CompactString>,
    },
    PushConcatHook {
        count: u16,
    },
    PrintContentHook {
        morph: u16,
        path: CompactString,
    },
    PrintInlineHook {
        morph: u16,
        path: CompactString,
        param_count: u16,
        hash_keys: Vec<CompactString>,
    },
    PrintBlockHook {
        morph: u16,
        path: CompactString,
        param_count: u16,
        hash_keys: Vec<CompactString>,
        template: Option<u16>,
        inverse: Option<u16>,
    },
    PrintComponentHook {
        morph: u16,
        tag: CompactString,
        attr_keys: Vec<CompactString>,
        template: u16,
    },
    PrintPartialHook {
        morph: u16,
        name: CompactString,
    },
    PrintAttributeHook {
        morph: u16,
    },
    PrintElementHook {
        element: ElementRef,
        path: CompactString,
        param_count: u16,
        hash_keys: Vec<CompactString>,
    },
}

struct PendingMorph {
    morph: u16,
    parent: ElementRef,
    start: usize,
    end: usize,
    escaped: bool,
}

#[derive(Default)]
pub struct HydrationOpcodeCompiler {
    opcodes: Vec<HydrationOpcode>,
    paths: SmallVec<[usize; 8]>,
    saved_indices: SmallVec<[isize; 8]>,
    current_dom_index: isize,
    morphs: Vec<PendingMorph>,
    morph_num: u16,
    attr_morph_num: u16,
    element_num: u16,
    shared_element: Option<u16>,
    template_id: u16,
}

impl HydrationOpcodeCompiler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn accept(&mut self, action: &Action<'_>) {
        match action {
            Action::StartProgram {
                blank_child_text_nodes,
                ..
            } => self.start_program(blank_child_text_nodes),
            Action::EndProgram { .. } => self.distribute_morphs(),
            Action::Text { .. } | Action::Comment { .. } => {
                self.current_dom_index += 1;
            }
            Action::OpenElement {
                element,
                mustache_count,
                blank_child_text_nodes,
                ..
            } => self.open_element(element, *mustache_count, blank_child_text_nodes),
            Action::CloseElement { .. } => self.close_element(),
            Action::Mustache {
                mustache,
                child_index,
                child_count,
            } => self.mustache(mustache, *child_index, *child_count),
            Action::Block {
                block,
                child_index,
                child_count,
            } => self.block(block, *child_index, *child_count),
            Action::Component {
                component,
                child_index,
                child_count,
            } => self.component(component, *child_index, *child_count),
            Action::Partial {
                partial,
                child_index,
                child_count,
            } => self.partial(partial, *child_index, *child_count),
        }
    }

    /// Take the finished opcode program for the current template level and
    /// the number of child templates it references.
    pub fn finish(&mut self) -> Vec<HydrationOpcode> {
        std::mem::take(&mut self.opcodes)
    }

    fn start_program(&mut self, blank_child_text_nodes: &[usize]) {
        self.opcodes.clear();
        self.paths.clear();
        self.saved_indices.clear();
        self.current_dom_index = -1;
        self.morphs.clear();
        self.morph_num = 0;
        self.attr_morph_num = 0;
        self.element_num = 0;
        self.shared_element = None;
        self.template_id = 0;

        if !blank_child_text_nodes.is_empty() {
            self.opcodes.push(HydrationOpcode::RepairClonedNode {
                parent: ElementRef::Path(Vec::new()),
                blank_indices: blank_child_text_nodes.to_vec(),
                is_element_checked: false,
            });
        }
    }

    fn current_ref(&self) -> ElementRef {
        match self.shared_element {
            Some(element) => ElementRef::Shared(element),
            None => ElementRef::Path(self.paths.to_vec()),
        }
    }

    fn open_element(
        &mut self,
        element: &ElementNode,
        mustache_count: usize,
        blank_child_text_nodes: &[usize],
    ) {
        self.distribute_morphs();
        self.current_dom_index += 1;
        self.opcodes.push(HydrationOpcode::ConsumeParent {
            index: self.current_dom_index as usize,
        });
        self.paths.push(self.current_dom_index as usize);
        self.saved_indices.push(self.current_dom_index);
        self.current_dom_index = -1;
        self.shared_element = None;

        // Cache the element reference when it will be used more than once
        if mustache_count > 1 {
            let element_num = self.element_num;
            self.element_num += 1;
            self.opcodes
                .push(HydrationOpcode::ShareElement { element: element_num });
            self.shared_element = Some(element_num);
        }

        if !blank_child_text_nodes.is_empty() {
            let is_element_checked = element.attributes.iter().any(|attr| attr.name == "checked");
            let parent = self.current_ref();
            self.opcodes.push(HydrationOpcode::RepairClonedNode {
                parent,
                blank_indices: blank_child_text_nodes.to_vec(),
                is_element_checked,
            });
        }

        for attr in &element.attributes {
            if attr.is_dynamic() {
                self.attribute(attr);
            }
        }
        for modifier in &element.modifiers {
            self.element_modifier(modifier);
        }
    }

    fn close_element(&mut self) {
        self.distribute_morphs();
        self.opcodes.push(HydrationOpcode::PopParent);
        self.paths.pop();
        self.current_dom_index = self.saved_indices.pop().unwrap_or(-1);
        self.shared_element = None;
    }

    fn mustache(&mut self, mustache: &MustacheStatement, child_index: usize, child_count: usize) {
        let morph = self.register_content_morph(child_index, child_count, mustache.escaped);
        let sexpr = &mustache.sexpr;
        if sexpr.is_helper() {
            let (param_count, hash_keys) = self.prepare_args(sexpr);
            self.opcodes.push(HydrationOpcode::PrintInlineHook {
                morph,
                path: sexpr.path.original.clone(),
                param_count,
                hash_keys,
            });
        } else {
            self.opcodes.push(HydrationOpcode::PrintContentHook {
                morph,
                path: sexpr.path.original.clone(),
            });
        }
    }

    fn block(&mut self, block: &BlockStatement, child_index: usize, child_count: usize) {
        let morph = self.register_content_morph(child_index, child_count, true);
        let sexpr = &block.sexpr;
        let (param_count, hash_keys) = self.prepare_args(sexpr);
        let template = self.template_id;
        self.template_id += 1;
        let inverse = block.inverse.as_ref().map(|_| {
            let id = self.template_id;
            self.template_id += 1;
            id
        });
        self.opcodes.push(HydrationOpcode::PrintBlockHook {
            morph,
            path: sexpr.path.original.clone(),
            param_count,
            hash_keys,
            template: Some(template),
            inverse,
        });
    }

    fn component(&mut self, component: &ComponentNode, child_index: usize, child_count: usize) {
        let morph = self.register_content_morph(child_index, child_count, true);
        let mut attr_keys = Vec::with_capacity(component.attributes.len());
        for attr in &component.attributes {
            self.push_attr_value(&attr.value);
            attr_keys.push(attr.name.clone());
        }
        let template = self.template_id;
        self.template_id += 1;
        self.opcodes.push(HydrationOpcode::PrintComponentHook {
            morph,
            tag: component.tag.clone(),
            attr_keys,
            template,
        });
    }

    fn partial(&mut self, partial: &PartialStatement, child_index: usize, child_count: usize) {
        let morph = self.register_content_morph(child_index, child_count, true);
        self.opcodes.push(HydrationOpcode::PrintPartialHook {
            morph,
            name: partial.sexpr.path.original.clone(),
        });
    }

    /// Account for the anchor comment, emit root boundaries, and buffer a
    /// morph descriptor for the current dynamic position.
    fn register_content_morph(
        &mut self,
        child_index: usize,
        child_count: usize,
        escaped: bool,
    ) -> u16 {
        self.current_dom_index += 1;

        if self.paths.is_empty() {
            if child_index == 0 {
                self.opcodes.push(HydrationOpcode::OpenBoundary);
            }
            if child_index == child_count - 1 {
                self.opcodes.push(HydrationOpcode::CloseBoundary);
            }
        }

        let morph = self.morph_num;
        self.morph_num += 1;
        let index = self.current_dom_index as usize;
        let parent = self.current_ref();
        self.morphs.push(PendingMorph {
            morph,
            parent,
            start: index,
            end: index,
            escaped,
        });
        morph
    }

    fn attribute(&mut self, attr: &AttrNode) {
        let escaped = match &attr.value {
            AttrValue::Mustache(mustache) => {
                self.push_mustache_value(mustache);
                mustache.escaped
            }
            AttrValue::Concat(concat) => {
                for part in &concat.parts {
                    match part {
                        ConcatPart::Text(text) => {
                            self.opcodes.push(HydrationOpcode::PushLiteral {
                                value: Literal::String(text.chars.clone()),
                            });
                        }
                        ConcatPart::Mustache(mustache) => self.push_mustache_value(mustache),
                    }
                }
                self.opcodes.push(HydrationOpcode::PushConcatHook {
                    count: concat.parts.len() as u16,
                });
                true
            }
            AttrValue::Text(_) => return,
        };

        let morph = self.attr_morph_num;
        self.attr_morph_num += 1;
        let parent = self.current_ref();
        self.opcodes.push(HydrationOpcode::CreateAttrMorph {
            morph,
            parent,
            name: attr.name.clone(),
            escaped,
            namespace: attr_namespace(&attr.name).map(CompactString::from),
        });
        self.opcodes
            .push(HydrationOpcode::PrintAttributeHook { morph });
    }

    fn element_modifier(&mut self, sexpr: &SubExpression) {
        let (param_count, hash_keys) = self.prepare_args(sexpr);
        let element = self.current_ref();
        self.opcodes.push(HydrationOpcode::PrintElementHook {
            element,
            path: sexpr.path.original.clone(),
            param_count,
            hash_keys,
        });
    }

    /// Push params (in order) then hash values (in order); returns the
    /// counts/keys the consuming print op needs to pop them back off.
    fn prepare_args(&mut self, sexpr: &SubExpression) -> (u16, Vec<CompactString>) {
        for param in &sexpr.params {
            self.push_value(param);
        }
        let mut hash_keys = Vec::with_capacity(sexpr.hash.pairs.len());
        for pair in &sexpr.hash.pairs {
            self.push_value(&pair.value);
            hash_keys.push(pair.key.clone());
        }
        (sexpr.params.len() as u16, hash_keys)
    }

    fn push_value(&mut self, expr: &Expression) {
        match expr {
            Expression::Path(path) => self.opcodes.push(HydrationOpcode::PushGetHook {
                path: path.original.clone(),
            }),
            Expression::String(s) => self.opcodes.push(HydrationOpcode::PushLiteral {
                value: Literal::String(s.value.clone()),
            }),
            Expression::Number(n) => self.opcodes.push(HydrationOpcode::PushLiteral {
                value: Literal::Number(n.value),
            }),
            Expression::Boolean(b) => self.opcodes.push(HydrationOpcode::PushLiteral {
                value: Literal::Boolean(b.value),
            }),
            Expression::SubExpression(sexpr) => {
                let (param_count, hash_keys) = self.prepare_args(sexpr);
                self.opcodes.push(HydrationOpcode::PushSexprHook {
                    path: sexpr.path.original.clone(),
                    param_count,
                    hash_keys,
                });
            }
        }
    }

    /// A mustache used as a value (attribute or component hash) evaluates
    /// through the sexpr hook when it is a helper call, else a plain get.
    fn push_mustache_value(&mut self, mustache: &MustacheStatement) {
        let sexpr = &mustache.sexpr;
        if sexpr.is_helper() {
            let (param_count, hash_keys) = self.prepare_args(sexpr);
            self.opcodes.push(HydrationOpcode::PushSexprHook {
                path: sexpr.path.original.clone(),
                param_count,
                hash_keys,
            });
        } else {
            self.opcodes.push(HydrationOpcode::PushGetHook {
                path: sexpr.path.original.clone(),
            });
        }
    }

    fn push_attr_value(&mut self, value: &AttrValue) {
        match value {
            AttrValue::Text(text) => self.opcodes.push(HydrationOpcode::PushLiteral {
                value: Literal::String(text.chars.clone()),
            }),
            AttrValue::Mustache(mustache) => self.push_mustache_value(mustache),
            AttrValue::Concat(concat) => {
                for part in &concat.parts {
                    match part {
                        ConcatPart::Text(text) => {
                            self.opcodes.push(HydrationOpcode::PushLiteral {
                                value: Literal::String(text.chars.clone()),
                            });
                        }
                        ConcatPart::Mustache(mustache) => self.push_mustache_value(mustache),
                    }
                }
                self.opcodes.push(HydrationOpcode::PushConcatHook {
                    count: concat.parts.len() as u16,
                });
            }
        }
    }

    /// Flush buffered morph descriptors, splicing the creates directly after
    /// the most recent parent-context opcode so they precede any prints that
    /// reference them.
    fn distribute_morphs(&mut self) {
        if self.morphs.is_empty() {
            return;
        }
        let insert_at = self
            .opcodes
            .iter()
            .rposition(|op| {
                matches!(
                    op,
                    HydrationOpcode::ShareElement { .. }
                        | HydrationOpcode::ConsumeParent { .. }
                        | HydrationOpcode::PopParent
                        | HydrationOpcode::RepairClonedNode { .. }
                )
            })
            .map(|i| i + 1)
            .unwrap_or(0);

        let creates: Vec<HydrationOpcode> = self
            .morphs
            .drain(..)
            .map(|m| HydrationOpcode::CreateMorph {
                morph: m.morph,
                parent: m.parent,
                start: m.start,
                end: m.end,
                escaped: m.escaped,
            })
            .collect();
        self.opcodes.splice(insert_at..insert_at, creates);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::visitor::TemplateVisitor;
    use gossamer_ast::options::ParserOptions;
    use gossamer_ast::Program;

    fn compile_root(src: &str) -> Vec<HydrationOpcode> {
        let program: Program =
            gossamer_syntax::parse(src, &ParserOptions::default()).expect("parse");
        let actions = TemplateVisitor::visit(&program);
        let mut compiler = HydrationOpcodeCompiler::new();
        let mut result = Vec::new();
        for action in &actions {
            compiler.accept(action);
            if matches!(action, Action::EndProgram { depth: 0, .. }) {
                result = compiler.finish();
            }
        }
        result
    }

    fn morph_count(opcodes: &[HydrationOpcode]) -> usize {
        opcodes
            .iter()
            .filter(|op| matches!(op, HydrationOpcode::CreateMorph { .. }))
            .count()
    }

    #[test]
    fn content_mustache_opcodes() {
        let opcodes = compile_root("<div>{{name}}</div>");
        assert_eq!(
            opcodes,
            vec![
                HydrationOpcode::ConsumeParent { index: 0 },
                HydrationOpcode::CreateMorph {
                    morph: 0,
                    parent: ElementRef::Path(vec![0]),
                    start: 0,
                    end: 0,
                    escaped: true,
                },
                HydrationOpcode::PrintContentHook {
                    morph: 0,
                    path: "name".into(),
                },
                HydrationOpcode::PopParent,
            ]
        );
    }

    #[test]
    fn helper_mustache_uses_inline_hook() {
        let opcodes = compile_root("{{greet name times=3}}");
        assert!(opcodes.iter().any(|op| matches!(
            op,
            HydrationOpcode::PrintInlineHook { path, param_count: 1, .. } if path == "greet"
        )));
        assert!(opcodes
            .iter()
            .any(|op| matches!(op, HydrationOpcode::PushGetHook { path } if path == "name")));
        assert!(opcodes.iter().any(|op| matches!(
            op,
            HydrationOpcode::PushLiteral {
                value: Literal::Number(n)
            } if *n == 3.0
        )));
    }

    #[test]
    fn morph_creation_precedes_prints() {
        let opcodes = compile_root("<div>{{a}}{{b}}</div><p>{{c}}</p>");
        let mut seen_morphs = std::collections::HashSet::new();
        for op in &opcodes {
            match op {
                HydrationOpcode::CreateMorph { morph, .. } => {
                    seen_morphs.insert(*morph);
                }
                HydrationOpcode::PrintContentHook { morph, .. } => {
                    assert!(seen_morphs.contains(morph), "morph {morph} printed before created");
                }
                _ => {}
            }
        }
        assert_eq!(morph_count(&opcodes), 3);
    }

    #[test]
    fn morph_numbers_dense_in_document_order() {
        let opcodes = compile_root("{{a}}<div>{{b}}</div>{{c}}");
        let morphs: Vec<u16> = opcodes
            .iter()
            .filter_map(|op| match op {
                HydrationOpcode::CreateMorph { morph, .. } => Some(*morph),
                _ => None,
            })
            .collect();
        let mut sorted = morphs.clone();
        sorted.sort_unstable();
        assert_eq!(sorted, vec![0, 1, 2]);
    }

    #[test]
    fn root_boundaries() {
        let opcodes = compile_root("{{only}}");
        assert!(opcodes.contains(&HydrationOpcode::OpenBoundary));
        assert!(opcodes.contains(&HydrationOpcode::CloseBoundary));

        let opcodes = compile_root("<div></div>{{last}}");
        assert!(!opcodes.contains(&HydrationOpcode::OpenBoundary));
        assert!(opcodes.contains(&HydrationOpcode::CloseBoundary));
    }

    #[test]
    fn attribute_concat_scenario() {
        let opcodes = compile_root(r#"<div class="a {{b}} c"></div>"#);
        assert_eq!(
            opcodes,
            vec![
                HydrationOpcode::ConsumeParent { index: 0 },
                HydrationOpcode::PushLiteral {
                    value: Literal::String("a ".into())
                },
                HydrationOpcode::PushGetHook { path: "b".into() },
                HydrationOpcode::PushLiteral {
                    value: Literal::String(" c".into())
                },
                HydrationOpcode::PushConcatHook { count: 3 },
                HydrationOpcode::CreateAttrMorph {
                    morph: 0,
                    parent: ElementRef::Path(vec![0]),
                    name: "class".into(),
                    escaped: true,
                    namespace: None,
                },
                HydrationOpcode::PrintAttributeHook { morph: 0 },
                HydrationOpcode::PopParent,
            ]
        );
    }

    #[test]
    fn share_element_when_referenced_twice() {
        let opcodes = compile_root(r#"<div class={{a}} id={{b}}></div>"#);
        assert!(opcodes.contains(&HydrationOpcode::ShareElement { element: 0 }));
        assert!(opcodes.iter().any(|op| matches!(
            op,
            HydrationOpcode::CreateAttrMorph {
                parent: ElementRef::Shared(0),
                ..
            }
        )));
    }

    #[test]
    fn single_reference_uses_path() {
        let opcodes = compile_root(r#"<div class={{a}}></div>"#);
        assert!(!opcodes
            .iter()
            .any(|op| matches!(op, HydrationOpcode::ShareElement { .. })));
        assert!(opcodes.iter().any(|op| matches!(
            op,
            HydrationOpcode::CreateAttrMorph {
                parent: ElementRef::Path(path),
                ..
            } if path == &vec![0]
        )));
    }

    #[test]
    fn element_modifier_hook() {
        let opcodes = compile_root(r#"<button {{action "go"}}></button>"#);
        assert!(opcodes.iter().any(|op| matches!(
            op,
            HydrationOpcode::PrintElementHook { path, param_count: 1, .. } if path == "action"
        )));
    }

    #[test]
    fn block_template_ids() {
        let opcodes = compile_root("{{#if a}}x{{else}}y{{/if}}{{#if b}}z{{/if}}");
        let blocks: Vec<(Option<u16>, Option<u16>)> = opcodes
            .iter()
            .filter_map(|op| match op {
                HydrationOpcode::PrintBlockHook {
                    template, inverse, ..
                } => Some((*template, *inverse)),
                _ => None,
            })
            .collect();
        assert_eq!(blocks, vec![(Some(0), Some(1)), (Some(2), None)]);
    }

    #[test]
    fn morph_count_excludes_nested_programs() {
        // {{x}} inside the block belongs to the nested program
        let opcodes = compile_root("{{a}}{{#if b}}{{x}}{{y}}{{/if}}");
        assert_eq!(morph_count(&opcodes), 2);
    }

    #[test]
    fn unescaped_mustache_morph() {
        let opcodes = compile_root("{{{html}}}");
        assert!(opcodes.iter().any(|op| matches!(
            op,
            HydrationOpcode::CreateMorph { escaped: false, .. }
        )));
    }

    #[test]
    fn component_hook_with_attrs() {
        let opcodes = compile_root(r#"<x-item title={{t}} class="a">body</x-item>"#);
        assert!(opcodes.iter().any(|op| matches!(
            op,
            HydrationOpcode::PrintComponentHook { tag, attr_keys, template: 0, .. }
                if tag == "x-item" && attr_keys.len() == 2
        )));
    }

    #[test]
    fn nested_paths() {
        let opcodes = compile_root("<div><p>{{deep}}</p></div>");
        assert!(opcodes.iter().any(|op| matches!(
            op,
            HydrationOpcode::CreateMorph {
                parent: ElementRef::Path(path),
                ..
            } if path == &vec![0, 0]
        )));
    }
}
