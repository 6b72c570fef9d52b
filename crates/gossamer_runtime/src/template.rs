//! Executable template records.
//!
//! A `Template` wraps a `CompiledTemplate` with per-instance render state.
//! `build` interprets the fragment opcodes against a `Dom`; `render`
//! acquires a fragment (building, caching or cloning per the cache
//! protocol), then runs the hydration opcodes in two passes: a structural
//! pass that resolves parents and creates morphs, and a hook pass that
//! evaluates expressions and invokes the runtime hooks in program order.

use compact_str::CompactString;
use gossamer_compiler::{CompiledTemplate, ElementRef, FragmentOpcode, HydrationOpcode, Literal};
use rustc_hash::FxHashMap;

use crate::dom::{Dom, NodeId};
use crate::env::{BlockTemplates, Env};
use crate::morph::{AttrMorph, Morph};
use crate::{Value, ValueMap};

#[derive(Debug)]
pub struct Template {
    pub is_gossamer: bool,
    pub revision: CompactString,
    /// Number of block parameters the render signature accepts
    pub block_params: usize,
    /// Pristine static fragment, populated on first render and only ever
    /// handed out as clones afterwards.
    pub cached_fragment: Option<NodeId>,
    pub has_rendered: bool,
    block_param_names: Vec<CompactString>,
    fragment_program: Vec<FragmentOpcode>,
    hydration_program: Vec<HydrationOpcode>,
    children: Vec<Template>,
}

impl Template {
    pub fn from_compiled(compiled: CompiledTemplate) -> Self {
        let CompiledTemplate {
            revision,
            block_params,
            fragment,
            hydration,
            children,
        } = compiled;
        Self {
            is_gossamer: true,
            revision,
            block_params: block_params.len(),
            cached_fragment: None,
            has_rendered: false,
            block_param_names: block_params,
            fragment_program: fragment,
            hydration_program: hydration,
            children: children.into_iter().map(Self::from_compiled).collect(),
        }
    }

    /// Build the static skeleton only.
    pub fn build(&self, dom: &mut dyn Dom) -> NodeId {
        build_fragment(&self.fragment_program, dom)
    }

    /// Build (or clone) the fragment and hydrate it against the context.
    pub fn render(
        &mut self,
        context: &mut Value,
        env: &mut Env<'_>,
        contextual_element: NodeId,
        block_args: &[Value],
    ) -> NodeId {
        for (i, name) in self.block_param_names.iter().enumerate() {
            let value = block_args.get(i).cloned().unwrap_or(Value::Null);
            let set = env.hooks.set;
            set(env, context, name, value);
        }

        env.dom.detect_namespace(contextual_element);
        let (fragment, cloned) = self.acquire_fragment(env);

        let hydration = std::mem::take(&mut self.hydration_program);
        let mut children = std::mem::take(&mut self.children);
        run_hydration(
            &hydration,
            fragment,
            cloned,
            context,
            env,
            &mut children,
            contextual_element,
        );
        self.children = children;
        self.hydration_program = hydration;

        fragment
    }

    /// Cache protocol: the first render builds fresh and caches a pristine
    /// clone; every later render clones the cache and never builds again.
    fn acquire_fragment(&mut self, env: &mut Env<'_>) -> (NodeId, bool) {
        if env.use_fragment_cache && env.dom.can_clone() {
            match self.cached_fragment {
                None => {
                    let fragment = self.build(env.dom);
                    self.cached_fragment = Some(env.dom.clone_node(fragment, true));
                    self.has_rendered = true;
                    (fragment, false)
                }
                Some(cached) => (env.dom.clone_node(cached, true), true),
            }
        } else {
            self.has_rendered = true;
            (self.build(env.dom), false)
        }
    }
}

/// Interpret a fragment opcode program. Creates push nodes, `AppendChild`
/// attaches the top node to its parent, `ReturnNode` marks the root.
pub fn build_fragment(program: &[FragmentOpcode], dom: &mut dyn Dom) -> NodeId {
    let mut stack: Vec<NodeId> = Vec::new();
    for op in program {
        match op {
            FragmentOpcode::CreateFragment => stack.push(dom.create_document_fragment()),
            FragmentOpcode::CreateElement { tag } => stack.push(dom.create_element(tag)),
            FragmentOpcode::CreateText { text } => stack.push(dom.create_text_node(text)),
            FragmentOpcode::CreateComment { text } => stack.push(dom.create_comment(text)),
            FragmentOpcode::SetAttribute {
                name,
                value,
                namespace,
            } => {
                let element = *stack.last().expect("no element for attribute");
                match namespace {
                    Some(ns) => dom.set_attribute_ns(element, ns, name, value),
                    None => dom.set_attribute(element, name, value),
                }
            }
            FragmentOpcode::SetNamespace { namespace } => dom.set_namespace(*namespace),
            FragmentOpcode::AppendChild => {
                let child = stack.pop().expect("no child to append");
                let parent = *stack.last().expect("no parent to append to");
                dom.append_child(parent, child);
            }
            FragmentOpcode::ReturnNode => {}
        }
    }
    stack.pop().expect("fragment program produced no root")
}

fn resolve(dom: &dyn Dom, fragment: NodeId, shared: &FxHashMap<u16, NodeId>, r: &ElementRef) -> NodeId {
    match r {
        ElementRef::Path(path) => dom.child_at(fragment, path),
        ElementRef::Shared(element) => shared[element],
    }
}

#[allow(clippy::too_many_arguments)]
fn run_hydration(
    program: &[HydrationOpcode],
    fragment: NodeId,
    cloned: bool,
    context: &mut Value,
    env: &mut Env<'_>,
    children: &mut [Template],
    contextual_element: NodeId,
) {
    let mut morphs: FxHashMap<u16, Morph> = FxHashMap::default();
    let mut attr_morphs: FxHashMap<u16, AttrMorph> = FxHashMap::default();
    let mut shared: FxHashMap<u16, NodeId> = FxHashMap::default();

    // Structural pass: parents, repair, morph creation, boundaries
    let mut path: Vec<usize> = Vec::new();
    let mut open_boundary = false;
    let mut close_boundary = false;
    for op in program {
        match op {
            HydrationOpcode::ConsumeParent { index } => path.push(*index),
            HydrationOpcode::PopParent => {
                path.pop();
            }
            HydrationOpcode::ShareElement { element } => {
                let node = env.dom.child_at(fragment, &path);
                shared.insert(*element, node);
            }
            HydrationOpcode::RepairClonedNode {
                parent,
                blank_indices,
                is_element_checked,
            } => {
                if cloned {
                    let node = resolve(env.dom, fragment, &shared, parent);
                    env.dom
                        .repair_cloned_node(node, blank_indices, *is_element_checked);
                }
            }
            HydrationOpcode::CreateMorph {
                morph,
                parent,
                start,
                end,
                escaped,
            } => {
                let node = resolve(env.dom, fragment, &shared, parent);
                let created = if *escaped {
                    env.dom
                        .create_morph_at(node, *start, *end, Some(contextual_element))
                } else {
                    env.dom
                        .create_unsafe_morph_at(node, *start, *end, Some(contextual_element))
                };
                morphs.insert(*morph, created);
            }
            HydrationOpcode::CreateAttrMorph {
                morph,
                parent,
                name,
                escaped,
                namespace,
            } => {
                let node = resolve(env.dom, fragment, &shared, parent);
                let created = if *escaped {
                    env.dom.create_attr_morph(node, name, namespace.as_deref())
                } else {
                    env.dom
                        .create_unsafe_attr_morph(node, name, namespace.as_deref())
                };
                attr_morphs.insert(*morph, created);
            }
            HydrationOpcode::OpenBoundary => open_boundary = true,
            HydrationOpcode::CloseBoundary => close_boundary = true,
            _ => {}
        }
    }
    if open_boundary {
        env.dom.insert_boundary(fragment, Some(0));
    }
    if close_boundary {
        env.dom.insert_boundary(fragment, None);
    }

    // Hook pass: expression evaluation and hook invocation in program order
    let mut stack: Vec<Value> = Vec::new();
    for op in program {
        match op {
            HydrationOpcode::PushLiteral { value } => stack.push(literal_value(value)),
            HydrationOpcode::PushGetHook { path } => {
                let get = env.hooks.get;
                let value = get(env, context, path);
                stack.push(value);
            }
            HydrationOpcode::PushSexprHook {
                path,
                param_count,
                hash_keys,
            } => {
                let (params, hash) = pop_args(&mut stack, *param_count, hash_keys);
                let subexpr = env.hooks.subexpr;
                let value = subexpr(env, context, path, &params, &hash);
                stack.push(value);
            }
            HydrationOpcode::PushConcatHook { count } => {
                let at = stack.len() - *count as usize;
                let values = stack.split_off(at);
                let concat = env.hooks.concat;
                let value = concat(env, &values);
                stack.push(value);
            }
            HydrationOpcode::PrintContentHook { morph, path } => {
                let morph = morphs.get_mut(morph).expect("morph not created");
                let content = env.hooks.content;
                content(env, morph, context, path, contextual_element);
            }
            HydrationOpcode::PrintInlineHook {
                morph,
                path,
                param_count,
                hash_keys,
            } => {
                let (params, hash) = pop_args(&mut stack, *param_count, hash_keys);
                let morph = morphs.get_mut(morph).expect("morph not created");
                let inline = env.hooks.inline;
                inline(env, morph, context, path, &params, &hash, contextual_element);
            }
            HydrationOpcode::PrintBlockHook {
                morph,
                path,
                param_count,
                hash_keys,
                template,
                inverse,
            } => {
                let (params, hash) = pop_args(&mut stack, *param_count, hash_keys);
                let (template, inverse) = two_children(children, *template, *inverse);
                let morph = morphs.get_mut(morph).expect("morph not created");
                let block = env.hooks.block;
                block(
                    env,
                    morph,
                    context,
                    path,
                    &params,
                    &hash,
                    BlockTemplates { template, inverse },
                    contextual_element,
                );
            }
            HydrationOpcode::PrintComponentHook {
                morph,
                tag,
                attr_keys,
                template,
            } => {
                let at = stack.len() - attr_keys.len();
                let values = stack.split_off(at);
                let attrs: ValueMap = attr_keys.iter().cloned().zip(values).collect();
                let template = children.get_mut(*template as usize);
                let morph = morphs.get_mut(morph).expect("morph not created");
                let component = env.hooks.component;
                component(env, morph, context, tag, &attrs, template, contextual_element);
            }
            HydrationOpcode::PrintPartialHook { morph, name } => {
                let morph = morphs.get_mut(morph).expect("morph not created");
                let partial = env.hooks.partial;
                partial(env, morph, context, name, contextual_element);
            }
            HydrationOpcode::PrintAttributeHook { morph } => {
                let value = stack.pop().expect("attribute value missing");
                let attr_morph = attr_morphs.get(morph).expect("attr morph not created");
                let attribute = env.hooks.attribute;
                attribute(env, attr_morph, &value);
            }
            HydrationOpcode::PrintElementHook {
                element,
                path,
                param_count,
                hash_keys,
            } => {
                let (params, hash) = pop_args(&mut stack, *param_count, hash_keys);
                let node = resolve(env.dom, fragment, &shared, element);
                let element_hook = env.hooks.element;
                element_hook(env, node, context, path, &params, &hash);
            }
            _ => {}
        }
    }
}

fn pop_args(
    stack: &mut Vec<Value>,
    param_count: u16,
    hash_keys: &[CompactString],
) -> (Vec<Value>, ValueMap) {
    let hash_at = stack.len() - hash_keys.len();
    let hash_values = stack.split_off(hash_at);
    let params_at = stack.len() - param_count as usize;
    let params = stack.split_off(params_at);
    let hash = hash_keys.iter().cloned().zip(hash_values).collect();
    (params, hash)
}

fn two_children(
    children: &mut [Template],
    template: Option<u16>,
    inverse: Option<u16>,
) -> (Option<&mut Template>, Option<&mut Template>) {
    match (template, inverse) {
        (Some(a), Some(b)) if a != b => {
            let (a, b) = (a as usize, b as usize);
            if a < b {
                let (left, right) = children.split_at_mut(b);
                (Some(&mut left[a]), Some(&mut right[0]))
            } else {
                let (left, right) = children.split_at_mut(a);
                (Some(&mut right[0]), Some(&mut left[b]))
            }
        }
        (Some(a), _) => (children.get_mut(a as usize), None),
        (None, Some(b)) => (None, children.get_mut(b as usize)),
        (None, None) => (None, None),
    }
}

fn literal_value(literal: &Literal) -> Value {
    match literal {
        Literal::String(s) => Value::String(s.to_string()),
        Literal::Number(n) => Value::from(*n),
        Literal::Boolean(b) => Value::Bool(*b),
    }
}
