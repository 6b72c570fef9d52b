//! Default runtime hooks.
//!
//! The minimal execution-time library the hydration executor calls. Helper
//! lookup and plain property-path resolution live here. A missing helper is
//! never an error: `content`, `inline` and `subexpr` fall back to plain path
//! resolution, `component` falls back to rendering a literal element, and
//! `block`/`element` silently do nothing.

use crate::dom::NodeId;
use crate::env::{BlockTemplates, Env, HelperOptions, HelperResult};
use crate::morph::{AttrMorph, Morph};
use crate::template::Template;
use crate::{Value, ValueMap};

/// Walk a dot-path over the context, stopping at the first missing segment.
pub fn get(_env: &mut Env<'_>, context: &Value, path: &str) -> Value {
    let path = path.strip_prefix('@').unwrap_or(path);
    if path.is_empty() || path == "this" || path == "." {
        return context.clone();
    }
    let mut current = context;
    for segment in path.split(['.', '/']) {
        if segment.is_empty() || segment == "this" || segment == "." || segment == ".." {
            continue;
        }
        match current.get(segment) {
            Some(next) => current = next,
            None => return Value::Null,
        }
    }
    current.clone()
}

/// Bind a name in the context scope (used for block parameters).
pub fn set(_env: &mut Env<'_>, context: &mut Value, name: &str, value: Value) {
    if let Value::Object(map) = context {
        map.insert(name.to_string(), value);
    }
}

pub fn subexpr(
    env: &mut Env<'_>,
    context: &mut Value,
    path: &str,
    params: &[Value],
    hash: &ValueMap,
) -> Value {
    if let Some(helper) = env.helpers.get(path).copied() {
        let mut options = HelperOptions {
            template: None,
            inverse: None,
            context: Some(context),
            contextual_element: 0,
        };
        match helper(params, hash, &mut options, env) {
            HelperResult::Value(value) => value,
            _ => Value::Null,
        }
    } else {
        let get = env.hooks.get;
        get(env, context, path)
    }
}

/// Join already-resolved values into one string.
pub fn concat(_env: &mut Env<'_>, params: &[Value]) -> Value {
    let mut out = String::new();
    for param in params {
        out.push_str(&value_to_string(param));
    }
    Value::String(out)
}

pub fn content(
    env: &mut Env<'_>,
    morph: &mut Morph,
    context: &mut Value,
    path: &str,
    contextual_element: NodeId,
) {
    if let Some(helper) = env.helpers.get(path).copied() {
        let mut options = HelperOptions {
            template: None,
            inverse: None,
            context: Some(context),
            contextual_element,
        };
        let result = helper(&[], &ValueMap::new(), &mut options, env);
        write_result(env, morph, result);
    } else {
        let get = env.hooks.get;
        let value = get(env, context, path);
        morph.set_value(env.dom, &value);
    }
}

pub fn inline(
    env: &mut Env<'_>,
    morph: &mut Morph,
    context: &mut Value,
    path: &str,
    params: &[Value],
    hash: &ValueMap,
    contextual_element: NodeId,
) {
    if let Some(helper) = env.helpers.get(path).copied() {
        let mut options = HelperOptions {
            template: None,
            inverse: None,
            context: Some(context),
            contextual_element,
        };
        let result = helper(params, hash, &mut options, env);
        write_result(env, morph, result);
    } else {
        let get = env.hooks.get;
        let value = get(env, context, path);
        morph.set_value(env.dom, &value);
    }
}

#[allow(clippy::too_many_arguments)]
pub fn block(
    env: &mut Env<'_>,
    morph: &mut Morph,
    context: &mut Value,
    path: &str,
    params: &[Value],
    hash: &ValueMap,
    templates: BlockTemplates<'_>,
    contextual_element: NodeId,
) {
    let Some(helper) = env.helpers.get(path).copied() else {
        return;
    };
    let mut options = HelperOptions {
        template: templates.template,
        inverse: templates.inverse,
        context: Some(context),
        contextual_element,
    };
    let result = helper(params, hash, &mut options, env);
    write_result(env, morph, result);
}

pub fn component(
    env: &mut Env<'_>,
    morph: &mut Morph,
    context: &mut Value,
    tag: &str,
    attrs: &ValueMap,
    template: Option<&mut Template>,
    contextual_element: NodeId,
) {
    if let Some(helper) = env.helpers.get(tag).copied() {
        let mut options = HelperOptions {
            template,
            inverse: None,
            context: Some(context),
            contextual_element,
        };
        let result = helper(&[], attrs, &mut options, env);
        write_result(env, morph, result);
    } else {
        component_fallback(env, morph, context, tag, attrs, template, contextual_element);
    }
}

/// With no helper registered, a component renders as a literal custom
/// element: attributes applied directly, the child template's output
/// appended. Unknown component names are therefore not detectable here.
fn component_fallback(
    env: &mut Env<'_>,
    morph: &mut Morph,
    context: &mut Value,
    tag: &str,
    attrs: &ValueMap,
    template: Option<&mut Template>,
    contextual_element: NodeId,
) {
    let element = env.dom.create_element(tag);
    for (name, value) in attrs {
        let text = value_to_string(value);
        env.dom.set_attribute(element, name, &text);
    }
    if let Some(template) = template {
        let fragment = template.render(context, env, contextual_element, &[]);
        env.dom.append_child(element, fragment);
    }
    morph.set_node(env.dom, element);
}

pub fn element(
    env: &mut Env<'_>,
    node: NodeId,
    context: &mut Value,
    path: &str,
    params: &[Value],
    hash: &ValueMap,
) {
    let Some(helper) = env.helpers.get(path).copied() else {
        return;
    };
    let mut options = HelperOptions {
        template: None,
        inverse: None,
        context: Some(context),
        contextual_element: node,
    };
    helper(params, hash, &mut options, env);
}

pub fn attribute(env: &mut Env<'_>, morph: &AttrMorph, value: &Value) {
    morph.set_value(env.dom, value);
}

pub fn partial(
    env: &mut Env<'_>,
    morph: &mut Morph,
    context: &mut Value,
    name: &str,
    contextual_element: NodeId,
) {
    let Some(compiled) = env.partials.get(name).cloned() else {
        return;
    };
    let mut template = Template::from_compiled(compiled);
    let fragment = template.render(context, env, contextual_element, &[]);
    morph.set_fragment(env.dom, fragment);
}

fn write_result(env: &mut Env<'_>, morph: &mut Morph, result: HelperResult) {
    match result {
        HelperResult::Value(value) => morph.set_value(env.dom, &value),
        HelperResult::Fragment(fragment) => morph.set_fragment(env.dom, fragment),
        HelperResult::None => morph.clear(env.dom),
    }
}

/// Display conversion for hook results and attribute values.
pub fn value_to_string(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => {
            if let Some(f) = n.as_f64() {
                if f.fract() == 0.0 && f.is_finite() && n.as_i64().is_none() && n.as_u64().is_none()
                {
                    // Float literals like 3.0 display as integers
                    return format!("{}", f as i64);
                }
            }
            n.to_string()
        }
        other => other.to_string(),
    }
}

/// Handlebars-style truthiness, shared by conditional helpers.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(true),
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(_) => true,
    }
}
