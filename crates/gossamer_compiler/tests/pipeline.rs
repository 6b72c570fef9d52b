//! Opcode-level pipeline snapshots.

use gossamer_compiler::{
    compile_source, CompilerOptions, ElementRef, FragmentOpcode, HydrationOpcode, Literal,
};

fn compile(src: &str) -> gossamer_compiler::CompiledTemplate {
    compile_source(src, &CompilerOptions::default()).expect("compile error")
}

fn element_ref(r: &ElementRef) -> String {
    match r {
        ElementRef::Path(path) => format!(
            "[{}]",
            path.iter()
                .map(|i| i.to_string())
                .collect::<Vec<_>>()
                .join(",")
        ),
        ElementRef::Shared(element) => format!("element{element}"),
    }
}

fn literal(l: &Literal) -> String {
    match l {
        Literal::String(s) => format!("{s:?}"),
        Literal::Number(n) => n.to_string(),
        Literal::Boolean(b) => b.to_string(),
    }
}

fn fragment_line(op: &FragmentOpcode) -> String {
    match op {
        FragmentOpcode::CreateFragment => "createFragment".into(),
        FragmentOpcode::CreateElement { tag } => format!("createElement({tag})"),
        FragmentOpcode::CreateText { text } => format!("createText({text:?})"),
        FragmentOpcode::CreateComment { text } => format!("createComment({text:?})"),
        FragmentOpcode::SetAttribute {
            name, value, ..
        } => format!("setAttribute({name},{value:?})"),
        FragmentOpcode::SetNamespace { namespace } => match namespace {
            Some(ns) => format!("setNamespace({ns:?})"),
            None => "setNamespace(null)".into(),
        },
        FragmentOpcode::AppendChild => "appendChild".into(),
        FragmentOpcode::ReturnNode => "returnNode".into(),
    }
}

fn hydration_line(op: &HydrationOpcode) -> String {
    match op {
        HydrationOpcode::ConsumeParent { index } => format!("consumeParent({index})"),
        HydrationOpcode::PopParent => "popParent".into(),
        HydrationOpcode::ShareElement { element } => format!("shareElement({element})"),
        HydrationOpcode::RepairClonedNode { blank_indices, .. } => {
            format!("repairClonedNode({blank_indices:?})")
        }
        HydrationOpcode::OpenBoundary => "openBoundary".into(),
        HydrationOpcode::CloseBoundary => "closeBoundary".into(),
        HydrationOpcode::CreateMorph {
            morph,
            parent,
            start,
            end,
            escaped,
        } => format!(
            "createMorph({morph},{},{start},{end},{escaped})",
            element_ref(parent)
        ),
        HydrationOpcode::CreateAttrMorph { morph, parent, name, .. } => {
            format!("createAttrMorph({morph},{},{name})", element_ref(parent))
        }
        HydrationOpcode::PushLiteral { value } => format!("pushLiteral({})", literal(value)),
        HydrationOpcode::PushGetHook { path } => format!("pushGetHook({path})"),
        HydrationOpcode::PushSexprHook {
            path, param_count, ..
        } => format!("pushSexprHook({path},{param_count})"),
        HydrationOpcode::PushConcatHook { count } => format!("pushConcatHook({count})"),
        HydrationOpcode::PrintContentHook { morph, path } => {
            format!("printContentHook({morph},{path})")
        }
        HydrationOpcode::PrintInlineHook {
            morph,
            path,
            param_count,
            ..
        } => format!("printInlineHook({morph},{path},{param_count})"),
        HydrationOpcode::PrintBlockHook {
            morph,
            path,
            template,
            inverse,
            ..
        } => format!(
            "printBlockHook({morph},{path},{:?},{:?})",
            template, inverse
        ),
        HydrationOpcode::PrintComponentHook { morph, tag, template, .. } => {
            format!("printComponentHook({morph},{tag},{template})")
        }
        HydrationOpcode::PrintPartialHook { morph, name } => {
            format!("printPartialHook({morph},{name})")
        }
        HydrationOpcode::PrintAttributeHook { morph } => format!("printAttributeHook({morph})"),
        HydrationOpcode::PrintElementHook { element, path, .. } => {
            format!("printElementHook({},{path})", element_ref(element))
        }
    }
}

fn listing(src: &str) -> String {
    let template = compile(src);
    let mut lines = Vec::new();
    lines.push("fragment:".to_string());
    for op in &template.fragment {
        lines.push(format!("  {}", fragment_line(op)));
    }
    lines.push("hydration:".to_string());
    for op in &template.hydration {
        lines.push(format!("  {}", hydration_line(op)));
    }
    lines.join("\n")
}

#[test]
fn simple_mustache_listing() {
    insta::assert_snapshot!(listing("<div>{{name}}</div>"), @r###"
    fragment:
      createFragment
      setNamespace(null)
      createElement(div)
      createComment("")
      appendChild
      appendChild
      returnNode
    hydration:
      consumeParent(0)
      createMorph(0,[0],0,0,true)
      printContentHook(0,name)
      popParent
    "###);
}

#[test]
fn attribute_concat_listing() {
    insta::assert_snapshot!(listing(r#"<div class="a {{b}} c"></div>"#), @r###"
    fragment:
      createFragment
      setNamespace(null)
      createElement(div)
      appendChild
      returnNode
    hydration:
      consumeParent(0)
      pushLiteral("a ")
      pushGetHook(b)
      pushLiteral(" c")
      pushConcatHook(3)
      createAttrMorph(0,[0],class)
      printAttributeHook(0)
      popParent
    "###);
}

#[test]
fn block_listing() {
    insta::assert_snapshot!(listing("{{#if ok}}x{{/if}}"), @r###"
    fragment:
      createFragment
      createComment("")
      appendChild
      returnNode
    hydration:
      createMorph(0,[],0,0,true)
      openBoundary
      closeBoundary
      pushGetHook(ok)
      printBlockHook(0,if,Some(0),None)
    "###);
}
