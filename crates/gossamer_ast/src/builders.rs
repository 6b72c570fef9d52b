//! Builder functions for constructing AST nodes programmatically.
//!
//! Used by AST plugins and tests. All builders stamp nodes with the stub
//! location.

use compact_str::CompactString as String;

use crate::ast::*;

pub fn program(body: Vec<Statement>, block_params: Vec<&str>) -> Program {
    Program {
        body,
        block_params: block_params.into_iter().map(String::from).collect(),
        loc: SourceLocation::STUB,
    }
}

pub fn mustache(sexpr: SubExpression) -> MustacheStatement {
    MustacheStatement {
        sexpr,
        escaped: true,
        strip: Strip::default(),
        loc: SourceLocation::STUB,
    }
}

pub fn unescaped_mustache(sexpr: SubExpression) -> MustacheStatement {
    MustacheStatement {
        escaped: false,
        ..mustache(sexpr)
    }
}

pub fn block(sexpr: SubExpression, program: Program, inverse: Option<Program>) -> BlockStatement {
    BlockStatement {
        sexpr,
        program,
        inverse,
        open_strip: Strip::default(),
        inverse_strip: Strip::default(),
        close_strip: Strip::default(),
        loc: SourceLocation::STUB,
    }
}

pub fn partial(sexpr: SubExpression) -> PartialStatement {
    PartialStatement {
        sexpr,
        indent: String::default(),
        strip: Strip::default(),
        loc: SourceLocation::STUB,
    }
}

pub fn content(value: &str) -> ContentStatement {
    ContentStatement {
        value: value.into(),
        original: value.into(),
        left_stripped: false,
        right_stripped: false,
        loc: SourceLocation::STUB,
    }
}

pub fn comment(value: &str) -> CommentStatement {
    CommentStatement {
        value: value.into(),
        strip: Strip::default(),
        loc: SourceLocation::STUB,
    }
}

pub fn element(
    tag: &str,
    attributes: Vec<AttrNode>,
    modifiers: Vec<SubExpression>,
    children: Vec<Statement>,
) -> ElementNode {
    ElementNode {
        tag: tag.into(),
        attributes,
        modifiers,
        children,
        loc: SourceLocation::STUB,
    }
}

pub fn component(tag: &str, attributes: Vec<AttrNode>, program: Program) -> ComponentNode {
    ComponentNode {
        tag: tag.into(),
        attributes,
        program,
        loc: SourceLocation::STUB,
    }
}

pub fn attr(name: &str, value: AttrValue) -> AttrNode {
    AttrNode {
        name: name.into(),
        value,
        loc: SourceLocation::STUB,
    }
}

pub fn concat(parts: Vec<ConcatPart>) -> ConcatStatement {
    ConcatStatement {
        parts,
        loc: SourceLocation::STUB,
    }
}

pub fn text(chars: &str) -> TextNode {
    TextNode {
        chars: chars.into(),
        loc: SourceLocation::STUB,
    }
}

pub fn sexpr(path: PathExpression, params: Vec<Expression>, hash: Hash) -> SubExpression {
    SubExpression {
        path,
        params,
        hash,
        loc: SourceLocation::STUB,
    }
}

/// Build a path expression from dotted source text, e.g. `"foo.bar"`.
/// `this` and `.`/`..` prefixes are kept in `original` but excluded from
/// `parts`; a leading `@` marks a data reference.
pub fn path(original: &str) -> PathExpression {
    let mut data = false;
    let mut rest = original;
    if let Some(stripped) = rest.strip_prefix('@') {
        data = true;
        rest = stripped;
    }
    let parts = rest
        .split(['.', '/'])
        .filter(|p| !p.is_empty() && *p != "this" && *p != "..")
        .map(String::from)
        .collect();
    PathExpression {
        original: original.into(),
        parts,
        data,
        loc: SourceLocation::STUB,
    }
}

/// `path()` wrapped as an expression, for params lists
pub fn path_expr(original: &str) -> Expression {
    Expression::Path(path(original))
}

pub fn string(value: &str) -> Expression {
    Expression::String(StringLiteral {
        value: value.into(),
        loc: SourceLocation::STUB,
    })
}

pub fn number(value: f64) -> Expression {
    Expression::Number(NumberLiteral {
        value,
        loc: SourceLocation::STUB,
    })
}

pub fn boolean(value: bool) -> Expression {
    Expression::Boolean(BooleanLiteral {
        value,
        loc: SourceLocation::STUB,
    })
}

pub fn hash(pairs: Vec<HashPair>) -> Hash {
    Hash { pairs }
}

pub fn pair(key: &str, value: Expression) -> HashPair {
    HashPair {
        key: key.into(),
        value,
        loc: SourceLocation::STUB,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn path_splits_parts() {
        let p = path("foo.bar.baz");
        assert_eq!(p.parts, vec!["foo", "bar", "baz"]);
        assert_eq!(p.original, "foo.bar.baz");
        assert!(!p.data);
    }

    #[test]
    fn path_strips_this_prefix() {
        let p = path("this/foo");
        assert_eq!(p.parts, vec!["foo"]);
        assert_eq!(p.original, "this/foo");
    }

    #[test]
    fn data_path() {
        let p = path("@index");
        assert!(p.data);
        assert_eq!(p.parts, vec!["index"]);
    }
}
