//! Template AST node types.
//!
//! The tree is produced in two stages: the mustache grammar parser emits
//! `Program`s whose bodies contain `ContentStatement`s (raw HTML text), and
//! the merger replaces those with `ElementNode`/`ComponentNode`/`TextNode`
//! content. After merging, no `ContentStatement` remains.

use compact_str::CompactString as String;
use serde::{Deserialize, Serialize};

/// Node type discriminant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum NodeType {
    Program = 0,
    Mustache = 1,
    Block = 2,
    Partial = 3,
    Content = 4,
    Comment = 5,
    Element = 6,
    Component = 7,
    Attr = 8,
    Text = 9,
    Concat = 10,
    SubExpression = 11,
    Path = 12,
    StringLiteral = 13,
    NumberLiteral = 14,
    BooleanLiteral = 15,
    Hash = 16,
    HashPair = 17,
}

/// Element namespace. HTML is represented as the absence of a namespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Namespace {
    Svg = 0,
    MathMl = 1,
}

impl Namespace {
    pub fn uri(&self) -> &'static str {
        match self {
            Self::Svg => "http://www.w3.org/2000/svg",
            Self::MathMl => "http://www.w3.org/1998/Math/MathML",
        }
    }
}

/// Source position. Lines are 1-based, columns 0-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub struct Position {
    pub line: u32,
    pub column: u32,
}

impl Position {
    pub const fn new(line: u32, column: u32) -> Self {
        Self { line, column }
    }
}

/// Source location span [start, end]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourceLocation {
    pub start: Position,
    pub end: Position,
}

impl SourceLocation {
    /// Stub location for generated nodes
    pub const STUB: Self = Self {
        start: Position::new(1, 0),
        end: Position::new(1, 0),
    };

    pub const fn new(start: Position, end: Position) -> Self {
        Self { start, end }
    }
}

impl Default for SourceLocation {
    fn default() -> Self {
        Self::STUB
    }
}

/// Strip flags carried by `{{~ ... ~}}` delimiters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Strip {
    pub open: bool,
    pub close: bool,
}

impl Strip {
    pub const fn new(open: bool, close: bool) -> Self {
        Self { open, close }
    }
}

// ============================================================================
// Statements
// ============================================================================

/// Any statement that can appear in a program or element body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Statement {
    Mustache(MustacheStatement),
    Block(Box<BlockStatement>),
    Partial(PartialStatement),
    Content(ContentStatement),
    Comment(CommentStatement),
    Element(Box<ElementNode>),
    Component(Box<ComponentNode>),
    Text(TextNode),
}

impl Statement {
    pub fn node_type(&self) -> NodeType {
        match self {
            Self::Mustache(_) => NodeType::Mustache,
            Self::Block(_) => NodeType::Block,
            Self::Partial(_) => NodeType::Partial,
            Self::Content(_) => NodeType::Content,
            Self::Comment(_) => NodeType::Comment,
            Self::Element(_) => NodeType::Element,
            Self::Component(_) => NodeType::Component,
            Self::Text(_) => NodeType::Text,
        }
    }

    /// Whether this statement materializes a DOM node in the built fragment.
    /// Mustaches, blocks, partials and components occupy an anchor comment;
    /// grammar-level content statements never survive the merge.
    pub fn is_dom_node(&self) -> bool {
        !matches!(self, Self::Content(_))
    }
}

/// A program: an ordered statement body plus the block parameters its
/// enclosing block introduced into scope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Program {
    pub body: Vec<Statement>,
    pub block_params: Vec<String>,
    pub loc: SourceLocation,
}

impl Program {
    pub fn new(body: Vec<Statement>, block_params: Vec<String>, loc: SourceLocation) -> Self {
        Self {
            body,
            block_params,
            loc,
        }
    }

    pub fn node_type(&self) -> NodeType {
        NodeType::Program
    }
}

/// `{{expr}}` or `{{{expr}}}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MustacheStatement {
    pub sexpr: SubExpression,
    /// false for triple-stache `{{{...}}}` output
    pub escaped: bool,
    pub strip: Strip,
    pub loc: SourceLocation,
}

impl MustacheStatement {
    pub fn node_type(&self) -> NodeType {
        NodeType::Mustache
    }
}

/// `{{#helper}}...{{else}}...{{/helper}}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockStatement {
    pub sexpr: SubExpression,
    pub program: Program,
    pub inverse: Option<Program>,
    pub open_strip: Strip,
    pub inverse_strip: Strip,
    pub close_strip: Strip,
    pub loc: SourceLocation,
}

impl BlockStatement {
    pub fn node_type(&self) -> NodeType {
        NodeType::Block
    }
}

/// `{{> name}}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartialStatement {
    pub sexpr: SubExpression,
    /// Whitespace preceding a standalone partial, re-applied by renderers
    /// that indent partial output.
    pub indent: String,
    pub strip: Strip,
    pub loc: SourceLocation,
}

impl PartialStatement {
    pub fn node_type(&self) -> NodeType {
        NodeType::Partial
    }
}

/// Raw HTML text between mustaches, as produced by the grammar parser.
/// `original` preserves the pre-whitespace-control text so standalone-line
/// detection can inspect what the author actually wrote.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentStatement {
    pub value: String,
    pub original: String,
    pub left_stripped: bool,
    pub right_stripped: bool,
    pub loc: SourceLocation,
}

impl ContentStatement {
    pub fn node_type(&self) -> NodeType {
        NodeType::Content
    }
}

/// `{{! comment }}` or an HTML `<!-- comment -->`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommentStatement {
    pub value: String,
    pub strip: Strip,
    pub loc: SourceLocation,
}

impl CommentStatement {
    pub fn node_type(&self) -> NodeType {
        NodeType::Comment
    }
}

/// An HTML element with its attributes, element modifiers and children
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElementNode {
    pub tag: String,
    pub attributes: Vec<AttrNode>,
    pub modifiers: Vec<SubExpression>,
    pub children: Vec<Statement>,
    pub loc: SourceLocation,
}

impl ElementNode {
    pub fn node_type(&self) -> NodeType {
        NodeType::Element
    }
}

/// A hyphenated tag treated as a component invocation. The accumulated
/// children become the component's program; `as |x|` attribute syntax
/// supplies the program's block parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentNode {
    pub tag: String,
    pub attributes: Vec<AttrNode>,
    pub program: Program,
    pub loc: SourceLocation,
}

impl ComponentNode {
    pub fn node_type(&self) -> NodeType {
        NodeType::Component
    }
}

/// An element attribute. The value is text, a single mustache, or a
/// concatenation of both.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttrNode {
    pub name: String,
    pub value: AttrValue,
    pub loc: SourceLocation,
}

impl AttrNode {
    pub fn node_type(&self) -> NodeType {
        NodeType::Attr
    }

    /// Attributes whose value is anything but plain text hydrate through an
    /// attribute morph instead of a static `setAttribute`.
    pub fn is_dynamic(&self) -> bool {
        !matches!(self.value, AttrValue::Text(_))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AttrValue {
    Text(TextNode),
    Mustache(MustacheStatement),
    Concat(ConcatStatement),
}

/// Multi-part attribute value, e.g. `class="a {{b}} c"`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConcatStatement {
    pub parts: Vec<ConcatPart>,
    pub loc: SourceLocation,
}

impl ConcatStatement {
    pub fn node_type(&self) -> NodeType {
        NodeType::Concat
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ConcatPart {
    Text(TextNode),
    Mustache(MustacheStatement),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextNode {
    pub chars: String,
    pub loc: SourceLocation,
}

impl TextNode {
    pub fn node_type(&self) -> NodeType {
        NodeType::Text
    }
}

// ============================================================================
// Expressions
// ============================================================================

/// A callee with arguments: the interior of a mustache, block, partial or
/// parenthesized sub-expression.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubExpression {
    pub path: PathExpression,
    pub params: Vec<Expression>,
    pub hash: Hash,
    pub loc: SourceLocation,
}

impl SubExpression {
    pub fn node_type(&self) -> NodeType {
        NodeType::SubExpression
    }

    /// Helper-vs-path classification: any params or hash pairs mean the
    /// callee names a helper rather than a plain property path.
    pub fn is_helper(&self) -> bool {
        !self.params.is_empty() || !self.hash.pairs.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Expression {
    Path(PathExpression),
    String(StringLiteral),
    Number(NumberLiteral),
    Boolean(BooleanLiteral),
    SubExpression(Box<SubExpression>),
}

impl Expression {
    pub fn node_type(&self) -> NodeType {
        match self {
            Self::Path(_) => NodeType::Path,
            Self::String(_) => NodeType::StringLiteral,
            Self::Number(_) => NodeType::NumberLiteral,
            Self::Boolean(_) => NodeType::BooleanLiteral,
            Self::SubExpression(_) => NodeType::SubExpression,
        }
    }
}

/// A dotted property path. `parts` holds the named segments only;
/// `original` preserves the source text including `this`/`..` prefixes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathExpression {
    pub original: String,
    pub parts: Vec<String>,
    /// true for `@foo` data references
    pub data: bool,
    pub loc: SourceLocation,
}

impl PathExpression {
    pub fn node_type(&self) -> NodeType {
        NodeType::Path
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StringLiteral {
    pub value: String,
    pub loc: SourceLocation,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NumberLiteral {
    pub value: f64,
    pub loc: SourceLocation,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BooleanLiteral {
    pub value: bool,
    pub loc: SourceLocation,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Hash {
    pub pairs: Vec<HashPair>,
}

impl Hash {
    pub fn node_type(&self) -> NodeType {
        NodeType::Hash
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HashPair {
    pub key: String,
    pub value: Expression,
    pub loc: SourceLocation,
}

impl HashPair {
    pub fn node_type(&self) -> NodeType {
        NodeType::HashPair
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builders as b;

    #[test]
    fn is_helper_classification() {
        let plain = b::sexpr(b::path("foo"), vec![], b::hash(vec![]));
        assert!(!plain.is_helper());

        let with_params = b::sexpr(b::path("foo"), vec![b::path_expr("bar")], b::hash(vec![]));
        assert!(with_params.is_helper());

        let with_hash = b::sexpr(
            b::path("foo"),
            vec![],
            b::hash(vec![b::pair("baz", b::number(1.0))]),
        );
        assert!(with_hash.is_helper());
    }

    #[test]
    fn dynamic_attr_classification() {
        let static_attr = b::attr("class", AttrValue::Text(b::text("a")));
        assert!(!static_attr.is_dynamic());

        let dynamic_attr = b::attr(
            "class",
            AttrValue::Mustache(b::mustache(b::sexpr(b::path("x"), vec![], b::hash(vec![])))),
        );
        assert!(dynamic_attr.is_dynamic());
    }
}
