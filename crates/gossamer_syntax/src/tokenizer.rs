//! HTML tokenizer.
//!
//! A state machine over character input producing a flat stream of
//! `StartTag`/`EndTag`/`Chars`/`Comment` tokens. The merging parser drives
//! it incrementally (`tokenize_part`) so mustaches can be placed according
//! to the state the tokenizer is in when they occur; in-progress tokens are
//! therefore exposed for mutation (attribute mustache parts, element
//! modifiers, comment text).
//!
//! Unterminated states at EOF flush whatever partial token exists rather
//! than raising an error.

use compact_str::CompactString;
use gossamer_ast::ast::{MustacheStatement, Position, SourceLocation, SubExpression};

use crate::entity::EntityResolver;
use crate::tag_config::is_void_tag;

fn char_string(c: char) -> CompactString {
    let mut s = CompactString::default();
    s.push(c);
    s
}

/// All the states the tokenizer can be in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum State {
    Data = 1,

    // Tags
    TagOpen,
    TagName,
    EndTagOpen,
    SelfClosingStartTag,

    // Attributes
    BeforeAttributeName,
    AttributeName,
    AfterAttributeName,
    BeforeAttributeValue,
    AttributeValueDoubleQuoted,
    AttributeValueSingleQuoted,
    AttributeValueUnquoted,
    AfterAttributeValueQuoted,

    // Declarations & comments
    MarkupDeclaration,
    CommentStart,
    CommentStartDash,
    Comment,
    CommentEndDash,
    CommentEnd,
}

impl State {
    /// States in which a mustache becomes an element modifier.
    pub fn is_in_tag(&self) -> bool {
        matches!(
            self,
            Self::TagName
                | Self::BeforeAttributeName
                | Self::AttributeName
                | Self::AfterAttributeName
        )
    }

    /// States in which a mustache joins the current attribute's value.
    pub fn is_in_attribute_value(&self) -> bool {
        matches!(
            self,
            Self::BeforeAttributeValue
                | Self::AttributeValueDoubleQuoted
                | Self::AttributeValueSingleQuoted
                | Self::AttributeValueUnquoted
        )
    }

    pub fn is_in_comment(&self) -> bool {
        matches!(
            self,
            Self::CommentStart
                | Self::CommentStartDash
                | Self::Comment
                | Self::CommentEndDash
                | Self::CommentEnd
        )
    }
}

/// One part of an attribute value
#[derive(Debug, Clone, PartialEq)]
pub enum AttrPart {
    Text(CompactString),
    Mustache(MustacheStatement),
}

/// An attribute accumulated on a start tag
#[derive(Debug, Clone, PartialEq)]
pub struct Attribute {
    pub name: CompactString,
    pub parts: Vec<AttrPart>,
    pub quoted: bool,
}

impl Attribute {
    fn new(first: char) -> Self {
        Self {
            name: char_string(first),
            parts: Vec::new(),
            quoted: false,
        }
    }

    fn append_text(&mut self, c: char) {
        if let Some(AttrPart::Text(text)) = self.parts.last_mut() {
            text.push(c);
        } else {
            self.parts.push(AttrPart::Text(char_string(c)));
        }
    }

    fn append_str(&mut self, s: &str) {
        if let Some(AttrPart::Text(text)) = self.parts.last_mut() {
            text.push_str(s);
        } else {
            self.parts.push(AttrPart::Text(CompactString::from(s)));
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StartTag {
    pub tag_name: CompactString,
    pub attributes: Vec<Attribute>,
    pub modifiers: Vec<SubExpression>,
    pub self_closing: bool,
    pub loc: SourceLocation,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EndTag {
    pub tag_name: CompactString,
    /// true for end tags synthesized after void or self-closing start tags
    pub synthetic: bool,
    pub loc: SourceLocation,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Chars {
    pub chars: CompactString,
    pub loc: SourceLocation,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CommentToken {
    pub chars: CompactString,
    pub loc: SourceLocation,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    StartTag(StartTag),
    EndTag(EndTag),
    Chars(Chars),
    Comment(CommentToken),
}

/// HTML tokenizer
pub struct Tokenizer<'e> {
    state: State,
    current: Option<Token>,
    current_attr: Option<Attribute>,
    line: u32,
    column: u32,
    token_start: Position,
    entities: &'e dyn EntityResolver,
}

impl<'e> Tokenizer<'e> {
    pub fn new(entities: &'e dyn EntityResolver) -> Self {
        Self {
            state: State::Data,
            current: None,
            current_attr: None,
            line: 1,
            column: 0,
            token_start: Position::new(1, 0),
            entities,
        }
    }

    /// Tokenize a complete input in one call.
    pub fn tokenize(input: &str, entities: &'e dyn EntityResolver) -> Vec<Token> {
        let mut tokenizer = Self::new(entities);
        let mut tokens = tokenizer.tokenize_part(input);
        if let Some(token) = tokenizer.flush_eof() {
            tokens.push(token);
        }
        tokens
    }

    pub fn state(&self) -> State {
        self.state
    }

    /// Reposition the tokenizer at the start of the next content chunk.
    pub fn set_position(&mut self, pos: Position) {
        self.line = pos.line;
        self.column = pos.column;
    }

    fn pos(&self) -> Position {
        Position::new(self.line, self.column)
    }

    /// Tokenize one chunk of input, returning completed tokens. A trailing
    /// text run stays pending so it can continue across mustaches.
    pub fn tokenize_part(&mut self, input: &str) -> Vec<Token> {
        let chars: Vec<char> = input.chars().collect();
        let mut out = Vec::new();
        let mut i = 0;
        while i < chars.len() {
            let consumed = self.step(&chars, i, &mut out);
            for &c in &chars[i..i + consumed] {
                if c == '\n' {
                    self.line += 1;
                    self.column = 0;
                } else {
                    self.column += 1;
                }
            }
            i += consumed;
        }
        out
    }

    /// Flush whatever token is pending at end of input. Partial tokens from
    /// unterminated states are returned as-is, not reported as errors.
    pub fn flush_eof(&mut self) -> Option<Token> {
        self.finish_attr();
        self.state = State::Data;
        self.current.take().map(|mut token| {
            Self::set_end(&mut token, self.pos());
            token
        })
    }

    /// Complete a pending text run so content can be appended behind it.
    pub fn flush_pending_chars(&mut self) -> Option<Token> {
        if matches!(self.current, Some(Token::Chars(_))) {
            self.current.take().map(|mut token| {
                Self::set_end(&mut token, self.pos());
                token
            })
        } else {
            None
        }
    }

    /// Attach an element modifier to the start tag being built.
    pub fn add_element_modifier(&mut self, sexpr: SubExpression) {
        if let Some(Token::StartTag(tag)) = &mut self.current {
            tag.modifiers.push(sexpr);
        }
    }

    /// Append a mustache to the current attribute's value. In the
    /// before-value state this begins an unquoted value.
    pub fn add_attr_mustache(&mut self, mustache: MustacheStatement) {
        if self.state == State::BeforeAttributeValue {
            self.state = State::AttributeValueUnquoted;
        }
        if let Some(attr) = &mut self.current_attr {
            attr.parts.push(AttrPart::Mustache(mustache));
        }
    }

    /// Append literal text to the comment being built (used to preserve
    /// mustache syntax inside HTML comments).
    pub fn append_comment_text(&mut self, text: &str) {
        if let Some(Token::Comment(comment)) = &mut self.current {
            comment.chars.push_str(text);
        }
    }

    fn set_end(token: &mut Token, end: Position) {
        let loc = match token {
            Token::StartTag(t) => &mut t.loc,
            Token::EndTag(t) => &mut t.loc,
            Token::Chars(t) => &mut t.loc,
            Token::Comment(t) => &mut t.loc,
        };
        loc.end = end;
    }

    // ========== Dispatch ==========

    fn step(&mut self, chars: &[char], i: usize, out: &mut Vec<Token>) -> usize {
        let c = chars[i];
        match self.state {
            State::Data => self.state_data(chars, i, out),
            State::TagOpen => {
                self.state_tag_open(c);
                1
            }
            State::TagName => {
                self.state_tag_name(c, out);
                1
            }
            State::EndTagOpen => {
                self.state_end_tag_open(c);
                1
            }
            State::SelfClosingStartTag => {
                self.state_self_closing_start_tag(c, out);
                1
            }
            State::BeforeAttributeName => {
                self.state_before_attribute_name(c, out);
                1
            }
            State::AttributeName => {
                self.state_attribute_name(c, out);
                1
            }
            State::AfterAttributeName => {
                self.state_after_attribute_name(c, out);
                1
            }
            State::BeforeAttributeValue => {
                self.state_before_attribute_value(c, out);
                1
            }
            State::AttributeValueDoubleQuoted => self.state_attribute_value_quoted(chars, i, '"'),
            State::AttributeValueSingleQuoted => self.state_attribute_value_quoted(chars, i, '\''),
            State::AttributeValueUnquoted => self.state_attribute_value_unquoted(chars, i, out),
            State::AfterAttributeValueQuoted => {
                self.state_after_attribute_value_quoted(c, out);
                1
            }
            State::MarkupDeclaration => self.state_markup_declaration(chars, i),
            State::CommentStart => {
                self.state_comment_start(c, out);
                1
            }
            State::CommentStartDash => {
                self.state_comment_start_dash(c, out);
                1
            }
            State::Comment => {
                self.state_comment(c);
                1
            }
            State::CommentEndDash => {
                self.state_comment_end_dash(c);
                1
            }
            State::CommentEnd => {
                self.state_comment_end(c, out);
                1
            }
        }
    }

    // ========== State handlers ==========

    fn state_data(&mut self, chars: &[char], i: usize, out: &mut Vec<Token>) -> usize {
        let c = chars[i];
        if c == '<' {
            if let Some(mut token) = self.current.take() {
                Self::set_end(&mut token, self.pos());
                out.push(token);
            }
            self.token_start = self.pos();
            self.state = State::TagOpen;
            1
        } else if c == '&' {
            if let Some((expansion, consumed)) = self.consume_entity(chars, i) {
                self.append_chars(&expansion);
                consumed
            } else {
                self.append_chars("&");
                1
            }
        } else {
            self.append_chars_char(c);
            1
        }
    }

    fn state_tag_open(&mut self, c: char) {
        if c == '!' {
            self.state = State::MarkupDeclaration;
        } else if c == '/' {
            self.state = State::EndTagOpen;
        } else if c.is_ascii_alphabetic() {
            self.current = Some(Token::StartTag(StartTag {
                tag_name: char_string(c),
                attributes: Vec::new(),
                modifiers: Vec::new(),
                self_closing: false,
                loc: SourceLocation::new(self.token_start, self.token_start),
            }));
            self.state = State::TagName;
        } else {
            // Lenient: a lone `<` is text
            self.append_chars_char('<');
            self.state = State::Data;
            self.append_chars_char(c);
        }
    }

    fn state_tag_name(&mut self, c: char, out: &mut Vec<Token>) {
        if c.is_whitespace() {
            self.state = State::BeforeAttributeName;
        } else if c == '/' {
            self.state = State::SelfClosingStartTag;
        } else if c == '>' {
            self.finish_tag(out);
        } else {
            match &mut self.current {
                Some(Token::StartTag(tag)) => tag.tag_name.push(c),
                Some(Token::EndTag(tag)) => tag.tag_name.push(c),
                _ => {}
            }
        }
    }

    fn state_end_tag_open(&mut self, c: char) {
        if c.is_ascii_alphabetic() {
            self.current = Some(Token::EndTag(EndTag {
                tag_name: char_string(c),
                synthetic: false,
                loc: SourceLocation::new(self.token_start, self.token_start),
            }));
            self.state = State::TagName;
        }
    }

    fn state_self_closing_start_tag(&mut self, c: char, out: &mut Vec<Token>) {
        if c == '>' {
            if let Some(Token::StartTag(tag)) = &mut self.current {
                tag.self_closing = true;
            }
            self.finish_tag(out);
        } else {
            self.state = State::BeforeAttributeName;
            self.state_before_attribute_name(c, out);
        }
    }

    fn state_before_attribute_name(&mut self, c: char, out: &mut Vec<Token>) {
        if c.is_whitespace() {
            // Skip
        } else if c == '/' {
            self.state = State::SelfClosingStartTag;
        } else if c == '>' {
            self.finish_tag(out);
        } else {
            self.start_attr(c);
        }
    }

    fn state_attribute_name(&mut self, c: char, out: &mut Vec<Token>) {
        if c.is_whitespace() {
            self.state = State::AfterAttributeName;
        } else if c == '/' {
            self.finish_attr();
            self.state = State::SelfClosingStartTag;
        } else if c == '=' {
            self.state = State::BeforeAttributeValue;
        } else if c == '>' {
            self.finish_tag(out);
        } else if let Some(attr) = &mut self.current_attr {
            attr.name.push(c);
        }
    }

    fn state_after_attribute_name(&mut self, c: char, out: &mut Vec<Token>) {
        if c.is_whitespace() {
            // Skip
        } else if c == '/' {
            self.finish_attr();
            self.state = State::SelfClosingStartTag;
        } else if c == '=' {
            self.state = State::BeforeAttributeValue;
        } else if c == '>' {
            self.finish_tag(out);
        } else {
            self.finish_attr();
            self.start_attr(c);
        }
    }

    fn state_before_attribute_value(&mut self, c: char, out: &mut Vec<Token>) {
        if c.is_whitespace() {
            // Skip
        } else if c == '"' {
            self.state = State::AttributeValueDoubleQuoted;
            if let Some(attr) = &mut self.current_attr {
                attr.quoted = true;
            }
        } else if c == '\'' {
            self.state = State::AttributeValueSingleQuoted;
            if let Some(attr) = &mut self.current_attr {
                attr.quoted = true;
            }
        } else if c == '>' {
            self.finish_tag(out);
        } else {
            self.state = State::AttributeValueUnquoted;
            if let Some(attr) = &mut self.current_attr {
                attr.append_text(c);
            }
        }
    }

    fn state_attribute_value_quoted(&mut self, chars: &[char], i: usize, quote: char) -> usize {
        let c = chars[i];
        if c == quote {
            self.finish_attr();
            self.state = State::AfterAttributeValueQuoted;
            1
        } else if c == '&' {
            if let Some((expansion, consumed)) = self.consume_entity(chars, i) {
                if let Some(attr) = &mut self.current_attr {
                    attr.append_str(&expansion);
                }
                consumed
            } else {
                if let Some(attr) = &mut self.current_attr {
                    attr.append_text('&');
                }
                1
            }
        } else {
            if let Some(attr) = &mut self.current_attr {
                attr.append_text(c);
            }
            1
        }
    }

    fn state_attribute_value_unquoted(
        &mut self,
        chars: &[char],
        i: usize,
        out: &mut Vec<Token>,
    ) -> usize {
        let c = chars[i];
        if c.is_whitespace() {
            self.finish_attr();
            self.state = State::BeforeAttributeName;
            1
        } else if c == '>' {
            self.finish_attr();
            self.finish_tag(out);
            1
        } else if c == '&' {
            if let Some((expansion, consumed)) = self.consume_entity(chars, i) {
                if let Some(attr) = &mut self.current_attr {
                    attr.append_str(&expansion);
                }
                consumed
            } else {
                if let Some(attr) = &mut self.current_attr {
                    attr.append_text('&');
                }
                1
            }
        } else {
            if let Some(attr) = &mut self.current_attr {
                attr.append_text(c);
            }
            1
        }
    }

    fn state_after_attribute_value_quoted(&mut self, c: char, out: &mut Vec<Token>) {
        if c.is_whitespace() {
            self.state = State::BeforeAttributeName;
        } else if c == '/' {
            self.state = State::SelfClosingStartTag;
        } else if c == '>' {
            self.finish_tag(out);
        } else {
            self.state = State::BeforeAttributeName;
            self.state_before_attribute_name(c, out);
        }
    }

    fn state_markup_declaration(&mut self, chars: &[char], i: usize) -> usize {
        let c = chars[i];
        if c == '-' && chars.get(i + 1) == Some(&'-') {
            self.current = Some(Token::Comment(CommentToken {
                chars: CompactString::default(),
                loc: SourceLocation::new(self.token_start, self.token_start),
            }));
            self.state = State::CommentStart;
            2
        } else {
            // Doctypes and other declarations are captured comment-style
            self.current = Some(Token::Comment(CommentToken {
                chars: char_string(c),
                loc: SourceLocation::new(self.token_start, self.token_start),
            }));
            self.state = State::Comment;
            1
        }
    }

    fn state_comment_start(&mut self, c: char, out: &mut Vec<Token>) {
        if c == '-' {
            self.state = State::CommentStartDash;
        } else if c == '>' {
            self.finish_comment(out);
        } else {
            self.append_comment_char(c);
            self.state = State::Comment;
        }
    }

    fn state_comment_start_dash(&mut self, c: char, out: &mut Vec<Token>) {
        if c == '-' {
            self.state = State::CommentEnd;
        } else if c == '>' {
            self.finish_comment(out);
        } else {
            self.append_comment_char('-');
            self.append_comment_char(c);
            self.state = State::Comment;
        }
    }

    fn state_comment(&mut self, c: char) {
        if c == '-' {
            self.state = State::CommentEndDash;
        } else {
            self.append_comment_char(c);
        }
    }

    fn state_comment_end_dash(&mut self, c: char) {
        if c == '-' {
            self.state = State::CommentEnd;
        } else {
            self.append_comment_char('-');
            self.append_comment_char(c);
            self.state = State::Comment;
        }
    }

    fn state_comment_end(&mut self, c: char, out: &mut Vec<Token>) {
        if c == '>' {
            self.finish_comment(out);
        } else if c == '-' {
            self.append_comment_char('-');
        } else {
            self.append_comment_char('-');
            self.append_comment_char('-');
            self.append_comment_char(c);
            self.state = State::Comment;
        }
    }

    // ========== Token assembly ==========

    fn append_chars(&mut self, s: &str) {
        self.ensure_chars();
        if let Some(Token::Chars(chars)) = &mut self.current {
            chars.chars.push_str(s);
        }
    }

    fn append_chars_char(&mut self, c: char) {
        self.ensure_chars();
        if let Some(Token::Chars(chars)) = &mut self.current {
            chars.chars.push(c);
        }
    }

    fn ensure_chars(&mut self) {
        if !matches!(self.current, Some(Token::Chars(_))) {
            let start = self.pos();
            self.current = Some(Token::Chars(Chars {
                chars: CompactString::default(),
                loc: SourceLocation::new(start, start),
            }));
        }
    }

    fn append_comment_char(&mut self, c: char) {
        if let Some(Token::Comment(comment)) = &mut self.current {
            comment.chars.push(c);
        }
    }

    fn start_attr(&mut self, c: char) {
        self.current_attr = Some(Attribute::new(c));
        self.state = State::AttributeName;
    }

    fn finish_attr(&mut self) {
        if let Some(attr) = self.current_attr.take() {
            if let Some(Token::StartTag(tag)) = &mut self.current {
                tag.attributes.push(attr);
            }
        }
    }

    fn finish_tag(&mut self, out: &mut Vec<Token>) {
        self.finish_attr();
        if let Some(mut token) = self.current.take() {
            Self::set_end(&mut token, self.pos());
            let synthetic_end = match &token {
                Token::StartTag(tag) if tag.self_closing || is_void_tag(&tag.tag_name) => {
                    Some(EndTag {
                        tag_name: tag.tag_name.clone(),
                        synthetic: true,
                        loc: SourceLocation::new(self.pos(), self.pos()),
                    })
                }
                _ => None,
            };
            out.push(token);
            if let Some(end) = synthetic_end {
                out.push(Token::EndTag(end));
            }
        }
        self.state = State::Data;
    }

    fn finish_comment(&mut self, out: &mut Vec<Token>) {
        if let Some(mut token) = self.current.take() {
            Self::set_end(&mut token, self.pos());
            out.push(token);
        }
        self.state = State::Data;
    }

    /// Try to consume a character reference starting at `chars[i] == '&'`.
    /// Returns the expansion and the total number of source chars consumed.
    fn consume_entity(&self, chars: &[char], i: usize) -> Option<(CompactString, usize)> {
        let mut j = i + 1;
        if j >= chars.len() {
            return None;
        }
        if chars[j] == '#' {
            j += 1;
            let hex = j < chars.len() && (chars[j] == 'x' || chars[j] == 'X');
            if hex {
                j += 1;
            }
            let digits_start = j;
            while j < chars.len() && chars[j].is_ascii_hexdigit() {
                j += 1;
            }
            if j == digits_start || j >= chars.len() || chars[j] != ';' {
                return None;
            }
            let digits: std::string::String = chars[digits_start..j].iter().collect();
            let code = u32::from_str_radix(&digits, if hex { 16 } else { 10 }).ok()?;
            let c = char::from_u32(code)?;
            Some((char_string(c), j - i + 1))
        } else {
            let name_start = j;
            while j < chars.len() && chars[j].is_ascii_alphanumeric() {
                j += 1;
            }
            if j == name_start || j >= chars.len() || chars[j] != ';' {
                return None;
            }
            let name: std::string::String = chars[name_start..j].iter().collect();
            let expansion = self.entities.resolve(&name)?;
            Some((expansion, j - i + 1))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::HtmlEntities;

    fn tokenize(input: &str) -> Vec<Token> {
        Tokenizer::tokenize(input, &HtmlEntities)
    }

    fn tag_names(tokens: &[Token]) -> Vec<std::string::String> {
        tokens
            .iter()
            .map(|t| match t {
                Token::StartTag(t) => format!("<{}>", t.tag_name),
                Token::EndTag(t) => format!("</{}>", t.tag_name),
                Token::Chars(t) => format!("'{}'", t.chars),
                Token::Comment(t) => format!("<!--{}-->", t.chars),
            })
            .collect()
    }

    #[test]
    fn simple_element() {
        let tokens = tokenize("<div>hello</div>");
        assert_eq!(tag_names(&tokens), vec!["<div>", "'hello'", "</div>"]);
    }

    #[test]
    fn attributes_with_quoting() {
        let tokens = tokenize(r#"<a href="x" id='y' class=z></a>"#);
        let Token::StartTag(tag) = &tokens[0] else {
            panic!("expected start tag");
        };
        assert_eq!(tag.attributes.len(), 3);
        assert_eq!(tag.attributes[0].name, "href");
        assert!(tag.attributes[0].quoted);
        assert_eq!(
            tag.attributes[0].parts,
            vec![AttrPart::Text("x".into())]
        );
        assert!(!tag.attributes[2].quoted);
        assert_eq!(tag.attributes[2].parts, vec![AttrPart::Text("z".into())]);
    }

    #[test]
    fn void_tag_synthesizes_end_tag() {
        let tokens = tokenize("<br>");
        assert_eq!(tag_names(&tokens), vec!["<br>", "</br>"]);
        let Token::EndTag(end) = &tokens[1] else {
            panic!("expected end tag");
        };
        assert!(end.synthetic);
    }

    #[test]
    fn self_closing_synthesizes_end_tag() {
        let tokens = tokenize("<x-widget/>");
        assert_eq!(tag_names(&tokens), vec!["<x-widget>", "</x-widget>"]);
    }

    #[test]
    fn comment_token() {
        let tokens = tokenize("<!-- hi -->");
        assert_eq!(tag_names(&tokens), vec!["<!-- hi -->"]);
    }

    #[test]
    fn named_entity_in_data() {
        let tokens = tokenize("a &amp; b");
        assert_eq!(tag_names(&tokens), vec!["'a & b'"]);
    }

    #[test]
    fn numeric_entities() {
        let tokens = tokenize("&#65;&#x42;");
        assert_eq!(tag_names(&tokens), vec!["'AB'"]);
    }

    #[test]
    fn unknown_entity_falls_back_to_ampersand() {
        let tokens = tokenize("a &bogus2; b");
        assert_eq!(tag_names(&tokens), vec!["'a &bogus2; b'"]);
    }

    #[test]
    fn entity_in_attribute_value() {
        let tokens = tokenize(r#"<a title="x &lt; y">"#);
        let Token::StartTag(tag) = &tokens[0] else {
            panic!("expected start tag");
        };
        assert_eq!(
            tag.attributes[0].parts,
            vec![AttrPart::Text("x < y".into())]
        );
    }

    #[test]
    fn eof_flushes_partial_tag_silently() {
        let mut tokenizer = Tokenizer::new(&HtmlEntities);
        let tokens = tokenizer.tokenize_part("<div class=");
        assert!(tokens.is_empty());
        let flushed = tokenizer.flush_eof();
        assert!(matches!(flushed, Some(Token::StartTag(_))));
    }

    #[test]
    fn token_positions() {
        let tokens = tokenize("ab\ncd<p>");
        let Token::Chars(chars) = &tokens[0] else {
            panic!("expected chars");
        };
        assert_eq!(chars.loc.start, Position::new(1, 0));
        assert_eq!(chars.loc.end, Position::new(2, 2));
        let Token::StartTag(tag) = &tokens[1] else {
            panic!("expected start tag");
        };
        assert_eq!(tag.loc.start, Position::new(2, 2));
    }

    #[test]
    fn case_preserved_in_tag_names() {
        let tokens = tokenize("<foreignObject></foreignObject>");
        let Token::StartTag(tag) = &tokens[0] else {
            panic!("expected start tag");
        };
        assert_eq!(tag.tag_name, "foreignObject");
    }
}
