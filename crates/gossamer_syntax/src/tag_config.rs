//! Static tag and attribute configuration tables.

use phf::{phf_set, Set};

/// Void elements: tags that never take children and whose start tag
/// implies an immediate end tag.
pub static VOID_TAGS: Set<&'static str> = phf_set! {
    "area", "base", "br", "col", "command", "embed", "hr", "img", "input",
    "keygen", "link", "meta", "param", "source", "track", "wbr",
};

/// Elements that re-enter HTML content while inside an SVG subtree.
pub static SVG_INTEGRATION_POINTS: Set<&'static str> = phf_set! {
    "foreignObject", "desc", "title",
};

pub fn is_void_tag(tag: &str) -> bool {
    VOID_TAGS.contains(&tag.to_ascii_lowercase()[..])
}

pub fn is_svg_integration_point(tag: &str) -> bool {
    SVG_INTEGRATION_POINTS.contains(tag)
}

/// Namespace URI for a prefixed attribute name, e.g. `xlink:href`.
pub fn attr_namespace(name: &str) -> Option<&'static str> {
    let prefix = name.split(':').next()?;
    match prefix {
        "xlink" => Some("http://www.w3.org/1999/xlink"),
        "xml" => Some("http://www.w3.org/XML/1998/namespace"),
        "xmlns" => Some("http://www.w3.org/2000/xmlns/"),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn void_tags_are_case_insensitive() {
        assert!(is_void_tag("br"));
        assert!(is_void_tag("BR"));
        assert!(!is_void_tag("div"));
    }

    #[test]
    fn integration_points_preserve_case() {
        assert!(is_svg_integration_point("foreignObject"));
        assert!(!is_svg_integration_point("foreignobject"));
    }

    #[test]
    fn xlink_attr_namespace() {
        assert_eq!(
            attr_namespace("xlink:href"),
            Some("http://www.w3.org/1999/xlink")
        );
        assert_eq!(attr_namespace("href"), None);
    }
}
