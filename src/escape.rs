//! Escape codec for string-typed payloads.
//!
//! NIML reserves five markup characters inside quoted string payloads and
//! replaces them with XML-style named entities. The codec applies only to
//! `String`-typed payload content (a [`Payload::Text`](crate::Payload::Text)
//! value or the string cells of heterogeneous columns); attribute values and
//! numeric payloads are never escaped.
//!
//! `&` is escaped first and unescaped last so the two directions are exact
//! inverses even when the input already contains entity-shaped text.

/// Entity table in escape order: `&` must come first.
const ENTITIES: [(char, &str); 5] = [
    ('&', "&amp;"),
    ('<', "&lt;"),
    ('>', "&gt;"),
    ('"', "&quot;"),
    ('\'', "&apos;"),
];

/// Replaces the five reserved characters with their named entities.
///
/// # Examples
///
/// ```rust
/// use niml::escape::escape;
///
/// assert_eq!(escape("a < b & c"), "a &lt; b &amp; c");
/// ```
#[must_use]
pub fn escape(s: &str) -> String {
    let mut out = s.to_string();
    for (ch, entity) in ENTITIES {
        if out.contains(ch) {
            out = out.replace(ch, entity);
        }
    }
    out
}

/// Exact inverse of [`escape`]: replaces named entities with their literal
/// characters, `&amp;` last. Text containing no entities passes through
/// unchanged.
///
/// # Examples
///
/// ```rust
/// use niml::escape::unescape;
///
/// assert_eq!(unescape("a &lt; b &amp; c"), "a < b & c");
/// assert_eq!(unescape("plain text"), "plain text");
/// ```
#[must_use]
pub fn unescape(s: &str) -> String {
    let mut out = s.to_string();
    for (ch, entity) in ENTITIES.iter().rev() {
        if out.contains(entity) {
            out = out.replace(entity, &ch.to_string());
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip_all_reserved() {
        let original = r#"<dset name="a & b">'quoted'</dset>"#;
        assert_eq!(unescape(&escape(original)), original);
    }

    #[test]
    fn escape_ampersand_first() {
        // If & were escaped after <, "&lt;" would become "&amp;lt;".
        assert_eq!(escape("<"), "&lt;");
        assert_eq!(escape("&lt;"), "&amp;lt;");
        assert_eq!(unescape("&amp;lt;"), "&lt;");
    }

    #[test]
    fn unescape_no_entities_is_noop() {
        assert_eq!(unescape("hello world"), "hello world");
        assert_eq!(unescape(""), "");
    }
}
