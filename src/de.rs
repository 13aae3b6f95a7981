//! NIML document parsing.
//!
//! The parser is a recursive-descent reader over a fully buffered byte
//! slice. The tricky part of the format is that raw binary payloads have no
//! escaping, so terminator-like byte sequences can legitimately occur inside
//! the data and the parser cannot tokenize by scanning for markers. Instead
//! it reads each header first, derives the exact payload byte count from the
//! declared counts and type widths, and slices that many bytes analytically.
//! Scanning for the close tag is used only for encodings proven not to
//! contain marker bytes: text, base64 and quoted string data.
//!
//! Parsing is fail-fast: the first structural error aborts with no partial
//! tree and no recovery.
//!
//! ## Usage
//!
//! Most users should use [`parse`](crate::parse) in the crate root:
//!
//! ```rust
//! use niml::parse;
//!
//! let doc = b"<node_data\n   ni_type=\"2*int\"\n   ni_dimen=\"2\" >1 2\n3 4</node_data>";
//! let elements = parse(doc).unwrap();
//! assert_eq!(elements.len(), 1);
//! assert_eq!(elements[0].name(), "node_data");
//! ```

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use log::{debug, trace};

use crate::attrs::AttrMap;
use crate::element::{Column, DataElement, Element, Group, Matrix, Payload};
use crate::error::{NimlError, Result};
use crate::escape::unescape;
use crate::form::{ByteOrder, Form, GROUP_FORM};
use crate::length::binary_byte_count;
use crate::types::{find_uniform_type, parse_type_list, NumericData, TypeCode};

/// Longest excerpt of the input quoted in error messages.
const EXCERPT_LEN: usize = 48;

/// Renders a short, lossily-decoded excerpt of the input around `position`
/// for error messages.
pub(crate) fn excerpt(input: &[u8], position: usize) -> String {
    let end = (position + EXCERPT_LEN).min(input.len());
    let mut text: String = String::from_utf8_lossy(&input[position.min(input.len())..end])
        .chars()
        .map(|c| if c.is_control() { '.' } else { c })
        .collect();
    if end < input.len() {
        text.push_str("...");
    }
    text
}

/// A parsed element header: the tag name and its key/value attributes.
struct Header {
    name: String,
    attrs: AttrMap,
}

/// The NIML parser: a cursor over a fully buffered document.
pub struct Parser<'a> {
    input: &'a [u8],
    position: usize,
}

impl<'a> Parser<'a> {
    #[must_use]
    pub fn new(input: &'a [u8]) -> Self {
        Parser { input, position: 0 }
    }

    /// Parses the whole buffer into the ordered list of top-level elements.
    pub fn parse_document(mut self) -> Result<Vec<Element>> {
        debug!("parsing document of {} bytes", self.input.len());
        self.parse_elements(None)
    }

    fn rest(&self) -> &'a [u8] {
        &self.input[self.position..]
    }

    fn at_end(&self) -> bool {
        self.position >= self.input.len()
    }

    fn peek(&self) -> Option<u8> {
        self.input.get(self.position).copied()
    }

    fn advance(&mut self, n: usize) {
        self.position = (self.position + n).min(self.input.len());
    }

    fn skip_whitespace(&mut self) {
        while matches!(self.peek(), Some(b) if b.is_ascii_whitespace()) {
            self.position += 1;
        }
    }

    fn malformed(&self, msg: &str) -> NimlError {
        NimlError::malformed(self.position, msg, excerpt(self.input, self.position))
    }

    /// Parses sibling elements until the close tag named `close_name` (which
    /// is consumed, leaving the cursor exactly past it), or until the end of
    /// the buffer at the top level.
    fn parse_elements(&mut self, close_name: Option<&str>) -> Result<Vec<Element>> {
        let mut elements = Vec::new();
        loop {
            self.skip_whitespace();

            // an XML-style declaration may precede the elements
            if self.rest().starts_with(b"<?xml") {
                match self.rest().iter().position(|&b| b == b'>') {
                    Some(end) => self.advance(end + 1),
                    None => return Err(self.malformed("unterminated XML declaration")),
                }
                continue;
            }

            if self.at_end() {
                return match close_name {
                    None => Ok(elements),
                    Some(expected) => Err(NimlError::missing_close_tag(
                        self.position,
                        &format!("</{expected}>"),
                        "end of input".to_string(),
                    )),
                };
            }

            if let Some(name) = self.try_close_tag() {
                match close_name {
                    Some(expected) if name == expected => return Ok(elements),
                    Some(expected) => {
                        return Err(NimlError::missing_close_tag(
                            self.position,
                            &format!("</{expected}>"),
                            format!("</{name}>"),
                        ));
                    }
                    None => {
                        // A close tag with no open element at the top level:
                        // NIFTI extensions leave null padding after the tree,
                        // so only nulls and whitespace may remain.
                        if self
                            .rest()
                            .iter()
                            .all(|&b| b == 0 || b.is_ascii_whitespace())
                        {
                            return Ok(elements);
                        }
                        return Err(NimlError::UnexpectedTrailingData {
                            position: self.position,
                            excerpt: excerpt(self.input, self.position),
                        });
                    }
                }
            }

            let header = self.parse_header()?;
            let element = if header.attrs.get("ni_form") == Some(GROUP_FORM) {
                trace!("entering group <{}>", header.name);
                let children = self.parse_elements(Some(&header.name))?;
                trace!("leaving group <{}>", header.name);
                Element::Group(Group {
                    name: header.name,
                    attrs: header.attrs,
                    children,
                })
            } else {
                Element::Data(self.parse_data_element(header)?)
            };
            elements.push(element);
        }
    }

    /// Consumes `</name>` at the cursor if present, returning the name.
    /// Leaves the cursor untouched when the pattern does not match.
    fn try_close_tag(&mut self) -> Option<String> {
        let rest = self.rest();
        if !rest.starts_with(b"</") {
            return None;
        }
        let name_len = rest[2..]
            .iter()
            .take_while(|b| is_name_byte(**b))
            .count();
        if name_len == 0 || rest.get(2 + name_len) != Some(&b'>') {
            return None;
        }
        let name = String::from_utf8_lossy(&rest[2..2 + name_len]).into_owned();
        self.advance(2 + name_len + 1);
        Some(name)
    }

    /// Matches `<name key="value" ...>` at the cursor. Attribute values may
    /// contain any byte except `"` and are not unescaped (escaping is a
    /// string-payload concept only).
    fn parse_header(&mut self) -> Result<Header> {
        if self.peek() != Some(b'<') {
            return Err(self.malformed("expected an element header"));
        }
        let rest = self.rest();
        let name_len = rest[1..].iter().take_while(|b| is_name_byte(**b)).count();
        if name_len == 0 {
            return Err(self.malformed("expected an element name after '<'"));
        }
        let name = String::from_utf8_lossy(&rest[1..1 + name_len]).into_owned();
        self.advance(1 + name_len);

        let mut attrs = AttrMap::new();
        loop {
            self.skip_whitespace();
            match self.peek() {
                Some(b'>') => {
                    self.advance(1);
                    break;
                }
                Some(b) if is_name_byte(b) => {
                    let key_len = self
                        .rest()
                        .iter()
                        .take_while(|b| is_name_byte(**b))
                        .count();
                    let key = String::from_utf8_lossy(&self.rest()[..key_len]).into_owned();
                    self.advance(key_len);
                    self.skip_whitespace();
                    if self.peek() != Some(b'=') {
                        return Err(self.malformed("expected '=' after attribute key"));
                    }
                    self.advance(1);
                    self.skip_whitespace();
                    if self.peek() != Some(b'"') {
                        return Err(self.malformed("expected '\"' to open attribute value"));
                    }
                    self.advance(1);
                    let value_len = match self.rest().iter().position(|&b| b == b'"') {
                        Some(n) => n,
                        None => return Err(self.malformed("unterminated attribute value")),
                    };
                    let value =
                        String::from_utf8_lossy(&self.rest()[..value_len]).into_owned();
                    self.advance(value_len + 1);
                    attrs.insert(key, value);
                }
                _ => return Err(self.malformed("expected attribute key or '>' in header")),
            }
        }

        trace!("parsed header <{name}> with {} attributes", attrs.len());
        Ok(Header { name, attrs })
    }

    /// Decodes the payload of a non-group element and consumes its close tag.
    fn parse_data_element(&mut self, header: Header) -> Result<DataElement> {
        let Header { name, attrs } = header;

        let ni_type = attrs.get("ni_type").ok_or_else(|| NimlError::MissingAttribute {
            element: name.clone(),
            attribute: "ni_type",
        })?;
        let column_types = parse_type_list(ni_type)?;
        let ni_dimen = attrs.get("ni_dimen").ok_or_else(|| NimlError::MissingAttribute {
            element: name.clone(),
            attribute: "ni_dimen",
        })?;
        let row_count: usize = ni_dimen
            .trim()
            .parse()
            .map_err(|_| NimlError::invalid_value("ni_dimen", ni_dimen))?;

        let uniform = find_uniform_type(&column_types);
        let form = Form::from_optional_tag(attrs.get("ni_form"))?;
        debug!(
            "data element <{name}>: {} columns x {row_count} rows, {form:?}",
            column_types.len()
        );

        // String payloads cannot contain an unescaped close tag, so they are
        // always scanned, whatever ni_form claims.
        let payload = if uniform == Some(TypeCode::String) {
            self.parse_quoted_string(&name)?
        } else {
            match form {
                Form::Text => {
                    self.parse_text_payload(&name, &column_types, row_count, uniform)?
                }
                Form::Binary(order) => {
                    self.parse_binary_payload(&name, &column_types, row_count, order)?
                }
                Form::Base64(order) => {
                    self.parse_base64_payload(&name, &column_types, row_count, order)?
                }
            }
        };

        Ok(DataElement::from_parts(
            name,
            attrs,
            column_types,
            row_count,
            payload,
        ))
    }

    /// Scanning path for string data: `"escaped text"` followed by the close
    /// tag.
    fn parse_quoted_string(&mut self, name: &str) -> Result<Payload> {
        self.skip_whitespace();
        if self.peek() != Some(b'"') {
            return Err(self.malformed("expected '\"' to open string data"));
        }
        self.advance(1);
        let len = match self.rest().iter().position(|&b| b == b'"') {
            Some(n) => n,
            None => return Err(self.malformed("unterminated string data")),
        };
        let raw = String::from_utf8_lossy(&self.rest()[..len]).into_owned();
        self.advance(len + 1);
        self.skip_whitespace();
        self.expect_close_tag_or(name, |parser| {
            parser.malformed("expected close tag after string data")
        })?;
        Ok(Payload::Text(unescape(&raw)))
    }

    /// Scanning path for textual numeric data: capture everything up to the
    /// close tag, then convert per the declared column types.
    fn parse_text_payload(
        &mut self,
        name: &str,
        column_types: &[TypeCode],
        row_count: usize,
        uniform: Option<TypeCode>,
    ) -> Result<Payload> {
        let close = format!("</{name}>");
        let idx = find_subsequence(self.rest(), close.as_bytes())
            .ok_or_else(|| self.malformed("close tag not found for text data"))?;
        let text = String::from_utf8_lossy(&self.rest()[..idx]).into_owned();
        self.advance(idx + close.len());

        match uniform {
            Some(code) => decode_uniform_text(&text, code, column_types.len(), row_count),
            None => decode_mixed_text(&text, column_types, row_count),
        }
    }

    /// Analytical path for raw binary: slice exactly the computed byte count,
    /// never scan, then assert the close tag.
    fn parse_binary_payload(
        &mut self,
        name: &str,
        column_types: &[TypeCode],
        row_count: usize,
        order: ByteOrder,
    ) -> Result<Payload> {
        let nbytes = binary_byte_count(column_types, row_count)?;
        debug!("binary payload: {nbytes} bytes at position {}", self.position);
        let expected = format!("</{name}>");
        if self.rest().len() < nbytes {
            return Err(NimlError::missing_close_tag(
                self.position,
                &expected,
                "end of input".to_string(),
            ));
        }
        let bytes = &self.rest()[..nbytes];
        let cols = column_types.len();
        // uniform is guaranteed by the byte count calculation above
        let code = find_uniform_type(column_types)
            .ok_or_else(|| NimlError::unsupported_encoding("binary form with mixed columns"))?;
        let data = NumericData::from_bytes(code, order, bytes)?;
        self.advance(nbytes);
        self.expect_close_tag_or(name, |parser| {
            NimlError::missing_close_tag(
                parser.position,
                &expected,
                excerpt(parser.input, parser.position),
            )
        })?;
        Ok(Payload::Matrix(Matrix::new(row_count, cols, data)?))
    }

    /// Base64 payloads cannot contain the `<` delimiter, so scanning to the
    /// next `<` bounds the payload exactly.
    fn parse_base64_payload(
        &mut self,
        name: &str,
        column_types: &[TypeCode],
        row_count: usize,
        order: ByteOrder,
    ) -> Result<Payload> {
        let nbytes = binary_byte_count(column_types, row_count)?;
        let idx = self
            .rest()
            .iter()
            .position(|&b| b == b'<')
            .ok_or_else(|| self.malformed("close tag not found for base64 data"))?;
        let encoded: Vec<u8> = self.rest()[..idx]
            .iter()
            .copied()
            .filter(|b| !b.is_ascii_whitespace())
            .collect();
        self.advance(idx);
        let bytes = BASE64
            .decode(&encoded)
            .map_err(|e| NimlError::invalid_value("base64", &e.to_string()))?;
        let cols = column_types.len();
        let code = find_uniform_type(column_types)
            .ok_or_else(|| NimlError::unsupported_encoding("base64 form with mixed columns"))?;
        if bytes.len() != nbytes {
            let width = code.byte_width().unwrap_or(1);
            return Err(NimlError::RowCountMismatch {
                expected: row_count,
                found: bytes.len() / (cols * width).max(1),
            });
        }
        let expected = format!("</{name}>");
        self.expect_close_tag_or(name, |parser| {
            NimlError::missing_close_tag(
                parser.position,
                &expected,
                excerpt(parser.input, parser.position),
            )
        })?;
        let data = NumericData::from_bytes(code, order, &bytes)?;
        Ok(Payload::Matrix(Matrix::new(row_count, cols, data)?))
    }

    /// Consumes `</name>` at the cursor or fails with the caller's error.
    fn expect_close_tag_or(
        &mut self,
        name: &str,
        err: impl FnOnce(&Self) -> NimlError,
    ) -> Result<()> {
        let close = format!("</{name}>");
        if self.rest().starts_with(close.as_bytes()) {
            self.advance(close.len());
            Ok(())
        } else {
            Err(err(self))
        }
    }
}

fn is_name_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

fn find_subsequence(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

/// Decodes whitespace-separated text into a uniform numeric matrix.
fn decode_uniform_text(
    text: &str,
    code: TypeCode,
    cols: usize,
    rows: usize,
) -> Result<Payload> {
    let tokens: Vec<&str> = text.split_whitespace().collect();
    if tokens.len() != rows * cols {
        return Err(NimlError::RowCountMismatch {
            expected: rows,
            found: if cols > 0 { tokens.len() / cols } else { 0 },
        });
    }
    let data = NumericData::parse_tokens(code, tokens)?;
    Ok(Payload::Matrix(Matrix::new(rows, cols, data)?))
}

/// Decodes mixed-type text: rows split on line breaks, cells on whitespace,
/// each cell by its own column's converter.
fn decode_mixed_text(text: &str, column_types: &[TypeCode], rows: usize) -> Result<Payload> {
    let lines: Vec<&str> = text
        .trim()
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect();
    if lines.len() != rows {
        return Err(NimlError::RowCountMismatch {
            expected: rows,
            found: lines.len(),
        });
    }

    let cols = column_types.len();
    let mut cells: Vec<Vec<&str>> = Vec::with_capacity(rows);
    for line in &lines {
        let row: Vec<&str> = line.split_whitespace().collect();
        if row.len() != cols {
            return Err(NimlError::ColumnCountMismatch {
                expected: cols,
                found: row.len(),
            });
        }
        cells.push(row);
    }

    let mut columns = Vec::with_capacity(cols);
    for (c, code) in column_types.iter().enumerate() {
        let column_cells = cells.iter().map(|row| row[c]);
        let column = if code.is_string() {
            Column::Strings(column_cells.map(unescape).collect())
        } else {
            Column::Numeric(NumericData::parse_tokens(*code, column_cells)?)
        };
        columns.push(column);
    }
    Ok(Payload::Columns(columns))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(input: &[u8]) -> Result<Vec<Element>> {
        Parser::new(input).parse_document()
    }

    #[test]
    fn excerpt_is_bounded_and_printable() {
        let text = excerpt(b"abc\x00def", 0);
        assert_eq!(text, "abc.def");
        let long = vec![b'x'; 200];
        assert!(excerpt(&long, 0).len() <= EXCERPT_LEN + 3);
    }

    #[test]
    fn header_values_keep_entities_verbatim() {
        let doc = b"<d\n   ni_type=\"int\"\n   ni_dimen=\"1\"\n   label=\"a&amp;b\" >7</d>";
        let elements = parse(doc).unwrap();
        assert_eq!(elements[0].attrs().get("label"), Some("a&amp;b"));
    }

    #[test]
    fn xml_prolog_skipped() {
        let doc = b"<?xml version=\"1.0\"?>\n<d\n   ni_type=\"int\"\n   ni_dimen=\"1\" >5</d>";
        let elements = parse(doc).unwrap();
        assert_eq!(elements.len(), 1);
    }

    #[test]
    fn stray_close_with_null_padding_ok() {
        let doc = b"<d\n   ni_type=\"int\"\n   ni_dimen=\"1\" >5</d></wrapper>\x00\x00  ";
        let elements = parse(doc).unwrap();
        assert_eq!(elements.len(), 1);
    }

    #[test]
    fn stray_close_with_garbage_fails() {
        let doc = b"<d\n   ni_type=\"int\"\n   ni_dimen=\"1\" >5</d></wrapper>junk";
        assert!(matches!(
            parse(doc),
            Err(NimlError::UnexpectedTrailingData { .. })
        ));
    }

    #[test]
    fn missing_required_attribute() {
        let doc = b"<d\n   ni_dimen=\"1\" >5</d>";
        assert!(matches!(
            parse(doc),
            Err(NimlError::MissingAttribute { attribute: "ni_type", .. })
        ));
    }

    #[test]
    fn mixed_types_with_binary_form_rejected() {
        let doc = b"<d\n   ni_type=\"int,String\"\n   ni_dimen=\"1\"\n   ni_form=\"binary.lsbfirst\" >x</d>";
        assert!(matches!(
            parse(doc),
            Err(NimlError::UnsupportedEncoding(_))
        ));
    }

    #[test]
    fn wrong_row_count_in_text_fails() {
        let doc = b"<d\n   ni_type=\"int\"\n   ni_dimen=\"3\" >1 2</d>";
        assert!(matches!(
            parse(doc),
            Err(NimlError::RowCountMismatch { expected: 3, found: 2 })
        ));
    }

    #[test]
    fn huge_dimen_fails_without_overflow() {
        let doc = b"<d\n   ni_type=\"double\"\n   ni_dimen=\"4611686018427387904\"\n   ni_form=\"binary.lsbfirst\" >xx</d>";
        assert!(matches!(parse(doc), Err(NimlError::InvalidValue { .. })));
    }

    #[test]
    fn short_mixed_row_reports_column_mismatch() {
        let doc = b"<d\n   ni_type=\"int,String\"\n   ni_dimen=\"1\" >7</d>";
        assert!(matches!(
            parse(doc),
            Err(NimlError::ColumnCountMismatch { expected: 2, found: 1 })
        ));
    }

    #[test]
    fn unknown_encoding_tag_rejected() {
        let doc = b"<d\n   ni_type=\"int\"\n   ni_dimen=\"1\"\n   ni_form=\"gzip\" >x</d>";
        assert!(matches!(
            parse(doc),
            Err(NimlError::UnsupportedEncoding(_))
        ));
    }
}
