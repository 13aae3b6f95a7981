//! # niml
//!
//! A reader and writer for NIML, the self-describing tree-structured markup
//! format used by AFNI and SUMA to exchange neuroimaging surface data and
//! statistics. NIML documents mix human-readable header tags with payload
//! segments encoded as plain text, raw binary, or base64.
//!
//! ## Why parsing NIML is not just tag scanning
//!
//! The format has no generic escaping for binary payloads: byte sequences
//! that look like a close tag can legitimately occur inside raw binary data.
//! The parser therefore derives exact payload lengths analytically from the
//! declared element counts and type widths, and falls back to scanning for
//! terminators only where the encoding provably contains no marker bytes
//! (text, base64, quoted strings).
//!
//! ## Quick Start
//!
//! ```rust
//! use niml::{parse, to_bytes, DataElement, Form, Matrix, NumericData};
//!
//! // Build a 2x3 float matrix element and write it in base64 form.
//! let matrix = Matrix::new(2, 3, NumericData::Float(vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0])).unwrap();
//! let element = DataElement::matrix("node_data", matrix)
//!     .with_attr("data_type", "Node_Bucket_data");
//!
//! let bytes = to_bytes(&[element.into()], Form::base64_native()).unwrap();
//!
//! // Re-parse and get the same tree back.
//! let elements = parse(&bytes).unwrap();
//! assert_eq!(elements[0].name(), "node_data");
//! ```
//!
//! ## Document model
//!
//! A document is an ordered sequence of [`Element`]s; each is either a
//! [`Group`] of child elements or a [`DataElement`] whose payload is one of
//! three representations ([`Payload`]): a uniform numeric [`Matrix`], a
//! single string, or independently typed mixed [`Column`]s. Mixed columns
//! can only be written in Text form.
//!
//! ## Encodings
//!
//! [`Form::Text`] (the default), [`Form::Binary`] and [`Form::Base64`], the
//! latter two qualified by byte order ([`ByteOrder`]). The serializer
//! recomputes derived header attributes (`ni_type`, `ni_dimen`, `ni_form`)
//! from the payload, so a written header can never disagree with its data.
//!
//! ## Scope
//!
//! The whole document is parsed from one fully buffered input; parsing and
//! serialization are pure functions of their input with no shared state, so
//! independent documents may be processed on independent threads freely.
//! There is no streaming mode.

pub mod attrs;
pub mod de;
pub mod element;
pub mod error;
pub mod escape;
pub mod form;
pub mod length;
pub mod ser;
pub mod surface;
pub mod types;

pub use attrs::AttrMap;
pub use de::Parser;
pub use element::{Column, DataElement, Element, Group, Matrix, Payload};
pub use error::{NimlError, Result};
pub use form::{ByteOrder, Form};
pub use length::binary_byte_count;
pub use ser::Serializer;
pub use types::{find_uniform_type, format_type_list, parse_type_list, NumericData, TypeCode};

use std::io;

/// Parses a fully buffered NIML document into its top-level elements.
///
/// An XML-style declaration before the first element is skipped; stray null
/// padding after the outermost close tag (as left by NIFTI extensions) is
/// tolerated.
///
/// # Errors
///
/// Fails on the first structural error with no partial result; see
/// [`NimlError`] for the error vocabulary.
#[must_use = "this returns the result of the operation, errors must be handled"]
pub fn parse(input: &[u8]) -> Result<Vec<Element>> {
    Parser::new(input).parse_document()
}

/// Reads a whole stream into memory and parses it as a NIML document.
///
/// # Errors
///
/// Returns an error if reading fails or the document does not parse.
#[must_use = "this returns the result of the operation, errors must be handled"]
pub fn parse_reader<R: io::Read>(mut reader: R) -> Result<Vec<Element>> {
    let mut buffer = Vec::new();
    reader.read_to_end(&mut buffer).map_err(NimlError::io)?;
    parse(&buffer)
}

/// Serializes elements to bytes in the requested form.
///
/// Top-level siblings are separated by a newline. String and mixed-column
/// payloads are written as Text whatever `form` requests, since binary forms
/// cannot represent them.
///
/// # Errors
///
/// Returns an error if the tree violates a structural invariant.
#[must_use = "this returns the result of the operation, errors must be handled"]
pub fn to_bytes(elements: &[Element], form: Form) -> Result<Vec<u8>> {
    let mut serializer = Serializer::new(form);
    serializer.write_document(elements)?;
    Ok(serializer.into_inner())
}

/// Serializes elements and writes them to `writer`.
///
/// # Errors
///
/// Fails with [`NimlError::ShortWrite`] if the writer accepts fewer bytes
/// than were produced.
#[must_use = "this returns the result of the operation, errors must be handled"]
pub fn to_writer<W: io::Write>(writer: W, elements: &[Element], form: Form) -> Result<()> {
    let bytes = to_bytes(elements, form)?;
    write_all_checked(writer, &bytes)
}

/// Writes the whole buffer, reporting how much actually landed if the writer
/// gives up early.
pub(crate) fn write_all_checked<W: io::Write>(mut writer: W, bytes: &[u8]) -> Result<()> {
    let mut written = 0;
    while written < bytes.len() {
        match writer.write(&bytes[written..]) {
            Ok(0) => {
                return Err(NimlError::ShortWrite {
                    written,
                    expected: bytes.len(),
                })
            }
            Ok(n) => written += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(NimlError::io(e)),
        }
    }
    writer.flush().map_err(NimlError::io)
}

/// Generates a fresh 24-letter identifier for `self_idcode` headers.
///
/// Uniqueness comes from the standard library's randomly seeded hasher; the
/// codes are not cryptographic.
#[must_use]
pub fn new_id_code() -> String {
    use std::hash::{BuildHasher, Hasher};

    let mut hasher = std::collections::hash_map::RandomState::new().build_hasher();
    let mut code = String::with_capacity(24);
    for i in 0..24u64 {
        hasher.write_u64(i);
        code.push((b'A' + (hasher.finish() % 26) as u8) as char);
    }
    code
}

/// Returns a copy of the tree with every existing `self_idcode` attribute
/// replaced by a freshly generated code. Elements without the attribute are
/// left untouched; groups are refreshed recursively.
#[must_use]
pub fn refresh_id_codes(elements: Vec<Element>) -> Vec<Element> {
    elements.into_iter().map(refresh_element).collect()
}

fn refresh_element(element: Element) -> Element {
    match element {
        Element::Group(mut group) => {
            refresh_attr(&mut group.attrs);
            group.children = refresh_id_codes(group.children);
            Element::Group(group)
        }
        Element::Data(mut data) => {
            refresh_attr(&mut data.attrs);
            Element::Data(data)
        }
    }
}

fn refresh_attr(attrs: &mut AttrMap) {
    if attrs.contains_key("self_idcode") {
        attrs.insert("self_idcode", new_id_code());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_reader_matches_parse() {
        let doc: &[u8] = b"<d\n   ni_type=\"int\"\n   ni_dimen=\"1\" >7</d>";
        let from_reader = parse_reader(io::Cursor::new(doc)).unwrap();
        assert_eq!(from_reader, parse(doc).unwrap());
    }

    #[test]
    fn to_writer_roundtrip() {
        let element = DataElement::string("note", "hi");
        let mut buffer = Vec::new();
        to_writer(&mut buffer, &[element.into()], Form::Text).unwrap();
        assert_eq!(parse(&buffer).unwrap().len(), 1);
    }

    #[test]
    fn short_write_is_reported() {
        struct Stingy(usize);
        impl io::Write for Stingy {
            fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
                let n = buf.len().min(self.0);
                self.0 -= n;
                Ok(n)
            }
            fn flush(&mut self) -> io::Result<()> {
                Ok(())
            }
        }

        let element = DataElement::string("note", "some longer payload text");
        let err = to_writer(Stingy(10), &[element.into()], Form::Text).unwrap_err();
        assert!(matches!(err, NimlError::ShortWrite { written: 10, .. }));
    }

    #[test]
    fn refresh_replaces_codes_throughout_the_tree() {
        let inner = DataElement::string("label", "x").with_attr("self_idcode", "OLDCODE");
        let group = Group::new("dset_group")
            .with_attr("self_idcode", "OLDCODE")
            .with_child(inner);
        let plain: Element = DataElement::string("note", "no code here").into();

        let refreshed = refresh_id_codes(vec![group.into(), plain]);

        let group = refreshed[0].as_group().unwrap();
        let group_code = group.attrs.get("self_idcode").unwrap();
        let child_code = group.children[0].attrs().get("self_idcode").unwrap();
        assert_ne!(group_code, "OLDCODE");
        assert_ne!(child_code, "OLDCODE");
        // each element gets its own fresh code
        assert_ne!(group_code, child_code);
        assert!(!refreshed[1].attrs().contains_key("self_idcode"));
    }

    #[test]
    fn id_codes_are_letters_and_distinct() {
        let a = new_id_code();
        let b = new_id_code();
        assert_eq!(a.len(), 24);
        assert!(a.chars().all(|c| c.is_ascii_uppercase()));
        assert_ne!(a, b);
    }
}
