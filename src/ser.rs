//! NIML document serialization.
//!
//! The serializer renders an element tree back to bytes, recursively for
//! groups, in a chosen [`Form`]. Derived header attributes (`ni_type`,
//! `ni_dimen`, `ni_form`) are always recomputed from the payload rather than
//! trusting copies carried in `attrs`, so the header and payload can never
//! disagree after a round trip.
//!
//! Header attributes are written one per line in a deterministic order: a
//! fixed priority set first, the remaining keys lexicographically, and
//! `ni_form` last.
//!
//! ## Usage
//!
//! ```rust
//! use niml::{to_bytes, parse, DataElement, Form, Matrix, NumericData};
//!
//! let m = Matrix::new(1, 2, NumericData::Float(vec![1.5, -2.0])).unwrap();
//! let bytes = to_bytes(&[DataElement::matrix("node_data", m).into()], Form::Text).unwrap();
//! assert_eq!(parse(&bytes).unwrap().len(), 1);
//! ```

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use log::trace;

use crate::attrs::AttrMap;
use crate::element::{Column, DataElement, Element, Group, Payload};
use crate::error::Result;
use crate::escape::escape;
use crate::form::{Form, GROUP_FORM};
use crate::types::format_type_list;

/// Header keys always written first, in this order, when present.
const KEY_FIRST: [&str; 4] = ["dset_type", "self_idcode", "filename", "data_type"];

/// Header keys always written last.
const KEY_LAST: [&str; 1] = ["ni_form"];

/// Derived keys stripped from carried attributes before recomputation.
const KEY_DERIVED: [&str; 3] = ["ni_type", "ni_dimen", "ni_form"];

const ROW_SEP: &str = "\n";
const COL_SEP: &str = " ";

/// The NIML serializer. Renders a tree to bytes in the requested form;
/// payloads that cannot carry that form (strings, mixed columns) fall back
/// to Text individually.
pub struct Serializer {
    output: Vec<u8>,
    form: Form,
}

impl Serializer {
    #[must_use]
    pub fn new(form: Form) -> Self {
        Serializer {
            output: Vec::with_capacity(256),
            form,
        }
    }

    /// Consumes the serializer, returning the rendered bytes.
    #[must_use]
    pub fn into_inner(self) -> Vec<u8> {
        self.output
    }

    /// Renders a sequence of sibling elements, newline-separated.
    pub fn write_document(&mut self, elements: &[Element]) -> Result<()> {
        for (i, element) in elements.iter().enumerate() {
            if i > 0 {
                self.output.push(b'\n');
            }
            self.write_element(element)?;
        }
        Ok(())
    }

    /// Renders one element, recursively for groups.
    pub fn write_element(&mut self, element: &Element) -> Result<()> {
        match element {
            Element::Group(group) => self.write_group(group),
            Element::Data(data) => self.write_data(data),
        }
    }

    fn write_group(&mut self, group: &Group) -> Result<()> {
        trace!("writing group <{}>", group.name);
        let mut attrs = strip_derived(&group.attrs);
        attrs.insert("ni_form", GROUP_FORM);
        self.write_header(&group.name, &attrs);
        for (i, child) in group.children.iter().enumerate() {
            if i > 0 {
                self.output.push(b'\n');
            }
            self.write_element(child)?;
        }
        self.write_close(&group.name);
        Ok(())
    }

    fn write_data(&mut self, data: &DataElement) -> Result<()> {
        // String and mixed-column payloads are only representable as text,
        // whatever form was requested.
        let effective = match data.payload() {
            Payload::Matrix(_) => self.form,
            Payload::Text(_) | Payload::Columns(_) => Form::Text,
        };
        trace!("writing data element <{}> as {effective:?}", data.name);

        let mut attrs = strip_derived(&data.attrs);
        attrs.insert("ni_type", format_type_list(data.column_types()));
        let row_count = match data.payload() {
            Payload::Matrix(m) => m.rows(),
            Payload::Text(_) => data.row_count(),
            Payload::Columns(cols) => cols.first().map_or(0, Column::len),
        };
        attrs.insert("ni_dimen", row_count.to_string());
        if let Some(tag) = effective.tag() {
            attrs.insert("ni_form", tag);
        }

        self.write_header(&data.name, &attrs);
        match (data.payload(), effective) {
            (Payload::Text(s), _) => {
                self.output.push(b'"');
                self.output.extend_from_slice(escape(s).as_bytes());
                self.output.push(b'"');
            }
            (Payload::Columns(columns), _) => {
                self.output.extend_from_slice(format_columns(columns, row_count).as_bytes());
            }
            (Payload::Matrix(m), Form::Text) => {
                self.output.extend_from_slice(format_matrix_text(m).as_bytes());
            }
            (Payload::Matrix(m), Form::Binary(order)) => {
                self.output.extend_from_slice(&m.data().to_bytes(order));
            }
            (Payload::Matrix(m), Form::Base64(order)) => {
                let encoded = BASE64.encode(m.data().to_bytes(order));
                self.output.extend_from_slice(encoded.as_bytes());
            }
        }
        self.write_close(&data.name);
        Ok(())
    }

    /// Writes `<name` followed by one `   key="value"` line per attribute
    /// and the ` >` terminator.
    fn write_header(&mut self, name: &str, attrs: &AttrMap) {
        self.output.push(b'<');
        self.output.extend_from_slice(name.as_bytes());
        self.output.push(b'\n');
        let lines: Vec<String> = ordered_keys(attrs)
            .into_iter()
            .filter_map(|k| attrs.get(k).map(|v| format!("   {k}=\"{v}\"")))
            .collect();
        self.output.extend_from_slice(lines.join("\n").as_bytes());
        self.output.extend_from_slice(b" >");
    }

    fn write_close(&mut self, name: &str) {
        self.output.extend_from_slice(b"</");
        self.output.extend_from_slice(name.as_bytes());
        self.output.push(b'>');
    }
}

/// Clones `attrs` without the derived keys that are recomputed on write.
fn strip_derived(attrs: &AttrMap) -> AttrMap {
    attrs
        .iter()
        .filter(|(k, _)| !KEY_DERIVED.contains(k))
        .collect()
}

/// Deterministic header key order: the priority-first set, then the
/// remaining keys lexicographically, then the priority-last set.
fn ordered_keys(attrs: &AttrMap) -> Vec<&str> {
    let mut ordered: Vec<&str> = KEY_FIRST
        .iter()
        .copied()
        .filter(|k| attrs.contains_key(k))
        .collect();
    let mut others: Vec<&str> = attrs
        .keys()
        .filter(|k| !KEY_FIRST.contains(k) && !KEY_LAST.contains(k))
        .collect();
    others.sort_unstable();
    ordered.extend(others);
    ordered.extend(KEY_LAST.iter().copied().filter(|k| attrs.contains_key(k)));
    ordered
}

/// Formats a uniform matrix as space-separated columns and newline-separated
/// rows.
fn format_matrix_text(m: &crate::Matrix) -> String {
    let mut rows = Vec::with_capacity(m.rows());
    for r in 0..m.rows() {
        let cells: Vec<String> = (0..m.cols())
            .map(|c| m.data().format_value(r * m.cols() + c))
            .collect();
        rows.push(cells.join(COL_SEP));
    }
    rows.join(ROW_SEP)
}

/// Formats mixed columns row by row, string cells escaped.
fn format_columns(columns: &[Column], rows: usize) -> String {
    let mut out = Vec::with_capacity(rows);
    for r in 0..rows {
        let cells: Vec<String> = columns
            .iter()
            .map(|col| match col {
                Column::Numeric(data) => data.format_value(r),
                Column::Strings(values) => escape(&values[r]),
            })
            .collect();
        out.push(cells.join(COL_SEP));
    }
    out.join(ROW_SEP)
}
