//! The NIML document tree.
//!
//! A document is an ordered sequence of [`Element`]s. Each element is either
//! a [`Group`] holding child elements, or a [`DataElement`] holding a typed
//! payload. Trees are built once (as parse results or as serializer inputs)
//! and never mutated in place; ownership is strictly hierarchical, with a
//! group exclusively owning its children.
//!
//! The payload is a tagged union of the three representations the format
//! distinguishes:
//!
//! - [`Payload::Matrix`]: all columns share one numeric type
//! - [`Payload::Text`]: the single declared type is `String`
//! - [`Payload::Columns`]: mixed column types, each column stored on its own
//!
//! ## Examples
//!
//! ```rust
//! use niml::{DataElement, Matrix, NumericData, TypeCode};
//!
//! let matrix = Matrix::new(2, 3, NumericData::Int(vec![1, 2, 3, 4, 5, 6])).unwrap();
//! let element = DataElement::matrix("node_data", matrix);
//! assert_eq!(element.row_count(), 2);
//! assert_eq!(element.column_types(), &[TypeCode::Int; 3]);
//! ```

use crate::attrs::AttrMap;
use crate::error::{NimlError, Result};
use crate::types::{find_uniform_type, NumericData, TypeCode};

/// A node in the document tree: either a group of child elements or a data
/// element with a typed payload.
#[derive(Debug, Clone, PartialEq)]
pub enum Element {
    Group(Group),
    Data(DataElement),
}

impl Element {
    /// The element's tag name.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Element::Group(g) => &g.name,
            Element::Data(d) => &d.name,
        }
    }

    /// The element's header attributes.
    #[must_use]
    pub fn attrs(&self) -> &AttrMap {
        match self {
            Element::Group(g) => &g.attrs,
            Element::Data(d) => &d.attrs,
        }
    }

    /// Returns the group, if this element is one.
    #[must_use]
    pub fn as_group(&self) -> Option<&Group> {
        match self {
            Element::Group(g) => Some(g),
            Element::Data(_) => None,
        }
    }

    /// Returns the data element, if this element is one.
    #[must_use]
    pub fn as_data(&self) -> Option<&DataElement> {
        match self {
            Element::Group(_) => None,
            Element::Data(d) => Some(d),
        }
    }
}

impl From<Group> for Element {
    fn from(group: Group) -> Self {
        Element::Group(group)
    }
}

impl From<DataElement> for Element {
    fn from(data: DataElement) -> Self {
        Element::Data(data)
    }
}

/// An element whose content is child elements rather than data.
///
/// Groups carry no payload of their own; their `ni_form` attribute is the
/// group marker and is regenerated on write.
#[derive(Debug, Clone, PartialEq)]
pub struct Group {
    pub name: String,
    pub attrs: AttrMap,
    pub children: Vec<Element>,
}

impl Group {
    /// Creates an empty group.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Group {
            name: name.into(),
            attrs: AttrMap::new(),
            children: Vec::new(),
        }
    }

    /// Adds a header attribute, builder style.
    #[must_use]
    pub fn with_attr(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attrs.insert(key, value);
        self
    }

    /// Adds a child element, builder style.
    #[must_use]
    pub fn with_child(mut self, child: impl Into<Element>) -> Self {
        self.children.push(child.into());
        self
    }
}

/// An element whose content is a typed columnar payload.
#[derive(Debug, Clone, PartialEq)]
pub struct DataElement {
    pub name: String,
    pub attrs: AttrMap,
    column_types: Vec<TypeCode>,
    row_count: usize,
    payload: Payload,
}

impl DataElement {
    /// Creates a data element around a uniform numeric matrix.
    #[must_use]
    pub fn matrix(name: impl Into<String>, matrix: Matrix) -> Self {
        let column_types = vec![matrix.data.code(); matrix.cols];
        let row_count = matrix.rows;
        DataElement {
            name: name.into(),
            attrs: AttrMap::new(),
            column_types,
            row_count,
            payload: Payload::Matrix(matrix),
        }
    }

    /// Creates a data element around a single string value.
    #[must_use]
    pub fn string(name: impl Into<String>, value: impl Into<String>) -> Self {
        DataElement {
            name: name.into(),
            attrs: AttrMap::new(),
            column_types: vec![TypeCode::String],
            row_count: 1,
            payload: Payload::Text(value.into()),
        }
    }

    /// Creates a data element from per-column data.
    ///
    /// All columns must have the same length, which becomes the row count.
    /// Uniform numeric columns are interleaved into a row-major matrix so the
    /// representation matches what a re-parse would produce; all-`String`
    /// columns are rejected (use [`DataElement::string`] for text payloads).
    pub fn columns(name: impl Into<String>, columns: Vec<Column>) -> Result<Self> {
        let row_count = columns.first().map_or(0, Column::len);
        for col in &columns {
            if col.len() != row_count {
                return Err(NimlError::RowCountMismatch {
                    expected: row_count,
                    found: col.len(),
                });
            }
        }
        let column_types: Vec<TypeCode> = columns.iter().map(Column::code).collect();

        let payload = if let Some(data) = interleave_uniform(&columns, row_count) {
            Payload::Matrix(Matrix {
                rows: row_count,
                cols: column_types.len(),
                data,
            })
        } else if find_uniform_type(&column_types) == Some(TypeCode::String) {
            return Err(NimlError::unsupported_encoding(
                "all-String columns; use a String payload instead",
            ));
        } else {
            Payload::Columns(columns)
        };

        Ok(DataElement {
            name: name.into(),
            attrs: AttrMap::new(),
            column_types,
            row_count,
            payload,
        })
    }

    /// Assembles a parsed element; the parser has already validated that the
    /// payload shape agrees with the declared counts.
    pub(crate) fn from_parts(
        name: String,
        attrs: AttrMap,
        column_types: Vec<TypeCode>,
        row_count: usize,
        payload: Payload,
    ) -> Self {
        DataElement {
            name,
            attrs,
            column_types,
            row_count,
            payload,
        }
    }

    /// Adds a header attribute, builder style.
    #[must_use]
    pub fn with_attr(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attrs.insert(key, value);
        self
    }

    /// The declared column types, one per column.
    #[must_use]
    pub fn column_types(&self) -> &[TypeCode] {
        &self.column_types
    }

    /// The declared number of rows.
    #[must_use]
    pub fn row_count(&self) -> usize {
        self.row_count
    }

    /// The number of columns.
    #[must_use]
    pub fn column_count(&self) -> usize {
        self.column_types.len()
    }

    /// The payload.
    #[must_use]
    pub fn payload(&self) -> &Payload {
        &self.payload
    }
}

/// The three payload representations of a data element.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    /// A uniform numeric grid, row-major.
    Matrix(Matrix),
    /// A single (unescaped) string value.
    Text(String),
    /// Mixed column types, each column independently typed. Forces the Text
    /// form on write.
    Columns(Vec<Column>),
}

/// One column of a mixed-type payload.
#[derive(Debug, Clone, PartialEq)]
pub enum Column {
    Numeric(NumericData),
    Strings(Vec<String>),
}

impl Column {
    /// The registry code of this column's type.
    #[must_use]
    pub fn code(&self) -> TypeCode {
        match self {
            Column::Numeric(d) => d.code(),
            Column::Strings(_) => TypeCode::String,
        }
    }

    /// Number of rows in this column.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Column::Numeric(d) => d.len(),
            Column::Strings(v) => v.len(),
        }
    }

    /// Returns `true` if the column holds no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A `rows x cols` grid of one numeric type, stored row-major.
#[derive(Debug, Clone, PartialEq)]
pub struct Matrix {
    rows: usize,
    cols: usize,
    data: NumericData,
}

impl Matrix {
    /// Creates a matrix, checking that the flat data length equals
    /// `rows * cols`.
    pub fn new(rows: usize, cols: usize, data: NumericData) -> Result<Self> {
        if data.len() != rows * cols {
            return Err(NimlError::RowCountMismatch {
                expected: rows,
                found: if cols > 0 { data.len() / cols } else { 0 },
            });
        }
        Ok(Matrix { rows, cols, data })
    }

    /// Number of rows.
    #[must_use]
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Number of columns.
    #[must_use]
    pub fn cols(&self) -> usize {
        self.cols
    }

    /// The flat row-major storage.
    #[must_use]
    pub fn data(&self) -> &NumericData {
        &self.data
    }

    /// The stored numeric type.
    #[must_use]
    pub fn code(&self) -> TypeCode {
        self.data.code()
    }
}

/// Interleaves uniform numeric columns into one row-major vector, or returns
/// `None` when the columns are not all numeric with the same type.
fn interleave_uniform(columns: &[Column], rows: usize) -> Option<NumericData> {
    fn gather<T: Copy>(
        columns: &[Column],
        rows: usize,
        pick: impl Fn(&Column) -> Option<&[T]>,
    ) -> Option<Vec<T>> {
        let typed: Vec<&[T]> = columns.iter().map(&pick).collect::<Option<_>>()?;
        let mut out = Vec::with_capacity(rows * typed.len());
        for r in 0..rows {
            for col in &typed {
                out.push(col[r]);
            }
        }
        Some(out)
    }

    match columns.first()? {
        Column::Numeric(NumericData::Byte(_)) => gather(columns, rows, |c| match c {
            Column::Numeric(NumericData::Byte(v)) => Some(v.as_slice()),
            _ => None,
        })
        .map(NumericData::Byte),
        Column::Numeric(NumericData::Short(_)) => gather(columns, rows, |c| match c {
            Column::Numeric(NumericData::Short(v)) => Some(v.as_slice()),
            _ => None,
        })
        .map(NumericData::Short),
        Column::Numeric(NumericData::Int(_)) => gather(columns, rows, |c| match c {
            Column::Numeric(NumericData::Int(v)) => Some(v.as_slice()),
            _ => None,
        })
        .map(NumericData::Int),
        Column::Numeric(NumericData::Float(_)) => gather(columns, rows, |c| match c {
            Column::Numeric(NumericData::Float(v)) => Some(v.as_slice()),
            _ => None,
        })
        .map(NumericData::Float),
        Column::Numeric(NumericData::Double(_)) => gather(columns, rows, |c| match c {
            Column::Numeric(NumericData::Double(v)) => Some(v.as_slice()),
            _ => None,
        })
        .map(NumericData::Double),
        Column::Strings(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matrix_shape_checked() {
        let err = Matrix::new(2, 3, NumericData::Int(vec![1, 2, 3, 4])).unwrap_err();
        assert!(matches!(err, NimlError::RowCountMismatch { .. }));
    }

    #[test]
    fn uniform_columns_become_a_matrix() {
        let element = DataElement::columns(
            "d",
            vec![
                Column::Numeric(NumericData::Int(vec![1, 3])),
                Column::Numeric(NumericData::Int(vec![2, 4])),
            ],
        )
        .unwrap();
        match element.payload() {
            Payload::Matrix(m) => {
                assert_eq!(m.data(), &NumericData::Int(vec![1, 2, 3, 4]));
            }
            other => panic!("expected matrix payload, got {other:?}"),
        }
    }

    #[test]
    fn mixed_columns_stay_columns() {
        let element = DataElement::columns(
            "d",
            vec![
                Column::Numeric(NumericData::Int(vec![1, 2])),
                Column::Strings(vec!["a".to_string(), "b".to_string()]),
            ],
        )
        .unwrap();
        assert_eq!(
            element.column_types(),
            &[TypeCode::Int, TypeCode::String]
        );
        assert!(matches!(element.payload(), Payload::Columns(_)));
    }

    #[test]
    fn ragged_columns_rejected() {
        let err = DataElement::columns(
            "d",
            vec![
                Column::Numeric(NumericData::Int(vec![1, 2])),
                Column::Strings(vec!["a".to_string()]),
            ],
        )
        .unwrap_err();
        assert!(matches!(err, NimlError::RowCountMismatch { .. }));
    }

    #[test]
    fn all_string_columns_rejected() {
        let err = DataElement::columns(
            "d",
            vec![Column::Strings(vec!["a".to_string()])],
        )
        .unwrap_err();
        assert!(matches!(err, NimlError::UnsupportedEncoding(_)));
    }
}
