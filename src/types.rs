//! Scalar type registry and typed numeric storage.
//!
//! NIML declares column types by name in the `ni_type` header attribute
//! (`"float,float,int"`, with an optional repeat count as in `"3*float"`).
//! This module maps those names onto [`TypeCode`] entries that know their
//! native kind, byte width and text converters, and provides [`NumericData`],
//! the tagged union of typed vectors that backs every numeric payload.
//!
//! Text formatting uses Rust's shortest-round-trip float `Display`, so a
//! value written in Text form parses back bit exact.
//!
//! ## Examples
//!
//! ```rust
//! use niml::{parse_type_list, find_uniform_type, TypeCode};
//!
//! let types = parse_type_list("3*float").unwrap();
//! assert_eq!(types, vec![TypeCode::Float; 3]);
//! assert_eq!(find_uniform_type(&types), Some(TypeCode::Float));
//! ```

use byteorder::{BigEndian, LittleEndian};

use crate::error::{NimlError, Result};
use crate::form::ByteOrder;

/// A scalar type code recognized by the format.
///
/// `String` is a pseudo-type with no fixed byte width; it can never appear in
/// a binary or base64 payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeCode {
    /// Signed 8-bit integer, NIML name `byte`.
    Byte,
    /// Signed 16-bit integer, NIML name `short`.
    Short,
    /// Signed 32-bit integer, NIML name `int`.
    Int,
    /// 32-bit float, NIML name `float`.
    Float,
    /// 64-bit float, NIML name `double`.
    Double,
    /// Text pseudo-type, NIML name `String`.
    String,
}

impl TypeCode {
    /// Resolves a NIML type name to its registry entry.
    ///
    /// Names are matched case-insensitively; `UnknownTypeCode` is returned
    /// for anything not in the registry.
    pub fn from_name(name: &str) -> Result<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "byte" => Ok(TypeCode::Byte),
            "short" => Ok(TypeCode::Short),
            "int" => Ok(TypeCode::Int),
            "float" => Ok(TypeCode::Float),
            "double" => Ok(TypeCode::Double),
            "string" => Ok(TypeCode::String),
            _ => Err(NimlError::UnknownTypeCode(name.to_string())),
        }
    }

    /// The canonical NIML spelling of this type.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            TypeCode::Byte => "byte",
            TypeCode::Short => "short",
            TypeCode::Int => "int",
            TypeCode::Float => "float",
            TypeCode::Double => "double",
            TypeCode::String => "String",
        }
    }

    /// Bytes per value in a binary payload; `None` for `String`, which has no
    /// fixed width.
    #[must_use]
    pub const fn byte_width(&self) -> Option<usize> {
        match self {
            TypeCode::Byte => Some(1),
            TypeCode::Short => Some(2),
            TypeCode::Int | TypeCode::Float => Some(4),
            TypeCode::Double => Some(8),
            TypeCode::String => None,
        }
    }

    /// Returns `true` for the text pseudo-type.
    #[must_use]
    pub const fn is_string(&self) -> bool {
        matches!(self, TypeCode::String)
    }
}

/// Parses a `ni_type` column list: comma-separated names, each optionally
/// prefixed with a repeat count (`"3*float"` is `float,float,float`).
pub fn parse_type_list(s: &str) -> Result<Vec<TypeCode>> {
    let mut codes = Vec::new();
    for item in s.split(',') {
        let item = item.trim();
        if let Some((count, name)) = item.split_once('*') {
            let count: usize = count
                .trim()
                .parse()
                .map_err(|_| NimlError::UnknownTypeCode(item.to_string()))?;
            let code = TypeCode::from_name(name)?;
            codes.extend(std::iter::repeat(code).take(count));
        } else {
            codes.push(TypeCode::from_name(item)?);
        }
    }
    Ok(codes)
}

/// Renders a column list back to its `ni_type` spelling.
#[must_use]
pub fn format_type_list(codes: &[TypeCode]) -> String {
    codes
        .iter()
        .map(|c| c.name())
        .collect::<Vec<_>>()
        .join(",")
}

/// Returns the single type shared by all columns, or `None` when the columns
/// are heterogeneous (which forces the per-column text path).
#[must_use]
pub fn find_uniform_type(codes: &[TypeCode]) -> Option<TypeCode> {
    let first = *codes.first()?;
    if codes.iter().all(|c| *c == first) {
        Some(first)
    } else {
        None
    }
}

/// A typed vector of numeric values, the storage behind every numeric matrix
/// or column.
///
/// Values are stored in row-major order when used as a matrix.
#[derive(Debug, Clone, PartialEq)]
pub enum NumericData {
    Byte(Vec<i8>),
    Short(Vec<i16>),
    Int(Vec<i32>),
    Float(Vec<f32>),
    Double(Vec<f64>),
}

impl NumericData {
    /// The registry code for the stored type.
    #[must_use]
    pub const fn code(&self) -> TypeCode {
        match self {
            NumericData::Byte(_) => TypeCode::Byte,
            NumericData::Short(_) => TypeCode::Short,
            NumericData::Int(_) => TypeCode::Int,
            NumericData::Float(_) => TypeCode::Float,
            NumericData::Double(_) => TypeCode::Double,
        }
    }

    /// Number of stored values.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            NumericData::Byte(v) => v.len(),
            NumericData::Short(v) => v.len(),
            NumericData::Int(v) => v.len(),
            NumericData::Float(v) => v.len(),
            NumericData::Double(v) => v.len(),
        }
    }

    /// Returns `true` if no values are stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Parses whitespace-split text tokens into a typed vector.
    ///
    /// Fails with `UnknownTypeCode` for the `String` pseudo-type and with
    /// `InvalidValue` for a token the type's converter rejects.
    pub fn parse_tokens<'a, I>(code: TypeCode, tokens: I) -> Result<Self>
    where
        I: IntoIterator<Item = &'a str>,
    {
        fn collect<'a, T: std::str::FromStr>(
            tokens: impl IntoIterator<Item = &'a str>,
            type_name: &'static str,
        ) -> Result<Vec<T>> {
            tokens
                .into_iter()
                .map(|t| {
                    t.parse::<T>()
                        .map_err(|_| NimlError::invalid_value(type_name, t))
                })
                .collect()
        }

        match code {
            TypeCode::Byte => Ok(NumericData::Byte(collect(tokens, "byte")?)),
            TypeCode::Short => Ok(NumericData::Short(collect(tokens, "short")?)),
            TypeCode::Int => Ok(NumericData::Int(collect(tokens, "int")?)),
            TypeCode::Float => Ok(NumericData::Float(collect(tokens, "float")?)),
            TypeCode::Double => Ok(NumericData::Double(collect(tokens, "double")?)),
            TypeCode::String => Err(NimlError::UnknownTypeCode(
                "String is not a numeric type".to_string(),
            )),
        }
    }

    /// Formats the value at `index` with the registry's text formatter.
    ///
    /// Floats use `Display`, which emits the shortest representation that
    /// parses back to the identical bits.
    #[must_use]
    pub fn format_value(&self, index: usize) -> String {
        match self {
            NumericData::Byte(v) => v[index].to_string(),
            NumericData::Short(v) => v[index].to_string(),
            NumericData::Int(v) => v[index].to_string(),
            NumericData::Float(v) => v[index].to_string(),
            NumericData::Double(v) => v[index].to_string(),
        }
    }

    /// Encodes all values to raw bytes in the given byte order.
    #[must_use]
    pub fn to_bytes(&self, order: ByteOrder) -> Vec<u8> {
        match order {
            ByteOrder::Lsb => self.encode::<LittleEndian>(),
            ByteOrder::Msb => self.encode::<BigEndian>(),
        }
    }

    fn encode<E: byteorder::ByteOrder>(&self) -> Vec<u8> {
        match self {
            NumericData::Byte(v) => v.iter().map(|x| *x as u8).collect(),
            NumericData::Short(v) => {
                let mut out = vec![0u8; v.len() * 2];
                E::write_i16_into(v, &mut out);
                out
            }
            NumericData::Int(v) => {
                let mut out = vec![0u8; v.len() * 4];
                E::write_i32_into(v, &mut out);
                out
            }
            NumericData::Float(v) => {
                let mut out = vec![0u8; v.len() * 4];
                E::write_f32_into(v, &mut out);
                out
            }
            NumericData::Double(v) => {
                let mut out = vec![0u8; v.len() * 8];
                E::write_f64_into(v, &mut out);
                out
            }
        }
    }

    /// Decodes raw bytes in the given byte order.
    ///
    /// `bytes.len()` must be a multiple of the type's width; callers validate
    /// the total length against the declared counts before decoding.
    pub fn from_bytes(code: TypeCode, order: ByteOrder, bytes: &[u8]) -> Result<Self> {
        let width = code
            .byte_width()
            .ok_or_else(|| NimlError::unsupported_encoding("binary data with String type"))?;
        debug_assert_eq!(bytes.len() % width, 0);
        let count = bytes.len() / width;
        match order {
            ByteOrder::Lsb => Self::decode::<LittleEndian>(code, bytes, count),
            ByteOrder::Msb => Self::decode::<BigEndian>(code, bytes, count),
        }
    }

    fn decode<E: byteorder::ByteOrder>(
        code: TypeCode,
        bytes: &[u8],
        count: usize,
    ) -> Result<Self> {
        match code {
            TypeCode::Byte => Ok(NumericData::Byte(
                bytes.iter().map(|b| *b as i8).collect(),
            )),
            TypeCode::Short => {
                let mut out = vec![0i16; count];
                E::read_i16_into(bytes, &mut out);
                Ok(NumericData::Short(out))
            }
            TypeCode::Int => {
                let mut out = vec![0i32; count];
                E::read_i32_into(bytes, &mut out);
                Ok(NumericData::Int(out))
            }
            TypeCode::Float => {
                let mut out = vec![0f32; count];
                E::read_f32_into(bytes, &mut out);
                Ok(NumericData::Float(out))
            }
            TypeCode::Double => {
                let mut out = vec![0f64; count];
                E::read_f64_into(bytes, &mut out);
                Ok(NumericData::Double(out))
            }
            TypeCode::String => Err(NimlError::unsupported_encoding(
                "binary data with String type",
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_names() {
        assert_eq!(TypeCode::from_name("float").unwrap(), TypeCode::Float);
        assert_eq!(TypeCode::from_name("String").unwrap(), TypeCode::String);
        assert!(matches!(
            TypeCode::from_name("complex"),
            Err(NimlError::UnknownTypeCode(_))
        ));
    }

    #[test]
    fn type_list_with_repeat() {
        let types = parse_type_list("int,2*float,String").unwrap();
        assert_eq!(
            types,
            vec![
                TypeCode::Int,
                TypeCode::Float,
                TypeCode::Float,
                TypeCode::String
            ]
        );
    }

    #[test]
    fn uniform_detection() {
        assert_eq!(
            find_uniform_type(&[TypeCode::Int, TypeCode::Int]),
            Some(TypeCode::Int)
        );
        assert_eq!(find_uniform_type(&[TypeCode::Int, TypeCode::Float]), None);
        assert_eq!(find_uniform_type(&[]), None);
    }

    #[test]
    fn byte_roundtrip_both_orders() {
        let data = NumericData::Float(vec![1.5, -2.25, 1e-7]);
        for order in [ByteOrder::Lsb, ByteOrder::Msb] {
            let bytes = data.to_bytes(order);
            assert_eq!(bytes.len(), 12);
            let back = NumericData::from_bytes(TypeCode::Float, order, &bytes).unwrap();
            assert_eq!(back, data);
        }
    }

    #[test]
    fn short_byte_order_matters() {
        let data = NumericData::Short(vec![0x0102]);
        assert_eq!(data.to_bytes(ByteOrder::Lsb), vec![0x02, 0x01]);
        assert_eq!(data.to_bytes(ByteOrder::Msb), vec![0x01, 0x02]);
    }

    #[test]
    fn token_parse_rejects_garbage() {
        let err = NumericData::parse_tokens(TypeCode::Int, ["1", "x"]).unwrap_err();
        assert!(matches!(err, NimlError::InvalidValue { .. }));
    }

    #[test]
    fn float_text_roundtrip_is_bit_exact() {
        let data = NumericData::Double(vec![0.1, std::f64::consts::PI, 1e-300]);
        for i in 0..3 {
            let text = data.format_value(i);
            let back: f64 = text.parse().unwrap();
            if let NumericData::Double(v) = &data {
                assert_eq!(back.to_bits(), v[i].to_bits());
            }
        }
    }
}
