//! Analytical byte-length calculation for binary payloads.
//!
//! NIML has no escaping for raw binary payloads, so terminator-like byte
//! sequences can legitimately occur inside the data. The parser therefore
//! never scans a binary payload for its end; it computes the exact length
//! from the declared counts and the uniform type's width, and only then
//! asserts the close tag. This module is that calculation.

use crate::error::{NimlError, Result};
use crate::types::{find_uniform_type, TypeCode};

/// Computes the exact payload byte count of a binary-encoded data element:
/// `row_count * column_count * byte_width(uniform_type)`.
///
/// The calculation requires a uniform numeric type. Heterogeneous columns or
/// a `String` column make binary encoding unrepresentable, so both fail with
/// `UnsupportedEncoding` and the caller must use the Text form instead.
pub fn binary_byte_count(column_types: &[TypeCode], row_count: usize) -> Result<usize> {
    let uniform = find_uniform_type(column_types).ok_or_else(|| {
        NimlError::unsupported_encoding("binary form requires a uniform column type")
    })?;
    let width = uniform
        .byte_width()
        .ok_or_else(|| NimlError::unsupported_encoding("binary form with String columns"))?;
    row_count
        .checked_mul(column_types.len())
        .and_then(|cells| cells.checked_mul(width))
        .ok_or_else(|| NimlError::invalid_value("ni_dimen", &row_count.to_string()))
}
