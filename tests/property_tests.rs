//! Property-based tests for parse/serialize round trips.
//!
//! These complement the integration tests by checking the round-trip
//! guarantee over generated matrices and strings in all three encodings.

use proptest::prelude::*;

use niml::{parse, to_bytes, DataElement, Element, Form, Matrix, NumericData, Payload};

fn forms() -> [Form; 3] {
    [Form::Text, Form::binary_native(), Form::base64_native()]
}

fn roundtrip_matrix(data: NumericData, rows: usize, cols: usize) -> bool {
    let matrix = match Matrix::new(rows, cols, data) {
        Ok(m) => m,
        Err(_) => return false,
    };
    let original: Element = DataElement::matrix("prop_data", matrix.clone()).into();
    for form in forms() {
        let bytes = match to_bytes(std::slice::from_ref(&original), form) {
            Ok(b) => b,
            Err(e) => {
                eprintln!("serialize failed under {form:?}: {e}");
                return false;
            }
        };
        let parsed = match parse(&bytes) {
            Ok(p) => p,
            Err(e) => {
                eprintln!("parse failed under {form:?}: {e}");
                return false;
            }
        };
        let data = match parsed.first().and_then(Element::as_data) {
            Some(d) => d,
            None => return false,
        };
        if data.payload() != &Payload::Matrix(matrix.clone()) {
            eprintln!("payload mismatch under {form:?}");
            return false;
        }
    }
    true
}

proptest! {
    #[test]
    fn prop_int_matrix(values in prop::collection::vec(any::<i32>(), 1..60), cols in 1usize..5) {
        let rows = values.len() / cols;
        let flat = values[..rows * cols].to_vec();
        prop_assert!(roundtrip_matrix(NumericData::Int(flat), rows, cols));
    }

    #[test]
    fn prop_short_matrix(values in prop::collection::vec(any::<i16>(), 1..60), cols in 1usize..4) {
        let rows = values.len() / cols;
        let flat = values[..rows * cols].to_vec();
        prop_assert!(roundtrip_matrix(NumericData::Short(flat), rows, cols));
    }

    #[test]
    fn prop_double_matrix(
        values in prop::collection::vec(-1e12f64..1e12, 1..40),
        cols in 1usize..4,
    ) {
        let rows = values.len() / cols;
        let flat = values[..rows * cols].to_vec();
        prop_assert!(roundtrip_matrix(NumericData::Double(flat), rows, cols));
    }

    #[test]
    fn prop_float_matrix(
        values in prop::collection::vec(-1e6f32..1e6, 1..40),
        cols in 1usize..4,
    ) {
        let rows = values.len() / cols;
        let flat = values[..rows * cols].to_vec();
        prop_assert!(roundtrip_matrix(NumericData::Float(flat), rows, cols));
    }

    #[test]
    fn prop_string_payload(text in "[ -~]*") {
        // printable ASCII, including all five reserved characters
        let original: Element = DataElement::string("prop_note", text.clone()).into();
        let bytes = to_bytes(std::slice::from_ref(&original), Form::Text).unwrap();
        let parsed = parse(&bytes).unwrap();
        let data = parsed[0].as_data().unwrap();
        prop_assert_eq!(data.payload(), &Payload::Text(text));
    }

    #[test]
    fn prop_escape_roundtrip(text in "\\PC*") {
        let escaped = niml::escape::escape(&text);
        prop_assert_eq!(niml::escape::unescape(&escaped), text);
    }
}
