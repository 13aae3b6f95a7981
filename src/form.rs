//! Payload encodings and the `ni_form` tag vocabulary.
//!
//! A data element's payload is written in one of three forms:
//!
//! - **Text** (the default when no `ni_form` attribute is present)
//! - **Binary**, raw native bytes in a declared byte order
//! - **Base64**, the same bytes base64-encoded
//!
//! The byte order travels in the tag suffix: `binary.lsbfirst`,
//! `binary.msbfirst`, `base64.lsbfirst`, `base64.msbfirst`. The special value
//! `ni_group` is not an encoding at all; it marks an element as a group and
//! is handled by the parser before form resolution.
//!
//! ## Examples
//!
//! ```rust
//! use niml::{Form, ByteOrder};
//!
//! assert_eq!(Form::from_tag("binary.lsbfirst").unwrap(), Form::Binary(ByteOrder::Lsb));
//! assert_eq!(Form::Base64(ByteOrder::Msb).tag(), Some("base64.msbfirst"));
//! assert!(Form::from_tag("gzip").is_err());
//! ```

use crate::error::{NimlError, Result};

/// Header attribute value that marks an element as a group.
pub const GROUP_FORM: &str = "ni_group";

/// Byte order of a binary or base64 payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ByteOrder {
    /// Least significant byte first (little-endian).
    Lsb,
    /// Most significant byte first (big-endian).
    Msb,
}

impl ByteOrder {
    /// The byte order of the machine we are running on.
    #[must_use]
    pub const fn native() -> Self {
        if cfg!(target_endian = "big") {
            ByteOrder::Msb
        } else {
            ByteOrder::Lsb
        }
    }

    const fn suffix(&self) -> &'static str {
        match self {
            ByteOrder::Lsb => "lsbfirst",
            ByteOrder::Msb => "msbfirst",
        }
    }
}

/// How a data element's payload bytes are represented.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Form {
    /// Human-readable text, space-separated columns and newline-separated
    /// rows. The default.
    #[default]
    Text,
    /// Raw binary in the given byte order. Requires a uniform numeric type.
    Binary(ByteOrder),
    /// Base64-encoded binary in the given byte order. Requires a uniform
    /// numeric type.
    Base64(ByteOrder),
}

impl Form {
    /// Binary in the machine's native byte order.
    #[must_use]
    pub const fn binary_native() -> Self {
        Form::Binary(ByteOrder::native())
    }

    /// Base64 in the machine's native byte order.
    #[must_use]
    pub const fn base64_native() -> Self {
        Form::Base64(ByteOrder::native())
    }

    /// Resolves a `ni_form` attribute value.
    ///
    /// Unrecognized tags (including `ni_group`, which is not a payload
    /// encoding) fail with `UnsupportedEncoding`.
    pub fn from_tag(tag: &str) -> Result<Self> {
        match tag {
            "text" => Ok(Form::Text),
            "binary.lsbfirst" => Ok(Form::Binary(ByteOrder::Lsb)),
            "binary.msbfirst" => Ok(Form::Binary(ByteOrder::Msb)),
            "base64.lsbfirst" => Ok(Form::Base64(ByteOrder::Lsb)),
            "base64.msbfirst" => Ok(Form::Base64(ByteOrder::Msb)),
            other => Err(NimlError::unsupported_encoding(format!(
                "unrecognized ni_form tag {other:?}"
            ))),
        }
    }

    /// Resolves an optional `ni_form` attribute; absence defaults to Text.
    pub fn from_optional_tag(tag: Option<&str>) -> Result<Self> {
        tag.map_or(Ok(Form::Text), Form::from_tag)
    }

    /// The `ni_form` tag to write for this form, or `None` for Text, which is
    /// the default and carries no tag.
    #[must_use]
    pub const fn tag(&self) -> Option<&'static str> {
        match self {
            Form::Text => None,
            Form::Binary(ByteOrder::Lsb) => Some("binary.lsbfirst"),
            Form::Binary(ByteOrder::Msb) => Some("binary.msbfirst"),
            Form::Base64(ByteOrder::Lsb) => Some("base64.lsbfirst"),
            Form::Base64(ByteOrder::Msb) => Some("base64.msbfirst"),
        }
    }

    /// Returns `true` for the forms whose payload can be bounded by scanning
    /// (no terminator-like bytes can occur inside the payload).
    #[must_use]
    pub const fn is_text(&self) -> bool {
        matches!(self, Form::Text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tag_roundtrip() {
        for form in [
            Form::Binary(ByteOrder::Lsb),
            Form::Binary(ByteOrder::Msb),
            Form::Base64(ByteOrder::Lsb),
            Form::Base64(ByteOrder::Msb),
        ] {
            let tag = form.tag().unwrap();
            assert_eq!(Form::from_tag(tag).unwrap(), form);
        }
        assert_eq!(Form::from_optional_tag(None).unwrap(), Form::Text);
        assert_eq!(Form::from_optional_tag(Some("text")).unwrap(), Form::Text);
    }

    #[test]
    fn group_marker_is_not_an_encoding() {
        assert!(matches!(
            Form::from_tag(GROUP_FORM),
            Err(NimlError::UnsupportedEncoding(_))
        ));
    }
}
