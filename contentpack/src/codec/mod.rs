//! Compact textual encodings for non-primitive scalar values.
//!
//! Persisted configuration files store colors, vectors and rotations as short
//! strings so they stay readable and hand-editable:
//!
//! | Type      | Encoding            | Example              |
//! |-----------|---------------------|----------------------|
//! | [`Color`] | `#RRGGBB[AA]`       | `#FF8000`, `#FF800080` |
//! | [`Vec3`]  | `(x,y,z)`           | `(1.5,0,-2)`         |
//! | [`Quat`]  | `(x,y,z,w)`         | `(0,0,0,1)`          |
//!
//! Decoding is fail-soft: [`decode_color_or`] and friends keep the prior value
//! when the text is malformed and report why in [`Decoded::fallback`].
//!
//! The [`serde_color`], [`serde_vec3`] and [`serde_quat`] modules plug the
//! encodings into `#[serde(with = "...")]` fields.

mod color;
mod vector;

pub use color::{decode_color_or, encode_color, parse_color, Color};
pub use vector::{
    decode_quat_or, decode_vec3_or, encode_quat, encode_vec3, parse_quat, parse_vec3, Quat, Vec3,
};

use thiserror::Error;

/// Errors produced when scalar text does not match its grammar.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    /// Text is not a `#RRGGBB` or `#RRGGBBAA` color.
    #[error("invalid color '{0}'")]
    InvalidColor(String),

    /// Text is not a `(x,y,z)` vector.
    #[error("invalid vector '{0}'")]
    InvalidVector(String),

    /// Text is not a `(x,y,z,w)` quaternion.
    #[error("invalid quaternion '{0}'")]
    InvalidQuaternion(String),
}

/// Outcome of a fail-soft decode.
///
/// `value` is always usable. When the input was malformed it holds the
/// caller's prior value and `fallback` carries the parse error.
#[derive(Debug, Clone, PartialEq)]
pub struct Decoded<T, E = CodecError> {
    /// Decoded value, or the prior value when decoding failed.
    pub value: T,

    /// Why the prior value was kept, if it was.
    pub fallback: Option<E>,
}

impl<T, E> Decoded<T, E> {
    pub(crate) fn parsed(value: T) -> Self {
        Self {
            value,
            fallback: None,
        }
    }

    pub(crate) fn kept(value: T, error: E) -> Self {
        Self {
            value,
            fallback: Some(error),
        }
    }

    /// Whether the prior value was kept.
    pub fn used_fallback(&self) -> bool {
        self.fallback.is_some()
    }

    /// Take the value, discarding diagnostics.
    pub fn into_value(self) -> T {
        self.value
    }
}

/// Build a serde adapter module for a codec-encoded type.
///
/// Malformed text, or a value that is not a string at all, deserializes to
/// `T::default()` and is logged at debug level. Only the field falls back;
/// the rest of the document still loads.
macro_rules! serde_adapter {
    ($module:ident, $ty:ty, $encode:path, $parse:path, $what:literal) => {
        #[doc = concat!("`#[serde(with = \"...\")]` adapter for ", $what, " fields.")]
        pub mod $module {
            use serde::{Deserialize, Deserializer, Serializer};
            use serde_json::Value;

            pub fn serialize<S>(value: &$ty, serializer: S) -> Result<S::Ok, S::Error>
            where
                S: Serializer,
            {
                serializer.serialize_str(&$encode(value))
            }

            pub fn deserialize<'de, D>(deserializer: D) -> Result<$ty, D::Error>
            where
                D: Deserializer<'de>,
            {
                let value = match Value::deserialize(deserializer)? {
                    Value::String(text) => $parse(&text).map_err(|e| e.to_string()),
                    other => Err(format!("expected text, found {}", other)),
                };
                Ok(value.unwrap_or_else(|error| {
                    tracing::debug!(%error, "keeping default for malformed {}", $what);
                    <$ty>::default()
                }))
            }
        }
    };
}

serde_adapter!(serde_color, super::Color, super::encode_color, super::parse_color, "color");
serde_adapter!(serde_vec3, super::Vec3, super::encode_vec3, super::parse_vec3, "vector");
serde_adapter!(serde_quat, super::Quat, super::encode_quat, super::parse_quat, "quaternion");
