#![forbid(unsafe_code)]

//! Flat JSON for `rxcell` cells.
//!
//! A cell is written as its raw value only: `RxCell::new(16)` becomes `16`,
//! and a struct of cells becomes a plain JSON object. Reading builds fresh
//! cells in distinct mode. Configuration is an explicit [`FlatJson`] value
//! passed to each call; there is no process-wide registration.
//!
//! ```
//! use rxcell::RxCell;
//! use rxcell_json::FlatJson;
//!
//! let json = FlatJson::default();
//! let age = RxCell::new(16);
//! assert_eq!(json.to_string(&age).unwrap(), "16");
//!
//! let back: RxCell<i32> = json.from_str("17").unwrap();
//! assert_eq!(back.value(), 17);
//!
//! // Scalars of another JSON type are coerced through `RawValue`.
//! let flag: RxCell<bool> = json.from_raw_json(r#""true""#).unwrap();
//! assert!(flag.value());
//! ```
//!
//! # Failure Modes
//!
//! - Malformed JSON or a shape mismatch: [`FlatJsonError::Json`].
//! - A scalar that cannot be coerced to the cell's value type:
//!   [`FlatJsonError::Conversion`].
//! - An array or object where a scalar was required:
//!   [`FlatJsonError::NotScalar`].

use rxcell::{ConversionError, Container, Convertible, RawValue};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

/// Errors from flat JSON encoding and decoding.
#[derive(Debug, thiserror::Error)]
pub enum FlatJsonError {
    #[error("json: {0}")]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Conversion(#[from] ConversionError),
    /// The raw path only accepts null, booleans, numbers and strings.
    #[error("expected a JSON scalar, found {found}")]
    NotScalar { found: &'static str },
}

/// Flat JSON settings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FlatJson {
    /// Indent output.
    pub pretty: bool,
}

impl FlatJson {
    /// Compact output.
    #[must_use]
    pub const fn new() -> Self {
        Self { pretty: false }
    }

    /// Indented output.
    #[must_use]
    pub const fn indented() -> Self {
        Self { pretty: true }
    }

    /// Serialize `value` (a cell, a struct of cells, or anything else).
    ///
    /// # Errors
    ///
    /// Fails when `value`'s `Serialize` impl fails.
    pub fn to_string<T: Serialize + ?Sized>(&self, value: &T) -> Result<String, FlatJsonError> {
        let text = if self.pretty {
            serde_json::to_string_pretty(value)?
        } else {
            serde_json::to_string(value)?
        };
        tracing::trace!(bytes = text.len(), pretty = self.pretty, "encoded flat json");
        Ok(text)
    }

    /// Deserialize from JSON text; every cell inside is freshly built.
    ///
    /// # Errors
    ///
    /// Fails on malformed JSON or a shape mismatch.
    pub fn from_str<T: DeserializeOwned>(&self, text: &str) -> Result<T, FlatJsonError> {
        let value = serde_json::from_str(text)?;
        tracing::trace!(bytes = text.len(), "decoded flat json");
        Ok(value)
    }

    /// # Errors
    ///
    /// Fails when `value`'s `Serialize` impl fails.
    pub fn to_value<T: Serialize + ?Sized>(&self, value: &T) -> Result<Value, FlatJsonError> {
        Ok(serde_json::to_value(value)?)
    }

    /// # Errors
    ///
    /// Fails on a shape mismatch.
    pub fn from_value<T: DeserializeOwned>(&self, value: Value) -> Result<T, FlatJsonError> {
        Ok(serde_json::from_value(value)?)
    }

    /// Write a container's current value in raw form.
    ///
    /// # Errors
    ///
    /// Fails when the raw value cannot be encoded.
    pub fn to_raw_json<C>(&self, container: &C) -> Result<String, FlatJsonError>
    where
        C: Container,
        C::Value: Convertible,
    {
        self.to_string(&container.snapshot().to_raw())
    }

    /// Build a container from a JSON scalar, coercing it to the container's
    /// value type. A string can fill a boolean, numeric, char or date cell.
    ///
    /// # Errors
    ///
    /// Fails on malformed JSON, a non-scalar document, or a scalar that
    /// cannot be coerced.
    pub fn from_raw_json<C>(&self, text: &str) -> Result<C, FlatJsonError>
    where
        C: Container,
        C::Value: Convertible,
    {
        let document: Value = serde_json::from_str(text)?;
        let raw = raw_from_json(&document)?;
        let value = <C::Value as Convertible>::from_raw(raw).inspect_err(|error| {
            tracing::debug!(
                %error,
                target_type = <C::Value as Convertible>::DESCRIPTOR.type_name,
                "raw json value rejected"
            );
        })?;
        Ok(C::from_value(value))
    }
}

/// Map a JSON scalar to a [`RawValue`].
///
/// # Errors
///
/// Returns [`FlatJsonError::NotScalar`] for arrays and objects.
pub fn raw_from_json(value: &Value) -> Result<RawValue, FlatJsonError> {
    match value {
        Value::Null => Ok(RawValue::Null),
        Value::Bool(b) => Ok(RawValue::Bool(*b)),
        Value::Number(n) => Ok(if let Some(i) = n.as_i64() {
            RawValue::Int(i)
        } else if let Some(u) = n.as_u64() {
            RawValue::UInt(u)
        } else {
            RawValue::Float(n.as_f64().unwrap_or(f64::NAN))
        }),
        Value::String(s) => Ok(RawValue::Text(s.clone())),
        Value::Array(_) => Err(FlatJsonError::NotScalar { found: "array" }),
        Value::Object(_) => Err(FlatJsonError::NotScalar { found: "object" }),
    }
}
