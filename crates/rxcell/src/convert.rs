#![forbid(unsafe_code)]

//! Raw (boxed) values and the primitive conversion contract.
//!
//! [`RawValue`] is the untyped form of a cell's value used at serialization
//! and construction boundaries. [`Convertible`] maps a concrete type to and
//! from that form using the usual coercion rules:
//!
//! | From \ To   | bool          | char        | integers        | floats | text | dates |
//! |-------------|---------------|-------------|-----------------|--------|------|-------|
//! | bool        | identity      | error       | 1 / 0           | 1 / 0  | yes  | error |
//! | char        | error         | identity    | code point      | error  | yes  | error |
//! | integer     | non-zero      | code point  | range-checked   | yes    | yes  | error |
//! | float       | non-zero      | error       | round half even | yes    | yes  | error |
//! | text        | `true`/`false`| single char | parse           | parse  | yes  | parse |
//! | date        | error         | error       | error           | error  | ISO  | yes   |
//!
//! `Null` converts to `None` for `Option<T>` targets and fails otherwise.
//!
//! # Failure Modes
//!
//! Every failure surfaces as a [`ConversionError`]; nothing is silently
//! defaulted.
//!
//! # Example
//!
//! ```
//! use rxcell::{Convertible, RawValue};
//!
//! assert_eq!(bool::from_raw(RawValue::from("true")), Ok(true));
//! assert_eq!(char::from_raw(RawValue::from("C")), Ok('C'));
//! assert!(u8::from_raw(RawValue::from(300)).is_err());
//! ```

use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};

use crate::reactive::ReadValue;

/// Display/parse format used for date-times rendered as text.
const ISO_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

const DATE_TIME_FORMATS: &[&str] = &[
    "%m/%d/%Y %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
];

const DATE_FORMATS: &[&str] = &["%m/%d/%Y", "%Y-%m-%d"];

/// Errors from raw-value coercion.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConversionError {
    /// The source kind has no conversion to the target type.
    #[error("cannot convert {from} to {to}")]
    InvalidCast {
        from: &'static str,
        to: &'static str,
    },
    /// The value does not fit the target type.
    #[error("value {value} is out of range for {to}")]
    Overflow { value: String, to: &'static str },
    /// Text could not be parsed as the target type.
    #[error("cannot parse {input:?} as {to}")]
    Format { input: String, to: &'static str },
    /// A null raw value was given for a non-optional target.
    #[error("null cannot be converted to {to}")]
    Null { to: &'static str },
}

/// A value in its untyped form.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum RawValue {
    #[default]
    Null,
    Bool(bool),
    Char(char),
    Int(i64),
    UInt(u64),
    Float(f64),
    Text(String),
    DateTime(NaiveDateTime),
}

impl RawValue {
    /// Short name of the variant, used in error messages.
    #[must_use]
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Char(_) => "char",
            Self::Int(_) => "integer",
            Self::UInt(_) => "unsigned integer",
            Self::Float(_) => "float",
            Self::Text(_) => "text",
            Self::DateTime(_) => "date-time",
        }
    }

    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    fn invalid(&self, to: &'static str) -> ConversionError {
        ConversionError::InvalidCast {
            from: self.kind_name(),
            to,
        }
    }
}

impl fmt::Display for RawValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("null"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Char(c) => write!(f, "{c}"),
            Self::Int(i) => write!(f, "{i}"),
            Self::UInt(u) => write!(f, "{u}"),
            Self::Float(x) => write!(f, "{x}"),
            Self::Text(s) => f.write_str(s),
            Self::DateTime(d) => write!(f, "{}", d.format(ISO_FORMAT)),
        }
    }
}

impl From<bool> for RawValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<char> for RawValue {
    fn from(value: char) -> Self {
        Self::Char(value)
    }
}

impl From<&str> for RawValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_owned())
    }
}

impl From<String> for RawValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

macro_rules! raw_from {
    ($variant:ident as $wide:ty: $($ty:ty),*) => {$(
        impl From<$ty> for RawValue {
            fn from(value: $ty) -> Self {
                Self::$variant(<$wide>::from(value))
            }
        }
    )*};
}

raw_from!(Int as i64: i8, i16, i32, i64);
raw_from!(UInt as u64: u8, u16, u32, u64);
raw_from!(Float as f64: f32, f64);

impl From<NaiveDateTime> for RawValue {
    fn from(value: NaiveDateTime) -> Self {
        Self::DateTime(value)
    }
}

impl From<NaiveDate> for RawValue {
    fn from(value: NaiveDate) -> Self {
        Self::DateTime(value.and_time(NaiveTime::MIN))
    }
}

impl<T: Into<RawValue>> From<Option<T>> for RawValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

/// Broad category of a convertible value type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    Bool,
    Char,
    Signed,
    Unsigned,
    Float,
    Text,
    DateTime,
    Date,
}

/// Static description of a value type, consulted by adapters instead of
/// inspecting types at runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ValueDescriptor {
    pub kind: ValueKind,
    /// `true` for `Option<T>`: a null raw value is accepted.
    pub nullable: bool,
    pub type_name: &'static str,
}

impl ValueDescriptor {
    #[must_use]
    pub const fn new(kind: ValueKind, type_name: &'static str) -> Self {
        Self {
            kind,
            nullable: false,
            type_name,
        }
    }
}

/// Conversion to and from [`RawValue`].
pub trait Convertible: Sized {
    /// Descriptor of this value type.
    const DESCRIPTOR: ValueDescriptor;

    /// The untyped form of `self`.
    fn to_raw(&self) -> RawValue;

    /// Coerce a raw value into `Self`.
    ///
    /// # Errors
    ///
    /// Returns a [`ConversionError`] when `raw` cannot be coerced.
    fn from_raw(raw: RawValue) -> Result<Self, ConversionError>;
}

fn overflow(value: impl fmt::Display, to: &'static str) -> ConversionError {
    ConversionError::Overflow {
        value: value.to_string(),
        to,
    }
}

fn bad_format(input: &str, to: &'static str) -> ConversionError {
    ConversionError::Format {
        input: input.to_owned(),
        to,
    }
}

/// Round half to even, then check the result fits an `i128`.
fn float_to_integer(value: f64, to: &'static str) -> Result<i128, ConversionError> {
    if !value.is_finite() {
        return Err(overflow(value, to));
    }
    let rounded = value.round_ties_even();
    if rounded < i128::MIN as f64 || rounded > i128::MAX as f64 {
        return Err(overflow(value, to));
    }
    Ok(rounded as i128)
}

fn parse_date_time(input: &str) -> Option<NaiveDateTime> {
    let input = input.trim();
    DATE_TIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(input, fmt).ok())
        .or_else(|| {
            DATE_FORMATS
                .iter()
                .find_map(|fmt| NaiveDate::parse_from_str(input, fmt).ok())
                .map(|date| date.and_time(NaiveTime::MIN))
        })
        .or_else(|| {
            DateTime::parse_from_rfc3339(input)
                .ok()
                .map(|dt| dt.naive_utc())
        })
}

impl Convertible for bool {
    const DESCRIPTOR: ValueDescriptor = ValueDescriptor::new(ValueKind::Bool, "bool");

    fn to_raw(&self) -> RawValue {
        RawValue::Bool(*self)
    }

    fn from_raw(raw: RawValue) -> Result<Self, ConversionError> {
        const TO: &str = "bool";
        match raw {
            RawValue::Bool(b) => Ok(b),
            RawValue::Int(i) => Ok(i != 0),
            RawValue::UInt(u) => Ok(u != 0),
            RawValue::Float(x) => Ok(x != 0.0),
            RawValue::Text(s) => {
                let trimmed = s.trim();
                if trimmed.eq_ignore_ascii_case("true") {
                    Ok(true)
                } else if trimmed.eq_ignore_ascii_case("false") {
                    Ok(false)
                } else {
                    Err(bad_format(&s, TO))
                }
            }
            RawValue::Null => Err(ConversionError::Null { to: TO }),
            other => Err(other.invalid(TO)),
        }
    }
}

impl Convertible for char {
    const DESCRIPTOR: ValueDescriptor = ValueDescriptor::new(ValueKind::Char, "char");

    fn to_raw(&self) -> RawValue {
        RawValue::Char(*self)
    }

    fn from_raw(raw: RawValue) -> Result<Self, ConversionError> {
        const TO: &str = "char";
        match raw {
            RawValue::Char(c) => Ok(c),
            RawValue::Int(i) => u32::try_from(i)
                .ok()
                .and_then(char::from_u32)
                .ok_or_else(|| overflow(i, TO)),
            RawValue::UInt(u) => u32::try_from(u)
                .ok()
                .and_then(char::from_u32)
                .ok_or_else(|| overflow(u, TO)),
            RawValue::Text(s) => {
                let mut chars = s.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => Ok(c),
                    _ => Err(bad_format(&s, TO)),
                }
            }
            RawValue::Null => Err(ConversionError::Null { to: TO }),
            other => Err(other.invalid(TO)),
        }
    }
}

macro_rules! integer_convertible {
    ($($ty:ty => $kind:ident, $raw:ident, $wide:ty);* $(;)?) => {$(
        impl Convertible for $ty {
            const DESCRIPTOR: ValueDescriptor =
                ValueDescriptor::new(ValueKind::$kind, stringify!($ty));

            fn to_raw(&self) -> RawValue {
                RawValue::$raw(<$wide>::from(*self))
            }

            fn from_raw(raw: RawValue) -> Result<Self, ConversionError> {
                const TO: &str = stringify!($ty);
                match raw {
                    RawValue::Bool(b) => Ok(<$ty>::from(b)),
                    RawValue::Char(c) => {
                        <$ty>::try_from(u32::from(c)).map_err(|_| overflow(u32::from(c), TO))
                    }
                    RawValue::Int(i) => <$ty>::try_from(i).map_err(|_| overflow(i, TO)),
                    RawValue::UInt(u) => <$ty>::try_from(u).map_err(|_| overflow(u, TO)),
                    RawValue::Float(x) => {
                        let whole = float_to_integer(x, TO)?;
                        <$ty>::try_from(whole).map_err(|_| overflow(x, TO))
                    }
                    RawValue::Text(s) => s.trim().parse::<$ty>().map_err(|_| bad_format(&s, TO)),
                    RawValue::Null => Err(ConversionError::Null { to: TO }),
                    other => Err(other.invalid(TO)),
                }
            }
        }
    )*};
}

integer_convertible! {
    i8 => Signed, Int, i64;
    i16 => Signed, Int, i64;
    i32 => Signed, Int, i64;
    i64 => Signed, Int, i64;
    u8 => Unsigned, UInt, u64;
    u16 => Unsigned, UInt, u64;
    u32 => Unsigned, UInt, u64;
    u64 => Unsigned, UInt, u64;
}

macro_rules! float_convertible {
    ($($ty:ty),*) => {$(
        impl Convertible for $ty {
            const DESCRIPTOR: ValueDescriptor =
                ValueDescriptor::new(ValueKind::Float, stringify!($ty));

            fn to_raw(&self) -> RawValue {
                RawValue::Float(f64::from(*self))
            }

            fn from_raw(raw: RawValue) -> Result<Self, ConversionError> {
                const TO: &str = stringify!($ty);
                match raw {
                    RawValue::Bool(b) => Ok(if b { 1.0 } else { 0.0 }),
                    RawValue::Int(i) => Ok(i as $ty),
                    RawValue::UInt(u) => Ok(u as $ty),
                    RawValue::Float(x) => Ok(x as $ty),
                    RawValue::Text(s) => s.trim().parse::<$ty>().map_err(|_| bad_format(&s, TO)),
                    RawValue::Null => Err(ConversionError::Null { to: TO }),
                    other => Err(other.invalid(TO)),
                }
            }
        }
    )*};
}

float_convertible!(f32, f64);

impl Convertible for String {
    const DESCRIPTOR: ValueDescriptor = ValueDescriptor::new(ValueKind::Text, "String");

    fn to_raw(&self) -> RawValue {
        RawValue::Text(self.clone())
    }

    fn from_raw(raw: RawValue) -> Result<Self, ConversionError> {
        match raw {
            RawValue::Text(s) => Ok(s),
            RawValue::Null => Err(ConversionError::Null { to: "String" }),
            other => Ok(other.to_string()),
        }
    }
}

impl Convertible for NaiveDateTime {
    const DESCRIPTOR: ValueDescriptor =
        ValueDescriptor::new(ValueKind::DateTime, "NaiveDateTime");

    fn to_raw(&self) -> RawValue {
        RawValue::DateTime(*self)
    }

    fn from_raw(raw: RawValue) -> Result<Self, ConversionError> {
        const TO: &str = "NaiveDateTime";
        match raw {
            RawValue::DateTime(d) => Ok(d),
            RawValue::Text(s) => parse_date_time(&s).ok_or_else(|| bad_format(&s, TO)),
            RawValue::Null => Err(ConversionError::Null { to: TO }),
            other => Err(other.invalid(TO)),
        }
    }
}

impl Convertible for NaiveDate {
    const DESCRIPTOR: ValueDescriptor = ValueDescriptor::new(ValueKind::Date, "NaiveDate");

    fn to_raw(&self) -> RawValue {
        RawValue::from(*self)
    }

    fn from_raw(raw: RawValue) -> Result<Self, ConversionError> {
        match raw {
            RawValue::Null => Err(ConversionError::Null { to: "NaiveDate" }),
            other => NaiveDateTime::from_raw(other)
                .map(|d| d.date())
                .map_err(|err| match err {
                    ConversionError::InvalidCast { from, .. } => ConversionError::InvalidCast {
                        from,
                        to: "NaiveDate",
                    },
                    ConversionError::Format { input, .. } => ConversionError::Format {
                        input,
                        to: "NaiveDate",
                    },
                    other => other,
                }),
        }
    }
}

impl<T: Convertible> Convertible for Option<T> {
    const DESCRIPTOR: ValueDescriptor = ValueDescriptor {
        nullable: true,
        ..T::DESCRIPTOR
    };

    fn to_raw(&self) -> RawValue {
        self.as_ref().map_or(RawValue::Null, Convertible::to_raw)
    }

    fn from_raw(raw: RawValue) -> Result<Self, ConversionError> {
        if raw.is_null() {
            return Ok(None);
        }
        T::from_raw(raw).map(Some)
    }
}

/// Primitive conversions of anything that exposes a current value.
///
/// Implemented for every [`ReadValue`] whose value is [`Convertible`]. A
/// disposed cell reads as `T::default()`, so conversions on it operate on
/// the default value rather than failing.
pub trait ValueConversions<T: Convertible>: ReadValue<T> {
    /// The current value in raw form.
    fn as_object(&self) -> RawValue {
        self.value().to_raw()
    }

    /// Convert the current value to any convertible type.
    ///
    /// # Errors
    ///
    /// Fails when the current value cannot be coerced to `U`.
    fn convert<U: Convertible>(&self) -> Result<U, ConversionError> {
        U::from_raw(self.as_object())
    }

    fn to_bool(&self) -> Result<bool, ConversionError> {
        self.convert()
    }

    fn to_char(&self) -> Result<char, ConversionError> {
        self.convert()
    }

    fn to_i8(&self) -> Result<i8, ConversionError> {
        self.convert()
    }

    fn to_u8(&self) -> Result<u8, ConversionError> {
        self.convert()
    }

    fn to_i16(&self) -> Result<i16, ConversionError> {
        self.convert()
    }

    fn to_u16(&self) -> Result<u16, ConversionError> {
        self.convert()
    }

    fn to_i32(&self) -> Result<i32, ConversionError> {
        self.convert()
    }

    fn to_u32(&self) -> Result<u32, ConversionError> {
        self.convert()
    }

    fn to_i64(&self) -> Result<i64, ConversionError> {
        self.convert()
    }

    fn to_u64(&self) -> Result<u64, ConversionError> {
        self.convert()
    }

    fn to_f32(&self) -> Result<f32, ConversionError> {
        self.convert()
    }

    fn to_f64(&self) -> Result<f64, ConversionError> {
        self.convert()
    }

    /// Display form of the value, as produced by [`RawValue`]'s `Display`.
    fn to_text(&self) -> Result<String, ConversionError> {
        self.convert()
    }

    fn to_date_time(&self) -> Result<NaiveDateTime, ConversionError> {
        self.convert()
    }

    fn to_date(&self) -> Result<NaiveDate, ConversionError> {
        self.convert()
    }
}

impl<T: Convertible, S: ReadValue<T> + ?Sized> ValueConversions<T> for S {}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn text_to_bool_is_case_insensitive() {
        assert_eq!(bool::from_raw("true".into()), Ok(true));
        assert_eq!(bool::from_raw(" False ".into()), Ok(false));
        assert!(matches!(
            bool::from_raw("yes".into()),
            Err(ConversionError::Format { .. })
        ));
    }

    #[test]
    fn text_to_char_requires_single_char() {
        assert_eq!(char::from_raw("C".into()), Ok('C'));
        assert!(char::from_raw("CD".into()).is_err());
        assert!(char::from_raw("".into()).is_err());
    }

    #[test]
    fn text_to_date_accepts_us_and_iso_forms() {
        let expected = date(2000, 1, 1).and_time(NaiveTime::MIN);
        assert_eq!(NaiveDateTime::from_raw("1/1/2000".into()), Ok(expected));
        assert_eq!(NaiveDateTime::from_raw("2000-01-01".into()), Ok(expected));
        assert_eq!(
            NaiveDateTime::from_raw("2000-01-01T00:00:00".into()),
            Ok(expected)
        );
        assert_eq!(NaiveDate::from_raw("01/01/2000".into()), Ok(date(2000, 1, 1)));
    }

    #[test]
    fn rfc3339_is_normalized_to_utc() {
        let parsed = NaiveDateTime::from_raw("2000-01-01T02:00:00+02:00".into()).unwrap();
        assert_eq!(parsed, date(2000, 1, 1).and_time(NaiveTime::MIN));
    }

    #[test]
    fn bool_and_integers_interconvert() {
        assert_eq!(u8::from_raw(RawValue::Bool(true)), Ok(1));
        assert_eq!(i64::from_raw(RawValue::Bool(false)), Ok(0));
        assert_eq!(bool::from_raw(RawValue::Int(-3)), Ok(true));
        assert_eq!(bool::from_raw(RawValue::UInt(0)), Ok(false));
    }

    #[test]
    fn integer_range_is_checked() {
        assert!(matches!(
            u8::from_raw(RawValue::Int(256)),
            Err(ConversionError::Overflow { .. })
        ));
        assert!(u32::from_raw(RawValue::Int(-1)).is_err());
        assert_eq!(i8::from_raw(RawValue::UInt(127)), Ok(127));
    }

    #[test]
    fn float_to_integer_rounds_half_to_even() {
        assert_eq!(i32::from_raw(RawValue::Float(2.5)), Ok(2));
        assert_eq!(i32::from_raw(RawValue::Float(3.5)), Ok(4));
        assert_eq!(i32::from_raw(RawValue::Float(-2.5)), Ok(-2));
        assert!(i32::from_raw(RawValue::Float(f64::NAN)).is_err());
        assert!(u8::from_raw(RawValue::Float(255.6)).is_err());
    }

    #[test]
    fn char_code_points() {
        assert_eq!(u32::from_raw(RawValue::Char('A')), Ok(65));
        assert_eq!(char::from_raw(RawValue::Int(66)), Ok('B'));
        assert!(u8::from_raw(RawValue::Char('\u{1F600}')).is_err());
        assert!(char::from_raw(RawValue::Int(0xD800)).is_err());
    }

    #[test]
    fn invalid_casts() {
        assert_eq!(
            bool::from_raw(RawValue::Char('x')),
            Err(ConversionError::InvalidCast {
                from: "char",
                to: "bool"
            })
        );
        assert!(f64::from_raw(RawValue::Char('x')).is_err());
        assert!(i32::from_raw(RawValue::DateTime(NaiveDateTime::default())).is_err());
        assert!(NaiveDateTime::from_raw(RawValue::Int(1)).is_err());
    }

    #[test]
    fn everything_renders_as_text() {
        assert_eq!(String::from_raw(RawValue::Bool(true)), Ok("true".into()));
        assert_eq!(String::from_raw(RawValue::Int(-7)), Ok("-7".into()));
        assert_eq!(String::from_raw(RawValue::Char('z')), Ok("z".into()));
        let dt = date(2000, 1, 2).and_hms_opt(3, 4, 5).unwrap();
        let text = String::from_raw(RawValue::DateTime(dt)).unwrap();
        assert_eq!(text, "2000-01-02T03:04:05");
        assert_eq!(NaiveDateTime::from_raw(text.into()), Ok(dt));
    }

    #[test]
    fn null_only_fits_options() {
        assert_eq!(Option::<i32>::from_raw(RawValue::Null), Ok(None));
        assert_eq!(Option::<i32>::from_raw("12".into()), Ok(Some(12)));
        assert_eq!(
            i32::from_raw(RawValue::Null),
            Err(ConversionError::Null { to: "i32" })
        );
        assert!(String::from_raw(RawValue::Null).is_err());
    }

    #[test]
    fn descriptors_describe_types() {
        assert_eq!(i32::DESCRIPTOR.kind, ValueKind::Signed);
        assert_eq!(u16::DESCRIPTOR.type_name, "u16");
        assert!(!bool::DESCRIPTOR.nullable);
        let optional = <Option<f64>>::DESCRIPTOR;
        assert!(optional.nullable);
        assert_eq!(optional.kind, ValueKind::Float);
    }

    #[test]
    fn raw_from_options_and_dates() {
        assert_eq!(RawValue::from(None::<bool>), RawValue::Null);
        assert_eq!(RawValue::from(Some(true)), RawValue::Bool(true));
        assert_eq!(
            RawValue::from(date(2000, 1, 1)),
            RawValue::DateTime(date(2000, 1, 1).and_time(NaiveTime::MIN))
        );
    }

    #[test]
    fn cells_convert_to_signed_bytes() {
        let cell = crate::RxCell::new(-5_i32);
        assert_eq!(cell.to_i8(), Ok(-5));
        cell.set(200);
        assert!(matches!(cell.to_i8(), Err(ConversionError::Overflow { .. })));
        assert_eq!(crate::RxCell::new('A').to_i8(), Ok(65));
    }

    #[test]
    fn error_messages_name_both_sides() {
        let err = u8::from_raw(RawValue::Int(999)).unwrap_err();
        assert_eq!(err.to_string(), "value 999 is out of range for u8");
        let err = bool::from_raw("maybe".into()).unwrap_err();
        assert_eq!(err.to_string(), "cannot parse \"maybe\" as bool");
    }
}
