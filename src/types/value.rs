//! QVariant value tree.

use std::fmt;

use chrono::{DateTime, NaiveTime, Utc};
use indexmap::IndexMap;

use super::TypeTag;

/// String-keyed variant map. Iteration order is the write order.
pub type VariantMap = IndexMap<String, Variant>;

/// Ordered list of variants.
pub type VariantList = Vec<Variant>;

/// Ordered list of nullable strings.
pub type StringList = Vec<Option<String>>;

/// A self-describing value, corresponding to one QVariant on the wire.
///
/// The enum variant determines the wire tag, so a tree built from these values
/// always serializes the same way regardless of its contents.
#[derive(Debug, Clone, PartialEq)]
pub enum Variant {
    Bool(bool),
    Int32(i32),
    UInt32(u32),
    Int16(i16),
    UInt16(u16),
    Int8(i8),
    UInt8(u8),
    /// A single UTF-16 code unit. Scalars above U+FFFF cannot be represented.
    Char16(char),
    /// `None` is a null QString, distinct from the empty string.
    String(Option<String>),
    /// `None` is a null QByteArray, distinct from an empty one.
    ByteArray(Option<Vec<u8>>),
    StringList(StringList),
    VariantList(VariantList),
    VariantMap(VariantMap),
    /// Wall-clock time of day at millisecond resolution. `None` is a null QTime.
    Time(Option<NaiveTime>),
    /// Absolute instant. `None` is a null QDateTime.
    DateTime(Option<DateTime<Utc>>),
    UserType(UserValue),
}

/// A named user type and the value its registered codec produces or consumes.
#[derive(Debug, Clone, PartialEq)]
pub struct UserValue {
    pub name: String,
    pub value: Box<Variant>,
}

impl UserValue {
    pub fn new(name: impl Into<String>, value: impl Into<Variant>) -> Self {
        Self {
            name: name.into(),
            value: Box::new(value.into()),
        }
    }
}

impl Variant {
    /// Returns the wire tag this value serializes with.
    pub fn type_tag(&self) -> TypeTag {
        match self {
            Self::Bool(_) => TypeTag::Bool,
            Self::Int32(_) => TypeTag::Int32,
            Self::UInt32(_) => TypeTag::UInt32,
            Self::Int16(_) => TypeTag::Int16,
            Self::UInt16(_) => TypeTag::UInt16,
            Self::Int8(_) => TypeTag::Int8,
            Self::UInt8(_) => TypeTag::UInt8,
            Self::Char16(_) => TypeTag::Char16,
            Self::String(_) => TypeTag::String,
            Self::ByteArray(_) => TypeTag::ByteArray,
            Self::StringList(_) => TypeTag::StringList,
            Self::VariantList(_) => TypeTag::VariantList,
            Self::VariantMap(_) => TypeTag::VariantMap,
            Self::Time(_) => TypeTag::Time,
            Self::DateTime(_) => TypeTag::DateTime,
            Self::UserType(_) => TypeTag::UserType,
        }
    }

    /// Builds a user type value.
    pub fn user(name: impl Into<String>, value: impl Into<Variant>) -> Self {
        Self::UserType(UserValue::new(name, value))
    }

    /// Returns `true` for the null forms of String, ByteArray, Time and DateTime.
    pub fn is_null(&self) -> bool {
        matches!(
            self,
            Self::String(None) | Self::ByteArray(None) | Self::Time(None) | Self::DateTime(None)
        )
    }

    /// Returns the value as a string reference, if it is a non-null `String`.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(Some(s)) => Some(s),
            _ => None,
        }
    }

    /// Returns any integer variant widened to `i64`.
    pub fn as_int(&self) -> Option<i64> {
        match *self {
            Self::Int32(i) => Some(i64::from(i)),
            Self::UInt32(i) => Some(i64::from(i)),
            Self::Int16(i) => Some(i64::from(i)),
            Self::UInt16(i) => Some(i64::from(i)),
            Self::Int8(i) => Some(i64::from(i)),
            Self::UInt8(i) => Some(i64::from(i)),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&VariantList> {
        match self {
            Self::VariantList(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&VariantMap> {
        match self {
            Self::VariantMap(map) => Some(map),
            _ => None,
        }
    }
}

// -- Convenience conversions --

impl From<bool> for Variant {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<i32> for Variant {
    fn from(i: i32) -> Self {
        Self::Int32(i)
    }
}

impl From<u32> for Variant {
    fn from(i: u32) -> Self {
        Self::UInt32(i)
    }
}

impl From<i16> for Variant {
    fn from(i: i16) -> Self {
        Self::Int16(i)
    }
}

impl From<u16> for Variant {
    fn from(i: u16) -> Self {
        Self::UInt16(i)
    }
}

impl From<i8> for Variant {
    fn from(i: i8) -> Self {
        Self::Int8(i)
    }
}

impl From<u8> for Variant {
    fn from(i: u8) -> Self {
        Self::UInt8(i)
    }
}

impl From<char> for Variant {
    fn from(c: char) -> Self {
        Self::Char16(c)
    }
}

impl From<String> for Variant {
    fn from(s: String) -> Self {
        Self::String(Some(s))
    }
}

impl From<&str> for Variant {
    fn from(s: &str) -> Self {
        Self::String(Some(s.to_owned()))
    }
}

impl From<Vec<u8>> for Variant {
    fn from(b: Vec<u8>) -> Self {
        Self::ByteArray(Some(b))
    }
}

impl From<Vec<String>> for Variant {
    fn from(v: Vec<String>) -> Self {
        Self::StringList(v.into_iter().map(Some).collect())
    }
}

impl From<VariantList> for Variant {
    fn from(v: VariantList) -> Self {
        Self::VariantList(v)
    }
}

impl From<VariantMap> for Variant {
    fn from(m: VariantMap) -> Self {
        Self::VariantMap(m)
    }
}

impl From<NaiveTime> for Variant {
    fn from(t: NaiveTime) -> Self {
        Self::Time(Some(t))
    }
}

impl From<DateTime<Utc>> for Variant {
    fn from(dt: DateTime<Utc>) -> Self {
        Self::DateTime(Some(dt))
    }
}

impl From<UserValue> for Variant {
    fn from(u: UserValue) -> Self {
        Self::UserType(u)
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int32(i) => write!(f, "{i}"),
            Self::UInt32(i) => write!(f, "{i}u"),
            Self::Int16(i) => write!(f, "{i}s"),
            Self::UInt16(i) => write!(f, "{i}us"),
            Self::Int8(i) => write!(f, "{i}c"),
            Self::UInt8(i) => write!(f, "{i}uc"),
            Self::Char16(c) => write!(f, "'{c}'"),
            Self::String(Some(s)) => write!(f, "\"{s}\""),
            Self::ByteArray(Some(b)) => write!(f, "<{} bytes>", b.len()),
            Self::String(None) | Self::ByteArray(None) | Self::Time(None) | Self::DateTime(None) => {
                write!(f, "null")
            }
            Self::StringList(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    match item {
                        Some(s) => write!(f, "\"{s}\"")?,
                        None => write!(f, "null")?,
                    }
                }
                write!(f, "]")
            }
            Self::VariantList(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "]")
            }
            Self::VariantMap(map) => {
                write!(f, "{{")?;
                for (i, (k, v)) in map.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{k}: {v}")?;
                }
                write!(f, "}}")
            }
            Self::Time(Some(t)) => write!(f, "time({t})"),
            Self::DateTime(Some(dt)) => write!(f, "datetime({})", dt.to_rfc3339()),
            Self::UserType(u) => write!(f, "{}({})", u.name, u.value),
        }
    }
}
