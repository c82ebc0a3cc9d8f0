//! Loosely typed values and tag inference.
//!
//! Callers holding untyped data (decoded JSON, script values, ...) can build a
//! [`Native`] tree and let the codec guess wire tags for it. A keyed array is a
//! list when its keys are exactly `0, 1, 2, ...` in order and a map otherwise.
//! The empty array is both; inference always picks the list.
//!
//! A [`Native::Typed`] entry carries an explicitly typed [`Variant`], so a
//! loosely typed tree can still hold a UShort or a user type where the peer
//! expects one. Decoded values convert back with `Native::from(variant)`.

use chrono::{DateTime, Utc};

use super::{TypeTag, Variant, VariantMap};
use crate::error::{DataStreamError, Result};

/// Key of a [`Native::Array`] entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ArrayKey {
    Index(i64),
    Name(String),
}

/// An untyped native value.
#[derive(Debug, Clone, PartialEq)]
pub enum Native {
    Null,
    Bool(bool),
    Int(i64),
    Text(String),
    Array(Vec<(ArrayKey, Native)>),
    Instant(DateTime<Utc>),
    /// A value whose wire type is given rather than inferred.
    Typed(Variant),
}

impl Native {
    /// Builds an array keyed `0, 1, 2, ...`.
    pub fn list(items: impl IntoIterator<Item = Native>) -> Self {
        Self::Array(
            items
                .into_iter()
                .enumerate()
                .map(|(i, v)| (ArrayKey::Index(i as i64), v))
                .collect(),
        )
    }

    /// Builds an array keyed by name.
    pub fn map<K: Into<String>>(entries: impl IntoIterator<Item = (K, Native)>) -> Self {
        Self::Array(
            entries
                .into_iter()
                .map(|(k, v)| (ArrayKey::Name(k.into()), v))
                .collect(),
        )
    }

    fn kind(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "boolean",
            Self::Int(_) => "integer",
            Self::Text(_) => "string",
            Self::Array(_) => "array",
            Self::Instant(_) => "instant",
            Self::Typed(_) => "variant",
        }
    }
}

impl From<bool> for Native {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<i64> for Native {
    fn from(i: i64) -> Self {
        Self::Int(i)
    }
}

impl From<&str> for Native {
    fn from(s: &str) -> Self {
        Self::Text(s.to_owned())
    }
}

impl From<String> for Native {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

/// Flattens a decoded value into its loosely typed form.
///
/// Integers of every width become `Int`, a QChar becomes one-character text and
/// the null forms become `Null`. A user type yields whatever its codec
/// decoded. Byte arrays and times have no untyped counterpart and stay
/// `Typed`, so they are written back under their own tags.
impl From<Variant> for Native {
    fn from(value: Variant) -> Self {
        match value {
            Variant::Bool(b) => Self::Bool(b),
            Variant::Int32(i) => Self::Int(i64::from(i)),
            Variant::UInt32(i) => Self::Int(i64::from(i)),
            Variant::Int16(i) => Self::Int(i64::from(i)),
            Variant::UInt16(i) => Self::Int(i64::from(i)),
            Variant::Int8(i) => Self::Int(i64::from(i)),
            Variant::UInt8(i) => Self::Int(i64::from(i)),
            Variant::Char16(c) => Self::Text(c.to_string()),
            Variant::String(Some(s)) => Self::Text(s),
            Variant::String(None)
            | Variant::ByteArray(None)
            | Variant::Time(None)
            | Variant::DateTime(None) => Self::Null,
            Variant::StringList(items) => {
                Self::list(items.into_iter().map(|s| s.map_or(Self::Null, Self::Text)))
            }
            Variant::VariantList(items) => Self::list(items.into_iter().map(Self::from)),
            Variant::VariantMap(map) => Self::map(map.into_iter().map(|(k, v)| (k, Self::from(v)))),
            Variant::DateTime(Some(dt)) => Self::Instant(dt),
            Variant::UserType(user) => Self::from(*user.value),
            typed @ (Variant::ByteArray(Some(_)) | Variant::Time(Some(_))) => Self::Typed(typed),
        }
    }
}

/// Returns `true` if the entries are keyed exactly `0, 1, 2, ...` in order.
pub fn is_list(entries: &[(ArrayKey, Native)]) -> bool {
    entries
        .iter()
        .enumerate()
        .all(|(i, (key, _))| *key == ArrayKey::Index(i as i64))
}

/// Returns `true` if the entries are not a list, or are empty.
pub fn is_map(entries: &[(ArrayKey, Native)]) -> bool {
    entries.is_empty() || !is_list(entries)
}

/// Infers the wire tag for a native value.
///
/// A bare `Null` has no wire representation as a standalone variant and fails
/// with `UnsupportedValue`.
pub fn tag_of(value: &Native) -> Result<TypeTag> {
    match value {
        Native::Int(_) => Ok(TypeTag::Int32),
        Native::Text(_) => Ok(TypeTag::String),
        Native::Bool(_) => Ok(TypeTag::Bool),
        Native::Array(entries) if is_list(entries) => Ok(TypeTag::VariantList),
        Native::Array(_) => Ok(TypeTag::VariantMap),
        Native::Instant(_) => Ok(TypeTag::DateTime),
        Native::Typed(v) => Ok(v.type_tag()),
        Native::Null => Err(DataStreamError::UnsupportedValue(format!(
            "can not guess variant type for type \"{}\"",
            value.kind()
        ))),
    }
}

impl TryFrom<Native> for Variant {
    type Error = DataStreamError;

    fn try_from(value: Native) -> Result<Self> {
        let tag = tag_of(&value)?;
        match (tag, value) {
            (_, Native::Typed(v)) => Ok(v),
            (TypeTag::Int32, Native::Int(i)) => i32::try_from(i).map(Variant::Int32).map_err(|_| {
                DataStreamError::UnsupportedValue(format!("integer {i} does not fit Int32"))
            }),
            (TypeTag::String, Native::Text(s)) => Ok(Variant::String(Some(s))),
            (TypeTag::Bool, Native::Bool(b)) => Ok(Variant::Bool(b)),
            (TypeTag::DateTime, Native::Instant(dt)) => Ok(Variant::DateTime(Some(dt))),
            (TypeTag::VariantList, Native::Array(entries)) => entries
                .into_iter()
                .map(|(_, v)| Variant::try_from(v))
                .collect::<Result<Vec<_>>>()
                .map(Variant::VariantList),
            (_, Native::Array(entries)) => {
                let mut map = VariantMap::with_capacity(entries.len());
                for (key, v) in entries {
                    let key = match key {
                        ArrayKey::Index(i) => i.to_string(),
                        ArrayKey::Name(s) => s,
                    };
                    map.insert(key, Variant::try_from(v)?);
                }
                Ok(Variant::VariantMap(map))
            }
            (tag, other) => Err(DataStreamError::UnsupportedValue(format!(
                "{} can not be written as {}",
                other.kind(),
                tag.name()
            ))),
        }
    }
}
