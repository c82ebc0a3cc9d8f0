//! QVariant type tags and value types.

mod native;
mod value;

use std::fmt;

pub use native::{is_list, is_map, tag_of, ArrayKey, Native};
pub use value::{StringList, UserValue, Variant, VariantList, VariantMap};

use crate::error::{DataStreamError, Result};

/// QMetaType ids understood on the wire.
///
/// The numeric codes are fixed by the peer framework and must not change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum TypeTag {
    Bool = 1,
    Int32 = 2,
    UInt32 = 3,
    Char16 = 7,
    VariantMap = 8,
    VariantList = 9,
    String = 10,
    StringList = 11,
    ByteArray = 12,
    Time = 15,
    DateTime = 16,
    UserType = 127,
    Int16 = 130,
    Int8 = 131,
    UInt16 = 133,
    UInt8 = 134,
}

impl TypeTag {
    /// Every known tag, in ascending code order.
    pub const ALL: [TypeTag; 16] = [
        Self::Bool,
        Self::Int32,
        Self::UInt32,
        Self::Char16,
        Self::VariantMap,
        Self::VariantList,
        Self::String,
        Self::StringList,
        Self::ByteArray,
        Self::Time,
        Self::DateTime,
        Self::UserType,
        Self::Int16,
        Self::Int8,
        Self::UInt16,
        Self::UInt8,
    ];

    /// The 4-byte wire code of this tag.
    pub const fn code(self) -> u32 {
        self as u32
    }

    /// Resolves a wire code, failing with `UnknownType` for unregistered codes.
    pub fn from_u32(code: u32) -> Result<Self> {
        let tag = match code {
            1 => Self::Bool,
            2 => Self::Int32,
            3 => Self::UInt32,
            7 => Self::Char16,
            8 => Self::VariantMap,
            9 => Self::VariantList,
            10 => Self::String,
            11 => Self::StringList,
            12 => Self::ByteArray,
            15 => Self::Time,
            16 => Self::DateTime,
            127 => Self::UserType,
            130 => Self::Int16,
            131 => Self::Int8,
            133 => Self::UInt16,
            134 => Self::UInt8,
            other => return Err(DataStreamError::UnknownType(other)),
        };
        Ok(tag)
    }

    /// Canonical type name as used by the peer framework.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Bool => "Bool",
            Self::Int32 => "Int",
            Self::UInt32 => "UInt",
            Self::Char16 => "QChar",
            Self::VariantMap => "QVariantMap",
            Self::VariantList => "QVariantList",
            Self::String => "QString",
            Self::StringList => "QStringList",
            Self::ByteArray => "QByteArray",
            Self::Time => "QTime",
            Self::DateTime => "QDateTime",
            Self::UserType => "QUserType",
            Self::Int16 => "Short",
            Self::Int8 => "Char",
            Self::UInt16 => "UShort",
            Self::UInt8 => "UChar",
        }
    }
}

/// Looks up the canonical name for a raw wire code.
pub fn name_of(code: u32) -> Result<&'static str> {
    TypeTag::from_u32(code).map(TypeTag::name)
}

impl TryFrom<u32> for TypeTag {
    type Error = DataStreamError;

    fn try_from(code: u32) -> Result<Self> {
        Self::from_u32(code)
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name(), self.code())
    }
}
