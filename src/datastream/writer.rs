//! QDataStream encoding: `Variant` → bytes.

use std::borrow::Cow;
use std::sync::Arc;

use bytes::{BufMut, Bytes, BytesMut};
use chrono::{DateTime, NaiveTime, Utc};

use super::calendar::{self, WireDateTime};
use super::{text, NULL_LENGTH};
use crate::config::Options;
use crate::error::{DataStreamError, Result};
use crate::types::{Native, TypeTag, UserValue, Variant, VariantMap};
use crate::user_type::UserTypeRegistry;

/// Serializes values into a growing buffer.
///
/// A writer holds the bytes of one message. Call [`Writer::clear`] before
/// reusing it for an unrelated message.
#[derive(Debug)]
pub struct Writer {
    buf: BytesMut,
    user_types: Arc<UserTypeRegistry>,
    options: Options,
    depth: usize,
}

impl Default for Writer {
    fn default() -> Self {
        Self::new()
    }
}

impl Writer {
    /// A writer with no registered user types.
    pub fn new() -> Self {
        Self::with_user_types(UserTypeRegistry::empty())
    }

    pub fn with_user_types(user_types: Arc<UserTypeRegistry>) -> Self {
        Self {
            buf: BytesMut::new(),
            user_types,
            options: Options::default(),
            depth: 0,
        }
    }

    pub fn with_options(mut self, options: Options) -> Self {
        self.options = options;
        self
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Discards everything written so far.
    pub fn clear(&mut self) {
        self.buf.clear();
        self.depth = 0;
    }

    pub fn into_bytes(self) -> Bytes {
        self.buf.freeze()
    }

    // -- Variants --

    /// Writes a tagged variant: 4-byte tag, null indicator, payload.
    ///
    /// On error nothing of `value` is left in the buffer.
    pub fn write_variant(&mut self, value: &Variant) -> Result<()> {
        self.all_or_nothing(|w| {
            w.write_header(value.type_tag());
            w.write_payload(value)
        })
    }

    /// Writes `value` under an explicit tag.
    ///
    /// Integers may be written as any other integer tag they fit, or as Bool.
    /// Any other mismatch fails with `UnsupportedValue`.
    pub fn write_variant_as(&mut self, value: &Variant, tag: TypeTag) -> Result<()> {
        let value = coerce(value, tag)?;
        self.all_or_nothing(|w| {
            w.write_header(tag);
            w.write_payload(&value)
        })
    }

    /// Writes an untyped value, guessing its tag.
    pub fn write_native(&mut self, value: &Native) -> Result<()> {
        let variant = Variant::try_from(value.clone())?;
        self.write_variant(&variant)
    }

    fn write_header(&mut self, tag: TypeTag) {
        self.buf.put_u32(tag.code());
        self.buf.put_u8(0);
    }

    fn write_payload(&mut self, value: &Variant) -> Result<()> {
        match value {
            Variant::Bool(b) => self.write_bool(*b),
            Variant::Int32(i) => self.write_int32(*i),
            Variant::UInt32(i) => self.write_uint32(*i),
            Variant::Int16(i) => self.write_int16(*i),
            Variant::UInt16(i) => self.write_uint16(*i),
            Variant::Int8(i) => self.write_int8(*i),
            Variant::UInt8(i) => self.write_uint8(*i),
            Variant::Char16(c) => return self.write_char16(*c),
            Variant::String(s) => return self.write_string(s.as_deref()),
            Variant::ByteArray(b) => return self.write_byte_array(b.as_deref()),
            Variant::StringList(items) => return self.write_string_list(items),
            Variant::VariantList(items) => return self.write_variant_list(items),
            Variant::VariantMap(map) => return self.write_variant_map(map),
            Variant::Time(t) => self.write_time(t.as_ref()),
            Variant::DateTime(dt) => return self.write_date_time(dt.as_ref()),
            Variant::UserType(u) => return self.write_user_type(u),
        }
        Ok(())
    }

    // -- Fixed-width scalars --

    /// Writes a single byte, 1 for true.
    pub fn write_bool(&mut self, value: bool) {
        self.buf.put_u8(u8::from(value));
    }

    pub fn write_int32(&mut self, value: i32) {
        self.buf.put_i32(value);
    }

    pub fn write_uint32(&mut self, value: u32) {
        self.buf.put_u32(value);
    }

    pub fn write_int16(&mut self, value: i16) {
        self.buf.put_i16(value);
    }

    pub fn write_uint16(&mut self, value: u16) {
        self.buf.put_u16(value);
    }

    pub fn write_int8(&mut self, value: i8) {
        self.buf.put_i8(value);
    }

    pub fn write_uint8(&mut self, value: u8) {
        self.buf.put_u8(value);
    }

    /// Writes one UTF-16 code unit.
    pub fn write_char16(&mut self, value: char) -> Result<()> {
        let unit = text::encode_char16(value, self.options.transcoding)?;
        self.buf.put_u16(unit);
        Ok(())
    }

    // -- Length-prefixed data --

    /// Writes a length-prefixed byte array; `None` writes the null sentinel.
    pub fn write_byte_array(&mut self, bytes: Option<&[u8]>) -> Result<()> {
        match bytes {
            None => self.buf.put_u32(NULL_LENGTH),
            Some(bytes) => {
                self.buf.put_u32(wire_len(bytes.len())?);
                self.buf.put_slice(bytes);
            }
        }
        Ok(())
    }

    /// Writes text as length-prefixed UTF-16BE; `None` writes the null sentinel.
    pub fn write_string(&mut self, value: Option<&str>) -> Result<()> {
        match value {
            None => self.buf.put_u32(NULL_LENGTH),
            Some(s) => {
                let mode = self.options.transcoding;
                self.buf.put_u32(wire_len(text::utf16be_len(s, mode))?);
                text::put_utf16be(&mut self.buf, s, mode);
            }
        }
        Ok(())
    }

    pub fn write_string_list(&mut self, items: &[Option<String>]) -> Result<()> {
        self.all_or_nothing(|w| {
            w.buf.put_u32(wire_len(items.len())?);
            for item in items {
                w.write_string(item.as_deref())?;
            }
            Ok(())
        })
    }

    // -- Containers --

    pub fn write_variant_list(&mut self, items: &[Variant]) -> Result<()> {
        self.all_or_nothing(|w| w.nested(|w| {
            w.buf.put_u32(wire_len(items.len())?);
            for item in items {
                w.write_variant(item)?;
            }
            Ok(())
        }))
    }

    /// Writes map entries as key string + variant, in iteration order.
    pub fn write_variant_map(&mut self, map: &VariantMap) -> Result<()> {
        self.all_or_nothing(|w| w.nested(|w| {
            w.buf.put_u32(wire_len(map.len())?);
            for (key, value) in map {
                w.write_string(Some(key.as_str()))?;
                w.write_variant(value)?;
            }
            Ok(())
        }))
    }

    // -- Calendar --

    /// Writes milliseconds since midnight; `None` writes the null QTime.
    pub fn write_time(&mut self, time: Option<&NaiveTime>) {
        let msecs = time.map_or(calendar::NULL_TIME, calendar::time_to_msecs);
        self.buf.put_u32(msecs);
    }

    /// Writes a UTC QDateTime; `None` writes the null QDateTime.
    pub fn write_date_time(&mut self, instant: Option<&DateTime<Utc>>) -> Result<()> {
        let wire = match instant {
            Some(instant) => WireDateTime::from_instant(instant)?,
            None => WireDateTime::NULL,
        };
        self.buf.put_u32(wire.day);
        self.buf.put_u32(wire.msecs);
        self.write_bool(wire.is_utc);
        Ok(())
    }

    // -- User types --

    pub fn write_user_type(&mut self, value: &UserValue) -> Result<()> {
        self.write_user_type_by_name(&value.value, &value.name)
    }

    /// Writes `name` NUL-terminated, then lets the registered codec append the
    /// payload for `value`.
    pub fn write_user_type_by_name(&mut self, value: &Variant, name: &str) -> Result<()> {
        let registry = Arc::clone(&self.user_types);
        let codec = registry.get(name)?;
        if name.is_empty() || name.contains('\0') {
            return Err(DataStreamError::MalformedUserTypeName(format!("{name:?}")));
        }

        let mut raw = Vec::with_capacity(name.len() + 1);
        raw.extend_from_slice(name.as_bytes());
        raw.push(0);
        self.all_or_nothing(|w| {
            w.write_byte_array(Some(&raw))?;
            w.nested(|w| codec.encode(value, w))
        })
    }

    /// Runs `f`, dropping whatever it appended if it fails.
    fn all_or_nothing(&mut self, f: impl FnOnce(&mut Self) -> Result<()>) -> Result<()> {
        let start = self.buf.len();
        let result = f(self);
        if result.is_err() {
            self.buf.truncate(start);
        }
        result
    }

    fn nested<T>(&mut self, f: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        if self.depth >= self.options.max_depth {
            return Err(DataStreamError::LimitExceeded(format!(
                "nesting deeper than {} levels",
                self.options.max_depth
            )));
        }
        self.depth += 1;
        let result = f(self);
        self.depth -= 1;
        result
    }
}

fn wire_len(len: usize) -> Result<u32> {
    u32::try_from(len)
        .ok()
        .filter(|&n| n != NULL_LENGTH)
        .ok_or_else(|| DataStreamError::ValueOutOfRange(format!("length {len} exceeds 32 bits")))
}

/// Converts `value` into the shape `tag` expects.
fn coerce(value: &Variant, tag: TypeTag) -> Result<Cow<'_, Variant>> {
    if value.type_tag() == tag {
        return Ok(Cow::Borrowed(value));
    }
    let Some(int) = value.as_int() else {
        return Err(mismatch(value, tag));
    };
    let out_of_range =
        || DataStreamError::ValueOutOfRange(format!("{int} does not fit {}", tag.name()));
    let coerced = match tag {
        TypeTag::Bool => Variant::Bool(int != 0),
        TypeTag::Int32 => Variant::Int32(i32::try_from(int).map_err(|_| out_of_range())?),
        TypeTag::UInt32 => Variant::UInt32(u32::try_from(int).map_err(|_| out_of_range())?),
        TypeTag::Int16 => Variant::Int16(i16::try_from(int).map_err(|_| out_of_range())?),
        TypeTag::UInt16 => Variant::UInt16(u16::try_from(int).map_err(|_| out_of_range())?),
        TypeTag::Int8 => Variant::Int8(i8::try_from(int).map_err(|_| out_of_range())?),
        TypeTag::UInt8 => Variant::UInt8(u8::try_from(int).map_err(|_| out_of_range())?),
        _ => return Err(mismatch(value, tag)),
    };
    Ok(Cow::Owned(coerced))
}

fn mismatch(value: &Variant, tag: TypeTag) -> DataStreamError {
    DataStreamError::UnsupportedValue(format!(
        "{} can not be written as {}",
        value.type_tag().name(),
        tag.name()
    ))
}
