//! QDataStream decoding: bytes → `Variant`.

use std::sync::Arc;

use bytes::Buf;
use chrono::{DateTime, FixedOffset, NaiveTime, TimeZone, Utc};

use super::calendar::{self, WireDateTime};
use super::{text, NULL_LENGTH};
use crate::config::Options;
use crate::error::{DataStreamError, Result};
use crate::types::{Native, StringList, TypeTag, UserValue, Variant, VariantList, VariantMap};
use crate::user_type::UserTypeRegistry;

/// Smallest encoding of one tagged variant: 4-byte tag + null indicator.
const MIN_VARIANT_LEN: usize = 5;

/// Smallest encoding of one string: its 4-byte length.
const MIN_STRING_LEN: usize = 4;

/// A decode routine for one wire tag.
pub type DecodeFn = fn(&mut Reader<'_>) -> Result<Variant>;

/// Returns the payload decoder for `tag`.
pub fn decoder_for(tag: TypeTag) -> DecodeFn {
    match tag {
        TypeTag::Bool => |r| r.read_bool().map(Variant::Bool),
        TypeTag::Int32 => |r| r.read_int32().map(Variant::Int32),
        TypeTag::UInt32 => |r| r.read_uint32().map(Variant::UInt32),
        TypeTag::Char16 => |r| r.read_char16().map(Variant::Char16),
        TypeTag::VariantMap => |r| r.read_variant_map().map(Variant::VariantMap),
        TypeTag::VariantList => |r| r.read_variant_list().map(Variant::VariantList),
        TypeTag::String => |r| r.read_string().map(Variant::String),
        TypeTag::StringList => |r| r.read_string_list().map(Variant::StringList),
        TypeTag::ByteArray => |r| r.read_byte_array().map(Variant::ByteArray),
        TypeTag::Time => |r| r.read_time().map(Variant::Time),
        TypeTag::DateTime => |r| r.read_date_time().map(Variant::DateTime),
        TypeTag::UserType => |r| r.read_user_type().map(Variant::UserType),
        TypeTag::Int16 => |r| r.read_int16().map(Variant::Int16),
        TypeTag::Int8 => |r| r.read_int8().map(Variant::Int8),
        TypeTag::UInt16 => |r| r.read_uint16().map(Variant::UInt16),
        TypeTag::UInt8 => |r| r.read_uint8().map(Variant::UInt8),
    }
}

/// Decodes values from a fully materialized message buffer.
///
/// After any error the reader's position is meaningless for the rest of the
/// message; callers must discard it.
#[derive(Debug)]
pub struct Reader<'a> {
    buf: &'a [u8],
    len: usize,
    user_types: Arc<UserTypeRegistry>,
    options: Options,
    depth: usize,
}

impl<'a> Reader<'a> {
    /// A reader with no registered user types.
    pub fn new(data: &'a [u8]) -> Self {
        Self::with_user_types(data, UserTypeRegistry::empty())
    }

    pub fn with_user_types(data: &'a [u8], user_types: Arc<UserTypeRegistry>) -> Self {
        Self {
            buf: data,
            len: data.len(),
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

    /// Number of bytes consumed so far.
    pub fn position(&self) -> usize {
        self.len - self.buf.len()
    }

    pub fn remaining(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    // -- Variants --

    /// Reads a tagged variant: 4-byte tag, null indicator, payload.
    pub fn read_variant(&mut self) -> Result<Variant> {
        let code = self.read_uint32()?;
        let _is_null = self.read_bool()?;
        let tag = TypeTag::from_u32(code)?;
        decoder_for(tag)(self)
    }

    /// Reads a tagged variant and flattens it into a [`Native`] value.
    pub fn read_native(&mut self) -> Result<Native> {
        self.read_variant().map(Native::from)
    }

    // -- Fixed-width scalars --

    /// Reads one byte; any non-zero value is true.
    pub fn read_bool(&mut self) -> Result<bool> {
        self.read_uint8().map(|b| b != 0)
    }

    pub fn read_int32(&mut self) -> Result<i32> {
        self.ensure_remaining(4)?;
        Ok(self.buf.get_i32())
    }

    pub fn read_uint32(&mut self) -> Result<u32> {
        self.ensure_remaining(4)?;
        Ok(self.buf.get_u32())
    }

    pub fn read_int16(&mut self) -> Result<i16> {
        self.ensure_remaining(2)?;
        Ok(self.buf.get_i16())
    }

    pub fn read_uint16(&mut self) -> Result<u16> {
        self.ensure_remaining(2)?;
        Ok(self.buf.get_u16())
    }

    pub fn read_int8(&mut self) -> Result<i8> {
        self.ensure_remaining(1)?;
        Ok(self.buf.get_i8())
    }

    pub fn read_uint8(&mut self) -> Result<u8> {
        self.ensure_remaining(1)?;
        Ok(self.buf.get_u8())
    }

    /// Reads one UTF-16 code unit.
    pub fn read_char16(&mut self) -> Result<char> {
        let unit = self.read_uint16()?;
        text::decode_char16(unit, self.options.transcoding)
    }

    // -- Length-prefixed data --

    /// Reads a length-prefixed byte array; the null sentinel yields `None`.
    pub fn read_byte_array(&mut self) -> Result<Option<Vec<u8>>> {
        Ok(self.read_raw()?.map(<[u8]>::to_vec))
    }

    /// Reads a length-prefixed UTF-16BE string; the null sentinel yields `None`.
    pub fn read_string(&mut self) -> Result<Option<String>> {
        match self.read_raw()? {
            None => Ok(None),
            Some(data) => text::decode_utf16be(data, self.options.transcoding).map(Some),
        }
    }

    pub fn read_string_list(&mut self) -> Result<StringList> {
        let count = self.read_count(MIN_STRING_LEN)?;
        let mut items = Vec::with_capacity(count);
        for _ in 0..count {
            items.push(self.read_string()?);
        }
        Ok(items)
    }

    fn read_raw(&mut self) -> Result<Option<&'a [u8]>> {
        let len = self.read_uint32()?;
        if len == NULL_LENGTH {
            return Ok(None);
        }
        self.take(len as usize).map(Some)
    }

    // -- Containers --

    pub fn read_variant_list(&mut self) -> Result<VariantList> {
        self.nested(|r| {
            let count = r.read_count(MIN_VARIANT_LEN)?;
            let mut items = Vec::with_capacity(count);
            for _ in 0..count {
                items.push(r.read_variant()?);
            }
            Ok(items)
        })
    }

    /// Reads a map. A null key reads as the empty string; a repeated key keeps
    /// its first position and its last value.
    pub fn read_variant_map(&mut self) -> Result<VariantMap> {
        self.nested(|r| {
            let count = r.read_count(MIN_STRING_LEN + MIN_VARIANT_LEN)?;
            let mut map = VariantMap::with_capacity(count);
            for _ in 0..count {
                let key = r.read_string()?.unwrap_or_default();
                let value = r.read_variant()?;
                map.insert(key, value);
            }
            Ok(map)
        })
    }

    /// Reads a container element count and checks it against the configured
    /// limit and the bytes left, before anything is allocated.
    fn read_count(&mut self, min_element_len: usize) -> Result<usize> {
        let count = self.read_uint32()? as usize;
        if count > self.options.max_container_len {
            return Err(DataStreamError::LimitExceeded(format!(
                "container declares {count} elements, limit is {}",
                self.options.max_container_len
            )));
        }
        self.ensure_remaining(count.saturating_mul(min_element_len))?;
        Ok(count)
    }

    // -- Calendar --

    /// Reads a QTime; the null QTime yields `None`.
    pub fn read_time(&mut self) -> Result<Option<NaiveTime>> {
        calendar::msecs_to_time(self.read_uint32()?)
    }

    /// Reads a QTime as a wall-clock time in the configured offset, placed on
    /// the day `reference` falls on in that offset.
    pub fn read_time_on<Tz: TimeZone>(
        &mut self,
        reference: &DateTime<Tz>,
    ) -> Result<Option<DateTime<FixedOffset>>> {
        let reference = reference.with_timezone(&self.options.utc_offset);
        self.read_time()?
            .map(|time| calendar::anchor_time(time, &reference))
            .transpose()
    }

    /// Reads a QDateTime; the null QDateTime yields `None`.
    ///
    /// Values not flagged as UTC are interpreted in the configured offset.
    pub fn read_date_time(&mut self) -> Result<Option<DateTime<Utc>>> {
        let day = self.read_uint32()?;
        let msecs = self.read_uint32()?;
        let is_utc = self.read_bool()?;
        WireDateTime { day, msecs, is_utc }.to_instant(self.options.utc_offset)
    }

    // -- User types --

    /// Reads a NUL-terminated user type name and the payload its codec decodes.
    pub fn read_user_type(&mut self) -> Result<UserValue> {
        let raw = self.read_raw()?;
        let name = match raw {
            Some([name @ .., 0]) if !name.is_empty() => std::str::from_utf8(name)
                .map_err(|e| DataStreamError::MalformedUserTypeName(e.to_string()))?,
            other => {
                return Err(DataStreamError::MalformedUserTypeName(format!(
                    "expected a NUL-terminated name, got {other:?}"
                )));
            }
        };
        let value = self.read_user_type_by_name(name)?;
        Ok(UserValue::new(name, value))
    }

    /// Decodes a user type payload with the codec registered for `name`.
    pub fn read_user_type_by_name(&mut self, name: &str) -> Result<Variant> {
        let registry = Arc::clone(&self.user_types);
        let codec = registry.get(name)?;
        self.nested(|r| codec.decode(r))
    }

    // -- Cursor helpers --

    fn ensure_remaining(&self, needed: usize) -> Result<()> {
        if self.buf.len() < needed {
            Err(DataStreamError::BufferUnderflow {
                needed,
                remaining: self.buf.len(),
            })
        } else {
            Ok(())
        }
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        self.ensure_remaining(n)?;
        let (head, tail) = self.buf.split_at(n);
        self.buf = tail;
        Ok(head)
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Transcoding;
    use crate::datastream::Writer;
    use crate::types::Native;
    use crate::user_type::{FnCodec, UserTypeCodec};
    use chrono::{NaiveDate, TimeZone};

    /// `{id: UInt16, name: String}` carried as a map.
    struct UserCodec;

    impl UserTypeCodec for UserCodec {
        fn encode(&self, value: &Variant, writer: &mut Writer) -> Result<()> {
            let map = value
                .as_map()
                .ok_or_else(|| DataStreamError::UnsupportedValue(format!("user {value}")))?;
            let id = map.get("id").and_then(Variant::as_int).unwrap_or_default();
            writer.write_uint16(id as u16);
            writer.write_string(map.get("name").and_then(Variant::as_str))
        }

        fn decode(&self, reader: &mut Reader<'_>) -> Result<Variant> {
            let id = reader.read_uint16()?;
            let name = reader.read_string()?;
            let mut map = VariantMap::new();
            map.insert("id".into(), Variant::UInt16(id));
            map.insert("name".into(), Variant::String(name));
            Ok(Variant::VariantMap(map))
        }
    }

    fn registry() -> Arc<UserTypeRegistry> {
        UserTypeRegistry::builder()
            .register("user", UserCodec)
            .register(
                "demo",
                FnCodec::new(
                    |value: &Variant, w: &mut Writer| match value {
                        Variant::UInt32(v) => {
                            w.write_uint32(*v);
                            Ok(())
                        }
                        other => Err(DataStreamError::UnsupportedValue(format!("{other}"))),
                    },
                    |r: &mut Reader<'_>| r.read_uint32().map(Variant::UInt32),
                ),
            )
            .build()
    }

    /// Encode then decode a value and verify round-trip.
    fn round_trip(value: &Variant) -> Variant {
        let mut writer = Writer::with_user_types(registry());
        writer.write_variant(value).expect("encode failed");
        let mut reader = Reader::with_user_types(writer.as_bytes(), registry());
        let decoded = reader.read_variant().expect("decode failed");
        assert!(reader.is_empty(), "trailing bytes after {value}");
        decoded
    }

    const DEMO: &[u8] = &[
        0x00, 0x00, 0x00, 0x7F, 0x00, // QUserType
        0x00, 0x00, 0x00, 0x05, b'd', b'e', b'm', b'o', 0x00, // name
        0x00, 0x00, 0x00, 0xFF,
    ];

    #[test]
    fn round_trip_scalars() {
        for value in [
            Variant::Bool(true),
            Variant::Bool(false),
            Variant::Int32(i32::MIN),
            Variant::Int32(2015),
            Variant::UInt32(u32::MAX),
            Variant::Int16(-100),
            Variant::UInt16(60000),
            Variant::Int8(-100),
            Variant::UInt8(250),
            Variant::Char16('€'),
        ] {
            assert_eq!(round_trip(&value), value, "failed for {value}");
        }
    }

    #[test]
    fn round_trip_strings() {
        for value in [
            Variant::String(None),
            Variant::from(""),
            Variant::from("hellö"),
            Variant::from("a\u{1D11E}b"),
            Variant::ByteArray(None),
            Variant::from(Vec::<u8>::new()),
            Variant::from(vec![0xDE, 0xAD]),
            Variant::StringList(vec![Some("a".into()), None, Some(String::new())]),
        ] {
            assert_eq!(round_trip(&value), value, "failed for {value}");
        }
    }

    #[test]
    fn round_trip_containers() {
        let mut inner = VariantMap::new();
        inner.insert("name".into(), Variant::from("hello"));
        inner.insert("on".into(), Variant::Bool(true));
        let list = Variant::VariantList(vec![
            Variant::VariantMap(inner.clone()),
            Variant::VariantMap(inner),
            Variant::VariantList(vec![]),
            Variant::VariantMap(VariantMap::new()),
        ]);
        assert_eq!(round_trip(&list), list);
    }

    #[test]
    fn round_trip_calendar() {
        let t = NaiveTime::from_hms_milli_opt(14, 10, 34, 510).unwrap();
        let dt = Utc.with_ymd_and_hms(2016, 9, 19, 8, 30, 0).unwrap();
        for value in [
            Variant::Time(Some(t)),
            Variant::Time(None),
            Variant::DateTime(Some(dt)),
            Variant::DateTime(None),
        ] {
            assert_eq!(round_trip(&value), value, "failed for {value}");
        }
    }

    #[test]
    fn null_and_empty_string_stay_distinct() {
        let mut reader = Reader::new(&[0xFF, 0xFF, 0xFF, 0xFF, 0x00, 0x00, 0x00, 0x00]);
        assert_eq!(reader.read_string().unwrap(), None);
        assert_eq!(reader.read_string().unwrap(), Some(String::new()));

        let mut reader = Reader::new(&[0xFF, 0xFF, 0xFF, 0xFF, 0x00, 0x00, 0x00, 0x00]);
        assert_eq!(reader.read_byte_array().unwrap(), None);
        assert_eq!(reader.read_byte_array().unwrap(), Some(vec![]));
    }

    #[test]
    fn strings() {
        let mut reader = Reader::new(&[0x00, 0x00, 0x00, 0x06, 0x00, b'a', 0x00, b'\n', 0x00, b'b']);
        assert_eq!(reader.read_string().unwrap().as_deref(), Some("a\nb"));

        let mut reader = Reader::new(&[0x00, 0x00, 0x00, 0x02, 0x20, 0xAC]);
        assert_eq!(reader.read_string().unwrap().as_deref(), Some("€"));

        let mut reader = Reader::new(&[0x00, 0x00, 0x00, 0x04, 0xD8, 0x34, 0xDD, 0x1E]);
        assert_eq!(reader.read_string().unwrap().as_deref(), Some("\u{1D11E}"));

        let mut reader = Reader::new(&[0x00, 0x00, 0x00, 0x04, 0xD8, 0x00, 0xDF, 0x48]);
        assert_eq!(reader.read_string().unwrap().as_deref(), Some("\u{10348}"));
    }

    #[test]
    fn latin1_mode_reads_placeholders() {
        let data = [0x00, 0x00, 0x00, 0x04, 0x00, 0xE4, 0x20, 0xAC];
        let mut reader =
            Reader::new(&data).with_options(Options::default().transcoding(Transcoding::Latin1));
        assert_eq!(reader.read_string().unwrap().as_deref(), Some("ä?"));
    }

    #[test]
    fn char16() {
        assert_eq!(Reader::new(&[0x00, b'o']).read_char16().unwrap(), 'o');
        assert_eq!(Reader::new(&[0x00, 0xC4]).read_char16().unwrap(), 'Ä');
        assert_eq!(Reader::new(&[0x00, 0xA2]).read_char16().unwrap(), '¢');
        assert_eq!(Reader::new(&[0x20, 0xAC]).read_char16().unwrap(), '€');
        assert!(matches!(
            Reader::new(&[0xD8, 0x34]).read_char16(),
            Err(DataStreamError::MalformedString(_))
        ));
    }

    #[test]
    fn bool_is_any_non_zero_byte() {
        let mut reader = Reader::new(&[0x00, 0x01, 0x0A]);
        assert!(!reader.read_bool().unwrap());
        assert!(reader.read_bool().unwrap());
        assert!(reader.read_bool().unwrap());
    }

    #[test]
    fn underflow_consumes_nothing() {
        let mut reader = Reader::new(&[0x00, 0x00]);
        assert!(matches!(
            reader.read_int32(),
            Err(DataStreamError::BufferUnderflow { needed: 4, remaining: 2 })
        ));
        assert_eq!(reader.position(), 0);
        assert!(reader.read_uint32().unwrap_err().is_underflow());
        assert_eq!(reader.read_uint16().unwrap(), 0);

        assert!(Reader::new(&[]).read_bool().unwrap_err().is_underflow());
    }

    #[test]
    fn short_byte_array_stops_after_length() {
        let mut reader = Reader::new(&[0x00, 0x00, 0x00, 0x03, 0xAA]);
        assert!(reader.read_byte_array().unwrap_err().is_underflow());
        assert_eq!(reader.position(), 4);
        assert_eq!(reader.remaining(), 1);
    }

    #[test]
    fn unknown_type() {
        let mut reader = Reader::new(&[0x00, 0x00, 0x00, 0x00, 0x00]);
        assert!(matches!(reader.read_variant(), Err(DataStreamError::UnknownType(0))));
    }

    #[test]
    fn user_type_mapping() {
        let mut reader = Reader::with_user_types(DEMO, registry());
        assert_eq!(reader.read_variant().unwrap(), Variant::user("demo", 255u32));
        assert!(reader.is_empty());
    }

    #[test]
    fn user_type_unknown() {
        let mut reader = Reader::new(DEMO);
        assert!(matches!(
            reader.read_variant(),
            Err(DataStreamError::UnknownUserType(name)) if name == "demo"
        ));
    }

    #[test]
    fn user_type_name_must_be_nul_terminated() {
        for name in [
            &[0xFFu8, 0xFF, 0xFF, 0xFF][..],                       // null
            &[0x00, 0x00, 0x00, 0x00][..],                         // empty
            &[0x00, 0x00, 0x00, 0x01, 0x00][..],                   // only the NUL
            &[0x00, 0x00, 0x00, 0x04, b'd', b'e', b'm', b'o'][..], // no NUL
            &[0x00, 0x00, 0x00, 0x02, 0xC3, 0x00][..],             // not UTF-8
        ] {
            let mut reader = Reader::with_user_types(name, registry());
            assert!(
                matches!(reader.read_user_type(), Err(DataStreamError::MalformedUserTypeName(_))),
                "accepted {name:?}"
            );
        }
    }

    #[test]
    fn user_type_round_trip() {
        let mut user = VariantMap::new();
        user.insert("id".into(), Variant::UInt16(10));
        user.insert("name".into(), Variant::from("test"));
        let value = Variant::user("user", user);
        assert_eq!(round_trip(&value), value);
    }

    #[test]
    fn user_type_by_name_reads_bare_payload() {
        let mut reader = Reader::with_user_types(&[0x00, 0x00, 0x00, 0x2A], registry());
        assert_eq!(reader.read_user_type_by_name("demo").unwrap(), Variant::UInt32(42));
    }

    #[test]
    fn date_time_literal() {
        let mut data = vec![0x00, 0x00, 0x00, 0x10, 0x00];
        data.extend_from_slice(&2_457_136u32.to_be_bytes());
        data.extend_from_slice(&50_523_000u32.to_be_bytes());
        data.push(0x01);

        let mut reader = Reader::new(&data);
        let value = reader.read_variant().unwrap();
        let expected = NaiveDate::from_ymd_opt(2015, 4, 23)
            .unwrap()
            .and_hms_opt(14, 2, 3)
            .unwrap()
            .and_utc();
        assert_eq!(value, Variant::DateTime(Some(expected)));

        let mut writer = Writer::new();
        writer.write_variant(&value).unwrap();
        assert_eq!(writer.as_bytes(), &data[..]);
    }

    #[test]
    fn date_time_null() {
        let data = [0x00, 0x00, 0x00, 0x00, 0xFF, 0xFF, 0xFF, 0xFF, 0x01];
        assert_eq!(Reader::new(&data).read_date_time().unwrap(), None);
    }

    #[test]
    fn local_date_time_uses_configured_offset() {
        let mut data = Vec::new();
        data.extend_from_slice(&2_457_136u32.to_be_bytes());
        data.extend_from_slice(&50_523_000u32.to_be_bytes());
        data.push(0x00);

        let plus_two = FixedOffset::east_opt(2 * 3600).unwrap();
        let mut reader = Reader::new(&data).with_options(Options::default().utc_offset(plus_two));
        assert_eq!(
            reader.read_date_time().unwrap(),
            Some(Utc.with_ymd_and_hms(2015, 4, 23, 12, 2, 3).unwrap())
        );
    }

    #[test]
    fn zero_time_is_midnight_of_reference_day() {
        let berlin = FixedOffset::east_opt(3600).unwrap();
        let reference = berlin.with_ymd_and_hms(2016, 9, 19, 17, 0, 0).unwrap();
        let data = [0x00, 0x00, 0x00, 0x0F, 0x00, 0x00, 0x00, 0x00, 0x00];

        let mut reader = Reader::new(&data);
        assert_eq!(reader.read_variant().unwrap(), Variant::from(NaiveTime::default()));

        let mut reader =
            Reader::new(&data[5..]).with_options(Options::default().utc_offset(berlin));
        assert_eq!(
            reader.read_time_on(&reference).unwrap(),
            Some(berlin.with_ymd_and_hms(2016, 9, 19, 0, 0, 0).unwrap())
        );
    }

    #[test]
    fn time_is_anchored_in_configured_offset() {
        let plus_two = FixedOffset::east_opt(2 * 3600).unwrap();
        // 23:00 UTC is already the next day at +02:00.
        let reference = Utc.with_ymd_and_hms(2016, 9, 19, 23, 0, 0).unwrap();
        let data = 51_034_510u32.to_be_bytes();

        let mut reader = Reader::new(&data).with_options(Options::default().utc_offset(plus_two));
        let anchored = reader.read_time_on(&reference).unwrap().unwrap();
        assert_eq!(anchored.offset(), &plus_two);
        let expected = NaiveDate::from_ymd_opt(2016, 9, 20)
            .unwrap()
            .and_hms_milli_opt(14, 10, 34, 510)
            .unwrap()
            .and_local_timezone(plus_two)
            .unwrap();
        assert_eq!(anchored, expected);

        let null = calendar::NULL_TIME.to_be_bytes();
        assert_eq!(Reader::new(&null).read_time_on(&reference).unwrap(), None);
    }

    #[test]
    fn invalid_time_is_rejected() {
        let data = 86_400_000u32.to_be_bytes();
        assert!(matches!(
            Reader::new(&data).read_time(),
            Err(DataStreamError::ValueOutOfRange(_))
        ));
    }

    #[test]
    fn native_values_decode_typed() {
        let native = Native::map([
            ("hello", Native::from("world")),
            ("bool", Native::Bool(true)),
            ("year", Native::Int(2015)),
            ("list", Native::list([Native::from("first"), Native::from("second")])),
        ]);
        let mut writer = Writer::new();
        writer.write_native(&native).unwrap();

        let decoded = Reader::new(writer.as_bytes()).read_variant().unwrap();
        assert_eq!(decoded, Variant::try_from(native).unwrap());
    }

    #[test]
    fn native_read_flattens_typed_values() {
        let native = Native::map([
            ("port", Native::Typed(Variant::UInt16(6667))),
            ("nick", Native::from("kitty")),
            ("channels", Native::list([Native::from("#quassel")])),
        ]);
        let mut writer = Writer::new();
        writer.write_native(&native).unwrap();

        let bytes = writer.as_bytes();
        assert_eq!(
            Reader::new(bytes).read_native().unwrap(),
            Native::map([
                ("port", Native::Int(6667)),
                ("nick", Native::from("kitty")),
                ("channels", Native::list([Native::from("#quassel")])),
            ])
        );
    }

    #[test]
    fn native_read_unwraps_user_types() {
        let registry = UserTypeRegistry::builder().register("user", UserCodec).build();
        let mut user = VariantMap::new();
        user.insert("id".into(), Variant::UInt16(10));
        user.insert("name".into(), Variant::from("test"));

        let mut writer = Writer::with_user_types(Arc::clone(&registry));
        writer
            .write_variant(&Variant::user("user", Variant::VariantMap(user)))
            .unwrap();

        let mut reader = Reader::with_user_types(writer.as_bytes(), registry);
        assert_eq!(
            reader.read_native().unwrap(),
            Native::map([("id", Native::Int(10)), ("name", Native::from("test"))])
        );
    }

    #[test]
    fn map_null_key_reads_empty() {
        let data = [
            0x00, 0x00, 0x00, 0x01, // count
            0xFF, 0xFF, 0xFF, 0xFF, // null key
            0x00, 0x00, 0x00, 0x86, 0x00, 0x01, // UChar 1
        ];
        let map = Reader::new(&data).read_variant_map().unwrap();
        assert_eq!(map.get(""), Some(&Variant::UInt8(1)));
    }

    #[test]
    fn oversized_counts_fail_before_allocating() {
        let data = [0xFF, 0xFF, 0xFF, 0xFE];
        assert!(matches!(
            Reader::new(&data).read_variant_list(),
            Err(DataStreamError::LimitExceeded(_))
        ));

        let unlimited = Options::default().max_container_len(usize::MAX);
        let err = Reader::new(&data).with_options(unlimited).read_string_list().unwrap_err();
        assert!(err.is_underflow());

        let tight = Options::default().max_container_len(1);
        let two = [0x00, 0x00, 0x00, 0x02];
        assert!(matches!(
            Reader::new(&two).with_options(tight).read_variant_map(),
            Err(DataStreamError::LimitExceeded(_))
        ));
    }

    #[test]
    fn depth_limit() {
        let nested = Variant::VariantList(vec![Variant::VariantList(vec![Variant::VariantList(
            vec![],
        )])]);
        let mut writer = Writer::new();
        writer.write_variant(&nested).unwrap();

        let shallow = Options::default().max_depth(2);
        assert!(matches!(
            Reader::new(writer.as_bytes()).with_options(shallow).read_variant(),
            Err(DataStreamError::LimitExceeded(_))
        ));
        let enough = Options::default().max_depth(3);
        assert_eq!(
            Reader::new(writer.as_bytes()).with_options(enough).read_variant().unwrap(),
            nested
        );
    }

    #[test]
    fn decoder_table_covers_every_tag() {
        // Each payload below is the smallest valid one for its tag.
        let payloads: [(TypeTag, &[u8]); 11] = [
            (TypeTag::Bool, &[0x01]),
            (TypeTag::Int32, &[0xFF, 0xFF, 0xFF, 0xFF]),
            (TypeTag::UInt32, &[0x00, 0x00, 0x00, 0x01]),
            (TypeTag::Char16, &[0x00, b'x']),
            (TypeTag::VariantMap, &[0x00; 4]),
            (TypeTag::VariantList, &[0x00; 4]),
            (TypeTag::String, &[0x00; 4]),
            (TypeTag::StringList, &[0x00; 4]),
            (TypeTag::ByteArray, &[0x00; 4]),
            (TypeTag::Int16, &[0xFF, 0xFE]),
            (TypeTag::UInt8, &[0x07]),
        ];
        for (tag, payload) in payloads {
            let mut reader = Reader::new(payload);
            let value = decoder_for(tag)(&mut reader).unwrap();
            assert_eq!(value.type_tag(), tag);
            assert!(reader.is_empty());
        }
    }
}
