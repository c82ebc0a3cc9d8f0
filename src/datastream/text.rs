//! UTF-8 ↔ UTF-16BE transcoding for QString and QChar payloads.

use bytes::{BufMut, BytesMut};

use crate::config::Transcoding;
use crate::error::{DataStreamError, Result};

/// Placeholder for characters the Latin-1 mode cannot carry.
const PLACEHOLDER: u16 = b'?' as u16;

/// Appends `text` as UTF-16BE code units.
///
/// Scalars above U+FFFF become a surrogate pair in lossless mode.
pub fn put_utf16be(buf: &mut BytesMut, text: &str, mode: Transcoding) {
    match mode {
        Transcoding::Lossless => {
            for unit in text.encode_utf16() {
                buf.put_u16(unit);
            }
        }
        Transcoding::Latin1 => {
            for c in text.chars() {
                buf.put_u16(latin1_unit(c));
            }
        }
    }
}

/// Returns the UTF-16BE byte length of `text` without encoding it.
pub fn utf16be_len(text: &str, mode: Transcoding) -> usize {
    match mode {
        Transcoding::Lossless => text.encode_utf16().count() * 2,
        Transcoding::Latin1 => text.chars().count() * 2,
    }
}

/// Decodes UTF-16BE bytes into a `String`.
///
/// Fails on an odd byte count, and in lossless mode on any unpaired surrogate.
pub fn decode_utf16be(data: &[u8], mode: Transcoding) -> Result<String> {
    if data.len() % 2 != 0 {
        return Err(DataStreamError::MalformedString(format!(
            "odd UTF-16 byte length {}",
            data.len()
        )));
    }
    let units = data
        .chunks_exact(2)
        .map(|pair| u16::from_be_bytes([pair[0], pair[1]]));

    match mode {
        Transcoding::Lossless => char::decode_utf16(units)
            .map(|r| {
                r.map_err(|e| {
                    DataStreamError::MalformedString(format!(
                        "unpaired surrogate 0x{:04X}",
                        e.unpaired_surrogate()
                    ))
                })
            })
            .collect(),
        Transcoding::Latin1 => Ok(units.map(latin1_char).collect()),
    }
}

/// Encodes one scalar as a single UTF-16 code unit.
///
/// Scalars that need a surrogate pair do not fit a QChar and are rejected in
/// lossless mode.
pub fn encode_char16(c: char, mode: Transcoding) -> Result<u16> {
    match mode {
        Transcoding::Lossless => u16::try_from(u32::from(c)).map_err(|_| {
            DataStreamError::ValueOutOfRange(format!(
                "U+{:04X} needs a surrogate pair and does not fit a QChar",
                u32::from(c)
            ))
        }),
        Transcoding::Latin1 => Ok(latin1_unit(c)),
    }
}

/// Decodes a single UTF-16 code unit into a scalar.
pub fn decode_char16(unit: u16, mode: Transcoding) -> Result<char> {
    match mode {
        Transcoding::Lossless => char::from_u32(u32::from(unit)).ok_or_else(|| {
            DataStreamError::MalformedString(format!("lone surrogate 0x{unit:04X} in QChar"))
        }),
        Transcoding::Latin1 => Ok(latin1_char(unit)),
    }
}

fn latin1_unit(c: char) -> u16 {
    let code = u32::from(c);
    if code <= 0xFF { code as u16 } else { PLACEHOLDER }
}

fn latin1_char(unit: u16) -> char {
    if unit <= 0xFF {
        char::from(unit as u8)
    } else {
        '?'
    }
}
