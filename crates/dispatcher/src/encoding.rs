//! On-disk text format for persisted statuses
//!
//! Status files are pretty JSON (sorted keys, two-space indent, every
//! non-ASCII character escaped as `\uXXXX`) stored as UTF-32 with a
//! little-endian byte order mark. Existing archives use exactly these
//! bytes, so the writer must not drift from them. UTF-8 is available for
//! new deployments.

use std::io;

use serde::Serialize;
use serde_json::ser::{Formatter, PrettyFormatter};
use serde_json::{Map, Value};

use contracts::TextEncoding;

use crate::error::DispatcherError;

const UTF32_LE_BOM: [u8; 4] = [0xFF, 0xFE, 0x00, 0x00];
const UTF32_BE_BOM: [u8; 4] = [0x00, 0x00, 0xFE, 0xFF];
const UTF8_BOM: [u8; 3] = [0xEF, 0xBB, 0xBF];

/// Pretty formatter that escapes everything outside printable ASCII
struct AsciiPrettyFormatter {
    inner: PrettyFormatter<'static>,
}

impl AsciiPrettyFormatter {
    fn new() -> Self {
        Self {
            inner: PrettyFormatter::with_indent(b"  "),
        }
    }
}

impl Formatter for AsciiPrettyFormatter {
    fn begin_array<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.inner.begin_array(writer)
    }

    fn end_array<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.inner.end_array(writer)
    }

    fn begin_array_value<W: ?Sized + io::Write>(
        &mut self,
        writer: &mut W,
        first: bool,
    ) -> io::Result<()> {
        self.inner.begin_array_value(writer, first)
    }

    fn end_array_value<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.inner.end_array_value(writer)
    }

    fn begin_object<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.inner.begin_object(writer)
    }

    fn end_object<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.inner.end_object(writer)
    }

    fn begin_object_key<W: ?Sized + io::Write>(
        &mut self,
        writer: &mut W,
        first: bool,
    ) -> io::Result<()> {
        self.inner.begin_object_key(writer, first)
    }

    fn begin_object_value<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.inner.begin_object_value(writer)
    }

    fn end_object_value<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.inner.end_object_value(writer)
    }

    fn write_string_fragment<W: ?Sized + io::Write>(
        &mut self,
        writer: &mut W,
        fragment: &str,
    ) -> io::Result<()> {
        let mut start = 0;
        for (idx, ch) in fragment.char_indices() {
            if ch.is_ascii() && ch != '\x7f' {
                continue;
            }
            writer.write_all(fragment[start..idx].as_bytes())?;
            let mut units = [0u16; 2];
            for unit in ch.encode_utf16(&mut units) {
                write!(writer, "\\u{unit:04x}")?;
            }
            start = idx + ch.len_utf8();
        }
        writer.write_all(fragment[start..].as_bytes())
    }
}

/// Serialize a field mapping as sorted, indented, ASCII-only JSON
pub fn to_ascii_json(fields: &Map<String, Value>) -> Result<String, DispatcherError> {
    let sorted = sort_keys(Value::Object(fields.clone()));
    let mut buf = Vec::new();
    let mut serializer = serde_json::Serializer::with_formatter(&mut buf, AsciiPrettyFormatter::new());
    sorted.serialize(&mut serializer)?;
    String::from_utf8(buf).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e).into())
}

/// Rebuild objects in key order, whatever map backing serde_json uses
fn sort_keys(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(String, Value)> = map.into_iter().collect();
            entries.sort_by(|a, b| a.0.cmp(&b.0));
            Value::Object(
                entries
                    .into_iter()
                    .map(|(k, v)| (k, sort_keys(v)))
                    .collect(),
            )
        }
        Value::Array(items) => Value::Array(items.into_iter().map(sort_keys).collect()),
        other => other,
    }
}

/// Encode text for disk
pub fn encode_text(text: &str, encoding: TextEncoding) -> Vec<u8> {
    match encoding {
        TextEncoding::Utf8 => text.as_bytes().to_vec(),
        TextEncoding::Utf32 => {
            let mut out = Vec::with_capacity(4 + text.len() * 4);
            out.extend_from_slice(&UTF32_LE_BOM);
            for ch in text.chars() {
                out.extend_from_slice(&(ch as u32).to_le_bytes());
            }
            out
        }
    }
}

/// Decode text read from disk, honouring a byte order mark if present
pub fn decode_text(bytes: &[u8], encoding: TextEncoding) -> Result<String, DispatcherError> {
    match encoding {
        TextEncoding::Utf8 => {
            let body = bytes.strip_prefix(&UTF8_BOM[..]).unwrap_or(bytes);
            String::from_utf8(body.to_vec())
                .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e).into())
        }
        TextEncoding::Utf32 => {
            let (body, big_endian) = if let Some(rest) = bytes.strip_prefix(&UTF32_LE_BOM[..]) {
                (rest, false)
            } else if let Some(rest) = bytes.strip_prefix(&UTF32_BE_BOM[..]) {
                (rest, true)
            } else {
                (bytes, false)
            };

            if body.len() % 4 != 0 {
                return Err(invalid_data("utf-32 data length is not a multiple of 4"));
            }

            body.chunks_exact(4)
                .map(|chunk| {
                    let raw = [chunk[0], chunk[1], chunk[2], chunk[3]];
                    let code = if big_endian {
                        u32::from_be_bytes(raw)
                    } else {
                        u32::from_le_bytes(raw)
                    };
                    char::from_u32(code)
                        .ok_or_else(|| invalid_data(format!("invalid code point {code:#x}")))
                })
                .collect()
        }
    }
}

fn invalid_data(message: impl Into<String>) -> DispatcherError {
    io::Error::new(io::ErrorKind::InvalidData, message.into()).into()
}
