//! Typed values of the save tree encoding
//!
//! Every value on the wire is one tag byte followed by a type-specific
//! payload. The tag uniquely selects the variant and its decoding rule.

use crate::error::{FormatError, SerializeError};
use crate::ioutils::ReadExt;
use crate::tree::SaveTree;
use std::fmt;
use std::io::{Read, Seek, Write};

/// Tag byte for a NUL-terminated string.
pub const TAG_TEXT: u8 = 0x01;
/// Tag byte for a little-endian IEEE-754 `f32`.
pub const TAG_FLOAT: u8 = 0x02;
/// Tag byte for the nil value (no payload).
pub const TAG_NIL: u8 = 0x03;
/// Tag byte for an unsigned byte.
pub const TAG_U8: u8 = 0x04;
/// Tag byte for a little-endian `u16`.
pub const TAG_U16: u8 = 0x05;
/// Tag byte for a boolean (`0x01` = true, anything else false).
pub const TAG_BOOL: u8 = 0x06;
/// Tag byte for a nested tree.
pub const TAG_TREE: u8 = 0x07;

/// A single typed value in a save tree.
#[derive(Debug, Clone, PartialEq)]
pub enum SaveValue {
    /// NUL-terminated string (tag `0x01`)
    Text(String),
    /// 32-bit IEEE-754 float, little-endian (tag `0x02`)
    Float(f32),
    /// Nil (tag `0x03`)
    Nil,
    /// Unsigned byte (tag `0x04`)
    U8(u8),
    /// Unsigned 16-bit integer, little-endian (tag `0x05`)
    U16(u16),
    /// Boolean (tag `0x06`)
    Bool(bool),
    /// Nested key/value tree (tag `0x07`)
    Tree(SaveTree),
}

impl SaveValue {
    /// Parse one tagged value from the reader.
    ///
    /// # Errors
    ///
    /// [`FormatError::UnknownTag`] for an unrecognized tag byte, identifying
    /// the reader offset and the tag value; I/O errors when the buffer ends
    /// inside a value.
    pub fn parse<R: Read + Seek>(reader: &mut R) -> Result<Self, FormatError> {
        let offset = reader.stream_position()?;
        let tag = reader.read_u8()?;
        match tag {
            TAG_TEXT => {
                // Real saves are ASCII; tolerate anything else by decoding
                // lossily rather than failing the whole load.
                let bytes = reader.read_cstring()?;
                Ok(Self::Text(String::from_utf8_lossy(&bytes).into_owned()))
            }
            TAG_FLOAT => Ok(Self::Float(reader.read_f32le()?)),
            TAG_NIL => Ok(Self::Nil),
            TAG_U8 => Ok(Self::U8(reader.read_u8()?)),
            TAG_U16 => Ok(Self::U16(reader.read_u16le()?)),
            TAG_BOOL => Ok(Self::Bool(reader.read_u8()? == 0x01)),
            TAG_TREE => Ok(Self::Tree(SaveTree::parse_body(reader)?)),
            tag => Err(FormatError::UnknownTag { tag, offset }),
        }
    }

    /// Write this value as its tag byte plus payload.
    ///
    /// # Errors
    ///
    /// [`SerializeError::InteriorNul`] for a text value that cannot be
    /// NUL-terminated.
    pub fn write<W: Write>(&self, writer: &mut W) -> Result<(), SerializeError> {
        match self {
            Self::Text(text) => write_text(writer, text),
            Self::Float(value) => {
                writer.write_all(&[TAG_FLOAT])?;
                writer.write_all(&value.to_le_bytes())?;
                Ok(())
            }
            Self::Nil => {
                writer.write_all(&[TAG_NIL])?;
                Ok(())
            }
            Self::U8(value) => {
                writer.write_all(&[TAG_U8, *value])?;
                Ok(())
            }
            Self::U16(value) => {
                writer.write_all(&[TAG_U16])?;
                writer.write_all(&value.to_le_bytes())?;
                Ok(())
            }
            Self::Bool(value) => {
                writer.write_all(&[TAG_BOOL, u8::from(*value)])?;
                Ok(())
            }
            Self::Tree(tree) => tree.write(writer),
        }
    }
}

/// Write a string as tag `0x01` plus NUL-terminated bytes.
pub(crate) fn write_text<W: Write>(writer: &mut W, text: &str) -> Result<(), SerializeError> {
    if text.as_bytes().contains(&0) {
        return Err(SerializeError::InteriorNul {
            text: text.to_string(),
        });
    }
    writer.write_all(&[TAG_TEXT])?;
    writer.write_all(text.as_bytes())?;
    writer.write_all(&[0])?;
    Ok(())
}

impl fmt::Display for SaveValue {
    /// The decoded value's string form, as cached for the account id.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(text) => f.write_str(text),
            Self::Float(value) => write!(f, "{value}"),
            Self::Nil => f.write_str("nil"),
            Self::U8(value) => write!(f, "{value}"),
            Self::U16(value) => write!(f, "{value}"),
            Self::Bool(value) => write!(f, "{value}"),
            Self::Tree(tree) => write!(f, "table({} entries)", tree.len()),
        }
    }
}
