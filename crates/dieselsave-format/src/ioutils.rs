//! Internal reader helpers for the wire encoding

use std::io::{Read, Result};

/// Extension trait for reading the primitive encodings used by the save
/// format (little-endian integers, IEEE floats, NUL-terminated strings).
pub(crate) trait ReadExt {
    /// Read a single byte.
    fn read_u8(&mut self) -> Result<u8>;

    /// Read a little-endian `u16`.
    fn read_u16le(&mut self) -> Result<u16>;

    /// Read a little-endian `u32`.
    fn read_u32le(&mut self) -> Result<u32>;

    /// Read a little-endian IEEE-754 `f32`.
    fn read_f32le(&mut self) -> Result<f32>;

    /// Read bytes up to (and consuming) the next NUL terminator.
    ///
    /// The terminator is not included in the returned bytes.
    fn read_cstring(&mut self) -> Result<Vec<u8>>;
}

impl<T: Read> ReadExt for T {
    fn read_u8(&mut self) -> Result<u8> {
        let mut b = [0; 1];
        self.read_exact(&mut b)?;
        Ok(b[0])
    }

    fn read_u16le(&mut self) -> Result<u16> {
        let mut b = [0; size_of::<u16>()];
        self.read_exact(&mut b)?;
        Ok(u16::from_le_bytes(b))
    }

    fn read_u32le(&mut self) -> Result<u32> {
        let mut b = [0; size_of::<u32>()];
        self.read_exact(&mut b)?;
        Ok(u32::from_le_bytes(b))
    }

    fn read_f32le(&mut self) -> Result<f32> {
        let mut b = [0; size_of::<f32>()];
        self.read_exact(&mut b)?;
        Ok(f32::from_le_bytes(b))
    }

    fn read_cstring(&mut self) -> Result<Vec<u8>> {
        let mut bytes = Vec::new();
        loop {
            let byte = self.read_u8()?;
            if byte == 0 {
                return Ok(bytes);
            }
            bytes.push(byte);
        }
    }
}
