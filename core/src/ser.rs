//! A minimal byte-oriented serialization trait for consensus objects, along
//! with the Bitcoin `CompactSize` variable-length integer.

use std::io::{Read, Write};

use thiserror::Error;

/// Errors encountered while serializing or deserializing consensus objects.
#[derive(Debug, Error)]
pub enum SerError {
    /// IOError bubbled up from a `Read` or `Write` passed to a `ByteFormat`
    /// implementation.
    #[error(transparent)]
    IoError(#[from] std::io::Error),

    /// Input was not valid hex.
    #[error(transparent)]
    HexError(#[from] hex::FromHexError),

    /// A `CompactSize` prefix was not minimally encoded and strict decoding
    /// was requested.
    #[error("non-minimal CompactSize encoding of {0}")]
    NonMinimalPrefix(u64),

    /// The reader produced fewer bytes than the length prefix declared.
    #[error("unexpected end of input: wanted {wanted} bytes, got {got}")]
    Truncated {
        /// How many bytes the prefix promised.
        wanted: usize,
        /// How many bytes were actually available.
        got: usize,
    },

    /// A fixed-width field had the wrong length.
    #[error("bad field length: expected {expected} bytes, got {got}")]
    BadLength {
        /// The expected width.
        expected: usize,
        /// The observed width.
        got: usize,
    },
}

/// Type alias for `Result` with a `SerError` error type.
pub type SerResult<T> = Result<T, SerError>;

/// Returns the byte-length of the `CompactSize` prefix that encodes `number`.
pub fn prefix_byte_len(number: u64) -> usize {
    match number {
        0..=0xfc => 1,
        0xfd..=0xffff => 3,
        0x1_0000..=0xffff_ffff => 5,
        _ => 9,
    }
}

/// Write `number` as a `CompactSize` to `writer`. Always chooses the shortest
/// valid form. Returns the number of bytes written.
pub fn write_compact_int<W: Write>(writer: &mut W, number: u64) -> SerResult<usize> {
    match number {
        0..=0xfc => {
            writer.write_all(&[number as u8])?;
            Ok(1)
        }
        0xfd..=0xffff => {
            writer.write_all(&[0xfd])?;
            writer.write_all(&(number as u16).to_le_bytes())?;
            Ok(3)
        }
        0x1_0000..=0xffff_ffff => {
            writer.write_all(&[0xfe])?;
            writer.write_all(&(number as u32).to_le_bytes())?;
            Ok(5)
        }
        _ => {
            writer.write_all(&[0xff])?;
            writer.write_all(&number.to_le_bytes())?;
            Ok(9)
        }
    }
}

/// Read a `CompactSize` from `reader`. Tolerates non-minimal encodings, which
/// occur in the wild; use [`read_compact_int_strict`] to reject them.
pub fn read_compact_int<R: Read>(reader: &mut R) -> SerResult<u64> {
    let mut prefix = [0u8];
    reader.read_exact(&mut prefix)?;
    read_compact_int_tail(reader, prefix[0])
}

/// Read a `CompactSize`, rejecting non-minimal encodings with
/// [`SerError::NonMinimalPrefix`].
pub fn read_compact_int_strict<R: Read>(reader: &mut R) -> SerResult<u64> {
    let mut prefix = [0u8];
    reader.read_exact(&mut prefix)?;
    let number = read_compact_int_tail(reader, prefix[0])?;
    if prefix_byte_len(number) != compact_prefix_len(prefix[0]) {
        return Err(SerError::NonMinimalPrefix(number));
    }
    Ok(number)
}

/// Finish reading a `CompactSize` whose first byte has already been consumed.
/// Used by deserializers that must peek ahead (e.g. witness marker detection).
pub fn read_compact_int_tail<R: Read>(reader: &mut R, prefix: u8) -> SerResult<u64> {
    match prefix {
        0xfd => {
            let mut buf = [0u8; 2];
            reader.read_exact(&mut buf)?;
            Ok(u16::from_le_bytes(buf) as u64)
        }
        0xfe => {
            let mut buf = [0u8; 4];
            reader.read_exact(&mut buf)?;
            Ok(u32::from_le_bytes(buf) as u64)
        }
        0xff => {
            let mut buf = [0u8; 8];
            reader.read_exact(&mut buf)?;
            Ok(u64::from_le_bytes(buf))
        }
        _ => Ok(prefix as u64),
    }
}

fn compact_prefix_len(prefix: u8) -> usize {
    match prefix {
        0xfd => 3,
        0xfe => 5,
        0xff => 9,
        _ => 1,
    }
}

/// Read exactly `count` bytes. The allocation is grown incrementally so a
/// hostile length prefix cannot trigger a huge up-front reservation.
pub fn read_exact_vec<R: Read>(reader: &mut R, count: usize) -> SerResult<Vec<u8>> {
    let mut buf = Vec::with_capacity(count.min(0x10000));
    let got = reader.take(count as u64).read_to_end(&mut buf)?;
    if got != count {
        return Err(SerError::Truncated { wanted: count, got });
    }
    Ok(buf)
}

/// Basic byte-oriented serialization for consensus objects.
///
/// Implementors define the wire representation once; hex convenience methods
/// and the little-endian integer helpers are provided.
pub trait ByteFormat: Sized {
    /// An error type produced while reading or writing.
    type Error: From<SerError> + std::fmt::Debug;

    /// Returns the byte-length of the serialized representation.
    fn serialized_length(&self) -> usize;

    /// Read a value of this type from the reader.
    fn read_from<R: Read>(reader: &mut R) -> Result<Self, Self::Error>;

    /// Write the value to the writer. Returns the number of bytes written.
    fn write_to<W: Write>(&self, writer: &mut W) -> Result<usize, Self::Error>;

    /// Deserialize from a hex string.
    fn deserialize_hex(hex_str: &str) -> Result<Self, Self::Error> {
        let bytes = hex::decode(hex_str).map_err(SerError::from)?;
        Self::read_from(&mut bytes.as_slice())
    }

    /// Serialize to a lowercase hex string.
    fn serialize_hex(&self) -> String {
        let mut buf = Vec::with_capacity(self.serialized_length());
        self.write_to(&mut buf)
            .expect("no IOError on heap write");
        hex::encode(buf)
    }

    /// Read a single byte.
    fn read_u8<R: Read>(reader: &mut R) -> Result<u8, Self::Error> {
        let mut buf = [0u8];
        reader.read_exact(&mut buf).map_err(SerError::from)?;
        Ok(buf[0])
    }

    /// Read a little-endian u32.
    fn read_u32_le<R: Read>(reader: &mut R) -> Result<u32, Self::Error> {
        let mut buf = [0u8; 4];
        reader.read_exact(&mut buf).map_err(SerError::from)?;
        Ok(u32::from_le_bytes(buf))
    }

    /// Read a little-endian u64.
    fn read_u64_le<R: Read>(reader: &mut R) -> Result<u64, Self::Error> {
        let mut buf = [0u8; 8];
        reader.read_exact(&mut buf).map_err(SerError::from)?;
        Ok(u64::from_le_bytes(buf))
    }

    /// Write a single byte.
    fn write_u8<W: Write>(writer: &mut W, number: u8) -> Result<usize, Self::Error> {
        writer.write_all(&[number]).map_err(SerError::from)?;
        Ok(1)
    }

    /// Write a u32 as little-endian.
    fn write_u32_le<W: Write>(writer: &mut W, number: u32) -> Result<usize, Self::Error> {
        writer
            .write_all(&number.to_le_bytes())
            .map_err(SerError::from)?;
        Ok(4)
    }

    /// Write a u64 as little-endian.
    fn write_u64_le<W: Write>(writer: &mut W, number: u64) -> Result<usize, Self::Error> {
        writer
            .write_all(&number.to_le_bytes())
            .map_err(SerError::from)?;
        Ok(8)
    }
}

/// Read a `CompactSize`-prefixed vector of `ByteFormat` items.
pub fn read_prefix_vec<R, T>(reader: &mut R) -> Result<Vec<T>, T::Error>
where
    R: Read,
    T: ByteFormat,
{
    let count = read_compact_int(reader).map_err(SerError::from)?;
    let mut items = Vec::with_capacity((count as usize).min(0x1000));
    for _ in 0..count {
        items.push(T::read_from(reader)?);
    }
    Ok(items)
}

/// Write a `CompactSize`-prefixed vector of `ByteFormat` items. Returns the
/// number of bytes written.
pub fn write_prefix_vec<W, T>(writer: &mut W, items: &[T]) -> Result<usize, T::Error>
where
    W: Write,
    T: ByteFormat,
{
    let mut len = write_compact_int(writer, items.len() as u64).map_err(SerError::from)?;
    for item in items {
        len += item.write_to(writer)?;
    }
    Ok(len)
}
