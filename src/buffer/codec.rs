//! zstd compression of a whole buffer
//!
//! Layout: the `_CMP` marker, the uncompressed length as a little-endian u32,
//! then a single zstd frame.

use super::ByteBuffer;
use crate::error::BufferError;
use std::io;

const MARKER: &[u8; 4] = b"_CMP";
const HEADER_LEN: usize = MARKER.len() + 4;

/// Fast zstd level
const LEVEL: i32 = 3;

/// Output capacity reserved up front, however large the header claims
const PREALLOC_LIMIT: usize = 1 << 20;

impl ByteBuffer {
    /// Whether the written bytes start with the compression marker
    pub fn is_compressed(&self) -> bool {
        self.as_slice().starts_with(MARKER)
    }

    /// Compressed copy of the written bytes
    ///
    /// Returns an empty buffer when there is nothing to compress or the bytes
    /// are already compressed.
    pub fn compress(&self) -> Result<ByteBuffer, BufferError> {
        let data = self.as_slice();
        if data.is_empty() || self.is_compressed() {
            return Ok(ByteBuffer::new());
        }
        let len = u32::try_from(data.len()).map_err(|_| BufferError::TooLarge { len: data.len() })?;

        let mut out = ByteBuffer::with_capacity(HEADER_LEN + data.len() / 2);
        out.write_bytes(MARKER);
        out.write_bytes(&len.to_le_bytes());
        zstd::stream::copy_encode(data, &mut out, LEVEL).map_err(codec_error)?;
        Ok(out)
    }

    /// The bytes a `compress` call started from
    ///
    /// Returns an empty buffer when the marker is missing. The read position
    /// is not used or moved.
    pub fn uncompress(&self) -> Result<ByteBuffer, BufferError> {
        if !self.is_compressed() {
            return Ok(ByteBuffer::new());
        }

        let data = self.as_slice();
        let len = data
            .get(MARKER.len()..HEADER_LEN)
            .and_then(|bytes| <[u8; 4]>::try_from(bytes).ok())
            .ok_or(BufferError::UnexpectedEof {
                needed: HEADER_LEN,
                available: data.len(),
            })?;
        let expected = u32::from_le_bytes(len) as usize;

        let mut out = ByteBuffer::with_capacity(expected.min(PREALLOC_LIMIT));
        zstd::stream::copy_decode(&data[HEADER_LEN..], &mut out).map_err(codec_error)?;

        if out.len() != expected {
            return Err(BufferError::Codec(format!(
                "decoded {} bytes, header says {expected}",
                out.len()
            )));
        }
        Ok(out)
    }
}

fn codec_error(error: io::Error) -> BufferError {
    BufferError::Codec(error.to_string())
}
