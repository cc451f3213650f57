//! Copy-on-write byte buffer backed by the global memory pool
//!
//! Design: Handles share one `BufferRef` through an `Arc`; cloning a buffer
//! copies only the handle. Every mutation detaches first, so a write through
//! one handle is never visible through another. Read and write positions are
//! per handle.
//!
//! Storage grows to `max(capacity * 1.5, required * 1.5)`, rounded up by the
//! pool's size classes, and never shrinks.
//!
//! Strings and nested buffers are framed by a u32 length. Whole buffers can
//! be zstd-compressed behind a small marker header (see `codec`).

mod buffer_ref;
mod codec;
mod primitive;


pub use primitive::{ByteOrder, Primitive};

use crate::error::BufferError;
use crate::logging::log_buffer_copy;
use buffer_ref::BufferRef;
use primitive::MAX_PRIMITIVE_SIZE;
use std::fmt::{self, Write as _};
use std::io;
use std::ops::Range;
use std::sync::Arc;

/// Position for `seek_write` / `seek_read`
///
/// `End` is measured from the capacity, not the written length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Seek {
    Start(usize),
    Current(isize),
    End(isize),
}

/// Growable byte buffer with shared, copy-on-write storage
///
/// Byte order applies to typed values only (`write_value`, `read_value` and
/// the u32 length prefixes). Bytes passed to `write_bytes` are stored exactly
/// as given, whatever `byte_order` says.
#[derive(Clone)]
pub struct ByteBuffer {
    inner: Arc<BufferRef>,
    write_pos: usize,
    read_pos: usize,
    byte_order: ByteOrder,
}

impl ByteBuffer {
    /// Empty buffer with the smallest pool block
    pub fn new() -> Self {
        Self::with_capacity(1)
    }

    /// Empty buffer with room for at least `size` bytes
    pub fn with_capacity(size: usize) -> Self {
        Self {
            inner: Arc::new(BufferRef::new(size.max(1))),
            write_pos: 0,
            read_pos: 0,
            byte_order: ByteOrder::default(),
        }
    }

    pub fn from_slice(data: &[u8]) -> Self {
        let mut buffer = Self::with_capacity(data.len());
        buffer.write_bytes(data);
        buffer
    }

    /// Parse a hex string, two digits per byte, either case
    pub fn from_hex_str(hex: &str) -> Result<Self, BufferError> {
        let digits = hex.as_bytes();
        if digits.len() % 2 != 0 {
            return Err(BufferError::InvalidHex {
                offset: digits.len(),
            });
        }

        let mut buffer = Self::with_capacity(digits.len() / 2);
        for (i, pair) in digits.chunks_exact(2).enumerate() {
            let high = hex_value(pair[0]).ok_or(BufferError::InvalidHex { offset: i * 2 })?;
            let low = hex_value(pair[1]).ok_or(BufferError::InvalidHex { offset: i * 2 + 1 })?;
            buffer.write_bytes(&[(high << 4) | low]);
        }
        Ok(buffer)
    }

    #[inline]
    pub fn byte_order(&self) -> ByteOrder {
        self.byte_order
    }

    /// Order used by `write_value` / `read_value`
    #[inline]
    pub fn set_byte_order(&mut self, order: ByteOrder) {
        self.byte_order = order;
    }

    /// Rewind both positions, first growing to `size` bytes if that is larger
    pub fn reset(&mut self, size: usize) {
        if size > 0 {
            self.grow_to(size);
        }
        self.write_pos = 0;
        self.read_pos = 0;
    }

    /// Rewind both positions, keeping the storage
    #[inline]
    pub fn clear(&mut self) {
        self.write_pos = 0;
        self.read_pos = 0;
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.inner.capacity()
    }

    /// Bytes written, i.e. the write position
    #[inline]
    pub fn len(&self) -> usize {
        self.write_pos
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.write_pos == 0
    }

    /// The written bytes
    #[inline]
    pub fn as_slice(&self) -> &[u8] {
        &self.inner.as_slice()[..self.write_pos]
    }

    /// The written bytes, detached from any other handle
    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        let len = self.write_pos;
        &mut self.storage_mut()[..len]
    }

    /// Handles sharing this buffer's storage, this one included
    #[inline]
    pub fn ref_count(&self) -> usize {
        Arc::strong_count(&self.inner)
    }

    /// Append raw bytes at the write position, never byte-swapped
    pub fn write_bytes(&mut self, data: &[u8]) {
        let required = self.write_pos + data.len();
        let capacity = self.capacity();

        if required > capacity {
            let grown = capacity + capacity / 2;
            self.grow_to(grown.max(required + required / 2));
        }

        let start = self.write_pos;
        self.storage_mut()[start..required].copy_from_slice(data);
        self.write_pos = required;
    }

    /// Append a value in the buffer's byte order
    pub fn write_value<T: Primitive>(&mut self, value: T) {
        let mut scratch = [0u8; MAX_PRIMITIVE_SIZE];
        value.encode(self.byte_order, &mut scratch[..T::SIZE]);
        self.write_bytes(&scratch[..T::SIZE]);
    }

    /// Append `text` as a u32 length then its UTF-8 bytes
    pub fn write_str(&mut self, text: &str) -> Result<(), BufferError> {
        self.write_prefixed(text.as_bytes())
    }

    /// Append the written bytes of `other` behind a u32 length
    pub fn write_buffer(&mut self, other: &ByteBuffer) -> Result<(), BufferError> {
        self.write_prefixed(other.as_slice())
    }

    /// Fill `out` from the read position
    ///
    /// Fails without consuming anything when fewer bytes remain.
    pub fn read_bytes(&mut self, out: &mut [u8]) -> Result<(), BufferError> {
        let available = self.remaining();
        if out.len() > available {
            return Err(BufferError::UnexpectedEof {
                needed: out.len(),
                available,
            });
        }

        let start = self.read_pos;
        out.copy_from_slice(&self.inner.as_slice()[start..start + out.len()]);
        self.read_pos += out.len();
        Ok(())
    }

    /// Read a value in the buffer's byte order
    pub fn read_value<T: Primitive>(&mut self) -> Result<T, BufferError> {
        let mut scratch = [0u8; MAX_PRIMITIVE_SIZE];
        self.read_bytes(&mut scratch[..T::SIZE])?;
        Ok(T::decode(self.byte_order, &scratch[..T::SIZE]))
    }

    /// Read a string written by `write_str`
    ///
    /// Like `read_bytes`, consumes nothing on failure.
    pub fn read_string(&mut self) -> Result<String, BufferError> {
        let start = self.read_pos;
        let range = self.read_prefixed()?;

        match std::str::from_utf8(&self.inner.as_slice()[range.clone()]) {
            Ok(text) => Ok(text.to_owned()),
            Err(error) => {
                self.read_pos = start;
                Err(BufferError::InvalidUtf8 {
                    offset: range.start + error.valid_up_to(),
                })
            }
        }
    }

    /// Read a buffer written by `write_buffer`, in this buffer's byte order
    pub fn read_buffer(&mut self) -> Result<ByteBuffer, BufferError> {
        let range = self.read_prefixed()?;

        let mut out = ByteBuffer::with_capacity(range.len());
        out.set_byte_order(self.byte_order);
        out.write_bytes(&self.inner.as_slice()[range]);
        Ok(out)
    }

    /// Move the write position, clamped to `[0, capacity]`
    pub fn seek_write(&mut self, seek: Seek) {
        self.write_pos = self.seek_target(seek, self.write_pos);
    }

    /// Move the read position, clamped to `[0, capacity]`
    pub fn seek_read(&mut self, seek: Seek) {
        self.read_pos = self.seek_target(seek, self.read_pos);
    }

    #[inline]
    pub fn write_pos(&self) -> usize {
        self.write_pos
    }

    #[inline]
    pub fn read_pos(&self) -> usize {
        self.read_pos
    }

    /// Whether unread bytes remain before the write position
    #[inline]
    pub fn can_read_more(&self) -> bool {
        self.read_pos < self.write_pos
    }

    pub fn to_hex_string(&self, uppercase: bool) -> String {
        let mut out = String::with_capacity(self.len() * 2);
        for byte in self.as_slice() {
            let _ = if uppercase {
                write!(out, "{byte:02X}")
            } else {
                write!(out, "{byte:02x}")
            };
        }
        out
    }

    fn write_prefixed(&mut self, data: &[u8]) -> Result<(), BufferError> {
        let len = u32::try_from(data.len()).map_err(|_| BufferError::TooLarge { len: data.len() })?;
        self.write_value(len);
        self.write_bytes(data);
        Ok(())
    }

    /// Consume a u32 length and that many bytes, returning where they sit
    fn read_prefixed(&mut self) -> Result<Range<usize>, BufferError> {
        let start = self.read_pos;
        let len = self.read_value::<u32>()? as usize;

        let available = self.remaining();
        if len > available {
            self.read_pos = start;
            return Err(BufferError::UnexpectedEof {
                needed: len,
                available,
            });
        }

        self.read_pos += len;
        Ok(self.read_pos - len..self.read_pos)
    }

    #[inline]
    fn remaining(&self) -> usize {
        self.write_pos.saturating_sub(self.read_pos)
    }

    fn seek_target(&self, seek: Seek, current: usize) -> usize {
        let capacity = self.capacity() as i128;
        let target = match seek {
            Seek::Start(pos) => pos as i128,
            Seek::Current(delta) => current as i128 + delta as i128,
            Seek::End(delta) => capacity + delta as i128,
        };

        debug_assert!(
            (0..=capacity).contains(&target),
            "seek target {target} outside [0, {capacity}]"
        );
        target.clamp(0, capacity) as usize
    }

    /// Exclusive view of the whole storage, detaching from other handles first
    fn storage_mut(&mut self) -> &mut [u8] {
        Arc::make_mut(&mut self.inner).as_mut_slice()
    }

    /// Grow the storage to at least `size` bytes
    fn grow_to(&mut self, size: usize) {
        if size <= self.capacity() {
            return;
        }

        match Arc::get_mut(&mut self.inner) {
            Some(inner) => inner.grow(size),
            None => {
                // Shared: copy straight into the larger block
                log_buffer_copy(self.capacity());
                let mut fresh = BufferRef::new(size);
                let old = self.inner.as_slice();
                fresh.as_mut_slice()[..old.len()].copy_from_slice(old);
                self.inner = Arc::new(fresh);
            }
        }
    }
}

fn hex_value(digit: u8) -> Option<u8> {
    match digit {
        b'0'..=b'9' => Some(digit - b'0'),
        b'a'..=b'f' => Some(digit - b'a' + 10),
        b'A'..=b'F' => Some(digit - b'A' + 10),
        _ => None,
    }
}

impl Default for ByteBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl PartialEq for ByteBuffer {
    fn eq(&self, other: &Self) -> bool {
        self.as_slice() == other.as_slice()
    }
}

impl Eq for ByteBuffer {}

impl AsRef<[u8]> for ByteBuffer {
    fn as_ref(&self) -> &[u8] {
        self.as_slice()
    }
}

impl From<&[u8]> for ByteBuffer {
    fn from(data: &[u8]) -> Self {
        Self::from_slice(data)
    }
}

impl fmt::Debug for ByteBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ByteBuffer")
            .field("len", &self.len())
            .field("capacity", &self.capacity())
            .field("read_pos", &self.read_pos)
            .field("ref_count", &self.ref_count())
            .finish()
    }
}

impl io::Write for ByteBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.write_bytes(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl io::Read for ByteBuffer {
    /// Reads what is available, zero once the read position reaches the end
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = buf.len().min(self.remaining());
        let start = self.read_pos;
        buf[..n].copy_from_slice(&self.inner.as_slice()[start..start + n]);
        self.read_pos += n;
        Ok(n)
    }
}
