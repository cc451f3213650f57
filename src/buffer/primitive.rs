//! Fixed-width values that can be written to and read from a ByteBuffer

/// Byte order of multi-byte values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ByteOrder {
    BigEndian,
    #[default]
    LittleEndian,
}

impl ByteOrder {
    #[cfg(target_endian = "little")]
    pub const NATIVE: ByteOrder = ByteOrder::LittleEndian;

    #[cfg(target_endian = "big")]
    pub const NATIVE: ByteOrder = ByteOrder::BigEndian;
}

/// Widest primitive, in bytes
pub(crate) const MAX_PRIMITIVE_SIZE: usize = 16;

mod sealed {
    pub trait Sealed {}
}

/// Numeric or boolean value with a fixed encoded width
pub trait Primitive: Copy + sealed::Sealed {
    const SIZE: usize;

    /// Encode into exactly `SIZE` bytes
    fn encode(self, order: ByteOrder, out: &mut [u8]);

    /// Decode from exactly `SIZE` bytes
    fn decode(order: ByteOrder, bytes: &[u8]) -> Self;
}

macro_rules! impl_primitive {
    ($($ty:ty),* $(,)?) => {$(
        impl sealed::Sealed for $ty {}

        impl Primitive for $ty {
            const SIZE: usize = core::mem::size_of::<$ty>();

            #[inline]
            fn encode(self, order: ByteOrder, out: &mut [u8]) {
                let bytes = match order {
                    ByteOrder::BigEndian => self.to_be_bytes(),
                    ByteOrder::LittleEndian => self.to_le_bytes(),
                };
                out.copy_from_slice(&bytes);
            }

            #[inline]
            fn decode(order: ByteOrder, bytes: &[u8]) -> Self {
                let mut raw = [0u8; core::mem::size_of::<$ty>()];
                raw.copy_from_slice(bytes);
                match order {
                    ByteOrder::BigEndian => <$ty>::from_be_bytes(raw),
                    ByteOrder::LittleEndian => <$ty>::from_le_bytes(raw),
                }
            }
        }
    )*};
}

impl_primitive!(u8, i8, u16, i16, u32, i32, u64, i64, u128, i128, f32, f64);

impl sealed::Sealed for bool {}

impl Primitive for bool {
    const SIZE: usize = 1;

    #[inline]
    fn encode(self, _order: ByteOrder, out: &mut [u8]) {
        out[0] = self as u8;
    }

    #[inline]
    fn decode(_order: ByteOrder, bytes: &[u8]) -> Self {
        bytes[0] != 0
    }
}
