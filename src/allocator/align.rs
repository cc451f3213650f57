//! Alignment arithmetic shared by every strategy
//!
//! All helpers require a power-of-two alignment (checked in debug builds).
//! Pointer variants use wrapping offsets so provenance is kept.

/// Round `size` up to a multiple of `alignment`
#[inline(always)]
pub const fn align_size(size: usize, alignment: usize) -> usize {
    (size.wrapping_add(alignment).wrapping_sub(1)) & !alignment.wrapping_sub(1)
}

/// Align address upward to next multiple of alignment
///
/// Uses bit manipulation for branch-free execution:
/// - Add (align - 1) to round up
/// - Mask with !(align - 1) to align down
#[inline(always)]
pub fn align_up(addr: usize, alignment: usize) -> usize {
    debug_assert!(alignment.is_power_of_two(), "alignment must be power of 2");
    align_size(addr, alignment)
}

/// Align a pointer upward
#[inline(always)]
pub fn align_ptr(p: *mut u8, alignment: usize) -> *mut u8 {
    let addr = p as usize;
    p.wrapping_add(align_up(addr, alignment).wrapping_sub(addr))
}

/// Align `p + offset` upward
///
/// The result never precedes `p + offset`.
#[inline(always)]
pub fn align_ptr_with_offset(p: *mut u8, alignment: usize, offset: usize) -> *mut u8 {
    let shifted = p.wrapping_add(offset);
    let aligned = align_ptr(shifted, alignment);
    debug_assert!(aligned as usize >= shifted as usize, "alignment wrapped around");
    aligned
}
