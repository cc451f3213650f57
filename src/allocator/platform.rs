//! Platform aligned allocation
//!
//! The free side takes no size, so blocks can be released by code that only
//! knows the pointer (pool fallback nodes, heap passthrough).

use core::ffi::c_void;
use core::ptr::NonNull;

#[inline]
fn effective_alignment(alignment: usize) -> usize {
    let alignment = alignment.max(core::mem::size_of::<*mut u8>());
    debug_assert!(alignment.is_power_of_two(), "alignment must be power of 2");
    alignment
}

/// Allocate `size` bytes aligned to at least `alignment`
///
/// Alignment is raised to pointer size. A zero-byte request still returns a
/// unique, freeable pointer.
#[cfg(unix)]
pub fn aligned_alloc(size: usize, alignment: usize) -> Option<NonNull<u8>> {
    let alignment = effective_alignment(alignment);
    let mut p: *mut c_void = core::ptr::null_mut();

    let rc = unsafe { libc::posix_memalign(&mut p, alignment, size.max(1)) };
    if rc != 0 {
        return None;
    }

    NonNull::new(p as *mut u8)
}

/// Release a block from `aligned_alloc`
///
/// # Safety
/// `p` must come from `aligned_alloc` and must not be freed twice.
#[cfg(unix)]
pub unsafe fn aligned_free(p: NonNull<u8>) {
    libc::free(p.as_ptr() as *mut c_void);
}

#[cfg(windows)]
extern "C" {
    fn _aligned_malloc(size: usize, alignment: usize) -> *mut c_void;
    fn _aligned_free(p: *mut c_void);
}

#[cfg(windows)]
pub fn aligned_alloc(size: usize, alignment: usize) -> Option<NonNull<u8>> {
    let alignment = effective_alignment(alignment);
    NonNull::new(unsafe { _aligned_malloc(size.max(1), alignment) } as *mut u8)
}

/// # Safety
/// `p` must come from `aligned_alloc` and must not be freed twice.
#[cfg(windows)]
pub unsafe fn aligned_free(p: NonNull<u8>) {
    _aligned_free(p.as_ptr() as *mut c_void);
}

#[cfg(not(any(unix, windows)))]
compile_error!("pond-mem needs a platform aligned allocator (unix or windows)");
