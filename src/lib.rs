//! Pond - composable memory management
//!
//! A Pond combines an area (where memory lives), an allocator strategy (how
//! it is carved) and a locking policy (how access is serialized). On top of
//! it sit a process-wide size-classed pool and a copy-on-write byte buffer
//! that draws its storage from that pool.

pub mod allocator;
pub mod area;
pub mod buffer;
pub mod config;
pub mod error;
pub mod lock;
pub mod logging;
pub mod memory_pool;
pub mod pond;

// Re-export core types
pub use allocator::{Allocator, HeapAllocator, LinearAllocator, PoolAllocator, MAX_ALIGN};
pub use area::{Area, HeapArea, NullArea, StaticArea};
pub use buffer::{ByteBuffer, ByteOrder, Seek};
pub use config::PoolConfig;
pub use error::{AllocError, BufferError, ConfigError};
pub use lock::{LockingPolicy, MutexLock, NoLock, RwLock, SpinLock};
pub use memory_pool::{GlobalMemoryPool, PoolStats, SizeClass};
pub use pond::{HeapPond, Pond, PondAllocator, PondArc, PondBox};

/// Initialize logging from the environment and create the global pool
///
/// Optional: the pool is created on first use anyway. Calling this first
/// makes pool creation visible in the logs.
pub fn init() {
    logging::init();
    memory_pool::global();
}
