//! Error types for the recoverable paths of the memory layer
//!
//! Contract violations (bad alignment, double free, rewinding out of bounds)
//! are debug assertions, not errors. What remains recoverable is exhaustion,
//! configuration, buffer decoding and compression.

use std::path::PathBuf;
use thiserror::Error;

/// Allocation failures surfaced by the `try_*` entry points
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AllocError {
    #[error("out of memory: {size} bytes with alignment {alignment} could not be allocated")]
    Exhausted { size: usize, alignment: usize },

    #[error("invalid layout: size {size}, alignment {alignment}")]
    InvalidLayout { size: usize, alignment: usize },
}

/// Pool configuration failures
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read pool config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse pool config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid pool config: {0}")]
    Invalid(String),
}

/// Decoding failures when reading from a byte buffer
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BufferError {
    #[error("unexpected end of buffer: needed {needed} bytes, {available} available")]
    UnexpectedEof { needed: usize, available: usize },

    #[error("invalid hex string at offset {offset}")]
    InvalidHex { offset: usize },

    #[error("{len} bytes do not fit a u32 length prefix")]
    TooLarge { len: usize },

    #[error("invalid UTF-8 at offset {offset}")]
    InvalidUtf8 { offset: usize },

    #[error("compression failed: {0}")]
    Codec(String),
}

pub type Result<T, E = ConfigError> = std::result::Result<T, E>;
