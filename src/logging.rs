//! Logging infrastructure - structured tracing for the memory layer
//!
//! Design: Uses `tracing` for structured, contextual logging with:
//! - Configurable log levels per module
//! - Zero-cost when disabled
//! - Optional JSON output and file output
//!
//! Allocation hot paths only ever log at TRACE.

use once_cell::sync::OnceCell;
use std::env;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{Level, Subscriber};
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    registry::LookupSpan,
    util::SubscriberInitExt,
    EnvFilter, Layer,
};

pub use tracing::{debug, error, info, trace, warn};

static LOGGER_INITIALIZED: OnceCell<()> = OnceCell::new();

type BoxedLayer<S> = Box<dyn Layer<S> + Send + Sync>;

/// Subscriber settings, normally read from `POND_LOG_*`
#[derive(Debug, Clone)]
pub struct LogConfig {
    pub level: Level,
    /// Also append to this file, without colours
    pub file: Option<PathBuf>,
    pub json: bool,
    /// Emit span enter/close events
    pub spans: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            file: None,
            json: false,
            spans: false,
        }
    }
}

impl LogConfig {
    /// `POND_LOG_LEVEL`, `POND_LOG_FILE`, `POND_LOG_JSON`, `POND_LOG_SPANS`
    pub fn from_env() -> Self {
        Self {
            level: env::var("POND_LOG_LEVEL")
                .map(|value| parse_level(&value))
                .unwrap_or(Level::INFO),
            file: env::var_os("POND_LOG_FILE").map(PathBuf::from),
            json: env::var_os("POND_LOG_JSON").is_some(),
            spans: env::var_os("POND_LOG_SPANS").is_some(),
        }
    }

    fn span_events(&self) -> FmtSpan {
        if self.spans {
            FmtSpan::ENTER | FmtSpan::CLOSE
        } else {
            FmtSpan::NONE
        }
    }
}

/// Unknown names fall back to INFO
fn parse_level(value: &str) -> Level {
    value.trim().parse().unwrap_or(Level::INFO)
}

/// Initialize logging with configuration from the environment
pub fn init() {
    init_with_config(LogConfig::from_env());
}

/// Install the subscriber described by `config`
///
/// Only the first call does anything. A subscriber already installed by the
/// host application is left in place.
pub fn init_with_config(config: LogConfig) {
    LOGGER_INITIALIZED.get_or_init(|| {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("pond_mem={}", config.level.as_str().to_lowercase()))
        });

        let _ = tracing_subscriber::registry()
            .with(filter)
            .with(console_layer(&config))
            .with(config.file.as_deref().map(|path| file_layer(path, &config)))
            .try_init();
    });
}

fn console_layer<S>(config: &LogConfig) -> BoxedLayer<S>
where
    S: Subscriber + for<'a> LookupSpan<'a> + 'static,
{
    let layer = fmt::layer()
        .with_writer(io::stdout)
        .with_span_events(config.span_events())
        .with_target(true);

    if config.json {
        layer.json().boxed()
    } else {
        layer
            .with_thread_ids(cfg!(debug_assertions))
            .with_line_number(cfg!(debug_assertions))
            .boxed()
    }
}

fn file_layer<S>(path: &Path, config: &LogConfig) -> BoxedLayer<S>
where
    S: Subscriber + for<'a> LookupSpan<'a> + 'static,
{
    let dir = path
        .parent()
        .filter(|dir| !dir.as_os_str().is_empty())
        .unwrap_or(Path::new("."));
    let name = path.file_name().unwrap_or(path.as_os_str());

    fmt::layer()
        .with_writer(tracing_appender::rolling::never(dir, name))
        .with_ansi(false)
        .with_span_events(config.span_events())
        .boxed()
}

// ============================================================================
// Memory-layer events
// ============================================================================

/// Log pond construction
pub fn log_pond_created(name: &str, capacity: usize) {
    debug!(
        event = "pond_created",
        pond = name,
        capacity_bytes = capacity,
        "Pond created"
    );
}

/// Log a free-list node allocated outside the pre-seeded area
#[inline]
pub fn log_fallback_node(element_size: usize, ptr: *const u8) {
    trace!(
        event = "pool_fallback_node",
        element_size,
        address = ?ptr,
        "Pool area exhausted, node taken from the platform"
    );
}

/// Log a pool reset
pub fn log_pool_reset(released_nodes: usize, retained_nodes: usize) {
    debug!(
        event = "pool_reset",
        released_nodes,
        retained_nodes,
        "Pool free list trimmed"
    );
}

/// Log a global pool allocation
#[inline]
pub fn log_allocation(size: usize, ptr: *const u8) {
    trace!(
        event = "allocation",
        size_bytes = size,
        address = ?ptr,
        "Memory allocated"
    );
}

/// Log a global pool deallocation
#[inline]
pub fn log_deallocation(size: usize, ptr: *const u8) {
    trace!(
        event = "deallocation",
        size_bytes = size,
        address = ?ptr,
        "Memory deallocated"
    );
}

/// Log global pool gc completion
pub fn log_gc_complete(duration_us: u64, capacity_before: u64, capacity_after: u64) {
    info!(
        event = "gc_complete",
        duration_us,
        capacity_before,
        capacity_after,
        released_bytes = capacity_before.saturating_sub(capacity_after),
        "Global pool gc complete"
    );
}

/// Log a copy-on-write detach
#[inline]
pub fn log_buffer_copy(capacity: usize) {
    trace!(
        event = "buffer_copy_on_write",
        capacity_bytes = capacity,
        "Shared buffer detached"
    );
}
