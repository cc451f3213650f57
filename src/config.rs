//! Global pool configuration
//!
//! Loaded from TOML. Every field has a default so an empty file (or no file at
//! all) yields the stock 8 KiB / 64 KiB size classes.

use crate::error::{ConfigError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Environment variable naming a TOML file with a `PoolConfig`
pub const CONFIG_ENV: &str = "POND_POOL_CONFIG";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolConfig {
    /// Element size of the small pool, also the small size class
    #[serde(default = "default_small_element_size")]
    pub small_element_size: usize,

    /// Number of small elements carved from the pre-seeded area
    #[serde(default = "default_small_preallocated")]
    pub small_preallocated: usize,

    /// Element size of the medium pool, also the medium size class
    #[serde(default = "default_medium_element_size")]
    pub medium_element_size: usize,

    #[serde(default = "default_medium_preallocated")]
    pub medium_preallocated: usize,

    /// Alignment of every block handed out by the pools
    #[serde(default = "default_alignment")]
    pub alignment: usize,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            small_element_size: default_small_element_size(),
            small_preallocated: default_small_preallocated(),
            medium_element_size: default_medium_element_size(),
            medium_preallocated: default_medium_preallocated(),
            alignment: default_alignment(),
        }
    }
}

fn default_small_element_size() -> usize { 8 * 1024 }
fn default_small_preallocated() -> usize { 32 }
fn default_medium_element_size() -> usize { 64 * 1024 }
fn default_medium_preallocated() -> usize { 16 }
fn default_alignment() -> usize { crate::allocator::MAX_ALIGN }

impl PoolConfig {
    /// Load and validate a config file
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        Self::parse(&content)
    }

    /// Parse and validate a TOML string
    pub fn parse(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Config named by `POND_POOL_CONFIG`, or the defaults
    ///
    /// A file that fails to load is reported and ignored.
    pub fn from_env() -> Self {
        let Ok(path) = std::env::var(CONFIG_ENV) else {
            return Self::default();
        };

        match Self::load(Path::new(&path)) {
            Ok(config) => config,
            Err(error) => {
                tracing::warn!(
                    event = "pool_config_error",
                    path = %path,
                    error = %error,
                    "Falling back to default pool config"
                );
                Self::default()
            }
        }
    }

    pub fn validate(&self) -> Result<()> {
        let min = core::mem::size_of::<*mut u8>();

        if self.small_element_size < min {
            return Err(ConfigError::Invalid(format!(
                "small_element_size {} must hold a pointer ({} bytes)",
                self.small_element_size, min
            )));
        }
        if self.medium_element_size <= self.small_element_size {
            return Err(ConfigError::Invalid(format!(
                "medium_element_size {} must exceed small_element_size {}",
                self.medium_element_size, self.small_element_size
            )));
        }
        if !self.alignment.is_power_of_two() {
            return Err(ConfigError::Invalid(format!(
                "alignment {} is not a power of two",
                self.alignment
            )));
        }

        let areas = [
            ("small", self.small_element_size, self.small_preallocated),
            ("medium", self.medium_element_size, self.medium_preallocated),
        ];
        for (class, element_size, count) in areas {
            if area_size(element_size, count).is_none() {
                return Err(ConfigError::Invalid(format!(
                    "{class} area of {count} x {element_size} bytes is not addressable"
                )));
            }
        }

        Ok(())
    }

    /// Bytes reserved up front by the small pool
    ///
    /// Saturates for configs that `validate` rejects.
    pub fn small_area_size(&self) -> usize {
        area_size(self.small_element_size, self.small_preallocated).unwrap_or(usize::MAX)
    }

    pub fn medium_area_size(&self) -> usize {
        area_size(self.medium_element_size, self.medium_preallocated).unwrap_or(usize::MAX)
    }
}

/// `element_size * count`, if it fits a `Layout`
fn area_size(element_size: usize, count: usize) -> Option<usize> {
    element_size
        .checked_mul(count)
        .filter(|&bytes| bytes <= isize::MAX as usize)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_match_stock_size_classes() {
        let config = PoolConfig::default();
        assert_eq!(config.small_element_size, 8192);
        assert_eq!(config.small_preallocated, 32);
        assert_eq!(config.medium_element_size, 65536);
        assert_eq!(config.medium_preallocated, 16);
        assert_eq!(config.small_area_size(), 262_144);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn empty_document_uses_defaults() {
        let config = PoolConfig::parse("").expect("empty config");
        assert_eq!(config, PoolConfig::default());
    }

    #[test]
    fn partial_document_overrides_fields() {
        let config = PoolConfig::parse("small_element_size = 4096\nsmall_preallocated = 8\n")
            .expect("partial config");
        assert_eq!(config.small_element_size, 4096);
        assert_eq!(config.small_preallocated, 8);
        assert_eq!(config.medium_element_size, 65536);
    }

    #[test]
    fn rejects_inverted_size_classes() {
        let err = PoolConfig::parse("small_element_size = 65536\nmedium_element_size = 8192\n")
            .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn rejects_bad_alignment() {
        let err = PoolConfig::parse("alignment = 24\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn rejects_overflowing_preallocation() {
        let config = PoolConfig {
            small_preallocated: usize::MAX / 2,
            ..PoolConfig::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
        assert_eq!(config.small_area_size(), usize::MAX);

        let config = PoolConfig {
            medium_preallocated: isize::MAX as usize / 65536 + 1,
            ..PoolConfig::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn rejects_malformed_toml() {
        let err = PoolConfig::parse("small_element_size = \"big\"").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn loads_from_file() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        writeln!(file, "medium_preallocated = 4").expect("write config");

        let config = PoolConfig::load(file.path()).expect("load config");
        assert_eq!(config.medium_preallocated, 4);
        assert_eq!(config.medium_area_size(), 4 * 65536);
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = PoolConfig::load(Path::new("/nonexistent/pond.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
