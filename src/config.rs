//! # Configuration Management
//!
//! Centralized configuration for the wire-protocol codec.
//!
//! This module provides the protocol-wide constants (magic number, current
//! version, hard limits) and a structured `CodecConfig` for the per-channel
//! knobs a consuming daemon may want to tune.
//!
//! ## Configuration Sources
//! - TOML files via `from_file()` / `from_toml()`
//! - Direct instantiation with defaults
//! - Environment-specific overrides via `from_env()`
//!
//! ## Security Considerations
//! - Default element size limit (16 MB) prevents memory exhaustion from
//!   adversarial size prefixes
//! - Nesting depth limits bound stack growth against deeply nested input

use crate::core::version::Version;
use crate::error::{ProtocolError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Current protocol version advertised in the packet header.
pub const PROTOCOL_VERSION: Version = Version::new(1, 0, 2);

/// Magic bytes identifying a protocol channel (0xC001BA5E).
pub const MAGIC_BYTES: [u8; 4] = [0xC0, 0x01, 0xBA, 0x5E];

/// Max allowed size of a single element, headers excluded (16 MB).
pub const MAX_ELEMENT_SIZE: u64 = 16 * 1024 * 1024;

/// Max nesting depth of the element stack.
pub const MAX_NESTING_DEPTH: usize = 512;

/// Max depth of a function-call tree inside a filter or computed retrieve.
pub const MAX_FUNCTION_DEPTH: usize = 128;

/// Max width of a variable-length size encoding, in bytes (63 value bits).
pub const MAX_VARLEN_BYTES: usize = 9;

/// Max width of a tag code, in bytes.
pub const MAX_CODE_BYTES: usize = 8;

/// Per-conversation codec configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CodecConfig {
    /// Silently skip elements with unrecognized tag codes instead of
    /// surfacing them. This is how forward compatibility with newer
    /// protocol revisions is achieved.
    #[serde(default = "defaults::skip_unknown")]
    pub skip_unknown: bool,

    /// Maximum size of a single element, in bytes.
    #[serde(default = "defaults::max_element_size")]
    pub max_element_size: u64,

    /// Maximum nesting depth of open containers.
    #[serde(default = "defaults::max_nesting_depth")]
    pub max_nesting_depth: usize,

    /// Maximum depth of function-call trees.
    #[serde(default = "defaults::max_function_depth")]
    pub max_function_depth: usize,
}

mod defaults {
    pub fn skip_unknown() -> bool {
        true
    }
    pub fn max_element_size() -> u64 {
        super::MAX_ELEMENT_SIZE
    }
    pub fn max_nesting_depth() -> usize {
        super::MAX_NESTING_DEPTH
    }
    pub fn max_function_depth() -> usize {
        super::MAX_FUNCTION_DEPTH
    }
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            skip_unknown: defaults::skip_unknown(),
            max_element_size: defaults::max_element_size(),
            max_nesting_depth: defaults::max_nesting_depth(),
            max_function_depth: defaults::max_function_depth(),
        }
    }
}

impl CodecConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ProtocolError::ConfigError(format!("Failed to read config file: {e}")))?;
        Self::from_toml(&contents)
    }

    /// Load configuration from TOML string
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str::<Self>(content)
            .map_err(|e| ProtocolError::ConfigError(format!("Failed to parse TOML: {e}")))
    }

    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Start with defaults
        let mut config = Self::default();

        if let Ok(skip) = std::env::var("MESHDB_PROTOCOL_SKIP_UNKNOWN") {
            if let Ok(val) = skip.parse::<bool>() {
                config.skip_unknown = val;
            }
        }

        if let Ok(size) = std::env::var("MESHDB_PROTOCOL_MAX_ELEMENT_SIZE") {
            if let Ok(val) = size.parse::<u64>() {
                config.max_element_size = val;
            }
        }

        if let Ok(depth) = std::env::var("MESHDB_PROTOCOL_MAX_NESTING_DEPTH") {
            if let Ok(val) = depth.parse::<usize>() {
                config.max_nesting_depth = val;
            }
        }

        if let Ok(depth) = std::env::var("MESHDB_PROTOCOL_MAX_FUNCTION_DEPTH") {
            if let Ok(val) = depth.parse::<usize>() {
                config.max_function_depth = val;
            }
        }

        Ok(config)
    }

    /// Apply overrides to the default configuration
    pub fn default_with_overrides<F>(mutator: F) -> Self
    where
        F: FnOnce(&mut Self),
    {
        let mut config = Self::default();
        mutator(&mut config);
        config
    }

    /// Validate the configuration for common issues and misconfigurations
    ///
    /// Returns a list of validation errors. Empty list means configuration is valid.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.max_element_size == 0 {
            errors.push("Max element size cannot be 0".to_string());
        } else if self.max_element_size > 100 * 1024 * 1024 {
            errors.push(format!(
                "Max element size too large: {} bytes (maximum recommended: 100 MB)",
                self.max_element_size
            ));
        }

        if self.max_nesting_depth < 8 {
            errors.push("Max nesting depth too small (minimum: 8)".to_string());
        } else if self.max_nesting_depth > 65_536 {
            errors.push(format!(
                "Max nesting depth very high: {} (ensure stack budget can support this)",
                self.max_nesting_depth
            ));
        }

        if self.max_function_depth == 0 {
            errors.push("Max function depth cannot be 0".to_string());
        } else if self.max_function_depth > self.max_nesting_depth {
            errors.push("Max function depth cannot exceed max nesting depth".to_string());
        }

        errors
    }

    /// Validate and return Result - convenience method
    pub fn validate_strict(&self) -> Result<()> {
        let errors = self.validate();
        if errors.is_empty() {
            Ok(())
        } else {
            Err(ProtocolError::ConfigError(format!(
                "Configuration validation failed:\n  - {}",
                errors.join("\n  - ")
            )))
        }
    }
}
