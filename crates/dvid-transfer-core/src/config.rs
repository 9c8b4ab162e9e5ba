//! Configuration for dvid-transfer.
//!
//! Resolution order: environment variables → config file → defaults.
//!
//! Config file location:
//!   1. $DVID_TRANSFER_CONFIG (explicit override)
//!   2. $XDG_CONFIG_HOME/dvid-transfer/config.toml
//!   3. ~/.config/dvid-transfer/config.toml

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Largest payload moved in a single read/write exchange.
pub const DEFAULT_BYTE_CEILING: u64 = 2_000_000_000;

/// Axis order tag for raw requests: x, y, z in canonical order.
pub const DEFAULT_AXIS_ORDER: &str = "0_1_2";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TransferConfig {
    /// Layers larger than this many bytes are split into Y bands.
    pub byte_ceiling: u64,
    pub strip_coverage: StripCoverage,
    pub block_shape: BlockShapePolicy,
    pub axis_order: String,
}

/// How Y bands are emitted when `ny` is not a multiple of the strip count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StripCoverage {
    /// Keep adding bands until the whole Y range is covered.
    Complete,
    /// Emit exactly `strips` bands; trailing block rows may be skipped.
    Legacy,
}

/// What to do when the X and Y block edges differ.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlockShapePolicy {
    Warn,
    Reject,
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            byte_ceiling: DEFAULT_BYTE_CEILING,
            strip_coverage: StripCoverage::Complete,
            block_shape: BlockShapePolicy::Warn,
            axis_order: DEFAULT_AXIS_ORDER.to_string(),
        }
    }
}

// ── Path helpers ──────────────────────────────────────────────────────────────

fn config_dir() -> PathBuf {
    std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".config"))
        .join("dvid-transfer")
}

fn home_dir() -> PathBuf {
    std::env::var("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("/tmp"))
}

// ── Errors ────────────────────────────────────────────────────────────────────

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {0}: {1}")]
    ReadFailed(PathBuf, std::io::Error),
    #[error("failed to parse {0}: {1}")]
    ParseFailed(PathBuf, toml::de::Error),
    #[error("invalid value for {0}: {1:?}")]
    InvalidEnv(&'static str, String),
}

// ── Loading ───────────────────────────────────────────────────────────────────

impl TransferConfig {
    /// Load config: env vars → file → defaults.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::file_path())
    }

    /// Load from an explicit file, still applying env overrides.
    /// A missing file yields the defaults.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let mut config = if path.exists() {
            let text = std::fs::read_to_string(path)
                .map_err(|e| ConfigError::ReadFailed(path.to_path_buf(), e))?;
            toml::from_str(&text).map_err(|e| ConfigError::ParseFailed(path.to_path_buf(), e))?
        } else {
            TransferConfig::default()
        };
        config.apply_env_overrides()?;
        Ok(config)
    }

    /// Config file path.
    pub fn file_path() -> PathBuf {
        std::env::var("DVID_TRANSFER_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| config_dir().join("config.toml"))
    }

    /// Apply DVID_TRANSFER__* env var overrides.
    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Ok(v) = std::env::var("DVID_TRANSFER__BYTE_CEILING") {
            self.byte_ceiling = parse_ceiling(&v)
                .ok_or(ConfigError::InvalidEnv("DVID_TRANSFER__BYTE_CEILING", v))?;
        }
        if let Ok(v) = std::env::var("DVID_TRANSFER__STRIP_COVERAGE") {
            self.strip_coverage = match v.as_str() {
                "complete" => StripCoverage::Complete,
                "legacy" => StripCoverage::Legacy,
                _ => return Err(ConfigError::InvalidEnv("DVID_TRANSFER__STRIP_COVERAGE", v.clone())),
            };
        }
        if let Ok(v) = std::env::var("DVID_TRANSFER__BLOCK_SHAPE") {
            self.block_shape = match v.as_str() {
                "warn" => BlockShapePolicy::Warn,
                "reject" => BlockShapePolicy::Reject,
                _ => return Err(ConfigError::InvalidEnv("DVID_TRANSFER__BLOCK_SHAPE", v.clone())),
            };
        }
        Ok(())
    }
}

fn parse_ceiling(v: &str) -> Option<u64> {
    v.trim().replace('_', "").parse().ok().filter(|n| *n > 0)
}
