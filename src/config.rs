//! Configuration Module - Engine tuning from a TOML file
//!
//! Supports:
//! - Carved size bounds and fallback scan windows
//! - Anomaly detector thresholds and result caps
//! - Cancellation polling and carve copy budget
//! - Log level

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::error::EngineError;

const MIB: u64 = 1024 * 1024;

/// Carvex engine configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// General settings
    pub general: GeneralConfig,
    /// Carving engine settings
    pub carving: CarvingConfig,
    /// Anomaly detector settings
    pub anomaly: AnomalyConfig,
}

/// General engine settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log level: trace, debug, info, warn, error
    pub log_level: String,
    /// Run the independent anomaly passes on the rayon pool
    pub parallel_anomaly_passes: bool,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            parallel_anomaly_passes: true,
        }
    }
}

/// Carving engine settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CarvingConfig {
    /// Smallest carved file accepted (bytes)
    pub min_file_size: u64,
    /// Largest carved file accepted (bytes)
    pub max_file_size: u64,
    /// Forward window searched for the next signature when a format has no exact end
    pub fallback_window: u64,
    /// Bytes skipped past the start before the next-signature search begins
    pub fallback_skip: u64,
    /// Same as `fallback_skip`, for PE images
    pub pe_fallback_skip: u64,
    /// Upper bound (exclusive) on a PE `SizeOfImage` taken as the file length
    pub pe_max_image_size: u64,
    /// Number of leading bytes rendered in each hex preview
    pub hex_preview_len: usize,
    /// Total bytes copied into carved files before carving stops
    pub max_total_carved_bytes: u64,
    /// Cursor steps between cancellation checks
    pub cancel_check_interval: u64,
}

impl Default for CarvingConfig {
    fn default() -> Self {
        Self {
            min_file_size: 10,
            max_file_size: 50 * MIB,
            fallback_window: 10 * MIB,
            fallback_skip: 100,
            pe_fallback_skip: 1024,
            pe_max_image_size: 100 * MIB,
            hex_preview_len: 64,
            max_total_carved_bytes: 512 * MIB,
            cancel_check_interval: 65_536,
        }
    }
}

/// Anomaly detector settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnomalyConfig {
    /// Leading bytes probed for polyglot signatures
    pub polyglot_window: usize,
    /// Signatures past offset 0 must start beyond this offset to count
    pub polyglot_min_offset: usize,
    /// Trailing bytes past the last PE section needed to report an overlay
    pub overlay_threshold: u64,
    /// Maximum PE section headers walked
    pub max_pe_sections: usize,
    /// Block size for the entropy scan
    pub entropy_block_size: usize,
    /// Shannon entropy above which a block is flagged
    pub entropy_threshold: f64,
    /// Maximum high-entropy regions reported
    pub max_entropy_regions: usize,
    /// Minimum run length of a base64 candidate
    pub min_base64_len: usize,
    /// Minimum run of 0x00 bytes reported as a gap
    pub min_gap_len: usize,
    /// Maximum gaps reported
    pub max_gaps: usize,
    /// Maximum entries kept per string category
    pub max_reported_strings: usize,
}

impl Default for AnomalyConfig {
    fn default() -> Self {
        Self {
            polyglot_window: 4096,
            polyglot_min_offset: 512,
            overlay_threshold: 1024,
            max_pe_sections: 20,
            entropy_block_size: 1024,
            entropy_threshold: 7.5,
            max_entropy_regions: 20,
            min_base64_len: 20,
            min_gap_len: 64,
            max_gaps: 10,
            max_reported_strings: 50,
        }
    }
}

impl EngineConfig {
    /// Load config from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config: {}", path.display()))?;

        let config: EngineConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config: {}", path.display()))?;

        config.validate()?;
        Ok(config)
    }

    /// Save config to a specific path
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;

        fs::write(path, content)
            .with_context(|| format!("Failed to write config: {}", path.display()))?;

        Ok(())
    }

    /// Reject settings the scan loops cannot honor
    pub fn validate(&self) -> std::result::Result<(), EngineError> {
        let c = &self.carving;
        if c.min_file_size > c.max_file_size {
            return Err(EngineError::Config(format!(
                "min_file_size ({}) exceeds max_file_size ({})",
                c.min_file_size, c.max_file_size
            )));
        }
        if c.cancel_check_interval == 0 {
            return Err(EngineError::Config(
                "cancel_check_interval must be non-zero".to_string(),
            ));
        }
        if self.anomaly.entropy_block_size == 0 {
            return Err(EngineError::Config(
                "entropy_block_size must be non-zero".to_string(),
            ));
        }
        if self.anomaly.min_gap_len == 0 {
            return Err(EngineError::Config("min_gap_len must be non-zero".to_string()));
        }
        Ok(())
    }
}

/// Generate a sample config file with comments
pub fn generate_sample_config() -> String {
    r#"# Carvex Engine Configuration

[general]
# Log level: trace, debug, info, warn, error
log_level = "info"

# Run polyglot/overlay/hidden-data/gap passes in parallel
parallel_anomaly_passes = true

[carving]
# Accepted carved size range (bytes)
min_file_size = 10
max_file_size = 52428800

# Next-signature search window for formats without an exact end (10 MiB)
fallback_window = 10485760

# Bytes skipped before the next-signature search (PE images skip further)
fallback_skip = 100
pe_fallback_skip = 1024

# PE SizeOfImage is trusted only below this bound (100 MiB)
pe_max_image_size = 104857600

# Leading bytes shown in each hex preview
hex_preview_len = 64

# Stop carving once this many bytes have been copied (512 MiB)
max_total_carved_bytes = 536870912

# Poll the cancel flag every N cursor steps
cancel_check_interval = 65536

[anomaly]
polyglot_window = 4096
polyglot_min_offset = 512
overlay_threshold = 1024
max_pe_sections = 20
entropy_block_size = 1024
entropy_threshold = 7.5
max_entropy_regions = 20
min_base64_len = 20
min_gap_len = 64
max_gaps = 10
max_reported_strings = 50
"#
    .to_string()
}
