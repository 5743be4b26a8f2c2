//! Material system settings.
//!
//! Loaded from a TOML file; missing fields take their defaults and an unreadable
//! file falls back to defaults entirely.

use std::fs;
use std::io::{self, Read as _};
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Default file name for settings.
pub const SETTINGS_FILE: &str = "ember_material.toml";

/// When pending structural edits are reconciled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlushPolicy {
    /// The owner calls `MaterialServer::flush` once per tick.
    #[default]
    Manual,
    /// Reading a pending instance's bound handle flushes first.
    OnRead,
}

/// Runtime settings for a material server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MaterialSettings {
    // === Scheduling ===
    /// Flush policy
    pub flush_policy: FlushPolicy,

    // === Diagnostics ===
    /// Trace the generated source of every compile
    pub log_generated_source: bool,
    /// Warn when live variants exceed this count (0 disables)
    pub variant_warning_threshold: usize,
    /// Default directive for [`crate::logging::init`]
    pub log_filter: String,
}

impl Default for MaterialSettings {
    fn default() -> Self {
        Self {
            flush_policy: FlushPolicy::Manual,
            log_generated_source: false,
            variant_warning_threshold: 64,
            log_filter: "ember=info".to_string(),
        }
    }
}

impl MaterialSettings {
    /// Upper bound for the variant warning threshold.
    pub const MAX_VARIANT_WARNING_THRESHOLD: usize = 1 << 16;

    /// Loads settings from `path`, falling back to defaults.
    #[must_use]
    pub fn load_from<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();

        if !path.exists() {
            info!("Material settings not found, using defaults");
            return Self::default();
        }

        let mut contents = String::new();
        if let Err(e) = fs::File::open(path).and_then(|mut file| file.read_to_string(&mut contents))
        {
            warn!("Failed to read material settings: {e}");
            return Self::default();
        }

        match toml::from_str::<Self>(&contents) {
            Ok(mut settings) => {
                settings.validate();
                info!("Loaded material settings from {}", path.display());
                settings
            },
            Err(e) => {
                warn!("Failed to parse material settings: {e}");
                Self::default()
            },
        }
    }

    /// Saves settings to `path`, creating parent directories.
    pub fn save_to<P: AsRef<Path>>(&self, path: P) -> io::Result<()> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        fs::write(path, contents)?;

        info!("Saved material settings to {}", path.display());
        Ok(())
    }

    /// Clamps values into their supported ranges.
    pub fn validate(&mut self) {
        self.variant_warning_threshold = self
            .variant_warning_threshold
            .min(Self::MAX_VARIANT_WARNING_THRESHOLD);

        if self.log_filter.trim().is_empty() {
            self.log_filter = Self::default().log_filter;
        }
    }
}
