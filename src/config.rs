use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use anyhow::{Result, anyhow};
use log::{info, warn};

use crate::utils::{
    DEFAULT_BAUD_RATE, END_SENTINEL, FFT_SIZE, PAYLOAD_PREFIX, SAMPLE_RATE, START_SENTINEL,
    WATERFALL_DEPTH, WINDOW_HEIGHT, WINDOW_WIDTH,
};

/// Which edge of the waterfall receives the newest row.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum NewestEdge {
    Top,
    Bottom,
}

/// Curve applied to normalized magnitudes before color mapping.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum IntensityScale {
    Linear,
    Sqrt,  // Lifts quiet bins, matches the firmware viewer
}

impl IntensityScale {
    pub fn apply(self, normalized: f32) -> f32 {
        match self {
            IntensityScale::Linear => normalized,
            IntensityScale::Sqrt => normalized.max(0.0).sqrt(),
        }
    }
}

/// Line framing used by the device.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Framing {
    pub start_sentinel: String,
    pub end_sentinel: String,
    pub payload_prefix: Option<String>,
}

impl Default for Framing {
    fn default() -> Self {
        Self {
            start_sentinel: START_SENTINEL.to_string(),
            end_sentinel: END_SENTINEL.to_string(),
            payload_prefix: Some(PAYLOAD_PREFIX.to_string()),
        }
    }
}

// Every value the viewer reads at startup
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct ViewerConfig {
    pub sample_rate: f32,
    pub fft_size: usize,
    pub baud_rate: u32,
    pub framing: Framing,

    // Waterfall
    pub waterfall_depth: usize,
    pub waterfall_width: Option<usize>,  // None keeps one column per bin
    pub newest_at: NewestEdge,
    pub intensity: IntensityScale,

    // Window
    pub window_width: f32,
    pub window_height: f32,
    pub repaint_interval_ms: u64,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            sample_rate: SAMPLE_RATE,
            fft_size: FFT_SIZE,
            baud_rate: DEFAULT_BAUD_RATE,
            framing: Framing::default(),
            waterfall_depth: WATERFALL_DEPTH,
            waterfall_width: None,
            newest_at: NewestEdge::Top,
            intensity: IntensityScale::Linear,
            window_width: WINDOW_WIDTH,
            window_height: WINDOW_HEIGHT,
            repaint_interval_ms: 16,
        }
    }
}

impl ViewerConfig {
    /// Loads the config at `file_path`, writing the defaults there first if
    /// the file does not exist yet.
    pub fn load_or_create(file_path: &Path) -> Result<Self> {
        let config = if file_path.exists() {
            info!("Loading viewer config from {}", file_path.display());
            let yaml_str = fs::read_to_string(file_path)?;
            serde_yaml::from_str::<ViewerConfig>(&yaml_str)
                .map_err(|e| anyhow!("Failed to parse {}: {}", file_path.display(), e))?
        } else {
            info!("No config file found at {}. Creating it with defaults.", file_path.display());
            let config = ViewerConfig::default();
            config.save(file_path)?;
            config
        };

        config.validate()?;
        Ok(config)
    }

    pub fn save(&self, file_path: &Path) -> Result<()> {
        let yaml_str = serde_yaml::to_string(self)?;
        fs::write(file_path, yaml_str)?;
        info!("Viewer config saved to {}", file_path.display());
        Ok(())
    }

    /// Number of magnitudes in one frame.
    pub fn bin_count(&self) -> usize {
        self.fft_size / 2
    }

    pub fn waterfall_columns(&self) -> usize {
        self.waterfall_width.unwrap_or_else(|| self.bin_count())
    }

    pub fn validate(&self) -> Result<()> {
        if self.fft_size < 2 || self.fft_size % 2 != 0 {
            return Err(anyhow!("fft_size must be an even number >= 2, got {}", self.fft_size));
        }
        if !(self.sample_rate > 0.0) {
            return Err(anyhow!("sample_rate must be positive, got {}", self.sample_rate));
        }
        if self.baud_rate == 0 {
            return Err(anyhow!("baud_rate must be non-zero"));
        }
        if self.waterfall_depth == 0 || self.waterfall_columns() == 0 {
            return Err(anyhow!(
                "waterfall must be at least 1x1, got {}x{}",
                self.waterfall_columns(),
                self.waterfall_depth
            ));
        }

        let framing = &self.framing;
        if framing.start_sentinel.trim().is_empty() || framing.end_sentinel.trim().is_empty() {
            return Err(anyhow!("sentinels must not be empty"));
        }
        if framing.start_sentinel == framing.end_sentinel {
            return Err(anyhow!(
                "start and end sentinels must differ (both are '{}')",
                framing.start_sentinel
            ));
        }
        if let Some(prefix) = &framing.payload_prefix {
            if prefix.is_empty() {
                warn!("Empty payload prefix configured; it has no effect.");
            }
        }

        Ok(())
    }
}

/// Default location of the config file, next to the working directory.
pub fn default_config_path() -> PathBuf {
    PathBuf::from("fft_waterfall.yaml")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_is_created_with_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("viewer.yaml");

        let config = ViewerConfig::load_or_create(&path).unwrap();
        assert_eq!(config, ViewerConfig::default());
        assert!(path.exists());
        assert_eq!(config.bin_count(), 512);
        assert_eq!(config.waterfall_columns(), 512);
    }

    #[test]
    fn partial_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("viewer.yaml");
        fs::write(&path, "waterfall_depth: 120\nnewest_at: bottom\nintensity: sqrt\n").unwrap();

        let config = ViewerConfig::load_or_create(&path).unwrap();
        assert_eq!(config.waterfall_depth, 120);
        assert_eq!(config.newest_at, NewestEdge::Bottom);
        assert_eq!(config.intensity, IntensityScale::Sqrt);
        assert_eq!(config.framing, Framing::default());
    }

    #[test]
    fn identical_sentinels_are_rejected() {
        let mut config = ViewerConfig::default();
        config.framing.end_sentinel = config.framing.start_sentinel.clone();
        assert!(config.validate().is_err());
    }

    #[test]
    fn odd_fft_size_is_rejected() {
        let config = ViewerConfig { fft_size: 1023, ..ViewerConfig::default() };
        assert!(config.validate().is_err());
    }
}
