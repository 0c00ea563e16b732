//! Engine configuration
//!
//! Loaded from environment variables with defaults matching the planner's
//! built-in behavior.

use std::path::PathBuf;

use crate::error::{Result, SmartFillError};

/// Smart Fill engine configuration
#[derive(Debug, Clone, PartialEq)]
pub struct SmartFillConfig {
    /// Longest edge of the downsampled analysis bitmap (default: 300)
    pub analysis_size: u32,
    /// Width of the border band used for edge complexity (default: 10)
    pub edge_band: u32,
    /// Pixel stride when sampling the color histogram (default: 4)
    pub sample_step: u32,
    /// Number of suggestions returned for a single frame (default: 10)
    pub suggestion_limit: usize,
    /// Top-N pool the optimizer draws from for alternative solutions (default: 3)
    pub candidate_pool: usize,
    /// Directory of the persistent analysis cache (None = in-memory)
    pub cache_dir: Option<PathBuf>,
    /// Optional parameter file for the on-device face detector
    pub face_model_path: Option<PathBuf>,
}

impl Default for SmartFillConfig {
    fn default() -> Self {
        Self {
            analysis_size: 300,
            edge_band: 10,
            sample_step: 4,
            suggestion_limit: 10,
            candidate_pool: 3,
            cache_dir: None,
            face_model_path: None,
        }
    }
}

impl SmartFillConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();

        let config = Self {
            analysis_size: env_parse("SMARTFILL_ANALYSIS_SIZE").unwrap_or(defaults.analysis_size),
            edge_band: env_parse("SMARTFILL_EDGE_BAND").unwrap_or(defaults.edge_band),
            sample_step: env_parse("SMARTFILL_SAMPLE_STEP").unwrap_or(defaults.sample_step),
            suggestion_limit: env_parse("SMARTFILL_SUGGESTION_LIMIT")
                .unwrap_or(defaults.suggestion_limit),
            candidate_pool: env_parse("SMARTFILL_CANDIDATE_POOL")
                .unwrap_or(defaults.candidate_pool),
            cache_dir: env_path("SMARTFILL_CACHE_DIR"),
            face_model_path: env_path("SMARTFILL_FACE_MODEL"),
        };

        config.validate()?;
        Ok(config)
    }

    /// Reject settings that would make analysis or optimization meaningless.
    pub fn validate(&self) -> Result<()> {
        if self.analysis_size == 0 {
            return Err(SmartFillError::InvalidConfig(
                "analysis_size must be greater than zero".into(),
            ));
        }
        if self.sample_step == 0 {
            return Err(SmartFillError::InvalidConfig(
                "sample_step must be greater than zero".into(),
            ));
        }
        if self.candidate_pool == 0 {
            return Err(SmartFillError::InvalidConfig(
                "candidate_pool must be greater than zero".into(),
            ));
        }
        Ok(())
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.trim().parse().ok())
}

fn env_path(key: &str) -> Option<PathBuf> {
    std::env::var(key)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .map(PathBuf::from)
}
