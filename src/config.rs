use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use chrono::Duration;
use serde::Deserialize;

use crate::data::resample::{parse_rate, Aggregation};
use crate::error::ConfigError;

pub const DEFAULT_DESCRIPTION: &str = "Ship track data converted from GeoCSV.";
pub const DEFAULT_ATTRIBUTION: &str = "Rolling Deck to Repository (R2R) Program; http://www.rvdata.us/";
pub const DEFAULT_MODEL_URL: &str =
    "https://github.com/CreativeTools/3DBenchy/raw/master/Single-part/3DBenchy.stl";

/// Converter settings. Every field has a default, so an empty JSON object
/// (or no file at all) is a valid configuration.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub output_dir: PathBuf,
    pub resample_rate: String,
    pub aggregation: Aggregation,
    /// Overrides the `field_missing` token declared by a GeoCSV header.
    pub missing_token: Option<String>,
    pub description: String,
    pub attribution: String,
    pub author: String,
    pub license: String,
    pub model_url: String,
    pub model_scale: f64,
    /// Trail sample interval in seconds.
    pub trail_sample_interval: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("tmp"),
            resample_rate: "60min".to_string(),
            aggregation: Aggregation::First,
            missing_token: None,
            description: DEFAULT_DESCRIPTION.to_string(),
            attribution: DEFAULT_ATTRIBUTION.to_string(),
            author: "OpenSpace Team".to_string(),
            license: "MIT license".to_string(),
            model_url: DEFAULT_MODEL_URL.to_string(),
            model_scale: 1000.0,
            trail_sample_interval: 60,
        }
    }
}

impl Config {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
        let file = File::open(path)?;
        let reader = BufReader::new(file);

        let config: Config = serde_json::from_reader(reader)?;
        config.validate()?;

        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.rate()?;
        if !(self.model_scale.is_finite() && self.model_scale > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "model_scale must be positive, got {}",
                self.model_scale
            )));
        }
        if self.trail_sample_interval == 0 {
            return Err(ConfigError::Invalid(
                "trail_sample_interval must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }

    pub fn rate(&self) -> Result<Duration, ConfigError> {
        parse_rate(&self.resample_rate).map_err(|e| ConfigError::Invalid(e.to_string()))
    }
}
