//! Puzzle configuration surface.
//!
//! Every field has a default, so a partial document is valid:
//!
//! ```xml
//! <PuzzleConfig>
//!   <num_pieces>100</num_pieces>
//!   <rotation_snap_threshold>5</rotation_snap_threshold>
//! </PuzzleConfig>
//! ```

use quick_xml::de::from_str;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::assembly::FitThresholds;

#[derive(Debug, Error)]
pub enum ConfigError {
    /// The XML document could not be deserialized.
    #[error("XML parse error: {0}")]
    Xml(#[from] quick_xml::DeError),
    #[error("invalid `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PuzzleConfig {
    pub num_pieces: usize,
    /// Length of the puzzle's bounding-box diagonal.
    pub scale: f64,
    pub thickness: f64,
    /// Spline precision for visual solids.
    pub mesh_detail: usize,
    /// Spline precision for collision solids.
    pub collider_detail: usize,
    /// Degrees.
    pub rotation_snap_threshold: f64,
    pub position_snap_threshold: f64,
    /// Grace delay before an emptied cluster is removed.
    pub teardown_delay_ms: u64,
    pub noise_seed: u64,
    pub noise_width: u32,
    pub noise_height: u32,
}

impl Default for PuzzleConfig {
    fn default() -> Self {
        Self {
            num_pieces: 25,
            scale: 10.0,
            thickness: 0.1,
            mesh_detail: 20,
            collider_detail: 6,
            rotation_snap_threshold: 7.0,
            position_snap_threshold: 0.1,
            teardown_delay_ms: 1000,
            noise_seed: 0,
            noise_width: 64,
            noise_height: 64,
        }
    }
}

impl PuzzleConfig {
    /// Parse and validate a configuration document.
    pub fn from_xml_str(input: &str) -> Result<Self, ConfigError> {
        let config: Self = from_str(input)?;
        config.validate()?;
        log::debug!("loaded puzzle config: {config:?}");
        Ok(config)
    }

    /// Same configuration with a different piece count.
    #[must_use]
    pub fn with_num_pieces(mut self, num_pieces: usize) -> Self {
        self.num_pieces = num_pieces;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.num_pieces == 0 {
            return Err(invalid("num_pieces", "must be at least 1"));
        }
        positive("scale", self.scale)?;
        positive("thickness", self.thickness)?;
        if self.mesh_detail == 0 {
            return Err(invalid("mesh_detail", "must be at least 1"));
        }
        if self.collider_detail == 0 {
            return Err(invalid("collider_detail", "must be at least 1"));
        }
        non_negative("rotation_snap_threshold", self.rotation_snap_threshold)?;
        non_negative("position_snap_threshold", self.position_snap_threshold)?;
        if self.noise_width == 0 || self.noise_height == 0 {
            return Err(invalid("noise_width", "noise field must not be empty"));
        }
        Ok(())
    }

    #[must_use]
    pub fn fit_thresholds(&self) -> FitThresholds {
        FitThresholds {
            rotation_deg: self.rotation_snap_threshold,
            position: self.position_snap_threshold,
        }
    }
}

fn invalid(field: &'static str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        field,
        reason: reason.into(),
    }
}

fn positive(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(invalid(field, format!("must be finite and positive, got {value}")))
    }
}

fn non_negative(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(invalid(field, format!("must be finite and non-negative, got {value}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_document_keeps_defaults() {
        let xml = r"<PuzzleConfig>
            <num_pieces>100</num_pieces>
            <rotation_snap_threshold>5.5</rotation_snap_threshold>
        </PuzzleConfig>";
        let config = PuzzleConfig::from_xml_str(xml).unwrap();
        assert_eq!(config.num_pieces, 100);
        assert_eq!(config.rotation_snap_threshold, 5.5);
        assert_eq!(config.scale, 10.0);
        assert_eq!(config.collider_detail, 6);
        assert_eq!(config.teardown_delay_ms, 1000);
    }

    #[test]
    fn test_invalid_values_are_reported_by_field() {
        let xml = "<PuzzleConfig><thickness>-1</thickness></PuzzleConfig>";
        match PuzzleConfig::from_xml_str(xml) {
            Err(ConfigError::Invalid { field, .. }) => assert_eq!(field, "thickness"),
            other => panic!("expected invalid thickness, got {other:?}"),
        }

        let config = PuzzleConfig::default().with_num_pieces(0);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid { field: "num_pieces", .. })
        ));
    }

    #[test]
    fn test_malformed_xml_is_an_xml_error() {
        let xml = "<PuzzleConfig><num_pieces>many</num_pieces></PuzzleConfig>";
        assert!(matches!(PuzzleConfig::from_xml_str(xml), Err(ConfigError::Xml(_))));
    }

    #[test]
    fn test_fit_thresholds_follow_config() {
        let thresholds = PuzzleConfig::default().fit_thresholds();
        assert_eq!(thresholds.rotation_deg, 7.0);
        assert_eq!(thresholds.position, 0.1);
    }
}
