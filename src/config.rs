use crate::types::{Config, CountingMode};
use anyhow::{bail, Context, Result};
use std::fs;
use std::path::Path;

impl Config {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        let config: Config = serde_yaml::from_str(&contents)
            .with_context(|| format!("Failed to parse config {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.source.frame_width == 0 || self.source.frame_height == 0 {
            bail!(
                "frame size must be non-zero (got {}x{})",
                self.source.frame_width,
                self.source.frame_height
            );
        }

        let t = &self.tracking;
        if t.distance_threshold <= 0.0 {
            bail!("tracking.distance_threshold must be positive");
        }
        if t.area_divisor <= 0.0 {
            bail!("tracking.area_divisor must be positive");
        }
        if t.max_history < 2 {
            bail!("tracking.max_history must keep at least 2 positions");
        }

        let c = &self.counting;
        match c.mode {
            CountingMode::SingleLine => {
                if !(0.0..=1.0).contains(&c.line_fraction) {
                    bail!("counting.line_fraction must be within [0, 1]");
                }
            }
            CountingMode::DeadZone => {
                let ordered = 0.0 <= c.up_limit_fraction
                    && c.up_limit_fraction < c.line_up_fraction
                    && c.line_up_fraction < c.line_down_fraction
                    && c.line_down_fraction < c.down_limit_fraction
                    && c.down_limit_fraction <= 1.0;
                if !ordered {
                    bail!(
                        "dead zone needs 0 <= up_limit < line_up < line_down < down_limit <= 1 \
                         (got {:.3}, {:.3}, {:.3}, {:.3})",
                        c.up_limit_fraction,
                        c.line_up_fraction,
                        c.line_down_fraction,
                        c.down_limit_fraction
                    );
                }
            }
        }

        if self.reporting.enabled {
            if self.reporting.url.is_empty() {
                bail!("reporting.url is required when reporting is enabled");
            }
            if self.reporting.every_frames == 0 {
                bail!("reporting.every_frames must be at least 1");
            }
            if self.reporting.max_in_flight == 0 {
                bail!("reporting.max_in_flight must be at least 1");
            }
        }

        if let Some(route) = &self.route {
            if route.stops.is_empty() {
                bail!("route.stops must list at least one stop");
            }
        }

        Ok(())
    }

    pub fn frame_area(&self) -> f32 {
        self.source.frame_width as f32 * self.source.frame_height as f32
    }

    /// Noise floor for blob/box area, scales with resolution
    pub fn min_observation_area(&self) -> f32 {
        self.frame_area() / self.tracking.area_divisor
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const MINIMAL: &str = r#"
source:
  input_dir: recordings
  frame_width: 640
  frame_height: 480
"#;

    #[test]
    fn test_minimal_config_gets_defaults() {
        let config: Config = serde_yaml::from_str(MINIMAL).unwrap();
        config.validate().unwrap();
        assert_eq!(config.tracking.max_age, 15);
        assert_eq!(config.tracking.distance_threshold, 75.0);
        assert_eq!(config.counting.mode, CountingMode::SingleLine);
        assert!(!config.reporting.enabled);
        assert!(config.route.is_none());
    }

    #[test]
    fn test_min_area_scales_with_frame() {
        let config: Config = serde_yaml::from_str(MINIMAL).unwrap();
        assert!((config.min_observation_area() - 640.0 * 480.0 / 500.0).abs() < 1e-3);
    }

    #[test]
    fn test_dead_zone_order_is_validated() {
        let mut config: Config = serde_yaml::from_str(MINIMAL).unwrap();
        config.counting.mode = CountingMode::DeadZone;
        config.validate().unwrap();

        config.counting.line_up_fraction = 0.7;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            "{}tracking:\n  proximity: box_tolerance\n  association: first_match\n",
            MINIMAL
        )
        .unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(
            config.tracking.proximity,
            crate::types::ProximityKind::BoxTolerance
        );
        assert_eq!(
            config.tracking.association,
            crate::types::AssociationPolicy::FirstMatch
        );
    }

    #[test]
    fn test_zero_frame_rejected() {
        let mut config: Config = serde_yaml::from_str(MINIMAL).unwrap();
        config.source.frame_height = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_reporting_needs_an_in_flight_slot() {
        let mut config: Config = serde_yaml::from_str(MINIMAL).unwrap();
        config.reporting.max_in_flight = 0;
        // Only checked when reporting is on
        config.validate().unwrap();

        config.reporting.enabled = true;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("max_in_flight"));
    }
}
