use std::{
    fs::File,
    io::{BufReader, BufWriter},
    path::{Path, PathBuf},
};

use log::info;
use serde::{Deserialize, Serialize};

use crate::{HudError, postfx::CrtParams, scheduler::SchedulerConfig, telemetry::SimConfig};

const APP_DIR_NAME: &str = "telehud";
const CONFIG_FILE_NAME: &str = "config.json";

pub const DEFAULT_SURFACE_WIDTH: usize = 512;
pub const DEFAULT_SURFACE_HEIGHT: usize = 512;

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    pub simulation: SimConfig,
    pub scheduler: SchedulerConfig,
    pub crt: CrtParams,
    /// Program id or index; the first registered program when unset
    pub program: Option<String>,
    pub surface_width: usize,
    pub surface_height: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            simulation: SimConfig::default(),
            scheduler: SchedulerConfig::default(),
            crt: CrtParams::default(),
            program: None,
            surface_width: DEFAULT_SURFACE_WIDTH,
            surface_height: DEFAULT_SURFACE_HEIGHT,
        }
    }
}

impl AppConfig {
    pub fn default_path() -> Result<PathBuf, HudError> {
        Ok(dirs::config_dir()
            .ok_or(HudError::NoConfigDir)?
            .join(APP_DIR_NAME)
            .join(CONFIG_FILE_NAME))
    }

    /// Loads the user's config file, `None` if there isn't one yet.
    pub fn from_local_file() -> Result<Option<Self>, HudError> {
        let Some(config_dir) = dirs::config_dir() else {
            return Ok(None);
        };
        let config_path = config_dir.join(APP_DIR_NAME).join(CONFIG_FILE_NAME);
        if !config_path.exists() {
            return Ok(None);
        }
        Self::from_path(&config_path).map(Some)
    }

    pub fn from_path(path: &Path) -> Result<Self, HudError> {
        let file = File::open(path).map_err(|e| HudError::ConfigIOError { source: e })?;
        let config: Self = serde_json::from_reader(BufReader::new(file))
            .map_err(|e| HudError::ConfigSerializeError { source: e })?;
        info!("Loaded config from {}", path.display());
        Ok(config)
    }

    pub fn save(&self) -> Result<(), HudError> {
        self.save_to(&Self::default_path()?)
    }

    /// Saves to `path`, or to the user config file when there is none.
    pub fn save_at(&self, path: Option<&Path>) -> Result<(), HudError> {
        match path {
            Some(path) => self.save_to(path),
            None => self.save(),
        }
    }

    pub fn save_to(&self, path: &Path) -> Result<(), HudError> {
        if let Some(parent) = path.parent().filter(|p| !p.exists()) {
            std::fs::create_dir_all(parent).map_err(|e| HudError::ConfigIOError { source: e })?;
        }
        let file = File::create(path).map_err(|e| HudError::ConfigIOError { source: e })?;
        serde_json::to_writer_pretty(BufWriter::new(file), self)
            .map_err(|e| HudError::ConfigSerializeError { source: e })
    }

    /// Runs every range and parameter check up front so a bad file fails at startup.
    pub fn validate(&self) -> Result<(), HudError> {
        if self.surface_width == 0 || self.surface_height == 0 {
            return Err(HudError::InvalidSurface {
                width: self.surface_width,
                height: self.surface_height,
            });
        }
        self.simulation.validate()?;
        self.scheduler.validate()?;
        self.crt.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::telemetry::TelemetryRanges;
    use tempfile::tempdir;

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");
        let config = AppConfig {
            program: Some("orbital_dock".to_string()),
            surface_width: 256,
            scheduler: SchedulerConfig {
                interval_override_ms: Some(40),
                ..SchedulerConfig::default()
            },
            ..AppConfig::default()
        };

        config.save_to(&path).unwrap();
        let loaded = AppConfig::from_path(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_save_at_explicit_path() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("custom.json");
        AppConfig::default().save_to(&path).unwrap();
        let mut config = AppConfig::from_path(&path).unwrap();
        config.program = Some("nav_grid".to_string());
        config.save_at(Some(&path)).unwrap();

        let reloaded = AppConfig::from_path(&path).unwrap();
        assert_eq!(reloaded.program.as_deref(), Some("nav_grid"));
        // ranges are stored as configured, never fitted to the surface
        assert_eq!(reloaded.simulation.ranges, TelemetryRanges::default());
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"program": "3", "simulation": {"seed": 7}}"#).unwrap();

        let loaded = AppConfig::from_path(&path).unwrap();
        assert_eq!(loaded.program.as_deref(), Some("3"));
        assert_eq!(loaded.simulation.seed, 7);
        assert_eq!(loaded.simulation.stale_after_ms, 2000);
        assert_eq!(loaded.surface_width, DEFAULT_SURFACE_WIDTH);
        assert!(loaded.validate().is_ok());
    }

    #[test]
    fn test_malformed_file_is_an_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert!(matches!(
            AppConfig::from_path(&path),
            Err(HudError::ConfigSerializeError { .. })
        ));
        assert!(matches!(
            AppConfig::from_path(&dir.path().join("missing.json")),
            Err(HudError::ConfigIOError { .. })
        ));
    }

    #[test]
    fn test_validate_catches_inverted_range() {
        let mut config = AppConfig::default();
        config.simulation.ranges.energy_level.min = 300.;
        let err = config.validate().unwrap_err();
        assert!(matches!(err, HudError::InvalidRange { .. }));
        assert!(err.is_fatal());
    }

    #[test]
    fn test_validate_catches_bad_surface_and_scheduler() {
        let config = AppConfig {
            surface_height: 0,
            ..AppConfig::default()
        };
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.scheduler.attract_factor = 1;
        assert!(config.validate().is_err());
    }
}
