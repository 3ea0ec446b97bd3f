//! Runtime-tunable world limits
//!
//! Game-design parameters live in [`crate::consts`]; these are the knobs a
//! host may want to change per level, stored as JSON.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::SimResult;

/// World limits and camera tuning
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    // === Population ===
    /// Entities per world, the player included
    pub max_entities: usize,
    /// Live schools per world
    pub max_schools: usize,

    // === Camera ===
    /// Pixels kept between the player and the edge of the viewport
    pub viewport_margin: i32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            max_entities: 101,
            max_schools: 10,
            viewport_margin: 200,
        }
    }
}

impl Settings {
    /// Parse settings; missing fields keep their defaults
    pub fn from_json(json: &str) -> SimResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> SimResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Load settings from a file, falling back to the defaults
    pub fn load(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(json) => match Self::from_json(&json) {
                Ok(settings) => {
                    log::info!("Loaded settings from {}", path.display());
                    return settings;
                }
                Err(e) => log::warn!("Ignoring {}: {e}", path.display()),
            },
            Err(e) => log::debug!("No settings at {}: {e}", path.display()),
        }
        log::info!("Using default settings");
        Self::default()
    }

    /// Write settings to a file as pretty-printed JSON
    pub fn save(&self, path: &Path) -> std::io::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        log::info!("Settings saved to {}", path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.max_entities, 101);
        assert_eq!(settings.max_schools, 10);
        assert_eq!(settings.viewport_margin, 200);
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let settings = Settings::from_json(r#"{ "max_schools": 3 }"#).unwrap();
        assert_eq!(settings.max_schools, 3);
        assert_eq!(settings.max_entities, 101);
    }

    #[test]
    fn test_json_round_trip() {
        let settings = Settings {
            viewport_margin: 50,
            ..Settings::default()
        };
        let back = Settings::from_json(&settings.to_json().unwrap()).unwrap();
        assert_eq!(back, settings);
    }

    #[test]
    fn test_bad_json_is_a_precondition() {
        let err = Settings::from_json("{ max_schools: }").unwrap_err();
        assert_eq!(err.class(), crate::ErrorClass::Precondition);
    }

    #[test]
    fn test_missing_file_falls_back() {
        let settings = Settings::load(Path::new("/nonexistent/jumping-alien.json"));
        assert_eq!(settings, Settings::default());
    }
}
