/// Viewer settings read from an optional TOML file
use std::path::{Path, PathBuf};

use meshprep_core::LoadOptions;
use serde::Deserialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("cannot read config '{}': {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config '{}': {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// Continuous rotation applied every frame, in radians
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct SpinRates {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Default for SpinRates {
    fn default() -> Self {
        Self {
            x: 0.01,
            y: 0.015,
            z: 0.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    pub load: LoadOptions,
    pub fps: u32,
    pub spin: SpinRates,
    pub camera_distance: f32,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            load: LoadOptions::default(),
            fps: 30,
            spin: SpinRates::default(),
            camera_distance: 5.0,
        }
    }
}

impl ViewerConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn parse(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use meshprep_core::IndexWalk;
    use std::io::Write;

    #[test]
    fn test_empty_config_is_default() {
        assert_eq!(ViewerConfig::parse("").unwrap(), ViewerConfig::default());
    }

    #[test]
    fn test_partial_config() {
        let config = ViewerConfig::parse(
            r#"
            fps = 60

            [load]
            flip_v = true

            [load.tangents]
            walk = "triangles"

            [spin]
            y = 0.5
            "#,
        )
        .unwrap();

        assert_eq!(config.fps, 60);
        assert!(config.load.flip_v);
        assert!(config.load.load_textures);
        assert_eq!(config.load.tangents.walk, IndexWalk::Triangles);
        assert!((config.load.tangents.degenerate_epsilon - 1e-12).abs() < 1e-15);
        assert!((config.spin.y - 0.5).abs() < 1e-6);
        assert!((config.spin.x - 0.01).abs() < 1e-6);
        assert!((config.camera_distance - 5.0).abs() < 1e-6);
    }

    #[test]
    fn test_load_errors_name_the_file() {
        let missing = ViewerConfig::load(Path::new("/no/such/viewer.toml")).unwrap_err();
        assert!(matches!(missing, ConfigError::Read { .. }));
        assert!(missing.to_string().contains("viewer.toml"));

        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "fps = \"fast\"").unwrap();
        let invalid = ViewerConfig::load(file.path()).unwrap_err();
        assert!(matches!(invalid, ConfigError::Parse { .. }));
    }
}
