//! Application configuration loaded from an optional TOML file.
//!
//! Every field has a default, so an absent file or an absent section is
//! equivalent to the built-in settings:
//!
//! ```toml
//! [window]
//! width = 800
//! height = 600
//!
//! [renderer]
//! validation = true
//! demo = "two_pipelines"
//!
//! [assets]
//! shader_dir = "assets/shaders"
//! texture = "assets/textures/logo.png"
//! ```

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{Error, Result};
use crate::logging::DEFAULT_LOG_FILTER;

/// Top-level configuration.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub window: WindowConfig,
    pub renderer: RendererConfig,
    pub assets: AssetConfig,
    pub log: LogConfig,
}

/// Initial window settings. The swapchain extent is fixed from these.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct WindowConfig {
    pub width: u32,
    pub height: u32,
    pub title: String,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            width: 800,
            height: 600,
            title: "vkframe".to_string(),
        }
    }
}

/// Which demo scene to build.
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DemoKind {
    /// Indexed, textured quad with one MVP uniform block.
    #[default]
    TexturedQuad,
    /// Two pipelines drawn in one render pass, the second into a half-size viewport.
    TwoPipelines,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct RendererConfig {
    /// Request the Khronos validation layer. Missing layers are fatal when set.
    pub validation: bool,
    pub demo: DemoKind,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            validation: cfg!(debug_assertions),
            demo: DemoKind::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct AssetConfig {
    /// Directory holding the compiled `.spv` files.
    pub shader_dir: PathBuf,
    /// Texture sampled by the textured quad.
    pub texture: PathBuf,
}

impl Default for AssetConfig {
    fn default() -> Self {
        Self {
            shader_dir: PathBuf::from("assets/shaders"),
            texture: PathBuf::from("assets/textures/logo.png"),
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct LogConfig {
    /// Fallback `EnvFilter` directive when `RUST_LOG` is unset.
    pub filter: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            filter: DEFAULT_LOG_FILTER.to_string(),
        }
    }
}

/// Where a loaded [`Config`] came from.
///
/// Loading happens before the log subscriber exists, so the caller reports
/// this once logging is up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    Defaults { missing: PathBuf },
    File(PathBuf),
}

impl fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigSource::Defaults { missing } => {
                write!(f, "built-in defaults (no file at {})", missing.display())
            }
            ConfigSource::File(path) => write!(f, "{}", path.display()),
        }
    }
}

impl Config {
    /// Loads configuration from `path`.
    ///
    /// A missing file yields the defaults. A file that exists but does not
    /// parse is an error.
    pub fn load(path: &Path) -> Result<(Self, ConfigSource)> {
        let text = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let source = ConfigSource::Defaults {
                    missing: path.to_path_buf(),
                };
                return Ok((Self::default(), source));
            }
            Err(e) => return Err(Error::Io(e)),
        };

        let config = Self::from_toml(&text).map_err(|message| Error::Config {
            path: path.to_path_buf(),
            message,
        })?;
        Ok((config, ConfigSource::File(path.to_path_buf())))
    }

    /// Parses configuration from TOML text.
    pub fn from_toml(text: &str) -> std::result::Result<Self, String> {
        toml::from_str(text).map_err(|e| e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.window.width, 800);
        assert_eq!(config.window.height, 600);
        assert_eq!(config.renderer.demo, DemoKind::TexturedQuad);
        assert_eq!(config.renderer.validation, cfg!(debug_assertions));
        assert_eq!(config.log.filter, DEFAULT_LOG_FILTER);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = Config::from_toml(
            r#"
            [window]
            width = 1024

            [renderer]
            demo = "two_pipelines"
            validation = false
            "#,
        )
        .unwrap();

        assert_eq!(config.window.width, 1024);
        assert_eq!(config.window.height, 600);
        assert_eq!(config.renderer.demo, DemoKind::TwoPipelines);
        assert!(!config.renderer.validation);
        assert_eq!(config.assets, AssetConfig::default());
    }

    #[test]
    fn test_empty_toml_is_default() {
        assert_eq!(Config::from_toml("").unwrap(), Config::default());
    }

    #[test]
    fn test_unknown_demo_is_rejected() {
        assert!(Config::from_toml("[renderer]\ndemo = \"cube\"").is_err());
    }

    #[test]
    fn test_missing_file_yields_defaults() {
        let path = std::env::temp_dir().join("vkframe-config-that-does-not-exist.toml");
        let (config, source) = Config::load(&path).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(source, ConfigSource::Defaults { missing: path });
    }

    #[test]
    fn test_loaded_file_reports_its_path() {
        let path = std::env::temp_dir().join(format!("vkframe-good-{}.toml", std::process::id()));
        fs::write(&path, "[window]\nheight = 480\n").unwrap();

        let result = Config::load(&path);
        let _ = fs::remove_file(&path);

        let (config, source) = result.unwrap();
        assert_eq!(config.window.height, 480);
        assert_eq!(source.to_string(), path.display().to_string());
        assert_eq!(source, ConfigSource::File(path));
    }

    #[test]
    fn test_malformed_file_is_config_error() {
        let path = std::env::temp_dir().join(format!("vkframe-bad-{}.toml", std::process::id()));
        fs::write(&path, "[window\nwidth = ").unwrap();

        let result = Config::load(&path);
        let _ = fs::remove_file(&path);

        match result {
            Err(Error::Config { path: p, .. }) => assert_eq!(p, path),
            other => panic!("expected config error, got {:?}", other),
        }
    }
}
