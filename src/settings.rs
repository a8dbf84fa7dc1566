//! Layered program settings.
//!
//! Built-in defaults are overridden by an optional `Settings` file in the working
//! directory, which is in turn overridden by `TRIANGLE_*` environment variables
//! (`TRIANGLE_DISPLAY__WIDTH=800` sets `display.width`).

use config::{Config, ConfigError, Environment, File};
use std::{convert::TryFrom, path::PathBuf, str::FromStr};

pub const SETTINGS_FILE: &str = "Settings";
const ENV_PREFIX: &str = "TRIANGLE";

#[derive(Debug, Clone, PartialEq)]
pub struct DisplaySettings {
    pub width: u32,
    pub height: u32,
    pub title: String,
    /// Frames per second the loop is paced to. 0 disables pacing.
    pub target_frame_rate: u32,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ProjectionMode {
    Identity,
    Perspective,
}

impl FromStr for ProjectionMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "identity" => Ok(ProjectionMode::Identity),
            "perspective" => Ok(ProjectionMode::Perspective),
            other => Err(ConfigError::Message(format!(
                "unknown projection mode `{}` (expected `identity` or `perspective`)",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProjectionSettings {
    pub mode: ProjectionMode,
    /// Vertical field of view, in degrees.
    pub field_of_view: f32,
    pub near_plane: f32,
    pub far_plane: f32,
    pub camera_distance: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ShaderSettings {
    pub vertex: PathBuf,
    pub fragment: PathBuf,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub display: DisplaySettings,
    pub projection: ProjectionSettings,
    pub shaders: ShaderSettings,
    /// `env_logger` filter directives. `RUST_LOG` is used when unset.
    pub log_filter: Option<String>,
}

impl Settings {
    /// Loads defaults, then `name.*` if present, then the environment.
    pub fn load(name: &str) -> Result<Settings, ConfigError> {
        Settings::load_layers(name, ENV_PREFIX)
    }

    fn load_layers(name: &str, env_prefix: &str) -> Result<Settings, ConfigError> {
        let mut cfg = Config::default();
        set_defaults(&mut cfg)?;
        cfg.merge(File::with_name(name).required(false))?;
        cfg.merge(Environment::with_prefix(env_prefix).separator("__"))?;
        Settings::from_config(&cfg)
    }

    pub fn from_config(cfg: &Config) -> Result<Settings, ConfigError> {
        let settings = Settings {
            display: DisplaySettings {
                width: get_u32(cfg, "display.width")?,
                height: get_u32(cfg, "display.height")?,
                title: cfg.get::<String>("display.title")?,
                target_frame_rate: get_u32(cfg, "display.target_frame_rate")?,
            },
            projection: ProjectionSettings {
                mode: cfg.get::<String>("projection.mode")?.parse()?,
                field_of_view: cfg.get::<f32>("projection.field_of_view")?,
                near_plane: cfg.get::<f32>("projection.near_plane")?,
                far_plane: cfg.get::<f32>("projection.far_plane")?,
                camera_distance: cfg.get::<f32>("projection.camera_distance")?,
            },
            shaders: ShaderSettings {
                vertex: PathBuf::from(cfg.get::<String>("shaders.vertex")?),
                fragment: PathBuf::from(cfg.get::<String>("shaders.fragment")?),
            },
            log_filter: cfg.get::<String>("log.filter").ok(),
        };
        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.display.width == 0 || self.display.height == 0 {
            return Err(ConfigError::Message(format!(
                "display size must be non-zero, got {}x{}",
                self.display.width, self.display.height
            )));
        }
        let p = &self.projection;
        if p.mode == ProjectionMode::Perspective {
            if !(p.field_of_view > 0.0 && p.field_of_view < 180.0) {
                return Err(ConfigError::Message(format!(
                    "field of view must be within (0, 180) degrees, got {}",
                    p.field_of_view
                )));
            }
            if !(p.near_plane > 0.0 && p.near_plane < p.far_plane) {
                return Err(ConfigError::Message(format!(
                    "clip planes must satisfy 0 < near < far, got near={} far={}",
                    p.near_plane, p.far_plane
                )));
            }
        }
        Ok(())
    }
}

/// `config` casts integers to `u32` with `as`, so negative values would wrap.
fn get_u32(cfg: &Config, key: &str) -> Result<u32, ConfigError> {
    let value = cfg.get::<i64>(key)?;
    u32::try_from(value).map_err(|_| {
        ConfigError::Message(format!(
            "`{}` must be between 0 and {}, got {}",
            key,
            u32::max_value(),
            value
        ))
    })
}

pub fn set_defaults(cfg: &mut Config) -> Result<(), ConfigError> {
    cfg.set_default("display.width", 1280i64)?;
    cfg.set_default("display.height", 720i64)?;
    cfg.set_default("display.title", "Intro to Shaders")?;
    cfg.set_default("display.target_frame_rate", 60i64)?;
    cfg.set_default("projection.mode", "identity")?;
    cfg.set_default("projection.field_of_view", 65.0f64)?;
    cfg.set_default("projection.near_plane", 0.001f64)?;
    cfg.set_default("projection.far_plane", 100.0f64)?;
    cfg.set_default("projection.camera_distance", 1.5f64)?;
    cfg.set_default("shaders.vertex", "shaders/triangle.vert")?;
    cfg.set_default("shaders.fragment", "shaders/triangle.frag")?;
    Ok(())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    use std::{env, fs};

    fn defaults() -> Config {
        let mut cfg = Config::default();
        set_defaults(&mut cfg).unwrap();
        cfg
    }

    pub(crate) fn default_settings() -> Settings {
        Settings::from_config(&defaults()).unwrap()
    }

    #[test]
    fn defaults_match_the_documented_constants() {
        let settings = default_settings();
        assert_eq!(settings.display.width, 1280);
        assert_eq!(settings.display.height, 720);
        assert_eq!(settings.display.title, "Intro to Shaders");
        assert_eq!(settings.display.target_frame_rate, 60);
        assert_eq!(settings.projection.mode, ProjectionMode::Identity);
        assert_eq!(settings.projection.field_of_view, 65.0);
        assert_eq!(settings.projection.near_plane, 0.001);
        assert_eq!(settings.projection.far_plane, 100.0);
        assert_eq!(settings.shaders.vertex, PathBuf::from("shaders/triangle.vert"));
        assert_eq!(settings.shaders.fragment, PathBuf::from("shaders/triangle.frag"));
        assert_eq!(settings.log_filter, None);
    }

    #[test]
    fn overrides_take_precedence() {
        let mut cfg = defaults();
        cfg.set("display.width", 800i64).unwrap();
        cfg.set("display.title", "triangle").unwrap();
        cfg.set("projection.mode", "Perspective").unwrap();
        cfg.set("log.filter", "debug").unwrap();
        let settings = Settings::from_config(&cfg).unwrap();
        assert_eq!(settings.display.width, 800);
        assert_eq!(settings.display.height, 720);
        assert_eq!(settings.display.title, "triangle");
        assert_eq!(settings.projection.mode, ProjectionMode::Perspective);
        assert_eq!(settings.log_filter.as_deref(), Some("debug"));
    }

    #[test]
    fn unknown_projection_mode_is_rejected() {
        let mut cfg = defaults();
        cfg.set("projection.mode", "orthographic").unwrap();
        let err = Settings::from_config(&cfg).unwrap_err();
        assert!(err.to_string().contains("orthographic"));
    }

    #[test]
    fn zero_sized_display_is_rejected() {
        let mut cfg = defaults();
        cfg.set("display.height", 0i64).unwrap();
        assert!(Settings::from_config(&cfg).is_err());
    }

    #[test]
    fn perspective_planes_are_checked_only_in_perspective_mode() {
        let mut cfg = defaults();
        cfg.set("projection.near_plane", 200.0f64).unwrap();
        assert!(Settings::from_config(&cfg).is_ok());

        cfg.set("projection.mode", "perspective").unwrap();
        assert!(Settings::from_config(&cfg).is_err());
    }

    #[test]
    fn missing_settings_file_falls_back_to_defaults() {
        let settings = Settings::load("does-not-exist/Settings").unwrap();
        assert_eq!(settings.display.width, default_settings().display.width);
    }

    #[test]
    fn negative_integers_are_rejected() {
        let mut cfg = defaults();
        cfg.set("display.width", -1i64).unwrap();
        let err = Settings::from_config(&cfg).unwrap_err();
        assert!(err.to_string().contains("display.width"));

        let mut cfg = defaults();
        cfg.set("display.target_frame_rate", -60i64).unwrap();
        let err = Settings::from_config(&cfg).unwrap_err();
        assert!(err.to_string().contains("display.target_frame_rate"));
    }

    #[test]
    fn oversized_integers_are_rejected() {
        let mut cfg = defaults();
        cfg.set("display.height", 1i64 << 40).unwrap();
        assert!(Settings::from_config(&cfg).is_err());
    }

    #[test]
    fn file_overrides_defaults_and_environment_overrides_file() {
        let dir = env::temp_dir().join(format!("intro-to-shaders-settings-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        fs::write(
            dir.join("Settings.toml"),
            "[display]\nwidth = 800\nheight = 600\ntitle = \"from file\"\n",
        )
        .unwrap();
        let name = dir.join("Settings");
        let name = name.to_str().unwrap();

        // A prefix of its own keeps this test clear of the real TRIANGLE_ variables.
        let prefix = "TRIANGLE_LAYERS_TEST";
        env::set_var("TRIANGLE_LAYERS_TEST_DISPLAY__WIDTH", "1024");
        env::set_var("TRIANGLE_LAYERS_TEST_LOG__FILTER", "warn");
        let settings = Settings::load_layers(name, prefix);
        env::remove_var("TRIANGLE_LAYERS_TEST_DISPLAY__WIDTH");
        env::remove_var("TRIANGLE_LAYERS_TEST_LOG__FILTER");
        let settings = settings.unwrap();

        assert_eq!(settings.display.width, 1024);
        assert_eq!(settings.display.height, 600);
        assert_eq!(settings.display.title, "from file");
        assert_eq!(settings.display.target_frame_rate, 60);
        assert_eq!(settings.log_filter.as_deref(), Some("warn"));
    }

    #[test]
    fn negative_environment_value_fails_to_load() {
        let prefix = "TRIANGLE_NEGATIVE_TEST";
        env::set_var("TRIANGLE_NEGATIVE_TEST_DISPLAY__WIDTH", "-1");
        let result = Settings::load_layers("does-not-exist/Settings", prefix);
        env::remove_var("TRIANGLE_NEGATIVE_TEST_DISPLAY__WIDTH");
        assert!(result.is_err());
    }
}
