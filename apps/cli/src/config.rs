//! Configuration management
//!
//! Settings are layered, later sources overriding earlier ones:
//!
//! 1. built-in defaults
//! 2. the TOML file given with `--config`, or `physcalc/config.toml` in the
//!    user's configuration directory when present
//! 3. `PHYSCALC__SECTION__KEY` environment variables (a `.env` file in the
//!    working directory is loaded first)
//! 4. command-line flags
//!
//! ```toml
//! [engine]
//! decimal_comma = true
//! lenient_conversion = false
//! max_call_depth = 32
//! max_nesting = 32
//! precision = 10
//! script_dirs = ["/usr/share/physcalc"]
//!
//! [logging]
//! level = "warn"
//! json = false
//! file_enabled = false
//! file_directory = "logs"
//! file_prefix = "physcalc"
//! file_rotation = "daily"
//! ```

use anyhow::Context;
use physcalc_engine::{EvalOptions, DEFAULT_MAX_CALL_DEPTH, DEFAULT_MAX_NESTING};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const ENV_PREFIX: &str = "PHYSCALC";
const FILE_NAME: &str = "config.toml";

/// Largest precision that still means something for an `f64`.
pub const MAX_PRECISION: usize = 17;

/// Largest call depth or nesting the session thread's stack holds.
pub const MAX_DEPTH_LIMIT: usize = 500;

const LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error", "off"];
const ROTATIONS: &[&str] = &["daily", "hourly", "minutely", "never"];

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub engine: EngineConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub decimal_comma: bool,
    pub lenient_conversion: bool,
    pub max_call_depth: usize,
    pub max_nesting: usize,
    /// Significant digits of printed values; unset prints them exactly.
    pub precision: Option<usize>,
    pub script_dirs: Vec<PathBuf>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            decimal_comma: true,
            lenient_conversion: false,
            max_call_depth: DEFAULT_MAX_CALL_DEPTH,
            max_nesting: DEFAULT_MAX_NESTING,
            precision: None,
            script_dirs: Vec::new(),
        }
    }
}

impl From<&EngineConfig> for EvalOptions {
    fn from(config: &EngineConfig) -> Self {
        EvalOptions {
            decimal_comma: config.decimal_comma,
            lenient_conversion: config.lenient_conversion,
            max_call_depth: config.max_call_depth,
            max_nesting: config.max_nesting,
            precision: config.precision,
            script_dirs: config.script_dirs.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub json: bool,
    pub file_enabled: bool,
    pub file_directory: PathBuf,
    pub file_prefix: String,
    /// daily, hourly, minutely or never
    pub file_rotation: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
            json: false,
            file_enabled: false,
            file_directory: PathBuf::from("logs"),
            file_prefix: "physcalc".to_string(),
            file_rotation: "daily".to_string(),
        }
    }
}

impl Config {
    /// Loads the layered configuration. An explicit `path` must exist; the
    /// per-user file is optional.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        // A missing .env file is fine.
        let _ = dotenvy::dotenv();

        let mut builder = config::Config::builder();
        match path {
            Some(path) => {
                builder = builder.add_source(config::File::from(path).required(true));
            }
            None => {
                if let Some(user) = user_config_file() {
                    builder = builder.add_source(config::File::from(user).required(false));
                }
            }
        }
        builder = builder.add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .separator("__")
                .try_parsing(true)
                .list_separator(",")
                .with_list_parse_key("engine.script_dirs"),
        );

        builder
            .build()
            .context("Failed to read configuration sources")?
            .try_deserialize()
            .context("Failed to parse configuration")
    }

    pub fn validate(&self) -> Result<(), String> {
        for (key, value) in [
            ("engine.max_call_depth", self.engine.max_call_depth),
            ("engine.max_nesting", self.engine.max_nesting),
        ] {
            if value == 0 || value > MAX_DEPTH_LIMIT {
                return Err(format!(
                    "{key} must be between 1 and {MAX_DEPTH_LIMIT}, got {value}"
                ));
            }
        }
        if let Some(precision) = self.engine.precision {
            if precision == 0 || precision > MAX_PRECISION {
                return Err(format!(
                    "engine.precision must be between 1 and {MAX_PRECISION}, got {precision}"
                ));
            }
        }
        if !LEVELS.contains(&self.logging.level.to_ascii_lowercase().as_str()) {
            return Err(format!(
                "logging.level must be one of {}, got '{}'",
                LEVELS.join(", "),
                self.logging.level
            ));
        }
        if !ROTATIONS.contains(&self.logging.file_rotation.as_str()) {
            return Err(format!(
                "logging.file_rotation must be one of {}, got '{}'",
                ROTATIONS.join(", "),
                self.logging.file_rotation
            ));
        }
        Ok(())
    }

    pub fn eval_options(&self) -> EvalOptions {
        EvalOptions::from(&self.engine)
    }
}

fn user_config_file() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("physcalc").join(FILE_NAME))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn defaults_are_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.eval_options(), EvalOptions::default());
    }

    #[test]
    fn file_values_override_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("physcalc.toml");
        fs::write(
            &path,
            "[engine]\nprecision = 6\nlenient_conversion = true\n\n[logging]\nlevel = \"debug\"\n",
        )
        .unwrap();

        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.engine.precision, Some(6));
        assert!(config.engine.lenient_conversion);
        assert!(config.engine.decimal_comma);
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.logging.file_rotation, "daily");
    }

    #[test]
    fn explicit_file_must_exist() {
        let dir = tempfile::tempdir().unwrap();
        assert!(Config::load(Some(&dir.path().join("missing.toml"))).is_err());
    }

    #[test]
    fn validation_rejects_bad_values() {
        let mut config = Config::default();
        config.engine.precision = Some(0);
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.engine.max_call_depth = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.engine.max_nesting = MAX_DEPTH_LIMIT + 1;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.logging.level = "loud".into();
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.logging.file_rotation = "weekly".into();
        assert!(config.validate().is_err());
    }
}
