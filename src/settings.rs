//! Program settings for bdfgen.
//!
//! Settings control the tool itself (output naming, logging, validation),
//! never the content of a generated input. They are read from INI files
//! with the following precedence:
//!
//! 1. Local configuration (`./bdfgen_config.cfg`)
//! 2. User configuration (`~/.config/bdfgen/bdfgen_config.cfg`)
//! 3. System configuration (`/etc/bdfgen/bdfgen_config.cfg`)
//! 4. Built-in defaults
//!
//! A file only overrides the keys it sets.
//!
//! ```ini
//! [output]
//! extension = inp
//!
//! [logging]
//! level = info
//!
//! [validation]
//! check_functionals = true
//!
//! [general]
//! print_level = 0
//! ```
//!
//! # Usage
//!
//! ```no_run
//! use bdfgen::settings::SettingsManager;
//!
//! let settings = SettingsManager::load()?;
//! println!("inputs are written as *.{}", settings.output().extension);
//! # Ok::<(), bdfgen::settings::ConfigError>(())
//! ```

use configparser::ini::Ini;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// File name looked up in each configuration directory.
pub const CONFIG_FILE_NAME: &str = "bdfgen_config.cfg";

/// Errors that can occur during configuration loading and processing.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// I/O error when reading configuration files
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// INI parsing error
    #[error("INI parsing error: {0}")]
    IniParse(String),
    /// Invalid configuration value
    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),
}

type Section = HashMap<String, Option<String>>;

/// All program settings.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct ProgramSettings {
    /// Generated file naming
    pub output: OutputSettings,
    /// Logging configuration
    pub logging: LoggingSettings,
    /// Descriptor validation switches
    pub validation: ValidationSettings,
    /// General program settings
    pub general: GeneralSettings,
}

/// Generated file naming.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OutputSettings {
    /// Extension of generated input files, without the dot (default: "inp")
    pub extension: String,
}

impl Default for OutputSettings {
    fn default() -> Self {
        Self {
            extension: "inp".to_string(),
        }
    }
}

/// Logging configuration settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoggingSettings {
    /// Log level (default: "info")
    pub level: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// Descriptor validation switches.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ValidationSettings {
    /// Warn about functional names outside the reference list (default: true)
    pub check_functionals: bool,
}

impl Default for ValidationSettings {
    fn default() -> Self {
        Self {
            check_functionals: true,
        }
    }
}

/// General program settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct GeneralSettings {
    /// 0 = quiet, 1 = normal, 2 = also echo the generated input (default: 0)
    pub print_level: u32,
}

/// Configuration manager that handles loading and accessing program settings.
pub struct SettingsManager {
    settings: ProgramSettings,
    config_source: String,
}

impl SettingsManager {
    /// Loads configuration from the system, user and local files, in that
    /// order, over the built-in defaults.
    pub fn load() -> Result<Self, ConfigError> {
        let mut paths = Vec::new();
        paths.extend(Self::get_system_config_path());
        paths.extend(Self::get_user_config_path());
        paths.push(PathBuf::from(CONFIG_FILE_NAME));
        let manager = Self::load_from(&paths);
        info!("Configuration loaded from: {}", manager.config_source);
        Ok(manager)
    }

    /// Applies each existing file in `paths` in order; later files win.
    /// Files that fail to parse are skipped with a warning.
    pub fn load_from(paths: &[PathBuf]) -> Self {
        let mut settings = ProgramSettings::default();
        let mut config_source = "built-in defaults".to_string();

        for path in paths.iter().filter(|p| p.exists()) {
            match Self::load_config(path, &settings) {
                Ok(loaded) => {
                    settings = loaded;
                    config_source = path.display().to_string();
                    debug!("Loaded configuration from: {}", path.display());
                }
                Err(e) => {
                    warn!("Failed to load config from {}: {}", path.display(), e);
                }
            }
        }

        Self {
            settings,
            config_source,
        }
    }

    /// Returns the source of the loaded configuration.
    pub fn config_source(&self) -> &str {
        &self.config_source
    }

    /// Gets a reference to the settings.
    pub fn settings(&self) -> &ProgramSettings {
        &self.settings
    }

    /// Gets the output settings.
    pub fn output(&self) -> &OutputSettings {
        &self.settings.output
    }

    /// Gets the logging settings.
    pub fn logging(&self) -> &LoggingSettings {
        &self.settings.logging
    }

    /// Gets the validation settings.
    pub fn validation(&self) -> &ValidationSettings {
        &self.settings.validation
    }

    /// Gets the general settings.
    pub fn general(&self) -> &GeneralSettings {
        &self.settings.general
    }

    /// Reads one INI file on top of `base`.
    fn load_config(path: &Path, base: &ProgramSettings) -> Result<ProgramSettings, ConfigError> {
        let content = fs::read_to_string(path)?;
        Self::parse_config(&content, base)
    }

    fn parse_config(content: &str, base: &ProgramSettings) -> Result<ProgramSettings, ConfigError> {
        let mut ini = Ini::new();
        ini.read(content.to_string())
            .map_err(|e| ConfigError::IniParse(format!("Failed to parse INI: {}", e)))?;

        let mut settings = base.clone();
        let sections = ini.get_map_ref();

        if let Some(section) = sections.get("output") {
            if let Some(extension) = value(section, "extension") {
                settings.output.extension = extension.trim_start_matches('.').to_string();
            }
        }
        if let Some(section) = sections.get("logging") {
            if let Some(level) = value(section, "level") {
                settings.logging.level = parse_level(level)?;
            }
        }
        if let Some(section) = sections.get("validation") {
            if let Some(check) = value(section, "check_functionals") {
                settings.validation.check_functionals = check.parse().map_err(|_| {
                    ConfigError::InvalidValue(format!("Invalid check_functionals value: {}", check))
                })?;
            }
        }
        if let Some(section) = sections.get("general") {
            if let Some(print_level) = value(section, "print_level") {
                settings.general.print_level = print_level.parse().map_err(|_| {
                    ConfigError::InvalidValue(format!("Invalid print_level: {}", print_level))
                })?;
            }
        }

        Ok(settings)
    }

    /// Gets the system configuration file path.
    fn get_system_config_path() -> Option<PathBuf> {
        #[cfg(unix)]
        {
            Some(PathBuf::from("/etc/bdfgen").join(CONFIG_FILE_NAME))
        }
        #[cfg(windows)]
        {
            std::env::var("PROGRAMDATA")
                .ok()
                .map(|pd| PathBuf::from(pd).join("bdfgen").join(CONFIG_FILE_NAME))
        }
    }

    /// Gets the user configuration file path.
    fn get_user_config_path() -> Option<PathBuf> {
        #[cfg(unix)]
        {
            std::env::var("HOME").ok().map(|home| {
                PathBuf::from(home)
                    .join(".config")
                    .join("bdfgen")
                    .join(CONFIG_FILE_NAME)
            })
        }
        #[cfg(windows)]
        {
            std::env::var("APPDATA")
                .ok()
                .map(|appdata| PathBuf::from(appdata).join("bdfgen").join(CONFIG_FILE_NAME))
        }
    }
}

/// Non-empty value of `key`; configparser lower-cases keys.
fn value<'a>(section: &'a Section, key: &str) -> Option<&'a str> {
    match section.get(key) {
        Some(Some(v)) if !v.trim().is_empty() => Some(v.trim()),
        _ => None,
    }
}

fn parse_level(level: &str) -> Result<String, ConfigError> {
    let lower = level.to_ascii_lowercase();
    match lower.as_str() {
        "off" | "error" | "warn" | "info" | "debug" | "trace" => Ok(lower),
        _ => Err(ConfigError::InvalidValue(format!("Invalid log level: {}", level))),
    }
}

impl SettingsManager {
    /// Writes a commented `bdfgen_config.cfg` template holding the defaults.
    pub fn create_template(path: &Path) -> Result<(), ConfigError> {
        let template_content = Self::generate_template_content();
        fs::write(path, template_content)?;
        info!("Created settings template at: {}", path.display());
        Ok(())
    }

    /// Generates the content for a bdfgen_config.cfg template file.
    fn generate_template_content() -> String {
        let defaults = ProgramSettings::default();
        format!(
            r#"# bdfgen configuration file
#
# Files are read in this order, later ones overriding earlier ones:
#
# 1. System config directory (/etc/bdfgen/bdfgen_config.cfg on Unix, %PROGRAMDATA%/bdfgen/bdfgen_config.cfg on Windows)
# 2. User config directory (~/.config/bdfgen/bdfgen_config.cfg on Unix, %APPDATA%/bdfgen/bdfgen_config.cfg on Windows)
# 3. Current working directory (./bdfgen_config.cfg)
#
# Missing sections or values keep the built-in defaults shown below.

[output]
# Extension of generated BDF input files (default: inp)
extension = {}

[logging]
# Log level: off, error, warn, info, debug, trace (default: info)
# RUST_LOG is read as well; this value takes precedence.
level = {}

[validation]
# Warn when a functional name is not in the reference list (default: true)
# Unknown names are still written to the input unchanged.
check_functionals = {}

[general]
# Print level (default: 0)
# 0 = quiet
# 1 = normal (report warnings and written files)
# 2 = verbose (also echo the generated input)
print_level = {}
"#,
            defaults.output.extension,
            defaults.logging.level,
            defaults.validation.check_functionals,
            defaults.general.print_level,
        )
    }
}
