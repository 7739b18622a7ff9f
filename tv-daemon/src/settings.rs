//! Config file location and command line

use std::path::{Path, PathBuf};

use tracing::info;
use tv_bridge::BridgeConfig;

use crate::error::DaemonError;

/// What the command line asked for
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    /// Explicit config file
    File(PathBuf),
    /// Built-in profile
    Profile(String),
    /// Default location, defaults if absent
    Default,
}

/// Parsed command line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Args {
    /// Where the config comes from
    pub source: ConfigSource,
    /// Write the resolved config to the default location and exit
    pub init: bool,
}

impl Args {
    /// Parse arguments (without the program name)
    pub fn parse<I, S>(args: I) -> Result<Self, DaemonError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut source = ConfigSource::Default;
        let mut init = false;
        let mut args = args.into_iter().map(Into::into);

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--profile" => {
                    let name = args
                        .next()
                        .ok_or_else(|| DaemonError::Usage("--profile needs a name".into()))?;
                    source = ConfigSource::Profile(name);
                }
                "--init" => init = true,
                flag if flag.starts_with("--") => {
                    return Err(DaemonError::Usage(format!("unknown option {}", flag)));
                }
                path => source = ConfigSource::File(PathBuf::from(path)),
            }
        }

        Ok(Self { source, init })
    }
}

/// Get the XDG config directory for tvbridge
/// Uses $XDG_CONFIG_HOME/tvbridge, falls back to ~/.config/tvbridge
pub fn config_dir() -> Option<PathBuf> {
    if let Ok(xdg_config) = std::env::var("XDG_CONFIG_HOME") {
        let path = PathBuf::from(xdg_config);
        if path.is_absolute() {
            return Some(path.join("tvbridge"));
        }
    }

    dirs::home_dir().map(|h| h.join(".config").join("tvbridge"))
}

/// Default config file path
pub fn config_path() -> Option<PathBuf> {
    config_dir().map(|p| p.join("config.json"))
}

/// Resolve and validate the configuration
pub fn load(source: &ConfigSource) -> Result<BridgeConfig, DaemonError> {
    let config = match source {
        ConfigSource::File(path) => BridgeConfig::load(path)?,
        ConfigSource::Profile(name) => {
            info!("Using built-in profile {}", name);
            BridgeConfig::profile(name)?
        }
        ConfigSource::Default => match config_path() {
            Some(path) if path.exists() => BridgeConfig::load(&path)?,
            _ => {
                info!("No config file found, using defaults");
                BridgeConfig::default()
            }
        },
    };
    config.validate()?;
    Ok(config)
}

/// Write a config file, creating its directory
pub fn save(config: &BridgeConfig, path: &Path) -> Result<(), DaemonError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(config)?;
    std::fs::write(path, json)?;
    info!("Wrote config to {}", path.display());
    Ok(())
}
