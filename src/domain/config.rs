use std::{
    io,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};

/// Configuration for a memory bank.
///
/// Read from [`Config::FILE_NAME`] in the project root. Every field has a
/// default, so the file is optional.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Versions", into = "Versions")]
pub struct Config {
    /// The directory, relative to the project root, that holds the state
    /// document, its backup and the markdown projections.
    directory: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            directory: default_directory(),
        }
    }
}

/// Errors that can occur when reading or writing the configuration file.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("failed to read config file: {0}")]
    Read(#[source] io::Error),
    /// The file is not valid TOML for this configuration.
    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
    /// The configuration could not be rendered as TOML.
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
    /// The file could not be written.
    #[error("failed to write config file: {0}")]
    Write(#[source] io::Error),
}

impl Config {
    /// The name of the configuration file in the project root.
    pub const FILE_NAME: &str = "memory-bank.toml";

    /// Loads the configuration from a TOML file at the given path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or if the TOML content is
    /// invalid.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(ConfigError::Read)?;
        Ok(toml::from_str(&content)?)
    }

    /// Loads the configuration from the project root, falling back to the
    /// defaults if the file is missing or invalid.
    #[must_use]
    pub fn load_or_default(root: &Path) -> Self {
        let path = root.join(Self::FILE_NAME);
        Self::load(&path).unwrap_or_else(|e| {
            tracing::debug!("Failed to load config: {e}");
            Self::default()
        })
    }

    /// Saves the configuration to a TOML file at the given path.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration cannot be serialized to TOML or if
    /// the file cannot be written.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content).map_err(ConfigError::Write)
    }

    /// The memory bank directory, relative to the project root.
    #[must_use]
    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Sets the memory bank directory, relative to the project root.
    pub fn set_directory(&mut self, directory: PathBuf) {
        self.directory = directory;
    }
}

fn default_directory() -> PathBuf {
    PathBuf::from("memory-bank")
}

/// The serialized versions of the configuration.
/// This allows for future changes to the configuration format and to the domain
/// type without breaking compatibility.
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "_version")]
enum Versions {
    #[serde(rename = "1")]
    V1 {
        #[serde(default = "default_directory")]
        directory: PathBuf,
    },
}

impl From<Versions> for Config {
    fn from(versions: Versions) -> Self {
        match versions {
            Versions::V1 { directory } => Self { directory },
        }
    }
}

impl From<Config> for Versions {
    fn from(config: Config) -> Self {
        Self::V1 {
            directory: config.directory,
        }
    }
}
