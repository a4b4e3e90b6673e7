use crate::params::Durations;
use serde_derive::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::io;
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct Config {
    pub durations: Durations,
}

#[derive(Error, Debug)]
pub struct ParseError {
    pub filename: String,
    pub message: String,
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Failed to parse {}: {}", self.filename, self.message)
    }
}

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    ParseError(ParseError),

    #[error(transparent)]
    TomlDeError(#[from] toml::de::Error),

    #[error(transparent)]
    TomlSerError(#[from] toml::ser::Error),

    #[error(transparent)]
    IOError(#[from] io::Error),

    #[error(transparent)]
    AtomicIOError(#[from] atomicwrites::Error<io::Error>),
}

pub static FILENAME: &str = "transport_fade.toml";

/// Per-user config file location, falling back to the working directory.
pub fn default_path() -> PathBuf {
    match directories::ProjectDirs::from("", "", "transport_fade") {
        Some(dirs) => dirs.config_dir().join(FILENAME),
        None => PathBuf::from(FILENAME),
    }
}

impl Config {
    pub fn new() -> Config {
        Config {
            durations: Durations::new(),
        }
    }

    // If no file is found, returns default config instead of error
    pub fn load(filename: &Path) -> Result<Config, Error> {
        let contents = match fs::read_to_string(filename) {
            Ok(contents) => contents,
            Err(error) if error.kind() == io::ErrorKind::NotFound => return Ok(Config::new()),
            Err(error) => return Err(Error::IOError(error)),
        };
        let config: Config = match toml::from_str(&contents) {
            Ok(contents) => contents,
            Err(error) if error.line_col().is_some() => {
                return Err(Error::ParseError(ParseError {
                    filename: filename.display().to_string(),
                    message: format!("{}", error),
                }));
            }
            Err(error) => return Err(Error::TomlDeError(error)),
        };
        info!("Loaded config from {}", filename.display());
        Ok(Config {
            durations: config.durations.clamped(),
        })
    }

    pub fn save(self, filename: &Path) -> Result<(), Error> {
        let contents = toml::to_string(&self)?;
        if let Some(dir) = filename.parent() {
            if !dir.as_os_str().is_empty() {
                fs::create_dir_all(dir)?;
            }
        }
        let writer = atomicwrites::AtomicFile::new(filename, atomicwrites::AllowOverwrite);
        writer.write(|f| f.write_all(contents.as_bytes()))?;
        info!("Saved config to {}", filename.display());
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Config::new()
    }
}
