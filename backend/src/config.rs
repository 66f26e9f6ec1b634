//! Runtime configuration for the HTTP service.
//!
//! Values come from the environment (a `.env` file is loaded first) and can
//! be overridden by command-line flags.

use std::env;
use std::path::PathBuf;

/// Port the original upload service listened on.
pub const DEFAULT_PORT: u16 = 41586;

pub const PORT_VAR: &str = "CSVTOPRISM_PORT";
pub const OUTPUT_DIR_VAR: &str = "CSVTOPRISM_OUTPUT_DIR";

/// HTTP service settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub port: u16,
    /// Where generated CSV files are written
    pub output_dir: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            output_dir: PathBuf::from("."),
        }
    }
}

impl ServerConfig {
    /// Build from `CSVTOPRISM_PORT` and `CSVTOPRISM_OUTPUT_DIR`.
    ///
    /// Unset or unparsable values fall back to the defaults.
    pub fn from_env() -> Self {
        // Try loading .env file
        let _ = dotenvy::dotenv();

        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            port: lookup(PORT_VAR)
                .and_then(|p| p.trim().parse().ok())
                .unwrap_or(defaults.port),
            output_dir: lookup(OUTPUT_DIR_VAR)
                .filter(|d| !d.trim().is_empty())
                .map(PathBuf::from)
                .unwrap_or(defaults.output_dir),
        }
    }

    /// Override the port
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Override the output directory
    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self
    }
}
