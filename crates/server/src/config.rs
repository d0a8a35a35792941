//! Server settings, read from the environment.

use std::env;
use std::fmt::{self, Debug, Formatter};
use std::path::PathBuf;

use thiserror::Error;

const DEFAULT_PORT: u16 = 3000;
const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_STATIC_DIR: &str = "public";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("GEMINI_API_KEY (or GOOGLE_API_KEY) is not set")]
    MissingApiKey,

    #[error("PORT must be a port number, got {0:?}")]
    InvalidPort(String),
}

#[derive(Clone)]
pub struct ServerConfig {
    pub api_key: String,
    pub host: String,
    pub port: u16,
    pub static_dir: PathBuf,
    pub gemini_base_url: Option<String>,
    /// Model for requests that don't name one.
    pub gemini_model: Option<String>,
    pub debug_persona: bool,
}

impl ServerConfig {
    /// Reads the settings from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Reads the settings through `lookup`. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let api_key = var("GEMINI_API_KEY")
            .or_else(|| var("GOOGLE_API_KEY"))
            .ok_or(ConfigError::MissingApiKey)?;
        let port = match var("PORT") {
            Some(port) => port
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidPort(port))?,
            None => DEFAULT_PORT,
        };
        let debug_persona = var("DEBUG_PERSONA")
            .is_some_and(|v| matches!(v.trim(), "1" | "true" | "yes" | "on"));

        Ok(Self {
            api_key,
            host: var("HOST").unwrap_or_else(|| DEFAULT_HOST.to_owned()),
            port,
            static_dir: var("STATIC_DIR")
                .unwrap_or_else(|| DEFAULT_STATIC_DIR.to_owned())
                .into(),
            gemini_base_url: var("GEMINI_BASE_URL"),
            gemini_model: var("GEMINI_MODEL"),
            debug_persona,
        })
    }
}

impl Debug for ServerConfig {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServerConfig")
            .field("api_key", &"<deducted>")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("static_dir", &self.static_dir)
            .field("gemini_base_url", &self.gemini_base_url)
            .field("gemini_model", &self.gemini_model)
            .field("debug_persona", &self.debug_persona)
            .finish()
    }
}
