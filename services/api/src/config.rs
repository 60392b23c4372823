//! services/api/src/config.rs
//!
//! Defines the application's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use tracing::Level;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing the environment variable {0}")]
    MissingVar(String),
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Which text-generation backend serves outline and content requests.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TextProvider {
    Gemini,
    OpenAi,
}

impl FromStr for TextProvider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "gemini" => Ok(TextProvider::Gemini),
            "openai" => Ok(TextProvider::OpenAi),
            other => Err(format!("'{}' is not one of gemini, openai", other)),
        }
    }
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    pub database_url: String,
    pub log_level: Level,
    pub cors_origin: String,
    pub text_provider: TextProvider,
    pub gemini_api_key: Option<String>,
    pub gemini_model: String,
    pub gemini_api_base: Option<String>,
    pub openai_api_key: Option<String>,
    pub openai_api_base: Option<String>,
    pub openai_model: String,
    pub export_dir: PathBuf,
    pub arabic_font_path: Option<PathBuf>,
    pub arabic_bold_font_path: Option<PathBuf>,
    pub batch_pause: Duration,
}

fn optional_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// It will look for a `.env` file in the current directory for development,
    /// but this is skipped in test environments to ensure tests are hermetic.
    pub fn from_env() -> Result<Self, ConfigError> {
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }

        // --- Server and Database Settings ---
        let bind_address_str =
            std::env::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0:3000".to_string());
        let bind_address = bind_address_str.parse::<SocketAddr>().map_err(|e| {
            ConfigError::InvalidValue("BIND_ADDRESS".to_string(), e.to_string())
        })?;

        let database_url = std::env::var("DATABASE_URL")
            .map_err(|_| ConfigError::MissingVar("DATABASE_URL".to_string()))?;

        let log_level_str = std::env::var("RUST_LOG").unwrap_or_else(|_| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        let cors_origin = std::env::var("CORS_ORIGIN")
            .unwrap_or_else(|_| "http://localhost:3000".to_string());

        // --- Text Generation ---
        let text_provider = std::env::var("TEXT_PROVIDER")
            .unwrap_or_else(|_| "gemini".to_string())
            .parse::<TextProvider>()
            .map_err(|e| ConfigError::InvalidValue("TEXT_PROVIDER".to_string(), e))?;

        // Missing keys are reported per generation call, not at startup.
        let gemini_api_key = optional_var("GEMINI_API_KEY");
        let gemini_model = std::env::var("GEMINI_MODEL")
            .unwrap_or_else(|_| "gemini-2.0-flash-lite".to_string());
        let gemini_api_base = optional_var("GEMINI_API_BASE");

        let openai_api_key = optional_var("OPENAI_API_KEY");
        let openai_api_base = optional_var("OPENAI_API_BASE");
        let openai_model =
            std::env::var("OPENAI_MODEL").unwrap_or_else(|_| "gpt-4o-mini".to_string());

        // --- Export Settings ---
        let export_dir = std::env::var("EXPORT_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./exports"));
        let arabic_font_path = optional_var("ARABIC_FONT_PATH").map(PathBuf::from);
        let arabic_bold_font_path = optional_var("ARABIC_BOLD_FONT_PATH").map(PathBuf::from);

        let batch_pause_str =
            std::env::var("BATCH_PAUSE_MS").unwrap_or_else(|_| "1000".to_string());
        let batch_pause = batch_pause_str
            .parse::<u64>()
            .map(Duration::from_millis)
            .map_err(|e| ConfigError::InvalidValue("BATCH_PAUSE_MS".to_string(), e.to_string()))?;

        Ok(Self {
            bind_address,
            database_url,
            log_level,
            cors_origin,
            text_provider,
            gemini_api_key,
            gemini_model,
            gemini_api_base,
            openai_api_key,
            openai_api_base,
            openai_model,
            export_dir,
            arabic_font_path,
            arabic_bold_font_path,
            batch_pause,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_names_parse_case_insensitively() {
        assert_eq!("Gemini".parse::<TextProvider>(), Ok(TextProvider::Gemini));
        assert_eq!(" openai ".parse::<TextProvider>(), Ok(TextProvider::OpenAi));
        assert!("claude".parse::<TextProvider>().is_err());
    }
}
