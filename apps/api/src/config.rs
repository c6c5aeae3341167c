use anyhow::{Context, Result};

use crate::ingest::{DEFAULT_MAX_DOCUMENT_CHARS, DEFAULT_MAX_UPLOAD_BYTES};
use crate::llm_client::{DEFAULT_API_URL, DEFAULT_MODEL};

/// Application configuration loaded from environment variables.
/// Fails at startup if required variables are missing.
#[derive(Debug, Clone)]
pub struct Config {
    pub openai_api_key: String,
    pub completion_api_url: String,
    pub completion_model: String,
    pub port: u16,
    pub rust_log: String,
    pub max_document_chars: usize,
    pub max_upload_bytes: usize,
    pub profile_fetch_enabled: bool,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            openai_api_key: require_env("OPENAI_API_KEY")?,
            completion_api_url: optional_env("COMPLETION_API_URL", DEFAULT_API_URL),
            completion_model: optional_env("COMPLETION_MODEL", DEFAULT_MODEL),
            port: optional_env("PORT", "8080")
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: optional_env("RUST_LOG", "info"),
            max_document_chars: optional_env(
                "MAX_DOCUMENT_CHARS",
                &DEFAULT_MAX_DOCUMENT_CHARS.to_string(),
            )
            .parse::<usize>()
            .context("MAX_DOCUMENT_CHARS must be a positive integer")?,
            max_upload_bytes: optional_env("MAX_UPLOAD_BYTES", &DEFAULT_MAX_UPLOAD_BYTES.to_string())
                .parse::<usize>()
                .context("MAX_UPLOAD_BYTES must be a positive integer")?,
            profile_fetch_enabled: parse_flag(&optional_env("PROFILE_FETCH_ENABLED", "false"))
                .context("PROFILE_FETCH_ENABLED must be true or false")?,
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn optional_env(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn parse_flag(value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        other => anyhow::bail!("unrecognized flag value '{other}'"),
    }
}
