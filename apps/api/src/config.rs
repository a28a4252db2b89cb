use std::str::FromStr;

use anyhow::{bail, Context, Result};

pub const DEFAULT_GROQ_BASE_URL: &str = "https://api.groq.com/openai/v1";
pub const DEFAULT_LLAMA_PARSE_BASE_URL: &str = "https://api.cloud.llamaindex.ai";

/// Which document parser backs resume extraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParserBackend {
    /// LlamaParse cloud API (default).
    LlamaParse,
    /// In-process text extraction, no network call.
    Local,
}

impl ParserBackend {
    pub fn as_str(&self) -> &'static str {
        match self {
            ParserBackend::LlamaParse => "llama_parse",
            ParserBackend::Local => "local",
        }
    }
}

impl FromStr for ParserBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "llama_parse" | "llamaparse" => Ok(ParserBackend::LlamaParse),
            "local" => Ok(ParserBackend::Local),
            other => bail!("Unknown PARSER_BACKEND '{other}' (expected 'llama_parse' or 'local')"),
        }
    }
}

/// Application configuration loaded from environment variables.
/// Startup fails if required variables are missing.
#[derive(Debug, Clone)]
pub struct Config {
    pub groq_api_key: String,
    pub groq_base_url: String,
    pub parser_backend: ParserBackend,
    /// Only required for the LlamaParse backend.
    pub llama_cloud_api_key: Option<String>,
    pub llama_parse_base_url: String,
    pub upstream_timeout_secs: u64,
    pub parse_poll_interval_ms: u64,
    pub parse_max_wait_secs: u64,
    pub max_upload_bytes: usize,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let parser_backend = optional_env("PARSER_BACKEND")
            .map(|v| v.parse::<ParserBackend>())
            .transpose()?
            .unwrap_or(ParserBackend::LlamaParse);

        let llama_cloud_api_key = match parser_backend {
            ParserBackend::LlamaParse => Some(require_env("LLAMA_CLOUD_API_KEY")?),
            ParserBackend::Local => optional_env("LLAMA_CLOUD_API_KEY"),
        };

        Ok(Config {
            groq_api_key: require_env("GROQ_API_KEY")?,
            groq_base_url: optional_env("GROQ_BASE_URL")
                .unwrap_or_else(|| DEFAULT_GROQ_BASE_URL.to_string()),
            parser_backend,
            llama_cloud_api_key,
            llama_parse_base_url: optional_env("LLAMA_PARSE_BASE_URL")
                .unwrap_or_else(|| DEFAULT_LLAMA_PARSE_BASE_URL.to_string()),
            upstream_timeout_secs: parse_env("UPSTREAM_TIMEOUT_SECS", 120)?,
            parse_poll_interval_ms: parse_env("PARSE_POLL_INTERVAL_MS", 1000)?,
            parse_max_wait_secs: parse_env("PARSE_MAX_WAIT_SECS", 2000)?,
            max_upload_bytes: parse_env("MAX_UPLOAD_BYTES", 10 * 1024 * 1024)?,
            port: parse_env("PORT", 8080)?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parse_env<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match optional_env(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("{key} must be a valid number, got '{raw}'")),
        None => Ok(default),
    }
}
