use std::path::PathBuf;

use clap::ValueEnum;

pub const DEFAULT_LLAMA_BASE_URL: &str = "https://api.llama.com/compat/v1";
pub const DEFAULT_LLAMA_MODEL: &str = "Llama-4-Maverick-17B-128E-Instruct-FP8";

/// Which vision backend the relay talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ProviderKind {
    Llama,
    /// Scripted output, no network.
    Mock,
}

impl ProviderKind {
    fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "llama" => Some(Self::Llama),
            "mock" => Some(Self::Mock),
            _ => None,
        }
    }
}

/// PhotoLens runtime configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP server bind address
    pub bind_address: String,
    /// HTTP server port
    pub port: u16,
    pub provider: ProviderKind,
    pub llama_api_key: Option<String>,
    pub llama_base_url: String,
    pub llama_model: String,
    /// Directory for rolling NDJSON logs
    pub log_dir: Option<PathBuf>,
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0".to_string(),
            port: 8787,
            provider: ProviderKind::Llama,
            llama_api_key: None,
            llama_base_url: DEFAULT_LLAMA_BASE_URL.to_string(),
            llama_model: DEFAULT_LLAMA_MODEL.to_string(),
            log_dir: None,
            log_level: "info".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables with sensible defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        Self {
            bind_address: non_empty("PHOTOLENS_BIND").unwrap_or(defaults.bind_address),
            port: non_empty("PHOTOLENS_PORT")
                .and_then(|p| p.parse().ok())
                .unwrap_or(defaults.port),
            provider: non_empty("PHOTOLENS_PROVIDER")
                .and_then(|p| ProviderKind::parse(&p))
                .unwrap_or(defaults.provider),
            llama_api_key: non_empty("LLAMA_API_KEY"),
            llama_base_url: non_empty("LLAMA_API_BASE_URL").unwrap_or(defaults.llama_base_url),
            llama_model: non_empty("LLAMA_MODEL").unwrap_or(defaults.llama_model),
            log_dir: non_empty("PHOTOLENS_LOG_DIR").map(PathBuf::from),
            log_level: non_empty("RUST_LOG").unwrap_or(defaults.log_level),
        }
    }

    pub fn local_server_url(&self) -> String {
        format!("http://localhost:{}", self.port)
    }
}
