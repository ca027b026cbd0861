//! Application configuration

pub mod prompts;

use std::env;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub host: String,
    pub port: u16,
    /// Display name of the person the assistant speaks for.
    pub site_owner: String,
    pub gemini_api_key: Option<String>,
    pub gemini_base_url: Option<String>,
    pub gemini_model: Option<String>,
    pub lastfm_api_key: Option<String>,
    pub lastfm_username: Option<String>,
    /// When set, the engine talks to a remote deployment's relay endpoints
    /// instead of calling Gemini and the tools in-process.
    pub model_proxy_url: Option<String>,
    pub tool_proxy_url: Option<String>,
    /// Optional TOML persona file overriding the built-in system instruction.
    pub persona_file: Option<PathBuf>,
    pub data_dir: PathBuf,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Ok(Self {
            host: env::var("HOST").unwrap_or_else(|_| "127.0.0.1".into()),
            port: env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(3000),
            site_owner: env::var("SITE_OWNER").unwrap_or_else(|_| "the site owner".into()),
            gemini_api_key: env::var("GEMINI_API_KEY").ok(),
            gemini_base_url: env::var("GEMINI_BASE_URL").ok(),
            gemini_model: env::var("GEMINI_MODEL").ok(),
            lastfm_api_key: env::var("LASTFM_API_KEY").ok(),
            lastfm_username: env::var("LASTFM_USERNAME").ok(),
            model_proxy_url: env::var("MODEL_PROXY_URL").ok(),
            tool_proxy_url: env::var("TOOL_PROXY_URL").ok(),
            persona_file: env::var("PERSONA_FILE").ok().map(PathBuf::from),
            data_dir: env::var("LUMEN_DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("./data")),
        })
    }
}
