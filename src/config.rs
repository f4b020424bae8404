use std::path::PathBuf;

use anyhow::{Context, Result};
use log::warn;

pub struct Config {
    pub gemini_api_key: Option<String>,
    pub gemini_model: String,
    pub gemini_api_url: String,
    pub ytdlp_binary: String,
    pub web_host: String,
    pub web_port: u16,
    pub log_file: PathBuf,
}

impl Default for Config {
    fn default() -> Config {
        Config {
            gemini_api_key: None,
            gemini_model: "gemini-1.5-pro".into(),
            gemini_api_url: "https://generativelanguage.googleapis.com".into(),
            ytdlp_binary: "yt-dlp".into(),
            web_host: "127.0.0.1".into(),
            web_port: 8000,
            log_file: "worthwatch.log".into(),
        }
    }
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

impl Config {
    /// Build config from the process environment, reading a `.env` file first if there is one
    pub fn load() -> Result<Config> {
        dotenvy::dotenv().ok();

        let mut cfg = Config::default();
        cfg.gemini_api_key = env_var("GEMINI_API_KEY");
        if let Some(model) = env_var("WORTHWATCH_MODEL") {
            cfg.gemini_model = model;
        }
        if let Some(url) = env_var("WORTHWATCH_GEMINI_URL") {
            cfg.gemini_api_url = url.trim_end_matches('/').into();
        }
        if let Some(bin) = env_var("WORTHWATCH_YTDLP") {
            cfg.ytdlp_binary = bin;
        }
        if let Some(host) = env_var("WORTHWATCH_HOST") {
            cfg.web_host = host;
        }
        if let Some(port) = env_var("WORTHWATCH_PORT") {
            cfg.web_port = port
                .parse()
                .with_context(|| format!("Invalid WORTHWATCH_PORT {:?}", port))?;
        }
        if let Some(path) = env_var("WORTHWATCH_LOG_FILE") {
            cfg.log_file = path.into();
        }
        Ok(cfg)
    }

    /// Called once logging is up, so a missing key shows up in the log file
    pub fn check(&self) {
        if self.gemini_api_key.is_none() {
            warn!("GEMINI_API_KEY not found, summary generation will fail");
        }
    }

    pub fn web_addr(&self) -> String {
        format!("{}:{}", self.web_host, self.web_port)
    }
}
