// src/config.rs
use crate::error::Result;
use anyhow::anyhow;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

pub const API_KEY_VAR: &str = "GEMINI_API_KEY";
pub const MODEL_VAR: &str = "GEMINI_MODEL";
pub const BASE_URL_VAR: &str = "GEMINI_API_BASE_URL";

pub const DEFAULT_MODEL: &str = "gemini-1.5-flash";
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub api_key: String,
    pub model: String,
    pub api_base_url: String,
    pub temperature: Option<f32>,
    pub top_p: Option<f32>,
    pub max_tokens: Option<u32>,

    /// `None` disables transcripts for this run.
    pub transcript_dir: Option<PathBuf>,
    /// Pipe responses through `glow` when it is installed.
    pub render_markdown: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            api_key: String::new(),
            model: DEFAULT_MODEL.to_string(),
            api_base_url: DEFAULT_BASE_URL.to_string(),
            temperature: Some(0.7),
            top_p: None,
            max_tokens: Some(2048),
            transcript_dir: Some(default_transcript_dir()),
            render_markdown: true,
        }
    }
}

pub fn default_transcript_dir() -> PathBuf {
    let mut path = dirs::data_dir().unwrap_or_else(|| PathBuf::from("."));
    path.push("persona-chat");
    path.push("transcripts");
    path
}

impl Config {
    /// Reads the process environment. Fails when the API key is missing.
    pub fn load() -> Result<Self> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let api_key = non_empty(API_KEY_VAR)
            .ok_or_else(|| anyhow!("{} environment variable not set.", API_KEY_VAR))?;

        let mut config = Config {
            api_key,
            ..Config::default()
        };
        if let Some(model) = non_empty(MODEL_VAR) {
            config.model = model;
        }
        if let Some(url) = non_empty(BASE_URL_VAR) {
            config.api_base_url = url.trim_end_matches('/').to_string();
        }
        Ok(config)
    }

    /// Key/value pairs shown by the status screen. Never includes the key itself.
    pub fn summary(&self) -> Vec<(&'static str, String)> {
        let or_default = |v: Option<String>| v.unwrap_or_else(|| "Default".to_string());
        vec![
            ("Model", self.model.clone()),
            ("Endpoint", self.api_base_url.clone()),
            ("Temperature", or_default(self.temperature.map(|v| v.to_string()))),
            ("Top P", or_default(self.top_p.map(|v| v.to_string()))),
            ("Max Tokens", or_default(self.max_tokens.map(|v| v.to_string()))),
            (
                "Transcripts",
                self.transcript_dir
                    .as_ref()
                    .map_or_else(|| "disabled".to_string(), |p| p.display().to_string()),
            ),
        ]
    }
}
