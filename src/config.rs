use anyhow::{Context, Result};
use std::env;

pub const DEFAULT_BASE_URL: &str = "https://api.lobstr.io/v1";

#[derive(Debug, Clone)]
pub struct Config {
    pub api_key: String,
    pub base_url: String,
}

impl Config {
    /// Load the API key and base URL from the environment.
    ///
    /// Call `dotenvy::dotenv().ok()` first so a local `.env` file is picked up.
    pub fn from_env() -> Result<Config> {
        let api_key = env::var("API_KEY")
            .ok()
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
            .context("Missing API_KEY in environment variables. Check your .env file.")?;

        let base_url = env::var("LOBSTR_BASE_URL")
            .ok()
            .filter(|u| !u.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

        Ok(Config { api_key, base_url })
    }
}
