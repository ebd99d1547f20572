//! Application configuration.
//!
//! Read from `flashnote.toml` (or the file named by `FLASHNOTE_CONFIG`) when it
//! exists, then overridden by environment variables.

use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::models::UserId;

pub const DEFAULT_CONFIG_FILE: &str = "flashnote.toml";

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    pub database_path: PathBuf,
    /// Identity of the local learner.
    pub user_id: String,
    pub parent_app_url: Option<String>,
    pub notification_webhook_url: Option<String>,
    pub webhook_secret: Option<String>,
    pub quiz_api_base_url: Option<String>,
    pub quiz_api_token: Option<String>,
    pub quiz_import_limit: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from("db.sqlite3"),
            user_id: "local".to_string(),
            parent_app_url: None,
            notification_webhook_url: None,
            webhook_secret: None,
            quiz_api_base_url: None,
            quiz_api_token: None,
            quiz_import_limit: 50,
        }
    }
}

impl Config {
    /// Loads the config file if present and applies environment overrides.
    pub fn load() -> Result<Self> {
        let path = std::env::var("FLASHNOTE_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_FILE));

        let mut config = if path.exists() {
            log::info!("Loading configuration from {}", path.display());
            Self::from_file(&path)?
        } else {
            Self::default()
        };
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    pub fn from_toml_str(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
    }

    /// Overrides fields from variables found by `lookup`. Empty values are ignored.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(path) = var("FLASHNOTE_DB") {
            self.database_path = PathBuf::from(path);
        }
        if let Some(user) = var("FLASHNOTE_USER") {
            self.user_id = user;
        }
        if let Some(url) = var("PARENT_APP_URL") {
            self.parent_app_url = Some(url);
        }
        if let Some(url) = var("PARENT_NOTIFICATION_WEBHOOK_URL") {
            self.notification_webhook_url = Some(url);
        }
        if let Some(secret) = var("ANSIVERSA_WEBHOOK_SECRET") {
            self.webhook_secret = Some(secret);
        }
        if let Some(url) = var("QUIZ_API_BASE_URL") {
            self.quiz_api_base_url = Some(url);
        }
        if let Some(token) = var("QUIZ_API_TOKEN") {
            self.quiz_api_token = Some(token);
        }
    }

    pub fn user(&self) -> Result<UserId> {
        UserId::new(self.user_id.clone())
    }
}
