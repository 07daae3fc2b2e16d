//! Site configuration.
//!
//! Settings come from an optional `site.toml`; a missing file means defaults.
//! A few deployment knobs (`PORT`, `CONTENT_DIR`, `RUST_ENV`) are read from the
//! environment and win over the file.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::{debug, info};

use crate::error::{Result, SiteError};

pub const DEFAULT_CONFIG_FILE: &str = "site.toml";

#[derive(Debug, Clone, Deserialize)]
pub struct SiteConfig {
    #[serde(default = "default_site_name")]
    pub site_name: String,

    #[serde(default = "default_tagline")]
    pub tagline: String,

    /// Absolute origin used when building canonical URLs.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default = "default_content_dir")]
    pub content_dir: PathBuf,

    /// Used for posts whose frontmatter has no `author`.
    #[serde(default = "default_author")]
    pub default_author: String,

    #[serde(default = "default_posts_per_page")]
    pub posts_per_page: usize,

    #[serde(default = "default_related_posts")]
    pub related_posts: usize,

    #[serde(default = "default_search_result_limit")]
    pub search_result_limit: usize,

    /// Maximum length of a derived excerpt, in characters.
    #[serde(default = "default_excerpt_length")]
    pub excerpt_length: usize,

    #[serde(default = "default_words_per_minute")]
    pub words_per_minute: usize,

    #[serde(default = "default_contact_email")]
    pub contact_email: String,

    /// Set from `RUST_ENV`, never from the file.
    #[serde(skip)]
    pub is_development: bool,

    #[serde(skip, default = "default_port")]
    pub port: u16,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            site_name: default_site_name(),
            tagline: default_tagline(),
            base_url: default_base_url(),
            content_dir: default_content_dir(),
            default_author: default_author(),
            posts_per_page: default_posts_per_page(),
            related_posts: default_related_posts(),
            search_result_limit: default_search_result_limit(),
            excerpt_length: default_excerpt_length(),
            words_per_minute: default_words_per_minute(),
            contact_email: default_contact_email(),
            is_development: false,
            port: default_port(),
        }
    }
}

fn default_site_name() -> String {
    "Embedded Systems Consulting".into()
}
fn default_tagline() -> String {
    "Firmware, hardware bring-up and embedded Linux".into()
}
fn default_base_url() -> String {
    "http://localhost:8080".into()
}
fn default_content_dir() -> PathBuf {
    PathBuf::from("content")
}
fn default_author() -> String {
    "The Engineering Team".into()
}
fn default_posts_per_page() -> usize {
    6
}
fn default_related_posts() -> usize {
    3
}
fn default_search_result_limit() -> usize {
    20
}
fn default_excerpt_length() -> usize {
    160
}
fn default_words_per_minute() -> usize {
    200
}
fn default_contact_email() -> String {
    "hello@example.com".into()
}
fn default_port() -> u16 {
    8080
}

impl SiteConfig {
    /// Load config from a TOML file. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let config = match std::fs::read_to_string(path) {
            Ok(raw) => {
                debug!(path = %path.display(), "loading site config");
                Self::from_toml(&raw)?
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!(path = %path.display(), "no site config found, using defaults");
                Self::default()
            }
            Err(e) => return Err(SiteError::io(path, e)),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml(raw: &str) -> Result<Self> {
        toml::from_str(raw).map_err(|e| SiteError::config(format!("invalid TOML: {e}")))
    }

    /// Load from `SITE_CONFIG` (or `site.toml`) then apply env overrides.
    pub fn from_env() -> Result<Self> {
        let path = std::env::var("SITE_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_FILE.into());
        let mut config = Self::load(Path::new(&path))?;
        config.apply_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Apply `CONTENT_DIR`, `PORT` and `RUST_ENV` from a lookup function.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(dir) = lookup("CONTENT_DIR") {
            self.content_dir = PathBuf::from(dir);
        }
        if let Some(port) = lookup("PORT").and_then(|p| p.parse().ok()) {
            self.port = port;
        }
        self.is_development = lookup("RUST_ENV").is_some_and(|v| v == "development");
    }

    pub fn validate(&self) -> Result<()> {
        if self.site_name.trim().is_empty() {
            return Err(SiteError::config("site_name must not be empty"));
        }
        if self.posts_per_page == 0 {
            return Err(SiteError::config("posts_per_page must be at least 1"));
        }
        if self.words_per_minute == 0 {
            return Err(SiteError::config("words_per_minute must be at least 1"));
        }
        Ok(())
    }
}
