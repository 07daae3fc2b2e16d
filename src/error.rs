//! Error types for the site server.

use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum SiteError {
    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// `site.toml` could not be read or failed validation.
    #[error("config error: {message}")]
    Config { message: String },

    /// Frontmatter block present but not parseable.
    #[error("front matter error in {path:?}: {message}")]
    FrontMatter { path: PathBuf, message: String },

    /// Frontmatter parsed but a required field is missing or malformed.
    #[error("invalid content file {path:?}: {message}")]
    InvalidContent { path: PathBuf, message: String },

    #[error("watch error: {0}")]
    Watch(#[from] notify_debouncer_full::notify::Error),
}

pub type Result<T> = std::result::Result<T, SiteError>;

impl SiteError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    pub fn front_matter(path: impl Into<PathBuf>, msg: impl Into<String>) -> Self {
        Self::FrontMatter {
            path: path.into(),
            message: msg.into(),
        }
    }

    pub fn invalid_content(path: impl Into<PathBuf>, msg: impl Into<String>) -> Self {
        Self::InvalidContent {
            path: path.into(),
            message: msg.into(),
        }
    }
}
