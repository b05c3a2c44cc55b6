//! Error type shared by every stage of the podcast pipeline.
//!
//! Variants are grouped into three kinds (see [`ErrorKind`]) that decide how
//! the presentation layer reports them: configuration problems stop the tool
//! before any request is sent, vendor failures halt only the current run, and
//! empty results are soft failures with a specific message.

use thiserror::Error;

/// Coarse classification of a [`PodcastError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Missing or invalid configuration, detected at startup.
    Configuration,
    /// A request to an external API failed.
    Vendor,
    /// A step produced nothing usable.
    Empty,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Configuration => "configuration",
            ErrorKind::Vendor => "vendor",
            ErrorKind::Empty => "empty",
        }
    }
}

#[derive(Error, Debug)]
pub enum PodcastError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("missing credentials: {}", .0.join(", "))]
    MissingCredentials(Vec<String>),

    #[error("unknown voice '{voice}' for {vendor}; expected one of: {}", .allowed.join(", "))]
    UnknownVoice {
        vendor: &'static str,
        voice: String,
        allowed: Vec<String>,
    },

    #[error("{vendor} request failed: {message}")]
    Vendor {
        vendor: &'static str,
        message: String,
    },

    #[error("{vendor} blocked the request: {reason}")]
    Blocked {
        vendor: &'static str,
        reason: String,
    },

    #[error("authentication failed: {0}")]
    Auth(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("no news found: {0}")]
    NoNews(String),

    #[error("no script produced: {0}")]
    NoScript(String),

    #[error("script generation failed: {0}")]
    ScriptRejected(String),
}

impl PodcastError {
    pub fn vendor(vendor: &'static str, message: impl Into<String>) -> Self {
        PodcastError::Vendor {
            vendor,
            message: message.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            PodcastError::Config(_)
            | PodcastError::MissingCredentials(_)
            | PodcastError::UnknownVoice { .. } => ErrorKind::Configuration,
            PodcastError::Vendor { .. }
            | PodcastError::Blocked { .. }
            | PodcastError::Auth(_)
            | PodcastError::Http(_)
            | PodcastError::Serialization(_)
            | PodcastError::Io(_) => ErrorKind::Vendor,
            PodcastError::NoNews(_) | PodcastError::NoScript(_) | PodcastError::ScriptRejected(_) => {
                ErrorKind::Empty
            }
        }
    }
}

pub type Result<T> = std::result::Result<T, PodcastError>;
