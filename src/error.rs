//! Error types for the WebDAV music plugin.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum PluginError {
    #[error("WebDAV user variables not configured: {}", .missing.join(", "))]
    MissingCredentials { missing: Vec<&'static str> },

    #[error("invalid WebDAV url: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("request error: {0}")]
    Request(String),

    #[error("{method} {path} failed with status {status}")]
    Status {
        method: &'static str,
        path: String,
        status: u16,
    },

    #[error("malformed multistatus response: {0}")]
    Xml(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<quick_xml::Error> for PluginError {
    fn from(err: quick_xml::Error) -> Self {
        PluginError::Xml(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, PluginError>;
