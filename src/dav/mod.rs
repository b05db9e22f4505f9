//! The WebDAV collaborator.
//!
//! The catalog only talks to a server through [`WebDavClient`], and only
//! obtains clients through a [`ClientFactory`]. [`HttpClientFactory`] is the
//! production implementation; tests plug in an in-memory one.

mod http;
mod propfind;

pub use http::{HttpClientFactory, HttpDavClient};
pub use propfind::parse_multistatus;

use crate::config::Credentials;
use crate::error::Result;
use crate::model::DavEntry;
use async_trait::async_trait;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentFormat {
    Binary,
    Text,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileContents {
    Binary(Vec<u8>),
    Text(String),
}

impl FileContents {
    pub fn into_text(self) -> String {
        match self {
            FileContents::Text(text) => text,
            FileContents::Binary(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
        }
    }
}

#[async_trait]
pub trait WebDavClient: Send + Sync {
    /// Lists one level of `path`. The collection itself is not included.
    async fn get_directory_contents(&self, path: &str) -> Result<Vec<DavEntry>>;

    async fn exists(&self, path: &str) -> Result<bool>;

    async fn get_file_contents(&self, path: &str, format: ContentFormat) -> Result<FileContents>;

    /// A URL the host can fetch directly, credentials included.
    fn get_file_download_link(&self, path: &str) -> String;
}

pub trait ClientFactory: Send + Sync {
    fn create_client(&self, url: &str, credentials: &Credentials) -> Result<Arc<dyn WebDavClient>>;
}

/// Normalizes a server path to a leading slash and no trailing slash, so
/// `music/`, `/music` and `/music/` compare equal. The root is `/`.
pub fn normalize_path(path: &str) -> String {
    format!("/{}", path.trim_matches('/'))
}
