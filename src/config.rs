//! User configuration for the WebDAV plugin.
//!
//! The host stores four free-form strings per plugin (`url`, `username`,
//! `password`, `searchPath`). They reach the plugin through a
//! [`ConfigProvider`] injected at construction, are validated into a
//! [`ConnectionConfig`], and that value decides whether the cached catalog
//! is still valid.

use crate::error::{PluginError, Result};
use crate::model::SearchType;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, RwLock};

/// Search path used when none is configured.
pub const ROOT_PATH: &str = "/";

/// Raw user variables as stored by the host. Every field may be absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserVariables {
    pub url: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub search_path: Option<String>,
}

/// Source of the host's current user variables.
pub trait ConfigProvider: Send + Sync {
    fn user_variables(&self) -> UserVariables;
}

/// A provider that always returns the same variables.
#[derive(Debug, Clone, Default)]
pub struct StaticConfig(pub UserVariables);

impl ConfigProvider for StaticConfig {
    fn user_variables(&self) -> UserVariables {
        self.0.clone()
    }
}

/// A provider the host can update in place, e.g. after the user edits the
/// plugin settings.
#[derive(Debug, Clone, Default)]
pub struct SharedConfig {
    inner: Arc<RwLock<UserVariables>>,
}

impl SharedConfig {
    pub fn new(variables: UserVariables) -> Self {
        SharedConfig {
            inner: Arc::new(RwLock::new(variables)),
        }
    }

    pub fn set(&self, variables: UserVariables) {
        let mut guard = self.inner.write().unwrap_or_else(|e| e.into_inner());
        *guard = variables;
    }
}

impl ConfigProvider for SharedConfig {
    fn user_variables(&self) -> UserVariables {
        self.inner
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

/// Credentials handed to the WebDAV client factory.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub auth_type: AuthType,
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("auth_type", &self.auth_type)
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthType {
    Password,
}

/// Validated connection settings. Two configs are the same cache key only if
/// all four raw strings are byte-for-byte equal.
#[derive(Clone, PartialEq, Eq)]
pub struct ConnectionConfig {
    pub url: String,
    pub username: String,
    pub password: String,
    pub search_path: Option<String>,
}

impl std::fmt::Debug for ConnectionConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionConfig")
            .field("url", &self.url)
            .field("username", &self.username)
            .field("search_path", &self.search_path)
            .finish_non_exhaustive()
    }
}

impl ConnectionConfig {
    /// Validates raw user variables. `url`, `username` and `password` are
    /// required; an empty string counts as missing.
    pub fn from_variables(vars: &UserVariables) -> Result<Self> {
        fn present(value: &Option<String>) -> Option<&str> {
            value.as_deref().filter(|v| !v.is_empty())
        }

        let mut missing = Vec::new();
        if present(&vars.url).is_none() {
            missing.push("url");
        }
        if present(&vars.username).is_none() {
            missing.push("username");
        }
        if present(&vars.password).is_none() {
            missing.push("password");
        }

        match (
            present(&vars.url),
            present(&vars.username),
            present(&vars.password),
        ) {
            (Some(url), Some(username), Some(password)) => Ok(ConnectionConfig {
                url: url.to_string(),
                username: username.to_string(),
                password: password.to_string(),
                search_path: vars.search_path.clone(),
            }),
            _ => Err(PluginError::MissingCredentials { missing }),
        }
    }

    pub fn credentials(&self) -> Credentials {
        Credentials {
            auth_type: AuthType::Password,
            username: self.username.clone(),
            password: self.password.clone(),
        }
    }

    pub fn search_paths(&self) -> Vec<String> {
        search_path_list(self.search_path.as_deref())
    }
}

/// Splits the comma separated search path setting. Segments are kept
/// verbatim; an absent or empty setting means the server root.
pub fn search_path_list(search_path: Option<&str>) -> Vec<String> {
    match search_path {
        Some(paths) if !paths.is_empty() => paths.split(',').map(str::to_string).collect(),
        _ => vec![ROOT_PATH.to_string()],
    }
}

/// How cover and lyric siblings are confirmed to exist.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetLookup {
    /// Look the sibling up in the directory listing that produced the track.
    #[default]
    Listing,
    /// Ask the server with an existence check per candidate.
    Live,
}

/// Describes one user-configurable variable in the plugin manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserVariableSpec {
    pub key: String,
    pub name: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub input_type: Option<String>,
}

impl UserVariableSpec {
    fn text(key: &str, name: &str) -> Self {
        UserVariableSpec {
            key: key.to_string(),
            name: name.to_string(),
            input_type: None,
        }
    }

    fn masked(key: &str, name: &str) -> Self {
        UserVariableSpec {
            key: key.to_string(),
            name: name.to_string(),
            input_type: Some("password".to_string()),
        }
    }
}

/// Static plugin metadata the host reads before calling any operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PluginManifest {
    pub platform: String,
    pub author: String,
    pub version: String,
    pub description: String,
    pub user_variables: Vec<UserVariableSpec>,
    pub supported_search_type: Vec<SearchType>,
}

impl PluginManifest {
    pub fn webdav() -> Self {
        PluginManifest {
            platform: "WebDAV".to_string(),
            author: "webdav-music".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            description: "Browse music, covers and lyrics stored on a WebDAV server.".to_string(),
            user_variables: vec![
                UserVariableSpec::text("url", "WebDAV URL"),
                UserVariableSpec::text("username", "Username"),
                UserVariableSpec::masked("password", "Password"),
                UserVariableSpec::text(
                    "searchPath",
                    "Music folders (separate multiple paths with commas)",
                ),
            ],
            supported_search_type: vec![SearchType::Music],
        }
    }
}
