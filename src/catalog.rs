//! Catalog cache over a WebDAV server.
//!
//! The catalog owns the active connection and a memoized listing of the
//! configured search paths. The listing is built lazily on first use and is
//! rebuilt only after the connection settings change or [`Catalog::invalidate`]
//! is called.
//!
//! # Scanning
//!
//! Each search path is listed one level deep, in configuration order. A path
//! that cannot be read is logged and contributes nothing; the scan never fails
//! as a whole.
//!
//! # Companion assets
//!
//! Covers and lyrics are found by name: `song.mp3` looks for `song.jpg`, then
//! `song.png`, and for `song.lrc`. Depending on [`AssetLookup`], a candidate is
//! confirmed either against the scanned listing or with a live existence check.

use crate::config::{AssetLookup, ConfigProvider, ConnectionConfig};
use crate::dav::{ClientFactory, WebDavClient};
use crate::error::Result;
use crate::filename::{sibling_path, COVER_EXTENSIONS, LYRIC_EXTENSION};
use crate::model::{DavEntry, EntryKind};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Result of scanning one or more search paths.
#[derive(Debug, Clone, Default)]
pub struct Listing {
    /// Audio files in scan order.
    pub tracks: Vec<DavEntry>,
    /// Every plain file seen during the scan, audio or not.
    files: HashSet<String>,
}

impl Listing {
    pub fn contains(&self, path: &str) -> bool {
        self.files.contains(path)
    }

    /// Audio files whose basename contains `query` (case-sensitive).
    pub fn matching<'a>(&'a self, query: &'a str) -> impl Iterator<Item = &'a DavEntry> + 'a {
        self.tracks
            .iter()
            .filter(move |entry| entry.basename.contains(query))
    }

    fn push_all(&mut self, entries: Vec<DavEntry>) {
        for entry in entries {
            if entry.kind != EntryKind::File {
                continue;
            }
            self.files.insert(entry.filename.clone());
            if entry.is_audio() {
                self.tracks.push(entry);
            }
        }
    }
}

/// Lists each path in order and collects the files found. Unreadable paths
/// are skipped.
pub async fn scan_paths(client: &dyn WebDavClient, paths: &[String]) -> Listing {
    let mut listing = Listing::default();

    for path in paths {
        match client.get_directory_contents(path).await {
            Ok(entries) => listing.push_all(entries),
            Err(e) => {
                warn!("Failed to read directory {}: {}", path, e);
            }
        }
    }

    listing
}

/// Connection state plus the memoized listing.
#[derive(Default)]
pub struct Catalog {
    config: Option<ConnectionConfig>,
    search_paths: Vec<String>,
    client: Option<Arc<dyn WebDavClient>>,
    listing: Option<Listing>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drops the connection and the listing if `config` differs from the one
    /// they were built for. Returns true when something was invalidated.
    pub fn invalidate_if_config_changed(&mut self, config: &ConnectionConfig) -> bool {
        if self.config.as_ref() == Some(config) {
            return false;
        }

        debug!("Connection settings changed, resetting catalog for {}", config.url);
        self.search_paths = config.search_paths();
        self.config = Some(config.clone());
        self.client = None;
        self.listing = None;
        true
    }

    /// Forgets the listing so the next search rescans. The connection is kept.
    pub fn invalidate(&mut self) {
        self.listing = None;
    }

    /// Returns the client for the provider's current settings, building a new
    /// one only when the settings changed.
    pub fn connect(
        &mut self,
        provider: &dyn ConfigProvider,
        factory: &dyn ClientFactory,
    ) -> Result<Arc<dyn WebDavClient>> {
        let config = ConnectionConfig::from_variables(&provider.user_variables())?;
        self.invalidate_if_config_changed(&config);

        if let Some(client) = &self.client {
            return Ok(Arc::clone(client));
        }

        let client = factory.create_client(&config.url, &config.credentials())?;
        self.client = Some(Arc::clone(&client));
        Ok(client)
    }

    pub fn search_paths(&self) -> &[String] {
        &self.search_paths
    }

    /// Returns the memoized listing, scanning the search paths first if there
    /// is none yet.
    pub async fn ensure_listing(&mut self, client: &dyn WebDavClient) -> &Listing {
        if self.listing.is_none() {
            let listing = scan_paths(client, &self.search_paths).await;
            info!(
                "Indexed {} audio files across {} search paths",
                listing.tracks.len(),
                self.search_paths.len()
            );
            self.listing = Some(listing);
        }

        self.listing.get_or_insert_with(Listing::default)
    }
}

/// Resolves companion files of an audio file under one [`AssetLookup`] policy.
pub struct AssetResolver<'a> {
    pub client: &'a dyn WebDavClient,
    pub listing: Option<&'a Listing>,
    pub lookup: AssetLookup,
}

impl<'a> AssetResolver<'a> {
    async fn is_present(&self, candidate: &str) -> bool {
        match self.lookup {
            AssetLookup::Listing => self.listing.is_some_and(|l| l.contains(candidate)),
            AssetLookup::Live => match self.client.exists(candidate).await {
                Ok(found) => found,
                Err(e) => {
                    debug!("Existence check for {} failed: {}", candidate, e);
                    false
                }
            },
        }
    }

    async fn first_present(&self, path: &str, extensions: &[&str]) -> Option<String> {
        for ext in extensions {
            let candidate = sibling_path(path, ext);
            if self.is_present(&candidate).await {
                return Some(candidate);
            }
        }
        None
    }

    /// Path of the cover image next to `path`.
    pub async fn cover_path(&self, path: &str) -> Option<String> {
        self.first_present(path, &COVER_EXTENSIONS).await
    }

    /// Path of the `.lrc` file next to `path`.
    pub async fn lyric_path(&self, path: &str) -> Option<String> {
        self.first_present(path, &[LYRIC_EXTENSION]).await
    }

    pub async fn cover_url(&self, path: &str) -> Option<String> {
        self.cover_path(path)
            .await
            .map(|p| self.client.get_file_download_link(&p))
    }

    pub async fn lyric_url(&self, path: &str) -> Option<String> {
        self.lyric_path(path)
            .await
            .map(|p| self.client.get_file_download_link(&p))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Credentials, StaticConfig, UserVariables};
    use crate::dav::{ContentFormat, FileContents};
    use crate::error::PluginError;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct FakeClient {
        listings: AtomicUsize,
    }

    #[async_trait]
    impl WebDavClient for FakeClient {
        async fn get_directory_contents(&self, path: &str) -> Result<Vec<DavEntry>> {
            self.listings.fetch_add(1, Ordering::SeqCst);
            match path {
                "/a" => Ok(vec![
                    DavEntry::file("/a/one.mp3", Some("audio/mpeg")),
                    DavEntry::file("/a/one.jpg", Some("image/jpeg")),
                    DavEntry::directory("/a/sub"),
                ]),
                "/b" => Ok(vec![DavEntry::file("/b/two.flac", Some("audio/flac"))]),
                _ => Err(PluginError::NotFound(path.to_string())),
            }
        }

        async fn exists(&self, path: &str) -> Result<bool> {
            Ok(path == "/a/one.png")
        }

        async fn get_file_contents(&self, path: &str, _: ContentFormat) -> Result<FileContents> {
            Err(PluginError::NotFound(path.to_string()))
        }

        fn get_file_download_link(&self, path: &str) -> String {
            format!("dav:{path}")
        }
    }

    #[derive(Default)]
    struct CountingFactory {
        created: AtomicUsize,
    }

    impl ClientFactory for CountingFactory {
        fn create_client(&self, _: &str, _: &Credentials) -> Result<Arc<dyn WebDavClient>> {
            self.created.fetch_add(1, Ordering::SeqCst);
            Ok(Arc::new(FakeClient::default()))
        }
    }

    fn variables(search_path: &str) -> UserVariables {
        UserVariables {
            url: Some("https://dav.example.com".into()),
            username: Some("alice".into()),
            password: Some("secret".into()),
            search_path: Some(search_path.into()),
        }
    }

    #[tokio::test]
    async fn scan_skips_unreadable_paths_and_keeps_order() {
        let client = FakeClient::default();
        let paths = vec!["/b".to_string(), "/missing".to_string(), "/a".to_string()];
        let listing = scan_paths(&client, &paths).await;

        let names: Vec<_> = listing.tracks.iter().map(|t| t.basename.as_str()).collect();
        assert_eq!(names, vec!["two.flac", "one.mp3"]);
        assert!(listing.contains("/a/one.jpg"));
        assert!(!listing.contains("/a/sub"));
        assert_eq!(client.listings.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn config_gate_only_invalidates_on_change() {
        let mut catalog = Catalog::new();
        let config = ConnectionConfig::from_variables(&variables("/a,/b")).unwrap();
        assert!(catalog.invalidate_if_config_changed(&config));
        assert_eq!(catalog.search_paths(), ["/a", "/b"]);
        assert!(!catalog.invalidate_if_config_changed(&config.clone()));

        let changed = ConnectionConfig::from_variables(&variables("/a")).unwrap();
        assert!(catalog.invalidate_if_config_changed(&changed));
        assert_eq!(catalog.search_paths(), ["/a"]);
    }

    #[test]
    fn connect_reuses_client_until_settings_change() {
        let mut catalog = Catalog::new();
        let factory = CountingFactory::default();

        let first = catalog.connect(&StaticConfig(variables("/a")), &factory).unwrap();
        let second = catalog.connect(&StaticConfig(variables("/a")), &factory).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(factory.created.load(Ordering::SeqCst), 1);

        catalog.connect(&StaticConfig(variables("/b")), &factory).unwrap();
        assert_eq!(factory.created.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn connect_without_credentials_fails() {
        let mut catalog = Catalog::new();
        let err = catalog
            .connect(&StaticConfig(UserVariables::default()), &CountingFactory::default())
            .err()
            .unwrap();
        assert!(matches!(err, PluginError::MissingCredentials { .. }));
    }

    #[tokio::test]
    async fn listing_is_memoized_until_invalidated() {
        let mut catalog = Catalog::new();
        let client = FakeClient::default();
        let config = ConnectionConfig::from_variables(&variables("/a")).unwrap();
        catalog.invalidate_if_config_changed(&config);

        assert_eq!(catalog.ensure_listing(&client).await.tracks.len(), 1);
        assert_eq!(catalog.ensure_listing(&client).await.tracks.len(), 1);
        assert_eq!(client.listings.load(Ordering::SeqCst), 1);

        catalog.invalidate();
        catalog.ensure_listing(&client).await;
        assert_eq!(client.listings.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn listing_policy_consults_scanned_files() {
        let client = FakeClient::default();
        let listing = scan_paths(&client, &["/a".to_string()]).await;
        let resolver = AssetResolver {
            client: &client,
            listing: Some(&listing),
            lookup: AssetLookup::Listing,
        };

        assert_eq!(resolver.cover_url("/a/one.mp3").await.as_deref(), Some("dav:/a/one.jpg"));
        assert_eq!(resolver.lyric_url("/a/one.mp3").await, None);
        assert_eq!(resolver.cover_url("/b/two.flac").await, None);
    }

    #[tokio::test]
    async fn live_policy_asks_the_server() {
        let client = FakeClient::default();
        let resolver = AssetResolver {
            client: &client,
            listing: None,
            lookup: AssetLookup::Live,
        };
        assert_eq!(resolver.cover_path("/a/one.mp3").await.as_deref(), Some("/a/one.png"));
        assert_eq!(resolver.lyric_path("/a/one.mp3").await, None);
    }
}
