//! Operations the host invokes on the WebDAV music plugin.

use crate::catalog::{scan_paths, AssetResolver, Catalog, Listing};
use crate::config::{AssetLookup, ConfigProvider, PluginManifest};
use crate::dav::{ClientFactory, ContentFormat, HttpClientFactory, WebDavClient};
use crate::error::{PluginError, Result};
use crate::filename::parse_file_name;
use crate::model::{
    DavEntry, LyricResult, MediaSource, MusicInfo, MusicItem, SearchResult, SearchType,
    TopListDetail, TopListGroup, TopListItem,
};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;

/// Title of the single category returned by [`WebDavMusicPlugin::get_top_lists`].
pub const ALL_SONGS: &str = "全部歌曲";

/// A plugin instance. The host keeps one per loaded plugin and calls its
/// operations on demand.
///
/// The catalog lock is held for the whole of each operation, so a call that
/// arrives while a scan is running waits for the finished listing.
pub struct WebDavMusicPlugin {
    config: Arc<dyn ConfigProvider>,
    factory: Arc<dyn ClientFactory>,
    asset_lookup: AssetLookup,
    catalog: Mutex<Catalog>,
}

impl WebDavMusicPlugin {
    pub fn new(config: Arc<dyn ConfigProvider>) -> Self {
        Self::with_factory(config, Arc::new(HttpClientFactory))
    }

    pub fn with_factory(config: Arc<dyn ConfigProvider>, factory: Arc<dyn ClientFactory>) -> Self {
        WebDavMusicPlugin {
            config,
            factory,
            asset_lookup: AssetLookup::default(),
            catalog: Mutex::new(Catalog::new()),
        }
    }

    pub fn with_asset_lookup(mut self, lookup: AssetLookup) -> Self {
        self.asset_lookup = lookup;
        self
    }

    pub fn manifest(&self) -> PluginManifest {
        PluginManifest::webdav()
    }

    /// Searches the cached listing for audio files whose name contains
    /// `query`. Results always fit in one page.
    pub async fn search(
        &self,
        query: &str,
        page: u32,
        search_type: SearchType,
    ) -> Result<SearchResult> {
        debug!("search {:?} (page {}, type {:?})", query, page, search_type);
        let mut catalog = self.catalog.lock().await;
        let client = catalog.connect(self.config.as_ref(), self.factory.as_ref())?;
        let listing = catalog.ensure_listing(client.as_ref()).await;

        let resolver = self.resolver(client.as_ref(), listing);
        let mut data = Vec::new();
        for entry in listing.matching(query) {
            data.push(to_music_item(entry, &resolver).await);
        }

        Ok(SearchResult { is_end: true, data })
    }

    /// One category whose entries are the configured search paths.
    pub async fn get_top_lists(&self) -> Result<Vec<TopListGroup>> {
        let mut catalog = self.catalog.lock().await;
        catalog.connect(self.config.as_ref(), self.factory.as_ref())?;

        let data = catalog
            .search_paths()
            .iter()
            .map(|path| TopListItem {
                id: path.clone(),
                title: path.clone(),
            })
            .collect();

        Ok(vec![TopListGroup {
            title: ALL_SONGS.to_string(),
            data,
        }])
    }

    /// Lists the audio files of one category path. Always reads the server;
    /// the cached listing is neither used nor updated.
    pub async fn get_top_list_detail(&self, item: &TopListItem) -> Result<TopListDetail> {
        let mut catalog = self.catalog.lock().await;
        let client = catalog.connect(self.config.as_ref(), self.factory.as_ref())?;
        drop(catalog);

        let listing = scan_paths(client.as_ref(), std::slice::from_ref(&item.id)).await;
        let resolver = self.resolver(client.as_ref(), &listing);
        let mut music_list = Vec::with_capacity(listing.tracks.len());
        for entry in &listing.tracks {
            music_list.push(to_music_item(entry, &resolver).await);
        }

        Ok(TopListDetail { music_list })
    }

    /// Direct download URL for a track. Fails when no client can be built.
    pub async fn get_media_source(&self, item: &MusicItem) -> Result<MediaSource> {
        let mut catalog = self.catalog.lock().await;
        let client = catalog.connect(self.config.as_ref(), self.factory.as_ref())?;
        Ok(MediaSource {
            url: client.get_file_download_link(&item.id),
        })
    }

    /// Artwork URL for a track, if a cover sits next to it.
    pub async fn get_music_info(&self, item: &MusicItem) -> Result<MusicInfo> {
        let mut catalog = self.catalog.lock().await;
        let client = catalog.connect(self.config.as_ref(), self.factory.as_ref())?;
        let listing = self.listing_for_lookup(&mut catalog, client.as_ref()).await;

        let resolver = AssetResolver {
            client: client.as_ref(),
            listing,
            lookup: self.asset_lookup,
        };
        Ok(MusicInfo {
            artwork: resolver.cover_url(&item.id).await,
        })
    }

    /// Raw text of the `.lrc` file next to a track.
    pub async fn get_lyric(&self, item: &MusicItem) -> Result<LyricResult> {
        let mut catalog = self.catalog.lock().await;
        let client = catalog.connect(self.config.as_ref(), self.factory.as_ref())?;
        let listing = self.listing_for_lookup(&mut catalog, client.as_ref()).await;

        let resolver = AssetResolver {
            client: client.as_ref(),
            listing,
            lookup: self.asset_lookup,
        };
        let Some(path) = resolver.lyric_path(&item.id).await else {
            return Ok(LyricResult::default());
        };

        match client.get_file_contents(&path, ContentFormat::Text).await {
            Ok(contents) => Ok(LyricResult {
                raw_lrc: Some(contents.into_text()),
            }),
            Err(PluginError::NotFound(_)) => Ok(LyricResult::default()),
            Err(e) => Err(e),
        }
    }

    /// Drops the cached listing; the next search rescans the server.
    pub async fn invalidate(&self) {
        self.catalog.lock().await.invalidate();
    }

    fn resolver<'a>(
        &self,
        client: &'a dyn WebDavClient,
        listing: &'a Listing,
    ) -> AssetResolver<'a> {
        AssetResolver {
            client,
            listing: Some(listing),
            lookup: self.asset_lookup,
        }
    }

    async fn listing_for_lookup<'a>(
        &self,
        catalog: &'a mut Catalog,
        client: &dyn WebDavClient,
    ) -> Option<&'a Listing> {
        match self.asset_lookup {
            AssetLookup::Listing => Some(catalog.ensure_listing(client).await),
            AssetLookup::Live => None,
        }
    }
}

async fn to_music_item(entry: &DavEntry, resolver: &AssetResolver<'_>) -> MusicItem {
    let track = parse_file_name(&entry.basename);
    MusicItem {
        id: entry.filename.clone(),
        title: track.title,
        artist: track.artist,
        album: track.album,
        cover: resolver.cover_url(&entry.filename).await,
        lyric: resolver.lyric_url(&entry.filename).await,
    }
}
