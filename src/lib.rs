//! WebDAV Music Core Library
//!
//! Music source plugin that lets a player host browse a WebDAV server and
//! surface audio files, cover art and lyrics as playable music items.
//!
//! # Architecture
//!
//! The library is loaded by a host application, either linked from Rust or
//! through the C ABI in the `ffi` module. The host supplies user variables
//! (server url, credentials, search paths) and calls the query operations on
//! demand.
//!
//! ## Catalog (`catalog` module)
//! - Config gate: the cached listing is dropped whenever url, username,
//!   password or search path change
//! - Directory scanner: one level per search path, audio files only
//! - Cover and lyric lookup by sibling file name
//!
//! ## Query Operations (`plugin` module)
//! - `search()` - Substring search over the cached listing
//! - `get_top_lists()` - One "all songs" category listing the search paths
//! - `get_top_list_detail()` - Fresh listing of one search path
//! - `get_media_source()` - Direct download URL for playback
//! - `get_music_info()` / `get_lyric()` - Artwork URL and raw lyric text
//!
//! ## WebDAV access (`dav` module)
//! - `WebDavClient` / `ClientFactory` - The seam the catalog talks through
//! - `HttpDavClient` - reqwest implementation using PROPFIND and GET
//!
//! ## Data Structures (`model` and `config` modules)
//! - `MusicItem` - Normalized track record handed to the host
//! - `DavEntry` - One remote directory entry
//! - `UserVariables` / `ConnectionConfig` - Raw and validated settings
//! - `PluginManifest` - Static metadata declared to the host

pub mod catalog;
pub mod config;
pub mod dav;
pub mod error;
pub mod ffi;
pub mod filename;
pub mod model;
pub mod plugin;

pub use catalog::{Catalog, Listing};
pub use config::{
    search_path_list, AssetLookup, ConfigProvider, ConnectionConfig, PluginManifest, SharedConfig,
    StaticConfig, UserVariables,
};
pub use dav::{ClientFactory, HttpClientFactory, HttpDavClient, WebDavClient};
pub use error::{PluginError, Result};
pub use filename::{parse_file_name, TrackName};
pub use model::{
    DavEntry, EntryKind, LyricResult, MediaSource, MusicInfo, MusicItem, SearchResult, SearchType,
    TopListDetail, TopListGroup, TopListItem,
};
pub use plugin::WebDavMusicPlugin;
