use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of a remote directory entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    File,
    Directory,
}

/// One entry of a WebDAV directory listing.
///
/// `filename` is the full path relative to the server root configured in the
/// connection url, `basename` its last segment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DavEntry {
    pub filename: String,
    pub basename: String,
    #[serde(rename = "type")]
    pub kind: EntryKind,
    pub mime: Option<String>,
    pub size: u64,
    pub last_modified: Option<DateTime<FixedOffset>>,
}

impl DavEntry {
    pub fn file(filename: impl Into<String>, mime: Option<&str>) -> Self {
        let filename = filename.into();
        let basename = basename_of(&filename).to_string();
        DavEntry {
            filename,
            basename,
            kind: EntryKind::File,
            mime: mime.map(str::to_string),
            size: 0,
            last_modified: None,
        }
    }

    pub fn directory(filename: impl Into<String>) -> Self {
        let filename = filename.into();
        let basename = basename_of(&filename).to_string();
        DavEntry {
            filename,
            basename,
            kind: EntryKind::Directory,
            mime: None,
            size: 0,
            last_modified: None,
        }
    }

    /// True for plain files whose MIME type starts with `audio`.
    pub fn is_audio(&self) -> bool {
        self.kind == EntryKind::File
            && self
                .mime
                .as_deref()
                .is_some_and(|mime| mime.starts_with("audio"))
    }
}

/// `ls -l` style line: modification time, size, path.
impl fmt::Display for DavEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let modified = self
            .last_modified
            .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_else(|| "-".to_string());
        match self.kind {
            EntryKind::File => write!(f, "{modified:<16}  {:>10}  {}", self.size, self.filename),
            EntryKind::Directory => write!(f, "{modified:<16}  {:>10}  {}/", "-", self.filename),
        }
    }
}

pub(crate) fn basename_of(path: &str) -> &str {
    path.trim_end_matches('/').rsplit('/').next().unwrap_or(path)
}

/// The record the host consumes to represent a playable track.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MusicItem {
    pub id: String,
    pub title: String,
    pub artist: String,
    pub album: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cover: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lyric: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResult {
    pub is_end: bool,
    pub data: Vec<MusicItem>,
}

/// A browsable category entry; `id` is the search path it lists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopListItem {
    pub id: String,
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopListGroup {
    pub title: String,
    pub data: Vec<TopListItem>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopListDetail {
    pub music_list: Vec<MusicItem>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaSource {
    pub url: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MusicInfo {
    pub artwork: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LyricResult {
    pub raw_lrc: Option<String>,
}

/// Search type declared by the host; only `music` is supported.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchType {
    #[default]
    Music,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn audio_filter_requires_file_and_audio_mime() {
        assert!(DavEntry::file("/m/a.mp3", Some("audio/mpeg")).is_audio());
        assert!(!DavEntry::file("/m/a.jpg", Some("image/jpeg")).is_audio());
        assert!(!DavEntry::file("/m/unknown", None).is_audio());
        assert!(!DavEntry::directory("/m/audio").is_audio());
    }

    #[test]
    fn basename_is_last_segment() {
        assert_eq!(DavEntry::file("/a/b/song.mp3", None).basename, "song.mp3");
        assert_eq!(DavEntry::directory("/a/b/").basename, "b");
    }

    #[test]
    fn display_shows_modified_time_and_size() {
        let mut song = DavEntry::file("/m/a.mp3", Some("audio/mpeg"));
        song.size = 4096;
        song.last_modified = DateTime::parse_from_rfc2822("Fri, 12 Jan 2024 10:00:00 GMT").ok();
        assert_eq!(song.to_string(), "2024-01-12 10:00        4096  /m/a.mp3");

        let dir = DavEntry::directory("/m/sub");
        assert_eq!(dir.to_string(), "-                          -  /m/sub/");
    }

    #[test]
    fn music_item_omits_absent_assets() {
        let item = MusicItem {
            id: "/a.mp3".into(),
            title: "a".into(),
            artist: "x".into(),
            album: "y".into(),
            cover: None,
            lyric: None,
        };
        let json = serde_json::to_value(&item).unwrap();
        assert!(json.get("cover").is_none());
        assert_eq!(json["id"], "/a.mp3");
    }

    #[test]
    fn search_result_uses_host_field_names() {
        let json = serde_json::to_value(SearchResult {
            is_end: true,
            data: vec![],
        })
        .unwrap();
        assert_eq!(json["isEnd"], true);
    }
}
