//! Track metadata derived from file names.
//!
//! Files named `Artist - Title - Album.ext` carry their own tags; anything
//! else becomes a title-only track with placeholder artist and album.

/// Artist used when the file name does not follow the convention.
pub const UNKNOWN_ARTIST: &str = "未知歌手";
/// Album used when the file name does not follow the convention.
pub const DEFAULT_ALBUM: &str = "默认专辑";

const FIELD_SEPARATOR: &str = " - ";

/// Cover candidates, in order of preference.
pub const COVER_EXTENSIONS: [&str; 2] = [".jpg", ".png"];
pub const LYRIC_EXTENSION: &str = ".lrc";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackName {
    pub artist: String,
    pub title: String,
    pub album: String,
}

pub fn parse_file_name(basename: &str) -> TrackName {
    let parts: Vec<&str> = basename.split(FIELD_SEPARATOR).collect();
    if let [artist, title, album] = parts.as_slice() {
        return TrackName {
            artist: artist.trim().to_string(),
            title: title.trim().to_string(),
            album: strip_extension(album).trim().to_string(),
        };
    }

    TrackName {
        artist: UNKNOWN_ARTIST.to_string(),
        title: strip_extension(basename).trim().to_string(),
        album: DEFAULT_ALBUM.to_string(),
    }
}

/// Removes the last `.ext` of the final path segment, if there is one.
pub fn strip_extension(name: &str) -> &str {
    match name.rfind('.') {
        Some(dot) if dot + 1 < name.len() && !name[dot + 1..].contains('/') => &name[..dot],
        _ => name,
    }
}

/// Path of a companion file: the extension of `path` replaced by `extension`
/// (which includes the leading dot).
pub fn sibling_path(path: &str, extension: &str) -> String {
    format!("{}{}", strip_extension(path), extension)
}
