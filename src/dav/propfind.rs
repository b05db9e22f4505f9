//! Parser for PROPFIND multistatus bodies.
//!
//! Element names are matched on their local part, so `D:href`, `d:href` and
//! `href` in a default namespace are all accepted.

use super::normalize_path;
use crate::error::{PluginError, Result};
use crate::model::{basename_of, DavEntry, EntryKind};
use chrono::DateTime;
use quick_xml::events::Event;
use quick_xml::Reader;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Href,
    ContentType,
    ContentLength,
    LastModified,
}

#[derive(Default)]
struct Response {
    href: String,
    content_type: Option<String>,
    content_length: Option<u64>,
    last_modified: Option<String>,
    is_collection: bool,
}

/// Parses a multistatus body into entries with paths relative to
/// `base_path`, the path component of the configured server url.
pub fn parse_multistatus(xml: &str, base_path: &str) -> Result<Vec<DavEntry>> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut entries = Vec::new();
    let mut current: Option<Response> = None;
    let mut field: Option<Field> = None;

    loop {
        match reader.read_event()? {
            Event::Start(e) => match e.local_name().as_ref() {
                b"response" => current = Some(Response::default()),
                b"href" => field = Some(Field::Href),
                b"getcontenttype" => field = Some(Field::ContentType),
                b"getcontentlength" => field = Some(Field::ContentLength),
                b"getlastmodified" => field = Some(Field::LastModified),
                b"collection" => {
                    if let Some(resp) = current.as_mut() {
                        resp.is_collection = true;
                    }
                }
                _ => {}
            },
            Event::Empty(e) => {
                if e.local_name().as_ref() == b"collection" {
                    if let Some(resp) = current.as_mut() {
                        resp.is_collection = true;
                    }
                }
            }
            Event::Text(t) => {
                if let (Some(resp), Some(field)) = (current.as_mut(), field) {
                    let text = t
                        .unescape()
                        .map_err(|e| PluginError::Xml(e.to_string()))?
                        .into_owned();
                    match field {
                        Field::Href => resp.href.push_str(&text),
                        Field::ContentType => resp.content_type = Some(text),
                        Field::ContentLength => resp.content_length = text.trim().parse().ok(),
                        Field::LastModified => resp.last_modified = Some(text),
                    }
                }
            }
            Event::End(e) => match e.local_name().as_ref() {
                b"response" => {
                    if let Some(resp) = current.take() {
                        if !resp.href.is_empty() {
                            entries.push(into_entry(resp, base_path));
                        }
                    }
                }
                b"href" | b"getcontenttype" | b"getcontentlength" | b"getlastmodified" => {
                    field = None;
                }
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(entries)
}

fn into_entry(resp: Response, base_path: &str) -> DavEntry {
    let filename = href_to_path(&resp.href, base_path);
    let basename = basename_of(&filename).to_string();
    let kind = if resp.is_collection {
        EntryKind::Directory
    } else {
        EntryKind::File
    };

    let mime = match kind {
        EntryKind::Directory => None,
        EntryKind::File => resp
            .content_type
            .map(|ct| ct.trim().to_string())
            .filter(|ct| !ct.is_empty())
            .or_else(|| {
                mime_guess::from_path(&basename)
                    .first_raw()
                    .map(str::to_string)
            }),
    };

    DavEntry {
        filename,
        basename,
        kind,
        mime,
        size: resp.content_length.unwrap_or(0),
        last_modified: resp
            .last_modified
            .and_then(|lm| DateTime::parse_from_rfc2822(lm.trim()).ok()),
    }
}

/// Maps an href (absolute URL or absolute path, percent-encoded) to a
/// decoded path relative to `base_path`.
fn href_to_path(href: &str, base_path: &str) -> String {
    let raw_path = if href.starts_with("http://") || href.starts_with("https://") {
        url::Url::parse(href)
            .map(|u| u.path().to_string())
            .unwrap_or_else(|_| href.to_string())
    } else {
        href.to_string()
    };

    let decoded = decode(&raw_path);
    let base = normalize_path(&decode(base_path));

    let relative = if base == "/" {
        decoded.as_str()
    } else {
        match decoded.strip_prefix(base.as_str()) {
            Some(rest) if rest.is_empty() || rest.starts_with('/') => rest,
            _ => decoded.as_str(),
        }
    };

    normalize_path(relative)
}

fn decode(path: &str) -> String {
    match urlencoding::decode(path) {
        Ok(s) => s.into_owned(),
        // Non UTF-8 names (e.g. GBK) decode lossily.
        Err(_) => {
            String::from_utf8_lossy(&urlencoding::decode_binary(path.as_bytes())).into_owned()
        }
    }
}
