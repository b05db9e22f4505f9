use super::{
    normalize_path, parse_multistatus, ClientFactory, ContentFormat, FileContents, WebDavClient,
};
use crate::config::Credentials;
use crate::error::{PluginError, Result};
use crate::model::DavEntry;
use async_trait::async_trait;
use reqwest::{Client, Method, Response, StatusCode};
use std::sync::Arc;
use tracing::debug;
use url::Url;

const PROPFIND_BODY: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<d:propfind xmlns:d="DAV:">
  <d:prop>
    <d:resourcetype/>
    <d:getcontenttype/>
    <d:getcontentlength/>
    <d:getlastmodified/>
  </d:prop>
</d:propfind>"#;

/// WebDAV client over reqwest with basic authentication.
pub struct HttpDavClient {
    http: Client,
    base: Url,
    credentials: Credentials,
    propfind: Method,
}

impl HttpDavClient {
    pub fn new(url: &str, credentials: Credentials) -> Result<Self> {
        let base = Url::parse(url)?;
        if !matches!(base.scheme(), "http" | "https") || base.host_str().is_none() {
            return Err(PluginError::Request(format!(
                "{url} is not an http(s) url with a host"
            )));
        }
        let propfind = Method::from_bytes(b"PROPFIND")
            .map_err(|e| PluginError::Request(e.to_string()))?;

        Ok(HttpDavClient {
            http: Client::new(),
            base,
            credentials,
            propfind,
        })
    }

    /// Full URL of a server path, each segment percent-encoded.
    pub fn url_for(&self, path: &str) -> Url {
        let encoded = path
            .split('/')
            .filter(|segment| !segment.is_empty())
            .map(|segment| urlencoding::encode(segment).into_owned())
            .collect::<Vec<_>>()
            .join("/");

        let base_path = self.base.path().trim_end_matches('/');
        let mut full = if encoded.is_empty() {
            format!("{base_path}/")
        } else {
            format!("{base_path}/{encoded}")
        };
        if path.ends_with('/') && !full.ends_with('/') {
            full.push('/');
        }

        let mut url = self.base.clone();
        url.set_path(&full);
        url
    }

    async fn propfind(&self, path: &str, depth: &str) -> Result<Response> {
        let url = self.url_for(path);
        debug!("PROPFIND {} (depth {})", url, depth);
        let response = self
            .http
            .request(self.propfind.clone(), url)
            .basic_auth(&self.credentials.username, Some(&self.credentials.password))
            .header("Depth", depth)
            .header("Content-Type", "application/xml; charset=utf-8")
            .body(PROPFIND_BODY)
            .send()
            .await?;
        Ok(response)
    }
}

fn ensure_success(response: Response, method: &'static str, path: &str) -> Result<Response> {
    match response.status() {
        status if status.is_success() => Ok(response),
        StatusCode::NOT_FOUND => Err(PluginError::NotFound(path.to_string())),
        status => Err(PluginError::Status {
            method,
            path: path.to_string(),
            status: status.as_u16(),
        }),
    }
}

#[async_trait]
impl WebDavClient for HttpDavClient {
    async fn get_directory_contents(&self, path: &str) -> Result<Vec<DavEntry>> {
        let response = ensure_success(self.propfind(path, "1").await?, "PROPFIND", path)?;
        let body = response.text().await?;
        let requested = normalize_path(path);

        let mut entries = parse_multistatus(&body, self.base.path())?;
        entries.retain(|entry| normalize_path(&entry.filename) != requested);
        debug!("Listed {} entries under {}", entries.len(), requested);
        Ok(entries)
    }

    async fn exists(&self, path: &str) -> Result<bool> {
        let response = self.propfind(path, "0").await?;
        match response.status() {
            StatusCode::NOT_FOUND => Ok(false),
            status if status.is_success() => Ok(true),
            status => Err(PluginError::Status {
                method: "PROPFIND",
                path: path.to_string(),
                status: status.as_u16(),
            }),
        }
    }

    async fn get_file_contents(&self, path: &str, format: ContentFormat) -> Result<FileContents> {
        let url = self.url_for(path);
        debug!("GET {}", url);
        let response = self
            .http
            .get(url)
            .basic_auth(&self.credentials.username, Some(&self.credentials.password))
            .send()
            .await?;
        let response = ensure_success(response, "GET", path)?;

        match format {
            ContentFormat::Binary => Ok(FileContents::Binary(response.bytes().await?.to_vec())),
            ContentFormat::Text => Ok(FileContents::Text(response.text().await?)),
        }
    }

    fn get_file_download_link(&self, path: &str) -> String {
        let mut url = self.url_for(path);
        // Cannot fail: `new` only accepts http(s) urls with a host.
        let _ = url.set_username(&self.credentials.username);
        let _ = url.set_password(Some(&self.credentials.password));
        url.to_string()
    }
}

/// Builds [`HttpDavClient`]s.
#[derive(Debug, Clone, Copy, Default)]
pub struct HttpClientFactory;

impl ClientFactory for HttpClientFactory {
    fn create_client(&self, url: &str, credentials: &Credentials) -> Result<Arc<dyn WebDavClient>> {
        Ok(Arc::new(HttpDavClient::new(url, credentials.clone())?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AuthType;

    fn client(url: &str) -> HttpDavClient {
        HttpDavClient::new(
            url,
            Credentials {
                auth_type: AuthType::Password,
                username: "alice".into(),
                password: "p@ss word".into(),
            },
        )
        .unwrap()
    }

    #[test]
    fn url_for_joins_base_path_and_encodes_segments() {
        let c = client("https://dav.example.com/remote.php/webdav/");
        assert_eq!(
            c.url_for("/Music/A - B.mp3").as_str(),
            "https://dav.example.com/remote.php/webdav/Music/A%20-%20B.mp3"
        );
        assert_eq!(c.url_for("/").as_str(), "https://dav.example.com/remote.php/webdav/");
        assert_eq!(
            c.url_for("Music/").as_str(),
            "https://dav.example.com/remote.php/webdav/Music/"
        );
    }

    #[test]
    fn url_for_without_base_path() {
        let c = client("http://nas.local:5005");
        assert_eq!(c.url_for("/a.mp3").as_str(), "http://nas.local:5005/a.mp3");
    }

    #[test]
    fn download_link_embeds_credentials() {
        let c = client("https://dav.example.com/dav");
        let link = c.get_file_download_link("/song.mp3");
        let parsed = Url::parse(&link).unwrap();
        assert_eq!(parsed.username(), "alice");
        assert!(parsed.password().is_some());
        assert_eq!(parsed.path(), "/dav/song.mp3");
    }

    #[test]
    fn rejects_unusable_urls() {
        let creds = Credentials {
            auth_type: AuthType::Password,
            username: "u".into(),
            password: "p".into(),
        };
        assert!(HttpDavClient::new("not a url", creds.clone()).is_err());
        assert!(HttpDavClient::new("mailto:someone@example.com", creds.clone()).is_err());
        assert!(HttpDavClient::new("file:///srv/music", creds.clone()).is_err());
        assert!(HttpDavClient::new("ftp://nas.local/music", creds).is_err());
    }

    const MULTISTATUS: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<d:multistatus xmlns:d="DAV:">
  <d:response>
    <d:href>/dav/Music/</d:href>
    <d:propstat>
      <d:prop><d:resourcetype><d:collection/></d:resourcetype></d:prop>
      <d:status>HTTP/1.1 200 OK</d:status>
    </d:propstat>
  </d:response>
  <d:response>
    <d:href>/dav/Music/%E6%AD%8C%20-%20a%20-%20b.mp3</d:href>
    <d:propstat>
      <d:prop>
        <d:resourcetype/>
        <d:getcontenttype>audio/mpeg</d:getcontenttype>
        <d:getcontentlength>1024</d:getcontentlength>
      </d:prop>
      <d:status>HTTP/1.1 200 OK</d:status>
    </d:propstat>
  </d:response>
</d:multistatus>"#;

    /// Canned reply for a request line such as `PROPFIND /dav/Music HTTP/1.1`.
    fn reply(request_line: &str) -> (u16, &'static str) {
        let mut parts = request_line.split(' ');
        let method = parts.next().unwrap_or_default();
        let target = parts.next().unwrap_or_default();
        match (method, target) {
            ("PROPFIND", "/dav/Music") => (207, MULTISTATUS),
            ("PROPFIND", "/dav/Music/cover.png") => (207, ""),
            ("PROPFIND", "/dav/Locked") => (403, ""),
            ("GET", "/dav/Music/song.lrc") => (200, "[00:01.00]hello"),
            _ => (404, ""),
        }
    }

    /// Serves one request per connection with `reply`, closing afterwards.
    async fn serve() -> String {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            loop {
                let Ok((mut socket, _)) = listener.accept().await else {
                    return;
                };
                let mut buf = Vec::new();
                let mut chunk = [0u8; 4096];
                let head_end = loop {
                    let n = socket.read(&mut chunk).await.unwrap_or(0);
                    if n == 0 {
                        break None;
                    }
                    buf.extend_from_slice(&chunk[..n]);
                    if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
                        break Some(pos + 4);
                    }
                };
                let Some(head_end) = head_end else {
                    continue;
                };
                let head = String::from_utf8_lossy(&buf[..head_end]).into_owned();
                let content_length = head
                    .lines()
                    .filter_map(|line| line.split_once(':'))
                    .find(|(name, _)| name.eq_ignore_ascii_case("content-length"))
                    .and_then(|(_, value)| value.trim().parse::<usize>().ok())
                    .unwrap_or(0);
                while buf.len() < head_end + content_length {
                    let n = socket.read(&mut chunk).await.unwrap_or(0);
                    if n == 0 {
                        break;
                    }
                    buf.extend_from_slice(&chunk[..n]);
                }

                let (status, body) = reply(head.lines().next().unwrap_or_default());
                let response = format!(
                    "HTTP/1.1 {status} X\r\nContent-Type: application/xml\r\n\
                     Content-Length: {}\r\nConnection: close\r\n\r\n{body}",
                    body.len()
                );
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            }
        });
        format!("http://{addr}/dav")
    }

    #[tokio::test]
    async fn listing_drops_the_requested_collection_and_decodes_names() {
        let c = client(&serve().await);
        let entries = c.get_directory_contents("/Music").await.unwrap();

        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].filename, "/Music/歌 - a - b.mp3");
        assert_eq!(entries[0].size, 1024);
        assert!(entries[0].is_audio());
    }

    #[tokio::test]
    async fn listing_status_errors_are_distinguished() {
        let c = client(&serve().await);
        assert!(matches!(
            c.get_directory_contents("/Gone").await,
            Err(PluginError::NotFound(path)) if path == "/Gone"
        ));
        assert!(matches!(
            c.get_directory_contents("/Locked").await,
            Err(PluginError::Status { status: 403, .. })
        ));
    }

    #[tokio::test]
    async fn exists_maps_not_found_to_false() {
        let c = client(&serve().await);
        assert!(!c.exists("/Music/cover.jpg").await.unwrap());
        assert!(c.exists("/Music/cover.png").await.unwrap());
        assert!(matches!(
            c.exists("/Locked").await,
            Err(PluginError::Status { status: 403, .. })
        ));
    }

    #[tokio::test]
    async fn file_contents_are_fetched_with_get() {
        let c = client(&serve().await);
        let lyric = c
            .get_file_contents("/Music/song.lrc", ContentFormat::Text)
            .await
            .unwrap();
        assert_eq!(lyric.into_text(), "[00:01.00]hello");
        assert!(matches!(
            c.get_file_contents("/Music/other.lrc", ContentFormat::Text).await,
            Err(PluginError::NotFound(_))
        ));
    }
}
