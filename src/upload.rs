//! Image host upload client.
//!
//! Takes a local file or a remote URL, posts it to the configured
//! endpoint as multipart form data with a bearer token, and copies the
//! markdown link from the JSON response to the system clipboard. Remote
//! targets are first downloaded to a temporary file that never survives
//! the call; local targets are never deleted here.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use tempfile::NamedTempFile;
use thiserror::Error;
use url::Url;

use crate::config::Config;

/// Errors from resolving, transferring, or recording an upload.
#[derive(Debug, Error)]
pub enum UploadError {
    #[error("upload endpoint returned {status}: {body}")]
    Http { status: u16, body: String },

    #[error("request to {url} timed out")]
    Timeout { url: String },

    #[error("request to {url} failed: {source}")]
    Network { url: String, source: reqwest::Error },

    #[error("could not parse upload response ({0}); body: {1}")]
    InvalidResponse(serde_json::Error, String),

    #[error("invalid URL '{0}': {1}")]
    InvalidUrl(String, url::ParseError),

    #[error("clipboard content is not a recognized local path or URL")]
    ClipboardContent,

    #[error("clipboard access failed: {0}")]
    Clipboard(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// What the upload should read from, disambiguated by scheme: an
/// `http(s)://` prefix means remote, anything else is a local path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadTarget {
    Local(PathBuf),
    Remote(Url),
}

impl UploadTarget {
    pub fn parse(input: &str) -> Result<Self, UploadError> {
        if is_http_url(input) {
            let url = Url::parse(input)
                .map_err(|e| UploadError::InvalidUrl(input.to_string(), e))?;
            Ok(UploadTarget::Remote(url))
        } else {
            Ok(UploadTarget::Local(PathBuf::from(input)))
        }
    }
}

fn is_http_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

/// Result of a successful upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadOutcome {
    /// The host returned a markdown link; it has been copied to the
    /// clipboard.
    Linked { markdown: String },
    /// 2xx without a `markdown` field. Valid, but nothing to copy.
    NoLink { body: String },
}

#[derive(Deserialize)]
struct UploadResponse {
    #[serde(default)]
    markdown: Option<String>,
}

/// Access to the system clipboard, mockable in tests.
pub trait ClipboardSink: Send + Sync {
    fn read_text(&self) -> Result<String, UploadError>;
    fn write_text(&self, text: &str) -> Result<(), UploadError>;
}

/// arboard-backed clipboard. A fresh handle per operation; the clipboard
/// is last-writer-wins shared state, there is nothing to hold on to.
pub struct SystemClipboard;

impl ClipboardSink for SystemClipboard {
    fn read_text(&self) -> Result<String, UploadError> {
        let mut clipboard =
            arboard::Clipboard::new().map_err(|e| UploadError::Clipboard(e.to_string()))?;
        clipboard
            .get_text()
            .map_err(|e| UploadError::Clipboard(e.to_string()))
    }

    fn write_text(&self, text: &str) -> Result<(), UploadError> {
        let mut clipboard =
            arboard::Clipboard::new().map_err(|e| UploadError::Clipboard(e.to_string()))?;
        clipboard
            .set_text(text.to_string())
            .map_err(|e| UploadError::Clipboard(e.to_string()))
    }
}

pub struct UploadClient {
    http: reqwest::Client,
    api_url: String,
    api_key: String,
    clipboard: Arc<dyn ClipboardSink>,
}

impl UploadClient {
    pub fn new(config: &Config) -> Result<Self, UploadError> {
        Self::with_clipboard(config, Arc::new(SystemClipboard))
    }

    /// Construct with an explicit clipboard implementation.
    pub fn with_clipboard(
        config: &Config,
        clipboard: Arc<dyn ClipboardSink>,
    ) -> Result<Self, UploadError> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| UploadError::Network {
                url: config.api_url.clone(),
                source: e,
            })?;
        Ok(Self {
            http,
            api_url: config.api_url.clone(),
            api_key: config.api_key.clone(),
            clipboard,
        })
    }

    /// Resolve the upload target from the clipboard's current text: an
    /// absolute `http(s)` URL or an existing local path. Anything else
    /// aborts before any network traffic.
    pub fn target_from_clipboard(&self) -> Result<UploadTarget, UploadError> {
        let text = self.clipboard.read_text()?;
        let trimmed = text.trim();
        if is_http_url(trimmed) {
            return UploadTarget::parse(trimmed);
        }
        let path = Path::new(trimmed);
        if path.exists() {
            return Ok(UploadTarget::Local(path.to_path_buf()));
        }
        Err(UploadError::ClipboardContent)
    }

    /// Upload `target` and copy the returned markdown link to the
    /// clipboard.
    pub async fn upload(&self, target: &UploadTarget) -> Result<UploadOutcome, UploadError> {
        match target {
            UploadTarget::Local(path) => self.upload_local(path).await,
            UploadTarget::Remote(url) => {
                let tmp = self.download_to_temp(url).await?;
                // tmp is removed when it drops, whatever the upload did
                self.upload_local(tmp.path()).await
            }
        }
    }

    async fn upload_local(&self, path: &Path) -> Result<UploadOutcome, UploadError> {
        let bytes = std::fs::read(path)?;
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("upload.bin")
            .to_string();
        let part = Part::bytes(bytes)
            .file_name(file_name)
            .mime_str(mime_for_path(path))
            .map_err(|e| UploadError::Network {
                url: self.api_url.clone(),
                source: e,
            })?;
        let form = Form::new().part("file", part);

        log::info!("Uploading {} to {}", path.display(), self.api_url);
        let response = self
            .http
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .multipart(form)
            .send()
            .await
            .map_err(|e| classify_request_error(&self.api_url, e))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| classify_request_error(&self.api_url, e))?;
        if !status.is_success() {
            return Err(UploadError::Http {
                status: status.as_u16(),
                body,
            });
        }

        let outcome = parse_upload_response(&body)?;
        if let UploadOutcome::Linked { markdown } = &outcome {
            self.clipboard.write_text(markdown)?;
            log::info!("Markdown link copied to clipboard: {markdown}");
        } else {
            log::info!("Upload succeeded but the host returned no markdown link");
        }
        Ok(outcome)
    }

    /// Stream a remote image into a temp file that carries the URL's
    /// extension, so MIME inference still works on the re-upload.
    async fn download_to_temp(&self, url: &Url) -> Result<NamedTempFile, UploadError> {
        log::info!("Downloading {url} for re-upload");
        let mut response = self
            .http
            .get(url.clone())
            .send()
            .await
            .map_err(|e| classify_request_error(url.as_str(), e))?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(UploadError::Http {
                status: status.as_u16(),
                body,
            });
        }

        let mut tmp = match url_suffix(url) {
            Some(suffix) => tempfile::Builder::new().suffix(&suffix).tempfile()?,
            None => NamedTempFile::new()?,
        };
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| classify_request_error(url.as_str(), e))?
        {
            tmp.write_all(&chunk)?;
        }
        tmp.flush()?;
        Ok(tmp)
    }
}

fn classify_request_error(url: &str, err: reqwest::Error) -> UploadError {
    if err.is_timeout() {
        UploadError::Timeout {
            url: url.to_string(),
        }
    } else {
        UploadError::Network {
            url: url.to_string(),
            source: err,
        }
    }
}

fn parse_upload_response(body: &str) -> Result<UploadOutcome, UploadError> {
    let parsed: UploadResponse = serde_json::from_str(body)
        .map_err(|e| UploadError::InvalidResponse(e, body.to_string()))?;
    match parsed.markdown {
        Some(markdown) if !markdown.is_empty() => Ok(UploadOutcome::Linked { markdown }),
        _ => Ok(UploadOutcome::NoLink {
            body: body.to_string(),
        }),
    }
}

/// Extension-based MIME lookup; generic binary when unknown.
fn mime_for_path(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());
    match ext.as_deref() {
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("bmp") => "image/bmp",
        Some("svg") => "image/svg+xml",
        Some("tif") | Some("tiff") => "image/tiff",
        _ => "application/octet-stream",
    }
}

/// `.png`-style suffix from the URL path, if it has one.
fn url_suffix(url: &Url) -> Option<String> {
    let ext = Path::new(url.path()).extension()?.to_str()?;
    Some(format!(".{ext}"))
}

#[cfg(test)]
mod tests {
    use std::io::{BufRead, BufReader, Read, Write};
    use std::net::{TcpListener, TcpStream};
    use std::sync::Mutex;
    use std::time::Duration;

    use super::*;

    #[derive(Default)]
    struct MockClipboard {
        content: Mutex<String>,
        written: Mutex<Option<String>>,
    }

    impl MockClipboard {
        fn with_content(content: &str) -> Arc<Self> {
            Arc::new(Self {
                content: Mutex::new(content.to_string()),
                written: Mutex::new(None),
            })
        }

        fn written(&self) -> Option<String> {
            self.written.lock().unwrap().clone()
        }
    }

    impl ClipboardSink for MockClipboard {
        fn read_text(&self) -> Result<String, UploadError> {
            Ok(self.content.lock().unwrap().clone())
        }

        fn write_text(&self, text: &str) -> Result<(), UploadError> {
            *self.written.lock().unwrap() = Some(text.to_string());
            Ok(())
        }
    }

    fn test_config(api_url: String) -> Config {
        Config {
            api_url,
            api_key: "test-key".into(),
            request_timeout: Duration::from_secs(5),
        }
    }

    fn client_with(
        api_url: String,
        clipboard: Arc<MockClipboard>,
    ) -> UploadClient {
        UploadClient::with_clipboard(&test_config(api_url), clipboard).unwrap()
    }

    /// Serve exactly one HTTP request on a loopback port, discarding the
    /// request and answering with the canned status and body.
    fn spawn_stub_server(status_line: &'static str, body: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        std::thread::spawn(move || {
            if let Ok((mut stream, _)) = listener.accept() {
                consume_request(&mut stream);
                let response = format!(
                    "{status_line}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                    body.len()
                );
                let _ = stream.write_all(response.as_bytes());
            }
        });
        format!("http://{addr}/upload")
    }

    fn consume_request(stream: &mut TcpStream) {
        let mut reader = BufReader::new(stream.try_clone().unwrap());
        let mut content_length = 0usize;
        loop {
            let mut line = String::new();
            if reader.read_line(&mut line).unwrap_or(0) == 0 {
                return;
            }
            let line = line.trim_end();
            if line.is_empty() {
                break;
            }
            if let Some(value) = line.to_ascii_lowercase().strip_prefix("content-length:") {
                content_length = value.trim().parse().unwrap_or(0);
            }
        }
        let mut body = vec![0u8; content_length];
        let _ = reader.read_exact(&mut body);
    }

    fn temp_png() -> NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".png").tempfile().unwrap();
        file.write_all(b"fake png bytes").unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn scheme_prefix_selects_remote_targets() {
        assert!(matches!(
            UploadTarget::parse("http://img.example/a.png").unwrap(),
            UploadTarget::Remote(_)
        ));
        assert!(matches!(
            UploadTarget::parse("https://img.example/a.png").unwrap(),
            UploadTarget::Remote(_)
        ));
        assert_eq!(
            UploadTarget::parse("/tmp/a.png").unwrap(),
            UploadTarget::Local(PathBuf::from("/tmp/a.png"))
        );
        assert_eq!(
            UploadTarget::parse("httpserver/a.png").unwrap(),
            UploadTarget::Local(PathBuf::from("httpserver/a.png"))
        );
    }

    #[test]
    fn mime_lookup_defaults_to_octet_stream() {
        assert_eq!(mime_for_path(Path::new("shot.png")), "image/png");
        assert_eq!(mime_for_path(Path::new("shot.JPG")), "image/jpeg");
        assert_eq!(mime_for_path(Path::new("shot.jpeg")), "image/jpeg");
        assert_eq!(mime_for_path(Path::new("shot.webp")), "image/webp");
        assert_eq!(mime_for_path(Path::new("shot.xyz")), "application/octet-stream");
        assert_eq!(mime_for_path(Path::new("no-extension")), "application/octet-stream");
    }

    #[test]
    fn url_suffix_preserves_extension() {
        let url = Url::parse("http://img.example/dir/pic.jpeg?size=large").unwrap();
        assert_eq!(url_suffix(&url), Some(".jpeg".to_string()));
        let bare = Url::parse("http://img.example/pic").unwrap();
        assert_eq!(url_suffix(&bare), None);
    }

    #[test]
    fn response_with_markdown_is_linked() {
        let outcome = parse_upload_response(r#"{"markdown":"![x](http://u)"}"#).unwrap();
        assert_eq!(
            outcome,
            UploadOutcome::Linked {
                markdown: "![x](http://u)".into()
            }
        );
    }

    #[test]
    fn response_without_markdown_is_a_linkless_success() {
        let body = r#"{"url":"http://img.example/1.png"}"#;
        let outcome = parse_upload_response(body).unwrap();
        assert_eq!(
            outcome,
            UploadOutcome::NoLink {
                body: body.to_string()
            }
        );
        // An empty markdown string counts as missing.
        assert!(matches!(
            parse_upload_response(r#"{"markdown":""}"#).unwrap(),
            UploadOutcome::NoLink { .. }
        ));
    }

    #[test]
    fn unparsable_response_is_an_error() {
        let err = parse_upload_response("<html>gateway error</html>").unwrap_err();
        assert!(matches!(err, UploadError::InvalidResponse(_, _)));
    }

    #[test]
    fn clipboard_url_becomes_remote_target() {
        let clipboard = MockClipboard::with_content("  https://img.example/shot.png\n");
        let client = client_with("http://unused.example/upload".into(), clipboard);
        assert!(matches!(
            client.target_from_clipboard().unwrap(),
            UploadTarget::Remote(_)
        ));
    }

    #[test]
    fn clipboard_existing_path_becomes_local_target() {
        let file = temp_png();
        let clipboard = MockClipboard::with_content(&file.path().display().to_string());
        let client = client_with("http://unused.example/upload".into(), clipboard);
        assert_eq!(
            client.target_from_clipboard().unwrap(),
            UploadTarget::Local(file.path().to_path_buf())
        );
    }

    #[test]
    fn clipboard_garbage_is_rejected_before_any_network_call() {
        let clipboard = MockClipboard::with_content("certainly not a path or URL");
        let client = client_with("http://unused.example/upload".into(), clipboard);
        assert!(matches!(
            client.target_from_clipboard().unwrap_err(),
            UploadError::ClipboardContent
        ));
    }

    #[tokio::test]
    async fn upload_copies_markdown_link_to_clipboard() {
        let url = spawn_stub_server("HTTP/1.1 200 OK", r#"{"markdown":"![x](http://img/1.png)"}"#);
        let clipboard = MockClipboard::with_content("");
        let client = client_with(url, clipboard.clone());
        let file = temp_png();

        let outcome = client
            .upload(&UploadTarget::Local(file.path().to_path_buf()))
            .await
            .unwrap();
        assert_eq!(
            outcome,
            UploadOutcome::Linked {
                markdown: "![x](http://img/1.png)".into()
            }
        );
        assert_eq!(clipboard.written(), Some("![x](http://img/1.png)".to_string()));
        // Local inputs are never deleted by the uploader.
        assert!(file.path().exists());
    }

    #[tokio::test]
    async fn linkless_success_leaves_clipboard_untouched() {
        let url = spawn_stub_server("HTTP/1.1 200 OK", r#"{"url":"http://img/1.png"}"#);
        let clipboard = MockClipboard::with_content("");
        let client = client_with(url, clipboard.clone());
        let file = temp_png();

        let outcome = client
            .upload(&UploadTarget::Local(file.path().to_path_buf()))
            .await
            .unwrap();
        assert!(matches!(outcome, UploadOutcome::NoLink { .. }));
        assert_eq!(clipboard.written(), None);
    }

    #[tokio::test]
    async fn server_error_surfaces_status_and_body() {
        let url = spawn_stub_server("HTTP/1.1 500 Internal Server Error", r#"{"error":"disk full"}"#);
        let clipboard = MockClipboard::with_content("");
        let client = client_with(url, clipboard.clone());
        let file = temp_png();

        let err = client
            .upload(&UploadTarget::Local(file.path().to_path_buf()))
            .await
            .unwrap_err();
        match err {
            UploadError::Http { status, body } => {
                assert_eq!(status, 500);
                assert!(body.contains("disk full"));
            }
            other => panic!("expected Http error, got {other:?}"),
        }
        assert_eq!(clipboard.written(), None);
    }

    #[tokio::test]
    async fn missing_local_file_fails_without_touching_the_network() {
        // Unroutable endpoint: a network attempt would error differently.
        let clipboard = MockClipboard::with_content("");
        let client = client_with("http://127.0.0.1:9/upload".into(), clipboard);

        let err = client
            .upload(&UploadTarget::Local(PathBuf::from("/no/such/picshot.png")))
            .await
            .unwrap_err();
        assert!(matches!(err, UploadError::Io(_)));
    }

    #[tokio::test]
    async fn remote_target_is_downloaded_then_uploaded() {
        let download_url = spawn_stub_server("HTTP/1.1 200 OK", "fake png body");
        let upload_url = spawn_stub_server("HTTP/1.1 200 OK", r#"{"markdown":"![r](http://img/2.png)"}"#);
        let clipboard = MockClipboard::with_content("");
        let client = client_with(upload_url, clipboard.clone());

        let target = UploadTarget::parse(&download_url).unwrap();
        let outcome = client.upload(&target).await.unwrap();
        assert_eq!(
            outcome,
            UploadOutcome::Linked {
                markdown: "![r](http://img/2.png)".into()
            }
        );
        assert_eq!(clipboard.written(), Some("![r](http://img/2.png)".to_string()));
    }

    #[tokio::test]
    async fn downloaded_temp_file_does_not_survive_the_call() {
        let download_url = spawn_stub_server("HTTP/1.1 200 OK", "fake png body");
        let clipboard = MockClipboard::with_content("");
        let client = client_with("http://unused.example/upload".into(), clipboard);

        let url = Url::parse(&download_url).unwrap();
        let tmp = client.download_to_temp(&url).await.unwrap();
        let path = tmp.path().to_path_buf();
        assert_eq!(std::fs::read(&path).unwrap(), b"fake png body");
        drop(tmp);
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn failed_download_surfaces_http_error() {
        let download_url = spawn_stub_server("HTTP/1.1 404 Not Found", "gone");
        let clipboard = MockClipboard::with_content("");
        let client = client_with("http://unused.example/upload".into(), clipboard);

        let target = UploadTarget::parse(&download_url).unwrap();
        let err = client.upload(&target).await.unwrap_err();
        assert!(matches!(err, UploadError::Http { status: 404, .. }));
    }
}
