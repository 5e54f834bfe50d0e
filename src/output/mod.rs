//! Output sinks for preserved content
//!
//! The final bytes of each pipeline run are persisted through an
//! [`OutputSink`]. The filesystem sink mirrors the URL layout under a root
//! directory so preserved pages can be served or browsed directly; the
//! HTTP sink POSTs bodies to a remote collector instead. Sinks are not
//! internally synchronized: two URLs deriving the same path race and the
//! last write wins, which is accepted since one URL normally maps to one
//! path.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use thiserror::Error;
use url::Url;

#[derive(Debug, Error)]
pub enum OutputError {
    #[error("Failed to write {path}: {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to post to {url}: {source}")]
    Post {
        url: String,
        #[source]
        source: reqwest::Error,
    },
}

/// Persists the final bytes produced for a URL.
#[async_trait]
pub trait OutputSink: Send + Sync {
    async fn write(&self, url: &Url, body: &[u8]) -> Result<(), OutputError>;
}

/// Derives the mirror path for a URL: `<root>/<host>/<path>`, where an
/// empty or trailing-slash path becomes `index.html`.
pub fn mirror_path(root: &Path, url: &Url) -> PathBuf {
    let host = host_component(url);
    let path = url.path().trim_start_matches('/');

    if path.is_empty() {
        root.join(&host).join("index.html")
    } else if path.ends_with('/') {
        root.join(&host).join(path).join("index.html")
    } else {
        root.join(&host).join(path)
    }
}

fn host_component(url: &Url) -> String {
    let host = url.host_str().unwrap_or("unknown");
    match url.port() {
        Some(port) => format!("{}:{}", host, port),
        None => host.to_string(),
    }
}

/// Writes bodies into a local mirror tree, creating directories as needed.
pub struct FsSink {
    root: PathBuf,
}

impl FsSink {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait]
impl OutputSink for FsSink {
    async fn write(&self, url: &Url, body: &[u8]) -> Result<(), OutputError> {
        let path = mirror_path(&self.root, url);

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| OutputError::Write {
                path: parent.display().to_string(),
                source,
            })?;
        }

        std::fs::write(&path, body).map_err(|source| OutputError::Write {
            path: path.display().to_string(),
            source,
        })?;

        tracing::debug!(path = %path.display(), bytes = body.len(), "wrote mirror file");
        Ok(())
    }
}

/// POSTs bodies to `<endpoint><url-path>` on a remote collector.
pub struct HttpSink {
    endpoint: String,
    client: reqwest::Client,
}

impl HttpSink {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl OutputSink for HttpSink {
    async fn write(&self, url: &Url, body: &[u8]) -> Result<(), OutputError> {
        let target = format!("{}{}", self.endpoint, url.path());

        self.client
            .post(&target)
            .body(body.to_vec())
            .send()
            .await
            .map_err(|source| OutputError::Post {
                url: target.clone(),
                source,
            })?;

        Ok(())
    }
}

/// Discards all bodies. Used when no output location is configured.
pub struct NullSink;

#[async_trait]
impl OutputSink for NullSink {
    async fn write(&self, _url: &Url, _body: &[u8]) -> Result<(), OutputError> {
        Ok(())
    }
}

/// Picks a sink for the configured output root: an http(s) URL selects the
/// remote collector, any other non-empty value a local mirror tree, and
/// `None` discards output.
pub fn sink_for(root: Option<&str>) -> std::sync::Arc<dyn OutputSink> {
    use std::sync::Arc;

    match root {
        None => Arc::new(NullSink),
        Some(value) if value.starts_with("http://") || value.starts_with("https://") => {
            Arc::new(HttpSink::new(value))
        }
        Some(value) => Arc::new(FsSink::new(value)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path_for(root: &str, url: &str) -> String {
        mirror_path(Path::new(root), &Url::parse(url).unwrap())
            .display()
            .to_string()
    }

    #[test]
    fn test_root_url_maps_to_index() {
        assert_eq!(path_for("out", "http://a.test/"), "out/a.test/index.html");
    }

    #[test]
    fn test_file_path_is_mirrored() {
        assert_eq!(
            path_for("out", "http://a.test/x/page.html"),
            "out/a.test/x/page.html"
        );
    }

    #[test]
    fn test_trailing_slash_maps_to_index() {
        assert_eq!(
            path_for("out", "http://a.test/dir/"),
            "out/a.test/dir/index.html"
        );
    }

    #[test]
    fn test_port_is_part_of_host_dir() {
        assert_eq!(
            path_for("out", "http://127.0.0.1:8080/p"),
            "out/127.0.0.1:8080/p"
        );
    }

    #[tokio::test]
    async fn test_fs_sink_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let sink = FsSink::new(dir.path());
        let url = Url::parse("http://a.test/sub/page.html").unwrap();

        sink.write(&url, b"<html></html>").await.unwrap();

        let written = std::fs::read(dir.path().join("a.test/sub/page.html")).unwrap();
        assert_eq!(written, b"<html></html>");
    }

    #[tokio::test]
    async fn test_fs_sink_root_becomes_index() {
        let dir = tempfile::tempdir().unwrap();
        let sink = FsSink::new(dir.path());
        let url = Url::parse("http://a.test/").unwrap();

        sink.write(&url, b"home").await.unwrap();

        assert!(dir.path().join("a.test/index.html").exists());
    }
}
