//! Artifact fetcher: downloads a missing model artifact once, on first run.
//!
//! The body is streamed to a sibling `.download` file, gunzipped when the URL
//! names a `.gz` file and the destination does not, and renamed into place only once complete, so an
//! interrupted download never leaves a truncated artifact at the final path.

use std::ffi::OsString;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

use flate2::read::GzDecoder;
use futures::StreamExt;
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

/// Progress is logged every time this many more bytes have arrived.
const PROGRESS_STEP: u64 = 256 * 1024 * 1024;

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("server returned {status} for {url}")]
    Server { status: u16, url: String },
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

fn io_err(path: &Path) -> impl FnOnce(std::io::Error) -> FetchError + '_ {
    move |source| FetchError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// HTTP client for one-off artifact downloads.
pub struct ArtifactFetcher {
    client: reqwest::Client,
}

impl Default for ArtifactFetcher {
    fn default() -> Self {
        Self::new()
    }
}

impl ArtifactFetcher {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }

    /// Download `url` to `path` unless `path` already exists.
    ///
    /// Returns `true` when a download took place.
    pub async fn ensure_file(&self, path: &Path, url: &str) -> Result<bool, FetchError> {
        if tokio::fs::try_exists(path).await.map_err(io_err(path))? {
            debug!(path = %path.display(), "artifact present, skipping download");
            return Ok(false);
        }
        self.download(url, path).await?;
        Ok(true)
    }

    /// Stream `url` into `dest`, replacing any existing file.
    ///
    /// Returns the number of bytes written to `dest`.
    pub async fn download(&self, url: &str, dest: &Path) -> Result<u64, FetchError> {
        if let Some(parent) = dest.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(io_err(parent))?;
        }

        info!(url = %url, dest = %dest.display(), "downloading artifact");
        let resp = self.client.get(url).send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::Server {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }
        let total = resp.content_length();

        let staging = sibling(dest, "download");
        let received = match stream_to_file(resp, &staging, total).await {
            Ok(n) => n,
            Err(e) => {
                let _ = tokio::fs::remove_file(&staging).await;
                return Err(e);
            }
        };

        // A `.gz` destination keeps the compressed bytes; readers gunzip it themselves.
        let written = if is_gzip_url(url) && !is_gzip_path(dest) {
            let src = staging.clone();
            let out = dest.to_path_buf();
            let result = tokio::task::spawn_blocking(move || gunzip(&src, &out)).await;
            let _ = tokio::fs::remove_file(&staging).await;
            result??
        } else {
            tokio::fs::rename(&staging, dest)
                .await
                .map_err(io_err(dest))?;
            received
        };

        info!(received, written, dest = %dest.display(), "download complete");
        Ok(written)
    }
}

async fn stream_to_file(
    resp: reqwest::Response,
    path: &Path,
    total: Option<u64>,
) -> Result<u64, FetchError> {
    let mut file = tokio::fs::File::create(path).await.map_err(io_err(path))?;
    let mut stream = resp.bytes_stream();
    let mut received = 0u64;
    let mut next_report = PROGRESS_STEP;

    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        file.write_all(&chunk).await.map_err(io_err(path))?;
        received += chunk.len() as u64;
        if received >= next_report {
            info!(received, total = ?total, "download progress");
            next_report += PROGRESS_STEP;
        }
    }
    file.flush().await.map_err(io_err(path))?;
    Ok(received)
}

/// Decompress a gzip file into `dest` via a `.part` sibling.
pub fn gunzip(src: &Path, dest: &Path) -> Result<u64, FetchError> {
    let part = sibling(dest, "part");
    let input = File::open(src).map_err(io_err(src))?;
    let mut decoder = GzDecoder::new(BufReader::new(input));
    let output = File::create(&part).map_err(io_err(&part))?;
    let mut writer = BufWriter::new(output);

    let copied = std::io::copy(&mut decoder, &mut writer).and_then(|n| {
        writer.into_inner().map_err(|e| e.into_error())?.sync_all()?;
        Ok(n)
    });
    match copied {
        Ok(n) => {
            std::fs::rename(&part, dest).map_err(io_err(dest))?;
            Ok(n)
        }
        Err(source) => {
            let _ = std::fs::remove_file(&part);
            Err(FetchError::Io {
                path: src.to_path_buf(),
                source,
            })
        }
    }
}

/// Whether the URL path names a gzip file (query and fragment ignored).
pub fn is_gzip_url(url: &str) -> bool {
    url.split(['?', '#'])
        .next()
        .is_some_and(|p| p.to_ascii_lowercase().ends_with(".gz"))
}

fn is_gzip_path(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("gz"))
}

/// `dir/name.ext` → `dir/name.ext.<suffix>`.
fn sibling(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.file_name().map(OsString::from).unwrap_or_default();
    name.push(".");
    name.push(suffix);
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    use flate2::Compression;
    use flate2::write::GzEncoder;
    use tokio::io::AsyncReadExt;
    use tokio::net::TcpListener;

    /// Serve a single HTTP response on a random local port.
    async fn serve_once(status: &'static str, body: Vec<u8>) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 1024];
            while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                let n = socket.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&buf[..n]);
            }
            let head = format!(
                "HTTP/1.1 {status}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                body.len()
            );
            socket.write_all(head.as_bytes()).await.unwrap();
            socket.write_all(&body).await.unwrap();
            socket.shutdown().await.unwrap();
        });
        format!("http://{addr}")
    }

    fn gzip(data: &[u8]) -> Vec<u8> {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(data).unwrap();
        encoder.finish().unwrap()
    }

    #[test]
    fn gzip_url_detection() {
        assert!(is_gzip_url(
            "https://s3.amazonaws.com/dl4j-distribution/GoogleNews-vectors-negative300.bin.gz"
        ));
        assert!(is_gzip_url("https://host/vectors.bin.GZ?token=abc"));
        assert!(!is_gzip_url("https://host/vectors.bin"));
        assert!(!is_gzip_url("https://host/download?file=vectors.gz.bin"));
    }

    #[test]
    fn sibling_appends_suffix() {
        assert_eq!(
            sibling(Path::new("models/vectors.bin"), "part"),
            PathBuf::from("models/vectors.bin.part")
        );
    }

    #[test]
    fn gunzip_writes_destination() {
        let dir = tempfile::TempDir::new().unwrap();
        let src = dir.path().join("vectors.bin.gz");
        let dest = dir.path().join("vectors.bin");
        std::fs::write(&src, gzip(b"2 1\nhello")).unwrap();

        let n = gunzip(&src, &dest).unwrap();
        assert_eq!(n, 9);
        assert_eq!(std::fs::read(&dest).unwrap(), b"2 1\nhello");
        assert!(!sibling(&dest, "part").exists());
    }

    #[test]
    fn gunzip_rejects_plain_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let src = dir.path().join("not-gzip.gz");
        let dest = dir.path().join("out.bin");
        std::fs::write(&src, b"definitely not gzip").unwrap();

        assert!(gunzip(&src, &dest).is_err());
        assert!(!dest.exists());
        assert!(!sibling(&dest, "part").exists());
    }

    #[tokio::test]
    async fn existing_file_is_not_downloaded() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("vectors.bin");
        std::fs::write(&path, b"cached").unwrap();

        let fetched = ArtifactFetcher::new()
            .ensure_file(&path, "http://127.0.0.1:9/never-called")
            .await
            .unwrap();
        assert!(!fetched);
        assert_eq!(std::fs::read(&path).unwrap(), b"cached");
    }

    #[tokio::test]
    async fn downloads_missing_file() {
        let base = serve_once("200 OK", b"word vectors".to_vec()).await;
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("nested").join("vectors.bin");

        let fetched = ArtifactFetcher::new()
            .ensure_file(&path, &format!("{base}/vectors.bin"))
            .await
            .unwrap();
        assert!(fetched);
        assert_eq!(std::fs::read(&path).unwrap(), b"word vectors");
        assert!(!sibling(&path, "download").exists());
    }

    #[tokio::test]
    async fn gzip_download_is_decompressed() {
        let base = serve_once("200 OK", gzip(b"decompressed payload")).await;
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("vectors.bin");

        let written = ArtifactFetcher::new()
            .download(&format!("{base}/vectors.bin.gz"), &path)
            .await
            .unwrap();
        assert_eq!(written, 20);
        assert_eq!(std::fs::read(&path).unwrap(), b"decompressed payload");
        assert!(!sibling(&path, "download").exists());
    }

    #[tokio::test]
    async fn gzip_destination_keeps_compressed_bytes() {
        let payload = gzip(b"2 1\nhello");
        let base = serve_once("200 OK", payload.clone()).await;
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("vectors.bin.gz");

        let written = ArtifactFetcher::new()
            .download(&format!("{base}/vectors.bin.gz"), &path)
            .await
            .unwrap();
        assert_eq!(written, payload.len() as u64);
        assert_eq!(std::fs::read(&path).unwrap(), payload);
    }

    #[tokio::test]
    async fn server_error_leaves_no_file() {
        let base = serve_once("404 Not Found", b"missing".to_vec()).await;
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("vectors.bin");

        let err = ArtifactFetcher::new()
            .ensure_file(&path, &format!("{base}/vectors.bin"))
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::Server { status: 404, .. }), "{err}");
        assert!(!path.exists());
    }
}
