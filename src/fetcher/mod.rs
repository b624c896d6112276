//! Network transfer of a release artifact to a temporary file.
//!
//! The fetcher is responsible for turning an [`ArtifactReference`] URL into
//! bytes on disk that nothing else can mistake for a finished install:
//!
//! ```text
//! GET url ──> 301/302/303/307/308 ──> ... (at most `max_redirects` hops)
//!        └──> 2xx ──> stream body ──> .{name}.XXXXXX.download (same dir as final path)
//!        └──> other status ──> FetchFailed (not retried)
//! transport failure (DNS, reset, read timeout, short body) ──> retry with backoff
//! ```
//!
//! # Guarantees
//!
//! - Redirects are followed by an explicit, bounded loop; automatic redirect
//!   handling in the HTTP client is disabled.
//! - The body is written chunk by chunk, so memory use does not grow with
//!   artifact size.
//! - The temporary file is owned by a [`tempfile::TempPath`]. Every failure,
//!   retry, cancellation or early drop deletes it; only a successful download
//!   hands it onward inside [`DownloadResult`].
//! - A body shorter or longer than its `Content-Length` is a transport error.
//! - Waiting longer than the read timeout for headers or for the next chunk
//!   is a transport error, so a stalled server costs one attempt, not the run.
//!
//! [`ArtifactReference`]: crate::locator::ArtifactReference

pub mod retry;

pub use retry::{RetryPolicy, retry_transient};

use crate::constants::{CONNECT_TIMEOUT, MAX_REDIRECTS, READ_TIMEOUT, USER_AGENT};
use crate::core::{FetchbinError, Result};
use crate::utils::progress::DownloadProgress;
use futures::StreamExt;
use reqwest::header::LOCATION;
use reqwest::{StatusCode, Url};
use std::future::Future;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::TempPath;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

/// Upper bound for auxiliary text downloads such as checksum manifests.
const MAX_TEXT_BYTES: usize = 1024 * 1024;

/// Tunables for the fetcher.
#[derive(Debug, Clone)]
pub struct FetchOptions {
    /// Maximum redirect hops per request
    pub max_redirects: usize,
    /// Retry policy for transport failures
    pub retry: RetryPolicy,
    /// Timeout for establishing a connection
    pub connect_timeout: Duration,
    /// Longest wait for response headers or the next body chunk
    pub read_timeout: Duration,
    /// Whether to draw a progress bar
    pub show_progress: bool,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            max_redirects: MAX_REDIRECTS,
            retry: RetryPolicy::default(),
            connect_timeout: CONNECT_TIMEOUT,
            read_timeout: READ_TIMEOUT,
            show_progress: false,
        }
    }
}

/// A complete download that has not been verified yet.
///
/// Dropping this value deletes the temporary file.
#[derive(Debug)]
pub struct DownloadResult {
    temp_path: TempPath,
    /// Number of bytes written
    pub byte_count: u64,
    /// `Content-Length` announced by the server, if any
    pub declared_len: Option<u64>,
    /// HTTP status of the final response
    pub status: u16,
    /// URL that served the bytes, after redirects
    pub final_url: Url,
    /// Number of redirects followed
    pub redirects: usize,
}

impl DownloadResult {
    /// Location of the temporary file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.temp_path
    }

    /// Give up ownership of the temporary file to the installer.
    pub(crate) fn into_temp_path(self) -> TempPath {
        self.temp_path
    }
}

/// HTTP client wrapper implementing bounded redirects, retries and
/// streaming writes.
#[derive(Debug, Clone)]
pub struct Fetcher {
    client: reqwest::Client,
    options: FetchOptions,
}

impl Fetcher {
    /// Build a fetcher with its own HTTP client.
    pub fn new(options: FetchOptions) -> Result<Self> {
        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .connect_timeout(options.connect_timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| FetchbinError::ConfigError {
                message: format!("failed to build HTTP client: {}", error_chain(&e)),
            })?;

        Ok(Self {
            client,
            options,
        })
    }

    /// Download `url` into a fresh temporary file inside `dest_dir`.
    ///
    /// `file_stem` names the temporary file (`.{file_stem}.XXXXXX.download`)
    /// so leftovers are attributable; the random part keeps concurrent
    /// invocations apart.
    ///
    /// # Errors
    ///
    /// - [`FetchbinError::FetchFailed`] for a non-success final status
    /// - [`FetchbinError::TooManyRedirects`] when the hop bound is exceeded
    /// - [`FetchbinError::TransportError`] once retries are exhausted
    /// - [`FetchbinError::FileSystemError`] when the temporary file cannot be written
    pub async fn fetch(&self, url: &Url, dest_dir: &Path, file_stem: &str) -> Result<DownloadResult> {
        let label = format!("download {file_stem}");
        let result = retry_transient(&self.options.retry, &label, |_| {
            self.fetch_once(url, dest_dir, file_stem)
        })
        .await?;

        info!(
            "Downloaded {} bytes from {} ({} redirect(s))",
            result.byte_count, result.final_url, result.redirects
        );
        Ok(result)
    }

    async fn fetch_once(&self, url: &Url, dest_dir: &Path, file_stem: &str) -> Result<DownloadResult> {
        let (response, final_url, redirects) = self.send_following_redirects(url).await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchbinError::FetchFailed {
                status: status.as_u16(),
                url: final_url.to_string(),
            });
        }

        let expected_len = response.content_length();
        let temp_path = create_temp_file(dest_dir, file_stem)?;
        debug!("Streaming {} into {}", final_url, temp_path.display());

        // On any early return `temp_path` is dropped, which deletes the file
        let byte_count = self.stream_body(response, &temp_path, &final_url, expected_len).await?;

        if let Some(expected) = expected_len {
            if byte_count != expected {
                return Err(FetchbinError::TransportError {
                    url: final_url.to_string(),
                    reason: format!("body ended after {byte_count} of {expected} bytes"),
                });
            }
        }

        Ok(DownloadResult {
            temp_path,
            byte_count,
            declared_len: expected_len,
            status: status.as_u16(),
            final_url,
            redirects,
        })
    }

    async fn stream_body(
        &self,
        response: reqwest::Response,
        temp_path: &Path,
        url: &Url,
        expected_len: Option<u64>,
    ) -> Result<u64> {
        let fs_error = |operation: &str, e: &std::io::Error| FetchbinError::from_io(operation, temp_path, e);

        let mut file = tokio::fs::OpenOptions::new()
            .write(true)
            .truncate(true)
            .open(temp_path)
            .await
            .map_err(|e| fs_error("open temporary file", &e))?;

        let progress = DownloadProgress::new(
            self.options.show_progress,
            expected_len,
            url.path_segments().and_then(|mut s| s.next_back()).unwrap_or("download"),
        );

        let mut byte_count = 0u64;
        let mut stream = response.bytes_stream();
        loop {
            let next = match self.within_read_timeout(url, stream.next()).await {
                Ok(next) => next,
                Err(e) => {
                    progress.finish_and_clear();
                    return Err(e);
                }
            };
            let Some(chunk) = next else {
                break;
            };
            let chunk = chunk.map_err(|e| {
                progress.finish_and_clear();
                transport_error(url, &e)
            })?;
            file.write_all(&chunk).await.map_err(|e| fs_error("write temporary file", &e))?;
            byte_count += chunk.len() as u64;
            progress.inc(chunk.len() as u64);
        }
        progress.finish_and_clear();

        file.flush().await.map_err(|e| fs_error("flush temporary file", &e))?;
        file.sync_all().await.map_err(|e| fs_error("sync temporary file", &e))?;

        Ok(byte_count)
    }

    /// Send a GET for `url`, following redirects up to the configured bound.
    ///
    /// Returns the first non-redirect response, the URL that produced it and
    /// the number of hops taken.
    async fn send_following_redirects(&self, url: &Url) -> Result<(reqwest::Response, Url, usize)> {
        let mut current = url.clone();
        let mut hops = 0usize;

        loop {
            debug!("GET {current}");
            let response = self
                .within_read_timeout(&current, self.client.get(current.clone()).send())
                .await?
                .map_err(|e| transport_error(&current, &e))?;

            let status = response.status();
            if !is_followed_redirect(status) {
                return Ok((response, current, hops));
            }

            if hops >= self.options.max_redirects {
                return Err(FetchbinError::TooManyRedirects {
                    url: current.to_string(),
                    hops,
                });
            }

            let next = redirect_target(&current, &response)?;
            debug!("{status} redirect {} -> {next}", hops + 1);
            hops += 1;
            current = next;
        }
    }

    /// Await `future`, failing the attempt with a transport error once the
    /// server has been silent for longer than the read timeout.
    async fn within_read_timeout<T>(&self, url: &Url, future: impl Future<Output = T>) -> Result<T> {
        tokio::time::timeout(self.options.read_timeout, future).await.map_err(|_| FetchbinError::TransportError {
            url: url.to_string(),
            reason: format!("no data received for {:?}", self.options.read_timeout),
        })
    }

    /// Fetch a small text document such as a checksum manifest.
    ///
    /// Returns `Ok(None)` when the server answers 404, so callers can treat a
    /// missing optional document as absent rather than as a failure.
    pub async fn fetch_text(&self, url: &Url) -> Result<Option<String>> {
        retry_transient(&self.options.retry, "download text", |_| self.fetch_text_once(url)).await
    }

    async fn fetch_text_once(&self, url: &Url) -> Result<Option<String>> {
        let (response, final_url, _) = self.send_following_redirects(url).await?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            debug!("{final_url} not found");
            return Ok(None);
        }
        if !status.is_success() {
            return Err(FetchbinError::FetchFailed {
                status: status.as_u16(),
                url: final_url.to_string(),
            });
        }

        let mut body = Vec::new();
        let mut stream = response.bytes_stream();
        while let Some(chunk) = self.within_read_timeout(&final_url, stream.next()).await? {
            let chunk = chunk.map_err(|e| transport_error(&final_url, &e))?;
            if body.len() + chunk.len() > MAX_TEXT_BYTES {
                let name = final_url.path_segments().and_then(|mut s| s.next_back()).unwrap_or("document");
                return Err(FetchbinError::IntegrityMismatch {
                    artifact: name.to_string(),
                    expected: format!("at most {MAX_TEXT_BYTES} bytes"),
                    actual: format!("more than {MAX_TEXT_BYTES} bytes"),
                });
            }
            body.extend_from_slice(&chunk);
        }

        Ok(Some(String::from_utf8_lossy(&body).into_owned()))
    }
}

const fn is_followed_redirect(status: StatusCode) -> bool {
    matches!(
        status,
        StatusCode::MOVED_PERMANENTLY
            | StatusCode::FOUND
            | StatusCode::SEE_OTHER
            | StatusCode::TEMPORARY_REDIRECT
            | StatusCode::PERMANENT_REDIRECT
    )
}

/// Resolve the `Location` of a redirect response against the current URL.
///
/// A missing or unusable `Location`, a non-HTTP scheme, or a downgrade from
/// https to http is reported as [`FetchbinError::FetchFailed`] with the
/// redirect's own status.
fn redirect_target(current: &Url, response: &reqwest::Response) -> Result<Url> {
    let failed = || FetchbinError::FetchFailed {
        status: response.status().as_u16(),
        url: current.to_string(),
    };

    let location = response.headers().get(LOCATION).and_then(|v| v.to_str().ok()).ok_or_else(failed)?;
    let next = current.join(location).map_err(|_| failed())?;

    match (current.scheme(), next.scheme()) {
        (_, "https") | ("http", "http") => Ok(next),
        _ => Err(failed()),
    }
}

fn create_temp_file(dest_dir: &Path, file_stem: &str) -> Result<TempPath> {
    tempfile::Builder::new()
        .prefix(&format!(".{file_stem}."))
        .suffix(".download")
        .tempfile_in(dest_dir)
        .map(tempfile::NamedTempFile::into_temp_path)
        .map_err(|e| FetchbinError::from_io("create temporary file", dest_dir, &e))
}

fn transport_error(url: &Url, error: &reqwest::Error) -> FetchbinError {
    FetchbinError::TransportError {
        url: url.to_string(),
        reason: error_chain(error),
    }
}

/// Join an error and its sources into one line.
fn error_chain(error: &dyn std::error::Error) -> String {
    let mut message = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

/// List leftover temporary downloads in `dir` (used by tests and diagnostics).
pub fn leftover_downloads(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut found = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.extension().is_some_and(|ext| ext == "download") {
            found.push(path);
        }
    }
    Ok(found)
}
