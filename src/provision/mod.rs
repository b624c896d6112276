//! End-to-end provisioning: resolve, locate, fetch, verify, install.
//!
//! The [`Provisioner`] runs the stages strictly in order for one request and
//! threads every intermediate value explicitly from one stage to the next.
//! Nothing is shared between invocations except the files it installs.
//!
//! Resolution and location are pure and fail before any network I/O. The
//! network-bound part (checksum lookup, download, verification) runs under
//! `tokio::select!` against a [`CancellationToken`] and the request timeout;
//! whichever fires first drops the in-flight work, which removes the
//! temporary download, and the run fails with [`FetchbinError::Cancelled`].

use crate::core::{FetchbinError, Result};
use crate::fetcher::Fetcher;
use crate::installer::{self, InstalledArtifact, LinkOutcome, SkipReason};
use crate::locator::{ArtifactReference, ReleaseHost};
use crate::platform::TargetDescriptor;
use crate::verify::{ChecksumManifest, ExpectedIntegrity, Verification, VerifiedArtifact, verify_download};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Where expected digests come from.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ChecksumSource {
    /// No digests; verification is degraded.
    #[default]
    None,
    /// A local manifest that must list the artifact.
    File(PathBuf),
    /// The release's own `checksums.txt`, if published.
    Release,
}

impl From<&str> for ChecksumSource {
    /// `none` (or empty), `release`, or a manifest path.
    fn from(raw: &str) -> Self {
        match raw.trim() {
            "" | "none" => Self::None,
            "release" => Self::Release,
            path => Self::File(PathBuf::from(path)),
        }
    }
}

/// Inputs for one provisioning run.
#[derive(Debug, Clone)]
pub struct ProvisionRequest {
    /// Requested version, e.g. `2.3.1`
    pub version: String,
    /// OS override; the running OS when `None`
    pub os: Option<String>,
    /// Architecture override; the running architecture when `None`
    pub arch: Option<String>,
    /// Artifact name
    pub name: String,
    /// Release host
    pub host: ReleaseHost,
    /// Directory receiving the executable
    pub install_dir: PathBuf,
    /// Directory on the command path to link into
    pub link_dir: Option<PathBuf>,
    /// Source of expected digests
    pub checksums: ChecksumSource,
    /// Upper bound for the network-bound stages
    pub timeout: Duration,
}

/// Everything a caller needs to know about a successful run.
#[derive(Debug, Clone, Serialize)]
pub struct ProvisionReport {
    pub target: TargetDescriptor,
    pub version: String,
    pub url: String,
    pub byte_count: u64,
    pub redirects: usize,
    pub verification: Verification,
    pub installed: InstalledArtifact,
    /// Degraded outcomes the user should see
    pub warnings: Vec<String>,
    pub completed_at: DateTime<Utc>,
}

impl ProvisionReport {
    /// Whether the run succeeded with a shortfall.
    #[must_use]
    pub fn is_degraded(&self) -> bool {
        !self.warnings.is_empty()
    }
}

/// Runs provisioning requests.
#[derive(Debug, Clone)]
pub struct Provisioner {
    fetcher: Fetcher,
}

impl Provisioner {
    #[must_use]
    pub const fn new(fetcher: Fetcher) -> Self {
        Self {
            fetcher,
        }
    }

    /// Provision the artifact described by `request`.
    ///
    /// # Errors
    ///
    /// Any stage failure is returned unchanged. On every error path the final
    /// path holds either its previous content or nothing.
    pub async fn provision(
        &self,
        request: &ProvisionRequest,
        cancel: &CancellationToken,
    ) -> Result<ProvisionReport> {
        let target = TargetDescriptor::resolve_or_current(request.os.as_deref(), request.arch.as_deref())?;
        let reference = ArtifactReference::locate(&request.host, &request.name, &target, &request.version)?;
        info!("Provisioning {} {} for {target}", reference.name, reference.version);

        std::fs::create_dir_all(&request.install_dir)
            .map_err(|e| FetchbinError::from_io("create install directory", &request.install_dir, &e))?;
        let final_path = request.install_dir.join(reference.installed_file_name());

        let work = self.fetch_and_verify(&reference, &request.checksums, &request.install_dir);
        let verified = tokio::select! {
            biased;
            () = cancel.cancelled() => {
                return Err(FetchbinError::Cancelled {
                    reason: "cancelled by caller".to_string(),
                });
            }
            () = tokio::time::sleep(request.timeout) => {
                return Err(FetchbinError::Cancelled {
                    reason: format!("timed out after {}s", request.timeout.as_secs_f64()),
                });
            }
            result = work => result?,
        };

        let byte_count = verified.download().byte_count;
        let redirects = verified.download().redirects;
        let link_path = request.link_dir.as_ref().map(|dir| dir.join(reference.installed_file_name()));
        let (installed, verification) = installer::install(verified, &final_path, link_path.as_deref())?;

        let warnings = collect_warnings(&verification, installed.link.as_ref(), &final_path);
        info!("Provisioned {} in {}", reference.file_name, request.install_dir.display());

        Ok(ProvisionReport {
            target,
            version: reference.version,
            url: reference.url.to_string(),
            byte_count,
            redirects,
            verification,
            installed,
            warnings,
            completed_at: Utc::now(),
        })
    }

    async fn fetch_and_verify(
        &self,
        reference: &ArtifactReference,
        checksums: &ChecksumSource,
        install_dir: &Path,
    ) -> Result<VerifiedArtifact> {
        let expected = self.expected_integrity(reference, checksums).await?;
        let download = self.fetcher.fetch(&reference.url, install_dir, &reference.name).await?;
        let expected = expected.or_size(download.declared_len);
        verify_download(download, &reference.file_name, reference.target.os(), &expected).await
    }

    async fn expected_integrity(
        &self,
        reference: &ArtifactReference,
        checksums: &ChecksumSource,
    ) -> Result<ExpectedIntegrity> {
        match checksums {
            ChecksumSource::None => Ok(ExpectedIntegrity::unavailable("no checksum source configured")),
            ChecksumSource::File(path) => {
                let manifest = ChecksumManifest::load(path).await?;
                match manifest.lookup(&reference.file_name) {
                    Some(digest) => Ok(ExpectedIntegrity::digest(digest)),
                    None => Err(FetchbinError::IntegrityMismatch {
                        artifact: reference.file_name.clone(),
                        expected: format!("an entry in {}", path.display()),
                        actual: "no entry".to_string(),
                    }),
                }
            }
            ChecksumSource::Release => {
                debug!("Fetching checksum manifest {}", reference.checksums_url);
                let Some(text) = self.fetcher.fetch_text(&reference.checksums_url).await? else {
                    return Ok(ExpectedIntegrity::unavailable("release publishes no checksums.txt"));
                };
                let manifest = ChecksumManifest::parse(&text);
                if manifest.is_empty() {
                    return Ok(ExpectedIntegrity::unavailable("release checksums.txt lists no digests"));
                }
                Ok(manifest.lookup(&reference.file_name).map_or_else(
                    || ExpectedIntegrity::unavailable(format!("checksums.txt has no entry for {}", reference.file_name)),
                    ExpectedIntegrity::digest,
                ))
            }
        }
    }
}

fn collect_warnings(verification: &Verification, link: Option<&LinkOutcome>, final_path: &Path) -> Vec<String> {
    let mut warnings = Vec::new();

    if let Verification::Degraded {
        reason,
    } = verification
    {
        warnings.push(format!("checksum not verified: {reason}"));
    }

    if let Some(LinkOutcome::Skipped {
        path,
        reason,
    }) = link.filter(|outcome| outcome.is_degraded())
    {
        let problem = match reason {
            SkipReason::Failed(message) => format!("could not link {}: {message}", path.display()),
            _ => format!("permission denied linking {}", path.display()),
        };
        warnings.push(format!(
            "{problem}; run {} directly or add its directory to PATH",
            final_path.display()
        ));
    }

    warnings
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetcher::{FetchOptions, RetryPolicy, leftover_downloads};
    use crate::platform::OperatingSystem;
    use crate::test_utils::{CannedResponse, FlakyServer, fake_executable, init_test_logging, sha256_hex};
    use tempfile::TempDir;

    fn provisioner() -> Provisioner {
        let options = FetchOptions {
            retry: RetryPolicy {
                max_attempts: 3,
                initial_backoff: Duration::from_millis(5),
                max_backoff: Duration::from_millis(20),
            },
            ..FetchOptions::default()
        };
        Provisioner::new(Fetcher::new(options).unwrap())
    }

    fn request(base_url: &str, dir: &Path) -> ProvisionRequest {
        ProvisionRequest {
            version: "2.3.1".to_string(),
            os: Some("linux".to_string()),
            arch: Some("amd64".to_string()),
            name: "tool".to_string(),
            host: ReleaseHost::parse(base_url).unwrap(),
            install_dir: dir.join("bin"),
            link_dir: None,
            checksums: ChecksumSource::None,
            timeout: Duration::from_secs(30),
        }
    }

    #[tokio::test]
    async fn test_provision_with_release_checksums() {
        init_test_logging(None);
        let mut server = mockito::Server::new_async().await;
        let body = fake_executable(OperatingSystem::Linux);
        let _artifact = server
            .mock("GET", "/v2.3.1/tool-linux-amd64")
            .with_status(302)
            .with_header("location", "/cdn/tool-linux-amd64")
            .create_async()
            .await;
        let _cdn = server.mock("GET", "/cdn/tool-linux-amd64").with_body(body.clone()).create_async().await;
        let _sums = server
            .mock("GET", "/v2.3.1/checksums.txt")
            .with_body(format!("{}  tool-linux-amd64\n", sha256_hex(&body)))
            .create_async()
            .await;

        let dir = TempDir::new().unwrap();
        let mut req = request(&server.url(), dir.path());
        req.checksums = ChecksumSource::Release;
        req.link_dir = Some(dir.path().join("links"));

        let report = provisioner().provision(&req, &CancellationToken::new()).await.unwrap();

        assert_eq!(report.target.to_string(), "linux-amd64");
        assert_eq!(report.redirects, 1);
        assert_eq!(report.byte_count, body.len() as u64);
        assert!(matches!(report.verification, Verification::Verified { .. }));
        assert!(report.warnings.is_empty(), "{:?}", report.warnings);
        assert_eq!(report.installed.final_path, dir.path().join("bin").join("tool"));
        assert_eq!(std::fs::read(dir.path().join("links").join("tool")).unwrap(), body);
    }

    #[tokio::test]
    async fn test_missing_release_manifest_is_degraded() {
        let mut server = mockito::Server::new_async().await;
        let _artifact = server
            .mock("GET", "/v2.3.1/tool-linux-amd64")
            .with_body(fake_executable(OperatingSystem::Linux))
            .create_async()
            .await;
        let _sums = server.mock("GET", "/v2.3.1/checksums.txt").with_status(404).create_async().await;

        let dir = TempDir::new().unwrap();
        let mut req = request(&server.url(), dir.path());
        req.checksums = ChecksumSource::Release;

        let report = provisioner().provision(&req, &CancellationToken::new()).await.unwrap();
        assert!(report.verification.is_degraded());
        assert!(report.is_degraded());
        assert!(report.warnings[0].contains("no checksums.txt"), "{:?}", report.warnings);
    }

    #[tokio::test]
    async fn test_release_manifest_without_digests_is_degraded() {
        let mut server = mockito::Server::new_async().await;
        let _artifact = server
            .mock("GET", "/v2.3.1/tool-linux-amd64")
            .with_body(fake_executable(OperatingSystem::Linux))
            .create_async()
            .await;
        let _sums =
            server.mock("GET", "/v2.3.1/checksums.txt").with_body("# generated\n\n").create_async().await;

        let dir = TempDir::new().unwrap();
        let mut req = request(&server.url(), dir.path());
        req.checksums = ChecksumSource::Release;

        let report = provisioner().provision(&req, &CancellationToken::new()).await.unwrap();
        assert!(report.verification.is_degraded());
        assert!(report.warnings[0].contains("lists no digests"), "{:?}", report.warnings);
    }

    #[test]
    fn test_only_degraded_links_warn() {
        let verified = Verification::Verified {
            sha256: "0".repeat(64),
        };
        let final_path = Path::new("/opt/tool/bin/tool");
        let skipped = |reason| LinkOutcome::Skipped {
            path: PathBuf::from("/usr/local/bin/tool"),
            reason,
        };

        assert!(collect_warnings(&verified, Some(&skipped(SkipReason::AlreadyInPlace)), final_path).is_empty());

        let warnings = collect_warnings(&verified, Some(&skipped(SkipReason::PermissionDenied)), final_path);
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].starts_with("permission denied linking /usr/local/bin/tool"));
        assert!(warnings[0].contains("run /opt/tool/bin/tool directly"));

        let warnings =
            collect_warnings(&verified, Some(&skipped(SkipReason::Failed("disk full".into()))), final_path);
        assert!(warnings[0].starts_with("could not link /usr/local/bin/tool: disk full"));
    }

    #[tokio::test]
    async fn test_checksum_mismatch_keeps_previous_install() {
        let mut server = mockito::Server::new_async().await;
        let _artifact = server
            .mock("GET", "/v2.3.1/tool-linux-amd64")
            .with_body(fake_executable(OperatingSystem::Linux))
            .create_async()
            .await;

        let dir = TempDir::new().unwrap();
        let manifest = dir.path().join("sums.txt");
        std::fs::write(&manifest, format!("{}  tool-linux-amd64\n", "0".repeat(64))).unwrap();
        let bin = dir.path().join("bin");
        std::fs::create_dir_all(&bin).unwrap();
        std::fs::write(bin.join("tool"), b"previous").unwrap();

        let mut req = request(&server.url(), dir.path());
        req.checksums = ChecksumSource::File(manifest);

        let result = provisioner().provision(&req, &CancellationToken::new()).await;
        assert!(matches!(result, Err(FetchbinError::IntegrityMismatch { .. })), "{result:?}");
        assert_eq!(std::fs::read(bin.join("tool")).unwrap(), b"previous");
        assert!(leftover_downloads(&bin).unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_local_manifest_without_entry_fails() {
        let server = mockito::Server::new_async().await;
        let dir = TempDir::new().unwrap();
        let manifest = dir.path().join("sums.txt");
        std::fs::write(&manifest, format!("{}  other-linux-amd64\n", "0".repeat(64))).unwrap();

        let mut req = request(&server.url(), dir.path());
        req.checksums = ChecksumSource::File(manifest);

        let result = provisioner().provision(&req, &CancellationToken::new()).await;
        assert!(matches!(result, Err(FetchbinError::IntegrityMismatch { .. })), "{result:?}");
    }

    #[tokio::test]
    async fn test_unsupported_platform_fails_before_network() {
        let mut server = mockito::Server::new_async().await;
        let never = server.mock("GET", mockito::Matcher::Any).expect(0).create_async().await;

        let dir = TempDir::new().unwrap();
        let mut req = request(&server.url(), dir.path());
        req.os = Some("plan9".to_string());

        let result = provisioner().provision(&req, &CancellationToken::new()).await;
        assert!(matches!(result, Err(FetchbinError::UnsupportedPlatform { .. })));
        never.assert_async().await;
        assert!(!dir.path().join("bin").exists());
    }

    #[tokio::test]
    async fn test_cancellation_removes_partial_download() {
        let server = FlakyServer::start(0, CannedResponse::stall(1_000_000)).await.unwrap();
        let dir = TempDir::new().unwrap();
        let req = request(&server.url(""), dir.path());

        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(200)).await;
            trigger.cancel();
        });

        let result = provisioner().provision(&req, &cancel).await;
        assert!(matches!(result, Err(FetchbinError::Cancelled { .. })), "{result:?}");
        assert!(leftover_downloads(&dir.path().join("bin")).unwrap().is_empty());
        assert!(!dir.path().join("bin").join("tool").exists());
    }

    #[tokio::test]
    async fn test_timeout_is_cancellation() {
        let server = FlakyServer::start(0, CannedResponse::stall(1_000_000)).await.unwrap();
        let dir = TempDir::new().unwrap();
        let mut req = request(&server.url(""), dir.path());
        req.timeout = Duration::from_millis(200);

        let result = provisioner().provision(&req, &CancellationToken::new()).await;
        match result {
            Err(FetchbinError::Cancelled {
                reason,
            }) => assert!(reason.contains("timed out"), "{reason}"),
            other => panic!("expected Cancelled, got {other:?}"),
        }
    }

    #[test]
    fn test_checksum_source_from_str() {
        assert_eq!(ChecksumSource::from("release"), ChecksumSource::Release);
        assert_eq!(ChecksumSource::from("none"), ChecksumSource::None);
        assert_eq!(ChecksumSource::from("./sums.txt"), ChecksumSource::File(PathBuf::from("./sums.txt")));
    }
}
