//! Failure paths: one diagnostic line naming the stage, exit status 1, and
//! nothing half-written at the final path.

use predicates::prelude::*;

use crate::common::{TestProject, leftovers, linux_binary, write_checksums};

#[test]
fn test_unsupported_platform_makes_no_request() {
    let mut project = TestProject::new();
    let any = project.server.mock("GET", mockito::Matcher::Any).expect(0).create();

    let mut cmd = project.fetchbin();
    cmd.args(["install", "2.3.1", "--os", "plan9", "--arch", "amd64", "--name", "tool"])
        .arg("--base-url")
        .arg(project.server.url())
        .arg("--install-dir")
        .arg(project.bin_dir());

    cmd.assert()
        .code(1)
        .stderr(predicate::str::contains("error[UnsupportedPlatform]"))
        .stderr(predicate::str::contains("plan9"));

    any.assert();
    assert!(!project.bin_dir().exists());
}

#[test]
fn test_malformed_version_makes_no_request() {
    let mut project = TestProject::new();
    let any = project.server.mock("GET", mockito::Matcher::Any).expect(0).create();

    for version in ["1.2", "v1.2.3", "1.2.3;rm"] {
        project.install(version).assert().code(1).stderr(predicate::str::contains("error[InvalidVersion]"));
    }

    any.assert();
}

#[test]
fn test_missing_release_is_fetch_failed() {
    let mut project = TestProject::new();
    let _missing = project.server.mock("GET", "/v9.9.9/tool-linux-amd64").with_status(404).expect(1).create();

    project
        .install("9.9.9")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("error[FetchFailed]"))
        .stderr(predicate::str::contains("404"));

    assert!(!project.bin_dir().join("tool").exists());
    assert!(leftovers(&project.bin_dir()).is_empty());
}

#[test]
fn test_redirect_loop_is_reported() {
    let mut project = TestProject::new();
    let _loop = project
        .server
        .mock("GET", "/v2.3.1/tool-linux-amd64")
        .with_status(302)
        .with_header("location", "/v2.3.1/tool-linux-amd64")
        .create();

    project.install("2.3.1").assert().code(1).stderr(predicate::str::contains("error[TooManyRedirects]"));
    assert!(!project.bin_dir().join("tool").exists());
}

#[test]
fn test_checksum_mismatch_preserves_previous_install() {
    let mut project = TestProject::new();
    let _artifact = project.serve_artifact("2.3.1", &linux_binary("tampered"));

    std::fs::create_dir_all(project.bin_dir()).unwrap();
    std::fs::write(project.bin_dir().join("tool"), b"previous install").unwrap();
    let manifest =
        write_checksums(project.path(), &[("tool-linux-amd64", linux_binary("genuine").as_slice())]).unwrap();

    project
        .install("2.3.1")
        .arg("--checksums")
        .arg(&manifest)
        .assert()
        .code(1)
        .stderr(predicate::str::contains("error[IntegrityMismatch]"));

    assert_eq!(std::fs::read(project.bin_dir().join("tool")).unwrap(), b"previous install");
    assert!(leftovers(&project.bin_dir()).is_empty());
}

#[test]
fn test_wrong_platform_binary_rejected_in_degraded_mode() {
    let mut project = TestProject::new();
    let _artifact = project.serve_artifact("2.3.1", b"<html>rate limited</html>");

    project.install("2.3.1").assert().code(1).stderr(predicate::str::contains("error[IntegrityMismatch]"));
    assert!(!project.bin_dir().join("tool").exists());
}

#[test]
fn test_missing_base_url_is_config_error() {
    let project = TestProject::new();

    project
        .fetchbin()
        .args(["install", "2.3.1", "--name", "tool"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("error[ConfigError]"));
}

#[test]
fn test_diagnostic_is_a_single_line() {
    let project = TestProject::new();

    let output = project.install("nope").assert().code(1).get_output().stderr.clone();
    let stderr = String::from_utf8(output).unwrap();
    assert_eq!(stderr.trim_end().lines().count(), 1, "{stderr}");
}

#[test]
fn test_transport_failure_prints_one_line_after_retries() {
    let project = TestProject::new();
    std::fs::write(project.path().join("config.toml"), "initial_backoff_ms = 1\nmax_backoff_ms = 2\n").unwrap();

    // Reserve a port, then close it so every connection is refused
    let closed = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let base_url = format!("http://{}", closed.local_addr().unwrap());
    drop(closed);

    let output = project
        .fetchbin()
        .args(["install", "2.3.1", "--os", "linux", "--arch", "amd64", "--name", "tool"])
        .args(["--base-url", base_url.as_str()])
        .arg("--install-dir")
        .arg(project.bin_dir())
        .assert()
        .code(1)
        .get_output()
        .stderr
        .clone();

    let stderr = String::from_utf8(output).unwrap();
    assert_eq!(stderr.trim_end().lines().count(), 1, "{stderr}");
    assert!(stderr.starts_with("error[TransportError]"), "{stderr}");
    assert!(leftovers(&project.bin_dir()).is_empty());
}
