//! Successful installs.

use predicates::prelude::*;

use crate::common::{TestProject, leftovers, linux_binary};

#[test]
fn test_install_follows_redirect_and_links() {
    let mut project = TestProject::new();
    let body = linux_binary("2.3.1");
    let redirect = project
        .server
        .mock("GET", "/v2.3.1/tool-linux-amd64")
        .with_status(302)
        .with_header("location", "/objects/abc123")
        .create();
    let object = project.server.mock("GET", "/objects/abc123").with_status(200).with_body(&body).create();
    let sums = project.serve_checksums("2.3.1", &[("tool-linux-amd64", body.as_slice())]);

    project
        .install("2.3.1")
        .arg("--link-dir")
        .arg(project.link_dir())
        .args(["--checksums", "release"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Installed tool 2.3.1 (linux-amd64)"))
        .stdout(predicate::str::contains("sha256:"));

    redirect.assert();
    object.assert();
    sums.assert();

    let final_path = project.bin_dir().join("tool");
    assert_eq!(std::fs::read(&final_path).unwrap(), body);
    assert_eq!(std::fs::read(project.link_dir().join("tool")).unwrap(), body);
    assert!(leftovers(&project.bin_dir()).is_empty());

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mode = std::fs::metadata(&final_path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o755);
    }
}

#[test]
fn test_reinstall_replaces_previous_version() {
    let mut project = TestProject::new();

    let first = linux_binary("first");
    let mock = project.serve_artifact("2.3.1", &first);
    project.install("2.3.1").arg("--link-dir").arg(project.link_dir()).assert().success();
    drop(mock);

    let second = linux_binary("second");
    let _mock = project.serve_artifact("2.3.1", &second);
    project.install("2.3.1").arg("--link-dir").arg(project.link_dir()).assert().success();

    assert_eq!(std::fs::read(project.bin_dir().join("tool")).unwrap(), second);
    assert_eq!(std::fs::read(project.link_dir().join("tool")).unwrap(), second);
    assert!(leftovers(&project.bin_dir()).is_empty());
}

#[test]
fn test_installing_same_version_twice_is_stable() {
    let mut project = TestProject::new();
    let body = linux_binary("2.3.1");
    let _artifact = project.serve_artifact("2.3.1", &body);
    let final_path = project.bin_dir().join("tool");

    project.install("2.3.1").arg("--link-dir").arg(project.link_dir()).assert().success();
    let first = std::fs::read(&final_path).unwrap();
    let first_meta = std::fs::metadata(&final_path).unwrap();

    project.install("2.3.1").arg("--link-dir").arg(project.link_dir()).assert().success();
    let second = std::fs::read(&final_path).unwrap();
    let second_meta = std::fs::metadata(&final_path).unwrap();

    assert_eq!(first, body);
    assert_eq!(second, first);
    assert_eq!(second_meta.permissions(), first_meta.permissions());
    assert_eq!(std::fs::read(project.link_dir().join("tool")).unwrap(), body);
    assert!(leftovers(&project.bin_dir()).is_empty());

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        assert_eq!(second_meta.permissions().mode() & 0o777, 0o755);
    }
}

#[test]
fn test_missing_checksums_is_degraded_success() {
    let mut project = TestProject::new();
    let _artifact = project.serve_artifact("2.3.1", &linux_binary("2.3.1"));
    let _sums = project.server.mock("GET", "/v2.3.1/checksums.txt").with_status(404).create();

    let output = project
        .install("2.3.1")
        .args(["--checksums", "release"])
        .assert()
        .success()
        .stderr(predicate::str::contains("warning:"))
        .get_output()
        .stderr
        .clone();

    let stderr = String::from_utf8(output).unwrap();
    assert_eq!(stderr.matches("no checksums.txt").count(), 1, "warning printed once: {stderr}");
    assert!(project.bin_dir().join("tool").exists());
}

#[test]
fn test_json_report() {
    let mut project = TestProject::new();
    let body = linux_binary("json");
    let _artifact = project.serve_artifact("2.3.1", &body);

    let output = project.fetchbin_json_install();
    let report: serde_json::Value = serde_json::from_slice(&output).unwrap();

    assert_eq!(report["version"], "2.3.1");
    assert_eq!(report["target"]["os"], "linux");
    assert_eq!(report["target"]["arch"], "amd64");
    assert_eq!(report["byte_count"], body.len());
    assert_eq!(report["verification"]["mode"], "degraded");
    assert!(report["warnings"].as_array().is_some_and(|w| !w.is_empty()));
}

#[cfg(unix)]
#[test]
fn test_read_only_link_dir_still_succeeds() {
    use std::os::unix::fs::PermissionsExt;

    let mut project = TestProject::new();
    let body = linux_binary("2.3.1");
    let _artifact = project.serve_artifact("2.3.1", &body);

    let locked = project.link_dir();
    std::fs::create_dir_all(&locked).unwrap();
    std::fs::set_permissions(&locked, std::fs::Permissions::from_mode(0o555)).unwrap();
    // Privileged users bypass directory permissions
    if std::fs::write(locked.join("write-check"), b"").is_ok() {
        return;
    }

    let assert = project.install("2.3.1").arg("--link-dir").arg(&locked).assert();
    std::fs::set_permissions(&locked, std::fs::Permissions::from_mode(0o755)).unwrap();

    assert
        .success()
        .stderr(predicate::str::contains("permission denied linking"))
        .stderr(predicate::str::contains(project.bin_dir().join("tool").display().to_string()));
    assert_eq!(std::fs::read(project.bin_dir().join("tool")).unwrap(), body);
    assert!(!locked.join("tool").exists());
}

impl TestProject {
    fn fetchbin_json_install(&self) -> Vec<u8> {
        let mut cmd = self.fetchbin();
        cmd.arg("--json")
            .args(["install", "2.3.1", "--os", "linux", "--arch", "amd64", "--name", "tool"])
            .arg("--base-url")
            .arg(self.server.url())
            .arg("--install-dir")
            .arg(self.bin_dir());
        cmd.assert().success().get_output().stdout.clone()
    }
}
