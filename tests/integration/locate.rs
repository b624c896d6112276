//! `fetchbin locate` prints the resolved URL without network access.

use predicates::prelude::*;

use crate::common::TestProject;

#[test]
fn test_locate_windows_artifact() {
    let project = TestProject::new();

    project
        .fetchbin()
        .args(["locate", "2.3.1", "--os", "win32", "--arch", "x64", "--name", "tool"])
        .args(["--base-url", "https://example.com/releases/download"])
        .assert()
        .success()
        .stdout(predicate::str::contains("windows-amd64"))
        .stdout(predicate::str::contains("https://example.com/releases/download/v2.3.1/tool-windows-amd64.exe"))
        .stdout(predicate::str::contains("tool.exe"));
}

#[test]
fn test_locate_uses_config_file_and_env() {
    let project = TestProject::new();
    std::fs::write(
        project.path().join("config.toml"),
        "artifact_name = \"from-config\"\nrelease_base_url = \"https://example.com/dl\"\n",
    )
    .unwrap();

    project
        .fetchbin()
        .env("FETCHBIN_NAME", "from-env")
        .args(["--json", "locate", "1.0.0", "--os", "linux", "--arch", "arm64"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"url\": \"https://example.com/dl/v1.0.0/from-env-linux-arm64\""));
}

#[test]
fn test_locate_rejects_unknown_target() {
    let project = TestProject::new();

    project
        .fetchbin()
        .args(["locate", "1.0.0", "--os", "linux", "--arch", "ia32", "--name", "tool"])
        .args(["--base-url", "https://example.com/dl"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("error[UnsupportedPlatform]"));
}
