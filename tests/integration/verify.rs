//! `fetchbin verify` checks existing files against a manifest.

use predicates::prelude::*;

use crate::common::{TestProject, write_checksums};

#[test]
fn test_verify_matching_file() {
    let project = TestProject::new();
    let file = project.path().join("tool-linux-amd64");
    std::fs::write(&file, b"release bytes").unwrap();
    let manifest = write_checksums(project.path(), &[("tool-linux-amd64", b"release bytes".as_slice())]).unwrap();

    project
        .fetchbin()
        .arg("verify")
        .arg(&file)
        .arg("--checksums")
        .arg(&manifest)
        .assert()
        .success()
        .stdout(predicate::str::contains("OK"));
}

#[test]
fn test_verify_mismatch_fails() {
    let project = TestProject::new();
    let file = project.path().join("tool");
    std::fs::write(&file, b"modified bytes").unwrap();
    let manifest = write_checksums(project.path(), &[("tool-linux-amd64", b"release bytes".as_slice())]).unwrap();

    project
        .fetchbin()
        .arg("verify")
        .arg(&file)
        .arg("--checksums")
        .arg(&manifest)
        .args(["--name", "tool-linux-amd64"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("error[IntegrityMismatch]"));
}
