//! The `verify` command: check an existing file against a checksum manifest.
//!
//! The manifest entry is looked up by `--name`, or by the file's own name
//! when `--name` is omitted. A missing entry is a failure.

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use serde::Serialize;
use std::path::PathBuf;

use super::{CliContext, TargetArgs};
use crate::config::expand_path;
use crate::core::FetchbinError;
use crate::platform::TargetDescriptor;
use crate::verify::{ChecksumManifest, ExpectedIntegrity, Verification, verify_file};

/// Verify a file against a checksum manifest.
#[derive(Args, Debug)]
pub struct VerifyCommand {
    /// File to verify
    file: PathBuf,

    /// Checksum manifest (`<sha256>  <file name>` per line)
    #[arg(long, value_name = "PATH")]
    checksums: PathBuf,

    /// Manifest entry to check against [default: the file's name]
    #[arg(long)]
    name: Option<String>,

    #[command(flatten)]
    target: TargetArgs,
}

#[derive(Debug, Serialize)]
struct VerifyReport {
    file: PathBuf,
    entry: String,
    verification: Verification,
}

impl VerifyCommand {
    pub async fn execute(&self, ctx: &CliContext) -> Result<()> {
        let report = self.run().await?;

        if ctx.json {
            return ctx.print_json(&report);
        }
        if let Verification::Verified {
            sha256,
        } = &report.verification
        {
            println!("{} {} sha256:{sha256}", "OK".green().bold(), report.file.display());
        }
        Ok(())
    }

    async fn run(&self) -> Result<VerifyReport> {
        let entry = match &self.name {
            Some(name) => name.clone(),
            None => self
                .file
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .with_context(|| format!("'{}' has no file name", self.file.display()))?,
        };

        let manifest_path = expand_path(&self.checksums.to_string_lossy())?;
        let manifest = ChecksumManifest::load(&manifest_path).await?;
        let digest = manifest.lookup(&entry).ok_or_else(|| FetchbinError::IntegrityMismatch {
            artifact: entry.clone(),
            expected: format!("an entry in {}", manifest_path.display()),
            actual: "no entry".to_string(),
        })?;

        let target = TargetDescriptor::resolve_or_current(self.target.os.as_deref(), self.target.arch.as_deref())?;
        let verification =
            verify_file(&self.file, &entry, target.os(), &ExpectedIntegrity::digest(digest)).await?;

        Ok(VerifyReport {
            file: self.file.clone(),
            entry,
            verification,
        })
    }
}
