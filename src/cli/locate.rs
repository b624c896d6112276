//! The `locate` command: show where a version would be downloaded from.
//!
//! No network access happens; this is useful for checking `--os`/`--arch`
//! spellings and the configured release host.

use anyhow::Result;
use clap::Args;
use colored::Colorize;

use super::{CliContext, ReleaseArgs, TargetArgs};
use crate::locator::{ArtifactReference, ReleaseHost};
use crate::platform::TargetDescriptor;

/// Show the target and URL a version resolves to.
#[derive(Args, Debug)]
pub struct LocateCommand {
    /// Version to locate, e.g. 2.3.1
    version: String,

    #[command(flatten)]
    target: TargetArgs,

    #[command(flatten)]
    release: ReleaseArgs,
}

impl LocateCommand {
    pub async fn execute(&self, ctx: &CliContext) -> Result<()> {
        let mut config = ctx.load_config().await?;
        self.release.apply(&mut config);
        config.validate()?;

        let reference = self.locate(
            config.release_base_url.as_deref().unwrap_or_default(),
            config.artifact_name.as_deref().unwrap_or_default(),
        )?;

        if ctx.json {
            return ctx.print_json(&reference);
        }

        println!("{:<10} {}", "target".bold(), reference.target);
        println!("{:<10} {}", "file".bold(), reference.file_name);
        println!("{:<10} {}", "url".bold(), reference.url);
        println!("{:<10} {}", "checksums".bold(), reference.checksums_url);
        println!("{:<10} {}", "installs".bold(), reference.installed_file_name());
        Ok(())
    }

    fn locate(&self, base_url: &str, name: &str) -> Result<ArtifactReference> {
        let target = TargetDescriptor::resolve_or_current(self.target.os.as_deref(), self.target.arch.as_deref())?;
        let host = ReleaseHost::parse(base_url)?;
        Ok(ArtifactReference::locate(&host, name, &target, &self.version)?)
    }
}
