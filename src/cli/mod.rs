//! Command-line interface for fetchbin.
//!
//! # Commands
//!
//! - `install <VERSION>` - Fetch, verify and install the artifact for this
//!   machine (or for `--os`/`--arch`), optionally linking it into a directory
//!   on the command path
//! - `locate <VERSION>` - Print the resolved target and download URL without
//!   touching the network
//! - `verify <FILE>` - Check an existing file against a checksum manifest
//!
//! # Global Options
//!
//! - `--verbose` / `-v`: debug logging
//! - `--quiet` / `-q`: errors only, no progress bars
//! - `--config` / `-c`: explicit config file
//! - `--no-progress`: never draw progress bars
//! - `--json`: machine-readable output on stdout
//!
//! # Exit Status
//!
//! `0` on success, including degraded success (unverified checksum or a
//! skipped link) which is reported as a warning. `1` on any failure, with a
//! single diagnostic line naming the failing stage.
//!
//! ```bash
//! fetchbin install 2.3.1 --link-dir ~/.local/bin --checksums release
//! fetchbin locate 2.3.1 --os win32 --arch x64
//! fetchbin verify ./bin/tool --checksums checksums.txt --name tool-linux-amd64
//! ```

mod install;
mod locate;
mod verify;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;

use crate::config::{Config, expand_path};
use crate::utils::{Verbosity, init_logging};

/// Settings derived from the global flags, shared by every subcommand.
#[derive(Debug, Clone, Default)]
pub struct CliContext {
    pub verbosity: Verbosity,
    /// Whether progress bars may be drawn
    pub show_progress: bool,
    /// Print JSON instead of text
    pub json: bool,
    /// Explicit config file
    pub config_path: Option<PathBuf>,
}

impl CliContext {
    /// Load configuration using the process environment.
    pub async fn load_config(&self) -> Result<Config> {
        let path = self.config_path.as_deref().map(|p| expand_path(&p.to_string_lossy())).transpose()?;
        Config::load(path.as_deref(), |key| std::env::var(key).ok()).await
    }

    /// Print `value` as pretty JSON on stdout.
    pub fn print_json<T: Serialize>(&self, value: &T) -> Result<()> {
        println!("{}", serde_json::to_string_pretty(value)?);
        Ok(())
    }
}

/// Fetch, verify and provision prebuilt binaries from a release host.
#[derive(Parser)]
#[command(name = "fetchbin", version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Only report errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    /// Path to a config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Disable progress bars
    #[arg(long, global = true)]
    no_progress: bool,

    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Download, verify and install a version
    Install(install::InstallCommand),
    /// Show the target and URL a version resolves to
    Locate(locate::LocateCommand),
    /// Verify a file against a checksum manifest
    Verify(verify::VerifyCommand),
}

/// Target selection shared by several commands.
#[derive(Args, Debug, Clone, Default)]
pub struct TargetArgs {
    /// Operating system (darwin, linux, windows; win32 and macos accepted)
    #[arg(long)]
    pub os: Option<String>,

    /// CPU architecture (amd64, arm64; x64, x86_64 and aarch64 accepted)
    #[arg(long)]
    pub arch: Option<String>,
}

/// Release selection shared by `install` and `locate`.
#[derive(Args, Debug, Clone, Default)]
pub struct ReleaseArgs {
    /// Artifact name
    #[arg(long)]
    pub name: Option<String>,

    /// Base URL of the release host
    #[arg(long)]
    pub base_url: Option<String>,
}

impl ReleaseArgs {
    /// Let command-line values win over the config.
    pub fn apply(&self, config: &mut Config) {
        if let Some(name) = &self.name {
            config.artifact_name = Some(name.clone());
        }
        if let Some(url) = &self.base_url {
            config.release_base_url = Some(url.clone());
        }
    }
}

impl Cli {
    /// Build the shared context from the global flags.
    #[must_use]
    pub fn build_context(&self) -> CliContext {
        CliContext {
            verbosity: Verbosity::from_flags(self.verbose, self.quiet),
            show_progress: !(self.no_progress || self.quiet || self.json),
            json: self.json,
            config_path: self.config.clone(),
        }
    }

    /// Initialise logging and run the selected command.
    pub async fn execute(self) -> Result<()> {
        let ctx = self.build_context();
        init_logging(ctx.verbosity);

        match self.command {
            Commands::Install(cmd) => cmd.execute(&ctx).await,
            Commands::Locate(cmd) => cmd.execute(&ctx).await,
            Commands::Verify(cmd) => cmd.execute(&ctx).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_definition_is_valid() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_context_from_flags() {
        let cli = Cli::parse_from(["fetchbin", "--json", "locate", "1.0.0"]);
        let ctx = cli.build_context();
        assert!(ctx.json);
        assert!(!ctx.show_progress);
        assert_eq!(ctx.verbosity, Verbosity::Normal);

        let cli = Cli::parse_from(["fetchbin", "install", "1.0.0", "-v"]);
        let ctx = cli.build_context();
        assert!(ctx.show_progress);
        assert_eq!(ctx.verbosity, Verbosity::Verbose);
    }

    #[test]
    fn test_quiet_and_verbose_conflict() {
        assert!(Cli::try_parse_from(["fetchbin", "-q", "-v", "locate", "1.0.0"]).is_err());
    }

    #[test]
    fn test_release_args_override_config() {
        let mut config = Config {
            artifact_name: Some("from-file".into()),
            ..Config::default()
        };
        ReleaseArgs {
            name: Some("from-flag".into()),
            base_url: None,
        }
        .apply(&mut config);
        assert_eq!(config.artifact_name.as_deref(), Some("from-flag"));
        assert!(config.release_base_url.is_none());
    }
}
