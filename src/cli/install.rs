//! The `install` command.
//!
//! Builds a [`ProvisionRequest`] from the config file, `FETCHBIN_*`
//! variables and flags, then runs it with Ctrl-C wired to cancellation.
//!
//! ```bash
//! fetchbin install 2.3.1
//! fetchbin install 2.3.1 --install-dir ./vendor/bin --link-dir ~/.local/bin
//! fetchbin install 2.3.1 --checksums release --timeout 60
//! ```

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::{CliContext, ReleaseArgs, TargetArgs};
use crate::config::{Config, expand_path};
use crate::fetcher::Fetcher;
use crate::installer::LinkOutcome;
use crate::locator::ReleaseHost;
use crate::provision::{ChecksumSource, ProvisionReport, ProvisionRequest, Provisioner};
use crate::verify::Verification;

/// Download, verify and install a version.
#[derive(Args, Debug)]
pub struct InstallCommand {
    /// Version to install, e.g. 2.3.1
    version: String,

    #[command(flatten)]
    target: TargetArgs,

    #[command(flatten)]
    release: ReleaseArgs,

    /// Directory receiving the executable [default: ./bin]
    #[arg(long)]
    install_dir: Option<PathBuf>,

    /// Directory on the command path to link the executable into
    #[arg(long)]
    link_dir: Option<PathBuf>,

    /// Checksum manifest path, `release`, or `none`
    #[arg(long, value_name = "PATH|release|none")]
    checksums: Option<String>,

    /// Overall timeout in seconds for download and verification
    #[arg(long, value_name = "SECONDS")]
    timeout: Option<u64>,
}

impl InstallCommand {
    pub async fn execute(&self, ctx: &CliContext) -> Result<()> {
        let mut config = ctx.load_config().await?;
        self.apply(&mut config);
        config.validate()?;

        let request = self.build_request(&config)?;
        debug!("Install request: {request:?}");

        let provisioner = Provisioner::new(Fetcher::new(config.fetch_options(ctx.show_progress))?);
        let cancel = CancellationToken::new();
        let on_interrupt = cancel.clone();
        let signal_task = tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                on_interrupt.cancel();
            }
        });

        let result = provisioner.provision(&request, &cancel).await;
        signal_task.abort();
        let report = result?;

        if ctx.json {
            ctx.print_json(&report)
        } else {
            print_report(&report, &config);
            Ok(())
        }
    }

    fn apply(&self, config: &mut Config) {
        self.release.apply(config);
        if let Some(checksums) = &self.checksums {
            config.checksums = Some(checksums.clone());
        }
        if let Some(timeout) = self.timeout {
            config.timeout_secs = timeout;
        }
    }

    fn build_request(&self, config: &Config) -> Result<ProvisionRequest> {
        let install_dir = match (&self.install_dir, &config.install_dir) {
            (Some(dir), _) => dir.clone(),
            (None, Some(dir)) => expand_path(dir)?,
            (None, None) => std::env::current_dir().context("Failed to determine current directory")?.join("bin"),
        };
        let link_dir = match (&self.link_dir, &config.link_dir) {
            (Some(dir), _) => Some(dir.clone()),
            (None, Some(dir)) => Some(expand_path(dir)?),
            (None, None) => None,
        };
        let checksums = match config.checksums.as_deref().map(ChecksumSource::from).unwrap_or_default() {
            ChecksumSource::File(path) => ChecksumSource::File(expand_path(&path.to_string_lossy())?),
            source => source,
        };

        Ok(ProvisionRequest {
            version: self.version.clone(),
            os: self.target.os.clone(),
            arch: self.target.arch.clone(),
            name: config.artifact_name.clone().unwrap_or_default(),
            host: ReleaseHost::parse(config.release_base_url.as_deref().unwrap_or_default())?,
            install_dir,
            link_dir,
            checksums,
            timeout: config.timeout(),
        })
    }
}

fn print_report(report: &ProvisionReport, config: &Config) {
    let name = config.artifact_name.as_deref().unwrap_or_default();
    println!(
        "{} {name} {} ({}) to {}",
        "Installed".green().bold(),
        report.version,
        report.target,
        report.installed.final_path.display()
    );

    match &report.verification {
        Verification::Verified {
            sha256,
        } => println!("  {} sha256:{sha256}", "verified".green()),
        Verification::Degraded {
            ..
        } => println!("  {} size and header only", "verified".yellow()),
    }

    if let Some(LinkOutcome::Linked {
        path,
        kind,
    }) = &report.installed.link
    {
        println!("  {} {} ({kind:?})", "linked".green(), path.display());
    }

    for warning in &report.warnings {
        eprintln!("{} {warning}", "warning:".yellow().bold());
    }
}
