//! Download progress reporting.
//!
//! Thin wrapper over `indicatif` that renders a byte counter while an artifact
//! streams to disk. When progress is disabled (`--no-progress`, `--quiet`,
//! `--json`, or a non-terminal stderr) the bar is hidden and every call is a
//! no-op, so callers never need to branch.

use indicatif::{ProgressBar as IndicatifBar, ProgressStyle as IndicatifStyle};
use std::io::IsTerminal;
use std::time::Duration;

/// A progress indicator for one transfer.
#[derive(Clone)]
pub struct DownloadProgress {
    inner: IndicatifBar,
}

impl DownloadProgress {
    /// Create a bar for a transfer of `len` bytes, or a spinner when the
    /// length is unknown.
    #[must_use]
    pub fn new(enabled: bool, len: Option<u64>, label: &str) -> Self {
        if !enabled || !std::io::stderr().is_terminal() {
            return Self::hidden();
        }

        let bar = match len {
            Some(len) => {
                let bar = IndicatifBar::new(len);
                if let Ok(style) = download_style() {
                    bar.set_style(style);
                }
                bar
            }
            None => {
                let bar = IndicatifBar::new_spinner();
                if let Ok(style) = spinner_style() {
                    bar.set_style(style);
                }
                bar.enable_steady_tick(Duration::from_millis(100));
                bar
            }
        };
        bar.set_prefix(label.to_string());
        Self {
            inner: bar,
        }
    }

    /// A progress indicator that draws nothing.
    #[must_use]
    pub fn hidden() -> Self {
        Self {
            inner: IndicatifBar::hidden(),
        }
    }

    /// Record `delta` more bytes.
    pub fn inc(&self, delta: u64) {
        self.inner.inc(delta);
    }

    /// Remove the bar from the terminal.
    pub fn finish_and_clear(&self) {
        self.inner.finish_and_clear();
    }
}

fn download_style() -> Result<IndicatifStyle, indicatif::style::TemplateError> {
    Ok(IndicatifStyle::default_bar()
        .template("{prefix:.bold.cyan} [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({eta})")?
        .progress_chars("━╸━"))
}

fn spinner_style() -> Result<IndicatifStyle, indicatif::style::TemplateError> {
    Ok(IndicatifStyle::default_spinner()
        .template("{prefix:.bold} {spinner:.cyan} {bytes}")?
        .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]))
}
