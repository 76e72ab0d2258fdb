//! CLI for the pdl parallel-range downloader.

mod commands;

use anyhow::Result;
use clap::Parser;
use pdl_core::config::{self, PdlConfig};
use pdl_core::ProbeMethod;
use std::path::PathBuf;

use commands::run_download;

/// pdl: download one URL with concurrent HTTP byte ranges.
#[derive(Debug, Parser)]
#[command(name = "pdl", version)]
#[command(about = "pdl: parallel-range HTTP downloader", long_about = None)]
pub struct Cli {
    /// Direct HTTP/HTTPS URL to download.
    pub url: String,

    /// Output file. Defaults to a name taken from Content-Disposition or the URL.
    #[arg(short, long, value_name = "PATH")]
    pub output: Option<PathBuf>,

    /// Directory for derived filenames (overrides `download_dir` in config).
    #[arg(short = 'd', long = "dir", value_name = "DIR")]
    pub dir: Option<PathBuf>,

    /// Number of concurrent range workers (default: `workers` from config).
    #[arg(short, long, value_name = "N")]
    pub workers: Option<usize>,

    /// Probe with HEAD instead of GET.
    #[arg(long)]
    pub head: bool,

    /// Keep the incomplete file when the download fails.
    #[arg(long)]
    pub keep_partial: bool,
}

impl Cli {
    pub async fn run_from_args() -> Result<()> {
        let cli = Cli::parse();
        let mut cfg = config::load_or_init()?;
        cli.apply_to(&mut cfg);
        tracing::debug!("effective config: {:?}", cfg);

        run_download(&cfg, &cli.url, cli.output.as_deref(), cfg.workers).await
    }

    /// Command-line flags win over the config file.
    pub fn apply_to(&self, cfg: &mut PdlConfig) {
        if let Some(n) = self.workers {
            cfg.workers = n;
        }
        if let Some(dir) = &self.dir {
            cfg.download_dir = Some(dir.clone());
        }
        if self.head {
            cfg.probe_method = ProbeMethod::Head;
        }
        if self.keep_partial {
            cfg.keep_partial = true;
        }
    }
}

#[cfg(test)]
mod tests;
