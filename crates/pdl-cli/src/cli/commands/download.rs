//! `pdl <URL>`: run one download to completion or first failure.

use anyhow::{Context, Result};
use pdl_core::config::PdlConfig;
use pdl_core::{CancelToken, DownloadMode, DownloadReport, Downloader};
use std::path::Path;

use super::interrupt::spawn_ctrl_c_listener;

pub async fn run_download(
    cfg: &PdlConfig,
    url: &str,
    output: Option<&Path>,
    workers: usize,
) -> Result<()> {
    let downloader = Downloader::from_config(cfg);
    let cancel = CancelToken::new();
    let interrupt = spawn_ctrl_c_listener(cancel.clone());

    let destination = output.map(Path::to_path_buf).unwrap_or_default();
    let result = downloader
        .download_async(url.to_string(), destination, workers, cancel)
        .await;
    interrupt.abort();

    let report = result.with_context(|| format!("download of {} failed", url))?;
    println!("{}", describe(&report));
    Ok(())
}

pub(crate) fn describe(report: &DownloadReport) -> String {
    let how = match report.mode {
        DownloadMode::Ranged => format!("{} ranges", report.ranges),
        DownloadMode::Sequential => "sequential".to_string(),
        DownloadMode::Empty => "empty".to_string(),
    };
    format!(
        "saved {} ({} bytes, {})",
        report.destination.display(),
        report.bytes,
        how
    )
}
