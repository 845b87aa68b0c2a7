//! yt-dlp subprocess engine
//!
//! Production `MediaEngine` implementation. Drives the `yt-dlp` binary
//! (path from `YTDL_BIN`) with a fixed option set: 60s socket timeout,
//! 3 retries, certificate checks disabled, a browser-like User-Agent and
//! `--no-playlist`. Metadata probes use `--dump-json`.

use std::path::Path;

use async_trait::async_trait;
use serde::Deserialize;
use tokio::process::Command as TokioCommand;
use tokio::time::timeout;
use url::Url;

use crate::core::config;
use crate::download::error::DownloadError;
use crate::download::{FormatSelector, MediaEngine, Probe};
use crate::format::parse_raw_formats;

/// The subset of `--dump-json` output the bot cares about.
#[derive(Debug, Deserialize)]
struct RawInfo {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    duration: Option<f64>,
    #[serde(default)]
    uploader: Option<String>,
    #[serde(default)]
    channel: Option<String>,
    #[serde(default)]
    formats: Option<Vec<serde_json::Value>>,
    // Playlist-shaped results carry the formats on the first entry
    #[serde(default)]
    entries: Option<Vec<serde_json::Value>>,
}

#[derive(Debug, Default)]
pub struct YtDlpEngine;

impl YtDlpEngine {
    pub fn new() -> Self {
        Self
    }

    /// Common options shared by probes and downloads.
    fn base_args(args: &mut Vec<String>) {
        args.push("--no-playlist".to_string());
        args.push("--socket-timeout".to_string());
        args.push(config::download::SOCKET_TIMEOUT_SECS.to_string());
        args.push("--retries".to_string());
        args.push(config::download::RETRIES.to_string());
        args.push("--no-check-certificate".to_string());
        args.push("--user-agent".to_string());
        args.push(config::download::USER_AGENT.to_string());
    }

    async fn run(
        args: &[String],
        hard_timeout: std::time::Duration,
        what: &str,
    ) -> Result<std::process::Output, DownloadError> {
        let ytdl_bin = &*config::YTDL_BIN;
        log::debug!("{} command: {} {}", what, ytdl_bin, args.join(" "));

        let output = timeout(hard_timeout, TokioCommand::new(ytdl_bin).args(args).output())
            .await
            .map_err(|_| {
                log::error!("yt-dlp {} timed out after {:?}", what, hard_timeout);
                DownloadError::Timeout(format!("yt-dlp {} timed out", what))
            })?
            .map_err(|e| {
                log::error!("Failed to execute {}: {}", ytdl_bin, e);
                DownloadError::Process(format!("Failed to execute {}: {}", ytdl_bin, e))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            log::error!("yt-dlp {} failed (exit {:?}): {}", what, output.status.code(), stderr.trim());
            return Err(DownloadError::YtDlp(format!("yt-dlp {} failed: {}", what, stderr.trim())));
        }

        Ok(output)
    }
}

#[async_trait]
impl MediaEngine for YtDlpEngine {
    async fn probe(&self, url: &Url) -> Result<Probe, DownloadError> {
        let mut args: Vec<String> = vec!["--dump-json".to_string(), "--skip-download".to_string()];
        Self::base_args(&mut args);
        args.push(url.as_str().to_string());

        let output = Self::run(&args, config::download::probe_timeout(), "probe").await?;

        let info: RawInfo = serde_json::from_slice(&output.stdout)
            .map_err(|e| DownloadError::YtDlp(format!("Failed to parse yt-dlp JSON: {}", e)))?;

        // Single videos carry formats directly; flat playlist results put them
        // on the first entry.
        let format_values = match info.formats {
            Some(values) => values,
            None => info
                .entries
                .as_ref()
                .and_then(|entries| entries.first())
                .and_then(|entry| entry.get("formats"))
                .and_then(|f| f.as_array())
                .cloned()
                .unwrap_or_default(),
        };

        let title = info.title.filter(|t| !t.trim().is_empty()).unwrap_or_else(|| "Video".to_string());
        let uploader = info
            .uploader
            .or(info.channel)
            .filter(|u| !u.trim().is_empty() && u.trim() != "NA")
            .unwrap_or_else(|| "Unknown".to_string());

        log::info!("Probed '{}' by '{}' ({} raw formats)", title, uploader, format_values.len());

        Ok(Probe {
            title,
            duration: info.duration.map(|d| d.round() as u32),
            uploader,
            formats: parse_raw_formats(&format_values),
        })
    }

    async fn download(&self, url: &Url, selector: &FormatSelector, output: &Path) -> Result<(), DownloadError> {
        let template = output.with_extension("%(ext)s");
        let template = template
            .to_str()
            .ok_or_else(|| DownloadError::Other(format!("Non-UTF8 output path: {}", output.display())))?
            .to_string();

        let mut args: Vec<String> = vec!["-f".to_string(), selector.format_arg(), "-o".to_string(), template];

        if let Some(bitrate) = selector.audio_bitrate() {
            // Extract and transcode to MP3 at the requested bitrate
            args.push("-x".to_string());
            args.push("--audio-format".to_string());
            args.push("mp3".to_string());
            args.push("--audio-quality".to_string());
            args.push(format!("{}K", bitrate));
        } else {
            // Normalize the container so Telegram can play it inline
            args.push("--merge-output-format".to_string());
            args.push("mp4".to_string());
        }

        Self::base_args(&mut args);
        args.push(url.as_str().to_string());

        Self::run(&args, config::download::download_timeout(), "download").await?;
        Ok(())
    }
}

/// Logs the installed yt-dlp version at startup; a missing binary is worth
/// knowing about before the first user hits it.
pub async fn log_engine_version() {
    let ytdl_bin = &*config::YTDL_BIN;

    let output = timeout(
        std::time::Duration::from_secs(10),
        TokioCommand::new(ytdl_bin).arg("--version").output(),
    )
    .await;

    match output {
        Ok(Ok(out)) if out.status.success() => {
            let version = String::from_utf8_lossy(&out.stdout).trim().to_string();
            log::info!("yt-dlp version: {}", version);
        }
        Ok(Ok(_)) | Ok(Err(_)) => {
            log::error!("yt-dlp not found at '{}'. Downloads will fail until it is installed.", ytdl_bin);
        }
        Err(_) => {
            log::warn!("yt-dlp --version timed out");
        }
    }
}
