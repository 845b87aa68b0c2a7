//! Download pipeline: engine invocation, temp-file lifecycle, delivery
//!
//! `execute` is the single entry point for turning a format selection into a
//! delivered file. The temp artifacts live inside a scope guard, so they are
//! removed on every exit path: success, download failure or delivery failure.

use std::fs;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use fluent_templates::fluent_bundle::FluentArgs;
use unic_langid::LanguageIdentifier;
use url::Url;
use uuid::Uuid;

use crate::core::config;
use crate::core::error::AppError;
use crate::core::utils::format_size_mb;
use crate::download::error::DownloadError;
use crate::download::{FormatSelector, MediaEngine};
use crate::i18n;

/// The delivery collaborator: hands a finished file back to the user.
///
/// Implemented by the Telegram adapter in production and by mocks in tests.
#[async_trait]
pub trait Delivery: Send + Sync {
    async fn deliver_video(&self, path: &Path, caption: &str) -> Result<(), AppError>;

    async fn deliver_audio(&self, path: &Path, title: &str, performer: &str, caption: &str) -> Result<(), AppError>;
}

/// One download request resolved by the conversation layer.
#[derive(Debug, Clone)]
pub struct DownloadJob {
    pub url: Url,
    pub selector: FormatSelector,
    pub title: String,
    /// Uploader/channel, used as the audio performer
    pub performer: String,
    /// Quality label shown in the video caption, e.g. "1080p" or "HD"
    pub quality_label: String,
    /// Collision-avoidance scope, unique per triggering event
    pub scope: String,
    pub lang: LanguageIdentifier,
}

impl DownloadJob {
    /// Builds a scope unique to the triggering chat event so concurrent
    /// downloads never collide on disk.
    pub fn scope_for(chat_id: i64) -> String {
        format!("{}_{}", chat_id, Uuid::new_v4().simple())
    }
}

/// Removes every file sharing the download's stem when dropped.
///
/// yt-dlp leaves `.part`/`.frag` files behind on interruption and may pick a
/// different final extension than requested, so cleanup matches on the stem
/// rather than one exact path.
struct TempScope {
    dir: PathBuf,
    stem: String,
}

impl TempScope {
    fn new(dir: PathBuf, stem: String) -> Self {
        Self { dir, stem }
    }

    /// Locates the produced file: the expected path when it exists, otherwise
    /// any file in the scope sharing the stem (the engine may have produced a
    /// different extension).
    fn find_output(&self, expected: &Path) -> Result<PathBuf, DownloadError> {
        if expected.exists() {
            return Ok(expected.to_path_buf());
        }
        log::warn!("File not found at expected path: {}", expected.display());

        let entries = fs::read_dir(&self.dir)
            .map_err(|e| DownloadError::FileNotFound(format!("Failed to read download dir: {}", e)))?;

        let mut candidates: Vec<PathBuf> = entries
            .flatten()
            .filter(|entry| {
                let name = entry.file_name();
                let name = name.to_string_lossy();
                name.starts_with(&self.stem) && !name.ends_with(".part") && !name.ends_with(".ytdl")
            })
            .map(|entry| entry.path())
            .collect();
        candidates.sort();

        candidates.pop().ok_or_else(|| {
            DownloadError::FileNotFound(format!("Downloaded file not found for {}", expected.display()))
        })
    }
}

impl Drop for TempScope {
    fn drop(&mut self) {
        let Ok(entries) = fs::read_dir(&self.dir) else {
            return;
        };
        for entry in entries.flatten() {
            if entry.file_name().to_string_lossy().starts_with(&self.stem) {
                if let Err(e) = fs::remove_file(entry.path()) {
                    log::warn!("Failed to remove temp file {}: {}", entry.path().display(), e);
                }
            }
        }
    }
}

/// Runs one download end to end: fetch via the engine, locate the produced
/// file, deliver it with a caption. Temp files are removed on every outcome.
pub async fn execute(engine: &dyn MediaEngine, delivery: &dyn Delivery, job: &DownloadJob) -> Result<(), AppError> {
    let dir = PathBuf::from(&*config::DOWNLOAD_FOLDER);
    fs::create_dir_all(&dir)?;

    let kind = if job.selector.is_audio() { "audio" } else { "video" };
    let stem = format!("{}_{}", kind, job.scope);
    let expected = dir.join(format!("{}.{}", stem, job.selector.output_ext()));

    let scope = TempScope::new(dir, stem);

    log::info!("Starting {} download for '{}' ({:?})", kind, job.title, job.selector);
    engine.download(&job.url, &job.selector, &expected).await?;

    let file_path = scope.find_output(&expected)?;
    let file_size = fs::metadata(&file_path)?.len();
    log::info!("Downloaded {} ({} MB), delivering", file_path.display(), format_size_mb(file_size));

    let result = if job.selector.is_audio() {
        let mut args = FluentArgs::new();
        args.set("title", job.title.as_str());
        let caption = i18n::t_args(&job.lang, "caption-audio", &args);
        delivery.deliver_audio(&file_path, &job.title, &job.performer, &caption).await
    } else {
        let mut args = FluentArgs::new();
        args.set("title", job.title.as_str());
        args.set("quality", job.quality_label.as_str());
        args.set("size", format_size_mb(file_size));
        let caption = i18n::t_args(&job.lang, "caption-video", &args);
        delivery.deliver_video(&file_path, &caption).await
    };

    // `scope` drops here, removing the artifacts regardless of `result`
    result
}
