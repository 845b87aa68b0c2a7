//! Scripted collaborators for pipeline tests

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use async_trait::async_trait;
use url::Url;

use baixabot::core::error::AppError;
use baixabot::download::error::DownloadError;
use baixabot::download::pipeline::Delivery;
use baixabot::download::{FormatSelector, MediaEngine, Probe};

/// What the mock engine should do when `download` is called.
pub enum EngineBehavior {
    /// Write the expected output file
    WriteExpected,
    /// Write the expected output file plus a stray `.part` sibling
    WriteWithLeftovers,
    /// Write a file with the same stem but a different extension
    WriteOtherExtension(String),
    /// Leave a `.part` file behind and fail
    FailAfterPartial(String),
    /// Fail without touching the disk
    Fail(String),
}

pub struct MockEngine {
    behavior: EngineBehavior,
}

impl MockEngine {
    pub fn new(behavior: EngineBehavior) -> Self {
        Self { behavior }
    }

    fn write(path: &Path, contents: &[u8]) -> Result<(), DownloadError> {
        fs::write(path, contents).map_err(|e| DownloadError::Process(format!("mock write failed: {}", e)))
    }
}

#[async_trait]
impl MediaEngine for MockEngine {
    async fn probe(&self, _url: &Url) -> Result<Probe, DownloadError> {
        Err(DownloadError::Other("probe not scripted".to_string()))
    }

    async fn download(&self, _url: &Url, _selector: &FormatSelector, output: &Path) -> Result<(), DownloadError> {
        match &self.behavior {
            EngineBehavior::WriteExpected => Self::write(output, b"media bytes"),
            EngineBehavior::WriteWithLeftovers => {
                Self::write(output, b"media bytes")?;
                Self::write(&output.with_extension("mp4.part"), b"partial")
            }
            EngineBehavior::WriteOtherExtension(ext) => Self::write(&output.with_extension(ext), b"media bytes"),
            EngineBehavior::FailAfterPartial(msg) => {
                Self::write(&output.with_extension("mp4.part"), b"partial")?;
                Err(DownloadError::YtDlp(msg.clone()))
            }
            EngineBehavior::Fail(msg) => Err(DownloadError::YtDlp(msg.clone())),
        }
    }
}

/// A delivered file as the delivery mock observed it.
pub struct DeliveredFile {
    pub path: PathBuf,
    pub caption: String,
    /// Whether the file still existed on disk at delivery time
    pub existed: bool,
    pub title: Option<String>,
    pub performer: Option<String>,
}

#[derive(Default)]
pub struct MockDelivery {
    fail: bool,
    pub delivered: Mutex<Vec<DeliveredFile>>,
}

impl MockDelivery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self { fail: true, delivered: Mutex::new(Vec::new()) }
    }

    fn record(&self, file: DeliveredFile) -> Result<(), AppError> {
        self.delivered.lock().unwrap().push(file);
        if self.fail {
            Err(AppError::Delivery("mock delivery refused".to_string()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl Delivery for MockDelivery {
    async fn deliver_video(&self, path: &Path, caption: &str) -> Result<(), AppError> {
        self.record(DeliveredFile {
            path: path.to_path_buf(),
            caption: caption.to_string(),
            existed: path.exists(),
            title: None,
            performer: None,
        })
    }

    async fn deliver_audio(&self, path: &Path, title: &str, performer: &str, caption: &str) -> Result<(), AppError> {
        self.record(DeliveredFile {
            path: path.to_path_buf(),
            caption: caption.to_string(),
            existed: path.exists(),
            title: Some(title.to_string()),
            performer: Some(performer.to_string()),
        })
    }
}
