// Progress reporting for installs and downloads, detached from the window layer.
use super::*;

pub const INSTALL_PROGRESS_EVENT: &str = "downloader://install-progress";
pub const DOWNLOAD_PROGRESS_EVENT: &str = "downloader://download-progress";

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InstallProgressEvent {
    pub task: String,
    pub title: String,
    pub status: String,
    pub message: String,
    pub detail: Option<String>,
    pub progress: Option<f32>,
}

/// Milestones of a download. The percentages are fixed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum DownloadStage {
    Started,
    FirstStreamDone,
    StreamsDone,
    MuxDone,
    CleanupDone,
    Finished,
}

impl DownloadStage {
    pub fn percent(self) -> u8 {
        match self {
            Self::Started => 0,
            Self::FirstStreamDone => 10,
            Self::StreamsDone => 60,
            Self::MuxDone => 90,
            Self::CleanupDone => 99,
            Self::Finished => 100,
        }
    }

    fn message(self) -> &'static str {
        match self {
            Self::Started => "Starting download...",
            Self::FirstStreamDone => "Audio stream downloaded.",
            Self::StreamsDone => "Video stream downloaded.",
            Self::MuxDone => "Streams combined.",
            Self::CleanupDone => "Temporary files removed.",
            Self::Finished => "Download complete.",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadProgressEvent {
    pub task: String,
    pub stage: DownloadStage,
    pub percent: u8,
    pub message: String,
}

/// Receiver for progress updates. The desktop shell forwards them as window
/// events; headless callers can log or collect them.
pub trait ProgressSink: Send + Sync {
    fn install_progress(&self, event: InstallProgressEvent);
    fn download_progress(&self, event: DownloadProgressEvent);
}

/// Writes progress to the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogProgressSink;

impl ProgressSink for LogProgressSink {
    fn install_progress(&self, event: InstallProgressEvent) {
        log::info!(
            "[{}] {} {}: {}",
            event.task,
            event.title,
            event.status,
            event.message
        );
    }

    fn download_progress(&self, event: DownloadProgressEvent) {
        log::info!("[{}] {}% {}", event.task, event.percent, event.message);
    }
}

#[cfg(feature = "gui")]
impl<R: tauri::Runtime> ProgressSink for tauri::AppHandle<R> {
    fn install_progress(&self, event: InstallProgressEvent) {
        use tauri::Emitter;
        if let Err(error) = self.emit(INSTALL_PROGRESS_EVENT, event) {
            log::warn!("Failed to emit install progress: {error}");
        }
    }

    fn download_progress(&self, event: DownloadProgressEvent) {
        use tauri::Emitter;
        if let Err(error) = self.emit(DOWNLOAD_PROGRESS_EVENT, event) {
            log::warn!("Failed to emit download progress: {error}");
        }
    }
}

pub(super) fn task_title(task: &str) -> &'static str {
    match task {
        "ytdlp" => "yt-dlp",
        "probe" => "Video formats",
        "download" => "Video download",
        _ => "Tooling",
    }
}

pub(super) fn emit_install_progress(
    sink: &dyn ProgressSink,
    task: &str,
    status: &str,
    message: &str,
    progress: Option<f32>,
) {
    emit_install_progress_with_detail(sink, task, status, message, None, progress);
}

pub(super) fn emit_install_progress_with_detail(
    sink: &dyn ProgressSink,
    task: &str,
    status: &str,
    message: &str,
    detail: Option<String>,
    progress: Option<f32>,
) {
    sink.install_progress(InstallProgressEvent {
        task: task.to_string(),
        title: task_title(task).to_string(),
        status: status.to_string(),
        message: message.to_string(),
        detail,
        progress: progress.map(|value| value.clamp(0.0, 1.0)),
    });
}

pub(super) fn emit_download_stage(sink: &dyn ProgressSink, task: &str, stage: DownloadStage) {
    sink.download_progress(DownloadProgressEvent {
        task: task.to_string(),
        stage,
        percent: stage.percent(),
        message: stage.message().to_string(),
    });
}
