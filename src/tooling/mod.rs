use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use url::Url;

use crate::formats::*;

#[cfg(feature = "gui")]
mod commands;
mod install;
mod mux;
mod progress;
mod runtime;
mod youtube;

use mux::*;
use progress::*;
use runtime::*;

#[cfg(feature = "gui")]
pub use commands::*;
pub use install::install_managed_ytdlp_sync;
pub use progress::{
    DownloadProgressEvent, DownloadStage, InstallProgressEvent, LogProgressSink, ProgressSink,
    DOWNLOAD_PROGRESS_EVENT, INSTALL_PROGRESS_EVENT,
};
pub use runtime::{
    build_runtime_status, load_settings, resolve_output_dir, save_settings, AppDirs,
    DownloaderSettings, RuntimeToolsStatus, ToolStatus,
};
pub use youtube::{download_video_sync, probe_formats_sync, DownloadOutcome};
