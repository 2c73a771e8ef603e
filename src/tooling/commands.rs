// Tauri commands exposed to the downloader window.
use super::*;
use tauri::AppHandle;

/// Probe result plus the picker entries built from it.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProbeResponse {
    #[serde(flatten)]
    pub formats: FormatList,
    pub video_choices: Vec<FormatChoice>,
    pub audio_choices: Vec<FormatChoice>,
}

#[tauri::command]
pub fn get_downloader_settings(app: AppHandle) -> Result<DownloaderSettings, String> {
    load_settings(&AppDirs::from_app(&app)?)
}

#[tauri::command]
pub fn save_downloader_settings(
    app: AppHandle,
    settings: DownloaderSettings,
) -> Result<DownloaderSettings, String> {
    save_settings(&AppDirs::from_app(&app)?, settings)
}

#[tauri::command]
pub fn get_runtime_tools_status(app: AppHandle) -> Result<RuntimeToolsStatus, String> {
    let dirs = AppDirs::from_app(&app)?;
    let settings = load_settings(&dirs)?;
    Ok(build_runtime_status(&dirs, settings))
}

#[tauri::command]
pub fn pick_output_dir() -> Result<Option<String>, String> {
    Ok(rfd::FileDialog::new()
        .pick_folder()
        .map(|path| path.to_string_lossy().to_string()))
}

#[tauri::command]
pub fn open_output_dir(app: AppHandle) -> Result<String, String> {
    let dirs = AppDirs::from_app(&app)?;
    let settings = load_settings(&dirs)?;
    let output_dir = resolve_output_dir(&dirs, &settings)?;
    open_in_file_manager(&output_dir)?;
    Ok(output_dir.to_string_lossy().to_string())
}

#[tauri::command]
pub async fn install_or_update_managed_ytdlp(app: AppHandle) -> Result<ToolStatus, String> {
    let app_for_task = app.clone();
    tauri::async_runtime::spawn_blocking(move || {
        let dirs = AppDirs::from_app(&app_for_task)?;
        install_managed_ytdlp_sync(&dirs, &app_for_task)
    })
    .await
    .map_err(|error| format!("yt-dlp install task failed: {error}"))?
    .inspect_err(|error| {
        emit_install_progress_with_detail(
            &app,
            "ytdlp",
            "error",
            "yt-dlp installation failed.",
            Some(error.clone()),
            None,
        );
    })
}

#[tauri::command]
pub async fn probe_video_formats(app: AppHandle, url: String) -> Result<ProbeResponse, String> {
    let app_for_task = app.clone();
    tauri::async_runtime::spawn_blocking(move || -> Result<ProbeResponse, String> {
        let dirs = AppDirs::from_app(&app_for_task)?;
        let formats = probe_formats_sync(&dirs, &url)?;
        Ok(ProbeResponse {
            video_choices: formats.video_choices(),
            audio_choices: formats.audio_choices(),
            formats,
        })
    })
    .await
    .map_err(|error| format!("Format probe task failed: {error}"))?
    .inspect_err(|error| {
        emit_install_progress_with_detail(
            &app,
            "probe",
            "error",
            "Could not read video formats.",
            Some(error.clone()),
            None,
        );
    })
}

async fn spawn_download(
    app: AppHandle,
    url: String,
    selection: DownloadSelection,
    task_id: Option<String>,
) -> Result<DownloadOutcome, String> {
    tauri::async_runtime::spawn_blocking(move || {
        let dirs = AppDirs::from_app(&app)?;
        download_video_sync(&dirs, &app, &url, selection, task_id)
    })
    .await
    .map_err(|error| format!("Download task failed: {error}"))?
}

#[tauri::command]
pub async fn download_video(
    app: AppHandle,
    url: String,
    task_id: Option<String>,
) -> Result<DownloadOutcome, String> {
    spawn_download(app, url, DownloadSelection::Best, task_id).await
}

#[tauri::command]
pub async fn download_custom_video(
    app: AppHandle,
    url: String,
    video_format_id: Option<String>,
    audio_format_id: Option<String>,
    task_id: Option<String>,
) -> Result<DownloadOutcome, String> {
    let selection =
        DownloadSelection::from_picks(video_format_id.as_deref(), audio_format_id.as_deref())?;
    if !selection.is_custom() {
        return Err("Select video and audio quality".to_string());
    }
    spawn_download(app, url, selection, task_id).await
}
