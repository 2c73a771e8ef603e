// Managed yt-dlp install/update with release checksum verification.
use super::*;

const YTDLP_RELEASE_BASE_URL: &str = "https://github.com/yt-dlp/yt-dlp/releases/latest/download";
const INSTALL_TASK: &str = "ytdlp";

pub(super) fn ytdlp_asset_name() -> &'static str {
    if cfg!(target_os = "windows") {
        "yt-dlp.exe"
    } else if cfg!(target_os = "macos") {
        "yt-dlp_macos"
    } else {
        "yt-dlp"
    }
}

pub(super) fn ytdlp_download_url() -> String {
    format!("{YTDLP_RELEASE_BASE_URL}/{}", ytdlp_asset_name())
}

fn expected_ytdlp_sha256() -> Result<String, String> {
    let manifest = download_text(YTDLP_SHA256SUMS_URL)?;
    parse_sha256_for_asset(&manifest, ytdlp_asset_name())
        .ok_or_else(|| "Failed to find SHA256 for selected yt-dlp binary.".to_string())
}

/// Moves a verified download into place, replacing any previous copy.
pub(super) fn finalize_managed_binary(temp_path: &Path, target_path: &Path) -> Result<(), String> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(temp_path, fs::Permissions::from_mode(0o755))
            .map_err(|error| format!("Failed to set yt-dlp permissions: {error}"))?;
    }

    if target_path.exists() && cfg!(target_os = "windows") {
        fs::remove_file(target_path)
            .map_err(|error| format!("Failed to replace previous yt-dlp: {error}"))?;
    }
    fs::rename(temp_path, target_path)
        .map_err(|error| format!("Failed to complete yt-dlp installation: {error}"))
}

pub fn install_managed_ytdlp_sync(
    dirs: &AppDirs,
    sink: &dyn ProgressSink,
) -> Result<ToolStatus, String> {
    emit_install_progress(
        sink,
        INSTALL_TASK,
        "progress",
        "Verifying yt-dlp release checksum...",
        Some(0.04),
    );
    let expected_sha256 = expected_ytdlp_sha256()?;

    let target_path = managed_ytdlp_path(dirs)?;
    let temp_path = target_path.with_extension("tmp");
    let download_url = ytdlp_download_url();
    if let Err(error) =
        download_to_path_with_progress(sink, INSTALL_TASK, &download_url, &temp_path, 0.08, 0.88)
    {
        let _ = fs::remove_file(&temp_path);
        return Err(error);
    }

    emit_install_progress(
        sink,
        INSTALL_TASK,
        "progress",
        "Validating downloaded yt-dlp integrity...",
        Some(0.91),
    );
    if let Err(error) = verify_download_checksum(&temp_path, &expected_sha256) {
        let _ = fs::remove_file(&temp_path);
        return Err(error);
    }

    emit_install_progress(
        sink,
        INSTALL_TASK,
        "progress",
        "Applying yt-dlp update...",
        Some(0.95),
    );
    finalize_managed_binary(&temp_path, &target_path)?;
    log::info!("Installed managed yt-dlp at {}", target_path.display());

    let status = inspect_tool(
        Some((target_path, "managed".to_string())),
        "yt-dlp",
        "--version",
    );
    emit_install_progress_with_detail(
        sink,
        INSTALL_TASK,
        "success",
        "yt-dlp installed successfully.",
        status.version.clone(),
        Some(1.0),
    );
    Ok(status)
}
