// Settings, tool discovery, input validation and trusted downloads.
use super::*;
use sha2::{Digest, Sha256};
use std::ffi::OsStr;
use std::io::{Read, Write};
#[cfg(target_os = "windows")]
use std::os::windows::process::CommandExt;
use std::process::Command;
use std::time::Instant;
use which::which;

pub(super) const SETTINGS_FILE_NAME: &str = "downloader-settings.json";
pub(super) const YTDLP_SHA256SUMS_URL: &str =
    "https://github.com/yt-dlp/yt-dlp/releases/latest/download/SHA2-256SUMS";
pub(super) const TRUSTED_DOWNLOAD_HOSTS: [&str; 2] =
    ["github.com", "objects.githubusercontent.com"];
const MAX_SETTINGS_PATH_LEN: usize = 512;
const MAX_FORMAT_ID_LEN: usize = 64;
const FILE_NAME_FORBIDDEN: [char; 9] = ['<', '>', ':', '"', '/', '\\', '|', '?', '*'];
#[cfg(target_os = "windows")]
pub(super) const CREATE_NO_WINDOW: u32 = 0x0800_0000;

pub(super) fn hidden_command(program: impl AsRef<OsStr>) -> Command {
    let mut command = Command::new(program);
    #[cfg(target_os = "windows")]
    {
        command.creation_flags(CREATE_NO_WINDOW);
    }
    command
}

/// Where the application keeps its settings, managed tools and downloads.
#[derive(Debug, Clone)]
pub struct AppDirs {
    pub config_dir: PathBuf,
    pub data_dir: PathBuf,
    pub downloads_dir: PathBuf,
    pub resource_dir: Option<PathBuf>,
}

impl AppDirs {
    pub fn new(config_dir: PathBuf, data_dir: PathBuf, downloads_dir: PathBuf) -> Self {
        Self {
            config_dir,
            data_dir,
            downloads_dir,
            resource_dir: None,
        }
    }

    #[cfg(feature = "gui")]
    pub fn from_app<R: tauri::Runtime>(app: &tauri::AppHandle<R>) -> Result<Self, String> {
        use tauri::Manager;

        let resolver = app.path();
        let config_dir = resolver
            .app_config_dir()
            .map_err(|error| format!("Failed to resolve app config dir: {error}"))?;
        let data_dir = resolver
            .app_data_dir()
            .map_err(|error| format!("Failed to resolve app data dir: {error}"))?;
        let downloads_dir = resolver
            .download_dir()
            .or_else(|_| resolver.home_dir())
            .map_err(|error| format!("Failed to resolve downloads dir: {error}"))?;
        Ok(Self {
            config_dir,
            data_dir,
            downloads_dir,
            resource_dir: resolver.resource_dir().ok(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloaderSettings {
    pub ytdlp_mode: String,
    pub ytdlp_custom_path: Option<String>,
    pub ffmpeg_custom_path: Option<String>,
    pub output_dir: Option<String>,
    pub prefer_bundled_ffmpeg: bool,
}

impl Default for DownloaderSettings {
    fn default() -> Self {
        Self {
            ytdlp_mode: "managed".to_string(),
            ytdlp_custom_path: None,
            ffmpeg_custom_path: None,
            output_dir: None,
            prefer_bundled_ffmpeg: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolStatus {
    pub name: String,
    pub available: bool,
    pub source: String,
    pub path: Option<String>,
    pub version: Option<String>,
    pub message: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuntimeToolsStatus {
    pub settings: DownloaderSettings,
    pub ffmpeg: ToolStatus,
    pub ytdlp: ToolStatus,
    pub ytdlp_system_available: bool,
    pub output_dir: String,
}

pub(super) fn ensure_dir(path: &Path, label: &str) -> Result<PathBuf, String> {
    fs::create_dir_all(path).map_err(|error| format!("Failed to create {label} dir: {error}"))?;
    Ok(path.to_path_buf())
}

pub(super) fn settings_file_path(dirs: &AppDirs) -> Result<PathBuf, String> {
    Ok(ensure_dir(&dirs.config_dir, "config")?.join(SETTINGS_FILE_NAME))
}

pub(super) fn tools_dir(dirs: &AppDirs) -> Result<PathBuf, String> {
    ensure_dir(&dirs.data_dir.join("tools"), "tools")
}

pub(super) fn managed_ytdlp_path(dirs: &AppDirs) -> Result<PathBuf, String> {
    Ok(tools_dir(dirs)?.join(platform_bin("yt-dlp")))
}

pub(super) fn sanitize_optional_path(value: Option<String>) -> Result<Option<String>, String> {
    match value {
        None => Ok(None),
        Some(raw) => {
            let trimmed = raw.trim();
            if trimmed.is_empty() {
                return Ok(None);
            }
            if trimmed.len() > MAX_SETTINGS_PATH_LEN {
                return Err("Path is too long.".to_string());
            }
            if trimmed.chars().any(|ch| ch.is_control()) {
                return Err("Path contains invalid control characters.".to_string());
            }
            Ok(Some(trimmed.to_string()))
        }
    }
}

pub(super) fn normalize_settings(
    mut settings: DownloaderSettings,
) -> Result<DownloaderSettings, String> {
    settings.ytdlp_mode = settings.ytdlp_mode.trim().to_lowercase();
    if !matches!(settings.ytdlp_mode.as_str(), "managed" | "custom" | "system") {
        settings.ytdlp_mode = "managed".to_string();
    }
    settings.ytdlp_custom_path = sanitize_optional_path(settings.ytdlp_custom_path)?;
    settings.ffmpeg_custom_path = sanitize_optional_path(settings.ffmpeg_custom_path)?;
    settings.output_dir = sanitize_optional_path(settings.output_dir)?;
    Ok(settings)
}

pub fn load_settings(dirs: &AppDirs) -> Result<DownloaderSettings, String> {
    let path = settings_file_path(dirs)?;
    if !path.exists() {
        return Ok(DownloaderSettings::default());
    }

    let raw =
        fs::read_to_string(&path).map_err(|error| format!("Failed to read settings: {error}"))?;
    let parsed: DownloaderSettings =
        serde_json::from_str(&raw).map_err(|error| format!("Failed to parse settings: {error}"))?;
    normalize_settings(parsed)
}

pub fn save_settings(
    dirs: &AppDirs,
    settings: DownloaderSettings,
) -> Result<DownloaderSettings, String> {
    let normalized = normalize_settings(settings)?;
    let path = settings_file_path(dirs)?;
    let payload = serde_json::to_string_pretty(&normalized)
        .map_err(|error| format!("Failed to serialize settings: {error}"))?;
    fs::write(&path, payload).map_err(|error| format!("Failed to save settings: {error}"))?;
    log::info!("Saved downloader settings to {}", path.display());
    Ok(normalized)
}

pub fn resolve_output_dir(
    dirs: &AppDirs,
    settings: &DownloaderSettings,
) -> Result<PathBuf, String> {
    let target = settings
        .output_dir
        .as_ref()
        .map(PathBuf::from)
        .unwrap_or_else(|| dirs.downloads_dir.clone());
    fs::create_dir_all(&target)
        .map_err(|error| format!("Failed to create output folder: {error}"))?;
    if !target.is_dir() {
        return Err("Output path must be a directory.".to_string());
    }
    Ok(target)
}

#[cfg(feature = "gui")]
pub(super) fn open_in_file_manager(path: &Path) -> Result<(), String> {
    let opener = if cfg!(target_os = "windows") {
        "explorer"
    } else if cfg!(target_os = "macos") {
        "open"
    } else {
        "xdg-open"
    };
    Command::new(opener)
        .arg(path)
        .spawn()
        .map_err(|error| format!("Failed to open folder: {error}"))?;
    Ok(())
}

pub(super) fn trusted_host_match(host: &str, allowed_host: &str) -> bool {
    host.eq_ignore_ascii_case(allowed_host)
        || host
            .to_ascii_lowercase()
            .ends_with(&format!(".{}", allowed_host.to_ascii_lowercase()))
}

/// Parses an HTTPS URL without credentials or a custom port and returns it
/// with its lowercased host.
fn plain_https_url(raw: &str, subject: &str) -> Result<(Url, String), String> {
    let parsed = Url::parse(raw.trim())
        .map_err(|error| format!("{subject} is not a valid URL: {error}"))?;
    let well_formed = parsed.scheme() == "https"
        && parsed.username().is_empty()
        && parsed.password().is_none()
        && parsed.port().is_none();
    if !well_formed {
        return Err(format!(
            "{subject} must be a plain https:// address without credentials or port."
        ));
    }
    let host = parsed
        .host_str()
        .map(str::to_ascii_lowercase)
        .ok_or_else(|| format!("{subject} has no host."))?;
    Ok((parsed, host))
}

pub(super) fn ensure_trusted_https_url(url: &str) -> Result<Url, String> {
    let (parsed, host) = plain_https_url(url, "Tool download source")?;
    if !TRUSTED_DOWNLOAD_HOSTS
        .iter()
        .any(|allowed| trusted_host_match(&host, allowed))
    {
        return Err(format!("Refusing to download tools from {host}."));
    }
    Ok(parsed)
}

pub(super) fn download_text(url: &str) -> Result<String, String> {
    let parsed = ensure_trusted_https_url(url)?;
    let response = ureq::get(parsed.as_str())
        .call()
        .map_err(|error| format!("Failed to fetch checksum: {error}"))?;
    let mut reader = response.into_reader();
    let mut body = Vec::new();
    reader
        .read_to_end(&mut body)
        .map_err(|error| format!("Failed to read checksum: {error}"))?;
    String::from_utf8(body).map_err(|_| "Checksum response was not valid UTF-8.".to_string())
}

fn is_sha256_hex(value: &str) -> bool {
    value.len() == 64 && value.chars().all(|ch| ch.is_ascii_hexdigit())
}

/// Finds the digest for `asset_name` in a `sha256sum`-style manifest.
pub(super) fn parse_sha256_for_asset(manifest: &str, asset_name: &str) -> Option<String> {
    manifest
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .find_map(|line| {
            let normalized = line.replace('*', " ");
            let mut parts = normalized.split_whitespace();
            let hash = parts.next()?;
            let filename = parts.next_back()?;
            let candidate_name = filename.trim_start_matches("./");
            (candidate_name.eq_ignore_ascii_case(asset_name) && is_sha256_hex(hash))
                .then(|| hash.to_ascii_lowercase())
        })
}

pub(super) fn sha256_of_file(path: &Path) -> Result<String, String> {
    let mut file = fs::File::open(path)
        .map_err(|error| format!("Cannot open {} for hashing: {error}", path.display()))?;
    let mut hasher = Sha256::new();
    std::io::copy(&mut file, &mut hasher)
        .map_err(|error| format!("Cannot hash {}: {error}", path.display()))?;
    Ok(format!("{:x}", hasher.finalize()))
}

pub(super) fn verify_download_checksum(path: &Path, expected_sha256: &str) -> Result<(), String> {
    let expected = expected_sha256.trim().to_ascii_lowercase();
    if !is_sha256_hex(&expected) {
        return Err("Invalid expected SHA256 format.".to_string());
    }
    let actual = sha256_of_file(path)?;
    if actual != expected {
        return Err(format!("Checksum mismatch. Expected {expected}, got {actual}."));
    }
    Ok(())
}

pub(super) fn download_to_path_with_progress(
    sink: &dyn ProgressSink,
    task: &str,
    source_url: &str,
    destination_path: &Path,
    start_progress: f32,
    end_progress: f32,
) -> Result<(), String> {
    let parsed_url = ensure_trusted_https_url(source_url)?;
    let source_host = parsed_url
        .host_str()
        .map(|host| host.to_string())
        .unwrap_or_else(|| "unknown source".to_string());
    emit_install_progress_with_detail(
        sink,
        task,
        "progress",
        "Connecting to source...",
        Some(source_host.clone()),
        Some(start_progress),
    );

    let response = ureq::get(parsed_url.as_str())
        .call()
        .map_err(|error| format!("Failed to download file: {error}"))?;

    let total_size = response
        .header("content-length")
        .and_then(|value| value.parse::<u64>().ok());

    let mut reader = response.into_reader();
    let mut file = fs::File::create(destination_path)
        .map_err(|error| format!("Failed to create temp file: {error}"))?;

    let mut downloaded = 0_u64;
    let mut last_emitted_percent = -1_i32;
    let mut last_emit_instant = Instant::now();
    let mut buffer = [0_u8; 64 * 1024];
    loop {
        let read = reader
            .read(&mut buffer)
            .map_err(|error| format!("Failed to read downloaded stream: {error}"))?;
        if read == 0 {
            break;
        }
        file.write_all(&buffer[..read])
            .map_err(|error| format!("Failed to write downloaded file: {error}"))?;
        downloaded += read as u64;

        let Some(total) = total_size.filter(|total| *total > 0) else {
            continue;
        };
        let ratio = (downloaded as f64 / total as f64).clamp(0.0, 1.0);
        let percent = (ratio * 100.0).round() as i32;
        let should_emit = percent != last_emitted_percent
            && (last_emit_instant.elapsed().as_millis() > 140 || percent >= 100);
        if should_emit {
            last_emitted_percent = percent;
            last_emit_instant = Instant::now();
            emit_install_progress_with_detail(
                sink,
                task,
                "progress",
                &format!("Downloading yt-dlp: {percent}%"),
                Some(format!(
                    "{:.1}/{:.1} MB • {source_host}",
                    downloaded as f64 / (1024.0 * 1024.0),
                    total as f64 / (1024.0 * 1024.0)
                )),
                Some(start_progress + (end_progress - start_progress) * ratio as f32),
            );
        }
    }

    if downloaded < 1024 * 256 {
        return Err("Downloaded file is too small and may be corrupted.".to_string());
    }
    Ok(())
}

/// First non-empty stdout line of `<binary> <arg>`, when it exits cleanly.
pub(super) fn run_version(binary: &Path, arg: &str) -> Option<String> {
    let output = hidden_command(binary)
        .arg(arg)
        .stdin(Stdio::null())
        .output()
        .ok()
        .filter(|output| output.status.success())?;
    String::from_utf8_lossy(&output.stdout)
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .map(str::to_string)
}

pub(super) fn platform_bin(name: &str) -> String {
    if cfg!(target_os = "windows") {
        format!("{name}.exe")
    } else {
        name.to_string()
    }
}

pub(super) fn resource_binary_candidates(dirs: &AppDirs, name: &str) -> Vec<PathBuf> {
    let executable = platform_bin(name);
    let mut candidates: Vec<PathBuf> = Vec::new();

    if let Some(resource_dir) = dirs.resource_dir.as_ref() {
        candidates.push(resource_dir.join(&executable));
        candidates.push(resource_dir.join("bin").join(&executable));
    }

    if let Some(parent) = std::env::current_exe()
        .ok()
        .and_then(|exe_path| exe_path.parent().map(Path::to_path_buf))
    {
        candidates.push(parent.join(&executable));
        candidates.push(parent.join("bin").join(&executable));
    }

    candidates
}

pub(super) fn ensure_custom_binary(path: &str) -> Option<PathBuf> {
    let canonical = fs::canonicalize(PathBuf::from(path)).ok()?;
    canonical.is_file().then_some(canonical)
}

pub(super) fn resolve_ffmpeg_binary(
    dirs: &AppDirs,
    settings: &DownloaderSettings,
) -> Option<(PathBuf, String)> {
    if let Some(custom) = settings
        .ffmpeg_custom_path
        .as_deref()
        .and_then(ensure_custom_binary)
    {
        return Some((custom, "custom".to_string()));
    }

    let bundled = resource_binary_candidates(dirs, "ffmpeg")
        .into_iter()
        .find(|candidate| candidate.is_file());
    if settings.prefer_bundled_ffmpeg {
        if let Some(path) = bundled.clone() {
            return Some((path, "bundled".to_string()));
        }
    }

    if let Ok(system) = which("ffmpeg") {
        return Some((system, "system".to_string()));
    }

    bundled.map(|path| (path, "bundled".to_string()))
}

pub(super) fn resolve_ytdlp_binary(
    dirs: &AppDirs,
    settings: &DownloaderSettings,
) -> Option<(PathBuf, String)> {
    match settings.ytdlp_mode.as_str() {
        "custom" => {
            return settings
                .ytdlp_custom_path
                .as_deref()
                .and_then(ensure_custom_binary)
                .map(|path| (path, "custom".to_string()));
        }
        "managed" => {
            if let Some(path) = managed_ytdlp_path(dirs).ok().filter(|path| path.is_file()) {
                return Some((path, "managed".to_string()));
            }
        }
        _ => {}
    }

    if let Ok(system) = which("yt-dlp") {
        return Some((system, "system".to_string()));
    }

    resource_binary_candidates(dirs, "yt-dlp")
        .into_iter()
        .find(|candidate| candidate.is_file())
        .map(|path| (path, "bundled".to_string()))
}

pub(super) fn inspect_tool(
    path_with_source: Option<(PathBuf, String)>,
    name: &str,
    version_arg: &str,
) -> ToolStatus {
    match path_with_source {
        Some((path, source)) => {
            let version = run_version(&path, version_arg);
            ToolStatus {
                name: name.to_string(),
                available: version.is_some(),
                source,
                path: Some(path.to_string_lossy().to_string()),
                message: if version.is_some() {
                    None
                } else {
                    Some("Tool did not report a version.".to_string())
                },
                version,
            }
        }
        None => ToolStatus {
            name: name.to_string(),
            available: false,
            source: "missing".to_string(),
            path: None,
            version: None,
            message: Some("Tool not found.".to_string()),
        },
    }
}

pub fn build_runtime_status(dirs: &AppDirs, settings: DownloaderSettings) -> RuntimeToolsStatus {
    let ytdlp_system_available = which("yt-dlp").is_ok();
    let output_dir = resolve_output_dir(dirs, &settings)
        .map(|path| path.to_string_lossy().to_string())
        .unwrap_or_else(|_| dirs.downloads_dir.to_string_lossy().to_string());
    let ffmpeg = inspect_tool(resolve_ffmpeg_binary(dirs, &settings), "ffmpeg", "-version");
    let ytdlp = inspect_tool(resolve_ytdlp_binary(dirs, &settings), "yt-dlp", "--version");

    RuntimeToolsStatus {
        settings,
        ffmpeg,
        ytdlp,
        ytdlp_system_available,
        output_dir,
    }
}

pub(super) fn validate_video_url(raw: &str) -> Result<Url, String> {
    let (parsed, host) = plain_https_url(raw, "Video link")?;
    let is_youtube = ["youtube.com", "youtu.be"]
        .iter()
        .any(|allowed| trusted_host_match(&host, allowed));
    if !is_youtube {
        return Err("Only YouTube links are supported (youtube.com / youtu.be).".to_string());
    }
    Ok(parsed)
}

/// Format ids go straight into yt-dlp's `-f`, so only selector-safe characters pass.
pub(super) fn validate_format_id(value: &str) -> Result<String, String> {
    let format_id = value.trim();
    if !(1..=MAX_FORMAT_ID_LEN).contains(&format_id.len()) {
        return Err(format!("Format id must be 1 to {MAX_FORMAT_ID_LEN} characters long."));
    }
    let selector_safe = |ch: &char| ch.is_ascii_alphanumeric() || "+-_./".contains(*ch);
    if let Some(bad) = format_id.chars().find(|ch| !selector_safe(ch)) {
        return Err(format!("Format id `{format_id}` contains unsupported character `{bad}`."));
    }
    Ok(format_id.to_string())
}

/// Replaces characters that are not allowed in file names with spaces.
pub(super) fn clean_file_name(value: &str) -> String {
    value
        .chars()
        .map(|ch| if FILE_NAME_FORBIDDEN.contains(&ch) { ' ' } else { ch })
        .collect::<String>()
        .trim()
        .to_string()
}

pub(super) fn output_file_name(title: &str, author: &str, custom: bool) -> String {
    let title = Some(clean_file_name(title))
        .filter(|value| !value.is_empty())
        .unwrap_or_else(|| "video".to_string());
    let author = Some(clean_file_name(author))
        .filter(|value| !value.is_empty())
        .unwrap_or_else(|| "unknown".to_string());
    if custom {
        format!("{title} - {author} (custom).mp4")
    } else {
        format!("{title} - {author}.mp4")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_dirs(root: &Path) -> AppDirs {
        AppDirs::new(
            root.join("config"),
            root.join("data"),
            root.join("downloads"),
        )
    }

    #[test]
    fn settings_default_when_file_is_missing() {
        let temp = tempfile::tempdir().unwrap();
        let dirs = temp_dirs(temp.path());
        assert_eq!(load_settings(&dirs).unwrap(), DownloaderSettings::default());
    }

    #[test]
    fn settings_round_trip_normalized() {
        let temp = tempfile::tempdir().unwrap();
        let dirs = temp_dirs(temp.path());
        let saved = save_settings(
            &dirs,
            DownloaderSettings {
                ytdlp_mode: " SYSTEM ".to_string(),
                ytdlp_custom_path: Some("   ".to_string()),
                ffmpeg_custom_path: Some(" /opt/ffmpeg ".to_string()),
                output_dir: None,
                prefer_bundled_ffmpeg: false,
            },
        )
        .unwrap();
        assert_eq!(saved.ytdlp_mode, "system");
        assert_eq!(saved.ytdlp_custom_path, None);
        assert_eq!(saved.ffmpeg_custom_path.as_deref(), Some("/opt/ffmpeg"));
        assert_eq!(load_settings(&dirs).unwrap(), saved);
        assert!(dirs.config_dir.join(SETTINGS_FILE_NAME).is_file());
    }

    #[test]
    fn unknown_mode_falls_back_to_managed() {
        let settings = normalize_settings(DownloaderSettings {
            ytdlp_mode: "portable".to_string(),
            ..DownloaderSettings::default()
        })
        .unwrap();
        assert_eq!(settings.ytdlp_mode, "managed");
    }

    #[test]
    fn settings_reject_control_characters_and_long_paths() {
        assert!(sanitize_optional_path(Some("bad\u{7}path".to_string())).is_err());
        assert!(sanitize_optional_path(Some("x".repeat(513))).is_err());
    }

    #[test]
    fn output_dir_prefers_custom_setting() {
        let temp = tempfile::tempdir().unwrap();
        let dirs = temp_dirs(temp.path());
        let default_dir = resolve_output_dir(&dirs, &DownloaderSettings::default()).unwrap();
        assert_eq!(default_dir, dirs.downloads_dir);
        assert!(default_dir.is_dir());

        let custom = temp.path().join("videos");
        let settings = DownloaderSettings {
            output_dir: Some(custom.to_string_lossy().to_string()),
            ..DownloaderSettings::default()
        };
        assert_eq!(resolve_output_dir(&dirs, &settings).unwrap(), custom);
    }

    #[test]
    fn managed_ytdlp_lives_in_tools_dir() {
        let temp = tempfile::tempdir().unwrap();
        let dirs = temp_dirs(temp.path());
        let path = managed_ytdlp_path(&dirs).unwrap();
        assert_eq!(path.parent(), Some(dirs.data_dir.join("tools").as_path()));
        assert!(path.parent().is_some_and(Path::is_dir));
    }

    #[test]
    fn missing_tool_reports_not_found() {
        let status = inspect_tool(None, "ffmpeg", "-version");
        assert!(!status.available);
        assert_eq!(status.source, "missing");
        assert_eq!(status.message.as_deref(), Some("Tool not found."));
    }

    #[test]
    fn custom_binary_must_exist() {
        let temp = tempfile::tempdir().unwrap();
        assert!(ensure_custom_binary(&temp.path().join("nope").to_string_lossy()).is_none());
        assert!(ensure_custom_binary(&temp.path().to_string_lossy()).is_none());
        let binary = temp.path().join("yt-dlp");
        fs::write(&binary, b"#!/bin/sh\n").unwrap();
        assert!(ensure_custom_binary(&binary.to_string_lossy()).is_some());
    }

    #[test]
    fn checksum_manifest_lookup() {
        let digest = "a".repeat(64);
        let manifest = format!(
            "# release\n{other}  yt-dlp.exe\n{digest} *yt-dlp\n",
            other = "b".repeat(64)
        );
        assert_eq!(parse_sha256_for_asset(&manifest, "yt-dlp"), Some(digest));
        assert_eq!(parse_sha256_for_asset(&manifest, "yt-dlp_macos"), None);
        assert_eq!(parse_sha256_for_asset("short  yt-dlp", "yt-dlp"), None);
    }

    #[test]
    fn checksum_verification_compares_file_digest() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("payload.bin");
        fs::write(&path, b"abc").unwrap();
        let expected = "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad";
        assert_eq!(sha256_of_file(&path).unwrap(), expected);
        assert!(verify_download_checksum(&path, &expected.to_uppercase()).is_ok());
        assert!(verify_download_checksum(&path, &"0".repeat(64))
            .unwrap_err()
            .starts_with("Checksum mismatch"));
        assert!(verify_download_checksum(&path, "xyz").is_err());
    }

    #[test]
    fn trusted_sources_are_https_github_only() {
        assert!(ensure_trusted_https_url(YTDLP_SHA256SUMS_URL).is_ok());
        assert!(ensure_trusted_https_url("https://objects.githubusercontent.com/x").is_ok());
        assert!(ensure_trusted_https_url("http://github.com/x").is_err());
        assert!(ensure_trusted_https_url("https://github.com:8443/x").is_err());
        assert_eq!(
            ensure_trusted_https_url("https://evilgithub.com/x").unwrap_err(),
            "Refusing to download tools from evilgithub.com."
        );
    }

    #[test]
    fn video_url_validation() {
        assert!(validate_video_url(" https://www.youtube.com/watch?v=dQw4w9WgXcQ ").is_ok());
        assert!(validate_video_url("https://youtu.be/dQw4w9WgXcQ").is_ok());
        assert!(validate_video_url("http://www.youtube.com/watch?v=x").is_err());
        assert!(validate_video_url("https://user:pw@youtube.com/watch?v=x").is_err());
        assert!(validate_video_url("https://vimeo.com/1").is_err());
        assert!(validate_video_url("https://youtube.com:444/watch?v=x").is_err());
        assert!(validate_video_url("https://notyoutube.com/watch?v=x").is_err());
        assert!(validate_video_url("not a url")
            .unwrap_err()
            .starts_with("Video link is not a valid URL"));
    }

    #[test]
    fn format_id_validation() {
        assert_eq!(validate_format_id(" 137 ").unwrap(), "137");
        assert!(validate_format_id("hls-1080p").is_ok());
        assert!(validate_format_id("").is_err());
        assert_eq!(
            validate_format_id("137; rm -rf").unwrap_err(),
            "Format id `137; rm -rf` contains unsupported character `;`."
        );
        assert!(validate_format_id(&"1".repeat(65)).is_err());
    }

    #[test]
    fn file_names_drop_reserved_characters() {
        assert_eq!(clean_file_name(" AC/DC: Live? "), "AC DC  Live");
        assert_eq!(
            output_file_name("Song <Official>", "Band|Name", false),
            "Song  Official  - Band Name.mp4"
        );
        assert_eq!(output_file_name("Clip", "", true), "Clip - unknown (custom).mp4");
        assert_eq!(output_file_name("***", "Me", false), "video - Me.mp4");
    }
}
