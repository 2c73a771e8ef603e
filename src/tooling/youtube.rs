// yt-dlp probe and two-stream download pipeline.
use super::*;

const DOWNLOAD_TASK: &str = "download";
const TEMP_VIDEO_FILE: &str = "temp_video.mp4";
const TEMP_AUDIO_FILE: &str = "temp_audio.aac";
const TEMP_VIDEO_CUSTOM_FILE: &str = "temp_video_custom.mp4";
const TEMP_AUDIO_CUSTOM_FILE: &str = "temp_audio_custom.aac";
const PARTIAL_SUFFIX: &str = ".part";

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadOutcome {
    pub output_path: String,
    pub file_name: String,
    pub title: String,
    pub author: String,
}

/// File layout of one download: the two temporary streams and the final mp4.
#[derive(Debug, Clone, PartialEq)]
pub(super) struct StreamPlan {
    pub(super) audio_path: PathBuf,
    pub(super) video_path: PathBuf,
    pub(super) output_path: PathBuf,
}

impl StreamPlan {
    pub(super) fn new(output_dir: &Path, title: &str, author: &str, custom: bool) -> Self {
        let (video_name, audio_name) = if custom {
            (TEMP_VIDEO_CUSTOM_FILE, TEMP_AUDIO_CUSTOM_FILE)
        } else {
            (TEMP_VIDEO_FILE, TEMP_AUDIO_FILE)
        };
        Self {
            audio_path: output_dir.join(audio_name),
            video_path: output_dir.join(video_name),
            output_path: output_dir.join(output_file_name(title, author, custom)),
        }
    }

    pub(super) fn temp_files(&self) -> Vec<PathBuf> {
        with_partials([self.video_path.clone(), self.audio_path.clone()])
    }
}

/// `path` plus the `.part` file yt-dlp keeps next to it after an interrupted
/// transfer.
fn with_partials(paths: impl IntoIterator<Item = PathBuf>) -> Vec<PathBuf> {
    paths
        .into_iter()
        .flat_map(|path| {
            let mut partial = path.clone().into_os_string();
            partial.push(PARTIAL_SUFFIX);
            [path, PathBuf::from(partial)]
        })
        .collect()
}

/// yt-dlp treats `-o` as a template; literal `%` must be doubled.
pub(super) fn output_template(destination: &Path) -> String {
    destination.to_string_lossy().replace('%', "%%")
}

/// Every temporary name a download may leave behind in `output_dir`.
pub(super) fn all_temp_files(output_dir: &Path) -> Vec<PathBuf> {
    with_partials(
        [
            TEMP_VIDEO_FILE,
            TEMP_AUDIO_FILE,
            TEMP_VIDEO_CUSTOM_FILE,
            TEMP_AUDIO_CUSTOM_FILE,
        ]
        .iter()
        .map(|name| output_dir.join(name)),
    )
}

fn ytdlp_failure_message(stderr: &[u8]) -> String {
    let stderr = String::from_utf8_lossy(stderr);
    stderr
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .last()
        .unwrap_or("yt-dlp failed.")
        .to_string()
}

fn require_ytdlp(dirs: &AppDirs, settings: &DownloaderSettings) -> Result<PathBuf, String> {
    resolve_ytdlp_binary(dirs, settings)
        .map(|(path, _)| path)
        .ok_or_else(|| "yt-dlp was not found. Install it in Settings.".to_string())
}

fn require_ffmpeg(dirs: &AppDirs, settings: &DownloaderSettings) -> Result<PathBuf, String> {
    resolve_ffmpeg_binary(dirs, settings)
        .map(|(path, _)| path)
        .ok_or_else(|| "ffmpeg was not found. Set its path in Settings.".to_string())
}

pub(super) fn fetch_video_info(ytdlp_path: &Path, video_url: &str) -> Result<Value, String> {
    let output = hidden_command(ytdlp_path)
        .env("PYTHONIOENCODING", "UTF-8")
        .env("PYTHONUTF8", "1")
        .arg("-J")
        .arg("--skip-download")
        .arg("--no-playlist")
        .arg("--no-warnings")
        .arg("--no-check-certificate")
        .arg("--prefer-free-formats")
        .arg(video_url)
        .stdin(Stdio::null())
        .output()
        .map_err(|error| format!("Failed to execute yt-dlp: {error}"))?;

    if !output.status.success() {
        return Err(ytdlp_failure_message(&output.stderr));
    }

    serde_json::from_slice(&output.stdout)
        .map_err(|error| format!("Failed to parse yt-dlp response: {error}"))
}

pub(super) fn download_stream(
    ytdlp_path: &Path,
    ffmpeg_path: &Path,
    video_url: &str,
    selector: &str,
    destination: &Path,
) -> Result<(), String> {
    let mut command = hidden_command(ytdlp_path);
    command
        .env("PYTHONIOENCODING", "UTF-8")
        .env("PYTHONUTF8", "1")
        .arg("--no-playlist")
        .arg("--no-warnings")
        .arg("--no-check-certificate")
        .arg("--prefer-free-formats")
        .arg("--force-overwrites")
        .arg("--no-part")
        .arg("-f")
        .arg(selector)
        .arg("-o")
        .arg(output_template(destination))
        .arg(video_url)
        .stdin(Stdio::null());
    if let Some(location) = ffmpeg_path.parent() {
        command.arg("--ffmpeg-location").arg(location);
    }

    let output = command
        .output()
        .map_err(|error| format!("Failed to start yt-dlp download: {error}"))?;
    if !output.status.success() {
        return Err(ytdlp_failure_message(&output.stderr));
    }
    if !destination.is_file() {
        return Err(format!(
            "yt-dlp did not produce {}.",
            destination
                .file_name()
                .map(|name| name.to_string_lossy().to_string())
                .unwrap_or_default()
        ));
    }
    log::debug!("Downloaded `{selector}` to {}", destination.display());
    Ok(())
}

pub fn probe_formats_sync(dirs: &AppDirs, raw_url: &str) -> Result<FormatList, String> {
    let settings = load_settings(dirs)?;
    let ytdlp_path = require_ytdlp(dirs, &settings)?;
    let video_url = validate_video_url(raw_url)?;
    log::info!("Probing formats for {video_url}");

    let payload = fetch_video_info(&ytdlp_path, video_url.as_str())?;
    build_format_list(&payload)
}

/// Ids picked in the UI are passed to yt-dlp as-is, so they are checked first.
fn checked_selection(selection: DownloadSelection) -> Result<DownloadSelection, String> {
    match selection {
        DownloadSelection::Best => Ok(DownloadSelection::Best),
        DownloadSelection::Custom {
            video_format_id,
            audio_format_id,
        } => Ok(DownloadSelection::Custom {
            video_format_id: validate_format_id(&video_format_id)?,
            audio_format_id: validate_format_id(&audio_format_id)?,
        }),
    }
}

/// Audio, then video, then mux. Temporary files are removed whatever the
/// outcome; the final milestone is only reported on success.
pub(super) fn run_download_pipeline<F, M>(
    sink: &dyn ProgressSink,
    task: &str,
    plan: &StreamPlan,
    selection: &DownloadSelection,
    mut fetch: F,
    mux: M,
) -> Result<(), String>
where
    F: FnMut(&str, &Path) -> Result<(), String>,
    M: FnOnce(&Path, &Path, &Path) -> Result<(), String>,
{
    let (video_selector, audio_selector) = selection.selectors();
    emit_download_stage(sink, task, DownloadStage::Started);

    let result = (|| {
        fetch(audio_selector, &plan.audio_path)?;
        emit_download_stage(sink, task, DownloadStage::FirstStreamDone);
        fetch(video_selector, &plan.video_path)?;
        emit_download_stage(sink, task, DownloadStage::StreamsDone);
        mux(&plan.video_path, &plan.audio_path, &plan.output_path)?;
        emit_download_stage(sink, task, DownloadStage::MuxDone);
        Ok(())
    })();

    remove_temp_files(&plan.temp_files());
    emit_download_stage(sink, task, DownloadStage::CleanupDone);

    if result.is_ok() {
        emit_download_stage(sink, task, DownloadStage::Finished);
    }
    result
}

pub fn download_video_sync(
    dirs: &AppDirs,
    sink: &dyn ProgressSink,
    raw_url: &str,
    selection: DownloadSelection,
    task_id: Option<String>,
) -> Result<DownloadOutcome, String> {
    let task = sanitize_optional_path(task_id)
        .ok()
        .flatten()
        .unwrap_or_else(|| DOWNLOAD_TASK.to_string());
    let settings = load_settings(dirs)?;
    let ytdlp_path = require_ytdlp(dirs, &settings)?;
    let ffmpeg_path = require_ffmpeg(dirs, &settings)?;
    let video_url = validate_video_url(raw_url)?.to_string();
    let selection = checked_selection(selection)?;
    let output_dir = resolve_output_dir(dirs, &settings)?;

    let info = fetch_video_info(&ytdlp_path, &video_url)?;
    let title = text_field(&info, "title").unwrap_or("video").to_string();
    let author = text_field(&info, "uploader")
        .or_else(|| text_field(&info, "channel"))
        .unwrap_or("unknown")
        .to_string();

    let plan = StreamPlan::new(&output_dir, &title, &author, selection.is_custom());
    remove_temp_files(&all_temp_files(&output_dir));
    log::info!(
        "Downloading {video_url} ({}) into {}",
        if selection.is_custom() { "custom" } else { "best" },
        plan.output_path.display()
    );

    let result = run_download_pipeline(
        sink,
        &task,
        &plan,
        &selection,
        |selector, destination| {
            download_stream(&ytdlp_path, &ffmpeg_path, &video_url, selector, destination)
        },
        |video, audio, output| combine_video_and_audio(&ffmpeg_path, video, audio, output),
    );

    if let Err(error) = result {
        log::error!("Download of {video_url} failed: {error}");
        emit_install_progress_with_detail(
            sink,
            &task,
            "error",
            "Video download failed.",
            Some(error.clone()),
            None,
        );
        return Err(error);
    }

    Ok(DownloadOutcome {
        output_path: plan.output_path.to_string_lossy().to_string(),
        file_name: plan
            .output_path
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_default(),
        title,
        author,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tooling::progress::tests::RecordingSink;

    fn plan_in(dir: &Path, custom: bool) -> StreamPlan {
        StreamPlan::new(dir, "Clip: Live", "Band", custom)
    }

    #[test]
    fn plan_names_follow_selection_mode() {
        let dir = Path::new("/downloads");
        let best = plan_in(dir, false);
        assert_eq!(best.video_path, dir.join("temp_video.mp4"));
        assert_eq!(best.audio_path, dir.join("temp_audio.aac"));
        assert_eq!(best.output_path, dir.join("Clip  Live - Band.mp4"));

        let custom = plan_in(dir, true);
        assert_eq!(custom.video_path, dir.join("temp_video_custom.mp4"));
        assert_eq!(custom.audio_path, dir.join("temp_audio_custom.aac"));
        assert_eq!(custom.output_path, dir.join("Clip  Live - Band (custom).mp4"));
        assert_eq!(all_temp_files(dir).len(), 8);
        assert!(all_temp_files(dir).contains(&dir.join("temp_audio_custom.aac.part")));
        assert_eq!(
            custom.temp_files(),
            vec![
                dir.join("temp_video_custom.mp4"),
                dir.join("temp_video_custom.mp4.part"),
                dir.join("temp_audio_custom.aac"),
                dir.join("temp_audio_custom.aac.part"),
            ]
        );
    }

    #[test]
    fn pipeline_reports_milestones_and_cleans_up() {
        let temp = tempfile::tempdir().unwrap();
        let plan = plan_in(temp.path(), false);
        let sink = RecordingSink::default();
        let mut fetched = Vec::new();

        run_download_pipeline(
            &sink,
            "download",
            &plan,
            &DownloadSelection::Best,
            |selector, destination| {
                fetched.push(selector.to_string());
                fs::write(destination, b"stream").map_err(|error| error.to_string())
            },
            |_, _, output| fs::write(output, b"muxed").map_err(|error| error.to_string()),
        )
        .unwrap();

        assert_eq!(fetched, vec!["bestaudio[ext!=webm]", "bestvideo[ext!=webm]"]);
        assert_eq!(sink.percents(), vec![0, 10, 60, 90, 99, 100]);
        assert!(plan.output_path.is_file());
        assert!(!plan.video_path.exists());
        assert!(!plan.audio_path.exists());
    }

    #[test]
    fn failed_mux_still_cleans_up_without_finishing() {
        let temp = tempfile::tempdir().unwrap();
        let plan = plan_in(temp.path(), true);
        let sink = RecordingSink::default();
        let selection = DownloadSelection::from_picks(Some("137"), Some("140")).unwrap();
        let mut fetched = Vec::new();

        let error = run_download_pipeline(
            &sink,
            "download",
            &plan,
            &selection,
            |selector, destination| {
                fetched.push(selector.to_string());
                fs::write(destination, b"stream").map_err(|error| error.to_string())
            },
            |_, _, _| Err("Conversion failed!".to_string()),
        )
        .unwrap_err();

        assert_eq!(error, "Conversion failed!");
        assert_eq!(fetched, vec!["140", "137"]);
        assert_eq!(sink.percents(), vec![0, 10, 60, 99]);
        assert!(!plan.video_path.exists());
        assert!(!plan.audio_path.exists());
    }

    #[test]
    fn failed_stream_skips_remaining_steps() {
        let temp = tempfile::tempdir().unwrap();
        let plan = plan_in(temp.path(), false);
        let sink = RecordingSink::default();
        let partial = temp.path().join("temp_audio.aac.part");

        let result = run_download_pipeline(
            &sink,
            "download",
            &plan,
            &DownloadSelection::Best,
            |_, destination| {
                let mut leftover = destination.as_os_str().to_owned();
                leftover.push(".part");
                fs::write(PathBuf::from(leftover), b"half").map_err(|error| error.to_string())?;
                Err("HTTP Error 403".to_string())
            },
            |_, _, _| panic!("mux must not run"),
        );

        assert_eq!(result, Err("HTTP Error 403".to_string()));
        assert_eq!(sink.percents(), vec![0, 99]);
        assert!(!partial.exists());
    }

    #[test]
    fn pipeline_runs_headless_with_log_sink() {
        let temp = tempfile::tempdir().unwrap();
        let plan = plan_in(temp.path(), false);

        run_download_pipeline(
            &LogProgressSink,
            "download",
            &plan,
            &DownloadSelection::Best,
            |_, destination| fs::write(destination, b"stream").map_err(|error| error.to_string()),
            |_, _, output| fs::write(output, b"muxed").map_err(|error| error.to_string()),
        )
        .unwrap();

        assert!(plan.output_path.is_file());
        assert!(plan.temp_files().iter().all(|path| !path.exists()));
    }

    #[test]
    fn output_template_escapes_percent_signs() {
        assert_eq!(
            output_template(Path::new("/videos/100%(title)s/temp_video.mp4")),
            "/videos/100%%(title)s/temp_video.mp4"
        );
        assert_eq!(
            output_template(Path::new("/downloads/temp_audio.aac")),
            "/downloads/temp_audio.aac"
        );
    }

    #[test]
    fn custom_ids_are_validated_before_download() {
        let bad = DownloadSelection::Custom {
            video_format_id: "137 && rm".to_string(),
            audio_format_id: "140".to_string(),
        };
        assert!(checked_selection(bad).is_err());
        let good = DownloadSelection::Custom {
            video_format_id: " 137 ".to_string(),
            audio_format_id: "140".to_string(),
        };
        assert_eq!(checked_selection(good).unwrap().selectors(), ("137", "140"));
    }

    #[test]
    fn ytdlp_errors_use_last_stderr_line() {
        assert_eq!(
            ytdlp_failure_message(b"WARNING: x\nERROR: Video unavailable\n\n"),
            "ERROR: Video unavailable"
        );
        assert_eq!(ytdlp_failure_message(b""), "yt-dlp failed.");
    }

    #[test]
    fn probe_requires_a_resolvable_binary_or_valid_url() {
        let temp = tempfile::tempdir().unwrap();
        let dirs = AppDirs::new(
            temp.path().join("config"),
            temp.path().join("data"),
            temp.path().join("downloads"),
        );
        save_settings(
            &dirs,
            DownloaderSettings {
                ytdlp_mode: "custom".to_string(),
                ytdlp_custom_path: Some(temp.path().join("missing").to_string_lossy().to_string()),
                ..DownloaderSettings::default()
            },
        )
        .unwrap();
        let error = probe_formats_sync(&dirs, "https://youtu.be/abc").unwrap_err();
        assert!(error.contains("yt-dlp was not found"));
    }
}
