// ffmpeg stream combination and temporary file cleanup.
use super::*;
use std::ffi::OsString;

const FFMPEG_ERROR_TAIL_LINES: usize = 4;

pub(super) fn mux_arguments(
    video_path: &Path,
    audio_path: &Path,
    output_path: &Path,
) -> Vec<OsString> {
    let mut args: Vec<OsString> = vec!["-y".into(), "-i".into()];
    args.push(video_path.into());
    args.push("-i".into());
    args.push(audio_path.into());
    args.extend(["-c:v", "copy", "-c:a", "aac"].map(OsString::from));
    args.push(output_path.into());
    args
}

/// Last few non-empty stderr lines, which is where ffmpeg puts the reason.
pub(super) fn ffmpeg_failure_message(stderr: &[u8]) -> String {
    let text = String::from_utf8_lossy(stderr);
    let lines: Vec<&str> = text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect();
    if lines.is_empty() {
        return "ffmpeg failed to combine streams.".to_string();
    }
    let start = lines.len().saturating_sub(FFMPEG_ERROR_TAIL_LINES);
    lines[start..].join("\n")
}

/// Copies the video track and re-encodes audio to AAC into an mp4.
pub(super) fn combine_video_and_audio(
    ffmpeg_path: &Path,
    video_path: &Path,
    audio_path: &Path,
    output_path: &Path,
) -> Result<(), String> {
    let output = hidden_command(ffmpeg_path)
        .args(mux_arguments(video_path, audio_path, output_path))
        .stdin(Stdio::null())
        .output()
        .map_err(|error| format!("Failed to run ffmpeg: {error}"))?;

    if !output.status.success() {
        let message = ffmpeg_failure_message(&output.stderr);
        log::error!("ffmpeg exited with {}: {message}", output.status);
        return Err(message);
    }
    if !output_path.is_file() {
        return Err("ffmpeg finished without writing the output file.".to_string());
    }
    log::info!("Combined streams into {}", output_path.display());
    Ok(())
}

/// Best effort: failures are logged and never abort the caller.
pub(super) fn remove_temp_files(paths: &[PathBuf]) -> usize {
    let mut removed = 0;
    for path in paths {
        if !path.exists() {
            continue;
        }
        match fs::remove_file(path) {
            Ok(()) => {
                removed += 1;
                log::debug!("Removed temporary file {}", path.display());
            }
            Err(error) => {
                log::warn!(
                    "Could not delete temporary file {}: {error}",
                    path.display()
                );
            }
        }
    }
    removed
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mux_arguments_copy_video_and_encode_aac() {
        let args = mux_arguments(
            Path::new("/tmp/v.mp4"),
            Path::new("/tmp/a.aac"),
            Path::new("/tmp/out.mp4"),
        );
        let args: Vec<String> = args
            .iter()
            .map(|arg| arg.to_string_lossy().to_string())
            .collect();
        assert_eq!(
            args,
            vec![
                "-y", "-i", "/tmp/v.mp4", "-i", "/tmp/a.aac", "-c:v", "copy", "-c:a", "aac",
                "/tmp/out.mp4"
            ]
        );
    }

    #[test]
    fn failure_message_keeps_stderr_tail() {
        let stderr = concat!(
            "ffmpeg version 7\n\nbuilt with gcc\n",
            "Input #0\nStream map error\n[aac] bad\nConversion failed!\n"
        )
        .as_bytes();
        assert_eq!(
            ffmpeg_failure_message(stderr),
            "Input #0\nStream map error\n[aac] bad\nConversion failed!"
        );
        assert_eq!(ffmpeg_failure_message(b"  \n"), "ffmpeg failed to combine streams.");
    }

    #[test]
    fn cleanup_skips_missing_files() {
        let temp = tempfile::tempdir().unwrap();
        let present = temp.path().join("temp_video.mp4");
        fs::write(&present, b"data").unwrap();
        let missing = temp.path().join("temp_audio.aac");

        assert_eq!(remove_temp_files(&[present.clone(), missing]), 1);
        assert!(!present.exists());
    }

    #[test]
    fn missing_ffmpeg_binary_is_reported() {
        let temp = tempfile::tempdir().unwrap();
        let error = combine_video_and_audio(
            &temp.path().join("no-ffmpeg"),
            &temp.path().join("v.mp4"),
            &temp.path().join("a.aac"),
            &temp.path().join("out.mp4"),
        )
        .unwrap_err();
        assert!(error.starts_with("Failed to run ffmpeg"));
    }
}
