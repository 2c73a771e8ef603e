pub mod formats;
pub mod tooling;

#[cfg(feature = "gui")]
#[cfg_attr(mobile, tauri::mobile_entry_point)]
pub fn run() {
    use tauri::Manager;

    let result = tauri::Builder::default()
        .setup(|app| {
            if let Some(window) = app.get_webview_window("main") {
                let _ = window.center();
            }

            if cfg!(debug_assertions) {
                app.handle().plugin(
                    tauri_plugin_log::Builder::default()
                        .level(log::LevelFilter::Info)
                        .level_for("tao", log::LevelFilter::Error)
                        .level_for("winit", log::LevelFilter::Error)
                        .build(),
                )?;
            }
            Ok(())
        })
        .invoke_handler(tauri::generate_handler![
            tooling::get_downloader_settings,
            tooling::save_downloader_settings,
            tooling::get_runtime_tools_status,
            tooling::pick_output_dir,
            tooling::open_output_dir,
            tooling::install_or_update_managed_ytdlp,
            tooling::probe_video_formats,
            tooling::download_video,
            tooling::download_custom_video
        ])
        .run(tauri::generate_context!());

    if let Err(error) = result {
        log::error!("Error while running downloader window: {error}");
        std::process::exit(1);
    }
}
