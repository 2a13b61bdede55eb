pub mod config;
pub mod error;
pub mod events;
pub mod gallery;
pub mod notify;
pub mod protocol;
pub mod render;
pub mod session;
pub mod settings;
pub mod utils;

#[cfg(feature = "desktop")]
mod commands;

pub use config::ClientConfig;
pub use error::{FrameDecodeError, SessionError};
pub use events::{ChannelEmitter, NoopEmitter, UiEmitter};
pub use gallery::{Gallery, GalleryBackend, GalleryImage, HttpGallery};
pub use session::{SessionController, SessionSnapshot};
pub use settings::{Resolution, SettingChange, Settings};

#[cfg(feature = "desktop")]
pub(crate) struct AppState {
    pub(crate) session: SessionController,
}

#[cfg(feature = "desktop")]
#[cfg_attr(mobile, tauri::mobile_entry_point)]
pub fn run() {
    use std::sync::Arc;

    use tauri::Manager;

    use commands::{
        delete_all_captures, delete_capture, get_overlay, get_session_state, list_gallery,
        manual_capture, refresh_gallery, run_benchmark, start_session, stop_session,
        update_setting,
    };

    utils::init_logging();

    log::info!("Smilage starting up...");

    tauri::Builder::default()
        .setup(|app| {
            let result = (|| -> anyhow::Result<()> {
                let config = ClientConfig::from_env()?;
                log::info!("Using inference origin {}", config.origin);

                let gallery_backend = HttpGallery::new(config.clone())?;
                let session = SessionController::new(
                    config,
                    Arc::new(gallery_backend),
                    Arc::new(app.handle().clone()),
                );

                // The gallery is shown before any session starts.
                {
                    let gallery = session.gallery().clone();
                    tauri::async_runtime::spawn(async move {
                        let _ = gallery.refresh().await;
                    });
                }

                app.manage(AppState { session });
                Ok(())
            })();

            result.map_err(|err| err.into())
        })
        .on_window_event(|window, event| {
            if let tauri::WindowEvent::Destroyed = event {
                let session = window.state::<AppState>().session.clone();
                tauri::async_runtime::spawn(async move {
                    if let Err(err) = session.shutdown().await {
                        log::warn!("Session shutdown failed: {err}");
                    }
                });
            }
        })
        .invoke_handler(tauri::generate_handler![
            start_session,
            stop_session,
            get_session_state,
            manual_capture,
            run_benchmark,
            update_setting,
            get_overlay,
            list_gallery,
            refresh_gallery,
            delete_capture,
            delete_all_captures,
        ])
        .run(tauri::generate_context!())
        .expect("error while running tauri application");
}
