use tauri::State;

use crate::{
    gallery::GalleryImage,
    notify::OverlayNotification,
    session::{SessionController, SessionSnapshot},
    settings::{SettingChange, Settings},
    AppState,
};

fn controller_from_state(state: &State<'_, AppState>) -> SessionController {
    state.session.clone()
}

#[tauri::command]
pub async fn start_session(state: State<'_, AppState>) -> Result<SessionSnapshot, String> {
    let controller = controller_from_state(&state);
    controller.start().await.map_err(|e| e.to_string())
}

#[tauri::command]
pub async fn stop_session(state: State<'_, AppState>) -> Result<(), String> {
    let controller = controller_from_state(&state);
    controller.stop().await.map_err(|e| e.to_string())
}

#[tauri::command]
pub async fn get_session_state(state: State<'_, AppState>) -> Result<SessionSnapshot, String> {
    let controller = controller_from_state(&state);
    Ok(controller.snapshot().await)
}

#[tauri::command]
pub async fn manual_capture(state: State<'_, AppState>) -> Result<bool, String> {
    let controller = controller_from_state(&state);
    Ok(controller.manual_capture().await)
}

#[tauri::command]
pub async fn run_benchmark(state: State<'_, AppState>) -> Result<bool, String> {
    let controller = controller_from_state(&state);
    Ok(controller.run_benchmark().await)
}

#[tauri::command]
pub async fn update_setting(
    state: State<'_, AppState>,
    change: SettingChange,
) -> Result<Settings, String> {
    let controller = controller_from_state(&state);
    controller
        .update_setting(change)
        .await
        .map_err(|e| e.to_string())
}

#[tauri::command]
pub async fn get_overlay(
    state: State<'_, AppState>,
) -> Result<Option<OverlayNotification>, String> {
    let controller = controller_from_state(&state);
    Ok(controller.overlay().await)
}

#[tauri::command]
pub async fn list_gallery(state: State<'_, AppState>) -> Result<Vec<GalleryImage>, String> {
    Ok(state.session.gallery().images().await)
}

#[tauri::command]
pub async fn refresh_gallery(state: State<'_, AppState>) -> Result<Vec<GalleryImage>, String> {
    let gallery = state.session.gallery().clone();
    gallery.refresh().await.map_err(|e| e.to_string())
}

#[tauri::command]
pub async fn delete_capture(
    state: State<'_, AppState>,
    filename: String,
) -> Result<Vec<GalleryImage>, String> {
    let gallery = state.session.gallery().clone();
    gallery.delete(&filename).await.map_err(|e| e.to_string())
}

#[tauri::command]
pub async fn delete_all_captures(
    state: State<'_, AppState>,
) -> Result<Vec<GalleryImage>, String> {
    let gallery = state.session.gallery().clone();
    gallery.delete_all().await.map_err(|e| e.to_string())
}
