use tauri::State;

use crate::models::{Concept, EventRecord, GalleryItem, KioskSettings};
use crate::store::{OverlayUpload, OverlayUrl};
use crate::AppState;

use super::{KioskSnapshot, SessionController};

fn controller_from_state(state: &State<'_, AppState>) -> SessionController {
    state.kiosk.clone()
}

#[tauri::command]
pub async fn get_kiosk_state(state: State<'_, AppState>) -> Result<KioskSnapshot, String> {
    Ok(controller_from_state(&state).snapshot().await)
}

#[tauri::command]
pub async fn press_start(state: State<'_, AppState>) -> Result<Vec<Concept>, String> {
    controller_from_state(&state)
        .press_start()
        .await
        .map_err(|e| e.to_string())
}

#[tauri::command]
pub async fn open_gallery(state: State<'_, AppState>) -> Result<Vec<GalleryItem>, String> {
    controller_from_state(&state)
        .open_gallery()
        .await
        .map_err(|e| e.to_string())
}

#[tauri::command]
pub async fn open_admin(state: State<'_, AppState>) -> Result<KioskSnapshot, String> {
    controller_from_state(&state)
        .open_admin()
        .await
        .map_err(|e| e.to_string())
}

#[tauri::command]
pub async fn go_home(state: State<'_, AppState>) -> Result<(), String> {
    controller_from_state(&state).go_home().await;
    Ok(())
}

/// Explicit navigation on RESULT/GALLERY/ADMIN; re-arms the auto-reset timer.
#[tauri::command]
pub async fn touch_screen(state: State<'_, AppState>) -> Result<(), String> {
    controller_from_state(&state).touch().await;
    Ok(())
}

#[tauri::command]
pub async fn select_concept(
    state: State<'_, AppState>,
    concept_id: String,
) -> Result<KioskSnapshot, String> {
    controller_from_state(&state)
        .select_concept(&concept_id)
        .await
        .map_err(|e| e.to_string())
}

#[tauri::command]
pub async fn retry_camera(state: State<'_, AppState>) -> Result<KioskSnapshot, String> {
    controller_from_state(&state)
        .retry_camera()
        .await
        .map_err(|e| e.to_string())
}

#[tauri::command]
pub async fn start_countdown(
    state: State<'_, AppState>,
    seconds: Option<u64>,
) -> Result<(), String> {
    controller_from_state(&state)
        .start_countdown(seconds)
        .await
        .map_err(|e| e.to_string())
}

#[tauri::command]
pub async fn cancel_countdown(state: State<'_, AppState>) -> Result<(), String> {
    controller_from_state(&state).cancel_countdown().await;
    Ok(())
}

#[tauri::command]
pub async fn list_gallery_items(
    state: State<'_, AppState>,
    event_id: Option<String>,
) -> Result<Vec<GalleryItem>, String> {
    controller_from_state(&state)
        .list_gallery(event_id)
        .await
        .map_err(|e| e.to_string())
}

#[tauri::command]
pub async fn get_gallery_item(
    state: State<'_, AppState>,
    token: String,
) -> Result<GalleryItem, String> {
    controller_from_state(&state)
        .fetch_gallery_item(&token)
        .await
        .map_err(|e| e.to_string())
}

#[tauri::command]
pub async fn admin_authenticate(state: State<'_, AppState>, pin: String) -> Result<bool, String> {
    controller_from_state(&state)
        .admin_authenticate(&pin)
        .await
        .map_err(|e| e.to_string())
}

#[tauri::command]
pub async fn admin_save_settings(
    state: State<'_, AppState>,
    settings: KioskSettings,
    pin: String,
) -> Result<(), String> {
    controller_from_state(&state)
        .admin_save_settings(settings, &pin)
        .await
        .map_err(|e| e.to_string())
}

#[tauri::command]
pub async fn admin_save_concepts(
    state: State<'_, AppState>,
    concepts: Vec<Concept>,
    pin: String,
) -> Result<(), String> {
    controller_from_state(&state)
        .admin_save_concepts(concepts, &pin)
        .await
        .map_err(|e| e.to_string())
}

#[tauri::command]
pub async fn admin_upload_overlay(
    state: State<'_, AppState>,
    upload: OverlayUpload,
    pin: String,
) -> Result<OverlayUrl, String> {
    controller_from_state(&state)
        .admin_upload_overlay(upload, &pin)
        .await
        .map_err(|e| e.to_string())
}

#[tauri::command]
pub async fn admin_list_events(state: State<'_, AppState>) -> Result<Vec<EventRecord>, String> {
    controller_from_state(&state)
        .admin_list_events()
        .await
        .map_err(|e| e.to_string())
}

#[tauri::command]
pub async fn admin_activate_event(
    state: State<'_, AppState>,
    event_id: String,
    pin: String,
) -> Result<(), String> {
    controller_from_state(&state)
        .admin_activate_event(&event_id, &pin)
        .await
        .map_err(|e| e.to_string())
}
