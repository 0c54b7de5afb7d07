mod capture;
mod error;
mod gallery;
mod generation;
mod models;
mod session;
mod store;
mod utils;

use std::sync::Arc;

use log::warn;
use tauri::{Manager, State};

use capture::NokhwaBackend;
use generation::GenerationClient;
use session::commands::{
    admin_activate_event, admin_authenticate, admin_list_events, admin_save_concepts,
    admin_save_settings, admin_upload_overlay, cancel_countdown, get_gallery_item,
    get_kiosk_state, go_home, list_gallery_items, open_admin, open_gallery, press_start,
    retry_camera, select_concept, start_countdown, touch_screen,
};
use session::{SessionController, TauriEventSink};
use store::{ConfigCache, KioskConfig, KioskStore, PrefsStore, StoreClient};

pub(crate) struct AppState {
    pub(crate) kiosk: SessionController,
    pub(crate) prefs: Arc<PrefsStore>,
}

#[tauri::command]
fn get_store_base_url(state: State<AppState>) -> Result<String, String> {
    Ok(state.prefs.store_base_url())
}

/// Point the kiosk at a different store deployment. Persisted locally,
/// separate from the remote settings; takes effect on the next store call.
#[tauri::command]
fn set_store_base_url(url: String, state: State<AppState>) -> Result<(), String> {
    state
        .prefs
        .set_store_base_url(url)
        .map_err(|e| e.to_string())
}

#[cfg_attr(mobile, tauri::mobile_entry_point)]
pub fn run() {
    // Initialize logging (reads RUST_LOG env var)
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    log::info!("Lumabooth starting up...");

    tauri::Builder::default()
        .plugin(tauri_plugin_opener::init())
        .setup(|app| {
            let result = (|| -> anyhow::Result<()> {
                let app_data_dir = app
                    .path()
                    .app_data_dir()
                    .map_err(|err| anyhow::anyhow!(err))?;
                std::fs::create_dir_all(&app_data_dir)?;

                let prefs = Arc::new(PrefsStore::new(app_data_dir.join("prefs.json"))?);
                let store: Arc<dyn KioskStore> = Arc::new(StoreClient::new(prefs.clone()));

                // Missing credential is fatal for generation only; the kiosk
                // still boots so the misconfiguration is visible on screen.
                let generator = Arc::new(GenerationClient::from_env());
                if !generator.has_credential() {
                    log::error!(
                        "{} is not set; every generation will fail until it is configured",
                        generation::CREDENTIAL_ENV
                    );
                }

                // Initial settings/concepts load; the kiosk re-loads on every
                // return to LANDING, so a store outage here is not fatal.
                let initial = tauri::async_runtime::block_on({
                    let store = store.clone();
                    async move {
                        match store.load().await {
                            Ok(config) => config,
                            Err(err) => {
                                warn!("settings store unreachable at startup: {err}; starting with defaults");
                                KioskConfig::default()
                            }
                        }
                    }
                });

                let kiosk = SessionController::new(
                    ConfigCache::new(initial),
                    store,
                    generator,
                    Arc::new(NokhwaBackend),
                    Arc::new(TauriEventSink::new(app.handle().clone())),
                );

                app.manage(AppState { kiosk, prefs });

                Ok(())
            })();

            result.map_err(|err| err.into())
        })
        .invoke_handler(tauri::generate_handler![
            get_kiosk_state,
            press_start,
            open_gallery,
            open_admin,
            go_home,
            touch_screen,
            select_concept,
            retry_camera,
            start_countdown,
            cancel_countdown,
            list_gallery_items,
            get_gallery_item,
            admin_authenticate,
            admin_save_settings,
            admin_save_concepts,
            admin_upload_overlay,
            admin_list_events,
            admin_activate_event,
            get_store_base_url,
            set_store_base_url,
        ])
        .run(tauri::generate_context!())
        .expect("error while running tauri application");
}
