use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, bail, Result};
use log::{error, info, warn};
use serde::Serialize;
use tokio::{sync::Mutex, task::JoinHandle, time};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::capture::{capture_still, CameraBackend, CaptureEngine};
use crate::error::KioskError;
use crate::gallery::GalleryRegistrar;
use crate::generation::Generator;
use crate::models::{Concept, EventRecord, GalleryItem, KioskSettings, Orientation};
use crate::store::{ConfigCache, KioskStore, OverlayUpload, OverlayUrl};

use super::events::{self, EventSink};
use super::state::{AdminAuth, Screen, SessionState};

const DEFAULT_COUNTDOWN_SECS: u64 = 3;
const MAX_COUNTDOWN_SECS: u64 = 10;

/// Serializable view of the kiosk for a (re)loading frontend.
#[derive(Debug, Serialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct KioskSnapshot {
    pub screen: Screen,
    pub selected_concept: Option<Concept>,
    pub has_captured_frame: bool,
    pub generating: bool,
    pub admin_authenticated: bool,
    pub error: Option<KioskError>,
    pub result: Option<GalleryItem>,
    pub event_name: String,
    pub orientation: Orientation,
    pub auto_reset_time: u64,
}

#[derive(Serialize, Clone)]
#[serde(rename_all = "camelCase")]
struct ScreenChangedEvent {
    screen: Screen,
    error: Option<KioskError>,
}

#[derive(Serialize, Clone)]
#[serde(rename_all = "camelCase")]
struct CountdownTickEvent {
    remaining_secs: u64,
}

#[derive(Serialize, Clone)]
#[serde(rename_all = "camelCase")]
struct SessionResultEvent {
    item: GalleryItem,
}

/// Orchestrates the guest flow: sequences capture, generation and
/// registration, owns the idle/auto-reset timer and is the only writer of
/// the session state.
///
/// Every suspension point (camera open, countdown, generation call, store
/// call) captures the guest session id first and re-checks it under the lock
/// before committing, so a result for a session that was discarded by a
/// cancel or timeout is never applied to the current one.
#[derive(Clone)]
pub struct SessionController {
    state: Arc<Mutex<SessionState>>,
    config: ConfigCache,
    store: Arc<dyn KioskStore>,
    generator: Arc<dyn Generator>,
    registrar: GalleryRegistrar,
    capture: Arc<Mutex<CaptureEngine>>,
    events: Arc<dyn EventSink>,
    idle_timer: Arc<Mutex<Option<JoinHandle<()>>>>,
    idle_epoch: Arc<AtomicU64>,
}

impl SessionController {
    pub fn new(
        config: ConfigCache,
        store: Arc<dyn KioskStore>,
        generator: Arc<dyn Generator>,
        backend: Arc<dyn CameraBackend>,
        events: Arc<dyn EventSink>,
    ) -> Self {
        Self {
            state: Arc::new(Mutex::new(SessionState::new())),
            config,
            registrar: GalleryRegistrar::new(store.clone()),
            store,
            generator,
            capture: Arc::new(Mutex::new(CaptureEngine::new(backend))),
            events,
            idle_timer: Arc::new(Mutex::new(None)),
            idle_epoch: Arc::new(AtomicU64::new(0)),
        }
    }

    pub async fn snapshot(&self) -> KioskSnapshot {
        let settings = self.config.settings();
        let state = self.state.lock().await;
        let session = state.session.as_ref();
        KioskSnapshot {
            screen: state.screen,
            selected_concept: session.map(|s| s.concept.clone()),
            has_captured_frame: session
                .map(|s| s.captured_frame.is_some())
                .unwrap_or(false),
            generating: state.screen == Screen::Generating,
            admin_authenticated: state.admin_auth == AdminAuth::Authenticated,
            error: session
                .and_then(|s| s.error.clone())
                .or_else(|| state.banner_error.clone()),
            result: session.and_then(|s| s.result.clone()),
            event_name: settings.event_name,
            orientation: settings.orientation,
            auto_reset_time: settings.auto_reset_time,
        }
    }

    /// LANDING -> THEMES. Re-loads settings and concepts first so admin
    /// edits apply to this guest.
    pub async fn press_start(&self) -> Result<Vec<Concept>> {
        {
            let state = self.state.lock().await;
            if state.screen != Screen::Landing {
                bail!("start is only available on the landing screen");
            }
        }

        if let Err(err) = self.reload_config().await {
            warn!("settings reload failed, keeping cached config: {err}");
        }

        let mut state = self.state.lock().await;
        if state.screen != Screen::Landing {
            bail!("landing screen was left during the settings reload");
        }
        state.enter_themes()?;
        drop(state);

        self.emit_screen(Screen::Themes, None);
        Ok(self.config.concepts())
    }

    /// LANDING -> GALLERY with the active event's items.
    pub async fn open_gallery(&self) -> Result<Vec<GalleryItem>> {
        {
            let state = self.state.lock().await;
            if state.screen != Screen::Landing {
                bail!("gallery is only available from the landing screen");
            }
        }

        let event_id = self.config.settings().active_event_id;
        let items = match self.store.list_gallery(event_id.as_deref()).await {
            Ok(items) => items,
            Err(err) => {
                self.state.lock().await.banner_error = Some(err.clone());
                return Err(err.into());
            }
        };

        let mut state = self.state.lock().await;
        if state.screen != Screen::Landing {
            bail!("landing screen was left during the gallery fetch");
        }
        state.enter_gallery()?;
        drop(state);

        self.arm_idle_timer().await;
        self.emit_screen(Screen::Gallery, None);
        Ok(items)
    }

    /// LANDING -> ADMIN. The PIN gate lives inside the screen.
    pub async fn open_admin(&self) -> Result<KioskSnapshot> {
        {
            let mut state = self.state.lock().await;
            state.enter_admin()?;
        }
        self.arm_idle_timer().await;
        self.emit_screen(Screen::Admin, None);
        Ok(self.snapshot().await)
    }

    /// Explicit back/home from any screen.
    pub async fn go_home(&self) {
        info!("explicit home navigation");
        self.reset_to_landing().await;
    }

    /// Any explicit navigation on an idle-reclaimable screen re-arms the
    /// auto-reset timer.
    pub async fn touch(&self) {
        let armed = { self.state.lock().await.screen.idle_reclaimable() };
        if armed {
            self.arm_idle_timer().await;
        }
    }

    /// THEMES -> CAMERA. Creates the guest session and acquires the camera.
    pub async fn select_concept(&self, concept_id: &str) -> Result<KioskSnapshot> {
        let concept = self
            .config
            .concepts()
            .into_iter()
            .find(|concept| concept.id == concept_id)
            .ok_or_else(|| anyhow!("unknown concept '{concept_id}'"))?;
        let orientation = self.config.settings().orientation;

        {
            let mut state = self.state.lock().await;
            state.select_concept(concept)?;
        }
        self.cancel_idle_timer().await;
        self.emit_screen(Screen::Camera, None);

        self.open_camera(orientation).await;
        Ok(self.snapshot().await)
    }

    /// Re-acquire the camera after a hardware error.
    pub async fn retry_camera(&self) -> Result<KioskSnapshot> {
        let orientation = self.config.settings().orientation;
        {
            let mut state = self.state.lock().await;
            if state.screen != Screen::Camera {
                bail!("camera retry outside the camera screen");
            }
            state.clear_camera_error();
        }
        self.open_camera(orientation).await;
        Ok(self.snapshot().await)
    }

    async fn open_camera(&self, orientation: Orientation) {
        let capture = self.capture.clone();
        let result = tokio::task::spawn_blocking(move || {
            let mut engine = capture.blocking_lock();
            engine.open(orientation)
        })
        .await
        .unwrap_or_else(|err| {
            Err(KioskError::HardwareUnavailable(format!(
                "camera open worker failed: {err}"
            )))
        });

        match result {
            Ok(()) => {
                // the guest may have bailed while the device was opening
                let state = self.state.lock().await;
                if state.screen != Screen::Camera {
                    drop(state);
                    self.capture.lock().await.close();
                }
            }
            Err(err) => {
                error!("camera acquisition failed: {err}");
                let mut state = self.state.lock().await;
                if state.screen == Screen::Camera {
                    state.set_camera_error(err.clone());
                    drop(state);
                    self.emit_screen(Screen::Camera, Some(err));
                }
            }
        }
    }

    /// Kick off the cancellable countdown on the CAMERA screen. Refused
    /// while a generation is outstanding (the screen is GENERATING then).
    pub async fn start_countdown(&self, seconds: Option<u64>) -> Result<()> {
        let seconds = seconds
            .unwrap_or(DEFAULT_COUNTDOWN_SECS)
            .clamp(1, MAX_COUNTDOWN_SECS);

        let session_id = {
            let mut state = self.state.lock().await;
            if state.screen != Screen::Camera {
                bail!("capture is only available on the camera screen");
            }
            state.clear_camera_error();
            state
                .session_id()
                .ok_or_else(|| anyhow!("no active session"))?
        };

        let token = { self.capture.lock().await.begin_countdown()? };
        info!("countdown started: {seconds}s");

        let controller = self.clone();
        tokio::spawn(async move {
            controller.run_countdown(session_id, token, seconds).await;
        });
        Ok(())
    }

    /// Cancel the countdown at the current tick; the feed stays live and no
    /// frame is produced.
    pub async fn cancel_countdown(&self) {
        self.capture.lock().await.cancel_countdown();
    }

    async fn run_countdown(self, session_id: Uuid, token: CancellationToken, seconds: u64) {
        let mut remaining = seconds;
        let mut interval = time::interval(Duration::from_secs(1));
        interval.tick().await; // first tick completes immediately

        loop {
            self.emit_json(
                events::COUNTDOWN_TICK,
                CountdownTickEvent {
                    remaining_secs: remaining,
                },
            );
            if remaining == 0 {
                break;
            }
            tokio::select! {
                _ = token.cancelled() => {
                    info!("countdown cancelled at {remaining}s");
                    return;
                }
                _ = interval.tick() => {
                    remaining -= 1;
                }
            }
        }

        self.capture.lock().await.finish_countdown();
        self.capture_and_generate(session_id).await;
    }

    /// Countdown completion: grab the still, then CAMERA -> GENERATING ->
    /// RESULT (or back to CAMERA on a classified failure).
    async fn capture_and_generate(&self, session_id: Uuid) {
        let orientation = self.config.settings().orientation;

        {
            let state = self.state.lock().await;
            if !state.is_active_session(session_id) || state.screen != Screen::Camera {
                info!("discarding countdown completion for stale session {session_id}");
                return;
            }
        }

        let feed = { self.capture.lock().await.take_feed() };
        let Some(feed) = feed else {
            self.camera_failed(
                session_id,
                KioskError::HardwareUnavailable("camera feed lost".into()),
            )
            .await;
            return;
        };

        let captured = tokio::task::spawn_blocking(move || capture_still(feed, orientation))
            .await
            .unwrap_or_else(|err| {
                Err(KioskError::HardwareUnavailable(format!(
                    "capture worker failed: {err}"
                )))
            });
        let frame = match captured {
            Ok(frame) => frame,
            Err(err) => {
                self.camera_failed(session_id, err).await;
                return;
            }
        };

        let concept = {
            let mut state = self.state.lock().await;
            if !state.is_active_session(session_id) {
                info!("discarding captured frame for stale session {session_id}");
                return;
            }
            match state.begin_generating(session_id, frame.clone()) {
                Ok(()) => state.session.as_ref().map(|s| s.concept.clone()),
                Err(err) => {
                    warn!("capture completion rejected: {err}");
                    return;
                }
            }
        };
        let Some(concept) = concept else { return };

        self.emit_screen(Screen::Generating, None);
        info!("generation started for session {session_id}");

        match self
            .generator
            .generate(&frame, &concept, orientation.aspect_ratio())
            .await
        {
            Ok(image) => {
                {
                    let state = self.state.lock().await;
                    if !state.is_active_session(session_id) {
                        info!("discarding generated image for stale session {session_id}");
                        return;
                    }
                }

                let event_id = self.config.settings().active_event_id;
                match self
                    .registrar
                    .register(&image, &concept.name, event_id.as_deref())
                    .await
                {
                    Ok(item) => {
                        let mut state = self.state.lock().await;
                        if !state.is_active_session(session_id) {
                            info!("discarding registered result for stale session {session_id}");
                            return;
                        }
                        if let Err(err) = state.complete_generation(session_id, item.clone()) {
                            warn!("result commit rejected: {err}");
                            return;
                        }
                        drop(state);

                        self.arm_idle_timer().await;
                        self.emit_screen(Screen::Result, None);
                        self.emit_json(events::SESSION_RESULT, SessionResultEvent { item });
                    }
                    Err(err) => self.generation_failed(session_id, err).await,
                }
            }
            Err(err) => self.generation_failed(session_id, err).await,
        }
    }

    async fn camera_failed(&self, session_id: Uuid, err: KioskError) {
        error!("capture failed: {err}");
        let mut state = self.state.lock().await;
        if !state.is_active_session(session_id) {
            return;
        }
        state.set_camera_error(err.clone());
        drop(state);
        self.emit_screen(Screen::Camera, Some(err));
    }

    async fn generation_failed(&self, session_id: Uuid, err: KioskError) {
        warn!("generation failed for session {session_id}: {err}");
        {
            let mut state = self.state.lock().await;
            if !state.is_active_session(session_id) {
                return;
            }
            if let Err(err) = state.fail_generation(session_id, err.clone()) {
                warn!("failure commit rejected: {err}");
                return;
            }
        }
        self.emit_screen(Screen::Camera, Some(err));
        // re-acquire the feed so the guest can retry immediately
        let orientation = self.config.settings().orientation;
        self.open_camera(orientation).await;
    }

    /// Fetch settings and concepts from the store, replacing the cache on
    /// success. Invoked on every return to LANDING and before THEMES.
    pub async fn reload_config(&self) -> Result<(), KioskError> {
        match self.store.load().await {
            Ok(config) => {
                self.config.replace(config);
                self.state.lock().await.banner_error = None;
                self.emit_json(events::CONFIG_RELOADED, serde_json::json!({}));
                Ok(())
            }
            Err(err) => {
                self.state.lock().await.banner_error = Some(err.clone());
                Err(err)
            }
        }
    }

    /// Gallery read side; defaults to the active event so a new event never
    /// surfaces prior events' photos.
    pub async fn list_gallery(&self, event_id: Option<String>) -> Result<Vec<GalleryItem>> {
        let event_id = event_id.or_else(|| self.config.settings().active_event_id);
        Ok(self.store.list_gallery(event_id.as_deref()).await?)
    }

    /// Token-addressed fetch; works for items of deactivated events too.
    pub async fn fetch_gallery_item(&self, token: &str) -> Result<GalleryItem> {
        Ok(self.store.fetch_gallery_item(token).await?)
    }

    /// Nested ADMIN gate. Local comparison against the configured PIN; the
    /// store re-validates the PIN on every mutating call regardless.
    pub async fn admin_authenticate(&self, pin: &str) -> Result<bool> {
        let expected = self.config.settings().admin_pin;
        let ok = {
            let mut state = self.state.lock().await;
            if state.screen != Screen::Admin {
                bail!("authentication outside the admin screen");
            }
            state.authenticate_admin(pin, &expected)
        };
        self.arm_idle_timer().await;
        if !ok {
            info!("admin pin rejected locally");
        }
        Ok(ok)
    }

    async fn require_admin(&self) -> Result<()> {
        let state = self.state.lock().await;
        if state.screen != Screen::Admin || state.admin_auth != AdminAuth::Authenticated {
            bail!("admin action without authentication");
        }
        Ok(())
    }

    /// Store failures surface as errors and leave the frontend's in-memory
    /// edits untouched; the cache is only replaced after the store accepted.
    pub async fn admin_save_settings(&self, settings: KioskSettings, pin: &str) -> Result<()> {
        self.require_admin().await?;
        self.store.save_settings(&settings, pin).await?;
        self.config.replace_settings(settings);
        self.arm_idle_timer().await;
        Ok(())
    }

    pub async fn admin_save_concepts(&self, concepts: Vec<Concept>, pin: &str) -> Result<()> {
        self.require_admin().await?;
        self.store.save_concepts(&concepts, pin).await?;
        self.config.replace_concepts(concepts);
        self.arm_idle_timer().await;
        Ok(())
    }

    pub async fn admin_upload_overlay(
        &self,
        upload: OverlayUpload,
        pin: &str,
    ) -> Result<OverlayUrl> {
        self.require_admin().await?;
        let url = self.store.upload_overlay(&upload, pin).await?;
        self.arm_idle_timer().await;
        Ok(url)
    }

    pub async fn admin_list_events(&self) -> Result<Vec<EventRecord>> {
        self.require_admin().await?;
        Ok(self.store.list_events().await?)
    }

    pub async fn admin_activate_event(&self, event_id: &str, pin: &str) -> Result<()> {
        self.require_admin().await?;
        self.store.activate_event(event_id, pin).await?;
        // the active event id lives in the settings; refresh so the gallery
        // filter and the next guest see it
        if let Err(err) = self.reload_config().await {
            warn!("settings reload after event activation failed: {err}");
        }
        self.arm_idle_timer().await;
        Ok(())
    }

    async fn reset_to_landing(&self) {
        self.capture.lock().await.close();
        self.state.lock().await.reset_to_landing();
        self.cancel_idle_timer().await;
        self.emit_screen(Screen::Landing, None);

        // pick up admin edits for the next guest
        let controller = self.clone();
        tokio::spawn(async move {
            if let Err(err) = controller.reload_config().await {
                warn!("reload on landing failed: {err}");
            }
        });
    }

    async fn arm_idle_timer(&self) {
        let secs = self.config.settings().auto_reset_time.max(1);
        let epoch = self.idle_epoch.fetch_add(1, Ordering::SeqCst) + 1;

        let mut guard = self.idle_timer.lock().await;
        if let Some(handle) = guard.take() {
            handle.abort();
        }
        let controller = self.clone();
        *guard = Some(tokio::spawn(async move {
            time::sleep(Duration::from_secs(secs)).await;
            controller.idle_fire(epoch).await;
        }));
    }

    async fn cancel_idle_timer(&self) {
        self.idle_epoch.fetch_add(1, Ordering::SeqCst);
        if let Some(handle) = self.idle_timer.lock().await.take() {
            handle.abort();
        }
    }

    async fn idle_fire(&self, epoch: u64) {
        if self.idle_epoch.load(Ordering::SeqCst) != epoch {
            return;
        }
        let fire = { self.state.lock().await.screen.idle_reclaimable() };
        if fire {
            info!("idle timeout elapsed, reclaiming kiosk");
            // reset in a fresh task: the reset cancels the idle slot, which
            // is the task currently running this function
            let controller = self.clone();
            tokio::spawn(async move {
                controller.reset_to_landing().await;
            });
        }
    }

    fn emit_screen(&self, screen: Screen, error: Option<KioskError>) {
        self.emit_json(events::SCREEN_CHANGED, ScreenChangedEvent { screen, error });
    }

    fn emit_json<T: Serialize>(&self, event: &str, payload: T) {
        match serde_json::to_value(payload) {
            Ok(value) => self.events.emit_event(event, value),
            Err(err) => error!("failed to serialize {event} payload: {err}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    use async_trait::async_trait;
    use chrono::Utc;
    use tokio::sync::Notify;

    use crate::capture::backend::testing::StaticBackend;
    use crate::models::{CapturedFrame, GalleryUpload, GeneratedImage};
    use crate::session::events::testing::RecordingSink;
    use crate::store::KioskConfig;

    struct FakeStore {
        config: KioskConfig,
        registered: std::sync::Mutex<Vec<GalleryUpload>>,
        saves: AtomicUsize,
    }

    impl FakeStore {
        fn new(config: KioskConfig) -> Self {
            Self {
                config,
                registered: std::sync::Mutex::new(Vec::new()),
                saves: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl KioskStore for FakeStore {
        async fn load(&self) -> Result<KioskConfig, KioskError> {
            Ok(self.config.clone())
        }

        async fn save_settings(
            &self,
            _settings: &KioskSettings,
            _pin: &str,
        ) -> Result<(), KioskError> {
            self.saves.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        async fn save_concepts(&self, _concepts: &[Concept], _pin: &str) -> Result<(), KioskError> {
            self.saves.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        async fn upload_overlay(
            &self,
            _upload: &OverlayUpload,
            _pin: &str,
        ) -> Result<OverlayUrl, KioskError> {
            Ok(OverlayUrl {
                url: "https://store.test/overlay.png".into(),
            })
        }

        async fn list_gallery(
            &self,
            _event_id: Option<&str>,
        ) -> Result<Vec<GalleryItem>, KioskError> {
            Ok(Vec::new())
        }

        async fn fetch_gallery_item(&self, _token: &str) -> Result<GalleryItem, KioskError> {
            Err(KioskError::StoreUnreachable("no such item".into()))
        }

        async fn register_gallery_item(
            &self,
            upload: &GalleryUpload,
        ) -> Result<GalleryItem, KioskError> {
            self.registered.lock().unwrap().push(upload.clone());
            Ok(GalleryItem {
                id: format!("item-{}", upload.token),
                created_at: Utc::now(),
                concept_name: upload.concept_name.clone(),
                image_url: format!("https://store.test/{}.png", upload.token),
                download_url: format!("https://store.test/{}/download", upload.token),
                token: upload.token.clone(),
                event_id: upload.event_id.clone(),
            })
        }

        async fn list_events(&self) -> Result<Vec<EventRecord>, KioskError> {
            Ok(Vec::new())
        }

        async fn activate_event(&self, _event_id: &str, _pin: &str) -> Result<(), KioskError> {
            Ok(())
        }
    }

    enum GeneratorMode {
        Succeed,
        NoImage,
        Gated(Arc<Notify>),
    }

    struct FakeGenerator {
        mode: GeneratorMode,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl Generator for FakeGenerator {
        async fn generate(
            &self,
            _frame: &CapturedFrame,
            _concept: &Concept,
            _aspect_ratio: &str,
        ) -> Result<GeneratedImage, KioskError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match &self.mode {
                GeneratorMode::Succeed => Ok(generated()),
                GeneratorMode::NoImage => Err(KioskError::NoImageReturned),
                GeneratorMode::Gated(gate) => {
                    gate.notified().await;
                    Ok(generated())
                }
            }
        }
    }

    fn generated() -> GeneratedImage {
        GeneratedImage {
            bytes: vec![9; 16],
            mime_type: "image/png".into(),
        }
    }

    fn test_config() -> KioskConfig {
        let mut config = KioskConfig::default();
        config.settings.event_name = "Test Event".into();
        config.settings.admin_pin = "1234".into();
        config.settings.auto_reset_time = 30;
        config.settings.active_event_id = Some("ev1".into());
        config.concepts = vec![Concept {
            id: "c1".into(),
            name: "cyberpunk portrait".into(),
            prompt: "cyberpunk portrait".into(),
            thumbnail: None,
        }];
        config
    }

    struct Harness {
        controller: SessionController,
        store: Arc<FakeStore>,
        generator: Arc<FakeGenerator>,
        sink: Arc<RecordingSink>,
    }

    fn harness(mode: GeneratorMode, backend: StaticBackend) -> Harness {
        let store = Arc::new(FakeStore::new(test_config()));
        let sink = Arc::new(RecordingSink::default());
        let generator = Arc::new(FakeGenerator {
            mode,
            calls: AtomicUsize::new(0),
        });
        let controller = SessionController::new(
            crate::store::ConfigCache::new(test_config()),
            store.clone(),
            generator.clone(),
            Arc::new(backend),
            sink.clone(),
        );
        Harness {
            controller,
            store,
            generator,
            sink,
        }
    }

    // The virtual clock auto-advances, but captures run on real blocking
    // threads; bound the polling by wall time so slow debug-mode image work
    // cannot outlive the loop.
    async fn wait_for(
        controller: &SessionController,
        what: &str,
        predicate: impl Fn(&KioskSnapshot) -> bool,
    ) {
        let deadline = std::time::Instant::now() + std::time::Duration::from_secs(30);
        while std::time::Instant::now() < deadline {
            let snapshot = controller.snapshot().await;
            if predicate(&snapshot) {
                return;
            }
            time::sleep(Duration::from_millis(5)).await;
        }
        panic!("kiosk never reached: {what}");
    }

    async fn wait_for_screen(controller: &SessionController, screen: Screen) {
        wait_for(controller, &format!("{screen:?}"), |snapshot| {
            snapshot.screen == screen
        })
        .await;
    }

    async fn settle() {
        for _ in 0..20 {
            time::sleep(Duration::from_millis(5)).await;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn cyberpunk_portrait_reaches_result_and_registers_once() {
        let h = harness(GeneratorMode::Succeed, StaticBackend::working(1600, 1200));

        h.controller.press_start().await.unwrap();
        let snapshot = h.controller.select_concept("c1").await.unwrap();
        assert_eq!(snapshot.screen, Screen::Camera);
        assert!(snapshot.error.is_none());

        h.controller.start_countdown(Some(3)).await.unwrap();
        wait_for_screen(&h.controller, Screen::Result).await;

        let registered = h.store.registered.lock().unwrap();
        assert_eq!(registered.len(), 1);
        assert_eq!(registered[0].concept_name, "cyberpunk portrait");
        assert_eq!(registered[0].event_id.as_deref(), Some("ev1"));
        assert!(!registered[0].token.is_empty());
        drop(registered);

        let snapshot = h.controller.snapshot().await;
        assert!(snapshot.result.is_some());
        assert_eq!(h.sink.count(events::SESSION_RESULT), 1);
        assert!(h.sink.count(events::COUNTDOWN_TICK) >= 4);
    }

    #[tokio::test(start_paused = true)]
    async fn no_image_returns_to_camera_without_registration() {
        let h = harness(GeneratorMode::NoImage, StaticBackend::working(1280, 720));

        h.controller.press_start().await.unwrap();
        h.controller.select_concept("c1").await.unwrap();
        h.controller.start_countdown(Some(1)).await.unwrap();

        wait_for(&h.controller, "classified generation error", |snapshot| {
            snapshot.error.is_some()
        })
        .await;
        let snapshot = h.controller.snapshot().await;
        assert_eq!(snapshot.screen, Screen::Camera);
        assert_eq!(snapshot.error, Some(KioskError::NoImageReturned));
        assert!(h.store.registered.lock().unwrap().is_empty());
        assert_eq!(h.sink.count(events::SESSION_RESULT), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn stale_generation_is_discarded_after_home() {
        let gate = Arc::new(Notify::new());
        let h = harness(
            GeneratorMode::Gated(gate.clone()),
            StaticBackend::working(1600, 1200),
        );

        h.controller.press_start().await.unwrap();
        h.controller.select_concept("c1").await.unwrap();
        h.controller.start_countdown(Some(1)).await.unwrap();
        wait_for_screen(&h.controller, Screen::Generating).await;

        h.controller.go_home().await;
        assert_eq!(h.controller.snapshot().await.screen, Screen::Landing);

        // the stranded call resolves now; its result must go nowhere
        gate.notify_one();
        settle().await;

        assert_eq!(h.generator.calls.load(Ordering::SeqCst), 1);
        assert!(h.store.registered.lock().unwrap().is_empty());
        assert_eq!(h.sink.count(events::SESSION_RESULT), 0);
        let snapshot = h.controller.snapshot().await;
        assert_eq!(snapshot.screen, Screen::Landing);
        assert!(snapshot.result.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn capture_is_refused_while_generation_outstanding() {
        let gate = Arc::new(Notify::new());
        let h = harness(
            GeneratorMode::Gated(gate.clone()),
            StaticBackend::working(1600, 1200),
        );

        h.controller.press_start().await.unwrap();
        h.controller.select_concept("c1").await.unwrap();
        h.controller.start_countdown(Some(1)).await.unwrap();
        wait_for_screen(&h.controller, Screen::Generating).await;

        let err = h.controller.start_countdown(Some(1)).await.unwrap_err();
        assert!(err.to_string().contains("camera screen"));

        gate.notify_one();
        wait_for_screen(&h.controller, Screen::Result).await;
        assert_eq!(h.store.registered.lock().unwrap().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn idle_timeout_reclaims_gallery_exactly_once() {
        let h = harness(GeneratorMode::Succeed, StaticBackend::working(1280, 720));

        h.controller.open_gallery().await.unwrap();
        assert_eq!(h.controller.snapshot().await.screen, Screen::Gallery);

        time::sleep(Duration::from_secs(31)).await;
        wait_for_screen(&h.controller, Screen::Landing).await;

        settle().await;
        assert_eq!(h.sink.screen_changes_to("landing"), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn idle_timer_never_fires_during_camera_or_generating() {
        let gate = Arc::new(Notify::new());
        let h = harness(
            GeneratorMode::Gated(gate.clone()),
            StaticBackend::working(1600, 1200),
        );

        h.controller.press_start().await.unwrap();
        h.controller.select_concept("c1").await.unwrap();
        time::sleep(Duration::from_secs(120)).await;
        assert_eq!(h.controller.snapshot().await.screen, Screen::Camera);

        h.controller.start_countdown(Some(1)).await.unwrap();
        wait_for_screen(&h.controller, Screen::Generating).await;
        time::sleep(Duration::from_secs(120)).await;
        assert_eq!(h.controller.snapshot().await.screen, Screen::Generating);

        gate.notify_one();
        wait_for_screen(&h.controller, Screen::Result).await;

        // now the timer is armed again and eventually reclaims the kiosk
        time::sleep(Duration::from_secs(31)).await;
        wait_for_screen(&h.controller, Screen::Landing).await;
    }

    #[tokio::test(start_paused = true)]
    async fn touch_rearms_the_idle_timer() {
        let h = harness(GeneratorMode::Succeed, StaticBackend::working(1280, 720));

        h.controller.open_gallery().await.unwrap();
        for _ in 0..3 {
            time::sleep(Duration::from_secs(20)).await;
            h.controller.touch().await;
        }
        assert_eq!(h.controller.snapshot().await.screen, Screen::Gallery);

        time::sleep(Duration::from_secs(31)).await;
        wait_for_screen(&h.controller, Screen::Landing).await;
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_countdown_keeps_camera_live_and_produces_no_frame() {
        let h = harness(GeneratorMode::Succeed, StaticBackend::working(1600, 1200));

        h.controller.press_start().await.unwrap();
        h.controller.select_concept("c1").await.unwrap();
        h.controller.start_countdown(Some(10)).await.unwrap();
        h.controller.cancel_countdown().await;

        settle().await;
        let snapshot = h.controller.snapshot().await;
        assert_eq!(snapshot.screen, Screen::Camera);
        assert!(!snapshot.has_captured_frame);
        assert!(h.store.registered.lock().unwrap().is_empty());

        let engine = h.controller.capture.lock().await;
        assert!(engine.is_open());
        assert!(!engine.countdown_running());
    }

    #[tokio::test(start_paused = true)]
    async fn hardware_failure_is_classified_and_home_still_works() {
        let h = harness(GeneratorMode::Succeed, StaticBackend::broken());

        h.controller.press_start().await.unwrap();
        let snapshot = h.controller.select_concept("c1").await.unwrap();
        assert_eq!(snapshot.screen, Screen::Camera);
        assert!(matches!(
            snapshot.error,
            Some(KioskError::HardwareUnavailable(_))
        ));

        // capture cannot start without a feed
        assert!(h.controller.start_countdown(None).await.is_err());

        h.controller.go_home().await;
        assert_eq!(h.controller.snapshot().await.screen, Screen::Landing);
    }

    #[tokio::test(start_paused = true)]
    async fn camera_is_released_on_home_navigation() {
        let h = harness(GeneratorMode::Succeed, StaticBackend::working(1280, 720));

        h.controller.press_start().await.unwrap();
        h.controller.select_concept("c1").await.unwrap();
        assert!(h.controller.capture.lock().await.is_open());

        h.controller.go_home().await;
        assert!(!h.controller.capture.lock().await.is_open());
    }

    #[tokio::test(start_paused = true)]
    async fn wrong_admin_pin_stays_unauthenticated_and_saves_nothing() {
        let h = harness(GeneratorMode::Succeed, StaticBackend::working(1280, 720));

        h.controller.open_admin().await.unwrap();
        let ok = h.controller.admin_authenticate("0000").await.unwrap();
        assert!(!ok);
        assert!(!h.controller.snapshot().await.admin_authenticated);

        let err = h
            .controller
            .admin_save_settings(KioskSettings::default(), "0000")
            .await
            .unwrap_err();
        assert!(err.to_string().contains("authentication"));
        assert_eq!(h.store.saves.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn authenticated_admin_saves_update_the_cache() {
        let h = harness(GeneratorMode::Succeed, StaticBackend::working(1280, 720));

        h.controller.open_admin().await.unwrap();
        assert!(h.controller.admin_authenticate("1234").await.unwrap());

        let mut settings = test_config().settings;
        settings.event_name = "Renamed Event".into();
        h.controller
            .admin_save_settings(settings, "1234")
            .await
            .unwrap();

        assert_eq!(h.store.saves.load(Ordering::SeqCst), 1);
        assert_eq!(h.controller.snapshot().await.event_name, "Renamed Event");
    }

    #[tokio::test(start_paused = true)]
    async fn admin_auth_does_not_survive_reentry() {
        let h = harness(GeneratorMode::Succeed, StaticBackend::working(1280, 720));

        h.controller.open_admin().await.unwrap();
        assert!(h.controller.admin_authenticate("1234").await.unwrap());

        h.controller.go_home().await;
        h.controller.open_admin().await.unwrap();
        assert!(!h.controller.snapshot().await.admin_authenticated);
    }

    #[tokio::test(start_paused = true)]
    async fn start_is_rejected_off_the_landing_screen() {
        let h = harness(GeneratorMode::Succeed, StaticBackend::working(1280, 720));

        h.controller.press_start().await.unwrap();
        assert!(h.controller.press_start().await.is_err());
        assert!(h.controller.open_gallery().await.is_err());
    }
}
