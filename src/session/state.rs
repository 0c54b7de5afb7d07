use anyhow::{bail, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::KioskError;
use crate::models::{CapturedFrame, Concept, GalleryItem};

/// The single source of truth for what the kiosk is showing. LANDING is both
/// the initial state and the idle attractor every path falls back to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Screen {
    Landing,
    Themes,
    Camera,
    Generating,
    Result,
    Gallery,
    Admin,
}

impl Screen {
    /// Screens whose idle timer reclaims the kiosk for the next guest. A
    /// guest mid-flow (CAMERA, GENERATING) is never kicked back.
    pub fn idle_reclaimable(&self) -> bool {
        matches!(self, Screen::Result | Screen::Gallery | Screen::Admin)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum AdminAuth {
    Unauthenticated,
    Authenticated,
}

/// One guest interaction, created on the transition into CAMERA and
/// destroyed on every return to LANDING. The id is the stale-result guard:
/// async completions only commit if the live session still carries it.
#[derive(Debug)]
pub struct GuestSession {
    pub id: Uuid,
    pub started_at: DateTime<Utc>,
    pub concept: Concept,
    pub captured_frame: Option<CapturedFrame>,
    pub result: Option<GalleryItem>,
    pub error: Option<KioskError>,
}

#[derive(Debug)]
pub struct SessionState {
    pub screen: Screen,
    pub session: Option<GuestSession>,
    pub admin_auth: AdminAuth,
    /// Error surfaced outside a guest session (store down on LANDING etc).
    pub banner_error: Option<KioskError>,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            screen: Screen::Landing,
            session: None,
            admin_auth: AdminAuth::Unauthenticated,
            banner_error: None,
        }
    }
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn session_id(&self) -> Option<Uuid> {
        self.session.as_ref().map(|session| session.id)
    }

    pub fn is_active_session(&self, id: Uuid) -> bool {
        self.session_id() == Some(id)
    }

    pub fn enter_themes(&mut self) -> Result<()> {
        if self.screen != Screen::Landing {
            bail!("themes are only reachable from landing");
        }
        self.screen = Screen::Themes;
        Ok(())
    }

    pub fn enter_gallery(&mut self) -> Result<()> {
        if self.screen != Screen::Landing {
            bail!("gallery is only reachable from landing");
        }
        self.screen = Screen::Gallery;
        Ok(())
    }

    /// Admin authentication never survives leaving the screen; every entry
    /// starts unauthenticated.
    pub fn enter_admin(&mut self) -> Result<()> {
        if self.screen != Screen::Landing {
            bail!("admin is only reachable from landing");
        }
        self.screen = Screen::Admin;
        self.admin_auth = AdminAuth::Unauthenticated;
        Ok(())
    }

    /// THEMES -> CAMERA. Creates the guest session and returns its id.
    pub fn select_concept(&mut self, concept: Concept) -> Result<Uuid> {
        if self.screen != Screen::Themes {
            bail!("concept selection outside the themes screen");
        }
        let id = Uuid::new_v4();
        self.session = Some(GuestSession {
            id,
            started_at: Utc::now(),
            concept,
            captured_frame: None,
            result: None,
            error: None,
        });
        self.screen = Screen::Camera;
        Ok(id)
    }

    /// CAMERA -> GENERATING. The frame argument is the capture itself, so
    /// GENERATING cannot be entered without one in the same session.
    pub fn begin_generating(&mut self, session_id: Uuid, frame: CapturedFrame) -> Result<()> {
        if self.screen != Screen::Camera {
            bail!("generation can only start from the camera screen");
        }
        let Some(session) = self.session.as_mut().filter(|s| s.id == session_id) else {
            bail!("generation for a discarded session");
        };
        session.captured_frame = Some(frame);
        session.error = None;
        self.screen = Screen::Generating;
        Ok(())
    }

    /// GENERATING -> RESULT with the registered gallery item.
    pub fn complete_generation(&mut self, session_id: Uuid, item: GalleryItem) -> Result<()> {
        if self.screen != Screen::Generating {
            bail!("result commit outside the generating screen");
        }
        let Some(session) = self.session.as_mut().filter(|s| s.id == session_id) else {
            bail!("result for a discarded session");
        };
        session.result = Some(item);
        self.screen = Screen::Result;
        Ok(())
    }

    /// GENERATING -> CAMERA with a classified error; the captured frame is
    /// discarded so a retry re-captures.
    pub fn fail_generation(&mut self, session_id: Uuid, error: KioskError) -> Result<()> {
        if self.screen != Screen::Generating {
            bail!("generation failure outside the generating screen");
        }
        let Some(session) = self.session.as_mut().filter(|s| s.id == session_id) else {
            bail!("failure for a discarded session");
        };
        session.captured_frame = None;
        session.error = Some(error);
        self.screen = Screen::Camera;
        Ok(())
    }

    pub fn set_camera_error(&mut self, error: KioskError) {
        if let Some(session) = self.session.as_mut() {
            session.error = Some(error);
        }
    }

    pub fn clear_camera_error(&mut self) {
        if let Some(session) = self.session.as_mut() {
            session.error = None;
        }
    }

    /// Compare against the configured PIN; nested ADMIN state machine.
    pub fn authenticate_admin(&mut self, pin: &str, expected: &str) -> bool {
        if pin == expected {
            self.admin_auth = AdminAuth::Authenticated;
            true
        } else {
            false
        }
    }

    /// Any screen -> LANDING. Discards the session; in-flight completions
    /// for it will find no matching id and drop their results.
    pub fn reset_to_landing(&mut self) {
        self.screen = Screen::Landing;
        self.session = None;
        self.admin_auth = AdminAuth::Unauthenticated;
    }
}
