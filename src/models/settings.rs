use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Orientation {
    Portrait,
    Landscape,
}

impl Default for Orientation {
    fn default() -> Self {
        Orientation::Portrait
    }
}

impl Orientation {
    /// Aspect ratio string as the generation service expects it.
    pub fn aspect_ratio(&self) -> &'static str {
        match self {
            Orientation::Portrait => "9:16",
            Orientation::Landscape => "16:9",
        }
    }

    /// Exact pixel dimensions every captured frame is normalized to.
    pub fn target_dimensions(&self) -> (u32, u32) {
        match self {
            Orientation::Portrait => (1080, 1920),
            Orientation::Landscape => (1920, 1080),
        }
    }
}

/// Process-wide kiosk configuration, loaded from the remote store.
///
/// Single-writer (admin), many-reader (session). The session controller never
/// mutates this; it re-reads on every return to LANDING so admin edits take
/// effect for the next guest without a restart.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct KioskSettings {
    pub event_name: String,
    pub event_description: String,
    pub folder_id: String,
    pub overlay_image: Option<String>,
    pub background_image: Option<String>,
    /// Seconds of inactivity on RESULT/GALLERY/ADMIN before the kiosk resets.
    pub auto_reset_time: u64,
    pub admin_pin: String,
    pub orientation: Orientation,
    pub active_event_id: Option<String>,
}

impl Default for KioskSettings {
    fn default() -> Self {
        Self {
            event_name: String::new(),
            event_description: String::new(),
            folder_id: String::new(),
            overlay_image: None,
            background_image: None,
            auto_reset_time: 60,
            admin_pin: "0000".into(),
            orientation: Orientation::default(),
            active_event_id: None,
        }
    }
}
