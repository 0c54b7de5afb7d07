use serde::{Deserialize, Serialize};

/// A themed transformation style a guest can pick on the THEMES screen.
///
/// Immutable while a session is running; the admin edits the list through the
/// store and the kiosk picks the changes up on its next return to LANDING.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Concept {
    pub id: String,
    pub name: String,
    pub prompt: String,
    #[serde(default)]
    pub thumbnail: Option<String>,
}
