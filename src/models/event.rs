use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An event the kiosk can run under (wedding, launch party, ...).
///
/// At most one record is active at a time; `KioskSettings.active_event_id`
/// references it. Gallery items keep their event id forever, so photos from a
/// deactivated event stay reachable by token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventRecord {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub folder_id: String,
    pub created_at: DateTime<Utc>,
    pub is_active: bool,
}
