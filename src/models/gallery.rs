use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A published photo. Created exactly once per successful generation and
/// immutable afterwards; the token is the only share handle guests ever see.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GalleryItem {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub concept_name: String,
    pub image_url: String,
    pub download_url: String,
    pub token: String,
    #[serde(default)]
    pub event_id: Option<String>,
}

/// Registration payload sent to the store. The store hosts the bytes and
/// answers with the finished [`GalleryItem`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GalleryUpload {
    pub token: String,
    pub concept_name: String,
    pub event_id: Option<String>,
    pub mime_type: String,
    pub image_base64: String,
}
