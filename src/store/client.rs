use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use log::info;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};

use crate::error::KioskError;
use crate::models::{Concept, EventRecord, GalleryItem, GalleryUpload, KioskSettings};

use super::config_cache::KioskConfig;
use super::local::PrefsStore;

/// Port for the remote settings/gallery store. The store is the authority
/// for PIN validation; this side is a transport that forwards the PIN and
/// classifies the store's answer.
#[async_trait]
pub trait KioskStore: Send + Sync {
    async fn load(&self) -> Result<KioskConfig, KioskError>;
    async fn save_settings(&self, settings: &KioskSettings, pin: &str) -> Result<(), KioskError>;
    async fn save_concepts(&self, concepts: &[Concept], pin: &str) -> Result<(), KioskError>;
    async fn upload_overlay(&self, upload: &OverlayUpload, pin: &str)
        -> Result<OverlayUrl, KioskError>;
    async fn list_gallery(&self, event_id: Option<&str>) -> Result<Vec<GalleryItem>, KioskError>;
    async fn fetch_gallery_item(&self, token: &str) -> Result<GalleryItem, KioskError>;
    async fn register_gallery_item(&self, upload: &GalleryUpload)
        -> Result<GalleryItem, KioskError>;
    async fn list_events(&self) -> Result<Vec<EventRecord>, KioskError>;
    async fn activate_event(&self, event_id: &str, pin: &str) -> Result<(), KioskError>;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OverlayUpload {
    pub mime_type: String,
    pub data_base64: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OverlayUrl {
    pub url: String,
}

/// HTTP implementation against the configurable base URL. The URL is read
/// from the local prefs on every call so an admin change takes effect on the
/// next request without restarting.
pub struct StoreClient {
    http: reqwest::Client,
    prefs: Arc<PrefsStore>,
}

impl StoreClient {
    pub fn new(prefs: Arc<PrefsStore>) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(20))
            .build()
            .unwrap_or_default();
        Self { http, prefs }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.prefs.store_base_url(), path)
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, path: &str) -> Result<T, KioskError> {
        let response = self
            .http
            .get(self.url(path))
            .send()
            .await
            .map_err(transport)?;
        decode(response).await
    }
}

fn transport(err: reqwest::Error) -> KioskError {
    KioskError::StoreUnreachable(err.to_string())
}

fn classify_status(status: StatusCode) -> KioskError {
    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        KioskError::Unauthorized
    } else {
        KioskError::StoreUnreachable(format!("store returned {status}"))
    }
}

async fn decode<T: serde::de::DeserializeOwned>(
    response: reqwest::Response,
) -> Result<T, KioskError> {
    let status = response.status();
    if !status.is_success() {
        return Err(classify_status(status));
    }
    response.json().await.map_err(transport)
}

async fn expect_ok(response: reqwest::Response) -> Result<(), KioskError> {
    let status = response.status();
    if !status.is_success() {
        return Err(classify_status(status));
    }
    Ok(())
}

#[async_trait]
impl KioskStore for StoreClient {
    async fn load(&self) -> Result<KioskConfig, KioskError> {
        let settings: KioskSettings = self.get_json("settings").await?;
        let concepts: Vec<Concept> = self.get_json("concepts").await?;
        info!(
            "loaded kiosk config: event '{}', {} concepts",
            settings.event_name,
            concepts.len()
        );
        Ok(KioskConfig { settings, concepts })
    }

    async fn save_settings(&self, settings: &KioskSettings, pin: &str) -> Result<(), KioskError> {
        let response = self
            .http
            .put(self.url("settings"))
            .query(&[("pin", pin)])
            .json(settings)
            .send()
            .await
            .map_err(transport)?;
        expect_ok(response).await
    }

    async fn save_concepts(&self, concepts: &[Concept], pin: &str) -> Result<(), KioskError> {
        let response = self
            .http
            .put(self.url("concepts"))
            .query(&[("pin", pin)])
            .json(concepts)
            .send()
            .await
            .map_err(transport)?;
        expect_ok(response).await
    }

    async fn upload_overlay(
        &self,
        upload: &OverlayUpload,
        pin: &str,
    ) -> Result<OverlayUrl, KioskError> {
        let response = self
            .http
            .post(self.url("overlay"))
            .query(&[("pin", pin)])
            .json(upload)
            .send()
            .await
            .map_err(transport)?;
        decode(response).await
    }

    async fn list_gallery(&self, event_id: Option<&str>) -> Result<Vec<GalleryItem>, KioskError> {
        let mut request = self.http.get(self.url("gallery"));
        if let Some(event_id) = event_id {
            request = request.query(&[("eventId", event_id)]);
        }
        let response = request.send().await.map_err(transport)?;
        decode(response).await
    }

    async fn fetch_gallery_item(&self, token: &str) -> Result<GalleryItem, KioskError> {
        self.get_json(&format!("gallery/{token}")).await
    }

    async fn register_gallery_item(
        &self,
        upload: &GalleryUpload,
    ) -> Result<GalleryItem, KioskError> {
        let response = self
            .http
            .post(self.url("gallery"))
            .json(upload)
            .send()
            .await
            .map_err(transport)?;
        decode(response).await
    }

    async fn list_events(&self) -> Result<Vec<EventRecord>, KioskError> {
        self.get_json("events").await
    }

    async fn activate_event(&self, event_id: &str, pin: &str) -> Result<(), KioskError> {
        let response = self
            .http
            .put(self.url(&format!("events/{event_id}/activate")))
            .query(&[("pin", pin)])
            .send()
            .await
            .map_err(transport)?;
        expect_ok(response).await
    }
}
