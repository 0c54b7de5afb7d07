use std::sync::Arc;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use log::info;
use uuid::Uuid;

use crate::error::KioskError;
use crate::models::{GalleryItem, GalleryUpload, GeneratedImage};
use crate::store::KioskStore;

/// Mint a share token. Random v4 UUID (122 bits), so share links cannot be
/// guessed from sequence or enumerated by guests.
pub fn mint_token() -> String {
    Uuid::new_v4().simple().to_string()
}

/// Publishes finished results to the gallery. Append-only: there is no
/// update or delete on an item once it exists.
#[derive(Clone)]
pub struct GalleryRegistrar {
    store: Arc<dyn KioskStore>,
}

impl GalleryRegistrar {
    pub fn new(store: Arc<dyn KioskStore>) -> Self {
        Self { store }
    }

    pub async fn register(
        &self,
        image: &GeneratedImage,
        concept_name: &str,
        event_id: Option<&str>,
    ) -> Result<GalleryItem, KioskError> {
        let upload = GalleryUpload {
            token: mint_token(),
            concept_name: concept_name.to_string(),
            event_id: event_id.map(str::to_string),
            mime_type: image.mime_type.clone(),
            image_base64: BASE64.encode(&image.bytes),
        };

        let item = self.store.register_gallery_item(&upload).await?;
        info!(
            "registered gallery item {} for concept '{}'",
            item.token, item.concept_name
        );
        Ok(item)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn tokens_are_distinct_across_ten_thousand_mints() {
        let tokens: HashSet<String> = (0..10_000).map(|_| mint_token()).collect();
        assert_eq!(tokens.len(), 10_000);
    }

    #[test]
    fn tokens_carry_no_sequence() {
        let a = mint_token();
        let b = mint_token();
        assert_eq!(a.len(), 32);
        assert_ne!(a, b);
    }
}
