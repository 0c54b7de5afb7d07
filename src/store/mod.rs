pub mod client;
pub mod config_cache;
pub mod local;

pub use client::{KioskStore, OverlayUpload, OverlayUrl, StoreClient};
pub use config_cache::{ConfigCache, KioskConfig};
pub use local::{PrefsStore, DEFAULT_STORE_BASE_URL};
