mod concept;
mod event;
mod frame;
mod gallery;
mod settings;

pub use concept::Concept;
pub use event::EventRecord;
pub use frame::{CapturedFrame, GeneratedImage};
pub use gallery::{GalleryItem, GalleryUpload};
pub use settings::{KioskSettings, Orientation};
