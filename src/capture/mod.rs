pub mod backend;
pub mod crop;
pub mod engine;

pub use backend::{CameraBackend, NokhwaBackend};
pub use engine::{capture_still, CaptureEngine};
