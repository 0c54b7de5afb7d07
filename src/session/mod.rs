pub mod commands;
pub mod controller;
pub mod events;
pub mod state;

pub use controller::{KioskSnapshot, SessionController};
pub use events::{EventSink, TauriEventSink};
pub use state::{Screen, SessionState};
