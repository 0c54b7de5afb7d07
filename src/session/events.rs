use serde_json::Value;

pub const SCREEN_CHANGED: &str = "screen-changed";
pub const COUNTDOWN_TICK: &str = "countdown-tick";
pub const SESSION_RESULT: &str = "session-result";
pub const CONFIG_RELOADED: &str = "config-reloaded";

/// Outbound event channel to the kiosk frontend. A trait so the controller
/// can be driven headless in tests.
pub trait EventSink: Send + Sync {
    fn emit_event(&self, event: &str, payload: Value);
}

pub struct TauriEventSink {
    app: tauri::AppHandle,
}

impl TauriEventSink {
    pub fn new(app: tauri::AppHandle) -> Self {
        Self { app }
    }
}

impl EventSink for TauriEventSink {
    fn emit_event(&self, event: &str, payload: Value) {
        use tauri::Emitter;
        let _ = self.app.emit(event, payload);
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    pub(crate) struct RecordingSink {
        pub events: Mutex<Vec<(String, Value)>>,
    }

    impl EventSink for RecordingSink {
        fn emit_event(&self, event: &str, payload: Value) {
            self.events.lock().unwrap().push((event.to_string(), payload));
        }
    }

    impl RecordingSink {
        pub fn count(&self, name: &str) -> usize {
            self.events
                .lock()
                .unwrap()
                .iter()
                .filter(|(event, _)| event == name)
                .count()
        }

        pub fn screen_changes_to(&self, screen: &str) -> usize {
            self.events
                .lock()
                .unwrap()
                .iter()
                .filter(|(event, payload)| {
                    event == super::SCREEN_CHANGED && payload["screen"] == screen
                })
                .count()
        }
    }
}
