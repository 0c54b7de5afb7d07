use std::sync::{Arc, RwLock};

use crate::models::{Concept, KioskSettings};

/// Settings and concepts as last loaded from the store.
#[derive(Debug, Clone, Default)]
pub struct KioskConfig {
    pub settings: KioskSettings,
    pub concepts: Vec<Concept>,
}

/// Process-wide snapshot of the remote configuration.
///
/// Written only by the reload-on-LANDING path and by successful admin saves;
/// read everywhere else. Guests mid-session keep the snapshot they started
/// with.
#[derive(Clone)]
pub struct ConfigCache {
    inner: Arc<RwLock<KioskConfig>>,
}

impl ConfigCache {
    pub fn new(initial: KioskConfig) -> Self {
        Self {
            inner: Arc::new(RwLock::new(initial)),
        }
    }

    pub fn snapshot(&self) -> KioskConfig {
        self.inner.read().unwrap().clone()
    }

    pub fn settings(&self) -> KioskSettings {
        self.inner.read().unwrap().settings.clone()
    }

    pub fn concepts(&self) -> Vec<Concept> {
        self.inner.read().unwrap().concepts.clone()
    }

    pub fn replace(&self, config: KioskConfig) {
        *self.inner.write().unwrap() = config;
    }

    pub fn replace_settings(&self, settings: KioskSettings) {
        self.inner.write().unwrap().settings = settings;
    }

    pub fn replace_concepts(&self, concepts: Vec<Concept>) {
        self.inner.write().unwrap().concepts = concepts;
    }
}
