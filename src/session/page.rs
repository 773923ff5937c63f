use std::sync::{Arc, RwLock};

/// The page the user is currently on, reported as a session's last action
#[derive(Debug, Clone, Default)]
pub struct CurrentPage {
    url: Arc<RwLock<String>>,
}

impl CurrentPage {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: Arc::new(RwLock::new(url.into())),
        }
    }

    pub fn get(&self) -> String {
        self.url.read().map(|url| url.clone()).unwrap_or_default()
    }

    /// Called on navigation
    pub fn set(&self, url: impl Into<String>) {
        if let Ok(mut current) = self.url.write() {
            *current = url.into();
        }
    }
}
