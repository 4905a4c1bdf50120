//! In-memory page source for tests and offline runs.

use crate::domain::ports::{Page, PageFetcher};
use crate::utils::error::{MapperError, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

/// Serves fixed bodies by exact URL and records every requested URL in order.
/// Unknown URLs fail the same way an unreachable site does.
#[derive(Default)]
pub struct MemoryFetcher {
    pages: HashMap<String, String>,
    requests: Mutex<Vec<String>>,
}

impl MemoryFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page(mut self, url: impl Into<String>, body: impl Into<String>) -> Self {
        self.pages.insert(url.into(), body.into());
        self
    }

    /// URLs requested so far, in request order.
    pub fn requests(&self) -> Vec<String> {
        self.requests
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }

    pub fn request_count(&self, url: &str) -> usize {
        self.requests().iter().filter(|r| r.as_str() == url).count()
    }
}

#[async_trait]
impl PageFetcher for MemoryFetcher {
    async fn fetch(&self, url: &str, _timeout: Duration) -> Result<Page> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(url.to_string());
        }

        self.pages
            .get(url)
            .map(|body| Page {
                url: url.to_string(),
                body: body.clone(),
            })
            .ok_or_else(|| MapperError::fetch_failed(url, "no page registered"))
    }
}
