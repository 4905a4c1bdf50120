use crate::domain::model::{Campus, MappingOutcome, RunSummary};
use crate::utils::error::Result;
use async_trait::async_trait;
use std::time::Duration;

/// 已下載的頁面原始內容
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    pub url: String,
    pub body: String,
}

/// Fetch-by-URL collaborator. Any transport error, timeout or non-success status is an `Err`.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch(&self, url: &str, timeout: Duration) -> Result<Page>;
}

pub trait Storage: Send + Sync {
    fn read_file(&self, path: &str) -> impl std::future::Future<Output = Result<Vec<u8>>> + Send;
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
}

/// The three phases a run goes through; `save_hierarchy` persists the phase-one result so a
/// later run can resume from it.
#[async_trait]
pub trait Pipeline: Send + Sync {
    async fn map_campuses(&self) -> Result<Vec<Campus>>;
    async fn save_hierarchy(&self, campuses: &[Campus]) -> Result<String>;
    async fn discover(&self, campuses: Vec<Campus>) -> Result<MappingOutcome>;
    async fn load(&self, outcome: &MappingOutcome, summary: &RunSummary) -> Result<String>;
}
