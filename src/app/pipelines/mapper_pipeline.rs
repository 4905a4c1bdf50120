use crate::config::MapperConfig;
use crate::core::discovery::{BoardDiscoverer, DiscoveryTimeouts};
use crate::core::hierarchy::HierarchyExtractor;
use crate::core::selectors::SelectorDetector;
use crate::domain::model::{
    Campus, DepartmentRef, ManualReviewItem, MappingOutcome, ReviewReason, RunSummary,
};
use crate::domain::ports::{PageFetcher, Pipeline, Storage};
use crate::utils::error::{MapperError, Result};
use serde::Serialize;

/// Crawls the configured campuses, discovers every department's boards and writes the JSON
/// outputs through `Storage`.
pub struct MapperPipeline<S: Storage, F: PageFetcher> {
    storage: S,
    config: MapperConfig,
    extractor: HierarchyExtractor,
    discoverer: BoardDiscoverer<F>,
    hierarchy_source: Option<String>,
    campus_filter: Vec<String>,
}

impl<S: Storage, F: PageFetcher> MapperPipeline<S, F> {
    pub fn new(storage: S, fetcher: F, config: MapperConfig) -> Result<Self> {
        let extractor = HierarchyExtractor::new(&config.hierarchy, &config.institution)?;
        let discoverer = BoardDiscoverer::new(
            fetcher,
            SelectorDetector::new(config.cms_rules.clone()),
            config.keywords.clone(),
            &config.discovery,
            DiscoveryTimeouts::from(&config.http),
        );

        Ok(Self {
            storage,
            config,
            extractor,
            discoverer,
            hierarchy_source: None,
            campus_filter: Vec::new(),
        })
    }

    /// 從先前輸出的學系檔案讀取階層，略過校區爬取
    /// (相對路徑以 storage 的根目錄為準)
    pub fn with_hierarchy_source(mut self, path: impl Into<String>) -> Self {
        self.hierarchy_source = Some(path.into());
        self
    }

    /// 只保留指定名稱的校區；同樣套用在讀入的階層檔
    pub fn with_campus_filter(mut self, names: Vec<String>) -> Self {
        self.campus_filter = names;
        self
    }

    pub fn config(&self) -> &MapperConfig {
        &self.config
    }

    pub fn discoverer(&self) -> &BoardDiscoverer<F> {
        &self.discoverer
    }

    async fn crawl_campuses(&self) -> Vec<Campus> {
        let mut campuses = Vec::new();

        for source in &self.config.campuses {
            tracing::info!("🏫 Crawling campus: {}", source.name);

            let page = match self
                .discoverer
                .fetcher()
                .fetch(&source.url, self.config.http.campus_timeout())
                .await
            {
                Ok(page) => page,
                Err(e) => {
                    tracing::warn!("❌ Skipping {}: {}", source.name, e);
                    continue;
                }
            };

            match self.extractor.extract_html(&page.body, &source.name) {
                Ok(campus) => {
                    tracing::info!(
                        "✅ {}: {} colleges, {} departments",
                        campus.campus,
                        campus.colleges.len(),
                        campus.department_count()
                    );
                    campuses.push(campus);
                }
                Err(e) => {
                    tracing::warn!("❌ Skipping {}: {}", source.name, e);
                }
            }
        }

        campuses
    }

    async fn read_hierarchy(&self, path: &str) -> Result<Vec<Campus>> {
        tracing::info!("📂 Loading department hierarchy from {}", path);
        let data = self.storage.read_file(path).await?;
        let mut campuses: Vec<Campus> = serde_json::from_slice(&data)?;
        if !self.campus_filter.is_empty() {
            campuses.retain(|c| self.campus_filter.contains(&c.campus));
        }
        Ok(campuses)
    }

    async fn write_json<T: Serialize + ?Sized>(&self, file: &str, value: &T) -> Result<()> {
        // serde_json 預設保留非 ASCII 字元
        let json = serde_json::to_string_pretty(value)?;
        tracing::debug!("Writing {} ({} bytes)", file, json.len());
        self.storage.write_file(file, json.as_bytes()).await
    }
}

#[async_trait::async_trait]
impl<S: Storage, F: PageFetcher> Pipeline for MapperPipeline<S, F> {
    async fn map_campuses(&self) -> Result<Vec<Campus>> {
        let (campuses, configured) = match &self.hierarchy_source {
            Some(path) => {
                let campuses = self.read_hierarchy(path).await?;
                let count = campuses.len();
                (campuses, count)
            }
            None => (self.crawl_campuses().await, self.config.campuses.len()),
        };

        if campuses.is_empty() {
            return Err(MapperError::NoCampusesMapped { configured });
        }
        Ok(campuses)
    }

    async fn save_hierarchy(&self, campuses: &[Campus]) -> Result<String> {
        let file = &self.config.output.departments_file;
        self.write_json(file, campuses).await?;
        Ok(format!("{}/{}", self.config.output.dir, file))
    }

    async fn discover(&self, campuses: Vec<Campus>) -> Result<MappingOutcome> {
        let mut enriched = campuses;
        let mut manual_review: Vec<ManualReviewItem> = Vec::new();

        for campus in &mut enriched {
            tracing::info!("🏫 Discovering boards for {}", campus.campus);

            for college in &mut campus.colleges {
                for department in &mut college.departments {
                    let department_ref = DepartmentRef::new(&campus.campus, &department.name);
                    let homepage = department.url.as_str().to_string();

                    let result = self.discoverer.discover(&department_ref, &homepage).await;

                    match result.manual_review {
                        Some(item) => manual_review.push(item),
                        None if result.boards.is_empty()
                            && self.config.discovery.review_empty_departments =>
                        {
                            manual_review.push(
                                department_ref.review(&homepage, ReviewReason::NoBoardsDiscovered),
                            );
                        }
                        None => {}
                    }

                    tracing::info!("  {}: {} boards", department.name, result.boards.len());
                    department.boards = result.boards;
                }
            }
        }

        Ok(MappingOutcome {
            enriched,
            manual_review,
        })
    }

    async fn load(&self, outcome: &MappingOutcome, summary: &RunSummary) -> Result<String> {
        let output = &self.config.output;

        self.write_json(&output.boards_file, &outcome.enriched).await?;
        self.write_json(&output.manual_review_file, &outcome.manual_review)
            .await?;
        self.write_json(&output.summary_file, summary).await?;

        if !outcome.manual_review.is_empty() {
            tracing::info!(
                "📝 {} departments need manual review, see {}",
                outcome.manual_review.len(),
                output.manual_review_file
            );
        }

        Ok(output.dir.clone())
    }
}
