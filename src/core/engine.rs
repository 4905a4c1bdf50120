use crate::domain::model::{MappingOutcome, RunSummary};
use crate::domain::ports::Pipeline;
use crate::utils::error::Result;
use crate::utils::monitor::RunMonitor;
use chrono::Utc;

pub struct MapperEngine<P: Pipeline> {
    pipeline: P,
    monitor: RunMonitor,
    map_only: bool,
}

impl<P: Pipeline> MapperEngine<P> {
    pub fn new(pipeline: P) -> Self {
        Self::new_with_monitoring(pipeline, false)
    }

    pub fn new_with_monitoring(pipeline: P, monitor_enabled: bool) -> Self {
        Self {
            pipeline,
            monitor: RunMonitor::new(monitor_enabled),
            map_only: false,
        }
    }

    /// 只輸出學院/學系階層，不探索看板
    pub fn map_only(mut self, map_only: bool) -> Self {
        self.map_only = map_only;
        self
    }

    pub fn pipeline(&self) -> &P {
        &self.pipeline
    }

    pub async fn run(&self) -> Result<RunSummary> {
        let started_at = Utc::now();
        tracing::info!("🚀 Starting department mapping...");

        // Map
        self.monitor.start_phase();
        let campuses = self.pipeline.map_campuses().await?;
        let departments: usize = campuses.iter().map(|c| c.department_count()).sum();
        tracing::info!(
            "Mapped {} campuses with {} departments",
            campuses.len(),
            departments
        );
        let hierarchy_path = self.pipeline.save_hierarchy(&campuses).await?;
        tracing::info!("📁 Department hierarchy saved to: {}", hierarchy_path);
        self.monitor.log_phase("map");

        if self.map_only {
            let outcome = MappingOutcome {
                enriched: campuses,
                manual_review: Vec::new(),
            };
            return Ok(RunSummary::from_outcome(started_at, &outcome));
        }

        // Discover
        self.monitor.start_phase();
        tracing::info!("🔎 Discovering notice boards...");
        let outcome = self.pipeline.discover(campuses).await?;
        self.monitor.log_phase("discover");

        // Load
        self.monitor.start_phase();
        let summary = RunSummary::from_outcome(started_at, &outcome);
        let output_dir = self.pipeline.load(&outcome, &summary).await?;
        self.monitor.log_phase("load");

        tracing::info!(
            "📊 Summary: {} campuses, {} departments, {} boards, {} need manual review",
            summary.campuses,
            summary.departments,
            summary.boards,
            summary.manual_review
        );
        tracing::info!("📁 Output saved to: {}", output_dir);

        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::{Campus, College, Department, DepartmentRef, DepartmentUrl, ReviewReason};
    use crate::utils::error::MapperError;
    use async_trait::async_trait;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingPipeline {
        campuses: Vec<Campus>,
        calls: Mutex<Vec<&'static str>>,
    }

    impl RecordingPipeline {
        fn record(&self, call: &'static str) {
            self.calls.lock().unwrap().push(call);
        }

        fn calls(&self) -> Vec<&'static str> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Pipeline for RecordingPipeline {
        async fn map_campuses(&self) -> Result<Vec<Campus>> {
            self.record("map");
            if self.campuses.is_empty() {
                return Err(MapperError::NoCampusesMapped { configured: 2 });
            }
            Ok(self.campuses.clone())
        }

        async fn save_hierarchy(&self, _campuses: &[Campus]) -> Result<String> {
            self.record("save_hierarchy");
            Ok("departments.json".to_string())
        }

        async fn discover(&self, campuses: Vec<Campus>) -> Result<MappingOutcome> {
            self.record("discover");
            let review = DepartmentRef::new("신촌캠퍼스", "사학과")
                .review("NOT_FOUND", ReviewReason::InvalidHomepageUrl);
            Ok(MappingOutcome {
                enriched: campuses,
                manual_review: vec![review],
            })
        }

        async fn load(&self, _outcome: &MappingOutcome, _summary: &RunSummary) -> Result<String> {
            self.record("load");
            Ok("./data".to_string())
        }
    }

    fn campus() -> Campus {
        let mut college = College::new("문과대학");
        college.departments.push(Department {
            id: "yonsei_사학과".to_string(),
            name: "사학과".to_string(),
            url: DepartmentUrl::Unresolved,
            boards: Vec::new(),
        });
        Campus {
            campus: "신촌캠퍼스".to_string(),
            colleges: vec![college],
        }
    }

    #[tokio::test]
    async fn test_runs_all_phases_in_order() {
        let engine = MapperEngine::new(RecordingPipeline {
            campuses: vec![campus()],
            ..Default::default()
        });
        let summary = engine.run().await.unwrap();

        assert_eq!(
            engine.pipeline().calls(),
            vec!["map", "save_hierarchy", "discover", "load"]
        );
        assert_eq!(summary.campuses, 1);
        assert_eq!(summary.departments, 1);
        assert_eq!(summary.boards, 0);
        assert_eq!(summary.manual_review, 1);
        assert!(summary.finished_at >= summary.started_at);
    }

    #[tokio::test]
    async fn test_map_only_stops_after_hierarchy() {
        let engine = MapperEngine::new(RecordingPipeline {
            campuses: vec![campus()],
            ..Default::default()
        })
        .map_only(true);
        let summary = engine.run().await.unwrap();

        assert_eq!(engine.pipeline().calls(), vec!["map", "save_hierarchy"]);
        assert_eq!(summary.departments, 1);
        assert_eq!(summary.manual_review, 0);
    }

    #[tokio::test]
    async fn test_nothing_mapped_aborts_run() {
        let engine = MapperEngine::new(RecordingPipeline::default());
        let err = engine.run().await.unwrap_err();

        assert!(matches!(err, MapperError::NoCampusesMapped { configured: 2 }));
        assert_eq!(engine.pipeline().calls(), vec!["map"]);
    }
}
