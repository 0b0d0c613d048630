use crate::core::pipeline::{ProgressSink, StepProgress};
use serde::Serialize;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::debug;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, utoipa::ToSchema)]
pub enum IndexStatus {
    #[default]
    NotStarted,
    Processing,
    Succeeded,
    Failed,
}

/// Snapshot of the most recent ingestion.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct IndexStatusInfo {
    pub status: IndexStatus,

    /// Name of the file being, or last, ingested.
    pub file_name: Option<String>,

    /// The step reporting progress.
    pub step: Option<String>,

    pub current: usize,

    pub max: usize,

    /// Set when the last ingestion failed.
    pub last_error: Option<String>,
}

/// Tracks the state of the latest ingestion. Fed by the pipeline's progress reports.
#[derive(Debug, Clone, Default)]
pub struct IndexStatusTracker {
    info: Arc<Mutex<IndexStatusInfo>>,
}

impl IndexStatusTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> IndexStatusInfo {
        self.lock().clone()
    }

    /// Reset the tracker for the ingestion of `file_name`.
    pub fn start(&self, file_name: &str) {
        *self.lock() = IndexStatusInfo {
            status: IndexStatus::Processing,
            file_name: Some(file_name.to_string()),
            ..Default::default()
        };
    }

    pub fn succeed(&self) {
        let mut info = self.lock();
        info.status = IndexStatus::Succeeded;
        info.current = info.max;
    }

    pub fn fail(&self, error: impl ToString) {
        let mut info = self.lock();
        info.status = IndexStatus::Failed;
        info.last_error = Some(error.to_string());
    }

    pub fn update(&self, progress: StepProgress) {
        debug!(
            "{} progress {}/{}",
            progress.step, progress.current, progress.total
        );

        let mut info = self.lock();
        info.step = Some(progress.step.to_string());
        info.current = progress.current;
        info.max = progress.total;
    }

    /// A progress callback updating this tracker.
    pub fn sink(&self) -> ProgressSink {
        let tracker = self.clone();
        Arc::new(move |progress| tracker.update(progress))
    }

    fn lock(&self) -> MutexGuard<'_, IndexStatusInfo> {
        // A panicking reporter leaves the status readable
        self.info.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::{IndexStatus, IndexStatusTracker};
    use crate::core::pipeline::StepProgress;

    #[test]
    fn tracks_ingestion() {
        let tracker = IndexStatusTracker::new();
        assert_eq!(IndexStatus::NotStarted, tracker.snapshot().status);

        tracker.start("petstore.json");
        let sink = tracker.sink();
        sink(StepProgress {
            step: "partition",
            current: 2,
            total: 5,
        });

        let info = tracker.snapshot();
        assert_eq!(IndexStatus::Processing, info.status);
        assert_eq!(Some("partition"), info.step.as_deref());
        assert_eq!((2, 5), (info.current, info.max));

        tracker.succeed();
        let info = tracker.snapshot();
        assert_eq!(IndexStatus::Succeeded, info.status);
        assert_eq!(5, info.current);

        tracker.start("broken.json");
        tracker.fail("boom");
        let info = tracker.snapshot();
        assert_eq!(IndexStatus::Failed, info.status);
        assert_eq!(Some("boom"), info.last_error.as_deref());
        assert_eq!(Some("broken.json"), info.file_name.as_deref());
    }
}
