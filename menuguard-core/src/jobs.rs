//! Asynchronous analysis job coordination.
//!
//! An analysis job moves PENDING → FINAL or PENDING → ERROR, and once
//! terminal its result/error never changes. The store behind the
//! coordinator is an injected abstraction so the backing implementation
//! (in-process map, external cache) is swappable and testable. Jobs are
//! written as whole records under the store lock, so a concurrent reader
//! never observes a partial transition such as a FINAL status without its
//! result.
//!
//! Each job has a single producer (the background worker); polling clients
//! only read. The coordinator's read-modify-write operations rely on that.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::types::{ClassifiedItem, StageTimings};

/// Lifecycle state of an analysis job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    Pending,
    Final,
    Error,
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, JobStatus::Pending)
    }
}

/// One asynchronous unit of analysis work.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisJob {
    pub job_id: Uuid,
    pub status: JobStatus,
    /// Interim fast-pass result, available while the detailed pass runs.
    pub quick_result: Option<Vec<ClassifiedItem>>,
    pub result: Option<Vec<ClassifiedItem>>,
    pub timings: StageTimings,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub error_message: Option<String>,
}

#[derive(Error, Debug)]
pub enum JobError {
    #[error("Job not found")]
    NotFound,

    #[error("Job {0} is already in terminal state {1:?}")]
    AlreadyTerminal(Uuid, JobStatus),

    #[error("Job store error: {0}")]
    Store(String),
}

/// Key-value job store keyed by job id.
///
/// `put` replaces the whole record; implementations must make each put a
/// single visible transition to readers. TTL/eviction of terminal jobs is
/// the store's concern, not the coordinator's.
pub trait JobStore: Send + Sync {
    fn get(&self, job_id: &Uuid) -> Result<Option<AnalysisJob>, JobError>;
    fn put(&self, job: AnalysisJob) -> Result<(), JobError>;
    fn delete(&self, job_id: &Uuid) -> Result<(), JobError>;
}

/// In-process job store backed by a locked map.
#[derive(Debug)]
pub struct InMemoryJobStore {
    jobs: RwLock<HashMap<Uuid, AnalysisJob>>,
    ttl: chrono::Duration,
}

impl InMemoryJobStore {
    pub fn new(ttl: Duration) -> Self {
        let ttl = chrono::Duration::from_std(ttl).unwrap_or_else(|_| {
            tracing::warn!("job TTL {:?} is out of range, clamping to 1 hour", ttl);
            chrono::Duration::hours(1)
        });
        Self {
            jobs: RwLock::new(HashMap::new()),
            ttl,
        }
    }

    /// Drop terminal jobs whose completion is older than the TTL.
    /// Returns how many were removed.
    pub fn sweep_expired(&self, now: DateTime<Utc>) -> usize {
        let mut jobs = match self.jobs.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let before = jobs.len();
        let ttl = self.ttl;
        jobs.retain(|_, job| match (job.status.is_terminal(), job.completed_at) {
            (true, Some(completed_at)) => completed_at + ttl > now,
            _ => true,
        });
        before - jobs.len()
    }
}

impl JobStore for InMemoryJobStore {
    fn get(&self, job_id: &Uuid) -> Result<Option<AnalysisJob>, JobError> {
        let jobs = self
            .jobs
            .read()
            .map_err(|e| JobError::Store(e.to_string()))?;
        Ok(jobs.get(job_id).cloned())
    }

    fn put(&self, job: AnalysisJob) -> Result<(), JobError> {
        let mut jobs = self
            .jobs
            .write()
            .map_err(|e| JobError::Store(e.to_string()))?;
        jobs.insert(job.job_id, job);
        Ok(())
    }

    fn delete(&self, job_id: &Uuid) -> Result<(), JobError> {
        let mut jobs = self
            .jobs
            .write()
            .map_err(|e| JobError::Store(e.to_string()))?;
        jobs.remove(job_id);
        Ok(())
    }
}

/// Spawn the store-owned background sweeper for expired terminal jobs.
pub fn spawn_sweeper(
    store: Arc<InMemoryJobStore>,
    every: Duration,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut tick = tokio::time::interval(every);
        loop {
            tick.tick().await;
            let removed = store.sweep_expired(Utc::now());
            if removed > 0 {
                tracing::debug!("swept {} expired analysis jobs", removed);
            }
        }
    })
}

/// Owns job lifecycle transitions over an injected store.
pub struct JobCoordinator {
    store: Arc<dyn JobStore>,
}

impl JobCoordinator {
    pub fn new(store: Arc<dyn JobStore>) -> Self {
        Self { store }
    }

    /// Allocate a new job in PENDING.
    pub fn create_job(&self) -> Result<AnalysisJob, JobError> {
        let job = AnalysisJob {
            job_id: Uuid::new_v4(),
            status: JobStatus::Pending,
            quick_result: None,
            result: None,
            timings: StageTimings::new(),
            created_at: Utc::now(),
            completed_at: None,
            error_message: None,
        };
        self.store.put(job.clone())?;
        Ok(job)
    }

    /// Attach an interim fast-pass result. Only valid while PENDING; the
    /// status does not change.
    pub fn record_quick_result(
        &self,
        job_id: Uuid,
        quick_result: Vec<ClassifiedItem>,
    ) -> Result<(), JobError> {
        let mut job = self.require(job_id)?;
        if job.status.is_terminal() {
            return Err(JobError::AlreadyTerminal(job_id, job.status));
        }
        job.quick_result = Some(quick_result);
        self.store.put(job)
    }

    /// Transition PENDING → FINAL with the final result and cumulative
    /// timings. Terminal jobs are never overwritten.
    pub fn complete_job(
        &self,
        job_id: Uuid,
        result: Vec<ClassifiedItem>,
        timings: StageTimings,
    ) -> Result<(), JobError> {
        let mut job = self.require(job_id)?;
        if job.status.is_terminal() {
            return Err(JobError::AlreadyTerminal(job_id, job.status));
        }
        job.status = JobStatus::Final;
        job.result = Some(result);
        job.timings = timings;
        job.completed_at = Some(Utc::now());
        self.store.put(job)
    }

    /// Transition PENDING → ERROR. Terminal jobs are never overwritten.
    pub fn fail_job(
        &self,
        job_id: Uuid,
        error_message: &str,
        timings: StageTimings,
    ) -> Result<(), JobError> {
        let mut job = self.require(job_id)?;
        if job.status.is_terminal() {
            return Err(JobError::AlreadyTerminal(job_id, job.status));
        }
        job.status = JobStatus::Error;
        job.error_message = Some(error_message.to_string());
        job.timings = timings;
        job.completed_at = Some(Utc::now());
        self.store.put(job)
    }

    /// Read-only lookup for polling clients. Unknown ids are a distinct
    /// not-found, never conflated with PENDING.
    pub fn get_job(&self, job_id: Uuid) -> Result<AnalysisJob, JobError> {
        self.require(job_id)
    }

    fn require(&self, job_id: Uuid) -> Result<AnalysisJob, JobError> {
        self.store.get(&job_id)?.ok_or(JobError::NotFound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{SafetyStatus, StageTimings};

    fn coordinator() -> JobCoordinator {
        JobCoordinator::new(Arc::new(InMemoryJobStore::new(Duration::from_secs(3600))))
    }

    fn item(name: &str, status: SafetyStatus) -> ClassifiedItem {
        ClassifiedItem {
            id: Uuid::new_v4(),
            original_name: name.to_string(),
            translated_name: name.to_string(),
            safety_status: status,
            reason: String::new(),
            ingredients: Vec::new(),
        }
    }

    fn timings(ms: u64) -> StageTimings {
        StageTimings::from([("cleanse".to_string(), ms)])
    }

    #[test]
    fn test_create_then_poll_then_complete() {
        let coordinator = coordinator();
        let job = coordinator.create_job().unwrap();

        let pending = coordinator.get_job(job.job_id).unwrap();
        assert_eq!(pending.status, JobStatus::Pending);
        assert!(pending.result.is_none());
        assert!(pending.completed_at.is_none());

        let items = vec![item("김치찌개", SafetyStatus::Safe)];
        coordinator
            .complete_job(job.job_id, items.clone(), timings(12))
            .unwrap();

        let done = coordinator.get_job(job.job_id).unwrap();
        assert_eq!(done.status, JobStatus::Final);
        assert_eq!(done.result.as_ref().unwrap().len(), 1);
        assert_eq!(done.result.as_ref().unwrap()[0].original_name, "김치찌개");
        assert_eq!(done.timings, timings(12));
        assert!(done.completed_at.is_some());
    }

    #[test]
    fn test_unknown_job_is_not_found() {
        let coordinator = coordinator();
        assert!(matches!(
            coordinator.get_job(Uuid::new_v4()),
            Err(JobError::NotFound)
        ));
    }

    #[test]
    fn test_fail_job() {
        let coordinator = coordinator();
        let job = coordinator.create_job().unwrap();

        coordinator
            .fail_job(job.job_id, "OCR unavailable", timings(3))
            .unwrap();

        let failed = coordinator.get_job(job.job_id).unwrap();
        assert_eq!(failed.status, JobStatus::Error);
        assert_eq!(failed.error_message.as_deref(), Some("OCR unavailable"));
        assert!(failed.completed_at.is_some());
        assert!(failed.result.is_none());
    }

    #[test]
    fn test_terminal_result_is_immutable() {
        let coordinator = coordinator();
        let job = coordinator.create_job().unwrap();

        let original = vec![item("비빔밥", SafetyStatus::Safe)];
        coordinator
            .complete_job(job.job_id, original.clone(), timings(5))
            .unwrap();

        let overwrite = coordinator.complete_job(
            job.job_id,
            vec![item("불고기", SafetyStatus::Danger)],
            timings(9),
        );
        assert!(matches!(overwrite, Err(JobError::AlreadyTerminal(_, _))));

        let fail = coordinator.fail_job(job.job_id, "late failure", timings(9));
        assert!(matches!(fail, Err(JobError::AlreadyTerminal(_, _))));

        let unchanged = coordinator.get_job(job.job_id).unwrap();
        assert_eq!(unchanged.status, JobStatus::Final);
        assert_eq!(unchanged.result.as_ref().unwrap()[0].original_name, "비빔밥");
        assert!(unchanged.error_message.is_none());
    }

    #[test]
    fn test_quick_result_only_while_pending() {
        let coordinator = coordinator();
        let job = coordinator.create_job().unwrap();

        let quick = vec![item("김치찌개", SafetyStatus::Danger)];
        coordinator
            .record_quick_result(job.job_id, quick.clone())
            .unwrap();

        let pending = coordinator.get_job(job.job_id).unwrap();
        assert_eq!(pending.status, JobStatus::Pending);
        assert!(pending.quick_result.is_some());

        coordinator
            .complete_job(job.job_id, quick.clone(), timings(2))
            .unwrap();

        let late = coordinator.record_quick_result(job.job_id, quick);
        assert!(matches!(late, Err(JobError::AlreadyTerminal(_, _))));
    }

    #[test]
    fn test_out_of_range_ttl_clamps_to_one_hour() {
        let store = Arc::new(InMemoryJobStore::new(Duration::from_secs(u64::MAX)));
        let coordinator = JobCoordinator::new(store.clone());

        let job = coordinator.create_job().unwrap();
        coordinator
            .complete_job(job.job_id, Vec::new(), StageTimings::new())
            .unwrap();

        // Under the clamped 1-hour TTL the job expires; the unclamped
        // value would have kept it forever.
        let later = Utc::now() + chrono::Duration::hours(2);
        assert_eq!(store.sweep_expired(later), 1);
    }

    #[test]
    fn test_sweeper_drops_only_expired_terminal_jobs() {
        let store = Arc::new(InMemoryJobStore::new(Duration::from_secs(60)));
        let coordinator = JobCoordinator::new(store.clone());

        let pending = coordinator.create_job().unwrap();
        let finished = coordinator.create_job().unwrap();
        coordinator
            .complete_job(finished.job_id, Vec::new(), StageTimings::new())
            .unwrap();

        // Nothing is old enough yet.
        assert_eq!(store.sweep_expired(Utc::now()), 0);

        // Two minutes later the finished job has outlived its TTL; the
        // pending one is retained regardless of age.
        let later = Utc::now() + chrono::Duration::minutes(2);
        assert_eq!(store.sweep_expired(later), 1);
        assert!(coordinator.get_job(pending.job_id).is_ok());
        assert!(matches!(
            coordinator.get_job(finished.job_id),
            Err(JobError::NotFound)
        ));
    }
}
