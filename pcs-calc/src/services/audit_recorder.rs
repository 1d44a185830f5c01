//! Asynchronous call auditing
//!
//! Recording never blocks the caller: tasks go into a bounded queue drained
//! by a fixed set of worker tasks. A full queue drops the task with a warning.
//! Persistence failures are logged and swallowed.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt::Display;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::db::CallHistoryStore;
use crate::error::CalcError;
use crate::models::{CalculationRequest, CalculationResult, CallContext, CallRecord};

/// Receiver of calculation outcomes
///
/// Both methods return immediately and never fail.
pub trait AuditRecorder: Send + Sync {
    fn record_success(
        &self,
        request: &CalculationRequest,
        result: &CalculationResult,
        context: &CallContext,
    );

    fn record_failure(&self, request: &CalculationRequest, error: &CalcError, context: &CallContext);
}

/// Builds call records from calculation outcomes
pub struct CallRecordFactory;

impl CallRecordFactory {
    pub fn from_success(
        request: &CalculationRequest,
        result: &CalculationResult,
        context: &CallContext,
        at: DateTime<Utc>,
    ) -> Result<CallRecord, CalcError> {
        CallRecord::new(
            context,
            200,
            Some(Self::serialize(request)),
            Some(Self::serialize(result)),
            None,
            at,
        )
    }

    pub fn from_failure(
        request: &CalculationRequest,
        error: &CalcError,
        context: &CallContext,
        at: DateTime<Utc>,
    ) -> Result<CallRecord, CalcError> {
        CallRecord::new(
            context,
            error.status_code(),
            Some(Self::serialize(request)),
            None,
            Some(error.to_string()),
            at,
        )
    }

    /// JSON text, or the `Display` form if JSON serialization fails
    pub fn serialize<T: Serialize + Display>(value: &T) -> String {
        serde_json::to_string(value).unwrap_or_else(|e| {
            warn!("Failed to serialize audit payload as JSON: {}", e);
            value.to_string()
        })
    }
}

#[derive(Debug)]
enum AuditTask {
    Success {
        request: CalculationRequest,
        result: CalculationResult,
        context: CallContext,
        at: DateTime<Utc>,
    },
    Failure {
        request: CalculationRequest,
        error: CalcError,
        context: CallContext,
        at: DateTime<Utc>,
    },
}

impl AuditTask {
    fn into_record(self) -> Result<CallRecord, CalcError> {
        match self {
            AuditTask::Success {
                request,
                result,
                context,
                at,
            } => CallRecordFactory::from_success(&request, &result, &context, at),
            AuditTask::Failure {
                request,
                error,
                context,
                at,
            } => CallRecordFactory::from_failure(&request, &error, &context, at),
        }
    }
}

/// Audit recorder backed by a bounded worker pool
pub struct AsyncAuditRecorder {
    sender: Mutex<Option<mpsc::Sender<AuditTask>>>,
    workers: Mutex<Vec<JoinHandle<()>>>,
    dropped: AtomicU64,
}

impl AsyncAuditRecorder {
    /// Spawn `workers` tasks draining a queue of `queue_capacity` slots
    ///
    /// Must be called from within a Tokio runtime.
    pub fn start(store: Arc<dyn CallHistoryStore>, workers: usize, queue_capacity: usize) -> Self {
        let workers = workers.max(1);
        let (tx, rx) = mpsc::channel::<AuditTask>(queue_capacity.max(1));
        let rx = Arc::new(tokio::sync::Mutex::new(rx));

        let handles = (0..workers)
            .map(|worker_id| {
                let rx = Arc::clone(&rx);
                let store = Arc::clone(&store);
                tokio::spawn(async move {
                    loop {
                        let task = rx.lock().await.recv().await;
                        let Some(task) = task else {
                            break;
                        };
                        persist(store.as_ref(), task).await;
                    }
                    debug!(worker_id, "Audit worker stopped");
                })
            })
            .collect();

        info!(workers, queue_capacity, "Audit recorder started");

        Self {
            sender: Mutex::new(Some(tx)),
            workers: Mutex::new(handles),
            dropped: AtomicU64::new(0),
        }
    }

    /// Tasks discarded because the queue was full or closed
    pub fn dropped_count(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    fn submit(&self, task: AuditTask) {
        let sender = self.sender.lock().unwrap_or_else(|e| e.into_inner());
        let Some(tx) = sender.as_ref() else {
            self.dropped.fetch_add(1, Ordering::Relaxed);
            warn!("Audit recorder is shut down, dropping call record");
            return;
        };

        match tx.try_send(task) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                warn!("Audit queue full, dropping call record");
            }
            Err(TrySendError::Closed(_)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                warn!("Audit queue closed, dropping call record");
            }
        }
    }

    /// Stop accepting tasks and wait up to `grace` for queued ones to finish
    ///
    /// Returns true when every queued task was processed in time.
    pub async fn shutdown(&self, grace: Duration) -> bool {
        // Dropping the only sender lets workers exit once the queue is empty
        drop(self.sender.lock().unwrap_or_else(|e| e.into_inner()).take());

        let handles: Vec<JoinHandle<()>> =
            std::mem::take(&mut *self.workers.lock().unwrap_or_else(|e| e.into_inner()));
        let aborts: Vec<_> = handles.iter().map(|h| h.abort_handle()).collect();

        let drained = tokio::time::timeout(grace, async {
            for handle in handles {
                if let Err(e) = handle.await {
                    error!("Audit worker failed: {}", e);
                }
            }
        })
        .await
        .is_ok();

        if drained {
            info!("Audit queue drained");
        } else {
            warn!(
                grace_secs = grace.as_secs(),
                "Audit queue not drained within grace period, discarding remaining records"
            );
            for abort in aborts {
                abort.abort();
            }
        }

        drained
    }
}

async fn persist(store: &dyn CallHistoryStore, task: AuditTask) {
    let record = match task.into_record() {
        Ok(record) => record,
        Err(e) => {
            error!("Failed to build call record: {}", e);
            return;
        }
    };

    match store.save(&record).await {
        Ok(()) => debug!(id = %record.id, success = record.success, "Call record saved"),
        Err(e) => error!(id = %record.id, "Failed to save call record: {}", e),
    }
}

impl AuditRecorder for AsyncAuditRecorder {
    fn record_success(
        &self,
        request: &CalculationRequest,
        result: &CalculationResult,
        context: &CallContext,
    ) {
        self.submit(AuditTask::Success {
            request: *request,
            result: result.clone(),
            context: context.clone(),
            at: pcs_common::time::now(),
        });
    }

    fn record_failure(&self, request: &CalculationRequest, error: &CalcError, context: &CallContext) {
        self.submit(AuditTask::Failure {
            request: *request,
            error: error.clone(),
            context: context.clone(),
            at: pcs_common::time::now(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Percentage;
    use crate::pagination::{PageRequest, PageResult};
    use async_trait::async_trait;
    use rust_decimal::Decimal;
    use uuid::Uuid;

    /// Store keeping records in memory; optionally failing every save
    #[derive(Default)]
    struct MemoryStore {
        records: Mutex<Vec<CallRecord>>,
        fail: bool,
        delay: Option<Duration>,
    }

    #[async_trait]
    impl CallHistoryStore for MemoryStore {
        async fn save(&self, record: &CallRecord) -> pcs_common::Result<()> {
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            if self.fail {
                return Err(pcs_common::Error::Internal("disk full".into()));
            }
            self.records.lock().unwrap().push(record.clone());
            Ok(())
        }

        async fn find_by_id(&self, id: Uuid) -> pcs_common::Result<Option<CallRecord>> {
            Ok(self.records.lock().unwrap().iter().find(|r| r.id == id).cloned())
        }

        async fn find_all(&self, page: &PageRequest) -> pcs_common::Result<PageResult<CallRecord>> {
            let records = self.records.lock().unwrap().clone();
            let total = records.len() as u64;
            Ok(PageResult::new(records, page, total))
        }

        async fn find_by_date_range(
            &self,
            _from: DateTime<Utc>,
            _to: DateTime<Utc>,
            page: &PageRequest,
        ) -> pcs_common::Result<PageResult<CallRecord>> {
            self.find_all(page).await
        }

        async fn find_by_endpoint(
            &self,
            _endpoint: &str,
            page: &PageRequest,
        ) -> pcs_common::Result<PageResult<CallRecord>> {
            self.find_all(page).await
        }

        async fn find_successful(&self, page: &PageRequest) -> pcs_common::Result<PageResult<CallRecord>> {
            self.find_all(page).await
        }

        async fn find_failed(&self, page: &PageRequest) -> pcs_common::Result<PageResult<CallRecord>> {
            self.find_all(page).await
        }

        async fn count(&self) -> pcs_common::Result<u64> {
            Ok(self.records.lock().unwrap().len() as u64)
        }
    }

    fn request() -> CalculationRequest {
        CalculationRequest::new(Decimal::from(10), Decimal::from(20)).unwrap()
    }

    fn result() -> CalculationResult {
        CalculationResult::new(
            Decimal::new(3000, 2),
            Percentage::new(Decimal::from(15)).unwrap(),
            Decimal::new(450, 2),
            Decimal::new(3450, 2),
            false,
            Utc::now(),
        )
    }

    fn context() -> CallContext {
        CallContext::new("/api/v1/calculate", "POST")
    }

    #[test]
    fn test_factory_success_record() {
        let record =
            CallRecordFactory::from_success(&request(), &result(), &context(), Utc::now()).unwrap();
        assert_eq!(record.status_code, 200);
        assert!(record.success);
        assert!(record.request_params.as_deref().unwrap().contains("num1"));
        assert!(record.response.as_deref().unwrap().contains("result"));
        assert_eq!(record.error_message, None);
    }

    #[test]
    fn test_factory_failure_record() {
        let error = CalcError::ServiceUnavailable("Service unavailable".into());
        let record =
            CallRecordFactory::from_failure(&request(), &error, &context(), Utc::now()).unwrap();
        assert_eq!(record.status_code, 503);
        assert!(!record.success);
        assert_eq!(record.response, None);
        assert_eq!(record.error_message.as_deref(), Some("Service unavailable"));
    }

    #[tokio::test]
    async fn test_records_are_persisted_after_shutdown() {
        let store = Arc::new(MemoryStore::default());
        let recorder = AsyncAuditRecorder::start(store.clone(), 2, 10);

        recorder.record_success(&request(), &result(), &context());
        recorder.record_failure(&request(), &CalcError::calculation("bad"), &context());

        assert!(recorder.shutdown(Duration::from_secs(5)).await);
        assert_eq!(store.count().await.unwrap(), 2);
        assert_eq!(recorder.dropped_count(), 0);
    }

    #[tokio::test]
    async fn test_store_failure_is_swallowed() {
        let store = Arc::new(MemoryStore {
            fail: true,
            ..Default::default()
        });
        let recorder = AsyncAuditRecorder::start(store.clone(), 1, 10);

        recorder.record_success(&request(), &result(), &context());

        assert!(recorder.shutdown(Duration::from_secs(5)).await);
        assert_eq!(store.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_full_queue_drops_without_blocking() {
        let store = Arc::new(MemoryStore {
            delay: Some(Duration::from_millis(200)),
            ..Default::default()
        });
        let recorder = AsyncAuditRecorder::start(store.clone(), 1, 1);

        for _ in 0..10 {
            recorder.record_success(&request(), &result(), &context());
        }

        // One in flight at most, one queued; the rest were dropped
        assert!(recorder.dropped_count() >= 8);
        assert!(recorder.shutdown(Duration::from_secs(5)).await);
        assert_eq!(store.count().await.unwrap() + recorder.dropped_count(), 10);
    }

    #[tokio::test]
    async fn test_records_after_shutdown_are_dropped() {
        let store = Arc::new(MemoryStore::default());
        let recorder = AsyncAuditRecorder::start(store.clone(), 1, 10);
        assert!(recorder.shutdown(Duration::from_secs(1)).await);

        recorder.record_success(&request(), &result(), &context());
        assert_eq!(recorder.dropped_count(), 1);
    }

    #[tokio::test]
    async fn test_shutdown_gives_up_after_grace() {
        let store = Arc::new(MemoryStore {
            delay: Some(Duration::from_secs(10)),
            ..Default::default()
        });
        let recorder = AsyncAuditRecorder::start(store.clone(), 1, 10);
        recorder.record_success(&request(), &result(), &context());

        assert!(!recorder.shutdown(Duration::from_millis(50)).await);
        assert_eq!(store.count().await.unwrap(), 0);
    }
}
