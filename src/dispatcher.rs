//! Paced, bounded dispatch of verification tasks
//!
//! Two independent throttles apply:
//! - **Pacing**: the launch loop sleeps `launch_delay` before every spawn,
//!   whether or not a permit is free.
//! - **Permit pool**: each task holds one of `max_workers` permits from
//!   before its lookup until its result is accepted by the stream, so at most
//!   `max_workers` lookups are ever in flight and an undrained stream stalls
//!   producers.
//!
//! Launch order follows input order; completion order does not. The result
//! channel closes only after the completion barrier has joined every task.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use tokio::sync::{mpsc, Semaphore};
use tokio::task::JoinSet;
use tracing::{debug, error, info, info_span, Instrument};
use uuid::Uuid;

use crate::clock::Sleeper;
use crate::error::{ConfigError, LookupError, SinkError};
use crate::record::Record;
use crate::stream::{self, BatchSummary, ResultSink, ResultStream};
use crate::verifier::VerificationClient;

const DEFAULT_MAX_WORKERS: usize = 3;
const DEFAULT_LAUNCH_DELAY: Duration = Duration::from_millis(200);

/// Throughput limits for one batch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchConfig {
    /// Maximum concurrent in-flight lookups (W)
    pub max_workers: usize,
    /// Minimum spacing between task launches (D)
    pub launch_delay: Duration,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            max_workers: DEFAULT_MAX_WORKERS,
            launch_delay: DEFAULT_LAUNCH_DELAY,
        }
    }
}

/// Spawns one verification task per record
pub struct Dispatcher {
    config: DispatchConfig,
    sleeper: Arc<dyn Sleeper>,
}

impl Dispatcher {
    pub fn new(config: DispatchConfig, sleeper: Arc<dyn Sleeper>) -> Result<Self, ConfigError> {
        if config.max_workers == 0 {
            return Err(ConfigError::ZeroWorkers);
        }
        Ok(Self { config, sleeper })
    }

    /// Start the batch and return its result stream immediately.
    ///
    /// Must be called from within a tokio runtime. The batch runs to
    /// completion even if the returned stream is dropped.
    pub fn dispatch(&self, records: Vec<Record>, client: VerificationClient) -> ResultStream {
        let batch_id = Uuid::new_v4();
        let total = records.len();
        let (sender, results) = stream::channel(batch_id, total, self.config.max_workers);

        let span = info_span!("batch", %batch_id, total);
        tokio::spawn(
            launch_loop(
                records,
                client,
                sender,
                self.config,
                Arc::clone(&self.sleeper),
            )
            .instrument(span),
        );

        results
    }

    /// Dispatch and feed every result into `sink`.
    pub async fn run<S>(
        &self,
        records: Vec<Record>,
        client: VerificationClient,
        sink: &mut S,
    ) -> Result<BatchSummary, SinkError>
    where
        S: ResultSink + ?Sized,
    {
        self.dispatch(records, client).drain_into(sink).await
    }
}

/// Launch every record, wait for all of them, return (resolved, failed).
async fn launch_loop(
    records: Vec<Record>,
    client: VerificationClient,
    sender: mpsc::Sender<Record>,
    config: DispatchConfig,
    sleeper: Arc<dyn Sleeper>,
) -> (usize, usize) {
    info!(
        max_workers = config.max_workers,
        launch_delay_ms = config.launch_delay.as_millis() as u64,
        "Batch started"
    );

    let permits = Arc::new(Semaphore::new(config.max_workers));
    let mut tasks = JoinSet::new();

    for record in records {
        sleeper.sleep(config.launch_delay).await;

        debug!(id = record.id, "Launching verification task");
        tasks.spawn(
            verify_one(
                record,
                client.clone(),
                Arc::clone(&permits),
                sender.clone(),
            )
            .in_current_span(),
        );
    }

    // Completion barrier: the channel stays open until every task has joined.
    let (mut resolved, mut failed) = (0usize, 0usize);
    while let Some(result) = tasks.join_next().await {
        match result {
            Ok(true) => resolved += 1,
            Ok(false) => failed += 1,
            Err(e) => error!(error = %e, "Verification task aborted"),
        }
    }
    drop(sender);

    info!(resolved, failed, "Batch complete");
    (resolved, failed)
}

/// One record's lifetime: permit, verify, emit, release.
///
/// The permit is held until the record has been handed to the stream, so a
/// consumer that stops draining stalls new lookups after at most
/// `max_workers` completions beyond the channel buffer. Returns whether the
/// record resolved.
async fn verify_one(
    record: Record,
    client: VerificationClient,
    permits: Arc<Semaphore>,
    sender: mpsc::Sender<Record>,
) -> bool {
    let fallback = record.clone();

    let (verified, permit) = match permits.acquire_owned().await {
        Ok(permit) => {
            let outcome = AssertUnwindSafe(client.verify(record)).catch_unwind().await;
            let verified = outcome.unwrap_or_else(|panic| {
                fallback.fail(LookupError::Internal {
                    message: panic_message(panic.as_ref()),
                })
            });
            (verified, Some(permit))
        }
        Err(_) => (
            fallback.fail(LookupError::Internal {
                message: "permit pool closed".to_string(),
            }),
            None,
        ),
    };

    let id = verified.id;
    let resolved = verified.is_resolved();
    if sender.send(verified).await.is_err() {
        debug!(id, "Result stream dropped, discarding record");
    }
    drop(permit);

    resolved
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "verification panicked".to_string()
    }
}
