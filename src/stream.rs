//! Out-of-order result delivery
//!
//! Many verification tasks send into one bounded channel; a single consumer
//! drains it. Delivery order is completion order. The channel closes once the
//! dispatcher's completion barrier has seen every task finish, so `None` from
//! [`ResultStream::next`] means every record is terminal.

use std::time::Instant;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::stream::{self, Stream};
use serde::Serialize;
use tokio::sync::mpsc;
use tracing::warn;
use uuid::Uuid;

use crate::error::SinkError;
use crate::record::Record;

/// Counts for a finished (or in-progress) batch
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchSummary {
    pub batch_id: Uuid,
    pub total: usize,
    pub resolved: usize,
    pub failed: usize,
    pub started_at: DateTime<Utc>,
    pub elapsed_ms: u64,
}

impl BatchSummary {
    pub fn delivered(&self) -> usize {
        self.resolved + self.failed
    }

    pub fn is_complete(&self) -> bool {
        self.delivered() == self.total
    }
}

/// Consumer-side output adapter (chunked HTML, SSE, terminal, ...)
#[async_trait]
pub trait ResultSink: Send {
    /// Called once before any record, with the batch size for progress display
    async fn begin(&mut self, _total: usize) -> Result<(), SinkError> {
        Ok(())
    }

    /// Called once per terminal record, in completion order
    async fn emit(&mut self, record: &Record) -> Result<(), SinkError>;

    /// Explicit end-of-stream, called after every record has been emitted
    async fn finish(&mut self, summary: &BatchSummary) -> Result<(), SinkError>;
}

#[async_trait]
impl ResultSink for Vec<Record> {
    async fn emit(&mut self, record: &Record) -> Result<(), SinkError> {
        self.push(record.clone());
        Ok(())
    }

    async fn finish(&mut self, _summary: &BatchSummary) -> Result<(), SinkError> {
        Ok(())
    }
}

/// Create the producer/consumer pair for one batch.
pub(crate) fn channel(
    batch_id: Uuid,
    total: usize,
    capacity: usize,
) -> (mpsc::Sender<Record>, ResultStream) {
    let (sender, receiver) = mpsc::channel(capacity.max(1));
    let stream = ResultStream {
        batch_id,
        total,
        receiver,
        started_at: Utc::now(),
        started: Instant::now(),
        resolved: 0,
        failed: 0,
    };
    (sender, stream)
}

/// Receiving end of a batch
pub struct ResultStream {
    batch_id: Uuid,
    total: usize,
    receiver: mpsc::Receiver<Record>,
    started_at: DateTime<Utc>,
    started: Instant,
    resolved: usize,
    failed: usize,
}

impl ResultStream {
    pub fn batch_id(&self) -> Uuid {
        self.batch_id
    }

    /// Number of records in the batch, known before any completes
    pub fn total(&self) -> usize {
        self.total
    }

    /// Next terminal record, or `None` once the batch is complete.
    pub async fn next(&mut self) -> Option<Record> {
        let record = self.receiver.recv().await?;
        if record.is_resolved() {
            self.resolved += 1;
        } else if record.is_failed() {
            self.failed += 1;
        }
        Some(record)
    }

    /// Counts so far; complete once `next` has returned `None`.
    pub fn summary(&self) -> BatchSummary {
        BatchSummary {
            batch_id: self.batch_id,
            total: self.total,
            resolved: self.resolved,
            failed: self.failed,
            started_at: self.started_at,
            elapsed_ms: self.started.elapsed().as_millis() as u64,
        }
    }

    /// Drain everything, in delivery order.
    pub async fn collect(mut self) -> (Vec<Record>, BatchSummary) {
        let mut records = Vec::with_capacity(self.total);
        while let Some(record) = self.next().await {
            records.push(record);
        }
        let summary = self.summary();
        (records, summary)
    }

    /// Feed the whole batch into `sink`.
    ///
    /// A sink error stops further calls on the sink, but the stream is still
    /// drained so producers never stall; the first error is returned.
    pub async fn drain_into<S>(mut self, sink: &mut S) -> Result<BatchSummary, SinkError>
    where
        S: ResultSink + ?Sized,
    {
        let mut first_error = sink.begin(self.total).await.err();

        while let Some(record) = self.next().await {
            if first_error.is_some() {
                continue;
            }
            if let Err(e) = sink.emit(&record).await {
                warn!(batch_id = %self.batch_id, error = %e, "Sink failed, draining remaining results");
                first_error = Some(e);
            }
        }

        let summary = self.summary();
        if first_error.is_none() {
            first_error = sink.finish(&summary).await.err();
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(summary),
        }
    }

    /// Adapt into a `futures` stream of records.
    pub fn into_stream(self) -> impl Stream<Item = Record> + Send {
        stream::unfold(self, |mut results| async move {
            results.next().await.map(|record| (record, results))
        })
    }
}
