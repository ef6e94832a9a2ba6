//! Result sinks that feed streaming HTTP bodies

use std::convert::Infallible;
use std::sync::Arc;

use async_trait::async_trait;
use axum::response::sse::Event;
use serde::Serialize;
use serde_json::json;
use tokio::sync::mpsc;

use crate::error::SinkError;
use crate::record::Record;
use crate::render::Renderer;
use crate::stream::{BatchSummary, ResultSink};

/// Writes the results page as HTML chunks: head, one script per record, tail.
pub struct HtmlChunkSink {
    renderer: Arc<Renderer>,
    head: Option<String>,
    chunks: mpsc::Sender<Result<String, Infallible>>,
}

impl HtmlChunkSink {
    pub fn new(
        renderer: Arc<Renderer>,
        head: String,
        chunks: mpsc::Sender<Result<String, Infallible>>,
    ) -> Self {
        Self {
            renderer,
            head: Some(head),
            chunks,
        }
    }

    async fn write(&self, chunk: String) -> Result<(), SinkError> {
        self.chunks
            .send(Ok(chunk))
            .await
            .map_err(|_| SinkError::Closed)
    }
}

#[async_trait]
impl ResultSink for HtmlChunkSink {
    async fn begin(&mut self, _total: usize) -> Result<(), SinkError> {
        match self.head.take() {
            Some(head) => self.write(head).await,
            None => Ok(()),
        }
    }

    async fn emit(&mut self, record: &Record) -> Result<(), SinkError> {
        let script = self
            .renderer
            .update_script(record)
            .map_err(|e| SinkError::Write(e.to_string()))?;
        self.write(script).await
    }

    async fn finish(&mut self, summary: &BatchSummary) -> Result<(), SinkError> {
        let tail = self
            .renderer
            .completion_script(summary)
            .map_err(|e| SinkError::Write(e.to_string()))?;
        self.write(tail).await
    }
}

/// Emits `start`, `record` and `done` server-sent events.
pub struct SseSink {
    events: mpsc::Sender<Result<Event, Infallible>>,
}

impl SseSink {
    pub fn new(events: mpsc::Sender<Result<Event, Infallible>>) -> Self {
        Self { events }
    }

    async fn send<T: Serialize>(&self, name: &str, data: &T) -> Result<(), SinkError> {
        let event = Event::default()
            .event(name)
            .json_data(data)
            .map_err(|e| SinkError::Write(e.to_string()))?;
        self.events
            .send(Ok(event))
            .await
            .map_err(|_| SinkError::Closed)
    }
}

#[async_trait]
impl ResultSink for SseSink {
    async fn begin(&mut self, total: usize) -> Result<(), SinkError> {
        self.send("start", &json!({ "total": total })).await
    }

    async fn emit(&mut self, record: &Record) -> Result<(), SinkError> {
        self.send("record", &record.view()).await
    }

    async fn finish(&mut self, summary: &BatchSummary) -> Result<(), SinkError> {
        self.send("done", summary).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LookupError;
    use crate::record::NameFields;
    use chrono::Utc;
    use uuid::Uuid;

    fn summary() -> BatchSummary {
        BatchSummary {
            batch_id: Uuid::new_v4(),
            total: 1,
            resolved: 0,
            failed: 1,
            started_at: Utc::now(),
            elapsed_ms: 5,
        }
    }

    #[tokio::test]
    async fn test_html_sink_writes_head_rows_tail() {
        let (tx, mut rx) = mpsc::channel(8);
        let renderer = Arc::new(Renderer::new().unwrap());
        let mut sink = HtmlChunkSink::new(renderer, "<head-chunk>".to_string(), tx);

        let record =
            Record::pending(0, "1", NameFields::default()).fail(LookupError::Http { status: 404 });
        sink.begin(1).await.unwrap();
        sink.emit(&record).await.unwrap();
        sink.finish(&summary()).await.unwrap();
        drop(sink);

        let mut chunks = Vec::new();
        while let Some(Ok(chunk)) = rx.recv().await {
            chunks.push(chunk);
        }
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0], "<head-chunk>");
        assert!(chunks[1].starts_with("<script>updateRow(0,"));
        assert!(chunks[2].contains("batchComplete(0, 1)"));
    }

    #[tokio::test]
    async fn test_closed_receiver_reports_closed() {
        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        let mut sink = SseSink::new(tx);
        assert_eq!(sink.begin(3).await, Err(SinkError::Closed));
    }
}
