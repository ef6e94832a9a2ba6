//! Shared fakes for integration tests

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use tokio::time::Instant;

use batch_verify::{
    Credential, DispatchConfig, Dispatcher, RegistryLookup, RegistryReply, RetryPolicy, Sleeper,
    TransportError, VerificationClient,
};

/// One scripted registry answer
#[derive(Debug, Clone)]
pub enum Step {
    Reply(u16, String),
    Transport,
    Panic,
}

pub fn person(given: &str, first: &str, second: &str) -> Step {
    Step::Reply(
        200,
        json!({
            "first_name": given,
            "first_last_name": first,
            "second_last_name": second,
        })
        .to_string(),
    )
}

pub fn status(code: u16) -> Step {
    Step::Reply(code, String::new())
}

/// In-memory registry with per-key scripts and concurrency tracking.
///
/// Each key walks its script one step per call; the last step repeats.
/// Unknown keys get 404.
#[derive(Default)]
pub struct FakeRegistry {
    scripts: HashMap<String, Vec<Step>>,
    calls: Mutex<HashMap<String, usize>>,
    latency: Duration,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
    started: Mutex<Vec<(String, Instant)>>,
}

impl FakeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn script(mut self, key: &str, steps: Vec<Step>) -> Self {
        self.scripts.insert(key.to_string(), steps);
        self
    }

    pub fn calls(&self, key: &str) -> usize {
        self.calls.lock().unwrap().get(key).copied().unwrap_or(0)
    }

    pub fn total_calls(&self) -> usize {
        self.calls.lock().unwrap().values().sum()
    }

    pub fn peak_in_flight(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    /// Keys in the order their first call started, with start time
    pub fn started(&self) -> Vec<(String, Instant)> {
        self.started.lock().unwrap().clone()
    }

    fn next_step(&self, key: &str) -> Step {
        let attempt = {
            let mut calls = self.calls.lock().unwrap();
            let count = calls.entry(key.to_string()).or_insert(0);
            *count += 1;
            *count - 1
        };
        match self.scripts.get(key) {
            Some(steps) if !steps.is_empty() => steps[attempt.min(steps.len() - 1)].clone(),
            _ => status(404),
        }
    }
}

struct InFlight<'a>(&'a AtomicUsize);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl RegistryLookup for FakeRegistry {
    async fn lookup(
        &self,
        key: &str,
        _credential: &Credential,
    ) -> Result<RegistryReply, TransportError> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        let _guard = InFlight(&self.in_flight);
        self.peak.fetch_max(now, Ordering::SeqCst);
        self.started
            .lock()
            .unwrap()
            .push((key.to_string(), Instant::now()));

        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        match self.next_step(key) {
            Step::Reply(code, body) => Ok(RegistryReply::new(code, body)),
            Step::Transport => Err(TransportError::Connect("connection refused".to_string())),
            Step::Panic => panic!("registry exploded for {key}"),
        }
    }
}

/// Sleeper that records every requested wait, then sleeps on tokio time.
#[derive(Default)]
pub struct RecordingSleeper {
    waits: Mutex<Vec<Duration>>,
}

impl RecordingSleeper {
    pub fn waits(&self) -> Vec<Duration> {
        self.waits.lock().unwrap().clone()
    }

    pub fn total(&self) -> Duration {
        self.waits().into_iter().sum()
    }
}

#[async_trait]
impl Sleeper for RecordingSleeper {
    async fn sleep(&self, duration: Duration) {
        self.waits.lock().unwrap().push(duration);
        tokio::time::sleep(duration).await;
    }
}

pub fn unit_policy(max_retries: u32) -> RetryPolicy {
    RetryPolicy {
        max_retries,
        backoff_unit: Duration::from_secs(1),
    }
}

pub fn client(
    registry: Arc<FakeRegistry>,
    policy: RetryPolicy,
    sleeper: Arc<RecordingSleeper>,
) -> VerificationClient {
    VerificationClient::new(registry, Credential::new("test-token"), policy, sleeper)
}

pub fn dispatcher(max_workers: usize, delay: Duration, sleeper: Arc<RecordingSleeper>) -> Dispatcher {
    Dispatcher::new(
        DispatchConfig {
            max_workers,
            launch_delay: delay,
        },
        sleeper,
    )
    .unwrap()
}
