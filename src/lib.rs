//! Batch Verify - concurrent identity verification against an external registry
//!
//! Each input record (a lookup key plus claimed name fields) is checked against
//! an authoritative registry. Records are verified concurrently and streamed to
//! the consumer as soon as each one resolves.
//!
//! ## Call chain
//! Raw text -> BatchParser -> Dispatcher -> VerificationClient (+ Comparator) -> ResultStream
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use batch_verify::{
//!     parse_batch, Credential, Dispatcher, DispatchConfig, HttpRegistry, RegistryConfig,
//!     RetryPolicy, TokioSleeper, VerificationClient,
//! };
//!
//! # async fn run() -> anyhow::Result<()> {
//! let records = parse_batch("12345678\n87654321", "Juan\tPerez\tLopez\nMaria\tGarcia\t");
//! let registry = Arc::new(HttpRegistry::new(RegistryConfig::default())?);
//! let client = VerificationClient::new(
//!     registry,
//!     Credential::new("secret-token"),
//!     RetryPolicy::default(),
//!     Arc::new(TokioSleeper),
//! );
//! let dispatcher = Dispatcher::new(DispatchConfig::default(), Arc::new(TokioSleeper))?;
//! let mut stream = dispatcher.dispatch(records, client);
//! while let Some(record) = stream.next().await {
//!     println!("{} -> {:?}", record.id, record.status);
//! }
//! # Ok(())
//! # }
//! ```

// Core error handling
pub mod error;

// Record model and the pure stages
pub mod comparator;
pub mod parser;
pub mod record;

// Concurrency core
pub mod clock;
pub mod dispatcher;
pub mod registry;
pub mod stream;
pub mod verifier;

// Collaborators: configuration, credential storage, markup
pub mod config;
pub mod credential;
pub mod render;

// HTTP front end (streaming HTML + SSE)
#[cfg(feature = "server")]
pub mod server;

pub use clock::{Sleeper, TokioSleeper};
pub use comparator::compare;
pub use config::VerifyConfig;
pub use credential::{Credential, TokenStore};
pub use dispatcher::{DispatchConfig, Dispatcher};
pub use error::{ConfigError, CredentialError, LookupError, RenderError, SinkError, TransportError};
pub use parser::parse_batch;
pub use record::{MatchFlags, NameFields, Record, RecordStatus};
pub use registry::{HttpRegistry, RegistryConfig, RegistryLookup, RegistryPayload, RegistryReply};
pub use render::Renderer;
pub use stream::{BatchSummary, ResultSink, ResultStream};
pub use verifier::{RetryPolicy, VerificationClient};
