//! Registry lookup integration
//!
//! This module provides:
//! - [`RegistryLookup`] - the seam between the verifier and the registry
//! - [`HttpRegistry`] - bearer-authenticated HTTP implementation
//! - [`RegistryPayload`] - the JSON body returned on success

pub mod client;
pub mod types;

use async_trait::async_trait;

use crate::credential::Credential;
use crate::error::TransportError;

pub use client::{HttpRegistry, RegistryConfig};
pub use types::{RegistryPayload, RegistryReply};

/// Performs one raw lookup against the registry.
///
/// Implementations report transport failures as `Err` and every HTTP
/// response (whatever its status) as `Ok`. Status interpretation and retry
/// decisions belong to the verifier.
#[async_trait]
pub trait RegistryLookup: Send + Sync {
    async fn lookup(
        &self,
        key: &str,
        credential: &Credential,
    ) -> Result<RegistryReply, TransportError>;
}
