//! Registry wire types

use serde::{Deserialize, Serialize};

use crate::record::NameFields;

/// Status and body of one registry response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryReply {
    pub status: u16,
    pub body: String,
}

impl RegistryReply {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == 200
    }

    /// HTTP 429, carries no machine-readable retry hint
    pub fn is_rate_limited(&self) -> bool {
        self.status == 429
    }
}

/// Successful lookup body
///
/// Missing name fields decode as empty strings; a body that is not a JSON
/// object with string fields is rejected.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryPayload {
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub first_last_name: String,
    #[serde(default)]
    pub second_last_name: String,
    #[serde(default)]
    pub message: Option<String>,
}

impl RegistryPayload {
    pub fn parse(body: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(body)
    }

    pub fn names(&self) -> NameFields {
        NameFields::new(
            self.first_name.clone(),
            self.first_last_name.clone(),
            self.second_last_name.clone(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_payload() {
        let payload = RegistryPayload::parse(
            r#"{"first_name":"JUAN","first_last_name":"PEREZ","second_last_name":"LOPEZ","message":"ok","document_number":"12345678"}"#,
        )
        .unwrap();
        assert_eq!(payload.names(), NameFields::new("JUAN", "PEREZ", "LOPEZ"));
        assert_eq!(payload.message.as_deref(), Some("ok"));
    }

    #[test]
    fn test_missing_fields_default_to_empty() {
        let payload = RegistryPayload::parse(r#"{"first_name":"ANA"}"#).unwrap();
        assert_eq!(payload.names(), NameFields::new("ANA", "", ""));
    }

    #[test]
    fn test_malformed_bodies_rejected() {
        assert!(RegistryPayload::parse("not json").is_err());
        assert!(RegistryPayload::parse("[1,2]").is_err());
        assert!(RegistryPayload::parse(r#"{"first_name":42}"#).is_err());
    }

    #[test]
    fn test_reply_classification() {
        assert!(RegistryReply::new(200, "{}").is_success());
        assert!(!RegistryReply::new(201, "{}").is_success());
        assert!(RegistryReply::new(429, "").is_rate_limited());
    }
}
