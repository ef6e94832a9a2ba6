//! Verification record model
//!
//! A [`Record`] is created `Pending` by the parser and moves to exactly one
//! terminal state. Authoritative fields and match flags only exist inside
//! [`RecordStatus::Resolved`], so they cannot be observed on any other state.

use serde::{Deserialize, Serialize};

use crate::error::LookupError;

/// The three name fields compared against the registry
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NameFields {
    pub given_name: String,
    pub first_surname: String,
    pub second_surname: String,
}

impl NameFields {
    pub fn new(
        given_name: impl Into<String>,
        first_surname: impl Into<String>,
        second_surname: impl Into<String>,
    ) -> Self {
        Self {
            given_name: given_name.into(),
            first_surname: first_surname.into(),
            second_surname: second_surname.into(),
        }
    }

    /// Fields in display order
    pub fn as_array(&self) -> [&str; 3] {
        [
            &self.given_name,
            &self.first_surname,
            &self.second_surname,
        ]
    }
}

/// Per-field equality flags, meaningful only for resolved records
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchFlags {
    pub given_name: bool,
    pub first_surname: bool,
    pub second_surname: bool,
}

impl MatchFlags {
    pub fn all(&self) -> bool {
        self.given_name && self.first_surname && self.second_surname
    }

    pub fn as_array(&self) -> [bool; 3] {
        [self.given_name, self.first_surname, self.second_surname]
    }
}

/// Lifecycle state of a record
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordStatus {
    Pending,
    Resolved {
        authoritative: NameFields,
        matches: MatchFlags,
    },
    Failed {
        error: LookupError,
    },
}

/// One unit of work and of output
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    /// Sequential parse-time identifier, used only for correlation
    pub id: usize,
    /// External lookup key
    pub key: String,
    /// Names as claimed by the caller
    pub input: NameFields,
    pub status: RecordStatus,
}

impl Record {
    pub fn pending(id: usize, key: impl Into<String>, input: NameFields) -> Self {
        Self {
            id,
            key: key.into(),
            input,
            status: RecordStatus::Pending,
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self.status, RecordStatus::Pending)
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self.status, RecordStatus::Resolved { .. })
    }

    pub fn is_failed(&self) -> bool {
        matches!(self.status, RecordStatus::Failed { .. })
    }

    pub fn authoritative(&self) -> Option<&NameFields> {
        match &self.status {
            RecordStatus::Resolved { authoritative, .. } => Some(authoritative),
            _ => None,
        }
    }

    pub fn matches(&self) -> Option<MatchFlags> {
        match &self.status {
            RecordStatus::Resolved { matches, .. } => Some(*matches),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&LookupError> {
        match &self.status {
            RecordStatus::Failed { error } => Some(error),
            _ => None,
        }
    }

    /// Pending -> Resolved. Terminal records are returned unchanged.
    pub(crate) fn resolve(mut self, authoritative: NameFields, matches: MatchFlags) -> Self {
        debug_assert!(self.is_pending(), "record {} already terminal", self.id);
        if self.is_pending() {
            self.status = RecordStatus::Resolved {
                authoritative,
                matches,
            };
        }
        self
    }

    /// Pending -> Failed. Terminal records are returned unchanged.
    pub(crate) fn fail(mut self, error: LookupError) -> Self {
        debug_assert!(self.is_pending(), "record {} already terminal", self.id);
        if self.is_pending() {
            self.status = RecordStatus::Failed { error };
        }
        self
    }

    /// Flat serializable form used by JSON outputs
    pub fn view(&self) -> RecordView {
        RecordView {
            id: self.id,
            key: self.key.clone(),
            status: match self.status {
                RecordStatus::Pending => "pending",
                RecordStatus::Resolved { .. } => "resolved",
                RecordStatus::Failed { .. } => "failed",
            },
            input: self.input.clone(),
            authoritative: self.authoritative().cloned(),
            matches: self.matches(),
            error: self.error().map(|e| e.tag()),
            error_detail: self.error().map(|e| e.to_string()),
        }
    }
}

/// JSON shape of a record
#[derive(Debug, Clone, Serialize)]
pub struct RecordView {
    pub id: usize,
    pub key: String,
    pub status: &'static str,
    pub input: NameFields,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub authoritative: Option<NameFields>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matches: Option<MatchFlags>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_detail: Option<String>,
}
