//! # Core Type Definitions
//!
//! This module contains the core types shared by every Casefile component:
//! - Record identifiers and the explicit kind discriminant (`RecordId`, `RecordKind`)
//! - Record metadata and attachment references (`RecordMeta`, `Attachment`)
//! - The nine record shapes and the `Record` sum type (see `record`)
//! - Error types (`CasefileError`)
//!
//! ## Soft Links
//!
//! Linked records point at a person through a plain string (`primaryLinkKey`,
//! or `involvedKey` for corporate affiliations). No referential integrity is
//! enforced: a key may name a person that does not exist, and a person may be
//! referenced by any number of records.

mod record;

pub use record::{
    Company, CorporateAffiliation, FinancialTransaction, Occurrence, Person, Phone, Property,
    Record, SocialProfile, Vehicle,
};

use serde::{Deserialize, Serialize};
use thiserror::Error;

// =============================================================================
// RECORD IDENTIFIERS
// =============================================================================

/// Server-generated identifier of a record, unique within its collection.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(transparent)]
pub struct RecordId(pub u64);

impl std::fmt::Display for RecordId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// =============================================================================
// RECORD KIND (explicit discriminant)
// =============================================================================

/// The kind of a record.
///
/// Every record carries its kind explicitly. Display fields, edit forms and
/// save routing all dispatch on this tag with an exhaustive `match`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    Person,
    Company,
    Property,
    Vehicle,
    Phone,
    SocialProfile,
    FinancialTransaction,
    CorporateAffiliation,
    Occurrence,
}

impl RecordKind {
    /// All kinds, in collection iteration order.
    pub const ALL: [RecordKind; 9] = [
        RecordKind::Person,
        RecordKind::Company,
        RecordKind::Property,
        RecordKind::Vehicle,
        RecordKind::Phone,
        RecordKind::SocialProfile,
        RecordKind::FinancialTransaction,
        RecordKind::CorporateAffiliation,
        RecordKind::Occurrence,
    ];

    /// Kinds that link to a person through a soft key, in board layout order.
    pub const LINKED: [RecordKind; 7] = [
        RecordKind::Company,
        RecordKind::Property,
        RecordKind::Vehicle,
        RecordKind::Phone,
        RecordKind::SocialProfile,
        RecordKind::FinancialTransaction,
        RecordKind::CorporateAffiliation,
    ];

    /// REST collection name (`/api/<collection>`).
    #[must_use]
    pub const fn collection(self) -> &'static str {
        match self {
            RecordKind::Person => "persons",
            RecordKind::Company => "companies",
            RecordKind::Property => "properties",
            RecordKind::Vehicle => "vehicles",
            RecordKind::Phone => "phones",
            RecordKind::SocialProfile => "social-profiles",
            RecordKind::FinancialTransaction => "financial-transactions",
            RecordKind::CorporateAffiliation => "corporate-affiliations",
            RecordKind::Occurrence => "occurrences",
        }
    }

    /// Resolve a collection name back to its kind.
    #[must_use]
    pub fn from_collection(name: &str) -> Option<RecordKind> {
        Self::ALL.into_iter().find(|k| k.collection() == name)
    }

    /// Human-readable label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            RecordKind::Person => "Person",
            RecordKind::Company => "Company",
            RecordKind::Property => "Property",
            RecordKind::Vehicle => "Vehicle",
            RecordKind::Phone => "Phone number",
            RecordKind::SocialProfile => "Social profile",
            RecordKind::FinancialTransaction => "Financial transaction",
            RecordKind::CorporateAffiliation => "Corporate affiliation",
            RecordKind::Occurrence => "Occurrence",
        }
    }

    /// Node colour used on the board.
    #[must_use]
    pub const fn color(self) -> &'static str {
        match self {
            RecordKind::Person => "#dc2626",
            RecordKind::Company => "#2563eb",
            RecordKind::Property => "#16a34a",
            RecordKind::Vehicle => "#ca8a04",
            RecordKind::Phone => "#9333ea",
            RecordKind::SocialProfile => "#db2777",
            RecordKind::FinancialTransaction => "#0d9488",
            RecordKind::CorporateAffiliation => "#ea580c",
            RecordKind::Occurrence => "#4b5563",
        }
    }

    /// Whether records of this kind link to a person through a soft key.
    #[must_use]
    pub fn is_linked(self) -> bool {
        Self::LINKED.contains(&self)
    }
}

impl std::fmt::Display for RecordKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.collection())
    }
}

// =============================================================================
// RECORD METADATA
// =============================================================================

/// Bookkeeping fields shared by every record.
///
/// `version` starts at 1 on insert and is bumped by every update. Clients may
/// send it back with an update to detect concurrent edits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct RecordMeta {
    pub id: RecordId,
    pub version: u64,
    pub created_by: Option<String>,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}

/// Fields owned by the store. Client patches never overwrite them.
pub const META_FIELDS: [&str; 5] = ["id", "version", "createdBy", "createdAt", "updatedAt"];

// =============================================================================
// ATTACHMENT
// =============================================================================

/// Reference to an externally stored file.
///
/// Records hold references only, never inline bytes: `url` must point at the
/// upload area (or any other http location), not be a `data:` URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct Attachment {
    pub name: String,
    #[serde(rename = "type")]
    pub content_type: String,
    pub size: u64,
    pub url: String,
    pub uploaded_at: String,
}

impl Attachment {
    /// Whether the attachment embeds its payload instead of referencing it.
    #[must_use]
    pub fn is_inline(&self) -> bool {
        self.url.trim_start().to_ascii_lowercase().starts_with("data:")
    }
}

// =============================================================================
// ERROR TYPES
// =============================================================================

/// Errors that can occur in Casefile.
///
/// - No silent failures
/// - Use `Result<T, CasefileError>` for fallible operations
/// - The CORE should never panic; all errors must be recoverable
#[derive(Debug, Error)]
pub enum CasefileError {
    /// The requested record was not found.
    #[error("Record not found: {0}/{1}")]
    RecordNotFound(RecordKind, RecordId),

    /// An update carried a stale version.
    #[error("Version conflict on {kind}/{id}: expected {expected}, found {found}")]
    VersionConflict {
        kind: RecordKind,
        id: RecordId,
        expected: u64,
        found: u64,
    },

    /// The record payload is invalid.
    #[error("Invalid record: {0}")]
    InvalidRecord(String),

    /// A board node identifier could not be parsed.
    #[error("Invalid node id: {0}")]
    InvalidNodeId(String),

    /// A serialization or deserialization error occurred.
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    IoError(String),
}

impl From<serde_json::Error> for CasefileError {
    fn from(e: serde_json::Error) -> Self {
        CasefileError::SerializationError(e.to_string())
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collection_names_round_trip() {
        for kind in RecordKind::ALL {
            assert_eq!(RecordKind::from_collection(kind.collection()), Some(kind));
        }
        assert_eq!(RecordKind::from_collection("suspects"), None);
    }

    #[test]
    fn only_occurrence_and_person_are_unlinked() {
        let unlinked: Vec<_> = RecordKind::ALL
            .into_iter()
            .filter(|k| !k.is_linked())
            .collect();
        assert_eq!(unlinked, vec![RecordKind::Person, RecordKind::Occurrence]);
    }

    #[test]
    fn data_url_attachment_is_inline() {
        let inline = Attachment {
            url: "data:image/png;base64,AAAA".to_string(),
            ..Attachment::default()
        };
        let hosted = Attachment {
            url: "/uploads/photo.png".to_string(),
            ..Attachment::default()
        };
        assert!(inline.is_inline());
        assert!(!hosted.is_inline());
    }

    #[test]
    fn kind_serializes_snake_case() {
        let json = serde_json::to_string(&RecordKind::SocialProfile).expect("serialize");
        assert_eq!(json, "\"social_profile\"");
    }
}
