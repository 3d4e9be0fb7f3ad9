//! Record shapes.
//!
//! Each struct is the JSON body of one REST collection. Fields the board and
//! dashboard read are typed; everything else a client sends is kept verbatim
//! in `extra` so no payload is lost through a store round trip.

use super::{Attachment, CasefileError, META_FIELDS, RecordId, RecordKind, RecordMeta};
use crate::primitives::MAX_FIELD_LENGTH;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Opaque payload fields.
pub type Extra = BTreeMap<String, Value>;

/// A person. `key` is the natural identifier (a CPF-like string) every other
/// record type joins on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct Person {
    #[serde(flatten)]
    pub meta: RecordMeta,
    #[serde(alias = "cpf")]
    pub key: String,
    pub display_name: String,
    pub nickname: Option<String>,
    pub category: Option<String>,
    pub criminal_history: Option<String>,
    pub notes: Option<String>,
    pub photo_url: Option<String>,
    pub attachments: Vec<Attachment>,
    #[serde(flatten)]
    pub extra: Extra,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct Company {
    #[serde(flatten)]
    pub meta: RecordMeta,
    pub cnpj: Option<String>,
    pub name: String,
    pub trade_name: Option<String>,
    pub primary_link_key: Option<String>,
    pub notes: Option<String>,
    #[serde(flatten)]
    pub extra: Extra,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct Property {
    #[serde(flatten)]
    pub meta: RecordMeta,
    pub address: String,
    pub registry: Option<String>,
    pub property_type: Option<String>,
    pub primary_link_key: Option<String>,
    pub notes: Option<String>,
    #[serde(flatten)]
    pub extra: Extra,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct Vehicle {
    #[serde(flatten)]
    pub meta: RecordMeta,
    pub plate: String,
    pub model: Option<String>,
    pub color: Option<String>,
    pub year: Option<i32>,
    pub primary_link_key: Option<String>,
    pub notes: Option<String>,
    #[serde(flatten)]
    pub extra: Extra,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct Phone {
    #[serde(flatten)]
    pub meta: RecordMeta,
    pub number: String,
    pub carrier: Option<String>,
    pub primary_link_key: Option<String>,
    pub notes: Option<String>,
    #[serde(flatten)]
    pub extra: Extra,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct SocialProfile {
    #[serde(flatten)]
    pub meta: RecordMeta,
    pub platform: String,
    pub handle: String,
    pub url: Option<String>,
    pub primary_link_key: Option<String>,
    pub notes: Option<String>,
    #[serde(flatten)]
    pub extra: Extra,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct FinancialTransaction {
    #[serde(flatten)]
    pub meta: RecordMeta,
    pub description: String,
    /// Amount in cents. Integer to keep sums exact.
    pub amount_cents: Option<i64>,
    pub date: Option<String>,
    pub primary_link_key: Option<String>,
    pub notes: Option<String>,
    #[serde(flatten)]
    pub extra: Extra,
}

/// A person's role in a company. Links through `involved_key`, not
/// `primary_link_key`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct CorporateAffiliation {
    #[serde(flatten)]
    pub meta: RecordMeta,
    pub company_cnpj: Option<String>,
    pub company_name: String,
    pub role: Option<String>,
    pub involved_key: Option<String>,
    pub notes: Option<String>,
    #[serde(flatten)]
    pub extra: Extra,
}

/// An event. Feeds the dashboard and map; never part of the board.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct Occurrence {
    #[serde(flatten)]
    pub meta: RecordMeta,
    pub title: String,
    pub occurrence_type: Option<String>,
    pub severity: Option<String>,
    pub status: Option<String>,
    pub unit: Option<String>,
    pub responsible: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub involved_keys: Vec<String>,
    /// ISO-8601 date or date-time.
    pub occurred_at: Option<String>,
    pub description: Option<String>,
    pub attachments: Vec<Attachment>,
    #[serde(flatten)]
    pub extra: Extra,
}

// =============================================================================
// RECORD (sum type)
// =============================================================================

/// Any record, tagged with its kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Record {
    Person(Person),
    Company(Company),
    Property(Property),
    Vehicle(Vehicle),
    Phone(Phone),
    SocialProfile(SocialProfile),
    FinancialTransaction(FinancialTransaction),
    CorporateAffiliation(CorporateAffiliation),
    Occurrence(Occurrence),
}

impl Record {
    /// Parse the untagged JSON body of a collection into a record of `kind`.
    pub fn from_json(kind: RecordKind, mut value: Value) -> Result<Self, CasefileError> {
        if let Value::Object(map) = &mut value {
            map.remove("kind");
        }
        Ok(match kind {
            RecordKind::Person => Record::Person(serde_json::from_value(value)?),
            RecordKind::Company => Record::Company(serde_json::from_value(value)?),
            RecordKind::Property => Record::Property(serde_json::from_value(value)?),
            RecordKind::Vehicle => Record::Vehicle(serde_json::from_value(value)?),
            RecordKind::Phone => Record::Phone(serde_json::from_value(value)?),
            RecordKind::SocialProfile => Record::SocialProfile(serde_json::from_value(value)?),
            RecordKind::FinancialTransaction => {
                Record::FinancialTransaction(serde_json::from_value(value)?)
            }
            RecordKind::CorporateAffiliation => {
                Record::CorporateAffiliation(serde_json::from_value(value)?)
            }
            RecordKind::Occurrence => Record::Occurrence(serde_json::from_value(value)?),
        })
    }

    /// Serialize to the untagged JSON body of the record's collection.
    pub fn to_json(&self) -> Result<Value, CasefileError> {
        Ok(match self {
            Record::Person(r) => serde_json::to_value(r)?,
            Record::Company(r) => serde_json::to_value(r)?,
            Record::Property(r) => serde_json::to_value(r)?,
            Record::Vehicle(r) => serde_json::to_value(r)?,
            Record::Phone(r) => serde_json::to_value(r)?,
            Record::SocialProfile(r) => serde_json::to_value(r)?,
            Record::FinancialTransaction(r) => serde_json::to_value(r)?,
            Record::CorporateAffiliation(r) => serde_json::to_value(r)?,
            Record::Occurrence(r) => serde_json::to_value(r)?,
        })
    }

    #[must_use]
    pub fn kind(&self) -> RecordKind {
        match self {
            Record::Person(_) => RecordKind::Person,
            Record::Company(_) => RecordKind::Company,
            Record::Property(_) => RecordKind::Property,
            Record::Vehicle(_) => RecordKind::Vehicle,
            Record::Phone(_) => RecordKind::Phone,
            Record::SocialProfile(_) => RecordKind::SocialProfile,
            Record::FinancialTransaction(_) => RecordKind::FinancialTransaction,
            Record::CorporateAffiliation(_) => RecordKind::CorporateAffiliation,
            Record::Occurrence(_) => RecordKind::Occurrence,
        }
    }

    #[must_use]
    pub fn meta(&self) -> &RecordMeta {
        match self {
            Record::Person(r) => &r.meta,
            Record::Company(r) => &r.meta,
            Record::Property(r) => &r.meta,
            Record::Vehicle(r) => &r.meta,
            Record::Phone(r) => &r.meta,
            Record::SocialProfile(r) => &r.meta,
            Record::FinancialTransaction(r) => &r.meta,
            Record::CorporateAffiliation(r) => &r.meta,
            Record::Occurrence(r) => &r.meta,
        }
    }

    pub fn meta_mut(&mut self) -> &mut RecordMeta {
        match self {
            Record::Person(r) => &mut r.meta,
            Record::Company(r) => &mut r.meta,
            Record::Property(r) => &mut r.meta,
            Record::Vehicle(r) => &mut r.meta,
            Record::Phone(r) => &mut r.meta,
            Record::SocialProfile(r) => &mut r.meta,
            Record::FinancialTransaction(r) => &mut r.meta,
            Record::CorporateAffiliation(r) => &mut r.meta,
            Record::Occurrence(r) => &mut r.meta,
        }
    }

    #[must_use]
    pub fn id(&self) -> RecordId {
        self.meta().id
    }

    /// The soft key tying this record to a person.
    ///
    /// For a person this is its own `key`; occurrences have none.
    #[must_use]
    pub fn link_key(&self) -> Option<&str> {
        let key = match self {
            Record::Person(r) => Some(r.key.as_str()),
            Record::Company(r) => r.primary_link_key.as_deref(),
            Record::Property(r) => r.primary_link_key.as_deref(),
            Record::Vehicle(r) => r.primary_link_key.as_deref(),
            Record::Phone(r) => r.primary_link_key.as_deref(),
            Record::SocialProfile(r) => r.primary_link_key.as_deref(),
            Record::FinancialTransaction(r) => r.primary_link_key.as_deref(),
            Record::CorporateAffiliation(r) => r.involved_key.as_deref(),
            Record::Occurrence(_) => None,
        };
        key.filter(|k| !k.trim().is_empty())
    }

    /// Main label shown on a board node or list row.
    #[must_use]
    pub fn title(&self) -> String {
        match self {
            Record::Person(r) => r.display_name.clone(),
            Record::Company(r) => non_empty_or(&r.name, r.cnpj.as_deref()),
            Record::Property(r) => r.address.clone(),
            Record::Vehicle(r) => r.plate.clone(),
            Record::Phone(r) => r.number.clone(),
            Record::SocialProfile(r) => non_empty_or(&r.handle, Some(r.platform.as_str())),
            Record::FinancialTransaction(r) => match r.amount_cents {
                Some(cents) if r.description.is_empty() => format_cents(cents),
                _ => r.description.clone(),
            },
            Record::CorporateAffiliation(r) => {
                non_empty_or(&r.company_name, r.company_cnpj.as_deref())
            }
            Record::Occurrence(r) => r.title.clone(),
        }
    }

    /// Secondary label shown under the title.
    #[must_use]
    pub fn subtitle(&self) -> String {
        let sub = match self {
            Record::Person(r) => Some(r.key.clone()),
            Record::Company(r) => r.cnpj.clone(),
            Record::Property(r) => r.property_type.clone().or_else(|| r.registry.clone()),
            Record::Vehicle(r) => match (&r.model, r.year) {
                (Some(model), Some(year)) => Some(format!("{model} ({year})")),
                (Some(model), None) => Some(model.clone()),
                (None, Some(year)) => Some(year.to_string()),
                (None, None) => None,
            },
            Record::Phone(r) => r.carrier.clone(),
            Record::SocialProfile(r) => Some(r.platform.clone()),
            Record::FinancialTransaction(r) => r.amount_cents.map(format_cents),
            Record::CorporateAffiliation(r) => r.role.clone(),
            Record::Occurrence(r) => r.occurrence_type.clone(),
        };
        sub.unwrap_or_default()
    }

    /// Attachments carried by the record, if its kind has any.
    #[must_use]
    pub fn attachments(&self) -> &[Attachment] {
        match self {
            Record::Person(r) => &r.attachments,
            Record::Occurrence(r) => &r.attachments,
            _ => &[],
        }
    }

    #[must_use]
    pub fn as_person(&self) -> Option<&Person> {
        match self {
            Record::Person(p) => Some(p),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_occurrence(&self) -> Option<&Occurrence> {
        match self {
            Record::Occurrence(o) => Some(o),
            _ => None,
        }
    }

    /// Merge a JSON patch into this record.
    ///
    /// Top-level keys of `patch` replace the record's keys; `null` clears a
    /// field. Store-owned metadata (`id`, `version`, timestamps, `createdBy`)
    /// is never taken from the patch.
    pub fn apply_patch(&mut self, patch: &Map<String, Value>) -> Result<(), CasefileError> {
        let kind = self.kind();
        let meta = self.meta().clone();
        let mut body = match self.to_json()? {
            Value::Object(map) => map,
            _ => {
                return Err(CasefileError::SerializationError(
                    "record did not serialize to an object".to_string(),
                ));
            }
        };
        for (field, value) in patch {
            if META_FIELDS.contains(&field.as_str()) || field == "kind" {
                continue;
            }
            body.insert(field.clone(), value.clone());
        }
        let mut patched = Record::from_json(kind, Value::Object(body))?;
        *patched.meta_mut() = meta;
        *self = patched;
        Ok(())
    }

    /// Validate the record before it is stored.
    ///
    /// - a person needs a non-blank key
    /// - attachments must be references, not inline `data:` URLs
    /// - no text field may exceed `MAX_FIELD_LENGTH`
    pub fn validate(&self) -> Result<(), CasefileError> {
        if let Record::Person(p) = self {
            if p.key.trim().is_empty() {
                return Err(CasefileError::InvalidRecord(
                    "person key must not be empty".to_string(),
                ));
            }
        }
        if let Some(inline) = self.attachments().iter().find(|a| a.is_inline()) {
            return Err(CasefileError::InvalidRecord(format!(
                "attachment '{}' embeds its content; upload it and store the URL",
                inline.name
            )));
        }
        if let Some(photo) = self.as_person().and_then(|p| p.photo_url.as_deref()) {
            if photo.trim_start().to_ascii_lowercase().starts_with("data:") {
                return Err(CasefileError::InvalidRecord(
                    "photo must be an uploaded file URL".to_string(),
                ));
            }
        }
        check_lengths(&self.to_json()?)
    }
}

fn check_lengths(value: &Value) -> Result<(), CasefileError> {
    match value {
        Value::String(s) if s.len() > MAX_FIELD_LENGTH => Err(CasefileError::InvalidRecord(
            format!(
                "field length {} exceeds maximum {} bytes",
                s.len(),
                MAX_FIELD_LENGTH
            ),
        )),
        Value::Array(items) => items.iter().try_for_each(check_lengths),
        Value::Object(map) => map.values().try_for_each(check_lengths),
        _ => Ok(()),
    }
}

fn non_empty_or(primary: &str, fallback: Option<&str>) -> String {
    if primary.trim().is_empty() {
        fallback.unwrap_or_default().to_string()
    } else {
        primary.to_string()
    }
}

/// Render cents as a decimal amount, e.g. `-1234` -> `-12.34`.
fn format_cents(cents: i64) -> String {
    let sign = if cents < 0 { "-" } else { "" };
    let abs = cents.unsigned_abs();
    format!("{sign}{}.{:02}", abs / 100, abs % 100)
}

// =============================================================================
// TESTS
// =============================================================================
