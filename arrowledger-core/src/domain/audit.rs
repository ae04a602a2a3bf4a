//! Audit trail domain model
//!
//! Entries are append-only: nothing in the core updates or deletes them.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use uuid::Uuid;

use crate::domain::diff::FieldChange;
use crate::domain::result::{Error, Result};

/// Audited action kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuditAction {
    Login,
    Logout,
    Create,
    Update,
    Delete,
    Reorder,
    Checkbox,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditAction::Login => "login",
            AuditAction::Logout => "logout",
            AuditAction::Create => "create",
            AuditAction::Update => "update",
            AuditAction::Delete => "delete",
            AuditAction::Reorder => "reorder",
            AuditAction::Checkbox => "checkbox",
        }
    }
}

impl std::str::FromStr for AuditAction {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "login" => Ok(AuditAction::Login),
            "logout" => Ok(AuditAction::Logout),
            "create" => Ok(AuditAction::Create),
            "update" => Ok(AuditAction::Update),
            "delete" => Ok(AuditAction::Delete),
            "reorder" => Ok(AuditAction::Reorder),
            "checkbox" => Ok(AuditAction::Checkbox),
            other => Err(Error::validation(format!("Unknown audit action: {}", other))),
        }
    }
}

/// A single audit trail entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    pub id: Uuid,
    pub user_id: Option<Uuid>,
    pub action: AuditAction,
    pub transaction_id: Option<Uuid>,
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub before: Option<JsonValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub after: Option<JsonValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diff: Option<JsonValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<JsonValue>,
}

impl AuditEntry {
    /// Create a new entry stamped with the current wall clock
    pub fn new(user_id: Option<Uuid>, action: AuditAction) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            action,
            transaction_id: None,
            timestamp: Utc::now(),
            before: None,
            after: None,
            diff: None,
            meta: None,
        }
    }

    pub fn with_transaction(mut self, transaction_id: Uuid) -> Self {
        self.transaction_id = Some(transaction_id);
        self
    }

    pub fn with_before(mut self, before: JsonValue) -> Self {
        self.before = Some(before);
        self
    }

    pub fn with_after(mut self, after: JsonValue) -> Self {
        self.after = Some(after);
        self
    }

    /// Attach a field-level delta map
    pub fn with_diff(mut self, diff: &BTreeMap<String, FieldChange>) -> Self {
        self.diff = serde_json::to_value(diff).ok();
        self
    }

    /// Attach a raw diff value (used by reorder, whose diff is the two
    /// id-order lists rather than a field map)
    pub fn with_diff_value(mut self, diff: JsonValue) -> Self {
        self.diff = Some(diff);
        self
    }

    pub fn with_meta(mut self, meta: JsonValue) -> Self {
        self.meta = Some(meta);
        self
    }
}

/// Filter for the audit read side
#[derive(Debug, Clone, Default)]
pub struct AuditFilter {
    pub user_id: Option<Uuid>,
    pub action: Option<AuditAction>,
    /// Inclusive lower bound
    pub start: Option<DateTime<Utc>>,
    /// Inclusive upper bound
    pub end: Option<DateTime<Utc>>,
}
