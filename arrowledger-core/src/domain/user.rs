//! User domain model and role-based field authorization

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::result::{Error, Result};

/// Closed role set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Taylor,
    Dad,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Taylor => "taylor",
            Role::Dad => "dad",
        }
    }
}

impl std::str::FromStr for Role {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "admin" => Ok(Role::Admin),
            "taylor" => Ok(Role::Taylor),
            "dad" => Ok(Role::Dad),
            other => Err(Error::validation(format!(
                "Invalid role: {}. Must be admin, taylor, or dad",
                other
            ))),
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fields whose edits are gated per-role beyond the coarse route-level check
pub const PROTECTED_FIELDS: [&str; 2] = ["confirmation_taylor", "confirmation_dad"];

/// Whether `role` may mutate `field`.
///
/// Total over every (field, role) pair: admin edits any protected field,
/// each confirmation flag is otherwise owned by its namesake role, and
/// non-protected fields fall through to the coarse gate (every role in the
/// closed set is mutation-capable).
pub fn can_edit_field(field: &str, role: Role) -> bool {
    match field {
        "confirmation_taylor" => matches!(role, Role::Admin | Role::Taylor),
        "confirmation_dad" => matches!(role, Role::Admin | Role::Dad),
        _ => true,
    }
}

/// The authenticated caller of a core operation
///
/// Produced by the identity layer (HTTP session or CLI); the core only
/// consumes the role for authorization decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub user_id: Uuid,
    pub role: Role,
}

impl Identity {
    pub fn new(user_id: Uuid, role: Role) -> Self {
        Self { user_id, role }
    }
}

/// A ledger user
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    /// Stored lowercase; unique case-insensitively
    pub email: String,
    /// Argon2 PHC string; never serialized outward
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub role: Role,
    pub last_login_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn new(id: Uuid, email: impl Into<String>, password_hash: impl Into<String>, role: Role) -> Self {
        let now = Utc::now();
        Self {
            id,
            email: email.into().to_lowercase(),
            password_hash: password_hash.into(),
            role,
            last_login_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn identity(&self) -> Identity {
        Identity::new(self.id, self.role)
    }
}

/// Validate an email address shape
pub fn is_valid_email(email: &str) -> bool {
    // no-whitespace local @ no-whitespace domain with a dot
    let re = Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").unwrap();
    re.is_match(email)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_parsing() {
        assert_eq!("admin".parse::<Role>().unwrap(), Role::Admin);
        assert_eq!("taylor".parse::<Role>().unwrap(), Role::Taylor);
        assert_eq!("dad".parse::<Role>().unwrap(), Role::Dad);
        assert!("Admin".parse::<Role>().is_err());
        assert!("guest".parse::<Role>().is_err());
    }

    #[test]
    fn test_field_authorization_matrix() {
        // admin edits everything
        assert!(can_edit_field("confirmation_taylor", Role::Admin));
        assert!(can_edit_field("confirmation_dad", Role::Admin));

        // each confirmation belongs to its namesake role
        assert!(can_edit_field("confirmation_taylor", Role::Taylor));
        assert!(!can_edit_field("confirmation_taylor", Role::Dad));
        assert!(can_edit_field("confirmation_dad", Role::Dad));
        assert!(!can_edit_field("confirmation_dad", Role::Taylor));

        // non-protected fields pass the coarse gate for every role
        for role in [Role::Admin, Role::Taylor, Role::Dad] {
            assert!(can_edit_field("notes", role));
            assert!(can_edit_field("amount", role));
            assert!(can_edit_field("date", role));
        }
    }

    #[test]
    fn test_user_email_lowercased() {
        let user = User::new(Uuid::new_v4(), "Dad@Example.COM", "hash", Role::Dad);
        assert_eq!(user.email, "dad@example.com");
    }

    #[test]
    fn test_email_validation() {
        assert!(is_valid_email("taylor@arrowfinancial.com"));
        assert!(!is_valid_email("not-an-email"));
        assert!(!is_valid_email("a b@example.com"));
        assert!(!is_valid_email("a@b"));
    }
}
