//! User service - admin user management and identity verification
//!
//! User CRUD is admin-only. Passwords are stored as argon2 PHC strings.
//! Logins and logouts land in the audit trail like every other mutation.

use std::sync::Arc;

use argon2::password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::domain::result::{Error, Result};
use crate::domain::user::is_valid_email;
use crate::domain::{AuditAction, AuditEntry, Identity, Role, User};
use crate::ports::repository::Repository;
use crate::services::AuditService;

/// Minimum accepted password length
const MIN_PASSWORD_LEN: usize = 6;

/// Create-user request
#[derive(Debug, Clone, Deserialize)]
pub struct CreateUser {
    pub email: String,
    pub password: String,
    pub role: String,
}

/// Partial user update
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct UpdateUser {
    pub email: Option<String>,
    pub password: Option<String>,
    pub role: Option<String>,
}

/// Hash a password into an argon2 PHC string
pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| Error::Other(format!("Password hashing failed: {}", e)))?;
    Ok(hash.to_string())
}

/// Verify a password against a stored PHC string
pub fn verify_password(password: &str, stored_hash: &str) -> bool {
    match PasswordHash::new(stored_hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(_) => false,
    }
}

/// User service
pub struct UserService {
    repository: Arc<dyn Repository>,
    audit: Arc<AuditService>,
}

impl UserService {
    pub fn new(repository: Arc<dyn Repository>, audit: Arc<AuditService>) -> Self {
        Self { repository, audit }
    }

    fn require_admin(identity: &Identity) -> Result<()> {
        if identity.role != Role::Admin {
            return Err(Error::forbidden("Not authorized"));
        }
        Ok(())
    }

    fn validate_email(email: &str) -> Result<()> {
        if !is_valid_email(email) {
            return Err(Error::validation("Invalid email format"));
        }
        Ok(())
    }

    fn validate_password(password: &str) -> Result<()> {
        if password.len() < MIN_PASSWORD_LEN {
            return Err(Error::validation(format!(
                "Password must be at least {} characters",
                MIN_PASSWORD_LEN
            )));
        }
        Ok(())
    }

    /// List all users, ordered by email. Admin only.
    pub async fn list_users(&self, identity: &Identity) -> Result<Vec<User>> {
        Self::require_admin(identity)?;
        self.repository.get_users().await
    }

    /// Get a single user. Admin only.
    pub async fn get_user(&self, identity: &Identity, id: Uuid) -> Result<User> {
        Self::require_admin(identity)?;
        self.repository
            .get_user_by_id(id)
            .await?
            .ok_or_else(|| Error::not_found("User not found"))
    }

    /// Create a user. Admin only.
    pub async fn create_user(&self, identity: &Identity, req: &CreateUser) -> Result<User> {
        Self::require_admin(identity)?;

        Self::validate_email(&req.email)?;
        Self::validate_password(&req.password)?;
        let role = req.role.parse::<Role>()?;

        if self.repository.get_user_by_email(&req.email).await?.is_some() {
            return Err(Error::conflict("User with this email already exists"));
        }

        let user = User::new(Uuid::new_v4(), req.email.clone(), hash_password(&req.password)?, role);
        self.repository.add_user(&user).await?;

        self.audit
            .record(
                AuditEntry::new(Some(identity.user_id), AuditAction::Create)
                    .with_after(json!({
                        "userId": user.id.to_string(),
                        "email": user.email,
                        "role": user.role.as_str(),
                    }))
                    .with_meta(json!({ "createdUser": user.id.to_string() })),
            )
            .await;

        Ok(user)
    }

    /// Update a user's email, role, or password. Admin only.
    pub async fn update_user(&self, identity: &Identity, id: Uuid, req: &UpdateUser) -> Result<User> {
        Self::require_admin(identity)?;

        let mut user = self
            .repository
            .get_user_by_id(id)
            .await?
            .ok_or_else(|| Error::not_found("User not found"))?;

        if req.email.is_none() && req.password.is_none() && req.role.is_none() {
            return Err(Error::validation("No valid fields to update"));
        }

        let before_email = user.email.clone();
        let before_role = user.role;
        let mut fields_updated: Vec<&str> = Vec::new();

        if let Some(email) = &req.email {
            Self::validate_email(email)?;
            if let Some(existing) = self.repository.get_user_by_email(email).await? {
                if existing.id != user.id {
                    return Err(Error::conflict("Email already in use"));
                }
            }
            user.email = email.to_lowercase();
            fields_updated.push("email");
        }

        if let Some(role) = &req.role {
            user.role = role.parse::<Role>()?;
            fields_updated.push("role");
        }

        if let Some(password) = &req.password {
            Self::validate_password(password)?;
            user.password_hash = hash_password(password)?;
            fields_updated.push("password");
        }

        user.updated_at = Utc::now();
        self.repository.update_user(&user).await?;

        self.audit
            .record(
                AuditEntry::new(Some(identity.user_id), AuditAction::Update)
                    .with_before(json!({
                        "userId": user.id.to_string(),
                        "email": before_email,
                        "role": before_role.as_str(),
                    }))
                    .with_after(json!({
                        "userId": user.id.to_string(),
                        "email": user.email,
                        "role": user.role.as_str(),
                    }))
                    .with_meta(json!({
                        "updatedUser": user.id.to_string(),
                        "fieldsUpdated": fields_updated,
                    })),
            )
            .await;

        Ok(user)
    }

    /// Delete a user. Admin only; self-deletion is rejected.
    pub async fn delete_user(&self, identity: &Identity, id: Uuid) -> Result<()> {
        Self::require_admin(identity)?;

        let user = self
            .repository
            .get_user_by_id(id)
            .await?
            .ok_or_else(|| Error::not_found("User not found"))?;

        if user.id == identity.user_id {
            return Err(Error::validation("Cannot delete your own account"));
        }

        self.repository.delete_user(id).await?;

        self.audit
            .record(
                AuditEntry::new(Some(identity.user_id), AuditAction::Delete)
                    .with_before(json!({
                        "userId": user.id.to_string(),
                        "email": user.email,
                        "role": user.role.as_str(),
                    }))
                    .with_meta(json!({ "deletedUser": user.id.to_string() })),
            )
            .await;

        Ok(())
    }

    /// Verify credentials, stamp the login time, and record the login.
    ///
    /// Unknown email and wrong password are indistinguishable to the caller.
    pub async fn authenticate(&self, email: &str, password: &str) -> Result<User> {
        let mut user = self
            .repository
            .get_user_by_email(email)
            .await?
            .ok_or_else(|| Error::forbidden("Invalid login"))?;

        if !verify_password(password, &user.password_hash) {
            return Err(Error::forbidden("Invalid login"));
        }

        user.last_login_at = Some(Utc::now());
        self.repository.update_user(&user).await?;

        self.audit
            .record(AuditEntry::new(Some(user.id), AuditAction::Login))
            .await;

        Ok(user)
    }

    /// Record a logout for the audit trail
    pub async fn logout(&self, identity: &Identity) {
        self.audit
            .record(AuditEntry::new(Some(identity.user_id), AuditAction::Logout))
            .await;
    }
}
