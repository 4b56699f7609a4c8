use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::common::{check_blob, check_name, empty_object, merge_patch, Audit, Record, UnknownVariant};
use super::error::ValidationErrors;

/// What a user is allowed to do in the system.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UserRole {
    Admin,
    Manager,
    #[default]
    Tenant,
    Viewer,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Admin => "ADMIN",
            UserRole::Manager => "MANAGER",
            UserRole::Tenant => "TENANT",
            UserRole::Viewer => "VIEWER",
        }
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UserRole {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ADMIN" => Ok(UserRole::Admin),
            "MANAGER" => Ok(UserRole::Manager),
            "TENANT" => Ok(UserRole::Tenant),
            "VIEWER" => Ok(UserRole::Viewer),
            other => Err(UnknownVariant::new("user role", other)),
        }
    }
}

/// Whether a user account can act.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UserStatus {
    #[default]
    Active,
    Suspended,
    Archived,
}

impl UserStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserStatus::Active => "ACTIVE",
            UserStatus::Suspended => "SUSPENDED",
            UserStatus::Archived => "ARCHIVED",
        }
    }
}

impl fmt::Display for UserStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UserStatus {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ACTIVE" => Ok(UserStatus::Active),
            "SUSPENDED" => Ok(UserStatus::Suspended),
            "ARCHIVED" => Ok(UserStatus::Archived),
            other => Err(UnknownVariant::new("user status", other)),
        }
    }
}

/// A person known to the system: staff or tenant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: UserRole,
    pub status: UserStatus,
    pub metadata: serde_json::Value,
    #[serde(flatten)]
    pub audit: Audit,
    pub version: i64,
}

impl Record for User {
    const ENTITY: &'static str = "User";

    fn id(&self) -> Uuid {
        self.id
    }

    fn version(&self) -> i64 {
        self.version
    }

    fn is_archived(&self) -> bool {
        self.status == UserStatus::Archived
    }

    fn mark_archived(&mut self, actor: Option<Uuid>, at: DateTime<Utc>) {
        self.status = UserStatus::Archived;
        self.audit.touch(actor, at);
        self.version += 1;
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateUserRequest {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub role: UserRole,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}

impl CreateUserRequest {
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
            role: UserRole::default(),
            metadata: None,
        }
    }

    pub fn with_role(mut self, role: UserRole) -> Self {
        self.role = role;
        self
    }

    pub fn into_user(self, actor: Option<Uuid>, now: DateTime<Utc>) -> User {
        User {
            id: Uuid::new_v4(),
            name: self.name.trim().to_string(),
            email: normalize_email(&self.email),
            role: self.role,
            status: UserStatus::default(),
            metadata: self.metadata.unwrap_or_else(empty_object),
            audit: Audit::new(actor, now),
            version: 1,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateUserRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<UserRole>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<UserStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<i64>,
}

impl UpdateUserRequest {
    pub fn apply(&self, user: &mut User) -> Result<(), ValidationErrors> {
        if let Some(status) = self.status {
            if status == UserStatus::Archived && user.status != UserStatus::Archived {
                return Err(ValidationErrors::single(
                    "status",
                    "use delete to archive a user",
                ));
            }
            user.status = status;
        }
        if let Some(name) = &self.name {
            user.name = name.trim().to_string();
        }
        if let Some(email) = &self.email {
            user.email = normalize_email(email);
        }
        if let Some(role) = self.role {
            user.role = role;
        }
        if let Some(patch) = &self.metadata {
            merge_patch(&mut user.metadata, patch);
        }
        Ok(())
    }
}

/// Lowercases and trims an email so uniqueness checks are case-insensitive.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Loose structural check: one `@`, non-empty local part, dotted domain.
pub fn is_valid_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && !email.contains(char::is_whitespace)
        && domain.split('.').count() >= 2
        && domain.split('.').all(|label| !label.is_empty())
}

pub fn validate_user(user: &User) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::new();
    check_name(&mut errors, "name", &user.name);
    errors.check(!is_valid_email(&user.email), "email", "must be a valid email address");
    check_blob(&mut errors, "metadata", &user.metadata);
    errors.into_result()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_normalizes_email() {
        let user = CreateUserRequest::new("Ada", "  Ada@Example.COM ").into_user(None, Utc::now());
        assert_eq!(user.email, "ada@example.com");
        assert_eq!(user.role, UserRole::Tenant);
        assert_eq!(user.status, UserStatus::Active);
        assert!(validate_user(&user).is_ok());
    }

    #[test]
    fn test_email_shapes() {
        assert!(is_valid_email("a@b.co"));
        assert!(!is_valid_email("a@b"));
        assert!(!is_valid_email("@b.co"));
        assert!(!is_valid_email("a@@b.co"));
        assert!(!is_valid_email("a b@c.io"));
        assert!(!is_valid_email("a@b..io"));
    }

    #[test]
    fn test_update_cannot_archive() {
        let mut user = CreateUserRequest::new("Ada", "ada@example.com").into_user(None, Utc::now());
        let req = UpdateUserRequest {
            status: Some(UserStatus::Archived),
            ..Default::default()
        };
        assert!(req.apply(&mut user).is_err());
    }

    #[test]
    fn test_suspend_and_reactivate() {
        let mut user = CreateUserRequest::new("Ada", "ada@example.com").into_user(None, Utc::now());
        UpdateUserRequest {
            status: Some(UserStatus::Suspended),
            ..Default::default()
        }
        .apply(&mut user)
        .unwrap();
        assert_eq!(user.status, UserStatus::Suspended);

        UpdateUserRequest {
            status: Some(UserStatus::Active),
            role: Some(UserRole::Manager),
            ..Default::default()
        }
        .apply(&mut user)
        .unwrap();
        assert_eq!(user.status, UserStatus::Active);
        assert_eq!(user.role, UserRole::Manager);
    }
}
