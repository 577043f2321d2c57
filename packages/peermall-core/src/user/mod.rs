//! # Users
//!
//! Local user profiles. A user may own a peer space, linked by address.
//! Emails are stored trimmed and lower-cased and are unique across the
//! `users` store.

mod service;

pub use service::UserService;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::time::Timestamp;

/// Maximum length of a display name
pub const MAX_NAME_LENGTH: usize = 100;

/// A stored user profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Primary key (UUID v4)
    pub id: String,
    /// Display name
    pub name: String,
    /// Normalized email (indexed)
    pub email: String,
    /// Avatar image
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
    /// The user's own peer space
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub peer_space_address: Option<String>,
    /// Creation time
    #[serde(with = "crate::time::iso")]
    pub created_at: Timestamp,
    /// Last modification time
    #[serde(with = "crate::time::iso")]
    pub updated_at: Timestamp,
}

impl User {
    /// Check the record before it is written.
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::InvalidRecord("user name is required".into()));
        }
        if self.name.chars().count() > MAX_NAME_LENGTH {
            return Err(Error::InvalidRecord(format!(
                "user name too long: max {MAX_NAME_LENGTH} characters"
            )));
        }
        validate_email(&self.email)
    }
}

fn validate_email(email: &str) -> Result<()> {
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() => Ok(()),
        _ => Err(Error::InvalidRecord(format!("invalid email '{email}'"))),
    }
}

/// Trim and lower-case an email for storage and lookup.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Input for [`UserService::create_user`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NewUser {
    /// Explicit id; a UUID is generated when absent
    pub id: Option<String>,
    /// Display name
    pub name: String,
    /// Email
    pub email: String,
    /// Avatar image
    pub avatar_url: Option<String>,
    /// The user's own peer space
    pub peer_space_address: Option<String>,
}

impl NewUser {
    /// A user with a name and email.
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
            ..Self::default()
        }
    }

    pub(crate) fn into_record(self, now: Timestamp) -> User {
        User {
            id: self
                .id
                .filter(|id| !id.trim().is_empty())
                .unwrap_or_else(crate::id::uuid),
            name: self.name,
            email: normalize_email(&self.email),
            avatar_url: self.avatar_url,
            peer_space_address: self.peer_space_address,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Partial update for a user.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UserUpdate {
    /// New display name
    pub name: Option<String>,
    /// New email
    pub email: Option<String>,
    /// New avatar
    pub avatar_url: Option<String>,
    /// New peer space link
    pub peer_space_address: Option<String>,
}

impl UserUpdate {
    pub(crate) fn apply(self, user: &mut User) {
        if let Some(name) = self.name {
            user.name = name;
        }
        if let Some(email) = self.email {
            user.email = normalize_email(&email);
        }
        if let Some(avatar_url) = self.avatar_url {
            user.avatar_url = Some(avatar_url);
        }
        if let Some(address) = self.peer_space_address {
            user.peer_space_address = Some(address);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_email_is_normalized() {
        let user = NewUser::new("Ada", "  Ada@Example.COM ").into_record(crate::time::now());
        assert_eq!(user.email, "ada@example.com");
        assert!(user.validate().is_ok());
    }

    #[test]
    fn test_validation() {
        let now = crate::time::now();
        assert!(NewUser::new("", "a@b.c").into_record(now).validate().is_err());
        assert!(NewUser::new("Ada", "nope").into_record(now).validate().is_err());
        assert!(NewUser::new("Ada", "@b.c").into_record(now).validate().is_err());
        assert!(NewUser::new("Ada", "a@").into_record(now).validate().is_err());
    }

    #[test]
    fn test_optional_fields_are_omitted() {
        let user = NewUser::new("Ada", "a@b.c").into_record(crate::time::now());
        let value = serde_json::to_value(&user).unwrap();
        assert!(value.get("avatarUrl").is_none());
        assert!(value.get("createdAt").is_some());
    }
}
