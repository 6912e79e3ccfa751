//! Users known to the dataset, keyed by username.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::dataset::Dataset;
use crate::error::{Error, Result};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserRecord {
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub is_staff: bool,
    #[serde(default = "default_active")]
    pub is_active: bool,
    pub date_joined: DateTime<Utc>,
}

fn default_active() -> bool {
    true
}

impl UserRecord {
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            email: String::new(),
            is_staff: false,
            is_active: true,
            date_joined: Utc::now(),
        }
    }
}

fn normalize_username(username: &str) -> Result<&str> {
    let trimmed = username.trim();
    if trimmed.is_empty() {
        return Err(Error::validation("username", "username cannot be empty"));
    }
    if trimmed.chars().any(char::is_whitespace) {
        return Err(Error::validation(
            "username",
            format!("username cannot contain whitespace: '{trimmed}'"),
        ));
    }
    Ok(trimmed)
}

/// Register `username` if unknown and return the stored name.
///
/// The acting identity is registered on its first write, so records can
/// always reference it.
pub fn ensure(dataset: &mut Dataset, username: &str) -> Result<String> {
    let username = normalize_username(username)?;
    if !dataset.users.contains_key(username) {
        tracing::debug!(username, "registering user");
        dataset
            .users
            .insert(username.to_string(), UserRecord::new(username));
    }
    Ok(username.to_string())
}

/// Resolve an optional actor to a registered username.
pub fn ensure_actor(dataset: &mut Dataset, actor: Option<&str>) -> Result<Option<String>> {
    actor.map(|name| ensure(dataset, name)).transpose()
}

pub fn add(
    dataset: &mut Dataset,
    username: &str,
    email: Option<String>,
    is_staff: bool,
) -> Result<UserRecord> {
    let username = normalize_username(username)?;
    if dataset.users.contains_key(username) {
        return Err(Error::Conflict(format!("user already exists: {username}")));
    }
    let mut record = UserRecord::new(username);
    record.email = email.unwrap_or_default().trim().to_string();
    record.is_staff = is_staff;
    dataset.users.insert(username.to_string(), record.clone());
    Ok(record)
}

pub fn list(dataset: &Dataset) -> Vec<UserRecord> {
    dataset.users.values().cloned().collect()
}

/// Whether `actor` is a registered, active staff user.
pub fn is_staff(dataset: &Dataset, actor: Option<&str>) -> bool {
    actor
        .and_then(|name| dataset.users.get(name.trim()))
        .is_some_and(|user| user.is_staff && user.is_active)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ensure_registers_once() {
        let mut dataset = Dataset::empty();
        assert_eq!(ensure(&mut dataset, " alice ").unwrap(), "alice");
        ensure(&mut dataset, "alice").unwrap();
        assert_eq!(dataset.users.len(), 1);
    }

    #[test]
    fn add_rejects_duplicates() {
        let mut dataset = Dataset::empty();
        add(&mut dataset, "bob", Some("bob@example.com".into()), true).unwrap();
        let err = add(&mut dataset, "bob", None, false).unwrap_err();
        assert!(matches!(err, Error::Conflict(_)));
        assert!(is_staff(&dataset, Some("bob")));
        assert!(!is_staff(&dataset, Some("nobody")));
    }

    #[test]
    fn usernames_cannot_be_blank() {
        let mut dataset = Dataset::empty();
        let err = ensure(&mut dataset, "  ").unwrap_err();
        assert_eq!(err.field(), Some("username"));
    }
}
