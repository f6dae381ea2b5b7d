use std::fmt;

use serde::Serialize;
use shorty_error::StorageError;

use crate::{clock::Millis, engine::HashFields};

/// Stored user account.
///
/// The password hash is never serialized and never printed.
#[derive(Clone, PartialEq, Eq, Serialize)]
pub struct Account {
    pub id: String,
    pub username: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub created_at: Millis,
    /// Last username or password change. Tokens issued earlier are invalid.
    pub updated_at: Millis,
}

pub(crate) mod field {
    pub const ID: &str = "id";
    pub const USERNAME: &str = "username";
    pub const PASSWORD: &str = "password";
    pub const CREATED_AT: &str = "created_at";
    pub const UPDATED_AT: &str = "updated_at";
}

impl Account {
    pub fn new(
        id: String,
        username: String,
        password_hash: String,
        now: Millis,
    ) -> Self {
        Self {
            id,
            username,
            password_hash,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn to_fields(&self) -> HashFields {
        HashFields::from([
            (field::ID.to_string(), self.id.clone()),
            (field::USERNAME.to_string(), self.username.clone()),
            (field::PASSWORD.to_string(), self.password_hash.clone()),
            (field::CREATED_AT.to_string(), self.created_at.to_string()),
            (field::UPDATED_AT.to_string(), self.updated_at.to_string()),
        ])
    }

    /// Parses the hash stored at `key`.
    pub fn from_fields(
        key: &str,
        fields: &HashFields,
    ) -> Result<Self, StorageError> {
        let account = Self {
            id: required(key, fields, field::ID)?.to_string(),
            username: required(key, fields, field::USERNAME)?.to_string(),
            password_hash: required(key, fields, field::PASSWORD)?.to_string(),
            created_at: timestamp(key, fields, field::CREATED_AT)?,
            updated_at: timestamp(key, fields, field::UPDATED_AT)?,
        };
        if account.updated_at < account.created_at {
            return Err(StorageError::CorruptedData {
                key: key.to_string(),
                reason: "updated_at precedes created_at".to_string(),
            });
        }
        Ok(account)
    }
}

pub(crate) fn required<'a>(
    key: &str,
    fields: &'a HashFields,
    name: &str,
) -> Result<&'a str, StorageError> {
    fields
        .get(name)
        .map(String::as_str)
        .ok_or_else(|| StorageError::CorruptedData {
            key: key.to_string(),
            reason: format!("missing field '{name}'"),
        })
}

pub(crate) fn timestamp(
    key: &str,
    fields: &HashFields,
    name: &str,
) -> Result<Millis, StorageError> {
    required(key, fields, name)?
        .parse()
        .map_err(|_| StorageError::CorruptedData {
            key: key.to_string(),
            reason: format!("field '{name}' is not a timestamp"),
        })
}

impl fmt::Debug for Account {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.debug_struct("Account")
            .field("id", &self.id)
            .field("username", &self.username)
            .field("password_hash", &"<redacted>")
            .field("created_at", &self.created_at)
            .field("updated_at", &self.updated_at)
            .finish()
    }
}
