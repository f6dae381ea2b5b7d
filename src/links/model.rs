use serde::Serialize;
use shorty_error::StorageError;

use crate::{
    accounts::model::{required, timestamp},
    clock::Millis,
    engine::HashFields,
};

pub(crate) mod field {
    pub const CODE: &str = "code";
    pub const ORIGINAL_URL: &str = "original_url";
    pub const USER_ID: &str = "user_id";
    pub const VIEW_COUNT: &str = "view_count";
    pub const CREATED_AT: &str = "created_at";
    pub const UPDATED_AT: &str = "updated_at";
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ShortLink {
    pub code: String,
    pub original_url: String,
    /// Id of the account that created the link.
    pub user_id: String,
    pub view_count: i64,
    pub created_at: Millis,
    pub updated_at: Millis,
}

impl ShortLink {
    pub fn new(
        code: String,
        original_url: String,
        user_id: String,
        now: Millis,
    ) -> Self {
        Self {
            code,
            original_url,
            user_id,
            view_count: 0,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn to_fields(&self) -> HashFields {
        HashFields::from([
            (field::CODE.to_string(), self.code.clone()),
            (field::ORIGINAL_URL.to_string(), self.original_url.clone()),
            (field::USER_ID.to_string(), self.user_id.clone()),
            (field::VIEW_COUNT.to_string(), self.view_count.to_string()),
            (field::CREATED_AT.to_string(), self.created_at.to_string()),
            (field::UPDATED_AT.to_string(), self.updated_at.to_string()),
        ])
    }

    pub fn from_fields(
        key: &str,
        fields: &HashFields,
    ) -> Result<Self, StorageError> {
        let view_count = required(key, fields, field::VIEW_COUNT)?
            .parse()
            .map_err(|_| StorageError::CorruptedData {
                key: key.to_string(),
                reason: "view_count is not an integer".to_string(),
            })?;
        Ok(Self {
            code: required(key, fields, field::CODE)?.to_string(),
            original_url: required(key, fields, field::ORIGINAL_URL)?.to_string(),
            user_id: required(key, fields, field::USER_ID)?.to_string(),
            view_count,
            created_at: timestamp(key, fields, field::CREATED_AT)?,
            updated_at: timestamp(key, fields, field::UPDATED_AT)?,
        })
    }
}
