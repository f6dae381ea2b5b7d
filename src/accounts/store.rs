use std::sync::Arc;

use async_trait::async_trait;
use shorty_error::StorageError;
use tracing::warn;

use super::{field, Account};
use crate::{
    auth::AccountLookup,
    clock::Millis,
    engine::{HashFields, Storage, Value},
    ids::Namespace,
};

/// Prefix of the `username:<name> -> id` uniqueness index.
pub const USERNAME_INDEX: &str = "username";

/// Typed access to account records and the username index.
///
/// Records live at `user:<id>`; the index at `username:<name>` is the only
/// place username uniqueness is enforced and is written with set-if-absent.
#[derive(Debug)]
pub struct AccountStore<S> {
    store: Arc<S>,
}

pub fn username_key(username: &str) -> String {
    format!("{USERNAME_INDEX}:{username}")
}

pub fn account_key(id: &str) -> String {
    Namespace::user().key(id)
}

////////////////////////////////////////////////////////////////////////////////
// Inherent methods
////////////////////////////////////////////////////////////////////////////////

impl<S: Storage> AccountStore<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    pub async fn find_by_id(
        &self,
        id: &str,
    ) -> Result<Option<Account>, StorageError> {
        let key = account_key(id);
        match self.store.hash_get_all(&key).await? {
            Some(fields) => Account::from_fields(&key, &fields).map(Some),
            None => Ok(None),
        }
    }

    /// Resolves the username index, then the record it points to.
    ///
    /// An index entry whose record is gone or carries another username is
    /// treated as absent.
    pub async fn find_by_username(
        &self,
        username: &str,
    ) -> Result<Option<Account>, StorageError> {
        let Some(id) = self.owner_of(username).await? else {
            return Ok(None);
        };
        match self.find_by_id(&id).await? {
            Some(account) if account.username == username => Ok(Some(account)),
            Some(account) => {
                warn!(user_id = %account.id, "stale username index entry");
                Ok(None)
            }
            None => Ok(None),
        }
    }

    pub async fn username_exists(
        &self,
        username: &str,
    ) -> Result<bool, StorageError> {
        self.store.exists(&username_key(username)).await
    }

    /// Claims `username` for account `id`. `false` if someone holds it.
    pub async fn reserve_username(
        &self,
        username: &str,
        id: &str,
    ) -> Result<bool, StorageError> {
        self.store
            .set_nx(&username_key(username), Value::from(id), None)
            .await
    }

    /// Frees `username` if it still belongs to `id`.
    pub async fn release_username(
        &self,
        username: &str,
        id: &str,
    ) -> Result<bool, StorageError> {
        if self.owner_of(username).await?.as_deref() != Some(id) {
            return Ok(false);
        }
        self.store.del(&username_key(username)).await
    }

    /// Create-only write of the account record. `false` if the id is taken.
    pub async fn create(
        &self,
        account: &Account,
    ) -> Result<bool, StorageError> {
        self.store
            .hash_set_nx(&account_key(&account.id), account.to_fields())
            .await
    }

    /// Stores a new password hash and moves `updated_at` to `now`, which
    /// invalidates every earlier token. `false` if the account is gone.
    pub async fn update_password(
        &self,
        id: &str,
        password_hash: &str,
        now: Millis,
    ) -> Result<bool, StorageError> {
        self.update(
            id,
            HashFields::from([
                (field::PASSWORD.to_string(), password_hash.to_string()),
                (field::UPDATED_AT.to_string(), now.to_string()),
            ]),
        )
        .await
    }

    /// Swaps the stored hash for an upgraded one of the same password.
    /// Leaves `updated_at` alone, so live tokens survive.
    pub async fn upgrade_password_hash(
        &self,
        id: &str,
        password_hash: &str,
    ) -> Result<bool, StorageError> {
        self.update(
            id,
            HashFields::from([(field::PASSWORD.to_string(), password_hash.to_string())]),
        )
        .await
    }

    /// Rewrites the username field. The index is handled by the caller.
    pub async fn update_username(
        &self,
        id: &str,
        username: &str,
        now: Millis,
    ) -> Result<bool, StorageError> {
        self.update(
            id,
            HashFields::from([
                (field::USERNAME.to_string(), username.to_string()),
                (field::UPDATED_AT.to_string(), now.to_string()),
            ]),
        )
        .await
    }

    /// Drops the record and, if still owned, its username index entry.
    pub async fn delete(
        &self,
        account: &Account,
    ) -> Result<bool, StorageError> {
        let removed = self.delete_record(&account.id).await?;
        self.release_username(&account.username, &account.id)
            .await?;
        Ok(removed)
    }

    pub(crate) async fn delete_record(
        &self,
        id: &str,
    ) -> Result<bool, StorageError> {
        self.store.del(&account_key(id)).await
    }

    async fn owner_of(
        &self,
        username: &str,
    ) -> Result<Option<String>, StorageError> {
        let key = username_key(username);
        match self.store.get(&key).await? {
            Some(Value::Str(id)) => Ok(Some(id)),
            Some(Value::Int(id)) => Ok(Some(id.to_string())),
            Some(other) => Err(StorageError::WrongType {
                key,
                expected: "string",
                actual: other.type_name(),
            }),
            None => Ok(None),
        }
    }

    async fn update(
        &self,
        id: &str,
        fields: HashFields,
    ) -> Result<bool, StorageError> {
        self.store.hash_update(&account_key(id), fields).await
    }
}

////////////////////////////////////////////////////////////////////////////////
// Trait impls for AccountStore
////////////////////////////////////////////////////////////////////////////////

impl<S> Clone for AccountStore<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
        }
    }
}

#[async_trait]
impl<S: Storage> AccountLookup for AccountStore<S> {
    async fn find_by_username(
        &self,
        username: &str,
    ) -> Result<Option<Account>, StorageError> {
        AccountStore::find_by_username(self, username).await
    }
}

////////////////////////////////////////////////////////////////////////////////
// Tests
////////////////////////////////////////////////////////////////////////////////
