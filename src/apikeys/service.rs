use std::{fmt, sync::Arc};

use serde::Serialize;
use shorty_error::{bail, AuthError, ResultExt, ShortyResult, StorageError};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::{
    accounts::model::{required, timestamp},
    auth::{CredentialManager, Secret},
    clock::{Millis, SharedClock},
    engine::{HashFields, Storage},
    ids::{IdentifierAllocator, Namespace},
};

/// Random bytes behind the secret half of a key.
pub const SECRET_BYTES: usize = 24;

const ID: &str = "id";
const OWNER_ID: &str = "owner_id";
const KEY_HASH: &str = "key_hash";
const CREATED_AT: &str = "created_at";

/// Stored API key record.
#[derive(Clone, PartialEq, Eq, Serialize)]
pub struct ApiKey {
    pub id: String,
    pub owner_id: String,
    #[serde(skip_serializing)]
    pub key_hash: String,
    pub created_at: Millis,
}

/// A freshly issued key. `plaintext` is not recoverable afterwards.
#[derive(Debug, Clone)]
pub struct IssuedApiKey {
    pub key: ApiKey,
    pub plaintext: Secret,
}

pub struct ApiKeyService<S> {
    store: Arc<S>,
    allocator: Arc<IdentifierAllocator<S>>,
    credentials: CredentialManager,
    clock: SharedClock,
}

////////////////////////////////////////////////////////////////////////////////
// Inherent methods
////////////////////////////////////////////////////////////////////////////////

impl ApiKey {
    fn to_fields(&self) -> HashFields {
        HashFields::from([
            (ID.to_string(), self.id.clone()),
            (OWNER_ID.to_string(), self.owner_id.clone()),
            (KEY_HASH.to_string(), self.key_hash.clone()),
            (CREATED_AT.to_string(), self.created_at.to_string()),
        ])
    }

    fn from_fields(
        key: &str,
        fields: &HashFields,
    ) -> Result<Self, StorageError> {
        Ok(Self {
            id: required(key, fields, ID)?.to_string(),
            owner_id: required(key, fields, OWNER_ID)?.to_string(),
            key_hash: required(key, fields, KEY_HASH)?.to_string(),
            created_at: timestamp(key, fields, CREATED_AT)?,
        })
    }
}

impl<S: Storage> ApiKeyService<S> {
    pub fn new(
        store: Arc<S>,
        allocator: Arc<IdentifierAllocator<S>>,
        credentials: CredentialManager,
        clock: SharedClock,
    ) -> Self {
        Self {
            store,
            allocator,
            credentials,
            clock,
        }
    }

    /// Creates a key for `owner_id` and returns its plaintext form.
    pub async fn issue(
        &self,
        owner_id: &str,
        cancel: &CancellationToken,
    ) -> ShortyResult<IssuedApiKey> {
        let secret = Secret::generate(SECRET_BYTES);
        let key_hash = self
            .credentials
            .hash_blocking(secret.expose().to_string())
            .await?;
        let now = self.clock.now_millis();

        let namespace = Namespace::api_key();
        let store = self.store.clone();
        let id = self
            .allocator
            .allocate_and_claim(&namespace, cancel, |id| {
                let store = store.clone();
                let key = namespace.key(&id);
                let record = ApiKey {
                    id,
                    owner_id: owner_id.to_string(),
                    key_hash: key_hash.clone(),
                    created_at: now,
                };
                async move { store.hash_set_nx(&key, record.to_fields()).await }
            })
            .await
            .context("allocate api key id")?;

        info!(user_id = owner_id, key_id = %id, "api key issued");
        let plaintext = Secret::new(format!("{id}.{}", secret.expose()));
        Ok(IssuedApiKey {
            key: ApiKey {
                id,
                owner_id: owner_id.to_string(),
                key_hash,
                created_at: now,
            },
            plaintext,
        })
    }

    /// Returns the stored key if `plaintext` matches it.
    pub async fn verify(
        &self,
        plaintext: &str,
    ) -> ShortyResult<ApiKey> {
        let Some((id, secret)) = plaintext.split_once('.') else {
            bail!(AuthError::InvalidApiKey);
        };
        if id.is_empty() || secret.is_empty() || id.contains(':') {
            bail!(AuthError::InvalidApiKey);
        }

        let key = Namespace::api_key().key(id);
        let Some(fields) = self
            .store
            .hash_get_all(&key)
            .await
            .context("load api key")?
        else {
            debug!(key_id = id, "unknown api key");
            bail!(AuthError::InvalidApiKey);
        };
        let record = ApiKey::from_fields(&key, &fields)?;
        if !self
            .credentials
            .verify_blocking(secret.to_string(), record.key_hash.clone())
            .await
        {
            debug!(key_id = id, "api key secret mismatch");
            bail!(AuthError::InvalidApiKey);
        }
        Ok(record)
    }

    /// Deletes key `id` if `owner_id` owns it.
    pub async fn revoke(
        &self,
        owner_id: &str,
        id: &str,
    ) -> ShortyResult<bool> {
        let key = Namespace::api_key().key(id);
        let owner = self
            .store
            .hash_get(&key, OWNER_ID)
            .await
            .context("load api key owner")?;
        if owner.as_deref() != Some(owner_id) {
            return Ok(false);
        }
        let removed = self.store.del(&key).await.context("delete api key")?;
        info!(user_id = owner_id, key_id = id, "api key revoked");
        Ok(removed)
    }
}

////////////////////////////////////////////////////////////////////////////////
// Trait impls for ApiKey
////////////////////////////////////////////////////////////////////////////////

impl fmt::Debug for ApiKey {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.debug_struct("ApiKey")
            .field("id", &self.id)
            .field("owner_id", &self.owner_id)
            .field("created_at", &self.created_at)
            .finish_non_exhaustive()
    }
}

////////////////////////////////////////////////////////////////////////////////
// Tests
////////////////////////////////////////////////////////////////////////////////
