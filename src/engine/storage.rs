use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use shorty_error::StorageError;

use super::{HashFields, Value};

pub type StoreResult<T> = Result<T, StorageError>;

/// Primitives consumed from the backing key-value store.
///
/// Keys have the form `<namespace>:<id>`. A missing key is an expected
/// outcome and is reported as `None`/`false`, never as an error. Every
/// primitive is atomic per key.
#[async_trait]
pub trait Storage: Send + Sync + 'static {
    async fn get(
        &self,
        key: &str,
    ) -> StoreResult<Option<Value>>;

    /// Overwrites any value. `ttl` makes the key expire.
    async fn set(
        &self,
        key: &str,
        value: Value,
        ttl: Option<Duration>,
    ) -> StoreResult<()>;

    /// Writes only if the key is absent. Returns `true` if written.
    async fn set_nx(
        &self,
        key: &str,
        value: Value,
        ttl: Option<Duration>,
    ) -> StoreResult<bool>;

    /// Atomically increments an integer counter, creating it at 0 first.
    async fn incr(
        &self,
        key: &str,
    ) -> StoreResult<i64>;

    async fn exists(
        &self,
        key: &str,
    ) -> StoreResult<bool>;

    /// Merges `fields` into the hash at `key`, creating it if absent.
    async fn hash_set(
        &self,
        key: &str,
        fields: HashFields,
    ) -> StoreResult<()>;

    /// Merges `fields` into the hash only if `key` exists. Returns `true` if
    /// written. A missing key stays missing.
    async fn hash_update(
        &self,
        key: &str,
        fields: HashFields,
    ) -> StoreResult<bool>;

    /// Creates the hash only if `key` is absent. Returns `true` if written.
    async fn hash_set_nx(
        &self,
        key: &str,
        fields: HashFields,
    ) -> StoreResult<bool>;

    async fn hash_get(
        &self,
        key: &str,
        field: &str,
    ) -> StoreResult<Option<String>>;

    /// `None` when the key does not exist.
    async fn hash_get_all(
        &self,
        key: &str,
    ) -> StoreResult<Option<HashFields>>;

    /// Atomically adds `delta` to an integer hash field, treating a missing
    /// field as 0. `None` when the hash itself does not exist, which is left
    /// uncreated.
    async fn hash_incr_by(
        &self,
        key: &str,
        field: &str,
        delta: i64,
    ) -> StoreResult<Option<i64>>;

    /// Returns `true` if a key was removed.
    async fn del(
        &self,
        key: &str,
    ) -> StoreResult<bool>;
}

#[async_trait]
impl<S: Storage + ?Sized> Storage for Arc<S> {
    async fn get(
        &self,
        key: &str,
    ) -> StoreResult<Option<Value>> {
        (**self).get(key).await
    }

    async fn set(
        &self,
        key: &str,
        value: Value,
        ttl: Option<Duration>,
    ) -> StoreResult<()> {
        (**self).set(key, value, ttl).await
    }

    async fn set_nx(
        &self,
        key: &str,
        value: Value,
        ttl: Option<Duration>,
    ) -> StoreResult<bool> {
        (**self).set_nx(key, value, ttl).await
    }

    async fn incr(
        &self,
        key: &str,
    ) -> StoreResult<i64> {
        (**self).incr(key).await
    }

    async fn exists(
        &self,
        key: &str,
    ) -> StoreResult<bool> {
        (**self).exists(key).await
    }

    async fn hash_set(
        &self,
        key: &str,
        fields: HashFields,
    ) -> StoreResult<()> {
        (**self).hash_set(key, fields).await
    }

    async fn hash_update(
        &self,
        key: &str,
        fields: HashFields,
    ) -> StoreResult<bool> {
        (**self).hash_update(key, fields).await
    }

    async fn hash_set_nx(
        &self,
        key: &str,
        fields: HashFields,
    ) -> StoreResult<bool> {
        (**self).hash_set_nx(key, fields).await
    }

    async fn hash_get(
        &self,
        key: &str,
        field: &str,
    ) -> StoreResult<Option<String>> {
        (**self).hash_get(key, field).await
    }

    async fn hash_get_all(
        &self,
        key: &str,
    ) -> StoreResult<Option<HashFields>> {
        (**self).hash_get_all(key).await
    }

    async fn hash_incr_by(
        &self,
        key: &str,
        field: &str,
        delta: i64,
    ) -> StoreResult<Option<i64>> {
        (**self).hash_incr_by(key, field, delta).await
    }

    async fn del(
        &self,
        key: &str,
    ) -> StoreResult<bool> {
        (**self).del(key).await
    }
}
