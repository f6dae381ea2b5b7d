use std::{
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
    time::Duration,
};

use async_trait::async_trait;
use parking_lot::RwLock;
use shorty_error::StorageError;

use super::{HashFields, InMemoryStore, Storage, StoreResult, Value};

/// Failure injected by [`FaultyStore`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FaultMode {
    /// Forward everything to the inner store.
    #[default]
    Passthrough,
    /// Every key reports as existing and create-only writes never succeed.
    AlwaysExists,
    /// Every operation fails with `StorageError::Unavailable`.
    Unavailable,
}

/// [`InMemoryStore`] wrapper that injects faults and counts existence checks.
/// Used to drive collision and dependency-failure paths.
#[derive(Clone, Default)]
pub struct FaultyStore {
    inner: InMemoryStore,
    mode: Arc<RwLock<FaultMode>>,
    exists_calls: Arc<AtomicUsize>,
}

impl FaultyStore {
    pub fn new(mode: FaultMode) -> Self {
        Self {
            mode: Arc::new(RwLock::new(mode)),
            ..Self::default()
        }
    }

    pub fn set_mode(
        &self,
        mode: FaultMode,
    ) {
        *self.mode.write() = mode;
    }

    /// Number of `exists` calls served so far.
    pub fn exists_calls(&self) -> usize {
        self.exists_calls.load(Ordering::SeqCst)
    }

    pub fn inner(&self) -> &InMemoryStore {
        &self.inner
    }

    fn check(&self) -> StoreResult<FaultMode> {
        match *self.mode.read() {
            FaultMode::Unavailable => Err(StorageError::Unavailable {
                reason: "injected fault".to_string(),
            }),
            mode => Ok(mode),
        }
    }
}

#[async_trait]
impl Storage for FaultyStore {
    async fn get(
        &self,
        key: &str,
    ) -> StoreResult<Option<Value>> {
        self.check()?;
        self.inner.get(key).await
    }

    async fn set(
        &self,
        key: &str,
        value: Value,
        ttl: Option<Duration>,
    ) -> StoreResult<()> {
        self.check()?;
        self.inner.set(key, value, ttl).await
    }

    async fn set_nx(
        &self,
        key: &str,
        value: Value,
        ttl: Option<Duration>,
    ) -> StoreResult<bool> {
        if self.check()? == FaultMode::AlwaysExists {
            return Ok(false);
        }
        self.inner.set_nx(key, value, ttl).await
    }

    async fn incr(
        &self,
        key: &str,
    ) -> StoreResult<i64> {
        self.check()?;
        self.inner.incr(key).await
    }

    async fn exists(
        &self,
        key: &str,
    ) -> StoreResult<bool> {
        self.exists_calls.fetch_add(1, Ordering::SeqCst);
        if self.check()? == FaultMode::AlwaysExists {
            return Ok(true);
        }
        self.inner.exists(key).await
    }

    async fn hash_set(
        &self,
        key: &str,
        fields: HashFields,
    ) -> StoreResult<()> {
        self.check()?;
        self.inner.hash_set(key, fields).await
    }

    async fn hash_update(
        &self,
        key: &str,
        fields: HashFields,
    ) -> StoreResult<bool> {
        self.check()?;
        self.inner.hash_update(key, fields).await
    }

    async fn hash_set_nx(
        &self,
        key: &str,
        fields: HashFields,
    ) -> StoreResult<bool> {
        if self.check()? == FaultMode::AlwaysExists {
            return Ok(false);
        }
        self.inner.hash_set_nx(key, fields).await
    }

    async fn hash_get(
        &self,
        key: &str,
        field: &str,
    ) -> StoreResult<Option<String>> {
        self.check()?;
        self.inner.hash_get(key, field).await
    }

    async fn hash_get_all(
        &self,
        key: &str,
    ) -> StoreResult<Option<HashFields>> {
        self.check()?;
        self.inner.hash_get_all(key).await
    }

    async fn hash_incr_by(
        &self,
        key: &str,
        field: &str,
        delta: i64,
    ) -> StoreResult<Option<i64>> {
        self.check()?;
        self.inner.hash_incr_by(key, field, delta).await
    }

    async fn del(
        &self,
        key: &str,
    ) -> StoreResult<bool> {
        self.check()?;
        self.inner.del(key).await
    }
}
