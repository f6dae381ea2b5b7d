use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use dashmap::{mapref::entry::Entry, DashMap};
use shorty_error::StorageError;
use tokio::time::Instant;

use super::{HashFields, Storage, StoreResult, Value};

#[derive(Debug, Clone)]
struct Slot {
    value: Value,
    expires_at: Option<Instant>,
}

/// In-process store. Each primitive runs under the shard lock of its key,
/// so `set_nx`, `incr`, `hash_update` and `hash_incr_by` are atomic. Expired keys are
/// dropped lazily on access.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    data: Arc<DashMap<String, Slot>>,
}

////////////////////////////////////////////////////////////////////////////////
// Inherent methods
////////////////////////////////////////////////////////////////////////////////

impl Slot {
    fn new(
        value: Value,
        ttl: Option<Duration>,
    ) -> Self {
        Self {
            value,
            expires_at: ttl.map(|ttl| Instant::now() + ttl),
        }
    }

    fn persistent(value: Value) -> Self {
        Self::new(value, None)
    }

    fn is_expired(
        &self,
        now: Instant,
    ) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live keys starting with `prefix`.
    pub fn count_prefix(
        &self,
        prefix: &str,
    ) -> usize {
        let now = Instant::now();
        self.data
            .iter()
            .filter(|e| e.key().starts_with(prefix) && !e.value().is_expired(now))
            .count()
    }

    /// Number of live keys.
    pub fn len(&self) -> usize {
        self.count_prefix("")
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Runs `f` on the live value at `key`, purging it if it has expired.
    fn read<R>(
        &self,
        key: &str,
        f: impl FnOnce(&Value) -> R,
    ) -> Option<R> {
        let now = Instant::now();
        match self.data.get(key) {
            None => return None,
            Some(slot) if !slot.is_expired(now) => return Some(f(&slot.value)),
            Some(_) => {}
        }
        self.data.remove_if(key, |_, slot| slot.is_expired(now));
        None
    }

    /// Runs `f` on the live value at `key` under its shard lock. Never
    /// creates the key.
    fn modify<R>(
        &self,
        key: &str,
        f: impl FnOnce(&mut Value) -> R,
    ) -> Option<R> {
        let now = Instant::now();
        match self.data.get_mut(key) {
            None => return None,
            Some(mut slot) if !slot.is_expired(now) => return Some(f(&mut slot.value)),
            Some(_) => {}
        }
        self.data.remove_if(key, |_, slot| slot.is_expired(now));
        None
    }

    /// Live slot at `key`, created from `init` when absent or expired.
    fn slot_or_insert(
        &self,
        key: &str,
        init: impl Fn() -> Value,
    ) -> dashmap::mapref::one::RefMut<'_, String, Slot> {
        let now = Instant::now();
        let mut slot = self
            .data
            .entry(key.to_string())
            .or_insert_with(|| Slot::persistent(init()));
        if slot.is_expired(now) {
            *slot = Slot::persistent(init());
        }
        slot
    }

    /// Writes `slot` only when `key` is absent or expired.
    fn insert_if_absent(
        &self,
        key: &str,
        slot: Slot,
    ) -> bool {
        let now = Instant::now();
        match self.data.entry(key.to_string()) {
            Entry::Occupied(mut o) => {
                if o.get().is_expired(now) {
                    o.insert(slot);
                    true
                } else {
                    false
                }
            }
            Entry::Vacant(v) => {
                v.insert(slot);
                true
            }
        }
    }
}

fn wrong_type(
    key: &str,
    expected: &'static str,
    actual: &Value,
) -> StorageError {
    StorageError::WrongType {
        key: key.to_string(),
        expected,
        actual: actual.type_name(),
    }
}

////////////////////////////////////////////////////////////////////////////////
// Trait impls for InMemoryStore
////////////////////////////////////////////////////////////////////////////////

#[async_trait]
impl Storage for InMemoryStore {
    async fn get(
        &self,
        key: &str,
    ) -> StoreResult<Option<Value>> {
        Ok(self.read(key, Value::clone))
    }

    async fn set(
        &self,
        key: &str,
        value: Value,
        ttl: Option<Duration>,
    ) -> StoreResult<()> {
        self.data.insert(key.to_string(), Slot::new(value, ttl));
        Ok(())
    }

    async fn set_nx(
        &self,
        key: &str,
        value: Value,
        ttl: Option<Duration>,
    ) -> StoreResult<bool> {
        Ok(self.insert_if_absent(key, Slot::new(value, ttl)))
    }

    async fn incr(
        &self,
        key: &str,
    ) -> StoreResult<i64> {
        let mut slot = self.slot_or_insert(key, || Value::Int(0));
        let current = match slot.value.as_int() {
            Some(n) => n,
            None => return Err(wrong_type(key, "integer", &slot.value)),
        };
        let next = current
            .checked_add(1)
            .ok_or_else(|| StorageError::Overflow {
                key: key.to_string(),
            })?;
        slot.value = Value::Int(next);
        Ok(next)
    }

    async fn exists(
        &self,
        key: &str,
    ) -> StoreResult<bool> {
        Ok(self.read(key, |_| ()).is_some())
    }

    async fn hash_set(
        &self,
        key: &str,
        fields: HashFields,
    ) -> StoreResult<()> {
        let mut slot = self.slot_or_insert(key, || Value::Hash(HashFields::new()));
        match &mut slot.value {
            Value::Hash(existing) => {
                existing.extend(fields);
                Ok(())
            }
            other => Err(wrong_type(key, "hash", other)),
        }
    }

    async fn hash_update(
        &self,
        key: &str,
        fields: HashFields,
    ) -> StoreResult<bool> {
        self.modify(key, |value| match value {
            Value::Hash(existing) => {
                existing.extend(fields);
                Ok(())
            }
            other => Err(wrong_type(key, "hash", other)),
        })
        .transpose()
        .map(|written| written.is_some())
    }

    async fn hash_set_nx(
        &self,
        key: &str,
        fields: HashFields,
    ) -> StoreResult<bool> {
        Ok(self.insert_if_absent(key, Slot::persistent(Value::Hash(fields))))
    }

    async fn hash_get(
        &self,
        key: &str,
        field: &str,
    ) -> StoreResult<Option<String>> {
        self.read(key, |value| match value {
            Value::Hash(fields) => Ok(fields.get(field).cloned()),
            other => Err(wrong_type(key, "hash", other)),
        })
        .unwrap_or(Ok(None))
    }

    async fn hash_get_all(
        &self,
        key: &str,
    ) -> StoreResult<Option<HashFields>> {
        self.read(key, |value| match value {
            Value::Hash(fields) => Ok(fields.clone()),
            other => Err(wrong_type(key, "hash", other)),
        })
        .transpose()
    }

    async fn hash_incr_by(
        &self,
        key: &str,
        field: &str,
        delta: i64,
    ) -> StoreResult<Option<i64>> {
        self.modify(key, |value| {
            let fields = match value {
                Value::Hash(fields) => fields,
                other => return Err(wrong_type(key, "hash", other)),
            };
            let current = match fields.get(field) {
                None => 0,
                Some(raw) => raw.parse::<i64>().map_err(|_| StorageError::CorruptedData {
                    key: key.to_string(),
                    reason: format!("field '{field}' is not an integer"),
                })?,
            };
            let next = current
                .checked_add(delta)
                .ok_or_else(|| StorageError::Overflow {
                    key: key.to_string(),
                })?;
            fields.insert(field.to_string(), next.to_string());
            Ok(next)
        })
        .transpose()
    }

    async fn del(
        &self,
        key: &str,
    ) -> StoreResult<bool> {
        let now = Instant::now();
        Ok(self
            .data
            .remove(key)
            .is_some_and(|(_, slot)| !slot.is_expired(now)))
    }
}

////////////////////////////////////////////////////////////////////////////////
// Tests
////////////////////////////////////////////////////////////////////////////////
