use std::{collections::HashMap, future::Future, sync::Arc};

use rand::{rngs::OsRng, RngCore};
use serde::Deserialize;
use shorty_error::{AllocationError, StorageError, ValidationError};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::{Alphabet, Namespace};
use crate::engine::Storage;

/// How identifiers of a namespace are produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    /// Atomic counter increment. Unique by construction, never retried.
    Sequential,
    /// Random draw over an alphabet, checked against the store.
    #[default]
    Random,
}

/// Allocation settings of one namespace.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AllocatorConfig {
    pub strategy: Strategy,
    /// Characters per random identifier.
    pub length: usize,
    pub alphabet: Alphabet,
    /// Cap on random draws (and on claim retries) per allocation.
    pub max_attempts: u32,
}

/// Produces identifiers unique within a namespace.
///
/// Each namespace uses its own [`AllocatorConfig`], falling back to the
/// allocator-wide default.
pub struct IdentifierAllocator<S> {
    store: Arc<S>,
    default: AllocatorConfig,
    namespaces: HashMap<Namespace, AllocatorConfig>,
}

////////////////////////////////////////////////////////////////////////////////
// Inherent methods
////////////////////////////////////////////////////////////////////////////////

impl AllocatorConfig {
    pub const MAX_LENGTH: usize = 64;

    pub fn sequential() -> Self {
        Self {
            strategy: Strategy::Sequential,
            ..Self::default()
        }
    }

    pub fn random(length: usize) -> Self {
        Self {
            strategy: Strategy::Random,
            length,
            ..Self::default()
        }
    }

    pub fn with_alphabet(
        mut self,
        alphabet: Alphabet,
    ) -> Self {
        self.alphabet = alphabet;
        self
    }

    pub fn with_max_attempts(
        mut self,
        max_attempts: u32,
    ) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.strategy == Strategy::Random && !(1..=Self::MAX_LENGTH).contains(&self.length) {
            return Err(ValidationError::InvalidArgument {
                reason: format!(
                    "identifier length must be between 1 and {}, got {}",
                    Self::MAX_LENGTH,
                    self.length
                ),
            });
        }
        if self.max_attempts == 0 {
            return Err(ValidationError::InvalidArgument {
                reason: "max_attempts must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}

impl<S: Storage> IdentifierAllocator<S> {
    pub fn new(
        store: Arc<S>,
        default: AllocatorConfig,
    ) -> Self {
        Self {
            store,
            default,
            namespaces: HashMap::new(),
        }
    }

    /// `user` sequential; `apikey` and `urlcode` random.
    pub fn with_standard_namespaces(store: Arc<S>) -> Self {
        Self::new(store, AllocatorConfig::default())
            .with_namespace(Namespace::user(), AllocatorConfig::sequential())
            .with_namespace(Namespace::api_key(), AllocatorConfig::random(16))
            .with_namespace(Namespace::url_code(), AllocatorConfig::random(8))
    }

    pub fn with_namespace(
        mut self,
        namespace: Namespace,
        config: AllocatorConfig,
    ) -> Self {
        self.namespaces.insert(namespace, config);
        self
    }

    pub fn config_for(
        &self,
        namespace: &Namespace,
    ) -> &AllocatorConfig {
        self.namespaces.get(namespace).unwrap_or(&self.default)
    }

    /// Returns an identifier that is probably free in `namespace`.
    ///
    /// The random strategy only checks for existence; finish with a
    /// create-only write or use [`Self::allocate_and_claim`].
    pub async fn allocate(
        &self,
        namespace: &Namespace,
        cancel: &CancellationToken,
    ) -> Result<String, AllocationError> {
        let config = self.config_for(namespace);
        match config.strategy {
            Strategy::Sequential => self.next_sequential(namespace, cancel).await,
            Strategy::Random => self.next_random(namespace, config, cancel).await,
        }
    }

    /// Allocates an identifier and hands it to `claim`, which performs the
    /// create-only write and returns whether it won. A lost write means
    /// another caller took the identifier in between; the allocator is then
    /// re-invoked, up to `max_attempts` times.
    pub async fn allocate_and_claim<F, Fut>(
        &self,
        namespace: &Namespace,
        cancel: &CancellationToken,
        mut claim: F,
    ) -> Result<String, AllocationError>
    where
        F: FnMut(String) -> Fut,
        Fut: Future<Output = Result<bool, StorageError>>,
    {
        let max_attempts = self.config_for(namespace).max_attempts;
        for attempt in 1..=max_attempts {
            let id = self.allocate(namespace, cancel).await?;
            if cancel.is_cancelled() {
                return Err(cancelled(namespace));
            }
            if claim(id.clone()).await? {
                return Ok(id);
            }
            debug!(%namespace, attempt, "identifier claimed concurrently, reallocating");
        }

        warn!(%namespace, attempts = max_attempts, "identifier claim retries exhausted");
        Err(AllocationError::Exhausted {
            namespace: namespace.to_string(),
            attempts: max_attempts,
        })
    }

    async fn next_sequential(
        &self,
        namespace: &Namespace,
        cancel: &CancellationToken,
    ) -> Result<String, AllocationError> {
        if cancel.is_cancelled() {
            return Err(cancelled(namespace));
        }
        let key = namespace.counter_key();
        let next = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(cancelled(namespace)),
            res = self.store.incr(&key) => res?,
        };
        if next <= 0 {
            return Err(StorageError::CorruptedData {
                key,
                reason: format!("counter returned non-positive value {next}"),
            }
            .into());
        }
        Ok(next.to_string())
    }

    async fn next_random(
        &self,
        namespace: &Namespace,
        config: &AllocatorConfig,
        cancel: &CancellationToken,
    ) -> Result<String, AllocationError> {
        for attempt in 1..=config.max_attempts {
            if cancel.is_cancelled() {
                return Err(cancelled(namespace));
            }

            let candidate = draw(config);
            let key = namespace.key(&candidate);
            let taken = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(cancelled(namespace)),
                res = self.store.exists(&key) => res?,
            };
            if !taken {
                return Ok(candidate);
            }
            debug!(%namespace, attempt, "identifier collision, redrawing");
        }

        warn!(
            %namespace,
            attempts = config.max_attempts,
            "identifier allocation exhausted"
        );
        Err(AllocationError::Exhausted {
            namespace: namespace.to_string(),
            attempts: config.max_attempts,
        })
    }
}

fn cancelled(namespace: &Namespace) -> AllocationError {
    AllocationError::Cancelled {
        namespace: namespace.to_string(),
    }
}

/// Draws `config.length` characters from the OS CSPRNG, discarding bytes the
/// alphabet rejects.
fn draw(config: &AllocatorConfig) -> String {
    let mut id = String::with_capacity(config.length);
    let mut buf = [0u8; 32];
    while id.len() < config.length {
        OsRng.fill_bytes(&mut buf);
        for &byte in &buf {
            if id.len() == config.length {
                break;
            }
            if let Some(c) = config.alphabet.map_byte(byte) {
                id.push(c);
            }
        }
    }
    id
}

////////////////////////////////////////////////////////////////////////////////
// Trait impls for AllocatorConfig
////////////////////////////////////////////////////////////////////////////////

impl Default for AllocatorConfig {
    fn default() -> Self {
        Self {
            strategy: Strategy::Random,
            length: 8,
            alphabet: Alphabet::alphanumeric(),
            max_attempts: 32,
        }
    }
}

////////////////////////////////////////////////////////////////////////////////
// Tests
////////////////////////////////////////////////////////////////////////////////
