use std::sync::Arc;

use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Algorithm, Argon2, Params, Version,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use hmac::{Hmac, Mac};
use rand::rngs::OsRng;
use serde::Deserialize;
use sha2::Sha256;
use shorty_error::{AuthError, ValidationError};
use tracing::debug;

use super::Secret;

/// Algorithm used for new hashes. Existing hashes of either kind keep
/// verifying.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PasswordAlgorithm {
    #[default]
    Argon2id,
    Bcrypt,
}

/// Cost parameters of both algorithms.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct HashingConfig {
    pub algorithm: PasswordAlgorithm,
    pub argon2_memory_kib: u32,
    pub argon2_iterations: u32,
    pub argon2_parallelism: u32,
    pub bcrypt_cost: u32,
}

#[derive(Debug, Default)]
pub struct HashingConfigBuilder {
    algorithm: Option<PasswordAlgorithm>,
    argon2: Option<(u32, u32, u32)>,
    bcrypt_cost: Option<u32>,
}

/// Hashes and verifies peppered passwords.
///
/// Argon2id hashes `password || pepper` directly. Bcrypt only reads 72
/// bytes, so its input is `base64(HMAC-SHA256(pepper, password))`.
#[derive(Clone)]
pub struct CredentialManager {
    inner: Arc<Inner>,
}

struct Inner {
    pepper: Secret,
    config: HashingConfig,
    argon2: Argon2<'static>,
}

////////////////////////////////////////////////////////////////////////////////
// Inherent methods
////////////////////////////////////////////////////////////////////////////////

impl HashingConfig {
    pub fn builder() -> HashingConfigBuilder {
        HashingConfigBuilder::default()
    }

    /// Cheapest parameters both algorithms accept. Tests only.
    pub fn minimal(algorithm: PasswordAlgorithm) -> Self {
        Self::builder()
            .algorithm(algorithm)
            .argon2(8, 1, 1)
            .bcrypt_cost(4)
            .build()
    }

    fn argon2_params(&self) -> Result<Params, ValidationError> {
        Params::new(
            self.argon2_memory_kib,
            self.argon2_iterations,
            self.argon2_parallelism,
            None,
        )
        .map_err(|e| ValidationError::InvalidArgument {
            reason: format!("argon2 parameters: {e}"),
        })
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        self.argon2_params()?;
        if !(4..=31).contains(&self.bcrypt_cost) {
            return Err(ValidationError::InvalidArgument {
                reason: format!("bcrypt cost must be between 4 and 31, got {}", self.bcrypt_cost),
            });
        }
        Ok(())
    }
}

impl HashingConfigBuilder {
    pub fn algorithm(
        mut self,
        algorithm: PasswordAlgorithm,
    ) -> Self {
        self.algorithm = Some(algorithm);
        self
    }

    /// Memory in KiB, iterations, lanes.
    pub fn argon2(
        mut self,
        memory_kib: u32,
        iterations: u32,
        parallelism: u32,
    ) -> Self {
        self.argon2 = Some((memory_kib, iterations, parallelism));
        self
    }

    pub fn bcrypt_cost(
        mut self,
        cost: u32,
    ) -> Self {
        self.bcrypt_cost = Some(cost);
        self
    }

    pub fn build(self) -> HashingConfig {
        let default = HashingConfig::default();
        let (m, t, p) = self.argon2.unwrap_or((
            default.argon2_memory_kib,
            default.argon2_iterations,
            default.argon2_parallelism,
        ));
        HashingConfig {
            algorithm: self.algorithm.unwrap_or(default.algorithm),
            argon2_memory_kib: m,
            argon2_iterations: t,
            argon2_parallelism: p,
            bcrypt_cost: self.bcrypt_cost.unwrap_or(default.bcrypt_cost),
        }
    }
}

impl CredentialManager {
    pub fn new(
        pepper: Secret,
        config: HashingConfig,
    ) -> Result<Self, ValidationError> {
        config.validate()?;
        let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, config.argon2_params()?);
        Ok(Self {
            inner: Arc::new(Inner {
                pepper,
                config,
                argon2,
            }),
        })
    }

    pub fn config(&self) -> &HashingConfig {
        &self.inner.config
    }

    /// Salted one-way hash of the peppered password. Two calls on the same
    /// input return different strings.
    pub fn hash(
        &self,
        password: &str,
    ) -> Result<String, AuthError> {
        match self.inner.config.algorithm {
            PasswordAlgorithm::Argon2id => {
                let salt = SaltString::generate(&mut OsRng);
                self.inner
                    .argon2
                    .hash_password(&self.argon2_input(password), &salt)
                    .map(|hash| hash.to_string())
                    .map_err(|e| AuthError::HashingFailed {
                        reason: e.to_string(),
                    })
            }
            PasswordAlgorithm::Bcrypt => {
                bcrypt::hash(self.bcrypt_input(password), self.inner.config.bcrypt_cost).map_err(
                    |e| AuthError::HashingFailed {
                        reason: e.to_string(),
                    },
                )
            }
        }
    }

    /// `false` on mismatch, on an unparsable hash and on algorithm errors
    /// alike.
    pub fn verify(
        &self,
        password: &str,
        hash: &str,
    ) -> bool {
        match detect(hash) {
            Some(PasswordAlgorithm::Argon2id) => match PasswordHash::new(hash) {
                Ok(parsed) => Argon2::default()
                    .verify_password(&self.argon2_input(password), &parsed)
                    .is_ok(),
                Err(e) => {
                    debug!(error = %e, "unparsable argon2 hash");
                    false
                }
            },
            Some(PasswordAlgorithm::Bcrypt) => {
                bcrypt::verify(self.bcrypt_input(password), hash).unwrap_or(false)
            }
            None => false,
        }
    }

    /// `true` if `hash` was made by another algorithm or with weaker
    /// parameters than the current configuration.
    pub fn needs_rehash(
        &self,
        hash: &str,
    ) -> bool {
        let config = &self.inner.config;
        if detect(hash) != Some(config.algorithm) {
            return true;
        }
        match config.algorithm {
            PasswordAlgorithm::Argon2id => {
                let Ok(parsed) = PasswordHash::new(hash) else {
                    return true;
                };
                let Ok(params) = Params::try_from(&parsed) else {
                    return true;
                };
                params.m_cost() < config.argon2_memory_kib
                    || params.t_cost() < config.argon2_iterations
                    || params.p_cost() < config.argon2_parallelism
            }
            PasswordAlgorithm::Bcrypt => {
                bcrypt_cost(hash).map_or(true, |cost| cost < config.bcrypt_cost)
            }
        }
    }

    /// [`Self::hash`] on the blocking pool.
    pub async fn hash_blocking(
        &self,
        password: String,
    ) -> Result<String, AuthError> {
        let this = self.clone();
        tokio::task::spawn_blocking(move || this.hash(&password))
            .await
            .map_err(|e| AuthError::HashingFailed {
                reason: e.to_string(),
            })?
    }

    /// [`Self::verify`] on the blocking pool.
    pub async fn verify_blocking(
        &self,
        password: String,
        hash: String,
    ) -> bool {
        let this = self.clone();
        tokio::task::spawn_blocking(move || this.verify(&password, &hash))
            .await
            .unwrap_or(false)
    }

    fn argon2_input(
        &self,
        password: &str,
    ) -> Vec<u8> {
        let pepper = self.inner.pepper.as_bytes();
        let mut input = Vec::with_capacity(password.len() + pepper.len());
        input.extend_from_slice(password.as_bytes());
        input.extend_from_slice(pepper);
        input
    }

    fn bcrypt_input(
        &self,
        password: &str,
    ) -> String {
        // HMAC accepts keys of any length.
        let mut mac = match Hmac::<Sha256>::new_from_slice(self.inner.pepper.as_bytes()) {
            Ok(mac) => mac,
            Err(_) => return String::new(),
        };
        mac.update(password.as_bytes());
        STANDARD.encode(mac.finalize().into_bytes())
    }
}

fn detect(hash: &str) -> Option<PasswordAlgorithm> {
    if hash.starts_with("$argon2id$") {
        Some(PasswordAlgorithm::Argon2id)
    } else if hash.starts_with("$2a$") || hash.starts_with("$2b$") || hash.starts_with("$2y$") {
        Some(PasswordAlgorithm::Bcrypt)
    } else {
        None
    }
}

/// Cost field of a modular-crypt bcrypt hash (`$2b$12$...`).
fn bcrypt_cost(hash: &str) -> Option<u32> {
    hash.split('$').nth(2)?.parse().ok()
}

////////////////////////////////////////////////////////////////////////////////
// Trait impls
////////////////////////////////////////////////////////////////////////////////

impl Default for HashingConfig {
    fn default() -> Self {
        Self {
            algorithm: PasswordAlgorithm::Argon2id,
            argon2_memory_kib: 19_456,
            argon2_iterations: 2,
            argon2_parallelism: 1,
            bcrypt_cost: bcrypt::DEFAULT_COST,
        }
    }
}

impl std::fmt::Debug for CredentialManager {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("CredentialManager")
            .field("pepper", &self.inner.pepper)
            .field("config", &self.inner.config)
            .finish()
    }
}

////////////////////////////////////////////////////////////////////////////////
// Tests
////////////////////////////////////////////////////////////////////////////////
