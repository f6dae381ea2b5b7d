//! Shared fixtures for integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use shorty::{
    App, HashingConfig, InMemoryStore, ManualClock, PasswordAlgorithm, RateLimitConfig, Secret,
    Secrets, Settings, Storage,
};

/// Fixed start of the manual clock (2023-11-14T22:13:20Z).
pub const T0: i64 = 1_700_000_000_000;

pub const PASSWORD: &str = "Passw0rd";

/// Cheap hashing and a limiter wide enough to stay out of the way.
pub fn settings() -> Settings {
    let mut settings = Settings::default();
    settings.auth.hashing = HashingConfig::minimal(PasswordAlgorithm::Argon2id);
    settings.rate_limit = RateLimitConfig::new(10_000.0, 10_000).unwrap();
    settings
}

pub fn secrets() -> Secrets {
    Secrets {
        pepper: Secret::new("integration-pepper"),
        signing_secret: Secret::new("integration-signing-secret"),
    }
}

pub fn app_with<S: Storage>(
    store: Arc<S>,
    clock: Arc<ManualClock>,
) -> App<S> {
    App::new(&settings(), secrets(), store, clock).unwrap()
}

pub fn app() -> (App<InMemoryStore>, Arc<InMemoryStore>, Arc<ManualClock>) {
    let store = Arc::new(InMemoryStore::new());
    let clock = Arc::new(ManualClock::new(T0));
    (app_with(store.clone(), clock.clone()), store, clock)
}
