//! Process configuration loaded with the `config` crate.

pub mod secrets;
pub mod settings;

pub use secrets::Secrets;
pub use settings::*;
