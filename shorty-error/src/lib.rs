//! Error handling shared by every shorty crate.
//!
//! Leaf components return one of the typed enums from [`types`]; service
//! level operations wrap them into a [`StackError`], which keeps the
//! [`StatusCode`] of the root cause and a chain of human readable contexts.

pub mod ext;
pub mod macros;
pub mod stack;
pub mod status_code;
pub mod types;

pub use ext::*;
pub use macros::*;
pub use stack::*;
pub use status_code::*;
pub use types::*;

pub type ShortyResult<T> = Result<T, StackError>;
