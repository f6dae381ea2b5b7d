//! Short links: random codes mapped to target URLs, with a view counter.

pub mod model;
pub mod service;

pub use model::*;
pub use service::*;
