//! User accounts: the stored record, the store adapter and the flows that
//! mutate them.

pub mod model;
pub mod service;
pub mod store;

pub use model::*;
pub use service::*;
pub use store::*;
