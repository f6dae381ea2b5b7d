//! Line-oriented console driving the library: parsing and execution.

pub mod command;
pub mod execute;

pub use command::*;
pub use execute::*;
