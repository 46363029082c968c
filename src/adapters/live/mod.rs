//! Live adapters for real external interactions.

pub mod fetch;
pub mod filesystem;
pub mod shell;
