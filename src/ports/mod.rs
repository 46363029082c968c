//! Port traits defining external boundaries.
//!
//! Each trait represents a boundary between the patching core and an
//! external system (filesystem, the patch tool's shell, remote downloads).
//! Implementations live in `src/adapters/`.

pub mod fetch;
pub mod filesystem;
pub mod shell;

pub use fetch::{FetchFuture, PatchFetcher};
pub use filesystem::FileSystem;
pub use shell::{ShellExecutor, ShellOutput};
