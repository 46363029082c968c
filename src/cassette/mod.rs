//! Cassettes: recorded port interactions used to replay patch sessions
//! deterministically.

pub mod format;
pub mod recorder;
pub mod replayer;
pub mod session;
