//! Adapter implementations of the port traits.
//!
//! - `live`: real disk, `sh`, and HTTP.
//! - `recording`: wraps a live adapter and captures every call to a cassette.
//! - `replaying`: serves previously recorded calls from a cassette.

pub mod live;
pub mod recording;
pub mod replaying;
