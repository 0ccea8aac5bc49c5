//! Adapters implementing the port traits.
//!
//! - `live`: real disk and a real `tsc` process.
//! - `recording`: wraps live adapters and captures every call to a cassette.
//! - `replaying`: serves calls back from a cassette.

pub mod live;
pub mod recording;
pub mod replaying;
