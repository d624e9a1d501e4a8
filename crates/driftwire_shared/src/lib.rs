//! # Driftwire Shared
//!
//! Types used by both the sending and the receiving side of a connection.
//!
//! ## CRITICAL RULE
//!
//! This crate must NEVER depend on socket, connection or runtime crates.
//! If it needs a connection to make sense, it belongs in
//! `driftwire_networking`.

#![deny(missing_docs)]
#![deny(unsafe_code)]

pub mod constants;
pub mod math;

pub use constants::{
    CHUNK_BUFFER_CAPACITY, MAX_FRAGMENT_COUNT, MAX_PACKET_SIZE, MAX_REASSEMBLED_SIZE,
    UNRELIABLE_FRAGMENT_TIMEOUT_MS,
};
pub use math::{Quaternion, Vec3};
