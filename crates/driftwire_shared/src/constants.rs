//! # Wire Budget Constants
//!
//! Sizes both peers must agree on.
//!
//! **CRITICAL:** These values are baked into both ends of the protocol.
//! Changing one is a wire-format break.

// =============================================================================
// DATAGRAM LIMITS
// =============================================================================

/// Maximum datagram size (MTU-safe).
pub const MAX_PACKET_SIZE: usize = 1200;

/// Maximum number of payload bytes carried by a single fragment chunk.
///
/// Leaves room for the packet header and the fragment body header inside
/// [`MAX_PACKET_SIZE`].
pub const CHUNK_BUFFER_CAPACITY: usize = 1024;

/// Maximum number of chunks a fragmented packet may be split into.
///
/// Keeps `chunk_count` and `chunk_index` at one byte on the wire.
pub const MAX_FRAGMENT_COUNT: usize = 64;

/// Largest payload a reassembled packet may have.
///
/// Smaller than `MAX_FRAGMENT_COUNT * CHUNK_BUFFER_CAPACITY`, so a
/// peer that sends the maximum chunk count with full chunks is rejected.
pub const MAX_REASSEMBLED_SIZE: usize = 16 * 1024;

// =============================================================================
// TIMING
// =============================================================================

/// How long an incomplete unreliable fragment group is kept, in milliseconds.
pub const UNRELIABLE_FRAGMENT_TIMEOUT_MS: u64 = 500;
