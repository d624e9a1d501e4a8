//! # Transport Error Types
//!
//! Reasons a chunk or a configuration can be rejected.
//!
//! The receive path never surfaces these to its caller directly: they are
//! logged and collapsed into [`PacketDispatchResult::Failure`], leaving the
//! connection layer to decide whether the peer gets disconnected.
//!
//! [`PacketDispatchResult::Failure`]: crate::dispatch::PacketDispatchResult::Failure

use thiserror::Error;

use crate::sequence::SequenceNumber;

/// Errors that can occur while fragmenting or reassembling a packet.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FragmentError {
    /// The chunk could not be read from the datagram.
    #[error("malformed fragment chunk")]
    Deserialize,

    /// The chunk is too far behind the latest seen sequence to be tracked.
    #[error("stale fragment sequence {sequence}: {delta} behind latest {latest}")]
    StaleSequence {
        /// Sequence of the rejected chunk.
        sequence: SequenceNumber,
        /// Latest sequence seen so far.
        latest: SequenceNumber,
        /// Distance behind `latest`.
        delta: usize,
    },

    /// The chunk disagrees with earlier chunks about how many chunks exist.
    #[error("fragment sequence {sequence}: chunk count {actual} disagrees with {expected}")]
    ChunkCountMismatch {
        /// Sequence of the fragment group.
        sequence: SequenceNumber,
        /// Count recorded from the first chunk.
        expected: usize,
        /// Count carried by the rejected chunk.
        actual: usize,
    },

    /// The chunk index does not fit the chunk count.
    #[error("fragment sequence {sequence}: chunk index {index} out of range for {count} chunks")]
    ChunkIndexOutOfRange {
        /// Sequence of the fragment group.
        sequence: SequenceNumber,
        /// Index carried by the rejected chunk.
        index: usize,
        /// Chunk count of the group.
        count: usize,
    },

    /// An earlier chunk of this sequence was malformed, so the whole
    /// sequence is refused.
    #[error("fragment sequence {sequence} was rejected earlier")]
    RejectedSequence {
        /// Sequence of the fragment group.
        sequence: SequenceNumber,
    },

    /// The reassembled payload would exceed the configured maximum.
    #[error("fragment sequence {sequence}: reassembled size {size} exceeds {max}")]
    ReassembledTooLarge {
        /// Sequence of the fragment group.
        sequence: SequenceNumber,
        /// Sum of the chunk sizes.
        size: usize,
        /// Configured maximum.
        max: usize,
    },

    /// The reassembled payload does not start with an inner packet type.
    #[error("fragment sequence {sequence}: reassembled payload is empty")]
    EmptyPayload {
        /// Sequence of the fragment group.
        sequence: SequenceNumber,
    },

    /// An outbound payload needs more chunks than the wire format allows.
    #[error("payload of {size} bytes needs {count} chunks, maximum is {max}")]
    TooManyChunks {
        /// Payload size including the inner packet type.
        size: usize,
        /// Chunks required at the requested chunk size.
        count: usize,
        /// Maximum chunk count.
        max: usize,
    },
}

/// Errors raised while loading a [`FragmentConfig`](crate::config::FragmentConfig).
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The TOML text could not be parsed.
    #[error("invalid fragment config: {0}")]
    Parse(#[from] toml::de::Error),

    /// A value parsed but is unusable.
    #[error("invalid fragment config value `{field}`: {reason}")]
    InvalidValue {
        /// Offending field.
        field: &'static str,
        /// What is wrong with it.
        reason: String,
    },
}

/// Result type for fragment operations.
pub type FragmentResult<T> = Result<T, FragmentError>;
