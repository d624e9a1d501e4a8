//! # Driftwire Networking - Fragment Transport Core
//!
//! The part of a UDP transport that sits between raw datagrams and the
//! connection layer.
//!
//! ## Architecture
//!
//! - **Protocol**: Packet header, bounded-width serializer, quantized values
//! - **Sequence**: Wraparound-safe 16-bit sequence arithmetic
//! - **Window**: Fixed-size history of recently delivered fragment groups
//! - **Fragment**: Chunking on send, reassembly on receive
//! - **Timeout**: Expiry of incomplete unreliable groups
//! - **Dispatch**: The single entry point for received datagrams
//!
//! ## Delivery Guarantees
//!
//! - A fragmented packet is dispatched at most once, however often its
//!   chunks are replayed, as long as it is still inside the dedup window
//! - Incomplete unreliable packets are dropped after a timeout
//! - Incomplete reliable packets wait; retransmission is the sender's job
//!
//! ## Example
//!
//! ```rust,ignore
//! use driftwire_networking::{dispatch_datagram, FragmentQueue};
//!
//! let mut queue = FragmentQueue::new();
//! loop {
//!     let datagram = socket.recv()?;
//!     dispatch_datagram(&mut queue, &mut connection, &datagram);
//!     queue.update();
//! }
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]

pub mod config;
pub mod dispatch;
pub mod error;
pub mod fragment;
pub mod protocol;
pub mod sequence;
pub mod timeout;
pub mod window;

#[cfg(test)]
mod test_support;

// Re-exports for convenience
pub use config::FragmentConfig;
pub use dispatch::{dispatch_datagram, PacketDispatchResult, PacketDispatcher};
pub use error::{ConfigError, FragmentError, FragmentResult};
pub use fragment::{FragmentQueue, FragmentStats, FragmentedPacket};
pub use protocol::{
    PacketDeserializer, PacketHeader, PacketSerializer, PacketType, QuantizationRange,
    QuantizedFloat, QuantizedQuaternion, QuantizedValues, QuantizedVec3, Serializable,
};
pub use sequence::{
    sequence_delta, sequence_more_recent, SequenceGenerator, SequenceNumber, WrappingSequence,
};
pub use timeout::{TimeoutId, TimeoutQueue, TimeoutResult};
pub use window::{DedupWindow, DeliveredFragments};
