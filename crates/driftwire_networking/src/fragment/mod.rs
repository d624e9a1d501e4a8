//! # Fragmentation
//!
//! Splitting packets larger than one datagram into chunks, and putting them
//! back together on the receiving side.
//!
//! ## Chunk Flow
//!
//! ```text
//! SENDER                                   RECEIVER
//!   fragment_packet()                        dispatch_datagram()
//!     │ [type|body] split into chunks          │ header.is_fragment()
//!     ▼                                        ▼
//!   write_datagram() ── UDP (loss, reorder) ─▶ process_received_chunk()
//!                                              │ all chunks present
//!                                              ▼
//!                                            PacketDispatcher::dispatch()
//! ```

mod packet;
mod queue;

pub use packet::FragmentedPacket;
pub use queue::{FragmentQueue, FragmentStats};
