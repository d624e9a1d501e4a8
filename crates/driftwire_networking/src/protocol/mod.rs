//! # Wire Protocol
//!
//! Framing header, bounded-width serialization and quantized values.
//!
//! ## Datagram Structure
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │ Header (4 bytes)                                             │
//! ├──────────────────────────────────────────────────────────────┤
//! │ Type (1) │ Flags (1) │ Sequence (2)                          │
//! ├──────────────────────────────────────────────────────────────┤
//! │ Payload (variable, bounded by MAX_PACKET_SIZE)               │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Philosophy
//!
//! - Every byte counts - ranged integers use the narrowest width that fits
//! - Network byte order everywhere
//! - Failed writes never leave half a value in the buffer

mod packets;
mod quantized;
mod serialization;

pub use packets::{PacketHeader, PacketType};
pub use quantized::{
    QuantizationRange, QuantizedFloat, QuantizedQuaternion, QuantizedValues, QuantizedVec3,
};
pub use serialization::{
    bounded_width, BoundedValue, PacketDeserializer, PacketSerializer, Serializable,
};
