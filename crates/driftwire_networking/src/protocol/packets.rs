//! # Packet Definitions
//!
//! The framing header carried by every datagram and the packet types the
//! transport itself understands.
//!
//! Inner "core" packets (connect, heartbeat, game payloads) belong to the
//! connection layer; this module only needs to tell fragments apart from
//! everything else.

use super::serialization::{PacketDeserializer, PacketSerializer, Serializable};

/// Packet header - present in every datagram.
///
/// Wire size: 4 bytes, sequence in network byte order.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PacketHeader {
    /// Packet type id. See [`PacketType`] for the ids owned by the transport.
    pub packet_type: u8,
    /// Framing flags (`FLAG_*`).
    pub flags: u8,
    /// Reliable-stream sequence, owned by the reliability layer.
    pub sequence: u16,
}

impl PacketHeader {
    /// Size of the header in bytes.
    pub const SIZE: usize = 4;

    /// Flag: the packet is delivered through the reliable stream.
    pub const FLAG_RELIABLE: u8 = 1 << 0;

    /// Every flag bit this version knows about.
    pub const KNOWN_FLAGS: u8 = Self::FLAG_RELIABLE;

    /// Creates a new packet header.
    #[inline]
    #[must_use]
    pub const fn new(packet_type: u8, reliable: bool, sequence: u16) -> Self {
        Self {
            packet_type,
            flags: if reliable { Self::FLAG_RELIABLE } else { 0 },
            sequence,
        }
    }

    /// Returns true if the reliable flag is set.
    #[inline]
    #[must_use]
    pub const fn is_reliable(&self) -> bool {
        self.flags & Self::FLAG_RELIABLE != 0
    }

    /// Returns true if the packet carries a fragment chunk.
    #[inline]
    #[must_use]
    pub const fn is_fragment(&self) -> bool {
        self.packet_type == PacketType::Fragment as u8
    }
}

impl Serializable for PacketHeader {
    fn serialize(&self, out: &mut PacketSerializer) -> bool {
        out.write_u8(self.packet_type) && out.write_u8(self.flags) && out.write_u16(self.sequence)
    }

    fn deserialize(input: &mut PacketDeserializer<'_>) -> Option<Self> {
        let packet_type = input.read_u8()?;
        let flags = input.read_u8()?;
        if flags & !Self::KNOWN_FLAGS != 0 {
            return None;
        }
        let sequence = input.read_u16()?;
        Some(Self {
            packet_type,
            flags,
            sequence,
        })
    }
}

/// Packet types owned by the transport.
///
/// Ids from [`PacketType::FIRST_USER_TYPE`] upward are free for the
/// connection layer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum PacketType {
    /// Connection request.
    Connect = 0,
    /// Connection accepted.
    Accept = 1,
    /// Keep-alive heartbeat.
    Heartbeat = 2,
    /// Disconnect notification.
    Disconnect = 3,
    /// One chunk of a fragmented packet.
    Fragment = 4,
}

impl PacketType {
    /// First id available to packets defined outside the transport.
    pub const FIRST_USER_TYPE: u8 = 16;

    /// Converts a raw id into a transport packet type.
    #[must_use]
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Connect),
            1 => Some(Self::Accept),
            2 => Some(Self::Heartbeat),
            3 => Some(Self::Disconnect),
            4 => Some(Self::Fragment),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_round_trip() {
        let header = PacketHeader::new(PacketType::FIRST_USER_TYPE, true, 0xBEEF);
        let mut out = PacketSerializer::new();
        assert!(out.write(&header));
        assert_eq!(out.len(), PacketHeader::SIZE);
        assert_eq!(out.as_slice(), &[16, 1, 0xBE, 0xEF]);

        let mut input = PacketDeserializer::new(out.as_slice());
        let decoded: PacketHeader = input.read().unwrap();
        assert_eq!(decoded, header);
        assert!(decoded.is_reliable());
        assert!(!decoded.is_fragment());
    }

    #[test]
    fn test_header_rejects_unknown_flags() {
        let bytes = [4u8, 0b1000_0001, 0, 1];
        let mut input = PacketDeserializer::new(&bytes);
        assert!(input.read::<PacketHeader>().is_none());
    }

    #[test]
    fn test_packet_type_from_u8() {
        assert_eq!(PacketType::from_u8(4), Some(PacketType::Fragment));
        assert_eq!(PacketType::from_u8(PacketType::FIRST_USER_TYPE), None);
    }
}
