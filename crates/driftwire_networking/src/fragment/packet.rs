//! Wire form of a single fragment chunk.

use driftwire_shared::{CHUNK_BUFFER_CAPACITY, MAX_FRAGMENT_COUNT};

use crate::protocol::{PacketDeserializer, PacketHeader, PacketSerializer, PacketType, Serializable};
use crate::sequence::SequenceNumber;

/// One chunk of a packet too large for a single datagram.
///
/// ```text
/// fragment_sequence (2) │ chunk_count (1) │ chunk_index (1) │ len (2) │ bytes
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FragmentedPacket {
    /// Identifies the fragment group this chunk belongs to.
    pub fragment_sequence: SequenceNumber,
    /// Total chunks in the group, `1..=MAX_FRAGMENT_COUNT`.
    pub chunk_count: usize,
    /// Position of this chunk, `0..MAX_FRAGMENT_COUNT`.
    pub chunk_index: usize,
    /// Payload bytes, at most `CHUNK_BUFFER_CAPACITY`.
    pub chunk_buffer: Vec<u8>,
}

impl FragmentedPacket {
    /// Creates a chunk.
    #[must_use]
    pub fn new(
        fragment_sequence: SequenceNumber,
        chunk_count: usize,
        chunk_index: usize,
        chunk_buffer: Vec<u8>,
    ) -> Self {
        Self {
            fragment_sequence,
            chunk_count,
            chunk_index,
            chunk_buffer,
        }
    }

    /// Writes a complete datagram: a fragment header carrying the original
    /// packet's reliability and sequence, followed by this chunk.
    pub fn write_datagram(&self, original: &PacketHeader, out: &mut PacketSerializer) -> bool {
        let header = PacketHeader::new(
            PacketType::Fragment as u8,
            original.is_reliable(),
            original.sequence,
        );
        out.write(&header) && out.write(self)
    }
}

impl Serializable for FragmentedPacket {
    fn serialize(&self, out: &mut PacketSerializer) -> bool {
        out.write_u16(self.fragment_sequence)
            && out.write_bounded(1, MAX_FRAGMENT_COUNT, self.chunk_count)
            && out.write_bounded(0, MAX_FRAGMENT_COUNT - 1, self.chunk_index)
            && out.write_length_prefixed(CHUNK_BUFFER_CAPACITY, &self.chunk_buffer)
    }

    fn deserialize(input: &mut PacketDeserializer<'_>) -> Option<Self> {
        let fragment_sequence = input.read_u16()?;
        let chunk_count = input.read_bounded(1, MAX_FRAGMENT_COUNT)?;
        let chunk_index = input.read_bounded(0, MAX_FRAGMENT_COUNT - 1)?;
        let chunk_buffer = input.read_length_prefixed(CHUNK_BUFFER_CAPACITY)?.to_vec();
        Some(Self {
            fragment_sequence,
            chunk_count,
            chunk_index,
            chunk_buffer,
        })
    }
}
