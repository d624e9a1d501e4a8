//! Helpers shared by the unit tests.

use crate::dispatch::{PacketDispatchResult, PacketDispatcher};
use crate::fragment::FragmentedPacket;
use crate::protocol::{PacketDeserializer, PacketHeader, PacketSerializer};

/// Records every dispatched packet and answers with a fixed result.
pub(crate) struct RecordingDispatcher {
    pub(crate) dispatched: Vec<(PacketHeader, Vec<u8>)>,
    result: PacketDispatchResult,
}

impl RecordingDispatcher {
    pub(crate) fn new() -> Self {
        Self {
            dispatched: Vec::new(),
            result: PacketDispatchResult::Success,
        }
    }

    pub(crate) fn failing() -> Self {
        Self {
            dispatched: Vec::new(),
            result: PacketDispatchResult::Failure,
        }
    }
}

impl PacketDispatcher for RecordingDispatcher {
    fn dispatch(
        &mut self,
        header: &PacketHeader,
        input: &mut PacketDeserializer<'_>,
    ) -> PacketDispatchResult {
        self.dispatched.push((*header, input.remaining_slice().to_vec()));
        self.result
    }
}

/// Serializes `chunk` into a buffer positioned the way the receive path sees
/// it: just past the packet header.
pub(crate) fn chunk_bytes(chunk: &FragmentedPacket) -> Vec<u8> {
    let mut out = PacketSerializer::new();
    assert!(out.write(chunk));
    out.into_bytes()
}
