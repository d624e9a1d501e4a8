//! # Dispatch Boundary
//!
//! Where fully formed packets leave the transport.
//!
//! The connection object and its listener live outside this crate; they are
//! reached through [`PacketDispatcher`]. Fragmented and unfragmented packets
//! arrive through the same call, so the connection layer never knows a packet
//! was split.

use tracing::trace;

use crate::fragment::FragmentQueue;
use crate::protocol::{PacketDeserializer, PacketHeader};

/// Outcome of handing a packet to the connection layer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PacketDispatchResult {
    /// The packet was consumed, or intentionally ignored.
    Success,
    /// The packet was rejected. The caller decides whether that is fatal.
    Failure,
}

impl PacketDispatchResult {
    /// Returns true for [`PacketDispatchResult::Success`].
    #[inline]
    #[must_use]
    pub const fn is_success(self) -> bool {
        matches!(self, Self::Success)
    }
}

/// Connection-level packet handler.
pub trait PacketDispatcher {
    /// Handles one complete packet. `input` is positioned at the first byte
    /// after the header.
    fn dispatch(
        &mut self,
        header: &PacketHeader,
        input: &mut PacketDeserializer<'_>,
    ) -> PacketDispatchResult;
}

/// Routes one received datagram: fragment chunks go through `queue`,
/// everything else straight to `dispatcher`.
pub fn dispatch_datagram<D>(
    queue: &mut FragmentQueue,
    dispatcher: &mut D,
    datagram: &[u8],
) -> PacketDispatchResult
where
    D: PacketDispatcher + ?Sized,
{
    let mut input = PacketDeserializer::new(datagram);
    let Some(header) = input.read::<PacketHeader>() else {
        trace!(len = datagram.len(), "dropping datagram with malformed header");
        return PacketDispatchResult::Failure;
    };

    if header.is_fragment() {
        queue.process_received_chunk(dispatcher, &header, &mut input)
    } else {
        dispatcher.dispatch(&header, &mut input)
    }
}
