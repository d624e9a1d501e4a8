//! # Fragment Queue
//!
//! Per-connection reassembly of packets that were split across datagrams.
//!
//! ## Lifecycle of a fragment sequence
//!
//! ```text
//!            first chunk                 last missing chunk
//!  Absent ───────────────▶ Collecting ───────────────────────▶ Complete
//!                            │    ▲                             (dispatched,
//!                            │    │ more chunks                  entry erased)
//!                            │    └──────┘
//!                            │
//!                            ├── timeout (unreliable only) ──▶ Discarded
//!                            └── malformed chunk ────────────▶ Rejected
//! ```
//!
//! A completed sequence is remembered in the dedup window, so replays of any
//! of its chunks are accepted as no-ops instead of starting a new group.
//! A rejected sequence is remembered the same way, and every later chunk of
//! it fails.
//!
//! ## Thread Safety
//!
//! None needed: each connection owns its queue and drives it from its own
//! receive path.

use std::collections::HashMap;
use std::time::Instant;

use tracing::{debug, trace, warn};

use driftwire_shared::{CHUNK_BUFFER_CAPACITY, MAX_FRAGMENT_COUNT};

use super::packet::FragmentedPacket;
use crate::config::FragmentConfig;
use crate::dispatch::{PacketDispatchResult, PacketDispatcher};
use crate::error::{FragmentError, FragmentResult};
use crate::protocol::{PacketDeserializer, PacketHeader};
use crate::sequence::{SequenceGenerator, SequenceNumber, WrappingSequence};
use crate::timeout::{TimeoutId, TimeoutQueue, TimeoutResult};
use crate::window::{DedupWindow, DeliveredFragments, DELIVERED_WINDOW_WORDS};

/// Chunks collected so far for one fragment sequence.
#[derive(Debug)]
struct PacketFragments {
    /// One slot per chunk, sized from the first chunk seen.
    chunks: Vec<Option<Vec<u8>>>,
    received: usize,
    /// Live registration of an unreliable group.
    timeout: Option<TimeoutId>,
}

impl PacketFragments {
    fn new(chunk_count: usize) -> Self {
        Self {
            chunks: vec![None; chunk_count],
            received: 0,
            timeout: None,
        }
    }

    fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    /// Stores a chunk. Returns false if the slot was already filled.
    fn store(&mut self, index: usize, buffer: Vec<u8>) -> bool {
        let Some(slot) = self.chunks.get_mut(index) else {
            return false;
        };
        if slot.is_some() {
            return false;
        }
        *slot = Some(buffer);
        self.received += 1;
        true
    }

    fn is_complete(&self) -> bool {
        self.received == self.chunks.len()
    }

    fn missing(&self) -> usize {
        self.chunks.len() - self.received
    }

    /// Concatenates the chunks in index order.
    fn assemble(self, sequence: SequenceNumber, max_size: usize) -> FragmentResult<Vec<u8>> {
        let size: usize = self.chunks.iter().flatten().map(Vec::len).sum();
        if size > max_size {
            return Err(FragmentError::ReassembledTooLarge {
                sequence,
                size,
                max: max_size,
            });
        }
        let mut payload = Vec::with_capacity(size);
        for chunk in self.chunks.into_iter().flatten() {
            payload.extend_from_slice(&chunk);
        }
        Ok(payload)
    }
}

/// Counters describing what the queue has seen.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FragmentStats {
    /// Chunks that deserialized successfully.
    pub chunks_received: u64,
    /// Chunks ignored because their data was already held or delivered.
    pub duplicates_dropped: u64,
    /// Chunks rejected for being too far behind the latest sequence.
    pub stale_dropped: u64,
    /// Chunks rejected as malformed.
    pub malformed_dropped: u64,
    /// Packets rebuilt and handed to the dispatcher.
    pub packets_reassembled: u64,
    /// Incomplete unreliable groups discarded by timeout.
    pub timeouts_expired: u64,
    /// Incomplete groups dropped because the window moved past them.
    pub groups_evicted: u64,
}

/// Reassembles fragmented packets for one connection.
#[derive(Debug)]
pub struct FragmentQueue {
    config: FragmentConfig,
    /// Incomplete groups by fragment sequence.
    fragments: HashMap<SequenceNumber, PacketFragments>,
    /// Which recent sequences were already delivered.
    delivered: DeliveredFragments,
    /// Which recent sequences were rejected as malformed. Shifts with
    /// `delivered`.
    rejected: DedupWindow<DELIVERED_WINDOW_WORDS>,
    /// Newest fragment sequence seen, the window's reference point.
    latest_sequence: Option<SequenceNumber>,
    /// Outbound fragment sequences.
    sequence_generator: SequenceGenerator,
    timeout_queue: TimeoutQueue,
    stats: FragmentStats,
}

impl FragmentQueue {
    /// Creates a queue with the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(FragmentConfig::default())
    }

    /// Creates a queue with an explicit configuration.
    #[must_use]
    pub fn with_config(config: FragmentConfig) -> Self {
        Self {
            config,
            fragments: HashMap::new(),
            delivered: DeliveredFragments::new(),
            rejected: DedupWindow::new(),
            latest_sequence: None,
            sequence_generator: SequenceGenerator::new(),
            timeout_queue: TimeoutQueue::new(),
            stats: FragmentStats::default(),
        }
    }

    /// Returns the configuration.
    #[inline]
    #[must_use]
    pub const fn config(&self) -> &FragmentConfig {
        &self.config
    }

    /// Returns the counters.
    #[inline]
    #[must_use]
    pub const fn stats(&self) -> FragmentStats {
        self.stats
    }

    /// Number of groups still waiting for chunks.
    #[inline]
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.fragments.len()
    }

    /// Returns true if `sequence` has an incomplete group.
    #[inline]
    #[must_use]
    pub fn is_pending(&self, sequence: SequenceNumber) -> bool {
        self.fragments.contains_key(&sequence)
    }

    /// Number of live timeout registrations.
    #[inline]
    #[must_use]
    pub fn timeout_count(&self) -> usize {
        self.timeout_queue.len()
    }

    /// Newest fragment sequence received, if any.
    #[inline]
    #[must_use]
    pub const fn latest_sequence(&self) -> Option<SequenceNumber> {
        self.latest_sequence
    }

    /// Splits an outbound packet into chunks of at most `chunk_size` bytes.
    ///
    /// The inner packet type travels as the first payload byte so the
    /// receiver can rebuild the header. Each chunk still has to be framed
    /// with [`FragmentedPacket::write_datagram`].
    pub fn fragment_packet(
        &mut self,
        header: &PacketHeader,
        body: &[u8],
        chunk_size: usize,
    ) -> FragmentResult<Vec<FragmentedPacket>> {
        let chunk_size = chunk_size.clamp(1, CHUNK_BUFFER_CAPACITY);
        let size = body.len() + 1;
        if size > self.config.max_reassembled_size {
            return Err(FragmentError::ReassembledTooLarge {
                sequence: self.sequence_generator.peek(),
                size,
                max: self.config.max_reassembled_size,
            });
        }
        let count = size.div_ceil(chunk_size);
        if count > MAX_FRAGMENT_COUNT {
            return Err(FragmentError::TooManyChunks {
                size,
                count,
                max: MAX_FRAGMENT_COUNT,
            });
        }

        let mut payload = Vec::with_capacity(size);
        payload.push(header.packet_type);
        payload.extend_from_slice(body);

        let sequence = self.sequence_generator.generate_next_sequence();
        trace!(sequence, size, count, "fragmenting packet");
        Ok(payload
            .chunks(chunk_size)
            .enumerate()
            .map(|(index, chunk)| FragmentedPacket::new(sequence, count, index, chunk.to_vec()))
            .collect())
    }

    /// Handles one received fragment chunk.
    ///
    /// `input` must be positioned just past `header`. Completing a group
    /// dispatches the rebuilt packet and returns the dispatcher's result.
    pub fn process_received_chunk<D>(
        &mut self,
        dispatcher: &mut D,
        header: &PacketHeader,
        input: &mut PacketDeserializer<'_>,
    ) -> PacketDispatchResult
    where
        D: PacketDispatcher + ?Sized,
    {
        match self.receive_chunk(dispatcher, header, input) {
            Ok(result) => result,
            Err(error) => {
                self.record_failure(&error);
                PacketDispatchResult::Failure
            }
        }
    }

    fn receive_chunk<D>(
        &mut self,
        dispatcher: &mut D,
        header: &PacketHeader,
        input: &mut PacketDeserializer<'_>,
    ) -> FragmentResult<PacketDispatchResult>
    where
        D: PacketDispatcher + ?Sized,
    {
        let chunk = input.read::<FragmentedPacket>().ok_or(FragmentError::Deserialize)?;
        self.stats.chunks_received += 1;

        let sequence = chunk.fragment_sequence;
        let delta = self.advance_window(sequence);
        if delta >= self.delivered.capacity() {
            return Err(FragmentError::StaleSequence {
                sequence,
                latest: self.latest_sequence.unwrap_or(sequence),
                delta,
            });
        }

        if self.delivered.get_bit(delta) {
            self.stats.duplicates_dropped += 1;
            trace!(sequence, "chunk of an already delivered packet");
            return Ok(PacketDispatchResult::Success);
        }

        if self.rejected.get_bit(delta) {
            return Err(FragmentError::RejectedSequence { sequence });
        }

        self.validate_chunk(&chunk, delta)?;
        let FragmentedPacket {
            chunk_count,
            chunk_index,
            chunk_buffer,
            ..
        } = chunk;

        let group = self
            .fragments
            .entry(sequence)
            .or_insert_with(|| PacketFragments::new(chunk_count));
        let stored = group.store(chunk_index, chunk_buffer);
        if !stored {
            self.stats.duplicates_dropped += 1;
        }

        if !group.is_complete() {
            // Each new chunk pushes the deadline back. Repeats do not.
            if stored && !header.is_reliable() {
                if let Some(id) = group.timeout.take() {
                    self.timeout_queue.remove_item(id);
                }
                group.timeout = Some(
                    self.timeout_queue
                        .register_item(u64::from(sequence), self.config.unreliable_timeout()),
                );
            }
            trace!(sequence, missing = group.missing(), "fragment stored");
            return Ok(PacketDispatchResult::Success);
        }

        self.delivered.set_bit(delta, true);
        let Some(group) = self.discard(sequence) else {
            return Ok(PacketDispatchResult::Success);
        };
        let payload = group.assemble(sequence, self.config.max_reassembled_size)?;
        self.dispatch_reassembled(dispatcher, header, sequence, &payload)
    }

    /// Moves the window forward if `sequence` is the newest seen and returns
    /// its distance behind the latest.
    fn advance_window(&mut self, sequence: SequenceNumber) -> usize {
        match self.latest_sequence {
            Some(latest) if !sequence.is_more_recent(latest) => usize::from(latest.delta(sequence)),
            Some(latest) => {
                let advance = usize::from(sequence.delta(latest));
                self.delivered.push_back_bits(advance);
                self.rejected.push_back_bits(advance);
                self.latest_sequence = Some(sequence);
                self.evict_out_of_window(sequence);
                0
            }
            None => {
                self.latest_sequence = Some(sequence);
                0
            }
        }
    }

    /// Drops incomplete groups the window can no longer describe. Their
    /// remaining chunks would be rejected as stale, so they can never finish.
    fn evict_out_of_window(&mut self, latest: SequenceNumber) {
        let capacity = self.delivered.capacity();
        let timeout_queue = &mut self.timeout_queue;
        let stats = &mut self.stats;
        self.fragments.retain(|&pending, group| {
            let keep = usize::from(latest.delta(pending)) < capacity;
            if !keep {
                if let Some(id) = group.timeout {
                    timeout_queue.remove_item(id);
                }
                stats.groups_evicted += 1;
                debug!(sequence = pending, missing = group.missing(), "evicting incomplete packet");
            }
            keep
        });
    }

    /// Checks a chunk against its group. A bad chunk rejects the whole
    /// sequence.
    fn validate_chunk(&mut self, chunk: &FragmentedPacket, delta: usize) -> FragmentResult<()> {
        let sequence = chunk.fragment_sequence;
        if let Some(group) = self.fragments.get(&sequence) {
            let expected = group.chunk_count();
            if expected != chunk.chunk_count {
                self.reject(sequence, delta);
                return Err(FragmentError::ChunkCountMismatch {
                    sequence,
                    expected,
                    actual: chunk.chunk_count,
                });
            }
        }
        if chunk.chunk_index >= chunk.chunk_count {
            self.reject(sequence, delta);
            return Err(FragmentError::ChunkIndexOutOfRange {
                sequence,
                index: chunk.chunk_index,
                count: chunk.chunk_count,
            });
        }
        Ok(())
    }

    /// Removes a group and cancels its timeout.
    fn discard(&mut self, sequence: SequenceNumber) -> Option<PacketFragments> {
        let group = self.fragments.remove(&sequence)?;
        if let Some(id) = group.timeout {
            self.timeout_queue.remove_item(id);
        }
        Some(group)
    }

    fn reject(&mut self, sequence: SequenceNumber, delta: usize) {
        self.discard(sequence);
        self.rejected.set_bit(delta, true);
    }

    /// Re-frames a rebuilt payload and hands it to the connection layer.
    ///
    /// The header is built fresh: the packet type comes from the payload, the
    /// reliability flag and sequence from the chunk that completed the group.
    fn dispatch_reassembled<D>(
        &mut self,
        dispatcher: &mut D,
        header: &PacketHeader,
        sequence: SequenceNumber,
        payload: &[u8],
    ) -> FragmentResult<PacketDispatchResult>
    where
        D: PacketDispatcher + ?Sized,
    {
        let mut input = PacketDeserializer::new(payload);
        let packet_type = input.read_u8().ok_or(FragmentError::EmptyPayload { sequence })?;
        let inner = PacketHeader::new(packet_type, header.is_reliable(), header.sequence);

        self.stats.packets_reassembled += 1;
        debug!(sequence, packet_type, size = payload.len(), "fragmented packet reassembled");
        Ok(dispatcher.dispatch(&inner, &mut input))
    }

    fn record_failure(&mut self, error: &FragmentError) {
        match error {
            FragmentError::StaleSequence { .. } => {
                self.stats.stale_dropped += 1;
                debug!(%error, "dropping fragment chunk");
            }
            _ => {
                self.stats.malformed_dropped += 1;
                warn!(%error, "dropping fragment chunk");
            }
        }
    }

    /// Discards the group for a timed-out sequence, if it is still pending,
    /// and cancels its registration.
    ///
    /// Always asks the timeout queue to delete the registration.
    pub fn handle_timeout(&mut self, sequence: SequenceNumber) -> TimeoutResult {
        if let Some(group) = self.discard(sequence) {
            self.stats.timeouts_expired += 1;
            debug!(sequence, missing = group.missing(), "incomplete unreliable packet timed out");
        }
        TimeoutResult::Delete
    }

    /// Expires timed-out groups. Call once per tick.
    pub fn update(&mut self) {
        self.update_at(Instant::now());
    }

    /// Expires groups whose timeout passed by `now`.
    pub fn update_at(&mut self, now: Instant) {
        let mut fired = Vec::new();
        self.timeout_queue.update_timeouts_at(now, |id, user_data| {
            fired.push((id, user_data));
            TimeoutResult::Delete
        });
        for (id, user_data) in fired {
            self.expire_registration(id, user_data);
        }
    }

    /// Routes a fired registration to [`handle_timeout`](Self::handle_timeout)
    /// if the group it names still owns it.
    fn expire_registration(&mut self, id: TimeoutId, user_data: u64) -> TimeoutResult {
        let Ok(sequence) = SequenceNumber::try_from(user_data) else {
            return TimeoutResult::Delete;
        };
        let owned = self
            .fragments
            .get(&sequence)
            .is_some_and(|group| group.timeout == Some(id));
        if owned {
            self.handle_timeout(sequence)
        } else {
            TimeoutResult::Delete
        }
    }

    /// Returns the queue to its freshly constructed state.
    pub fn reset(&mut self) {
        self.fragments.clear();
        self.delivered.reset();
        self.rejected.reset();
        self.latest_sequence = None;
        self.sequence_generator.reset();
        self.timeout_queue.clear();
        self.stats = FragmentStats::default();
        debug!("fragment queue reset");
    }
}

impl Default for FragmentQueue {
    fn default() -> Self {
        Self::new()
    }
}
