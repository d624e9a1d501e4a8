//! Integration test for fragment reassembly over a hostile link.
//!
//! Datagrams are reordered, duplicated and dropped with a seeded RNG so every
//! run sees the same traffic.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use driftwire_networking::{
    dispatch_datagram, FragmentQueue, PacketDeserializer, PacketDispatchResult, PacketDispatcher,
    PacketHeader, PacketSerializer, PacketType,
};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

const CHUNK_SIZE: usize = 1000;
const USER_TYPE: u8 = PacketType::FIRST_USER_TYPE;

/// Connection stand-in that keeps every packet it is handed.
#[derive(Default)]
struct Collector {
    received: Vec<(PacketHeader, Vec<u8>)>,
}

impl PacketDispatcher for Collector {
    fn dispatch(
        &mut self,
        header: &PacketHeader,
        input: &mut PacketDeserializer<'_>,
    ) -> PacketDispatchResult {
        self.received.push((*header, input.remaining_slice().to_vec()));
        PacketDispatchResult::Success
    }
}

impl Collector {
    /// Received bodies keyed by the packet id embedded in their first bytes.
    fn by_id(&self) -> HashMap<u32, Vec<u8>> {
        let mut packets = HashMap::new();
        for (_, body) in &self.received {
            let id = u32::from_be_bytes([body[0], body[1], body[2], body[3]]);
            assert!(packets.insert(id, body.clone()).is_none(), "packet {id} delivered twice");
        }
        packets
    }
}

/// Body of `len` bytes starting with `id` so deliveries can be matched up.
fn make_body(id: u32, len: usize) -> Vec<u8> {
    let mut body = id.to_be_bytes().to_vec();
    body.extend((0..len.saturating_sub(4)).map(|i| (i as u8) ^ (id as u8)));
    body
}

fn fragment(sender: &mut FragmentQueue, body: &[u8], reliable: bool) -> Vec<Vec<u8>> {
    let header = PacketHeader::new(USER_TYPE, reliable, 0);
    let chunks = sender.fragment_packet(&header, body, CHUNK_SIZE).unwrap();
    chunks
        .iter()
        .map(|chunk| {
            let mut out = PacketSerializer::new();
            assert!(chunk.write_datagram(&header, &mut out));
            out.into_bytes()
        })
        .collect()
}

#[test]
fn test_reordered_and_duplicated_reliable_traffic() {
    let mut rng = StdRng::seed_from_u64(0xD21F);
    let mut sender = FragmentQueue::new();
    let mut receiver = FragmentQueue::new();
    let mut connection = Collector::default();

    let mut sent = HashMap::new();
    let mut link = Vec::new();
    for id in 0..40u32 {
        let body = make_body(id, rng.gen_range(4..6000));
        for datagram in fragment(&mut sender, &body, true) {
            if rng.gen_bool(0.25) {
                link.push(datagram.clone());
            }
            link.push(datagram);
        }
        sent.insert(id, body);
    }
    link.shuffle(&mut rng);

    for datagram in &link {
        assert!(dispatch_datagram(&mut receiver, &mut connection, datagram).is_success());
    }

    assert_eq!(connection.by_id(), sent);
    assert!(connection.received.iter().all(|(h, _)| h.packet_type == USER_TYPE && h.is_reliable()));
    assert_eq!(receiver.pending_count(), 0);
    assert_eq!(receiver.stats().packets_reassembled, 40);
}

#[test]
fn test_lossy_unreliable_traffic_expires() {
    let mut rng = StdRng::seed_from_u64(7);
    let mut sender = FragmentQueue::new();
    let mut receiver = FragmentQueue::new();
    let mut connection = Collector::default();

    let mut sent = HashMap::new();
    let mut link = Vec::new();
    let mut reached = 0;
    for id in 0..60u32 {
        let body = make_body(id, rng.gen_range(1500..5000));
        let before = link.len();
        for datagram in fragment(&mut sender, &body, false) {
            if !rng.gen_bool(0.2) {
                link.push(datagram);
            }
        }
        if link.len() > before {
            reached += 1;
        }
        sent.insert(id, body);
    }
    link.shuffle(&mut rng);

    for datagram in &link {
        dispatch_datagram(&mut receiver, &mut connection, datagram);
    }

    // Whatever arrived is intact; whatever lost a chunk is still pending.
    let delivered = connection.by_id();
    for (id, body) in &delivered {
        assert_eq!(&sent[id], body);
    }
    assert_eq!(delivered.len() + receiver.pending_count(), reached);
    assert_eq!(receiver.timeout_count(), receiver.pending_count());

    let timeout = receiver.config().unreliable_timeout();
    receiver.update_at(Instant::now() + timeout + Duration::from_millis(1));
    assert_eq!(receiver.pending_count(), 0);
    assert_eq!(receiver.timeout_count(), 0);
    assert_eq!(
        receiver.stats().timeouts_expired as usize,
        reached - delivered.len()
    );
}

#[test]
fn test_unfragmented_packets_interleave() {
    let mut sender = FragmentQueue::new();
    let mut receiver = FragmentQueue::new();
    let mut connection = Collector::default();

    let big = make_body(1, 2500);
    let mut chunks = fragment(&mut sender, &big, true);

    let mut small = PacketSerializer::new();
    assert!(small.write(&PacketHeader::new(PacketType::Heartbeat as u8, false, 9)));
    assert!(small.write_u16(0xBEEF));

    let last = chunks.pop().unwrap();
    for datagram in &chunks {
        dispatch_datagram(&mut receiver, &mut connection, datagram);
    }
    dispatch_datagram(&mut receiver, &mut connection, small.as_slice());
    dispatch_datagram(&mut receiver, &mut connection, &last);

    assert_eq!(connection.received.len(), 2);
    assert_eq!(connection.received[0].0.packet_type, PacketType::Heartbeat as u8);
    assert_eq!(connection.received[0].1, vec![0xBE, 0xEF]);
    assert_eq!(connection.received[1].1, big);
}

#[test]
fn test_replay_far_behind_window_is_rejected() {
    let mut sender = FragmentQueue::new();
    let mut receiver = FragmentQueue::new();
    let mut connection = Collector::default();

    let first = fragment(&mut sender, &make_body(0, 1500), true);
    for datagram in &first {
        dispatch_datagram(&mut receiver, &mut connection, datagram);
    }
    for id in 1..300u32 {
        for datagram in fragment(&mut sender, &make_body(id, 1500), true) {
            dispatch_datagram(&mut receiver, &mut connection, &datagram);
        }
    }
    assert_eq!(connection.received.len(), 300);

    let result = dispatch_datagram(&mut receiver, &mut connection, &first[0]);
    assert_eq!(result, PacketDispatchResult::Failure);
    assert_eq!(connection.received.len(), 300);
    assert_eq!(receiver.stats().stale_dropped, 1);
}

#[test]
fn test_sequence_wraps_without_losing_packets() {
    let mut sender = FragmentQueue::new();
    let mut receiver = FragmentQueue::new();
    let mut connection = Collector::default();

    // Two full trips around the 16-bit sequence space, delivered in order.
    let total = 2 * (u32::from(u16::MAX) + 1) + 10;
    for id in 0..total {
        for datagram in fragment(&mut sender, &make_body(id, 1200), false) {
            dispatch_datagram(&mut receiver, &mut connection, &datagram);
        }
    }
    assert_eq!(connection.received.len(), total as usize);
    assert_eq!(receiver.pending_count(), 0);
}
