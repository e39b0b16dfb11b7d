//! Fixed-capacity MPSC ring buffer: the hand-off between ingress producer
//! threads and the single matcher/consumer thread. `spec.md` §4.1, §9.
//!
//! Each slot carries its own `AtomicU64` sequence number instead of a
//! separate committed cursor. A producer that claims sequence `n` writes
//! its payload into slot `n & mask` and then stores `n` into that slot's
//! sequence field with `Release` ordering. The consumer waits for the slot
//! at the index it wants to read to report that exact sequence with
//! `Acquire` ordering before touching the payload. This lets slots publish
//! out of claim order (producer B can finish before producer A) without the
//! consumer ever observing a gap as readable. Adapted from the per-slot
//! sequence technique used by `debasishg/ringmpsc` and the LMAX-style ring
//! in `bugthesystem/flux`, simplified to a single consumer and without their
//! SIMD/NUMA-specific optimizations, which this system has no need for.

use crossbeam::utils::CachePadded;
use engine::prelude::{OrderId, OrderType, Side};
use std::cell::UnsafeCell;
use std::sync::atomic::{AtomicU64, Ordering};

/// A decoded order submission, pre-validated enough to move through the
/// ring. Deeper validation happens in the handler (`spec.md` §4.2 step 2).
#[derive(Debug, Clone)]
pub struct Submission {
    pub order_id: OrderId,
    pub symbol: String,
    pub side: Side,
    pub order_type: OrderType,
    pub limit_price: i64,
    pub quantity: u64,
    /// Monotonic timestamp stamped by the producer at admission, used for
    /// the end-to-end latency histogram.
    pub admission_ns: u64,
}

/// One resting order to insert directly into the book, bypassing
/// validation, matching, the WAL, and the publisher (`spec.md` §4.7).
#[derive(Debug, Clone)]
pub struct SeedEntry {
    pub order_id: OrderId,
    pub symbol: String,
    pub side: Side,
    pub limit_price: i64,
    pub quantity: u64,
}

/// What a producer writes into a claimed slot.
#[derive(Debug, Clone)]
pub enum SlotPayload {
    Submit(Submission),
    /// A batch of resting orders to enqueue directly, per `spec.md` §4.7's
    /// seed operation. Routed through the ring rather than written to the
    /// book from the ingress thread, so the book stays single-writer
    /// without locks (`spec.md` §5, §9) even though §4.7 describes seeding
    /// as bypassing "sequencer, matcher, WAL, and publisher" — see
    /// DESIGN.md for why the sequencer hand-off is kept and only the
    /// matching/WAL/publish stages are actually skipped.
    Seed(Vec<SeedEntry>),
    /// A malformed submission that still had to occupy a slot so the
    /// sequencer never silently drops an event (`spec.md` §4.1).
    Reject,
}

struct Slot {
    sequence: AtomicU64,
    payload: UnsafeCell<Option<SlotPayload>>,
}

// SAFETY: `payload` is written exactly once by the producer that claimed
// this slot's sequence, and read exactly once by the single consumer after
// observing that sequence with Acquire ordering. No two threads ever touch
// the same slot's payload concurrently.
unsafe impl Sync for Slot {}

/// Error returned when a producer cannot claim a slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClaimError {
    /// The ring is full: the consumer has not drained far enough.
    RingFull,
}

/// The producer-facing handle. Cheap to clone; every ingress worker holds
/// one.
#[derive(Clone)]
pub struct SequencerProducer {
    inner: std::sync::Arc<RingInner>,
}

/// The single consumer-facing handle.
pub struct SequencerConsumer {
    inner: std::sync::Arc<RingInner>,
    next_to_read: u64,
}

struct RingInner {
    slots: Box<[Slot]>,
    mask: u64,
    capacity: u64,
    producer_cursor: CachePadded<AtomicU64>,
    consumer_cursor: CachePadded<AtomicU64>,
}

/// Builds a producer/consumer pair sharing one ring.
///
/// `capacity` must be a power of two (`spec.md` §4.1 default 131072).
pub fn new(capacity: usize) -> (SequencerProducer, SequencerConsumer) {
    assert!(capacity.is_power_of_two(), "ring capacity must be a power of two");

    let slots: Box<[Slot]> = (0..capacity)
        .map(|i| Slot {
            // Slot i starts "owned by round -1" so the consumer's first
            // read (expecting sequence i) never matches until a producer
            // actually publishes into it.
            sequence: AtomicU64::new(i.wrapping_sub(capacity) as u64),
            payload: UnsafeCell::new(None),
        })
        .collect();

    let inner = std::sync::Arc::new(RingInner {
        slots,
        mask: capacity as u64 - 1,
        capacity: capacity as u64,
        producer_cursor: CachePadded::new(AtomicU64::new(0)),
        consumer_cursor: CachePadded::new(AtomicU64::new(0)),
    });

    (
        SequencerProducer { inner: inner.clone() },
        SequencerConsumer { inner, next_to_read: 0 },
    )
}

impl SequencerProducer {
    /// Claims the next slot, writes `payload` into it, and publishes it.
    /// Returns `ClaimError::RingFull` if the consumer has not drained far
    /// enough to make room — ingress translates this into a 503.
    pub fn publish(&self, payload: SlotPayload) -> Result<(), ClaimError> {
        let inner = &*self.inner;

        loop {
            let current = inner.producer_cursor.load(Ordering::Relaxed);
            let consumed = inner.consumer_cursor.load(Ordering::Acquire);

            if current.wrapping_sub(consumed) >= inner.capacity {
                return Err(ClaimError::RingFull);
            }

            if inner
                .producer_cursor
                .compare_exchange_weak(current, current + 1, Ordering::AcqRel, Ordering::Relaxed)
                .is_ok()
            {
                let idx = (current & inner.mask) as usize;
                let slot = &inner.slots[idx];

                // SAFETY: this producer exclusively owns slot `idx` for the
                // duration between claiming sequence `current` and
                // publishing it below; no other producer can claim the same
                // sequence, and the consumer only reads after observing the
                // sequence store.
                unsafe {
                    *slot.payload.get() = Some(payload);
                }
                slot.sequence.store(current, Ordering::Release);
                return Ok(());
            }
        }
    }

    /// Snapshot of ring occupancy for the `me_ringbuffer_utilization_ratio`
    /// gauge (`spec.md` §6), in `[0, 1]`.
    pub fn utilization(&self) -> f64 {
        let inner = &*self.inner;
        let produced = inner.producer_cursor.load(Ordering::Relaxed);
        let consumed = inner.consumer_cursor.load(Ordering::Acquire);
        produced.wrapping_sub(consumed) as f64 / inner.capacity as f64
    }
}

/// One drained entry, with its ring sequence number and whether it is the
/// last event in the currently observable contiguous batch.
pub struct Drained {
    pub payload: SlotPayload,
    pub end_of_batch: bool,
}

impl SequencerConsumer {
    /// Drains every currently published, contiguous slot starting at the
    /// consumer's cursor, calling `f` once per entry. Busy-yields when
    /// nothing is available, per the non-parking wait strategy required by
    /// `spec.md` §4.1.
    pub fn wait_for_batch(&mut self) -> Vec<Drained> {
        let inner = &*self.inner;
        let mut spins = 0u32;

        loop {
            let mut batch = Vec::new();
            loop {
                let idx = (self.next_to_read & inner.mask) as usize;
                let slot = &inner.slots[idx];
                if slot.sequence.load(Ordering::Acquire) != self.next_to_read {
                    break;
                }

                // SAFETY: the Acquire load above synchronizes-with the
                // Release store the producer performed after writing the
                // payload; we are the sole consumer, so no one else reads
                // or writes this slot concurrently.
                let payload = unsafe { (*slot.payload.get()).take() }
                    .expect("published slot must carry a payload");

                self.next_to_read += 1;
                batch.push(payload);
            }

            if !batch.is_empty() {
                inner.consumer_cursor.store(self.next_to_read, Ordering::Release);
                let last = batch.len() - 1;
                return batch
                    .into_iter()
                    .enumerate()
                    .map(|(i, payload)| Drained { payload, end_of_batch: i == last })
                    .collect();
            }

            spins += 1;
            if spins < 100 {
                std::hint::spin_loop();
            } else {
                std::thread::yield_now();
            }
        }
    }
}
