//! The event handler: sole writer of the OrderBookSet, the WAL, and the
//! publisher. Runs on one dedicated thread and drains the sequencer.
//! `spec.md` §4.2, §5.

use crate::clock::MonotonicClock;
use crate::publisher::Publisher;
use crate::sequencer::{Drained, SeedEntry, SequencerConsumer, SequencerProducer, SlotPayload, Submission};
use crate::wal::Wal;
use engine::prelude::*;

/// Everything the handler thread owns exclusively. Nothing here is shared
/// with any other thread — this is the single-writer region of `spec.md`
/// §5, §9.
pub struct EventHandler {
    shard_id: String,
    books: OrderBookSet,
    wal: Wal,
    publisher: Publisher,
    clock: MonotonicClock,
    arrival_sequence: u64,
    trade_sequence: u64,
    ring_producer: SequencerProducer,
}

impl EventHandler {
    pub fn new(
        shard_id: String,
        owned_symbols: &[String],
        wal: Wal,
        publisher: Publisher,
        clock: MonotonicClock,
        ring_producer: SequencerProducer,
    ) -> Self {
        let mut books = OrderBookSet::new();
        for symbol in owned_symbols {
            books.get_or_create_mut(symbol);
        }

        Self {
            shard_id,
            books,
            wal,
            publisher,
            clock,
            arrival_sequence: 0,
            trade_sequence: 0,
            ring_producer,
        }
    }

    /// Runs forever, draining the sequencer and processing one event at a
    /// time. Intended to be the body of the dedicated matcher thread.
    pub fn run(&mut self, consumer: &mut SequencerConsumer) -> ! {
        loop {
            for drained in consumer.wait_for_batch() {
                self.process(drained.payload);
                if drained.end_of_batch {
                    self.on_end_of_batch();
                }
            }
        }
    }

    fn process(&mut self, payload: SlotPayload) {
        let submission = match payload {
            SlotPayload::Submit(s) => s,
            SlotPayload::Seed(entries) => {
                self.process_seed(entries);
                return;
            }
            SlotPayload::Reject => {
                metrics::counter!("me_orders_received_total", "shard" => self.shard_id.clone(), "side" => "unknown")
                    .increment(0);
                return;
            }
        };

        let admission_ns = submission.admission_ns;
        self.arrival_sequence += 1;
        let arrival_sequence = self.arrival_sequence;

        let validation_start = self.clock.now_ns();
        if let Err(reason) = self.validate(&submission) {
            tracing::debug!(reason = %reason, order_id = %submission.order_id, "rejected in handler");
            metrics::counter!("me_orders_rejected_total", "shard" => self.shard_id.clone(), "reason" => reason.label())
                .increment(1);
            return;
        }
        let validation_end = self.clock.now_ns();
        metrics::histogram!("me_order_validation_duration_seconds", "shard" => self.shard_id.clone())
            .record(self.clock.delta_seconds(validation_start, validation_end));

        let side_label = match submission.side {
            Side::Buy => "BUY",
            Side::Sell => "SELL",
        };
        metrics::counter!("me_orders_received_total", "shard" => self.shard_id.clone(), "side" => side_label)
            .increment(1);

        let mut order = Order {
            id: submission.order_id,
            symbol: submission.symbol,
            side: submission.side,
            order_type: submission.order_type,
            limit_price: submission.limit_price,
            original_qty: submission.quantity,
            remaining_qty: submission.quantity,
            arrival_sequence,
            status: OrderStatus::New,
        };

        let insertion_start = self.clock.now_ns();
        let book = self.books.get_mut(&order.symbol).expect("validated symbol must have a book");
        let match_start = self.clock.now_ns();
        let fills = {
            let mut next_trade_sequence = || {
                self.trade_sequence += 1;
                self.trade_sequence
            };
            match_order(book, &mut order, &mut next_trade_sequence)
        };
        let match_end = self.clock.now_ns();
        metrics::histogram!("me_orderbook_insertion_duration_seconds", "shard" => self.shard_id.clone())
            .record(self.clock.delta_seconds(insertion_start, match_start));
        metrics::histogram!("me_matching_algorithm_duration_seconds", "shard" => self.shard_id.clone())
            .record(self.clock.delta_seconds(match_start, match_end));

        let wal_start = self.clock.now_ns();
        self.wal.append(&LogRecord::OrderAdmitted(order.clone()));
        for fill in &fills {
            self.wal.append(&LogRecord::Match(fill.clone()));
        }
        let wal_end = self.clock.now_ns();
        metrics::histogram!("me_wal_append_duration_seconds", "shard" => self.shard_id.clone())
            .record(self.clock.delta_seconds(wal_start, wal_end));

        let publish_start = self.clock.now_ns();
        for fill in fills {
            metrics::counter!("me_matches_total", "shard" => self.shard_id.clone()).increment(1);
            self.publisher.emit(fill);
        }
        let publish_end = self.clock.now_ns();
        metrics::histogram!("me_event_publish_duration_seconds", "shard" => self.shard_id.clone())
            .record(self.clock.delta_seconds(publish_start, publish_end));

        let total_end = self.clock.now_ns();
        metrics::histogram!("me_match_duration_seconds", "shard" => self.shard_id.clone())
            .record(self.clock.delta_seconds(admission_ns, total_end));
    }

    /// Enqueues a batch of seed orders directly into their symbols' books,
    /// bypassing validation, matching, the WAL, and the publisher —
    /// `spec.md` §4.7. Each entry still gets an `arrival_sequence` from the
    /// same counter real submissions use, so FIFO priority among seeded
    /// orders (and between seeded orders and whatever arrives afterward)
    /// is well-defined.
    fn process_seed(&mut self, entries: Vec<SeedEntry>) {
        for entry in entries {
            if !self.books.contains(&entry.symbol) {
                continue;
            }
            self.arrival_sequence += 1;
            let book = self.books.get_mut(&entry.symbol).expect("checked contains above");
            book.enqueue(Order {
                id: entry.order_id,
                symbol: entry.symbol,
                side: entry.side,
                order_type: OrderType::Limit,
                limit_price: entry.limit_price,
                original_qty: entry.quantity,
                remaining_qty: entry.quantity,
                arrival_sequence: self.arrival_sequence,
                status: OrderStatus::New,
            });
        }
    }

    fn validate(&self, submission: &Submission) -> Result<(), RejectReason> {
        if !self.books.contains(&submission.symbol) {
            return Err(RejectReason::UnknownSymbol);
        }
        if submission.quantity == 0 {
            return Err(RejectReason::NonPositiveQuantity);
        }
        if submission.order_type == OrderType::Limit && submission.limit_price <= 0 {
            return Err(RejectReason::NonPositiveLimitPrice);
        }
        Ok(())
    }

    /// Forces the WAL and refreshes the saturation gauges. Runs only at
    /// `endOfBatch`, per `spec.md` §4.2 step 7.
    fn on_end_of_batch(&mut self) {
        if !self.wal.force() {
            metrics::counter!("me_wal_force_failures_total", "shard" => self.shard_id.clone()).increment(1);
        }

        for side in [Side::Buy, Side::Sell] {
            let side_label = match side {
                Side::Buy => "BUY",
                Side::Sell => "SELL",
            };
            let mut depth = 0u64;
            let mut levels = 0u64;
            for book in self.books.iter() {
                depth += book.depth(side);
                levels += book.price_level_count(side) as u64;
            }
            metrics::gauge!("me_orderbook_depth", "shard" => self.shard_id.clone(), "side" => side_label)
                .set(depth as f64);
            metrics::gauge!("me_orderbook_price_levels", "shard" => self.shard_id.clone(), "side" => side_label)
                .set(levels as f64);
        }

        metrics::gauge!("me_ringbuffer_utilization_ratio", "shard" => self.shard_id.clone())
            .set(self.ring_producer.utilization());
    }
}
