//! One shard's matching pipeline: ingress, sequencer, event handler, WAL,
//! and publisher, wired together by the `shard` binary's `main.rs`.

pub mod clock;
pub mod config;
pub mod handler;
pub mod ingress;
pub mod metrics;
pub mod publisher;
pub mod sequencer;
pub mod wal;
