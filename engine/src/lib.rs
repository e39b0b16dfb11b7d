//! Core matching engine: data model, order book, and price-time priority
//! matcher. No I/O lives here — sequencing, durability, and publishing are
//! the responsibility of the `shard` binary that embeds this crate.

use mimalloc::MiMalloc;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

pub mod book;
pub mod error;
pub mod matching;
pub mod types;

pub mod prelude {
    pub use super::book::*;
    pub use super::error::*;
    pub use super::matching::*;
    pub use super::types::*;
}
