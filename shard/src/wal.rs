//! Fixed-size, memory-mapped write-ahead log. `spec.md` §4.5.
//!
//! One pre-allocated mapping, no segment rotation — rotation is explicitly
//! out of scope for the core. Records are length-prefixed (`u32` little
//! endian) followed by the JSON payload. Forcing the mapping to disk is
//! deferred to batch boundaries; appends within a batch are visible in
//! memory only. Grounded on the append/flush shape of
//! `joaquinbejar/OrderBook-rs`'s `FileJournal`, stripped of segment
//! rotation, CRC framing, and multi-segment replay, none of which this
//! design needs.

use engine::prelude::LogRecord;
use memmap2::MmapMut;
use std::fs::OpenOptions;
use std::path::Path;

const LENGTH_PREFIX_SIZE: usize = 4;

/// Write-only handle onto the mapped region.
pub struct Wal {
    mmap: MmapMut,
    capacity: usize,
    write_pos: usize,
    saturated: bool,
    dropped_records: u64,
}

impl Wal {
    /// Creates (or truncates) the backing file at `path`, pre-allocates it
    /// to `capacity_bytes`, and maps it. A failed mapping at startup is
    /// fatal per `spec.md` §4.5.
    pub fn create(path: &Path, capacity_bytes: usize) -> std::io::Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)?;
        file.set_len(capacity_bytes as u64)?;

        // SAFETY: this process exclusively owns `path` for the lifetime of
        // the shard; nothing else truncates or remaps it concurrently.
        let mmap = unsafe { MmapMut::map_mut(&file)? };

        Ok(Self {
            mmap,
            capacity: capacity_bytes,
            write_pos: 0,
            saturated: false,
            dropped_records: 0,
        })
    }

    /// Appends one record. If it would overflow the mapping, the log
    /// transitions to SATURATED (logged once) and the append is skipped;
    /// the pipeline keeps running either way.
    pub fn append(&mut self, record: &LogRecord) {
        if self.saturated {
            self.dropped_records += 1;
            return;
        }

        let payload = match serde_json::to_vec(record) {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::warn!(error = %e, "failed to serialize WAL record, dropping");
                self.dropped_records += 1;
                return;
            }
        };

        let end = self.write_pos + LENGTH_PREFIX_SIZE + payload.len();
        if end > self.capacity {
            tracing::warn!(
                capacity = self.capacity,
                write_pos = self.write_pos,
                "WAL saturated, further appends are dropped"
            );
            self.saturated = true;
            self.dropped_records += 1;
            return;
        }

        let len_bytes = (payload.len() as u32).to_le_bytes();
        let len_start = self.write_pos;
        let payload_start = len_start + LENGTH_PREFIX_SIZE;
        self.mmap[len_start..payload_start].copy_from_slice(&len_bytes);
        self.mmap[payload_start..end].copy_from_slice(&payload);
        self.write_pos = end;
    }

    /// Forces the mapped region to durable storage. Called only at
    /// `endOfBatch`. A transient failure is logged and counted; it never
    /// stops the pipeline.
    pub fn force(&mut self) -> bool {
        match self.mmap.flush() {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(error = %e, "WAL force failed, will retry at next batch boundary");
                false
            }
        }
    }

    pub fn is_saturated(&self) -> bool {
        self.saturated
    }

    pub fn dropped_records(&self) -> u64 {
        self.dropped_records
    }
}

/// Sequentially parses records from a byte slice, for replay / tests. Stops
/// at the first zero-length prefix or when the slice is exhausted
/// (`spec.md` §4.5 invariant iii).
pub fn read_records(data: &[u8]) -> Vec<Vec<u8>> {
    let mut out = Vec::new();
    let mut offset = 0usize;

    while offset + LENGTH_PREFIX_SIZE <= data.len() {
        let len_bytes = &data[offset..offset + LENGTH_PREFIX_SIZE];
        let len = u32::from_le_bytes([len_bytes[0], len_bytes[1], len_bytes[2], len_bytes[3]]) as usize;
        if len == 0 {
            break;
        }
        let payload_start = offset + LENGTH_PREFIX_SIZE;
        let payload_end = payload_start + len;
        if payload_end > data.len() {
            break;
        }
        out.push(data[payload_start..payload_end].to_vec());
        offset = payload_end;
    }

    out
}
