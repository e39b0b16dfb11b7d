//! Startup configuration for a shard process. Read once; never hot-reloaded.

use clap::Parser;

/// Command-line/environment configuration for one shard instance.
///
/// Every field can also be supplied as an environment variable (see the
/// `env` attribute on each arg), matching the "external configuration
/// provider" framing of the system this binary is one component of.
#[derive(Parser, Debug, Clone)]
#[command(name = "shard", author, version, about = "Single-shard order matching pipeline")]
pub struct ShardConfig {
    /// Identifier of this shard, echoed back in ingress responses.
    #[arg(long, env = "SHARD_ID")]
    pub shard_id: String,

    /// Comma-separated list of symbols this shard owns. Submissions for any
    /// other symbol are rejected at ingress.
    #[arg(long, env = "SHARD_SYMBOLS", value_delimiter = ',')]
    pub symbols: Vec<String>,

    /// Port the submit/seed/health HTTP surface binds to.
    #[arg(long, env = "SHARD_SUBMIT_PORT", default_value_t = 7000)]
    pub submit_port: u16,

    /// Port the Prometheus scrape endpoint binds to.
    #[arg(long, env = "SHARD_METRICS_PORT", default_value_t = 9000)]
    pub metrics_port: u16,

    /// Address of the downstream event broker, e.g. `nats://127.0.0.1:4222`.
    #[arg(long, env = "SHARD_BROKER_ADDR")]
    pub broker_addr: String,

    /// Path to the memory-mapped write-ahead log file.
    #[arg(long, env = "SHARD_WAL_PATH")]
    pub wal_path: std::path::PathBuf,

    /// Size of the WAL mapping, in MiB.
    #[arg(long, env = "SHARD_WAL_SIZE_MIB", default_value_t = 64)]
    pub wal_size_mib: u64,

    /// Sequencer ring buffer capacity. Must be a power of two.
    #[arg(long, env = "SHARD_RING_CAPACITY", default_value_t = 131_072)]
    pub ring_capacity: usize,
}

impl ShardConfig {
    pub fn wal_size_bytes(&self) -> usize {
        (self.wal_size_mib as usize) * 1024 * 1024
    }

    pub fn owns_symbol(&self, symbol: &str) -> bool {
        self.symbols.iter().any(|s| s == symbol)
    }
}
