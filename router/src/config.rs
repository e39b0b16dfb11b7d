//! Startup configuration for the router process. `spec.md` §6
//! "Configuration (router)": a shard id → base URL map and a shard id →
//! symbol list map, both supplied as structured strings.

use clap::Parser;
use std::collections::HashMap;

/// Command-line/environment configuration for the router.
#[derive(Parser, Debug, Clone)]
#[command(name = "router", author, version, about = "Stateless symbol-to-shard routing proxy")]
pub struct RouterConfig {
    /// Port the router's own HTTP surface binds to.
    #[arg(long, env = "ROUTER_PORT", default_value_t = 6000)]
    pub port: u16,

    /// Port the Prometheus scrape endpoint binds to.
    #[arg(long, env = "ROUTER_METRICS_PORT", default_value_t = 9100)]
    pub metrics_port: u16,

    /// Repeated `shard_id=base_url` pairs, e.g. `--shard-url shard-a=http://127.0.0.1:7000`.
    #[arg(long = "shard-url", value_parser = parse_kv, required = true)]
    pub shard_urls: Vec<(String, String)>,

    /// Repeated `shard_id=sym1,sym2,...` pairs describing which symbols a
    /// shard owns, e.g. `--shard-symbols shard-a=TEST-ASSET-A,TEST-ASSET-B`.
    #[arg(long = "shard-symbols", value_parser = parse_kv, required = true)]
    pub shard_symbols: Vec<(String, String)>,

    /// Bounded timeout for a single shard round-trip, per `spec.md` §5.
    #[arg(long, env = "ROUTER_SHARD_TIMEOUT_MS", default_value_t = 5_000)]
    pub shard_timeout_ms: u64,
}

fn parse_kv(raw: &str) -> Result<(String, String), String> {
    raw.split_once('=')
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .ok_or_else(|| format!("expected `key=value`, got `{raw}`"))
}

/// Derived, queryable routing tables built once at startup from the raw
/// `key=value` pairs on `RouterConfig`.
pub struct RoutingTables {
    /// shard id -> base URL, e.g. `shard-a` -> `http://127.0.0.1:7000`.
    pub shard_base_urls: HashMap<String, String>,
    /// symbol -> owning shard id.
    pub symbol_to_shard: HashMap<String, String>,
}

impl RoutingTables {
    pub fn build(config: &RouterConfig) -> Self {
        let shard_base_urls: HashMap<String, String> = config.shard_urls.iter().cloned().collect();

        let mut symbol_to_shard = HashMap::new();
        for (shard_id, symbols) in &config.shard_symbols {
            for symbol in symbols.split(',').filter(|s| !s.is_empty()) {
                symbol_to_shard.insert(symbol.to_string(), shard_id.clone());
            }
        }

        Self { shard_base_urls, symbol_to_shard }
    }

    pub fn shard_for_symbol(&self, symbol: &str) -> Option<&str> {
        self.symbol_to_shard.get(symbol).map(String::as_str)
    }

    pub fn base_url_for_shard(&self, shard_id: &str) -> Option<&str> {
        self.shard_base_urls.get(shard_id).map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn symbol_lookup_resolves_to_owning_shard() {
        let config = RouterConfig {
            port: 6000,
            metrics_port: 9100,
            shard_urls: vec![
                ("shard-a".into(), "http://127.0.0.1:7000".into()),
                ("shard-b".into(), "http://127.0.0.1:7001".into()),
            ],
            shard_symbols: vec![
                ("shard-a".into(), "A,B".into()),
                ("shard-b".into(), "E,F".into()),
            ],
            shard_timeout_ms: 5000,
        };
        let tables = RoutingTables::build(&config);

        assert_eq!(tables.shard_for_symbol("A"), Some("shard-a"));
        assert_eq!(tables.shard_for_symbol("E"), Some("shard-b"));
        assert_eq!(tables.shard_for_symbol("Z"), None);
        assert_eq!(tables.base_url_for_shard("shard-a"), Some("http://127.0.0.1:7000"));
    }
}
