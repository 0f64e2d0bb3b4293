//! Node configuration with TOML file support.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use ember_types::{BlockNumber, Checkpoint, UsdAmount, WeiAmount};
use ember_utils::LogFormat;

use crate::NodeError;

/// Configuration for an EMBER node.
///
/// Can be loaded from a TOML file via [`NodeConfig::from_toml_file`] or
/// built programmatically (e.g. for tests).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NodeConfig {
    /// Root of the record cache and report queue.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Ledger JSON-RPC endpoint.
    #[serde(default = "default_rpc_url")]
    pub rpc_url: String,

    /// Reuse cached records instead of re-fetching them.
    #[serde(default = "default_true")]
    pub use_cache: bool,

    /// First block to pull and process. Defaults to the latest built-in checkpoint.
    #[serde(default)]
    pub start_block: Option<BlockNumber>,

    /// ETH burned before `start_block`, as a decimal string. Required when
    /// `start_block` is not a built-in checkpoint.
    #[serde(default)]
    pub burned_before_eth: Option<String>,

    /// Puller sleep around the top of the hour (minutes 59, 00, 01).
    #[serde(default = "default_short_poll_secs")]
    pub puller_short_poll_secs: u64,

    /// Puller sleep for the rest of the hour.
    #[serde(default = "default_long_poll_secs")]
    pub puller_long_poll_secs: u64,

    /// Processor sleep when the next record is not cached yet.
    #[serde(default = "default_short_poll_secs")]
    pub processor_poll_secs: u64,

    /// Publisher sleep after publishing a report.
    #[serde(default = "default_short_poll_secs")]
    pub publisher_busy_secs: u64,

    /// Publisher sleep when nothing is pending.
    #[serde(default = "default_long_poll_secs")]
    pub publisher_idle_secs: u64,

    /// Cumulative-burn step, in whole ETH, that triggers a threshold report.
    #[serde(default = "default_eth_step")]
    pub eth_step: u64,

    /// Cumulative-burn value step, in whole dollars, that triggers a threshold report.
    #[serde(default = "default_usd_step")]
    pub usd_step: u64,

    /// Seconds before a fetched price is considered stale.
    #[serde(default = "default_price_staleness_secs")]
    pub price_staleness_secs: u64,

    /// Asset symbol the price source is queried for.
    #[serde(default = "default_price_symbol")]
    pub price_symbol: String,

    /// Log reports instead of committing them to published.
    #[serde(default)]
    pub dry_run: bool,

    /// Log format: "human" or "json".
    #[serde(default)]
    pub log_format: LogFormat,

    /// Log level filter: "trace", "debug", "info", "warn", "error".
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

// ── Serde default helpers ──────────────────────────────────────────────

fn default_data_dir() -> PathBuf {
    PathBuf::from("./ember_data")
}

fn default_rpc_url() -> String {
    "http://localhost:8545".to_string()
}

fn default_true() -> bool {
    true
}

fn default_short_poll_secs() -> u64 {
    1
}

fn default_long_poll_secs() -> u64 {
    10
}

fn default_eth_step() -> u64 {
    10_000
}

fn default_usd_step() -> u64 {
    1_000_000_000
}

fn default_price_staleness_secs() -> u64 {
    300
}

fn default_price_symbol() -> String {
    "ETH".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

// ── Impl ───────────────────────────────────────────────────────────────

impl NodeConfig {
    /// Load configuration from a TOML file.
    pub fn from_toml_file(path: &std::path::Path) -> Result<Self, NodeError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| NodeError::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self, NodeError> {
        toml::from_str(s).map_err(|e| NodeError::Config(e.to_string()))
    }

    /// Serialize the configuration to a TOML string.
    pub fn to_toml_string(&self) -> Result<String, NodeError> {
        toml::to_string_pretty(self).map_err(|e| NodeError::Config(e.to_string()))
    }

    /// The checkpoint processing starts from.
    ///
    /// An explicit `burned_before_eth` always wins; otherwise `start_block`
    /// must name a built-in checkpoint.
    pub fn checkpoint(&self) -> Result<Checkpoint, NodeError> {
        let Some(first_block) = self.start_block else {
            return Ok(Checkpoint::latest());
        };
        if let Some(burned) = &self.burned_before_eth {
            let burned_before = WeiAmount::parse_eth(burned)
                .map_err(|e| NodeError::Config(format!("burned_before_eth: {e}")))?;
            return Ok(Checkpoint {
                first_block,
                burned_before,
            });
        }
        Checkpoint::builtin(first_block).ok_or_else(|| {
            NodeError::Config(format!(
                "block {first_block} is not a built-in checkpoint; set burned_before_eth"
            ))
        })
    }

    pub fn eth_step_amount(&self) -> WeiAmount {
        WeiAmount::from_eth(self.eth_step)
    }

    pub fn usd_step_amount(&self) -> UsdAmount {
        UsdAmount::from_dollars(self.usd_step)
    }

    pub fn puller_intervals(&self) -> (Duration, Duration) {
        (
            Duration::from_secs(self.puller_short_poll_secs),
            Duration::from_secs(self.puller_long_poll_secs),
        )
    }

    /// Reject settings the loops cannot run with.
    pub fn validate(&self) -> Result<(), NodeError> {
        if self.eth_step == 0 {
            return Err(NodeError::Config("eth_step must be positive".into()));
        }
        if self.usd_step == 0 {
            return Err(NodeError::Config("usd_step must be positive".into()));
        }
        if self.rpc_url.is_empty() {
            return Err(NodeError::Config("rpc_url must not be empty".into()));
        }
        self.checkpoint().map(|_| ())
    }
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            rpc_url: default_rpc_url(),
            use_cache: default_true(),
            start_block: None,
            burned_before_eth: None,
            puller_short_poll_secs: default_short_poll_secs(),
            puller_long_poll_secs: default_long_poll_secs(),
            processor_poll_secs: default_short_poll_secs(),
            publisher_busy_secs: default_short_poll_secs(),
            publisher_idle_secs: default_long_poll_secs(),
            eth_step: default_eth_step(),
            usd_step: default_usd_step(),
            price_staleness_secs: default_price_staleness_secs(),
            price_symbol: default_price_symbol(),
            dry_run: false,
            log_format: LogFormat::default(),
            log_level: default_log_level(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ember_types::LONDON;

    #[test]
    fn default_config_round_trips_through_toml() {
        let config = NodeConfig::default();
        let toml_str = config.to_toml_string().unwrap();
        let parsed = NodeConfig::from_toml_str(&toml_str).expect("should parse");
        assert_eq!(parsed.rpc_url, config.rpc_url);
        assert_eq!(parsed.eth_step, config.eth_step);
        assert_eq!(parsed.log_format, config.log_format);
    }

    #[test]
    fn minimal_toml_uses_defaults() {
        let config = NodeConfig::from_toml_str("").expect("empty toml should use defaults");
        assert!(config.use_cache);
        assert_eq!(config.eth_step, 10_000);
        assert_eq!(config.usd_step, 1_000_000_000);
        assert_eq!(config.price_staleness_secs, 300);
        assert_eq!(config.puller_intervals(), (Duration::from_secs(1), Duration::from_secs(10)));
        assert_eq!(config.log_format, LogFormat::Human);
    }

    #[test]
    fn partial_toml_overrides() {
        let toml = r#"
            rpc_url = "http://geth:8545"
            use_cache = false
            log_format = "json"
        "#;
        let config = NodeConfig::from_toml_str(toml).expect("should parse");
        assert_eq!(config.rpc_url, "http://geth:8545");
        assert!(!config.use_cache);
        assert_eq!(config.log_format, LogFormat::Json);
        assert_eq!(config.log_level, "info"); // default
    }

    #[test]
    fn checkpoint_defaults_to_latest_builtin() {
        let config = NodeConfig::default();
        assert_eq!(config.checkpoint().unwrap(), Checkpoint::latest());
    }

    #[test]
    fn builtin_start_block_resolves() {
        let config = NodeConfig {
            start_block: Some(LONDON),
            ..NodeConfig::default()
        };
        let checkpoint = config.checkpoint().unwrap();
        assert_eq!(checkpoint.first_block, LONDON);
        assert!(checkpoint.burned_before.is_zero());
    }

    #[test]
    fn custom_start_block_needs_seed() {
        let mut config = NodeConfig {
            start_block: Some(13_000_000),
            ..NodeConfig::default()
        };
        assert!(matches!(config.checkpoint(), Err(NodeError::Config(_))));

        config.burned_before_eth = Some("12345.5".into());
        let checkpoint = config.checkpoint().unwrap();
        assert_eq!(checkpoint.burned_before, WeiAmount::new(12_345_500_000_000_000_000_000));
    }

    #[test]
    fn zero_step_is_rejected() {
        let config = NodeConfig {
            eth_step: 0,
            ..NodeConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn unknown_field_type_is_config_error() {
        assert!(matches!(
            NodeConfig::from_toml_str("eth_step = \"lots\""),
            Err(NodeError::Config(_))
        ));
    }
}
