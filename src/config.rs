use std::env;
use std::time::Duration;

/// Ledger connection configuration
#[derive(Debug, Clone)]
pub struct LedgerConfig {
    pub rpc_url: String,
    /// Market program that owns every derived account
    pub program_id: String,
    /// Computation cluster program whose log carries finalization events
    pub cluster_program_id: String,
    /// Cluster X25519 public key (hex, 32 bytes), used for key agreement
    pub cluster_public_key: String,
}

/// Finalization waiter configuration
///
/// Tests should use small values here; the defaults give the waiter a polling
/// budget on the order of two minutes.
#[derive(Debug, Clone)]
pub struct FinalizationConfig {
    pub poll_interval_ms: u64,
    pub max_attempts: u32,
    /// How many recent log entries to scan per attempt
    pub transaction_count_limit: usize,
}

/// Whether options may be added before the market has been opened
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionCreationPolicy {
    /// Options may only be added while staking is open
    StakingOnly,
    /// Options may also be added before the market is funded/opened
    AllowBeforeOpen,
}

/// How many share records one owner may hold in a single market
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MultiStakePolicy {
    /// One record per (owner, market); ordinal is always zero
    SingleRecordPerMarket,
    /// Any number of records, distinguished by ordinal, any mix of options
    MultiplePerMarket,
}

/// Market policy knobs that the observed behavior leaves open
#[derive(Debug, Clone, Copy)]
pub struct PolicyConfig {
    pub option_creation: OptionCreationPolicy,
    pub multi_stake: MultiStakePolicy,
}

/// Application configuration
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub ledger: LedgerConfig,
    pub finalization: FinalizationConfig,
    pub policy: PolicyConfig,
    pub log_level: String,
}

impl LedgerConfig {
    /// Create ledger config from environment variables
    pub fn from_env() -> Result<Self, String> {
        let rpc_url = env::var("LEDGER_RPC_URL")
            .unwrap_or_else(|_| "https://api.devnet.solana.com".to_string());

        let program_id = env::var("MARKET_PROGRAM_ID")
            .map_err(|_| "MARKET_PROGRAM_ID environment variable is required")?;

        let cluster_program_id = env::var("CLUSTER_PROGRAM_ID")
            .map_err(|_| "CLUSTER_PROGRAM_ID environment variable is required")?;

        let cluster_public_key = env::var("CLUSTER_PUBLIC_KEY")
            .map_err(|_| "CLUSTER_PUBLIC_KEY environment variable is required")?;

        if cluster_public_key.len() != 64 {
            return Err("CLUSTER_PUBLIC_KEY must be 32 bytes hex-encoded".to_string());
        }

        Ok(Self {
            rpc_url,
            program_id,
            cluster_program_id,
            cluster_public_key,
        })
    }
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            rpc_url: "https://api.devnet.solana.com".to_string(),
            program_id: "9S2jwzSchNfJeY6AfMSnoTAetxGLFAYEPF8yYYndeJzb".to_string(),
            cluster_program_id: "7kDaeBNMKDnBdbrrUMUMNfC4EcmdCwGdBxoXYY95Eb3U".to_string(),
            cluster_public_key: hex::encode([0u8; 32]),
        }
    }
}

impl FinalizationConfig {
    /// Create finalization config from environment variables
    pub fn from_env() -> Result<Self, String> {
        let poll_interval_ms = env::var("FINALIZATION_POLL_INTERVAL_MS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(1_000);

        let max_attempts = env::var("FINALIZATION_MAX_ATTEMPTS")
            .ok()
            .and_then(|s| s.parse::<u32>().ok())
            .unwrap_or(120);

        let transaction_count_limit = env::var("FINALIZATION_SCAN_LIMIT")
            .ok()
            .and_then(|s| s.parse::<usize>().ok())
            .unwrap_or(10);

        // Validate configuration
        if max_attempts == 0 {
            return Err("FINALIZATION_MAX_ATTEMPTS must be greater than 0".to_string());
        }

        if transaction_count_limit == 0 {
            return Err("FINALIZATION_SCAN_LIMIT must be greater than 0".to_string());
        }

        Ok(Self {
            poll_interval_ms,
            max_attempts,
            transaction_count_limit,
        })
    }

    /// Get poll interval as Duration
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

impl Default for FinalizationConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 1_000,
            max_attempts: 120,
            transaction_count_limit: 10,
        }
    }
}

impl PolicyConfig {
    /// Create policy config from environment variables
    pub fn from_env() -> Result<Self, String> {
        let option_creation = match env::var("OPTION_CREATION_POLICY").ok().as_deref() {
            None | Some("allow_before_open") => OptionCreationPolicy::AllowBeforeOpen,
            Some("staking_only") => OptionCreationPolicy::StakingOnly,
            Some(other) => {
                return Err(format!(
                    "Invalid OPTION_CREATION_POLICY: {}. Must be one of: staking_only, allow_before_open",
                    other
                ))
            }
        };

        let multi_stake = match env::var("MULTI_STAKE_POLICY").ok().as_deref() {
            None | Some("multiple") => MultiStakePolicy::MultiplePerMarket,
            Some("single") => MultiStakePolicy::SingleRecordPerMarket,
            Some(other) => {
                return Err(format!(
                    "Invalid MULTI_STAKE_POLICY: {}. Must be one of: single, multiple",
                    other
                ))
            }
        };

        Ok(Self {
            option_creation,
            multi_stake,
        })
    }
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            option_creation: OptionCreationPolicy::AllowBeforeOpen,
            multi_stake: MultiStakePolicy::MultiplePerMarket,
        }
    }
}

impl ClientConfig {
    /// Create application config from environment variables
    pub fn from_env() -> Result<Self, String> {
        let ledger = LedgerConfig::from_env()?;
        let finalization = FinalizationConfig::from_env()?;
        let policy = PolicyConfig::from_env()?;

        let log_level = env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        // Validate log level
        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&log_level.to_lowercase().as_str()) {
            return Err(format!(
                "Invalid LOG_LEVEL: {}. Must be one of: {:?}",
                log_level, valid_log_levels
            ));
        }

        Ok(Self {
            ledger,
            finalization,
            policy,
            log_level: log_level.to_lowercase(),
        })
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            ledger: LedgerConfig::default(),
            finalization: FinalizationConfig::default(),
            policy: PolicyConfig::default(),
            log_level: "info".to_string(),
        }
    }
}
