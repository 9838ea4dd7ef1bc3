//! RPC-backed ledger client.
//!
//! The ledger is treated as a key-value store of accounts at derived
//! addresses plus an append-only transaction log. This module owns the RPC
//! connection, keypair handling, transaction submission, typed account
//! reads, and the transaction-log scan consumed by the finalization waiter.

use crate::config::LedgerConfig;
use crate::error::{ClientError, ClientResult};
use crate::finalization::{LogEntry, TransactionLog};
use crate::models::{CreditBalance, Market, MarketOption, ShareRecord};
use solana_client::rpc_client::{GetConfirmedSignaturesForAddress2Config, RpcClient};
use solana_client::rpc_config::RpcTransactionConfig;
use solana_sdk::commitment_config::CommitmentConfig;
use solana_sdk::instruction::Instruction;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::{Keypair, Signature, Signer};
use solana_sdk::transaction::Transaction;
use solana_transaction_status::UiTransactionEncoding;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, info};

/// Ledger client for account reads, transaction submission and log scans
pub struct LedgerClient {
    program_id: Pubkey,
    cluster_program_id: Pubkey,
    cluster_public_key: [u8; 32],
    /// Signing keypair (loaded from file or env)
    keypair: Option<Arc<Keypair>>,
    rpc_client: RpcClient,
    commitment: CommitmentConfig,
}

impl LedgerClient {
    /// Create a new ledger client from configuration
    pub fn new(config: &LedgerConfig) -> ClientResult<Self> {
        let program_id = Pubkey::from_str(&config.program_id)
            .map_err(|e| ClientError::Config(format!("Invalid market program ID: {}", e)))?;

        let cluster_program_id = Pubkey::from_str(&config.cluster_program_id)
            .map_err(|e| ClientError::Config(format!("Invalid cluster program ID: {}", e)))?;

        let key_bytes = hex::decode(&config.cluster_public_key)
            .map_err(|e| ClientError::Config(format!("Invalid cluster public key: {}", e)))?;
        let cluster_public_key: [u8; 32] = key_bytes.try_into().map_err(|_| {
            ClientError::Config("Cluster public key must be 32 bytes".to_string())
        })?;

        let commitment = CommitmentConfig::confirmed();
        let rpc_client =
            RpcClient::new_with_commitment(config.rpc_url.clone(), commitment);

        Ok(Self {
            program_id,
            cluster_program_id,
            cluster_public_key,
            keypair: None,
            rpc_client,
            commitment,
        })
    }

    /// Load signing keypair from file
    pub fn with_keypair_file(mut self, path: &str) -> ClientResult<Self> {
        let keypair_bytes = std::fs::read(path)
            .map_err(|e| ClientError::Config(format!("Failed to read keypair file: {}", e)))?;

        let keypair: Vec<u8> = serde_json::from_slice(&keypair_bytes)
            .map_err(|e| ClientError::Config(format!("Failed to parse keypair: {}", e)))?;

        let keypair = Keypair::from_bytes(keypair.as_slice())
            .map_err(|e| ClientError::Config(format!("Invalid keypair: {}", e)))?;

        info!("Loaded signing keypair: {}", keypair.pubkey());
        self.keypair = Some(Arc::new(keypair));

        Ok(self)
    }

    /// Load signing keypair from environment variable (base58 or JSON array)
    pub fn with_keypair_env(mut self, env_var: &str) -> ClientResult<Self> {
        let keypair_str = std::env::var(env_var)
            .map_err(|_| ClientError::Config(format!("Keypair env var {} not set", env_var)))?;

        let keypair = if keypair_str.starts_with('[') {
            let keypair_bytes: Vec<u8> = serde_json::from_str(&keypair_str)
                .map_err(|e| ClientError::Config(format!("Failed to parse keypair JSON: {}", e)))?;
            Keypair::from_bytes(keypair_bytes.as_slice())
                .map_err(|e| ClientError::Config(format!("Invalid keypair bytes: {}", e)))?
        } else {
            let keypair_bytes = bs58::decode(&keypair_str)
                .into_vec()
                .map_err(|e| ClientError::Config(format!("Failed to decode base58 keypair: {}", e)))?;
            Keypair::from_bytes(keypair_bytes.as_slice())
                .map_err(|e| ClientError::Config(format!("Invalid keypair: {}", e)))?
        };

        info!("Loaded signing keypair from env: {}", keypair.pubkey());
        self.keypair = Some(Arc::new(keypair));

        Ok(self)
    }

    /// Check if a signing keypair is loaded
    pub fn has_keypair(&self) -> bool {
        self.keypair.is_some()
    }

    /// The market program that owns every derived account
    pub fn program_id(&self) -> Pubkey {
        self.program_id
    }

    /// The computation cluster program whose log carries finalizations
    pub fn cluster_program_id(&self) -> Pubkey {
        self.cluster_program_id
    }

    /// The cluster's X25519 public key for encryption contexts
    pub fn cluster_public_key(&self) -> [u8; 32] {
        self.cluster_public_key
    }

    /// Public key of the loaded signer
    pub fn signer_pubkey(&self) -> ClientResult<Pubkey> {
        self.keypair
            .as_ref()
            .map(|kp| kp.pubkey())
            .ok_or_else(|| ClientError::Config("No keypair configured".to_string()))
    }

    // ========================================================================
    // Transactions
    // ========================================================================

    /// Sign, send and confirm a single-instruction transaction
    pub async fn send_instruction(&self, instruction: Instruction) -> ClientResult<Signature> {
        let keypair = self
            .keypair
            .as_ref()
            .ok_or_else(|| ClientError::Config("No keypair configured".to_string()))?;

        let recent_blockhash = self
            .rpc_client
            .get_latest_blockhash()
            .map_err(|e| ClientError::Ledger(format!("Failed to get blockhash: {}", e)))?;

        let transaction = Transaction::new_signed_with_payer(
            &[instruction],
            Some(&keypair.pubkey()),
            &[keypair.as_ref()],
            recent_blockhash,
        );

        let signature = self
            .rpc_client
            .send_and_confirm_transaction(&transaction)
            .map_err(|e| ClientError::Ledger(format!("Transaction failed: {}", e)))?;

        Ok(signature)
    }

    // ========================================================================
    // Account reads
    // ========================================================================

    /// Get account balance in the ledger's native unit
    pub async fn get_balance(&self, address: &Pubkey) -> ClientResult<u64> {
        self.rpc_client
            .get_balance(address)
            .map_err(|e| ClientError::Ledger(format!("Failed to get balance: {}", e)))
    }

    /// Fetch raw account data, mapping a missing account to `None`
    pub fn get_account_data(&self, address: &Pubkey) -> ClientResult<Option<Vec<u8>>> {
        match self.rpc_client.get_account(address) {
            Ok(account) => Ok(Some(account.data)),
            Err(e) => {
                let error_str = e.to_string();
                if error_str.contains("AccountNotFound")
                    || error_str.contains("could not find account")
                {
                    debug!("Account {} not found", address);
                    Ok(None)
                } else {
                    Err(ClientError::Ledger(format!("Failed to fetch account: {}", e)))
                }
            }
        }
    }

    /// Fetch and decode a market
    pub fn get_market(&self, address: &Pubkey) -> ClientResult<Option<Market>> {
        self.get_account_data(address)?
            .map(|data| Market::try_from_bytes(&data))
            .transpose()
    }

    /// Fetch and decode a market, erroring when absent
    pub fn require_market(&self, address: &Pubkey) -> ClientResult<Market> {
        self.get_market(address)?
            .ok_or_else(|| ClientError::NotFound(format!("Market {}", address)))
    }

    /// Fetch and decode a market option
    pub fn get_option(&self, address: &Pubkey) -> ClientResult<Option<MarketOption>> {
        self.get_account_data(address)?
            .map(|data| MarketOption::try_from_bytes(&data))
            .transpose()
    }

    /// Fetch and decode a market option, erroring when absent
    pub fn require_option(&self, address: &Pubkey) -> ClientResult<MarketOption> {
        self.get_option(address)?
            .ok_or_else(|| ClientError::NotFound(format!("Market option {}", address)))
    }

    /// Fetch and decode a share record
    pub fn get_share_record(&self, address: &Pubkey) -> ClientResult<Option<ShareRecord>> {
        self.get_account_data(address)?
            .map(|data| ShareRecord::try_from_bytes(&data))
            .transpose()
    }

    /// Fetch and decode a share record, erroring when absent
    pub fn require_share_record(&self, address: &Pubkey) -> ClientResult<ShareRecord> {
        self.get_share_record(address)?
            .ok_or_else(|| ClientError::NotFound(format!("Share record {}", address)))
    }

    /// Fetch and decode a vote-credit balance
    pub fn get_credit_balance(&self, address: &Pubkey) -> ClientResult<Option<CreditBalance>> {
        self.get_account_data(address)?
            .map(|data| CreditBalance::try_from_bytes(&data))
            .transpose()
    }
}

impl TransactionLog for LedgerClient {
    /// Scan the most recent transactions addressed to the cluster program
    fn recent_entries(&self, limit: usize) -> ClientResult<Vec<LogEntry>> {
        let signatures = self
            .rpc_client
            .get_signatures_for_address_with_config(
                &self.cluster_program_id,
                GetConfirmedSignaturesForAddress2Config {
                    limit: Some(limit),
                    commitment: Some(self.commitment),
                    ..Default::default()
                },
            )
            .map_err(|e| ClientError::Ledger(format!("Failed to list signatures: {}", e)))?;

        let mut entries = Vec::with_capacity(signatures.len());
        for sig_info in signatures {
            let signature = match Signature::from_str(&sig_info.signature) {
                Ok(sig) => sig,
                Err(_) => continue,
            };

            let tx = match self.rpc_client.get_transaction_with_config(
                &signature,
                RpcTransactionConfig {
                    encoding: Some(UiTransactionEncoding::Json),
                    commitment: Some(self.commitment),
                    max_supported_transaction_version: Some(0),
                },
            ) {
                Ok(tx) => tx,
                Err(e) => {
                    debug!("Skipping transaction {}: {}", sig_info.signature, e);
                    continue;
                }
            };

            let log_messages: Vec<String> = tx
                .transaction
                .meta
                .and_then(|meta| Option::<Vec<String>>::from(meta.log_messages))
                .unwrap_or_default();

            entries.push(LogEntry {
                signature: sig_info.signature,
                log_messages,
            });
        }

        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LedgerConfig;

    #[test]
    fn test_client_creation_from_default_config() {
        let client = LedgerClient::new(&LedgerConfig::default()).unwrap();
        assert!(!client.has_keypair());
        assert_ne!(client.program_id(), client.cluster_program_id());
        assert_eq!(client.cluster_public_key(), [0u8; 32]);
    }

    #[test]
    fn test_invalid_program_id_rejected() {
        let config = LedgerConfig {
            program_id: "not-a-pubkey".to_string(),
            ..LedgerConfig::default()
        };
        assert!(matches!(
            LedgerClient::new(&config),
            Err(ClientError::Config(_))
        ));
    }

    #[test]
    fn test_invalid_cluster_key_rejected() {
        let config = LedgerConfig {
            cluster_public_key: "zz".to_string(),
            ..LedgerConfig::default()
        };
        assert!(matches!(
            LedgerClient::new(&config),
            Err(ClientError::Config(_))
        ));
    }

    #[test]
    fn test_signer_required_for_submission() {
        let client = LedgerClient::new(&LedgerConfig::default()).unwrap();
        assert!(matches!(
            client.signer_pubkey(),
            Err(ClientError::Config(_))
        ));
    }
}
