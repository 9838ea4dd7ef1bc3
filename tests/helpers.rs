use conviction_core::error::{ClientError, ClientResult};
use conviction_core::finalization::{LogEntry, TransactionLog};
use conviction_core::models::{Market, ShareRecord};
use solana_sdk::pubkey::Pubkey;
use std::collections::VecDeque;
use std::sync::Mutex;

/// Transaction log that replays a scripted sequence of scans.
///
/// Each call to `recent_entries` consumes the next scripted scan; once the
/// script runs out, further scans see an empty log.
pub struct ScriptedLog {
    scans: Mutex<VecDeque<ClientResult<Vec<LogEntry>>>>,
}

impl ScriptedLog {
    pub fn new(scans: Vec<Vec<LogEntry>>) -> Self {
        Self {
            scans: Mutex::new(scans.into_iter().map(Ok).collect()),
        }
    }

    /// Script a failing scan at the given position in the sequence
    pub fn with_error_at(self, position: usize) -> Self {
        self.scans.lock().unwrap().insert(
            position,
            Err(ClientError::Ledger("scripted scan failure".to_string())),
        );
        self
    }
}

impl TransactionLog for ScriptedLog {
    fn recent_entries(&self, _limit: usize) -> ClientResult<Vec<LogEntry>> {
        match self.scans.lock().unwrap().pop_front() {
            Some(result) => result,
            None => Ok(Vec::new()),
        }
    }
}

/// Build a log entry from a signature and its log lines
pub fn entry(signature: &str, log_messages: Vec<String>) -> LogEntry {
    LogEntry {
        signature: signature.to_string(),
        log_messages,
    }
}

/// Market fixture: opens at 1_000, stakes for 100s, reveals for 50s
pub fn test_market(open: Option<u64>, selected: Option<u16>) -> Market {
    Market {
        creator: Pubkey::new_unique(),
        index: 0,
        total_options: 3,
        max_options: 4,
        open_timestamp: open,
        time_to_stake: 100,
        time_to_reveal: 50,
        selected_option: selected,
        reward_amount: 1_000_000,
        market_authority: None,
    }
}

/// Share record fixture staked at the given timestamp
pub fn test_record(market: Pubkey, staked_at: u64) -> ShareRecord {
    ShareRecord {
        owner: Pubkey::new_unique(),
        market,
        ordinal: 0,
        encrypted_state: [[0u8; 32]; 2],
        state_nonce: 1,
        staked_at_timestamp: staked_at,
        revealed_amount: None,
        revealed_option: None,
        revealed_score: None,
        revealed_in_time: false,
        total_incremented: false,
        claimed_yield: false,
    }
}
