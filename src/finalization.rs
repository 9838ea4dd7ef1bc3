//! Waiting on asynchronous confidential computations.
//!
//! The cluster announces completed computations by emitting a finalization
//! event into the ledger's transaction log. There is no ordered push
//! delivery, so the waiter re-scans the most recent log entries on a bounded
//! poll loop, matching event offsets against the outstanding set and exiting
//! early once every awaited offset has been seen.

use crate::config::FinalizationConfig;
use crate::error::{ClientError, ClientResult};
use crate::models::codec::discriminator;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use solana_sdk::pubkey::Pubkey;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, warn};

/// Event name the cluster program emits on computation completion
pub const FINALIZATION_EVENT_NAME: &str = "ComputationFinalized";

const LOG_DATA_PREFIX: &str = "Program data: ";

/// Event payload: discriminator (8) + offset (8) + program id (32) + status
const MIN_EVENT_LEN: usize = 48;

/// One transaction addressed to the cluster program
#[derive(Debug, Clone)]
pub struct LogEntry {
    pub signature: String,
    pub log_messages: Vec<String>,
}

/// Outcome reported by the confidential computation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComputationStatus {
    Success,
    InsufficientBalance,
    Aborted,
}

impl ComputationStatus {
    fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0 => Some(ComputationStatus::Success),
            1 => Some(ComputationStatus::InsufficientBalance),
            2 => Some(ComputationStatus::Aborted),
            _ => None,
        }
    }

    /// Surface a non-success status as the matching typed error
    pub fn into_result(self) -> ClientResult<()> {
        match self {
            ComputationStatus::Success => Ok(()),
            ComputationStatus::InsufficientBalance => Err(ClientError::InsufficientBalance),
            ComputationStatus::Aborted => Err(ClientError::AbortedComputation),
        }
    }
}

/// A matched finalization for one computation offset
#[derive(Debug, Clone)]
pub struct Finalization {
    pub offset: u64,
    pub signature: String,
    pub status: ComputationStatus,
}

/// Source of recent transactions addressed to the cluster program.
///
/// Production uses the RPC-backed ledger client; tests script an in-memory
/// sequence of scans.
pub trait TransactionLog: Send + Sync {
    fn recent_entries(&self, limit: usize) -> ClientResult<Vec<LogEntry>>;
}

/// Polls the transaction log until a set of computation offsets finalize
pub struct FinalizationWaiter {
    log: Arc<dyn TransactionLog>,
    program_id: Pubkey,
    config: FinalizationConfig,
}

impl FinalizationWaiter {
    /// Create a waiter matching events originating from `program_id`
    pub fn new(
        log: Arc<dyn TransactionLog>,
        program_id: Pubkey,
        config: FinalizationConfig,
    ) -> Self {
        Self {
            log,
            program_id,
            config,
        }
    }

    /// Await a single computation offset
    pub async fn await_one(&self, offset: u64) -> ClientResult<Finalization> {
        let mut results = self.await_batch(&[offset]).await?;
        results.remove(&offset).ok_or_else(|| {
            ClientError::Ledger("Finalization map missing awaited offset".to_string())
        })
    }

    /// Await a set of computation offsets, returning offset → finalization.
    ///
    /// Offsets finalize independently and may complete out of submission
    /// order. Offsets still outstanding after the polling budget surface as
    /// [`ClientError::FinalizationTimeout`]; the computations may still land,
    /// so callers may re-poll with the same offsets.
    pub async fn await_batch(&self, offsets: &[u64]) -> ClientResult<HashMap<u64, Finalization>> {
        let mut outstanding: HashSet<u64> = offsets.iter().copied().collect();
        let mut found: HashMap<u64, Finalization> = HashMap::new();

        if outstanding.is_empty() {
            return Ok(found);
        }

        for attempt in 0..self.config.max_attempts {
            match self.log.recent_entries(self.config.transaction_count_limit) {
                Ok(entries) => {
                    self.scan_entries(&entries, &mut outstanding, &mut found);
                    if outstanding.is_empty() {
                        debug!(
                            "All {} computation(s) finalized after {} attempt(s)",
                            found.len(),
                            attempt + 1
                        );
                        return Ok(found);
                    }
                }
                Err(e) => {
                    warn!("Transaction log scan failed (attempt {}): {}", attempt + 1, e);
                }
            }

            if attempt + 1 < self.config.max_attempts {
                tokio::time::sleep(self.config.poll_interval()).await;
            }
        }

        let mut missing: Vec<u64> = outstanding.into_iter().collect();
        missing.sort_unstable();
        Err(ClientError::FinalizationTimeout {
            attempts: self.config.max_attempts,
            missing,
        })
    }

    fn scan_entries(
        &self,
        entries: &[LogEntry],
        outstanding: &mut HashSet<u64>,
        found: &mut HashMap<u64, Finalization>,
    ) {
        for entry in entries {
            for line in &entry.log_messages {
                let event = match parse_finalization_event(line) {
                    Some(event) => event,
                    None => continue,
                };

                if event.program_id != self.program_id {
                    continue;
                }

                if outstanding.remove(&event.offset) {
                    debug!(
                        "Computation {} finalized in {} ({:?})",
                        event.offset, entry.signature, event.status
                    );
                    found.insert(
                        event.offset,
                        Finalization {
                            offset: event.offset,
                            signature: entry.signature.clone(),
                            status: event.status,
                        },
                    );
                }
            }

            if outstanding.is_empty() {
                break;
            }
        }
    }
}

/// A decoded finalization event
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FinalizationEvent {
    pub offset: u64,
    pub program_id: Pubkey,
    pub status: ComputationStatus,
}

/// Parse a finalization event out of one transaction log line.
///
/// Layout after the 8-byte `event:ComputationFinalized` discriminator:
/// offset u64 LE (8), originating program id (32), optional status byte
/// (absent means success). Anything that does not match decodes to `None`.
pub fn parse_finalization_event(line: &str) -> Option<FinalizationEvent> {
    let payload = line.strip_prefix(LOG_DATA_PREFIX)?;
    let data = BASE64.decode(payload.trim()).ok()?;

    if data.len() < MIN_EVENT_LEN {
        return None;
    }
    if data[..8] != discriminator("event", FINALIZATION_EVENT_NAME) {
        return None;
    }

    let mut offset_bytes = [0u8; 8];
    offset_bytes.copy_from_slice(&data[8..16]);
    let offset = u64::from_le_bytes(offset_bytes);

    let program_id = Pubkey::try_from(&data[16..48]).ok()?;

    let status = match data.get(MIN_EVENT_LEN) {
        Some(byte) => ComputationStatus::from_byte(*byte)?,
        None => ComputationStatus::Success,
    };

    Some(FinalizationEvent {
        offset,
        program_id,
        status,
    })
}

/// Encode a finalization event as the log line the cluster program would
/// emit. The inverse of [`parse_finalization_event`]; used by simulators and
/// test harnesses.
pub fn encode_finalization_event(
    offset: u64,
    program_id: &Pubkey,
    status: ComputationStatus,
) -> String {
    let mut data = Vec::with_capacity(MIN_EVENT_LEN + 1);
    data.extend_from_slice(&discriminator("event", FINALIZATION_EVENT_NAME));
    data.extend_from_slice(&offset.to_le_bytes());
    data.extend_from_slice(program_id.as_ref());
    data.push(match status {
        ComputationStatus::Success => 0,
        ComputationStatus::InsufficientBalance => 1,
        ComputationStatus::Aborted => 2,
    });

    format!("{}{}", LOG_DATA_PREFIX, BASE64.encode(data))
}
