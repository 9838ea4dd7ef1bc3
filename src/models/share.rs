use crate::error::{ClientError, ClientResult};
use crate::models::codec::{ByteReader, ByteWriter};
use serde::{Deserialize, Serialize};
use solana_sdk::pubkey::Pubkey;

/// Share record lifecycle state, derived from the record fields
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShareState {
    Created,
    Revealed,
    TallyIncremented,
    Closed,
}

impl ShareState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ShareState::Created => "created",
            ShareState::Revealed => "revealed",
            ShareState::TallyIncremented => "tally_incremented",
            ShareState::Closed => "closed",
        }
    }
}

/// A participant's stake position in one market
///
/// Identity is (owner, market, ordinal); the ordinal allows multiple
/// concurrent records per owner when the multi-stake policy permits it.
/// The staked amount and chosen option live only in `encrypted_state` until
/// the record is revealed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShareRecord {
    pub owner: Pubkey,
    pub market: Pubkey,
    pub ordinal: u32,

    /// Ciphertext cells for (amount, selected option)
    pub encrypted_state: [[u8; 32]; 2],
    pub state_nonce: u128,

    /// Set at creation; the basis for time weighting
    pub staked_at_timestamp: u64,

    pub revealed_amount: Option<u64>,
    pub revealed_option: Option<u16>,

    /// amount × (stake-period end − staked_at), fixed at reveal
    pub revealed_score: Option<u64>,

    /// Whether the reveal request landed within the reveal window
    pub revealed_in_time: bool,

    /// Latch: this record's tally has been folded into its option aggregate
    pub total_incremented: bool,

    /// Latch: stake has been returned (and yield paid, if eligible)
    pub claimed_yield: bool,
}

impl ShareRecord {
    /// Derive the record's lifecycle state.
    ///
    /// Each latch subsumes the earlier states, so the checks run newest
    /// first.
    pub fn state(&self) -> ShareState {
        if self.claimed_yield {
            ShareState::Closed
        } else if self.total_incremented {
            ShareState::TallyIncremented
        } else if self.revealed_amount.is_some() {
            ShareState::Revealed
        } else {
            ShareState::Created
        }
    }

    /// Precondition for Created → Revealed
    pub fn ensure_can_reveal(&self) -> ClientResult<()> {
        match self.state() {
            ShareState::Created => Ok(()),
            later => Err(ClientError::DuplicateTransition(format!(
                "Record is already {}, reveal happens at most once",
                later.as_str()
            ))),
        }
    }

    /// Precondition for Revealed → TallyIncremented
    pub fn ensure_can_increment(&self) -> ClientResult<()> {
        match self.state() {
            ShareState::Created => Err(ClientError::Validation(
                "Record has not been revealed; nothing to tally".to_string(),
            )),
            ShareState::Revealed => {
                if self.revealed_in_time {
                    Ok(())
                } else {
                    Err(ClientError::Validation(
                        "Record was revealed after the deadline and is not tally-eligible"
                            .to_string(),
                    ))
                }
            }
            later => Err(ClientError::DuplicateTransition(format!(
                "Record is already {}, tally increments at most once",
                later.as_str()
            ))),
        }
    }

    /// Precondition for {Revealed, TallyIncremented} → Closed.
    ///
    /// A never-revealed record may still close for stake return only.
    pub fn ensure_can_close(&self) -> ClientResult<()> {
        if self.state() == ShareState::Closed {
            return Err(ClientError::DuplicateTransition(
                "Record is already closed".to_string(),
            ));
        }
        Ok(())
    }

    /// Whether this record earns a yield share once the market resolves
    pub fn is_yield_eligible(&self, selected_option: u16) -> bool {
        self.revealed_in_time
            && self.total_incremented
            && self.revealed_option == Some(selected_option)
    }

    /// Apply the disclosed fields produced by the reveal computation
    pub fn apply_reveal(&mut self, amount: u64, option: u16, score: u64, in_time: bool) {
        self.revealed_amount = Some(amount);
        self.revealed_option = Some(option);
        self.revealed_score = Some(score);
        self.revealed_in_time = in_time;
    }

    // ========================================================================
    // Wire codec
    // ========================================================================

    /// Parse a ShareRecord from raw account data
    pub fn try_from_bytes(data: &[u8]) -> ClientResult<Self> {
        let mut r = ByteReader::for_account(data, "ShareRecord")?;
        Ok(Self {
            owner: r.read_pubkey()?,
            market: r.read_pubkey()?,
            ordinal: r.read_u32()?,
            encrypted_state: [r.read_cell()?, r.read_cell()?],
            state_nonce: r.read_u128()?,
            staked_at_timestamp: r.read_u64()?,
            revealed_amount: r.read_option_u64()?,
            revealed_option: r.read_option_u16()?,
            revealed_score: r.read_option_u64()?,
            revealed_in_time: r.read_bool()?,
            total_incremented: r.read_bool()?,
            claimed_yield: r.read_bool()?,
        })
    }

    /// Serialize to raw account data
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut w = ByteWriter::for_account("ShareRecord");
        w.put_pubkey(&self.owner);
        w.put_pubkey(&self.market);
        w.put_u32(self.ordinal);
        w.put_cell(&self.encrypted_state[0]);
        w.put_cell(&self.encrypted_state[1]);
        w.put_u128(self.state_nonce);
        w.put_u64(self.staked_at_timestamp);
        w.put_option_u64(self.revealed_amount);
        w.put_option_u16(self.revealed_option);
        w.put_option_u64(self.revealed_score);
        w.put_bool(self.revealed_in_time);
        w.put_bool(self.total_incremented);
        w.put_bool(self.claimed_yield);
        w.into_bytes()
    }
}
