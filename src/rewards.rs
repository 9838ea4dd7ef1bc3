//! Time-weighted reward computation.
//!
//! A record's conviction score is its stake amount multiplied by the time it
//! stayed staked until the stake period closed. Once a market resolves, the
//! reward pool is split across eligible winning records in proportion to
//! score, with floor division; the residue stays unspent in the pool.

use crate::error::ClientError;
use serde::{Deserialize, Serialize};
use solana_sdk::pubkey::Pubkey;
use thiserror::Error;

/// Error types for reward computations
#[derive(Error, Debug)]
pub enum RewardError {
    #[error("Arithmetic overflow in reward computation")]
    Overflow,

    #[error("Record staked after the stake period ended")]
    StakedAfterClose,

    #[error("Total winning score is zero")]
    ZeroTotalScore,

    #[error("Record score exceeds the total winning score")]
    ScoreExceedsTotal,
}

/// Result type for reward computations
pub type RewardResult<T> = Result<T, RewardError>;

impl From<RewardError> for ClientError {
    fn from(err: RewardError) -> Self {
        ClientError::Validation(format!("Reward computation error: {}", err))
    }
}

/// Payout owed to a single winning record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payout {
    pub record: Pubkey,
    pub score: u64,
    pub amount: u64,
}

/// Full distribution of a market's reward pool
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Distribution {
    pub payouts: Vec<Payout>,
    pub total_winning_score: u64,
    /// Floor-division residue; stays in the pool rather than being split
    pub remainder: u64,
}

/// Conviction score: stake amount × seconds staked until the stake period
/// ended. Reveal time plays no part; only `staked_at` and the market's stake
/// end matter.
pub fn conviction_score(amount: u64, staked_at: u64, stake_end: u64) -> RewardResult<u64> {
    let duration = stake_end
        .checked_sub(staked_at)
        .ok_or(RewardError::StakedAfterClose)?;

    let score = (amount as u128)
        .checked_mul(duration as u128)
        .ok_or(RewardError::Overflow)?;

    u64::try_from(score).map_err(|_| RewardError::Overflow)
}

/// One record's share of the reward pool:
/// `floor(reward_amount × score / total_winning_score)`.
///
/// The multiplication runs in u128 so `reward_amount × score` cannot wrap
/// before the division.
pub fn winner_payout(
    reward_amount: u64,
    score: u64,
    total_winning_score: u64,
) -> RewardResult<u64> {
    if total_winning_score == 0 {
        return Err(RewardError::ZeroTotalScore);
    }
    if score > total_winning_score {
        return Err(RewardError::ScoreExceedsTotal);
    }

    let payout = (reward_amount as u128)
        .checked_mul(score as u128)
        .ok_or(RewardError::Overflow)?
        / total_winning_score as u128;

    // score ≤ total, so the quotient fits in u64
    Ok(payout as u64)
}

/// Distribute the reward pool across the eligible winning records.
///
/// With no winners (or only zero scores) nothing is paid and the whole pool
/// remains as remainder.
pub fn distribute(reward_amount: u64, winners: &[(Pubkey, u64)]) -> RewardResult<Distribution> {
    let mut total_winning_score: u64 = 0;
    for (_, score) in winners {
        total_winning_score = total_winning_score
            .checked_add(*score)
            .ok_or(RewardError::Overflow)?;
    }

    if total_winning_score == 0 {
        return Ok(Distribution {
            payouts: Vec::new(),
            total_winning_score: 0,
            remainder: reward_amount,
        });
    }

    let mut payouts = Vec::with_capacity(winners.len());
    let mut paid: u64 = 0;
    for (record, score) in winners {
        let amount = winner_payout(reward_amount, *score, total_winning_score)?;
        paid = paid.checked_add(amount).ok_or(RewardError::Overflow)?;
        payouts.push(Payout {
            record: *record,
            score: *score,
            amount,
        });
    }

    let remainder = reward_amount
        .checked_sub(paid)
        .ok_or(RewardError::Overflow)?;

    Ok(Distribution {
        payouts,
        total_winning_score,
        remainder,
    })
}
