use crate::error::{ClientError, ClientResult};
use crate::models::codec::{ByteReader, ByteWriter};
use serde::{Deserialize, Serialize};
use solana_sdk::pubkey::Pubkey;

/// Market lifecycle phase, derived from on-ledger fields plus wall-clock time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarketPhase {
    NotFunded,
    Open,
    Revealing,
    Resolved,
}

impl MarketPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            MarketPhase::NotFunded => "not_funded",
            MarketPhase::Open => "open",
            MarketPhase::Revealing => "revealing",
            MarketPhase::Resolved => "resolved",
        }
    }

    /// Which phases each operation is legal in.
    ///
    /// This table is the single place lifecycle legality lives; services call
    /// [`Market::require`] instead of comparing raw timestamps.
    pub fn permits(&self, op: Operation) -> bool {
        match op {
            Operation::AddOption => {
                matches!(self, MarketPhase::NotFunded | MarketPhase::Open)
            }
            Operation::Stake => matches!(self, MarketPhase::Open),
            Operation::SelectWinner => {
                matches!(self, MarketPhase::Open | MarketPhase::Revealing)
            }
            Operation::Reveal => {
                matches!(self, MarketPhase::Revealing | MarketPhase::Resolved)
            }
            Operation::IncrementTally => {
                matches!(self, MarketPhase::Revealing | MarketPhase::Resolved)
            }
            Operation::CloseShare => matches!(self, MarketPhase::Resolved),
        }
    }
}

/// Mutating operations gated by the market phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    AddOption,
    Stake,
    SelectWinner,
    Reveal,
    IncrementTally,
    CloseShare,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::AddOption => "add_option",
            Operation::Stake => "stake",
            Operation::SelectWinner => "select_winner",
            Operation::Reveal => "reveal",
            Operation::IncrementTally => "increment_tally",
            Operation::CloseShare => "close_share",
        }
    }
}

/// Market entity as stored on the ledger
///
/// Identity is (creator, index); both are part of the derived address.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Market {
    pub creator: Pubkey,
    pub index: u64,
    pub total_options: u16,
    pub max_options: u16,

    /// If set, the market is funded and open for staking from this unix
    /// timestamp. Set at most once, only while no winner is selected.
    pub open_timestamp: Option<u64>,

    /// Seconds from open_timestamp
    pub time_to_stake: u64,

    /// Seconds from open_timestamp + time_to_stake; extendable upward only
    pub time_to_reveal: u64,

    /// Winning option, immutable once set
    pub selected_option: Option<u16>,

    /// Reward pool shared among eligible revealers (reward token base units)
    pub reward_amount: u64,

    /// Optional key allowed to select the winner / extend reveal in place of
    /// the creator
    pub market_authority: Option<Pubkey>,
}

impl Market {
    /// End of the staking window (unix seconds), if the market is open
    pub fn stake_end(&self) -> Option<u64> {
        self.open_timestamp
            .map(|open| open.saturating_add(self.time_to_stake))
    }

    /// End of the reveal window (unix seconds), if the market is open
    pub fn reveal_end(&self) -> Option<u64> {
        self.stake_end()
            .map(|end| end.saturating_add(self.time_to_reveal))
    }

    /// Derive the current phase from on-ledger fields and wall-clock time.
    ///
    /// Pure and side-effect free. Boundary timestamps belong to the later
    /// phase: `now == stake_end` is already `Revealing`.
    pub fn phase(&self, now: u64) -> MarketPhase {
        let open = match self.open_timestamp {
            Some(t) => t,
            None => return MarketPhase::NotFunded,
        };
        if now < open {
            return MarketPhase::NotFunded;
        }

        let stake_end = open.saturating_add(self.time_to_stake);
        let reveal_end = stake_end.saturating_add(self.time_to_reveal);

        if self.selected_option.is_some() && now >= reveal_end {
            MarketPhase::Resolved
        } else if now >= stake_end && now < reveal_end {
            MarketPhase::Revealing
        } else if now < stake_end {
            MarketPhase::Open
        } else {
            // Reveal window elapsed without a winner; resolution is blocked
            // until an authority selects one.
            MarketPhase::NotFunded
        }
    }

    /// Check the phase permits `op`, returning the phase on success
    pub fn require(&self, op: Operation, now: u64) -> ClientResult<MarketPhase> {
        let phase = self.phase(now);
        if phase.permits(op) {
            Ok(phase)
        } else {
            Err(ClientError::InvalidPhase(format!(
                "{} is not legal while the market is {}",
                op.as_str(),
                phase.as_str()
            )))
        }
    }

    /// Whether `key` may manage the market (select winner, extend reveal)
    pub fn is_authority(&self, key: &Pubkey) -> bool {
        self.creator == *key || self.market_authority == Some(*key)
    }

    // ========================================================================
    // Wire codec
    // ========================================================================

    /// Parse a Market from raw account data
    pub fn try_from_bytes(data: &[u8]) -> ClientResult<Self> {
        let mut r = ByteReader::for_account(data, "Market")?;
        let market = Self {
            creator: r.read_pubkey()?,
            index: r.read_u64()?,
            total_options: r.read_u16()?,
            max_options: r.read_u16()?,
            open_timestamp: r.read_option_u64()?,
            time_to_stake: r.read_u64()?,
            time_to_reveal: r.read_u64()?,
            selected_option: r.read_option_u16()?,
            reward_amount: r.read_u64()?,
            market_authority: r.read_option_pubkey()?,
        };

        if market.total_options > market.max_options {
            return Err(ClientError::Ledger(format!(
                "Market has {} options but caps at {}",
                market.total_options, market.max_options
            )));
        }

        Ok(market)
    }

    /// Serialize to raw account data
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut w = ByteWriter::for_account("Market");
        w.put_pubkey(&self.creator);
        w.put_u64(self.index);
        w.put_u16(self.total_options);
        w.put_u16(self.max_options);
        w.put_option_u64(self.open_timestamp);
        w.put_u64(self.time_to_stake);
        w.put_u64(self.time_to_reveal);
        w.put_option_u16(self.selected_option);
        w.put_u64(self.reward_amount);
        w.put_option_pubkey(&self.market_authority);
        w.into_bytes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn market(open: Option<u64>, selected: Option<u16>) -> Market {
        Market {
            creator: Pubkey::new_unique(),
            index: 0,
            total_options: 2,
            max_options: 4,
            open_timestamp: open,
            time_to_stake: 100,
            time_to_reveal: 50,
            selected_option: selected,
            reward_amount: 1_000,
            market_authority: None,
        }
    }

    #[test]
    fn test_phase_not_funded_without_open_timestamp() {
        assert_eq!(market(None, None).phase(5_000), MarketPhase::NotFunded);
    }

    #[test]
    fn test_phase_not_funded_before_open_timestamp() {
        assert_eq!(market(Some(1_000), None).phase(999), MarketPhase::NotFunded);
    }

    #[test]
    fn test_phase_boundaries_belong_to_later_phase() {
        let m = market(Some(1_000), None);
        assert_eq!(m.phase(1_000), MarketPhase::Open);
        assert_eq!(m.phase(1_099), MarketPhase::Open);
        assert_eq!(m.phase(1_100), MarketPhase::Revealing);
        assert_eq!(m.phase(1_149), MarketPhase::Revealing);

        let resolved = market(Some(1_000), Some(1));
        assert_eq!(resolved.phase(1_150), MarketPhase::Resolved);
    }

    #[test]
    fn test_phase_is_deterministic() {
        let m = market(Some(1_000), Some(2));
        for now in [0, 999, 1_000, 1_099, 1_100, 1_149, 1_150, 9_999] {
            assert_eq!(m.phase(now), m.phase(now));
        }
    }

    #[test]
    fn test_reveal_elapsed_without_winner_is_not_resolved() {
        let m = market(Some(1_000), None);
        assert_eq!(m.phase(1_150), MarketPhase::NotFunded);
        assert_eq!(m.phase(99_999), MarketPhase::NotFunded);
    }

    #[test]
    fn test_operation_legality_table() {
        assert!(MarketPhase::NotFunded.permits(Operation::AddOption));
        assert!(MarketPhase::Open.permits(Operation::AddOption));
        assert!(!MarketPhase::Revealing.permits(Operation::AddOption));

        assert!(MarketPhase::Open.permits(Operation::Stake));
        assert!(!MarketPhase::Revealing.permits(Operation::Stake));

        assert!(MarketPhase::Open.permits(Operation::SelectWinner));
        assert!(MarketPhase::Revealing.permits(Operation::SelectWinner));
        assert!(!MarketPhase::Resolved.permits(Operation::SelectWinner));

        assert!(MarketPhase::Revealing.permits(Operation::Reveal));
        assert!(MarketPhase::Resolved.permits(Operation::Reveal));
        assert!(!MarketPhase::Open.permits(Operation::Reveal));

        assert!(!MarketPhase::Revealing.permits(Operation::CloseShare));
        assert!(MarketPhase::Resolved.permits(Operation::CloseShare));
    }

    #[test]
    fn test_require_names_operation_and_phase() {
        let m = market(Some(1_000), None);
        let err = m.require(Operation::Stake, 1_120).unwrap_err();
        match err {
            ClientError::InvalidPhase(msg) => {
                assert!(msg.contains("stake"));
                assert!(msg.contains("revealing"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_authority_check() {
        let mut m = market(Some(1_000), None);
        let creator = m.creator;
        let delegate = Pubkey::new_unique();
        assert!(m.is_authority(&creator));
        assert!(!m.is_authority(&delegate));
        m.market_authority = Some(delegate);
        assert!(m.is_authority(&delegate));
    }

    #[test]
    fn test_codec_round_trip() {
        let mut m = market(Some(1_000), Some(3));
        m.market_authority = Some(Pubkey::new_unique());
        let parsed = Market::try_from_bytes(&m.to_bytes()).unwrap();
        assert_eq!(parsed, m);
    }

    #[test]
    fn test_codec_rejects_inconsistent_option_counts() {
        let mut m = market(None, None);
        m.total_options = 9;
        m.max_options = 4;
        assert!(Market::try_from_bytes(&m.to_bytes()).is_err());
    }
}
