use crate::error::{ClientError, ClientResult};
use crate::models::codec::{ByteReader, ByteWriter};
use serde::{Deserialize, Serialize};
use solana_sdk::pubkey::Pubkey;

/// Maximum byte length of an option name
pub const MAX_OPTION_NAME_LEN: usize = 50;

/// A named option within a market
///
/// Identity is (market, index) with 1-based sequential indices. The tally
/// fields stay `None` until the first increment folds a revealed record in,
/// then hold running sums.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketOption {
    pub market: Pubkey,
    pub index: u16,
    pub creator: Pubkey,
    pub name: String,
    pub total_shares: Option<u64>,
    pub total_score: Option<u64>,
}

impl MarketOption {
    /// Validate an option name before any network interaction
    pub fn validate_name(name: &str) -> ClientResult<()> {
        if name.is_empty() {
            return Err(ClientError::Validation(
                "Option name must not be empty".to_string(),
            ));
        }
        if name.len() > MAX_OPTION_NAME_LEN {
            return Err(ClientError::Validation(format!(
                "Option name exceeds {} bytes",
                MAX_OPTION_NAME_LEN
            )));
        }
        Ok(())
    }

    /// Fold a revealed record into the running tallies
    pub fn fold_share(&mut self, amount: u64, score: u64) -> ClientResult<()> {
        let shares = self.total_shares.unwrap_or(0);
        let scores = self.total_score.unwrap_or(0);
        self.total_shares = Some(shares.checked_add(amount).ok_or_else(|| {
            ClientError::Validation("Option share tally overflow".to_string())
        })?);
        self.total_score = Some(scores.checked_add(score).ok_or_else(|| {
            ClientError::Validation("Option score tally overflow".to_string())
        })?);
        Ok(())
    }

    // ========================================================================
    // Wire codec
    // ========================================================================

    /// Parse a MarketOption from raw account data
    pub fn try_from_bytes(data: &[u8]) -> ClientResult<Self> {
        let mut r = ByteReader::for_account(data, "MarketOption")?;
        Ok(Self {
            market: r.read_pubkey()?,
            index: r.read_u16()?,
            creator: r.read_pubkey()?,
            name: r.read_string(MAX_OPTION_NAME_LEN)?,
            total_shares: r.read_option_u64()?,
            total_score: r.read_option_u64()?,
        })
    }

    /// Serialize to raw account data
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut w = ByteWriter::for_account("MarketOption");
        w.put_pubkey(&self.market);
        w.put_u16(self.index);
        w.put_pubkey(&self.creator);
        w.put_string(&self.name);
        w.put_option_u64(self.total_shares);
        w.put_option_u64(self.total_score);
        w.into_bytes()
    }
}
