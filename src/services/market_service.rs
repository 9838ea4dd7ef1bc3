use crate::addresses::{derive_market_address, derive_option_address};
use crate::config::{OptionCreationPolicy, PolicyConfig};
use crate::error::{ClientError, ClientResult};
use crate::ledger::LedgerClient;
use crate::models::codec::discriminator;
use crate::models::option::MAX_OPTION_NAME_LEN;
use crate::models::{unix_now, Market, MarketOption, MarketPhase, Operation};
use serde::{Deserialize, Serialize};
use solana_sdk::instruction::{AccountMeta, Instruction};
use solana_sdk::pubkey::Pubkey;
use solana_sdk::system_program;
use std::sync::Arc;
use tracing::info;

/// A market entity together with its address and the transaction that last
/// touched it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketSnapshot {
    pub address: Pubkey,
    pub market: Market,
    pub signature: String,
}

/// An option entity together with its address and transaction reference
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptionSnapshot {
    pub address: Pubkey,
    pub option: MarketOption,
    pub signature: String,
}

/// Service for market lifecycle operations
pub struct MarketService {
    ledger: Arc<LedgerClient>,
    policy: PolicyConfig,
}

impl MarketService {
    pub fn new(ledger: Arc<LedgerClient>, policy: PolicyConfig) -> Self {
        Self { ledger, policy }
    }

    /// Derive the current phase of a market from its on-ledger fields
    pub fn get_market_phase(&self, market: &Pubkey, now: u64) -> ClientResult<MarketPhase> {
        Ok(self.ledger.require_market(market)?.phase(now))
    }

    /// Create an empty market at the caller's next per-creator index
    pub async fn create_market(
        &self,
        index: u64,
        max_options: u16,
        reward_amount: u64,
        time_to_stake: u64,
        time_to_reveal: u64,
        market_authority: Option<Pubkey>,
    ) -> ClientResult<MarketSnapshot> {
        if max_options == 0 {
            return Err(ClientError::Validation(
                "Market must allow at least one option".to_string(),
            ));
        }
        if time_to_stake == 0 || time_to_reveal == 0 {
            return Err(ClientError::Validation(
                "Stake and reveal periods must be non-zero".to_string(),
            ));
        }

        let creator = self.ledger.signer_pubkey()?;
        let (market_address, _) =
            derive_market_address(&creator, index, &self.ledger.program_id());

        if self.ledger.get_market(&market_address)?.is_some() {
            return Err(ClientError::Validation(format!(
                "Market index {} is already in use",
                index
            )));
        }

        info!(
            "Creating market {} (index {}, {} option slots)",
            market_address, index, max_options
        );

        let mut data = Vec::with_capacity(48);
        data.extend_from_slice(&discriminator("global", "create_market"));
        data.extend_from_slice(&index.to_le_bytes());
        data.extend_from_slice(&max_options.to_le_bytes());
        data.extend_from_slice(&reward_amount.to_le_bytes());
        data.extend_from_slice(&time_to_stake.to_le_bytes());
        data.extend_from_slice(&time_to_reveal.to_le_bytes());
        match market_authority {
            Some(authority) => {
                data.push(1);
                data.extend_from_slice(authority.as_ref());
            }
            None => data.push(0),
        }

        let instruction = Instruction {
            program_id: self.ledger.program_id(),
            accounts: vec![
                AccountMeta::new(creator, true),
                AccountMeta::new(market_address, false),
                AccountMeta::new_readonly(system_program::id(), false),
            ],
            data,
        };

        let signature = self.ledger.send_instruction(instruction).await?;
        let market = self.ledger.require_market(&market_address)?;

        Ok(MarketSnapshot {
            address: market_address,
            market,
            signature: signature.to_string(),
        })
    }

    /// Open a funded market for staking from `open_timestamp` onward.
    ///
    /// The market account must already hold the full reward pool.
    pub async fn open_market(
        &self,
        market_address: &Pubkey,
        open_timestamp: u64,
    ) -> ClientResult<MarketSnapshot> {
        let market = self.ledger.require_market(market_address)?;
        let signer = self.ledger.signer_pubkey()?;

        if market.creator != signer {
            return Err(ClientError::Unauthorized(
                "Only the creator can open a market".to_string(),
            ));
        }
        if market.open_timestamp.is_some() {
            return Err(ClientError::DuplicateTransition(
                "Market is already open".to_string(),
            ));
        }
        if open_timestamp <= unix_now() {
            return Err(ClientError::Validation(
                "Open timestamp must be in the future".to_string(),
            ));
        }

        let funded = self.ledger.get_balance(market_address).await?;
        if funded < market.reward_amount {
            return Err(ClientError::Validation(format!(
                "Market holds {} but needs {} to cover the reward pool",
                funded, market.reward_amount
            )));
        }

        info!("Opening market {} at {}", market_address, open_timestamp);

        let mut data = Vec::with_capacity(16);
        data.extend_from_slice(&discriminator("global", "open_market"));
        data.extend_from_slice(&open_timestamp.to_le_bytes());

        let instruction = Instruction {
            program_id: self.ledger.program_id(),
            accounts: vec![
                AccountMeta::new(signer, true),
                AccountMeta::new(*market_address, false),
            ],
            data,
        };

        let signature = self.ledger.send_instruction(instruction).await?;
        let market = self.ledger.require_market(market_address)?;

        Ok(MarketSnapshot {
            address: *market_address,
            market,
            signature: signature.to_string(),
        })
    }

    /// Add the next sequential option to a market
    pub async fn add_option(
        &self,
        market_address: &Pubkey,
        name: &str,
    ) -> ClientResult<OptionSnapshot> {
        MarketOption::validate_name(name)?;

        let market = self.ledger.require_market(market_address)?;
        let signer = self.ledger.signer_pubkey()?;
        let now = unix_now();

        let phase = market.require(Operation::AddOption, now)?;
        if phase == MarketPhase::NotFunded {
            match self.policy.option_creation {
                OptionCreationPolicy::StakingOnly => {
                    return Err(ClientError::InvalidPhase(
                        "Options may only be added while staking is open".to_string(),
                    ));
                }
                OptionCreationPolicy::AllowBeforeOpen => {
                    // Pre-open only: a market whose reveal window elapsed
                    // unresolved also derives NotFunded and must stay closed
                    // to new options.
                    let pre_open = match market.open_timestamp {
                        None => true,
                        Some(open) => now < open,
                    };
                    if !pre_open {
                        return Err(ClientError::InvalidPhase(
                            "Market is past its staking window".to_string(),
                        ));
                    }
                }
            }
        }

        let option_index = market
            .total_options
            .checked_add(1)
            .ok_or_else(|| ClientError::Validation("Option index overflow".to_string()))?;
        if option_index > market.max_options {
            return Err(ClientError::Validation(format!(
                "Market caps at {} options",
                market.max_options
            )));
        }

        let (option_address, _) =
            derive_option_address(market_address, option_index, &self.ledger.program_id());

        info!(
            "Adding option {} '{}' to market {}",
            option_index, name, market_address
        );

        let mut data = Vec::with_capacity(16 + MAX_OPTION_NAME_LEN);
        data.extend_from_slice(&discriminator("global", "add_option"));
        data.extend_from_slice(&option_index.to_le_bytes());
        data.extend_from_slice(&(name.len() as u32).to_le_bytes());
        data.extend_from_slice(name.as_bytes());

        let instruction = Instruction {
            program_id: self.ledger.program_id(),
            accounts: vec![
                AccountMeta::new(signer, true),
                AccountMeta::new(*market_address, false),
                AccountMeta::new(option_address, false),
                AccountMeta::new_readonly(system_program::id(), false),
            ],
            data,
        };

        let signature = self.ledger.send_instruction(instruction).await?;
        let option = self.ledger.require_option(&option_address)?;

        Ok(OptionSnapshot {
            address: option_address,
            option,
            signature: signature.to_string(),
        })
    }

    /// Select the winning option.
    ///
    /// Legal from stake-period end onward; while staking is still open it
    /// requires `early_close`, which truncates the stake period on the spot.
    /// The selection is immutable once made.
    pub async fn select_winning_option(
        &self,
        market_address: &Pubkey,
        option_index: u16,
        early_close: bool,
    ) -> ClientResult<MarketSnapshot> {
        let market = self.ledger.require_market(market_address)?;
        let signer = self.ledger.signer_pubkey()?;
        let now = unix_now();

        if !market.is_authority(&signer) {
            return Err(ClientError::Unauthorized(
                "Only the creator or market authority can select a winner".to_string(),
            ));
        }
        if market.selected_option.is_some() {
            return Err(ClientError::DuplicateTransition(
                "A winning option has already been selected".to_string(),
            ));
        }
        if option_index < 1 || option_index > market.total_options {
            return Err(ClientError::Validation(format!(
                "Option index {} is out of range 1..={}",
                option_index, market.total_options
            )));
        }

        let phase = market.require(Operation::SelectWinner, now)?;
        if phase == MarketPhase::Open && !early_close {
            return Err(ClientError::InvalidPhase(
                "Stake period is still active; pass early_close to end it now".to_string(),
            ));
        }

        info!(
            "Selecting option {} as winner of market {} (early_close: {})",
            option_index, market_address, early_close
        );

        let mut data = Vec::with_capacity(16);
        data.extend_from_slice(&discriminator("global", "select_winner"));
        data.extend_from_slice(&option_index.to_le_bytes());
        data.push(early_close as u8);

        let instruction = Instruction {
            program_id: self.ledger.program_id(),
            accounts: vec![
                AccountMeta::new(signer, true),
                AccountMeta::new(*market_address, false),
            ],
            data,
        };

        let signature = self.ledger.send_instruction(instruction).await?;
        let market = self.ledger.require_market(market_address)?;

        Ok(MarketSnapshot {
            address: *market_address,
            market,
            signature: signature.to_string(),
        })
    }

    /// Extend the reveal period. Upward only, and only while the current
    /// reveal period has not yet ended.
    pub async fn extend_reveal_period(
        &self,
        market_address: &Pubkey,
        new_time_to_reveal: u64,
    ) -> ClientResult<MarketSnapshot> {
        let market = self.ledger.require_market(market_address)?;
        let signer = self.ledger.signer_pubkey()?;
        let now = unix_now();

        if !market.is_authority(&signer) {
            return Err(ClientError::Unauthorized(
                "Only the creator or market authority can extend the reveal period".to_string(),
            ));
        }

        let reveal_end = market.reveal_end().ok_or_else(|| {
            ClientError::InvalidPhase("Market has not been opened".to_string())
        })?;
        if now >= reveal_end {
            return Err(ClientError::InvalidPhase(
                "Reveal period has already ended".to_string(),
            ));
        }
        if new_time_to_reveal <= market.time_to_reveal {
            return Err(ClientError::Validation(
                "Reveal period can only be extended, not shortened".to_string(),
            ));
        }

        info!(
            "Extending reveal period of market {} to {}s",
            market_address, new_time_to_reveal
        );

        let mut data = Vec::with_capacity(16);
        data.extend_from_slice(&discriminator("global", "extend_reveal_period"));
        data.extend_from_slice(&new_time_to_reveal.to_le_bytes());

        let instruction = Instruction {
            program_id: self.ledger.program_id(),
            accounts: vec![
                AccountMeta::new(signer, true),
                AccountMeta::new(*market_address, false),
            ],
            data,
        };

        let signature = self.ledger.send_instruction(instruction).await?;
        let market = self.ledger.require_market(market_address)?;

        Ok(MarketSnapshot {
            address: *market_address,
            market,
            signature: signature.to_string(),
        })
    }
}
