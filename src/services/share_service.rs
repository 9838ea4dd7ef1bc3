use crate::addresses::{
    derive_credit_balance_address, derive_option_address, derive_share_record_address,
};
use crate::config::{MultiStakePolicy, PolicyConfig};
use crate::crypto::encryption::{generate_nonce, nonce_to_u128, EncryptionContext};
use crate::dispatch::{
    generate_computation_offset, ComputationArgs, ComputationKind, ComputationRequest,
};
use crate::error::{ClientError, ClientResult};
use crate::finalization::FinalizationWaiter;
use crate::ledger::LedgerClient;
use crate::models::codec::discriminator;
use crate::models::{unix_now, MarketOption, Operation, ShareRecord};
use crate::rewards;
use serde::{Deserialize, Serialize};
use solana_sdk::instruction::{AccountMeta, Instruction};
use solana_sdk::pubkey::Pubkey;
use solana_sdk::system_program;
use std::sync::Arc;
use tracing::info;

/// A share record together with its address and transaction reference
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShareSnapshot {
    pub address: Pubkey,
    pub record: ShareRecord,
    pub signature: String,
    /// Offset of the confidential computation that produced this state, when
    /// one was involved
    pub computation_offset: Option<u64>,
}

/// Result of folding a record into its option's aggregates
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TallySnapshot {
    pub record: ShareRecord,
    pub option: MarketOption,
    pub signature: String,
}

/// Result of closing a share record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CloseOutcome {
    pub record_address: Pubkey,
    /// Disclosed stake returned to the owner; `None` when the record was
    /// never revealed and the return stayed confidential
    pub returned_amount: Option<u64>,
    /// Yield paid on top of the returned stake
    pub payout: u64,
    pub signature: String,
}

/// Service managing the encrypted stake lifecycle per (owner, market) pair
pub struct ShareService {
    ledger: Arc<LedgerClient>,
    waiter: Arc<FinalizationWaiter>,
    policy: PolicyConfig,
}

impl ShareService {
    pub fn new(
        ledger: Arc<LedgerClient>,
        waiter: Arc<FinalizationWaiter>,
        policy: PolicyConfig,
    ) -> Self {
        Self {
            ledger,
            waiter,
            policy,
        }
    }

    /// Stake vote credits on an option without revealing amount or choice.
    ///
    /// Creates the share record, debits the confidential balance inside the
    /// cluster computation, and waits for finalization before returning the
    /// record snapshot.
    pub async fn stake(
        &self,
        context: &EncryptionContext,
        market_address: &Pubkey,
        option_index: u16,
        amount: u64,
        ordinal: u32,
    ) -> ClientResult<ShareSnapshot> {
        if amount == 0 {
            return Err(ClientError::Validation(
                "Stake amount must be greater than zero".to_string(),
            ));
        }
        if option_index < 1 {
            return Err(ClientError::Validation(
                "Option indices start at 1".to_string(),
            ));
        }
        if self.policy.multi_stake == MultiStakePolicy::SingleRecordPerMarket && ordinal != 0 {
            return Err(ClientError::Validation(
                "Policy allows a single share record per market".to_string(),
            ));
        }

        let owner = self.ledger.signer_pubkey()?;
        let market = self.ledger.require_market(market_address)?;
        market.require(Operation::Stake, unix_now())?;

        if option_index > market.total_options {
            return Err(ClientError::Validation(format!(
                "Option index {} is out of range 1..={}",
                option_index, market.total_options
            )));
        }

        let program_id = self.ledger.program_id();
        let (record_address, _) =
            derive_share_record_address(&owner, market_address, ordinal, &program_id);

        if self.ledger.get_share_record(&record_address)?.is_some() {
            return Err(ClientError::DuplicateTransition(format!(
                "Share record ordinal {} already exists for this market",
                ordinal
            )));
        }

        let (balance_address, _) = derive_credit_balance_address(&owner, &program_id);

        let nonce = generate_nonce();
        let cells = context.encrypt_values(&[amount as u128, option_index as u128], &nonce)?;
        let offset = generate_computation_offset();

        info!(
            "Staking into market {} (record {}, computation {})",
            market_address, record_address, offset
        );

        let args = ComputationArgs::new()
            .x25519_pubkey(context.public_key())
            .plaintext_u128(nonce_to_u128(&nonce))
            .encrypted_cell(cells[0])
            .encrypted_cell(cells[1]);

        let instruction = ComputationRequest::new(ComputationKind::Stake, offset, args)
            .into_instruction(
                &program_id,
                vec![
                    AccountMeta::new(owner, true),
                    AccountMeta::new_readonly(*market_address, false),
                    AccountMeta::new(record_address, false),
                    AccountMeta::new(balance_address, false),
                    AccountMeta::new_readonly(system_program::id(), false),
                ],
            );

        self.ledger.send_instruction(instruction).await?;
        let finalization = self.waiter.await_one(offset).await?;
        finalization.status.into_result()?;

        let record = self.ledger.require_share_record(&record_address)?;

        Ok(ShareSnapshot {
            address: record_address,
            record,
            signature: finalization.signature,
            computation_offset: Some(offset),
        })
    }

    /// Reveal a share record's amount and option.
    ///
    /// Permissionless: any signer may reveal any owner's record once the
    /// staking period is over. The cluster computation discloses the values,
    /// fixes the conviction score against the stake-period end, and flags
    /// whether the reveal landed inside the reveal window.
    pub async fn reveal(
        &self,
        owner: &Pubkey,
        user_pubkey: [u8; 32],
        market_address: &Pubkey,
        ordinal: u32,
    ) -> ClientResult<ShareSnapshot> {
        let signer = self.ledger.signer_pubkey()?;
        let market = self.ledger.require_market(market_address)?;
        market.require(Operation::Reveal, unix_now())?;

        let program_id = self.ledger.program_id();
        let (record_address, _) =
            derive_share_record_address(owner, market_address, ordinal, &program_id);
        let record = self.ledger.require_share_record(&record_address)?;
        record.ensure_can_reveal()?;

        let (balance_address, _) = derive_credit_balance_address(owner, &program_id);
        let offset = generate_computation_offset();

        info!(
            "Revealing record {} of market {} (computation {})",
            record_address, market_address, offset
        );

        let args = ComputationArgs::new()
            .x25519_pubkey(user_pubkey)
            .plaintext_u128(record.state_nonce);

        let instruction = ComputationRequest::new(ComputationKind::RevealShares, offset, args)
            .into_instruction(
                &program_id,
                vec![
                    AccountMeta::new(signer, true),
                    AccountMeta::new_readonly(*owner, false),
                    AccountMeta::new_readonly(*market_address, false),
                    AccountMeta::new(record_address, false),
                    AccountMeta::new(balance_address, false),
                ],
            );

        self.ledger.send_instruction(instruction).await?;
        let finalization = self.waiter.await_one(offset).await?;
        finalization.status.into_result()?;

        let record = self.ledger.require_share_record(&record_address)?;

        Ok(ShareSnapshot {
            address: record_address,
            record,
            signature: finalization.signature,
            computation_offset: Some(offset),
        })
    }

    /// Fold a revealed record into its option's running tallies.
    ///
    /// Permissionless and idempotent: the record's latch rejects a second
    /// increment instead of double counting.
    pub async fn increment_tally(
        &self,
        market_address: &Pubkey,
        owner: &Pubkey,
        ordinal: u32,
    ) -> ClientResult<TallySnapshot> {
        let signer = self.ledger.signer_pubkey()?;
        let market = self.ledger.require_market(market_address)?;
        market.require(Operation::IncrementTally, unix_now())?;

        let program_id = self.ledger.program_id();
        let (record_address, _) =
            derive_share_record_address(owner, market_address, ordinal, &program_id);
        let record = self.ledger.require_share_record(&record_address)?;
        record.ensure_can_increment()?;

        let option_index = record.revealed_option.ok_or_else(|| {
            ClientError::Validation("Record has no revealed option".to_string())
        })?;
        let (option_address, _) =
            derive_option_address(market_address, option_index, &program_id);

        info!(
            "Incrementing tally of option {} with record {}",
            option_index, record_address
        );

        let mut data = Vec::with_capacity(16);
        data.extend_from_slice(&discriminator("global", "increment_tally"));
        data.extend_from_slice(&ordinal.to_le_bytes());

        let instruction = Instruction {
            program_id,
            accounts: vec![
                AccountMeta::new(signer, true),
                AccountMeta::new_readonly(*owner, false),
                AccountMeta::new_readonly(*market_address, false),
                AccountMeta::new(record_address, false),
                AccountMeta::new(option_address, false),
            ],
            data,
        };

        let signature = self.ledger.send_instruction(instruction).await?;

        let record = self.ledger.require_share_record(&record_address)?;
        let option = self.ledger.require_option(&option_address)?;

        Ok(TallySnapshot {
            record,
            option,
            signature: signature.to_string(),
        })
    }

    /// Close a share record once the market is resolved.
    ///
    /// The full stake is returned unconditionally; yield is paid only for
    /// records that revealed the winning option inside the reveal window and
    /// were folded into the tally.
    pub async fn close_share_record(
        &self,
        market_address: &Pubkey,
        ordinal: u32,
    ) -> ClientResult<CloseOutcome> {
        let owner = self.ledger.signer_pubkey()?;
        let market = self.ledger.require_market(market_address)?;
        market.require(Operation::CloseShare, unix_now())?;

        let selected_option = market.selected_option.ok_or_else(|| {
            ClientError::InvalidPhase("Market has no selected option".to_string())
        })?;

        let program_id = self.ledger.program_id();
        let (record_address, _) =
            derive_share_record_address(&owner, market_address, ordinal, &program_id);
        let record = self.ledger.require_share_record(&record_address)?;
        record.ensure_can_close()?;

        // Yield owed, derived the same way the ledger program derives it
        let payout = if record.is_yield_eligible(selected_option) {
            let (option_address, _) =
                derive_option_address(market_address, selected_option, &program_id);
            let option = self.ledger.require_option(&option_address)?;

            let score = record.revealed_score.unwrap_or(0);
            let total = option.total_score.unwrap_or(0);
            rewards::winner_payout(market.reward_amount, score, total)?
        } else {
            0
        };

        let (option_address, _) = derive_option_address(
            market_address,
            record.revealed_option.unwrap_or(selected_option),
            &program_id,
        );

        info!(
            "Closing record {} of market {} (payout {})",
            record_address, market_address, payout
        );

        let mut data = Vec::with_capacity(16);
        data.extend_from_slice(&discriminator("global", "close_share_record"));
        data.extend_from_slice(&ordinal.to_le_bytes());

        let instruction = Instruction {
            program_id,
            accounts: vec![
                AccountMeta::new(owner, true),
                AccountMeta::new(*market_address, false),
                AccountMeta::new(record_address, false),
                AccountMeta::new_readonly(option_address, false),
            ],
            data,
        };

        let signature = self.ledger.send_instruction(instruction).await?;

        Ok(CloseOutcome {
            record_address,
            returned_amount: record.revealed_amount,
            payout,
            signature: signature.to_string(),
        })
    }
}
