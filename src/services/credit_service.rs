use crate::addresses::derive_credit_balance_address;
use crate::crypto::encryption::{
    generate_nonce, nonce_from_u128, nonce_to_u128, EncryptionContext,
};
use crate::dispatch::{
    generate_computation_offset, ComputationArgs, ComputationKind, ComputationRequest,
};
use crate::error::{ClientError, ClientResult};
use crate::finalization::FinalizationWaiter;
use crate::ledger::LedgerClient;
use crate::models::CreditBalance;
use serde::{Deserialize, Serialize};
use solana_sdk::instruction::AccountMeta;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::system_program;
use std::sync::Arc;
use tracing::info;

/// A credit balance together with its address and transaction reference
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BalanceSnapshot {
    pub address: Pubkey,
    pub balance: CreditBalance,
    pub signature: String,
    pub computation_offset: u64,
}

/// Service for confidential vote-credit balances
pub struct CreditService {
    ledger: Arc<LedgerClient>,
    waiter: Arc<FinalizationWaiter>,
}

impl CreditService {
    pub fn new(ledger: Arc<LedgerClient>, waiter: Arc<FinalizationWaiter>) -> Self {
        Self { ledger, waiter }
    }

    fn balance_address(&self, owner: &Pubkey) -> Pubkey {
        derive_credit_balance_address(owner, &self.ledger.program_id()).0
    }

    /// Initialize the caller's encrypted balance at zero
    pub async fn init_balance(&self, context: &EncryptionContext) -> ClientResult<BalanceSnapshot> {
        let owner = self.ledger.signer_pubkey()?;
        let balance_address = self.balance_address(&owner);

        if self.ledger.get_credit_balance(&balance_address)?.is_some() {
            return Err(ClientError::DuplicateTransition(
                "Credit balance is already initialized".to_string(),
            ));
        }

        let nonce = generate_nonce();
        let offset = generate_computation_offset();

        info!(
            "Initializing credit balance {} (computation {})",
            balance_address, offset
        );

        let args = ComputationArgs::new()
            .x25519_pubkey(context.public_key())
            .plaintext_u128(nonce_to_u128(&nonce));

        let instruction =
            ComputationRequest::new(ComputationKind::InitCreditBalance, offset, args)
                .into_instruction(
                    &self.ledger.program_id(),
                    vec![
                        AccountMeta::new(owner, true),
                        AccountMeta::new(balance_address, false),
                        AccountMeta::new_readonly(system_program::id(), false),
                    ],
                );

        self.ledger.send_instruction(instruction).await?;
        let finalization = self.waiter.await_one(offset).await?;
        finalization.status.into_result()?;

        let balance = self.require_balance(&balance_address)?;

        Ok(BalanceSnapshot {
            address: balance_address,
            balance,
            signature: finalization.signature,
            computation_offset: offset,
        })
    }

    /// Mint vote credits against a public deposit
    pub async fn mint_credits(
        &self,
        context: &EncryptionContext,
        amount: u64,
    ) -> ClientResult<BalanceSnapshot> {
        self.adjust_balance(context, amount, ComputationKind::MintCredits)
            .await
    }

    /// Claim (withdraw) vote credits back out of the encrypted balance.
    ///
    /// Overdrafts are rejected by the confidential computation and surface
    /// as [`ClientError::InsufficientBalance`]; retrying with the same
    /// amount would fail identically.
    pub async fn claim_credits(
        &self,
        context: &EncryptionContext,
        amount: u64,
    ) -> ClientResult<BalanceSnapshot> {
        self.adjust_balance(context, amount, ComputationKind::ClaimCredits)
            .await
    }

    async fn adjust_balance(
        &self,
        context: &EncryptionContext,
        amount: u64,
        kind: ComputationKind,
    ) -> ClientResult<BalanceSnapshot> {
        if amount == 0 {
            return Err(ClientError::Validation(
                "Amount must be greater than zero".to_string(),
            ));
        }

        let owner = self.ledger.signer_pubkey()?;
        let balance_address = self.balance_address(&owner);
        let balance = self.require_balance(&balance_address)?;

        let offset = generate_computation_offset();

        info!(
            "{} {} credits for {} (computation {})",
            kind.definition_name(),
            amount,
            owner,
            offset
        );

        let args = ComputationArgs::new()
            .x25519_pubkey(context.public_key())
            .plaintext_u128(balance.state_nonce)
            .plaintext_u64(amount);

        let instruction = ComputationRequest::new(kind, offset, args).into_instruction(
            &self.ledger.program_id(),
            vec![
                AccountMeta::new(owner, true),
                AccountMeta::new(balance_address, false),
            ],
        );

        self.ledger.send_instruction(instruction).await?;
        let finalization = self.waiter.await_one(offset).await?;
        finalization.status.into_result()?;

        let balance = self.require_balance(&balance_address)?;

        Ok(BalanceSnapshot {
            address: balance_address,
            balance,
            signature: finalization.signature,
            computation_offset: offset,
        })
    }

    /// Decrypt the caller's own balance value.
    ///
    /// Fails with [`ClientError::Decryption`] when the context does not
    /// match the key the balance was encrypted under.
    pub fn decrypt_balance(
        &self,
        context: &EncryptionContext,
        balance: &CreditBalance,
    ) -> ClientResult<u64> {
        let nonce = nonce_from_u128(balance.state_nonce);
        let values = context.decrypt_values(&balance.encrypted_state, &nonce)?;
        let value = values.first().copied().ok_or_else(|| {
            ClientError::Decryption("Balance ciphertext decoded to no cells".to_string())
        })?;

        u64::try_from(value)
            .map_err(|_| ClientError::Decryption("Balance value out of range".to_string()))
    }

    fn require_balance(&self, address: &Pubkey) -> ClientResult<CreditBalance> {
        self.ledger
            .get_credit_balance(address)?
            .ok_or_else(|| ClientError::NotFound(format!("Credit balance {}", address)))
    }
}
