//! Construction of confidential-computation requests.
//!
//! Every stateful operation that must run confidentially (balance init,
//! mint, claim, stake, reveal) dispatches a request carrying a caller-chosen
//! computation offset plus encrypted/plaintext arguments. The offset is the
//! correlation key the finalization waiter later matches against the cluster
//! log.

use crate::models::codec::discriminator;
use rand::rngs::OsRng;
use rand::RngCore;
use solana_sdk::instruction::{AccountMeta, Instruction};
use solana_sdk::pubkey::Pubkey;

/// Confidential computation definitions understood by the cluster
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComputationKind {
    InitCreditBalance,
    MintCredits,
    ClaimCredits,
    Stake,
    RevealShares,
}

impl ComputationKind {
    /// Stable definition name, shared with the on-ledger program
    pub fn definition_name(&self) -> &'static str {
        match self {
            ComputationKind::InitCreditBalance => "init_credit_balance",
            ComputationKind::MintCredits => "mint_credits",
            ComputationKind::ClaimCredits => "claim_credits",
            ComputationKind::Stake => "stake_shares",
            ComputationKind::RevealShares => "reveal_shares",
        }
    }
}

/// A single argument cell in a computation request
#[derive(Debug, Clone, PartialEq)]
pub enum ComputationArg {
    PlaintextU64(u64),
    PlaintextU128(u128),
    /// Participant X25519 public key, so the cluster can derive the shared
    /// secret for the adjacent encrypted cells
    PublicKey([u8; 32]),
    EncryptedCell([u8; 32]),
}

/// Ordered argument list for one computation
#[derive(Debug, Clone, Default)]
pub struct ComputationArgs {
    args: Vec<ComputationArg>,
}

impl ComputationArgs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn plaintext_u64(mut self, value: u64) -> Self {
        self.args.push(ComputationArg::PlaintextU64(value));
        self
    }

    pub fn plaintext_u128(mut self, value: u128) -> Self {
        self.args.push(ComputationArg::PlaintextU128(value));
        self
    }

    pub fn x25519_pubkey(mut self, key: [u8; 32]) -> Self {
        self.args.push(ComputationArg::PublicKey(key));
        self
    }

    pub fn encrypted_cell(mut self, cell: [u8; 32]) -> Self {
        self.args.push(ComputationArg::EncryptedCell(cell));
        self
    }

    pub fn len(&self) -> usize {
        self.args.len()
    }

    pub fn is_empty(&self) -> bool {
        self.args.is_empty()
    }

    /// Positional wire layout: each arg appended in order, little-endian
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut data = Vec::new();
        for arg in &self.args {
            match arg {
                ComputationArg::PlaintextU64(v) => data.extend_from_slice(&v.to_le_bytes()),
                ComputationArg::PlaintextU128(v) => data.extend_from_slice(&v.to_le_bytes()),
                ComputationArg::PublicKey(k) => data.extend_from_slice(k),
                ComputationArg::EncryptedCell(c) => data.extend_from_slice(c),
            }
        }
        data
    }
}

/// A fully assembled confidential-computation request
#[derive(Debug, Clone)]
pub struct ComputationRequest {
    pub kind: ComputationKind,
    pub offset: u64,
    pub args: ComputationArgs,
}

impl ComputationRequest {
    pub fn new(kind: ComputationKind, offset: u64, args: ComputationArgs) -> Self {
        Self { kind, offset, args }
    }

    /// Serialize into a ledger instruction:
    /// `global:<definition>` discriminator, offset LE, then the args
    pub fn into_instruction(
        self,
        program_id: &Pubkey,
        accounts: Vec<AccountMeta>,
    ) -> Instruction {
        let args = self.args.to_bytes();
        let mut data = Vec::with_capacity(16 + args.len());
        data.extend_from_slice(&discriminator("global", self.kind.definition_name()));
        data.extend_from_slice(&self.offset.to_le_bytes());
        data.extend_from_slice(&args);

        Instruction {
            program_id: *program_id,
            accounts,
            data,
        }
    }
}

/// Generate a fresh computation offset from the full 64-bit space.
///
/// Offsets must be unique among in-flight computations for the same
/// definition; the protocol cannot detect collisions, so callers rely on the
/// random space rather than bookkeeping.
pub fn generate_computation_offset() -> u64 {
    OsRng.next_u64()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_definition_names_are_distinct() {
        let kinds = [
            ComputationKind::InitCreditBalance,
            ComputationKind::MintCredits,
            ComputationKind::ClaimCredits,
            ComputationKind::Stake,
            ComputationKind::RevealShares,
        ];
        for (i, a) in kinds.iter().enumerate() {
            for b in &kinds[i + 1..] {
                assert_ne!(a.definition_name(), b.definition_name());
            }
        }
    }

    #[test]
    fn test_args_wire_layout() {
        let args = ComputationArgs::new()
            .x25519_pubkey([1u8; 32])
            .plaintext_u128(2)
            .encrypted_cell([3u8; 32])
            .plaintext_u64(4);

        let bytes = args.to_bytes();
        assert_eq!(bytes.len(), 32 + 16 + 32 + 8);
        assert_eq!(&bytes[..32], &[1u8; 32]);
        assert_eq!(bytes[32], 2);
        assert_eq!(&bytes[48..80], &[3u8; 32]);
        assert_eq!(bytes[80], 4);
    }

    #[test]
    fn test_instruction_carries_offset_after_discriminator() {
        let request = ComputationRequest::new(
            ComputationKind::Stake,
            0x0102030405060708,
            ComputationArgs::new().plaintext_u64(9),
        );
        let ix = request.into_instruction(&Pubkey::new_unique(), vec![]);

        assert_eq!(&ix.data[..8], &discriminator("global", "stake_shares"));
        assert_eq!(
            &ix.data[8..16],
            &0x0102030405060708u64.to_le_bytes()
        );
        assert_eq!(ix.data[16], 9);
    }

    #[test]
    fn test_offsets_draw_from_full_space() {
        let a = generate_computation_offset();
        let b = generate_computation_offset();
        assert_ne!(a, b);
    }
}
