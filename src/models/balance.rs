use crate::error::ClientResult;
use crate::models::codec::{ByteReader, ByteWriter};
use serde::{Deserialize, Serialize};
use solana_sdk::pubkey::Pubkey;

/// A participant's confidential vote-credit balance
///
/// The balance value exists only as ciphertext; every transition (mint,
/// claim, stake funding) runs inside the confidential computation, which is
/// also where overdrafts are rejected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreditBalance {
    pub owner: Pubkey,
    pub encrypted_state: [[u8; 32]; 1],
    pub state_nonce: u128,
}

impl CreditBalance {
    /// Parse a CreditBalance from raw account data
    pub fn try_from_bytes(data: &[u8]) -> ClientResult<Self> {
        let mut r = ByteReader::for_account(data, "CreditBalance")?;
        Ok(Self {
            owner: r.read_pubkey()?,
            encrypted_state: [r.read_cell()?],
            state_nonce: r.read_u128()?,
        })
    }

    /// Serialize to raw account data
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut w = ByteWriter::for_account("CreditBalance");
        w.put_pubkey(&self.owner);
        w.put_cell(&self.encrypted_state[0]);
        w.put_u128(self.state_nonce);
        w.into_bytes()
    }
}
