//! Byte-level codec for ledger accounts.
//!
//! Every account serializes as an 8-byte discriminator followed by a fixed
//! little-endian field layout. `Option<T>` fields encode as a 1-byte tag
//! (0 absent / 1 present) followed by the value; strings as a 4-byte LE
//! length plus UTF-8 bytes.

use crate::error::{ClientError, ClientResult};
use sha2::{Digest, Sha256};
use solana_sdk::pubkey::Pubkey;

/// First 8 bytes of SHA256("<namespace>:<name>"), matching the ledger
/// program's discriminator scheme for accounts, instructions and events.
pub fn discriminator(namespace: &str, name: &str) -> [u8; 8] {
    let mut hasher = Sha256::new();
    hasher.update(format!("{}:{}", namespace, name).as_bytes());
    let hash = hasher.finalize();
    let mut out = [0u8; 8];
    out.copy_from_slice(&hash[..8]);
    out
}

/// Sequential reader over raw account data
pub struct ByteReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    /// Start reading `data`, checking and skipping the account discriminator
    pub fn for_account(data: &'a [u8], account_name: &str) -> ClientResult<Self> {
        if data.len() < 8 {
            return Err(ClientError::Ledger(format!(
                "Account data too short for {}: {} bytes",
                account_name,
                data.len()
            )));
        }
        if data[..8] != discriminator("account", account_name) {
            return Err(ClientError::Ledger(format!(
                "Invalid {} discriminator",
                account_name
            )));
        }
        Ok(Self { data, pos: 8 })
    }

    fn take(&mut self, len: usize) -> ClientResult<&'a [u8]> {
        let end = self.pos.checked_add(len).ok_or_else(|| {
            ClientError::Ledger("Account data offset overflow".to_string())
        })?;
        if end > self.data.len() {
            return Err(ClientError::Ledger(format!(
                "Account data truncated at byte {}",
                self.pos
            )));
        }
        let slice = &self.data[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    pub fn read_u8(&mut self) -> ClientResult<u8> {
        Ok(self.take(1)?[0])
    }

    pub fn read_bool(&mut self) -> ClientResult<bool> {
        Ok(self.read_u8()? != 0)
    }

    pub fn read_u16(&mut self) -> ClientResult<u16> {
        let bytes = self.take(2)?;
        Ok(u16::from_le_bytes([bytes[0], bytes[1]]))
    }

    pub fn read_u32(&mut self) -> ClientResult<u32> {
        let bytes = self.take(4)?;
        let mut buf = [0u8; 4];
        buf.copy_from_slice(bytes);
        Ok(u32::from_le_bytes(buf))
    }

    pub fn read_u64(&mut self) -> ClientResult<u64> {
        let bytes = self.take(8)?;
        let mut buf = [0u8; 8];
        buf.copy_from_slice(bytes);
        Ok(u64::from_le_bytes(buf))
    }

    pub fn read_u128(&mut self) -> ClientResult<u128> {
        let bytes = self.take(16)?;
        let mut buf = [0u8; 16];
        buf.copy_from_slice(bytes);
        Ok(u128::from_le_bytes(buf))
    }

    pub fn read_pubkey(&mut self) -> ClientResult<Pubkey> {
        let bytes = self.take(32)?;
        Pubkey::try_from(bytes)
            .map_err(|_| ClientError::Ledger("Failed to parse pubkey field".to_string()))
    }

    pub fn read_cell(&mut self) -> ClientResult<[u8; 32]> {
        let bytes = self.take(32)?;
        let mut buf = [0u8; 32];
        buf.copy_from_slice(bytes);
        Ok(buf)
    }

    pub fn read_option_u16(&mut self) -> ClientResult<Option<u16>> {
        match self.read_u8()? {
            0 => Ok(None),
            1 => Ok(Some(self.read_u16()?)),
            tag => Err(ClientError::Ledger(format!("Invalid option tag: {}", tag))),
        }
    }

    pub fn read_option_u64(&mut self) -> ClientResult<Option<u64>> {
        match self.read_u8()? {
            0 => Ok(None),
            1 => Ok(Some(self.read_u64()?)),
            tag => Err(ClientError::Ledger(format!("Invalid option tag: {}", tag))),
        }
    }

    pub fn read_option_pubkey(&mut self) -> ClientResult<Option<Pubkey>> {
        match self.read_u8()? {
            0 => Ok(None),
            1 => Ok(Some(self.read_pubkey()?)),
            tag => Err(ClientError::Ledger(format!("Invalid option tag: {}", tag))),
        }
    }

    pub fn read_string(&mut self, max_len: usize) -> ClientResult<String> {
        let len = self.read_u32()? as usize;
        if len > max_len {
            return Err(ClientError::Ledger(format!(
                "String field length {} exceeds maximum {}",
                len, max_len
            )));
        }
        let bytes = self.take(len)?;
        String::from_utf8(bytes.to_vec())
            .map_err(|_| ClientError::Ledger("String field is not valid UTF-8".to_string()))
    }
}

/// Sequential writer producing raw account data
pub struct ByteWriter {
    data: Vec<u8>,
}

impl ByteWriter {
    /// Start writing an account body after its discriminator
    pub fn for_account(account_name: &str) -> Self {
        let mut data = Vec::with_capacity(128);
        data.extend_from_slice(&discriminator("account", account_name));
        Self { data }
    }

    pub fn put_u8(&mut self, value: u8) {
        self.data.push(value);
    }

    pub fn put_bool(&mut self, value: bool) {
        self.data.push(value as u8);
    }

    pub fn put_u16(&mut self, value: u16) {
        self.data.extend_from_slice(&value.to_le_bytes());
    }

    pub fn put_u32(&mut self, value: u32) {
        self.data.extend_from_slice(&value.to_le_bytes());
    }

    pub fn put_u64(&mut self, value: u64) {
        self.data.extend_from_slice(&value.to_le_bytes());
    }

    pub fn put_u128(&mut self, value: u128) {
        self.data.extend_from_slice(&value.to_le_bytes());
    }

    pub fn put_pubkey(&mut self, value: &Pubkey) {
        self.data.extend_from_slice(value.as_ref());
    }

    pub fn put_cell(&mut self, value: &[u8; 32]) {
        self.data.extend_from_slice(value);
    }

    pub fn put_option_u16(&mut self, value: Option<u16>) {
        match value {
            Some(v) => {
                self.put_u8(1);
                self.put_u16(v);
            }
            None => self.put_u8(0),
        }
    }

    pub fn put_option_u64(&mut self, value: Option<u64>) {
        match value {
            Some(v) => {
                self.put_u8(1);
                self.put_u64(v);
            }
            None => self.put_u8(0),
        }
    }

    pub fn put_option_pubkey(&mut self, value: &Option<Pubkey>) {
        match value {
            Some(v) => {
                self.put_u8(1);
                self.put_pubkey(v);
            }
            None => self.put_u8(0),
        }
    }

    pub fn put_string(&mut self, value: &str) {
        self.put_u32(value.len() as u32);
        self.data.extend_from_slice(value.as_bytes());
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_discriminator_is_deterministic() {
        let a = discriminator("account", "Market");
        let b = discriminator("account", "Market");
        assert_eq!(a, b);
        assert_ne!(a, discriminator("account", "ShareRecord"));
        assert_ne!(a, discriminator("global", "Market"));
    }

    #[test]
    fn test_scalar_round_trip() {
        let mut w = ByteWriter::for_account("Scratch");
        w.put_u16(7);
        w.put_u64(u64::MAX);
        w.put_u128(42);
        w.put_option_u64(None);
        w.put_option_u16(Some(3));
        w.put_string("yes");
        let bytes = w.into_bytes();

        let mut r = ByteReader::for_account(&bytes, "Scratch").unwrap();
        assert_eq!(r.read_u16().unwrap(), 7);
        assert_eq!(r.read_u64().unwrap(), u64::MAX);
        assert_eq!(r.read_u128().unwrap(), 42);
        assert_eq!(r.read_option_u64().unwrap(), None);
        assert_eq!(r.read_option_u16().unwrap(), Some(3));
        assert_eq!(r.read_string(50).unwrap(), "yes");
    }

    #[test]
    fn test_wrong_discriminator_rejected() {
        let bytes = ByteWriter::for_account("Market").into_bytes();
        assert!(ByteReader::for_account(&bytes, "ShareRecord").is_err());
    }

    #[test]
    fn test_truncated_data_rejected() {
        let mut w = ByteWriter::for_account("Scratch");
        w.put_u16(1);
        let bytes = w.into_bytes();
        let mut r = ByteReader::for_account(&bytes, "Scratch").unwrap();
        assert!(r.read_u64().is_err());
    }
}
