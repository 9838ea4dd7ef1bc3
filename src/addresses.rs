//! Deterministic address derivation for every ledger entity.
//!
//! Each entity kind has a fixed seed tag concatenated with its identifying
//! keys/indices in little-endian layout. Identical inputs always produce the
//! identical address; distinct tags cannot collide.

use solana_sdk::pubkey::Pubkey;

pub const MARKET_SEED: &[u8] = b"conviction_market";
pub const OPTION_SEED: &[u8] = b"market_option";
pub const SHARE_RECORD_SEED: &[u8] = b"share_record";
pub const CREDIT_BALANCE_SEED: &[u8] = b"credit_balance";

/// Derive the address of a market from its creator and per-creator index
pub fn derive_market_address(
    creator: &Pubkey,
    index: u64,
    program_id: &Pubkey,
) -> (Pubkey, u8) {
    Pubkey::find_program_address(
        &[MARKET_SEED, creator.as_ref(), &index.to_le_bytes()],
        program_id,
    )
}

/// Derive the address of an option from its market and 1-based index
pub fn derive_option_address(
    market: &Pubkey,
    option_index: u16,
    program_id: &Pubkey,
) -> (Pubkey, u8) {
    Pubkey::find_program_address(
        &[OPTION_SEED, market.as_ref(), &option_index.to_le_bytes()],
        program_id,
    )
}

/// Derive the address of a share record.
///
/// The ordinal distinguishes multiple concurrent records by one owner in the
/// same market; single-stake deployments always pass zero.
pub fn derive_share_record_address(
    owner: &Pubkey,
    market: &Pubkey,
    ordinal: u32,
    program_id: &Pubkey,
) -> (Pubkey, u8) {
    Pubkey::find_program_address(
        &[
            SHARE_RECORD_SEED,
            owner.as_ref(),
            market.as_ref(),
            &ordinal.to_le_bytes(),
        ],
        program_id,
    )
}

/// Derive the address of an owner's vote-credit balance
pub fn derive_credit_balance_address(owner: &Pubkey, program_id: &Pubkey) -> (Pubkey, u8) {
    Pubkey::find_program_address(&[CREDIT_BALANCE_SEED, owner.as_ref()], program_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derivation_is_deterministic() {
        let program_id = Pubkey::new_unique();
        let creator = Pubkey::new_unique();

        let (a, bump_a) = derive_market_address(&creator, 3, &program_id);
        let (b, bump_b) = derive_market_address(&creator, 3, &program_id);
        assert_eq!(a, b);
        assert_eq!(bump_a, bump_b);
    }

    #[test]
    fn test_distinct_indices_yield_distinct_addresses() {
        let program_id = Pubkey::new_unique();
        let creator = Pubkey::new_unique();

        let (a, _) = derive_market_address(&creator, 0, &program_id);
        let (b, _) = derive_market_address(&creator, 1, &program_id);
        assert_ne!(a, b);
    }

    #[test]
    fn test_distinct_seed_tags_do_not_collide() {
        let program_id = Pubkey::new_unique();
        let owner = Pubkey::new_unique();

        // A balance and a market keyed by the same owner must live apart
        let (balance, _) = derive_credit_balance_address(&owner, &program_id);
        let (market, _) = derive_market_address(&owner, 0, &program_id);
        assert_ne!(balance, market);
    }

    #[test]
    fn test_share_record_ordinals_are_independent() {
        let program_id = Pubkey::new_unique();
        let owner = Pubkey::new_unique();
        let market = Pubkey::new_unique();

        let (first, _) = derive_share_record_address(&owner, &market, 0, &program_id);
        let (second, _) = derive_share_record_address(&owner, &market, 1, &program_id);
        assert_ne!(first, second);
    }

    #[test]
    fn test_option_addresses_scope_to_market() {
        let program_id = Pubkey::new_unique();
        let market_a = Pubkey::new_unique();
        let market_b = Pubkey::new_unique();

        let (a, _) = derive_option_address(&market_a, 1, &program_id);
        let (b, _) = derive_option_address(&market_b, 1, &program_id);
        assert_ne!(a, b);
    }
}
