mod helpers;

use conviction_core::error::ClientError;
use conviction_core::models::{MarketPhase, Operation, ShareState};
use conviction_core::rewards;
use helpers::*;
use solana_sdk::pubkey::Pubkey;

#[test]
fn phase_is_a_pure_function_of_its_inputs() {
    let market = test_market(Some(1_000), Some(2));
    for now in [0u64, 500, 1_000, 1_050, 1_100, 1_125, 1_149, 1_150, 2_000] {
        let first = market.phase(now);
        let second = market.phase(now);
        assert_eq!(first, second, "phase must be deterministic at {}", now);
    }
}

#[test]
fn phase_boundaries_follow_the_tie_break_rule() {
    // openTimestamp=1000, timeToStake=100, timeToReveal=50
    let unresolved = test_market(Some(1_000), None);
    assert_eq!(unresolved.phase(1_099), MarketPhase::Open);
    assert_eq!(unresolved.phase(1_100), MarketPhase::Revealing);
    assert_eq!(unresolved.phase(1_149), MarketPhase::Revealing);

    let resolved = test_market(Some(1_000), Some(1));
    assert_eq!(resolved.phase(1_150), MarketPhase::Resolved);
}

#[test]
fn winner_selection_gates_resolution() {
    let mut market = test_market(Some(1_000), None);
    assert_ne!(market.phase(1_150), MarketPhase::Resolved);

    market.selected_option = Some(2);
    assert_eq!(market.phase(1_150), MarketPhase::Resolved);
    // Selection alone does not resolve while the reveal window is running
    assert_eq!(market.phase(1_120), MarketPhase::Revealing);
}

#[test]
fn operations_are_rejected_outside_their_phase() {
    let market = test_market(Some(1_000), None);

    // Staking after the stake period is an InvalidPhase error
    let err = market.require(Operation::Stake, 1_100).unwrap_err();
    assert!(matches!(err, ClientError::InvalidPhase(_)));

    // Closing before resolution is an InvalidPhase error
    let err = market.require(Operation::CloseShare, 1_120).unwrap_err();
    assert!(matches!(err, ClientError::InvalidPhase(_)));

    // Staking inside the window is fine
    assert!(market.require(Operation::Stake, 1_050).is_ok());
}

#[test]
fn reveal_is_legal_during_reveal_window_and_after_resolution() {
    let market = test_market(Some(1_000), Some(1));
    assert!(market.require(Operation::Reveal, 1_120).is_ok());
    assert!(market.require(Operation::Reveal, 1_500).is_ok());
    assert!(market.require(Operation::Reveal, 1_050).is_err());
}

#[test]
fn share_record_walks_create_reveal_tally_close() {
    let market = test_market(Some(1_000), Some(2));
    let mut record = test_record(Pubkey::new_unique(), 1_020);
    assert_eq!(record.state(), ShareState::Created);

    // Reveal fixes the score against the stake-period end (1_100), not the
    // reveal wall clock.
    let stake_end = market.stake_end().unwrap();
    let score = rewards::conviction_score(40, record.staked_at_timestamp, stake_end).unwrap();
    assert_eq!(score, 40 * 80);

    record.apply_reveal(40, 2, score, true);
    assert_eq!(record.state(), ShareState::Revealed);

    record.total_incremented = true;
    assert_eq!(record.state(), ShareState::TallyIncremented);
    assert!(record.is_yield_eligible(2));

    record.claimed_yield = true;
    assert_eq!(record.state(), ShareState::Closed);
    assert!(record.ensure_can_close().is_err());
}

#[test]
fn tally_increment_is_idempotent_on_the_option_aggregate() {
    let mut option = conviction_core::models::MarketOption {
        market: Pubkey::new_unique(),
        index: 2,
        creator: Pubkey::new_unique(),
        name: "north".to_string(),
        total_shares: None,
        total_score: None,
    };
    let mut record = test_record(option.market, 1_020);
    record.apply_reveal(40, 2, 3_200, true);

    // First increment folds the record in and latches it
    record.ensure_can_increment().unwrap();
    option.fold_share(40, 3_200).unwrap();
    record.total_incremented = true;

    // A retry is rejected by the latch, leaving the aggregate unchanged
    assert!(matches!(
        record.ensure_can_increment(),
        Err(ClientError::DuplicateTransition(_))
    ));
    assert_eq!(option.total_shares, Some(40));
    assert_eq!(option.total_score, Some(3_200));
}

#[test]
fn late_reveal_returns_stake_but_earns_no_yield() {
    let market = test_market(Some(1_000), Some(2));
    let mut record = test_record(Pubkey::new_unique(), 1_020);

    // Revealed after the deadline: in-time flag stays false
    record.apply_reveal(40, 2, 3_200, false);

    assert!(record.ensure_can_close().is_ok());
    assert!(!record.is_yield_eligible(market.selected_option.unwrap()));

    // The stake itself is still fully returned at closure
    assert_eq!(record.revealed_amount, Some(40));

    // And a late record never joins the winning-score denominator
    assert!(record.ensure_can_increment().is_err());
}

#[test]
fn never_revealed_record_closes_for_stake_return_only() {
    let record = test_record(Pubkey::new_unique(), 1_020);
    assert_eq!(record.state(), ShareState::Created);
    assert!(record.ensure_can_close().is_ok());
    assert!(!record.is_yield_eligible(1));
    // Amount stays confidential; there is nothing to pay yield on
    assert_eq!(record.revealed_amount, None);
}

#[test]
fn multiple_records_per_market_progress_independently() {
    let market_key = Pubkey::new_unique();
    let mut first = test_record(market_key, 1_010);
    let mut second = test_record(market_key, 1_050);
    second.ordinal = 1;

    first.apply_reveal(10, 1, 900, true);
    assert_eq!(first.state(), ShareState::Revealed);
    assert_eq!(second.state(), ShareState::Created);

    second.apply_reveal(20, 3, 1_000, true);
    first.total_incremented = true;
    assert_eq!(first.state(), ShareState::TallyIncremented);
    assert_eq!(second.state(), ShareState::Revealed);
}

#[test]
fn option_name_length_is_validated_locally() {
    use conviction_core::models::MarketOption;

    assert!(MarketOption::validate_name("alpha").is_ok());
    let err = MarketOption::validate_name(&"x".repeat(200)).unwrap_err();
    assert!(matches!(err, ClientError::Validation(_)));
}
