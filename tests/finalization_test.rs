mod helpers;

use conviction_core::config::FinalizationConfig;
use conviction_core::error::ClientError;
use conviction_core::finalization::{
    encode_finalization_event, ComputationStatus, FinalizationWaiter,
};
use helpers::*;
use solana_sdk::pubkey::Pubkey;
use std::sync::Arc;

fn fast_config(max_attempts: u32) -> FinalizationConfig {
    FinalizationConfig {
        poll_interval_ms: 1,
        max_attempts,
        transaction_count_limit: 10,
    }
}

fn waiter(program: Pubkey, scans: Vec<Vec<conviction_core::finalization::LogEntry>>, attempts: u32) -> FinalizationWaiter {
    FinalizationWaiter::new(Arc::new(ScriptedLog::new(scans)), program, fast_config(attempts))
}

#[tokio::test]
async fn await_one_matches_offset_in_log() {
    let program = Pubkey::new_unique();
    let scans = vec![vec![entry(
        "sig-1",
        vec![
            "Program log: unrelated".to_string(),
            encode_finalization_event(42, &program, ComputationStatus::Success),
        ],
    )]];

    let result = waiter(program, scans, 3).await_one(42).await.unwrap();
    assert_eq!(result.offset, 42);
    assert_eq!(result.signature, "sig-1");
    assert_eq!(result.status, ComputationStatus::Success);
}

#[tokio::test]
async fn await_batch_collects_offsets_across_scans() {
    // A finalizes in the first scan, B only two scans later; both must be
    // in the returned map regardless of submission order.
    let program = Pubkey::new_unique();
    let scans = vec![
        vec![entry(
            "sig-a",
            vec![encode_finalization_event(7, &program, ComputationStatus::Success)],
        )],
        vec![],
        vec![entry(
            "sig-b",
            vec![encode_finalization_event(9, &program, ComputationStatus::Success)],
        )],
    ];

    let results = waiter(program, scans, 10)
        .await_batch(&[9, 7])
        .await
        .unwrap();

    assert_eq!(results.len(), 2);
    assert_eq!(results[&7].signature, "sig-a");
    assert_eq!(results[&9].signature, "sig-b");
}

#[tokio::test]
async fn await_batch_finds_out_of_order_finalizations() {
    // Finalizations land in the opposite order of submission
    let program = Pubkey::new_unique();
    let scans = vec![
        vec![entry(
            "sig-late",
            vec![encode_finalization_event(2, &program, ComputationStatus::Success)],
        )],
        vec![entry(
            "sig-early",
            vec![encode_finalization_event(1, &program, ComputationStatus::Success)],
        )],
    ];

    let results = waiter(program, scans, 10)
        .await_batch(&[1, 2])
        .await
        .unwrap();
    assert_eq!(results[&2].signature, "sig-late");
    assert_eq!(results[&1].signature, "sig-early");
}

#[tokio::test]
async fn timeout_names_the_missing_offsets() {
    let program = Pubkey::new_unique();
    let scans = vec![vec![entry(
        "sig-a",
        vec![encode_finalization_event(7, &program, ComputationStatus::Success)],
    )]];

    let err = waiter(program, scans, 3)
        .await_batch(&[7, 8, 9])
        .await
        .unwrap_err();

    match err {
        ClientError::FinalizationTimeout { attempts, missing } => {
            assert_eq!(attempts, 3);
            assert_eq!(missing, vec![8, 9]);
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

#[tokio::test]
async fn events_from_other_programs_are_ignored() {
    let program = Pubkey::new_unique();
    let foreign = Pubkey::new_unique();
    let scans = vec![vec![entry(
        "sig-foreign",
        vec![encode_finalization_event(42, &foreign, ComputationStatus::Success)],
    )]];

    let err = waiter(program, scans, 2).await_one(42).await.unwrap_err();
    assert!(matches!(err, ClientError::FinalizationTimeout { .. }));
}

#[tokio::test]
async fn scan_errors_consume_attempts_without_failing_the_wait() {
    let program = Pubkey::new_unique();
    let scans = ScriptedLog::new(vec![
        vec![],
        vec![entry(
            "sig-1",
            vec![encode_finalization_event(5, &program, ComputationStatus::Success)],
        )],
    ])
    .with_error_at(0);

    let waiter = FinalizationWaiter::new(Arc::new(scans), program, fast_config(5));
    let result = waiter.await_one(5).await.unwrap();
    assert_eq!(result.signature, "sig-1");
}

#[tokio::test]
async fn failure_status_is_carried_through() {
    let program = Pubkey::new_unique();
    let scans = vec![vec![entry(
        "sig-1",
        vec![encode_finalization_event(
            11,
            &program,
            ComputationStatus::InsufficientBalance,
        )],
    )]];

    let result = waiter(program, scans, 2).await_one(11).await.unwrap();
    assert_eq!(result.status, ComputationStatus::InsufficientBalance);
    assert!(matches!(
        result.status.into_result(),
        Err(ClientError::InsufficientBalance)
    ));
}

#[tokio::test]
async fn empty_offset_set_resolves_immediately() {
    let program = Pubkey::new_unique();
    let results = waiter(program, vec![], 1).await_batch(&[]).await.unwrap();
    assert!(results.is_empty());
}
