use std::{sync::Arc, time::Duration};

use ed25519_dalek::SigningKey;
use rand_core::OsRng;
use sumeragi::{
    clock::{Clock, ManualClock},
    sumeragi::types::StopReason,
    transaction_pool::{SubmitRejection, TransactionPool, TransactionPoolConfiguration},
    types::{
        block::Block,
        data_types::{BlockHeight, CryptoHash, Timestamp},
        transaction::{Command, Transaction},
    },
};

const ACCEPTANCE_WINDOW: Duration = Duration::from_secs(60);

#[test]
fn submit_checks_signatures_and_timestamps_test() {
    let (pool, clock, client) = setup(16);
    let now = clock.timestamp();

    assert_eq!(pool.submit(signed(&client, now, 1)), Ok(()));

    let unsigned = Transaction::new(client.verifying_key(), vec![Command::new(vec![2])], now);
    assert_eq!(pool.submit(unsigned), Err(SubmitRejection::InvalidSignature));

    let mut tampered = signed(&client, now, 3);
    tampered.commands.push(Command::new(vec![0xff]));
    assert_eq!(pool.submit(tampered), Err(SubmitRejection::InvalidSignature));

    let stale = signed(&client, now.saturating_sub(ACCEPTANCE_WINDOW + Duration::from_secs(1)), 4);
    assert_eq!(pool.submit(stale), Err(SubmitRejection::StaleTimestamp));

    let future = signed(&client, now.saturating_add(Duration::from_secs(6)), 5);
    assert_eq!(pool.submit(future), Err(SubmitRejection::FutureTimestamp));

    // Within the tolerated skew.
    let slightly_ahead = signed(&client, now.saturating_add(Duration::from_secs(4)), 6);
    assert_eq!(pool.submit(slightly_ahead), Ok(()));

    assert_eq!(pool.pending_count(), 2);
}

#[test]
fn duplicates_and_capacity_test() {
    let (pool, clock, client) = setup(2);
    let now = clock.timestamp();

    let first = signed(&client, now, 1);
    assert_eq!(pool.submit(first.clone()), Ok(()));
    assert_eq!(pool.submit(first.clone()), Err(SubmitRejection::Duplicate));

    // Extra signatures do not change a transaction's identity.
    let other_signer = SigningKey::generate(&mut OsRng {});
    assert_eq!(
        pool.submit(first.clone().with_signature(&other_signer)),
        Err(SubmitRejection::Duplicate)
    );

    assert_eq!(pool.submit(signed(&client, now, 2)), Ok(()));
    assert_eq!(pool.submit(signed(&client, now, 3)), Err(SubmitRejection::PoolFull));
    assert_eq!(pool.pending_count(), 2);
}

#[test]
fn batches_are_taken_in_arrival_order_test() {
    let (pool, clock, client) = setup(16);
    let now = clock.timestamp();
    let transactions: Vec<Transaction> = (0..5).map(|i| signed(&client, now, i)).collect();
    for transaction in &transactions {
        pool.submit(transaction.clone()).unwrap();
    }

    assert_eq!(pool.take_batch(3), transactions[..3].to_vec());
    assert_eq!(pool.pending_count(), 2);

    // In flight transactions are still known to the pool.
    assert_eq!(
        pool.submit(transactions[0].clone()),
        Err(SubmitRejection::Duplicate)
    );

    assert_eq!(pool.take_batch(10), transactions[3..].to_vec());
    assert!(pool.take_batch(10).is_empty());
}

#[test]
fn settle_forgets_committed_transactions_test() {
    let (pool, clock, client) = setup(16);
    let now = clock.timestamp();
    let proposed = signed(&client, now, 1);
    let waiting = signed(&client, now, 2);
    pool.submit(proposed.clone()).unwrap();
    pool.take_batch(1);
    pool.submit(waiting.clone()).unwrap();

    // A block from another proposer commits both the in-flight and the pending transaction.
    let block = Block::new(
        BlockHeight::new(0),
        CryptoHash::zero(),
        vec![proposed.clone(), waiting.clone()],
        now,
    );
    pool.settle(&block);
    assert_eq!(pool.pending_count(), 0);
    assert!(pool.take_batch(10).is_empty());

    // Replays are rejected while the transactions are within the acceptance window, and rejected as stale
    // after it.
    assert_eq!(pool.submit(proposed.clone()), Err(SubmitRejection::Duplicate));
    clock.advance(ACCEPTANCE_WINDOW + Duration::from_secs(1));
    assert_eq!(pool.submit(proposed), Err(SubmitRejection::StaleTimestamp));
}

#[test]
fn failed_batches_are_reported_test() {
    let (pool, clock, client) = setup(16);
    let now = clock.timestamp();
    let transactions: Vec<Transaction> = (0..3).map(|i| signed(&client, now, i)).collect();
    for transaction in &transactions {
        pool.submit(transaction.clone()).unwrap();
    }
    let batch = pool.take_batch(3);
    let block = Block::new(BlockHeight::new(4), CryptoHash::zero(), batch.clone(), now);

    // One of the transactions was meanwhile committed in someone else's block.
    let elsewhere = Block::new(
        BlockHeight::new(4),
        CryptoHash::zero(),
        vec![transactions[1].clone()],
        now,
    );
    pool.settle(&elsewhere);

    pool.report_failure(block.hash, block.height, batch, StopReason::Superseded);
    let failed = pool.take_failed();
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].block, block.hash);
    assert_eq!(failed[0].height, BlockHeight::new(4));
    assert_eq!(failed[0].reason, StopReason::Superseded);
    assert_eq!(
        failed[0].transactions,
        vec![transactions[0].clone(), transactions[2].clone()]
    );
    assert!(pool.take_failed().is_empty());

    // Failed transactions are not proposed again on their own, but may be resubmitted.
    assert!(pool.take_batch(10).is_empty());
    assert_eq!(pool.submit(transactions[0].clone()), Ok(()));
    assert_eq!(
        pool.submit(transactions[1].clone()),
        Err(SubmitRejection::Duplicate)
    );
}

#[test]
fn pending_transactions_are_forwarded_once_per_proposer_test() {
    let (pool, clock, client) = setup(16);
    let now = clock.timestamp();
    let transactions: Vec<Transaction> = (0..3).map(|i| signed(&client, now, i)).collect();
    for transaction in &transactions {
        pool.submit(transaction.clone()).unwrap();
    }
    let first_proposer = SigningKey::generate(&mut OsRng {}).verifying_key();
    let second_proposer = SigningKey::generate(&mut OsRng {}).verifying_key();

    // Forwarded transactions stay pending.
    assert_eq!(pool.take_unforwarded(&first_proposer, 2), transactions[..2].to_vec());
    assert_eq!(pool.pending_count(), 3);
    assert_eq!(pool.take_unforwarded(&first_proposer, 10), transactions[2..].to_vec());
    assert!(pool.take_unforwarded(&first_proposer, 10).is_empty());

    // A new proposer gets everything still pending.
    let block = Block::new(
        BlockHeight::new(0),
        CryptoHash::zero(),
        vec![transactions[0].clone()],
        now,
    );
    pool.settle(&block);
    assert_eq!(
        pool.take_unforwarded(&second_proposer, 10),
        transactions[1..].to_vec()
    );

    // Once taken into a batch, a transaction is no longer forwarded.
    assert_eq!(pool.take_batch(1), vec![transactions[1].clone()]);
    assert_eq!(
        pool.take_unforwarded(&first_proposer, 10),
        vec![transactions[2].clone()]
    );
}

fn setup(capacity: usize) -> (TransactionPool, ManualClock, SigningKey) {
    let clock = ManualClock::new(Timestamp::new(1_700_000_000_000));
    let pool = TransactionPool::new(
        TransactionPoolConfiguration {
            acceptance_window: ACCEPTANCE_WINDOW,
            future_tolerance: Duration::from_secs(5),
            capacity,
        },
        Arc::new(clock.clone()),
    );
    let client = SigningKey::generate(&mut OsRng {});
    (pool, clock, client)
}

fn signed(client: &SigningKey, created_at: Timestamp, nonce: u64) -> Transaction {
    Transaction::signed(
        client,
        vec![Command::new(nonce.to_le_bytes().to_vec())],
        created_at,
    )
}
