//! # Error Handling Tests
//!
//! Error messages, error reasons and the retry backoff the error policy uses.

use shared_ca_operator::controller::backoff::FibonacciBackoff;
use shared_ca_operator::controller::reconciler::{BackoffState, ReconcilerError};
use shared_ca_operator::runtime::error_policy::WatchErrorKind;
use shared_ca_operator::store::{ObjectKey, StoreError, StoreOperation};

#[test]
fn test_backoff_calculation_fibonacci_sequence() {
    // 1, 1, 2, 3, 5, 8 minutes, then capped at 10
    let mut backoff = FibonacciBackoff::new(1, 10);
    let seconds: Vec<u64> = (0..8).map(|_| backoff.next_backoff_seconds()).collect();
    assert_eq!(seconds, vec![60, 60, 120, 180, 300, 480, 600, 600]);
}

#[test]
fn test_backoff_state_tracks_errors_until_reset() {
    let mut state = BackoffState::new(1, 10);
    for _ in 0..3 {
        state.increment_error();
        state.backoff.next_backoff_seconds();
    }
    assert_eq!(state.error_count, 3);

    state.reset();
    assert_eq!(state.error_count, 0);
    assert_eq!(state.backoff.next_backoff_seconds(), 60);
}

#[test]
fn test_store_error_names_operation_kind_and_key() {
    let err: ReconcilerError = StoreError::new(
        StoreOperation::Create,
        "Certificate",
        ObjectKey::namespaced("cs-ca-certificate", "cert-manager"),
        "etcdserver: request timed out",
    )
    .into();

    assert_eq!(
        err.to_string(),
        "failed to create Certificate cert-manager/cs-ca-certificate: etcdserver: request timed out"
    );
    assert_eq!(err.reason(), "store-error");
}

#[test]
fn test_reconciler_error_reasons() {
    assert_eq!(
        ReconcilerError::InvalidConfig("spec.namespace must not be empty".to_string()).reason(),
        "invalid-config"
    );
    assert_eq!(
        ReconcilerError::OwnerReference("no uid".to_string()).reason(),
        "owner-reference"
    );
    assert_eq!(
        ReconcilerError::InvalidConfig("spec.namespace must not be empty".to_string()).to_string(),
        "invalid SharedCAConfig: spec.namespace must not be empty"
    );
}

#[test]
fn test_watch_error_classification() {
    assert_eq!(
        WatchErrorKind::classify("Api(ErrorResponse { code: 401, reason: \"Unauthorized\" })"),
        WatchErrorKind::Unauthorized
    );
    assert_eq!(WatchErrorKind::classify("410 Gone"), WatchErrorKind::Expired);
    assert_eq!(
        WatchErrorKind::classify("ObjectNotFound: clusterissuers.cert-manager.io"),
        WatchErrorKind::NotFound
    );
    assert!(WatchErrorKind::NotFound.is_recoverable());
    assert!(!WatchErrorKind::Expired.is_recoverable());
    assert!(!WatchErrorKind::Other.is_recoverable());
}
