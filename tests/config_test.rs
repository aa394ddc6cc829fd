use std::time::Duration;

use ed25519_dalek::SigningKey;
use rand_core::OsRng;
use sumeragi::config::{ConfigError, Configuration};

#[test]
fn defaults_test() {
    let config = Configuration::builder()
        .me(SigningKey::generate(&mut OsRng {}))
        .round_timeout(Duration::from_secs(2))
        .build();

    assert_eq!(config.send_timeout, Duration::from_millis(500));
    assert_eq!(config.window_expansion_increment, 1);
    assert_eq!(config.max_block_transactions, 256);
    assert_eq!(config.max_pending_transactions, 4096);
    assert_eq!(config.transaction_acceptance_window, Duration::from_secs(24 * 60 * 60));
    assert_eq!(config.future_timestamp_tolerance, Duration::from_secs(5));
    assert!(!config.allow_empty_blocks);
    assert_eq!(config.sync_request_limit, 32);
    assert_eq!(config.message_poll_interval, Duration::from_millis(10));
    assert!(config.log_events);
    assert_eq!(config.validate(), Ok(()));
}

#[test]
fn validate_rejects_inconsistent_parameters_test() {
    let base = || {
        Configuration::builder()
            .me(SigningKey::generate(&mut OsRng {}))
            .round_timeout(Duration::from_secs(2))
            .build()
    };

    let mut config = base();
    config.round_timeout = Duration::ZERO;
    assert_eq!(config.validate(), Err(ConfigError::ZeroRoundTimeout));

    let mut config = base();
    config.send_timeout = Duration::ZERO;
    assert_eq!(config.validate(), Err(ConfigError::ZeroSendTimeout));

    let mut config = base();
    config.send_timeout = Duration::from_secs(2);
    assert_eq!(
        config.validate(),
        Err(ConfigError::SendTimeoutNotShorterThanRoundTimeout {
            send_timeout: Duration::from_secs(2),
            round_timeout: Duration::from_secs(2),
        })
    );

    let mut config = base();
    config.window_expansion_increment = 0;
    assert_eq!(config.validate(), Err(ConfigError::ZeroWindowExpansionIncrement));

    let mut config = base();
    config.max_block_transactions = 0;
    assert_eq!(
        config.validate(),
        Err(ConfigError::ZeroLimit("max_block_transactions"))
    );

    let mut config = base();
    config.max_pending_transactions = 0;
    assert_eq!(
        config.validate(),
        Err(ConfigError::ZeroLimit("max_pending_transactions"))
    );

    let mut config = base();
    config.sync_request_limit = 0;
    assert_eq!(config.validate(), Err(ConfigError::ZeroLimit("sync_request_limit")));

    let mut config = base();
    config.message_poll_interval = Duration::ZERO;
    assert_eq!(config.validate(), Err(ConfigError::ZeroPollInterval));
}
