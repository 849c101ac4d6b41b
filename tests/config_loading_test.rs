//! Loading `run_time_config.json` with environment overrides. Runs as a
//! single test because it mutates the process environment.

use std::env;
use std::io::Write;

use pulse_actions::constants::RUNTIME_CONFIG_PATH_ENV;
use pulse_actions::{ConfigLoader, ConfigurationError, RuntimeConfig};

#[test]
fn test_discovery_and_environment_overrides() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("run_time_config.json");
    let mut file = std::fs::File::create(&path).unwrap();
    file.write_all(
        br#"{"exchange": "exchange/treeherder/v1/job-actions", "topic": "buildbot.#"}"#,
    )
    .unwrap();
    drop(file);

    env::set_var(RUNTIME_CONFIG_PATH_ENV, &path);
    env::set_var("PULSE_ACTIONS__BROKER__HOST", "localhost");
    env::set_var("PULSE_ACTIONS__BROKER__PORT", "5672");
    env::set_var("PULSE_ACTIONS__BROKER__USE_TLS", "false");

    let loader = ConfigLoader::discover(None).unwrap();
    assert_eq!(loader.path(), path.as_path());

    let config = loader.load().unwrap();
    assert_eq!(config.exchange, "exchange/treeherder/v1/job-actions");
    assert_eq!(config.topic, "buildbot.#");
    assert_eq!(config.broker.host, "localhost");
    assert_eq!(config.broker.port, 5672);
    assert!(!config.broker.use_tls);

    let runtime = RuntimeConfig::from(&config);
    assert!(runtime.dry_run);
    assert_eq!(runtime.topic_prefix().as_str(), "buildbot");

    // Overrides are opt-out
    let config = ConfigLoader::new(&path).without_env_overrides().load().unwrap();
    assert_eq!(config.broker.host, "pulse.mozilla.org");

    env::set_var("PULSE_ACTIONS__TOPIC", "");
    let err = ConfigLoader::new(&path).load().unwrap_err();
    assert!(matches!(err, ConfigurationError::MissingRequiredField { ref field, .. } if field == "topic"));

    env::remove_var("PULSE_ACTIONS__TOPIC");
    env::remove_var(RUNTIME_CONFIG_PATH_ENV);
    dir.close().unwrap();
    let err = ConfigLoader::new(&path).load().unwrap_err();
    assert!(matches!(err, ConfigurationError::ConfigFileNotFound { .. }));
}
