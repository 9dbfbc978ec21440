//! Coverage for config parsing, validation and file loading.

use std::io::Write;
use std::time::Duration;

use herald::config::{
    config_dir, load_config, load_or_default, BatchConfig, Config, ConfigError, ExecutorConfig,
    ProviderConfig, RetryConfig,
};
use herald::retry::BackoffStrategy;

#[test]
fn default_values() {
    let executor = ExecutorConfig::default();
    assert_eq!(executor.timeout(), Duration::from_secs(30));

    let batch = BatchConfig::default();
    assert_eq!(batch.size, 5);
    assert_eq!(batch.pacing(), Duration::from_millis(500));

    let retry = RetryConfig::default();
    assert_eq!(retry.max_attempts, 3);
    assert_eq!(retry.base_delay_ms, 1000);
    assert!(retry.strategy.is_none());
}

#[test]
fn default_chain_has_three_providers() {
    let config = Config::default();
    let chain: Vec<(&str, u32)> = config
        .providers
        .iter()
        .map(|p| (p.name(), p.priority()))
        .collect();
    assert_eq!(
        chain,
        vec![("system-api", 1), ("direct-send", 2), ("local-simulation", 3)]
    );
}

#[test]
fn config_dir_resolves() {
    let path = match config_dir() {
        Ok(path) => path,
        Err(err) => panic!("config dir should resolve: {err}"),
    };
    assert!(path.ends_with(".herald"));
}

#[test]
fn empty_file_yields_defaults() {
    let config = match Config::from_toml("") {
        Ok(config) => config,
        Err(err) => panic!("empty config should parse: {err}"),
    };
    assert_eq!(config.providers.len(), 3);
    assert_eq!(config.chain_policy().max_attempts, 3);
}

#[test]
fn parse_full_config() {
    let toml_str = r#"
[executor]
timeout_ms = 5000

[retry]
max_attempts = 4
base_delay_ms = 250
strategy = "fixed"

[http_retry]
max_attempts = 2

[batch]
size = 10
pacing_ms = 0

[logging]
level = "debug"

[[providers]]
kind = "system_api"
base_url = "https://notify.example.com/api"
token_env = "NOTIFY_TOKEN"

[[providers]]
kind = "direct_send"
name = "relay"
priority = 5
base_url = "https://relay.example.com"

[[providers]]
kind = "simulated"
latency_ms = 0
"#;
    let config = match Config::from_toml(toml_str) {
        Ok(config) => config,
        Err(err) => panic!("full config should parse: {err}"),
    };
    assert_eq!(config.executor.timeout_ms, 5000);
    assert_eq!(config.batch.size, 10);
    assert_eq!(config.logging.level, "debug");

    let chain = config.chain_policy();
    assert_eq!(chain.max_attempts, 4);
    assert_eq!(chain.base_delay, Duration::from_millis(250));
    assert_eq!(chain.strategy, BackoffStrategy::Fixed);

    let http = config.http_policy();
    assert_eq!(http.max_attempts, 2);
    assert_eq!(http.strategy, BackoffStrategy::Linear);

    assert_eq!(
        config.providers.first(),
        Some(&ProviderConfig::SystemApi {
            name: "system-api".to_owned(),
            priority: 1,
            base_url: "https://notify.example.com/api".to_owned(),
            token_env: "NOTIFY_TOKEN".to_owned(),
            sender_id: "1".to_owned(),
        })
    );
    assert_eq!(
        config.providers.get(1),
        Some(&ProviderConfig::DirectSend {
            name: "relay".to_owned(),
            priority: 5,
            base_url: "https://relay.example.com".to_owned(),
            token_env: None,
        })
    );
    assert_eq!(
        config.providers.get(2),
        Some(&ProviderConfig::Simulated {
            name: "local-simulation".to_owned(),
            priority: 3,
            latency_ms: 0,
        })
    );
}

#[test]
fn validation_catches_semantic_errors() {
    let mut config = Config::default();
    config.batch.size = 0;
    assert_eq!(config.validate(), Err(ConfigError::ZeroBatchSize));

    let mut config = Config::default();
    config.retry.max_attempts = 0;
    assert_eq!(config.validate(), Err(ConfigError::ZeroAttempts));

    let mut config = Config::default();
    config.providers.clear();
    assert_eq!(config.validate(), Err(ConfigError::NoProviders));

    let mut config = Config::default();
    config.providers.push(ProviderConfig::Simulated {
        name: "local-simulation".to_owned(),
        priority: 9,
        latency_ms: 0,
    });
    assert_eq!(
        config.validate(),
        Err(ConfigError::DuplicateProvider("local-simulation".to_owned()))
    );
}

#[test]
fn invalid_base_url_is_rejected() {
    let toml_str = r#"
[[providers]]
kind = "direct_send"
base_url = "not a url"
"#;
    let err = match Config::from_toml(toml_str) {
        Ok(_) => panic!("bad url should be rejected"),
        Err(err) => err,
    };
    assert!(err.to_string().contains("invalid base_url"));
}

#[test]
fn unknown_provider_kind_is_rejected() {
    let toml_str = r#"
[[providers]]
kind = "carrier_pigeon"
"#;
    assert!(Config::from_toml(toml_str).is_err());
}

#[test]
fn load_from_file() {
    let mut file = match tempfile::NamedTempFile::new() {
        Ok(file) => file,
        Err(err) => panic!("temp file should be created: {err}"),
    };
    let written = writeln!(file, "[batch]\nsize = 2\npacing_ms = 10");
    assert!(written.is_ok());

    let config = match load_config(file.path()) {
        Ok(config) => config,
        Err(err) => panic!("config should load: {err}"),
    };
    assert_eq!(config.batch.size, 2);
    assert_eq!(config.batch.pacing(), Duration::from_millis(10));
}

#[test]
fn missing_file_falls_back_to_defaults() {
    let dir = match tempfile::tempdir() {
        Ok(dir) => dir,
        Err(err) => panic!("temp dir should be created: {err}"),
    };
    let config = match load_or_default(&dir.path().join("absent.toml")) {
        Ok(config) => config,
        Err(err) => panic!("absent file should yield defaults: {err}"),
    };
    assert_eq!(config.batch.size, 5);

    assert!(load_config(&dir.path().join("absent.toml")).is_err());
}
