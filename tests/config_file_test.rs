use melted_scenario::config::{LogFormat, ScenarioConfig};
use std::time::Duration;

const EXAMPLE_CONFIG: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/scenarios/deploy.toml");

#[test]
fn test_load_example_config() {
    let config = ScenarioConfig::from_file(EXAMPLE_CONFIG).expect("Failed to load config");

    assert_eq!(config.prefix, "resilience-demo");
    assert_eq!(config.instance_type, "t3.micro");
    assert_eq!(config.names.table_name, "resilience-demo-recommendations");
    assert_eq!(config.names.load_balancer_name, "resilience-demo-lb");
    assert_eq!(config.retry.auto_scaling_group.interval, Duration::from_millis(1000));
    assert_eq!(config.retry.endpoint.max_retries, 30);
    assert_eq!(config.logging.format, LogFormat::Pretty);
    assert!(config.logging.directory.is_none());
}

#[test]
fn test_example_config_roundtrip() {
    let original = ScenarioConfig::from_file(EXAMPLE_CONFIG).expect("Failed to load config");

    let toml_string = original.to_string().expect("Failed to serialize");
    let restored = ScenarioConfig::from_toml(&toml_string).expect("Failed to parse");

    assert_eq!(restored, original);
    assert!(toml_string.contains("[names]"));
    assert!(!toml_string.contains("load_balancer_name"));
}
