use super::*;

use std::collections::HashMap;

fn env_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    move |key| map.get(key).cloned()
}

#[test]
fn defaults_point_at_local_service() {
    let settings = settings_from_sources(None, env_from(&[]));
    assert_eq!(settings, Settings::default());
    assert_eq!(settings.base_url, "http://localhost:8000");
    assert_eq!(settings.request_timeout, Duration::from_secs(10));
}

#[test]
fn file_values_override_defaults() {
    let file = "base_url = \"https://predictor.example.org/api\"\nrequest_timeout_secs = 3\n";
    let settings = settings_from_sources(Some(file), env_from(&[]));
    assert_eq!(settings.base_url, "https://predictor.example.org/api");
    assert_eq!(settings.request_timeout, Duration::from_secs(3));
}

#[test]
fn environment_overrides_file() {
    let file = "base_url = \"http://from-file:8000\"\n";
    let settings = settings_from_sources(
        Some(file),
        env_from(&[
            ("PREDICTOR_BASE_URL", "http://from-env:9000"),
            ("APP__REQUEST_TIMEOUT_SECS", "25"),
        ]),
    );
    assert_eq!(settings.base_url, "http://from-env:9000");
    assert_eq!(settings.request_timeout, Duration::from_secs(25));
}

#[test]
fn app_prefixed_variable_wins() {
    let settings = settings_from_sources(
        None,
        env_from(&[
            ("PREDICTOR_BASE_URL", "http://first:1"),
            ("APP__BASE_URL", "http://second:2"),
        ]),
    );
    assert_eq!(settings.base_url, "http://second:2");
}

#[test]
fn bad_values_keep_previous_layer() {
    let settings = settings_from_sources(
        Some("request_timeout_secs = \"soon\""),
        env_from(&[("APP__REQUEST_TIMEOUT_SECS", "0")]),
    );
    assert_eq!(settings, Settings::default());
}

#[test]
fn normalizes_trailing_slash() {
    assert_eq!(
        normalize_base_url(" http://localhost:8000/ ").expect("url"),
        "http://localhost:8000"
    );
    assert_eq!(
        normalize_base_url("https://host/api/").expect("url"),
        "https://host/api"
    );
}

#[test]
fn rejects_unusable_base_urls() {
    assert!(normalize_base_url("").is_err());
    assert!(normalize_base_url("localhost:8000").is_err());
    assert!(normalize_base_url("ftp://host").is_err());
    assert!(normalize_base_url("http://host/?token=1").is_err());
}
