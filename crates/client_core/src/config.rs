use std::{fs, time::Duration};

use anyhow::{bail, Context};
use serde::Deserialize;
use tracing::warn;
use url::Url;

pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
pub const SETTINGS_FILE: &str = "predictor.toml";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub base_url: String,
    pub request_timeout: Duration,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.into(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct FileSettings {
    base_url: Option<String>,
    request_timeout_secs: Option<u64>,
}

/// Defaults, then `predictor.toml` in the working directory, then the
/// process environment.
pub fn load_settings() -> Settings {
    let file = fs::read_to_string(SETTINGS_FILE).ok();
    settings_from_sources(file.as_deref(), |key| std::env::var(key).ok())
}

pub fn settings_from_sources(
    file_contents: Option<&str>,
    env: impl Fn(&str) -> Option<String>,
) -> Settings {
    let mut settings = Settings::default();

    if let Some(raw) = file_contents {
        match toml::from_str::<FileSettings>(raw) {
            Ok(file_cfg) => {
                if let Some(v) = file_cfg.base_url {
                    settings.base_url = v;
                }
                if let Some(secs) = file_cfg.request_timeout_secs {
                    apply_timeout_secs(&mut settings, secs);
                }
            }
            Err(error) => warn!(%error, file = SETTINGS_FILE, "ignoring malformed settings file"),
        }
    }

    if let Some(v) = env("PREDICTOR_BASE_URL") {
        settings.base_url = v;
    }
    if let Some(v) = env("APP__BASE_URL") {
        settings.base_url = v;
    }

    if let Some(v) = env("APP__REQUEST_TIMEOUT_SECS") {
        match v.trim().parse::<u64>() {
            Ok(secs) => apply_timeout_secs(&mut settings, secs),
            Err(_) => warn!(value = %v, "ignoring non-numeric APP__REQUEST_TIMEOUT_SECS"),
        }
    }

    settings
}

fn apply_timeout_secs(settings: &mut Settings, secs: u64) {
    if secs == 0 {
        warn!("request timeout must be positive; keeping {:?}", settings.request_timeout);
        return;
    }
    settings.request_timeout = Duration::from_secs(secs);
}

/// Accepts an absolute http(s) URL and strips the trailing slash so endpoint
/// paths can be appended directly.
pub fn normalize_base_url(raw_base_url: &str) -> anyhow::Result<String> {
    let raw_base_url = raw_base_url.trim();
    if raw_base_url.is_empty() {
        bail!("prediction service base url is empty");
    }

    let url = Url::parse(raw_base_url)
        .with_context(|| format!("invalid prediction service base url '{raw_base_url}'"))?;
    if !matches!(url.scheme(), "http" | "https") {
        bail!(
            "prediction service base url '{raw_base_url}' must use http or https, not '{}'",
            url.scheme()
        );
    }
    if url.query().is_some() || url.fragment().is_some() {
        bail!("prediction service base url '{raw_base_url}' must not carry a query or fragment");
    }

    Ok(url.as_str().trim_end_matches('/').to_string())
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
