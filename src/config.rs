use std::env;
use std::time::Duration;

pub const ENDPOINT_VAR: &str = "MASKEDIT_ENDPOINT";
pub const MAX_ATTEMPTS_VAR: &str = "MASKEDIT_MAX_ATTEMPTS";
pub const BACKOFF_MS_VAR: &str = "MASKEDIT_BACKOFF_MS";
pub const TIMEOUT_SECS_VAR: &str = "MASKEDIT_TIMEOUT_SECS";

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);
const DEFAULT_MAX_ATTEMPTS: u32 = 3;
const DEFAULT_BACKOFF: Duration = Duration::from_secs(1);

/// Settings for talking to the remote edit model
#[derive(Debug, Clone, PartialEq)]
pub struct EditConfig {
    /// Full `:predict` URL
    pub endpoint: String,
    pub connect_timeout: Duration,
    pub read_timeout: Duration,
    pub write_timeout: Duration,
    /// Total send attempts, including the first
    pub max_attempts: u32,
    /// First backoff delay; doubles on each further retry
    pub backoff_base: Duration,
    pub sample_count: u32,
}

impl Default for EditConfig {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            connect_timeout: DEFAULT_TIMEOUT,
            read_timeout: DEFAULT_TIMEOUT,
            write_timeout: DEFAULT_TIMEOUT,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            backoff_base: DEFAULT_BACKOFF,
            sample_count: 1,
        }
    }
}

impl EditConfig {
    /// Defaults overlaid with `MASKEDIT_*` environment variables
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        let read = |key: &str| lookup(key).map(|raw| raw.trim().to_string());

        if let Some(endpoint) = read(ENDPOINT_VAR).filter(|v| !v.is_empty()) {
            config.endpoint = endpoint;
        }
        if let Some(attempts) = read(MAX_ATTEMPTS_VAR).and_then(|v| v.parse::<u32>().ok()) {
            config.max_attempts = attempts.clamp(1, 10);
        }
        if let Some(ms) = read(BACKOFF_MS_VAR).and_then(|v| v.parse::<u64>().ok()) {
            config.backoff_base = Duration::from_millis(ms.clamp(50, 60_000));
        }
        if let Some(secs) = read(TIMEOUT_SECS_VAR).and_then(|v| v.parse::<u64>().ok()) {
            let timeout = Duration::from_secs(secs.clamp(1, 600));
            config.connect_timeout = timeout;
            config.read_timeout = timeout;
            config.write_timeout = timeout;
        }
        config
    }

    /// Backoff before the retry that follows the `failures`-th failed attempt:
    /// `base * 2^(failures - 1)`
    pub fn backoff(&self, failures: u32) -> Duration {
        let exponent = failures.saturating_sub(1).min(16);
        self.backoff_base.saturating_mul(1 << exponent)
    }
}

/// Vertex AI `:predict` URL for a publisher model
pub fn vertex_endpoint(project: &str, location: &str, model: &str) -> String {
    format!(
        "https://{location}-aiplatform.googleapis.com/v1/projects/{project}/locations/{location}/publishers/google/models/{model}:predict"
    )
}
