use std::path::Path;
use std::time::Duration;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::{RepoError, RepoResult};

/// Repository settings, loadable from TOML.
///
/// ```toml
/// [author]
/// name = "automate"
/// email = "automate@example.com"
///
/// [lock]
/// retry_delay_ms = 100
/// max_attempts = 50
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RepoConfig {
    pub author: AuthorConfig,
    pub lock: LockPolicy,
}

impl RepoConfig {
    /// Parse settings from TOML text.
    pub fn from_toml_str(text: &str) -> RepoResult<Self> {
        toml::from_str(text).map_err(|e| RepoError::Config(e.to_string()))
    }

    /// Read a config file; a missing file yields the defaults.
    pub fn load(path: &Path) -> RepoResult<Self> {
        match std::fs::read_to_string(path) {
            Ok(text) => Self::from_toml_str(&text),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Identity stamped on commits.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthorConfig {
    pub name: String,
    pub email: String,
}

impl Default for AuthorConfig {
    fn default() -> Self {
        Self {
            name: "aetree".into(),
            email: "aetree@localhost".into(),
        }
    }
}

/// Retry behaviour while another writer holds the commit lock.
///
/// With neither `max_attempts` nor `timeout_ms` set, acquisition retries
/// until it succeeds.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LockPolicy {
    pub retry_delay_ms: u64,
    /// Upper bound of a random extra delay added to each retry.
    pub jitter_ms: u64,
    pub max_attempts: Option<u32>,
    pub timeout_ms: Option<u64>,
}

impl Default for LockPolicy {
    fn default() -> Self {
        Self {
            retry_delay_ms: 100,
            jitter_ms: 0,
            max_attempts: None,
            timeout_ms: None,
        }
    }
}

impl LockPolicy {
    /// Give up after `max_attempts` tries.
    pub fn bounded(max_attempts: u32, retry_delay_ms: u64) -> Self {
        Self {
            retry_delay_ms,
            max_attempts: Some(max_attempts),
            ..Self::default()
        }
    }

    pub fn is_unbounded(&self) -> bool {
        self.max_attempts.is_none() && self.timeout_ms.is_none()
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }

    /// Retry delay with jitter applied.
    pub fn next_delay(&self) -> Duration {
        let jitter = if self.jitter_ms > 0 {
            rand::thread_rng().gen_range(0..=self.jitter_ms)
        } else {
            0
        };
        Duration::from_millis(self.retry_delay_ms + jitter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_retry_forever_every_100ms() {
        let c = RepoConfig::default();
        assert!(c.lock.is_unbounded());
        assert_eq!(c.lock.next_delay(), Duration::from_millis(100));
        assert_eq!(c.author.name, "aetree");
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let c = RepoConfig::from_toml_str(
            r#"
            [lock]
            max_attempts = 5
            jitter_ms = 20
            "#,
        )
        .unwrap();
        assert_eq!(c.lock.max_attempts, Some(5));
        assert_eq!(c.lock.retry_delay_ms, 100);
        assert_eq!(c.author, AuthorConfig::default());

        let delay = c.lock.next_delay();
        assert!(delay >= Duration::from_millis(100) && delay <= Duration::from_millis(120));
    }

    #[test]
    fn bad_toml_is_a_config_error() {
        assert!(matches!(
            RepoConfig::from_toml_str("[lock]\nmax_attempts = \"many\""),
            Err(RepoError::Config(_))
        ));
    }

    #[test]
    fn missing_file_means_defaults() {
        let c = RepoConfig::load(Path::new("/nonexistent/aetree.toml")).unwrap();
        assert_eq!(c, RepoConfig::default());
    }
}
