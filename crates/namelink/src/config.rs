//! Configuration for publishers and readers.
//!
//! Every struct has sensible defaults and can be loaded from JSON, with
//! missing fields taking their default.

use serde::Deserialize;

pub use namelink_verify::VerifierConfig;

use crate::error::{NamelinkError, Result};

/// Configuration for a [`crate::Publisher`].
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PublisherConfig {
    /// Chain links are signed for.
    pub chain_id: u64,
    /// Attempts per append or profile update before giving up.
    pub max_append_attempts: u32,
    /// Base backoff after a lost compare-and-swap. Doubles per attempt.
    pub retry_backoff_ms: u64,
}

impl PublisherConfig {
    /// Reject settings under which no append could ever be attempted.
    pub fn validate(&self) -> Result<()> {
        if self.max_append_attempts == 0 {
            return Err(NamelinkError::InvalidConfig(
                "publisher.max_append_attempts must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

impl Default for PublisherConfig {
    fn default() -> Self {
        Self {
            chain_id: 1,
            max_append_attempts: 8,
            retry_backoff_ms: 5,
        }
    }
}

/// Configuration for a [`crate::Reader`].
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ReaderConfig {
    /// Longest chain a walk will follow before reporting it as corrupt.
    pub max_chain_walk: usize,
    /// Verification settings.
    pub verifier: VerifierConfig,
}

impl ReaderConfig {
    pub fn validate(&self) -> Result<()> {
        if self.max_chain_walk == 0 {
            return Err(NamelinkError::InvalidConfig(
                "reader.max_chain_walk must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            max_chain_walk: 1_000_000,
            verifier: VerifierConfig::default(),
        }
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct NamelinkConfig {
    pub publisher: PublisherConfig,
    pub reader: ReaderConfig,
}

impl NamelinkConfig {
    /// Parse from JSON and validate.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| NamelinkError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.publisher.validate()?;
        self.reader.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = NamelinkConfig::default();
        assert_eq!(config.publisher.max_append_attempts, 8);
        assert_eq!(config.publisher.retry_backoff_ms, 5);
        assert_eq!(config.reader.max_chain_walk, 1_000_000);
        assert!(config.reader.verifier.require_registered_key);
    }

    #[test]
    fn test_partial_json() {
        let config = NamelinkConfig::from_json(
            r#"{"publisher":{"chain_id":100},"reader":{"verifier":{"require_registered_key":false}}}"#,
        )
        .unwrap();
        assert_eq!(config.publisher.chain_id, 100);
        assert_eq!(config.publisher.max_append_attempts, 8);
        assert!(!config.reader.verifier.require_registered_key);
    }

    #[test]
    fn test_zero_attempts_rejected() {
        let err = NamelinkConfig::from_json(r#"{"publisher":{"max_append_attempts":0}}"#)
            .unwrap_err();
        assert!(matches!(err, NamelinkError::InvalidConfig(ref msg) if msg.contains("max_append_attempts")));

        assert!(matches!(
            NamelinkConfig::from_json(r#"{"reader":{"max_chain_walk":0}}"#),
            Err(NamelinkError::InvalidConfig(_))
        ));
        assert!(NamelinkConfig::from_json(r#"{"publisher":{"max_append_attempts":1}}"#).is_ok());
    }

    #[test]
    fn test_bad_json() {
        assert!(matches!(
            NamelinkConfig::from_json("{"),
            Err(NamelinkError::InvalidConfig(_))
        ));
    }
}
