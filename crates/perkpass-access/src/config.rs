//! Access configuration.

use chrono::Duration;

use crate::error::AccessError;

/// Configuration for credential minting and verification.
///
/// The signing secret and the TTL constants are loaded once at process
/// start and never mutated afterwards.
#[derive(Debug, Clone)]
pub struct AccessConfig {
    /// HMAC-SHA256 signing secret. There is deliberately no default:
    /// construction fails on an empty secret instead of falling back to
    /// a known constant.
    credential_secret: String,
    /// Lifetime of the long-lived membership credential in hours
    /// (default: 24). Governs both the cached payload's expiry window
    /// and verification-time expiry.
    pub credential_ttl_hours: u64,
    /// Lifetime of a single-use presentation token in minutes
    /// (default: 5). Kept distinct from the membership TTL so a future
    /// display-token flow never silently inherits the 24-hour window.
    pub presentation_ttl_minutes: u64,
}

impl AccessConfig {
    /// Build a configuration with default TTLs.
    ///
    /// Fails if the secret is empty or whitespace-only.
    pub fn new(credential_secret: impl Into<String>) -> Result<Self, AccessError> {
        let credential_secret = credential_secret.into();
        if credential_secret.trim().is_empty() {
            return Err(AccessError::Crypto(
                "credential signing secret must not be empty".into(),
            ));
        }
        Ok(Self {
            credential_secret,
            credential_ttl_hours: 24,
            presentation_ttl_minutes: 5,
        })
    }

    pub fn with_credential_ttl_hours(mut self, hours: u64) -> Self {
        self.credential_ttl_hours = hours;
        self
    }

    /// The signing secret's raw bytes.
    pub fn secret_bytes(&self) -> &[u8] {
        self.credential_secret.as_bytes()
    }

    /// Membership credential lifetime.
    pub fn credential_ttl(&self) -> Duration {
        Duration::hours(self.credential_ttl_hours as i64)
    }

    /// Presentation token lifetime.
    pub fn presentation_ttl(&self) -> Duration {
        Duration::minutes(self.presentation_ttl_minutes as i64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_secret_is_refused() {
        assert!(AccessConfig::new("").is_err());
        assert!(AccessConfig::new("   ").is_err());
    }

    #[test]
    fn default_ttls() {
        let config = AccessConfig::new("test-secret").unwrap();
        assert_eq!(config.credential_ttl(), Duration::hours(24));
        assert_eq!(config.presentation_ttl(), Duration::minutes(5));
    }

    #[test]
    fn ttl_override() {
        let config = AccessConfig::new("test-secret")
            .unwrap()
            .with_credential_ttl_hours(1);
        assert_eq!(config.credential_ttl(), Duration::hours(1));
    }
}
