//! Credential minting, serialization, and validation.
//!
//! A credential is a self-contained, tamper-evident, time-limited token
//! binding a member's identity to its issuance instant. Signing: hex
//! HMAC-SHA256 over `"{subjectId}:{membershipRef}:{issuedAt}"` with the
//! process-wide secret. Signature comparison is constant-time.

use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use subtle::ConstantTimeEq;
use uuid::Uuid;

use crate::config::AccessConfig;
use crate::error::AccessError;

type HmacSha256 = Hmac<Sha256>;

/// The QR payload. Field names on the wire are camelCase:
/// `{"subjectId", "membershipRef", "issuedAt", "signature"}`.
/// Unknown extra fields are ignored on decode; only the four named
/// fields are required and signed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Credential {
    /// Opaque member identifier — stable, never reused across members.
    pub subject_id: Uuid,
    /// Human-facing membership identifier, carried for display/audit.
    pub membership_ref: String,
    /// Issuance instant, integer milliseconds since the Unix epoch.
    pub issued_at: i64,
    /// Hex-encoded HMAC-SHA256 over the other three fields.
    pub signature: String,
}

fn signing_input(subject_id: Uuid, membership_ref: &str, issued_at: i64) -> String {
    format!("{subject_id}:{membership_ref}:{issued_at}")
}

fn compute_signature(secret: &[u8], input: &str) -> Result<Vec<u8>, AccessError> {
    let mut mac = HmacSha256::new_from_slice(secret)
        .map_err(|e| AccessError::Crypto(format!("HMAC key setup: {e}")))?;
    mac.update(input.as_bytes());
    Ok(mac.finalize().into_bytes().to_vec())
}

/// Mint a credential for the given member at `now`.
///
/// Deterministic given identical inputs and clock value; uniqueness
/// comes from `issued_at` plus `subject_id`, no randomness involved.
/// The caller decides whether and how long to cache the result.
pub fn mint(
    subject_id: Uuid,
    membership_ref: &str,
    now: DateTime<Utc>,
    config: &AccessConfig,
) -> Result<Credential, AccessError> {
    let issued_at = now.timestamp_millis();
    let input = signing_input(subject_id, membership_ref, issued_at);
    let signature = hex::encode(compute_signature(config.secret_bytes(), &input)?);

    Ok(Credential {
        subject_id,
        membership_ref: membership_ref.to_owned(),
        issued_at,
        signature,
    })
}

/// Serialize a credential into its transport form (JSON).
pub fn serialize(credential: &Credential) -> Result<String, AccessError> {
    serde_json::to_string(credential).map_err(|e| AccessError::Crypto(format!("serialize: {e}")))
}

/// Structural decode of a raw scanned string.
///
/// Any missing field, wrong type, empty identifier, or non-positive
/// timestamp is [`AccessError::MalformedCredential`]. Adversarial input
/// never panics.
pub fn parse(raw: &str) -> Result<Credential, AccessError> {
    let credential: Credential =
        serde_json::from_str(raw).map_err(|_| AccessError::MalformedCredential)?;

    if credential.membership_ref.is_empty()
        || credential.signature.is_empty()
        || credential.issued_at <= 0
    {
        return Err(AccessError::MalformedCredential);
    }

    Ok(credential)
}

impl Credential {
    /// Whether the credential has outlived `ttl` at `now`. The exact
    /// boundary instant (`now == issued_at + ttl`) is still valid.
    pub fn is_expired(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        now.timestamp_millis() > self.issued_at + ttl.num_milliseconds()
    }

    /// Full validity check: unexpired and the signature matches a fresh
    /// recomputation under `secret`, compared in constant time.
    pub fn verify(&self, secret: &[u8], now: DateTime<Utc>, ttl: Duration) -> bool {
        if self.is_expired(now, ttl) {
            return false;
        }
        self.signature_matches(secret)
    }

    /// Constant-time signature check, independent of expiry.
    pub fn signature_matches(&self, secret: &[u8]) -> bool {
        let input = signing_input(self.subject_id, &self.membership_ref, self.issued_at);
        let Ok(expected) = compute_signature(secret, &input) else {
            return false;
        };
        let Ok(provided) = hex::decode(&self.signature) else {
            return false;
        };
        expected.ct_eq(&provided).into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> AccessConfig {
        AccessConfig::new("unit-test-secret").unwrap()
    }

    fn ttl() -> Duration {
        Duration::hours(24)
    }

    #[test]
    fn round_trip() {
        let config = test_config();
        let now = Utc::now();
        let minted = mint(Uuid::new_v4(), "PM482913K7QX2M", now, &config).unwrap();

        let raw = serialize(&minted).unwrap();
        let parsed = parse(&raw).unwrap();

        assert_eq!(parsed, minted);
        assert!(parsed.verify(config.secret_bytes(), now, ttl()));
    }

    #[test]
    fn wire_field_names_are_camel_case() {
        let config = test_config();
        let raw = serialize(&mint(Uuid::new_v4(), "PM000001AAAAAA", Utc::now(), &config).unwrap())
            .unwrap();

        assert!(raw.contains("\"subjectId\""));
        assert!(raw.contains("\"membershipRef\""));
        assert!(raw.contains("\"issuedAt\""));
        assert!(raw.contains("\"signature\""));
    }

    #[test]
    fn mint_is_deterministic() {
        let config = test_config();
        let now = Utc::now();
        let subject = Uuid::new_v4();

        let a = mint(subject, "PM123456ABCDEF", now, &config).unwrap();
        let b = mint(subject, "PM123456ABCDEF", now, &config).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn tampered_membership_ref_fails_verification() {
        let config = test_config();
        let now = Utc::now();
        let mut credential = mint(Uuid::new_v4(), "PM123456ABCDEF", now, &config).unwrap();

        credential.membership_ref = "PM123456ABCDEG".into();
        assert!(!credential.verify(config.secret_bytes(), now, ttl()));
    }

    #[test]
    fn tampered_subject_id_fails_verification() {
        let config = test_config();
        let now = Utc::now();
        let mut credential = mint(Uuid::new_v4(), "PM123456ABCDEF", now, &config).unwrap();

        credential.subject_id = Uuid::new_v4();
        assert!(!credential.verify(config.secret_bytes(), now, ttl()));
    }

    #[test]
    fn tampered_issued_at_fails_verification() {
        let config = test_config();
        let now = Utc::now();
        let mut credential = mint(Uuid::new_v4(), "PM123456ABCDEF", now, &config).unwrap();

        credential.issued_at += 1;
        assert!(!credential.verify(config.secret_bytes(), now, ttl()));
    }

    #[test]
    fn wrong_secret_fails_verification() {
        let config = test_config();
        let other = AccessConfig::new("different-secret").unwrap();
        let now = Utc::now();
        let credential = mint(Uuid::new_v4(), "PM123456ABCDEF", now, &config).unwrap();

        assert!(!credential.verify(other.secret_bytes(), now, ttl()));
    }

    #[test]
    fn garbage_hex_signature_is_rejected_without_panic() {
        let config = test_config();
        let now = Utc::now();
        let mut credential = mint(Uuid::new_v4(), "PM123456ABCDEF", now, &config).unwrap();

        credential.signature = "not-hex-at-all".into();
        assert!(!credential.verify(config.secret_bytes(), now, ttl()));

        // Valid hex of the wrong length compares unequal, not panics.
        credential.signature = "deadbeef".into();
        assert!(!credential.verify(config.secret_bytes(), now, ttl()));
    }

    #[test]
    fn expiry_boundary_is_exact() {
        let config = test_config();
        let now = Utc::now();
        let subject = Uuid::new_v4();

        // issued_at = now - ttl: NOT expired.
        let boundary = mint(subject, "PM123456ABCDEF", now - ttl(), &config).unwrap();
        assert!(!boundary.is_expired(now, ttl()));
        assert!(boundary.verify(config.secret_bytes(), now, ttl()));

        // One millisecond older: expired.
        let stale = mint(
            subject,
            "PM123456ABCDEF",
            now - ttl() - Duration::milliseconds(1),
            &config,
        )
        .unwrap();
        assert!(stale.is_expired(now, ttl()));
        assert!(!stale.verify(config.secret_bytes(), now, ttl()));
    }

    #[test]
    fn parse_rejects_malformed_input() {
        // Not JSON at all.
        assert!(matches!(
            parse("definitely not json"),
            Err(AccessError::MalformedCredential)
        ));

        // Missing signature field.
        assert!(matches!(
            parse(r#"{"subjectId":"a2f1f3f0-0000-0000-0000-000000000000","membershipRef":"PM1","issuedAt":1000}"#),
            Err(AccessError::MalformedCredential)
        ));

        // subjectId is not a UUID.
        assert!(matches!(
            parse(r#"{"subjectId":"nope","membershipRef":"PM1","issuedAt":1000,"signature":"ab"}"#),
            Err(AccessError::MalformedCredential)
        ));

        // Wrong type for issuedAt.
        assert!(matches!(
            parse(r#"{"subjectId":"a2f1f3f0-0000-0000-0000-000000000000","membershipRef":"PM1","issuedAt":"1000","signature":"ab"}"#),
            Err(AccessError::MalformedCredential)
        ));

        // Empty membership ref.
        assert!(matches!(
            parse(r#"{"subjectId":"a2f1f3f0-0000-0000-0000-000000000000","membershipRef":"","issuedAt":1000,"signature":"ab"}"#),
            Err(AccessError::MalformedCredential)
        ));

        // Zero timestamp.
        assert!(matches!(
            parse(r#"{"subjectId":"a2f1f3f0-0000-0000-0000-000000000000","membershipRef":"PM1","issuedAt":0,"signature":"ab"}"#),
            Err(AccessError::MalformedCredential)
        ));
    }

    #[test]
    fn extra_json_fields_are_tolerated() {
        let config = test_config();
        let now = Utc::now();
        let credential = mint(Uuid::new_v4(), "PM123456ABCDEF", now, &config).unwrap();
        let raw = serialize(&credential).unwrap();

        // A payload produced by a newer issuer may carry fields this
        // decoder does not know; they must not break the decode or the
        // signature over the four named fields.
        let extended = format!(
            "{},\"displayHint\":\"dark\",\"v\":2}}",
            raw.strip_suffix('}').unwrap()
        );

        let parsed = parse(&extended).unwrap();
        assert_eq!(parsed, credential);
        assert!(parsed.verify(config.secret_bytes(), now, ttl()));
    }

    #[test]
    fn single_character_flip_in_serialized_form_is_detected() {
        let config = test_config();
        let now = Utc::now();
        let credential = mint(Uuid::new_v4(), "PM123456ABCDEF", now, &config).unwrap();
        let raw = serialize(&credential).unwrap();

        // Flip one character inside the membershipRef value while
        // leaving the signature untouched.
        let tampered = raw.replace("PM123456ABCDEF", "PM123456ABCDEX");
        assert_ne!(raw, tampered);

        let parsed = parse(&tampered).unwrap();
        assert!(!parsed.verify(config.secret_bytes(), now, ttl()));
    }
}
