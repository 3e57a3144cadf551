//! TOTP engine - RFC 4226 HOTP / RFC 6238 TOTP with fixed parameters.
//!
//! Codes are six digits over a 30-second step with HMAC-SHA1; these
//! parameters are part of the stored otpauth URI contract and parsing
//! rejects any deviation. Validation tolerates configurable clock drift
//! and reports only a boolean, never which step offset matched.

use base32::Alphabet;
use chrono::Utc;
use hmac::{Hmac, Mac};
use percent_encoding::percent_decode_str;
use rand::rngs::OsRng;
use rand::RngCore;
use sha1::Sha1;
use subtle::ConstantTimeEq;
use thiserror::Error;
use url::Url;

type HmacSha1 = Hmac<Sha1>;

const DIGITS: u32 = 6;
const PERIOD: i64 = 30;
const ALGORITHM: &str = "SHA1";
const B32: Alphabet = Alphabet::Rfc4648 { padding: true };

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TotpError {
    #[error("malformed otpauth uri")]
    MalformedUri,
    #[error("unsupported otpauth parameter: {0}")]
    UnsupportedParameter(&'static str),
    #[error("invalid base32 secret")]
    InvalidSecret,
    #[error("invalid otpauth label")]
    InvalidLabel,
}

/// Generate a fresh shared secret of `len` random bytes.
pub fn generate_secret(len: usize) -> Vec<u8> {
    let mut key = vec![0u8; len];
    OsRng.fill_bytes(&mut key);
    key
}

/// Encode a secret the way authenticator apps expect it (upper-case
/// RFC 4648 base32).
pub fn encode_secret(secret: &[u8]) -> String {
    base32::encode(B32, secret)
}

/// A TOTP specification: secret plus the issuer/subject shown in
/// authenticator apps. The secret is deliberately not exposed raw.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Totp {
    secret: Vec<u8>,
    pub issuer: String,
    pub subject: String,
}

impl Totp {
    /// Create a spec with a freshly generated secret of `key_len` bytes.
    pub fn generate(key_len: usize, issuer: &str, subject: &str) -> Self {
        Self {
            secret: generate_secret(key_len),
            issuer: issuer.to_string(),
            subject: subject.to_string(),
        }
    }

    /// Rebuild a spec from a base32 secret the user already holds.
    pub fn from_secret(secret_b32: &str, issuer: &str, subject: &str) -> Result<Self, TotpError> {
        let secret = base32::decode(B32, secret_b32).ok_or(TotpError::InvalidSecret)?;
        Ok(Self {
            secret,
            issuer: issuer.to_string(),
            subject: subject.to_string(),
        })
    }

    /// Parse an otpauth URI. Anything but SHA1/6 digits/30s is rejected
    /// as unsupported.
    pub fn parse(uri: &str) -> Result<Self, TotpError> {
        let url = Url::parse(uri).map_err(|_| TotpError::MalformedUri)?;
        if url.scheme() != "otpauth" || url.host_str() != Some("totp") {
            return Err(TotpError::MalformedUri);
        }

        let mut secret_b32 = None;
        let mut digits = None;
        let mut period = None;
        let mut algorithm = None;
        for (key, value) in url.query_pairs() {
            match key.as_ref() {
                "secret" => secret_b32 = Some(value.into_owned()),
                "digits" => digits = Some(value.into_owned()),
                "period" => period = Some(value.into_owned()),
                "algorithm" => algorithm = Some(value.into_owned()),
                _ => {}
            }
        }
        if digits.as_deref() != Some("6") {
            return Err(TotpError::UnsupportedParameter("digits"));
        }
        if period.as_deref() != Some("30") {
            return Err(TotpError::UnsupportedParameter("period"));
        }
        if algorithm.as_deref() != Some(ALGORITHM) {
            return Err(TotpError::UnsupportedParameter("algorithm"));
        }

        let secret_b32 = secret_b32.ok_or(TotpError::InvalidSecret)?;
        let secret = base32::decode(B32, &secret_b32).ok_or(TotpError::InvalidSecret)?;

        let label = percent_decode_str(url.path().trim_start_matches('/'))
            .decode_utf8()
            .map_err(|_| TotpError::InvalidLabel)?;
        let (issuer, subject) = label.split_once(':').ok_or(TotpError::InvalidLabel)?;
        if issuer.is_empty() || subject.is_empty() || subject.contains(':') {
            return Err(TotpError::InvalidLabel);
        }

        Ok(Self {
            secret,
            issuer: issuer.to_string(),
            subject: subject.to_string(),
        })
    }

    /// The base32 form of the secret, for initial enrollment display.
    pub fn secret_b32(&self) -> String {
        encode_secret(&self.secret)
    }

    /// Serialize to the otpauth URI stored against the credential.
    pub fn uri(&self) -> Result<String, TotpError> {
        let mut url = Url::parse(&format!("otpauth://totp/{}:{}", self.issuer, self.subject))
            .map_err(|_| TotpError::InvalidLabel)?;
        url.query_pairs_mut()
            .append_pair("secret", &self.secret_b32())
            .append_pair("issuer", &self.issuer)
            .append_pair("algorithm", ALGORITHM)
            .append_pair("digits", "6")
            .append_pair("period", "30");
        Ok(url.into())
    }

    /// HOTP code for a counter value: HMAC-SHA1 over the 8-byte
    /// big-endian counter, dynamic truncation, mod 10^6, zero-padded.
    pub fn hotp(&self, counter: u64) -> String {
        let mut mac =
            HmacSha1::new_from_slice(&self.secret).expect("hmac accepts any key length");
        mac.update(&counter.to_be_bytes());
        let digest = mac.finalize().into_bytes();

        let offset = (digest[19] & 0xf) as usize;
        let binary = u32::from_be_bytes([
            digest[offset],
            digest[offset + 1],
            digest[offset + 2],
            digest[offset + 3],
        ]) & 0x7fff_ffff;

        format!("{:06}", binary % 10u32.pow(DIGITS))
    }

    /// Code for a given unix timestamp (counter = time / 30).
    pub fn code_at(&self, unix_secs: i64) -> String {
        self.hotp((unix_secs / PERIOD).max(0) as u64)
    }

    /// Code for the current wall clock.
    pub fn current_code(&self) -> String {
        self.code_at(Utc::now().timestamp())
    }

    /// Validate a code at a given timestamp, accepting the counter and
    /// counter ± i for i in 1..drift.
    pub fn validate_at(&self, code: &str, drift: u32, unix_secs: i64) -> bool {
        let counter = (unix_secs / PERIOD).max(0) as u64;
        let mut ok = code_eq(code, &self.hotp(counter));
        for i in 1..u64::from(drift) {
            ok |= code_eq(code, &self.hotp(counter + i));
            if let Some(earlier) = counter.checked_sub(i) {
                ok |= code_eq(code, &self.hotp(earlier));
            }
        }
        ok
    }

    /// Validate a code against the current wall clock.
    pub fn validate(&self, code: &str, drift: u32) -> bool {
        self.validate_at(code, drift, Utc::now().timestamp())
    }
}

fn code_eq(a: &str, b: &str) -> bool {
    a.len() == b.len() && bool::from(a.as_bytes().ct_eq(b.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rfc_totp() -> Totp {
        // RFC 4226 appendix D secret
        Totp {
            secret: b"12345678901234567890".to_vec(),
            issuer: "Acme".to_string(),
            subject: "alice@example.com".to_string(),
        }
    }

    #[test]
    fn hotp_matches_rfc4226_vectors() {
        let totp = rfc_totp();
        let expected = [
            "755224", "287082", "359152", "969429", "338314", "254676", "287922", "162583",
            "399871", "520489",
        ];
        for (counter, code) in expected.iter().enumerate() {
            assert_eq!(totp.hotp(counter as u64), *code);
        }
    }

    #[test]
    fn codes_are_deterministic_six_digits() {
        let totp = Totp::generate(20, "Acme", "bob");
        for counter in [0u64, 1, 59, 1_111_111_109, u64::from(u32::MAX)] {
            let code = totp.hotp(counter);
            assert_eq!(code.len(), 6);
            assert!(code.chars().all(|c| c.is_ascii_digit()));
            assert_eq!(code, totp.hotp(counter));
        }
    }

    #[test]
    fn validate_accepts_within_drift_window() {
        let totp = rfc_totp();
        let now = 1_600_000_000;
        let drift = 3;

        // offsets -drift+1 ..= drift-1 accepted
        for offset in -2i64..=2 {
            let code = totp.code_at(now + offset * 30);
            assert!(
                totp.validate_at(&code, drift, now),
                "offset {offset} should validate"
            );
        }
        // outside the window rejected
        for offset in [-3i64, 3] {
            let code = totp.code_at(now + offset * 30);
            assert!(
                !totp.validate_at(&code, drift, now),
                "offset {offset} should not validate"
            );
        }
    }

    #[test]
    fn zero_drift_accepts_only_current_step() {
        let totp = rfc_totp();
        let now = 1_600_000_000;
        assert!(totp.validate_at(&totp.code_at(now), 0, now));
        assert!(!totp.validate_at(&totp.code_at(now + 30), 0, now));
    }

    #[test]
    fn validate_rejects_garbage() {
        let totp = rfc_totp();
        assert!(!totp.validate_at("000000x", 2, 1_600_000_000));
        assert!(!totp.validate_at("", 2, 1_600_000_000));
    }

    #[test]
    fn uri_round_trips() {
        let totp = Totp::generate(20, "Acme Co", "alice@example.com");
        let uri = totp.uri().unwrap();
        assert!(uri.starts_with("otpauth://totp/"));

        let parsed = Totp::parse(&uri).unwrap();
        assert_eq!(parsed.issuer, "Acme Co");
        assert_eq!(parsed.subject, "alice@example.com");
        assert_eq!(parsed.secret_b32(), totp.secret_b32());
        assert_eq!(parsed.hotp(42), totp.hotp(42));
    }

    #[test]
    fn parse_rejects_nonstandard_parameters() {
        let totp = Totp::generate(20, "Acme", "alice");
        let uri = totp.uri().unwrap();

        let eight_digits = uri.replace("digits=6", "digits=8");
        assert_eq!(
            Totp::parse(&eight_digits),
            Err(TotpError::UnsupportedParameter("digits"))
        );

        let minute_period = uri.replace("period=30", "period=60");
        assert_eq!(
            Totp::parse(&minute_period),
            Err(TotpError::UnsupportedParameter("period"))
        );

        let sha256 = uri.replace("algorithm=SHA1", "algorithm=SHA256");
        assert_eq!(
            Totp::parse(&sha256),
            Err(TotpError::UnsupportedParameter("algorithm"))
        );

        assert!(Totp::parse("otpauth://hotp/Acme:alice?digits=6").is_err());
        assert!(Totp::parse("https://example.com").is_err());
    }

    #[test]
    fn parse_rejects_label_without_subject() {
        let totp = Totp::generate(20, "Acme", "alice");
        let uri = totp.uri().unwrap().replace("Acme:alice", "Acme");
        assert_eq!(Totp::parse(&uri), Err(TotpError::InvalidLabel));
    }

    #[test]
    fn from_secret_round_trips_base32() {
        let totp = rfc_totp();
        let again = Totp::from_secret(&totp.secret_b32(), "Acme", "alice@example.com").unwrap();
        assert_eq!(again.hotp(7), totp.hotp(7));
        assert!(Totp::from_secret("not base32 !!", "Acme", "alice").is_err());
    }
}
