//! Secret material: redacted wrappers, random minting, and constant-time digests.

// crates.io
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use rand::RngCore;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
// self
use crate::_prelude::*;

/// Random bytes backing every minted secret (256 bits).
pub const SECRET_BYTES: usize = 32;

/// Returns `bytes` bytes of OS-seeded randomness encoded as base64url without padding.
pub fn random_token(bytes: usize) -> String {
	let mut buf = vec![0_u8; bytes];

	rand::rng().fill_bytes(&mut buf);

	URL_SAFE_NO_PAD.encode(buf)
}

/// Compares two strings in time independent of where they first differ.
pub fn constant_time_eq(lhs: &str, rhs: &str) -> bool {
	lhs.as_bytes().ct_eq(rhs.as_bytes()).into()
}

/// Redacted token secret wrapper keeping sensitive material out of logs.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenSecret(String);
impl TokenSecret {
	/// Wraps a new secret string.
	pub fn new(value: impl Into<String>) -> Self {
		Self(value.into())
	}

	/// Mints a fresh high-entropy secret.
	pub fn generate() -> Self {
		Self(random_token(SECRET_BYTES))
	}

	/// Returns the inner token value. Callers must avoid logging this string.
	pub fn expose(&self) -> &str {
		&self.0
	}

	/// Constant-time comparison against a presented candidate.
	pub fn matches(&self, candidate: &str) -> bool {
		constant_time_eq(&self.0, candidate)
	}
}
impl AsRef<str> for TokenSecret {
	fn as_ref(&self) -> &str {
		self.expose()
	}
}
impl Debug for TokenSecret {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_tuple("TokenSecret").field(&"<redacted>").finish()
	}
}
impl Display for TokenSecret {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("<redacted>")
	}
}

/// SHA-256 digest of a client secret; the plaintext is never retained after issuance.
#[derive(Clone, PartialEq, Eq)]
pub struct SecretDigest([u8; 32]);
impl SecretDigest {
	/// Hashes the provided secret.
	pub fn of(secret: &str) -> Self {
		Self(Sha256::digest(secret.as_bytes()).into())
	}

	/// Verifies a presented secret against the stored digest in constant time.
	pub fn verify(&self, candidate: &str) -> bool {
		let presented: [u8; 32] = Sha256::digest(candidate.as_bytes()).into();

		self.0.ct_eq(&presented).into()
	}
}
impl Debug for SecretDigest {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_tuple("SecretDigest").field(&"<redacted>").finish()
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn secret_formatters_redact() {
		let secret = TokenSecret::new("super-secret");

		assert_eq!(format!("{secret:?}"), "TokenSecret(\"<redacted>\")");
		assert_eq!(format!("{secret}"), "<redacted>");
		assert_eq!(format!("{:?}", SecretDigest::of("super-secret")), "SecretDigest(\"<redacted>\")");
	}

	#[test]
	fn generated_secrets_carry_full_entropy() {
		let a = TokenSecret::generate();
		let b = TokenSecret::generate();

		assert_ne!(a, b);
		assert_eq!(a.expose().len(), 43, "32 bytes encode to 43 base64url characters.");
		assert!(a.expose().chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
	}

	#[test]
	fn digest_and_secret_comparisons() {
		let digest = SecretDigest::of("s3cret");

		assert!(digest.verify("s3cret"));
		assert!(!digest.verify("s3cret "));
		assert!(!digest.verify(""));

		let secret = TokenSecret::new("abc");

		assert!(secret.matches("abc"));
		assert!(!secret.matches("abd"));
		assert!(!secret.matches("abcd"));
	}
}
