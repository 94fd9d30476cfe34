//! PKCE (RFC 7636) helpers for both legs of the relay.
//!
//! Relying parties must present `S256` challenges; the relay also runs its own `S256` leg
//! against the upstream provider using [`PkcePair`].

// crates.io
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use rand::{Rng, distr::Alphanumeric};
use sha2::{Digest, Sha256};
// self
use crate::{_prelude::*, auth::secret};

const CHALLENGE_MIN_LEN: usize = 43;
const CHALLENGE_MAX_LEN: usize = 128;
const VERIFIER_LEN: usize = 64;

/// Code challenge transformation accepted by the relay.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PkceMethod {
	/// `BASE64URL(SHA256(verifier))`.
	#[serde(rename = "S256")]
	S256,
}
impl PkceMethod {
	/// Wire name of the method.
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::S256 => "S256",
		}
	}
}
impl Display for PkceMethod {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
impl FromStr for PkceMethod {
	type Err = Error;

	fn from_str(s: &str) -> Result<Self> {
		match s {
			"S256" => Ok(Self::S256),
			other => Err(Error::UnsupportedCodeChallengeMethod { method: other.to_owned() }),
		}
	}
}

/// Computes the `S256` challenge for a verifier.
pub fn s256_challenge(verifier: &str) -> String {
	URL_SAFE_NO_PAD.encode(Sha256::digest(verifier.as_bytes()))
}

/// Checks a verifier against a stored `S256` challenge in constant time.
pub fn verify_s256(verifier: &str, challenge: &str) -> bool {
	secret::constant_time_eq(&s256_challenge(verifier), challenge)
}

/// Validates the shape of a relying party's `code_challenge`.
pub fn validate_challenge(challenge: &str) -> Result<()> {
	if !(CHALLENGE_MIN_LEN..=CHALLENGE_MAX_LEN).contains(&challenge.len()) {
		return Err(Error::invalid_request(format!(
			"code_challenge must be between {CHALLENGE_MIN_LEN} and {CHALLENGE_MAX_LEN} characters."
		)));
	}
	if !challenge.bytes().all(is_unreserved) {
		return Err(Error::invalid_request("code_challenge contains characters outside [A-Za-z0-9-._~]."));
	}

	Ok(())
}

fn is_unreserved(b: u8) -> bool {
	b.is_ascii_alphanumeric() || matches!(b, b'-' | b'.' | b'_' | b'~')
}

/// Verifier/challenge pair for the relay's own upstream PKCE leg.
#[derive(Clone, PartialEq, Eq)]
pub struct PkcePair {
	verifier: String,
	challenge: String,
}
impl PkcePair {
	/// Generates a fresh random pair.
	pub fn generate() -> Self {
		let verifier = rand::rng()
			.sample_iter(&Alphanumeric)
			.take(VERIFIER_LEN)
			.map(char::from)
			.collect::<String>();
		let challenge = s256_challenge(&verifier);

		Self { verifier, challenge }
	}

	/// Secret verifier, sent only to the upstream token endpoint.
	pub fn verifier(&self) -> &str {
		&self.verifier
	}

	/// Public challenge, sent on the upstream authorization redirect.
	pub fn challenge(&self) -> &str {
		&self.challenge
	}

	/// Splits the pair into `(verifier, challenge)`.
	pub fn into_parts(self) -> (String, String) {
		(self.verifier, self.challenge)
	}
}
impl Debug for PkcePair {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("PkcePair")
			.field("verifier", &"<redacted>")
			.field("challenge", &self.challenge)
			.finish()
	}
}
