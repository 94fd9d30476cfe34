//! Strongly typed identifiers enforced across the relay domain.

// std
use std::ops::Deref;
// self
use crate::{_prelude::*, auth::secret};

macro_rules! def_id {
	($name:ident, $doc:literal, $kind:literal) => {
		#[doc = $doc]
		#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
		#[serde(try_from = "String", into = "String")]
		pub struct $name(String);
		impl $name {
			/// Creates a new identifier after validation.
			pub fn new(value: impl AsRef<str>) -> Result<Self, IdentifierError> {
				let view = value.as_ref();

				validate_view($kind, view)?;

				Ok(Self(view.to_owned()))
			}
		}
		impl Deref for $name {
			type Target = str;

			fn deref(&self) -> &Self::Target {
				&self.0
			}
		}
		impl AsRef<str> for $name {
			fn as_ref(&self) -> &str {
				&self.0
			}
		}
		impl From<$name> for String {
			fn from(value: $name) -> Self {
				value.0
			}
		}
		impl TryFrom<String> for $name {
			type Error = IdentifierError;

			fn try_from(value: String) -> Result<Self, Self::Error> {
				validate_view($kind, &value)?;

				Ok(Self(value))
			}
		}
		impl Borrow<str> for $name {
			fn borrow(&self) -> &str {
				&self.0
			}
		}
		impl Debug for $name {
			fn fmt(&self, f: &mut Formatter) -> FmtResult {
				write!(f, concat!($kind, "({})"), self.0)
			}
		}
		impl Display for $name {
			fn fmt(&self, f: &mut Formatter) -> FmtResult {
				f.write_str(&self.0)
			}
		}
		impl FromStr for $name {
			type Err = IdentifierError;

			fn from_str(s: &str) -> Result<Self, Self::Err> {
				Self::new(s)
			}
		}
	};
	($name:ident, $doc:literal, $kind:literal, generated) => {
		def_id! { $name, $doc, $kind }
		impl $name {
			/// Mints a fresh random identifier (128 bits, base64url without padding).
			pub fn generate() -> Self {
				Self(secret::random_token(GENERATED_ID_BYTES))
			}
		}
	};
}

const IDENTIFIER_MAX_LEN: usize = 128;
const GENERATED_ID_BYTES: usize = 16;

/// Error returned when identifier validation fails.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, ThisError)]
pub enum IdentifierError {
	/// The identifier was empty or whitespace.
	#[error("{kind} identifier cannot be empty.")]
	Empty {
		/// Kind of identifier (client, session, provider).
		kind: &'static str,
	},
	/// The identifier contains whitespace characters.
	#[error("{kind} identifier contains whitespace.")]
	ContainsWhitespace {
		/// Kind of identifier (client, session, provider).
		kind: &'static str,
	},
	/// The identifier exceeded the allowed character count.
	#[error("{kind} identifier exceeds {max} characters.")]
	TooLong {
		/// Kind of identifier (client, session, provider).
		kind: &'static str,
		/// Maximum permitted character count.
		max: usize,
	},
}

def_id! { ClientId, "Identifier issued to a dynamically registered relying party.", "Client", generated }
def_id! { SessionId, "Identifier of a relay session bound to one relying-party client.", "Session", generated }
def_id! { ProviderId, "Identifier for an upstream provider descriptor.", "Provider" }

fn validate_view(kind: &'static str, view: &str) -> Result<(), IdentifierError> {
	if view.is_empty() {
		return Err(IdentifierError::Empty { kind });
	}
	if view.chars().any(char::is_whitespace) {
		return Err(IdentifierError::ContainsWhitespace { kind });
	}
	if view.len() > IDENTIFIER_MAX_LEN {
		return Err(IdentifierError::TooLong { kind, max: IDENTIFIER_MAX_LEN });
	}

	Ok(())
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn identifiers_reject_whitespace() {
		assert!(ClientId::new(" client-123").is_err(), "Leading whitespace must be rejected.");
		assert!(ClientId::new("client-123 ").is_err(), "Trailing whitespace must be rejected.");

		let client = ClientId::new("client-123").expect("Client fixture should be considered valid.");

		assert_eq!(client.as_ref(), "client-123");
		assert!(SessionId::new("").is_err());
		assert!(ProviderId::new("with space").is_err());
		assert!(ClientId::new("a".repeat(IDENTIFIER_MAX_LEN + 1)).is_err());
	}

	#[test]
	fn generated_identifiers_are_unique_and_valid() {
		let first = ClientId::generate();
		let second = ClientId::generate();

		assert_ne!(first, second);
		assert_eq!(first.len(), 22, "16 random bytes encode to 22 base64url characters.");
		ClientId::new(first.as_ref()).expect("Generated identifiers should pass validation.");
		assert_ne!(SessionId::generate(), SessionId::generate());
	}

	#[test]
	fn serde_round_trip_enforces_validation() {
		let session: SessionId =
			serde_json::from_str("\"session-42\"").expect("Session should deserialize.");

		assert_eq!(session.as_ref(), "session-42");
		assert!(serde_json::from_str::<SessionId>("\"with space\"").is_err());
	}

	#[test]
	fn borrow_supports_fast_lookup() {
		let map: HashMap<ClientId, u8> = HashMap::from_iter([(
			ClientId::new("client-123").expect("Client used for lookup should be valid."),
			7_u8,
		)]);

		assert_eq!(map.get("client-123"), Some(&7));
	}
}
