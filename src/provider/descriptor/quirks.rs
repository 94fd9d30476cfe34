// self
use crate::_prelude::*;

/// Provider-specific quirks that influence how the relay talks to the upstream provider.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderQuirks {
	/// Whether the relay runs its own S256 PKCE leg against the provider.
	pub pkce: bool,
	/// Character used to join scopes when constructing `scope` parameters.
	pub scope_delimiter: char,
	/// Extra query parameters appended to the upstream authorization URL
	/// (for example `access_type=offline`).
	pub authorization_params: Vec<(String, String)>,
}
impl Default for ProviderQuirks {
	fn default() -> Self {
		Self { pkce: true, scope_delimiter: ' ', authorization_params: Vec::new() }
	}
}
