//! Thread-safe in-memory store implementations built on [`ClockedStore`].
//!
//! State is process-local and lost on restart; a multi-instance deployment needs external
//! implementations of the store traits.

mod challenge;
mod code;
mod registry;
mod session;

pub use challenge::MemoryPkceChallengeStore;
pub use code::MemoryAuthorizationCodeStore;
pub use registry::{MemoryClientRegistry, RegistrationDefaults};
pub use session::MemorySessionStore;

// self
use crate::{_prelude::*, store::ClockedStore};

/// Mints a key with `generate`, builds the value for it, and inserts it into a vacant slot.
///
/// Random keys make collisions practically impossible; the loop only guarantees uniqueness.
fn mint<K, V>(
	store: &ClockedStore<K, V>,
	ttl: Duration,
	mut generate: impl FnMut() -> K,
	mut build: impl FnMut(&K) -> V,
) -> (K, V)
where
	K: Clone + Eq + Hash,
	V: Clone,
{
	loop {
		let key = generate();
		let value = build(&key);

		if store.insert_vacant(key.clone(), value.clone(), ttl).is_ok() {
			return (key, value);
		}
	}
}
