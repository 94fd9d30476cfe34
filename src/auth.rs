//! Auth-domain identifiers, secrets, PKCE helpers, scope sets, and store records.

pub mod id;
pub mod pkce;
pub mod record;
pub mod scope;
pub mod secret;

pub use id::*;
pub use pkce::*;
pub use record::*;
pub use scope::*;
pub use secret::*;
