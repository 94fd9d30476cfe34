//! Upstream provider descriptors.
//!
//! `descriptor` exposes validated metadata (`ProviderDescriptor`) covering the upstream
//! authorization and token endpoints, client authentication preference, and provider quirks
//! (upstream PKCE, scope delimiter, extra authorization parameters).

pub mod descriptor;

pub use descriptor::*;
