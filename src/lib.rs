//! Double-hop OAuth 2.0 relay: a PKCE-protected authorization server for downstream
//! relying parties that delegates identity and consent to an upstream provider, then
//! hands out broker-bound credentials resolvable to the upstream tokens.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod auth;
pub mod broker;
pub mod clock;
pub mod config;
pub mod error;
pub mod http;
pub mod metadata;
pub mod oauth;
pub mod obs;
pub mod provider;
#[cfg(feature = "axum")] pub mod server;
pub mod store;
pub mod sweep;

mod _prelude {
	pub use std::{
		borrow::Borrow,
		collections::{BTreeSet, HashMap},
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		hash::Hash,
		pin::Pin,
		str::FromStr,
		sync::Arc,
	};

	pub use parking_lot::Mutex;
	#[cfg(feature = "reqwest")]
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError};
	pub use serde::{Deserialize, Serialize};
	pub use thiserror::Error as ThisError;
	pub use time::{Duration, OffsetDateTime};
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

#[cfg(feature = "reqwest")] pub use reqwest;
pub use url;
#[cfg(test)] use {color_eyre as _, httpmock as _, tower as _};
