//! Observability helpers for relay flows.
//!
//! # Feature Flags
//!
//! - `tracing` (default) emits spans named `oauth2_relay.flow` with `flow` and `stage` fields,
//!   `warn` events for rejected requests, and `debug` events for sweeps.
//! - `metrics` increments `oauth2_relay_flow_total` (labeled by `flow` + `outcome`) and
//!   `oauth2_relay_swept_total` (labeled by `store`).

mod metrics;
mod tracing;

pub use metrics::*;
pub use tracing::*;

// self
use crate::_prelude::*;

/// Relay operations observed by the instrumentation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FlowKind {
	/// Dynamic client registration.
	Register,
	/// Relying-party authorization request.
	Authorize,
	/// Upstream redirect back to the relay.
	Callback,
	/// Token endpoint exchange.
	Token,
	/// Bearer credential resolution.
	Resolve,
	/// Expired-state sweep.
	Sweep,
}
impl FlowKind {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			FlowKind::Register => "register",
			FlowKind::Authorize => "authorize",
			FlowKind::Callback => "callback",
			FlowKind::Token => "token",
			FlowKind::Resolve => "resolve",
			FlowKind::Sweep => "sweep",
		}
	}
}
impl Display for FlowKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Outcome labels recorded for each attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FlowOutcome {
	/// Entry to a relay operation.
	Attempt,
	/// Successful completion.
	Success,
	/// Failure propagated back to the caller.
	Failure,
}
impl FlowOutcome {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			FlowOutcome::Attempt => "attempt",
			FlowOutcome::Success => "success",
			FlowOutcome::Failure => "failure",
		}
	}
}
impl Display for FlowOutcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
