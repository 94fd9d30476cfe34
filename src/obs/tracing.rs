// self
use crate::{_prelude::*, obs::FlowKind};

/// Type alias that resolves to an instrumented future when tracing is enabled.
#[cfg(feature = "tracing")]
pub type InstrumentedFlow<F> = tracing::instrument::Instrumented<F>;
/// Passthrough future type when tracing is disabled.
#[cfg(not(feature = "tracing"))]
pub type InstrumentedFlow<F> = F;

/// A span builder used by relay flows.
#[derive(Clone, Debug)]
pub struct FlowSpan {
	#[cfg(feature = "tracing")]
	span: tracing::Span,
}
impl FlowSpan {
	/// Creates a new span tagged with the provided flow kind + stage.
	pub fn new(kind: FlowKind, stage: &'static str) -> Self {
		#[cfg(feature = "tracing")]
		{
			let span = tracing::info_span!("oauth2_relay.flow", flow = kind.as_str(), stage);

			Self { span }
		}
		#[cfg(not(feature = "tracing"))]
		{
			let _ = (kind, stage);

			Self {}
		}
	}

	/// Instruments an async block without holding a guard across `.await` points.
	pub fn instrument<Fut>(&self, fut: Fut) -> InstrumentedFlow<Fut>
	where
		Fut: Future,
	{
		#[cfg(feature = "tracing")]
		{
			use tracing::Instrument;

			fut.instrument(self.span.clone())
		}
		#[cfg(not(feature = "tracing"))]
		{
			fut
		}
	}
}

/// Emits a `warn` event for a rejected request.
///
/// `reason` is a static label; callers never pass secrets or raw tokens.
pub fn record_rejection(kind: FlowKind, reason: &'static str, error: &Error) {
	#[cfg(feature = "tracing")]
	{
		tracing::warn!(
			flow = kind.as_str(),
			reason,
			error = error.oauth_code().as_str(),
			"relay request rejected"
		);
	}
	#[cfg(not(feature = "tracing"))]
	{
		let _ = (kind, reason, error);
	}
}

/// Emits a `debug` event describing one sweep pass.
pub fn record_sweep(clients: usize, challenges: usize, sessions: usize, codes: usize) {
	#[cfg(feature = "tracing")]
	{
		tracing::debug!(clients, challenges, sessions, codes, "expired relay state swept");
	}
	#[cfg(not(feature = "tracing"))]
	{
		let _ = (clients, challenges, sessions, codes);
	}
}

/// Emits a `warn` event for a sweep pass that failed.
pub fn record_sweep_failure(error: &Error) {
	#[cfg(feature = "tracing")]
	{
		tracing::warn!(error = %error, "relay sweep failed");
	}
	#[cfg(not(feature = "tracing"))]
	{
		let _ = error;
	}
}
