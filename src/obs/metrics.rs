// self
use crate::obs::{FlowKind, FlowOutcome};

/// Records a flow outcome via the global metrics recorder (when enabled).
pub fn record_flow_outcome(kind: FlowKind, outcome: FlowOutcome) {
	#[cfg(feature = "metrics")]
	{
		metrics::counter!(
			"oauth2_relay_flow_total",
			"flow" => kind.as_str(),
			"outcome" => outcome.as_str()
		)
		.increment(1);
	}

	#[cfg(not(feature = "metrics"))]
	{
		let _ = (kind, outcome);
	}
}

/// Records how many expired entries a sweep removed from `store`.
pub fn record_swept(store: &'static str, removed: usize) {
	#[cfg(feature = "metrics")]
	{
		metrics::counter!("oauth2_relay_swept_total", "store" => store).increment(removed as u64);
	}

	#[cfg(not(feature = "metrics"))]
	{
		let _ = (store, removed);
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn recorders_noop_without_metrics() {
		record_flow_outcome(FlowKind::Token, FlowOutcome::Failure);
		record_swept("codes", 3);
	}
}
