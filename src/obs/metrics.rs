// self
use crate::obs::{FlowKind, FlowOutcome};

#[cfg(feature = "metrics")]
const FLOW_TOTAL: &str = "uma_negotiator_flow_total";
#[cfg(feature = "metrics")]
const NEED_INFO_ROUNDS_TOTAL: &str = "uma_negotiator_need_info_rounds_total";
#[cfg(feature = "metrics")]
const DPOP_NONCE_RETRIES_TOTAL: &str = "uma_negotiator_dpop_nonce_retries_total";

/// Records a flow outcome via the global metrics recorder (when enabled).
pub fn record_flow_outcome(kind: FlowKind, outcome: FlowOutcome) {
	#[cfg(feature = "metrics")]
	metrics::counter!(FLOW_TOTAL, "flow" => kind.as_str(), "outcome" => outcome.as_str())
		.increment(1);

	#[cfg(not(feature = "metrics"))]
	let _ = (kind, outcome);
}

/// Counts one resolved `need_info` challenge.
pub fn record_need_info_round() {
	#[cfg(feature = "metrics")]
	metrics::counter!(NEED_INFO_ROUNDS_TOTAL).increment(1);
}

/// Counts one token request resent with a server-issued DPoP nonce, labeled by algorithm.
pub fn record_dpop_nonce_retry(algorithm: &str) {
	#[cfg(feature = "metrics")]
	metrics::counter!(DPOP_NONCE_RETRIES_TOTAL, "algorithm" => algorithm.to_owned()).increment(1);

	#[cfg(not(feature = "metrics"))]
	let _ = algorithm;
}
