// self
use crate::{_prelude::*, obs::FlowKind};

/// Type alias that resolves to an instrumented future when tracing is enabled.
#[cfg(feature = "tracing")]
pub type InstrumentedFlow<F> = tracing::instrument::Instrumented<F>;
/// Passthrough future type when tracing is disabled.
#[cfg(not(feature = "tracing"))]
pub type InstrumentedFlow<F> = F;

/// Span wrapping one discovery or negotiation call.
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
			let span = tracing::info_span!("uma_negotiator.flow", flow = kind.as_str(), stage);

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

/// Emits a `debug` event for a `need_info` challenge about to reach the claim resolver.
pub fn trace_need_info_round(remaining_depth: u32, required_claims: usize) {
	#[cfg(feature = "tracing")]
	tracing::debug!(remaining_depth, required_claims, "resolving need_info challenge");
	#[cfg(not(feature = "tracing"))]
	let _ = (remaining_depth, required_claims);
}

/// Emits a `debug` event when a token request is resent with a server-issued DPoP nonce.
pub fn trace_dpop_nonce_retry(algorithm: &str) {
	#[cfg(feature = "tracing")]
	tracing::debug!(algorithm, "resending token request with DPoP nonce");
	#[cfg(not(feature = "tracing"))]
	let _ = algorithm;
}

/// Emits a `debug` event describing a failure returned to the caller.
pub fn trace_failure(kind: FlowKind, error: &Error) {
	#[cfg(feature = "tracing")]
	tracing::debug!(flow = kind.as_str(), status = error.status(), %error, "flow failed");
	#[cfg(not(feature = "tracing"))]
	let _ = (kind, error);
}
