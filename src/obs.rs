//! Optional observability helpers for discovery and negotiation.
//!
//! # Feature Flags
//!
//! - Enable `tracing` to emit structured spans named `uma_negotiator.flow` with the `flow`
//!   (discovery or negotiation) and `stage` (call site) fields, plus `debug` events for
//!   `need_info` rounds, DPoP nonce resends, and terminal failures.
//! - Enable `metrics` to increment the `uma_negotiator_flow_total` counter for every
//!   attempt/success/failure, labeled by `flow` + `outcome`. Resolved `need_info` rounds feed
//!   `uma_negotiator_need_info_rounds_total` and nonce resends feed
//!   `uma_negotiator_dpop_nonce_retries_total`.

mod metrics;
mod tracing;

pub use metrics::*;
pub use tracing::*;

// self
use crate::_prelude::*;

/// Operations observed by the client.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FlowKind {
	/// Authorization server metadata discovery.
	Discovery,
	/// Ticket exchange, including every `need_info` round.
	Negotiation,
}
impl FlowKind {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			FlowKind::Discovery => "discovery",
			FlowKind::Negotiation => "negotiation",
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
	/// Entry to a client operation.
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
