//! Negotiation error taxonomy shared across discovery, the ticket exchange, and DPoP signing.

// self
use crate::{_prelude::*, codec::CodecError, dpop::DpopError};

/// Crate-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

pub(crate) type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical negotiation error exposed by public APIs.
///
/// Every variant is terminal for the negotiation that produced it; the crate never retries on
/// the caller's behalf. Callers that want another attempt must restart with a fresh ticket.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Local configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// DPoP proof construction failed.
	#[error(transparent)]
	Dpop(#[from] DpopError),
	/// Unclassified server error or transport failure during the ticket exchange.
	#[error(transparent)]
	Negotiation(#[from] NegotiationError),

	/// Ticket is expired, already used, or unknown to the authorization server.
	#[error("Authorization server rejected the ticket: {}.", describe(.description))]
	InvalidGrant {
		/// HTTP status code, when available.
		status: Option<u16>,
		/// Server-supplied `error_description`, verbatim.
		description: Option<String>,
	},
	/// Requested scopes cannot be granted for the ticket.
	#[error("Authorization server refused the requested scopes: {}.", describe(.description))]
	InvalidScope {
		/// HTTP status code, when available.
		status: Option<u16>,
		/// Server-supplied `error_description`, verbatim.
		description: Option<String>,
	},
	/// A `need_info` challenge could not be satisfied or the server denied the request.
	#[error("Token request was denied: {}.", describe(.description))]
	RequestDenied {
		/// HTTP status code, when available.
		status: Option<u16>,
		/// Server- or resolver-supplied reason.
		description: Option<String>,
	},
	/// The `need_info` round budget was spent before a token was issued.
	#[error("Negotiation exceeded the limit of {max_depth} need_info rounds.")]
	NegotiationExhausted {
		/// Round budget the negotiation started with.
		max_depth: u32,
		/// HTTP status code of the final challenge.
		status: Option<u16>,
		/// Server-supplied `error_description` of the final challenge.
		description: Option<String>,
	},
	/// Discovery endpoint answered with a non-success status or could not be reached.
	#[error("Authorization server metadata at {uri} is unavailable.")]
	MetadataUnavailable {
		/// Discovery document URL.
		uri: Url,
		/// HTTP status code, when available.
		status: Option<u16>,
		/// Transport failure, when the endpoint could not be reached.
		#[source]
		source: Option<BoxError>,
	},
	/// Discovery document is not valid UMA server metadata.
	#[error("Authorization server metadata at {uri} is malformed: {reason}.")]
	MetadataMalformed {
		/// Discovery document URL.
		uri: Url,
		/// HTTP status code, when available.
		status: Option<u16>,
		/// What made the document unusable.
		reason: String,
		/// Structured parsing failure, when the body did not decode.
		#[source]
		source: Option<CodecError>,
	},
}
impl Error {
	/// HTTP status code carried by the failure, when one was observed.
	pub fn status(&self) -> Option<u16> {
		match self {
			Self::Config(_) | Self::Dpop(_) => None,
			Self::Negotiation(e) => e.status(),
			Self::InvalidGrant { status, .. }
			| Self::InvalidScope { status, .. }
			| Self::RequestDenied { status, .. }
			| Self::NegotiationExhausted { status, .. }
			| Self::MetadataUnavailable { status, .. }
			| Self::MetadataMalformed { status, .. } => *status,
		}
	}

	/// Server-supplied description carried by the failure, when one was observed.
	pub fn description(&self) -> Option<&str> {
		match self {
			Self::Negotiation(e) => e.description(),
			Self::InvalidGrant { description, .. }
			| Self::InvalidScope { description, .. }
			| Self::RequestDenied { description, .. }
			| Self::NegotiationExhausted { description, .. } => description.as_deref(),
			_ => None,
		}
	}
}

/// Configuration and validation failures raised before any negotiation traffic.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
	/// HTTP request construction failed.
	#[error(transparent)]
	HttpRequest(#[from] oauth2::http::Error),
	/// Authorization server URI cannot carry a discovery path.
	#[error("Authorization server URI `{uri}` cannot be used as a base URL.")]
	InvalidServerUri {
		/// Offending URI.
		uri: String,
	},
	/// Authorization server does not advertise the UMA ticket grant.
	#[error("Authorization server `{issuer}` does not enable the {grant} grant.")]
	UnsupportedGrant {
		/// Issuer identifier from the server metadata.
		issuer: String,
		/// Missing grant identifier.
		grant: &'static str,
	},
	/// Reject scope delimiters that are control characters.
	#[error("Scope delimiter must be a printable character.")]
	InvalidScopeDelimiter {
		/// Invalid delimiter that was supplied.
		delimiter: char,
	},
	/// DPoP algorithm preference list contains an empty entry.
	#[error("DPoP algorithm names cannot be empty.")]
	EmptyDpopAlgorithm,
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for ConfigError {
	fn from(e: ReqwestError) -> Self {
		Self::http_client_build(e)
	}
}

/// Catch-all negotiation failures: unclassified server errors and transport problems.
#[derive(Debug, ThisError)]
pub enum NegotiationError {
	/// Token endpoint returned an OAuth error code outside the UMA taxonomy.
	#[error("Token endpoint returned the `{code}` error: {}.", describe(.description))]
	Server {
		/// Raw `error` value (or the `undefined`/`Unexpected` sentinel).
		code: String,
		/// Server-supplied `error_description`, verbatim.
		description: Option<String>,
		/// HTTP status code, when available.
		status: Option<u16>,
	},
	/// Token endpoint answered with a status that is neither success nor a client error.
	#[error("Token endpoint returned unexpected HTTP status {status}.")]
	UnexpectedStatus {
		/// HTTP status code.
		status: u16,
		/// Server-supplied `error_description`, when the body carried one.
		description: Option<String>,
	},
	/// Successful token response could not be decoded.
	#[error("Token endpoint returned a malformed token response.")]
	TokenResponseParse {
		/// Structured parsing failure.
		#[source]
		source: CodecError,
		/// HTTP status code, when available.
		status: Option<u16>,
	},
	/// Successful token response decoded but violates the token response contract.
	#[error("Token endpoint returned an invalid token response: {reason}.")]
	InvalidTokenResponse {
		/// Violated expectation.
		reason: String,
		/// HTTP status code, when available.
		status: Option<u16>,
	},
	/// Transport failed (network, timeout, I/O).
	#[error("Transport failed while calling the token endpoint.")]
	Transport {
		/// Mapped transport failure.
		#[source]
		source: TransportError,
		/// HTTP status code, when the failure happened after the status line was read.
		status: Option<u16>,
		/// Retry-After hint from upstream, if supplied.
		retry_after: Option<Duration>,
	},
}
impl NegotiationError {
	/// HTTP status code carried by the failure, when one was observed.
	pub fn status(&self) -> Option<u16> {
		match self {
			Self::UnexpectedStatus { status, .. } => Some(*status),
			Self::Server { status, .. }
			| Self::TokenResponseParse { status, .. }
			| Self::InvalidTokenResponse { status, .. }
			| Self::Transport { status, .. } => *status,
		}
	}

	/// Server-supplied description, when the body carried one.
	pub fn description(&self) -> Option<&str> {
		match self {
			Self::Server { description, .. } | Self::UnexpectedStatus { description, .. } =>
				description.as_deref(),
			_ => None,
		}
	}

	/// Returns true when the underlying transport reported a timeout.
	pub fn is_timeout(&self) -> bool {
		matches!(self, Self::Transport { source: TransportError::Timeout { .. }, .. })
	}
}

/// Transport-level failures (network, IO).
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while calling the authorization server.")]
	Network {
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// Underlying HTTP client gave up waiting for the authorization server.
	#[error("Request to the authorization server timed out.")]
	Timeout {
		/// Transport-specific timeout error.
		#[source]
		source: BoxError,
	},
	/// Outbound request could not be converted for the transport.
	#[error(transparent)]
	Request(#[from] oauth2::http::Error),
	/// Underlying IO failure surfaced during transport.
	#[error("I/O error occurred while calling the authorization server.")]
	Io(#[from] std::io::Error),
	/// Transport reported a failure it could only describe as text.
	#[error("HTTP client error occurred while calling the authorization server: {message}.")]
	Other {
		/// Transport-supplied message.
		message: String,
	},
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Network { source: Box::new(src) }
	}

	/// Wraps a transport-specific timeout error.
	pub fn timeout(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Timeout { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for TransportError {
	fn from(e: ReqwestError) -> Self {
		if e.is_timeout() { Self::timeout(e) } else { Self::network(e) }
	}
}

fn describe(description: &Option<String>) -> &str {
	description.as_deref().unwrap_or("no description provided")
}
