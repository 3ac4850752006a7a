//! Defensive parsing of token endpoint failures.
//!
//! Authorization servers are not always careful about their error bodies. Both parsers here
//! accept anything: [`ErrorResponse::parse`] always yields a value and [`NeedInfo::parse`] yields
//! `None` instead of failing.

// self
use crate::{_prelude::*, codec::JsonCodec};

/// Error code used when a JSON error body carries no `error` member.
pub const UNDEFINED_ERROR: &str = "undefined";
/// Error code used when an error body is not a JSON error object.
pub const UNEXPECTED_ERROR: &str = "Unexpected";

/// Closed classification of token endpoint error codes.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum ErrorCode {
	/// `invalid_grant`: the ticket is expired, used, or unknown.
	InvalidGrant,
	/// `invalid_scope`: requested scopes cannot be granted.
	InvalidScope,
	/// `need_info`: more claims are required.
	NeedInfo,
	/// `request_denied`: the server refuses to issue a token.
	RequestDenied,
	/// `use_dpop_nonce`: the DPoP proof must carry the server's nonce.
	UseDpopNonce,
	/// Any other code, including the `undefined`/`Unexpected` sentinels.
	Other(String),
}
impl ErrorCode {
	/// Wire representation of the code.
	pub fn as_str(&self) -> &str {
		match self {
			Self::InvalidGrant => "invalid_grant",
			Self::InvalidScope => "invalid_scope",
			Self::NeedInfo => "need_info",
			Self::RequestDenied => "request_denied",
			Self::UseDpopNonce => "use_dpop_nonce",
			Self::Other(code) => code,
		}
	}
}
impl From<&str> for ErrorCode {
	fn from(code: &str) -> Self {
		match code {
			"invalid_grant" => Self::InvalidGrant,
			"invalid_scope" => Self::InvalidScope,
			"need_info" => Self::NeedInfo,
			"request_denied" => Self::RequestDenied,
			"use_dpop_nonce" => Self::UseDpopNonce,
			other => Self::Other(other.into()),
		}
	}
}
impl Display for ErrorCode {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// OAuth error body: `{"error": …, "error_description": …}`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ErrorResponse {
	/// Raw error code or one of the sentinels.
	pub error: String,
	/// Human-readable description.
	pub description: Option<String>,
}
impl ErrorResponse {
	/// Parses an error body. Never fails.
	///
	/// - JSON objects without `error` produce `{error: "undefined", description: None}`.
	/// - Anything else that does not decode produces `{error: "Unexpected", description: Some(_)}`
	///   where the description explains the decode failure.
	/// - Unknown members are ignored.
	pub fn parse<J>(codec: &J, body: &[u8]) -> Self
	where
		J: ?Sized + JsonCodec,
	{
		match codec.from_json::<ErrorResponseWire>(body) {
			Ok(ErrorResponseWire { error: Some(error), error_description }) =>
				Self { error, description: error_description },
			Ok(ErrorResponseWire { error: None, .. }) =>
				Self { error: UNDEFINED_ERROR.into(), description: None },
			Err(e) => Self {
				error: UNEXPECTED_ERROR.into(),
				description: Some(format!("Unable to parse the error response: {e}")),
			},
		}
	}

	/// Classified error code.
	pub fn code(&self) -> ErrorCode {
		ErrorCode::from(self.error.as_str())
	}
}

#[derive(Deserialize)]
struct ErrorResponseWire {
	error: Option<String>,
	error_description: Option<String>,
}

/// One entry of a `need_info` challenge's `required_claims` list.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RequiredClaim {
	/// Claim token formats the server accepts for this claim.
	pub claim_token_format: Vec<String>,
	/// Expected claim type.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub claim_type: Option<String>,
	/// Display name.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub friendly_name: Option<String>,
	/// Expected claim issuer.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub issuer: Option<String>,
	/// Claim name.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub name: Option<String>,
}

/// Server request for more claims, handed to the claim resolver.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NeedInfo {
	/// Replacement ticket for the follow-up request.
	pub ticket: String,
	/// Claims the server still needs.
	pub required_claims: Vec<RequiredClaim>,
	/// Claims interaction endpoint the requesting party can be sent to.
	pub redirect_user: Option<Url>,
	/// HTTP status of the challenge.
	pub status: Option<u16>,
}
impl NeedInfo {
	/// Parses a `need_info` body.
	///
	/// Returns `None` when the body does not decode or carries no replacement ticket. An
	/// unparsable `redirect_user` is dropped rather than rejected.
	pub fn parse<J>(codec: &J, body: &[u8], status: Option<u16>) -> Option<Self>
	where
		J: ?Sized + JsonCodec,
	{
		let wire = codec.from_json::<NeedInfoWire>(body).ok()?;
		let ticket = wire.ticket.filter(|ticket| !ticket.is_empty())?;

		Some(Self {
			ticket,
			required_claims: wire.required_claims,
			redirect_user: wire.redirect_user.and_then(|raw| Url::parse(&raw).ok()),
			status,
		})
	}

	/// Union of every claim token format the server asked for.
	pub fn claim_token_formats(&self) -> BTreeSet<&str> {
		self.required_claims
			.iter()
			.flat_map(|claim| claim.claim_token_format.iter().map(String::as_str))
			.collect()
	}

	/// Returns true when `format` appears in any required claim.
	pub fn accepts_format(&self, format: &str) -> bool {
		self.required_claims
			.iter()
			.any(|claim| claim.claim_token_format.iter().any(|accepted| accepted == format))
	}
}

#[derive(Deserialize)]
struct NeedInfoWire {
	#[serde(default)]
	ticket: Option<String>,
	#[serde(default)]
	required_claims: Vec<RequiredClaim>,
	#[serde(default)]
	redirect_user: Option<String>,
}
