//! Claim tokens pushed to the authorization server to satisfy `need_info` challenges.

// self
use crate::{_prelude::*, auth::TokenSecret};

/// Claim token format for OpenID Connect ID tokens.
pub const ID_TOKEN_FORMAT: &str = "http://openid.net/specs/openid-connect-core-1_0.html#IDToken";
/// Claim token format for W3C verifiable presentations (JSON-LD).
pub const VERIFIABLE_PRESENTATION_FORMAT: &str = "https://www.w3.org/TR/vc-data-model/#json-ld";

/// Typed claim: an opaque value plus the format URI telling the server how to read it.
///
/// Two claim tokens are equal when both the value and the format match. The format is kept as
/// the exact string the server advertised so it round-trips into `claim_token_format` unchanged.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct ClaimToken {
	value: TokenSecret,
	format: String,
}
impl ClaimToken {
	/// Creates a claim token from a value and its format URI.
	pub fn of(value: impl Into<TokenSecret>, format: impl Into<String>) -> Self {
		Self { value: value.into(), format: format.into() }
	}

	/// Creates a claim token carrying an OpenID Connect ID token.
	pub fn id_token(value: impl Into<TokenSecret>) -> Self {
		Self::of(value, ID_TOKEN_FORMAT)
	}

	/// Creates a claim token carrying a verifiable presentation.
	pub fn verifiable_presentation(value: impl Into<TokenSecret>) -> Self {
		Self::of(value, VERIFIABLE_PRESENTATION_FORMAT)
	}

	/// Claim value; callers must avoid logging it.
	pub fn value(&self) -> &TokenSecret {
		&self.value
	}

	/// Claim token format URI.
	pub fn format(&self) -> &str {
		&self.format
	}
}
impl Debug for ClaimToken {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("ClaimToken")
			.field("value", &self.value)
			.field("format", &self.format)
			.finish()
	}
}
