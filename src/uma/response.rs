//! Successful token responses.

// self
use crate::{
	_prelude::*,
	auth::{ScopeSet, TokenSecret},
	codec::JsonCodec,
	error::NegotiationError,
};

/// Access token issued at the end of a successful negotiation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TokenResponse {
	/// Requesting party token.
	pub access_token: TokenSecret,
	/// Token type, usually `Bearer` or `DPoP`.
	pub token_type: String,
	/// Lifetime reported by the server.
	pub expires_in: Option<Duration>,
	/// Granted scopes, when the server reported them.
	pub scope: Option<ScopeSet>,
	/// Refresh token, when issued.
	pub refresh_token: Option<TokenSecret>,
	/// Persisted claims token for later negotiations.
	pub pct: Option<TokenSecret>,
	/// True when the server upgraded the RPT presented with the request.
	pub upgraded: bool,
	/// Local receipt time of the response.
	pub issued_at: OffsetDateTime,
}
impl TokenResponse {
	/// Absolute expiry derived from `issued_at` and `expires_in`.
	///
	/// Returns `None` when no lifetime was reported or the sum is not representable.
	pub fn expires_at(&self) -> Option<OffsetDateTime> {
		self.expires_in.and_then(|lifetime| self.issued_at.checked_add(lifetime))
	}

	/// Decodes a 2xx token endpoint body.
	///
	/// The granted `scope` is split on `scope_delimiter` as well as on whitespace.
	pub(crate) fn parse<J>(
		codec: &J,
		body: &[u8],
		status: Option<u16>,
		issued_at: OffsetDateTime,
		scope_delimiter: char,
	) -> Result<Self, NegotiationError>
	where
		J: ?Sized + JsonCodec,
	{
		let wire: TokenResponseWire = codec
			.from_json(body)
			.map_err(|source| NegotiationError::TokenResponseParse { source, status })?;
		let invalid =
			|reason: &str| NegotiationError::InvalidTokenResponse { reason: reason.into(), status };
		let access_token = wire
			.access_token
			.filter(|token| !token.is_empty())
			.ok_or_else(|| invalid("missing access_token"))?;
		let token_type = wire
			.token_type
			.filter(|kind| !kind.is_empty())
			.ok_or_else(|| invalid("missing token_type"))?;
		let expires_in = match wire.expires_in {
			Some(secs) if secs < 0 => return Err(invalid("negative expires_in")),
			Some(secs) => {
				let lifetime = Duration::seconds(secs);

				if issued_at.checked_add(lifetime).is_none() {
					return Err(invalid("expires_in is out of range"));
				}

				Some(lifetime)
			},
			None => None,
		};
		let scope = wire
			.scope
			.map(|raw| ScopeSet::parse_delimited(&raw, scope_delimiter))
			.transpose()
			.map_err(|e| invalid(&e.to_string()))?;

		Ok(Self {
			access_token: access_token.into(),
			token_type,
			expires_in,
			scope,
			refresh_token: wire.refresh_token.map(Into::into),
			pct: wire.pct.map(Into::into),
			upgraded: wire.upgraded.unwrap_or(false),
			issued_at,
		})
	}
}

#[derive(Deserialize)]
struct TokenResponseWire {
	access_token: Option<String>,
	token_type: Option<String>,
	expires_in: Option<i64>,
	scope: Option<String>,
	refresh_token: Option<String>,
	pct: Option<String>,
	upgraded: Option<bool>,
}
