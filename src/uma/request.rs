//! Token requests presented under the UMA ticket grant.

// crates.io
use url::form_urlencoded::Serializer as FormSerializer;
// self
use crate::{
	_prelude::*,
	auth::{ClaimToken, ScopeSet, TokenSecret},
	uma::UMA_TICKET_GRANT,
};

/// One attempt at exchanging a permission ticket.
///
/// Requests are immutable once built; each `need_info` round produces a fresh request through
/// [`TokenRequest::next_round`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TokenRequest {
	ticket: String,
	claim_token: Option<ClaimToken>,
	pop: Option<TokenSecret>,
	code_verifier: Option<TokenSecret>,
	scope: ScopeSet,
	pct: Option<TokenSecret>,
	rpt: Option<TokenSecret>,
}
impl TokenRequest {
	/// Starts a request for `ticket`.
	pub fn new(ticket: impl Into<String>) -> Self {
		Self {
			ticket: ticket.into(),
			claim_token: None,
			pop: None,
			code_verifier: None,
			scope: ScopeSet::default(),
			pct: None,
			rpt: None,
		}
	}

	/// Pushes a claim token with the request.
	pub fn with_claim_token(mut self, claim_token: ClaimToken) -> Self {
		self.claim_token = Some(claim_token);

		self
	}

	/// Attaches a caller-supplied proof-of-possession token (sent as the `pop` parameter).
	pub fn with_pop(mut self, pop: impl Into<TokenSecret>) -> Self {
		self.pop = Some(pop.into());

		self
	}

	/// Attaches a PKCE code verifier.
	pub fn with_code_verifier(mut self, verifier: impl Into<TokenSecret>) -> Self {
		self.code_verifier = Some(verifier.into());

		self
	}

	/// Requests a specific scope set.
	pub fn with_scope(mut self, scope: ScopeSet) -> Self {
		self.scope = scope;

		self
	}

	/// Attaches a persisted claims token from an earlier negotiation.
	pub fn with_pct(mut self, pct: impl Into<TokenSecret>) -> Self {
		self.pct = Some(pct.into());

		self
	}

	/// Attaches an existing RPT so the server can upgrade it.
	pub fn with_rpt(mut self, rpt: impl Into<TokenSecret>) -> Self {
		self.rpt = Some(rpt.into());

		self
	}

	/// Permission ticket.
	pub fn ticket(&self) -> &str {
		&self.ticket
	}

	/// Claim token pushed with the request.
	pub fn claim_token(&self) -> Option<&ClaimToken> {
		self.claim_token.as_ref()
	}

	/// Caller-supplied proof-of-possession token.
	pub fn pop(&self) -> Option<&TokenSecret> {
		self.pop.as_ref()
	}

	/// PKCE code verifier.
	pub fn code_verifier(&self) -> Option<&TokenSecret> {
		self.code_verifier.as_ref()
	}

	/// Requested scopes; empty means "let the server decide".
	pub fn scope(&self) -> &ScopeSet {
		&self.scope
	}

	/// Persisted claims token.
	pub fn pct(&self) -> Option<&TokenSecret> {
		self.pct.as_ref()
	}

	/// Requesting party token to upgrade.
	pub fn rpt(&self) -> Option<&TokenSecret> {
		self.rpt.as_ref()
	}

	/// Builds the follow-up request for a resolved `need_info` challenge.
	///
	/// The replacement ticket and the resolved claim token take over; every other parameter is
	/// carried forward.
	pub fn next_round(&self, ticket: impl Into<String>, claim_token: ClaimToken) -> Self {
		Self { ticket: ticket.into(), claim_token: Some(claim_token), ..self.clone() }
	}

	/// Encodes the request as `application/x-www-form-urlencoded` pairs.
	///
	/// `extra` carries client authentication parameters and is appended after the grant fields.
	pub(crate) fn form_body(&self, scope_delimiter: char, extra: &[(&str, &str)]) -> String {
		let mut form = FormSerializer::new(String::new());

		form.append_pair("grant_type", UMA_TICKET_GRANT);
		form.append_pair("ticket", &self.ticket);

		if let Some(claim) = &self.claim_token {
			form.append_pair("claim_token", claim.value().expose());
			form.append_pair("claim_token_format", claim.format());
		}
		if let Some(pop) = &self.pop {
			form.append_pair("pop", pop.expose());
		}
		if let Some(verifier) = &self.code_verifier {
			form.append_pair("code_verifier", verifier.expose());
		}
		if let Some(pct) = &self.pct {
			form.append_pair("pct", pct.expose());
		}
		if let Some(rpt) = &self.rpt {
			form.append_pair("rpt", rpt.expose());
		}
		if let Some(scope) = self.scope.delimited(scope_delimiter) {
			form.append_pair("scope", &scope);
		}

		form.extend_pairs(extra);

		form.finish()
	}
}

#[cfg(test)]
mod tests {
	// crates.io
	use url::form_urlencoded;
	// self
	use super::*;

	fn decode(body: &str) -> BTreeMap<String, String> {
		form_urlencoded::parse(body.as_bytes()).into_owned().collect()
	}

	#[test]
	fn minimal_request_sends_grant_and_ticket_only() {
		let form = decode(&TokenRequest::new("ticket-12345").form_body(' ', &[]));

		assert_eq!(form.len(), 2);
		assert_eq!(form["grant_type"], UMA_TICKET_GRANT);
		assert_eq!(form["ticket"], "ticket-12345");
	}

	#[test]
	fn optional_parameters_are_encoded() {
		let scope = ScopeSet::new(["write", "read"]).expect("Scopes should be valid.");
		let request = TokenRequest::new("t")
			.with_claim_token(ClaimToken::id_token("id token"))
			.with_pop("pop-token")
			.with_code_verifier("verifier")
			.with_pct("pct-1")
			.with_rpt("rpt-1")
			.with_scope(scope);
		let form = decode(&request.form_body(',', &[("client_id", "client")]));

		assert_eq!(form["claim_token"], "id token");
		assert_eq!(form["claim_token_format"], crate::auth::ID_TOKEN_FORMAT);
		assert_eq!(form["pop"], "pop-token");
		assert_eq!(form["code_verifier"], "verifier");
		assert_eq!(form["pct"], "pct-1");
		assert_eq!(form["rpt"], "rpt-1");
		assert_eq!(form["scope"], "read,write");
		assert_eq!(form["client_id"], "client");
	}

	#[test]
	fn next_round_swaps_ticket_and_claim_only() {
		let scope = ScopeSet::new(["read"]).expect("Scopes should be valid.");
		let first = TokenRequest::new("first").with_scope(scope.clone()).with_pct("pct");
		let next = first.next_round("second", ClaimToken::id_token("id"));

		assert_eq!(next.ticket(), "second");
		assert_eq!(next.claim_token(), Some(&ClaimToken::id_token("id")));
		assert_eq!(next.scope(), &scope);
		assert_eq!(next.pct().map(TokenSecret::expose), Some("pct"));
		assert_eq!(first.ticket(), "first");
		assert!(first.claim_token().is_none());
	}
}
