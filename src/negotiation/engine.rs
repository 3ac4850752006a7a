//! Ticket exchange and the `need_info` loop.

// crates.io
use base64::{Engine as _, engine::general_purpose::STANDARD};
use oauth2::{
	HttpResponse,
	http::{
		Method, Request,
		header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
	},
};
use url::form_urlencoded;
// self
use crate::{
	_prelude::*,
	auth::TokenSecret,
	codec::JsonCodec,
	config::ClientAuthMethod,
	dpop::{self, DPOP_HEADER, DPOP_NONCE_HEADER, DpopError},
	error::{ConfigError, NegotiationError},
	http::{TransportErrorMapper, UmaHttpClient},
	negotiation::{ClaimResolver, UmaClient},
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
	uma::{
		ErrorCode, ErrorResponse, Metadata, NeedInfo, TokenRequest, TokenResponse,
		UMA_TICKET_GRANT,
	},
};

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

impl<C, M, J> UmaClient<C, M, J>
where
	C: ?Sized + UmaHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
	J: JsonCodec,
{
	/// Exchanges `request` at `token_endpoint`, resolving at most `max_depth` `need_info` rounds.
	///
	/// No DPoP proof is attached because no server algorithm list is known here; use
	/// [`UmaClient::token`] for proof-bound requests.
	pub async fn negotiate<R>(
		&self,
		token_endpoint: &Url,
		request: TokenRequest,
		resolver: R,
		max_depth: u32,
	) -> Result<TokenResponse>
	where
		R: ClaimResolver,
	{
		self.observe_negotiation("negotiate", token_endpoint, request, &resolver, max_depth, None)
			.await
	}

	/// Exchanges `request` at the token endpoint advertised in `metadata`.
	///
	/// Uses the configured `max_depth`. When a [`DpopSigner`](crate::dpop::DpopSigner) is set,
	/// each token request carries a proof signed with the first configured algorithm the server
	/// also advertises.
	pub async fn token<R>(
		&self,
		metadata: &Metadata,
		request: TokenRequest,
		resolver: R,
	) -> Result<TokenResponse>
	where
		R: ClaimResolver,
	{
		let algorithm = self.dpop_signer.as_ref().and_then(|_| {
			dpop::select_algorithm(metadata.dpop_algorithms(), &self.config.dpop_algorithms)
		});

		self.observe_negotiation(
			"token",
			&metadata.token_endpoint,
			request,
			&resolver,
			self.config.max_depth,
			algorithm.as_deref(),
		)
		.await
	}

	/// Discovers the authorization server at `server_uri` and negotiates a token there.
	pub async fn obtain_token<R>(
		&self,
		server_uri: &Url,
		request: TokenRequest,
		resolver: R,
	) -> Result<TokenResponse>
	where
		R: ClaimResolver,
	{
		let metadata = self.metadata(server_uri).await?;

		if !metadata.allows_uma_ticket_grant() {
			return Err(ConfigError::UnsupportedGrant {
				issuer: metadata.issuer.to_string(),
				grant: UMA_TICKET_GRANT,
			}
			.into());
		}

		self.token(&metadata, request, resolver).await
	}

	async fn observe_negotiation<R>(
		&self,
		stage: &'static str,
		endpoint: &Url,
		request: TokenRequest,
		resolver: &R,
		max_depth: u32,
		algorithm: Option<&str>,
	) -> Result<TokenResponse>
	where
		R: ClaimResolver,
	{
		const KIND: FlowKind = FlowKind::Negotiation;

		let span = FlowSpan::new(KIND, stage);

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let result = span
			.instrument(self.run_negotiation(endpoint, request, resolver, max_depth, algorithm))
			.await;

		match &result {
			Ok(_) => obs::record_flow_outcome(KIND, FlowOutcome::Success),
			Err(e) => {
				obs::trace_failure(KIND, e);
				obs::record_flow_outcome(KIND, FlowOutcome::Failure);
			},
		}

		result
	}

	async fn run_negotiation<R>(
		&self,
		endpoint: &Url,
		request: TokenRequest,
		resolver: &R,
		max_depth: u32,
		algorithm: Option<&str>,
	) -> Result<TokenResponse>
	where
		R: ClaimResolver,
	{
		self.config.validate()?;

		let mut current = request;
		let mut remaining = max_depth;

		loop {
			let response = self.exchange(endpoint, &current, algorithm).await?;
			let status = response.status();
			let code = Some(status.as_u16());

			if status.is_success() {
				return TokenResponse::parse(
					self.codec.as_ref(),
					response.body(),
					code,
					OffsetDateTime::now_utc(),
					self.config.scope_delimiter,
				)
				.map_err(Error::from);
			}

			let error = ErrorResponse::parse(self.codec.as_ref(), response.body());
			let kind = error.code();
			let ErrorResponse { error: raw_code, description } = error;

			if !status.is_client_error() {
				return Err(NegotiationError::UnexpectedStatus { status: status.as_u16(), description }
					.into());
			}

			match kind {
				ErrorCode::NeedInfo => (),
				ErrorCode::InvalidGrant => return Err(Error::InvalidGrant { status: code, description }),
				ErrorCode::InvalidScope => return Err(Error::InvalidScope { status: code, description }),
				ErrorCode::RequestDenied =>
					return Err(Error::RequestDenied { status: code, description }),
				_ =>
					return Err(
						NegotiationError::Server { code: raw_code, description, status: code }.into()
					),
			}

			if remaining == 0 {
				return Err(Error::NegotiationExhausted { max_depth, status: code, description });
			}

			let Some(need_info) = NeedInfo::parse(self.codec.as_ref(), response.body(), code) else {
				return Err(denied(code, "need_info challenge carried no replacement ticket"));
			};
			let ticket = need_info.ticket.clone();

			obs::trace_need_info_round(remaining, need_info.required_claims.len());
			obs::record_need_info_round();

			let claim_token = match resolver.resolve(need_info).await {
				Ok(Some(claim_token)) => claim_token,
				Ok(None) => return Err(denied(code, "claim resolver produced no claim token")),
				Err(e) => return Err(denied(code, &e.to_string())),
			};

			remaining -= 1;
			current = current.next_round(ticket, claim_token);
		}
	}

	/// Sends one token request, resending it once when the server demands a DPoP nonce.
	async fn exchange(
		&self,
		endpoint: &Url,
		request: &TokenRequest,
		algorithm: Option<&str>,
	) -> Result<HttpResponse> {
		let response = self.send_token_request(endpoint, request, algorithm, None).await?;
		let Some(algorithm) = algorithm else {
			return Ok(response);
		};

		if !response.status().is_client_error() {
			return Ok(response);
		}

		let nonce = response
			.headers()
			.get(DPOP_NONCE_HEADER)
			.and_then(|value| value.to_str().ok())
			.map(str::to_owned);
		let Some(nonce) = nonce else {
			return Ok(response);
		};

		if ErrorResponse::parse(self.codec.as_ref(), response.body()).code()
			!= ErrorCode::UseDpopNonce
		{
			return Ok(response);
		}

		obs::trace_dpop_nonce_retry(algorithm);
		obs::record_dpop_nonce_retry(algorithm);

		self.send_token_request(endpoint, request, Some(algorithm), Some(&nonce)).await
	}

	async fn send_token_request(
		&self,
		endpoint: &Url,
		request: &TokenRequest,
		algorithm: Option<&str>,
		nonce: Option<&str>,
	) -> Result<HttpResponse> {
		let (authorization, auth_params) = self.client_auth();
		let body = request.form_body(self.config.scope_delimiter, &auth_params);
		let mut builder = Request::builder()
			.method(Method::POST)
			.uri(endpoint.as_str())
			.header(CONTENT_TYPE, FORM_CONTENT_TYPE)
			.header(ACCEPT, "application/json");

		if let Some(authorization) = authorization {
			builder = builder.header(AUTHORIZATION, authorization);
		}
		if let Some(algorithm) = algorithm {
			let signer = self.dpop_signer.as_deref().ok_or_else(|| DpopError::Signing {
				reason: "no DPoP signer is configured".into(),
			})?;
			let proof =
				signer.create_proof(Method::POST.as_str(), endpoint, algorithm, None, nonce)?;

			builder = builder.header(DPOP_HEADER, proof);
		}

		let http_request = builder.body(body.into_bytes()).map_err(ConfigError::from)?;

		self.execute(http_request).await.map_err(|failure| {
			NegotiationError::Transport {
				status: failure.status(),
				retry_after: failure.retry_after(),
				source: failure.source,
			}
			.into()
		})
	}

	/// Returns the `Authorization` header value and form parameters for client authentication.
	fn client_auth(&self) -> (Option<String>, Vec<(&'static str, &str)>) {
		let client_id = self.client_id.as_deref();
		let client_secret = self.client_secret.as_ref().map(TokenSecret::expose);

		match (self.config.client_auth_method, client_id, client_secret) {
			(ClientAuthMethod::ClientSecretBasic, Some(id), Some(secret)) =>
				(Some(basic_authorization(id, secret)), Vec::new()),
			(ClientAuthMethod::ClientSecretPost, Some(id), Some(secret)) =>
				(None, vec![("client_id", id), ("client_secret", secret)]),
			(_, Some(id), _) => (None, vec![("client_id", id)]),
			(_, None, _) => (None, Vec::new()),
		}
	}
}

fn denied(status: Option<u16>, reason: &str) -> Error {
	Error::RequestDenied { status, description: Some(reason.into()) }
}

/// RFC 6749 §2.3.1: both halves are form-encoded before base64.
fn basic_authorization(client_id: &str, client_secret: &str) -> String {
	let id = form_urlencoded::byte_serialize(client_id.as_bytes()).collect::<String>();
	let secret = form_urlencoded::byte_serialize(client_secret.as_bytes()).collect::<String>();

	format!("Basic {}", STANDARD.encode(format!("{id}:{secret}")))
}
