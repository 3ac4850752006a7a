//! Ticket negotiation client.
//!
//! [`UmaClient`] owns the HTTP transport, transport error mapper, JSON codec, and optional DPoP
//! signer. Every collaborator sits behind an `Arc` and the configuration is immutable, so a
//! client is cheap to clone and one instance can drive any number of concurrent negotiations.
//! Discovery lives in [`UmaClient::metadata`]; the ticket exchange and its `need_info` loop live in
//! [`UmaClient::negotiate`], [`UmaClient::token`], and [`UmaClient::obtain_token`].

mod discovery;
mod engine;
mod resolver;

pub use resolver::*;

// crates.io
use oauth2::{AsyncHttpClient, HttpRequest, HttpResponse};
// self
use crate::{
	_prelude::*,
	auth::TokenSecret,
	codec::{JsonCodec, SerdeJsonCodec},
	config::NegotiatorConfig,
	dpop::DpopSigner,
	error::TransportError,
	http::{ResponseMetadata, ResponseMetadataSlot, TransportErrorMapper, UmaHttpClient},
};
#[cfg(feature = "reqwest")]
use crate::http::{ReqwestHttpClient, ReqwestTransportErrorMapper};

/// Client specialized for the crate's default reqwest transport stack.
#[cfg(feature = "reqwest")]
pub type ReqwestUmaClient = UmaClient<ReqwestHttpClient, ReqwestTransportErrorMapper>;

/// Negotiates UMA access tokens against one or more authorization servers.
pub struct UmaClient<C, M, J = SerdeJsonCodec>
where
	C: ?Sized + UmaHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
	J: JsonCodec,
{
	/// HTTP client used for discovery and token requests.
	pub http_client: Arc<C>,
	/// Mapper applied to transport-layer errors before surfacing them to callers.
	pub transport_mapper: Arc<M>,
	/// JSON codec for every body the client reads.
	pub codec: Arc<J>,
	/// Negotiation tunables.
	pub config: NegotiatorConfig,
	/// OAuth client identifier, when the client is registered.
	pub client_id: Option<String>,
	/// Client secret for confidential authentication methods.
	pub client_secret: Option<TokenSecret>,
	/// DPoP key used to bind token requests.
	pub dpop_signer: Option<Arc<DpopSigner>>,
}
impl<C, M> UmaClient<C, M>
where
	C: ?Sized + UmaHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Creates a client that reuses the caller-provided transport + mapper pair.
	pub fn with_http_client(
		config: NegotiatorConfig,
		http_client: impl Into<Arc<C>>,
		mapper: impl Into<Arc<M>>,
	) -> Self {
		Self {
			http_client: http_client.into(),
			transport_mapper: mapper.into(),
			codec: Arc::new(SerdeJsonCodec),
			config,
			client_id: None,
			client_secret: None,
			dpop_signer: None,
		}
	}
}
impl<C, M, J> UmaClient<C, M, J>
where
	C: ?Sized + UmaHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
	J: JsonCodec,
{
	/// Sets the OAuth client identifier.
	pub fn with_client_id(mut self, client_id: impl Into<String>) -> Self {
		self.client_id = Some(client_id.into());

		self
	}

	/// Sets or replaces the client secret used for confidential client auth modes.
	pub fn with_client_secret(mut self, secret: impl Into<TokenSecret>) -> Self {
		self.client_secret = Some(secret.into());

		self
	}

	/// Binds token requests to `signer` whenever the server advertises a usable algorithm.
	pub fn with_dpop_signer(mut self, signer: impl Into<Arc<DpopSigner>>) -> Self {
		self.dpop_signer = Some(signer.into());

		self
	}

	/// Swaps the JSON codec.
	pub fn with_codec<K>(self, codec: impl Into<Arc<K>>) -> UmaClient<C, M, K>
	where
		K: JsonCodec,
	{
		UmaClient {
			http_client: self.http_client,
			transport_mapper: self.transport_mapper,
			codec: codec.into(),
			config: self.config,
			client_id: self.client_id,
			client_secret: self.client_secret,
			dpop_signer: self.dpop_signer,
		}
	}

	/// Sends `request` through a fresh metadata-instrumented handle.
	async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, TransportFailure> {
		let slot = ResponseMetadataSlot::default();
		let handle = self.http_client.with_metadata(slot.clone());

		handle.call(request).await.map_err(|e| {
			let meta = slot.take();
			let source = self.transport_mapper.map_transport_error(meta.as_ref(), e);

			TransportFailure { source, meta }
		})
	}
}
#[cfg(feature = "reqwest")]
impl UmaClient<ReqwestHttpClient, ReqwestTransportErrorMapper> {
	/// Creates a client with its own reqwest-backed transport that never follows redirects.
	pub fn new(config: NegotiatorConfig) -> Result<Self> {
		Ok(Self::with_http_client(
			config,
			ReqwestHttpClient::without_redirects()?,
			Arc::new(ReqwestTransportErrorMapper),
		))
	}
}
impl<C, M, J> Clone for UmaClient<C, M, J>
where
	C: ?Sized + UmaHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
	J: JsonCodec,
{
	fn clone(&self) -> Self {
		Self {
			http_client: Arc::clone(&self.http_client),
			transport_mapper: Arc::clone(&self.transport_mapper),
			codec: Arc::clone(&self.codec),
			config: self.config.clone(),
			client_id: self.client_id.clone(),
			client_secret: self.client_secret.clone(),
			dpop_signer: self.dpop_signer.clone(),
		}
	}
}
impl<C, M, J> Debug for UmaClient<C, M, J>
where
	C: ?Sized + UmaHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
	J: JsonCodec,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("UmaClient")
			.field("config", &self.config)
			.field("client_id", &self.client_id)
			.field("client_secret_set", &self.client_secret.is_some())
			.field("dpop_signer", &self.dpop_signer)
			.finish()
	}
}

/// Mapped transport failure plus whatever response metadata the transport captured.
struct TransportFailure {
	source: TransportError,
	meta: Option<ResponseMetadata>,
}
impl TransportFailure {
	fn status(&self) -> Option<u16> {
		self.meta.as_ref().and_then(|meta| meta.status)
	}

	fn retry_after(&self) -> Option<Duration> {
		self.meta.as_ref().and_then(|meta| meta.retry_after)
	}
}

#[cfg(all(test, feature = "reqwest"))]
mod tests {
	// self
	use super::*;

	#[test]
	fn debug_output_hides_the_client_secret() {
		let client = ReqwestUmaClient::new(NegotiatorConfig::default())
			.expect("Reqwest client should build.")
			.with_client_id("client")
			.with_client_secret("very-secret");
		let rendered = format!("{client:?}");

		assert!(rendered.contains("client_secret_set: true"));
		assert!(!rendered.contains("very-secret"));
	}

	#[test]
	fn clones_share_collaborators() {
		let client = ReqwestUmaClient::new(NegotiatorConfig::default())
			.expect("Reqwest client should build.")
			.with_dpop_signer(DpopSigner::generate());
		let clone = client.clone();

		assert!(Arc::ptr_eq(&client.http_client, &clone.http_client));
		assert!(Arc::ptr_eq(
			client.dpop_signer.as_ref().expect("Signer should be set."),
			clone.dpop_signer.as_ref().expect("Signer should be set."),
		));
	}
}
