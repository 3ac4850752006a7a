// crates.io
use oauth2::http::{Method, Request, header::ACCEPT};
// self
use crate::{
	_prelude::*,
	codec::JsonCodec,
	error::ConfigError,
	http::{TransportErrorMapper, UmaHttpClient},
	negotiation::UmaClient,
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
	uma::Metadata,
};

impl<C, M, J> UmaClient<C, M, J>
where
	C: ?Sized + UmaHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
	J: JsonCodec,
{
	/// Fetches the UMA configuration of the authorization server at `server_uri`.
	///
	/// Nothing is cached; each call issues one GET against
	/// `<server_uri>/.well-known/uma2-configuration` and never retries.
	pub async fn metadata(&self, server_uri: &Url) -> Result<Metadata> {
		const KIND: FlowKind = FlowKind::Discovery;

		let span = FlowSpan::new(KIND, "metadata");

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let result = span.instrument(self.fetch_metadata(server_uri)).await;

		match &result {
			Ok(_) => obs::record_flow_outcome(KIND, FlowOutcome::Success),
			Err(e) => {
				obs::trace_failure(KIND, e);
				obs::record_flow_outcome(KIND, FlowOutcome::Failure);
			},
		}

		result
	}

	async fn fetch_metadata(&self, server_uri: &Url) -> Result<Metadata> {
		let uri = Metadata::discovery_url(server_uri)?;
		let request = Request::builder()
			.method(Method::GET)
			.uri(uri.as_str())
			.header(ACCEPT, "application/json")
			.body(Vec::new())
			.map_err(ConfigError::from)?;
		let response = match self.execute(request).await {
			Ok(response) => response,
			Err(failure) =>
				return Err(Error::MetadataUnavailable {
					status: failure.status(),
					uri,
					source: Some(Box::new(failure.source)),
				}),
		};
		let status = response.status();

		if !status.is_success() {
			return Err(Error::MetadataUnavailable {
				uri,
				status: Some(status.as_u16()),
				source: None,
			});
		}

		let metadata = match self.codec.from_json::<Metadata>(response.body()) {
			Ok(metadata) => metadata,
			Err(source) =>
				return Err(Error::MetadataMalformed {
					uri,
					status: Some(status.as_u16()),
					reason: "document is not UMA server metadata".into(),
					source: Some(source),
				}),
		};

		let insecure = self.config.require_https.then(|| metadata.insecure_endpoint()).flatten();

		if let Some((field, endpoint)) = insecure {
			return Err(Error::MetadataMalformed {
				reason: format!("{field} `{endpoint}` is not served over HTTPS"),
				uri,
				status: Some(status.as_u16()),
				source: None,
			});
		}

		Ok(metadata)
	}
}
