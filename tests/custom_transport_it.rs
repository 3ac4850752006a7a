// std
use std::collections::VecDeque;
// crates.io
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use serde_json::Value;
// self
use uma_negotiator::{
	_preludet::*,
	config::NegotiatorConfig,
	dpop::DpopSigner,
	error::{NegotiationError, TransportError},
	http::{
		ResponseMetadata, ResponseMetadataSlot, TransportErrorMapper, UmaHttpClient,
		oauth2::{
			AsyncHttpClient, HttpClientError, HttpRequest, HttpResponse,
			http::{HeaderValue, StatusCode},
		},
	},
	negotiation::{ResolverError, ResolverResult, UmaClient},
	uma::{Metadata, NeedInfo, TokenRequest},
};

#[derive(Debug)]
enum FakeTransportError {
	Throttled,
}
impl Display for FakeTransportError {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		match self {
			Self::Throttled => write!(f, "Transport throttled."),
		}
	}
}
impl StdError for FakeTransportError {}

enum Scripted {
	Respond { status: u16, nonce: Option<&'static str>, body: &'static str },
	Fail { status: u16, retry_after: Duration },
}

/// Request as observed by the fake transport.
struct Recorded {
	dpop: Option<String>,
	body: String,
}

#[derive(Clone, Default)]
struct FakeHttpClient {
	script: Arc<Mutex<VecDeque<Scripted>>>,
	recorded: Arc<Mutex<Vec<Recorded>>>,
}
impl FakeHttpClient {
	fn scripted(script: impl IntoIterator<Item = Scripted>) -> Self {
		Self { script: Arc::new(Mutex::new(script.into_iter().collect())), ..Default::default() }
	}

	fn recorded_proofs(&self) -> Vec<Option<String>> {
		self.recorded.lock().iter().map(|request| request.dpop.clone()).collect()
	}
}
impl UmaHttpClient for FakeHttpClient {
	type Handle = FakeHttpHandle;
	type TransportError = FakeTransportError;

	fn with_metadata(&self, slot: ResponseMetadataSlot) -> Self::Handle {
		FakeHttpHandle { client: self.clone(), slot }
	}
}

struct FakeHttpHandle {
	client: FakeHttpClient,
	slot: ResponseMetadataSlot,
}
impl<'a> AsyncHttpClient<'a> for FakeHttpHandle {
	type Error = HttpClientError<FakeTransportError>;
	type Future =
		Pin<Box<dyn Future<Output = Result<HttpResponse, Self::Error>> + 'a + Send + Sync>>;

	fn call(&'a self, request: HttpRequest) -> Self::Future {
		let client = self.client.clone();
		let slot = self.slot.clone();

		Box::pin(async move {
			assert!(
				slot.take().is_none(),
				"ResponseMetadataSlot must be clear before dispatching a request."
			);

			client.recorded.lock().push(Recorded {
				dpop: request
					.headers()
					.get("dpop")
					.map(|value| value.to_str().expect("Proof should be ASCII.").to_owned()),
				body: String::from_utf8(request.body().clone()).expect("Form should be UTF-8."),
			});

			let next = client.script.lock().pop_front().expect("Transport script ran out.");

			match next {
				Scripted::Respond { status, nonce, body } => {
					slot.store(ResponseMetadata { status: Some(status), retry_after: None });

					let mut response = HttpResponse::new(body.as_bytes().to_vec());

					*response.status_mut() =
						StatusCode::from_u16(status).expect("Scripted status should be valid.");

					if let Some(nonce) = nonce {
						response.headers_mut().insert("dpop-nonce", HeaderValue::from_static(nonce));
					}

					Ok(response)
				},
				Scripted::Fail { status, retry_after } => {
					slot.store(ResponseMetadata {
						status: Some(status),
						retry_after: Some(retry_after),
					});

					Err(HttpClientError::Reqwest(Box::new(FakeTransportError::Throttled)))
				},
			}
		})
	}
}

#[derive(Clone, Default)]
struct RecordingTransportErrorMapper {
	metadata: Arc<Mutex<Vec<Option<ResponseMetadata>>>>,
}
impl RecordingTransportErrorMapper {
	fn recorded_metadata(&self) -> Vec<Option<ResponseMetadata>> {
		self.metadata.lock().clone()
	}
}
impl TransportErrorMapper<FakeTransportError> for RecordingTransportErrorMapper {
	fn map_transport_error(
		&self,
		meta: Option<&ResponseMetadata>,
		err: HttpClientError<FakeTransportError>,
	) -> TransportError {
		self.metadata.lock().push(meta.cloned());

		match err {
			HttpClientError::Reqwest(inner) => TransportError::network(*inner),
			HttpClientError::Http(inner) => TransportError::Request(inner),
			HttpClientError::Io(inner) => TransportError::Io(inner),
			HttpClientError::Other(message) => TransportError::Other { message },
			other => TransportError::Other { message: format!("{other:?}") },
		}
	}
}

type FakeUmaClient = UmaClient<FakeHttpClient, RecordingTransportErrorMapper>;

const TOKEN_BODY: &str = "{\"access_token\":\"bound-token\",\"token_type\":\"DPoP\"}";
const NONCE_BODY: &str = "{\"error\":\"use_dpop_nonce\",\"error_description\":\"nonce required\"}";

fn build_client(
	http_client: &FakeHttpClient,
	mapper: &RecordingTransportErrorMapper,
) -> FakeUmaClient {
	UmaClient::with_http_client(
		NegotiatorConfig::default(),
		Arc::new(http_client.clone()),
		Arc::new(mapper.clone()),
	)
	.with_dpop_signer(DpopSigner::generate())
}

fn metadata(dpop_algorithms: &[&str]) -> Metadata {
	Metadata {
		issuer: Url::parse("https://as.example").expect("Issuer should parse."),
		token_endpoint: Url::parse("https://as.example/token?realm=uma")
			.expect("Token endpoint should parse."),
		jwks_uri: None,
		grant_types_supported: BTreeSet::new(),
		dpop_signing_alg_values_supported: dpop_algorithms.iter().map(|alg| alg.to_string()).collect(),
		uma_profiles_supported: BTreeSet::new(),
	}
}

async fn no_claims(_: NeedInfo) -> ResolverResult {
	Err(ResolverError::new("no claims available"))
}

fn proof_claims(proof: &str) -> Value {
	let segment = proof.split('.').nth(1).expect("Proof should have a claims segment.");
	let bytes = URL_SAFE_NO_PAD.decode(segment).expect("Claims should be base64url.");

	serde_json::from_slice(&bytes).expect("Claims should be JSON.")
}

#[tokio::test]
async fn dpop_nonce_challenge_is_answered_once() {
	let http_client = FakeHttpClient::scripted([
		Scripted::Respond { status: 400, nonce: Some("nonce-1"), body: NONCE_BODY },
		Scripted::Respond { status: 200, nonce: None, body: TOKEN_BODY },
	]);
	let mapper = RecordingTransportErrorMapper::default();
	let token = build_client(&http_client, &mapper)
		.token(&metadata(&["RS256", "ES256"]), TokenRequest::new("ticket-dpop"), no_claims)
		.await
		.expect("Nonce challenge should be answered.");

	assert_eq!(token.access_token.expose(), "bound-token");
	assert_eq!(token.token_type, "DPoP");

	let proofs = http_client.recorded_proofs();

	assert_eq!(proofs.len(), 2);

	let first = proof_claims(proofs[0].as_deref().expect("First request should carry a proof."));
	let second = proof_claims(proofs[1].as_deref().expect("Resend should carry a proof."));

	assert!(first.get("nonce").is_none());
	assert_eq!(second["nonce"], "nonce-1");
	assert_eq!(second["htm"], "POST");
	assert_eq!(second["htu"], "https://as.example/token");
	assert_ne!(first["jti"], second["jti"]);
	assert!(http_client.recorded.lock().iter().all(|request| request.body.contains("ticket-dpop")));
}

#[tokio::test]
async fn repeated_nonce_challenges_are_not_chased() {
	let http_client = FakeHttpClient::scripted([
		Scripted::Respond { status: 400, nonce: Some("nonce-1"), body: NONCE_BODY },
		Scripted::Respond { status: 400, nonce: Some("nonce-2"), body: NONCE_BODY },
	]);
	let mapper = RecordingTransportErrorMapper::default();
	let err = build_client(&http_client, &mapper)
		.token(&metadata(&["ES256"]), TokenRequest::new("ticket-dpop"), no_claims)
		.await
		.expect_err("A second nonce challenge should fail.");

	assert!(matches!(
		err,
		Error::Negotiation(NegotiationError::Server { code, status: Some(400), .. })
			if code == "use_dpop_nonce"
	));
	assert_eq!(http_client.recorded_proofs().len(), 2);
}

#[tokio::test]
async fn proofs_are_omitted_without_a_shared_algorithm() {
	let http_client = FakeHttpClient::scripted([Scripted::Respond {
		status: 200,
		nonce: None,
		body: TOKEN_BODY,
	}]);
	let mapper = RecordingTransportErrorMapper::default();

	build_client(&http_client, &mapper)
		.token(&metadata(&["RS256"]), TokenRequest::new("ticket-plain"), no_claims)
		.await
		.expect("Unbound exchange should succeed.");

	assert_eq!(http_client.recorded_proofs(), vec![None]);
}

#[tokio::test]
async fn throttled_transport_surfaces_metadata() {
	let http_client = FakeHttpClient::scripted([Scripted::Fail {
		status: 429,
		retry_after: Duration::seconds(5),
	}]);
	let mapper = RecordingTransportErrorMapper::default();
	let err = build_client(&http_client, &mapper)
		.token(&metadata(&[]), TokenRequest::new("ticket-throttled"), no_claims)
		.await
		.expect_err("Request should be throttled with HTTP 429.");

	match err {
		Error::Negotiation(NegotiationError::Transport { status, retry_after, source }) => {
			assert_eq!(status, Some(429));
			assert_eq!(retry_after, Some(Duration::seconds(5)));
			assert!(matches!(source, TransportError::Network { .. }));
		},
		other => panic!("Unexpected error variant: {other:?}."),
	}

	let observed = mapper.recorded_metadata();

	assert_eq!(observed.len(), 1, "Mapper must record a single request.");

	let meta = observed
		.first()
		.and_then(|value| value.clone())
		.expect("Response metadata should be recorded exactly once.");

	assert_eq!(meta.status, Some(429));
	assert_eq!(meta.retry_after, Some(Duration::seconds(5)));
}
