//! Negotiates an UMA access token against a mock authorization server, answering one
//! `need_info` challenge with an OpenID Connect ID token.

// crates.io
use color_eyre::Result;
use httpmock::prelude::*;
// self
use uma_negotiator::{
	auth::{ClaimToken, ID_TOKEN_FORMAT},
	config::NegotiatorConfig,
	negotiation::{ReqwestUmaClient, ResolverResult},
	uma::{NeedInfo, TokenRequest},
	url::Url,
};

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let server = MockServer::start_async().await;
	let discovery_body = format!(
		"{{\"issuer\":\"{}\",\"token_endpoint\":\"{}\"}}",
		server.base_url(),
		server.url("/token")
	);

	server
		.mock_async(move |when, then| {
			when.method(GET).path("/.well-known/uma2-configuration");
			then.status(200).header("content-type", "application/json").body(discovery_body);
		})
		.await;
	server
		.mock_async(|when, then| {
			when.method(POST).path("/token").form_urlencoded_tuple("ticket", "ticket-demo");
			then.status(403).header("content-type", "application/json").body(format!(
				"{{\"error\":\"need_info\",\"ticket\":\"ticket-followup\",\"required_claims\":[{{\"claim_token_format\":[\"{ID_TOKEN_FORMAT}\"]}}]}}"
			));
		})
		.await;

	let token_mock = server
		.mock_async(|when, then| {
			when.method(POST)
				.path("/token")
				.form_urlencoded_tuple("ticket", "ticket-followup")
				.form_urlencoded_tuple("claim_token_format", ID_TOKEN_FORMAT);
			then.status(200).header("content-type", "application/json").body(
				"{\"access_token\":\"demo-rpt\",\"token_type\":\"Bearer\",\"expires_in\":300}",
			);
		})
		.await;
	let client = ReqwestUmaClient::new(NegotiatorConfig::default())?.with_client_id("demo-client");
	let resolver = |need_info: NeedInfo| async move {
		println!("Server requires {} claim(s).", need_info.required_claims.len());

		ResolverResult::Ok(Some(ClaimToken::id_token("demo-id-token")))
	};
	let server_uri = Url::parse(&server.base_url())?;
	let token =
		client.obtain_token(&server_uri, TokenRequest::new("ticket-demo"), resolver).await?;

	println!("Requesting party token: {} ({}).", token.access_token.expose(), token.token_type);

	token_mock.assert_async().await;

	Ok(())
}
