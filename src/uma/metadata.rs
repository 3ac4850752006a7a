//! Authorization server discovery document.

// self
use crate::{_prelude::*, error::ConfigError, uma::UMA_TICKET_GRANT};

/// Path segments appended to the authorization server URI to reach its discovery document.
pub const DISCOVERY_PATH: [&str; 2] = [".well-known", "uma2-configuration"];

/// UMA authorization server metadata, as published at `/.well-known/uma2-configuration`.
///
/// Only `issuer` and `token_endpoint` are required; absent capability lists decode as empty sets.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metadata {
	/// Issuer identifier.
	pub issuer: Url,
	/// Token endpoint accepting the UMA ticket grant.
	pub token_endpoint: Url,
	/// JWKS document of the authorization server.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub jwks_uri: Option<Url>,
	/// Grant type identifiers the server accepts.
	#[serde(default)]
	pub grant_types_supported: BTreeSet<String>,
	/// JOSE algorithms the server accepts for DPoP proofs.
	#[serde(default)]
	pub dpop_signing_alg_values_supported: BTreeSet<String>,
	/// Claim token profile URIs the server understands.
	#[serde(default)]
	pub uma_profiles_supported: BTreeSet<String>,
}
impl Metadata {
	/// Builds the discovery URL for `server_uri`.
	///
	/// The well-known segments are appended to whatever path `server_uri` already carries, so
	/// `https://as.example/realm` resolves to
	/// `https://as.example/realm/.well-known/uma2-configuration`.
	pub fn discovery_url(server_uri: &Url) -> Result<Url, ConfigError> {
		let mut url = server_uri.clone();

		url.path_segments_mut()
			.map_err(|_| ConfigError::InvalidServerUri { uri: server_uri.to_string() })?
			.pop_if_empty()
			.extend(DISCOVERY_PATH);
		url.set_query(None);
		url.set_fragment(None);

		Ok(url)
	}

	/// Returns true when the server advertises `grant`.
	pub fn supports_grant(&self, grant: &str) -> bool {
		self.grant_types_supported.contains(grant)
	}

	/// Returns true when the server advertises the UMA ticket grant, or lists no grants at all.
	pub fn allows_uma_ticket_grant(&self) -> bool {
		self.grant_types_supported.is_empty() || self.supports_grant(UMA_TICKET_GRANT)
	}

	/// DPoP algorithm set suitable for [`select_algorithm`](crate::dpop::select_algorithm).
	pub fn dpop_algorithms(&self) -> Option<&BTreeSet<String>> {
		Some(&self.dpop_signing_alg_values_supported)
			.filter(|algorithms| !algorithms.is_empty())
	}

	/// Returns the first endpoint that is not served over HTTPS, if any.
	pub(crate) fn insecure_endpoint(&self) -> Option<(&'static str, &Url)> {
		[("issuer", &self.issuer), ("token_endpoint", &self.token_endpoint)]
			.into_iter()
			.find(|(_, url)| url.scheme() != "https")
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	fn url(value: &str) -> Url {
		Url::parse(value).expect("Test URL should parse.")
	}

	#[test]
	fn discovery_url_appends_to_existing_paths() {
		assert_eq!(
			Metadata::discovery_url(&url("https://as.example")).expect("Base URL is valid.").as_str(),
			"https://as.example/.well-known/uma2-configuration"
		);
		assert_eq!(
			Metadata::discovery_url(&url("https://as.example/realm/?x=1"))
				.expect("Base URL is valid.")
				.as_str(),
			"https://as.example/realm/.well-known/uma2-configuration"
		);
		assert!(matches!(
			Metadata::discovery_url(&url("mailto:as@example.com")),
			Err(ConfigError::InvalidServerUri { .. })
		));
	}

	#[test]
	fn optional_sets_default_to_empty() {
		let metadata: Metadata = serde_json::from_str(
			r#"{"issuer":"https://as.example","token_endpoint":"https://as.example/token","extra":1}"#,
		)
		.expect("Minimal metadata should deserialize.");

		assert!(metadata.jwks_uri.is_none());
		assert!(metadata.grant_types_supported.is_empty());
		assert!(metadata.allows_uma_ticket_grant());
		assert!(metadata.dpop_algorithms().is_none());
		assert!(metadata.insecure_endpoint().is_none());
	}

	#[test]
	fn capability_checks_follow_advertised_sets() {
		let metadata = Metadata {
			issuer: url("http://as.example"),
			token_endpoint: url("https://as.example/token"),
			jwks_uri: None,
			grant_types_supported: ["authorization_code".to_owned()].into(),
			dpop_signing_alg_values_supported: ["ES256".to_owned()].into(),
			uma_profiles_supported: BTreeSet::new(),
		};

		assert!(!metadata.allows_uma_ticket_grant());
		assert!(metadata.dpop_algorithms().is_some_and(|algs| algs.contains("ES256")));
		assert_eq!(metadata.insecure_endpoint().map(|(name, _)| name), Some("issuer"));
	}
}
