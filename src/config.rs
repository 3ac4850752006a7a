//! Negotiator configuration.
//!
//! [`NegotiatorConfig`] deserializes with per-field defaults, so a config file only needs to name
//! the knobs it changes:
//!
//! ```
//! use uma_negotiator::config::{ClientAuthMethod, NegotiatorConfig};
//!
//! let config: NegotiatorConfig =
//! 	serde_json::from_str(r#"{"max_depth":2,"client_auth_method":"client_secret_post"}"#)
//! 		.expect("Config should deserialize.");
//!
//! assert_eq!(config.max_depth, 2);
//! assert_eq!(config.client_auth_method, ClientAuthMethod::ClientSecretPost);
//! assert_eq!(config.dpop_algorithms, ["ES256"]);
//! ```

// self
use crate::{_prelude::*, dpop::ES256, error::ConfigError};

/// Client authentication modes for token endpoint calls.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClientAuthMethod {
	#[default]
	/// HTTP Basic with `client_id`/`client_secret`.
	ClientSecretBasic,
	/// Form POST body parameters for `client_id`/`client_secret`.
	ClientSecretPost,
	/// Public clients; only `client_id` is sent, when configured.
	None,
}

/// Tunables shared by every negotiation an [`UmaClient`](crate::negotiation::UmaClient) runs.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NegotiatorConfig {
	/// Maximum number of `need_info` rounds a single negotiation may resolve.
	pub max_depth: u32,
	/// DPoP signing algorithms in client preference order.
	pub dpop_algorithms: Vec<String>,
	/// Client authentication method applied at the token endpoint.
	pub client_auth_method: ClientAuthMethod,
	/// Rejects server metadata whose issuer or token endpoint is not HTTPS.
	pub require_https: bool,
	/// Character used to join scopes in the `scope` parameter.
	pub scope_delimiter: char,
}
impl NegotiatorConfig {
	/// Default `need_info` round budget.
	pub const DEFAULT_MAX_DEPTH: u32 = 5;

	/// Overrides the `need_info` round budget.
	pub fn with_max_depth(mut self, max_depth: u32) -> Self {
		self.max_depth = max_depth;

		self
	}

	/// Overrides the DPoP algorithm preference list.
	pub fn with_dpop_algorithms<I, S>(mut self, algorithms: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		self.dpop_algorithms = algorithms.into_iter().map(Into::into).collect();

		self
	}

	/// Overrides the client authentication method.
	pub fn with_client_auth_method(mut self, method: ClientAuthMethod) -> Self {
		self.client_auth_method = method;

		self
	}

	/// Toggles the HTTPS requirement for discovered endpoints.
	pub fn with_require_https(mut self, require_https: bool) -> Self {
		self.require_https = require_https;

		self
	}

	/// Overrides the scope delimiter.
	pub fn with_scope_delimiter(mut self, delimiter: char) -> Self {
		self.scope_delimiter = delimiter;

		self
	}

	/// Validates invariants that deserialization cannot express.
	pub fn validate(&self) -> Result<(), ConfigError> {
		if self.scope_delimiter.is_control() {
			return Err(ConfigError::InvalidScopeDelimiter { delimiter: self.scope_delimiter });
		}
		if self.dpop_algorithms.iter().any(|alg| alg.trim().is_empty()) {
			return Err(ConfigError::EmptyDpopAlgorithm);
		}

		Ok(())
	}
}
impl Default for NegotiatorConfig {
	fn default() -> Self {
		Self {
			max_depth: Self::DEFAULT_MAX_DEPTH,
			dpop_algorithms: vec![ES256.into()],
			client_auth_method: ClientAuthMethod::default(),
			require_https: false,
			scope_delimiter: ' ',
		}
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn empty_document_yields_defaults() {
		let config: NegotiatorConfig =
			serde_json::from_str("{}").expect("Empty config should deserialize.");

		assert_eq!(config, NegotiatorConfig::default());
		assert_eq!(config.max_depth, 5);
		assert!(config.validate().is_ok());
	}

	#[test]
	fn validation_rejects_bad_values() {
		let config = NegotiatorConfig::default().with_scope_delimiter('\n');

		assert!(matches!(config.validate(), Err(ConfigError::InvalidScopeDelimiter { .. })));

		let config = NegotiatorConfig::default().with_dpop_algorithms(["ES256", " "]);

		assert!(matches!(config.validate(), Err(ConfigError::EmptyDpopAlgorithm)));
	}

	#[test]
	fn auth_methods_use_snake_case() {
		let method: ClientAuthMethod =
			serde_json::from_str("\"none\"").expect("Auth method should deserialize.");

		assert_eq!(method, ClientAuthMethod::None);
		assert_eq!(
			serde_json::to_string(&ClientAuthMethod::ClientSecretBasic)
				.expect("Auth method should serialize."),
			"\"client_secret_basic\""
		);
	}
}
