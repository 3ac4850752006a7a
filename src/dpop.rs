//! DPoP (RFC 9449) proof construction and algorithm negotiation.
//!
//! A [`DpopSigner`] owns the client's proof key and turns `(method, uri, ath?, nonce?)` tuples
//! into compact JWS proofs. [`select_algorithm`] intersects the server's advertised
//! `dpop_signing_alg_values_supported` with the client's preference list; a `None` result means
//! "send no proof", never an error, because DPoP is optional for UMA token endpoints.

mod signer;

pub use signer::*;

// self
use crate::{_prelude::*, auth::TokenSecret};

/// JOSE identifier for ECDSA P-256 with SHA-256, the only algorithm this crate signs with.
pub const ES256: &str = "ES256";
/// JWS `typ` header value for DPoP proofs.
pub const JWT_HEADER_TYP_DPOP: &str = "dpop+jwt";
/// HTTP header carrying the proof.
pub const DPOP_HEADER: &str = "DPoP";
/// HTTP header carrying a server-issued nonce.
pub const DPOP_NONCE_HEADER: &str = "DPoP-Nonce";

/// Failures raised while building a DPoP proof.
#[derive(Debug, ThisError)]
pub enum DpopError {
	/// Requested algorithm has no implementation.
	#[error("DPoP algorithm `{algorithm}` is not supported.")]
	UnsupportedAlgorithm {
		/// Requested JOSE algorithm name.
		algorithm: String,
	},
	/// Key material is missing or the signature could not be produced.
	#[error("DPoP proof could not be signed: {reason}.")]
	Signing {
		/// Why signing failed.
		reason: String,
	},
	/// Imported key bytes do not form a valid key.
	#[error("DPoP key material is invalid: {reason}.")]
	InvalidKey {
		/// Why the key was rejected.
		reason: String,
	},
}

/// Picks the first client-preferred algorithm the server also supports.
///
/// Returns `None` when the server list is absent or empty, when the client list is empty, or when
/// the two do not intersect.
pub fn select_algorithm<S>(
	server_supported: Option<&BTreeSet<String>>,
	client_supported: &[S],
) -> Option<String>
where
	S: AsRef<str>,
{
	let server_supported = server_supported?;

	client_supported
		.iter()
		.map(S::as_ref)
		.find(|alg| server_supported.contains(*alg))
		.map(ToOwned::to_owned)
}

/// `ath` claim value for an access token: base64url SHA-256 of the token.
pub fn access_token_hash(access_token: &TokenSecret) -> String {
	access_token.sha256()
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	fn set(values: &[&str]) -> BTreeSet<String> {
		values.iter().map(|v| v.to_string()).collect()
	}

	#[test]
	fn selection_returns_none_without_overlap() {
		let server = set(&["ES256"]);

		assert_eq!(select_algorithm::<&str>(Some(&server), &[]), None);
		assert_eq!(select_algorithm(Some(&server), &["RS256"]), None);
		assert_eq!(select_algorithm(None, &["ES256"]), None);
		assert_eq!(select_algorithm(Some(&BTreeSet::new()), &["ES256"]), None);
	}

	#[test]
	fn selection_preserves_client_preference_order() {
		let server = set(&["ES256", "PS256", "RS256"]);

		assert_eq!(select_algorithm(Some(&server), &["RS256", "ES256"]), Some("RS256".into()));
		assert_eq!(select_algorithm(Some(&server), &["EdDSA", "ES256"]), Some("ES256".into()));
	}

	#[test]
	fn access_token_hash_is_base64url_sha256() {
		let token = TokenSecret::new("Kz~8mXK1EalYznwH-LC-1fBAo.4Ljp~zsPE_NeO.gxU");

		assert_eq!(access_token_hash(&token), "fUHyO2r2Z3DZ53EsNrWBb0xWXoaNy59IiKCAqksmQEo");
	}
}
