// crates.io
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use p256::ecdsa::{Signature, SigningKey, signature::Signer};
use rand::Rng;
use sha2::{Digest, Sha256};
// self
use crate::{
	_prelude::*,
	dpop::{DpopError, ES256, JWT_HEADER_TYP_DPOP},
};

const JTI_LEN: usize = 16;

/// Public half of the proof key, in JWK form.
///
/// Members are declared in lexicographic order so the same serialization doubles as the
/// RFC 7638 thumbprint input.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicJwk {
	/// Curve name (`P-256`).
	pub crv: String,
	/// Key type (`EC`).
	pub kty: String,
	/// Base64url x coordinate.
	pub x: String,
	/// Base64url y coordinate.
	pub y: String,
}

#[derive(Serialize)]
struct ProofHeader<'a> {
	typ: &'static str,
	alg: &'a str,
	jwk: &'a PublicJwk,
}

#[derive(Serialize)]
struct ProofClaims<'a> {
	jti: String,
	htm: &'a str,
	htu: &'a str,
	iat: i64,
	#[serde(skip_serializing_if = "Option::is_none")]
	ath: Option<&'a str>,
	#[serde(skip_serializing_if = "Option::is_none")]
	nonce: Option<&'a str>,
}

/// Holds the client's DPoP key and signs proofs with it.
///
/// `DpopSigner::default()` carries no key material; every signing attempt on it fails with
/// [`DpopError::Signing`].
#[derive(Clone, Default)]
pub struct DpopSigner {
	es256: Option<SigningKey>,
}
impl DpopSigner {
	/// Generates a fresh P-256 key.
	pub fn generate() -> Self {
		let mut rng = rand::rng();

		loop {
			let mut bytes = [0_u8; 32];

			rng.fill(&mut bytes);

			// Rejection sampling: scalars outside the curve order are vanishingly rare.
			if let Ok(key) = SigningKey::from_slice(&bytes) {
				return Self { es256: Some(key) };
			}
		}
	}

	/// Imports a P-256 private scalar (32 big-endian bytes).
	pub fn from_es256_bytes(bytes: &[u8]) -> Result<Self, DpopError> {
		let key = SigningKey::from_slice(bytes)
			.map_err(|e| DpopError::InvalidKey { reason: e.to_string() })?;

		Ok(Self { es256: Some(key) })
	}

	/// Algorithms this signer can currently produce proofs for.
	pub fn algorithms(&self) -> &'static [&'static str] {
		if self.es256.is_some() { &[ES256] } else { &[] }
	}

	/// Public key as a JWK, when key material is loaded.
	pub fn public_jwk(&self) -> Option<PublicJwk> {
		let key = self.es256.as_ref()?;
		let point = key.verifying_key().to_encoded_point(false);

		Some(PublicJwk {
			crv: "P-256".into(),
			kty: "EC".into(),
			x: URL_SAFE_NO_PAD.encode(point.x()?),
			y: URL_SAFE_NO_PAD.encode(point.y()?),
		})
	}

	/// RFC 7638 JWK thumbprint (base64url SHA-256) of the public key.
	pub fn thumbprint(&self) -> Result<String, DpopError> {
		let jwk = self.require_jwk()?;
		let canonical = serde_json::to_vec(&jwk)
			.map_err(|e| DpopError::Signing { reason: e.to_string() })?;

		Ok(URL_SAFE_NO_PAD.encode(Sha256::digest(canonical)))
	}

	/// Builds a compact JWS proof bound to `method` and `uri`.
	///
	/// The query and fragment of `uri` are stripped before it becomes the `htu` claim.
	/// `access_token_hash` is the `ath` value (see [`access_token_hash`](super::access_token_hash))
	/// and `nonce` is the most recent server-issued `DPoP-Nonce`.
	pub fn create_proof(
		&self,
		method: &str,
		uri: &Url,
		algorithm: &str,
		access_token_hash: Option<&str>,
		nonce: Option<&str>,
	) -> Result<String, DpopError> {
		if algorithm != ES256 {
			return Err(DpopError::UnsupportedAlgorithm { algorithm: algorithm.into() });
		}

		let key = self.es256.as_ref().ok_or_else(missing_key)?;
		let jwk = self.require_jwk()?;
		let mut htu = uri.clone();

		htu.set_query(None);
		htu.set_fragment(None);

		let header = ProofHeader { typ: JWT_HEADER_TYP_DPOP, alg: algorithm, jwk: &jwk };
		let claims = ProofClaims {
			jti: generate_jti(),
			htm: method,
			htu: htu.as_str(),
			iat: OffsetDateTime::now_utc().unix_timestamp(),
			ath: access_token_hash,
			nonce,
		};
		let header = encode_segment(&header)?;
		let claims = encode_segment(&claims)?;
		let signing_input = format!("{header}.{claims}");
		let signature: Signature = key
			.try_sign(signing_input.as_bytes())
			.map_err(|e| DpopError::Signing { reason: e.to_string() })?;

		Ok(format!("{signing_input}.{}", URL_SAFE_NO_PAD.encode(signature.to_bytes())))
	}

	fn require_jwk(&self) -> Result<PublicJwk, DpopError> {
		self.public_jwk().ok_or_else(missing_key)
	}
}
impl Debug for DpopSigner {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("DpopSigner").field("algorithms", &self.algorithms()).finish()
	}
}

fn missing_key() -> DpopError {
	DpopError::Signing { reason: "no ES256 key material is loaded".into() }
}

fn encode_segment<T>(value: &T) -> Result<String, DpopError>
where
	T: Serialize,
{
	let json = serde_json::to_vec(value).map_err(|e| DpopError::Signing { reason: e.to_string() })?;

	Ok(URL_SAFE_NO_PAD.encode(json))
}

fn generate_jti() -> String {
	let mut bytes = [0_u8; JTI_LEN];

	rand::rng().fill(&mut bytes);

	URL_SAFE_NO_PAD.encode(bytes)
}

#[cfg(test)]
mod tests {
	// crates.io
	use p256::ecdsa::{VerifyingKey, signature::Verifier};
	use serde_json::Value;
	// self
	use super::*;

	fn decode_segment(segment: &str) -> Value {
		let bytes = URL_SAFE_NO_PAD.decode(segment).expect("Segment should be base64url.");

		serde_json::from_slice(&bytes).expect("Segment should be JSON.")
	}

	fn verify(proof: &str) -> (Value, Value) {
		let parts = proof.split('.').collect::<Vec<_>>();

		assert_eq!(parts.len(), 3, "Proof must be a compact JWS.");

		let header = decode_segment(parts[0]);
		let claims = decode_segment(parts[1]);
		let coordinate = |name: &str| {
			URL_SAFE_NO_PAD
				.decode(header["jwk"][name].as_str().expect("JWK coordinate should be a string."))
				.expect("JWK coordinate should be base64url.")
		};
		let mut sec1 = vec![0x04];

		sec1.extend(coordinate("x"));
		sec1.extend(coordinate("y"));

		let verifying_key =
			VerifyingKey::from_sec1_bytes(&sec1).expect("Embedded JWK should be a P-256 point.");
		let signature = Signature::from_slice(
			&URL_SAFE_NO_PAD.decode(parts[2]).expect("Signature should be base64url."),
		)
		.expect("Signature should be 64 bytes.");

		verifying_key
			.verify(format!("{}.{}", parts[0], parts[1]).as_bytes(), &signature)
			.expect("Proof signature should verify against the embedded JWK.");

		(header, claims)
	}

	#[test]
	fn proofs_verify_and_bind_method_and_uri() {
		let signer = DpopSigner::generate();
		let uri = Url::parse("https://as.example/token?debug=1#frag").expect("URL should parse.");
		let proof = signer
			.create_proof("POST", &uri, ES256, None, Some("server-nonce"))
			.expect("Proof should be created.");
		let (header, claims) = verify(&proof);

		assert_eq!(header["typ"], "dpop+jwt");
		assert_eq!(header["alg"], "ES256");
		assert_eq!(header["jwk"]["kty"], "EC");
		assert_eq!(claims["htm"], "POST");
		assert_eq!(claims["htu"], "https://as.example/token");
		assert_eq!(claims["nonce"], "server-nonce");
		assert!(claims.get("ath").is_none());
		assert!(claims["iat"].as_i64().is_some());
	}

	#[test]
	fn proofs_carry_ath_and_unique_jti() {
		let signer = DpopSigner::generate();
		let uri = Url::parse("https://rs.example/resource").expect("URL should parse.");
		let first = signer
			.create_proof("GET", &uri, ES256, Some("hash-value"), None)
			.expect("Proof should be created.");
		let second = signer
			.create_proof("GET", &uri, ES256, Some("hash-value"), None)
			.expect("Proof should be created.");
		let (_, first_claims) = verify(&first);
		let (_, second_claims) = verify(&second);

		assert_eq!(first_claims["ath"], "hash-value");
		assert!(first_claims.get("nonce").is_none());
		assert_ne!(first_claims["jti"], second_claims["jti"]);
	}

	#[test]
	fn unsupported_algorithms_and_missing_keys_fail() {
		let uri = Url::parse("https://as.example/token").expect("URL should parse.");
		let err = DpopSigner::generate()
			.create_proof("POST", &uri, "RS256", None, None)
			.expect_err("RS256 has no implementation.");

		assert!(matches!(err, DpopError::UnsupportedAlgorithm { algorithm } if algorithm == "RS256"));

		let err = DpopSigner::default()
			.create_proof("POST", &uri, ES256, None, None)
			.expect_err("An empty signer has no key material.");

		assert!(matches!(err, DpopError::Signing { .. }));
		assert!(DpopSigner::default().algorithms().is_empty());
	}

	#[test]
	fn imported_keys_have_stable_thumbprints() {
		let bytes = [7_u8; 32];
		let a = DpopSigner::from_es256_bytes(&bytes).expect("Key bytes should be valid.");
		let b = DpopSigner::from_es256_bytes(&bytes).expect("Key bytes should be valid.");
		let thumbprint = a.thumbprint().expect("Thumbprint should be computed.");

		assert_eq!(thumbprint, b.thumbprint().expect("Thumbprint should be computed."));
		assert_eq!(thumbprint.len(), 43);
		assert!(DpopSigner::from_es256_bytes(&[0_u8; 32]).is_err());
		assert!(DpopSigner::default().thumbprint().is_err());
	}
}
