//! JSON collaborator contract used to encode and decode negotiation payloads.
//!
//! The negotiator never touches `serde_json` directly; it asks a [`JsonCodec`] to turn bytes into
//! typed bodies (server metadata, token responses, error bodies, `need_info` challenges). The
//! default [`SerdeJsonCodec`] reports the JSON path of every failure via `serde_path_to_error`, so
//! malformed discovery documents point at the offending field.

// crates.io
use serde::de::DeserializeOwned;
// self
use crate::{_prelude::*, error::BoxError};

/// Encoding/decoding failure reported by a [`JsonCodec`].
#[derive(Debug, ThisError)]
pub enum CodecError {
	/// Value could not be serialized.
	#[error("Failed to encode JSON at `{path}`.")]
	Encode {
		/// JSON path where encoding stopped.
		path: String,
		/// Codec-specific failure.
		#[source]
		source: BoxError,
	},
	/// Bytes could not be decoded into the requested shape.
	#[error("Failed to decode JSON at `{path}`.")]
	Decode {
		/// JSON path where decoding stopped (`.` for the document root).
		path: String,
		/// Codec-specific failure.
		#[source]
		source: BoxError,
	},
}
impl CodecError {
	/// JSON path associated with the failure.
	pub fn path(&self) -> &str {
		match self {
			Self::Encode { path, .. } | Self::Decode { path, .. } => path,
		}
	}
}

/// Pluggable JSON service.
///
/// Implementations must be cheap to share; the negotiator keeps one behind an `Arc` and calls it
/// from concurrent negotiations.
pub trait JsonCodec
where
	Self: 'static + Send + Sync,
{
	/// Serializes `value` into JSON bytes.
	///
	/// Token requests are form-encoded, so the negotiator itself only decodes. This half of the
	/// contract serves callers that build JSON claim tokens (for example a verifiable
	/// presentation) through the same codec as [`UmaClient::codec`](crate::negotiation::UmaClient).
	fn to_json<T>(&self, value: &T) -> Result<Vec<u8>, CodecError>
	where
		T: ?Sized + Serialize;

	/// Deserializes `bytes` into `T`.
	fn from_json<T>(&self, bytes: &[u8]) -> Result<T, CodecError>
	where
		T: DeserializeOwned;
}

/// Default [`JsonCodec`] backed by `serde_json` + `serde_path_to_error`.
#[derive(Clone, Copy, Debug, Default)]
pub struct SerdeJsonCodec;
impl JsonCodec for SerdeJsonCodec {
	fn to_json<T>(&self, value: &T) -> Result<Vec<u8>, CodecError>
	where
		T: ?Sized + Serialize,
	{
		let mut buf = Vec::new();
		let mut serializer = serde_json::Serializer::new(&mut buf);

		serde_path_to_error::serialize(value, &mut serializer).map_err(|e| CodecError::Encode {
			path: e.path().to_string(),
			source: Box::new(e.into_inner()),
		})?;

		Ok(buf)
	}

	fn from_json<T>(&self, bytes: &[u8]) -> Result<T, CodecError>
	where
		T: DeserializeOwned,
	{
		let mut deserializer = serde_json::Deserializer::from_slice(bytes);
		let value = serde_path_to_error::deserialize(&mut deserializer).map_err(|e| {
			CodecError::Decode { path: e.path().to_string(), source: Box::new(e.into_inner()) }
		})?;

		deserializer.end().map_err(|e| CodecError::Decode {
			path: ".".into(),
			source: Box::new(e),
		})?;

		Ok(value)
	}
}
