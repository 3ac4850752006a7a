//! Caller-supplied claim gathering for `need_info` challenges.

// self
use crate::{_prelude::*, auth::ClaimToken, error::BoxError, uma::NeedInfo};

/// Result produced by a [`ClaimResolver`].
///
/// `Ok(None)` means the resolver has nothing to offer; the negotiation then ends with
/// [`Error::RequestDenied`].
pub type ResolverResult = Result<Option<ClaimToken>, ResolverError>;

/// Gathers a claim token that satisfies a `need_info` challenge.
///
/// Any `Fn(NeedInfo) -> impl Future<Output = ResolverResult>` closure is a resolver:
///
/// ```
/// use uma_negotiator::{
/// 	auth::ClaimToken,
/// 	negotiation::{ClaimResolver, ResolverResult},
/// 	uma::NeedInfo,
/// };
///
/// fn accepts<R: ClaimResolver>(_: R) {}
///
/// accepts(|_: NeedInfo| async { ResolverResult::Ok(Some(ClaimToken::id_token("id-token"))) });
/// ```
pub trait ClaimResolver
where
	Self: Send + Sync,
{
	/// Resolves one challenge.
	fn resolve(&self, need_info: NeedInfo) -> impl Future<Output = ResolverResult> + Send;
}
impl<F, Fut> ClaimResolver for F
where
	F: Send + Sync + Fn(NeedInfo) -> Fut,
	Fut: Send + Future<Output = ResolverResult>,
{
	fn resolve(&self, need_info: NeedInfo) -> impl Future<Output = ResolverResult> + Send {
		self(need_info)
	}
}

/// Resolver refused to continue the negotiation.
#[derive(Debug, ThisError)]
#[error("Claim resolver aborted the negotiation: {reason}.")]
pub struct ResolverError {
	reason: String,
	#[source]
	source: Option<BoxError>,
}
impl ResolverError {
	/// Creates an abort with a human-readable reason.
	pub fn new(reason: impl Into<String>) -> Self {
		Self { reason: reason.into(), source: None }
	}

	/// Attaches the failure that made the resolver give up.
	pub fn with_source(mut self, source: impl 'static + Send + Sync + StdError) -> Self {
		self.source = Some(Box::new(source));

		self
	}

	/// Why the resolver gave up.
	pub fn reason(&self) -> &str {
		&self.reason
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	fn challenge() -> NeedInfo {
		NeedInfo { ticket: "t".into(), required_claims: Vec::new(), redirect_user: None, status: None }
	}

	#[tokio::test]
	async fn closures_are_resolvers() {
		let resolver = |need_info: NeedInfo| async move {
			ResolverResult::Ok(Some(ClaimToken::id_token(format!("for-{}", need_info.ticket))))
		};
		let claim = resolver
			.resolve(challenge())
			.await
			.expect("Resolver should succeed.")
			.expect("Resolver should produce a claim.");

		assert_eq!(claim.value().expose(), "for-t");
	}

	#[tokio::test]
	async fn errors_keep_reason_and_source() {
		let resolver = |_: NeedInfo| async {
			ResolverResult::Err(
				ResolverError::new("user cancelled")
					.with_source(std::io::Error::from(std::io::ErrorKind::Interrupted)),
			)
		};
		let err = resolver.resolve(challenge()).await.expect_err("Resolver should fail.");

		assert_eq!(err.reason(), "user cancelled");
		assert!(StdError::source(&err).is_some());
		assert_eq!(err.to_string(), "Claim resolver aborted the negotiation: user cancelled.");
	}
}
