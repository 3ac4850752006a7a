//! Auth-domain values: scope sets, redacted secrets, and claim tokens.

pub mod claim;
pub mod scope;
pub mod secret;

pub use claim::*;
pub use scope::*;
pub use secret::*;
