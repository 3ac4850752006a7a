//! UMA 2.0 wire types.
//!
//! Covers server metadata, token requests and responses, and a failure classifier that never
//! rejects a body.

pub mod error_response;
pub mod metadata;
pub mod request;
pub mod response;

pub use error_response::*;
pub use metadata::*;
pub use request::*;
pub use response::*;

/// Grant type identifier of the UMA ticket grant.
pub const UMA_TICKET_GRANT: &str = "urn:ietf:params:oauth:grant-type:uma-ticket";
