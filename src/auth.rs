//! Auth-domain identifiers, redacted secrets, credentials, and client assertions.

pub mod assertion;
pub mod credential;
pub mod id;
pub mod secret;

pub use assertion::*;
pub use credential::*;
pub use id::*;
pub use secret::*;
