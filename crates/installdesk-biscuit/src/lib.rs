//! # installdesk-biscuit
//!
//! Session tokens for InstallDesk.
//!
//! A session token is a Biscuit whose authority block carries the signed-in
//! user and role, plus a check that fails once the token has expired:
//!
//! ```text
//! user("0f8fad5b-d9cb-469f-a165-70867728950e");
//! role("manager");
//! issued_at(1718000000);
//! check if time($time), $time < 1718086400;
//! ```
//!
//! The server verifies the token on every request and loads the profile for
//! the user it names.

pub mod claims;
pub mod error;
pub mod keys;
pub mod token;

pub use biscuit_auth::PublicKey;
pub use claims::SessionClaims;
pub use error::BiscuitError;
pub use keys::KeyPair;
pub use token::{SessionIssuer, SessionVerifier, VerifiedSession};
