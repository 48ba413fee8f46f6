//! Authentication against the identity provider guarding the API

pub mod authenticator;
pub mod challenge;
pub mod credentials;

pub use authenticator::{AuthState, Authenticator};
pub use challenge::{is_challenge, LoginChallenge, REDIRECT_MARKER};
pub use credentials::{CredentialSource, Credentials};
