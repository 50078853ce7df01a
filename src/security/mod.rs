//! Security module for RemoteRobot
//!
//! This module contains the credential handling used when logging on to a
//! robot: normalization of the user-supplied credential into the fixed-size
//! authentication token the protocol expects.

pub mod credential;

// Re-export commonly used types
pub use credential::{AuthToken, CredentialCodec, AUTH_TOKEN_LENGTH};
