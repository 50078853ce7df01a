//! Credential normalization
//!
//! A robot logon always carries a 32-byte token. Callers may hand over either
//! a plaintext passphrase, which is hashed locally with SHA-256, or the
//! base64 text of an already-hashed credential, which is passed through.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use sha2::{Digest, Sha256};
use std::fmt;

/// Length of an authentication token in bytes (SHA-256 digest size)
pub const AUTH_TOKEN_LENGTH: usize = 32;

// Standard base64 of 32 bytes is 44 characters ending in a single '='
const ENCODED_TOKEN_LENGTH: usize = 44;
const BASE64_PADDING: u8 = b'=';

/// Authentication token presented to the robot at logon
///
/// The token value is masked in `Debug` output so it never reaches the logs.
#[derive(Clone, PartialEq, Eq)]
pub struct AuthToken([u8; AUTH_TOKEN_LENGTH]);

impl AuthToken {
    /// Creates a token from raw bytes
    pub fn from_bytes(bytes: [u8; AUTH_TOKEN_LENGTH]) -> Self {
        Self(bytes)
    }

    /// Returns the raw token bytes
    pub fn as_bytes(&self) -> &[u8; AUTH_TOKEN_LENGTH] {
        &self.0
    }

    /// Encodes the token as standard padded base64
    ///
    /// The result is accepted by [`CredentialCodec::normalize`] as a
    /// pre-hashed credential.
    pub fn to_base64(&self) -> String {
        STANDARD.encode(self.0)
    }
}

impl fmt::Debug for AuthToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("AuthToken").field(&"[REDACTED]").finish()
    }
}

/// Turns user-supplied credentials into authentication tokens
pub struct CredentialCodec;

impl CredentialCodec {
    /// Normalizes a credential string into an authentication token
    ///
    /// Input shaped like the base64 encoding of 32 bytes (44 characters,
    /// trailing `=`) is decoded and used as-is. Anything else, including
    /// input of that shape which fails to decode to exactly 32 bytes, is
    /// hashed with SHA-256. This never fails.
    ///
    /// # Examples
    ///
    /// ```
    /// use remote_robot::security::CredentialCodec;
    ///
    /// let token = CredentialCodec::normalize("hunter2");
    /// let again = CredentialCodec::normalize(&token.to_base64());
    /// assert_eq!(token, again);
    /// ```
    pub fn normalize(credential: &str) -> AuthToken {
        Self::decode_prehashed(credential).unwrap_or_else(|| Self::hash(credential))
    }

    /// Returns true if the credential has the shape of a pre-hashed token
    pub fn looks_prehashed(credential: &str) -> bool {
        let bytes = credential.as_bytes();
        bytes.len() == ENCODED_TOKEN_LENGTH && bytes[ENCODED_TOKEN_LENGTH - 1] == BASE64_PADDING
    }

    fn decode_prehashed(credential: &str) -> Option<AuthToken> {
        if !Self::looks_prehashed(credential) {
            return None;
        }

        let decoded = STANDARD.decode(credential).ok()?;
        let bytes: [u8; AUTH_TOKEN_LENGTH] = decoded.try_into().ok()?;
        Some(AuthToken(bytes))
    }

    fn hash(credential: &str) -> AuthToken {
        let digest = Sha256::digest(credential.as_bytes());
        AuthToken(digest.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sha256(input: &[u8]) -> [u8; AUTH_TOKEN_LENGTH] {
        Sha256::digest(input).into()
    }

    #[test]
    fn test_plaintext_is_hashed() {
        let token = CredentialCodec::normalize("hunter2");
        assert_eq!(token.as_bytes(), &sha256(b"hunter2"));
    }

    #[test]
    fn test_prehashed_passes_through() {
        let original: [u8; AUTH_TOKEN_LENGTH] = std::array::from_fn(|i| (i * 7) as u8);
        let encoded = STANDARD.encode(original);
        assert_eq!(encoded.len(), 44);
        assert!(encoded.ends_with('='));

        let token = CredentialCodec::normalize(&encoded);
        assert_eq!(token.as_bytes(), &original);
    }

    #[test]
    fn test_wrong_shape_takes_hashing_path() {
        // 44 characters without padding
        let unpadded = "A".repeat(44);
        assert_eq!(
            CredentialCodec::normalize(&unpadded).as_bytes(),
            &sha256(unpadded.as_bytes())
        );

        // padded but the wrong length
        let short = format!("{}=", "A".repeat(42));
        assert_eq!(
            CredentialCodec::normalize(&short).as_bytes(),
            &sha256(short.as_bytes())
        );

        assert_eq!(CredentialCodec::normalize("").as_bytes(), &sha256(b""));
    }

    #[test]
    fn test_undecodable_prehashed_falls_back_to_hash() {
        // right shape, but '!' is not in the base64 alphabet
        let bogus = format!("{}=", "!".repeat(43));
        assert!(CredentialCodec::looks_prehashed(&bogus));
        assert_eq!(
            CredentialCodec::normalize(&bogus).as_bytes(),
            &sha256(bogus.as_bytes())
        );

        // decodes cleanly, but to 31 bytes
        let short_payload = STANDARD.encode([0xabu8; 31]);
        assert!(CredentialCodec::looks_prehashed(&short_payload));
        assert_eq!(
            CredentialCodec::normalize(&short_payload).as_bytes(),
            &sha256(short_payload.as_bytes())
        );
    }

    #[test]
    fn test_debug_is_redacted() {
        let token = CredentialCodec::normalize("hunter2");
        let rendered = format!("{:?}", token);
        assert!(rendered.contains("REDACTED"));
        assert!(!rendered.contains(&token.to_base64()));
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn any_other_shape_is_hashed(credential in any::<String>()) {
                prop_assume!(!CredentialCodec::looks_prehashed(&credential));
                let token = CredentialCodec::normalize(&credential);
                prop_assert_eq!(token.as_bytes(), &sha256(credential.as_bytes()));
            }

            #[test]
            fn unpadded_44_chars_are_hashed(credential in "[A-Za-z0-9+/]{44}") {
                let token = CredentialCodec::normalize(&credential);
                prop_assert_eq!(token.as_bytes(), &sha256(credential.as_bytes()));
            }

            #[test]
            fn other_lengths_are_hashed(credential in "[A-Za-z0-9+/]{0,42}=") {
                let token = CredentialCodec::normalize(&credential);
                prop_assert_eq!(token.as_bytes(), &sha256(credential.as_bytes()));
            }

            #[test]
            fn encoded_tokens_pass_through(bytes in any::<[u8; AUTH_TOKEN_LENGTH]>()) {
                let encoded = STANDARD.encode(bytes);
                prop_assert!(CredentialCodec::looks_prehashed(&encoded));
                let token = CredentialCodec::normalize(&encoded);
                prop_assert_eq!(token.as_bytes(), &bytes);
            }
        }
    }
}
