//! Interaction signature verification
//!
//! Discord signs every HTTP interaction with the application's Ed25519 key.
//! The signed message is the `X-Signature-Timestamp` header value followed
//! by the raw request body; the signature arrives hex-encoded in
//! `X-Signature-Ed25519`.
//!
//! # Security
//!
//! Requests that fail verification must be rejected with 401 before the
//! body is parsed. Discord periodically sends deliberately bad signatures
//! to check that this happens.

use ed25519_dalek::{Signature, Verifier, VerifyingKey, PUBLIC_KEY_LENGTH, SIGNATURE_LENGTH};
use sdk::errors::BotError;

/// Verifies interaction requests against the application public key
#[derive(Debug, Clone)]
pub struct SignatureVerifier {
    public_key: VerifyingKey,
}

impl SignatureVerifier {
    pub fn new(public_key: VerifyingKey) -> Self {
        Self { public_key }
    }

    /// Parse the hex public key shown in the developer portal
    ///
    /// # Errors
    ///
    /// Returns `BotError::Config` if the key is not 32 bytes of valid hex or
    /// is not a valid curve point.
    pub fn from_hex(public_key_hex: &str) -> Result<Self, BotError> {
        let bytes = hex::decode(public_key_hex.trim())
            .map_err(|e| BotError::Config(format!("Public key is not valid hex: {}", e)))?;

        let key_bytes: [u8; PUBLIC_KEY_LENGTH] = bytes.try_into().map_err(|b: Vec<u8>| {
            BotError::Config(format!(
                "Invalid public key length: expected {}, got {}",
                PUBLIC_KEY_LENGTH,
                b.len()
            ))
        })?;

        let public_key = VerifyingKey::from_bytes(&key_bytes)
            .map_err(|e| BotError::Config(format!("Invalid public key: {}", e)))?;

        Ok(Self::new(public_key))
    }

    /// Check `signature_hex` over `timestamp || body`
    ///
    /// # Errors
    ///
    /// Returns `BotError::InvalidSignature` on malformed or mismatching
    /// signatures.
    pub fn verify(&self, timestamp: &str, body: &[u8], signature_hex: &str) -> Result<(), BotError> {
        let signature = parse_signature(signature_hex)?;

        let mut message = Vec::with_capacity(timestamp.len() + body.len());
        message.extend_from_slice(timestamp.as_bytes());
        message.extend_from_slice(body);

        self.public_key.verify(&message, &signature).map_err(|e| {
            tracing::debug!("Interaction signature rejected: {}", e);
            BotError::InvalidSignature
        })
    }
}

fn parse_signature(signature_hex: &str) -> Result<Signature, BotError> {
    let bytes = hex::decode(signature_hex.trim()).map_err(|e| {
        tracing::debug!("Failed to decode signature hex: {}", e);
        BotError::InvalidSignature
    })?;

    let sig_bytes: [u8; SIGNATURE_LENGTH] = bytes.try_into().map_err(|b: Vec<u8>| {
        tracing::debug!(
            "Invalid signature length: expected {}, got {}",
            SIGNATURE_LENGTH,
            b.len()
        );
        BotError::InvalidSignature
    })?;

    Ok(Signature::from_bytes(&sig_bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ed25519_dalek::{Signer, SigningKey};

    fn keypair() -> (SigningKey, SignatureVerifier) {
        let signing = SigningKey::from_bytes(&[7u8; 32]);
        let verifier = SignatureVerifier::from_hex(&hex::encode(signing.verifying_key().as_bytes()))
            .unwrap();
        (signing, verifier)
    }

    #[test]
    fn test_valid_signature() {
        let (signing, verifier) = keypair();
        let body = br#"{"type":1}"#;
        let signature = signing.sign(&[b"1700000000".as_slice(), body].concat());

        verifier
            .verify("1700000000", body, &hex::encode(signature.to_bytes()))
            .unwrap();
    }

    #[test]
    fn test_timestamp_is_part_of_message() {
        let (signing, verifier) = keypair();
        let body = br#"{"type":1}"#;
        let signature = signing.sign(&[b"1700000000".as_slice(), body].concat());

        let result = verifier.verify("1700000001", body, &hex::encode(signature.to_bytes()));
        assert!(matches!(result, Err(BotError::InvalidSignature)));
    }

    #[test]
    fn test_garbage_signature() {
        let (_, verifier) = keypair();
        assert!(matches!(
            verifier.verify("1", b"{}", "not hex"),
            Err(BotError::InvalidSignature)
        ));
        assert!(matches!(
            verifier.verify("1", b"{}", "abcd"),
            Err(BotError::InvalidSignature)
        ));
    }

    #[test]
    fn test_bad_public_key() {
        assert!(matches!(
            SignatureVerifier::from_hex("zz"),
            Err(BotError::Config(_))
        ));
        assert!(matches!(
            SignatureVerifier::from_hex("abcd"),
            Err(BotError::Config(_))
        ));
    }
}
