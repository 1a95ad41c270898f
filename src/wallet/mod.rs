//! Signing identity management.
//!
//! A [`KeyStore`] holds at most one secp256k1 identity, derived from a raw
//! private key or bound watch-only to an address. Key material lives only in
//! memory and is erased on drop; it is never logged, serialized, or
//! transmitted.

pub mod typed_data;

use crate::core::errors::ClientError;
use secp256k1::ecdsa::RecoverableSignature;
use secp256k1::{Message, PublicKey, Secp256k1, SecretKey, SignOnly};
use serde::Serialize;
use sha3::{Digest, Keccak256};
use typed_data::{signing_digest, Eip712Domain, TypedStruct};
use zeroize::Zeroizing;

/// Ethereum-style recoverable ECDSA signature in r/s/v form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EcdsaSignature {
    pub r: String,
    pub s: String,
    pub v: u8,
}

impl EcdsaSignature {
    fn from_recoverable(signature: &RecoverableSignature) -> Self {
        let (recovery_id, compact) = signature.serialize_compact();
        Self {
            r: format!("0x{}", hex::encode(&compact[..32])),
            s: format!("0x{}", hex::encode(&compact[32..])),
            v: 27 + recovery_id.to_i32() as u8,
        }
    }
}

/// Holder of the active signing identity.
pub struct KeyStore {
    secret_key: Option<SecretKey>,
    address: String,
    secp: Secp256k1<SignOnly>,
}

impl std::fmt::Debug for KeyStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyStore")
            .field("address", &self.address)
            .field("can_sign", &self.can_sign())
            .finish_non_exhaustive()
    }
}

impl KeyStore {
    /// Derive an identity from a raw hex private key, with or without a `0x`
    /// prefix. Replacing an identity means dropping the old store.
    pub fn from_private_key(raw_key: &str) -> Result<Self, ClientError> {
        let cleaned = raw_key.trim().trim_start_matches("0x");
        if cleaned.len() != 64 {
            return Err(ClientError::InvalidKey(
                "expected a 32-byte hex-encoded key".to_string(),
            ));
        }

        let key_bytes = Zeroizing::new(
            hex::decode(cleaned)
                .map_err(|e| ClientError::InvalidKey(format!("invalid hex encoding: {}", e)))?,
        );
        let secret_key = SecretKey::from_slice(&key_bytes)
            .map_err(|e| ClientError::InvalidKey(e.to_string()))?;

        let secp = Secp256k1::signing_only();
        let public_key = secret_key.public_key(&secp);
        let address = public_key_to_address(&public_key);

        Ok(Self {
            secret_key: Some(secret_key),
            address,
            secp,
        })
    }

    /// Bind an address without its key. Signing operations fail with
    /// [`ClientError::NotInitialized`]; reads keyed by address still work.
    pub fn watch_only(address: &str) -> Result<Self, ClientError> {
        let hex_part = address.strip_prefix("0x").ok_or_else(|| {
            ClientError::InvalidKey("address must carry a 0x prefix".to_string())
        })?;
        if hex_part.len() != 40 || !hex_part.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(ClientError::InvalidKey(
                "expected a 20-byte hex-encoded address".to_string(),
            ));
        }

        Ok(Self {
            secret_key: None,
            address: address.to_ascii_lowercase(),
            secp: Secp256k1::signing_only(),
        })
    }

    /// The 0x-prefixed address of this identity.
    #[must_use]
    pub fn address(&self) -> &str {
        &self.address
    }

    /// Whether a signing key is present.
    #[must_use]
    pub fn can_sign(&self) -> bool {
        self.secret_key.is_some()
    }

    /// Sign an arbitrary payload under the standard signed-message envelope.
    pub fn sign(&self, payload: &[u8]) -> Result<EcdsaSignature, ClientError> {
        let mut hasher = Keccak256::new();
        hasher.update(format!("\x19Ethereum Signed Message:\n{}", payload.len()).as_bytes());
        hasher.update(payload);
        self.sign_digest(hasher.finalize().into())
    }

    /// Sign a typed structure under the given EIP-712 domain.
    pub fn sign_typed<T: TypedStruct>(
        &self,
        domain: &Eip712Domain,
        value: &T,
    ) -> Result<EcdsaSignature, ClientError> {
        self.sign_digest(signing_digest(domain, value))
    }

    /// Discard the identity, erasing the key material; dropping the store
    /// does the same.
    pub fn disconnect(self) {
        drop(self);
    }

    fn sign_digest(&self, digest: [u8; 32]) -> Result<EcdsaSignature, ClientError> {
        let secret_key = self.secret_key.as_ref().ok_or(ClientError::NotInitialized)?;
        let message = Message::from_digest_slice(&digest)
            .map_err(|e| ClientError::InvalidParameters(format!("bad digest: {}", e)))?;
        let signature = self.secp.sign_ecdsa_recoverable(&message, secret_key);
        Ok(EcdsaSignature::from_recoverable(&signature))
    }
}

impl Drop for KeyStore {
    fn drop(&mut self) {
        if let Some(secret_key) = self.secret_key.as_mut() {
            secret_key.non_secure_erase();
        }
    }
}

fn public_key_to_address(public_key: &PublicKey) -> String {
    let uncompressed = public_key.serialize_uncompressed();

    // Skip the 0x04 prefix, hash the raw 64-byte point, keep the last 20 bytes.
    let mut hasher = Keccak256::new();
    hasher.update(&uncompressed[1..]);
    let hash = hasher.finalize();

    format!("0x{}", hex::encode(&hash[12..]))
}
