use p256::ecdsa::signature::{RandomizedSigner, Verifier};
use p256::ecdsa::{Signature, SigningKey, VerifyingKey};
use p256::elliptic_curve::sec1::ToEncodedPoint;
use p256::{EncodedPoint, FieldBytes};
use rand::rngs::OsRng;
use ripemd::Ripemd160;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;

use std::fmt;
use std::str::FromStr;

/// Version byte prepended to the RIPEMD-160 payload for the main network.
const ADDRESS_VERSION: u8 = 0x00;

/// Byte width of one P-256 coordinate or scalar.
const COORDINATE_BYTES: usize = 32;

/// Errors that can occur during cryptographic operations
#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("Invalid public key: {0}")]
    InvalidPublicKey(String),

    #[error("Invalid private key: {0}")]
    InvalidPrivateKey(String),

    #[error("Invalid signature: {0}")]
    InvalidSignature(String),

    #[error("Decoding error: {0}")]
    DecodingError(String),
}

/// SHA-256 digest of arbitrary bytes.
pub fn sha256(data: &[u8]) -> [u8; 32] {
    Sha256::digest(data).into()
}

/// Represents a blockchain address (Base58 hash of a public key)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Address(pub String);

impl Address {
    /// Derives an address from a public key.
    ///
    /// The pipeline is SHA-256 over the concatenated coordinates,
    /// RIPEMD-160 over that digest, a version byte in front, a 4-byte
    /// double-SHA-256 checksum behind, and Base58 over the 25 bytes.
    pub fn from_public_key(public_key: &VerifyingKey) -> Self {
        let point = public_key.to_encoded_point(false);
        // Uncompressed SEC1 is 0x04 || x || y; skip the tag byte.
        let coordinates = &point.as_bytes()[1..];

        let digest = Sha256::digest(coordinates);
        let hash160 = Ripemd160::digest(digest);

        let mut payload = [0u8; 25];
        payload[0] = ADDRESS_VERSION;
        payload[1..21].copy_from_slice(&hash160);

        let checksum = Sha256::digest(Sha256::digest(&payload[..21]));
        payload[21..].copy_from_slice(&checksum[..4]);

        Address(bs58::encode(payload).into_string())
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Address {
    type Err = CryptoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let payload = bs58::decode(s)
            .into_vec()
            .map_err(|e| CryptoError::DecodingError(e.to_string()))?;

        if payload.len() != 25 {
            return Err(CryptoError::DecodingError(format!(
                "Address payload must be 25 bytes, got {}",
                payload.len()
            )));
        }

        let checksum = Sha256::digest(Sha256::digest(&payload[..21]));
        if payload[21..] != checksum[..4] {
            return Err(CryptoError::DecodingError(
                "Address checksum mismatch".to_string(),
            ));
        }

        Ok(Address(s.to_string()))
    }
}

/// Represents an ECDSA signature with a fixed-width hex wire form
#[derive(Debug, Clone)]
pub struct DigitalSignature(Signature);

impl DigitalSignature {
    /// Encodes the signature as `r || s`, each scalar zero-padded to 32
    /// bytes, as a 128-character hex string.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0.to_bytes())
    }

    /// Decodes the fixed-width hex form produced by [`Self::to_hex`].
    pub fn from_hex(s: &str) -> Result<Self, CryptoError> {
        let bytes = hex::decode(s).map_err(|e| CryptoError::DecodingError(e.to_string()))?;

        if bytes.len() != COORDINATE_BYTES * 2 {
            return Err(CryptoError::InvalidSignature(format!(
                "Signature must be {} bytes, got {}",
                COORDINATE_BYTES * 2,
                bytes.len()
            )));
        }

        Signature::from_slice(&bytes)
            .map(DigitalSignature)
            .map_err(|e| CryptoError::InvalidSignature(e.to_string()))
    }

    pub fn as_inner(&self) -> &Signature {
        &self.0
    }
}

impl fmt::Display for DigitalSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

/// Encodes a public key as both coordinates concatenated, each zero-padded
/// to 32 bytes, as a 128-character hex string.
pub fn public_key_to_hex(public_key: &VerifyingKey) -> String {
    let point = public_key.to_encoded_point(false);
    hex::encode(&point.as_bytes()[1..])
}

/// Decodes a public key from the hex form produced by [`public_key_to_hex`].
///
/// Fails closed on malformed hex, wrong length, or a point that is not on
/// the curve.
pub fn public_key_from_hex(s: &str) -> Result<VerifyingKey, CryptoError> {
    let bytes = hex::decode(s).map_err(|e| CryptoError::DecodingError(e.to_string()))?;

    if bytes.len() != COORDINATE_BYTES * 2 {
        return Err(CryptoError::InvalidPublicKey(format!(
            "Public key must be {} bytes, got {}",
            COORDINATE_BYTES * 2,
            bytes.len()
        )));
    }

    let x = FieldBytes::clone_from_slice(&bytes[..COORDINATE_BYTES]);
    let y = FieldBytes::clone_from_slice(&bytes[COORDINATE_BYTES..]);
    let point = EncodedPoint::from_affine_coordinates(&x, &y, false);

    VerifyingKey::from_encoded_point(&point)
        .map_err(|e| CryptoError::InvalidPublicKey(e.to_string()))
}

/// Represents a wallet with a P-256 keypair and its derived address
#[derive(Debug, Clone)]
pub struct Wallet {
    signing_key: SigningKey,
    verifying_key: VerifyingKey,
    address: Address,
}

impl Wallet {
    /// Creates a new wallet with a random keypair
    pub fn new() -> Self {
        let signing_key = SigningKey::random(&mut OsRng);
        let verifying_key = *signing_key.verifying_key();
        let address = Address::from_public_key(&verifying_key);

        Wallet {
            signing_key,
            verifying_key,
            address,
        }
    }

    /// Recreates a wallet from a hex-encoded private scalar
    pub fn from_private_key_hex(s: &str) -> Result<Self, CryptoError> {
        let bytes = hex::decode(s).map_err(|e| CryptoError::DecodingError(e.to_string()))?;

        let signing_key = SigningKey::from_slice(&bytes)
            .map_err(|e| CryptoError::InvalidPrivateKey(e.to_string()))?;
        let verifying_key = *signing_key.verifying_key();
        let address = Address::from_public_key(&verifying_key);

        Ok(Wallet {
            signing_key,
            verifying_key,
            address,
        })
    }

    /// Gets the wallet's address
    pub fn address(&self) -> &Address {
        &self.address
    }

    /// Gets the wallet's public key
    pub fn public_key(&self) -> &VerifyingKey {
        &self.verifying_key
    }

    /// Hex encoding of the private scalar, zero-padded to 32 bytes
    pub fn private_key_hex(&self) -> String {
        hex::encode(self.signing_key.to_bytes())
    }

    /// Hex encoding of the public key, both coordinates concatenated
    pub fn public_key_hex(&self) -> String {
        public_key_to_hex(&self.verifying_key)
    }

    /// Signs a message with the wallet's private key.
    ///
    /// The message is digested with SHA-256 and signed with ECDSA using a
    /// fresh random nonce per signature.
    pub fn sign(&self, message: &[u8]) -> DigitalSignature {
        DigitalSignature(self.signing_key.sign_with_rng(&mut OsRng, message))
    }
}

impl Default for Wallet {
    fn default() -> Self {
        Self::new()
    }
}

/// Verifies a signature against a message and public key.
///
/// Fails closed: any malformed input verifies as false.
pub fn verify_signature(
    message: &[u8],
    signature: &DigitalSignature,
    public_key: &VerifyingKey,
) -> bool {
    public_key.verify(message, signature.as_inner()).is_ok()
}
