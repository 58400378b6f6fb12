//! Golden test vectors for the signed-request format.
//!
//! Any client implementation must reproduce these strings and signatures
//! byte for byte.

use lockbox_auth::{SignedRequest, Signer};
use lockbox_core::{Keypair, Nonce, NONCE_LEN};

/// A golden test vector.
#[derive(Debug, Clone)]
pub struct GoldenVector {
    pub name: &'static str,
    /// Ed25519 seed.
    pub seed: [u8; 32],
    pub method: &'static str,
    /// URL before stamping, query in any order.
    pub url: &'static str,
    pub body: &'static [u8],
    /// Nonce bytes (hex).
    pub nonce_hex: &'static str,
    pub timestamp: i64,
    /// Expected public key (hex).
    pub expected_public_key: &'static str,
    pub expected_bytes_to_sign: &'static str,
    /// Expected signature (base64).
    pub expected_signature: &'static str,
}

const NONCE_1_TO_32: &str = "0102030405060708090a0b0c0d0e0f101112131415161718191a1b1c1d1e1f20";

/// Every vector, in a fixed order.
pub fn all_vectors() -> Vec<GoldenVector> {
    vec![
        GoldenVector {
            name: "GET with unsorted query",
            seed: [0x42; 32],
            method: "GET",
            url: "https://lockbox.example/channel/abc/msgs?limit=10&dir=asc",
            body: b"",
            nonce_hex: NONCE_1_TO_32,
            timestamp: 1736870400000,
            expected_public_key: "2152f8d19b791d24453242e15f2eab6cb7cffa7b6a5ed30097960e069881db12",
            expected_bytes_to_sign: "GET,https://lockbox.example/channel/abc/msgs?dir=asc&limit=10&nonce=Eoh211G4c8wtVWM00my5rsNSFlKgaWqQ4mb8gdEqno&ts=1736870400000,",
            expected_signature: "tI7bkQHIyC6Euo+s/M+LwrnxI3NdAuSnuqCBTtGZQlbyV/PAcu4LIFBuu2kTCd8WL1vm48+3jA4E2esLfEocDw==",
        },
        GoldenVector {
            name: "POST with body hash",
            seed: [0x42; 32],
            method: "POST",
            url: "https://lockbox.example/vault/data",
            body: b"hello",
            nonce_hex: NONCE_1_TO_32,
            timestamp: 1736870400000,
            expected_public_key: "2152f8d19b791d24453242e15f2eab6cb7cffa7b6a5ed30097960e069881db12",
            expected_bytes_to_sign: "POST,https://lockbox.example/vault/data?nonce=Eoh211G4c8wtVWM00my5rsNSFlKgaWqQ4mb8gdEqno&ts=1736870400000,LPJNul+wow4m6DsqxbninhsWHlwfp0JecwQzYpOLmCQ=",
            expected_signature: "eRukNTT53iMjxd9/ZE0elgXq2voF3vssz4+ZNJpMwjEV0T0kS0xZZ+lC+BSaTjaf1YsY0ZajItX8Epha5qSGBg==",
        },
    ]
}

/// Decode a vector's nonce.
pub fn vector_nonce(vector: &GoldenVector) -> Nonce {
    let mut bytes = [0u8; NONCE_LEN];
    hex::decode_to_slice(vector.nonce_hex, &mut bytes).expect("golden nonce is 32 hex bytes");
    Nonce::from_bytes(bytes)
}

/// Sign a golden vector.
pub fn sign_vector(vector: &GoldenVector) -> SignedRequest {
    let signer = Signer::new(Keypair::from_seed(&vector.seed));
    signer
        .sign_with_nonce(
            vector.method,
            vector.url,
            &lockbox_core::content_hash(vector.body),
            vector.timestamp,
            vector_nonce(vector),
        )
        .expect("golden URL is absolute")
}

/// Check every vector; returns `(name, matches, bytes_to_sign)`.
pub fn verify_all_vectors() -> Vec<(String, bool, String)> {
    all_vectors()
        .iter()
        .map(|v| {
            let signed = sign_vector(v);
            let matches = signed.bytes_to_sign == v.expected_bytes_to_sign
                && signed.signature.to_base64() == v.expected_signature
                && Keypair::from_seed(&v.seed).public_key().to_hex() == v.expected_public_key;
            (v.name.to_string(), matches, signed.bytes_to_sign)
        })
        .collect()
}
