//! Key identifiers.
//!
//! A [`KeyId`] is the stable textual form of a public key. It names the
//! caller in an `Authorization` header and the owner of a vault in a path.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::crypto::Ed25519PublicKey;
use crate::error::CoreError;

/// The kind of key a [`KeyId`] encodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum KeyType {
    /// Ed25519 signing key.
    EdX25519,
    /// X25519 box key. Identifies a recipient but cannot verify signatures.
    X25519,
}

impl KeyType {
    /// Human-readable prefix used in the text form.
    pub const fn hrp(&self) -> &'static str {
        match self {
            KeyType::EdX25519 => "kex",
            KeyType::X25519 => "kbx",
        }
    }

    /// Look up a key type by its prefix.
    pub fn from_hrp(hrp: &str) -> Option<Self> {
        match hrp {
            "kex" => Some(KeyType::EdX25519),
            "kbx" => Some(KeyType::X25519),
            _ => None,
        }
    }
}

/// Identity of a public key: `<hrp>_<64 hex chars>`.
///
/// Immutable once derived. Doubles as tenant identifier and path segment,
/// so the text form never contains `:` or `/`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct KeyId {
    key_type: KeyType,
    bytes: [u8; 32],
}

impl KeyId {
    /// Separator between the prefix and the key bytes.
    pub const SEPARATOR: char = '_';

    /// Create a key id from its parts.
    pub const fn new(key_type: KeyType, bytes: [u8; 32]) -> Self {
        Self { key_type, bytes }
    }

    /// Key id of an Ed25519 public key.
    pub const fn ed25519(public_key: &Ed25519PublicKey) -> Self {
        Self::new(KeyType::EdX25519, public_key.0)
    }

    /// The encoded key type.
    pub const fn key_type(&self) -> KeyType {
        self.key_type
    }

    /// The raw public key bytes.
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.bytes
    }

    /// Parse the text form.
    pub fn parse(s: &str) -> Result<Self, CoreError> {
        let (hrp, encoded) = s
            .split_once(Self::SEPARATOR)
            .ok_or_else(|| CoreError::InvalidKeyId(format!("missing separator in {:?}", s)))?;

        let key_type = KeyType::from_hrp(hrp)
            .ok_or_else(|| CoreError::InvalidKeyId(format!("unknown key prefix {:?}", hrp)))?;

        // Upper-case hex would give a second spelling of the same key.
        if encoded.bytes().any(|b| b.is_ascii_uppercase()) {
            return Err(CoreError::InvalidKeyId("key bytes must be lowercase hex".into()));
        }

        let decoded = hex::decode(encoded).map_err(|e| CoreError::InvalidKeyId(e.to_string()))?;
        let bytes: [u8; 32] = decoded
            .try_into()
            .map_err(|_| CoreError::InvalidKeyId("key must be 32 bytes".into()))?;

        Ok(Self { key_type, bytes })
    }

    /// Derive the Ed25519 verification key this id encodes.
    ///
    /// Fails with [`CoreError::UnsupportedKeyType`] for box keys and for
    /// bytes that are not a valid curve point.
    pub fn verifying_key(&self) -> Result<Ed25519PublicKey, CoreError> {
        match self.key_type {
            KeyType::EdX25519 => {
                let pk = Ed25519PublicKey::from_bytes(self.bytes);
                pk.check()?;
                Ok(pk)
            }
            KeyType::X25519 => Err(CoreError::UnsupportedKeyType(format!(
                "{} is not a signing key",
                self
            ))),
        }
    }
}

impl fmt::Display for KeyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{}{}",
            self.key_type.hrp(),
            Self::SEPARATOR,
            hex::encode(self.bytes)
        )
    }
}

impl fmt::Debug for KeyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = self.to_string();
        write!(f, "KeyId({}...)", &s[..12])
    }
}

impl FromStr for KeyId {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for KeyId {
    type Error = CoreError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(&s)
    }
}

impl From<KeyId> for String {
    fn from(kid: KeyId) -> Self {
        kid.to_string()
    }
}
