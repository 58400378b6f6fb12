//! Identity resolution: from a claimed key id to a verification key.

use lockbox_core::{CoreError, Ed25519PublicKey, KeyId};

/// Looks up the verification key for a key id.
///
/// Implementations backed by a directory or sigchain can refuse ids they do
/// not know; the verifier reports any failure as an unsupported key.
pub trait IdentityResolver: Send + Sync {
    fn public_key_for(&self, kid: &KeyId) -> Result<Ed25519PublicKey, CoreError>;
}

/// Resolver that reads the key straight out of the id.
#[derive(Debug, Clone, Copy, Default)]
pub struct KeyIdResolver;

impl IdentityResolver for KeyIdResolver {
    fn public_key_for(&self, kid: &KeyId) -> Result<Ed25519PublicKey, CoreError> {
        kid.verifying_key()
    }
}
