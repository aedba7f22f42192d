use ed25519_dalek::Keypair;
use ed25519_dalek::PublicKey;
use ed25519_dalek::SecretKey;
use rand::Rng;

/// Opaque identity of a caller.
///
/// Authentication happens outside this crate; the identity is whatever the caller
/// was authenticated as. Identities built from an ed25519 public key can sign
/// encrypted inputs (see [`EncryptedInputBuilder`](crate::EncryptedInputBuilder)).
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Identity([u8; 32]);

hex_bytes_newtype!(Identity);

impl Identity {
    /// Interpret the identity as an ed25519 public key
    pub fn public_key(&self) -> Result<PublicKey, ed25519_dalek::SignatureError> {
        PublicKey::from_bytes(&self.0)
    }
}

impl From<&PublicKey> for Identity {
    fn from(public_key: &PublicKey) -> Self {
        Identity(public_key.to_bytes())
    }
}

/// The context an election or counter lives in (e.g. its contract address).
///
/// Encrypted inputs are bound to one context and cannot be replayed in another.
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContractContext([u8; 32]);

hex_bytes_newtype!(ContractContext);

impl ContractContext {
    /// Create a new random context
    pub fn random() -> Self {
        let mut csprng = rand::rngs::OsRng {};
        ContractContext(csprng.gen())
    }
}

pub fn generate_keypair() -> (SecretKey, PublicKey) {
    let mut csprng = rand::rngs::OsRng {};
    let Keypair { public, secret } = Keypair::generate(&mut csprng);
    (secret, public)
}

/// Generate a fresh keypair and the identity it signs for
pub fn generate_identity() -> (SecretKey, Identity) {
    let (secret, public) = generate_keypair();
    (secret, Identity::from(&public))
}
