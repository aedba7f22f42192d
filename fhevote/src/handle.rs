use crate::*;
use num_enum::TryFromPrimitive;

/// Byte offset of the value type inside a handle
pub const HANDLE_KIND_BYTE: usize = 30;

/// Handle format version, stored in the last byte.
///
/// Non-zero so that an initialized handle can never equal the all-zero handle.
pub const HANDLE_VERSION: u8 = 1;

/// The plaintext type behind an encrypted value
#[derive(Serialize, Deserialize, TryFromPrimitive, Copy, Debug, Clone, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum CipherKind {
    Bool = 0,
    U32 = 4,
    U64 = 5,
}

impl CipherKind {
    /// Reduce a value to the range of this type
    pub fn wrap(self, value: u64) -> u64 {
        match self {
            CipherKind::Bool => value & 1,
            CipherKind::U32 => value as u32 as u64,
            CipherKind::U64 => value,
        }
    }

    /// Whether `value` fits this type without wrapping
    pub fn contains(self, value: u64) -> bool {
        self.wrap(value) == value
    }
}

impl std::fmt::Display for CipherKind {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let name = match self {
            CipherKind::Bool => "ebool",
            CipherKind::U32 => "euint32",
            CipherKind::U64 => "euint64",
        };
        write!(f, "{}", name)
    }
}

/// An opaque handle to an encrypted scalar.
///
/// The first 30 bytes identify the ciphertext, byte 30 carries the [`CipherKind`]
/// and byte 31 the handle version. The all-zero handle means "never written".
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EncryptedValue([u8; 32]);

hex_bytes_newtype!(EncryptedValue);

impl EncryptedValue {
    /// Build a handle from the first 30 bytes of a digest and a value type
    pub fn new(digest: &[u8; 32], kind: CipherKind) -> Self {
        let mut bytes = [0u8; 32];
        bytes[..HANDLE_KIND_BYTE].copy_from_slice(&digest[..HANDLE_KIND_BYTE]);
        bytes[HANDLE_KIND_BYTE] = kind as u8;
        bytes[31] = HANDLE_VERSION;
        EncryptedValue(bytes)
    }

    /// The handle of a value that has never been written
    pub fn uninitialized() -> Self {
        EncryptedValue([0; 32])
    }

    pub fn is_initialized(&self) -> bool {
        self.0 != [0; 32]
    }

    /// The value type, or None for the uninitialized handle or an unknown type byte
    pub fn kind(&self) -> Option<CipherKind> {
        if !self.is_initialized() {
            return None;
        }
        CipherKind::try_from_primitive(self.0[HANDLE_KIND_BYTE]).ok()
    }
}

/// Serialized zero-knowledge proof that the handles of an [`EncryptedInput`] were
/// correctly formed and are bound to one (context, caller) pair.
///
/// The contents are defined by the homomorphic backend that checks it.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct InputProof(#[serde(with = "hex::serde")] pub Vec<u8>);

/// Encrypted input as submitted by a caller: one handle per encrypted value plus a
/// single proof covering all of them.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct EncryptedInput {
    pub handles: Vec<EncryptedValue>,
    pub proof: InputProof,
}
