use crate::*;
use uuid::Uuid;

/// Homomorphic arithmetic over encrypted handles.
///
/// The tally engine never sees plaintext: every operation here returns a new
/// handle whose value only the backend (and whoever it grants rights to) can read.
pub trait HomomorphicArithmetic {
    /// Verify the proof of an encrypted input and import its values.
    ///
    /// Fails with [`Error::InvalidProof`] if the proof is malformed or bound to a
    /// different context or caller.
    fn verify_and_ingest(
        &mut self,
        input: &EncryptedInput,
        context: &ContractContext,
        caller: &Identity,
    ) -> Result<Vec<EncryptedValue>, Error>;

    /// Encrypt a public constant
    fn trivial_encrypt(&mut self, value: u64, kind: CipherKind) -> Result<EncryptedValue, Error>;

    fn add(&mut self, lhs: &EncryptedValue, rhs: &EncryptedValue)
        -> Result<EncryptedValue, Error>;

    fn sub(&mut self, lhs: &EncryptedValue, rhs: &EncryptedValue)
        -> Result<EncryptedValue, Error>;

    /// Encrypted boolean `lhs == rhs`
    fn eq_scalar(&mut self, lhs: &EncryptedValue, rhs: u64) -> Result<EncryptedValue, Error>;

    /// `if condition { if_true } else { if_false }` without revealing the condition
    fn select(
        &mut self,
        condition: &EncryptedValue,
        if_true: &EncryptedValue,
        if_false: &EncryptedValue,
    ) -> Result<EncryptedValue, Error>;

    /// Grant `identity` the right to decrypt `value`
    fn allow(&mut self, value: &EncryptedValue, identity: &Identity);

    /// Cast an encrypted boolean to an encrypted 0 or 1
    fn bool_to_u32(&mut self, value: &EncryptedValue) -> Result<EncryptedValue, Error> {
        let one = self.trivial_encrypt(1, CipherKind::U32)?;
        let zero = self.trivial_encrypt(0, CipherKind::U32)?;
        self.select(value, &one, &zero)
    }
}

/// Identifies one decryption request sent to a [`DecryptionOracle`]
#[derive(Serialize, Deserialize, Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct RequestId(pub Uuid);

impl RequestId {
    pub fn new() -> Self {
        RequestId(Uuid::new_v4())
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Asynchronous public decryption.
///
/// A request returns immediately. The plaintexts are delivered later, in request
/// order, to [`TallyEngine::on_decrypted`] - or never, if the oracle fails.
pub trait DecryptionOracle {
    fn request_decryption(&mut self, values: &[EncryptedValue]) -> Result<RequestId, Error>;
}

/// Plaintexts delivered by the oracle for one request
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct DecryptionResult {
    pub request_id: RequestId,
    pub plaintexts: Vec<u64>,
}

/// Everything a tally engine needs from the outside world
pub trait FheBackend: HomomorphicArithmetic + DecryptionOracle {}

impl<T: HomomorphicArithmetic + DecryptionOracle> FheBackend for T {}
