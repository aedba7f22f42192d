use crate::*;
use ed25519_dalek::ExpandedSecretKey;
use ed25519_dalek::PublicKey;
use ed25519_dalek::SecretKey;
use ed25519_dalek::Signature;
use indexmap::IndexMap;
use rand::Rng;
use sha2::{Digest, Sha256};
use std::collections::{HashMap, HashSet};
use std::convert::TryFrom;
use tracing::debug;

/// Everything the caller signs when producing an encrypted input
#[derive(Serialize)]
struct ProofPackage<'a> {
    context: &'a ContractContext,
    caller: &'a Identity,
    handles: &'a [EncryptedValue],
    values: &'a [(CipherKind, u64)],
}

/// The proof format understood by [`PlaintextFhe`]: the values themselves travel in
/// the clear, bound to (context, caller, handles) by the caller's signature.
///
/// Handles are recomputed from the nonce on ingestion, so an input can only name
/// handles derived from its own (context, caller).
#[derive(Serialize, Deserialize)]
struct ProofPayload {
    nonce: [u8; 32],
    values: Vec<(CipherKind, u64)>,
    #[serde(with = "hex::serde")]
    signature: Vec<u8>,
}

fn input_handles(
    context: &ContractContext,
    caller: &Identity,
    nonce: &[u8; 32],
    values: &[(CipherKind, u64)],
) -> Vec<EncryptedValue> {
    values
        .iter()
        .enumerate()
        .map(|(index, (kind, _))| {
            let mut hasher = Sha256::new();
            hasher.update(b"fhevote_input");
            hasher.update(context.as_bytes());
            hasher.update(caller.as_bytes());
            hasher.update(nonce);
            hasher.update(&(index as u32).to_le_bytes());
            let digest: [u8; 32] = hasher.finalize().into();
            EncryptedValue::new(&digest, *kind)
        })
        .collect()
}

/// Client-side construction of an [`EncryptedInput`] for [`PlaintextFhe`]
pub struct EncryptedInputBuilder {
    context: ContractContext,
    caller: Identity,
    values: Vec<(CipherKind, u64)>,
}

impl EncryptedInputBuilder {
    /// Start an input bound to `context` and `caller`.
    ///
    /// The input cannot be ingested for any other context or caller.
    pub fn new(context: ContractContext, caller: Identity) -> Self {
        EncryptedInputBuilder {
            context,
            caller,
            values: vec![],
        }
    }

    pub fn add_bool(mut self, value: bool) -> Self {
        self.values.push((CipherKind::Bool, value as u64));
        self
    }

    pub fn add_u32(mut self, value: u32) -> Self {
        self.values.push((CipherKind::U32, value as u64));
        self
    }

    pub fn add_u64(mut self, value: u64) -> Self {
        self.values.push((CipherKind::U64, value));
        self
    }

    /// Produce the handles and the proof, signed with the caller's secret key
    pub fn encrypt(&self, secret: &SecretKey) -> Result<EncryptedInput, Error> {
        let public_key = PublicKey::from(secret);
        if Identity::from(&public_key) != self.caller {
            return Err(Error::MismatchedPublicKeys);
        }

        let mut csprng = rand::rngs::OsRng {};
        let nonce: [u8; 32] = csprng.gen();

        let handles = input_handles(&self.context, &self.caller, &nonce, &self.values);

        let package = ProofPackage {
            context: &self.context,
            caller: &self.caller,
            handles: &handles,
            values: &self.values,
        };
        let serialized = serde_cbor::to_vec(&package)?;

        let expanded: ExpandedSecretKey = secret.into();
        let signature = expanded.sign(&serialized, &public_key);

        let payload = ProofPayload {
            nonce,
            values: self.values.clone(),
            signature: signature.to_bytes().to_vec(),
        };

        Ok(EncryptedInput {
            handles,
            proof: InputProof(serde_cbor::to_vec(&payload)?),
        })
    }
}

/// A plaintext-passthrough stand-in for a homomorphic backend and decryption oracle.
///
/// Values are kept in the clear behind their handles. Proof binding, value types,
/// decrypt rights and the asynchronous oracle round-trip behave like a real
/// backend, which makes this suitable for exercising a [`TallyEngine`] end to end.
#[derive(Default)]
pub struct PlaintextFhe {
    values: HashMap<EncryptedValue, (CipherKind, u64)>,
    acl: HashSet<(EncryptedValue, Identity)>,
    pending: IndexMap<RequestId, Vec<EncryptedValue>>,
    next_handle: u64,
}

impl PlaintextFhe {
    pub fn new() -> Self {
        Self::default()
    }

    fn store(&mut self, kind: CipherKind, value: u64) -> EncryptedValue {
        let mut hasher = Sha256::new();
        hasher.update(b"fhevote_plaintext_handle");
        hasher.update(&self.next_handle.to_le_bytes());
        self.next_handle += 1;

        let digest: [u8; 32] = hasher.finalize().into();
        let handle = EncryptedValue::new(&digest, kind);
        self.values.insert(handle, (kind, kind.wrap(value)));
        handle
    }

    fn lookup(&self, value: &EncryptedValue) -> Result<(CipherKind, u64), Error> {
        self.values
            .get(value)
            .copied()
            .ok_or(Error::UnknownHandle(*value))
    }

    /// Decrypt a value on behalf of `identity`, which must have been granted rights to it
    pub fn user_decrypt(&self, value: &EncryptedValue, identity: &Identity) -> Result<u64, Error> {
        if !self.acl.contains(&(*value, *identity)) {
            return Err(Error::DecryptionNotAllowed(*identity));
        }
        self.lookup(value).map(|(_, plaintext)| plaintext)
    }

    /// Whether `identity` may decrypt `value`
    pub fn is_allowed(&self, value: &EncryptedValue, identity: &Identity) -> bool {
        self.acl.contains(&(*value, *identity))
    }

    /// Number of decryption requests not yet fulfilled
    pub fn pending_requests(&self) -> usize {
        self.pending.len()
    }

    /// Decrypt every outstanding request, oldest first.
    ///
    /// The results still have to be delivered to whoever made the request.
    pub fn fulfil_pending(&mut self) -> Result<Vec<DecryptionResult>, Error> {
        let pending: Vec<(RequestId, Vec<EncryptedValue>)> = self.pending.drain(..).collect();

        let mut results = Vec::with_capacity(pending.len());
        for (request_id, handles) in pending {
            let plaintexts = handles
                .iter()
                .map(|handle| self.lookup(handle).map(|(_, plaintext)| plaintext))
                .collect::<Result<Vec<u64>, Error>>()?;
            results.push(DecryptionResult {
                request_id,
                plaintexts,
            });
        }
        Ok(results)
    }
}

impl HomomorphicArithmetic for PlaintextFhe {
    fn verify_and_ingest(
        &mut self,
        input: &EncryptedInput,
        context: &ContractContext,
        caller: &Identity,
    ) -> Result<Vec<EncryptedValue>, Error> {
        let payload: ProofPayload =
            serde_cbor::from_slice(&input.proof.0).map_err(|_| Error::InvalidProof)?;

        if input.handles != input_handles(context, caller, &payload.nonce, &payload.values) {
            return Err(Error::InvalidProof);
        }
        for (handle, (kind, value)) in input.handles.iter().zip(payload.values.iter()) {
            if !kind.contains(*value) {
                return Err(Error::InvalidProof);
            }
            // A replayed input may only restate what it already said
            match self.values.get(handle) {
                Some(stored) if *stored != (*kind, *value) => return Err(Error::InvalidProof),
                _ => {}
            }
        }

        let package = ProofPackage {
            context,
            caller,
            handles: &input.handles,
            values: &payload.values,
        };
        let serialized = serde_cbor::to_vec(&package)?;

        let public_key = caller.public_key().map_err(|_| Error::InvalidProof)?;
        let signature =
            Signature::try_from(payload.signature.as_slice()).map_err(|_| Error::InvalidProof)?;
        public_key
            .verify_strict(&serialized, &signature)
            .map_err(|_| Error::InvalidProof)?;

        for (handle, value) in input.handles.iter().zip(payload.values.into_iter()) {
            self.values.insert(*handle, value);
        }
        debug!(caller = %caller, values = input.handles.len(), "ingested encrypted input");

        Ok(input.handles.clone())
    }

    fn trivial_encrypt(&mut self, value: u64, kind: CipherKind) -> Result<EncryptedValue, Error> {
        Ok(self.store(kind, value))
    }

    fn add(
        &mut self,
        lhs: &EncryptedValue,
        rhs: &EncryptedValue,
    ) -> Result<EncryptedValue, Error> {
        let (kind, lhs) = self.lookup(lhs)?;
        let (_, rhs) = self.lookup(rhs)?;
        Ok(self.store(kind, lhs.wrapping_add(rhs)))
    }

    fn sub(
        &mut self,
        lhs: &EncryptedValue,
        rhs: &EncryptedValue,
    ) -> Result<EncryptedValue, Error> {
        let (kind, lhs) = self.lookup(lhs)?;
        let (_, rhs) = self.lookup(rhs)?;
        Ok(self.store(kind, lhs.wrapping_sub(rhs)))
    }

    fn eq_scalar(&mut self, lhs: &EncryptedValue, rhs: u64) -> Result<EncryptedValue, Error> {
        let (_, lhs) = self.lookup(lhs)?;
        Ok(self.store(CipherKind::Bool, (lhs == rhs) as u64))
    }

    fn select(
        &mut self,
        condition: &EncryptedValue,
        if_true: &EncryptedValue,
        if_false: &EncryptedValue,
    ) -> Result<EncryptedValue, Error> {
        let (condition_kind, condition) = self.lookup(condition)?;
        if condition_kind != CipherKind::Bool {
            return Err(Error::WrongInputKind(CipherKind::Bool));
        }
        let (kind, if_true) = self.lookup(if_true)?;
        let (false_kind, if_false) = self.lookup(if_false)?;
        if false_kind != kind {
            return Err(Error::WrongInputKind(kind));
        }

        let selected = if condition == 1 { if_true } else { if_false };
        Ok(self.store(kind, selected))
    }

    fn allow(&mut self, value: &EncryptedValue, identity: &Identity) {
        self.acl.insert((*value, *identity));
    }
}

impl DecryptionOracle for PlaintextFhe {
    fn request_decryption(&mut self, values: &[EncryptedValue]) -> Result<RequestId, Error> {
        for value in values {
            self.lookup(value)?;
        }

        let request_id = RequestId::new();
        self.pending.insert(request_id, values.to_vec());
        debug!(request_id = %request_id, values = values.len(), "decryption requested");
        Ok(request_id)
    }
}

impl<V: TallyVariant> TallyEngine<V, PlaintextFhe> {
    /// Fulfil every outstanding oracle request and deliver the results.
    ///
    /// Stale results are discarded the same way a real oracle relayer would see
    /// them rejected. Returns the number of results the engine accepted.
    pub fn await_decryption_oracle(&mut self) -> Result<usize, Error> {
        let results = self.backend_mut().fulfil_pending()?;

        let mut accepted = 0;
        for result in results {
            match self.on_decrypted(result.request_id, &result.plaintexts) {
                Ok(()) => accepted += 1,
                Err(Error::StaleCallback(_)) => {}
                Err(e) => return Err(e),
            }
        }
        Ok(accepted)
    }
}
