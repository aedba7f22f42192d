use crate::*;
use tracing::debug;

/// A shared encrypted u32 counter.
///
/// Anyone may add or subtract an encrypted amount bound to them; the updated value
/// is decryptable by the caller who last changed it. Arithmetic wraps like the
/// underlying u32.
pub struct EncryptedCounter<B: HomomorphicArithmetic> {
    context: ContractContext,
    backend: B,
    count: EncryptedValue,
}

impl<B: HomomorphicArithmetic> EncryptedCounter<B> {
    pub fn new(backend: B, context: ContractContext) -> Self {
        EncryptedCounter {
            context,
            backend,
            count: EncryptedValue::uninitialized(),
        }
    }

    /// The encrypted count; the all-zero handle until the first update
    pub fn get_count(&self) -> EncryptedValue {
        self.count
    }

    pub fn increment(
        &mut self,
        input: &EncryptedInput,
        caller: &Identity,
    ) -> Result<EncryptedValue, Error> {
        self.update(input, caller, false)
    }

    pub fn decrement(
        &mut self,
        input: &EncryptedInput,
        caller: &Identity,
    ) -> Result<EncryptedValue, Error> {
        self.update(input, caller, true)
    }

    fn update(
        &mut self,
        input: &EncryptedInput,
        caller: &Identity,
        subtract: bool,
    ) -> Result<EncryptedValue, Error> {
        let values = self
            .backend
            .verify_and_ingest(input, &self.context, caller)?;
        if values.len() != 1 {
            return Err(Error::WrongInputLength {
                expected: 1,
                found: values.len(),
            });
        }
        if values[0].kind() != Some(CipherKind::U32) {
            return Err(Error::WrongInputKind(CipherKind::U32));
        }

        let current = if self.count.is_initialized() {
            self.count
        } else {
            self.backend.trivial_encrypt(0, CipherKind::U32)?
        };
        let count = if subtract {
            self.backend.sub(&current, &values[0])?
        } else {
            self.backend.add(&current, &values[0])?
        };
        self.backend.allow(&count, caller);
        self.count = count;

        debug!(caller = %caller, subtract, "counter updated");
        Ok(count)
    }

    pub fn context(&self) -> &ContractContext {
        &self.context
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }
}
