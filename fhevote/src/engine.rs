use crate::*;
use tracing::{debug, info, warn};

/// Phase of the current epoch
#[derive(Serialize, Deserialize, Copy, Debug, Clone, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum VotingPhase {
    Open,
    Closed,
    DecryptionPending,
    Decrypted,
}

impl std::fmt::Display for VotingPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let name = match self {
            VotingPhase::Open => "open",
            VotingPhase::Closed => "closed",
            VotingPhase::DecryptionPending => "decryption_pending",
            VotingPhase::Decrypted => "decrypted",
        };
        write!(f, "{}", name)
    }
}

/// The decryption request the engine is waiting on
#[derive(Serialize, Deserialize, Copy, Clone, Debug, PartialEq, Eq)]
pub struct PendingDecryption {
    pub epoch: Epoch,
    pub request_id: RequestId,
}

/// Plaintext totals delivered by the oracle
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct DecryptedResults {
    pub epoch: Epoch,
    pub request_id: RequestId,

    /// One total per candidate, in candidate order
    pub counts: Vec<u64>,
}

/// Read-only summary of an election, for tooling
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct ElectionStatus {
    pub context: ContractContext,
    pub owner: Identity,
    pub kind: TallyKind,
    pub candidate_count: u32,
    pub epoch: Epoch,
    pub phase: VotingPhase,
    pub voters: usize,
    pub pending_request: Option<RequestId>,
}

// Encrypted running sums, one per candidate, valid for a single epoch
struct Accumulators {
    epoch: Epoch,
    sums: Vec<EncryptedValue>,
}

impl Accumulators {
    fn zeroed<B: HomomorphicArithmetic>(
        backend: &mut B,
        epoch: Epoch,
        candidate_count: u32,
        owner: &Identity,
    ) -> Result<Self, Error> {
        let mut sums = Vec::with_capacity(candidate_count as usize);
        for _ in 0..candidate_count {
            let zero = backend.trivial_encrypt(0, CipherKind::U32)?;
            backend.allow(&zero, owner);
            sums.push(zero);
        }
        Ok(Accumulators { epoch, sums })
    }
}

/// The election state machine.
///
/// Ballots are accumulated homomorphically per candidate; totals only become
/// readable after the owner closes voting and the decryption oracle answers.
/// All per-voter state and all accumulators belong to the current [`Epoch`].
///
/// Every mutating operation takes `&mut self` and computes its complete new state
/// before committing it, so a failed operation changes nothing.
pub struct TallyEngine<V: TallyVariant, B: FheBackend> {
    context: ContractContext,
    owner: Identity,
    variant: V,
    backend: B,
    epoch: Epoch,
    phase: VotingPhase,
    ledger: VoteLedger,
    accumulators: Accumulators,
    pending: Option<PendingDecryption>,
    results: Option<DecryptedResults>,
}

impl<V: TallyVariant, B: FheBackend> TallyEngine<V, B> {
    /// Create an election in `context`, open for voting in the first epoch
    pub fn new(
        variant: V,
        mut backend: B,
        context: ContractContext,
        owner: Identity,
    ) -> Result<Self, Error> {
        let epoch = Epoch::GENESIS;
        let accumulators =
            Accumulators::zeroed(&mut backend, epoch, variant.candidate_count(), &owner)?;

        info!(
            context = %context,
            owner = %owner,
            kind = ?variant.kind(),
            candidates = variant.candidate_count(),
            "election created"
        );

        Ok(TallyEngine {
            context,
            owner,
            variant,
            backend,
            epoch,
            phase: VotingPhase::Open,
            ledger: VoteLedger::new(),
            accumulators,
            pending: None,
            results: None,
        })
    }

    fn ensure_owner(&self, caller: &Identity) -> Result<(), Error> {
        if *caller != self.owner {
            return Err(Error::Unauthorized);
        }
        Ok(())
    }

    fn ensure_phase(&self, operation: &'static str, expected: VotingPhase) -> Result<(), Error> {
        if self.phase != expected {
            return Err(Error::InvalidPhase {
                operation,
                phase: self.phase,
            });
        }
        Ok(())
    }

    /// Start a new epoch: every earlier ballot, total and result is left behind.
    ///
    /// Owner only. Not allowed while a decryption is pending; use
    /// [`abandon_decryption`](Self::abandon_decryption) first.
    pub fn start_voting(&mut self, caller: &Identity) -> Result<Epoch, Error> {
        self.ensure_owner(caller)?;
        if self.phase == VotingPhase::DecryptionPending {
            return Err(Error::InvalidPhase {
                operation: "start_voting",
                phase: self.phase,
            });
        }

        let epoch = self.epoch.next();
        let accumulators = Accumulators::zeroed(
            &mut self.backend,
            epoch,
            self.variant.candidate_count(),
            &self.owner,
        )?;

        self.epoch = epoch;
        self.accumulators = accumulators;
        self.results = None;
        self.pending = None;
        self.phase = VotingPhase::Open;

        info!(epoch = %epoch, "voting started");
        Ok(epoch)
    }

    /// Stop accepting ballots. Owner only, from Open.
    pub fn close_voting(&mut self, caller: &Identity) -> Result<(), Error> {
        self.ensure_owner(caller)?;
        self.ensure_phase("close_voting", VotingPhase::Open)?;

        self.phase = VotingPhase::Closed;
        info!(
            epoch = %self.epoch,
            voters = self.ledger.voter_count(self.epoch),
            "voting closed"
        );
        Ok(())
    }

    /// Cast or replace the caller's ballot for the current epoch.
    ///
    /// A voter may vote any number of times; only the latest ballot counts. The
    /// previous ballot's contribution is subtracted from every accumulator before
    /// the new one is added.
    pub fn cast_vote(&mut self, input: &EncryptedInput, caller: &Identity) -> Result<(), Error> {
        if self.phase != VotingPhase::Open {
            return Err(Error::VotingClosed);
        }

        let ballot = self
            .backend
            .verify_and_ingest(input, &self.context, caller)?;
        self.variant.check_ballot(&ballot)?;
        let contribution = self.variant.contribution(&mut self.backend, &ballot)?;

        let previous = self.ledger.get(self.epoch, caller);
        let mut sums = Vec::with_capacity(self.accumulators.sums.len());
        for (index, sum) in self.accumulators.sums.iter().enumerate() {
            let mut sum = *sum;
            if let Some(previous) = previous {
                sum = self.backend.sub(&sum, &previous.contribution[index])?;
            }
            sum = self.backend.add(&sum, &contribution[index])?;
            sums.push(sum);
        }
        let ballots_cast = previous.map(|p| p.ballots_cast + 1).unwrap_or(1);

        for value in &ballot {
            self.backend.allow(value, caller);
        }
        for sum in &sums {
            self.backend.allow(sum, &self.owner);
        }

        self.accumulators.sums = sums;
        self.ledger.record(
            self.epoch,
            *caller,
            VoterRecord {
                ballot,
                contribution,
                ballots_cast,
            },
        );

        debug!(
            epoch = %self.epoch,
            voter = %caller,
            revote = ballots_cast > 1,
            "ballot accepted"
        );
        Ok(())
    }

    /// Send the current totals to the decryption oracle. Owner only, from Closed.
    pub fn request_decryption(&mut self, caller: &Identity) -> Result<RequestId, Error> {
        self.ensure_owner(caller)?;
        self.ensure_phase("request_decryption", VotingPhase::Closed)?;

        let request_id = self
            .backend
            .request_decryption(&self.accumulators.sums)?;

        self.pending = Some(PendingDecryption {
            epoch: self.epoch,
            request_id,
        });
        self.phase = VotingPhase::DecryptionPending;

        info!(epoch = %self.epoch, request_id = %request_id, "decryption requested");
        Ok(request_id)
    }

    /// Forget the outstanding decryption request and return to Closed.
    ///
    /// Owner only, from DecryptionPending. A late answer to the abandoned request
    /// is rejected as stale.
    pub fn abandon_decryption(&mut self, caller: &Identity) -> Result<RequestId, Error> {
        self.ensure_owner(caller)?;
        self.ensure_phase("abandon_decryption", VotingPhase::DecryptionPending)?;

        let pending = self.pending.take().ok_or(Error::InvalidPhase {
            operation: "abandon_decryption",
            phase: self.phase,
        })?;
        self.phase = VotingPhase::Closed;

        warn!(
            epoch = %self.epoch,
            request_id = %pending.request_id,
            "decryption request abandoned"
        );
        Ok(pending.request_id)
    }

    /// Oracle callback carrying the plaintext totals for `request_id`.
    ///
    /// Only the outstanding request of the current epoch is accepted; anything
    /// else fails with [`Error::StaleCallback`] and changes nothing.
    pub fn on_decrypted(&mut self, request_id: RequestId, plaintexts: &[u64]) -> Result<(), Error> {
        let pending = match self.pending {
            Some(pending)
                if self.phase == VotingPhase::DecryptionPending
                    && pending.epoch == self.epoch
                    && pending.request_id == request_id =>
            {
                pending
            }
            _ => {
                warn!(
                    epoch = %self.epoch,
                    request_id = %request_id,
                    "discarding stale decryption callback"
                );
                return Err(Error::StaleCallback(request_id));
            }
        };

        let expected = self.accumulators.sums.len();
        if plaintexts.len() != expected {
            warn!(
                request_id = %request_id,
                expected,
                found = plaintexts.len(),
                "decryption callback has the wrong number of plaintexts"
            );
            return Err(Error::InvalidCallback {
                expected,
                found: plaintexts.len(),
            });
        }

        self.results = Some(DecryptedResults {
            epoch: pending.epoch,
            request_id,
            counts: plaintexts.to_vec(),
        });
        self.pending = None;
        self.phase = VotingPhase::Decrypted;

        info!(epoch = %self.epoch, request_id = %request_id, "results decrypted");
        Ok(())
    }

    /// The caller's encrypted ballot in the current epoch
    pub fn get_my_vote(&self, caller: &Identity) -> Result<&[EncryptedValue], Error> {
        self.ledger
            .get(self.epoch, caller)
            .map(|record| record.ballot.as_slice())
            .ok_or(Error::NotVoted)
    }

    fn decrypted(&self) -> Result<&DecryptedResults, Error> {
        match &self.results {
            Some(results) if self.phase == VotingPhase::Decrypted && results.epoch == self.epoch => {
                Ok(results)
            }
            _ => Err(Error::ResultsNotReady),
        }
    }

    /// Decrypted total of one candidate
    pub fn get_decrypted_count(&self, candidate: u32) -> Result<u64, Error> {
        if candidate >= self.variant.candidate_count() {
            return Err(Error::InvalidCandidate(candidate));
        }
        let results = self.decrypted()?;
        Ok(results.counts[candidate as usize])
    }

    /// Decrypted totals of every candidate, in candidate order
    pub fn get_all_decrypted_counts(&self) -> Result<&[u64], Error> {
        Ok(&self.decrypted()?.counts)
    }

    pub fn context(&self) -> &ContractContext {
        &self.context
    }

    pub fn owner(&self) -> &Identity {
        &self.owner
    }

    pub fn variant(&self) -> &V {
        &self.variant
    }

    pub fn candidate_count(&self) -> u32 {
        self.variant.candidate_count()
    }

    pub fn epoch(&self) -> Epoch {
        self.epoch
    }

    pub fn phase(&self) -> VotingPhase {
        self.phase
    }

    pub fn has_voted(&self, voter: &Identity) -> bool {
        self.ledger.has_voted(self.epoch, voter)
    }

    /// Number of distinct voters in the current epoch
    pub fn voter_count(&self) -> usize {
        self.ledger.voter_count(self.epoch)
    }

    pub fn pending_request(&self) -> Option<RequestId> {
        self.pending.map(|pending| pending.request_id)
    }

    pub fn status(&self) -> ElectionStatus {
        ElectionStatus {
            context: self.context,
            owner: self.owner,
            kind: self.variant.kind(),
            candidate_count: self.variant.candidate_count(),
            epoch: self.epoch,
            phase: self.phase,
            voters: self.voter_count(),
            pending_request: self.pending_request(),
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }
}

impl<B: FheBackend> TallyEngine<BinaryTally, B> {
    /// The encrypted running count of `true` ballots.
    ///
    /// Only identities with decrypt rights on this exact value (the owner) can
    /// read it; this is separate from the public decryption path.
    pub fn get_count(&self) -> EncryptedValue {
        self.accumulators.sums[0]
    }
}

impl<B: FheBackend> TallyEngine<RankedTally, B> {
    pub fn max_vote_choices(&self) -> u32 {
        self.variant.max_vote_choices()
    }

    pub fn vote_points(&self) -> &[u32] {
        self.variant.vote_points()
    }
}
