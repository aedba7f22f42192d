use crate::*;

/// Tally variants sharing the [`TallyEngine`] state machine
#[derive(Serialize, Deserialize, Copy, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TallyKind {
    /// A single yes/no proposition
    Binary,

    /// One vote for one of several candidates
    MultiCandidate,

    /// Ranked choices, each rank worth a fixed number of points
    Ranked,
}

/// How ballots of one variant turn into per-candidate contributions.
///
/// Implementations are immutable once constructed.
pub trait TallyVariant {
    fn kind(&self) -> TallyKind;

    /// Number of accumulators, one per candidate
    fn candidate_count(&self) -> u32;

    /// Number of encrypted values in one ballot
    fn ballot_len(&self) -> usize;

    /// Type of every encrypted value in a ballot
    fn ballot_kind(&self) -> CipherKind;

    /// Compute what `ballot` adds to each candidate's accumulator.
    ///
    /// The ballot has already passed [`TallyVariant::check_ballot`]. The result has
    /// exactly `candidate_count()` entries.
    fn contribution<H: HomomorphicArithmetic + ?Sized>(
        &self,
        fhe: &mut H,
        ballot: &[EncryptedValue],
    ) -> Result<Vec<EncryptedValue>, Error>;

    /// Check the shape of an ingested ballot
    fn check_ballot(&self, ballot: &[EncryptedValue]) -> Result<(), Error> {
        if ballot.len() != self.ballot_len() {
            return Err(Error::WrongInputLength {
                expected: self.ballot_len(),
                found: ballot.len(),
            });
        }
        let kind = self.ballot_kind();
        if ballot.iter().any(|value| value.kind() != Some(kind)) {
            return Err(Error::WrongInputKind(kind));
        }
        Ok(())
    }
}

/// Yes/no vote. The single accumulator counts the `true` ballots.
#[derive(Serialize, Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct BinaryTally;

impl TallyVariant for BinaryTally {
    fn kind(&self) -> TallyKind {
        TallyKind::Binary
    }

    fn candidate_count(&self) -> u32 {
        1
    }

    fn ballot_len(&self) -> usize {
        1
    }

    fn ballot_kind(&self) -> CipherKind {
        CipherKind::Bool
    }

    fn contribution<H: HomomorphicArithmetic + ?Sized>(
        &self,
        fhe: &mut H,
        ballot: &[EncryptedValue],
    ) -> Result<Vec<EncryptedValue>, Error> {
        Ok(vec![fhe.bool_to_u32(&ballot[0])?])
    }
}

/// One encrypted candidate index per ballot.
///
/// An index outside `[0, candidate_count)` matches no candidate and contributes
/// nothing; the range is never checked in plaintext.
#[derive(Serialize, Copy, Clone, Debug, PartialEq, Eq)]
pub struct MultiCandidateTally {
    candidate_count: u32,
}

impl MultiCandidateTally {
    pub fn new(candidate_count: u32) -> Result<Self, ConfigError> {
        if candidate_count == 0 {
            return Err(ConfigError::NoCandidates);
        }
        Ok(MultiCandidateTally { candidate_count })
    }
}

impl TallyVariant for MultiCandidateTally {
    fn kind(&self) -> TallyKind {
        TallyKind::MultiCandidate
    }

    fn candidate_count(&self) -> u32 {
        self.candidate_count
    }

    fn ballot_len(&self) -> usize {
        1
    }

    fn ballot_kind(&self) -> CipherKind {
        CipherKind::U32
    }

    fn contribution<H: HomomorphicArithmetic + ?Sized>(
        &self,
        fhe: &mut H,
        ballot: &[EncryptedValue],
    ) -> Result<Vec<EncryptedValue>, Error> {
        let mut contribution = Vec::with_capacity(self.candidate_count as usize);
        for candidate in 0..self.candidate_count {
            let chosen = fhe.eq_scalar(&ballot[0], candidate as u64)?;
            contribution.push(fhe.bool_to_u32(&chosen)?);
        }
        Ok(contribution)
    }
}

/// Ranked ballot: `max_vote_choices` encrypted candidate indices, first choice first.
///
/// The candidate at rank `r` receives `vote_points[r]` points.
#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
pub struct RankedTally {
    candidate_count: u32,
    max_vote_choices: u32,
    vote_points: Vec<u32>,
}

impl RankedTally {
    pub fn new(
        candidate_count: u32,
        max_vote_choices: u32,
        vote_points: Vec<u32>,
    ) -> Result<Self, ConfigError> {
        if candidate_count == 0 {
            return Err(ConfigError::NoCandidates);
        }
        if max_vote_choices == 0 {
            return Err(ConfigError::NoVoteChoices);
        }
        if max_vote_choices > candidate_count {
            return Err(ConfigError::TooManyVoteChoices {
                max_vote_choices,
                candidate_count,
            });
        }
        if vote_points.len() != max_vote_choices as usize {
            return Err(ConfigError::VotePointsMismatch {
                expected: max_vote_choices as usize,
                found: vote_points.len(),
            });
        }
        if let Some(rank) = vote_points.iter().position(|points| *points == 0) {
            return Err(ConfigError::ZeroVotePoints(rank));
        }

        Ok(RankedTally {
            candidate_count,
            max_vote_choices,
            vote_points,
        })
    }

    pub fn max_vote_choices(&self) -> u32 {
        self.max_vote_choices
    }

    pub fn vote_points(&self) -> &[u32] {
        &self.vote_points
    }
}

impl TallyVariant for RankedTally {
    fn kind(&self) -> TallyKind {
        TallyKind::Ranked
    }

    fn candidate_count(&self) -> u32 {
        self.candidate_count
    }

    fn ballot_len(&self) -> usize {
        self.max_vote_choices as usize
    }

    fn ballot_kind(&self) -> CipherKind {
        CipherKind::U32
    }

    fn contribution<H: HomomorphicArithmetic + ?Sized>(
        &self,
        fhe: &mut H,
        ballot: &[EncryptedValue],
    ) -> Result<Vec<EncryptedValue>, Error> {
        let zero = fhe.trivial_encrypt(0, CipherKind::U32)?;
        let mut points = Vec::with_capacity(self.vote_points.len());
        for p in &self.vote_points {
            points.push(fhe.trivial_encrypt(*p as u64, CipherKind::U32)?);
        }

        let mut contribution = Vec::with_capacity(self.candidate_count as usize);
        for candidate in 0..self.candidate_count {
            let mut total = zero;
            for (choice, rank_points) in ballot.iter().zip(points.iter()) {
                let chosen = fhe.eq_scalar(choice, candidate as u64)?;
                let earned = fhe.select(&chosen, rank_points, &zero)?;
                total = fhe.add(&total, &earned)?;
            }
            contribution.push(total);
        }
        Ok(contribution)
    }
}

/// A variant picked at runtime, e.g. from an [`ElectionConfig`]
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AnyTally {
    Binary(BinaryTally),
    MultiCandidate(MultiCandidateTally),
    Ranked(RankedTally),
}

impl TallyVariant for AnyTally {
    fn kind(&self) -> TallyKind {
        match self {
            AnyTally::Binary(tally) => tally.kind(),
            AnyTally::MultiCandidate(tally) => tally.kind(),
            AnyTally::Ranked(tally) => tally.kind(),
        }
    }

    fn candidate_count(&self) -> u32 {
        match self {
            AnyTally::Binary(tally) => tally.candidate_count(),
            AnyTally::MultiCandidate(tally) => tally.candidate_count(),
            AnyTally::Ranked(tally) => tally.candidate_count(),
        }
    }

    fn ballot_len(&self) -> usize {
        match self {
            AnyTally::Binary(tally) => tally.ballot_len(),
            AnyTally::MultiCandidate(tally) => tally.ballot_len(),
            AnyTally::Ranked(tally) => tally.ballot_len(),
        }
    }

    fn ballot_kind(&self) -> CipherKind {
        match self {
            AnyTally::Binary(tally) => tally.ballot_kind(),
            AnyTally::MultiCandidate(tally) => tally.ballot_kind(),
            AnyTally::Ranked(tally) => tally.ballot_kind(),
        }
    }

    fn contribution<H: HomomorphicArithmetic + ?Sized>(
        &self,
        fhe: &mut H,
        ballot: &[EncryptedValue],
    ) -> Result<Vec<EncryptedValue>, Error> {
        match self {
            AnyTally::Binary(tally) => tally.contribution(fhe, ballot),
            AnyTally::MultiCandidate(tally) => tally.contribution(fhe, ballot),
            AnyTally::Ranked(tally) => tally.contribution(fhe, ballot),
        }
    }
}
