use crate::*;
use indexmap::IndexMap;

/// One run of an election, from construction or `start_voting` to the next `start_voting`
#[derive(Serialize, Deserialize, Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Epoch(pub u64);

impl Epoch {
    /// The epoch an election starts in
    pub const GENESIS: Epoch = Epoch(1);

    pub fn next(self) -> Epoch {
        Epoch(self.0 + 1)
    }
}

impl std::fmt::Display for Epoch {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The latest ballot of one voter in one epoch
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct VoterRecord {
    /// The encrypted ballot as ingested
    pub ballot: Vec<EncryptedValue>,

    /// What the ballot added to each candidate's accumulator, kept so that a
    /// later ballot can retract it exactly.
    pub contribution: Vec<EncryptedValue>,

    /// How many ballots this voter has cast in the epoch, including replaced ones
    pub ballots_cast: u32,
}

/// Per-voter records, grouped by epoch.
///
/// Starting a new epoch never deletes anything: records of earlier epochs simply
/// stop matching the lookup key. Every lookup touches a single epoch.
#[derive(Default, Clone)]
pub struct VoteLedger {
    epochs: IndexMap<Epoch, IndexMap<Identity, VoterRecord>>,
}

impl VoteLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, epoch: Epoch, voter: &Identity) -> Option<&VoterRecord> {
        self.epochs.get(&epoch)?.get(voter)
    }

    pub fn has_voted(&self, epoch: Epoch, voter: &Identity) -> bool {
        self.get(epoch, voter).is_some()
    }

    /// Insert or replace the record for (epoch, voter), returning the replaced record
    pub fn record(
        &mut self,
        epoch: Epoch,
        voter: Identity,
        record: VoterRecord,
    ) -> Option<VoterRecord> {
        self.epochs.entry(epoch).or_default().insert(voter, record)
    }

    /// Voters of an epoch, in the order they first voted
    pub fn voters(&self, epoch: Epoch) -> impl Iterator<Item = &Identity> + '_ {
        self.epochs.get(&epoch).into_iter().flat_map(|records| records.keys())
    }

    pub fn voter_count(&self, epoch: Epoch) -> usize {
        self.epochs.get(&epoch).map_or(0, |records| records.len())
    }
}
