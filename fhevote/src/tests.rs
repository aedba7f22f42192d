use super::*;
use ed25519_dalek::SecretKey;
use proptest::prelude::*;

struct Voter {
    secret: SecretKey,
    identity: Identity,
}

impl Voter {
    fn new() -> Self {
        let (secret, identity) = generate_identity();
        Voter { secret, identity }
    }

    fn bool_ballot(&self, context: &ContractContext, value: bool) -> EncryptedInput {
        EncryptedInputBuilder::new(*context, self.identity)
            .add_bool(value)
            .encrypt(&self.secret)
            .unwrap()
    }

    fn ballot(&self, context: &ContractContext, choices: &[u32]) -> EncryptedInput {
        let mut builder = EncryptedInputBuilder::new(*context, self.identity);
        for choice in choices {
            builder = builder.add_u32(*choice);
        }
        builder.encrypt(&self.secret).unwrap()
    }
}

fn election<V: TallyVariant>(variant: V, owner: &Voter) -> TallyEngine<V, PlaintextFhe> {
    TallyEngine::new(
        variant,
        PlaintextFhe::new(),
        ContractContext::random(),
        owner.identity,
    )
    .unwrap()
}

fn cast<V: TallyVariant>(
    engine: &mut TallyEngine<V, PlaintextFhe>,
    voter: &Voter,
    choices: &[u32],
) {
    let input = voter.ballot(engine.context(), choices);
    engine.cast_vote(&input, &voter.identity).unwrap();
}

// Close, request decryption and wait for the oracle
fn close_and_decrypt<V: TallyVariant>(
    engine: &mut TallyEngine<V, PlaintextFhe>,
    owner: &Voter,
) -> Vec<u64> {
    engine.close_voting(&owner.identity).unwrap();
    engine.request_decryption(&owner.identity).unwrap();
    assert_eq!(engine.await_decryption_oracle().unwrap(), 1);
    engine.get_all_decrypted_counts().unwrap().to_vec()
}

#[test]
fn binary_vote_and_decrypt_own_vote() {
    let owner = Voter::new();
    let alice = Voter::new();
    let mut engine = election(BinaryTally, &owner);

    for value in &[true, false] {
        let input = alice.bool_ballot(engine.context(), *value);
        engine.cast_vote(&input, &alice.identity).unwrap();

        let my_vote = engine.get_my_vote(&alice.identity).unwrap().to_vec();
        assert_eq!(my_vote.len(), 1);
        let clear = engine
            .backend()
            .user_decrypt(&my_vote[0], &alice.identity)
            .unwrap();
        assert_eq!(clear == 1, *value);

        // Nobody else can read Alice's ballot
        assert!(engine
            .backend()
            .user_decrypt(&my_vote[0], &owner.identity)
            .is_err());
    }
}

#[test]
fn binary_final_count() {
    let owner = Voter::new();
    let alice = Voter::new();
    let bob = Voter::new();
    let mut engine = election(BinaryTally, &owner);

    let input = alice.bool_ballot(engine.context(), true);
    engine.cast_vote(&input, &alice.identity).unwrap();
    let input = bob.bool_ballot(engine.context(), false);
    engine.cast_vote(&input, &bob.identity).unwrap();

    // The running count is readable by the owner only
    let count = engine.get_count();
    assert_eq!(engine.backend().user_decrypt(&count, &owner.identity).unwrap(), 1);
    assert!(matches!(
        engine.backend().user_decrypt(&count, &alice.identity),
        Err(Error::DecryptionNotAllowed(_))
    ));

    assert_eq!(close_and_decrypt(&mut engine, &owner), vec![1]);
    assert_eq!(engine.get_decrypted_count(0).unwrap(), 1);
}

#[test]
fn binary_revote_only_last_counts() {
    let owner = Voter::new();
    let alice = Voter::new();
    let mut engine = election(BinaryTally, &owner);

    let input = alice.bool_ballot(engine.context(), true);
    engine.cast_vote(&input, &alice.identity).unwrap();
    let input = alice.bool_ballot(engine.context(), false);
    engine.cast_vote(&input, &alice.identity).unwrap();

    assert_eq!(engine.voter_count(), 1);
    assert_eq!(close_and_decrypt(&mut engine, &owner), vec![0]);
}

#[test]
fn vote_after_close_fails_and_changes_nothing() {
    let owner = Voter::new();
    let alice = Voter::new();
    let bob = Voter::new();
    let mut engine = election(MultiCandidateTally::new(3).unwrap(), &owner);

    cast(&mut engine, &alice, &[1]);
    engine.close_voting(&owner.identity).unwrap();

    // Bob is too late, and Alice can't change her mind either
    let input = bob.ballot(engine.context(), &[0]);
    let err = engine.cast_vote(&input, &bob.identity).unwrap_err();
    assert!(matches!(err, Error::VotingClosed));
    assert_eq!(err.to_string(), "fhevote: voting is not open");
    let input = alice.ballot(engine.context(), &[2]);
    assert!(matches!(
        engine.cast_vote(&input, &alice.identity),
        Err(Error::VotingClosed)
    ));
    assert!(!engine.has_voted(&bob.identity));

    engine.request_decryption(&owner.identity).unwrap();
    engine.await_decryption_oracle().unwrap();
    assert_eq!(engine.get_all_decrypted_counts().unwrap(), &[0, 1, 0]);
}

#[test]
fn results_not_ready_until_callback() {
    let owner = Voter::new();
    let alice = Voter::new();
    let mut engine = election(MultiCandidateTally::new(3).unwrap(), &owner);
    cast(&mut engine, &alice, &[0]);

    assert!(matches!(
        engine.get_all_decrypted_counts(),
        Err(Error::ResultsNotReady)
    ));
    engine.close_voting(&owner.identity).unwrap();
    assert!(matches!(
        engine.get_all_decrypted_counts(),
        Err(Error::ResultsNotReady)
    ));
    engine.request_decryption(&owner.identity).unwrap();
    assert!(matches!(
        engine.get_all_decrypted_counts(),
        Err(Error::ResultsNotReady)
    ));
    assert!(matches!(
        engine.get_decrypted_count(0),
        Err(Error::ResultsNotReady)
    ));

    engine.await_decryption_oracle().unwrap();
    assert_eq!(engine.get_all_decrypted_counts().unwrap(), &[1, 0, 0]);
}

#[test]
fn request_decryption_twice_fails() {
    let owner = Voter::new();
    let mut engine = election(MultiCandidateTally::new(2).unwrap(), &owner);
    engine.close_voting(&owner.identity).unwrap();

    engine.request_decryption(&owner.identity).unwrap();
    let err = engine.request_decryption(&owner.identity).unwrap_err();
    assert_eq!(err.code(), "INVALID_PHASE");

    // Only one request ever reached the oracle
    assert_eq!(engine.backend().pending_requests(), 1);

    // After the results are in it is still not allowed
    engine.await_decryption_oracle().unwrap();
    assert!(matches!(
        engine.request_decryption(&owner.identity),
        Err(Error::InvalidPhase { .. })
    ));
    assert_eq!(engine.get_all_decrypted_counts().unwrap(), &[0, 0]);
}

#[test]
fn new_epoch_clears_previous_votes_and_results() {
    let owner = Voter::new();
    let alice = Voter::new();
    let bob = Voter::new();
    let mut engine = election(MultiCandidateTally::new(3).unwrap(), &owner);

    cast(&mut engine, &alice, &[0]);
    cast(&mut engine, &bob, &[2]);
    assert_eq!(close_and_decrypt(&mut engine, &owner), vec![1, 0, 1]);

    let epoch = engine.start_voting(&owner.identity).unwrap();
    assert_eq!(epoch, Epoch(2));
    assert!(matches!(
        engine.get_my_vote(&alice.identity),
        Err(Error::NotVoted)
    ));
    assert!(matches!(
        engine.get_all_decrypted_counts(),
        Err(Error::ResultsNotReady)
    ));
    assert_eq!(engine.voter_count(), 0);

    // Only Bob votes this time; Alice's old ballot must not count
    cast(&mut engine, &bob, &[1]);
    assert_eq!(close_and_decrypt(&mut engine, &owner), vec![0, 1, 0]);
}

#[test]
fn start_voting_while_open_discards_ballots() {
    let owner = Voter::new();
    let alice = Voter::new();
    let mut engine = election(MultiCandidateTally::new(2).unwrap(), &owner);

    cast(&mut engine, &alice, &[1]);
    engine.start_voting(&owner.identity).unwrap();
    assert!(!engine.has_voted(&alice.identity));
    assert_eq!(close_and_decrypt(&mut engine, &owner), vec![0, 0]);
}

#[test]
fn non_owner_is_unauthorized_in_every_phase() {
    let owner = Voter::new();
    let alice = Voter::new();
    let mut engine = election(MultiCandidateTally::new(3).unwrap(), &owner);
    cast(&mut engine, &alice, &[0]);

    let check = |engine: &mut TallyEngine<MultiCandidateTally, PlaintextFhe>| {
        let phase = engine.phase();
        assert!(matches!(
            engine.request_decryption(&alice.identity),
            Err(Error::Unauthorized)
        ));
        assert!(matches!(
            engine.start_voting(&alice.identity),
            Err(Error::Unauthorized)
        ));
        assert!(matches!(
            engine.close_voting(&alice.identity),
            Err(Error::Unauthorized)
        ));
        assert_eq!(engine.phase(), phase);
    };

    check(&mut engine);
    engine.close_voting(&owner.identity).unwrap();
    check(&mut engine);
    engine.request_decryption(&owner.identity).unwrap();
    check(&mut engine);
    engine.await_decryption_oracle().unwrap();
    check(&mut engine);

    assert_eq!(
        Error::Unauthorized.to_string(),
        "fhevote: only owner can call this function"
    );
}

#[test]
fn multi_candidate_counts() {
    let owner = Voter::new();
    let alice = Voter::new();
    let bob = Voter::new();
    let charlie = Voter::new();
    let mut engine = election(MultiCandidateTally::new(3).unwrap(), &owner);
    assert_eq!(engine.candidate_count(), 3);

    cast(&mut engine, &alice, &[0]);
    cast(&mut engine, &bob, &[1]);
    cast(&mut engine, &charlie, &[0]);

    assert_eq!(close_and_decrypt(&mut engine, &owner), vec![2, 1, 0]);
    assert_eq!(engine.get_decrypted_count(0).unwrap(), 2);
    assert_eq!(engine.get_decrypted_count(1).unwrap(), 1);
    assert_eq!(engine.get_decrypted_count(2).unwrap(), 0);
    assert!(matches!(
        engine.get_decrypted_count(3),
        Err(Error::InvalidCandidate(3))
    ));
}

#[test]
fn multi_candidate_own_vote() {
    let owner = Voter::new();
    let alice = Voter::new();
    let mut engine = election(MultiCandidateTally::new(3).unwrap(), &owner);

    assert_eq!(
        engine.get_my_vote(&alice.identity).unwrap_err().to_string(),
        "fhevote: you have not voted yet"
    );

    for candidate in 0..3 {
        cast(&mut engine, &alice, &[candidate]);
        let my_vote = engine.get_my_vote(&alice.identity).unwrap();
        let clear = engine
            .backend()
            .user_decrypt(&my_vote[0], &alice.identity)
            .unwrap();
        assert_eq!(clear, candidate as u64);
    }
}

#[test]
fn multi_candidate_vote_changes() {
    let owner = Voter::new();
    let alice = Voter::new();
    let bob = Voter::new();
    let mut engine = election(MultiCandidateTally::new(3).unwrap(), &owner);

    cast(&mut engine, &alice, &[0]);
    cast(&mut engine, &bob, &[0]);
    cast(&mut engine, &alice, &[2]);
    cast(&mut engine, &bob, &[1]);
    cast(&mut engine, &alice, &[1]);
    cast(&mut engine, &alice, &[2]);

    assert_eq!(engine.voter_count(), 2);
    assert_eq!(close_and_decrypt(&mut engine, &owner), vec![0, 1, 1]);
}

#[test]
fn multi_candidate_larger_election() {
    let owner = Voter::new();
    let voters: Vec<Voter> = (0..3).map(|_| Voter::new()).collect();
    let mut engine = election(MultiCandidateTally::new(5).unwrap(), &owner);

    cast(&mut engine, &voters[0], &[3]);
    cast(&mut engine, &voters[1], &[4]);
    // Out of range: counted for nobody
    cast(&mut engine, &voters[2], &[9]);

    assert_eq!(close_and_decrypt(&mut engine, &owner), vec![0, 0, 0, 1, 1]);
}

#[test]
fn ranked_own_vote() {
    let owner = Voter::new();
    let alice = Voter::new();
    let mut engine = election(RankedTally::new(5, 3, vec![3, 2, 1]).unwrap(), &owner);
    assert_eq!(engine.max_vote_choices(), 3);
    assert_eq!(engine.vote_points(), &[3, 2, 1]);

    cast(&mut engine, &alice, &[0, 1, 2]);
    let my_vote = engine.get_my_vote(&alice.identity).unwrap();
    assert_eq!(my_vote.len(), 3);
    let clear: Vec<u64> = my_vote
        .iter()
        .map(|value| engine.backend().user_decrypt(value, &alice.identity).unwrap())
        .collect();
    assert_eq!(clear, vec![0, 1, 2]);

    // A ballot must fill every rank
    let input = alice.ballot(engine.context(), &[0, 1]);
    assert!(matches!(
        engine.cast_vote(&input, &alice.identity),
        Err(Error::WrongInputLength {
            expected: 3,
            found: 2
        })
    ));
}

#[test]
fn ranked_points() {
    let owner = Voter::new();
    let alice = Voter::new();
    let bob = Voter::new();
    let mut engine = election(RankedTally::new(5, 3, vec![3, 2, 1]).unwrap(), &owner);

    cast(&mut engine, &alice, &[0, 1, 2]);
    cast(&mut engine, &bob, &[1, 2, 0]);

    assert_eq!(close_and_decrypt(&mut engine, &owner), vec![4, 5, 3, 0, 0]);
}

#[test]
fn ranked_revote_only_last_counts() {
    let owner = Voter::new();
    let alice = Voter::new();
    let mut engine = election(RankedTally::new(5, 3, vec![3, 2, 1]).unwrap(), &owner);

    cast(&mut engine, &alice, &[0, 1, 2]);
    cast(&mut engine, &alice, &[1, 0, 2]);

    assert_eq!(close_and_decrypt(&mut engine, &owner), vec![2, 3, 1, 0, 0]);
}

#[test]
fn configured_election() {
    let config = ElectionConfig::from_json(
        r#"{"variant": "ranked", "candidate_count": 4, "max_vote_choices": 2, "vote_points": [5, 1]}"#,
    )
    .unwrap();
    let owner = Voter::new();
    let alice = Voter::new();
    let bob = Voter::new();
    let mut engine = election(config.build().unwrap(), &owner);

    cast(&mut engine, &alice, &[3, 0]);
    cast(&mut engine, &bob, &[0, 3]);

    assert_eq!(close_and_decrypt(&mut engine, &owner), vec![6, 0, 0, 6]);
    assert_eq!(engine.status().kind, TallyKind::Ranked);
}

#[test]
fn abandoned_decryption_allows_new_epoch() {
    let owner = Voter::new();
    let alice = Voter::new();
    let mut engine = election(BinaryTally, &owner);

    let input = alice.bool_ballot(engine.context(), true);
    engine.cast_vote(&input, &alice.identity).unwrap();
    engine.close_voting(&owner.identity).unwrap();
    engine.request_decryption(&owner.identity).unwrap();

    // The oracle never answers
    engine.abandon_decryption(&owner.identity).unwrap();
    engine.start_voting(&owner.identity).unwrap();

    // The late answer is dropped
    assert_eq!(engine.await_decryption_oracle().unwrap(), 0);
    assert_eq!(engine.phase(), VotingPhase::Open);
    assert_eq!(close_and_decrypt(&mut engine, &owner), vec![0]);
}

fn ranked_ballot() -> impl Strategy<Value = Vec<u32>> {
    prop::collection::vec(0u32..5, 3)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn revoting_is_idempotent(
        earlier in prop::collection::vec(ranked_ballot(), 0..6),
        last in ranked_ballot(),
        other in ranked_ballot(),
    ) {
        let owner = Voter::new();
        let alice = Voter::new();
        let bob = Voter::new();
        let tally = RankedTally::new(5, 3, vec![3, 2, 1]).unwrap();

        let mut revoted = election(tally.clone(), &owner);
        cast(&mut revoted, &bob, &other);
        for ballot in &earlier {
            cast(&mut revoted, &alice, ballot);
        }
        cast(&mut revoted, &alice, &last);

        let mut once = election(tally, &owner);
        cast(&mut once, &bob, &other);
        cast(&mut once, &alice, &last);

        let revoted_counts = close_and_decrypt(&mut revoted, &owner);
        let once_counts = close_and_decrypt(&mut once, &owner);
        prop_assert_eq!(&revoted_counts, &once_counts);

        // Every voter hands out 3 + 2 + 1 points
        prop_assert_eq!(revoted_counts.iter().sum::<u64>(), 12);
    }
}
