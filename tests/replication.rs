use jigsaw_engine::assembly::{
    AssemblyError, AssemblyState, Authority, ClusterId, GrabOutcome, ParticipantId, Placement,
    Proposal, ProposalAck, Replica,
};
use jigsaw_engine::puzzle::{NoiseField, Puzzle};
use jigsaw_engine::PuzzleConfig;

const ALICE: ParticipantId = ParticipantId(1);
const BOB: ParticipantId = ParticipantId(2);

fn puzzle() -> Puzzle {
    let config = PuzzleConfig::default().with_num_pieces(4);
    Puzzle::generate(&config, (100, 100), &NoiseField::generate(3, 8, 8)).expect("generate puzzle")
}

fn sync(authority: &mut Authority, replicas: &mut [&mut Replica]) {
    let messages = authority.drain_messages();
    for replica in replicas.iter_mut() {
        for message in &messages {
            replica.apply(message).expect("apply");
        }
    }
}

/// Grab through a replica, drag the cluster so `piece` sits at `home`, release.
fn replica_drop(authority: &mut Authority, replica: &mut Replica, piece: usize, home: Placement) {
    let grab = replica.request_grab(piece).expect("idle cluster");
    let ack = authority.handle(replica.participant(), grab).expect("grab");
    let ProposalAck::Grab(GrabOutcome::Granted { cluster }) = ack else {
        panic!("grab rejected: {ack:?}");
    };

    let current = replica.state().piece_placement(piece).expect("piece");
    let cluster_at = replica.state().cluster(cluster).expect("cluster").placement;
    let local = cluster_at.relative(current);
    let placement = Placement::new(
        home.position - local.position.rotated_deg(home.rotation_deg - local.rotation_deg),
        home.rotation_deg - local.rotation_deg,
    );
    let moved = replica.move_held(cluster, placement).expect("held");
    authority.handle(replica.participant(), moved).expect("move");
    let release = replica.release(cluster).expect("held");
    authority.handle(replica.participant(), release).expect("release");
}

#[test]
fn replicas_converge_on_authority_state() {
    let puzzle = puzzle();
    let start = AssemblyState::scattered(&puzzle, 99, puzzle.size() * 3.0);
    let mut authority = Authority::new(&puzzle, start.clone());
    let mut alice = Replica::new(ALICE, start.clone(), 0);
    let mut bob = Replica::new(BOB, start, 0);

    for id in [1, 0, 3, 2] {
        let home = Placement::at(puzzle.piece(id).expect("piece").center);
        let who = if id % 2 == 0 { &mut alice } else { &mut bob };
        replica_drop(&mut authority, who, id, home);
        sync(&mut authority, &mut [&mut alice, &mut bob]);
    }
    authority.tick(60_000).expect("tick");
    sync(&mut authority, &mut [&mut alice, &mut bob]);

    assert!(authority.state().is_complete());
    assert_eq!(alice.state(), authority.state());
    assert_eq!(bob.state(), authority.state());
    assert_eq!(alice.last_seq(), authority.seq());
}

#[test]
fn late_joiner_starts_from_snapshot() {
    let puzzle = puzzle();
    let start = AssemblyState::scattered(&puzzle, 5, puzzle.size() * 3.0);
    let mut authority = Authority::new(&puzzle, start.clone());
    let mut alice = Replica::new(ALICE, start, 0);

    let home = Placement::at(puzzle.piece(2).expect("piece").center);
    replica_drop(&mut authority, &mut alice, 2, home);
    sync(&mut authority, &mut [&mut alice]);

    let mut bob = Replica::new(BOB, authority.state().clone(), authority.seq());
    let home = Placement::at(puzzle.piece(0).expect("piece").center);
    replica_drop(&mut authority, &mut alice, 0, home);
    sync(&mut authority, &mut [&mut alice, &mut bob]);

    assert_eq!(bob.state(), authority.state());
    assert_eq!(alice.state(), bob.state());
}

#[test]
fn losing_grab_race_rolls_back_prediction() {
    let puzzle = puzzle();
    let start = AssemblyState::new(&puzzle);
    let mut authority = Authority::new(&puzzle, start.clone());
    let mut alice = Replica::new(ALICE, start.clone(), 0);
    let mut bob = Replica::new(BOB, start, 0);

    let alice_grab = alice.request_grab(1).expect("idle");
    let bob_grab = bob.request_grab(1).expect("idle locally");
    bob.move_held(ClusterId(1), Placement::at(puzzle.size()))
        .expect("held locally");

    authority.handle(ALICE, alice_grab).expect("grab");
    let ack = authority.handle(BOB, bob_grab).expect("grab");
    assert_eq!(
        ack,
        ProposalAck::Grab(GrabOutcome::Rejected {
            cluster: ClusterId(1),
            holder: ALICE
        })
    );
    bob.on_grab_rejected(ClusterId(1));
    sync(&mut authority, &mut [&mut alice, &mut bob]);

    assert!(alice.holds(ClusterId(1)));
    assert!(!bob.holds(ClusterId(1)));
    assert_eq!(bob.piece_placement(1), authority.state().piece_placement(1));
    assert_eq!(bob.state(), authority.state());
}

#[test]
fn disconnect_frees_clusters_for_others() {
    let puzzle = puzzle();
    let start = AssemblyState::new(&puzzle);
    let mut authority = Authority::new(&puzzle, start.clone());
    let mut bob = Replica::new(BOB, start, 0);

    authority.handle(ALICE, Proposal::Grab { piece: 3 }).expect("grab");
    sync(&mut authority, &mut [&mut bob]);
    assert!(bob.request_grab(3).is_none());

    assert_eq!(
        authority.on_participant_disconnected(ALICE).expect("disconnect"),
        vec![ClusterId(3)]
    );
    sync(&mut authority, &mut [&mut bob]);
    assert!(bob.request_grab(3).is_some());
}

#[test]
fn out_of_order_message_is_rejected() {
    let puzzle = puzzle();
    let start = AssemblyState::new(&puzzle);
    let mut authority = Authority::new(&puzzle, start.clone());
    let mut bob = Replica::new(BOB, start, 0);

    authority.handle(ALICE, Proposal::Grab { piece: 0 }).expect("grab");
    authority
        .handle(
            ALICE,
            Proposal::Move {
                cluster: ClusterId(0),
                placement: Placement::IDENTITY,
            },
        )
        .expect("move");
    let messages = authority.drain_messages();

    assert_eq!(
        bob.apply(&messages[1]),
        Err(AssemblyError::SequenceGap { expected: 1, got: 2 })
    );
    bob.apply(&messages[0]).expect("first");
    bob.apply(&messages[1]).expect("second");
    bob.apply(&messages[0]).expect("duplicate");
    assert_eq!(bob.state(), authority.state());
}
