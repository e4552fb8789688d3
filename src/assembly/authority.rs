use crate::geom::{Vec2, angle_delta_deg};
use crate::puzzle::{NeighborSlot, Puzzle, Side};

use super::AssemblyError;
use super::event::{
    AssemblyEvent, AuthorityMessage, GrabOutcome, Proposal, ProposalAck, ReleaseOutcome,
};
use super::fit::{FitThresholds, fits};
use super::state::{AssemblyState, Cluster, ClusterId, ParticipantId};
use super::transform::Placement;

/// A seam that passed the fit test during one release.
#[derive(Debug, Clone, Copy)]
struct SeamFit {
    /// Cluster of `neighbor`.
    cluster: ClusterId,
    /// Piece of the released cluster.
    piece: usize,
    neighbor: usize,
    /// `neighbor`'s solved center minus `piece`'s.
    offset: Vec2,
}

/// Sole writer of the assembly state.
///
/// Each handler validates a participant's request, applies the resulting
/// events to its own state and queues them for broadcast. A handler runs to
/// completion before the next one starts, so a merge touching several
/// clusters is one atomic step.
#[derive(Debug, Clone)]
pub struct Authority {
    state: AssemblyState,
    slots: Vec<[NeighborSlot; 4]>,
    thresholds: FitThresholds,
    teardown_delay_ms: u64,
    seq: u64,
    now_ms: u64,
    outbox: Vec<AuthorityMessage>,
}

impl Authority {
    #[must_use]
    pub fn new(puzzle: &Puzzle, state: AssemblyState) -> Self {
        Self {
            state,
            slots: puzzle.pieces().iter().map(|piece| piece.slots).collect(),
            thresholds: puzzle.config().fit_thresholds(),
            teardown_delay_ms: puzzle.config().teardown_delay_ms,
            seq: 0,
            now_ms: 0,
            outbox: Vec::new(),
        }
    }

    #[must_use]
    pub const fn state(&self) -> &AssemblyState {
        &self.state
    }

    /// Sequence number of the last emitted message.
    #[must_use]
    pub const fn seq(&self) -> u64 {
        self.seq
    }

    #[must_use]
    pub const fn thresholds(&self) -> FitThresholds {
        self.thresholds
    }

    /// Messages emitted since the last drain, oldest first.
    pub fn drain_messages(&mut self) -> Vec<AuthorityMessage> {
        std::mem::take(&mut self.outbox)
    }

    /// Dispatch a proposal to its handler.
    pub fn handle(
        &mut self,
        participant: ParticipantId,
        proposal: Proposal,
    ) -> Result<ProposalAck, AssemblyError> {
        match proposal {
            Proposal::Grab { piece } => self
                .on_grab_requested(participant, piece)
                .map(ProposalAck::Grab),
            Proposal::Move { cluster, placement } => self
                .on_external_transform_update(participant, cluster, placement)
                .map(|()| ProposalAck::Moved),
            Proposal::Release { cluster } => self
                .on_release_requested(participant, cluster)
                .map(ProposalAck::Released),
        }
    }

    /// Grab the cluster owning `piece`. First request wins; a request for a
    /// held cluster is rejected without any state change.
    pub fn on_grab_requested(
        &mut self,
        participant: ParticipantId,
        piece: usize,
    ) -> Result<GrabOutcome, AssemblyError> {
        let cluster = self
            .state
            .cluster_of(piece)
            .ok_or(AssemblyError::UnknownPiece { piece })?;
        if let Some(holder) = self.cluster(cluster)?.holder {
            log::warn!("{participant} cannot grab {cluster}: held by {holder}");
            return Ok(GrabOutcome::Rejected { cluster, holder });
        }

        self.emit(
            Some(participant),
            AssemblyEvent::GrabChanged {
                cluster,
                holder: Some(participant),
            },
        )?;
        log::info!("{participant} grabbed {cluster} (piece {piece})");
        Ok(GrabOutcome::Granted { cluster })
    }

    /// Move a held cluster. Only its holder may move it.
    pub fn on_external_transform_update(
        &mut self,
        participant: ParticipantId,
        cluster: ClusterId,
        placement: Placement,
    ) -> Result<(), AssemblyError> {
        self.require_holder(participant, cluster)?;
        self.emit(
            Some(participant),
            AssemblyEvent::ClusterMoved { cluster, placement },
        )
    }

    /// Drop a held cluster, then merge every cluster that fits against it.
    pub fn on_release_requested(
        &mut self,
        participant: ParticipantId,
        cluster: ClusterId,
    ) -> Result<ReleaseOutcome, AssemblyError> {
        self.require_holder(participant, cluster)?;
        self.emit(
            Some(participant),
            AssemblyEvent::GrabChanged {
                cluster,
                holder: None,
            },
        )?;

        let outcome = self.merge_fitting(participant, cluster)?;
        if !outcome.merged.is_empty() && self.state.is_complete() {
            log::info!("puzzle complete: all pieces in {}", outcome.anchor);
        }
        Ok(outcome)
    }

    /// Release everything `participant` holds, without fit detection.
    pub fn on_participant_disconnected(
        &mut self,
        participant: ParticipantId,
    ) -> Result<Vec<ClusterId>, AssemblyError> {
        let held: Vec<ClusterId> = self
            .state
            .clusters()
            .filter(|c| c.holder == Some(participant))
            .map(|c| c.id)
            .collect();
        for &cluster in &held {
            self.emit(
                None,
                AssemblyEvent::GrabChanged {
                    cluster,
                    holder: None,
                },
            )?;
        }
        if !held.is_empty() {
            log::info!("{participant} disconnected, released {} clusters", held.len());
        }
        Ok(held)
    }

    /// Advance the clock and remove retired clusters whose grace delay has
    /// passed. The clock never runs backwards.
    pub fn tick(&mut self, now_ms: u64) -> Result<Vec<ClusterId>, AssemblyError> {
        self.now_ms = self.now_ms.max(now_ms);
        let expired = self
            .state
            .expired_clusters(self.now_ms, self.teardown_delay_ms);
        for &cluster in &expired {
            self.emit(None, AssemblyEvent::ClusterRemoved { cluster })?;
            log::debug!("removed {cluster}");
        }
        Ok(expired)
    }

    fn emit(
        &mut self,
        source: Option<ParticipantId>,
        event: AssemblyEvent,
    ) -> Result<(), AssemblyError> {
        self.state.apply(&event)?;
        self.seq += 1;
        self.outbox.push(AuthorityMessage {
            seq: self.seq,
            source,
            event,
        });
        Ok(())
    }

    fn cluster(&self, cluster: ClusterId) -> Result<&Cluster, AssemblyError> {
        self.state
            .cluster(cluster)
            .ok_or(AssemblyError::UnknownCluster { cluster })
    }

    fn piece_placement(&self, piece: usize) -> Result<Placement, AssemblyError> {
        self.state
            .piece_placement(piece)
            .ok_or(AssemblyError::UnknownPiece { piece })
    }

    fn require_holder(
        &self,
        participant: ParticipantId,
        cluster: ClusterId,
    ) -> Result<(), AssemblyError> {
        let c = self.cluster(cluster)?;
        if c.is_retired() {
            return Err(AssemblyError::ClusterRetired { cluster });
        }
        match c.holder {
            None => Err(AssemblyError::NotGrabbed { cluster }),
            Some(holder) if holder != participant => {
                log::warn!("{participant} tried to act on {cluster} held by {holder}");
                Err(AssemblyError::NotHolder {
                    cluster,
                    participant,
                })
            }
            Some(_) => Ok(()),
        }
    }

    fn merge_fitting(
        &mut self,
        source: ParticipantId,
        released: ClusterId,
    ) -> Result<ReleaseOutcome, AssemblyError> {
        let fitting = self.detect_fits(source, released)?;
        if fitting.is_empty() {
            return Ok(ReleaseOutcome {
                anchor: released,
                merged: Vec::new(),
            });
        }

        // Ties keep the earlier candidate, so the released cluster wins them.
        let mut anchor = released;
        let mut anchor_len = self.cluster(released)?.len();
        for fit in &fitting {
            let len = self.cluster(fit.cluster)?.len();
            if len > anchor_len {
                anchor = fit.cluster;
                anchor_len = len;
            }
        }

        let mut merged = Vec::with_capacity(fitting.len());
        if anchor != released {
            if let Some(fit) = fitting.iter().find(|f| f.cluster == anchor) {
                self.snap(source, released, fit.piece, fit.neighbor, -fit.offset)?;
            }
            merged.push(released);
        }
        for fit in fitting.iter().filter(|f| f.cluster != anchor) {
            self.snap(source, fit.cluster, fit.neighbor, fit.piece, fit.offset)?;
            merged.push(fit.cluster);
        }

        for &cluster in &merged {
            self.reassign(source, cluster, anchor)?;
        }
        log::info!(
            "merged {} clusters into {anchor} ({} pieces)",
            merged.len(),
            self.cluster(anchor)?.len()
        );
        Ok(ReleaseOutcome { anchor, merged })
    }

    /// Test every open seam of the released cluster, closing the seams that
    /// fit. At most one seam per neighboring cluster is taken.
    fn detect_fits(
        &mut self,
        source: ParticipantId,
        released: ClusterId,
    ) -> Result<Vec<SeamFit>, AssemblyError> {
        let members: Vec<usize> = self.cluster(released)?.members.iter().copied().collect();
        let mut fitting: Vec<SeamFit> = Vec::new();

        for &piece in &members {
            let slots = *self
                .slots
                .get(piece)
                .ok_or(AssemblyError::UnknownPiece { piece })?;
            for side in Side::ALL {
                let slot = slots[side.index()];
                let Some(neighbor) = slot.neighbor.id() else {
                    continue;
                };
                if self.state.is_connected(piece, side) {
                    continue;
                }
                let cluster = self
                    .state
                    .cluster_of(neighbor)
                    .ok_or(AssemblyError::UnknownPiece { piece: neighbor })?;
                if cluster == released || fitting.iter().any(|f| f.cluster == cluster) {
                    continue;
                }
                if self.cluster(cluster)?.is_grabbed() {
                    continue;
                }

                let p = self.piece_placement(piece)?;
                let q = self.piece_placement(neighbor)?;
                if !fits(p, q, slot.correct_offset, self.thresholds) {
                    continue;
                }

                log::debug!("piece {piece} fits piece {neighbor} on its {side:?} side");
                self.emit(
                    Some(source),
                    AssemblyEvent::SeamConnected {
                        piece,
                        side,
                        neighbor,
                    },
                )?;
                fitting.push(SeamFit {
                    cluster,
                    piece,
                    neighbor,
                    offset: slot.correct_offset,
                });
            }
        }
        Ok(fitting)
    }

    /// Move `cluster` rigidly so that its piece `moving` sits at `offset`
    /// from piece `fixed`, in `fixed`'s frame, with `fixed`'s rotation.
    fn snap(
        &mut self,
        source: ParticipantId,
        cluster: ClusterId,
        moving: usize,
        fixed: usize,
        offset: Vec2,
    ) -> Result<(), AssemblyError> {
        let m = self.piece_placement(moving)?;
        let f = self.piece_placement(fixed)?;
        let target = f.apply(offset);
        let turn = angle_delta_deg(f.rotation_deg, m.rotation_deg);

        let placement = self
            .cluster(cluster)?
            .placement
            .rotated_about(m.position, turn)
            .translated(target - m.position);
        self.emit(
            Some(source),
            AssemblyEvent::ClusterMoved { cluster, placement },
        )
    }

    /// Move every piece of `from` into `to`, keeping world placements.
    fn reassign(
        &mut self,
        source: ParticipantId,
        from: ClusterId,
        to: ClusterId,
    ) -> Result<(), AssemblyError> {
        let anchor = self.cluster(to)?.placement;
        let members: Vec<usize> = self.cluster(from)?.members.iter().copied().collect();
        for piece in members {
            let local = anchor.relative(self.piece_placement(piece)?);
            self.emit(
                Some(source),
                AssemblyEvent::PieceReassigned {
                    piece,
                    from,
                    to,
                    local,
                },
            )?;
        }
        debug_assert!(
            self.state.cluster(from).is_some_and(Cluster::is_empty),
            "{from} kept members after reassignment"
        );
        self.emit(
            Some(source),
            AssemblyEvent::ClusterRetired {
                cluster: from,
                at_ms: self.now_ms,
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PuzzleConfig;
    use crate::geom::Tolerance;
    use crate::puzzle::NoiseField;

    const ALICE: ParticipantId = ParticipantId(1);
    const BOB: ParticipantId = ParticipantId(2);

    fn puzzle() -> Puzzle {
        let config = PuzzleConfig::default().with_num_pieces(4);
        Puzzle::generate(&config, (100, 100), &NoiseField::generate(7, 8, 8)).unwrap()
    }

    /// Every piece at three times its solved center, so nothing fits.
    fn spread(puzzle: &Puzzle) -> AssemblyState {
        AssemblyState::from_placements(
            puzzle
                .pieces()
                .iter()
                .map(|piece| Placement::at(piece.center * 3.0))
                .collect(),
        )
    }

    fn offset(puzzle: &Puzzle, piece: usize, side: Side) -> Vec2 {
        puzzle.piece(piece).unwrap().slot(side).correct_offset
    }

    fn drop_at(authority: &mut Authority, who: ParticipantId, piece: usize, at: Placement) -> ReleaseOutcome {
        let GrabOutcome::Granted { cluster } = authority.on_grab_requested(who, piece).unwrap() else {
            panic!("grab of piece {piece} rejected");
        };
        authority.on_external_transform_update(who, cluster, at).unwrap();
        authority.on_release_requested(who, cluster).unwrap()
    }

    fn assert_placement_eq(a: Placement, b: Placement) {
        assert!(Tolerance::LOOSE.approx_eq_vec2(a.position, b.position), "{a:?} vs {b:?}");
        assert!(angle_delta_deg(a.rotation_deg, b.rotation_deg).abs() < 1e-6, "{a:?} vs {b:?}");
    }

    #[test]
    fn test_exact_drop_merges_into_released_cluster() {
        let puzzle = puzzle();
        let mut authority = Authority::new(&puzzle, spread(&puzzle));
        let one = authority.state().piece_placement(1).unwrap();
        let target = one.translated(-offset(&puzzle, 0, Side::Right));

        let outcome = drop_at(&mut authority, ALICE, 0, target);
        assert_eq!(outcome.anchor, ClusterId(0));
        assert_eq!(outcome.merged, vec![ClusterId(1)]);

        let state = authority.state();
        assert_eq!(state.cluster(ClusterId(0)).unwrap().len(), 2);
        assert_eq!(state.cluster_of(1), Some(ClusterId(0)));
        assert!(state.is_connected(0, Side::Right));
        assert!(state.is_connected(1, Side::Left));
        assert!(state.cluster(ClusterId(1)).unwrap().is_retired());
        assert_placement_eq(state.piece_placement(1).unwrap(), one);
    }

    #[test]
    fn test_rotation_mismatch_does_not_merge() {
        let puzzle = puzzle();
        let mut authority = Authority::new(&puzzle, spread(&puzzle));
        let one = authority.state().piece_placement(1).unwrap();
        let target = Placement::new(one.position - offset(&puzzle, 0, Side::Right), 20.0);

        let outcome = drop_at(&mut authority, ALICE, 0, target);
        assert!(outcome.merged.is_empty());
        assert_eq!(authority.state().live_cluster_count(), 4);
        assert!(!authority.state().is_connected(0, Side::Right));
    }

    #[test]
    fn test_larger_cluster_anchors_and_released_cluster_snaps() {
        let puzzle = puzzle();
        let mut authority = Authority::new(&puzzle, spread(&puzzle));
        let one = authority.state().piece_placement(1).unwrap();
        drop_at(&mut authority, ALICE, 0, one.translated(-offset(&puzzle, 0, Side::Right)));

        // Turn the pair, then drop piece 2 slightly off above piece 0.
        let pair = authority.state().cluster(ClusterId(0)).unwrap().placement;
        let turned = Placement::new(pair.position, 30.0);
        let again = drop_at(&mut authority, ALICE, 0, turned);
        assert!(again.merged.is_empty());

        let zero = authority.state().piece_placement(0).unwrap();
        let above = zero.apply(offset(&puzzle, 0, Side::Top));
        let outcome = drop_at(
            &mut authority,
            BOB,
            2,
            Placement::new(above + Vec2::new(0.02, -0.01), 33.0),
        );
        assert_eq!(outcome.anchor, ClusterId(0));
        assert_eq!(outcome.merged, vec![ClusterId(2)]);

        let state = authority.state();
        assert_eq!(state.cluster(ClusterId(0)).unwrap().len(), 3);
        assert!(state.is_connected(2, Side::Bottom));
        assert_placement_eq(state.piece_placement(2).unwrap(), Placement::new(above, 30.0));
        assert_placement_eq(state.piece_placement(0).unwrap(), zero);
    }

    #[test]
    fn test_equal_clusters_join_released_in_discovery_order() {
        let puzzle = puzzle();
        let mut placements: Vec<Placement> =
            puzzle.pieces().iter().map(|p| Placement::at(p.center)).collect();
        placements[3] = Placement::at(puzzle.piece(3).unwrap().center * 4.0);
        let mut authority = Authority::new(&puzzle, AssemblyState::from_placements(placements));

        let outcome = drop_at(&mut authority, ALICE, 0, Placement::at(puzzle.piece(0).unwrap().center));
        assert_eq!(outcome.anchor, ClusterId(0));
        // Top is tested before right.
        assert_eq!(outcome.merged, vec![ClusterId(2), ClusterId(1)]);
        assert_eq!(authority.state().live_cluster_count(), 2);
    }

    #[test]
    fn test_connected_seams_are_not_detected_again() {
        let puzzle = puzzle();
        let mut authority = Authority::new(&puzzle, spread(&puzzle));
        let one = authority.state().piece_placement(1).unwrap();
        drop_at(&mut authority, ALICE, 0, one.translated(-offset(&puzzle, 0, Side::Right)));
        authority.drain_messages();

        let pair = authority.state().cluster(ClusterId(0)).unwrap().placement;
        let outcome = drop_at(&mut authority, ALICE, 1, pair);
        assert!(outcome.merged.is_empty());
        assert!(
            authority
                .drain_messages()
                .iter()
                .all(|m| !matches!(m.event, AssemblyEvent::SeamConnected { .. }))
        );
    }

    #[test]
    fn test_held_cluster_rejects_other_participants() {
        let puzzle = puzzle();
        let mut authority = Authority::new(&puzzle, spread(&puzzle));
        assert_eq!(
            authority.on_grab_requested(ALICE, 2).unwrap(),
            GrabOutcome::Granted { cluster: ClusterId(2) }
        );
        let seq = authority.seq();

        assert_eq!(
            authority.on_grab_requested(BOB, 2).unwrap(),
            GrabOutcome::Rejected {
                cluster: ClusterId(2),
                holder: ALICE
            }
        );
        assert_eq!(authority.seq(), seq);
        assert_eq!(
            authority.on_external_transform_update(BOB, ClusterId(2), Placement::IDENTITY),
            Err(AssemblyError::NotHolder {
                cluster: ClusterId(2),
                participant: BOB
            })
        );
        assert_eq!(
            authority.on_release_requested(BOB, ClusterId(3)),
            Err(AssemblyError::NotGrabbed { cluster: ClusterId(3) })
        );
        assert_eq!(
            authority.on_grab_requested(BOB, 9),
            Err(AssemblyError::UnknownPiece { piece: 9 })
        );
    }

    #[test]
    fn test_emptied_cluster_is_removed_after_grace_delay() {
        let puzzle = puzzle();
        let mut authority = Authority::new(&puzzle, spread(&puzzle));
        authority.tick(500).unwrap();
        let one = authority.state().piece_placement(1).unwrap();
        drop_at(&mut authority, ALICE, 0, one.translated(-offset(&puzzle, 0, Side::Right)));

        assert!(authority.tick(1499).unwrap().is_empty());
        assert_eq!(authority.tick(1500).unwrap(), vec![ClusterId(1)]);
        assert!(authority.state().cluster(ClusterId(1)).is_none());
        assert!(authority.tick(400).unwrap().is_empty());
    }

    #[test]
    fn test_disconnect_releases_held_clusters() {
        let puzzle = puzzle();
        let mut authority = Authority::new(&puzzle, spread(&puzzle));
        authority.on_grab_requested(ALICE, 0).unwrap();
        authority.on_grab_requested(ALICE, 3).unwrap();
        authority.on_grab_requested(BOB, 1).unwrap();

        let released = authority.on_participant_disconnected(ALICE).unwrap();
        assert_eq!(released, vec![ClusterId(0), ClusterId(3)]);
        assert!(!authority.state().cluster(ClusterId(0)).unwrap().is_grabbed());
        assert!(authority.state().cluster(ClusterId(1)).unwrap().is_grabbed());
    }

    #[test]
    fn test_messages_are_numbered_in_order() {
        let puzzle = puzzle();
        let mut authority = Authority::new(&puzzle, spread(&puzzle));
        authority
            .handle(ALICE, Proposal::Grab { piece: 1 })
            .unwrap();
        authority
            .handle(ALICE, Proposal::Release { cluster: ClusterId(1) })
            .unwrap();

        let messages = authority.drain_messages();
        let seqs: Vec<u64> = messages.iter().map(|m| m.seq).collect();
        assert_eq!(seqs, vec![1, 2]);
        assert!(messages.iter().all(|m| m.source == Some(ALICE)));
        assert!(authority.drain_messages().is_empty());
    }
}
