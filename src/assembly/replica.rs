use std::collections::{BTreeMap, BTreeSet};

use super::AssemblyError;
use super::event::{AssemblyEvent, AuthorityMessage, Proposal};
use super::state::{AssemblyState, ClusterId, ParticipantId};
use super::transform::Placement;

/// A participant's view of the assembly.
///
/// The confirmed state only ever changes by applying the authority's
/// messages. Local grabs and drags live in a prediction overlay on top of it
/// and are dropped as soon as the authority says otherwise.
#[derive(Debug, Clone)]
pub struct Replica {
    participant: ParticipantId,
    state: AssemblyState,
    last_seq: u64,
    pending_grab: Option<ClusterId>,
    held: BTreeSet<ClusterId>,
    predicted: BTreeMap<ClusterId, Placement>,
}

impl Replica {
    /// Start from a snapshot of the authority's state taken after message
    /// `last_seq`.
    #[must_use]
    pub fn new(participant: ParticipantId, state: AssemblyState, last_seq: u64) -> Self {
        Self {
            participant,
            state,
            last_seq,
            pending_grab: None,
            held: BTreeSet::new(),
            predicted: BTreeMap::new(),
        }
    }

    #[must_use]
    pub const fn participant(&self) -> ParticipantId {
        self.participant
    }

    /// Confirmed state, without local predictions.
    #[must_use]
    pub const fn state(&self) -> &AssemblyState {
        &self.state
    }

    #[must_use]
    pub const fn last_seq(&self) -> u64 {
        self.last_seq
    }

    /// Cluster this replica is waiting to have its grab confirmed on.
    #[must_use]
    pub const fn pending_grab(&self) -> Option<ClusterId> {
        self.pending_grab
    }

    #[must_use]
    pub fn holds(&self, cluster: ClusterId) -> bool {
        self.held.contains(&cluster)
    }

    /// Optimistically grab the cluster owning `piece`.
    ///
    /// Returns the proposal to send, or `None` when the cluster is already
    /// held as far as this replica knows or another grab is in flight.
    pub fn request_grab(&mut self, piece: usize) -> Option<Proposal> {
        if self.pending_grab.is_some() {
            return None;
        }
        let cluster = self.state.cluster_of(piece)?;
        if self.state.cluster(cluster)?.is_grabbed() {
            return None;
        }
        self.pending_grab = Some(cluster);
        self.held.insert(cluster);
        Some(Proposal::Grab { piece })
    }

    /// Drag a held cluster locally. Returns the proposal to send, or `None`
    /// when the cluster is not held.
    pub fn move_held(&mut self, cluster: ClusterId, placement: Placement) -> Option<Proposal> {
        if !self.held.contains(&cluster) {
            return None;
        }
        self.predicted.insert(cluster, placement);
        Some(Proposal::Move { cluster, placement })
    }

    /// Let go of a held cluster locally. The cluster shows its last dragged
    /// placement until the authority answers.
    pub fn release(&mut self, cluster: ClusterId) -> Option<Proposal> {
        if !self.held.remove(&cluster) {
            return None;
        }
        if self.pending_grab == Some(cluster) {
            self.pending_grab = None;
        }
        Some(Proposal::Release { cluster })
    }

    /// The authority refused a grab: drop everything predicted for it.
    pub fn on_grab_rejected(&mut self, cluster: ClusterId) {
        log::debug!("{}: grab of {cluster} rejected, rolling back", self.participant);
        self.rollback(cluster);
    }

    /// Apply one authority message. Messages already applied are ignored;
    /// a skipped sequence number is an error and leaves the state untouched.
    pub fn apply(&mut self, message: &AuthorityMessage) -> Result<(), AssemblyError> {
        if message.seq <= self.last_seq {
            return Ok(());
        }
        let expected = self.last_seq + 1;
        if message.seq != expected {
            return Err(AssemblyError::SequenceGap {
                expected,
                got: message.seq,
            });
        }

        self.state.apply(&message.event)?;
        self.last_seq = message.seq;
        self.reconcile(&message.event);
        Ok(())
    }

    /// Cluster placement as shown locally, prediction first.
    #[must_use]
    pub fn cluster_placement(&self, cluster: ClusterId) -> Option<Placement> {
        self.predicted
            .get(&cluster)
            .copied()
            .or_else(|| self.state.cluster(cluster).map(|c| c.placement))
    }

    /// Piece placement as shown locally, prediction first.
    #[must_use]
    pub fn piece_placement(&self, piece: usize) -> Option<Placement> {
        let instance = self.state.piece(piece)?;
        Some(self.cluster_placement(instance.cluster)?.compose(instance.local))
    }

    fn reconcile(&mut self, event: &AssemblyEvent) {
        match *event {
            AssemblyEvent::GrabChanged { cluster, holder } => {
                if holder == Some(self.participant) {
                    if self.pending_grab == Some(cluster) {
                        self.pending_grab = None;
                    }
                    self.held.insert(cluster);
                } else {
                    if self.held.contains(&cluster) || self.pending_grab == Some(cluster) {
                        log::debug!("{}: lost {cluster} to the authority", self.participant);
                    }
                    self.rollback(cluster);
                }
            }
            AssemblyEvent::ClusterMoved { cluster, .. } => {
                if !self.held.contains(&cluster) {
                    self.predicted.remove(&cluster);
                }
            }
            AssemblyEvent::ClusterRetired { cluster, .. }
            | AssemblyEvent::ClusterRemoved { cluster } => self.rollback(cluster),
            AssemblyEvent::PieceReassigned { .. } | AssemblyEvent::SeamConnected { .. } => {}
        }
    }

    fn rollback(&mut self, cluster: ClusterId) {
        if self.pending_grab == Some(cluster) {
            self.pending_grab = None;
        }
        self.held.remove(&cluster);
        self.predicted.remove(&cluster);
    }
}
