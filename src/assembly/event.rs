use serde::{Deserialize, Serialize};

use crate::puzzle::Side;

use super::state::{ClusterId, ParticipantId};
use super::transform::Placement;

/// One authoritative state change. Replicas reach the authority's state by
/// applying these in sequence order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AssemblyEvent {
    /// `holder: None` releases the cluster.
    GrabChanged {
        cluster: ClusterId,
        holder: Option<ParticipantId>,
    },
    ClusterMoved {
        cluster: ClusterId,
        placement: Placement,
    },
    /// Move a piece between clusters; `local` is its placement in the new
    /// cluster's frame.
    PieceReassigned {
        piece: usize,
        from: ClusterId,
        to: ClusterId,
        local: Placement,
    },
    /// The seam between `piece`'s `side` and `neighbor` is closed for good.
    SeamConnected {
        piece: usize,
        side: Side,
        neighbor: usize,
    },
    /// The cluster lost its last piece and is removed after the grace delay.
    ClusterRetired { cluster: ClusterId, at_ms: u64 },
    ClusterRemoved { cluster: ClusterId },
}

/// Sequence-numbered broadcast from the authority.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthorityMessage {
    pub seq: u64,
    /// Participant whose request caused the change, if any.
    pub source: Option<ParticipantId>,
    pub event: AssemblyEvent,
}

/// Request a participant sends to the authority.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Proposal {
    Grab { piece: usize },
    Move { cluster: ClusterId, placement: Placement },
    Release { cluster: ClusterId },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GrabOutcome {
    Granted { cluster: ClusterId },
    /// The cluster was already held; nothing changed.
    Rejected {
        cluster: ClusterId,
        holder: ParticipantId,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseOutcome {
    /// Cluster holding the released pieces after the merge.
    pub anchor: ClusterId,
    /// Clusters folded into `anchor`, in merge order.
    pub merged: Vec<ClusterId>,
}

/// Reply to a [`Proposal`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ProposalAck {
    Grab(GrabOutcome),
    Moved,
    Released(ReleaseOutcome),
}
