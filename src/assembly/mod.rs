//! Cluster assembly: grabbing, moving and releasing clusters, fit detection
//! and merging.
//!
//! One [`Authority`] owns the canonical [`AssemblyState`] and turns
//! participant [`Proposal`]s into sequence-numbered [`AuthorityMessage`]s.
//! Every participant, the authority included, changes state only by applying
//! those messages, so a [`Replica`] that applies the stream in order holds the
//! authority's state.

mod authority;
mod event;
mod fit;
mod replica;
mod state;
mod transform;

use thiserror::Error;

pub use authority::Authority;
pub use event::{
    AssemblyEvent, AuthorityMessage, GrabOutcome, Proposal, ProposalAck, ReleaseOutcome,
};
pub use fit::{FitThresholds, fits};
pub use replica::Replica;
pub use state::{AssemblyState, Cluster, ClusterId, ParticipantId, PieceInstance};
pub use transform::{Placement, ROTATION_STEP_DEG};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AssemblyError {
    #[error("unknown piece {piece}")]
    UnknownPiece { piece: usize },
    #[error("unknown {cluster}")]
    UnknownCluster { cluster: ClusterId },
    #[error("{cluster} is retired")]
    ClusterRetired { cluster: ClusterId },
    #[error("piece {piece} is not a member of {cluster}")]
    NotMember { piece: usize, cluster: ClusterId },
    #[error("{cluster} still has members")]
    ClusterNotEmpty { cluster: ClusterId },
    #[error("{participant} does not hold {cluster}")]
    NotHolder {
        cluster: ClusterId,
        participant: ParticipantId,
    },
    #[error("{cluster} is not grabbed")]
    NotGrabbed { cluster: ClusterId },
    /// A replica received a message out of order.
    #[error("expected message {expected}, got {got}")]
    SequenceGap { expected: u64, got: u64 },
}
