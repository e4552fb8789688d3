use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::geom::Vec2;
use crate::puzzle::{Puzzle, Side};

use super::AssemblyError;
use super::event::AssemblyEvent;
use super::transform::Placement;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ClusterId(pub u32);

impl fmt::Display for ClusterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cluster#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ParticipantId(pub u64);

impl fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "participant#{}", self.0)
    }
}

/// Pieces moving as one rigid body.
#[derive(Debug, Clone, PartialEq)]
pub struct Cluster {
    pub id: ClusterId,
    pub members: BTreeSet<usize>,
    /// Participant holding the cluster; `Some` is the grab lock.
    pub holder: Option<ParticipantId>,
    pub placement: Placement,
    /// Set when the cluster lost its last piece.
    pub retired_at_ms: Option<u64>,
}

impl Cluster {
    #[must_use]
    pub fn is_grabbed(&self) -> bool {
        self.holder.is_some()
    }

    #[must_use]
    pub fn is_retired(&self) -> bool {
        self.retired_at_ms.is_some()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.members.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

/// Runtime copy of one piece: which cluster owns it and where it sits in
/// that cluster's frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PieceInstance {
    pub cluster: ClusterId,
    pub local: Placement,
}

/// Arena of clusters and piece instances.
///
/// Pieces refer to clusters by id and clusters list their members by piece
/// id; [`AssemblyState::apply`] keeps both sides in step. Every mutation goes
/// through `apply`, on the authority and on replicas alike.
#[derive(Debug, Clone, PartialEq)]
pub struct AssemblyState {
    clusters: BTreeMap<ClusterId, Cluster>,
    pieces: Vec<PieceInstance>,
    seams: Vec<[bool; 4]>,
}

impl AssemblyState {
    /// One cluster per piece, each at its solved position.
    #[must_use]
    pub fn new(puzzle: &Puzzle) -> Self {
        Self::from_placements(
            puzzle
                .pieces()
                .iter()
                .map(|piece| Placement::at(piece.center))
                .collect(),
        )
    }

    /// One cluster per piece, spread at seeded random positions and
    /// rotations inside an `area` centered on the origin.
    #[must_use]
    pub fn scattered(puzzle: &Puzzle, seed: u64, area: Vec2) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let placements = (0..puzzle.len())
            .map(|_| {
                let x = (rng.random::<f64>() - 0.5) * area.x;
                let y = (rng.random::<f64>() - 0.5) * area.y;
                let rotation = rng.random::<f64>() * 360.0;
                Placement::new(Vec2::new(x, y), rotation)
            })
            .collect();
        Self::from_placements(placements)
    }

    /// One singleton cluster per placement; cluster ids equal piece ids.
    #[must_use]
    pub fn from_placements(placements: Vec<Placement>) -> Self {
        let mut clusters = BTreeMap::new();
        let mut pieces = Vec::with_capacity(placements.len());
        for (piece, placement) in placements.into_iter().enumerate() {
            let id = ClusterId(piece as u32);
            clusters.insert(
                id,
                Cluster {
                    id,
                    members: BTreeSet::from([piece]),
                    holder: None,
                    placement,
                    retired_at_ms: None,
                },
            );
            pieces.push(PieceInstance {
                cluster: id,
                local: Placement::IDENTITY,
            });
        }
        let seams = vec![[false; 4]; pieces.len()];
        Self {
            clusters,
            pieces,
            seams,
        }
    }

    #[must_use]
    pub fn cluster(&self, id: ClusterId) -> Option<&Cluster> {
        self.clusters.get(&id)
    }

    pub fn clusters(&self) -> impl Iterator<Item = &Cluster> {
        self.clusters.values()
    }

    #[must_use]
    pub fn piece(&self, piece: usize) -> Option<&PieceInstance> {
        self.pieces.get(piece)
    }

    #[must_use]
    pub fn piece_count(&self) -> usize {
        self.pieces.len()
    }

    #[must_use]
    pub fn cluster_of(&self, piece: usize) -> Option<ClusterId> {
        self.pieces.get(piece).map(|p| p.cluster)
    }

    /// World placement of a piece: its cluster's placement composed with
    /// the piece's local placement.
    #[must_use]
    pub fn piece_placement(&self, piece: usize) -> Option<Placement> {
        let instance = self.pieces.get(piece)?;
        let cluster = self.clusters.get(&instance.cluster)?;
        Some(cluster.placement.compose(instance.local))
    }

    #[must_use]
    pub fn is_connected(&self, piece: usize, side: Side) -> bool {
        self.seams
            .get(piece)
            .is_some_and(|sides| sides[side.index()])
    }

    /// Clusters that still own pieces.
    #[must_use]
    pub fn live_cluster_count(&self) -> usize {
        self.clusters.values().filter(|c| !c.is_empty()).count()
    }

    /// All pieces share one cluster.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        !self.pieces.is_empty() && self.live_cluster_count() == 1
    }

    /// Retired clusters whose grace delay has passed at `now_ms`.
    #[must_use]
    pub fn expired_clusters(&self, now_ms: u64, delay_ms: u64) -> Vec<ClusterId> {
        self.clusters
            .values()
            .filter(|c| {
                c.retired_at_ms
                    .is_some_and(|at| now_ms >= at.saturating_add(delay_ms))
            })
            .map(|c| c.id)
            .collect()
    }

    pub fn apply(&mut self, event: &AssemblyEvent) -> Result<(), AssemblyError> {
        match *event {
            AssemblyEvent::GrabChanged { cluster, holder } => {
                self.live_cluster_mut(cluster)?.holder = holder;
            }
            AssemblyEvent::ClusterMoved { cluster, placement } => {
                self.live_cluster_mut(cluster)?.placement = placement;
            }
            AssemblyEvent::PieceReassigned {
                piece,
                from,
                to,
                local,
            } => {
                let instance = self
                    .pieces
                    .get(piece)
                    .ok_or(AssemblyError::UnknownPiece { piece })?;
                if instance.cluster != from {
                    return Err(AssemblyError::NotMember { piece, cluster: from });
                }
                self.live_cluster_mut(to)?.members.insert(piece);
                self.cluster_mut(from)?.members.remove(&piece);
                self.pieces[piece] = PieceInstance { cluster: to, local };
            }
            AssemblyEvent::SeamConnected {
                piece,
                side,
                neighbor,
            } => {
                if neighbor >= self.seams.len() {
                    return Err(AssemblyError::UnknownPiece { piece: neighbor });
                }
                let sides = self
                    .seams
                    .get_mut(piece)
                    .ok_or(AssemblyError::UnknownPiece { piece })?;
                sides[side.index()] = true;
                self.seams[neighbor][side.opposite().index()] = true;
            }
            AssemblyEvent::ClusterRetired { cluster, at_ms } => {
                let c = self.live_cluster_mut(cluster)?;
                if !c.is_empty() {
                    return Err(AssemblyError::ClusterNotEmpty { cluster });
                }
                c.retired_at_ms = Some(at_ms);
            }
            AssemblyEvent::ClusterRemoved { cluster } => {
                let c = self.cluster_mut(cluster)?;
                if !c.is_empty() {
                    return Err(AssemblyError::ClusterNotEmpty { cluster });
                }
                self.clusters.remove(&cluster);
            }
        }
        Ok(())
    }

    fn cluster_mut(&mut self, id: ClusterId) -> Result<&mut Cluster, AssemblyError> {
        self.clusters
            .get_mut(&id)
            .ok_or(AssemblyError::UnknownCluster { cluster: id })
    }

    fn live_cluster_mut(&mut self, id: ClusterId) -> Result<&mut Cluster, AssemblyError> {
        let cluster = self.cluster_mut(id)?;
        if cluster.is_retired() {
            return Err(AssemblyError::ClusterRetired { cluster: id });
        }
        Ok(cluster)
    }
}
