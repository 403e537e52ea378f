//! Resumable bake driver.
//!
//! A [`FlowBakeSession`] owns all per-vertex working state of one bake and
//! advances it one suspension point at a time:
//!
//! 1. overlap detection
//! 2. seeding plus the first walk layer
//! 3. one walk layer per call
//! 4. averaging and smoothing, producing the [`FlowBake`]
//!
//! Hosts with a frame budget call [`FlowBakeSession::resume`] once per frame;
//! everyone else calls [`bake`].

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use mesh_types::{MeshSnapshot, Point3};
use tracing::{debug, info};

use crate::averager::FlowAverager;
use crate::error::{FlowError, FlowResult};
use crate::overlap::OverlapSets;
use crate::params::FlowParams;
use crate::result::FlowBake;
use crate::smoothing::FlowSmoother;
use crate::topology::MeshTopologyIndex;
use crate::walker::FlowWalker;

/// Shared cancellation flag, checked at every suspension point.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    /// Create an untriggered token.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    /// Whether cancellation was requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// The work the next [`FlowBakeSession::resume`] call will do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BakeStage {
    /// Finding seam duplicates.
    DetectingOverlaps,
    /// Snapping seeds and walking the first layer.
    Seeding,
    /// Walking the next layer.
    Walking,
    /// Averaging the completed walk.
    Averaging,
    /// Finished, failed or cancelled.
    Done,
}

/// Snapshot of a session between suspension points.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BakeProgress {
    /// Stage the next resume will run.
    pub stage: BakeStage,
    /// Layers walked so far.
    pub layers: usize,
    /// Vertices waiting in the frontier.
    pub frontier: usize,
    /// Vertices walked so far.
    pub walked: usize,
}

/// Outcome of one [`FlowBakeSession::resume`] call.
#[derive(Debug)]
pub enum BakeStatus {
    /// More work remains.
    Pending(BakeProgress),
    /// The bake is complete.
    Complete(FlowBake),
}

#[derive(Debug)]
enum State<'a> {
    Detecting {
        topology: MeshTopologyIndex<'a>,
    },
    Seeding {
        topology: MeshTopologyIndex<'a>,
        overlaps: OverlapSets,
    },
    Walking(FlowWalker<'a>),
    Done,
}

/// A flow bake that can be suspended between stages and walk layers.
///
/// # Example
///
/// ```
/// use mesh_flow::{BakeStatus, FlowBakeSession, FlowParams};
/// use mesh_types::{MeshSnapshot, Point3, Vertex};
///
/// let vertices = vec![
///     Vertex::from_coords(0.0, 0.0, 0.0),
///     Vertex::from_coords(1.0, 0.0, 0.0),
///     Vertex::from_coords(0.0, 1.0, 0.0),
/// ];
/// let mesh = MeshSnapshot::from_faces(vertices, &[[0, 1, 2]]);
///
/// let mut session = FlowBakeSession::new(&mesh, &[Point3::origin()], FlowParams::default()).unwrap();
/// let bake = loop {
///     match session.resume().unwrap() {
///         BakeStatus::Pending(_) => continue,
///         BakeStatus::Complete(bake) => break bake,
///     }
/// };
/// assert_eq!(bake.field.reached_count(), 3);
/// ```
#[derive(Debug)]
pub struct FlowBakeSession<'a> {
    mesh: &'a MeshSnapshot,
    seeds: Vec<Point3<f64>>,
    params: FlowParams,
    cancel: CancelToken,
    state: State<'a>,
}

impl<'a> FlowBakeSession<'a> {
    /// Validate the inputs and prepare a session.
    ///
    /// No walking happens until the first [`resume`](Self::resume).
    ///
    /// # Errors
    ///
    /// - [`FlowError::InvalidParams`] if `params` fail validation
    /// - [`FlowError::InvalidTopology`] or
    ///   [`FlowError::AmbiguousSubmeshMembership`] if the mesh is malformed
    pub fn new(mesh: &'a MeshSnapshot, seeds: &[Point3<f64>], params: FlowParams) -> FlowResult<Self> {
        params.validate()?;
        let topology = MeshTopologyIndex::build(mesh)?;

        info!(
            vertices = mesh.vertex_count(),
            triangles = mesh.triangle_count(),
            seeds = seeds.len(),
            "Starting flow bake"
        );

        Ok(Self {
            mesh,
            seeds: seeds.to_vec(),
            params,
            cancel: CancelToken::new(),
            state: State::Detecting { topology },
        })
    }

    /// Use an external cancellation token.
    #[must_use]
    pub fn with_cancel_token(mut self, token: CancelToken) -> Self {
        self.cancel = token;
        self
    }

    /// Token that cancels this session.
    #[must_use]
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Bake parameters.
    #[must_use]
    pub const fn params(&self) -> &FlowParams {
        &self.params
    }

    /// Stage the next [`resume`](Self::resume) will run.
    #[must_use]
    pub fn stage(&self) -> BakeStage {
        match &self.state {
            State::Detecting { .. } => BakeStage::DetectingOverlaps,
            State::Seeding { .. } => BakeStage::Seeding,
            State::Walking(walker) if walker.has_pending_layer() => BakeStage::Walking,
            State::Walking(_) => BakeStage::Averaging,
            State::Done => BakeStage::Done,
        }
    }

    /// The walker, once seeding has run.
    #[must_use]
    pub fn walker(&self) -> Option<&FlowWalker<'a>> {
        match &self.state {
            State::Walking(walker) => Some(walker),
            _ => None,
        }
    }

    /// Current progress.
    #[must_use]
    pub fn progress(&self) -> BakeProgress {
        let (layers, frontier, walked) = self.walker().map_or((0, 0, 0), |walker| {
            (walker.stats().layers, walker.frontier_len(), walker.stats().walked)
        });
        BakeProgress {
            stage: self.stage(),
            layers,
            frontier,
            walked,
        }
    }

    /// Run work up to the next suspension point.
    ///
    /// # Errors
    ///
    /// - [`FlowError::Cancelled`] if the token was triggered; all working
    ///   state is dropped
    /// - [`FlowError::SessionFinished`] if the session already completed,
    ///   failed or was cancelled
    pub fn resume(&mut self) -> FlowResult<BakeStatus> {
        if matches!(self.state, State::Done) {
            return Err(FlowError::SessionFinished);
        }
        if self.cancel.is_cancelled() {
            self.state = State::Done;
            info!("Flow bake cancelled");
            return Err(FlowError::Cancelled);
        }

        match std::mem::replace(&mut self.state, State::Done) {
            State::Detecting { topology } => {
                let overlaps = OverlapSets::detect(
                    self.mesh,
                    self.params.overlap_epsilon,
                    self.params.overlap_strategy,
                    self.params.parallel,
                );
                self.state = State::Seeding { topology, overlaps };
            }
            State::Seeding { topology, overlaps } => {
                let mut walker = FlowWalker::new(topology, overlaps);
                walker.seed(&self.seeds, &self.params.seed_transform);
                walker.step_layer();
                self.state = State::Walking(walker);
            }
            State::Walking(mut walker) => {
                if walker.step_layer().is_none() {
                    return Ok(BakeStatus::Complete(self.complete(walker)));
                }
                self.state = State::Walking(walker);
            }
            State::Done => return Err(FlowError::SessionFinished),
        }

        let progress = self.progress();
        debug!(stage = ?progress.stage, layers = progress.layers, frontier = progress.frontier, "Bake suspended");
        Ok(BakeStatus::Pending(progress))
    }

    /// Drive the session to completion.
    ///
    /// # Errors
    ///
    /// Returns the first error [`resume`](Self::resume) reports.
    pub fn finish(mut self) -> FlowResult<FlowBake> {
        loop {
            if let BakeStatus::Complete(bake) = self.resume()? {
                return Ok(bake);
            }
        }
    }

    fn complete(&self, mut walker: FlowWalker<'a>) -> FlowBake {
        let mut field = FlowAverager::new(self.params.recursion_depth).average(&walker, self.params.parallel);
        FlowSmoother::new(self.params.smoothing_iterations).smooth(&walker, &mut field);

        let stats = *walker.stats();
        let edges = walker.take_edges();

        info!(
            layers = stats.layers,
            walked = stats.walked,
            contributions = stats.contributions,
            redundant = stats.redundant_skipped,
            degenerate = stats.degenerate_skipped,
            "Flow bake complete"
        );

        FlowBake { field, stats, edges }
    }
}

/// Bake a flow field in one blocking call.
///
/// # Errors
///
/// See [`FlowBakeSession::new`]. Cancellation cannot occur since no token is exposed.
///
/// # Example
///
/// ```
/// use mesh_flow::{bake, FlowParams};
/// use mesh_types::{MeshSnapshot, Point3, Vertex};
///
/// let vertices = vec![
///     Vertex::from_coords(0.0, 0.0, 0.0),
///     Vertex::from_coords(1.0, 0.0, 0.0),
///     Vertex::from_coords(0.0, 1.0, 0.0),
/// ];
/// let mesh = MeshSnapshot::from_faces(vertices, &[[0, 1, 2]]);
///
/// let result = bake(&mesh, &[Point3::origin()], &FlowParams::default()).unwrap();
/// assert_eq!(result.colors().len(), 3);
/// assert_eq!(result.edges, vec![(0, 1), (0, 2)]);
/// ```
pub fn bake(mesh: &MeshSnapshot, seeds: &[Point3<f64>], params: &FlowParams) -> FlowResult<FlowBake> {
    FlowBakeSession::new(mesh, seeds, params.clone())?.finish()
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use mesh_types::Vertex;

    fn triangle() -> MeshSnapshot {
        MeshSnapshot::from_faces(
            vec![
                Vertex::from_coords(0.0, 0.0, 0.0),
                Vertex::from_coords(1.0, 0.0, 0.0),
                Vertex::from_coords(0.0, 1.0, 0.0),
            ],
            &[[0, 1, 2]],
        )
    }

    #[test]
    fn stages_advance_in_order() {
        let mesh = triangle();
        let mut session = FlowBakeSession::new(&mesh, &[Point3::origin()], FlowParams::sequential()).unwrap();
        assert_eq!(session.stage(), BakeStage::DetectingOverlaps);
        assert!(session.walker().is_none());

        assert!(matches!(session.resume().unwrap(), BakeStatus::Pending(p) if p.stage == BakeStage::Seeding));

        let BakeStatus::Pending(progress) = session.resume().unwrap() else {
            panic!("seeding should suspend");
        };
        assert_eq!(progress.stage, BakeStage::Walking);
        assert_eq!(progress.layers, 1);
        assert_eq!(progress.frontier, 2);
        assert_eq!(session.walker().unwrap().walked_count(), 3);

        // Second layer records nothing new and empties the frontier.
        let BakeStatus::Pending(progress) = session.resume().unwrap() else {
            panic!("walking should suspend");
        };
        assert_eq!(progress.stage, BakeStage::Averaging);

        assert!(matches!(session.resume().unwrap(), BakeStatus::Complete(_)));
        assert_eq!(session.stage(), BakeStage::Done);
        assert_eq!(session.resume().unwrap_err(), FlowError::SessionFinished);
    }

    #[test]
    fn cancellation_drops_state() {
        let mesh = triangle();
        let token = CancelToken::new();
        let mut session = FlowBakeSession::new(&mesh, &[Point3::origin()], FlowParams::default())
            .unwrap()
            .with_cancel_token(token.clone());

        session.resume().unwrap();
        session.resume().unwrap();
        token.cancel();

        assert_eq!(session.resume().unwrap_err(), FlowError::Cancelled);
        assert!(session.walker().is_none());
        assert_eq!(session.resume().unwrap_err(), FlowError::SessionFinished);
    }

    #[test]
    fn invalid_params_rejected_up_front() {
        let mesh = triangle();
        let params = FlowParams::default().with_overlap_epsilon(-1.0);
        let err = FlowBakeSession::new(&mesh, &[], params).unwrap_err();
        assert!(matches!(err, FlowError::InvalidParams(_)));
    }

    #[test]
    fn empty_seed_set_bakes_nothing() {
        let mesh = triangle();
        let result = bake(&mesh, &[], &FlowParams::default()).unwrap();
        assert_eq!(result.field.reached_count(), 0);
        assert!(result.edges.is_empty());
        assert_eq!(result.stats.layers, 0);
    }
}
