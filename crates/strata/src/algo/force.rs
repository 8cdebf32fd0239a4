//! Spring embedder: Coulomb-like pairwise repulsion, Hooke-like edge springs, damped
//! explicit integration with a per-axis velocity cap.

use crate::algo::{Dimensionality, ForceParams, LayoutOptions};
use crate::error::{Error, Result};
use crate::geometry::{self, Vec3};
use crate::graph::{Edge, Graph, LayoutGraph, LayoutResult, NodeId, PlacedNode};
use crate::rng::{Jitter, SeededJitter, XorShift64Star};
use indexmap::IndexMap;
use rayon::prelude::*;
use rustc_hash::FxHashMap;
use std::ops::Range;

/// Below this separation two particles count as coincident and get nudged apart.
pub const MIN_SEPARATION: f64 = 0.1;

/// Rows of the repulsion triangle handled by one partial accumulator. Fixed so that the
/// reduction order (and therefore the result) does not depend on the thread count.
const REPULSION_BLOCK_ROWS: usize = 64;

/// Smaller systems are not worth the rayon overhead.
const PARALLEL_MIN_NODES: usize = 128;

/// Transient per-node simulation state. The velocity doubles as the evolving position.
#[derive(Debug, Clone, Copy, Default)]
struct Particle {
    velocity: Vec3,
    force: Vec3,
}

pub struct Simulation<'a, J: Jitter + ?Sized> {
    params: ForceParams,
    dimensionality: Dimensionality,
    jitter: &'a J,
    parallel: bool,
}

impl<J: Jitter + ?Sized> Clone for Simulation<'_, J> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<J: Jitter + ?Sized> Copy for Simulation<'_, J> {}

impl<'a, J: Jitter + ?Sized> Simulation<'a, J> {
    pub fn new(params: ForceParams, dimensionality: Dimensionality, jitter: &'a J) -> Self {
        Self {
            params,
            dimensionality,
            jitter,
            parallel: true,
        }
    }

    pub fn parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Runs the simulation and returns the final location of every node.
    ///
    /// Every edge endpoint must be a key of `nodes`. In 2D mode the z component of the
    /// result is `0.0`.
    pub fn run(
        &self,
        edges: &[Edge],
        nodes: &IndexMap<NodeId, Vec3>,
    ) -> Result<IndexMap<NodeId, Vec3>> {
        self.params.validate()?;
        let axes = self.dimensionality.axes();

        let index: FxHashMap<&str, usize> = nodes
            .keys()
            .enumerate()
            .map(|(i, id)| (id.as_str(), i))
            .collect();
        let springs = edges
            .iter()
            .map(|e| {
                let lookup = |id: &NodeId| {
                    index.get(id.as_str()).copied().ok_or_else(|| Error::MissingEndpoint {
                        from: e.source.clone(),
                        to: e.target.clone(),
                        node: id.clone(),
                    })
                };
                Ok((lookup(&e.source)?, lookup(&e.target)?))
            })
            .collect::<Result<Vec<(usize, usize)>>>()?;

        let mut particles: Vec<Particle> = nodes
            .values()
            .map(|loc| {
                let mut velocity = *loc;
                velocity[axes..].fill(0.0);
                Particle {
                    velocity,
                    force: [0.0; 3],
                }
            })
            .collect();

        let parallel = self.parallel && particles.len() >= PARALLEL_MIN_NODES;
        tracing::trace!(
            nodes = particles.len(),
            springs = springs.len(),
            iterations = self.params.iterations,
            parallel,
            "force simulation"
        );

        for step in 0..self.params.iterations {
            self.apply_repulsion(&mut particles, step, parallel);
            self.apply_springs(&mut particles, &springs, step);
            self.integrate(&mut particles)?;
        }

        Ok(nodes
            .keys()
            .zip(&particles)
            .map(|(id, p)| (id.clone(), p.velocity))
            .collect())
    }

    fn apply_repulsion(&self, particles: &mut [Particle], step: usize, parallel: bool) {
        let n = particles.len();
        let blocks: Vec<Range<usize>> = (0..n)
            .step_by(REPULSION_BLOCK_ROWS)
            .map(|start| start..(start + REPULSION_BLOCK_ROWS).min(n))
            .collect();

        // Partials are folded in block order on both paths; only positions are read while
        // forces accumulate, so folding early does not change what later blocks see.
        if !parallel {
            let mut acc = vec![[0.0; 3]; n];
            for rows in blocks {
                self.repulsion_block(particles, rows, step, &mut acc);
                fold_partial(particles, &mut acc);
            }
            return;
        }

        // At most one buffer per worker is alive at a time.
        let width = rayon::current_num_threads().max(1);
        for group in blocks.chunks(width) {
            let snapshot: &[Particle] = particles;
            let mut partials: Vec<Vec<Vec3>> = group
                .par_iter()
                .map(|rows| {
                    let mut acc = vec![[0.0; 3]; n];
                    self.repulsion_block(snapshot, rows.clone(), step, &mut acc);
                    acc
                })
                .collect();
            for partial in &mut partials {
                fold_partial(particles, partial);
            }
        }
    }

    /// Repulsion of every pair `(a, b)` with `a` in `rows` and `b > a`, accumulated into `acc`
    /// (one slot per particle).
    fn repulsion_block(
        &self,
        particles: &[Particle],
        rows: Range<usize>,
        step: usize,
        acc: &mut [Vec3],
    ) {
        let n = particles.len();
        let axes = self.dimensionality.axes();
        for a in rows {
            for b in (a + 1)..n {
                let (delta, distance) = separation(
                    &particles[a].velocity,
                    &particles[b].velocity,
                    axes,
                    || self.jitter.nudge(step, a, b),
                );
                if let Some(f) = coulomb(&delta, distance, &self.params) {
                    sub_assign(&mut acc[a], &f);
                    add_assign(&mut acc[b], &f);
                }
            }
        }
    }

    fn apply_springs(&self, particles: &mut [Particle], springs: &[(usize, usize)], step: usize) {
        let axes = self.dimensionality.axes();
        for &(a, b) in springs {
            let (delta, distance) = separation(
                &particles[a].velocity,
                &particles[b].velocity,
                axes,
                || self.jitter.nudge(step, a, b),
            );
            let f = hooke(&delta, distance, &self.params);
            add_assign(&mut particles[a].force, &f);
            sub_assign(&mut particles[b].force, &f);
        }
    }

    fn integrate(&self, particles: &mut [Particle]) -> Result<()> {
        let axes = self.dimensionality.axes();
        let cap = self.params.max_velocity;
        for p in particles.iter_mut() {
            for axis in 0..axes {
                p.velocity[axis] +=
                    geometry::clamp(self.params.dampening * p.force[axis], -cap, cap)?;
            }
            p.force = [0.0; 3];
        }
        Ok(())
    }
}

/// Runs a simulation with default parallelism. See [`Simulation::run`].
pub fn run_forcing<J: Jitter + ?Sized>(
    edges: &[Edge],
    nodes: &IndexMap<NodeId, Vec3>,
    params: &ForceParams,
    dimensionality: Dimensionality,
    jitter: &J,
) -> Result<IndexMap<NodeId, Vec3>> {
    Simulation::new(*params, dimensionality, jitter).run(edges, nodes)
}

/// Displacement `to - from` over the active axes and its length. Coincident points are
/// replaced by the jitter nudge.
fn separation(
    from: &Vec3,
    to: &Vec3,
    axes: usize,
    nudge: impl FnOnce() -> Vec3,
) -> (Vec3, f64) {
    let mut delta = [0.0; 3];
    for axis in 0..axes {
        delta[axis] = to[axis] - from[axis];
    }
    let mut distance = norm(&delta);
    if distance < MIN_SEPARATION {
        delta = nudge();
        delta[axes..].fill(0.0);
        distance = norm(&delta);
    }
    (delta, distance)
}

/// Force pushing the second particle away along `delta`; `None` beyond `max_distance`.
fn coulomb(delta: &Vec3, distance: f64, params: &ForceParams) -> Option<Vec3> {
    if distance >= params.max_distance {
        return None;
    }
    let f = (params.force_strength / distance).powi(2);
    Some(scale(delta, f))
}

/// Force pulling the first particle toward the second (negative when compressed).
fn hooke(delta: &Vec3, distance: f64, params: &ForceParams) -> Vec3 {
    let k = params.force_strength;
    let d = distance.min(params.max_distance);
    let f = (d * d - k * k) / (d * k);
    scale(delta, f)
}

/// Adds one block's partial forces to the particles and zeroes the buffer for reuse.
fn fold_partial(particles: &mut [Particle], partial: &mut [Vec3]) {
    for (p, f) in particles.iter_mut().zip(partial.iter_mut()) {
        add_assign(&mut p.force, f);
        *f = [0.0; 3];
    }
}

fn norm(v: &Vec3) -> f64 {
    geometry::euclidean_distance(&[0.0; 3], v)
}

fn scale(v: &Vec3, f: f64) -> Vec3 {
    [v[0] * f, v[1] * f, v[2] * f]
}

fn add_assign(acc: &mut Vec3, v: &Vec3) {
    for (a, b) in acc.iter_mut().zip(v) {
        *a += b;
    }
}

fn sub_assign(acc: &mut Vec3, v: &Vec3) {
    for (a, b) in acc.iter_mut().zip(v) {
        *a -= b;
    }
}

/// Force-directed layout of the whole graph from a seeded random start.
pub fn layout(graph: &Graph, opts: &LayoutOptions) -> Result<LayoutResult> {
    opts.validate()?;
    graph.validate()?;

    let dimensionality = opts.dimensionality();
    let axes = dimensionality.axes();
    let extent = opts.radial_distance;
    let mut rng = XorShift64Star::new(opts.seed);
    let start: IndexMap<NodeId, Vec3> = graph
        .node_ids()
        .into_iter()
        .map(|id| {
            let mut loc = [0.0; 3];
            for c in loc.iter_mut().take(axes) {
                *c = rng.next_f64_range(-extent, extent);
            }
            (id.to_string(), loc)
        })
        .collect();

    tracing::debug!(nodes = start.len(), edges = graph.edges.len(), "force-directed layout");
    let jitter = SeededJitter::new(opts.seed);
    let placed = Simulation::new(opts.force_params(), dimensionality, &jitter)
        .parallel(opts.parallel)
        .run(&graph.edges, &start)?;

    Ok(LayoutResult {
        graph: LayoutGraph {
            edges: graph.edges.clone(),
            nodes: placed
                .into_iter()
                .map(|(id, loc)| (id, PlacedNode::at(loc)))
                .collect(),
        },
        spaced_layers: Vec::new(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rng::FixedJitter;

    fn nodes(points: &[(&str, Vec3)]) -> IndexMap<NodeId, Vec3> {
        points.iter().map(|(id, p)| (id.to_string(), *p)).collect()
    }

    fn params(iterations: usize) -> ForceParams {
        ForceParams {
            iterations,
            ..Default::default()
        }
    }

    #[test]
    fn repulsion_is_antisymmetric() {
        let jitter = SeededJitter::new(1);
        let sim = Simulation::new(params(1), Dimensionality::Three, &jitter);
        let mut particles = vec![
            Particle {
                velocity: [0.3, -1.7, 2.0],
                force: [0.0; 3],
            },
            Particle {
                velocity: [4.1, 0.9, -3.3],
                force: [0.0; 3],
            },
        ];
        sim.apply_repulsion(&mut particles, 0, false);
        let (fa, fb) = (particles[0].force, particles[1].force);
        assert_ne!(fb, [0.0; 3]);
        for axis in 0..3 {
            assert_eq!(fa[axis], -fb[axis]);
        }
    }

    fn scattered(n: usize, seed: u64) -> Vec<Particle> {
        let mut rng = XorShift64Star::new(seed);
        (0..n)
            .map(|_| Particle {
                velocity: [
                    rng.next_f64_range(-20.0, 20.0),
                    rng.next_f64_range(-20.0, 20.0),
                    rng.next_f64_range(-20.0, 20.0),
                ],
                force: [0.0; 3],
            })
            .collect()
    }

    #[test]
    fn blocked_repulsion_matches_a_single_pass() {
        let jitter = SeededJitter::new(2);
        let sim = Simulation::new(params(1), Dimensionality::Three, &jitter);
        let mut particles = scattered(150, 5);

        let mut expected = vec![[0.0; 3]; particles.len()];
        sim.repulsion_block(&particles, 0..particles.len(), 0, &mut expected);
        sim.apply_repulsion(&mut particles, 0, false);

        for (p, e) in particles.iter().zip(&expected) {
            for axis in 0..3 {
                assert!(
                    (p.force[axis] - e[axis]).abs() <= 1e-9 * e[axis].abs().max(1.0),
                    "{:?} vs {e:?}",
                    p.force
                );
            }
        }
    }

    #[test]
    fn parallel_repulsion_in_small_groups_equals_serial() {
        let jitter = SeededJitter::new(8);
        let sim = Simulation::new(params(1), Dimensionality::Three, &jitter);
        // Five blocks on two workers: three groups, the last one partial.
        let mut serial = scattered(300, 6);
        let mut parallel = serial.clone();

        sim.apply_repulsion(&mut serial, 3, false);
        rayon::ThreadPoolBuilder::new()
            .num_threads(2)
            .build()
            .unwrap()
            .install(|| sim.apply_repulsion(&mut parallel, 3, true));

        for (s, p) in serial.iter().zip(&parallel) {
            assert_eq!(s.force, p.force);
        }
    }

    #[test]
    fn coincident_particles_are_nudged_apart() {
        let jitter = FixedJitter([0.1, 0.1, 0.1]);
        let start = nodes(&[("a", [1.0, 1.0, 1.0]), ("b", [1.0, 1.0, 1.0])]);
        let out = run_forcing(&[], &start, &params(1), Dimensionality::Three, &jitter).unwrap();
        // (5 / |0.1, 0.1, 0.1|)^2 * 0.1 * 0.05 is far above the velocity cap of 2.
        assert_eq!(out["a"], [-1.0, -1.0, -1.0]);
        assert_eq!(out["b"], [3.0, 3.0, 3.0]);
    }

    #[test]
    fn zero_iterations_is_identity() {
        let jitter = SeededJitter::new(0);
        let start = nodes(&[("a", [1.0, 2.0, 3.0]), ("b", [-4.0, 0.5, 9.0])]);
        let edges = vec![Edge::new("a", "b")];
        let out = run_forcing(&edges, &start, &params(0), Dimensionality::Three, &jitter).unwrap();
        assert_eq!(out, start);
    }

    #[test]
    fn pairs_beyond_max_distance_do_not_interact() {
        let jitter = SeededJitter::new(0);
        let start = nodes(&[("a", [0.0, 0.0, 0.0]), ("b", [100.0, 0.0, 0.0])]);
        let out = run_forcing(&[], &start, &params(25), Dimensionality::Three, &jitter).unwrap();
        assert_eq!(out, start);
    }

    #[test]
    fn connected_pair_settles_at_force_balance() {
        let jitter = SeededJitter::new(0);
        let start = nodes(&[("a", [0.0, 0.0, 0.0]), ("b", [1.0, 0.0, 0.0])]);
        let edges = vec![Edge::new("a", "b")];
        let out = run_forcing(&edges, &start, &params(1000), Dimensionality::Three, &jitter).unwrap();

        // Repulsion k^2/d balances the spring (d^2 - k^2)/k at d^3 - k^2 d - k^3 = 0,
        // i.e. d ~= 6.62 for k = 5.
        let d = geometry::euclidean_distance(&out["a"], &out["b"]);
        assert!((d - 6.624).abs() < 0.05, "distance {d}");
        let mid = (out["a"][0] + out["b"][0]) / 2.0;
        assert!((mid - 0.5).abs() < 1e-9, "midpoint drifted to {mid}");
    }

    #[test]
    fn two_dimensional_runs_zero_the_third_axis() {
        let jitter = SeededJitter::new(0);
        let start = nodes(&[("a", [0.0, 0.0, -7.0]), ("b", [3.0, 0.0, -7.0])]);
        let out = run_forcing(&[], &start, &params(3), Dimensionality::Two, &jitter).unwrap();
        assert_eq!(out["a"][2], 0.0);
        assert_eq!(out["b"][2], 0.0);
        assert!(out["a"][0] < 0.0);
        assert!(out["b"][0] > 3.0);
    }

    #[test]
    fn unknown_spring_endpoint_is_an_error() {
        let jitter = SeededJitter::new(0);
        let start = nodes(&[("a", [0.0; 3])]);
        let edges = vec![Edge::new("a", "ghost")];
        let err = run_forcing(&edges, &start, &params(1), Dimensionality::Three, &jitter)
            .unwrap_err();
        assert!(err.is_malformed_input());
    }

    #[test]
    fn zero_force_strength_is_rejected_before_simulating() {
        let jitter = SeededJitter::new(0);
        let start = nodes(&[("a", [0.0; 3]), ("b", [1.0, 0.0, 0.0])]);
        let p = ForceParams {
            force_strength: 0.0,
            ..params(1)
        };
        let err = run_forcing(&[Edge::new("a", "b")], &start, &p, Dimensionality::Three, &jitter)
            .unwrap_err();
        assert!(matches!(err, Error::InvalidRange { name: "forceStrength", .. }));
    }

    #[test]
    fn parallel_and_serial_runs_agree() {
        let mut rng = XorShift64Star::new(9);
        let start: IndexMap<NodeId, Vec3> = (0..200)
            .map(|i| {
                (
                    format!("n{i}"),
                    [
                        rng.next_f64_range(-30.0, 30.0),
                        rng.next_f64_range(-30.0, 30.0),
                        rng.next_f64_range(-30.0, 30.0),
                    ],
                )
            })
            .collect();
        let edges: Vec<Edge> = (1..200)
            .map(|i| Edge::new(format!("n{}", i / 2), format!("n{i}")))
            .collect();
        let jitter = SeededJitter::new(4);
        let sim = Simulation::new(params(5), Dimensionality::Three, &jitter);
        let serial = sim.parallel(false).run(&edges, &start).unwrap();
        let parallel = sim.parallel(true).run(&edges, &start).unwrap();
        assert_eq!(serial, parallel);
    }
}
