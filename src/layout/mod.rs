//! Stress-majorization layout driver.
//!
//! Positions are refined in three phases: free relaxation, relaxation under
//! the document's own constraints, and relaxation under the full constraint
//! set including overlap separations regenerated from current positions.
//! A projection-only settle pass then closes any overlap the final
//! relaxation reopened.

pub mod overlap;
pub mod separation;
pub mod stress;

use crate::config::LayoutConfig;
use crate::constraints::{self, BuiltConstraints, Sep};
use crate::drawing::Drawing;
use crate::error::{LayoutError, Result};
use crate::graph::Graph;
use stress::StressModel;

/// Tolerance below which a separation residual counts as satisfied.
const RESIDUAL_TOLERANCE: f64 = 1e-6;

/// Which pairs receive non-overlap separations during the final phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OverlapMode {
    /// No overlap avoidance.
    #[default]
    None,
    /// Every node pair is kept disjoint with padded extents.
    Standard,
    /// Like `Standard`, but pairs from different groups get double padding.
    Cluster,
}

/// Quality figures for a finished solve.
#[derive(Debug, Clone, Copy, Default)]
pub struct SolveStats {
    /// Final stress value, lower is better.
    pub stress: f64,
    /// Largest unsatisfied horizontal separation.
    pub max_violation_x: f64,
    /// Largest unsatisfied vertical separation.
    pub max_violation_y: f64,
    /// Number of separations still violated beyond tolerance.
    pub violated_constraints: usize,
    /// Outer iterations performed across all phases.
    pub outer_iterations: usize,
    /// True when every separation ended within tolerance.
    pub feasible: bool,
}

impl SolveStats {
    /// Errors when the solve left constraints violated. The positions are
    /// still usable; callers that cannot tolerate a degraded layout opt in.
    pub fn ensure_feasible(&self) -> Result<()> {
        if self.feasible {
            return Ok(());
        }
        let worst = self.max_violation_x.max(self.max_violation_y);
        Err(LayoutError::InfeasibleConstraints(format!(
            "{} separation(s) unsatisfied, worst violation {worst:.3}",
            self.violated_constraints
        )))
    }
}

/// Computes positions for every node in `graph`.
///
/// The solve never fails on an infeasible constraint system; it returns the
/// best positions found and reports residuals through [`SolveStats`]. Errors
/// are reserved for inputs the solver cannot interpret at all.
pub fn solve(graph: &Graph, config: &LayoutConfig, mode: OverlapMode) -> Result<(Drawing, SolveStats)> {
    if graph.is_empty() {
        let stats = SolveStats { feasible: true, ..SolveStats::default() };
        return Ok((Drawing::new(), stats));
    }
    if graph.distance.is_some() && mode != OverlapMode::None {
        return Err(LayoutError::MalformedGraph(
            "overlap avoidance cannot be combined with an explicit distance matrix".to_string(),
        ));
    }

    let real = graph.nodes.len();
    let boundary = match config.bounds {
        Some(bounds) => {
            constraints::build_boundary(graph, bounds, config.boundary_margin, config.fixed_weight)
        }
        None => BuiltConstraints::empty(),
    };

    let mut user = graph.constraints.clone();
    if let Some(axis) = config.flow_axis {
        user.extend(constraints::build_flow(graph, axis, config.flow_gap));
    }
    user.extend_from_slice(&boundary.constraints);
    let (user_x, user_y) = constraints::split_by_axis(&user);

    // Boundary anchors live past the real nodes and share the same arrays.
    let total = real + boundary.nodes.len();
    let mut x = Vec::with_capacity(total);
    let mut y = Vec::with_capacity(total);
    let mut fixed = Vec::with_capacity(total);
    let mut weights = Vec::with_capacity(total);
    let amplitude = config.link_distance * (real as f64).sqrt();
    for (idx, node) in graph.nodes.iter().chain(boundary.nodes.iter()).enumerate() {
        x.push(node.x.unwrap_or_else(|| (hash_unit(2 * idx as u64) - 0.5) * amplitude));
        y.push(node.y.unwrap_or_else(|| (hash_unit(2 * idx as u64 + 1) - 0.5) * amplitude));
        fixed.push(node.fixed);
        weights.push(match node.weight {
            Some(w) => w,
            None if node.fixed => config.fixed_weight,
            None => 1.0,
        });
    }

    let model = StressModel::build(graph, boundary.nodes.len(), config.link_distance);
    let mut outer = 0usize;

    for _ in 0..config.unconstrained_iterations {
        for _ in 0..config.relaxation_steps {
            model.relax_step(&mut x, &mut y, &fixed);
        }
        outer += 1;
    }

    let mut desired = vec![0.0; total];
    for _ in 0..config.user_constraint_iterations {
        for _ in 0..config.relaxation_steps {
            model.relax_step(&mut x, &mut y, &fixed);
            desired.copy_from_slice(&x);
            separation::project(&desired, &weights, &fixed, &user_x, &mut x);
            desired.copy_from_slice(&y);
            separation::project(&desired, &weights, &fixed, &user_y, &mut y);
        }
        outer += 1;
    }

    let group_of = match mode {
        OverlapMode::Cluster => graph.group_assignments(),
        _ => vec![None; real],
    };
    let mut all_x = user_x.clone();
    let mut all_y = user_y.clone();
    let refresh_overlaps = |x: &[f64], y: &[f64], all_x: &mut Vec<Sep>, all_y: &mut Vec<Sep>| {
        let extra = overlap::overlap_constraints(graph, &group_of, x, y, config.overlap_padding);
        let (extra_x, extra_y) = constraints::split_by_axis(&extra);
        all_x.truncate(user_x.len());
        all_x.extend(extra_x);
        all_y.truncate(user_y.len());
        all_y.extend(extra_y);
    };
    for _ in 0..config.all_constraints_iterations {
        if mode != OverlapMode::None {
            refresh_overlaps(&x, &y, &mut all_x, &mut all_y);
        }
        for _ in 0..config.relaxation_steps {
            model.relax_step(&mut x, &mut y, &fixed);
            desired.copy_from_slice(&x);
            separation::project(&desired, &weights, &fixed, &all_x, &mut x);
            desired.copy_from_slice(&y);
            separation::project(&desired, &weights, &fixed, &all_y, &mut y);
        }
        outer += 1;
    }

    // The overlap set is generated from iteration-start positions and goes
    // stale as nodes move, so a pass can end with intersecting pairs that no
    // constraint covers. Settle with projection alone until a freshly
    // generated set comes back clean, and report against a fresh set.
    if mode != OverlapMode::None {
        for _ in 0..config.all_constraints_iterations {
            refresh_overlaps(&x, &y, &mut all_x, &mut all_y);
            if residual(&x, &all_x).0 <= RESIDUAL_TOLERANCE
                && residual(&y, &all_y).0 <= RESIDUAL_TOLERANCE
            {
                break;
            }
            desired.copy_from_slice(&x);
            separation::project(&desired, &weights, &fixed, &all_x, &mut x);
            desired.copy_from_slice(&y);
            separation::project(&desired, &weights, &fixed, &all_y, &mut y);
        }
        refresh_overlaps(&x, &y, &mut all_x, &mut all_y);
    }

    let (max_violation_x, violated_x) = residual(&x, &all_x);
    let (max_violation_y, violated_y) = residual(&y, &all_y);
    let stats = SolveStats {
        stress: model.stress(&x, &y),
        max_violation_x,
        max_violation_y,
        violated_constraints: violated_x + violated_y,
        outer_iterations: outer,
        feasible: max_violation_x <= RESIDUAL_TOLERANCE && max_violation_y <= RESIDUAL_TOLERANCE,
    };

    let mut drawing = Drawing::new();
    for (idx, node) in graph.nodes.iter().enumerate() {
        drawing.insert(node.id.clone(), x[idx], y[idx]);
    }
    Ok((drawing, stats))
}

/// Largest violation and violated count over one axis of separations.
fn residual(positions: &[f64], seps: &[Sep]) -> (f64, usize) {
    let mut max = 0.0f64;
    let mut violated = 0usize;
    for sep in seps {
        let violation = positions[sep.left] + sep.gap - positions[sep.right];
        if violation > RESIDUAL_TOLERANCE {
            violated += 1;
        }
        max = max.max(violation);
    }
    (max, violated)
}

/// Deterministic unit-interval hash of an index, used to scatter nodes that
/// come without an initial position. The same document always starts from
/// the same arrangement.
fn hash_unit(seed: u64) -> f64 {
    let mut z = seed.wrapping_add(0x9E37_79B9_7F4A_7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^= z >> 31;
    (z >> 11) as f64 / (1u64 << 53) as f64
}
