//! Projection of desired positions onto separation constraints for one axis.
//!
//! Variables that must stay a fixed distance apart are gathered into rigid
//! blocks. A block normally sits at the weighted mean of its members'
//! desired positions; a block holding a fixed variable is pinned so that
//! variable never moves. Violated constraints either merge two blocks or
//! re-balance one by dropping the active constraint with the smallest
//! Lagrange multiplier.

use crate::constraints::Sep;

const TOLERANCE: f64 = 1e-6;
const MIN_SHIFT: f64 = 1e-4;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProjectionResult {
    pub satisfied: bool,
    pub max_violation: f64,
}

struct Block {
    vars: Vec<usize>,
    /// Indices into the constraint slice forming this block's active tree.
    active: Vec<usize>,
    posn: f64,
    sum_w: f64,
    /// Running sum of weight * (desired - offset) over members.
    sum_wd: f64,
    /// Fixed member whose desired position dictates the block position.
    pin: Option<usize>,
}

pub struct Projection<'a> {
    constraints: &'a [Sep],
    desired: &'a [f64],
    weights: &'a [f64],
    block_of: Vec<usize>,
    offset: Vec<f64>,
    blocks: Vec<Block>,
    hopeless: Vec<bool>,
}

/// Move `out` to the feasible point closest to `desired`, weighting each
/// variable's reluctance to move and never moving fixed variables at all.
pub fn project(
    desired: &[f64],
    weights: &[f64],
    fixed: &[bool],
    constraints: &[Sep],
    out: &mut [f64],
) -> ProjectionResult {
    let mut projection = Projection::new(desired, weights, fixed, constraints);
    let result = projection.solve();
    for (idx, value) in out.iter_mut().enumerate() {
        *value = projection.position(idx);
    }
    result
}

impl<'a> Projection<'a> {
    fn new(desired: &'a [f64], weights: &'a [f64], fixed: &[bool], constraints: &'a [Sep]) -> Self {
        let n = desired.len();
        let blocks = (0..n)
            .map(|idx| Block {
                vars: vec![idx],
                active: Vec::new(),
                posn: desired[idx],
                sum_w: weights[idx],
                sum_wd: weights[idx] * desired[idx],
                pin: fixed[idx].then_some(idx),
            })
            .collect();
        let hopeless = constraints.iter().map(|c| c.left == c.right).collect();
        Self {
            constraints,
            desired,
            weights,
            block_of: (0..n).collect(),
            offset: vec![0.0; n],
            blocks,
            hopeless,
        }
    }

    fn position(&self, var: usize) -> f64 {
        self.blocks[self.block_of[var]].posn + self.offset[var]
    }

    fn violation(&self, c: &Sep) -> f64 {
        self.position(c.left) + c.gap - self.position(c.right)
    }

    fn update_posn(&mut self, block_idx: usize) {
        let block = &mut self.blocks[block_idx];
        block.posn = match block.pin {
            Some(holder) => self.desired[holder] - self.offset[holder],
            None => block.sum_wd / block.sum_w,
        };
    }

    fn solve(&mut self) -> ProjectionResult {
        let max_rounds = self.constraints.len() * 2 + 1;
        for _ in 0..max_rounds {
            let mut worst = TOLERANCE;
            let mut pick = None;
            for (idx, c) in self.constraints.iter().enumerate() {
                if self.hopeless[idx] {
                    continue;
                }
                let violation = self.violation(c);
                if violation > worst {
                    worst = violation;
                    pick = Some(idx);
                }
            }
            let Some(idx) = pick else { break };
            let c = self.constraints[idx];
            let left_block = self.block_of[c.left];
            let right_block = self.block_of[c.right];
            if left_block != right_block {
                // Satisfying this constraint would displace one of two fixed
                // variables; leave it violated instead.
                if self.blocks[left_block].pin.is_some() && self.blocks[right_block].pin.is_some() {
                    self.hopeless[idx] = true;
                    continue;
                }
                self.merge_blocks(idx);
            } else if !self.expand_block(idx) {
                self.hopeless[idx] = true;
            }
        }

        let mut max_violation: f64 = 0.0;
        for c in self.constraints {
            max_violation = max_violation.max(self.violation(c));
        }
        ProjectionResult {
            satisfied: max_violation <= TOLERANCE,
            max_violation,
        }
    }

    /// Union the two blocks touching `c`, shifting the right side so the
    /// constraint is exactly tight. The caller has ruled out a double pin.
    fn merge_blocks(&mut self, idx: usize) {
        let c = self.constraints[idx];
        let keep = self.block_of[c.left];
        let drop = self.block_of[c.right];
        let shift = self.offset[c.left] + c.gap - self.offset[c.right];

        let absorbed_vars = std::mem::take(&mut self.blocks[drop].vars);
        let absorbed_active = std::mem::take(&mut self.blocks[drop].active);
        let absorbed_w = self.blocks[drop].sum_w;
        let absorbed_wd = self.blocks[drop].sum_wd;
        let absorbed_pin = self.blocks[drop].pin.take();

        for &var in &absorbed_vars {
            self.offset[var] += shift;
            self.block_of[var] = keep;
        }
        let block = &mut self.blocks[keep];
        block.vars.extend(absorbed_vars);
        block.active.extend(absorbed_active);
        block.active.push(idx);
        block.sum_w += absorbed_w;
        block.sum_wd += absorbed_wd - shift * absorbed_w;
        block.pin = block.pin.or(absorbed_pin);
        self.update_posn(keep);
    }

    /// Both ends of `c` already share a block; open up room by deactivating
    /// the cheapest constraint on the active path between them. Returns false
    /// when no path constraint points the right way, which means `c`
    /// contradicts the block's equalities.
    fn expand_block(&mut self, idx: usize) -> bool {
        let c = self.constraints[idx];
        let block_idx = self.block_of[c.left];

        let lm = self.comp_dfdv(block_idx, c.left);
        let Some(path) = self.comp_path(block_idx, c.left, c.right) else {
            return false;
        };
        let mut split: Option<(usize, f64)> = None;
        for &(cons, forward) in &path {
            if !forward {
                continue;
            }
            match split {
                Some((_, best)) if lm[cons] >= best => {}
                _ => split = Some((cons, lm[cons])),
            }
        }
        let Some((split_idx, _)) = split else {
            return false;
        };

        let block = &mut self.blocks[block_idx];
        block.active.retain(|&a| a != split_idx);

        let shift = self.violation(&c).max(MIN_SHIFT);
        let moved = self.connected_vars(block_idx, c.right);
        let mut moved_w = 0.0;
        for &var in &moved {
            self.offset[var] += shift;
            moved_w += self.weights[var];
        }
        let block = &mut self.blocks[block_idx];
        block.active.push(idx);
        block.sum_wd -= shift * moved_w;
        self.update_posn(block_idx);
        true
    }

    /// Lagrange multiplier per active constraint of the block, from the
    /// gradient of each member toward its desired position. Computed over the
    /// active tree rooted at `root` with an iterative walk.
    fn comp_dfdv(&self, block_idx: usize, root: usize) -> Vec<f64> {
        let mut lm = vec![0.0; self.constraints.len()];
        let adjacency = self.active_adjacency(block_idx);

        // Establish a visit order, then accumulate gradients leaf to root.
        let mut order = Vec::new();
        let mut stack = vec![(root, usize::MAX)];
        let mut seen = vec![false; self.desired.len()];
        seen[root] = true;
        while let Some((var, via)) = stack.pop() {
            order.push((var, via));
            for &(cons, other, _) in adjacency.get(&var).map(Vec::as_slice).unwrap_or(&[]) {
                if cons != via && !seen[other] {
                    seen[other] = true;
                    stack.push((other, cons));
                }
            }
        }

        let mut subtree = vec![0.0; self.desired.len()];
        for &(var, _) in &order {
            subtree[var] = self.weights[var] * (self.position(var) - self.desired[var]);
        }
        for &(var, via) in order.iter().rev() {
            if via == usize::MAX {
                continue;
            }
            let c = self.constraints[via];
            let parent = if c.left == var { c.right } else { c.left };
            // Traversed from parent: left-to-right edges carry the subtree
            // gradient directly, reversed ones negated.
            lm[via] = if c.right == var {
                subtree[var]
            } else {
                -subtree[var]
            };
            subtree[parent] += subtree[var];
        }
        lm
    }

    /// Path of (constraint, traversed-left-to-right) steps between two block
    /// members along active constraints.
    fn comp_path(&self, block_idx: usize, from: usize, to: usize) -> Option<Vec<(usize, bool)>> {
        let adjacency = self.active_adjacency(block_idx);
        let n = self.desired.len();
        let mut prev: Vec<Option<(usize, usize, bool)>> = vec![None; n];
        let mut seen = vec![false; n];
        seen[from] = true;
        let mut queue = std::collections::VecDeque::from([from]);
        while let Some(var) = queue.pop_front() {
            if var == to {
                break;
            }
            for &(cons, other, forward) in adjacency.get(&var).map(Vec::as_slice).unwrap_or(&[]) {
                if !seen[other] {
                    seen[other] = true;
                    prev[other] = Some((var, cons, forward));
                    queue.push_back(other);
                }
            }
        }
        if !seen[to] {
            return None;
        }
        let mut path = Vec::new();
        let mut var = to;
        while var != from {
            let (parent, cons, forward) = prev[var]?;
            path.push((cons, forward));
            var = parent;
        }
        path.reverse();
        Some(path)
    }

    fn active_adjacency(
        &self,
        block_idx: usize,
    ) -> std::collections::HashMap<usize, Vec<(usize, usize, bool)>> {
        let mut adjacency: std::collections::HashMap<usize, Vec<(usize, usize, bool)>> =
            std::collections::HashMap::new();
        for &cons in &self.blocks[block_idx].active {
            let c = self.constraints[cons];
            adjacency
                .entry(c.left)
                .or_default()
                .push((cons, c.right, true));
            adjacency
                .entry(c.right)
                .or_default()
                .push((cons, c.left, false));
        }
        adjacency
    }

    /// Members reachable from `start` through the current active set.
    fn connected_vars(&self, block_idx: usize, start: usize) -> Vec<usize> {
        let adjacency = self.active_adjacency(block_idx);
        let mut seen = vec![false; self.desired.len()];
        seen[start] = true;
        let mut result = vec![start];
        let mut queue = std::collections::VecDeque::from([start]);
        while let Some(var) = queue.pop_front() {
            for &(_, other, _) in adjacency.get(&var).map(Vec::as_slice).unwrap_or(&[]) {
                if !seen[other] {
                    seen[other] = true;
                    result.push(other);
                    queue.push_back(other);
                }
            }
        }
        result
    }
}
