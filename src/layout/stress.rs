//! Stress majorization over ideal pairwise distances.
//!
//! Ideal distances come from an explicit matrix when the document carries
//! one, otherwise from unweighted hop counts scaled by the link distance.
//! Pairs with no finite distance get zero weight and exert no pull, which
//! covers disconnected components and appended anchor nodes alike.

use crate::graph::Graph;
use std::collections::VecDeque;

const EPSILON: f64 = 1e-9;

pub struct StressModel {
    n: usize,
    dist: Vec<f64>,
    weight: Vec<f64>,
}

impl StressModel {
    /// Build the distance and weight tables for `graph` plus `extra` trailing
    /// nodes that take part in projection but not in attraction.
    pub fn build(graph: &Graph, extra: usize, link_distance: f64) -> Self {
        let real = graph.nodes.len();
        let n = real + extra;
        let mut dist = vec![f64::INFINITY; n * n];
        for i in 0..n {
            dist[i * n + i] = 0.0;
        }

        if let Some(matrix) = &graph.distance {
            for (i, row) in matrix.iter().enumerate() {
                for (j, &value) in row.iter().enumerate() {
                    dist[i * n + j] = value;
                }
            }
        } else if real > 0 {
            let mut adjacency = vec![Vec::new(); real];
            for link in &graph.links {
                if link.source != link.target {
                    adjacency[link.source].push(link.target);
                    adjacency[link.target].push(link.source);
                }
            }
            let mut hops = vec![usize::MAX; real];
            for source in 0..real {
                hops.fill(usize::MAX);
                hops[source] = 0;
                let mut queue = VecDeque::from([source]);
                while let Some(node) = queue.pop_front() {
                    for &next in &adjacency[node] {
                        if hops[next] == usize::MAX {
                            hops[next] = hops[node] + 1;
                            queue.push_back(next);
                        }
                    }
                }
                for (target, &count) in hops.iter().enumerate() {
                    if count != usize::MAX {
                        dist[source * n + target] = count as f64 * link_distance;
                    }
                }
            }
        }

        let weight = dist
            .iter()
            .map(|&d| if d.is_finite() && d > 0.0 { 1.0 / (d * d) } else { 0.0 })
            .collect();
        Self { n, dist, weight }
    }

    pub fn distance(&self, i: usize, j: usize) -> f64 {
        self.dist[i * self.n + j]
    }

    /// One majorization sweep: each free node in turn moves to the weighted
    /// centroid of the positions its neighbours want it at. Updates are
    /// applied in place so later nodes already see earlier moves.
    pub fn relax_step(&self, x: &mut [f64], y: &mut [f64], fixed: &[bool]) {
        for i in 0..self.n {
            if fixed[i] {
                continue;
            }
            let mut sw = 0.0;
            let mut sx = 0.0;
            let mut sy = 0.0;
            for j in 0..self.n {
                if j == i {
                    continue;
                }
                let w = self.weight[i * self.n + j];
                if w == 0.0 {
                    continue;
                }
                let d = self.dist[i * self.n + j];
                let dx = x[i] - x[j];
                let dy = y[i] - y[j];
                let len = (dx * dx + dy * dy).sqrt().max(EPSILON);
                sx += w * (x[j] + d * dx / len);
                sy += w * (y[j] + d * dy / len);
                sw += w;
            }
            if sw > 0.0 {
                x[i] = sx / sw;
                y[i] = sy / sw;
            }
        }
    }

    /// Residual weighted stress of the current positions.
    pub fn stress(&self, x: &[f64], y: &[f64]) -> f64 {
        let mut total = 0.0;
        for i in 0..self.n {
            for j in (i + 1)..self.n {
                let w = self.weight[i * self.n + j];
                if w == 0.0 {
                    continue;
                }
                let dx = x[i] - x[j];
                let dy = y[i] - y[j];
                let len = (dx * dx + dy * dy).sqrt();
                let residual = len - self.dist[i * self.n + j];
                total += w * residual * residual;
            }
        }
        total
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::Graph;

    fn path_graph() -> Graph {
        Graph::from_json(
            r#"{"nodes": [{}, {}, {}],
                "links": [{"source": 0, "target": 1}, {"source": 1, "target": 2}]}"#,
        )
        .expect("load failed")
    }

    #[test]
    fn hop_counts_scale_by_link_distance() {
        let model = StressModel::build(&path_graph(), 0, 100.0);
        assert_eq!(model.distance(0, 1), 100.0);
        assert_eq!(model.distance(1, 2), 100.0);
        assert_eq!(model.distance(0, 2), 200.0);
        assert_eq!(model.distance(2, 0), 200.0);
    }

    #[test]
    fn explicit_matrix_is_used_verbatim() {
        let graph = Graph::from_json(
            r#"{"nodes": [{}, {}, {}],
                "distance": [[0, 1, 2], [1, 0, 1], [2, 1, 0]]}"#,
        )
        .expect("load failed");
        let model = StressModel::build(&graph, 0, 100.0);
        assert_eq!(model.distance(0, 1), 1.0);
        assert_eq!(model.distance(0, 2), 2.0);
    }

    #[test]
    fn disconnected_pairs_carry_no_weight() {
        let graph = Graph::from_json(r#"{"nodes": [{}, {}]}"#).expect("load failed");
        let model = StressModel::build(&graph, 0, 100.0);
        assert!(model.distance(0, 1).is_infinite());

        // A sweep over unrelated nodes leaves them where they are.
        let mut x = vec![0.0, 5.0];
        let mut y = vec![0.0, 5.0];
        model.relax_step(&mut x, &mut y, &[false, false]);
        assert_eq!(x, vec![0.0, 5.0]);
        assert_eq!(y, vec![0.0, 5.0]);
    }

    #[test]
    fn extra_nodes_exert_no_pull() {
        let graph = Graph::from_json(
            r#"{"nodes": [{}, {}], "links": [{"source": 0, "target": 1}]}"#,
        )
        .expect("load failed");
        let model = StressModel::build(&graph, 1, 100.0);
        assert!(model.distance(0, 2).is_infinite());
        let mut x = vec![0.0, 100.0, 5000.0];
        let mut y = vec![0.0, 0.0, 5000.0];
        model.relax_step(&mut x, &mut y, &[false, false, true]);
        assert_eq!(x[0], 0.0);
        assert_eq!(x[1], 100.0);
    }

    #[test]
    fn linked_pair_relaxes_to_ideal_length() {
        let graph = Graph::from_json(
            r#"{"nodes": [{}, {}], "links": [{"source": 0, "target": 1}]}"#,
        )
        .expect("load failed");
        let model = StressModel::build(&graph, 0, 100.0);
        let mut x = vec![0.0, 10.0];
        let mut y = vec![0.0, 0.0];
        model.relax_step(&mut x, &mut y, &[false, false]);
        assert!(((x[1] - x[0]).abs() - 100.0).abs() < 1e-9);
        assert!(model.stress(&x, &y) < 1e-12);
    }

    #[test]
    fn fixed_nodes_do_not_move() {
        let model = StressModel::build(&path_graph(), 0, 100.0);
        let mut x = vec![0.0, 1.0, 2.0];
        let mut y = vec![0.0, 0.0, 0.0];
        model.relax_step(&mut x, &mut y, &[true, false, false]);
        assert_eq!(x[0], 0.0);
        assert_eq!(y[0], 0.0);
    }

    #[test]
    fn stress_counts_squared_residuals() {
        let graph = Graph::from_json(
            r#"{"nodes": [{}, {}], "links": [{"source": 0, "target": 1}]}"#,
        )
        .expect("load failed");
        let model = StressModel::build(&graph, 0, 100.0);
        let x = vec![0.0, 50.0];
        let y = vec![0.0, 0.0];
        // w = 1/100^2, residual = 50.
        assert!((model.stress(&x, &y) - 0.25).abs() < 1e-12);
    }
}
