//! Overlap avoidance: derive separation constraints from the current
//! positions. Regenerated every outer iteration, so constraints follow the
//! nodes as they move.

use crate::graph::{Axis, Constraint, Graph};

/// One separation per intersecting or touching pair, on the axis with the
/// smaller penetration depth. Every shape is inflated by `padding` before
/// the test; pairs from different groups are inflated by `2 * padding`.
/// A touching pair produces a tight constraint that holds the contact.
pub fn overlap_constraints(
    graph: &Graph,
    group_of: &[Option<usize>],
    x: &[f64],
    y: &[f64],
    padding: f64,
) -> Vec<Constraint> {
    let n = graph.nodes.len();
    let mut constraints = Vec::new();
    for i in 0..n {
        for j in (i + 1)..n {
            let pad = match (group_of[i], group_of[j]) {
                (Some(a), Some(b)) if a != b => 2.0 * padding,
                _ => padding,
            };
            let shape_i = graph.nodes[i].shape.inflated(pad);
            let shape_j = graph.nodes[j].shape.inflated(pad);
            let span_x = shape_i.half_width() + shape_j.half_width();
            let span_y = shape_i.half_height() + shape_j.half_height();
            let depth_x = span_x - (x[i] - x[j]).abs();
            let depth_y = span_y - (y[i] - y[j]).abs();
            if depth_x < 0.0 || depth_y < 0.0 {
                continue;
            }
            if depth_x <= depth_y {
                let (left, right) = if x[i] <= x[j] { (i, j) } else { (j, i) };
                constraints.push(Constraint::Separation {
                    axis: Axis::X,
                    left,
                    right,
                    gap: span_x,
                    equality: false,
                });
            } else {
                let (left, right) = if y[i] <= y[j] { (i, j) } else { (j, i) };
                constraints.push(Constraint::Separation {
                    axis: Axis::Y,
                    left,
                    right,
                    gap: span_y,
                    equality: false,
                });
            }
        }
    }
    constraints
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::Graph;

    fn square_pair(size: f64) -> Graph {
        Graph::from_json(&format!(
            r#"{{"nodes": [{{"shape": {{"width": {size}, "height": {size}}}}},
                           {{"shape": {{"width": {size}, "height": {size}}}}}]}}"#,
        ))
        .expect("load failed")
    }

    #[test]
    fn close_squares_get_one_x_separation() {
        let graph = square_pair(50.0);
        let constraints =
            overlap_constraints(&graph, &[None, None], &[0.0, 10.0], &[0.0, 0.0], 5.0);
        assert_eq!(
            constraints,
            vec![Constraint::Separation {
                axis: Axis::X,
                left: 0,
                right: 1,
                gap: 55.0,
                equality: false,
            }]
        );
    }

    #[test]
    fn shallower_axis_wins() {
        // Deep x penetration, shallow y: separate vertically.
        let graph = square_pair(50.0);
        let constraints =
            overlap_constraints(&graph, &[None, None], &[0.0, 2.0], &[0.0, 40.0], 5.0);
        assert_eq!(
            constraints,
            vec![Constraint::Separation {
                axis: Axis::Y,
                left: 0,
                right: 1,
                gap: 55.0,
                equality: false,
            }]
        );
    }

    #[test]
    fn disjoint_nodes_yield_nothing() {
        // 60 apart beats the padded span of 55.
        let graph = square_pair(50.0);
        let constraints =
            overlap_constraints(&graph, &[None, None], &[0.0, 60.0], &[0.0, 0.0], 5.0);
        assert!(constraints.is_empty());
    }

    #[test]
    fn touching_padded_edges_get_a_tight_constraint() {
        // Exactly at the padded span: the pair stays constrained so the
        // contact cannot collapse on a later pass.
        let graph = square_pair(50.0);
        let constraints =
            overlap_constraints(&graph, &[None, None], &[0.0, 55.0], &[0.0, 0.0], 5.0);
        assert_eq!(
            constraints,
            vec![Constraint::Separation {
                axis: Axis::X,
                left: 0,
                right: 1,
                gap: 55.0,
                equality: false,
            }]
        );
    }

    #[test]
    fn cross_group_pairs_are_inflated_twice() {
        let graph = square_pair(20.0);
        let cross =
            overlap_constraints(&graph, &[Some(0), Some(1)], &[0.0, 2.0], &[0.0, 0.0], 5.0);
        match &cross[0] {
            Constraint::Separation { gap, .. } => assert_eq!(*gap, 30.0),
            other => panic!("unexpected constraint {other:?}"),
        }

        let same =
            overlap_constraints(&graph, &[Some(0), Some(0)], &[0.0, 2.0], &[0.0, 0.0], 5.0);
        match &same[0] {
            Constraint::Separation { gap, .. } => assert_eq!(*gap, 25.0),
            other => panic!("unexpected constraint {other:?}"),
        }
    }

    #[test]
    fn right_node_keeps_its_side() {
        let graph = square_pair(50.0);
        let constraints =
            overlap_constraints(&graph, &[None, None], &[10.0, 0.0], &[0.0, 0.0], 5.0);
        assert_eq!(
            constraints,
            vec![Constraint::Separation {
                axis: Axis::X,
                left: 1,
                right: 0,
                gap: 55.0,
                equality: false,
            }]
        );
    }
}
