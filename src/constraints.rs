use crate::config::Bounds;
use crate::graph::{Axis, Constraint, Graph, Node};

/// Output of constraint synthesis: extra pinned nodes plus the separations
/// that reference them. Virtual nodes are appended after the real nodes, so
/// constraint indices here assume the combined array.
#[derive(Debug, Clone, PartialEq)]
pub struct BuiltConstraints {
    pub nodes: Vec<Node>,
    pub constraints: Vec<Constraint>,
}

impl BuiltConstraints {
    pub fn empty() -> Self {
        Self {
            nodes: Vec::new(),
            constraints: Vec::new(),
        }
    }
}

/// One compiled inequality on a single axis: posn(right) - posn(left) >= gap.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sep {
    pub left: usize,
    pub right: usize,
    pub gap: f64,
}

/// Containment of every node inside `bounds`, expressed through two pinned
/// corner anchors and four separations per node. The gap keeps each node's
/// radius clear of the boundary.
pub fn build_boundary(graph: &Graph, bounds: Bounds, margin: f64, fixed_weight: f64) -> BuiltConstraints {
    let n = graph.nodes.len();
    if n == 0 {
        return BuiltConstraints::empty();
    }

    let top_left = Node::anchor(
        "corner:tl",
        bounds.x + margin,
        bounds.y + margin,
        fixed_weight,
    );
    let bottom_right = Node::anchor(
        "corner:br",
        bounds.right() - margin,
        bounds.bottom() - margin,
        fixed_weight,
    );
    let tl = n;
    let br = n + 1;

    let mut constraints = Vec::with_capacity(4 * n);
    for (idx, node) in graph.nodes.iter().enumerate() {
        let gap = node.shape.radius();
        constraints.push(Constraint::Separation {
            axis: Axis::X,
            left: tl,
            right: idx,
            gap,
            equality: false,
        });
        constraints.push(Constraint::Separation {
            axis: Axis::X,
            left: idx,
            right: br,
            gap,
            equality: false,
        });
        constraints.push(Constraint::Separation {
            axis: Axis::Y,
            left: tl,
            right: idx,
            gap,
            equality: false,
        });
        constraints.push(Constraint::Separation {
            axis: Axis::Y,
            left: idx,
            right: br,
            gap,
            equality: false,
        });
    }

    BuiltConstraints {
        nodes: vec![top_left, bottom_right],
        constraints,
    }
}

/// Downstream ordering along `axis`: every link pushes its target at least
/// `gap` past its source. Self loops carry no ordering information.
pub fn build_flow(graph: &Graph, axis: Axis, gap: f64) -> Vec<Constraint> {
    graph
        .links
        .iter()
        .filter(|link| link.source != link.target)
        .map(|link| Constraint::Separation {
            axis,
            left: link.source,
            right: link.target,
            gap,
            equality: false,
        })
        .collect()
}

/// Compile mixed constraints into per-axis separation lists. Orderings expand
/// into pairwise chains; equalities become a mirrored pair of inequalities.
pub fn split_by_axis(constraints: &[Constraint]) -> (Vec<Sep>, Vec<Sep>) {
    let mut x = Vec::new();
    let mut y = Vec::new();
    for constraint in constraints {
        match constraint {
            Constraint::Separation {
                axis,
                left,
                right,
                gap,
                equality,
            } => {
                let out = match axis {
                    Axis::X => &mut x,
                    Axis::Y => &mut y,
                };
                out.push(Sep {
                    left: *left,
                    right: *right,
                    gap: *gap,
                });
                if *equality {
                    out.push(Sep {
                        left: *right,
                        right: *left,
                        gap: -*gap,
                    });
                }
            }
            Constraint::Ordering { axis, nodes, gap } => {
                let out = match axis {
                    Axis::X => &mut x,
                    Axis::Y => &mut y,
                };
                for pair in nodes.windows(2) {
                    out.push(Sep {
                        left: pair[0],
                        right: pair[1],
                        gap: *gap,
                    });
                }
            }
        }
    }
    (x, y)
}
