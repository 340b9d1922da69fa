use crate::error::{LayoutError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Fallback square node size when a document omits the shape record.
pub const DEFAULT_NODE_SIZE: f64 = 20.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Axis {
    X,
    Y,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ShapeKind {
    #[default]
    Rect,
    Circle,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Shape {
    pub kind: ShapeKind,
    pub width: f64,
    pub height: f64,
}

impl Shape {
    pub fn square(size: f64) -> Self {
        Self {
            kind: ShapeKind::Rect,
            width: size,
            height: size,
        }
    }

    pub fn half_width(&self) -> f64 {
        self.width / 2.0
    }

    pub fn half_height(&self) -> f64 {
        self.height / 2.0
    }

    /// Node radius used for boundary margins: half the larger extent.
    pub fn radius(&self) -> f64 {
        self.width.max(self.height) / 2.0
    }

    pub fn inflated(&self, padding: f64) -> Self {
        Self {
            kind: self.kind,
            width: self.width + padding,
            height: self.height + padding,
        }
    }
}

impl Default for Shape {
    fn default() -> Self {
        Self::square(DEFAULT_NODE_SIZE)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub id: String,
    pub shape: Shape,
    pub group: Option<String>,
    pub fixed: bool,
    /// Positional weight in constraint projection. Resolved at solve time:
    /// absent means 1.0 for free nodes and the configured weight for fixed.
    pub weight: Option<f64>,
    pub x: Option<f64>,
    pub y: Option<f64>,
}

impl Node {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            shape: Shape::default(),
            group: None,
            fixed: false,
            weight: None,
            x: None,
            y: None,
        }
    }

    /// A pinned anchor node, as synthesized for boundary corners.
    pub fn anchor(id: impl Into<String>, x: f64, y: f64, weight: f64) -> Self {
        Self {
            id: id.into(),
            shape: Shape::square(0.0),
            group: None,
            fixed: true,
            weight: Some(weight),
            x: Some(x),
            y: Some(y),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct Link {
    pub source: usize,
    pub target: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Constraint {
    Separation {
        axis: Axis,
        left: usize,
        right: usize,
        gap: f64,
        equality: bool,
    },
    /// Monotonic ordering of `nodes` along `axis` with a per-step gap.
    Ordering {
        axis: Axis,
        nodes: Vec<usize>,
        gap: f64,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Group {
    pub id: String,
    pub leaves: Vec<usize>,
}

/// Typed in-memory graph for one layout run. Built by [`Graph::from_json`] /
/// [`GraphDoc::into_graph`]; the group arena is final after construction.
#[derive(Debug, Clone, Default)]
pub struct Graph {
    pub nodes: Vec<Node>,
    pub links: Vec<Link>,
    pub constraints: Vec<Constraint>,
    pub distance: Option<Vec<Vec<f64>>>,
    pub groups: Vec<Group>,
}

impl Graph {
    pub fn from_json(text: &str) -> Result<Graph> {
        parse_doc(text)?.into_graph(DEFAULT_NODE_SIZE)
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Group arena index per node, `None` when ungrouped.
    pub fn group_assignments(&self) -> Vec<Option<usize>> {
        let mut assigned = vec![None; self.nodes.len()];
        for (group_idx, group) in self.groups.iter().enumerate() {
            for &leaf in &group.leaves {
                assigned[leaf] = Some(group_idx);
            }
        }
        assigned
    }
}

/// Raw graph document as found on disk. Permissive: every field optional,
/// resolved and validated by [`GraphDoc::into_graph`].
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GraphDoc {
    #[serde(default)]
    pub nodes: Vec<NodeDoc>,
    #[serde(default)]
    pub links: Vec<Link>,
    #[serde(default)]
    pub constraints: Vec<ConstraintDoc>,
    #[serde(default)]
    pub distance: Option<Vec<Vec<f64>>>,
    #[serde(default)]
    pub groups: Vec<GroupDoc>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NodeDoc {
    pub id: Option<String>,
    pub shape: Option<ShapeDoc>,
    pub group: Option<NumberOrString>,
    #[serde(default)]
    pub fixed: bool,
    pub weight: Option<f64>,
    pub x: Option<f64>,
    pub y: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ShapeDoc {
    #[serde(rename = "type", default)]
    pub kind: ShapeKind,
    pub width: f64,
    pub height: f64,
}

/// Constraint record with every field optional so that both tagged documents
/// and the bare `{axis, left, right, gap}` form load; resolution decides the
/// variant and reports what is missing.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConstraintDoc {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub axis: Option<Axis>,
    pub left: Option<usize>,
    pub right: Option<usize>,
    pub gap: Option<f64>,
    #[serde(default)]
    pub equality: bool,
    pub nodes: Option<Vec<usize>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GroupDoc {
    pub id: Option<NumberOrString>,
    #[serde(default)]
    pub leaves: Vec<usize>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum NumberOrString {
    Number(f64),
    String(String),
}

impl NumberOrString {
    /// Normalized key form: integral numbers print without a fraction so that
    /// `0` and `"0"` name the same group.
    pub fn as_key(&self) -> String {
        match self {
            NumberOrString::Number(val) => {
                if val.fract() == 0.0 && val.abs() < 1e15 {
                    format!("{}", *val as i64)
                } else {
                    format!("{val}")
                }
            }
            NumberOrString::String(val) => val.clone(),
        }
    }
}

/// Parse a graph document, accepting JSON5 for hand-written files.
pub fn parse_doc(text: &str) -> Result<GraphDoc> {
    match serde_json::from_str(text) {
        Ok(doc) => Ok(doc),
        Err(json_err) => json5::from_str(text)
            .map_err(|_| LayoutError::MalformedGraph(format!("invalid document: {json_err}"))),
    }
}

impl GraphDoc {
    pub fn into_graph(self, default_node_size: f64) -> Result<Graph> {
        let node_count = self.nodes.len();

        let mut nodes = Vec::with_capacity(node_count);
        let mut seen_ids: HashMap<String, usize> = HashMap::new();
        for (idx, doc) in self.nodes.into_iter().enumerate() {
            let id = doc.id.unwrap_or_else(|| idx.to_string());
            if let Some(&first) = seen_ids.get(&id) {
                return Err(LayoutError::MalformedGraph(format!(
                    "node {idx}: duplicate id {id:?} (first used by node {first})"
                )));
            }
            seen_ids.insert(id.clone(), idx);
            let shape = match doc.shape {
                Some(shape) => {
                    if !(shape.width.is_finite() && shape.height.is_finite())
                        || shape.width < 0.0
                        || shape.height < 0.0
                    {
                        return Err(LayoutError::MalformedGraph(format!(
                            "node {idx}: shape dimensions must be finite and non-negative"
                        )));
                    }
                    Shape {
                        kind: shape.kind,
                        width: shape.width,
                        height: shape.height,
                    }
                }
                None => Shape::square(default_node_size),
            };
            if doc.x.is_some_and(|v| !v.is_finite()) || doc.y.is_some_and(|v| !v.is_finite()) {
                return Err(LayoutError::MalformedGraph(format!(
                    "node {idx}: position must be finite"
                )));
            }
            if let Some(weight) = doc.weight
                && (!weight.is_finite() || weight <= 0.0)
            {
                return Err(LayoutError::MalformedGraph(format!(
                    "node {idx}: weight must be finite and positive"
                )));
            }
            nodes.push(Node {
                id,
                shape,
                group: doc.group.as_ref().map(NumberOrString::as_key),
                fixed: doc.fixed,
                weight: doc.weight,
                x: doc.x,
                y: doc.y,
            });
        }

        for (idx, link) in self.links.iter().enumerate() {
            if link.source >= node_count {
                return Err(LayoutError::MalformedGraph(format!(
                    "link {idx}: source {} out of range ({node_count} nodes)",
                    link.source
                )));
            }
            if link.target >= node_count {
                return Err(LayoutError::MalformedGraph(format!(
                    "link {idx}: target {} out of range ({node_count} nodes)",
                    link.target
                )));
            }
        }

        let mut constraints = Vec::with_capacity(self.constraints.len());
        for (idx, doc) in self.constraints.into_iter().enumerate() {
            constraints.push(resolve_constraint(idx, doc, node_count)?);
        }

        if let Some(matrix) = &self.distance {
            if matrix.len() != node_count {
                return Err(LayoutError::MalformedGraph(format!(
                    "distance matrix has {} rows for {node_count} nodes",
                    matrix.len()
                )));
            }
            for (i, row) in matrix.iter().enumerate() {
                if row.len() != node_count {
                    return Err(LayoutError::MalformedGraph(format!(
                        "distance matrix row {i} has {} entries for {node_count} nodes",
                        row.len()
                    )));
                }
                for (j, &value) in row.iter().enumerate() {
                    if !value.is_finite() || value < 0.0 {
                        return Err(LayoutError::MalformedGraph(format!(
                            "distance[{i}][{j}] must be finite and non-negative"
                        )));
                    }
                }
            }
        }

        // Group arena: explicit records first, then per-node group fields
        // merged in. A node may appear in at most one group.
        let mut groups: Vec<Group> = Vec::new();
        let mut group_index: HashMap<String, usize> = HashMap::new();
        let mut assignment: HashMap<usize, usize> = HashMap::new();
        for (idx, doc) in self.groups.iter().enumerate() {
            let id = doc
                .id
                .as_ref()
                .map(NumberOrString::as_key)
                .unwrap_or_else(|| idx.to_string());
            let group_idx = *group_index.entry(id.clone()).or_insert_with(|| {
                groups.push(Group {
                    id,
                    leaves: Vec::new(),
                });
                groups.len() - 1
            });
            for &leaf in &doc.leaves {
                if leaf >= node_count {
                    return Err(LayoutError::MalformedGraph(format!(
                        "group {:?}: leaf {leaf} out of range ({node_count} nodes)",
                        groups[group_idx].id
                    )));
                }
                match assignment.get(&leaf) {
                    Some(&owner) if owner != group_idx => {
                        return Err(LayoutError::MalformedGraph(format!(
                            "group {:?}: node {leaf} already belongs to group {:?}",
                            groups[group_idx].id, groups[owner].id
                        )));
                    }
                    Some(_) => {}
                    None => {
                        assignment.insert(leaf, group_idx);
                        groups[group_idx].leaves.push(leaf);
                    }
                }
            }
        }
        for (node_idx, node) in nodes.iter().enumerate() {
            let Some(key) = &node.group else { continue };
            let group_idx = *group_index.entry(key.clone()).or_insert_with(|| {
                groups.push(Group {
                    id: key.clone(),
                    leaves: Vec::new(),
                });
                groups.len() - 1
            });
            match assignment.get(&node_idx) {
                Some(&owner) if owner != group_idx => {
                    return Err(LayoutError::MalformedGraph(format!(
                        "node {node_idx}: group {key:?} conflicts with group {:?}",
                        groups[owner].id
                    )));
                }
                Some(_) => {}
                None => {
                    assignment.insert(node_idx, group_idx);
                    groups[group_idx].leaves.push(node_idx);
                }
            }
        }

        Ok(Graph {
            nodes,
            links: self.links,
            constraints,
            distance: self.distance,
            groups,
        })
    }
}

fn resolve_constraint(idx: usize, doc: ConstraintDoc, node_count: usize) -> Result<Constraint> {
    let check = |role: &str, value: usize| -> Result<usize> {
        if value >= node_count {
            return Err(LayoutError::MalformedGraph(format!(
                "constraint {idx}: {role} {value} out of range ({node_count} nodes)"
            )));
        }
        Ok(value)
    };
    let axis = |axis: Option<Axis>| {
        axis.ok_or_else(|| LayoutError::MalformedGraph(format!("constraint {idx}: missing axis")))
    };
    let gap = |gap: Option<f64>| -> Result<f64> {
        let gap = gap
            .ok_or_else(|| LayoutError::MalformedGraph(format!("constraint {idx}: missing gap")))?;
        if !gap.is_finite() {
            return Err(LayoutError::MalformedGraph(format!(
                "constraint {idx}: gap must be finite"
            )));
        }
        Ok(gap)
    };

    let separation = |doc: &ConstraintDoc| -> Result<Constraint> {
        let left = doc.left.ok_or_else(|| {
            LayoutError::MalformedGraph(format!("constraint {idx}: missing left"))
        })?;
        let right = doc.right.ok_or_else(|| {
            LayoutError::MalformedGraph(format!("constraint {idx}: missing right"))
        })?;
        Ok(Constraint::Separation {
            axis: axis(doc.axis)?,
            left: check("left", left)?,
            right: check("right", right)?,
            gap: gap(doc.gap)?,
            equality: doc.equality,
        })
    };
    let ordering = |doc: &ConstraintDoc| -> Result<Constraint> {
        let nodes = doc.nodes.clone().unwrap_or_default();
        if nodes.len() < 2 {
            return Err(LayoutError::MalformedGraph(format!(
                "constraint {idx}: ordering needs at least two nodes"
            )));
        }
        let mut checked = Vec::with_capacity(nodes.len());
        for value in nodes {
            checked.push(check("node", value)?);
        }
        Ok(Constraint::Ordering {
            axis: axis(doc.axis)?,
            nodes: checked,
            gap: gap(doc.gap)?,
        })
    };

    match doc.kind.as_deref() {
        Some("separation") => separation(&doc),
        Some("ordering") | Some("alignment") => ordering(&doc),
        Some(other) => Err(LayoutError::MalformedGraph(format!(
            "constraint {idx}: unknown type {other:?}"
        ))),
        // Untagged records: the field set decides the variant.
        None if doc.nodes.is_some() => ordering(&doc),
        None if doc.left.is_some() || doc.right.is_some() => separation(&doc),
        None => Err(LayoutError::MalformedGraph(format!(
            "constraint {idx}: record has neither left/right nor nodes"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loads_minimal_document() {
        let graph = Graph::from_json(r#"{"nodes": [{}, {}], "links": [{"source": 0, "target": 1}]}"#)
            .expect("load failed");
        assert_eq!(graph.nodes.len(), 2);
        assert_eq!(graph.nodes[0].id, "0");
        assert_eq!(graph.nodes[1].id, "1");
        assert_eq!(graph.nodes[0].shape.width, DEFAULT_NODE_SIZE);
        assert!(graph.groups.is_empty());
    }

    #[test]
    fn accepts_json5_documents() {
        let graph = Graph::from_json(
            "{\n  // two nodes, one edge\n  nodes: [{id: 'a'}, {id: 'b'}],\n  links: [{source: 0, target: 1},],\n}",
        )
        .expect("json5 load failed");
        assert_eq!(graph.nodes[1].id, "b");
    }

    #[test]
    fn rejects_out_of_range_link() {
        let err = Graph::from_json(r#"{"nodes": [{}], "links": [{"source": 0, "target": 3}]}"#)
            .unwrap_err();
        let message = err.to_string();
        assert!(message.contains("link 0"), "{message}");
        assert!(message.contains("target 3"), "{message}");
    }

    #[test]
    fn rejects_duplicate_ids() {
        let err =
            Graph::from_json(r#"{"nodes": [{"id": "a"}, {"id": "a"}]}"#).unwrap_err();
        assert!(err.to_string().contains("duplicate id"), "{err}");
    }

    #[test]
    fn rejects_mismatched_distance_matrix() {
        let err = Graph::from_json(r#"{"nodes": [{}, {}], "distance": [[0, 1]]}"#).unwrap_err();
        assert!(err.to_string().contains("1 rows for 2 nodes"), "{err}");
    }

    #[test]
    fn loads_bare_separation_records() {
        // Untagged records default to the separation variant.
        let graph = Graph::from_json(
            r#"{"nodes": [{}, {}], "constraints": [{"axis": "y", "left": 0, "right": 1, "gap": 20}]}"#,
        )
        .expect("load failed");
        assert_eq!(
            graph.constraints,
            vec![Constraint::Separation {
                axis: Axis::Y,
                left: 0,
                right: 1,
                gap: 20.0,
                equality: false,
            }]
        );
    }

    #[test]
    fn loads_ordering_records() {
        let graph = Graph::from_json(
            r#"{"nodes": [{}, {}, {}], "constraints": [{"type": "ordering", "axis": "x", "nodes": [0, 1, 2], "gap": 10}]}"#,
        )
        .expect("load failed");
        match &graph.constraints[0] {
            Constraint::Ordering { axis, nodes, gap } => {
                assert_eq!(*axis, Axis::X);
                assert_eq!(nodes, &[0, 1, 2]);
                assert_eq!(*gap, 10.0);
            }
            other => panic!("unexpected constraint {other:?}"),
        }
    }

    #[test]
    fn cites_first_bad_constraint_reference() {
        let err = Graph::from_json(
            r#"{"nodes": [{}, {}], "constraints": [{"axis": "x", "left": 0, "right": 5, "gap": 1}]}"#,
        )
        .unwrap_err();
        let message = err.to_string();
        assert!(message.contains("constraint 0"), "{message}");
        assert!(message.contains("right 5"), "{message}");
    }

    #[test]
    fn builds_group_arena_from_node_fields() {
        let graph = Graph::from_json(
            r#"{"nodes": [{"group": 1}, {"group": 0}, {"group": 1}, {}]}"#,
        )
        .expect("load failed");
        assert_eq!(graph.groups.len(), 2);
        assert_eq!(graph.groups[0].id, "1");
        assert_eq!(graph.groups[0].leaves, vec![0, 2]);
        assert_eq!(graph.groups[1].id, "0");
        assert_eq!(graph.groups[1].leaves, vec![1]);
        let assigned = graph.group_assignments();
        assert_eq!(assigned, vec![Some(0), Some(1), Some(0), None]);
    }

    #[test]
    fn merges_explicit_groups_with_node_fields() {
        let graph = Graph::from_json(
            r#"{"nodes": [{"group": "a"}, {}, {}], "groups": [{"id": "a", "leaves": [0, 1]}]}"#,
        )
        .expect("load failed");
        assert_eq!(graph.groups.len(), 1);
        assert_eq!(graph.groups[0].leaves, vec![0, 1]);
    }

    #[test]
    fn rejects_overlapping_groups() {
        let err = Graph::from_json(
            r#"{"nodes": [{}, {}], "groups": [{"id": "a", "leaves": [0]}, {"id": "b", "leaves": [0]}]}"#,
        )
        .unwrap_err();
        let message = err.to_string();
        assert!(message.contains("already belongs"), "{message}");
    }

    #[test]
    fn fixed_flag_and_weight_pass_through() {
        let graph = Graph::from_json(
            r#"{"nodes": [{"fixed": true, "x": 1, "y": 2}, {"weight": 7.5}]}"#,
        )
        .expect("load failed");
        assert!(graph.nodes[0].fixed);
        assert_eq!(graph.nodes[0].weight, None);
        assert_eq!(graph.nodes[0].x, Some(1.0));
        assert_eq!(graph.nodes[1].weight, Some(7.5));
    }

    #[test]
    fn rejects_non_finite_positions() {
        // These literals only survive the json5 fallback.
        let err = Graph::from_json(r#"{"nodes": [{"x": 1}, {"y": NaN}]}"#).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("node 1"), "{message}");
        assert!(message.contains("finite"), "{message}");

        let err = Graph::from_json(r#"{"nodes": [{"x": -Infinity}]}"#).unwrap_err();
        assert!(err.to_string().contains("node 0"), "{err}");
    }

    #[test]
    fn rejects_zero_or_infinite_weight() {
        let err = Graph::from_json(r#"{"nodes": [{"weight": 0}]}"#).unwrap_err();
        assert!(err.to_string().contains("weight"), "{err}");

        let err = Graph::from_json(r#"{"nodes": [{"weight": Infinity}]}"#).unwrap_err();
        assert!(err.to_string().contains("weight"), "{err}");
    }
}
