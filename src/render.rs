use crate::config::RenderConfig;
use crate::drawing::Drawing;
use crate::error::{LayoutError, Result};
use crate::graph::{Graph, ShapeKind};
use crate::theme::Theme;
use once_cell::sync::Lazy;
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

/// System fonts are scanned once per process; batch runs rasterize many
/// documents against the same database.
static FONTS: Lazy<Arc<usvg::fontdb::Database>> = Lazy::new(|| {
    let mut db = usvg::fontdb::Database::new();
    db.load_system_fonts();
    Arc::new(db)
});

/// Renders `graph` at the positions in `drawing` onto a fixed-size canvas.
///
/// Output depends only on the arguments; identical inputs yield an
/// identical SVG string. Layers are painted back to front: background,
/// group boxes, edges, node shapes, labels.
pub fn render_svg(
    graph: &Graph,
    drawing: &Drawing,
    theme: &Theme,
    config: &RenderConfig,
) -> Result<String> {
    let width = config.width.max(1.0);
    let height = config.height.max(1.0);

    let mut svg = String::new();
    svg.push_str(&format!(
        "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{width}\" height=\"{height}\" viewBox=\"0 0 {width} {height}\">",
    ));
    svg.push_str(&format!(
        "<rect width=\"100%\" height=\"100%\" fill=\"{}\"/>",
        config.background
    ));

    if graph.is_empty() && drawing.is_empty() {
        svg.push_str("</svg>");
        return Ok(svg);
    }
    check_inputs(graph, drawing)?;

    // Node centers shifted so the content bounding box sits centered on
    // the canvas. One translation shared by every layer.
    let raw: Vec<[f64; 2]> = graph
        .nodes
        .iter()
        .map(|node| drawing.get(&node.id).unwrap_or([0.0, 0.0]))
        .collect();
    let mut min = [f64::INFINITY, f64::INFINITY];
    let mut max = [f64::NEG_INFINITY, f64::NEG_INFINITY];
    for (node, p) in graph.nodes.iter().zip(&raw) {
        min[0] = min[0].min(p[0] - node.shape.half_width());
        min[1] = min[1].min(p[1] - node.shape.half_height());
        max[0] = max[0].max(p[0] + node.shape.half_width());
        max[1] = max[1].max(p[1] + node.shape.half_height());
    }
    let tx = width / 2.0 - (min[0] + max[0]) / 2.0;
    let ty = height / 2.0 - (min[1] + max[1]) / 2.0;
    let centers: Vec<[f64; 2]> = raw.iter().map(|p| [p[0] + tx, p[1] + ty]).collect();

    for (index, group) in graph.groups.iter().enumerate() {
        if group.leaves.is_empty() {
            continue;
        }
        let mut lo = [f64::INFINITY, f64::INFINITY];
        let mut hi = [f64::NEG_INFINITY, f64::NEG_INFINITY];
        for &leaf in &group.leaves {
            let node = &graph.nodes[leaf];
            let p = centers[leaf];
            lo[0] = lo[0].min(p[0] - node.shape.half_width());
            lo[1] = lo[1].min(p[1] - node.shape.half_height());
            hi[0] = hi[0].max(p[0] + node.shape.half_width());
            hi[1] = hi[1].max(p[1] + node.shape.half_height());
        }
        svg.push_str(&format!(
            "<rect x=\"{:.2}\" y=\"{:.2}\" width=\"{:.2}\" height=\"{:.2}\" rx=\"5\" ry=\"5\" fill=\"{}\" fill-opacity=\"{}\"/>",
            lo[0],
            lo[1],
            hi[0] - lo[0],
            hi[1] - lo[1],
            theme.group_color(index),
            theme.group_fill_opacity
        ));
    }

    for link in &graph.links {
        let a = centers[link.source];
        let b = centers[link.target];
        svg.push_str(&format!(
            "<line x1=\"{:.2}\" y1=\"{:.2}\" x2=\"{:.2}\" y2=\"{:.2}\" stroke=\"{}\" stroke-width=\"1.4\"/>",
            a[0], a[1], b[0], b[1], theme.line_color
        ));
    }

    let group_of = graph.group_assignments();
    for (idx, node) in graph.nodes.iter().enumerate() {
        let p = centers[idx];
        let fill = match group_of[idx] {
            Some(group) => theme.group_color(group),
            None => theme.node_fill.as_str(),
        };
        match node.shape.kind {
            ShapeKind::Rect => {
                svg.push_str(&format!(
                    "<rect x=\"{:.2}\" y=\"{:.2}\" width=\"{:.2}\" height=\"{:.2}\" rx=\"5\" ry=\"5\" fill=\"{}\" stroke=\"{}\" stroke-width=\"1.4\"/>",
                    p[0] - node.shape.half_width(),
                    p[1] - node.shape.half_height(),
                    node.shape.width,
                    node.shape.height,
                    fill,
                    theme.node_stroke
                ));
            }
            ShapeKind::Circle => {
                svg.push_str(&format!(
                    "<circle cx=\"{:.2}\" cy=\"{:.2}\" r=\"{:.2}\" fill=\"{}\" stroke=\"{}\" stroke-width=\"1.4\"/>",
                    p[0],
                    p[1],
                    node.shape.radius(),
                    fill,
                    theme.node_stroke
                ));
            }
        }
    }

    for (idx, node) in graph.nodes.iter().enumerate() {
        let p = centers[idx];
        let baseline = p[1] + f64::from(theme.font_size) * 0.35;
        svg.push_str(&format!(
            "<text x=\"{:.2}\" y=\"{baseline:.2}\" text-anchor=\"middle\" font-family=\"{}\" font-size=\"{}\" fill=\"{}\">{}</text>",
            p[0],
            theme.font_family,
            theme.font_size,
            theme.label_color,
            escape_xml(&node.id)
        ));
    }

    svg.push_str("</svg>");
    Ok(svg)
}

/// Every node must have a position and every drawing id must name a graph
/// node. Missing positions are reported first, in document order; unknown
/// drawing ids follow in key order.
fn check_inputs(graph: &Graph, drawing: &Drawing) -> Result<()> {
    for node in &graph.nodes {
        if drawing.get(&node.id).is_none() {
            return Err(LayoutError::RenderInputMismatch(format!(
                "node {:?} has no position in the drawing",
                node.id
            )));
        }
    }
    let known: HashSet<&str> = graph.nodes.iter().map(|n| n.id.as_str()).collect();
    for (id, _) in drawing.iter() {
        if !known.contains(id.as_str()) {
            return Err(LayoutError::RenderInputMismatch(format!(
                "drawing references unknown node {id:?}"
            )));
        }
    }
    Ok(())
}

fn escape_xml(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

pub fn write_output_svg(svg: &str, output: Option<&Path>) -> anyhow::Result<()> {
    match output {
        Some(path) => {
            std::fs::write(path, svg)?;
        }
        None => {
            print!("{}", svg);
        }
    }
    Ok(())
}

pub fn write_output_png(svg: &str, output: &Path, render_cfg: &RenderConfig) -> anyhow::Result<()> {
    let mut opt = usvg::Options::default();
    opt.fontdb = FONTS.clone();
    opt.font_family = "Helvetica".to_string();
    opt.default_size = usvg::Size::from_wh(render_cfg.width as f32, render_cfg.height as f32)
        .unwrap_or(usvg::Size::from_wh(800.0, 600.0).unwrap());

    let tree = usvg::Tree::from_str(svg, &opt)?;
    let size = tree.size().to_int_size();
    let mut pixmap = resvg::tiny_skia::Pixmap::new(size.width(), size.height())
        .ok_or_else(|| anyhow::anyhow!("Failed to allocate pixmap"))?;

    let mut pixmap_mut = pixmap.as_mut();
    resvg::render(&tree, resvg::tiny_skia::Transform::default(), &mut pixmap_mut);
    pixmap.save_png(output)?;
    Ok(())
}
