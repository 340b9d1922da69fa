use crate::graph::Axis;
use crate::theme::Theme;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Rectangular region used for boundary containment constraints.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Bounds {
    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayoutConfig {
    /// Ideal length of a single link; hop counts scale by this.
    pub link_distance: f64,
    pub unconstrained_iterations: usize,
    pub user_constraint_iterations: usize,
    pub all_constraints_iterations: usize,
    /// Relaxation sub-steps per outer iteration.
    pub relaxation_steps: usize,
    /// Padding added to every shape during overlap avoidance. Pairs from
    /// different groups get twice this.
    pub overlap_padding: f64,
    pub default_node_size: f64,
    /// Projection weight given to fixed nodes and synthesized anchors.
    pub fixed_weight: f64,
    pub flow_axis: Option<Axis>,
    pub flow_gap: f64,
    pub bounds: Option<Bounds>,
    pub boundary_margin: f64,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            link_distance: 100.0,
            unconstrained_iterations: 10,
            user_constraint_iterations: 15,
            all_constraints_iterations: 20,
            relaxation_steps: 15,
            overlap_padding: 5.0,
            default_node_size: 20.0,
            fixed_weight: 1000.0,
            flow_axis: None,
            flow_gap: 30.0,
            bounds: None,
            boundary_margin: 0.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderConfig {
    pub width: f64,
    pub height: f64,
    pub background: String,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            width: 1200.0,
            height: 1200.0,
            background: "#FFFFFF".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub theme: Theme,
    pub layout: LayoutConfig,
    pub render: RenderConfig,
}

impl Default for Config {
    fn default() -> Self {
        let theme = Theme::paper_default();
        let render = RenderConfig {
            background: theme.background.clone(),
            ..Default::default()
        };
        Self {
            theme,
            layout: LayoutConfig::default(),
            render,
        }
    }
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct ThemeVariables {
    font_family: Option<String>,
    font_size: Option<f32>,
    node_fill: Option<String>,
    node_stroke: Option<String>,
    line_color: Option<String>,
    label_color: Option<String>,
    background: Option<String>,
    group_palette: Option<Vec<String>>,
    group_fill_opacity: Option<f32>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct LayoutConfigFile {
    link_distance: Option<f64>,
    unconstrained_iterations: Option<usize>,
    user_constraint_iterations: Option<usize>,
    all_constraints_iterations: Option<usize>,
    relaxation_steps: Option<usize>,
    overlap_padding: Option<f64>,
    default_node_size: Option<f64>,
    fixed_weight: Option<f64>,
    flow_axis: Option<Axis>,
    flow_gap: Option<f64>,
    bounds: Option<Bounds>,
    boundary_margin: Option<f64>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct RenderConfigFile {
    width: Option<f64>,
    height: Option<f64>,
    background: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct ConfigFile {
    theme: Option<String>,
    theme_variables: Option<ThemeVariables>,
    layout: Option<LayoutConfigFile>,
    render: Option<RenderConfigFile>,
}

pub fn load_config(path: Option<&Path>) -> anyhow::Result<Config> {
    let mut config = Config::default();
    let Some(path) = path else {
        return Ok(config);
    };

    let contents = std::fs::read_to_string(path)?;
    let parsed: ConfigFile = match serde_json::from_str(&contents) {
        Ok(parsed) => parsed,
        Err(json_err) => json5::from_str(&contents)
            .map_err(|_| anyhow::anyhow!("invalid config {}: {json_err}", path.display()))?,
    };
    apply_config_file(parsed, &mut config);
    Ok(config)
}

fn apply_config_file(parsed: ConfigFile, config: &mut Config) {
    if let Some(theme_name) = parsed.theme.as_deref() {
        if theme_name == "modern" {
            config.theme = Theme::modern();
        } else if theme_name == "paper" || theme_name == "default" {
            config.theme = Theme::paper_default();
        }
    }

    if let Some(vars) = parsed.theme_variables {
        if let Some(v) = vars.font_family {
            config.theme.font_family = v;
        }
        if let Some(v) = vars.font_size {
            config.theme.font_size = v;
        }
        if let Some(v) = vars.node_fill {
            config.theme.node_fill = v;
        }
        if let Some(v) = vars.node_stroke {
            config.theme.node_stroke = v;
        }
        if let Some(v) = vars.line_color {
            config.theme.line_color = v;
        }
        if let Some(v) = vars.label_color {
            config.theme.label_color = v;
        }
        if let Some(v) = vars.background {
            config.theme.background = v;
        }
        if let Some(v) = vars.group_palette
            && !v.is_empty()
        {
            config.theme.group_palette = v;
        }
        if let Some(v) = vars.group_fill_opacity {
            config.theme.group_fill_opacity = v;
        }
    }

    if let Some(layout) = parsed.layout {
        if let Some(v) = layout.link_distance {
            config.layout.link_distance = v;
        }
        if let Some(v) = layout.unconstrained_iterations {
            config.layout.unconstrained_iterations = v;
        }
        if let Some(v) = layout.user_constraint_iterations {
            config.layout.user_constraint_iterations = v;
        }
        if let Some(v) = layout.all_constraints_iterations {
            config.layout.all_constraints_iterations = v;
        }
        if let Some(v) = layout.relaxation_steps {
            config.layout.relaxation_steps = v;
        }
        if let Some(v) = layout.overlap_padding {
            config.layout.overlap_padding = v;
        }
        if let Some(v) = layout.default_node_size {
            config.layout.default_node_size = v;
        }
        if let Some(v) = layout.fixed_weight {
            config.layout.fixed_weight = v;
        }
        if let Some(v) = layout.flow_axis {
            config.layout.flow_axis = Some(v);
        }
        if let Some(v) = layout.flow_gap {
            config.layout.flow_gap = v;
        }
        if let Some(v) = layout.bounds {
            config.layout.bounds = Some(v);
        }
        if let Some(v) = layout.boundary_margin {
            config.layout.boundary_margin = v;
        }
    }

    config.render.background = config.theme.background.clone();

    if let Some(render) = parsed.render {
        if let Some(v) = render.width {
            config.render.width = v;
        }
        if let Some(v) = render.height {
            config.render.height = v;
        }
        if let Some(v) = render.background {
            config.render.background = v;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = Config::default();
        assert_eq!(config.layout.link_distance, 100.0);
        assert_eq!(config.layout.unconstrained_iterations, 10);
        assert_eq!(config.layout.user_constraint_iterations, 15);
        assert_eq!(config.layout.all_constraints_iterations, 20);
        assert_eq!(config.layout.relaxation_steps, 15);
        assert_eq!(config.layout.fixed_weight, 1000.0);
        assert_eq!(config.render.width, 1200.0);
        assert_eq!(config.render.height, 1200.0);
        assert_eq!(config.render.background, "#FFFFFF");
    }

    #[test]
    fn config_file_overrides_merge_over_defaults() {
        let parsed: ConfigFile = serde_json::from_str(
            r##"{
                "theme": "modern",
                "themeVariables": {"lineColor": "#123456"},
                "layout": {"linkDistance": 60, "flowAxis": "y"},
                "render": {"width": 640, "height": 480}
            }"##,
        )
        .expect("parse failed");
        let mut config = Config::default();
        apply_config_file(parsed, &mut config);

        assert_eq!(config.theme.line_color, "#123456");
        assert_eq!(config.layout.link_distance, 60.0);
        assert_eq!(config.layout.flow_axis, Some(Axis::Y));
        assert_eq!(config.layout.relaxation_steps, 15);
        assert_eq!(config.render.width, 640.0);
        assert_eq!(config.render.height, 480.0);
    }

    #[test]
    fn bounds_record_parses() {
        let parsed: ConfigFile = serde_json::from_str(
            r#"{"layout": {"bounds": {"x": 0, "y": 0, "width": 800, "height": 600}, "boundaryMargin": 4}}"#,
        )
        .expect("parse failed");
        let mut config = Config::default();
        apply_config_file(parsed, &mut config);
        let bounds = config.layout.bounds.expect("bounds missing");
        assert_eq!(bounds.right(), 800.0);
        assert_eq!(bounds.bottom(), 600.0);
        assert_eq!(config.layout.boundary_margin, 4.0);
    }

    #[test]
    fn background_override_survives_theme_sync() {
        let parsed: ConfigFile = serde_json::from_str(
            r##"{"theme": "modern", "render": {"background": "#EEEEEE"}}"##,
        )
        .expect("parse failed");
        let mut config = Config::default();
        apply_config_file(parsed, &mut config);
        assert_eq!(config.render.background, "#EEEEEE");
    }
}
