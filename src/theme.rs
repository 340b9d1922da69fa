use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Theme {
    pub font_family: String,
    pub font_size: f32,
    pub node_fill: String,
    pub node_stroke: String,
    pub line_color: String,
    pub label_color: String,
    pub background: String,
    /// Categorical fills for group bounding boxes, cycled by arena index.
    pub group_palette: Vec<String>,
    pub group_fill_opacity: f32,
}

impl Theme {
    pub fn paper_default() -> Self {
        Self {
            font_family: "Helvetica, Arial, sans-serif".to_string(),
            font_size: 12.0,
            node_fill: "#FFFFFF".to_string(),
            node_stroke: "#000000".to_string(),
            line_color: "#888888".to_string(),
            label_color: "#000000".to_string(),
            background: "#FFFFFF".to_string(),
            group_palette: vec![
                "#1F77B4".to_string(),
                "#FF7F0E".to_string(),
                "#2CA02C".to_string(),
                "#D62728".to_string(),
                "#9467BD".to_string(),
                "#8C564B".to_string(),
                "#E377C2".to_string(),
                "#7F7F7F".to_string(),
                "#BCBD22".to_string(),
                "#17BECF".to_string(),
            ],
            group_fill_opacity: 0.2,
        }
    }

    pub fn modern() -> Self {
        Self {
            font_family: "Inter, Segoe UI, system-ui, -apple-system, sans-serif".to_string(),
            font_size: 12.0,
            node_fill: "#F8FAFF".to_string(),
            node_stroke: "#1C2430".to_string(),
            line_color: "#7A8AA6".to_string(),
            label_color: "#1C2430".to_string(),
            background: "#FFFFFF".to_string(),
            group_palette: vec![
                "#4C78A8".to_string(),
                "#F58518".to_string(),
                "#54A24B".to_string(),
                "#E45756".to_string(),
                "#72B7B2".to_string(),
                "#B279A2".to_string(),
            ],
            group_fill_opacity: 0.15,
        }
    }

    pub fn group_color(&self, index: usize) -> &str {
        &self.group_palette[index % self.group_palette.len()]
    }
}
