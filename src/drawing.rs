use crate::error::{LayoutError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

/// Final positions of a layout run, keyed by node id. Serializes as a plain
/// id-to-pair map, and the ordered keys keep the output stable across runs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Drawing {
    pub positions: BTreeMap<String, [f64; 2]>,
}

impl Drawing {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: &str) -> Option<[f64; 2]> {
        self.positions.get(id).copied()
    }

    pub fn insert(&mut self, id: impl Into<String>, x: f64, y: f64) {
        self.positions.insert(id.into(), [x, y]);
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &[f64; 2])> {
        self.positions.iter()
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|err| LayoutError::Io(std::io::Error::other(err)))
    }

    pub fn from_json(text: &str) -> Result<Self> {
        match serde_json::from_str(text) {
            Ok(drawing) => Ok(drawing),
            Err(json_err) => json5::from_str(text)
                .map_err(|_| LayoutError::MalformedGraph(format!("invalid drawing: {json_err}"))),
        }
    }

    pub fn write_json(&self, path: &Path) -> Result<()> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, self)
            .map_err(|err| LayoutError::Io(std::io::Error::other(err)))?;
        Ok(())
    }

    pub fn read_json(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json(&contents)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_as_bare_map() {
        let mut drawing = Drawing::new();
        drawing.insert("a", 1.5, -2.0);
        drawing.insert("b", 0.0, 3.25);
        let json = drawing.to_json().expect("serialize failed");
        let value: serde_json::Value = serde_json::from_str(&json).expect("parse failed");
        assert_eq!(value["a"][0], 1.5);
        assert_eq!(value["b"][1], 3.25);
    }

    #[test]
    fn round_trips_exactly() {
        let mut drawing = Drawing::new();
        drawing.insert("n0", 12.345678901234567, -0.000001);
        drawing.insert("n1", 1e-12, 98765.4321);
        let json = drawing.to_json().expect("serialize failed");
        let reread = Drawing::from_json(&json).expect("reload failed");
        assert_eq!(drawing, reread);
    }

    #[test]
    fn rejects_malformed_documents() {
        let err = Drawing::from_json(r#"{"a": [1, 2], "b": "oops"}"#).unwrap_err();
        assert!(matches!(err, LayoutError::MalformedGraph(_)), "{err}");
    }
}
