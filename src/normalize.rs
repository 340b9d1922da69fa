//! Maps raw solver coordinates into the canvas coordinate space.

use crate::drawing::Drawing;

/// How solver coordinates are brought into canvas range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NormalizePolicy {
    /// Leave coordinates untouched.
    #[default]
    None,
    /// Scale each axis so the extent fills the viewport, with the domain
    /// widened to round numbers first.
    Fit,
    /// Translate so the minimum lands at the margin. Spans between nodes
    /// keep their solver units.
    Shift,
}

/// Per-axis affine map from solver space to canvas space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub scale_x: f64,
    pub scale_y: f64,
    pub offset_x: f64,
    pub offset_y: f64,
}

impl Transform {
    pub const IDENTITY: Transform =
        Transform { scale_x: 1.0, scale_y: 1.0, offset_x: 0.0, offset_y: 0.0 };

    pub fn apply(&self, point: [f64; 2]) -> [f64; 2] {
        [point[0] * self.scale_x + self.offset_x, point[1] * self.scale_y + self.offset_y]
    }
}

/// Applies `policy` to every position, returning a new drawing.
pub fn normalize(
    drawing: &Drawing,
    policy: NormalizePolicy,
    width: f64,
    height: f64,
    margin: f64,
) -> Drawing {
    let transform = match policy {
        NormalizePolicy::None => Transform::IDENTITY,
        NormalizePolicy::Fit => fit_transform(drawing, width, height),
        NormalizePolicy::Shift => shift_transform(drawing, margin),
    };
    let mut out = Drawing::new();
    for (id, position) in drawing.iter() {
        let p = transform.apply(*position);
        out.insert(id.clone(), p[0], p[1]);
    }
    out
}

/// Transform that scales the drawing's extent onto `[0, width]` and
/// `[0, height]`, widening each axis domain to round numbers first.
/// An empty drawing yields the identity.
pub fn fit_transform(drawing: &Drawing, width: f64, height: f64) -> Transform {
    let Some((min, max)) = extent(drawing) else {
        return Transform::IDENTITY;
    };
    let (lo_x, hi_x) = nice_domain(min[0], max[0]);
    let (lo_y, hi_y) = nice_domain(min[1], max[1]);
    let scale_x = width / (hi_x - lo_x);
    let scale_y = height / (hi_y - lo_y);
    Transform { scale_x, scale_y, offset_x: -lo_x * scale_x, offset_y: -lo_y * scale_y }
}

/// Transform that shifts the drawing so its minimum corner lands at
/// `(margin, margin)`. An empty drawing yields the identity.
pub fn shift_transform(drawing: &Drawing, margin: f64) -> Transform {
    let Some((min, _)) = extent(drawing) else {
        return Transform::IDENTITY;
    };
    Transform {
        scale_x: 1.0,
        scale_y: 1.0,
        offset_x: -min[0] + margin,
        offset_y: -min[1] + margin,
    }
}

fn extent(drawing: &Drawing) -> Option<([f64; 2], [f64; 2])> {
    let mut positions = drawing.iter().map(|(_, p)| *p);
    let first = positions.next()?;
    let mut min = first;
    let mut max = first;
    for p in positions {
        min[0] = min[0].min(p[0]);
        min[1] = min[1].min(p[1]);
        max[0] = max[0].max(p[0]);
        max[1] = max[1].max(p[1]);
    }
    Some((min, max))
}

const SPLIT_10: f64 = 7.071067811865476; // sqrt(50)
const SPLIT_5: f64 = 3.1622776601683795; // sqrt(10)
const SPLIT_2: f64 = 1.4142135623730951; // sqrt(2)
const NICE_TICKS: f64 = 10.0;

/// Widens `[lo, hi]` to multiples of a round tick step, re-deriving the
/// step until it stabilizes. A degenerate span is padded by one unit
/// before rounding so the scale stays finite.
fn nice_domain(mut lo: f64, mut hi: f64) -> (f64, f64) {
    if hi - lo <= f64::EPSILON {
        lo -= 1.0;
        hi += 1.0;
    }
    let mut prestep = f64::NAN;
    for _ in 0..10 {
        let step = tick_increment(lo, hi);
        if step == prestep {
            break;
        }
        if step > 0.0 {
            lo = (lo / step).floor() * step;
            hi = (hi / step).ceil() * step;
        } else if step < 0.0 {
            lo = (lo * step).ceil() / step;
            hi = (hi * step).floor() / step;
        } else {
            break;
        }
        prestep = step;
    }
    (lo, hi)
}

/// Tick step for the domain: a power of ten times 1, 2 or 5. Steps below
/// one are encoded as negative reciprocals, matching the branch above.
fn tick_increment(lo: f64, hi: f64) -> f64 {
    let step = (hi - lo) / NICE_TICKS;
    let power = step.log10().floor();
    let error = step / 10.0f64.powf(power);
    let factor = if error >= SPLIT_10 {
        10.0
    } else if error >= SPLIT_5 {
        5.0
    } else if error >= SPLIT_2 {
        2.0
    } else {
        1.0
    };
    if power >= 0.0 {
        factor * 10.0f64.powf(power)
    } else {
        -(10.0f64.powf(-power)) / factor
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drawing_of(entries: &[(&str, [f64; 2])]) -> Drawing {
        let mut drawing = Drawing::new();
        for (id, p) in entries {
            drawing.insert(*id, p[0], p[1]);
        }
        drawing
    }

    #[test]
    fn empty_drawing_yields_identity() {
        let empty = Drawing::new();
        assert_eq!(fit_transform(&empty, 800.0, 600.0), Transform::IDENTITY);
        assert_eq!(shift_transform(&empty, 20.0), Transform::IDENTITY);
    }

    #[test]
    fn fit_widens_domain_to_round_numbers() {
        let drawing = drawing_of(&[("a", [-50.0, 0.0]), ("b", [150.0, 100.0])]);
        let t = fit_transform(&drawing, 1100.0, 200.0);
        // x domain widens to [-60, 160], y stays [0, 100].
        assert!((t.apply([-60.0, 0.0])[0] - 0.0).abs() < 1e-9);
        assert!((t.apply([160.0, 0.0])[0] - 1100.0).abs() < 1e-9);
        assert!((t.apply([0.0, 100.0])[1] - 200.0).abs() < 1e-9);
    }

    #[test]
    fn fit_keeps_every_position_inside_the_viewport() {
        let drawing = drawing_of(&[
            ("a", [-31.7, 4.2]),
            ("b", [88.9, -12.5]),
            ("c", [240.3, 77.0]),
            ("d", [12.0, 130.6]),
        ]);
        let normalized = normalize(&drawing, NormalizePolicy::Fit, 800.0, 600.0, 0.0);
        for (_, p) in normalized.iter() {
            assert!(p[0] >= -1e-9 && p[0] <= 800.0 + 1e-9);
            assert!(p[1] >= -1e-9 && p[1] <= 600.0 + 1e-9);
        }
    }

    #[test]
    fn shift_preserves_spans() {
        let drawing = drawing_of(&[("a", [-30.0, 5.0]), ("b", [70.0, 45.0])]);
        let normalized = normalize(&drawing, NormalizePolicy::Shift, 800.0, 600.0, 10.0);
        assert_eq!(normalized.get("a"), Some([10.0, 10.0]));
        assert_eq!(normalized.get("b"), Some([110.0, 50.0]));
    }

    #[test]
    fn single_node_maps_to_a_finite_position() {
        let drawing = drawing_of(&[("only", [5.0, 5.0])]);
        let t = fit_transform(&drawing, 400.0, 400.0);
        let p = t.apply([5.0, 5.0]);
        assert!(p[0].is_finite() && p[1].is_finite());
        assert!(p[0] >= 0.0 && p[0] <= 400.0);
        assert!(p[1] >= 0.0 && p[1] <= 400.0);
    }

    #[test]
    fn none_policy_is_a_clone() {
        let drawing = drawing_of(&[("a", [1.5, -2.5])]);
        let normalized = normalize(&drawing, NormalizePolicy::None, 800.0, 600.0, 0.0);
        assert_eq!(normalized, drawing);
    }
}
