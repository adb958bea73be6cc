//! Plot rendering (terminal text and SVG).
//!
//! Both renderers consume [`RegimeSeries`], which can be built from a fresh
//! pipeline run or from a saved regimes file.

pub mod ascii;
pub mod svg;

pub use ascii::*;
pub use svg::*;

use crate::app::pipeline::SelectedRegime;
use crate::domain::{CurvePoint, Observation};
use crate::io::RegimeRecord;

/// Title used for exported charts.
pub const PLOT_TITLE: &str = "[NJS - JD] Cluster Regression Analysis";

/// One regime's scatter points and fitted curve, ready to draw.
#[derive(Debug, Clone, PartialEq)]
pub struct RegimeSeries {
    pub rank: usize,
    pub cluster: usize,
    pub degree: usize,
    pub r_squared: f64,
    pub points: Vec<Observation>,
    pub curve: Vec<CurvePoint>,
}

impl RegimeSeries {
    pub fn legend(&self) -> String {
        format!("Cluster {} (R² = {:.4})", self.rank, self.r_squared)
    }
}

impl From<&SelectedRegime> for RegimeSeries {
    fn from(sel: &SelectedRegime) -> Self {
        Self {
            rank: sel.rank,
            cluster: sel.regime.cluster,
            degree: sel.regime.model.degree,
            r_squared: sel.regime.model.r_squared,
            points: sel.regime.observations.clone(),
            curve: sel.curve.clone(),
        }
    }
}

impl From<&RegimeRecord> for RegimeSeries {
    fn from(rec: &RegimeRecord) -> Self {
        Self {
            rank: rec.rank,
            cluster: rec.cluster,
            degree: rec.model.degree,
            r_squared: rec.model.r_squared,
            points: rec.observations.clone(),
            curve: rec.curve.clone(),
        }
    }
}

/// `(njs_min, njs_max, jd_min, jd_max)` over every point and curve sample.
pub(crate) fn bounds(series: &[RegimeSeries]) -> Option<(f64, f64, f64, f64)> {
    let mut x_min = f64::INFINITY;
    let mut x_max = f64::NEG_INFINITY;
    let mut y_min = f64::INFINITY;
    let mut y_max = f64::NEG_INFINITY;

    let coords = series.iter().flat_map(|s| {
        s.points
            .iter()
            .map(|o| (o.njs, o.jd))
            .chain(s.curve.iter().map(|p| (p.njs, p.jd)))
    });
    for (x, y) in coords {
        if !(x.is_finite() && y.is_finite()) {
            continue;
        }
        x_min = x_min.min(x);
        x_max = x_max.max(x);
        y_min = y_min.min(y);
        y_max = y_max.max(y);
    }

    if x_min.is_finite() && x_max > x_min && y_min.is_finite() && y_max.is_finite() {
        Some((x_min, x_max, y_min, y_max))
    } else {
        None
    }
}

/// Widen `[min, max]` by `frac` of its span on both sides (never to zero width).
pub(crate) fn pad_range(min: f64, max: f64, frac: f64) -> (f64, f64) {
    let span = (max - min).abs();
    let pad = (span * frac).max(1e-3);
    (min - pad, max + pad)
}
