//! Curve sampling and table building.
//!
//! - `sample_curve`: evenly spaced samples over a regime's own NJS range,
//!   used for plotting
//! - `build_output_table`: the persisted NJS → JD table over a fixed domain

use crate::domain::{CurvePoint, JdPair, TableDomain};
use crate::error::PipelineError;
use crate::models::PolynomialModel;

/// Evaluate `model` at `point_count` evenly spaced NJS values in
/// `[min_x, max_x]`, both ends included.
///
/// `point_count = 1` samples `min_x` only; `0` yields an empty curve. The last
/// sample is pinned to `max_x` so rounding never shortens the curve.
pub fn sample_curve(
    model: &PolynomialModel,
    min_x: f64,
    max_x: f64,
    point_count: usize,
) -> Result<Vec<CurvePoint>, PipelineError> {
    if point_count == 0 {
        return Ok(Vec::new());
    }
    if point_count == 1 {
        return Ok(vec![CurvePoint {
            njs: min_x,
            jd: model.predict_with_degree(model.degree, min_x)?,
        }]);
    }

    let step = (max_x - min_x) / (point_count - 1) as f64;
    let mut out = Vec::with_capacity(point_count);
    for i in 0..point_count {
        let njs = if i + 1 == point_count {
            max_x
        } else {
            min_x + i as f64 * step
        };
        let jd = model.predict_with_degree(model.degree, njs)?;
        out.push(CurvePoint { njs, jd });
    }
    Ok(out)
}

/// Evaluate `model` at every NJS of `domain`.
pub fn build_output_table(model: &PolynomialModel, domain: &TableDomain) -> Result<Vec<JdPair>, PipelineError> {
    domain.validate()?;
    domain
        .njs_values()
        .into_iter()
        .map(|njs| {
            Ok(JdPair {
                njs,
                jump_distance: model.predict_with_degree(model.degree, njs)?,
            })
        })
        .collect()
}
