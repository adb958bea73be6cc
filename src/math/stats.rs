//! Descriptive statistics: percentiles, IQR outlier fences, and R².

use std::cmp::Ordering;

use crate::domain::Observation;

/// Percentile of an already sorted slice, `p` in `[0, 100]`.
///
/// Uses linear interpolation between the two closest ranks at
/// `pos = p/100 · (n - 1)`. Returns `None` for an empty slice.
pub fn percentile_sorted(sorted: &[f64], p: f64) -> Option<f64> {
    if sorted.is_empty() {
        return None;
    }
    let pos = (p / 100.0) * (sorted.len() - 1) as f64;
    let lower = pos.floor() as usize;
    let upper = lower + 1;
    if upper >= sorted.len() {
        return Some(sorted[lower.min(sorted.len() - 1)]);
    }
    let weight = pos - lower as f64;
    Some(sorted[lower] * (1.0 - weight) + sorted[upper] * weight)
}

/// Inclusive acceptance range `[q1 - k·iqr, q3 + k·iqr]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OutlierFences {
    pub q1: f64,
    pub q3: f64,
    pub lower: f64,
    pub upper: f64,
}

impl OutlierFences {
    pub fn contains(&self, value: f64) -> bool {
        value >= self.lower && value <= self.upper
    }
}

/// Compute Tukey fences for `values` with multiplier `k`.
pub fn outlier_fences(values: &[f64], k: f64) -> Option<OutlierFences> {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));

    let q1 = percentile_sorted(&sorted, 25.0)?;
    let q3 = percentile_sorted(&sorted, 75.0)?;
    let iqr = q3 - q1;

    // `k = ∞` with `iqr = 0` would give `∞ · 0 = NaN`; an infinite multiplier
    // means "keep everything".
    let (lower, upper) = if k.is_infinite() {
        (f64::NEG_INFINITY, f64::INFINITY)
    } else {
        (q1 - k * iqr, q3 + k * iqr)
    };

    Some(OutlierFences { q1, q3, lower, upper })
}

/// Drop observations whose jump distance lies outside the IQR fences.
///
/// Only `jd` is inspected; the order of the kept observations is preserved.
pub fn remove_outliers(observations: &[Observation], k: f64) -> Vec<Observation> {
    let jds: Vec<f64> = observations.iter().map(|o| o.jd).collect();
    let Some(fences) = outlier_fences(&jds, k) else {
        return Vec::new();
    };
    observations
        .iter()
        .filter(|o| fences.contains(o.jd))
        .copied()
        .collect()
}

pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Sums of squares behind a coefficient of determination.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GoodnessOfFit {
    /// Σ (y - ŷ)²
    pub ss_res: f64,
    /// Σ (y - ȳ)²
    pub ss_tot: f64,
    pub r_squared: f64,
}

/// `R² = 1 - SS_res / SS_tot`.
///
/// When every observed value is identical (`SS_tot = 0`) there is no variance
/// to explain; an exact fit scores 1 and anything else scores 0.
pub fn goodness_of_fit(observed: &[f64], predicted: &[f64]) -> Option<GoodnessOfFit> {
    if observed.is_empty() || observed.len() != predicted.len() {
        return None;
    }
    let y_mean = mean(observed)?;

    let mut ss_res = 0.0;
    let mut ss_tot = 0.0;
    for (&y, &y_hat) in observed.iter().zip(predicted) {
        let r = y - y_hat;
        ss_res += r * r;
        let d = y - y_mean;
        ss_tot += d * d;
    }

    let r_squared = if ss_tot > 0.0 {
        1.0 - ss_res / ss_tot
    } else if ss_res <= 1e-18 {
        1.0
    } else {
        0.0
    };

    Some(GoodnessOfFit {
        ss_res,
        ss_tot,
        r_squared,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn obs(jds: &[f64]) -> Vec<Observation> {
        jds.iter()
            .enumerate()
            .map(|(i, &jd)| Observation::new(14.0 + i as f64 * 0.5, jd))
            .collect()
    }

    #[test]
    fn percentile_interpolates_between_ranks() {
        let sorted = [1.0, 2.0, 3.0, 4.0];
        // pos = 0.25 * 3 = 0.75 -> 1 * 0.25 + 2 * 0.75
        assert!((percentile_sorted(&sorted, 25.0).unwrap() - 1.75).abs() < 1e-12);
        assert!((percentile_sorted(&sorted, 75.0).unwrap() - 3.25).abs() < 1e-12);
        assert_eq!(percentile_sorted(&sorted, 100.0), Some(4.0));
        assert_eq!(percentile_sorted(&[], 50.0), None);
        assert_eq!(percentile_sorted(&[7.0], 25.0), Some(7.0));
    }

    #[test]
    fn remove_outliers_drops_far_jump_distances_only() {
        let mut data = obs(&[17.0, 17.5, 18.0, 18.2, 18.5, 19.0, 30.0]);
        // A far-off NJS must not be filtered on its own.
        data.push(Observation::new(100.0, 18.1));

        let kept = remove_outliers(&data, 1.5);
        assert_eq!(kept.len(), data.len() - 1);
        assert!(kept.iter().all(|o| o.jd < 30.0));
        assert!(kept.iter().any(|o| o.njs == 100.0));

        let fences = outlier_fences(&data.iter().map(|o| o.jd).collect::<Vec<_>>(), 1.5).unwrap();
        for o in &kept {
            assert!(fences.contains(o.jd));
        }
    }

    #[test]
    fn remove_outliers_preserves_order_and_is_subset() {
        let data = obs(&[18.0, 12.0, 18.4, 17.9, 25.0, 18.1, 18.3]);
        let kept = remove_outliers(&data, 1.5);
        let mut cursor = data.iter();
        for k in &kept {
            assert!(cursor.any(|o| o == k), "kept observations must keep input order");
        }
    }

    #[test]
    fn infinite_multiplier_keeps_everything() {
        let data = obs(&[18.0, 18.0, 18.0, 40.0, -3.0]);
        let kept = remove_outliers(&data, f64::INFINITY);
        assert_eq!(kept, data);
    }

    #[test]
    fn empty_input_gives_empty_output() {
        assert!(remove_outliers(&[], 1.5).is_empty());
    }

    #[test]
    fn goodness_of_fit_scores_perfect_and_mean_predictions() {
        let y = [1.0, 2.0, 3.0];
        let perfect = goodness_of_fit(&y, &y).unwrap();
        assert_eq!(perfect.ss_res, 0.0);
        assert!((perfect.r_squared - 1.0).abs() < 1e-12);

        let flat = goodness_of_fit(&y, &[2.0, 2.0, 2.0]).unwrap();
        assert!(flat.r_squared.abs() < 1e-12);

        let constant = goodness_of_fit(&[5.0, 5.0], &[5.0, 5.0]).unwrap();
        assert_eq!(constant.r_squared, 1.0);
    }
}
