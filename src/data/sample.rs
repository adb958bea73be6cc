//! Synthetic two-regime NJS/JD samples.
//!
//! Players tend to run one of two jump-distance habits: a long JD that shrinks
//! slowly as NJS rises, and a short JD used on fast maps. The generator draws
//! observations around one line per regime, with Gaussian JD noise and an
//! optional share of gross outliers, so the whole pipeline can be exercised
//! without replay data.

use rand::prelude::*;
use rand::rngs::StdRng;
use rand_distr::Normal;

use crate::domain::{Centroid, Observation};
use crate::error::AppError;

/// JD offset of a gross outlier from its regime line, in both directions.
const OUTLIER_OFFSET: (f64, f64) = (8.0, 12.0);

/// One linear regime of the synthetic population.
#[derive(Debug, Clone, PartialEq)]
pub struct RegimeSpec {
    /// Where the regime line passes through, and the NJS it is centered on.
    pub center: Centroid,
    /// d(jd)/d(njs) of the regime line.
    pub slope: f64,
    /// NJS values are drawn uniformly from `center.njs ± njs_spread`.
    pub njs_spread: f64,
    /// Standard deviation of the JD noise.
    pub jd_noise: f64,
    /// Relative share of observations drawn from this regime.
    pub weight: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SampleSpec {
    pub count: usize,
    pub seed: u64,
    /// Probability that an observation is replaced by a gross outlier.
    pub outlier_rate: f64,
    pub regimes: Vec<RegimeSpec>,
}

impl Default for SampleSpec {
    fn default() -> Self {
        Self {
            count: 120,
            seed: 42,
            outlier_rate: 0.03,
            regimes: vec![
                RegimeSpec {
                    center: Centroid::new(16.0, 18.5),
                    slope: -0.35,
                    njs_spread: 2.5,
                    jd_noise: 0.3,
                    weight: 0.55,
                },
                RegimeSpec {
                    center: Centroid::new(18.0, 14.0),
                    slope: -0.25,
                    njs_spread: 3.0,
                    jd_noise: 0.3,
                    weight: 0.45,
                },
            ],
        }
    }
}

impl SampleSpec {
    fn validate(&self) -> Result<(), AppError> {
        if self.count == 0 {
            return Err(AppError::new(2, "Sample count must be > 0."));
        }
        if !(0.0..1.0).contains(&self.outlier_rate) {
            return Err(AppError::new(2, "Outlier rate must be in [0, 1)."));
        }
        if self.regimes.is_empty() {
            return Err(AppError::new(2, "At least one sample regime is required."));
        }
        for (idx, r) in self.regimes.iter().enumerate() {
            let finite = r.center.njs.is_finite()
                && r.center.jd.is_finite()
                && r.slope.is_finite()
                && r.njs_spread.is_finite()
                && r.jd_noise.is_finite()
                && r.weight.is_finite();
            if !finite || r.njs_spread < 0.0 || r.jd_noise < 0.0 || r.weight <= 0.0 {
                return Err(AppError::new(
                    2,
                    format!("Invalid sample regime #{}: {r:?}", idx + 1),
                ));
            }
        }
        Ok(())
    }
}

/// Draw `spec.count` observations. The same spec always yields the same data.
pub fn generate_sample(spec: &SampleSpec) -> Result<Vec<Observation>, AppError> {
    spec.validate()?;

    let mut rng = StdRng::seed_from_u64(spec.seed);
    let normal = Normal::new(0.0, 1.0)
        .map_err(|e| AppError::new(4, format!("Noise distribution error: {e}")))?;

    let total_weight: f64 = spec.regimes.iter().map(|r| r.weight).sum();

    let mut out = Vec::with_capacity(spec.count);
    for _ in 0..spec.count {
        let regime = pick_regime(&mut rng, &spec.regimes, total_weight);

        // NJS is set per map with one decimal in practice.
        let offset = rng.gen_range(-regime.njs_spread..=regime.njs_spread);
        let njs = ((regime.center.njs + offset) * 10.0).round() / 10.0;
        let line = regime.center.jd + regime.slope * (njs - regime.center.njs);

        let jd = if rng.gen_range(0.0..1.0) < spec.outlier_rate {
            let magnitude = rng.gen_range(OUTLIER_OFFSET.0..OUTLIER_OFFSET.1);
            if rng.gen_bool(0.5) {
                line + magnitude
            } else {
                (line - magnitude).max(0.5)
            }
        } else {
            line + regime.jd_noise * normal.sample(&mut rng)
        };

        out.push(Observation::new(njs, jd));
    }

    Ok(out)
}

fn pick_regime<'a>(rng: &mut StdRng, regimes: &'a [RegimeSpec], total_weight: f64) -> &'a RegimeSpec {
    let mut draw = rng.gen_range(0.0..total_weight);
    for r in regimes {
        if draw < r.weight {
            return r;
        }
        draw -= r.weight;
    }
    // Rounding can leave `draw` a hair above the last weight.
    &regimes[regimes.len() - 1]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_seed_same_sample() {
        let spec = SampleSpec::default();
        let a = generate_sample(&spec).unwrap();
        let b = generate_sample(&spec).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), spec.count);

        let other = generate_sample(&SampleSpec {
            seed: 7,
            ..spec
        })
        .unwrap();
        assert_ne!(a, other);
    }

    #[test]
    fn noiseless_single_regime_lies_on_its_line() {
        let spec = SampleSpec {
            count: 40,
            seed: 1,
            outlier_rate: 0.0,
            regimes: vec![RegimeSpec {
                center: Centroid::new(16.0, 18.0),
                slope: -0.5,
                njs_spread: 2.0,
                jd_noise: 0.0,
                weight: 1.0,
            }],
        };
        for obs in generate_sample(&spec).unwrap() {
            assert!((14.0..=18.0).contains(&obs.njs), "njs {}", obs.njs);
            let expected = 18.0 - 0.5 * (obs.njs - 16.0);
            assert!((obs.jd - expected).abs() < 1e-9, "{obs:?}");
        }
    }

    #[test]
    fn both_default_regimes_are_represented() {
        let sample = generate_sample(&SampleSpec::default()).unwrap();
        let long = sample.iter().filter(|o| o.jd > 16.5).count();
        let short = sample.iter().filter(|o| o.jd < 16.0).count();
        assert!(long > 20, "long-JD regime has {long} points");
        assert!(short > 20, "short-JD regime has {short} points");
    }

    #[test]
    fn invalid_specs_are_rejected() {
        let zero = SampleSpec {
            count: 0,
            ..SampleSpec::default()
        };
        assert_eq!(generate_sample(&zero).unwrap_err().exit_code(), 2);

        let rate = SampleSpec {
            outlier_rate: 1.0,
            ..SampleSpec::default()
        };
        assert!(generate_sample(&rate).is_err());

        let mut weightless = SampleSpec::default();
        weightless.regimes[0].weight = 0.0;
        assert!(generate_sample(&weightless).is_err());
    }
}
