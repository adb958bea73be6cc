//! Formatted terminal output.
//!
//! Formatting lives in one place so the pipeline stays free of presentation
//! and output changes are localized.

use crate::app::pipeline::{RunOutput, SelectedRegime};
use crate::domain::{JdPair, MIN_RECOMMENDED_OBSERVATIONS, PipelineConfig};

/// Format the full run summary: source, filtering, clustering, and the
/// diagnostics of every regime.
pub fn format_run_summary(run: &RunOutput, config: &PipelineConfig) -> String {
    let res = &run.output;
    let mut out = String::new();

    out.push_str("=== jd - NJS/JD Regime Fit ===\n");
    out.push_str(&format!("Source: {}\n", run.source.label));
    for note in &run.source.notes {
        out.push_str(&format!("  note: {note}\n"));
    }

    out.push_str(&format!(
        "Observations: n={} | non-finite={} | outliers removed={} (k={})\n",
        res.input_count,
        res.non_finite,
        res.removed_outliers(),
        config.outlier_k,
    ));
    if let Some(f) = &res.fences {
        out.push_str(&format!(
            "JD fences: [{:.3}, {:.3}] (Q1={:.3}, Q3={:.3})\n",
            f.lower, f.upper, f.q1, f.q3
        ));
    }
    if res.low_data() {
        out.push_str(&format!(
            "WARNING: fewer than {MIN_RECOMMENDED_OBSERVATIONS} observations; regimes may be unreliable.\n"
        ));
    }

    out.push_str(&format!(
        "\nClustering: k={} | iterations={} | {}\n",
        res.clustering.clusters.len(),
        res.clustering.iterations,
        if res.clustering.converged {
            "converged"
        } else {
            "NOT converged (iteration cap)"
        },
    ));
    for (cluster, seed) in res
        .clustering
        .clusters
        .iter()
        .zip(&config.kmeans.initial_centroids)
    {
        out.push_str(&format!(
            "  cluster {}: n={:<4} seed=({:.2}, {:.2}) -> centroid=({:.3}, {:.3})\n",
            cluster.index + 1,
            cluster.len(),
            seed.njs,
            seed.jd,
            cluster.centroid.njs,
            cluster.centroid.jd,
        ));
    }

    out.push_str("\nRegime diagnostics:\n");
    for sel in &res.selected {
        out.push_str(&format_regime(sel));
    }
    for s in &res.skipped {
        out.push_str(&format!("  (skipped cluster {}) {}\n", s.cluster + 1, s.error));
    }
    if res.fitted > res.selected.len() {
        out.push_str(&format!(
            "  ({} fitted regime(s) ranked below the kept {})\n",
            res.fitted - res.selected.len(),
            res.selected.len()
        ));
    }
    out.push('\n');

    out
}

fn format_regime(sel: &SelectedRegime) -> String {
    let regime = &sel.regime;
    let mut out = format!(
        "#{} cluster {} (n={}) R²={:.4} degree={}\n",
        sel.rank,
        regime.cluster + 1,
        regime.observations.len(),
        regime.model.r_squared,
        regime.model.degree,
    );
    out.push_str(&format!("    {}\n", regime.model.formula()));
    for m in &regime.candidates {
        let chosen = if m.degree == regime.model.degree { "*" } else { " " };
        out.push_str(&format!("   {chosen} degree {} R²={:.6}\n", m.degree, m.r_squared));
    }
    out
}

/// Aligned preview of one jump-distance table.
pub fn format_table(table: &[JdPair]) -> String {
    let mut out = String::new();
    out.push_str(&format!("{:>6} {:>12}\n", "njs", "jd"));
    out.push_str(&format!("{:->6} {:->12}\n", "", ""));
    for row in table {
        out.push_str(&format!("{:>6.1} {:>12.3}\n", row.njs, row.jump_distance));
    }
    out
}

/// All kept tables side by side (they share the NJS column).
pub fn format_tables(selected: &[SelectedRegime]) -> String {
    let Some(first) = selected.first() else {
        return String::new();
    };
    if selected.len() == 1 {
        return format_table(&first.table);
    }

    let mut out = String::new();
    out.push_str(&format!("{:>6}", "njs"));
    for sel in selected {
        out.push_str(&format!(" {:>12}", format!("regime {}", sel.rank)));
    }
    out.push('\n');
    out.push_str(&format!("{:->6}", ""));
    for _ in selected {
        out.push_str(&format!(" {:->12}", ""));
    }
    out.push('\n');

    for (i, row) in first.table.iter().enumerate() {
        out.push_str(&format!("{:>6.1}", row.njs));
        for sel in selected {
            match sel.table.get(i) {
                Some(r) => out.push_str(&format!(" {:>12.3}", r.jump_distance)),
                None => out.push_str(&format!(" {:>12}", "")),
            }
        }
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::pipeline::{ObservationSource, run_fit};
    use crate::data::SampleSpec;

    #[test]
    fn table_preview_is_aligned() {
        let table = [
            JdPair {
                njs: 8.0,
                jump_distance: 22.5,
            },
            JdPair {
                njs: 8.5,
                jump_distance: 22.25,
            },
        ];
        let expected = concat!(
            "   njs           jd\n",
            "------ ------------\n",
            "   8.0       22.500\n",
            "   8.5       22.250\n",
        );
        assert_eq!(format_table(&table), expected);
    }

    #[test]
    fn summary_mentions_every_regime() {
        let config = PipelineConfig::default();
        let run = run_fit(&ObservationSource::Sample(SampleSpec::default()), &config).unwrap();
        let txt = format_run_summary(&run, &config);

        assert!(txt.contains("Clustering: k=2"), "{txt}");
        for sel in &run.output.selected {
            assert!(txt.contains(&format!("#{} cluster", sel.rank)), "{txt}");
        }
        assert!(!txt.contains("WARNING"), "{txt}");

        let tables = format_tables(&run.output.selected);
        assert_eq!(tables.lines().count(), 2 + 36);
    }
}
