//! Matching quality: conditional entropy ("splitting energy") and per-unit
//! splitting confidence.
//!
//! With units indexed by i and partitions by j, P(i,j) = cell / grand total
//! and P(j|i) = cell / row total. Splitting energy is
//! −Σ P(i,j)·f(P(j|i)) over the nonzero cells, i.e. the conditional entropy
//! H(partition | unit) when f is a logarithm. It is 0 exactly when every
//! unit sends all of its weight to a single partition.

use std::collections::BTreeMap;

use crate::aggregate::ContingencyMatrix;
use crate::config::MatchConfig;
use crate::model::{Histogram, QualityReport};
use crate::order::round_to;

/// Splitting energy with the natural logarithm.
pub fn splitting_energy(matrix: &ContingencyMatrix) -> f64 {
    splitting_energy_with(matrix, f64::ln)
}

/// Splitting energy with a caller-supplied logarithm-like `f`.
///
/// Zero cells are skipped rather than evaluated, and rows with no weight
/// contribute nothing. An empty matrix has energy 0.
pub fn splitting_energy_with<F>(matrix: &ContingencyMatrix, f: F) -> f64
where
    F: Fn(f64) -> f64,
{
    let total = matrix.total();
    if total <= 0.0 {
        return 0.0;
    }
    let row_totals = matrix.row_totals();

    let mut sum = 0.0;
    for (i, &row_total) in row_totals.iter().enumerate() {
        if row_total <= 0.0 {
            continue;
        }
        for (_, w) in matrix.row(i) {
            let p_joint = w / total;
            let p_conditional = w / row_total;
            sum += p_joint * f(p_conditional);
        }
    }

    let energy = -sum;
    // -0.0 from the identity case
    if energy == 0.0 {
        0.0
    } else {
        energy
    }
}

/// max_j P(j|i) for every unit, in matrix order. All-zero rows give 0.
pub fn splitting_confidence(matrix: &ContingencyMatrix) -> Vec<f64> {
    (0..matrix.n_units())
        .map(|i| {
            let total = matrix.row_total(i);
            if total <= 0.0 {
                return 0.0;
            }
            let max = matrix.row(i).map(|(_, w)| w).fold(0.0, f64::max);
            max / total
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Histogram
// ---------------------------------------------------------------------------

/// Linear-interpolated percentile of sorted data, `q` in [0, 1].
fn percentile(sorted: &[f64], q: f64) -> f64 {
    let pos = q * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    sorted[lo] + (sorted[hi] - sorted[lo]) * (pos - lo as f64)
}

/// Upper bound on the automatic bin count. A tiny but nonzero IQR would
/// otherwise ask for millions of bins; set `quality.histogram_bins` to
/// choose the count explicitly.
pub const MAX_AUTO_BINS: usize = 1000;

/// Bin width chosen like numpy's "auto": the smaller of the
/// Freedman–Diaconis and Sturges widths, Sturges alone when the IQR is 0.
fn auto_bin_width(sorted: &[f64]) -> f64 {
    let n = sorted.len() as f64;
    let range = sorted[sorted.len() - 1] - sorted[0];
    let sturges = range / (n.log2() + 1.0);
    let iqr = percentile(sorted, 0.75) - percentile(sorted, 0.25);
    let fd = 2.0 * iqr * n.powf(-1.0 / 3.0);
    if fd > 0.0 {
        fd.min(sturges)
    } else {
        sturges
    }
}

/// Histogram of `samples`, edges and counts ready for serialization.
///
/// `bins` fixes the bin count; `None` picks it from the sample spread,
/// capped at [`MAX_AUTO_BINS`].
/// Identical samples get one bin [x − 0.5, x + 0.5]. Non-finite samples are
/// ignored.
pub fn histogram(samples: &[f64], bins: Option<usize>, decimals: u32) -> Histogram {
    let mut sorted: Vec<f64> = samples.iter().copied().filter(|x| x.is_finite()).collect();
    if sorted.is_empty() {
        return Histogram::default();
    }
    sorted.sort_by(f64::total_cmp);

    let (mut lo, mut hi) = (sorted[0], sorted[sorted.len() - 1]);
    if lo == hi {
        lo -= 0.5;
        hi += 0.5;
    }

    let n_bins = match bins {
        Some(b) => b.max(1),
        None => {
            let width = auto_bin_width(&sorted);
            let wanted = if width > 0.0 {
                (((hi - lo) / width).ceil() as usize).max(1)
            } else {
                1
            };
            if wanted > MAX_AUTO_BINS {
                log::warn!("histogram: {wanted} automatic bins capped at {MAX_AUTO_BINS}");
            }
            wanted.min(MAX_AUTO_BINS)
        }
    };

    let span = hi - lo;
    let mut counts = vec![0u64; n_bins];
    for &x in &sorted {
        let k = (((x - lo) / span) * n_bins as f64).floor() as usize;
        counts[k.min(n_bins - 1)] += 1;
    }

    let edge = |k: usize| {
        if k == n_bins {
            hi
        } else {
            lo + span * k as f64 / n_bins as f64
        }
    };
    let bins = (0..n_bins)
        .map(|k| [round_to(edge(k), decimals), round_to(edge(k + 1), decimals)])
        .collect();

    Histogram { bins, counts }
}

// ---------------------------------------------------------------------------
// Report
// ---------------------------------------------------------------------------

/// Full quality report for one matrix, rounded to `precision.report`.
pub fn analyze(matrix: &ContingencyMatrix, config: &MatchConfig) -> QualityReport {
    let decimals = config.precision.report;
    let log_base = config.quality.log;

    let energy = splitting_energy_with(matrix, |x| log_base.apply(x));
    let confidence = splitting_confidence(matrix);

    let splitting_confidences: BTreeMap<String, f64> = matrix
        .units()
        .iter()
        .zip(&confidence)
        .map(|(unit, &c)| (unit.clone(), round_to(c, decimals)))
        .collect();

    log::info!(
        "Splitting energy {energy:.6} over {} units ({} log)",
        matrix.n_units(),
        log_base
    );

    QualityReport {
        region: config.region.clone(),
        unit: Some(config.unit.clone()),
        partitioned_by: Some(config.partition.clone()),
        splitting_energy: round_to(energy, decimals),
        splitting_confidences,
        histogram: histogram(&confidence, config.quality.histogram_bins, decimals),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LogBase;

    fn scenario_a() -> ContingencyMatrix {
        ContingencyMatrix::from_dense(
            &["1", "2", "3"],
            &["A", "B"],
            &[vec![2.0, 0.0], vec![1.0, 1.0], vec![0.0, 2.0]],
        )
        .unwrap()
    }

    fn identity(n: usize) -> ContingencyMatrix {
        let ids: Vec<String> = (0..n).map(|k| k.to_string()).collect();
        let refs: Vec<&str> = ids.iter().map(String::as_str).collect();
        let rows: Vec<Vec<f64>> = (0..n)
            .map(|i| (0..n).map(|j| if i == j { 1.0 } else { 0.0 }).collect())
            .collect();
        ContingencyMatrix::from_dense(&refs, &refs, &rows).unwrap()
    }

    #[test]
    fn energy_positive_when_split() {
        let e = splitting_energy(&scenario_a());
        // Only unit 2 contributes: -2 * (1/6) * ln(1/2)
        let expected = (2.0f64).ln() / 3.0;
        assert!((e - expected).abs() < 1e-12);
        assert!(e > 0.0);
    }

    #[test]
    fn energy_zero_for_identity() {
        let e = splitting_energy(&identity(8));
        assert_eq!(e, 0.0);
        assert!(e.is_sign_positive());
    }

    #[test]
    fn energy_ignores_empty_rows_and_matrices() {
        let m = ContingencyMatrix::from_dense(&["1", "2"], &["A"], &[vec![0.0], vec![3.0]]).unwrap();
        assert_eq!(splitting_energy(&m), 0.0);
        assert_eq!(splitting_energy(&ContingencyMatrix::default()), 0.0);
    }

    #[test]
    fn energy_never_evaluates_f_at_zero() {
        let m = scenario_a();
        let e = splitting_energy_with(&m, |x| {
            assert!(x > 0.0, "f called with {x}");
            x.ln()
        });
        assert!(e.is_finite());
    }

    #[test]
    fn energy_in_bits() {
        let e = splitting_energy_with(&scenario_a(), |x| LogBase::Binary.apply(x));
        assert!((e - 1.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn confidence_bounded_and_guarded() {
        let m = ContingencyMatrix::from_dense(
            &["1", "2", "3"],
            &["A", "B"],
            &[vec![2.0, 0.0], vec![1.0, 3.0], vec![0.0, 0.0]],
        )
        .unwrap();
        assert_eq!(splitting_confidence(&m), vec![1.0, 0.75, 0.0]);
    }

    #[test]
    fn histogram_empty() {
        let h = histogram(&[], None, 6);
        assert!(h.bins.is_empty());
        assert!(h.counts.is_empty());
    }

    #[test]
    fn histogram_constant_samples_use_unit_bin() {
        let h = histogram(&[1.0, 1.0, 1.0], None, 6);
        assert_eq!(h.bins, vec![[0.5, 1.5]]);
        assert_eq!(h.counts, vec![3]);
    }

    #[test]
    fn histogram_auto_counts_every_sample() {
        let samples: Vec<f64> = (0..100).map(|k| k as f64 / 99.0).collect();
        let h = histogram(&samples, None, 6);
        assert_eq!(h.counts.iter().sum::<u64>(), 100);
        assert_eq!(h.bins.len(), h.counts.len());
        assert_eq!(h.bins[0][0], 0.0);
        assert_eq!(h.bins[h.bins.len() - 1][1], 1.0);
        // Sturges gives 8 bins for 100 uniform samples; FD is wider here.
        assert_eq!(h.bins.len(), 8);
    }

    #[test]
    fn histogram_auto_prefers_freedman_diaconis_when_narrower() {
        // Dense middle, two outliers: IQR ~0.1 gives 30 bins, Sturges 9.
        let mut samples = vec![0.0];
        samples.extend((0..200).map(|k| 0.5 + k as f64 / 1000.0));
        samples.push(1.0);
        let h = histogram(&samples, None, 6);
        assert_eq!(h.bins.len(), 30);
        assert_eq!(h.counts.len(), 30);
        assert_eq!(h.counts.iter().sum::<u64>(), 202);
        assert_eq!(h.bins[0][0], 0.0);
        assert_eq!(h.bins[29][1], 1.0);
        assert_eq!(h.counts[0], 1);
        assert_eq!(h.counts[29], 1);
    }

    #[test]
    fn histogram_auto_bin_count_is_capped() {
        let mut samples = vec![0.0];
        samples.extend((0..400).map(|k| 0.5 + k as f64 * 1e-9));
        samples.push(1.0);
        let h = histogram(&samples, None, 6);
        assert_eq!(h.bins.len(), MAX_AUTO_BINS);
        assert_eq!(h.counts.iter().sum::<u64>(), 402);

        // An explicit count is taken as given.
        let h = histogram(&samples, Some(2000), 6);
        assert_eq!(h.bins.len(), 2000);
    }

    #[test]
    fn histogram_fixed_bins() {
        let h = histogram(&[0.5, 0.75, 1.0, 1.0], Some(2), 6);
        assert_eq!(h.bins, vec![[0.5, 0.75], [0.75, 1.0]]);
        assert_eq!(h.counts, vec![1, 3]);
    }

    #[test]
    fn report_is_rounded_and_labelled() {
        let config = MatchConfig {
            region: Some("26".into()),
            ..MatchConfig::default()
        };
        let m = ContingencyMatrix::from_dense(&["u", "v"], &["A", "B"], &[vec![2.0, 1.0], vec![1.0, 0.0]]).unwrap();
        let report = analyze(&m, &config);
        assert_eq!(report.region.as_deref(), Some("26"));
        assert_eq!(report.splitting_confidences["u"], 0.666667);
        assert_eq!(report.splitting_confidences["v"], 1.0);
        assert!(report.splitting_energy > 0.0);
        assert_eq!(report.histogram.counts.iter().sum::<u64>(), 2);
    }
}
