//! Paired home/away comparison: dependent-samples t-test plus Cohen's d.
//!
//! Pairing is positional: the i-th home game is paired with the i-th away
//! game in source order, both series truncated to the shorter length. This
//! deliberately ignores opponents and dates, which is cheap and deterministic,
//! and it is the behavior analysts see documented, not an accident.

use serde::Serialize;
use statrs::distribution::{ContinuousCDF, StudentsT};

/// Effect-size bands for |Cohen's d|, lower bound inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EffectSize {
    Negligible,
    Small,
    Medium,
    Large,
}

impl EffectSize {
    pub fn classify(d: f64) -> EffectSize {
        let m = d.abs();
        if m < 0.2 {
            EffectSize::Negligible
        } else if m < 0.5 {
            EffectSize::Small
        } else if m < 0.8 {
            EffectSize::Medium
        } else {
            EffectSize::Large
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            EffectSize::Negligible => "negligible",
            EffectSize::Small => "small",
            EffectSize::Medium => "medium",
            EffectSize::Large => "large",
        }
    }
}

/// Result of comparing one team's home vs away series for one metric.
///
/// The statistics are `None` when the variance of the pairwise differences
/// is exactly zero (degenerate case): no infinities, no NaN.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PairedComparison {
    /// Number of aligned pairs actually used.
    pub n: usize,
    pub t_statistic: Option<f64>,
    pub p_value: Option<f64>,
    pub cohens_d: Option<f64>,
    pub effect: Option<EffectSize>,
    /// True iff `p_value < alpha`. False when the test is degenerate.
    pub significant: bool,
}

/// Run the paired comparison over two series for the same team and metric.
///
/// `a` holds home-role values, `b` away-role values, both in source order.
/// Returns `None` when fewer than 2 aligned pairs exist; the caller must
/// then omit the team entirely rather than emit a NaN row. `alpha` is always
/// supplied by the caller; there is no default here.
pub fn paired_comparison(a: &[f64], b: &[f64], alpha: f64) -> Option<PairedComparison> {
    let n = a.len().min(b.len());
    if n < 2 {
        return None;
    }

    let diffs: Vec<f64> = a[..n].iter().zip(&b[..n]).map(|(x, y)| x - y).collect();
    let nf = n as f64;
    let mean = diffs.iter().sum::<f64>() / nf;
    let var = diffs.iter().map(|d| (d - mean).powi(2)).sum::<f64>() / (nf - 1.0);
    let sd = var.sqrt();

    if sd == 0.0 {
        return Some(PairedComparison {
            n,
            t_statistic: None,
            p_value: None,
            cohens_d: None,
            effect: None,
            significant: false,
        });
    }

    let t = mean / (sd / nf.sqrt());
    // Two-sided p from Student's t with n-1 degrees of freedom. Construction
    // only fails for invalid parameters, which n >= 2 rules out.
    let p_value = StudentsT::new(0.0, 1.0, nf - 1.0)
        .ok()
        .map(|dist| 2.0 * (1.0 - dist.cdf(t.abs())));
    let d = mean / sd;

    Some(PairedComparison {
        n,
        t_statistic: Some(t),
        p_value,
        cohens_d: Some(d),
        effect: Some(EffectSize::classify(d)),
        significant: p_value.map(|p| p < alpha).unwrap_or(false),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_fewer_than_two_pairs_is_undefined() {
        assert!(paired_comparison(&[1.0], &[0.0, 1.0, 0.0], 0.05).is_none());
        assert!(paired_comparison(&[], &[], 0.05).is_none());
    }

    #[test]
    fn test_zero_mean_difference() {
        // Home scores [5,3,7,2] vs away scores [4,6,2,5]: diffs sum to zero
        let a = [5.0, 3.0, 7.0, 2.0];
        let b = [4.0, 6.0, 2.0, 5.0];
        let cmp = paired_comparison(&a, &b, 0.05).unwrap();
        assert_eq!(cmp.n, 4);
        assert_relative_eq!(cmp.t_statistic.unwrap(), 0.0, epsilon = 1e-12);
        assert_relative_eq!(cmp.p_value.unwrap(), 1.0, epsilon = 1e-12);
        assert_relative_eq!(cmp.cohens_d.unwrap(), 0.0, epsilon = 1e-12);
        assert_eq!(cmp.effect, Some(EffectSize::Negligible));
        assert!(!cmp.significant);
    }

    #[test]
    fn test_known_t_and_p() {
        // diffs = [1, 2, 3]: mean 2, sd 1, t = 2 * sqrt(3), df = 2.
        // Exact CDF for df=2 gives a two-sided p of 2*(1 - (1/2 + t/(2*sqrt(t^2+2)))).
        let a = [2.0, 3.0, 4.0];
        let b = [1.0, 1.0, 1.0];
        let cmp = paired_comparison(&a, &b, 0.1).unwrap();
        let t = cmp.t_statistic.unwrap();
        assert_relative_eq!(t, 2.0 * 3.0_f64.sqrt(), epsilon = 1e-12);
        let expected_p = 2.0 * (1.0 - (0.5 + t / (2.0 * (t * t + 2.0).sqrt())));
        assert_relative_eq!(cmp.p_value.unwrap(), expected_p, epsilon = 1e-9);
        assert_relative_eq!(cmp.cohens_d.unwrap(), 2.0, epsilon = 1e-12);
        assert_eq!(cmp.effect, Some(EffectSize::Large));
        // p ≈ 0.0742: significant at alpha 0.1, not at 0.05
        assert!(cmp.significant);
        assert!(!paired_comparison(&a, &b, 0.05).unwrap().significant);
    }

    #[test]
    fn test_truncation_uses_only_common_prefix() {
        let a = [5.0, 3.0, 7.0, 2.0, 6.0];
        let b1 = [4.0, 6.0, 2.0, 5.0, 1.0, 99.0, -7.0, 0.0];
        let b2 = [4.0, 6.0, 2.0, 5.0, 1.0, 0.0, 123.0, 55.0];
        let c1 = paired_comparison(&a, &b1, 0.05).unwrap();
        let c2 = paired_comparison(&a, &b2, 0.05).unwrap();
        assert_eq!(c1.n, 5);
        // Elements past index 4 of b must not influence the result at all
        assert_eq!(c1, c2);
    }

    #[test]
    fn test_degenerate_variance_reports_sentinels() {
        // Home always wins by exactly 2 runs: diff variance is zero
        let a = [5.0, 7.0, 3.0];
        let b = [3.0, 5.0, 1.0];
        let cmp = paired_comparison(&a, &b, 0.05).unwrap();
        assert_eq!(cmp.t_statistic, None);
        assert_eq!(cmp.p_value, None);
        assert_eq!(cmp.cohens_d, None);
        assert_eq!(cmp.effect, None);
        assert!(!cmp.significant);
    }

    #[test]
    fn test_determinism() {
        let a = [1.0, 0.0, 1.0, 1.0, 0.0];
        let b = [0.0, 1.0, 0.0, 1.0, 1.0];
        let c1 = paired_comparison(&a, &b, 0.1).unwrap();
        let c2 = paired_comparison(&a, &b, 0.1).unwrap();
        // Bit-identical, not merely approximately equal
        assert_eq!(c1.t_statistic.unwrap().to_bits(), c2.t_statistic.unwrap().to_bits());
        assert_eq!(c1.p_value.unwrap().to_bits(), c2.p_value.unwrap().to_bits());
        assert_eq!(c1.cohens_d.unwrap().to_bits(), c2.cohens_d.unwrap().to_bits());
    }

    #[test]
    fn test_effect_size_bands_lower_bound_inclusive() {
        assert_eq!(EffectSize::classify(0.0), EffectSize::Negligible);
        assert_eq!(EffectSize::classify(0.1999), EffectSize::Negligible);
        assert_eq!(EffectSize::classify(0.2), EffectSize::Small);
        assert_eq!(EffectSize::classify(0.4999), EffectSize::Small);
        assert_eq!(EffectSize::classify(0.5), EffectSize::Medium);
        assert_eq!(EffectSize::classify(0.8), EffectSize::Large);
        assert_eq!(EffectSize::classify(-0.9), EffectSize::Large);
        assert_eq!(EffectSize::classify(-0.2), EffectSize::Small);
    }
}
