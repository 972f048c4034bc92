//! Standard normal tail probabilities and multiple-comparison adjustment.

use std::f64::consts::SQRT_2;

use species_hotspots_hotspot_models::PValueAdjustment;

/// Complementary error function.
///
/// Chebyshev fit from Numerical Recipes (`erfcc`), fractional error below
/// 1.2e-7 everywhere, which is far tighter than any significance
/// threshold needs.
#[must_use]
pub fn erfc(x: f64) -> f64 {
    let z = x.abs();
    let t = 1.0 / 0.5f64.mul_add(z, 1.0);
    let poly = t.mul_add(
        t.mul_add(
            t.mul_add(
                t.mul_add(
                    t.mul_add(
                        t.mul_add(
                            t.mul_add(
                                t.mul_add(t.mul_add(0.170_872_77, -0.822_152_23), 1.488_515_87),
                                -1.135_203_98,
                            ),
                            0.278_868_07,
                        ),
                        -0.186_288_06,
                    ),
                    0.096_784_18,
                ),
                0.374_091_96,
            ),
            1.000_023_68,
        ),
        -1.265_512_23,
    );
    let ans = t * (-z).mul_add(z, poly).exp();
    if x >= 0.0 { ans } else { 2.0 - ans }
}

/// Two-sided p-value of a z-score under the standard normal. Non-finite
/// scores get `1.0`.
#[must_use]
pub fn two_sided_p(z: f64) -> f64 {
    if !z.is_finite() {
        return 1.0;
    }
    erfc(z.abs() / SQRT_2).clamp(0.0, 1.0)
}

/// Adjusts a family of p-values, one per cell, for multiple comparisons.
/// The output is index-aligned with `p_values` and stays in `[0, 1]`.
#[must_use]
pub fn adjust(p_values: &[f64], adjustment: PValueAdjustment) -> Vec<f64> {
    #[allow(clippy::cast_precision_loss)]
    let n = p_values.len() as f64;

    match adjustment {
        PValueAdjustment::None => p_values.to_vec(),
        PValueAdjustment::Bonferroni => p_values.iter().map(|p| (p * n).min(1.0)).collect(),
        PValueAdjustment::FalseDiscoveryRate => {
            let mut order: Vec<usize> = (0..p_values.len()).collect();
            order.sort_by(|&a, &b| p_values[a].total_cmp(&p_values[b]));

            let mut adjusted = vec![1.0; p_values.len()];
            let mut running = 1.0_f64;
            for (rank, &index) in order.iter().enumerate().rev() {
                #[allow(clippy::cast_precision_loss)]
                let rank = (rank + 1) as f64;
                running = running.min(p_values[index] * n / rank);
                adjusted[index] = running.min(1.0);
            }
            adjusted
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn erfc_matches_reference_values() {
        let cases = [
            (0.0, 1.0),
            (0.5, 0.479_500_122),
            (1.0, 0.157_299_207),
            (2.0, 0.004_677_735),
            (-1.0, 1.842_700_793),
        ];
        for (x, expected) in cases {
            let got = erfc(x);
            assert!(
                (got - expected).abs() <= 1.2e-7 * expected.max(1e-3),
                "erfc({x}) = {got}, expected {expected}"
            );
        }
    }

    #[test]
    fn familiar_critical_values() {
        assert!((two_sided_p(1.959_964) - 0.05).abs() < 1e-6);
        assert!((two_sided_p(-1.959_964) - 0.05).abs() < 1e-6);
        assert!((two_sided_p(2.575_829) - 0.01).abs() < 1e-6);
        assert!((two_sided_p(0.0) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn p_values_stay_in_unit_interval() {
        for z in [-40.0, -5.0, -0.1, 0.0, 0.1, 5.0, 40.0] {
            let p = two_sided_p(z);
            assert!((0.0..=1.0).contains(&p), "p({z}) = {p}");
        }
        assert!((two_sided_p(f64::NAN) - 1.0).abs() < f64::EPSILON);
        assert!((two_sided_p(f64::INFINITY) - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn bonferroni_scales_and_clamps() {
        let adjusted = adjust(&[0.001, 0.02, 0.5], PValueAdjustment::Bonferroni);
        assert!((adjusted[0] - 0.003).abs() < 1e-12);
        assert!((adjusted[1] - 0.06).abs() < 1e-12);
        assert!((adjusted[2] - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn false_discovery_rate_is_step_up_and_keeps_order() {
        // Sorted: 0.01 -> 0.04, 0.02 -> 0.04, 0.03 -> 0.04, 0.04 -> 0.04.
        let p = [0.03, 0.01, 0.04, 0.02];
        let adjusted = adjust(&p, PValueAdjustment::FalseDiscoveryRate);
        for value in &adjusted {
            assert!((value - 0.04).abs() < 1e-12, "{adjusted:?}");
        }

        let p = [0.001, 0.8, 0.01, 0.5];
        let adjusted = adjust(&p, PValueAdjustment::FalseDiscoveryRate);
        assert!((adjusted[0] - 0.004).abs() < 1e-12);
        assert!((adjusted[2] - 0.02).abs() < 1e-12);
        assert!((adjusted[3] - 0.666_666_666_666_7).abs() < 1e-9);
        assert!((adjusted[1] - 0.8).abs() < 1e-12);
        for (raw, adj) in p.iter().zip(&adjusted) {
            assert!(adj >= raw);
        }
    }

    #[test]
    fn no_adjustment_and_empty_input() {
        let p = [0.2, 0.03];
        let unchanged = adjust(&p, PValueAdjustment::None);
        assert_eq!(unchanged.len(), 2);
        assert!(unchanged.iter().zip(&p).all(|(a, b)| (a - b).abs() < f64::EPSILON));
        assert!(adjust(&[], PValueAdjustment::FalseDiscoveryRate).is_empty());
        assert!(adjust(&[], PValueAdjustment::Bonferroni).is_empty());
    }
}
