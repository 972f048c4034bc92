//! Getis-Ord Gi* with binary distance-band weights.
//!
//! For cell `i` with neighbourhood `N(i)` (itself included), `n` cells,
//! values `x`, mean `X̄`, and `W_i = |N(i)|`:
//!
//! ```text
//! G*_i = (Σ_{j∈N(i)} x_j − X̄·W_i) / (S · √((n·W_i − W_i²) / (n − 1)))
//! S    = √(Σ (x_j − X̄)² / n)
//! ```
//!
//! `G*_i` is already a z-score. When it is undefined (fewer than two
//! cells, no dispersion, or a neighbourhood spanning every cell) it is
//! reported as `0.0`.

/// Dispersion at or below this fraction of the mean counts as none, so
/// floating-point noise on a flat surface never turns into a z-score.
const RELATIVE_DISPERSION_FLOOR: f64 = 1e-9;

/// Computes Gi* z-scores for every cell.
///
/// `neighbors[i]` must list the indices in the neighbourhood of cell `i`,
/// including `i` itself.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn gi_star(values: &[f64], neighbors: &[Vec<usize>]) -> Vec<f64> {
    let n = values.len();
    if n < 2 {
        return vec![0.0; n];
    }

    let n_f = n as f64;
    let mean = values.iter().sum::<f64>() / n_f;
    let variance = values.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n_f;
    let s = variance.sqrt();

    if s.is_nan() || s <= RELATIVE_DISPERSION_FLOOR * mean.abs() {
        log::debug!("Surface has no dispersion (mean {mean}); every Gi* is 0");
        return vec![0.0; n];
    }

    neighbors
        .iter()
        .map(|neighborhood| {
            let w = neighborhood.len() as f64;
            let weighted_sum: f64 = neighborhood.iter().map(|&j| values[j]).sum();
            let spread = (n_f * w - w * w) / (n_f - 1.0);
            if spread <= 0.0 {
                return 0.0;
            }
            let z = mean.mul_add(-w, weighted_sum) / (s * spread.sqrt());
            if z.is_finite() { z } else { 0.0 }
        })
        .collect()
}
