//! Small numeric helpers shared by the ETL and the booster.

/// Logistic function, computed without overflow for large `|x|`.
pub fn sigmoid(x: f64) -> f64 {
    if x >= 0.0 {
        1.0 / (1.0 + (-x).exp())
    } else {
        let e = x.exp();
        e / (1.0 + e)
    }
}

/// Median of the finite values in `values`.
///
/// Returns `None` if there are no finite values. For an even count the two
/// middle values are averaged.
pub fn median(values: &[f64]) -> Option<f64> {
    quantile(values, 0.5)
}

/// Quantile `q` of the finite values in `values`, using linear interpolation
/// between closest ranks (position `(n - 1) * q`).
pub fn quantile(values: &[f64], q: f64) -> Option<f64> {
    if !(0.0..=1.0).contains(&q) {
        return None;
    }
    let mut sorted: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    if sorted.is_empty() {
        return None;
    }
    sorted.sort_by(f64::total_cmp);

    let pos = (sorted.len() - 1) as f64 * q;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    let frac = pos - lo as f64;
    Some(sorted[lo] + (sorted[hi] - sorted[lo]) * frac)
}

/// Arithmetic mean of the finite values in `values`.
pub fn mean(values: &[f64]) -> Option<f64> {
    let (sum, n) = values
        .iter()
        .filter(|v| v.is_finite())
        .fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    if n == 0 { None } else { Some(sum / n as f64) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sigmoid_is_stable_at_extremes() {
        assert_eq!(sigmoid(0.0), 0.5);
        assert!(sigmoid(800.0) <= 1.0);
        assert!(sigmoid(-800.0) >= 0.0);
        assert!(sigmoid(-800.0).is_finite());
    }

    #[test]
    fn median_averages_middle_pair() {
        assert_eq!(median(&[4.0, 1.0, 3.0, 2.0]), Some(2.5));
        assert_eq!(median(&[5.0, f64::NAN, 1.0, 3.0]), Some(3.0));
        assert_eq!(median(&[]), None);
    }

    #[test]
    fn quantile_interpolates_linearly() {
        let values: Vec<f64> = (1..=21).map(f64::from).collect();
        // position = 20 * 0.95 = 19 -> exact element
        assert_eq!(quantile(&values, 0.95), Some(20.0));
        // position = 3 * 0.95 = 2.85 -> 3 + 0.85 * (4 - 3)
        let q = quantile(&[1.0, 2.0, 3.0, 4.0], 0.95).unwrap();
        assert!((q - 3.85).abs() < 1e-12);
    }

    #[test]
    fn mean_skips_missing() {
        let m = mean(&[0.2, f64::NAN, 0.4]).unwrap();
        assert!((m - 0.3).abs() < 1e-12);
        assert_eq!(mean(&[f64::NAN]), None);
    }
}
