//! Class rebalancing.
//!
//! The output has the same row count as the input, with `share` of it drawn
//! from positive rows and the rest from negative rows:
//!
//! - positives are sampled without replacement, falling back to sampling with
//!   replacement when there are fewer positives than requested
//! - negatives (the minority in Kiva data) are always sampled with replacement
//!
//! The result is shuffled. Everything is driven by one seeded RNG.

use rand::rngs::StdRng;
use rand::seq::{SliceRandom, index};
use rand::{Rng, SeedableRng};

use crate::error::AppError;

/// Counts before and after rebalancing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BalanceStats {
    pub positive_before: usize,
    pub negative_before: usize,
    pub positive_after: usize,
    pub negative_after: usize,
}

pub fn rebalance<T: Clone>(
    rows: Vec<T>,
    is_positive: impl Fn(&T) -> bool,
    share: f64,
    seed: u64,
) -> Result<(Vec<T>, BalanceStats), AppError> {
    if !(share > 0.0 && share < 1.0) {
        return Err(AppError::new(2, format!("Invalid accept share {share} (must be in (0, 1)).")));
    }

    let n_total = rows.len();
    let n_pos = (n_total as f64 * share).floor() as usize;
    let n_neg = n_total - n_pos;

    let (positives, negatives): (Vec<T>, Vec<T>) = rows.into_iter().partition(|r| is_positive(r));
    let mut stats = BalanceStats {
        positive_before: positives.len(),
        negative_before: negatives.len(),
        ..BalanceStats::default()
    };

    if (n_pos > 0 && positives.is_empty()) || (n_neg > 0 && negatives.is_empty()) {
        return Err(AppError::new(
            3,
            format!(
                "Cannot rebalance: {} funded and {} not-funded rows available.",
                positives.len(),
                negatives.len()
            ),
        ));
    }

    let mut rng = StdRng::seed_from_u64(seed);
    let mut out = Vec::with_capacity(n_total);

    if positives.len() >= n_pos {
        for i in index::sample(&mut rng, positives.len(), n_pos) {
            out.push(positives[i].clone());
        }
    } else {
        tracing::warn!(
            available = positives.len(),
            requested = n_pos,
            "not enough funded rows; sampling with replacement"
        );
        sample_with_replacement(&mut rng, &positives, n_pos, &mut out);
    }
    sample_with_replacement(&mut rng, &negatives, n_neg, &mut out);

    out.shuffle(&mut rng);
    stats.positive_after = n_pos;
    stats.negative_after = n_neg;
    Ok((out, stats))
}

fn sample_with_replacement<T: Clone>(rng: &mut StdRng, from: &[T], n: usize, out: &mut Vec<T>) {
    for _ in 0..n {
        out.push(from[rng.gen_range(0..from.len())].clone());
    }
}
