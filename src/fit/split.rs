//! Stratified train/test split.
//!
//! Each class is shuffled independently and `round(n_class * test_fraction)`
//! of its rows go to the test set, so both splits keep the class balance of
//! the full dataset. The result is deterministic for a given seed.

use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;

use crate::error::AppError;

/// Row indices of each side of the split.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitIndices {
    pub train: Vec<usize>,
    pub test: Vec<usize>,
}

pub fn stratified_split(labels: &[bool], test_fraction: f64, seed: u64) -> Result<SplitIndices, AppError> {
    if !(test_fraction > 0.0 && test_fraction < 1.0) {
        return Err(AppError::new(
            2,
            format!("Invalid test fraction {test_fraction} (must be in (0, 1))."),
        ));
    }

    let mut rng = StdRng::seed_from_u64(seed);
    let mut train = Vec::new();
    let mut test = Vec::new();

    for class in [false, true] {
        let mut idx: Vec<usize> = labels
            .iter()
            .enumerate()
            .filter(|&(_, &y)| y == class)
            .map(|(i, _)| i)
            .collect();
        idx.shuffle(&mut rng);

        let n_test = (idx.len() as f64 * test_fraction).round() as usize;
        test.extend_from_slice(&idx[..n_test]);
        train.extend_from_slice(&idx[n_test..]);
    }

    if train.is_empty() || test.is_empty() {
        return Err(AppError::new(
            3,
            format!(
                "Not enough rows to split ({} rows, test fraction {test_fraction}).",
                labels.len()
            ),
        ));
    }

    train.shuffle(&mut rng);
    test.shuffle(&mut rng);
    Ok(SplitIndices { train, test })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_class_balance() {
        let labels: Vec<bool> = (0..100).map(|i| i % 5 < 3).collect(); // 60 positive
        let split = stratified_split(&labels, 0.2, 42).unwrap();

        assert_eq!(split.test.len(), 20);
        assert_eq!(split.train.len(), 80);
        let test_pos = split.test.iter().filter(|&&i| labels[i]).count();
        assert_eq!(test_pos, 12);
    }

    #[test]
    fn covers_every_row_once() {
        let labels: Vec<bool> = (0..37).map(|i| i % 3 == 0).collect();
        let split = stratified_split(&labels, 0.25, 7).unwrap();
        let mut all: Vec<usize> = split.train.iter().chain(&split.test).copied().collect();
        all.sort_unstable();
        assert_eq!(all, (0..37).collect::<Vec<_>>());
    }

    #[test]
    fn deterministic_for_seed() {
        let labels: Vec<bool> = (0..50).map(|i| i % 2 == 0).collect();
        assert_eq!(
            stratified_split(&labels, 0.2, 1).unwrap(),
            stratified_split(&labels, 0.2, 1).unwrap()
        );
    }

    #[test]
    fn rejects_bad_fraction_and_tiny_data() {
        assert_eq!(stratified_split(&[true, false], 1.0, 0).unwrap_err().exit_code(), 2);
        assert_eq!(stratified_split(&[true, false], 0.1, 0).unwrap_err().exit_code(), 3);
    }
}
