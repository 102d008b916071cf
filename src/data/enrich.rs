//! Enrichment joins: country MPI, theme loan density, borrower gender counts.

use std::collections::HashMap;

use crate::error::AppError;
use crate::io::ingest::{MpiRow, ThemeRegionRow};
use crate::math::{mean, median, quantile};

/// Mean MPI per country, ignoring missing values.
///
/// Countries with no MPI value at all are absent from the result.
pub fn country_mpi(rows: &[MpiRow]) -> HashMap<String, f64> {
    let mut grouped: HashMap<&str, Vec<f64>> = HashMap::new();
    for row in rows {
        if let (Some(country), Some(mpi)) = (row.country.as_deref(), row.mpi) {
            grouped.entry(country).or_default().push(mpi);
        }
    }
    grouped
        .into_iter()
        .filter_map(|(country, values)| mean(&values).map(|m| (country.to_string(), m)))
        .collect()
}

/// Number of regional theme rows per `(country, theme id)`.
pub fn theme_density(rows: &[ThemeRegionRow]) -> HashMap<(String, String), usize> {
    let mut counts: HashMap<(String, String), usize> = HashMap::new();
    for row in rows {
        if let (Some(country), Some(theme)) = (row.country.as_deref(), row.theme_id.as_deref()) {
            *counts.entry((country.to_string(), theme.to_string())).or_default() += 1;
        }
    }
    counts
}

/// Fill missing values with the median of the present ones.
///
/// Returns the filled column and how many values were imputed. Fails if no
/// value is present, since there is nothing to impute from.
pub fn fill_with_median(column: &str, values: &[Option<f64>]) -> Result<(Vec<f64>, usize), AppError> {
    let present: Vec<f64> = values.iter().flatten().copied().collect();
    let fill = median(&present)
        .ok_or_else(|| AppError::new(3, format!("Column `{column}` has no values to impute from.")))?;

    let imputed = values.len() - present.len();
    Ok((values.iter().map(|v| v.unwrap_or(fill)).collect(), imputed))
}

/// Clip present values above the `q` quantile of the present values.
pub fn clip_upper_quantile(values: &mut [Option<f64>], q: f64) {
    let present: Vec<f64> = values.iter().flatten().copied().collect();
    if let Some(cap) = quantile(&present, q) {
        for v in values.iter_mut().flatten() {
            *v = v.min(cap);
        }
    }
}

/// Count `female` and `male` entries in a comma-separated gender list.
///
/// Returns `(female, male)`. Unknown tokens are ignored.
///
/// Counting is per whole token, so `"female"` never counts as `"male"`. A
/// plain substring count (as in the older pandas preprocessing) would report
/// `"female, female"` as two male borrowers too; the served request carries
/// the true male count, so training uses the same meaning.
pub fn gender_counts(borrower_genders: &str) -> (u32, u32) {
    let mut female = 0;
    let mut male = 0;
    for token in borrower_genders.split(',').map(str::trim) {
        if token.eq_ignore_ascii_case("female") {
            female += 1;
        } else if token.eq_ignore_ascii_case("male") {
            male += 1;
        }
    }
    (female, male)
}
