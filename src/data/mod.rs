//! Offline ETL: raw Kiva exports -> labeled, enriched, encoded training rows.
//!
//! Stages, in order:
//!
//! 1. join loans with theme ids, keep the configured sector, drop incomplete rows,
//!    and label each loan by its funded ratio (`label`)
//! 2. rebalance to the configured funded share (`balance`)
//! 3. join country MPI and theme loan density, impute and clip (`enrich`)
//! 4. count borrowers by gender
//! 5. fit label mappings and encode every row through `LabelMappings::encode`,
//!    the same call the server uses
//!
//! Enrichment statistics (medians, quantiles) are computed after rebalancing,
//! over the rows that are actually written.

pub mod balance;
pub mod enrich;
pub mod label;

use crate::domain::{CategoricalColumn, LoanApplication, PrepareConfig, ProcessedRow};
use crate::error::AppError;
use crate::features::LabelMappings;
use crate::io::ingest::KivaSources;

pub use balance::BalanceStats;
pub use label::{LabelStats, LabeledLoan};

/// Output of the ETL.
#[derive(Debug, Clone)]
pub struct PreparedDataset {
    /// Enriched raw loans, one per output row.
    pub loans: Vec<LoanApplication>,
    pub labels: Vec<bool>,
    pub mappings: LabelMappings,
    pub rows: Vec<ProcessedRow>,
    pub summary: PrepareSummary,
}

/// Counters reported after `credit prepare`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PrepareSummary {
    pub loans_read: usize,
    pub row_errors: usize,
    pub label: LabelStats,
    pub balance: BalanceStats,
    pub mpi_imputed: usize,
    pub density_imputed: usize,
    /// Distinct values per categorical column.
    pub cardinalities: Vec<(CategoricalColumn, usize)>,
}

pub fn prepare_dataset(sources: &KivaSources, config: &PrepareConfig) -> Result<PreparedDataset, AppError> {
    if !(config.funded_ratio_threshold.is_finite() && config.funded_ratio_threshold > 0.0) {
        return Err(AppError::new(2, "Funded ratio threshold must be finite and > 0."));
    }
    if !(config.density_clip_quantile > 0.0 && config.density_clip_quantile <= 1.0) {
        return Err(AppError::new(2, "Density clip quantile must be in (0, 1]."));
    }

    // 1) Join, filter, label.
    let (labeled, label_stats) = label::label_loans(
        &sources.loans.rows,
        &sources.theme_ids.rows,
        &config.sector,
        config.funded_ratio_threshold,
    );
    if labeled.is_empty() {
        return Err(AppError::new(
            3,
            format!("No complete `{}` loans remain after filtering.", config.sector),
        ));
    }
    tracing::info!(
        in_sector = label_stats.in_sector,
        complete = label_stats.complete,
        "loans labeled"
    );

    // 2) Rebalance.
    let (balanced, balance_stats) = balance::rebalance(labeled, |l| l.funded, config.accept_share, config.seed)?;
    tracing::info!(
        funded = balance_stats.positive_after,
        not_funded = balance_stats.negative_after,
        "classes rebalanced"
    );

    // 3) MPI per country, then theme density per (country, theme).
    let mpi_by_country = enrich::country_mpi(&sources.mpi.rows);
    let raw_mpi: Vec<Option<f64>> = balanced
        .iter()
        .map(|l| mpi_by_country.get(&l.country).copied())
        .collect();
    let (mpi, mpi_imputed) = enrich::fill_with_median("mpi", &raw_mpi)?;

    let density_by_theme = enrich::theme_density(&sources.themes_by_region.rows);
    let mut raw_density: Vec<Option<f64>> = balanced
        .iter()
        .map(|l| {
            density_by_theme
                .get(&(l.country.clone(), l.loan_theme_id.clone()))
                .map(|&n| n as f64)
        })
        .collect();
    enrich::clip_upper_quantile(&mut raw_density, config.density_clip_quantile);
    let (density, density_imputed) = enrich::fill_with_median("theme_loan_density", &raw_density)?;

    // 4) Assemble raw applications with gender counts.
    let mut loans = Vec::with_capacity(balanced.len());
    let mut labels = Vec::with_capacity(balanced.len());
    for ((loan, mpi), density) in balanced.into_iter().zip(mpi).zip(density) {
        let (female, male) = enrich::gender_counts(&loan.borrower_genders);
        labels.push(loan.funded);
        loans.push(LoanApplication {
            loan_amount: loan.loan_amount,
            term_in_months: loan.term_in_months,
            repayment_interval: loan.repayment_interval,
            country: loan.country,
            activity: loan.activity,
            region: loan.region,
            loan_theme_type: loan.loan_theme_type,
            mpi,
            theme_loan_density: density,
            num_female_borrowers: female,
            num_male_borrowers: male,
        });
    }

    // 5) Fit mappings and encode.
    let mappings = LabelMappings::fit(&loans);
    let rows: Vec<ProcessedRow> = loans
        .iter()
        .zip(&labels)
        .map(|(loan, &funded)| ProcessedRow::from_encoded(&mappings.encode(loan), funded))
        .collect();

    let summary = PrepareSummary {
        loans_read: sources.loans.rows_read,
        row_errors: sources.row_errors().count(),
        label: label_stats,
        balance: balance_stats,
        mpi_imputed,
        density_imputed,
        cardinalities: CategoricalColumn::ALL
            .iter()
            .map(|&c| (c, mappings.cardinality(c)))
            .collect(),
    };

    Ok(PreparedDataset {
        loans,
        labels,
        mappings,
        rows,
        summary,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::FeatureVector;
    use crate::io::ingest::{KivaLoanRow, MpiRow, Table, ThemeIdRow, ThemeRegionRow};

    fn table<T>(rows: Vec<T>) -> Table<T> {
        Table {
            rows_read: rows.len(),
            rows,
            row_errors: Vec::new(),
        }
    }

    fn loan(id: usize, country: &str, funded_amount: f64) -> KivaLoanRow {
        KivaLoanRow {
            id: id.to_string(),
            funded_amount: Some(funded_amount),
            loan_amount: Some(500.0),
            activity: Some(if id % 2 == 0 { "Dairy" } else { "Poultry" }.to_string()),
            sector: Some("Agriculture".to_string()),
            country: Some(country.to_string()),
            region: Some(format!("Region {}", id % 3)),
            term_in_months: Some(4.0 + id as f64),
            borrower_genders: Some("female, male".to_string()),
            repayment_interval: Some("monthly".to_string()),
        }
    }

    fn sources() -> KivaSources {
        let mut loans = Vec::new();
        let mut theme_ids = Vec::new();
        for id in 0..20 {
            let country = if id % 4 == 0 { "Chile" } else { "Kenya" };
            let funded = if id % 5 == 0 { 100.0 } else { 500.0 };
            loans.push(loan(id, country, funded));
            theme_ids.push(ThemeIdRow {
                id: id.to_string(),
                theme_id: Some(format!("t{}", id % 2)),
                theme_type: Some("General".to_string()),
            });
        }
        KivaSources {
            loans: table(loans),
            theme_ids: table(theme_ids),
            mpi: table(vec![MpiRow {
                country: Some("Kenya".to_string()),
                mpi: Some(0.25),
            }]),
            themes_by_region: table(vec![
                ThemeRegionRow {
                    country: Some("Kenya".to_string()),
                    theme_id: Some("t0".to_string()),
                },
                ThemeRegionRow {
                    country: Some("Kenya".to_string()),
                    theme_id: Some("t1".to_string()),
                },
            ]),
        }
    }

    fn config() -> PrepareConfig {
        PrepareConfig {
            data_dir: "data".into(),
            out_dir: "data".into(),
            sector: "Agriculture".to_string(),
            funded_ratio_threshold: 0.9,
            accept_share: 0.6,
            density_clip_quantile: 0.95,
            seed: 42,
        }
    }

    #[test]
    fn produces_balanced_encoded_rows() {
        let prepared = prepare_dataset(&sources(), &config()).unwrap();

        assert_eq!(prepared.rows.len(), 20);
        assert_eq!(prepared.labels.iter().filter(|&&y| y).count(), 12);
        assert_eq!(prepared.summary.label.complete, 20);
        // Chile has no MPI: imputed with the median, which is Kenya's value.
        assert!(prepared.loans.iter().all(|l| (l.mpi - 0.25).abs() < 1e-12));
        assert!(prepared.loans.iter().all(|l| l.num_female_borrowers == 1 && l.num_male_borrowers == 1));
    }

    #[test]
    fn processed_rows_match_server_encoding() {
        let prepared = prepare_dataset(&sources(), &config()).unwrap();
        for ((loan, row), &funded) in prepared.loans.iter().zip(&prepared.rows).zip(&prepared.labels) {
            assert_eq!(row.is_funded(), funded);
            assert_eq!(
                FeatureVector::from_encoded(&row.encoded()),
                FeatureVector::from_encoded(&prepared.mappings.encode(loan))
            );
        }
    }

    #[test]
    fn fails_when_sector_is_empty() {
        let cfg = PrepareConfig {
            sector: "Housing".to_string(),
            ..config()
        };
        assert_eq!(prepare_dataset(&sources(), &cfg).unwrap_err().exit_code(), 3);
    }
}
