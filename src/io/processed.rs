//! Processed dataset CSV (`processed_kiva.csv`).
//!
//! One `ProcessedRow` per line; categorical columns hold label codes.

use std::fs::File;
use std::path::Path;

use crate::domain::ProcessedRow;
use crate::error::AppError;

pub const PROCESSED_FILE: &str = "processed_kiva.csv";

/// Write processed rows, creating parent directories as needed.
pub fn write_processed_csv(path: &Path, rows: &[ProcessedRow]) -> Result<(), AppError> {
    super::ensure_parent_dir(path)?;
    let file = File::create(path)
        .map_err(|e| AppError::new(2, format!("Failed to create processed CSV '{}': {e}", path.display())))?;

    let mut writer = csv::Writer::from_writer(file);
    for row in rows {
        writer
            .serialize(row)
            .map_err(|e| AppError::new(2, format!("Failed to write processed CSV row: {e}")))?;
    }
    writer
        .flush()
        .map_err(|e| AppError::new(2, format!("Failed to flush processed CSV: {e}")))?;
    Ok(())
}

/// Read processed rows. Any malformed row is an error: this file is produced
/// by `credit prepare`, so damage means the pipeline is out of sync.
pub fn read_processed_csv(path: &Path) -> Result<Vec<ProcessedRow>, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::new(2, format!("Failed to open processed CSV '{}': {e}", path.display())))?;

    let mut reader = csv::Reader::from_reader(file);
    let mut rows = Vec::new();
    for (idx, result) in reader.deserialize::<ProcessedRow>().enumerate() {
        let row = result.map_err(|e| {
            AppError::new(
                2,
                format!("Invalid row at line {} of '{}': {e}", idx + 2, path.display()),
            )
        })?;
        rows.push(row);
    }

    if rows.is_empty() {
        return Err(AppError::new(3, format!("Processed CSV '{}' has no rows.", path.display())));
    }
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(funded: u8) -> ProcessedRow {
        ProcessedRow {
            loan_amount: 775.0,
            term_in_months: 14.0,
            repayment_interval: 1,
            country: 30,
            activity: 12,
            region: 800,
            loan_theme_type: 5,
            funded,
            mpi: 0.187,
            theme_loan_density: 3.0,
            num_female_borrowers: 1,
            num_male_borrowers: 0,
        }
    }

    #[test]
    fn header_matches_processed_layout() {
        let path = std::env::temp_dir().join(format!("agri-credit-processed-{}.csv", std::process::id()));
        write_processed_csv(&path, &[row(1), row(0)]).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let header = text.lines().next().unwrap();
        assert_eq!(
            header,
            "loan_amount,term_in_months,repayment_interval,country,activity,region,\
             loan_theme_type,funded,mpi,theme_loan_density,num_female_borrowers,num_male_borrowers"
        );

        let back = read_processed_csv(&path).unwrap();
        assert_eq!(back, vec![row(1), row(0)]);
    }

    #[test]
    fn damaged_row_is_reported_with_line() {
        let path = std::env::temp_dir().join(format!("agri-credit-damaged-{}.csv", std::process::id()));
        std::fs::write(
            &path,
            "loan_amount,term_in_months,repayment_interval,country,activity,region,loan_theme_type,funded,mpi,theme_loan_density,num_female_borrowers,num_male_borrowers\n\
             100,8,1,2,3,4,5,1,0.2,3,1,0\n\
             abc,8,1,2,3,4,5,1,0.2,3,1,0\n",
        )
        .unwrap();
        let err = read_processed_csv(&path).unwrap_err();
        assert!(err.message().contains("line 3"));
    }
}
