//! CSV ingest of the raw Kiva exports.
//!
//! Four files are read from the data directory:
//!
//! | file | columns used |
//! |------|--------------|
//! | `kiva_loans.csv` | `id, funded_amount, loan_amount, activity, sector, country, region, term_in_months, borrower_genders, repayment_interval` |
//! | `loan_theme_ids.csv` | `id, Loan Theme ID, Loan Theme Type` |
//! | `kiva_mpi_region_locations.csv` | `country, MPI` |
//! | `loan_themes_by_region.csv` | `country, Loan Theme ID` |
//!
//! Design goals:
//! - **Strict schema** for required columns (clear errors + exit code 2)
//! - **Lenient values**: empty or unparsable cells become `None`; deciding
//!   whether a row is usable is left to the ETL
//! - **Row-level errors** (broken CSV records, missing ids) are collected, not fatal

use std::collections::HashMap;
use std::fs::File;
use std::path::Path;

use csv::StringRecord;

use crate::error::AppError;

pub const LOANS_FILE: &str = "kiva_loans.csv";
pub const THEME_IDS_FILE: &str = "loan_theme_ids.csv";
pub const MPI_FILE: &str = "kiva_mpi_region_locations.csv";
pub const THEMES_BY_REGION_FILE: &str = "loan_themes_by_region.csv";

/// A row of `kiva_loans.csv`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct KivaLoanRow {
    pub id: String,
    pub funded_amount: Option<f64>,
    pub loan_amount: Option<f64>,
    pub activity: Option<String>,
    pub sector: Option<String>,
    pub country: Option<String>,
    pub region: Option<String>,
    pub term_in_months: Option<f64>,
    pub borrower_genders: Option<String>,
    pub repayment_interval: Option<String>,
}

/// A row of `loan_theme_ids.csv`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ThemeIdRow {
    pub id: String,
    pub theme_id: Option<String>,
    pub theme_type: Option<String>,
}

/// A row of `kiva_mpi_region_locations.csv`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MpiRow {
    pub country: Option<String>,
    pub mpi: Option<f64>,
}

/// A row of `loan_themes_by_region.csv`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ThemeRegionRow {
    pub country: Option<String>,
    pub theme_id: Option<String>,
}

/// A row-level error encountered during ingest.
#[derive(Debug, Clone)]
pub struct RowError {
    pub file: &'static str,
    pub line: usize,
    pub message: String,
}

/// Parsed rows of one file plus bookkeeping.
#[derive(Debug, Clone)]
pub struct Table<T> {
    pub rows: Vec<T>,
    pub rows_read: usize,
    pub row_errors: Vec<RowError>,
}

/// All raw inputs of the ETL.
#[derive(Debug, Clone)]
pub struct KivaSources {
    pub loans: Table<KivaLoanRow>,
    pub theme_ids: Table<ThemeIdRow>,
    pub mpi: Table<MpiRow>,
    pub themes_by_region: Table<ThemeRegionRow>,
}

impl KivaSources {
    pub fn row_errors(&self) -> impl Iterator<Item = &RowError> {
        self.loans
            .row_errors
            .iter()
            .chain(&self.theme_ids.row_errors)
            .chain(&self.mpi.row_errors)
            .chain(&self.themes_by_region.row_errors)
    }
}

/// Read all four Kiva files from `data_dir`.
pub fn load_kiva_sources(data_dir: &Path) -> Result<KivaSources, AppError> {
    let loans = read_table(&data_dir.join(LOANS_FILE), LOANS_FILE, &LOAN_COLUMNS, parse_loan)?;
    let theme_ids = read_table(&data_dir.join(THEME_IDS_FILE), THEME_IDS_FILE, &THEME_ID_COLUMNS, parse_theme_id)?;
    let mpi = read_table(&data_dir.join(MPI_FILE), MPI_FILE, &MPI_COLUMNS, parse_mpi)?;
    let themes_by_region = read_table(
        &data_dir.join(THEMES_BY_REGION_FILE),
        THEMES_BY_REGION_FILE,
        &THEME_REGION_COLUMNS,
        parse_theme_region,
    )?;

    tracing::info!(
        loans = loans.rows.len(),
        theme_ids = theme_ids.rows.len(),
        mpi = mpi.rows.len(),
        themes_by_region = themes_by_region.rows.len(),
        "raw datasets loaded"
    );

    Ok(KivaSources {
        loans,
        theme_ids,
        mpi,
        themes_by_region,
    })
}

const LOAN_COLUMNS: [&str; 10] = [
    "id",
    "funded_amount",
    "loan_amount",
    "activity",
    "sector",
    "country",
    "region",
    "term_in_months",
    "borrower_genders",
    "repayment_interval",
];
const THEME_ID_COLUMNS: [&str; 3] = ["id", "loan theme id", "loan theme type"];
const MPI_COLUMNS: [&str; 2] = ["country", "mpi"];
const THEME_REGION_COLUMNS: [&str; 2] = ["country", "loan theme id"];

type HeaderMap = HashMap<String, usize>;

/// Read a CSV file, validate its header, and parse each record with `parse`.
pub fn read_table<T>(
    path: &Path,
    file: &'static str,
    required: &[&str],
    parse: fn(&StringRecord, &HeaderMap) -> Result<T, String>,
) -> Result<Table<T>, AppError> {
    let handle = File::open(path)
        .map_err(|e| AppError::new(2, format!("Failed to open CSV '{}': {e}", path.display())))?;

    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(handle);

    let headers = reader
        .headers()
        .map_err(|e| AppError::new(2, format!("Failed to read CSV headers of '{}': {e}", path.display())))?
        .clone();
    let header_map = build_header_map(&headers);

    for column in required {
        if !header_map.contains_key(*column) {
            return Err(AppError::new(
                2,
                format!("Missing required column `{column}` in '{}'.", path.display()),
            ));
        }
    }

    let mut rows = Vec::new();
    let mut row_errors = Vec::new();
    let mut rows_read = 0usize;

    for (idx, result) in reader.records().enumerate() {
        // +2: records() starts after the header, and lines are 1-based.
        let line = idx + 2;
        rows_read += 1;

        let record = match result {
            Ok(r) => r,
            Err(e) => {
                row_errors.push(RowError {
                    file,
                    line,
                    message: format!("CSV parse error: {e}"),
                });
                continue;
            }
        };

        match parse(&record, &header_map) {
            Ok(row) => rows.push(row),
            Err(message) => row_errors.push(RowError { file, line, message }),
        }
    }

    Ok(Table {
        rows,
        rows_read,
        row_errors,
    })
}

fn parse_loan(record: &StringRecord, header_map: &HeaderMap) -> Result<KivaLoanRow, String> {
    Ok(KivaLoanRow {
        id: get_required(record, header_map, "id")?.to_string(),
        funded_amount: parse_opt_f64(get_optional(record, header_map, "funded_amount")),
        loan_amount: parse_opt_f64(get_optional(record, header_map, "loan_amount")),
        activity: get_optional(record, header_map, "activity").map(str::to_string),
        sector: get_optional(record, header_map, "sector").map(str::to_string),
        country: get_optional(record, header_map, "country").map(str::to_string),
        region: get_optional(record, header_map, "region").map(str::to_string),
        term_in_months: parse_opt_f64(get_optional(record, header_map, "term_in_months")),
        borrower_genders: get_optional(record, header_map, "borrower_genders").map(str::to_string),
        repayment_interval: get_optional(record, header_map, "repayment_interval").map(str::to_string),
    })
}

fn parse_theme_id(record: &StringRecord, header_map: &HeaderMap) -> Result<ThemeIdRow, String> {
    Ok(ThemeIdRow {
        id: get_required(record, header_map, "id")?.to_string(),
        theme_id: get_optional(record, header_map, "loan theme id").map(str::to_string),
        theme_type: get_optional(record, header_map, "loan theme type").map(str::to_string),
    })
}

fn parse_mpi(record: &StringRecord, header_map: &HeaderMap) -> Result<MpiRow, String> {
    Ok(MpiRow {
        country: get_optional(record, header_map, "country").map(str::to_string),
        mpi: parse_opt_f64(get_optional(record, header_map, "mpi")),
    })
}

fn parse_theme_region(record: &StringRecord, header_map: &HeaderMap) -> Result<ThemeRegionRow, String> {
    Ok(ThemeRegionRow {
        country: get_optional(record, header_map, "country").map(str::to_string),
        theme_id: get_optional(record, header_map, "loan theme id").map(str::to_string),
    })
}

fn build_header_map(headers: &StringRecord) -> HeaderMap {
    headers
        .iter()
        .enumerate()
        .map(|(idx, name)| (normalize_header_name(name), idx))
        .collect()
}

fn normalize_header_name(name: &str) -> String {
    // Spreadsheet exports sometimes prefix the first header with a UTF-8 BOM.
    let name = name.trim().trim_start_matches('\u{feff}');
    name.to_ascii_lowercase()
}

fn get_optional<'a>(record: &'a StringRecord, header_map: &HeaderMap, column: &str) -> Option<&'a str> {
    let idx = *header_map.get(column)?;
    record.get(idx).map(str::trim).filter(|s| !s.is_empty())
}

fn get_required<'a>(record: &'a StringRecord, header_map: &HeaderMap, column: &str) -> Result<&'a str, String> {
    get_optional(record, header_map, column).ok_or_else(|| format!("Missing `{column}` value."))
}

fn parse_opt_f64(value: Option<&str>) -> Option<f64> {
    value.and_then(|s| s.parse::<f64>().ok()).filter(|v| v.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_temp(name: &str, contents: &str) -> std::path::PathBuf {
        let dir = std::env::temp_dir().join(format!("agri-credit-ingest-{}-{name}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join(name);
        let mut f = File::create(&path).unwrap();
        f.write_all(contents.as_bytes()).unwrap();
        path
    }

    #[test]
    fn reads_theme_ids_with_spaced_headers() {
        let path = write_temp(
            "themes.csv",
            "\u{feff}id,Loan Theme ID,Loan Theme Type,Partner ID\n\
             638631,a1050000000skGl,General,151\n\
             ,a1050000000skGl,General,151\n\
             638633,,Underserved,9\n",
        );
        let table = read_table(&path, THEME_IDS_FILE, &THEME_ID_COLUMNS, parse_theme_id).unwrap();

        assert_eq!(table.rows_read, 3);
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.row_errors.len(), 1);
        assert_eq!(table.row_errors[0].line, 3);
        assert_eq!(table.rows[0].theme_id.as_deref(), Some("a1050000000skGl"));
        assert_eq!(table.rows[1].theme_id, None);
    }

    #[test]
    fn unparsable_numbers_become_missing() {
        let path = write_temp("mpi.csv", "country,MPI\nKenya,0.2\nPeru,\nMali,n/a\n");
        let table = read_table(&path, MPI_FILE, &MPI_COLUMNS, parse_mpi).unwrap();
        let values: Vec<Option<f64>> = table.rows.iter().map(|r| r.mpi).collect();
        assert_eq!(values, vec![Some(0.2), None, None]);
    }

    #[test]
    fn missing_column_is_a_schema_error() {
        let path = write_temp("region.csv", "country,theme\nKenya,x\n");
        let err = read_table(&path, THEMES_BY_REGION_FILE, &THEME_REGION_COLUMNS, parse_theme_region).unwrap_err();
        assert_eq!(err.exit_code(), 2);
        assert!(err.message().contains("loan theme id"));
    }

    #[test]
    fn missing_file_is_an_input_error() {
        let err = load_kiva_sources(Path::new("/nonexistent/kiva")).unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }
}
