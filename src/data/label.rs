//! Join, filter and label raw Kiva loans.
//!
//! A loan survives this stage only if it is in the configured sector, has a
//! theme id/type from `loan_theme_ids.csv`, and has every field the model and
//! the label need. The label is `funded_amount / loan_amount >= threshold`.

use std::collections::HashMap;

use crate::io::ingest::{KivaLoanRow, ThemeIdRow};

/// A complete, labeled loan before enrichment.
#[derive(Debug, Clone, PartialEq)]
pub struct LabeledLoan {
    pub loan_amount: f64,
    pub term_in_months: f64,
    pub repayment_interval: String,
    pub borrower_genders: String,
    pub country: String,
    pub activity: String,
    pub region: String,
    pub loan_theme_id: String,
    pub loan_theme_type: String,
    pub funded: bool,
}

/// Row counts at each filter stage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LabelStats {
    pub in_sector: usize,
    pub complete: usize,
}

pub fn label_loans(
    loans: &[KivaLoanRow],
    theme_ids: &[ThemeIdRow],
    sector: &str,
    funded_ratio_threshold: f64,
) -> (Vec<LabeledLoan>, LabelStats) {
    // First occurrence wins if an id is listed twice.
    let mut themes: HashMap<&str, &ThemeIdRow> = HashMap::with_capacity(theme_ids.len());
    for row in theme_ids {
        themes.entry(row.id.as_str()).or_insert(row);
    }

    let mut stats = LabelStats::default();
    let mut out = Vec::new();

    for loan in loans {
        if loan.sector.as_deref() != Some(sector) {
            continue;
        }
        stats.in_sector += 1;

        let theme = themes.get(loan.id.as_str());
        if let Some(labeled) = complete_row(loan, theme.copied(), funded_ratio_threshold) {
            out.push(labeled);
        }
    }

    stats.complete = out.len();
    (out, stats)
}

fn complete_row(loan: &KivaLoanRow, theme: Option<&ThemeIdRow>, threshold: f64) -> Option<LabeledLoan> {
    let theme = theme?;
    let loan_amount = loan.loan_amount.filter(|v| *v > 0.0)?;
    let funded_amount = loan.funded_amount?;

    Some(LabeledLoan {
        loan_amount,
        term_in_months: loan.term_in_months?,
        repayment_interval: loan.repayment_interval.clone()?,
        borrower_genders: loan.borrower_genders.clone()?,
        country: loan.country.clone()?,
        activity: loan.activity.clone()?,
        region: loan.region.clone()?,
        loan_theme_id: theme.theme_id.clone()?,
        loan_theme_type: theme.theme_type.clone()?,
        funded: funded_amount / loan_amount >= threshold,
    })
}
