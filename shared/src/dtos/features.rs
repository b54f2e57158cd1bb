use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::models::enums::EntityType;

/// Number of feature slots counted towards `feature_completeness`.
pub const TOTAL_FEATURE_SLOTS: usize = 21;

/// Canonical borrower profile assembled from extracted fields, bank analysis
/// and manual overrides. Exactly one vector exists per case; only the feature
/// assembler mutates it.
///
/// Unit conventions: `annual_turnover` is in Lakhs; `avg_monthly_balance`,
/// `monthly_credit_avg`, `monthly_turnover`, `emi_outflow_monthly` and
/// `itr_total_income` are in rupees.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BorrowerFeatureVector {
    // Identity
    pub full_name: Option<String>,
    pub pan_number: Option<String>,
    pub aadhaar_number: Option<String>,
    pub dob: Option<NaiveDate>,

    // Business
    pub entity_type: Option<EntityType>,
    pub business_vintage_years: Option<f64>,
    pub gstin: Option<String>,
    pub industry_type: Option<String>,
    pub pincode: Option<String>,

    // Financial
    pub annual_turnover: Option<f64>,
    pub avg_monthly_balance: Option<f64>,
    pub monthly_credit_avg: Option<f64>,
    pub monthly_turnover: Option<f64>,
    pub emi_outflow_monthly: Option<f64>,
    pub bounce_count_12m: Option<i32>,
    pub cash_deposit_ratio: Option<f64>,
    pub itr_total_income: Option<f64>,

    // Credit
    pub cibil_score: Option<i32>,
    pub active_loan_count: Option<i32>,
    pub overdue_count: Option<i32>,
    pub enquiry_count_6m: Option<i32>,

    /// (filled slots / 21) x 100, rounded to two decimals.
    pub feature_completeness: f64,
}

impl BorrowerFeatureVector {
    /// Count of filled feature slots (the completeness numerator).
    pub fn filled_slots(&self) -> usize {
        [
            self.full_name.is_some(),
            self.pan_number.is_some(),
            self.aadhaar_number.is_some(),
            self.dob.is_some(),
            self.entity_type.is_some(),
            self.business_vintage_years.is_some(),
            self.gstin.is_some(),
            self.industry_type.is_some(),
            self.pincode.is_some(),
            self.annual_turnover.is_some(),
            self.avg_monthly_balance.is_some(),
            self.monthly_credit_avg.is_some(),
            self.monthly_turnover.is_some(),
            self.emi_outflow_monthly.is_some(),
            self.bounce_count_12m.is_some(),
            self.cash_deposit_ratio.is_some(),
            self.itr_total_income.is_some(),
            self.cibil_score.is_some(),
            self.active_loan_count.is_some(),
            self.overdue_count.is_some(),
            self.enquiry_count_6m.is_some(),
        ]
        .iter()
        .filter(|filled| **filled)
        .count()
    }

    /// Recompute `feature_completeness` from the current slot fill.
    pub fn recompute_completeness(&mut self) {
        let pct = (self.filled_slots() as f64 / TOTAL_FEATURE_SLOTS as f64) * 100.0;
        self.feature_completeness = (pct * 100.0).round() / 100.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_vector_has_zero_completeness() {
        let mut vector = BorrowerFeatureVector::default();
        vector.recompute_completeness();
        assert_eq!(vector.filled_slots(), 0);
        assert_eq!(vector.feature_completeness, 0.0);
    }

    #[test]
    fn completeness_is_rounded_to_two_decimals() {
        let mut vector = BorrowerFeatureVector {
            cibil_score: Some(720),
            ..Default::default()
        };
        vector.recompute_completeness();
        // 1/21 = 4.7619... -> 4.76
        assert_eq!(vector.feature_completeness, 4.76);
    }

    #[test]
    fn slot_count_matches_declared_total() {
        let full = BorrowerFeatureVector {
            full_name: Some("A".into()),
            pan_number: Some("ABCPE1234F".into()),
            aadhaar_number: Some("123412341234".into()),
            dob: NaiveDate::from_ymd_opt(1990, 1, 1),
            entity_type: Some(EntityType::Proprietorship),
            business_vintage_years: Some(5.0),
            gstin: Some("27AABCU9603R1ZM".into()),
            industry_type: Some("trading".into()),
            pincode: Some("400001".into()),
            annual_turnover: Some(120.0),
            avg_monthly_balance: Some(250_000.0),
            monthly_credit_avg: Some(1_000_000.0),
            monthly_turnover: Some(1_000_000.0),
            emi_outflow_monthly: Some(15_000.0),
            bounce_count_12m: Some(0),
            cash_deposit_ratio: Some(0.1),
            itr_total_income: Some(900_000.0),
            cibil_score: Some(780),
            active_loan_count: Some(1),
            overdue_count: Some(0),
            enquiry_count_6m: Some(2),
            feature_completeness: 0.0,
        };
        assert_eq!(full.filled_slots(), TOTAL_FEATURE_SLOTS);
    }
}
