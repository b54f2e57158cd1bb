use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A normalized bank statement transaction.
///
/// The remote and local parsers emit looser shapes (epoch millis or string
/// dates, string amounts); the analyzer normalizes them into this form
/// before computing metrics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BankTransaction {
    pub transaction_date: NaiveDate,
    pub value_date: NaiveDate,
    pub narration: String,
    pub cheque_ref: String,
    pub withdrawal_amt: f64,
    pub deposit_amt: f64,
    pub closing_balance: Option<f64>,
}

/// Per-month breakdown within a statement window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlySummary {
    /// Month key in `YYYY-MM` form.
    pub month: String,
    pub credits: f64,
    pub debits: f64,
    pub closing_balance: Option<f64>,
    pub bounce_count: i32,
}

/// Aggregate figures reported by the remote statement parser, kept for
/// audit alongside the locally computed metrics.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ParserSummary {
    pub statement_count: i64,
    pub total_input_files: Option<i64>,
    pub total_transactions: i64,
    pub period_start: Option<String>,
    pub period_end: Option<String>,
    pub average_balance: Option<f64>,
    pub credit_transactions_amount: Option<f64>,
    pub debit_transactions_amount: Option<f64>,
    pub emi_count: Option<i64>,
    pub total_emi_amount: Option<f64>,
    pub emi_bounce_count: Option<i64>,
    pub total_emi_bounce_amount: Option<f64>,
}

/// Cash-flow metrics computed from one or more bank statements.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BankAnalysisResult {
    pub bank_detected: Option<String>,
    pub account_number: Option<String>,
    pub transaction_count: i64,
    /// Calendar months spanned by the statement window, floor 1.
    pub statement_period_months: i32,
    /// Average of per-month 5/15/25 checkpoint averages, in rupees.
    pub avg_monthly_balance: Option<f64>,
    pub monthly_credit_avg: Option<f64>,
    pub monthly_debit_avg: Option<f64>,
    /// Latest month's EMI debit total, not an average across months.
    pub emi_outflow_monthly: Option<f64>,
    pub bounce_count_12m: i32,
    pub cash_deposit_ratio: Option<f64>,
    pub peak_balance: Option<f64>,
    pub min_balance: Option<f64>,
    pub total_credits_12m: Option<f64>,
    pub total_debits_12m: Option<f64>,
    pub monthly_summary: Vec<MonthlySummary>,
    /// Data-quality confidence in [0, 1].
    pub confidence: f64,
    /// Which parser produced the transactions (remote, local, timeout).
    pub source: String,
    pub parser_summary: Option<ParserSummary>,
}

impl BankAnalysisResult {
    /// Empty result used when parsing produced nothing or timed out.
    pub fn empty(source: &str) -> Self {
        Self {
            bank_detected: None,
            account_number: None,
            transaction_count: 0,
            statement_period_months: 0,
            avg_monthly_balance: None,
            monthly_credit_avg: None,
            monthly_debit_avg: None,
            emi_outflow_monthly: None,
            bounce_count_12m: 0,
            cash_deposit_ratio: None,
            peak_balance: None,
            min_balance: None,
            total_credits_12m: None,
            total_debits_12m: None,
            monthly_summary: Vec::new(),
            confidence: 0.0,
            source: source.to_string(),
            parser_summary: None,
        }
    }
}
