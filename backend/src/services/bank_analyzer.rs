//! Bank statement analytics.
//!
//! Consumes parsed statement transactions (remote or local parser, both
//! normalized here) and computes the cash-flow metrics used by feature
//! assembly and eligibility scoring: checkpoint average balance, monthly
//! credit/debit averages, current EMI obligation, bounce count, cash deposit
//! ratio, balance extremes and a per-month summary.

use chrono::{DateTime, Datelike, NaiveDate};
use serde_json::Value;
use std::collections::BTreeMap;

use shared::dtos::{
    BankAnalysisResult, BankTransaction, ExtractedFieldItem, MonthlySummary, ParserSummary,
};

/// Narration markers for EMI/obligation debits.
const EMI_KEYWORDS: &[&str] = &[
    "EMI",
    "LOAN",
    "NACH",
    "ECS",
    "SI-",
    "MANDATE",
    "BAJAJ",
    "HDFC LOAN",
    "TATA CAPITAL",
    "ICICI LOAN",
    "HOME LOAN",
    "CAR LOAN",
    "PERSONAL LOAN",
    "AUTO DEBIT",
    "STANDING INSTRUCTION",
];

/// Narration markers for bounced/returned debits.
const BOUNCE_KEYWORDS: &[&str] = &[
    "BOUNCE",
    "RETURN",
    "DISHON",
    "INSUFFICIENT",
    "UNPAID",
    "REJECT",
    "INWARD RETURN",
    "CHQ RETURN",
    "ECS RETURN",
    "NACH RETURN",
    "FAILED",
    "REVERSED",
];

const CASH_DEPOSIT_KEYWORDS: &[&str] =
    &["CASH DEP", "BY CASH", "CASH DEPOSIT", "CASH CR", "CASH CREDIT"];

/// "CASH CREDIT A/C" is an account type, not a cash deposit.
const CASH_DEPOSIT_EXCLUDE: &[&str] = &["CASH CREDIT A/C", "CC A/C", "CC ACCOUNT"];

/// Balance checkpoint days for the average-balance method.
const CHECKPOINT_DAYS: [u32; 3] = [5, 15, 25];

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}

fn month_key(date: NaiveDate) -> String {
    format!("{:04}-{:02}", date.year(), date.month())
}

/// Convert a parser date value to a `NaiveDate`.
///
/// Accepts epoch milliseconds (anything above 10^10), epoch seconds, and the
/// date string formats the parsers are known to emit.
pub fn coerce_to_date(value: &Value) -> Option<NaiveDate> {
    match value {
        Value::Number(num) => {
            let mut raw = num.as_f64()?;
            if raw <= 0.0 {
                return None;
            }
            // Epoch milliseconds when the magnitude says so.
            if raw > 10_000_000_000.0 {
                raw /= 1000.0;
            }
            DateTime::from_timestamp(raw as i64, 0).map(|dt| dt.date_naive())
        }
        Value::String(text) => {
            let text = text.trim();
            if text.is_empty() {
                return None;
            }
            if text.chars().all(|c| c.is_ascii_digit()) {
                return coerce_to_date(&Value::Number(text.parse::<i64>().ok()?.into()));
            }
            for format in ["%d/%m/%Y", "%d-%m-%Y", "%Y-%m-%d", "%Y/%m/%d", "%d %b %Y", "%d %B %Y"]
            {
                if let Ok(date) = NaiveDate::parse_from_str(text, format) {
                    return Some(date);
                }
            }
            // Last resort: ISO datetime strings.
            DateTime::parse_from_rfc3339(&text.replace(' ', "T"))
                .ok()
                .map(|dt| dt.date_naive())
        }
        _ => None,
    }
}

/// Convert a parser amount value to f64, treating absent/garbage as 0.
pub fn to_amount(value: &Value) -> f64 {
    match value {
        Value::Number(num) => num.as_f64().unwrap_or(0.0),
        Value::String(text) => text.replace(',', "").trim().parse::<f64>().unwrap_or(0.0),
        _ => 0.0,
    }
}

/// Convert a parser amount value to f64 preserving absence.
pub fn to_optional_amount(value: &Value) -> Option<f64> {
    match value {
        Value::Null => None,
        Value::String(text) if text.trim().is_empty() => None,
        other => Some(to_amount(other)),
    }
}

/// Normalize raw parser transaction objects into `BankTransaction`s.
/// Rows without a resolvable transaction date are dropped.
pub fn normalize_transactions(raw_transactions: &[Value]) -> Vec<BankTransaction> {
    let mut normalized = Vec::new();

    for raw in raw_transactions {
        let Some(object) = raw.as_object() else {
            continue;
        };

        let transaction_date = object
            .get("transactionDate")
            .and_then(coerce_to_date)
            .or_else(|| object.get("valueDate").and_then(coerce_to_date));
        let Some(transaction_date) = transaction_date else {
            continue;
        };

        let value_date = object
            .get("valueDate")
            .and_then(coerce_to_date)
            .unwrap_or(transaction_date);

        let narration = object
            .get("narration")
            .and_then(Value::as_str)
            .unwrap_or("")
            .trim()
            .to_string();
        let cheque_ref = object
            .get("chequeRefNo")
            .or_else(|| object.get("cheque"))
            .and_then(Value::as_str)
            .unwrap_or("")
            .trim()
            .to_string();

        normalized.push(BankTransaction {
            transaction_date,
            value_date,
            narration,
            cheque_ref,
            withdrawal_amt: object.get("withdrawalAmt").map(to_amount).unwrap_or(0.0),
            deposit_amt: object.get("depositAmt").map(to_amount).unwrap_or(0.0),
            closing_balance: object
                .get("closingBalance")
                .and_then(to_optional_amount),
        });
    }

    normalized
}

/// Calendar months between two dates, inclusive of both ends, floor 1.
pub fn months_between(start: NaiveDate, end: NaiveDate) -> i32 {
    let months =
        (end.year() - start.year()) * 12 + end.month() as i32 - start.month() as i32;
    (months + 1).max(1)
}

/// Compute all metrics from normalized transactions.
///
/// Transactions are sorted by date internally; callers may pass them in any
/// order.
pub fn analyze_transactions(
    mut transactions: Vec<BankTransaction>,
    bank_detected: Option<String>,
    account_number: Option<String>,
    source: &str,
    parser_summary: Option<ParserSummary>,
) -> BankAnalysisResult {
    if transactions.is_empty() {
        let mut empty = BankAnalysisResult::empty(source);
        empty.bank_detected = bank_detected;
        empty.account_number = account_number;
        empty.parser_summary = parser_summary;
        return empty;
    }

    transactions.sort_by_key(|t| t.transaction_date);

    let start = transactions.first().map(|t| t.transaction_date).unwrap();
    let end = transactions.last().map(|t| t.transaction_date).unwrap();
    let statement_period_months = months_between(start, end);

    let result = BankAnalysisResult {
        bank_detected,
        account_number,
        transaction_count: transactions.len() as i64,
        statement_period_months,
        avg_monthly_balance: compute_avg_monthly_balance(&transactions),
        monthly_credit_avg: compute_monthly_credit_avg(&transactions),
        monthly_debit_avg: compute_monthly_debit_avg(&transactions),
        emi_outflow_monthly: compute_emi_outflow(&transactions),
        bounce_count_12m: compute_bounce_count(&transactions),
        cash_deposit_ratio: compute_cash_deposit_ratio(&transactions),
        peak_balance: closing_balances(&transactions)
            .into_iter()
            .fold(None, |max: Option<f64>, b| Some(max.map_or(b, |m| m.max(b)))),
        min_balance: closing_balances(&transactions)
            .into_iter()
            .fold(None, |min: Option<f64>, b| Some(min.map_or(b, |m| m.min(b)))),
        total_credits_12m: Some(round2(transactions.iter().map(|t| t.deposit_amt).sum())),
        total_debits_12m: Some(round2(transactions.iter().map(|t| t.withdrawal_amt).sum())),
        monthly_summary: compute_monthly_summary(&transactions),
        confidence: calculate_confidence(&transactions, statement_period_months),
        source: source.to_string(),
        parser_summary,
    };

    result
}

fn closing_balances(transactions: &[BankTransaction]) -> Vec<f64> {
    transactions
        .iter()
        .filter_map(|t| t.closing_balance)
        .collect()
}

/// Average monthly balance via the 5/15/25 checkpoint method.
///
/// For each month, take the closing balance of the latest transaction on or
/// before each checkpoint day (or the month's first known balance when
/// nothing precedes the checkpoint), average the three, then average the
/// monthly figures across the window.
fn compute_avg_monthly_balance(transactions: &[BankTransaction]) -> Option<f64> {
    let mut monthly_entries: BTreeMap<String, Vec<(NaiveDate, f64)>> = BTreeMap::new();

    for txn in transactions {
        if let Some(balance) = txn.closing_balance {
            monthly_entries
                .entry(month_key(txn.transaction_date))
                .or_default()
                .push((txn.transaction_date, balance));
        }
    }

    if monthly_entries.is_empty() {
        return None;
    }

    let mut monthly_averages = Vec::new();
    for entries in monthly_entries.values_mut() {
        entries.sort_by_key(|(date, _)| *date);

        let mut checkpoint_values = Vec::with_capacity(CHECKPOINT_DAYS.len());
        for day in CHECKPOINT_DAYS {
            let prior_or_same = entries
                .iter()
                .rev()
                .find(|(date, _)| date.day() <= day)
                .map(|(_, balance)| *balance);
            // No balance before the checkpoint: fall back to the month's
            // first known balance.
            checkpoint_values.push(prior_or_same.unwrap_or(entries[0].1));
        }

        monthly_averages
            .push(checkpoint_values.iter().sum::<f64>() / checkpoint_values.len() as f64);
    }

    Some(round2(
        monthly_averages.iter().sum::<f64>() / monthly_averages.len() as f64,
    ))
}

fn compute_monthly_credit_avg(transactions: &[BankTransaction]) -> Option<f64> {
    if transactions.is_empty() {
        return None;
    }

    let mut monthly: BTreeMap<String, f64> = BTreeMap::new();
    for txn in transactions {
        *monthly.entry(month_key(txn.transaction_date)).or_default() += txn.deposit_amt;
    }

    let total: f64 = monthly.values().sum();
    Some(round2(total / monthly.len() as f64))
}

fn compute_monthly_debit_avg(transactions: &[BankTransaction]) -> Option<f64> {
    if transactions.is_empty() {
        return None;
    }

    let mut monthly: BTreeMap<String, f64> = BTreeMap::new();
    for txn in transactions {
        *monthly.entry(month_key(txn.transaction_date)).or_default() += txn.withdrawal_amt;
    }

    let total: f64 = monthly.values().sum();
    Some(round2(total / monthly.len() as f64))
}

fn is_emi_narration(narration_upper: &str) -> bool {
    EMI_KEYWORDS.iter().any(|kw| narration_upper.contains(kw))
}

fn is_bounce_narration(narration_upper: &str) -> bool {
    BOUNCE_KEYWORDS.iter().any(|kw| narration_upper.contains(kw))
}

/// Current monthly EMI obligation: sum flagged EMI debits per month and
/// return the latest month's total. The latest month, not the average,
/// reflects obligations on loans taken recently.
fn compute_emi_outflow(transactions: &[BankTransaction]) -> Option<f64> {
    if transactions.is_empty() {
        return None;
    }

    let mut monthly_emi: BTreeMap<String, f64> = BTreeMap::new();
    for txn in transactions {
        if txn.withdrawal_amt <= 0.0 {
            continue;
        }
        let narration = txn.narration.to_uppercase();
        if is_emi_narration(&narration) {
            *monthly_emi
                .entry(month_key(txn.transaction_date))
                .or_default() += txn.withdrawal_amt;
        }
    }

    match monthly_emi.iter().next_back() {
        Some((_, latest_total)) => Some(round2(*latest_total)),
        None => Some(0.0),
    }
}

/// Bounced transactions across the window. Counted when the narration
/// carries a bounce keyword and the row is either a debit (return charges)
/// or explicitly says RETURN/BOUNCE.
fn compute_bounce_count(transactions: &[BankTransaction]) -> i32 {
    let mut count = 0;
    for txn in transactions {
        let narration = txn.narration.to_uppercase();
        if is_bounce_narration(&narration)
            && (txn.withdrawal_amt > 0.0
                || narration.contains("RETURN")
                || narration.contains("BOUNCE"))
        {
            count += 1;
        }
    }
    count
}

/// Share of total credits that arrived as cash deposits, excluding
/// cash-credit-account narrations.
fn compute_cash_deposit_ratio(transactions: &[BankTransaction]) -> Option<f64> {
    let mut total_credits = 0.0;
    let mut cash_deposits = 0.0;

    for txn in transactions {
        if txn.deposit_amt <= 0.0 {
            continue;
        }
        total_credits += txn.deposit_amt;

        let narration = txn.narration.to_uppercase();
        let is_cash = CASH_DEPOSIT_KEYWORDS.iter().any(|kw| narration.contains(kw));
        let is_excluded = CASH_DEPOSIT_EXCLUDE.iter().any(|kw| narration.contains(kw));
        if is_cash && !is_excluded {
            cash_deposits += txn.deposit_amt;
        }
    }

    if total_credits == 0.0 {
        return None;
    }
    Some(round4(cash_deposits / total_credits))
}

fn compute_monthly_summary(transactions: &[BankTransaction]) -> Vec<MonthlySummary> {
    let mut monthly: BTreeMap<String, MonthlySummary> = BTreeMap::new();

    for txn in transactions {
        let key = month_key(txn.transaction_date);
        let entry = monthly.entry(key.clone()).or_insert_with(|| MonthlySummary {
            month: key,
            credits: 0.0,
            debits: 0.0,
            closing_balance: None,
            bounce_count: 0,
        });

        entry.credits += txn.deposit_amt;
        entry.debits += txn.withdrawal_amt;
        // Transactions arrive date-sorted, so the last write is the month's
        // final known balance.
        entry.closing_balance = txn.closing_balance;

        if is_bounce_narration(&txn.narration.to_uppercase()) {
            entry.bounce_count += 1;
        }
    }

    monthly
        .into_values()
        .map(|mut summary| {
            summary.credits = round2(summary.credits);
            summary.debits = round2(summary.debits);
            summary
        })
        .collect()
}

/// Data-quality confidence: transaction volume (30 pts, saturating at 100
/// transactions), window length vs an ideal 12 months (30 pts), and field
/// completeness (40 pts), scaled to [0, 1].
fn calculate_confidence(transactions: &[BankTransaction], period_months: i32) -> f64 {
    if transactions.is_empty() {
        return 0.0;
    }

    let txn_score = (transactions.len() as f64 / 100.0 * 30.0).min(30.0);
    let period_score = (period_months as f64 / 12.0 * 30.0).min(30.0);

    let complete = transactions
        .iter()
        .filter(|t| t.closing_balance.is_some() && (t.deposit_amt > 0.0 || t.withdrawal_amt > 0.0))
        .count();
    let completeness_score = complete as f64 / transactions.len() as f64 * 40.0;

    round2((txn_score + period_score + completeness_score) / 100.0)
}

/// Project the analysis into extracted-field rows tagged `bank_analysis`.
///
/// `monthly_turnover` mirrors the monthly credit average in rupees;
/// `annual_turnover` is derived in Lakhs (x12 / 100000).
pub fn analysis_to_fields(result: &BankAnalysisResult) -> Vec<ExtractedFieldItem> {
    let mut fields = Vec::new();
    if result.transaction_count == 0 {
        return fields;
    }
    let confidence = result.confidence.max(0.5);

    if let Some(abb) = result.avg_monthly_balance {
        fields.push(ExtractedFieldItem::from_bank_analysis(
            "avg_monthly_balance",
            format!("{:.2}", abb),
            confidence,
        ));
    }
    if let Some(credit_avg) = result.monthly_credit_avg {
        fields.push(ExtractedFieldItem::from_bank_analysis(
            "monthly_credit_avg",
            format!("{:.2}", credit_avg),
            confidence,
        ));
        fields.push(ExtractedFieldItem::from_bank_analysis(
            "monthly_turnover",
            format!("{:.2}", credit_avg),
            confidence,
        ));
        fields.push(ExtractedFieldItem::from_bank_analysis(
            "annual_turnover",
            format!("{:.2}", round2(credit_avg * 12.0 / 100_000.0)),
            confidence,
        ));
    }
    if let Some(emi) = result.emi_outflow_monthly {
        fields.push(ExtractedFieldItem::from_bank_analysis(
            "emi_outflow_monthly",
            format!("{:.2}", emi),
            confidence,
        ));
    }
    fields.push(ExtractedFieldItem::from_bank_analysis(
        "bounce_count_12m",
        result.bounce_count_12m.to_string(),
        confidence,
    ));
    if let Some(ratio) = result.cash_deposit_ratio {
        fields.push(ExtractedFieldItem::from_bank_analysis(
            "cash_deposit_ratio",
            format!("{:.4}", ratio),
            confidence,
        ));
    }

    fields
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn txn(date: (i32, u32, u32), narration: &str, withdrawal: f64, deposit: f64, balance: f64) -> BankTransaction {
        let date = NaiveDate::from_ymd_opt(date.0, date.1, date.2).unwrap();
        BankTransaction {
            transaction_date: date,
            value_date: date,
            narration: narration.to_string(),
            cheque_ref: String::new(),
            withdrawal_amt: withdrawal,
            deposit_amt: deposit,
            closing_balance: Some(balance),
        }
    }

    #[test]
    fn months_between_is_inclusive_with_floor_one() {
        let jan = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap();
        let dec = NaiveDate::from_ymd_opt(2024, 12, 2).unwrap();
        assert_eq!(months_between(jan, dec), 12);
        assert_eq!(months_between(jan, jan), 1);

        let dec23 = NaiveDate::from_ymd_opt(2023, 12, 30).unwrap();
        let jan24 = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
        assert_eq!(months_between(dec23, jan24), 2);
    }

    #[test]
    fn epoch_millis_and_ddmmyyyy_dates_normalize() {
        // 2024-03-15T00:00:00Z in milliseconds.
        let millis = json!({"transactionDate": 1710460800000_i64, "narration": "X",
                            "depositAmt": 100, "closingBalance": 500});
        let string = json!({"transactionDate": "15/03/2024", "narration": "Y",
                            "withdrawalAmt": "1,250.50", "closingBalance": null});
        let undated = json!({"narration": "no date"});

        let normalized = normalize_transactions(&[millis, string, undated]);
        assert_eq!(normalized.len(), 2);
        assert_eq!(
            normalized[0].transaction_date,
            NaiveDate::from_ymd_opt(2024, 3, 15).unwrap()
        );
        assert_eq!(normalized[1].transaction_date, normalized[0].transaction_date);
        assert_eq!(normalized[1].withdrawal_amt, 1250.50);
        assert_eq!(normalized[1].closing_balance, None);
    }

    #[test]
    fn checkpoint_average_balance_uses_5_15_25() {
        // One month. Balances: day 3 -> 100, day 10 -> 200, day 20 -> 300,
        // day 28 -> 400. Checkpoints: day 5 -> 100, day 15 -> 200,
        // day 25 -> 300. Monthly average = 200.
        let transactions = vec![
            txn((2024, 6, 3), "A", 0.0, 10.0, 100.0),
            txn((2024, 6, 10), "B", 0.0, 10.0, 200.0),
            txn((2024, 6, 20), "C", 0.0, 10.0, 300.0),
            txn((2024, 6, 28), "D", 0.0, 10.0, 400.0),
        ];
        assert_eq!(compute_avg_monthly_balance(&transactions), Some(200.0));
    }

    #[test]
    fn checkpoint_falls_back_to_first_balance_of_month() {
        // First transaction lands on day 10; the day-5 checkpoint takes the
        // first available balance instead.
        let transactions = vec![
            txn((2024, 6, 10), "A", 0.0, 10.0, 150.0),
            txn((2024, 6, 22), "B", 0.0, 10.0, 300.0),
        ];
        // day5 -> 150 (fallback), day15 -> 150, day25 -> 300 => 200
        assert_eq!(compute_avg_monthly_balance(&transactions), Some(200.0));
    }

    #[test]
    fn emi_outflow_takes_latest_month_not_average() {
        let mut transactions = Vec::new();
        // Jan..Nov: one 10k EMI each; Dec: two EMI debits of 15k.
        for month in 1..=11 {
            transactions.push(txn((2024, month, 5), "ACME LOAN EMI", 10_000.0, 0.0, 1000.0));
        }
        transactions.push(txn((2024, 12, 5), "NACH MANDATE EMI", 15_000.0, 0.0, 1000.0));
        transactions.push(txn((2024, 12, 7), "BAJAJ FINANCE EMI", 15_000.0, 0.0, 1000.0));

        assert_eq!(compute_emi_outflow(&transactions), Some(30_000.0));
    }

    #[test]
    fn emi_credit_rows_are_ignored() {
        let transactions = vec![txn((2024, 1, 5), "LOAN DISBURSAL", 0.0, 500_000.0, 500_000.0)];
        assert_eq!(compute_emi_outflow(&transactions), Some(0.0));
    }

    #[test]
    fn bounce_count_requires_debit_or_explicit_marker() {
        let transactions = vec![
            txn((2024, 2, 1), "CHQ RETURN CHARGES", 500.0, 0.0, 900.0),
            txn((2024, 3, 1), "ECS RETURN", 0.0, 0.0, 900.0),
            // Keyword without debit or RETURN/BOUNCE text does not count.
            txn((2024, 4, 1), "TXN FAILED", 0.0, 0.0, 900.0),
        ];
        assert_eq!(compute_bounce_count(&transactions), 2);
    }

    #[test]
    fn cash_ratio_excludes_cash_credit_accounts() {
        let transactions = vec![
            txn((2024, 1, 2), "CASH DEPOSIT BRANCH", 0.0, 2_000.0, 0.0),
            txn((2024, 1, 3), "NEFT FROM CUSTOMER", 0.0, 6_000.0, 0.0),
            txn((2024, 1, 4), "TRF FROM CASH CREDIT A/C", 0.0, 2_000.0, 0.0),
        ];
        // 2000 cash out of 10000 total; the CC account transfer is excluded
        // from the numerator but stays in the denominator.
        assert_eq!(compute_cash_deposit_ratio(&transactions), Some(0.2));
    }

    #[test]
    fn confidence_blends_volume_period_and_completeness() {
        // 100+ complete transactions over 12 months maxes out at 1.0.
        let mut transactions = Vec::new();
        for i in 0..120 {
            let month = (i % 12) + 1;
            let day = (i % 28) + 1;
            transactions.push(txn((2024, month, day), "TXN", 10.0, 0.0, 100.0));
        }
        let result = analyze_transactions(transactions, None, None, "local_parser", None);
        assert_eq!(result.confidence, 1.0);
        assert_eq!(result.statement_period_months, 12);
    }

    #[test]
    fn empty_transactions_produce_zero_confidence_result() {
        let result = analyze_transactions(Vec::new(), None, None, "credilo_remote", None);
        assert_eq!(result.transaction_count, 0);
        assert_eq!(result.confidence, 0.0);
        assert_eq!(result.source, "credilo_remote");
    }

    #[test]
    fn full_year_aggregation_scenario() {
        let mut transactions = Vec::new();
        // 240 transactions Jan-Dec: per month, 10 customer credits of 78k
        // (2 of which are cash deposits of ~22% of the month's credits),
        // 9 vendor debits, one EMI debit of 15000.
        for month in 1..=12u32 {
            for i in 0..8 {
                transactions.push(txn(
                    (2024, month, 2 + i),
                    "NEFT CUSTOMER PAYMENT",
                    0.0,
                    78_000.0,
                    200_000.0,
                ));
            }
            for i in 0..2 {
                transactions.push(txn(
                    (2024, month, 12 + i),
                    "CASH DEPOSIT COUNTER",
                    0.0,
                    88_000.0,
                    220_000.0,
                ));
            }
            for i in 0..9 {
                transactions.push(txn(
                    (2024, month, 14 + i),
                    "VENDOR PAYMENT",
                    60_000.0,
                    0.0,
                    180_000.0,
                ));
            }
            transactions.push(txn(
                (2024, month, 25),
                "HDFC LOAN EMI NACH",
                15_000.0,
                0.0,
                160_000.0,
            ));
        }
        // Two bounce rows in the year.
        transactions.push(txn((2024, 5, 9), "CHQ RETURN INSUFFICIENT FUNDS", 450.0, 0.0, 150_000.0));
        transactions.push(txn((2024, 9, 9), "NACH RETURN CHARGES", 450.0, 0.0, 150_000.0));

        let result = analyze_transactions(transactions, Some("HDFC".into()), None, "local_parser", None);

        assert_eq!(result.statement_period_months, 12);
        assert_eq!(result.emi_outflow_monthly, Some(15_000.0));
        assert_eq!(result.bounce_count_12m, 2);

        let ratio = result.cash_deposit_ratio.unwrap();
        // 176k cash of 800k monthly credits = 22%.
        assert!(ratio > 0.21 && ratio < 0.23, "ratio = {}", ratio);

        assert!(result.avg_monthly_balance.is_some());
        assert_eq!(result.monthly_summary.len(), 12);

        let fields = analysis_to_fields(&result);
        let annual = fields
            .iter()
            .find(|f| f.field_name == "annual_turnover")
            .unwrap();
        // monthly credit avg 800_600-ish rupees -> lakhs conversion.
        let annual_value: f64 = annual.field_value.parse().unwrap();
        assert!(annual_value > 90.0 && annual_value < 100.0);
    }
}
