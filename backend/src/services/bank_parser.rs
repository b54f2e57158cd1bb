//! Bank statement parser integration.
//!
//! The preferred path posts statement PDFs to a remote parsing service that
//! returns `{statements: [{basicInfo, camAnalysisData, grandTotal,
//! transactions}]}`. The local fallback accepts statement exports that
//! already carry the same JSON shape (some banks and aggregators produce
//! them); genuinely binary PDFs without the remote service configured yield
//! an empty parse, which the analyzer reports as a zero-confidence result.

use log::{info, warn};
use serde_json::Value;
use std::time::Duration;

use crate::configuration::BankParserSettings;
use crate::error::{ServiceError, ServiceResult};
use shared::dtos::ParserSummary;

/// Flattened output of a parser run.
#[derive(Debug, Default)]
pub struct ParsedStatements {
    pub transactions: Vec<Value>,
    pub bank_detected: Option<String>,
    pub account_number: Option<String>,
    pub summary: ParserSummary,
}

fn value_to_i64(value: Option<&Value>) -> Option<i64> {
    match value? {
        Value::Number(num) => num.as_i64().or_else(|| num.as_f64().map(|f| f as i64)),
        Value::String(text) => text.replace(',', "").trim().parse::<f64>().ok().map(|f| f as i64),
        _ => None,
    }
}

fn value_to_f64(value: Option<&Value>) -> Option<f64> {
    match value? {
        Value::Number(num) => num.as_f64(),
        Value::String(text) => text.replace(',', "").trim().parse::<f64>().ok(),
        _ => None,
    }
}

fn value_to_string(value: Option<&Value>) -> Option<String> {
    value.and_then(Value::as_str).map(str::to_string)
}

/// Flatten a parser payload into transactions plus the audit summary.
pub fn parse_statements_payload(payload: &Value) -> ParsedStatements {
    let statements = payload
        .get("statements")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();

    let mut parsed = ParsedStatements::default();

    for statement in &statements {
        let Some(statement) = statement.as_object() else {
            continue;
        };

        let basic_info = statement.get("basicInfo").and_then(Value::as_object);
        if parsed.bank_detected.is_none() {
            parsed.bank_detected = value_to_string(statement.get("bank")).or_else(|| {
                basic_info.and_then(|info| value_to_string(info.get("bankName")))
            });
        }
        if parsed.account_number.is_none() {
            parsed.account_number = value_to_string(statement.get("accountNumber")).or_else(|| {
                basic_info.and_then(|info| value_to_string(info.get("accountNumber")))
            });
        }

        if let Some(transactions) = statement.get("transactions").and_then(Value::as_array) {
            parsed.transactions.extend(transactions.iter().cloned());
        }
    }

    let first = statements.first().and_then(Value::as_object);
    let basic_info = first.and_then(|s| s.get("basicInfo")).and_then(Value::as_object);
    let cam = first
        .and_then(|s| s.get("camAnalysisData"))
        .and_then(Value::as_object);
    let grand = first.and_then(|s| s.get("grandTotal")).and_then(Value::as_object);

    parsed.summary = ParserSummary {
        statement_count: statements.len() as i64,
        total_input_files: value_to_i64(payload.get("totalInputFiles")),
        total_transactions: value_to_i64(payload.get("totalTransactions"))
            .unwrap_or(parsed.transactions.len() as i64),
        period_start: basic_info.and_then(|info| value_to_string(info.get("periodStart"))),
        period_end: basic_info.and_then(|info| value_to_string(info.get("periodEnd"))),
        average_balance: cam.and_then(|c| value_to_f64(c.get("averageBalance"))),
        credit_transactions_amount: grand
            .and_then(|g| value_to_f64(g.get("creditTransactionsAmount"))),
        debit_transactions_amount: grand
            .and_then(|g| value_to_f64(g.get("debitTransactionsAmount"))),
        emi_count: grand.and_then(|g| value_to_i64(g.get("noOfEMI"))),
        total_emi_amount: grand.and_then(|g| value_to_f64(g.get("totalEMIAmount"))),
        emi_bounce_count: grand.and_then(|g| value_to_i64(g.get("noOfEMIBounce"))),
        total_emi_bounce_amount: grand.and_then(|g| value_to_f64(g.get("totalEMIBounceAmount"))),
    };

    parsed
}

/// Interpret uploaded statement bytes as a same-shape JSON export, when
/// they are one.
pub fn try_parse_local(files: &[(String, Vec<u8>)]) -> Option<ParsedStatements> {
    let mut combined = ParsedStatements::default();
    let mut parsed_any = false;

    for (filename, bytes) in files {
        let Ok(payload) = serde_json::from_slice::<Value>(bytes) else {
            continue;
        };
        info!("Parsed local statement export: {}", filename);
        let parsed = parse_statements_payload(&payload);
        if combined.bank_detected.is_none() {
            combined.bank_detected = parsed.bank_detected;
        }
        if combined.account_number.is_none() {
            combined.account_number = parsed.account_number;
        }
        combined.summary.statement_count += parsed.summary.statement_count;
        combined.transactions.extend(parsed.transactions);
        parsed_any = true;
    }

    if parsed_any {
        combined.summary.total_transactions = combined.transactions.len() as i64;
        Some(combined)
    } else {
        None
    }
}

pub struct RemoteStatementParser {
    settings: BankParserSettings,
    client: reqwest::Client,
}

impl RemoteStatementParser {
    pub fn new(settings: BankParserSettings) -> Self {
        Self {
            settings,
            client: reqwest::Client::new(),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.settings.url.is_some()
    }

    /// Post PDFs to the remote parser and flatten the response.
    pub async fn parse(&self, files: &[(String, Vec<u8>)]) -> ServiceResult<ParsedStatements> {
        let Some(base_url) = &self.settings.url else {
            return Err(ServiceError::Dependency(
                "remote statement parser not configured".to_string(),
            ));
        };

        // The preview endpoint takes one file per call; send sequentially
        // and merge the statements.
        let mut combined = ParsedStatements::default();

        for (filename, bytes) in files {
            let url = format!("{}/api/preview", base_url.trim_end_matches('/'));
            let response = self
                .client
                .post(&url)
                .header("Content-Type", "application/pdf")
                .header("X-Filename", filename.as_str())
                .timeout(Duration::from_secs(self.settings.timeout_seconds))
                .body(bytes.clone())
                .send()
                .await
                .map_err(|e| ServiceError::Dependency(format!("statement parser: {}", e)))?;

            if !response.status().is_success() {
                warn!(
                    "Statement parser returned {} for {}",
                    response.status(),
                    filename
                );
                continue;
            }

            let payload: Value = response
                .json()
                .await
                .map_err(|e| ServiceError::Dependency(format!("parser payload: {}", e)))?;

            let parsed = parse_statements_payload(&payload);
            if combined.bank_detected.is_none() {
                combined.bank_detected = parsed.bank_detected;
            }
            if combined.account_number.is_none() {
                combined.account_number = parsed.account_number;
            }
            combined.summary.statement_count += parsed.summary.statement_count;
            combined.transactions.extend(parsed.transactions);
        }

        if combined.transactions.is_empty() {
            return Err(ServiceError::Dependency(
                "statement parser returned no transactions".to_string(),
            ));
        }

        combined.summary.total_transactions = combined.transactions.len() as i64;
        Ok(combined)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_payload() -> Value {
        json!({
            "totalInputFiles": 1,
            "totalTransactions": 2,
            "statements": [{
                "bank": "HDFC",
                "accountNumber": "50100123456",
                "basicInfo": {"bankName": "HDFC Bank", "periodStart": "01/01/2024", "periodEnd": "31/12/2024"},
                "camAnalysisData": {"averageBalance": 185000.5},
                "grandTotal": {
                    "creditTransactionsAmount": "9,600,000",
                    "debitTransactionsAmount": 9100000,
                    "noOfEMI": 12,
                    "totalEMIAmount": 180000
                },
                "transactions": [
                    {"transactionDate": "05/01/2024", "narration": "NEFT", "depositAmt": 1000, "closingBalance": 2000},
                    {"transactionDate": "06/01/2024", "narration": "EMI", "withdrawalAmt": 500, "closingBalance": 1500}
                ]
            }]
        })
    }

    #[test]
    fn payload_flattens_transactions_and_summary() {
        let parsed = parse_statements_payload(&sample_payload());
        assert_eq!(parsed.transactions.len(), 2);
        assert_eq!(parsed.bank_detected.as_deref(), Some("HDFC"));
        assert_eq!(parsed.account_number.as_deref(), Some("50100123456"));
        assert_eq!(parsed.summary.statement_count, 1);
        assert_eq!(parsed.summary.total_transactions, 2);
        assert_eq!(parsed.summary.average_balance, Some(185000.5));
        assert_eq!(parsed.summary.credit_transactions_amount, Some(9_600_000.0));
        assert_eq!(parsed.summary.emi_count, Some(12));
        assert_eq!(parsed.summary.period_start.as_deref(), Some("01/01/2024"));
    }

    #[test]
    fn local_fallback_accepts_json_exports_only() {
        let json_bytes = serde_json::to_vec(&sample_payload()).unwrap();
        let files = vec![
            ("export.json".to_string(), json_bytes),
            ("scan.pdf".to_string(), b"%PDF-1.4 binary".to_vec()),
        ];
        let parsed = try_parse_local(&files).unwrap();
        assert_eq!(parsed.transactions.len(), 2);

        let only_pdf = vec![("scan.pdf".to_string(), b"%PDF-1.4 binary".to_vec())];
        assert!(try_parse_local(&only_pdf).is_none());
    }

    #[test]
    fn missing_sections_default_cleanly() {
        let parsed = parse_statements_payload(&json!({"statements": []}));
        assert!(parsed.transactions.is_empty());
        assert_eq!(parsed.summary.statement_count, 0);
        assert!(parsed.bank_detected.is_none());
    }
}
