//! Lender knowledge base ingestion.
//!
//! Two tabular inputs feed the knowledge base:
//!
//! - the policy CSV, one row per lender x product, with free-text numeric
//!   cells ("30L", ">=25k", "25L or 10% of EMI"), entity lists, age ranges
//!   and yes/no columns;
//! - the pincode CSV, column-wise: each header is a lender name and each
//!   cell a six-digit pincode.
//!
//! Parsing is tolerant by design: the sheets are maintained by operations
//! people, not engineers. Anything unparseable becomes NULL, never an
//! ingestion failure.

use csv::StringRecord;
use log::{info, warn};
use regex::Regex;
use sqlx::mysql::MySqlPool;
use sqlx::Row;
use std::collections::HashMap;
use std::path::Path;
use std::sync::LazyLock;
use uuid::Uuid;

use crate::error::{ServiceError, ServiceResult};
use shared::dtos::{PincodeIngestStats, PolicyIngestStats};

/// Canonical lender names for the aliases operations teams use in sheets.
static LENDER_NAME_MAP: LazyLock<HashMap<&'static str, &'static str>> = LazyLock::new(|| {
    HashMap::from([
        ("GODREJ", "Godrej"),
        ("LENDINGKART", "Lendingkart"),
        ("FLEXILOANS", "Flexiloans"),
        ("INDIFI", "Indifi"),
        ("PROTIUM", "Protium"),
        ("BAJAJ", "Bajaj"),
        ("BAJAJ RURAL", "Bajaj"),
        ("ARTHMATE", "Arthmate"),
        ("POONAWALA", "Poonawalla"),
        ("POONAWALLA", "Poonawalla"),
        ("KREDIT BEE", "KreditBee"),
        ("KREDITBEE", "KreditBee"),
        ("AMBIT", "Ambit"),
        ("TATA PL", "Tata Capital"),
        ("TATA BL", "Tata Capital"),
        ("TATA CAPITAL", "Tata Capital"),
        ("INCRED", "InCred"),
        ("FIBE", "Fibe"),
        ("IIFL", "IIFL"),
        ("CLIX CAPITAL", "Clix Capital"),
        ("PAYSENSE", "PaySense"),
        ("CREDIT SAISON", "Credit Saison"),
        ("LOAN TAP", "LoanTap"),
        ("LOANTAP", "LoanTap"),
        ("ABFL", "ABFL"),
        ("L&T FINANCE", "L&T Finance"),
        ("OLYV", "Olyv"),
        ("USFB PL", "Unity Small Finance Bank"),
        ("USFB BL", "Unity Small Finance Bank"),
        ("MAS", "MAS Financial"),
        ("TRUCAP", "TruCap"),
        ("TECHFINO", "Techfino"),
        ("NEOGROWTH", "NeoGrowth"),
        ("UGRO", "UGro"),
        ("FT CASH", "FT Cash"),
        ("ICICI", "ICICI"),
        ("CHOLAMANDALAM", "Cholamandalam"),
    ])
});

static LEADING_OPERATORS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[><=]+").expect("invalid operator pattern"));
static FIRST_NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\d.]+").expect("invalid number pattern"));
static FIRST_INTEGER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+").expect("invalid integer pattern"));
static MONTHS_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+)\s*(month|mon|m|yr|year)").expect("invalid months pattern"));
static AGE_RANGE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+)\s*[-to]+\s*(\d+)").expect("invalid age pattern"));
static PINCODE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{6}$").expect("invalid pincode pattern"));

fn is_empty_cell(value: &str) -> bool {
    matches!(value.trim(), "" | "NA" | "N/A" | "-" | "nil")
}

/// Parse a policy-sheet number. `L` marks Lakhs, `K` thousands (converted
/// to Lakhs), comparison operators are stripped, and as a last resort the
/// first numeric token wins.
pub fn parse_float_value(value: &str) -> Option<f64> {
    if is_empty_cell(value) {
        return None;
    }

    let mut value = value.trim().to_uppercase();
    value = LEADING_OPERATORS.replace(&value, "").to_string();

    if value.contains('L') && !value.contains('K') {
        return value.replace('L', "").trim().parse::<f64>().ok();
    }

    if value.contains('K') {
        return value
            .replace('K', "")
            .trim()
            .parse::<f64>()
            .ok()
            .map(|v| v / 100.0);
    }

    if let Ok(parsed) = value.trim().parse::<f64>() {
        return Some(parsed);
    }

    FIRST_NUMBER
        .find(&value)
        .and_then(|m| m.as_str().parse::<f64>().ok())
}

/// Parse an integer cell, stripping operators and taking the first run of
/// digits.
pub fn parse_integer_value(value: &str) -> Option<i32> {
    if is_empty_cell(value) {
        return None;
    }
    let value = LEADING_OPERATORS.replace(value.trim(), "").to_string();
    FIRST_INTEGER
        .find(&value)
        .and_then(|m| m.as_str().parse::<i32>().ok())
}

/// Parse "6 months" / "2 years" style cells into months.
pub fn parse_months(value: &str) -> Option<i32> {
    if is_empty_cell(value) {
        return None;
    }

    let value = value.trim().to_lowercase();
    if let Some(cap) = MONTHS_PATTERN.captures(&value) {
        let num: i32 = cap[1].parse().ok()?;
        return Some(match &cap[2] {
            "yr" | "year" => num * 12,
            _ => num,
        });
    }

    parse_integer_value(&value)
}

/// Parse an age range like "22-65". A lone number becomes a degenerate
/// range (normalized downstream by the eligibility engine).
pub fn parse_age_range(value: &str) -> (Option<i32>, Option<i32>) {
    if is_empty_cell(value) {
        return (None, None);
    }

    if let Some(cap) = AGE_RANGE_PATTERN.captures(value.trim()) {
        let lo: Option<i32> = cap[1].parse().ok();
        let hi: Option<i32> = cap[2].parse().ok();
        return (lo, hi);
    }

    match parse_integer_value(value) {
        Some(num) => (Some(num), Some(num)),
        None => (None, None),
    }
}

/// Parse a comma-separated entity list into canonical slugs.
pub fn parse_entity_types(value: &str) -> Vec<String> {
    if is_empty_cell(value) {
        return Vec::new();
    }

    value
        .split(',')
        .map(|part| part.trim().to_lowercase())
        .filter(|part| !part.is_empty())
        .map(|part| {
            if part.contains("pvt") || part.contains("private") {
                "pvt_ltd".to_string()
            } else if part.contains("llp") {
                "llp".to_string()
            } else if part.contains("proprietor") {
                "proprietorship".to_string()
            } else if part.contains("partner") {
                "partnership".to_string()
            } else if part.contains("opc") {
                "opc".to_string()
            } else if part.contains("trust") {
                "trust".to_string()
            } else if part.contains("society") {
                "society".to_string()
            } else {
                part.replace(' ', "_")
            }
        })
        .collect()
}

/// Yes/Mandatory/Required style cells.
pub fn parse_boolean(value: &str) -> bool {
    matches!(
        value.trim().to_lowercase().as_str(),
        "yes" | "mandatory" | "required" | "true" | "1" | "y"
    )
}

/// Canonicalize a lender name through the alias map; unknown names are
/// title-cased.
pub fn normalize_lender_name(name: &str) -> String {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return String::new();
    }

    let upper = trimmed.to_uppercase();
    if let Some(canonical) = LENDER_NAME_MAP.get(upper.as_str()) {
        return canonical.to_string();
    }

    upper
        .split_whitespace()
        .map(|word| {
            let lower = word.to_lowercase();
            let mut chars = lower.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// A "Policy not available" sentinel anywhere in the row disables the
/// product for scoring.
pub fn check_policy_available(record: &StringRecord) -> bool {
    !record
        .iter()
        .any(|cell| cell.to_lowercase().contains("policy not available"))
}

/// Parsed policy row, ready for upsert.
#[derive(Debug, Clone, Default)]
pub struct ParsedProduct {
    pub lender_name: String,
    pub product_name: String,
    pub program_type: String,
    pub policy_available: bool,
    pub min_vintage_years: Option<f64>,
    pub min_cibil_score: Option<i32>,
    pub min_turnover_annual: Option<f64>,
    pub max_ticket_size: Option<f64>,
    pub min_abb: Option<f64>,
    pub abb_to_emi_ratio: Option<String>,
    pub eligible_entity_types: Vec<String>,
    pub age_min: Option<i32>,
    pub age_max: Option<i32>,
    pub no_30plus_dpd_months: Option<i32>,
    pub no_60plus_dpd_months: Option<i32>,
    pub no_90plus_dpd_months: Option<i32>,
    pub max_enquiries_rule: Option<String>,
    pub emi_bounce_rule: Option<String>,
    pub max_overdue_amount: Option<f64>,
    pub banking_months_required: Option<i32>,
    pub bank_source_type: Option<String>,
    pub ownership_proof_required: bool,
    pub ownership_proof_detail: Option<String>,
    pub gst_required: bool,
    pub gst_detail: Option<String>,
    pub kyc_documents: Option<String>,
    pub tele_pd_required: bool,
    pub video_kyc_required: bool,
    pub fi_required: bool,
    pub fi_detail: Option<String>,
    pub tenor_min_months: Option<i32>,
    pub tenor_max_months: Option<i32>,
}

fn cell<'a>(headers: &StringRecord, record: &'a StringRecord, name: &str) -> &'a str {
    headers
        .iter()
        .position(|h| h.trim() == name)
        .and_then(|index| record.get(index))
        .unwrap_or("")
}

fn text_cell(headers: &StringRecord, record: &StringRecord, name: &str) -> Option<String> {
    let value = cell(headers, record, name).trim();
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

/// Parse one policy CSV row into a `ParsedProduct`.
pub fn parse_policy_row(headers: &StringRecord, record: &StringRecord) -> Option<ParsedProduct> {
    let lender_name = normalize_lender_name(cell(headers, record, "Lender"));
    if lender_name.is_empty() {
        return None;
    }

    let product_name = {
        let raw = cell(headers, record, "Product Program").trim();
        if raw.is_empty() { "BL" } else { raw }.to_string()
    };

    let mut product = ParsedProduct {
        lender_name,
        product_name: product_name.clone(),
        policy_available: check_policy_available(record),
        ..Default::default()
    };

    product.min_vintage_years = parse_float_value(cell(headers, record, "Min. Vintage"));
    product.min_cibil_score = parse_integer_value(cell(headers, record, "Min. Score"));
    product.min_turnover_annual = parse_float_value(cell(headers, record, "Min. Turnover"));
    product.max_ticket_size = parse_float_value(cell(headers, record, "Max Ticket size"));

    // ABB cells may carry a ratio rider: "25L or 10% of EMI".
    let abb_value = cell(headers, record, "ABB").trim().to_string();
    if !is_empty_cell(&abb_value) {
        let lower = abb_value.to_lowercase();
        if lower.contains("or") || lower.contains("ratio") {
            let split: Vec<&str> = abb_value.splitn(2, "or").collect();
            product.min_abb = parse_float_value(split[0]);
            if split.len() > 1 {
                product.abb_to_emi_ratio = Some(split[1].trim().to_string());
            }
        } else {
            product.min_abb = parse_float_value(&abb_value);
        }
    }

    product.eligible_entity_types = parse_entity_types(cell(headers, record, "Entity"));

    let (age_min, age_max) = parse_age_range(cell(headers, record, "Age"));
    product.age_min = age_min;
    product.age_max = age_max;

    product.no_30plus_dpd_months = parse_months(cell(headers, record, "No 30+"));
    product.no_60plus_dpd_months = parse_months(cell(headers, record, "60+"));
    product.no_90plus_dpd_months = parse_months(cell(headers, record, "90+"));

    product.max_enquiries_rule = text_cell(headers, record, "Enquiries");
    product.emi_bounce_rule = text_cell(headers, record, "EMI bounce");
    product.max_overdue_amount = parse_float_value(cell(headers, record, "No Overdues"));

    product.banking_months_required = parse_months(cell(headers, record, "Banking Statement"));
    product.bank_source_type = text_cell(headers, record, "Bank Source");

    product.ownership_proof_required = parse_boolean(cell(headers, record, "Ownership Proof"));
    product.ownership_proof_detail = text_cell(headers, record, "Ownership Proof");
    product.gst_required = parse_boolean(cell(headers, record, "GST"));
    product.gst_detail = text_cell(headers, record, "GST");

    product.tele_pd_required = parse_boolean(cell(headers, record, "Tele PD"));
    product.video_kyc_required = parse_boolean(cell(headers, record, "Video KYC"));
    product.fi_required = parse_boolean(cell(headers, record, "FI"));
    product.fi_detail = text_cell(headers, record, "FI");

    product.kyc_documents = text_cell(headers, record, "KYC Doc");

    product.tenor_min_months = parse_integer_value(cell(headers, record, "Tenor Min"));
    product.tenor_max_months = parse_integer_value(cell(headers, record, "Tenor Max"));

    // Program type is inferred from the product name.
    let product_lower = product_name.to_lowercase();
    product.program_type = if product_lower.contains("digital") || product_lower.contains("banking")
    {
        "banking".to_string()
    } else if product_lower.contains("income") || product_lower.contains("itr") {
        "income".to_string()
    } else {
        "hybrid".to_string()
    };

    Some(product)
}

/// Ingest the lender policy CSV into `lenders` + `lender_products`.
pub async fn ingest_policy_csv(pool: &MySqlPool, csv_path: &Path) -> ServiceResult<PolicyIngestStats> {
    let mut stats = PolicyIngestStats::default();
    let mut reader = csv::Reader::from_path(csv_path)
        .map_err(|e| ServiceError::Validation(format!("cannot open policy CSV: {}", e)))?;
    let headers = reader
        .headers()
        .map_err(|e| ServiceError::Validation(format!("policy CSV has no headers: {}", e)))?
        .clone();

    let mut lender_cache: HashMap<String, String> = HashMap::new();

    for (row_index, record) in reader.records().enumerate() {
        let row_num = row_index + 2; // 1-based, after the header row
        let record = match record {
            Ok(record) => record,
            Err(e) => {
                warn!("Row {}: unreadable record: {}", row_num, e);
                stats.errors += 1;
                continue;
            }
        };

        stats.rows_processed += 1;

        let Some(product) = parse_policy_row(&headers, &record) else {
            warn!("Row {}: missing lender name, skipping", row_num);
            stats.errors += 1;
            continue;
        };

        let lender_id = match get_or_create_lender(pool, &product.lender_name, &mut lender_cache)
            .await
        {
            Ok((id, created)) => {
                if created {
                    stats.lenders_created += 1;
                }
                id
            }
            Err(e) => {
                warn!("Row {}: lender upsert failed: {}", row_num, e);
                stats.errors += 1;
                continue;
            }
        };

        match upsert_lender_product(pool, &lender_id, &product).await {
            Ok(true) => stats.products_created += 1,
            Ok(false) => stats.products_updated += 1,
            Err(e) => {
                warn!("Row {}: product upsert failed: {}", row_num, e);
                stats.errors += 1;
                continue;
            }
        }

        info!(
            "Row {}: processed {} - {}",
            row_num, product.lender_name, product.product_name
        );
    }

    Ok(stats)
}

async fn get_or_create_lender(
    pool: &MySqlPool,
    lender_name: &str,
    cache: &mut HashMap<String, String>,
) -> Result<(String, bool), sqlx::Error> {
    if let Some(id) = cache.get(lender_name) {
        return Ok((id.clone(), false));
    }

    let existing = sqlx::query("SELECT id FROM lenders WHERE lender_name = ?")
        .bind(lender_name)
        .fetch_optional(pool)
        .await?;

    if let Some(row) = existing {
        let id: String = row.get("id");
        cache.insert(lender_name.to_string(), id.clone());
        return Ok((id, false));
    }

    let id = Uuid::new_v4().to_string();
    let lender_code: String = lender_name
        .to_uppercase()
        .replace(' ', "_")
        .chars()
        .take(20)
        .collect();

    sqlx::query("INSERT INTO lenders (id, lender_name, lender_code, is_active) VALUES (?, ?, ?, TRUE)")
        .bind(&id)
        .bind(lender_name)
        .bind(&lender_code)
        .execute(pool)
        .await?;

    info!("Created new lender: {} ({})", lender_name, id);
    cache.insert(lender_name.to_string(), id.clone());
    Ok((id, true))
}

/// Insert or update one product row. Returns true when created.
async fn upsert_lender_product(
    pool: &MySqlPool,
    lender_id: &str,
    product: &ParsedProduct,
) -> Result<bool, sqlx::Error> {
    let entity_types_json = serde_json::to_string(&product.eligible_entity_types)
        .unwrap_or_else(|_| "[]".to_string());

    let existing = sqlx::query("SELECT id FROM lender_products WHERE lender_id = ? AND product_name = ?")
        .bind(lender_id)
        .bind(&product.product_name)
        .fetch_optional(pool)
        .await?;

    if let Some(row) = existing {
        let id: String = row.get("id");
        sqlx::query(
            "UPDATE lender_products SET
                program_type = ?, policy_available = ?, min_vintage_years = ?,
                min_cibil_score = ?, min_turnover_annual = ?, max_ticket_size = ?,
                min_abb = ?, abb_to_emi_ratio = ?, eligible_entity_types = ?,
                age_min = ?, age_max = ?,
                no_30plus_dpd_months = ?, no_60plus_dpd_months = ?, no_90plus_dpd_months = ?,
                max_enquiries_rule = ?, emi_bounce_rule = ?, max_overdue_amount = ?,
                banking_months_required = ?, bank_source_type = ?,
                ownership_proof_required = ?, ownership_proof_detail = ?,
                gst_required = ?, gst_detail = ?, kyc_documents = ?,
                tele_pd_required = ?, video_kyc_required = ?, fi_required = ?, fi_detail = ?,
                tenor_min_months = ?, tenor_max_months = ?
             WHERE id = ?",
        )
        .bind(&product.program_type)
        .bind(product.policy_available)
        .bind(product.min_vintage_years)
        .bind(product.min_cibil_score)
        .bind(product.min_turnover_annual)
        .bind(product.max_ticket_size)
        .bind(product.min_abb)
        .bind(&product.abb_to_emi_ratio)
        .bind(&entity_types_json)
        .bind(product.age_min)
        .bind(product.age_max)
        .bind(product.no_30plus_dpd_months)
        .bind(product.no_60plus_dpd_months)
        .bind(product.no_90plus_dpd_months)
        .bind(&product.max_enquiries_rule)
        .bind(&product.emi_bounce_rule)
        .bind(product.max_overdue_amount)
        .bind(product.banking_months_required)
        .bind(&product.bank_source_type)
        .bind(product.ownership_proof_required)
        .bind(&product.ownership_proof_detail)
        .bind(product.gst_required)
        .bind(&product.gst_detail)
        .bind(&product.kyc_documents)
        .bind(product.tele_pd_required)
        .bind(product.video_kyc_required)
        .bind(product.fi_required)
        .bind(&product.fi_detail)
        .bind(product.tenor_min_months)
        .bind(product.tenor_max_months)
        .bind(&id)
        .execute(pool)
        .await?;
        return Ok(false);
    }

    sqlx::query(
        "INSERT INTO lender_products (
            id, lender_id, product_name, program_type, policy_available,
            min_vintage_years, min_cibil_score, min_turnover_annual, max_ticket_size,
            min_abb, abb_to_emi_ratio, eligible_entity_types, age_min, age_max,
            no_30plus_dpd_months, no_60plus_dpd_months, no_90plus_dpd_months,
            max_enquiries_rule, emi_bounce_rule, max_overdue_amount,
            banking_months_required, bank_source_type,
            ownership_proof_required, ownership_proof_detail, gst_required, gst_detail,
            kyc_documents, tele_pd_required, video_kyc_required, fi_required, fi_detail,
            tenor_min_months, tenor_max_months
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(Uuid::new_v4().to_string())
    .bind(lender_id)
    .bind(&product.product_name)
    .bind(&product.program_type)
    .bind(product.policy_available)
    .bind(product.min_vintage_years)
    .bind(product.min_cibil_score)
    .bind(product.min_turnover_annual)
    .bind(product.max_ticket_size)
    .bind(product.min_abb)
    .bind(&product.abb_to_emi_ratio)
    .bind(&entity_types_json)
    .bind(product.age_min)
    .bind(product.age_max)
    .bind(product.no_30plus_dpd_months)
    .bind(product.no_60plus_dpd_months)
    .bind(product.no_90plus_dpd_months)
    .bind(&product.max_enquiries_rule)
    .bind(&product.emi_bounce_rule)
    .bind(product.max_overdue_amount)
    .bind(product.banking_months_required)
    .bind(&product.bank_source_type)
    .bind(product.ownership_proof_required)
    .bind(&product.ownership_proof_detail)
    .bind(product.gst_required)
    .bind(&product.gst_detail)
    .bind(&product.kyc_documents)
    .bind(product.tele_pd_required)
    .bind(product.video_kyc_required)
    .bind(product.fi_required)
    .bind(&product.fi_detail)
    .bind(product.tenor_min_months)
    .bind(product.tenor_max_months)
    .execute(pool)
    .await?;

    Ok(true)
}

/// Match a pincode CSV column header to a known lender, by containment
/// first and Jaro-Winkler similarity as a fallback.
pub fn match_lender_column<'a>(
    column_name: &str,
    lenders_by_name: &'a HashMap<String, String>,
) -> Option<&'a String> {
    let normalized = normalize_lender_name(column_name).to_uppercase();

    for (db_name, id) in lenders_by_name {
        if db_name.contains(&normalized) || normalized.contains(db_name.as_str()) {
            return Some(id);
        }
    }

    lenders_by_name
        .iter()
        .map(|(db_name, id)| (strsim::jaro_winkler(&normalized, db_name), id))
        .filter(|(similarity, _)| *similarity > 0.85)
        .max_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal))
        .map(|(_, id)| id)
}

/// Ingest the column-wise pincode CSV into `lender_pincodes`.
pub async fn ingest_pincode_csv(
    pool: &MySqlPool,
    csv_path: &Path,
) -> ServiceResult<PincodeIngestStats> {
    let mut stats = PincodeIngestStats::default();
    let mut reader = csv::Reader::from_path(csv_path)
        .map_err(|e| ServiceError::Validation(format!("cannot open pincode CSV: {}", e)))?;
    let headers = reader
        .headers()
        .map_err(|e| ServiceError::Validation(format!("pincode CSV has no headers: {}", e)))?
        .clone();

    let records: Vec<StringRecord> = reader
        .records()
        .filter_map(|record| record.ok())
        .collect();

    let lender_rows = sqlx::query("SELECT id, lender_name FROM lenders")
        .fetch_all(pool)
        .await?;
    let lenders_by_name: HashMap<String, String> = lender_rows
        .iter()
        .map(|row| {
            let name: String = row.get("lender_name");
            let id: String = row.get("id");
            (name.to_uppercase(), id)
        })
        .collect();

    for (column_index, column_header) in headers.iter().enumerate() {
        let column_header = column_header.trim();
        if column_header.is_empty() {
            continue;
        }

        let Some(lender_id) = match_lender_column(column_header, &lenders_by_name) else {
            warn!("Column '{}': no matching lender found", column_header);
            stats.errors += 1;
            continue;
        };
        stats.lenders_mapped += 1;

        let mut inserted = 0i64;
        for record in &records {
            let Some(pincode) = record.get(column_index).map(str::trim) else {
                continue;
            };
            if pincode.is_empty() {
                continue;
            }
            if !PINCODE_PATTERN.is_match(pincode) {
                stats.skipped_non_numeric += 1;
                continue;
            }

            // The unique key on (lender_id, pincode) absorbs duplicates.
            let result = sqlx::query(
                "INSERT IGNORE INTO lender_pincodes (id, lender_id, lender_column_name, pincode)
                 VALUES (?, ?, ?, ?)",
            )
            .bind(Uuid::new_v4().to_string())
            .bind(lender_id)
            .bind(column_header)
            .bind(pincode)
            .execute(pool)
            .await;

            match result {
                Ok(outcome) => inserted += outcome.rows_affected() as i64,
                Err(e) => {
                    warn!("Error inserting pincode {}: {}", pincode, e);
                    stats.errors += 1;
                }
            }
        }

        stats.pincodes_created += inserted;
        info!("Lender column '{}': inserted {} pincodes", column_header, inserted);
    }

    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn float_values_handle_lakh_and_thousand_suffixes() {
        assert_eq!(parse_float_value("30L"), Some(30.0));
        assert_eq!(parse_float_value("3.5L"), Some(3.5));
        assert_eq!(parse_float_value("15K"), Some(0.15));
        assert_eq!(parse_float_value(">=25k"), Some(0.25));
        assert_eq!(parse_float_value("2.5"), Some(2.5));
        assert_eq!(parse_float_value("NA"), None);
        assert_eq!(parse_float_value(""), None);
    }

    #[test]
    fn float_values_extract_first_number_from_free_text() {
        assert_eq!(parse_float_value("700 preferred"), Some(700.0));
    }

    #[test]
    fn integer_values_strip_operators() {
        assert_eq!(parse_integer_value(">=700"), Some(700));
        assert_eq!(parse_integer_value("700+"), Some(700));
        assert_eq!(parse_integer_value("-"), None);
    }

    #[test]
    fn months_parse_units() {
        assert_eq!(parse_months("6 months"), Some(6));
        assert_eq!(parse_months("12 month"), Some(12));
        assert_eq!(parse_months("2 years"), Some(24));
        assert_eq!(parse_months("9"), Some(9));
        assert_eq!(parse_months("NA"), None);
    }

    #[test]
    fn age_ranges_parse_and_degenerate() {
        assert_eq!(parse_age_range("22-65"), (Some(22), Some(65)));
        assert_eq!(parse_age_range("21 to 60"), (Some(21), Some(60)));
        assert_eq!(parse_age_range("60"), (Some(60), Some(60)));
        assert_eq!(parse_age_range(""), (None, None));
    }

    #[test]
    fn entity_lists_normalize_to_slugs() {
        assert_eq!(
            parse_entity_types("Pvt Ltd, LLP"),
            vec!["pvt_ltd".to_string(), "llp".to_string()]
        );
        assert_eq!(
            parse_entity_types("Proprietorship, Partnership"),
            vec!["proprietorship".to_string(), "partnership".to_string()]
        );
        assert_eq!(
            parse_entity_types("Individual Person"),
            vec!["individual_person".to_string()]
        );
    }

    #[test]
    fn lender_aliases_canonicalize() {
        assert_eq!(normalize_lender_name("TATA PL"), "Tata Capital");
        assert_eq!(normalize_lender_name("TATA BL"), "Tata Capital");
        assert_eq!(normalize_lender_name("tata capital"), "Tata Capital");
        assert_eq!(normalize_lender_name("some new nbfc"), "Some New Nbfc");
    }

    #[test]
    fn policy_sentinel_disables_product() {
        let record = StringRecord::from(vec!["Acme", "BL", "Policy not available"]);
        assert!(!check_policy_available(&record));
        let record = StringRecord::from(vec!["Acme", "BL", "700"]);
        assert!(check_policy_available(&record));
    }

    #[test]
    fn policy_row_parses_program_type_and_thresholds() {
        let headers = StringRecord::from(vec![
            "Lender",
            "Product Program",
            "Min. Vintage",
            "Min. Score",
            "Min. Turnover",
            "Max Ticket size",
            "ABB",
            "Entity",
            "Age",
            "GST",
            "Video KYC",
            "Tenor Min",
            "Tenor Max",
        ]);
        let record = StringRecord::from(vec![
            "TATA BL",
            "Digital BL",
            "3",
            ">=700",
            "30L",
            "50L",
            "1L or 10% of EMI",
            "Proprietorship, Pvt Ltd",
            "22-65",
            "Mandatory",
            "Yes",
            "12",
            "48",
        ]);

        let product = parse_policy_row(&headers, &record).unwrap();
        assert_eq!(product.lender_name, "Tata Capital");
        assert_eq!(product.product_name, "Digital BL");
        assert_eq!(product.program_type, "banking");
        assert_eq!(product.min_cibil_score, Some(700));
        assert_eq!(product.min_turnover_annual, Some(30.0));
        assert_eq!(product.max_ticket_size, Some(50.0));
        assert_eq!(product.min_abb, Some(1.0));
        assert_eq!(product.abb_to_emi_ratio.as_deref(), Some("10% of EMI"));
        assert_eq!(
            product.eligible_entity_types,
            vec!["proprietorship".to_string(), "pvt_ltd".to_string()]
        );
        assert_eq!((product.age_min, product.age_max), (Some(22), Some(65)));
        assert!(product.gst_required);
        assert!(product.video_kyc_required);
        assert_eq!(product.tenor_min_months, Some(12));
        assert_eq!(product.tenor_max_months, Some(48));
        assert!(product.policy_available);
    }

    #[test]
    fn empty_product_program_defaults_to_bl_hybrid() {
        let headers = StringRecord::from(vec!["Lender", "Product Program"]);
        let record = StringRecord::from(vec!["IIFL", ""]);
        let product = parse_policy_row(&headers, &record).unwrap();
        assert_eq!(product.product_name, "BL");
        assert_eq!(product.program_type, "hybrid");
    }

    #[test]
    fn column_matching_uses_containment_then_similarity() {
        let lenders = HashMap::from([
            ("TATA CAPITAL".to_string(), "id-1".to_string()),
            ("LENDINGKART".to_string(), "id-2".to_string()),
        ]);
        assert_eq!(
            match_lender_column("Tata", &lenders).map(String::as_str),
            Some("id-1")
        );
        assert_eq!(
            match_lender_column("LENDINGKART LTD", &lenders).map(String::as_str),
            Some("id-2")
        );
        assert_eq!(match_lender_column("Completely Different", &lenders), None);
    }
}
