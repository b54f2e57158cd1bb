//! Case id allocation.
//!
//! Case ids are human-readable: `CASE-YYYYMMDD-NNNN`, where the date is the
//! UTC creation day and NNNN a same-day sequence starting at 0001. The
//! unique constraint on `cases.case_id` is the arbiter under concurrency:
//! creators compute a candidate from the current count and retry on
//! conflict.

use chrono::NaiveDate;
use regex::Regex;
use sqlx::mysql::MySqlPool;
use sqlx::Row;
use std::sync::LazyLock;

static CASE_ID_FORMAT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^CASE-\d{8}-\d{4}$").expect("invalid case id pattern"));

/// Attempts before giving up on a same-day sequence slot.
pub const MAX_ALLOCATION_ATTEMPTS: u32 = 5;

pub fn is_valid_case_id(case_id: &str) -> bool {
    CASE_ID_FORMAT.is_match(case_id)
}

/// Render a case id for a given day and 1-based sequence number.
pub fn format_case_id(date: NaiveDate, sequence: u32) -> String {
    format!("CASE-{}-{:04}", date.format("%Y%m%d"), sequence)
}

/// Next candidate id for `date`: count of existing same-day cases plus one.
/// Callers must treat a duplicate-key error on insert as "retry with the
/// next sequence".
pub async fn next_case_id(pool: &MySqlPool, date: NaiveDate) -> Result<String, sqlx::Error> {
    let prefix = format!("CASE-{}-%", date.format("%Y%m%d"));
    let row = sqlx::query("SELECT COUNT(*) AS count FROM cases WHERE case_id LIKE ?")
        .bind(&prefix)
        .fetch_one(pool)
        .await?;
    let count: i64 = row.get("count");
    Ok(format_case_id(date, count as u32 + 1))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_pads_sequence_to_four_digits() {
        let date = NaiveDate::from_ymd_opt(2025, 6, 1).unwrap();
        assert_eq!(format_case_id(date, 1), "CASE-20250601-0001");
        assert_eq!(format_case_id(date, 42), "CASE-20250601-0042");
        assert_eq!(format_case_id(date, 1234), "CASE-20250601-1234");
    }

    #[test]
    fn validation_matches_the_documented_format() {
        assert!(is_valid_case_id("CASE-20250601-0001"));
        assert!(!is_valid_case_id("CASE-2025061-0001"));
        assert!(!is_valid_case_id("CASE-20250601-001"));
        assert!(!is_valid_case_id("case-20250601-0001"));
        assert!(!is_valid_case_id("CASE-20250601-0001X"));
    }

    #[test]
    fn sequence_restarts_across_day_boundaries() {
        // The sequence derives from the per-day prefix count, so a new UTC
        // day starts back at 0001 regardless of yesterday's volume.
        let yesterday = NaiveDate::from_ymd_opt(2025, 5, 31).unwrap();
        let today = NaiveDate::from_ymd_opt(2025, 6, 1).unwrap();
        assert_eq!(format_case_id(yesterday, 873), "CASE-20250531-0873");
        assert_eq!(format_case_id(today, 1), "CASE-20250601-0001");
    }
}
