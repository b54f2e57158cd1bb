//! GST authority client.
//!
//! Looks up company details for a GSTIN and provides the GSTIN extraction
//! helpers used during document processing. Lookups are idempotent per
//! (case, GSTIN): the processor checks the case's cached payload before
//! calling out.

use log::{error, info, warn};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;
use std::time::Duration;

use crate::configuration::GstSettings;
use crate::services::extractor::validate_gstin;

static GSTIN_CANDIDATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(\d{2}[A-Z]{5}\d{4}[A-Z][A-Z\d]Z[A-Z\d])\b").expect("invalid GSTIN pattern")
});

/// Borrower descriptors returned by the GST authority.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GstCompanyDetails {
    pub borrower_name: Option<String>,
    pub entity_type: Option<String>,
    pub business_vintage_years: Option<f64>,
    pub pincode: Option<String>,
    pub industry_type: Option<String>,
}

/// Find a structurally valid GSTIN in free text.
pub fn extract_gstin_from_text(text: &str) -> Option<String> {
    let upper = text.to_uppercase();
    GSTIN_CANDIDATE
        .captures_iter(&upper)
        .map(|cap| cap[1].to_string())
        .find(|candidate| validate_gstin(candidate))
}

/// Find a GSTIN embedded in a filename, e.g. `GSTR3B_27AABCU9603R1ZM.pdf`.
pub fn extract_gstin_from_filename(filename: &str) -> Option<String> {
    extract_gstin_from_text(filename)
}

pub struct GstApiClient {
    settings: GstSettings,
    client: reqwest::Client,
}

impl GstApiClient {
    pub fn new(settings: GstSettings) -> Self {
        Self {
            settings,
            client: reqwest::Client::new(),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.settings.url.is_some()
    }

    /// Fetch company details for a GSTIN. Returns `None` when the service
    /// is unconfigured, unreachable, or has no record; the caller persists
    /// the GSTIN either way.
    pub async fn fetch_company_details(&self, gstin: &str) -> Option<GstCompanyDetails> {
        let Some(base_url) = &self.settings.url else {
            warn!("GST API not configured; skipping lookup for {}", gstin);
            return None;
        };

        let url = format!("{}/api/gstin/{}", base_url.trim_end_matches('/'), gstin);
        info!("Fetching GST details for {}", gstin);

        let mut request = self
            .client
            .get(&url)
            .timeout(Duration::from_secs(self.settings.timeout_seconds));
        if let Some(api_key) = &self.settings.api_key {
            request = request.header("Authorization", format!("Bearer {}", api_key));
        }

        match request.send().await {
            Ok(response) if response.status().is_success() => {
                match response.json::<GstCompanyDetails>().await {
                    Ok(details) => Some(details),
                    Err(e) => {
                        error!("GST API returned unparseable payload for {}: {}", gstin, e);
                        None
                    }
                }
            }
            Ok(response) => {
                warn!("GST API returned {} for {}", response.status(), gstin);
                None
            }
            Err(e) => {
                error!("GST API call failed for {}: {}", gstin, e);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gstin_extracts_from_filename() {
        assert_eq!(
            extract_gstin_from_filename("GSTR3B_27AABCU9603R1ZM_march.pdf"),
            Some("27AABCU9603R1ZM".to_string())
        );
        assert_eq!(extract_gstin_from_filename("statement_jan.pdf"), None);
    }

    #[test]
    fn invalid_state_code_candidates_are_skipped() {
        // 99 is not a state code, so the candidate fails validation.
        assert_eq!(extract_gstin_from_filename("gst_99AABCU9603R1ZM.pdf"), None);
    }

    #[test]
    fn lowercase_filenames_still_match() {
        assert_eq!(
            extract_gstin_from_filename("gst_27aabcu9603r1zm.pdf"),
            Some("27AABCU9603R1ZM".to_string())
        );
    }

    #[test]
    fn gstin_extracts_from_ocr_text() {
        let text = "Certificate of Registration\nGSTIN: 27AABCU9603R1ZM\nMaharashtra";
        assert_eq!(
            extract_gstin_from_text(text),
            Some("27AABCU9603R1ZM".to_string())
        );
    }
}
