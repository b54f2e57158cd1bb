//! OCR engine client.
//!
//! The OCR engine is an external HTTP collaborator: it takes document bytes
//! and returns the extracted text with a page count. Without a configured
//! URL, documents classify from filename alone.

use log::{info, warn};
use serde::Deserialize;
use std::time::Duration;

use crate::configuration::OcrSettings;

#[derive(Debug, Clone, Deserialize)]
pub struct OcrResult {
    pub text: String,
    #[serde(default)]
    pub pages: i32,
}

pub struct OcrClient {
    settings: OcrSettings,
    client: reqwest::Client,
}

impl OcrClient {
    pub fn new(settings: OcrSettings) -> Self {
        Self {
            settings,
            client: reqwest::Client::new(),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.settings.url.is_some()
    }

    /// Run OCR over document bytes. Returns `None` when the engine is
    /// unconfigured or fails; the caller proceeds with filename-only
    /// classification.
    pub async fn recognize(&self, filename: &str, bytes: Vec<u8>) -> Option<OcrResult> {
        let Some(base_url) = &self.settings.url else {
            return None;
        };

        let url = format!(
            "{}/ocr?filename={}",
            base_url.trim_end_matches('/'),
            urlencode(filename)
        );
        info!("Running OCR for {} ({} bytes)", filename, bytes.len());

        let response = self
            .client
            .post(&url)
            .header("Content-Type", "application/octet-stream")
            .timeout(Duration::from_secs(self.settings.timeout_seconds))
            .body(bytes)
            .send()
            .await;

        match response {
            Ok(response) if response.status().is_success() => {
                match response.json::<OcrResult>().await {
                    Ok(result) => Some(result),
                    Err(e) => {
                        warn!("OCR payload unparseable for {}: {}", filename, e);
                        None
                    }
                }
            }
            Ok(response) => {
                warn!("OCR returned {} for {}", response.status(), filename);
                None
            }
            Err(e) => {
                warn!("OCR call failed for {}: {}", filename, e);
                None
            }
        }
    }
}

fn urlencode(value: &str) -> String {
    value
        .bytes()
        .map(|b| {
            if b.is_ascii_alphanumeric() || matches!(b, b'.' | b'-' | b'_') {
                (b as char).to_string()
            } else {
                format!("%{:02X}", b)
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filenames_urlencode_for_the_query_string() {
        assert_eq!(urlencode("bank statement.pdf"), "bank%20statement.pdf");
        assert_eq!(urlencode("scan_01.jpg"), "scan_01.jpg");
    }
}
