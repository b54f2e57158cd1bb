use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub application: ApplicationSettings,
    pub database: DatabaseSettings,
    #[serde(default)]
    pub storage: StorageSettings,
    #[serde(default)]
    pub uploads: UploadSettings,
    #[serde(default)]
    pub pipeline: PipelineSettings,
    #[serde(default)]
    pub ocr: OcrSettings,
    #[serde(default)]
    pub gst: GstSettings,
    #[serde(default)]
    pub bank_parser: BankParserSettings,
    #[serde(default)]
    pub llm: LlmSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApplicationSettings {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_host")]
    pub host: String,
    /// Number of in-process document workers spawned by the server binary.
    /// Set to 0 when running dedicated worker binaries.
    #[serde(default = "default_workers")]
    pub workers: usize,
}

impl Default for ApplicationSettings {
    fn default() -> Self {
        Self {
            port: default_port(),
            host: default_host(),
            workers: default_workers(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseSettings {
    pub username: Option<String>,
    pub password: Option<String>,
    pub port: Option<u16>,
    pub host: Option<String>,
    pub database_name: Option<String>,
    pub url: Option<String>,
}

impl DatabaseSettings {
    pub fn connection_string(&self) -> String {
        if let Some(url) = &self.url {
            url.clone()
        } else {
            format!(
                "mysql://{}:{}@{}:{}/{}",
                self.username.as_deref().unwrap_or(""),
                self.password.as_deref().unwrap_or(""),
                self.host.as_deref().unwrap_or("127.0.0.1"),
                self.port.unwrap_or(3306),
                self.database_name.as_deref().unwrap_or("caseos")
            )
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageSettings {
    /// Root directory for the local file-storage backend.
    #[serde(default = "default_storage_root")]
    pub root: String,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            root: default_storage_root(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct UploadSettings {
    #[serde(default = "default_max_file_size_mb")]
    pub max_file_size_mb: u64,
    #[serde(default = "default_max_case_upload_mb")]
    pub max_case_upload_mb: u64,
    #[serde(default = "default_allowed_extensions")]
    pub allowed_extensions: Vec<String>,
}

impl Default for UploadSettings {
    fn default() -> Self {
        Self {
            max_file_size_mb: default_max_file_size_mb(),
            max_case_upload_mb: default_max_case_upload_mb(),
            allowed_extensions: default_allowed_extensions(),
        }
    }
}

impl UploadSettings {
    pub fn max_file_size_bytes(&self) -> u64 {
        self.max_file_size_mb * 1024 * 1024
    }

    pub fn max_case_upload_bytes(&self) -> u64 {
        self.max_case_upload_mb * 1024 * 1024
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PipelineSettings {
    /// Minimum extraction confidence for a value to beat a manual override.
    #[serde(default = "default_confidence_threshold")]
    pub confidence_threshold: f64,
    /// Wall-clock budget for a full bank-statement analysis run.
    #[serde(default = "default_bank_analysis_timeout")]
    pub bank_analysis_timeout_seconds: u64,
    /// Per-PDF size cap for the statement analyzer.
    #[serde(default = "default_bank_pdf_cap_mb")]
    pub bank_pdf_max_mb: u64,
    /// Per-case cap on statements analyzed in one run; the largest files win.
    #[serde(default = "default_bank_statement_cap")]
    pub bank_statements_max_per_case: usize,
    #[serde(default = "default_job_poll_interval")]
    pub job_poll_interval_ms: u64,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            confidence_threshold: default_confidence_threshold(),
            bank_analysis_timeout_seconds: default_bank_analysis_timeout(),
            bank_pdf_max_mb: default_bank_pdf_cap_mb(),
            bank_statements_max_per_case: default_bank_statement_cap(),
            job_poll_interval_ms: default_job_poll_interval(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct OcrSettings {
    /// Base URL of the OCR engine. Unset means OCR is skipped and documents
    /// classify from filename alone.
    pub url: Option<String>,
    #[serde(default = "default_ocr_timeout")]
    pub timeout_seconds: u64,
}

impl Default for OcrSettings {
    fn default() -> Self {
        Self {
            url: None,
            timeout_seconds: default_ocr_timeout(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct GstSettings {
    /// Base URL of the GST authority lookup service.
    pub url: Option<String>,
    pub api_key: Option<String>,
    #[serde(default = "default_gst_timeout")]
    pub timeout_seconds: u64,
}

impl Default for GstSettings {
    fn default() -> Self {
        Self {
            url: None,
            api_key: None,
            timeout_seconds: default_gst_timeout(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct BankParserSettings {
    /// Base URL of the remote statement parser. Unset routes every analysis
    /// through the local parser.
    pub url: Option<String>,
    #[serde(default = "default_parser_timeout")]
    pub timeout_seconds: u64,
}

impl Default for BankParserSettings {
    fn default() -> Self {
        Self {
            url: None,
            timeout_seconds: default_parser_timeout(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LlmSettings {
    /// API key for the chat-completions provider. Unset disables the LLM and
    /// routes every strategy request to the deterministic fallback.
    pub api_key: Option<String>,
    #[serde(default = "default_llm_base_url")]
    pub base_url: String,
    #[serde(default = "default_llm_model")]
    pub model: String,
    #[serde(default = "default_llm_timeout")]
    pub timeout_seconds: u64,
    #[serde(default = "default_llm_max_tokens")]
    pub max_tokens: u32,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_llm_base_url(),
            model: default_llm_model(),
            timeout_seconds: default_llm_timeout(),
            max_tokens: default_llm_max_tokens(),
        }
    }
}

fn default_port() -> u16 {
    8000
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_workers() -> usize {
    2
}

fn default_storage_root() -> String {
    "./uploads".to_string()
}

fn default_max_file_size_mb() -> u64 {
    25
}

fn default_max_case_upload_mb() -> u64 {
    100
}

fn default_allowed_extensions() -> Vec<String> {
    ["pdf", "png", "jpg", "jpeg", "zip", "xlsx", "csv", "doc", "docx"]
        .iter()
        .map(|ext| ext.to_string())
        .collect()
}

fn default_confidence_threshold() -> f64 {
    0.5
}

fn default_bank_analysis_timeout() -> u64 {
    45
}

fn default_bank_pdf_cap_mb() -> u64 {
    20
}

fn default_bank_statement_cap() -> usize {
    6
}

fn default_job_poll_interval() -> u64 {
    1000
}

fn default_ocr_timeout() -> u64 {
    60
}

fn default_gst_timeout() -> u64 {
    10
}

fn default_parser_timeout() -> u64 {
    30
}

fn default_llm_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_llm_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_llm_timeout() -> u64 {
    6
}

fn default_llm_max_tokens() -> u32 {
    550
}

pub fn get_configuration() -> Result<Settings, config::ConfigError> {
    let mut builder = config::Config::builder()
        // Add support for environment variables (e.g. APP__APPLICATION__PORT=5001)
        .add_source(
            config::Environment::with_prefix("APP")
                .separator("__")
        );

    // Manually override with standard env vars if present
    // This supports HOST, PORT, DATABASE_URL directly
    if let Ok(port) = std::env::var("PORT") {
        builder = builder.set_override("application.port", port)?;
    }
    if let Ok(host) = std::env::var("HOST") {
        builder = builder.set_override("application.host", host)?;
    }
    if let Ok(db_url) = std::env::var("DATABASE_URL") {
        builder = builder.set_override("database.url", db_url)?;
    }

    let settings = builder.build()?;

    settings.try_deserialize::<Settings>()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let uploads = UploadSettings::default();
        assert_eq!(uploads.max_file_size_bytes(), 25 * 1024 * 1024);
        assert_eq!(uploads.max_case_upload_bytes(), 100 * 1024 * 1024);
        assert!(uploads.allowed_extensions.iter().any(|e| e == "zip"));

        let pipeline = PipelineSettings::default();
        assert_eq!(pipeline.confidence_threshold, 0.5);
        assert!(pipeline.bank_analysis_timeout_seconds >= 10);
    }

    #[test]
    fn env_vars_override_settings() {
        unsafe {
            std::env::set_var("APP__APPLICATION__PORT", "1234");
            std::env::set_var("APP__APPLICATION__HOST", "test_host");
            std::env::set_var("APP__DATABASE__URL", "mysql://test/caseos");
        }

        let config = get_configuration().expect("Failed to load config from env vars");
        assert_eq!(config.application.port, 1234);
        assert_eq!(config.application.host, "test_host");
        assert_eq!(config.database.url.as_deref(), Some("mysql://test/caseos"));
    }
}
