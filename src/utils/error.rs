use thiserror::Error;

#[derive(Error, Debug)]
pub enum MapperError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Main content region not found on campus page: {campus}")]
    StructureNotFound { campus: String },

    #[error("Failed to fetch {url}: {message}")]
    FetchFailed { url: String, message: String },

    #[error("Invalid URL: {url}")]
    InvalidUrl { url: String },

    #[error("No known CMS layout recognized for {url}")]
    SelectorUnresolved { url: String },

    #[error("Invalid selector '{selector}': {message}")]
    Selector { selector: String, message: String },

    #[error("Configuration validation failed for '{field}': {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value '{value}' for '{field}': {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },

    #[error("No campuses configured")]
    NoCampusesConfigured,

    #[error("None of the {configured} configured campuses could be mapped")]
    NoCampusesMapped { configured: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Network,
    Parsing,
    Configuration,
    Storage,
    Data,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl MapperError {
    pub fn fetch_failed(url: &str, message: impl Into<String>) -> Self {
        MapperError::FetchFailed {
            url: url.to_string(),
            message: message.into(),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            MapperError::Http(_) | MapperError::FetchFailed { .. } => ErrorCategory::Network,
            MapperError::StructureNotFound { .. }
            | MapperError::SelectorUnresolved { .. }
            | MapperError::Selector { .. } => ErrorCategory::Parsing,
            MapperError::Io(_) => ErrorCategory::Storage,
            MapperError::Serialization(_)
            | MapperError::InvalidUrl { .. }
            | MapperError::NoCampusesMapped { .. } => ErrorCategory::Data,
            MapperError::ConfigValidationError { .. }
            | MapperError::InvalidConfigValueError { .. }
            | MapperError::MissingConfigError { .. }
            | MapperError::NoCampusesConfigured => ErrorCategory::Configuration,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            // 單一部門或候選看板的問題，不影響整體執行
            MapperError::SelectorUnresolved { .. } | MapperError::InvalidUrl { .. } => {
                ErrorSeverity::Low
            }
            MapperError::Http(_)
            | MapperError::FetchFailed { .. }
            | MapperError::StructureNotFound { .. } => ErrorSeverity::Medium,
            MapperError::Serialization(_)
            | MapperError::Selector { .. }
            | MapperError::NoCampusesMapped { .. } => ErrorSeverity::High,
            MapperError::Io(_)
            | MapperError::ConfigValidationError { .. }
            | MapperError::InvalidConfigValueError { .. }
            | MapperError::MissingConfigError { .. }
            | MapperError::NoCampusesConfigured => ErrorSeverity::Critical,
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self.category() {
            ErrorCategory::Network => {
                "Check network connectivity or raise the timeouts in the [http] section"
            }
            ErrorCategory::Parsing => {
                "The page layout may have changed; inspect it and adjust [hierarchy] or [[cms_rules]]"
            }
            ErrorCategory::Configuration => {
                "Fix the configuration file; run with --dry-run to review the loaded values"
            }
            ErrorCategory::Storage => "Make sure the output directory exists and is writable",
            ErrorCategory::Data => "Review the input data; the entry may need manual review",
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            MapperError::NoCampusesConfigured => {
                "No campus pages are configured, nothing to map".to_string()
            }
            MapperError::StructureNotFound { campus } => {
                format!("Could not find the main content of the {} page", campus)
            }
            MapperError::FetchFailed { url, .. } => format!("Could not download {}", url),
            MapperError::NoCampusesMapped { .. } => {
                "No campus could be crawled, no output was written".to_string()
            }
            other => other.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, MapperError>;
