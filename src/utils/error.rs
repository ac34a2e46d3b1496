use thiserror::Error;

#[derive(Error, Debug)]
pub enum PortalError {
    #[error("Transport error calling {url}: {detail}")]
    Transport { url: String, detail: String },

    #[error("Session establishment failed for {portal}: {reason}")]
    SessionEstablishment { portal: String, reason: String },

    #[error("Authentication rejected by {portal}: {reason}")]
    Authentication { portal: String, reason: String },

    #[error("Anti-forgery token extraction failed for {portal}: field '{field}' {reason}")]
    TokenExtraction {
        portal: String,
        field: String,
        reason: String,
    },

    #[error("Cannot get data from {endpoint}: {reason}. Verify login details")]
    DataUnavailable { endpoint: String, reason: String },

    #[error("Both data requests failed: [{first}] and [{second}]")]
    FetchFailures {
        first: Box<PortalError>,
        second: Box<PortalError>,
    },

    #[error("Unknown portal '{identifier}' (lookup key '{key}')")]
    UnknownPortal { identifier: String, key: String },

    #[error("Invalid portal implementation registered for '{identifier}': {reason}")]
    InvalidPortalImplementation { identifier: String, reason: String },

    #[error("An error occurred while creating portal '{identifier}': {source}")]
    PortalCreation {
        identifier: String,
        #[source]
        source: Box<PortalError>,
    },

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Invalid configuration value for '{field}' ({value}): {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Validation error: {message}")]
    ValidationError { message: String },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

/// 錯誤種類，對應呼叫端需要區分的失敗類別
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Transport,
    SessionEstablishment,
    Authentication,
    TokenExtraction,
    DataUnavailable,
    UnknownPortal,
    InvalidPortalImplementation,
    PortalCreation,
    Config,
    Validation,
    Io,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl PortalError {
    pub fn transport(url: impl Into<String>, detail: impl std::fmt::Display) -> Self {
        Self::Transport {
            url: url.into(),
            detail: detail.to_string(),
        }
    }

    pub fn data_unavailable(endpoint: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::DataUnavailable {
            endpoint: endpoint.into(),
            reason: reason.into(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::ConfigError {
            message: message.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Transport { .. } => ErrorKind::Transport,
            Self::SessionEstablishment { .. } => ErrorKind::SessionEstablishment,
            Self::Authentication { .. } => ErrorKind::Authentication,
            Self::TokenExtraction { .. } => ErrorKind::TokenExtraction,
            Self::DataUnavailable { .. } => ErrorKind::DataUnavailable,
            // 兩個子請求皆失敗時，以第一個錯誤的種類為代表
            // 任一子請求缺少成功標記即視為資料不可用
            Self::FetchFailures { first, .. } => {
                if self
                    .failures()
                    .iter()
                    .any(|failure| failure.kind() == ErrorKind::DataUnavailable)
                {
                    ErrorKind::DataUnavailable
                } else {
                    first.kind()
                }
            }
            Self::UnknownPortal { .. } => ErrorKind::UnknownPortal,
            Self::InvalidPortalImplementation { .. } => ErrorKind::InvalidPortalImplementation,
            Self::PortalCreation { .. } => ErrorKind::PortalCreation,
            Self::ConfigError { .. } | Self::InvalidConfigValueError { .. } => ErrorKind::Config,
            Self::ValidationError { .. } | Self::SerializationError(_) => ErrorKind::Validation,
            Self::IoError(_) => ErrorKind::Io,
        }
    }

    /// 回傳此錯誤及其包含的所有子錯誤
    pub fn failures(&self) -> Vec<&PortalError> {
        match self {
            Self::FetchFailures { first, second } => {
                let mut all = first.failures();
                all.extend(second.failures());
                all
            }
            other => vec![other],
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.kind() {
            ErrorKind::Transport => ErrorSeverity::Medium,
            ErrorKind::SessionEstablishment
            | ErrorKind::Authentication
            | ErrorKind::TokenExtraction
            | ErrorKind::DataUnavailable
            | ErrorKind::Validation => ErrorSeverity::High,
            ErrorKind::UnknownPortal
            | ErrorKind::InvalidPortalImplementation
            | ErrorKind::PortalCreation
            | ErrorKind::Config
            | ErrorKind::Io => ErrorSeverity::Critical,
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self.kind() {
            ErrorKind::Transport => "Check network connectivity and the portal base URL, then retry",
            ErrorKind::SessionEstablishment => {
                "The portal did not issue a session cookie; the login flow may have changed"
            }
            ErrorKind::Authentication => "Verify the username and password for this portal",
            ErrorKind::TokenExtraction => {
                "The portal page layout changed; the portal implementation needs updating"
            }
            ErrorKind::DataUnavailable => {
                "Log in to the portal manually to verify the account, then retry"
            }
            ErrorKind::UnknownPortal => "Use one of the registered portal identifiers",
            ErrorKind::InvalidPortalImplementation | ErrorKind::PortalCreation => {
                "Check the portal registration and its endpoint configuration"
            }
            ErrorKind::Config => "Fix the configuration file or command line arguments",
            ErrorKind::Validation => "The portal returned data that failed validation",
            ErrorKind::Io => "Check file permissions and available disk space",
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self.kind() {
            ErrorKind::Transport => format!("Could not reach the portal: {}", self),
            ErrorKind::Authentication => "Login was rejected by the portal".to_string(),
            ErrorKind::DataUnavailable => {
                "Cannot get the data. Validate login details".to_string()
            }
            _ => self.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, PortalError>;
