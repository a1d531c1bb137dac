use serde::Serialize;

/// All application errors, categorized by domain.
///
/// Insufficient history is never an error: indicator, level and backtest
/// computations degrade to `None` fields or empty results instead.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    // ── Market data ──
    #[error("Network error: {0}")]
    Network(String),

    #[error("{source_name} returned status {status}")]
    UpstreamStatus { source_name: String, status: u16 },

    #[error("Failed to parse {source_name} response: {message}")]
    UpstreamParse { source_name: String, message: String },

    #[error("No market data available for {0}")]
    NoData(String),

    // ── Configuration ──
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Backtest ──
    #[error("Backtest execution error: {0}")]
    BacktestExecution(String),

    // ── Serialization ──
    #[error("Serialization error: {0}")]
    Serialization(String),

    // ── General ──
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Serializable error response for the API layer.
#[derive(Debug, Serialize, Clone)]
pub struct ErrorResponse {
    pub code: String,
    pub message: String,
}

impl From<&AppError> for ErrorResponse {
    fn from(err: &AppError) -> Self {
        let code = match err {
            AppError::Network(_) => "NETWORK",
            AppError::UpstreamStatus { .. } => "UPSTREAM_STATUS",
            AppError::UpstreamParse { .. } => "UPSTREAM_PARSE",
            AppError::NoData(_) => "NO_DATA",
            AppError::InvalidConfig(_) => "INVALID_CONFIG",
            AppError::BacktestExecution(_) => "BACKTEST_EXECUTION",
            AppError::Serialization(_) => "SERIALIZATION",
            AppError::Internal(_) => "INTERNAL",
        };
        ErrorResponse {
            code: code.to_string(),
            message: err.to_string(),
        }
    }
}

impl Serialize for AppError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let response = ErrorResponse::from(self);
        response.serialize(serializer)
    }
}

// ── Conversions from external errors ──

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        AppError::Network(err.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}
