use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum TrackingError {
    /// Alert stream unreachable or dropped
    #[error("Alert stream connection failed: {0}")]
    Connection(String),

    /// Stream payload that could not be parsed
    #[error("Malformed stream message: {0}")]
    MalformedMessage(String),

    /// Risk-prediction call failed, timed out or returned garbage
    #[error("Risk prediction unavailable for {object_id}: {reason}")]
    PredictionRequest { object_id: String, reason: String },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl TrackingError {
    pub fn prediction(object_id: &str, reason: impl ToString) -> Self {
        Self::PredictionRequest {
            object_id: object_id.to_string(),
            reason: reason.to_string(),
        }
    }
}

impl From<serde_json::Error> for TrackingError {
    fn from(e: serde_json::Error) -> Self {
        Self::MalformedMessage(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, TrackingError>;
