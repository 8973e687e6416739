use thiserror::Error;

#[derive(Debug, Error)]
pub enum DashboardError {
    #[error("data source unavailable ({location}): {reason}")]
    SourceUnavailable { location: String, reason: String },
    #[error("malformed data: {0}")]
    MalformedData(String),
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl DashboardError {
    pub fn unavailable(location: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        DashboardError::SourceUnavailable {
            location: location.into(),
            reason: reason.to_string(),
        }
    }
}
