use thiserror::Error;

#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Refund could not be completed: {0}")]
    PartialFailure(String),

    #[error("Intent classifier unavailable: {0}")]
    ClassifierUnavailable(String),

    #[error("Field extractor unavailable: {0}")]
    ExtractorUnavailable(String),

    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Upstream error: {0}")]
    UpstreamError(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl DomainError {
    pub fn storage(msg: impl Into<String>) -> Self {
        Self::StoreUnavailable(msg.into())
    }

    pub fn partial_failure(msg: impl Into<String>) -> Self {
        Self::PartialFailure(msg.into())
    }

    pub fn upstream(msg: impl Into<String>) -> Self {
        Self::UpstreamError(msg.into())
    }

    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Re-labels a failure raised while classifying an utterance.
    ///
    /// Store outages keep their identity so the caller can still tell the
    /// user the service is down rather than asking them to rephrase.
    pub fn into_classifier_failure(self) -> Self {
        match self {
            Self::ClassifierUnavailable(_) | Self::StoreUnavailable(_) => self,
            other => Self::ClassifierUnavailable(other.to_string()),
        }
    }

    /// Re-labels a failure raised while extracting fields from an utterance.
    pub fn into_extractor_failure(self) -> Self {
        match self {
            Self::ExtractorUnavailable(_) | Self::StoreUnavailable(_) => self,
            other => Self::ExtractorUnavailable(other.to_string()),
        }
    }

    pub fn is_storage_error(&self) -> bool {
        matches!(self, Self::StoreUnavailable(_))
    }

    pub fn is_partial_failure(&self) -> bool {
        matches!(self, Self::PartialFailure(_))
    }

    /// True for failures of the language-understanding collaborators, which
    /// the conversation recovers from by asking the user to rephrase.
    pub fn is_understanding_failure(&self) -> bool {
        matches!(
            self,
            Self::ClassifierUnavailable(_) | Self::ExtractorUnavailable(_) | Self::UpstreamError(_)
        )
    }
}
