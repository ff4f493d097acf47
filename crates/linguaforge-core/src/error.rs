//! Grading error taxonomy.
//!
//! Defined in `linguaforge-core` so the pipeline can classify failures without
//! string matching: client errors are reported immediately with no pipeline
//! work, dependency errors are fatal to the whole request, and degraded
//! dependencies are recovered locally and never reach this type.

use thiserror::Error;

/// Errors that can abort a grading request.
#[derive(Debug, Error)]
pub enum GradeError {
    /// The request was malformed: missing required fields, or neither text nor
    /// audio provided.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The knowledge store could not be read. There is no safe partial
    /// context, so the whole request fails fast.
    #[error("knowledge store unavailable: {0}")]
    StoreUnavailable(String),

    /// A required external-service credential is missing.
    #[error("missing credentials for {0}")]
    MissingCredentials(String),

    /// The speech service reported a failed or error transcription.
    #[error("transcription failed: {0}")]
    TranscriptionFailed(String),

    /// The transcription never completed within the polling bound.
    #[error("transcription timed out after {attempts} poll attempts")]
    TranscriptionTimeout { attempts: u32 },

    /// Audio normalization failed and the request carried no text to fall
    /// back to.
    #[error("no gradable text: audio could not be transcribed and no text was provided")]
    NoGradableText,
}

impl GradeError {
    /// Client errors are the caller's fault and are reported without any
    /// pipeline work having been attempted.
    pub fn is_client_error(&self) -> bool {
        matches!(self, GradeError::InvalidRequest(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classification() {
        assert!(GradeError::InvalidRequest("missing userId".into()).is_client_error());
        assert!(!GradeError::StoreUnavailable("connection refused".into()).is_client_error());
        assert!(!GradeError::MissingCredentials("speech service".into()).is_client_error());
        assert!(!GradeError::TranscriptionTimeout { attempts: 60 }.is_client_error());
    }

    #[test]
    fn messages_are_presentable() {
        let err = GradeError::TranscriptionTimeout { attempts: 60 };
        assert_eq!(
            err.to_string(),
            "transcription timed out after 60 poll attempts"
        );
    }
}
