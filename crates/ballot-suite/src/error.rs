use thiserror::Error;

/// Everything that can stop a case short of a pass.
///
/// `NotSupported` is a skip, not a failure: the device simply cannot run the
/// case. `Fail` is an ordinary conformance failure carrying the offending
/// parameter in its message. `Internal` means the suite itself violated one
/// of its invariants.
#[derive(Debug, Error)]
pub enum CaseError {
    #[error("not supported: {0}")]
    NotSupported(String),
    #[error("failed: {0}")]
    Fail(String),
    #[error("internal error: {0}")]
    Internal(String),
    #[error("gpu error: {0}")]
    Gpu(#[from] anyhow::Error),
}

pub type CaseResult<T> = Result<T, CaseError>;

impl CaseError {
    /// True for outcomes the runner reports as a skip.
    pub fn is_skip(&self) -> bool {
        matches!(self, CaseError::NotSupported(_))
    }
}
