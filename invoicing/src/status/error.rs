use invoicing_core::error::AppError;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum StatusError {
    /// A stored status value outside the enumerated set.
    #[error("Inconsistent invoice state: unknown status '{0}'")]
    InconsistentState(String),
}

impl From<StatusError> for AppError {
    fn from(err: StatusError) -> Self {
        AppError::InternalError(anyhow::Error::new(err))
    }
}
