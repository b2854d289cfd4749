use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    /// Rejected before any I/O was issued.
    #[error("{0}")]
    Validation(String),

    /// Transport-level failure; the request may never have reached the
    /// service.
    #[error("network error: {0}")]
    Network(String),

    /// The service answered with a non-2xx status, or a 2xx body that does
    /// not hold what the contract promises.
    #[error("speech service error {code}: {body}")]
    Remote { code: u16, body: String },
}
