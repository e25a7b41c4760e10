use thiserror::Error;

/// Error taxonomy for the asynchronous batch path (§7).
#[derive(Debug, Error)]
pub enum BatchError {
    #[error(transparent)]
    Transport(#[from] reqwest::Error),

    #[error("rate limited after {attempts} attempts")]
    RateLimited { attempts: u32 },

    #[error("malformed or unexpected response: {0}")]
    Protocol(String),

    #[error("results requested before job {0} reached a terminal status")]
    JobNotReady(String),

    #[error("job {id} failed: {detail}")]
    JobFailed { id: String, detail: String },

    #[error("job {0} expired")]
    JobExpired(String),

    #[error("job {0} was cancelled")]
    JobCancelled(String),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("wait on job {0} cancelled by caller")]
    WaitCancelled(String),
}
