use thiserror::Error;

/// Error taxonomy for the provider boundary (see design §7). Tool-dispatch
/// and agent-loop errors live in `convoy-agent`; this crate only needs the
/// errors that originate at the HTTP/wire layer.
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("rate limited after {attempts} attempt(s)")]
    RateLimited { attempts: u32 },

    #[error("protocol error: {0}")]
    Protocol(String),
}
