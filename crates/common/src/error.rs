use thiserror::Error;

#[derive(Debug, Error)]
pub enum PowgateError {
    #[error("Captcha not found")]
    CaptchaNotFound,

    #[error("Challenge not found")]
    ChallengeNotFound,

    #[error("Challenge already exists")]
    DuplicateChallenge,

    #[error("invalid defense configuration: {0}")]
    InvalidConfig(String),

    #[error("unknown command: {0}")]
    UnknownCommand(String),

    #[error("wrong number of arguments for '{command}': expected {expected}, got {got}")]
    WrongArity {
        command: String,
        expected: usize,
        got: usize,
    },

    #[error("malformed payload: {0}")]
    Payload(#[from] serde_json::Error),

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl PowgateError {
    /// Both captcha and challenge lookups report absence (or expiry) as
    /// "not found"; callers that only care about that grouping use this.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            PowgateError::CaptchaNotFound | PowgateError::ChallengeNotFound
        )
    }
}

pub type PowgateResult<T> = Result<T, PowgateError>;
