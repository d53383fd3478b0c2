use powgate_common::{PowgateError, PowgateResult};

use crate::payload::{CaptchaPayload, ChallengePayload};

/// Optional namespace prefix accepted in front of command names.
const COMMAND_PREFIX: &str = "POWGATE.";

/// A fully parsed engine command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    AddCaptcha {
        captcha_id: String,
        config: CaptchaPayload,
    },
    DeleteCaptcha {
        captcha_id: String,
    },
    CaptchaExists {
        captcha_id: String,
    },
    GetCaptcha {
        captcha_id: String,
    },
    AddVisitor {
        captcha_id: String,
    },
    GetCount {
        captcha_id: String,
    },
    AddChallenge {
        captcha_id: String,
        payload: ChallengePayload,
    },
    GetChallenge {
        captcha_id: String,
        challenge_id: String,
    },
    DeleteChallenge {
        captcha_id: String,
        challenge_id: String,
    },
}

impl Command {
    /// Parse a command from its name and positional arguments.
    ///
    /// Names are case-insensitive and may carry the `POWGATE.` prefix.
    pub fn parse<S: AsRef<str>>(name: &str, args: &[S]) -> PowgateResult<Self> {
        let normalized = name.trim().to_ascii_uppercase();
        let bare = normalized
            .strip_prefix(COMMAND_PREFIX)
            .unwrap_or(normalized.as_str());

        let command = match bare {
            "ADD_CAPTCHA" => {
                let [captcha_id, config] = positional::<2, S>("ADD_CAPTCHA", args)?;
                Command::AddCaptcha {
                    captcha_id,
                    config: CaptchaPayload::parse(&config)?,
                }
            }
            "DELETE_CAPTCHA" => {
                let [captcha_id] = positional::<1, S>("DELETE_CAPTCHA", args)?;
                Command::DeleteCaptcha { captcha_id }
            }
            "CAPTCHA_EXISTS" => {
                let [captcha_id] = positional::<1, S>("CAPTCHA_EXISTS", args)?;
                Command::CaptchaExists { captcha_id }
            }
            "GET_CAPTCHA" => {
                let [captcha_id] = positional::<1, S>("GET_CAPTCHA", args)?;
                Command::GetCaptcha { captcha_id }
            }
            "ADD_VISITOR" => {
                let [captcha_id] = positional::<1, S>("ADD_VISITOR", args)?;
                Command::AddVisitor { captcha_id }
            }
            "GET_COUNT" => {
                let [captcha_id] = positional::<1, S>("GET_COUNT", args)?;
                Command::GetCount { captcha_id }
            }
            "ADD_CHALLENGE" => {
                let [captcha_id, payload] = positional::<2, S>("ADD_CHALLENGE", args)?;
                Command::AddChallenge {
                    captcha_id,
                    payload: ChallengePayload::parse(&payload)?,
                }
            }
            "GET_CHALLENGE" => {
                let [captcha_id, challenge_id] = positional::<2, S>("GET_CHALLENGE", args)?;
                Command::GetChallenge {
                    captcha_id,
                    challenge_id,
                }
            }
            "DELETE_CHALLENGE" => {
                let [captcha_id, challenge_id] = positional::<2, S>("DELETE_CHALLENGE", args)?;
                Command::DeleteChallenge {
                    captcha_id,
                    challenge_id,
                }
            }
            _ => return Err(PowgateError::UnknownCommand(name.to_string())),
        };

        Ok(command)
    }

    /// Canonical command name, used for logging and metric labels.
    pub fn name(&self) -> &'static str {
        match self {
            Command::AddCaptcha { .. } => "ADD_CAPTCHA",
            Command::DeleteCaptcha { .. } => "DELETE_CAPTCHA",
            Command::CaptchaExists { .. } => "CAPTCHA_EXISTS",
            Command::GetCaptcha { .. } => "GET_CAPTCHA",
            Command::AddVisitor { .. } => "ADD_VISITOR",
            Command::GetCount { .. } => "GET_COUNT",
            Command::AddChallenge { .. } => "ADD_CHALLENGE",
            Command::GetChallenge { .. } => "GET_CHALLENGE",
            Command::DeleteChallenge { .. } => "DELETE_CHALLENGE",
        }
    }

    pub fn captcha_id(&self) -> &str {
        match self {
            Command::AddCaptcha { captcha_id, .. }
            | Command::DeleteCaptcha { captcha_id }
            | Command::CaptchaExists { captcha_id }
            | Command::GetCaptcha { captcha_id }
            | Command::AddVisitor { captcha_id }
            | Command::GetCount { captcha_id }
            | Command::AddChallenge { captcha_id, .. }
            | Command::GetChallenge { captcha_id, .. }
            | Command::DeleteChallenge { captcha_id, .. } => captcha_id,
        }
    }
}

/// Take exactly `N` positional arguments.
fn positional<const N: usize, S: AsRef<str>>(
    command: &str,
    args: &[S],
) -> PowgateResult<[String; N]> {
    if args.len() != N {
        return Err(PowgateError::WrongArity {
            command: command.to_string(),
            expected: N,
            got: args.len(),
        });
    }
    Ok(std::array::from_fn(|i| args[i].as_ref().to_string()))
}
