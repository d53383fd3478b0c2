//! Command boundary for the captcha engine.
//!
//! Hosts hand this crate a command name plus positional string arguments;
//! it decodes the JSON payloads, routes the typed [`Command`] into the
//! [`Engine`](powgate_engine::Engine) and hands back a [`Reply`] ready to
//! be serialized. Argument order is fixed per command.

pub mod command;
pub mod payload;

use powgate_common::PowgateResult;
use powgate_engine::Engine;
use serde_json::{json, Value};
use tracing::{debug, info};

pub use command::Command;
pub use payload::{CaptchaPayload, ChallengePayload, ChallengeReply, VisitorReply};

/// Successful outcome of a command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Ok,
    Bool(bool),
    Integer(u64),
    Visitor(VisitorReply),
    Challenge(ChallengeReply),
    Captcha(CaptchaPayload),
}

impl Reply {
    /// JSON rendering used on the wire. `Ok` is the bare string `"OK"`.
    pub fn to_json(&self) -> Value {
        match self {
            Reply::Ok => json!("OK"),
            Reply::Bool(value) => json!(value),
            Reply::Integer(value) => json!(value),
            Reply::Visitor(reply) => json!(reply),
            Reply::Challenge(reply) => json!(reply),
            Reply::Captcha(payload) => json!(payload),
        }
    }
}

/// Parse and run a command in one step.
pub fn run<S: AsRef<str>>(engine: &Engine, name: &str, args: &[S]) -> PowgateResult<Reply> {
    let command = Command::parse(name, args)?;
    execute(engine, command)
}

/// Route a parsed command into the engine.
pub fn execute(engine: &Engine, command: Command) -> PowgateResult<Reply> {
    debug!(command = command.name(), captcha_id = %command.captcha_id(), "executing command");

    match command {
        Command::AddCaptcha { captcha_id, config } => {
            engine.register_captcha(&captcha_id, config.defense_levels(), config.window())?;
            Ok(Reply::Ok)
        }
        Command::DeleteCaptcha { captcha_id } => {
            if !engine.delete_captcha(&captcha_id) {
                info!(captcha_id = %captcha_id, "delete requested for unknown captcha");
            }
            Ok(Reply::Ok)
        }
        Command::CaptchaExists { captcha_id } => Ok(Reply::Bool(engine.captcha_exists(&captcha_id))),
        Command::GetCaptcha { captcha_id } => {
            let config = engine.get_captcha(&captcha_id)?;
            Ok(Reply::Captcha(CaptchaPayload::from(config.as_ref())))
        }
        Command::AddVisitor { captcha_id } => {
            let snapshot = engine.add_visitor(&captcha_id)?;
            Ok(Reply::Visitor(snapshot.into()))
        }
        Command::GetCount { captcha_id } => Ok(Reply::Integer(engine.get_count(&captcha_id))),
        Command::AddChallenge {
            captcha_id,
            payload,
        } => {
            engine.add_challenge(
                &captcha_id,
                &payload.challenge,
                payload.difficulty,
                std::time::Duration::from_secs(payload.duration),
            )?;
            Ok(Reply::Ok)
        }
        Command::GetChallenge {
            captcha_id,
            challenge_id,
        } => {
            let challenge = engine.get_challenge(&captcha_id, &challenge_id)?;
            Ok(Reply::Challenge(ChallengeReply::from(&challenge)))
        }
        Command::DeleteChallenge {
            captcha_id,
            challenge_id,
        } => {
            engine.delete_challenge(&captcha_id, &challenge_id)?;
            Ok(Reply::Ok)
        }
    }
}
