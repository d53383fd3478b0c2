use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use powgate_commands::{Command, Reply};
use powgate_common::PowgateError;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::state::SharedState;

/// Label used for requests that never parsed into a known command.
const INVALID_COMMAND_LABEL: &str = "invalid";

/// Request body for a single engine command.
///
/// Arguments are positional. String arguments are passed through as-is;
/// any other JSON value (e.g. an inline config object) is re-encoded to
/// its JSON text first.
#[derive(Debug, Deserialize)]
pub struct CommandRequest {
    pub command: String,
    #[serde(default)]
    pub args: Vec<Value>,
}

/// POST /api/command
///
/// Executes one command against the engine and returns its reply.
pub async fn run_command(
    State(state): State<SharedState>,
    Json(body): Json<CommandRequest>,
) -> impl IntoResponse {
    let args: Vec<String> = body
        .args
        .iter()
        .map(|arg| match arg {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        })
        .collect();

    let command = match Command::parse(&body.command, args.as_slice()) {
        Ok(command) => command,
        Err(e) => {
            state
                .metrics
                .command_errors_total
                .with_label_values(&[INVALID_COMMAND_LABEL])
                .inc();
            tracing::debug!(command = %body.command, error = %e, "rejected command");
            return error_response(&e);
        }
    };

    let name = command.name();
    state.metrics.commands_total.with_label_values(&[name]).inc();

    match powgate_commands::execute(&state.engine, command) {
        Ok(reply) => {
            match &reply {
                Reply::Visitor(_) => state.metrics.visitors_total.inc(),
                Reply::Ok if name == "ADD_CHALLENGE" => {
                    state.metrics.challenges_issued_total.inc()
                }
                _ => {}
            }
            (
                StatusCode::OK,
                Json(json!({
                    "status": "ok",
                    "reply": reply.to_json()
                })),
            )
        }
        Err(e) => {
            state
                .metrics
                .command_errors_total
                .with_label_values(&[name])
                .inc();
            error_response(&e)
        }
    }
}

fn error_response(error: &PowgateError) -> (StatusCode, Json<Value>) {
    (
        status_for(error),
        Json(json!({
            "status": "error",
            "message": error.to_string()
        })),
    )
}

/// HTTP status reported for each engine error.
pub fn status_for(error: &PowgateError) -> StatusCode {
    match error {
        PowgateError::CaptchaNotFound | PowgateError::ChallengeNotFound => StatusCode::NOT_FOUND,
        PowgateError::DuplicateChallenge => StatusCode::CONFLICT,
        PowgateError::InvalidConfig(_)
        | PowgateError::UnknownCommand(_)
        | PowgateError::WrongArity { .. }
        | PowgateError::Payload(_) => StatusCode::BAD_REQUEST,
        PowgateError::Other(e) => {
            tracing::error!(error = %e, "command failed");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}
