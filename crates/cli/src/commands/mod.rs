pub mod catalog;
pub mod config;
pub mod doctor;
pub mod leaderboard;

use serde::Serialize;

#[derive(Debug, Clone)]
pub struct CommandResult {
    pub exit_code: u8,
    pub output: String,
}

#[derive(Debug, Serialize)]
struct CommandOutcome {
    command: String,
    status: String,
    error_class: Option<String>,
    message: String,
}

impl CommandResult {
    pub fn success(command: &str, message: impl Into<String>) -> Self {
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "ok".to_string(),
            error_class: None,
            message: message.into(),
        };
        Self { exit_code: 0, output: serialize_payload(payload) }
    }

    pub fn failure(
        command: &str,
        error_class: &str,
        message: impl Into<String>,
        exit_code: u8,
    ) -> Self {
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "error".to_string(),
            error_class: Some(error_class.to_string()),
            message: message.into(),
        };
        Self { exit_code, output: serialize_payload(payload) }
    }
}

fn serialize_payload(payload: CommandOutcome) -> String {
    serde_json::to_string(&payload).unwrap_or_else(|error| {
        format!(
            "{{\"command\":\"unknown\",\"status\":\"error\",\"error_class\":\"serialization\",\"message\":\"{}\"}}",
            error.to_string().replace('\\', "\\\\").replace('"', "\\\"")
        )
    })
}

#[cfg(test)]
mod tests {
    use super::CommandResult;

    #[test]
    fn success_outcome_serializes_as_json() {
        let result = CommandResult::success("catalog", "6 buckets loaded");
        assert_eq!(result.exit_code, 0);

        let value: serde_json::Value =
            serde_json::from_str(&result.output).expect("outcome is valid json");
        assert_eq!(value["status"], "ok");
        assert_eq!(value["command"], "catalog");
    }

    #[test]
    fn failure_outcome_carries_the_error_class_and_exit_code() {
        let result = CommandResult::failure("doctor", "config", "missing token", 2);
        assert_eq!(result.exit_code, 2);

        let value: serde_json::Value =
            serde_json::from_str(&result.output).expect("outcome is valid json");
        assert_eq!(value["status"], "error");
        assert_eq!(value["error_class"], "config");
    }
}
