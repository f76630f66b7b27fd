//! Commands extracted from model replies.
//!
//! The model is instructed to answer with a single JSON object carrying a
//! `command` (`name` + `args`) and optional free-form `thoughts`. A few
//! command names are reserved by the runtime itself.

use serde::{Deserialize, Serialize};

/// Command name the model uses to end the run; `args.response` is the answer.
pub const FINISH_COMMAND: &str = "finish";

/// Synthetic command produced when a reply cannot be understood.
pub const ERROR_COMMAND: &str = "ERROR";

/// Reserved tool name routed to the human operator.
pub const HUMAN_INPUT_COMMAND: &str = "request-human-input";

/// Command arguments, always a JSON object.
pub type Args = serde_json::Map<String, serde_json::Value>;

/// A structured `{name, args}` instruction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Command {
    pub name: String,
    #[serde(default)]
    pub args: Args,
}

impl Command {
    pub fn new(name: impl Into<String>, args: Args) -> Self {
        Self {
            name: name.into(),
            args,
        }
    }

    /// Build the synthetic `ERROR` command with a diagnostic message.
    pub fn error(message: impl Into<String>) -> Self {
        let mut args = Args::new();
        args.insert("error".into(), serde_json::Value::String(message.into()));
        Self::new(ERROR_COMMAND, args)
    }

    pub fn is_finish(&self) -> bool {
        self.name == FINISH_COMMAND
    }

    pub fn is_error(&self) -> bool {
        self.name == ERROR_COMMAND
    }

    /// Look up a string argument.
    pub fn arg_str(&self, key: &str) -> Option<&str> {
        self.args.get(key).and_then(|v| v.as_str())
    }

    /// Render the arguments in the compact `{key: 'value'}` form used in
    /// observations fed back to the model.
    pub fn display_args(&self) -> String {
        let body = self
            .args
            .iter()
            .map(|(key, value)| match value {
                serde_json::Value::String(s) => format!("{key}: '{s}'"),
                other => format!("{key}: {other}"),
            })
            .collect::<Vec<_>>()
            .join(", ");
        format!("{{{body}}}")
    }
}

/// A parsed model reply: the command plus optional thoughts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reply {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thoughts: Option<serde_json::Map<String, serde_json::Value>>,
    pub command: Command,
}

impl Reply {
    pub fn new(command: Command) -> Self {
        Self {
            thoughts: None,
            command,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn error_command_carries_message() {
        let cmd = Command::error("Could not parse invalid json: ");
        assert!(cmd.is_error());
        assert_eq!(cmd.arg_str("error"), Some("Could not parse invalid json: "));
    }

    #[test]
    fn display_args_quotes_strings() {
        let cmd = Command::error("Could not parse invalid json: ");
        assert_eq!(cmd.display_args(), "{error: 'Could not parse invalid json: '}");
    }

    #[test]
    fn display_args_renders_non_strings_as_json() {
        let args = json!({"count": 3, "flag": true}).as_object().cloned().unwrap();
        let cmd = Command::new("x", args);
        assert_eq!(cmd.display_args(), "{count: 3, flag: true}");
        assert_eq!(Command::new("y", Args::new()).display_args(), "{}");
    }

    #[test]
    fn missing_args_default_to_empty() {
        let cmd: Command = serde_json::from_value(json!({"name": "finish"})).unwrap();
        assert!(cmd.is_finish());
        assert!(cmd.args.is_empty());
    }

    #[test]
    fn reply_omits_absent_thoughts() {
        let reply = Reply::new(Command::new("finish", Args::new()));
        let json = serde_json::to_value(&reply).unwrap();
        assert!(json.get("thoughts").is_none());
        assert_eq!(json["command"]["name"], "finish");
    }
}
