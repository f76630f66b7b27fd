//! Output parser — turns raw model text into a [`Reply`].
//!
//! Models are asked for exactly one JSON object but routinely wrap it in
//! prose or emit unescaped backslashes (Windows paths, regexes). Parsing
//! tries, in order:
//!
//! 1. the text as-is
//! 2. the text with invalid escapes repaired
//! 3. the repaired text between the first `{` and the last `}`
//!
//! If none yields an object, or the object has no usable command, the reply
//! becomes the synthetic `ERROR` command. Parsing never fails.

use std::sync::LazyLock;

use orchestra_core::command::{Args, Command, Reply};
use regex_lite::{Captures, Regex};
use serde_json::{Map, Value};
use tracing::debug;

/// A backslash with the escape it starts, if that escape is valid JSON.
static ESCAPE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"\\(["\\/bfnrt]|u[0-9a-fA-F]{4})?"#).unwrap_or_else(|e| unreachable!("{e}"))
});

#[derive(Debug, Clone, Copy, Default)]
pub struct OutputParser;

impl OutputParser {
    pub fn new() -> Self {
        Self
    }

    /// Parse a model reply. Total: malformed input becomes an `ERROR` command.
    pub fn parse(&self, text: &str) -> Reply {
        let Some(object) = rescue(text) else {
            debug!(len = text.len(), "Reply is not a JSON object");
            return Reply::new(Command::error(format!("Could not parse invalid json: {text}")));
        };

        match shape(object) {
            Some(reply) => reply,
            None => {
                debug!("Reply has no usable command");
                Reply::new(Command::error(format!("Incomplete command args: {text}")))
            }
        }
    }
}

/// Double every backslash that does not start a valid JSON escape.
pub fn repair_escapes(text: &str) -> String {
    ESCAPE
        .replace_all(text, |caps: &Captures<'_>| {
            if caps.get(1).is_some() {
                caps[0].to_string()
            } else {
                r"\\".to_string()
            }
        })
        .into_owned()
}

fn rescue(text: &str) -> Option<Map<String, Value>> {
    if let Some(object) = as_object(text) {
        return Some(object);
    }

    let repaired = repair_escapes(text);
    if let Some(object) = as_object(&repaired) {
        return Some(object);
    }

    let start = repaired.find('{')?;
    let end = repaired.rfind('}')?;
    if end < start {
        return None;
    }
    as_object(&repaired[start..=end])
}

fn as_object(text: &str) -> Option<Map<String, Value>> {
    match serde_json::from_str(text) {
        Ok(Value::Object(object)) => Some(object),
        _ => None,
    }
}

/// Keep only `thoughts` and `command.{name, args}`.
fn shape(mut object: Map<String, Value>) -> Option<Reply> {
    let thoughts = match object.remove("thoughts") {
        Some(Value::Object(thoughts)) => Some(thoughts),
        _ => None,
    };

    let Some(Value::Object(mut command)) = object.remove("command") else {
        return None;
    };
    let name = match command.remove("name") {
        Some(Value::String(name)) if !name.trim().is_empty() => name,
        _ => return None,
    };
    let args = match command.remove("args") {
        None | Some(Value::Null) => Args::new(),
        Some(Value::Object(args)) => args,
        Some(_) => return None,
    };

    Some(Reply {
        thoughts,
        command: Command::new(name, args),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use orchestra_core::command::ERROR_COMMAND;
    use serde_json::json;

    fn parse(text: &str) -> Reply {
        OutputParser::new().parse(text)
    }

    #[test]
    fn well_formed_reply() {
        let text = json!({
            "thoughts": {"text": "done", "plan": "- finish"},
            "command": {"name": "finish", "args": {"response": "done"}}
        })
        .to_string();
        let reply = parse(&text);
        assert!(reply.command.is_finish());
        assert_eq!(reply.command.arg_str("response"), Some("done"));
        assert_eq!(reply.thoughts.unwrap()["text"], "done");
    }

    #[test]
    fn round_trips_a_minimal_command() {
        let text = json!({"command": {"name": "x", "args": {}}}).to_string();
        assert_eq!(parse(&text).command.name, "x");
    }

    #[test]
    fn empty_reply_is_error() {
        let reply = parse("");
        assert_eq!(reply.command.name, ERROR_COMMAND);
        assert_eq!(
            reply.command.display_args(),
            "{error: 'Could not parse invalid json: '}"
        );
    }

    #[test]
    fn windows_path_is_repaired() {
        let text = r#"{"command": {"name": "read_file", "args": {"file_path": "C:\work\docs.txt"}}}"#;
        assert!(serde_json::from_str::<Value>(text).is_err());
        let reply = parse(text);
        assert_eq!(reply.command.name, "read_file");
        assert_eq!(reply.command.arg_str("file_path"), Some(r"C:\work\docs.txt"));
    }

    #[test]
    fn valid_escapes_are_left_alone() {
        let text = r#"say \"hi\"\n \\ \u00e9 \t"#;
        assert_eq!(repair_escapes(text), text);
        assert_eq!(repair_escapes(r"a\qb"), r"a\\qb");
        assert_eq!(repair_escapes(r"\u12"), r"\\u12");
    }

    #[test]
    fn prose_around_object_is_stripped() {
        let text = "Sure! Here is my answer:\n{\"command\": {\"name\": \"url-finder\", \"args\": {\"input\": \"rust\"}}}\nHope that helps.";
        let reply = parse(text);
        assert_eq!(reply.command.name, "url-finder");
        assert_eq!(reply.command.arg_str("input"), Some("rust"));
    }

    #[test]
    fn extra_fields_are_discarded() {
        let text = json!({
            "command": {"name": "finish", "args": {"response": "ok"}, "extra": 1},
            "confidence": 0.9
        })
        .to_string();
        let reply = parse(&text);
        let back = serde_json::to_value(&reply).unwrap();
        assert_eq!(back, json!({"command": {"name": "finish", "args": {"response": "ok"}}}));
    }

    #[test]
    fn missing_args_default_to_empty() {
        let reply = parse(r#"{"command": {"name": "finish"}}"#);
        assert!(reply.command.is_finish());
        assert!(reply.command.args.is_empty());
    }

    #[test]
    fn missing_command_is_incomplete() {
        let reply = parse(r#"{"thoughts": {"text": "hmm"}}"#);
        assert!(reply.command.is_error());
        assert!(reply.command.arg_str("error").unwrap().starts_with("Incomplete command args: "));
    }

    #[test]
    fn empty_name_is_incomplete() {
        let reply = parse(r#"{"command": {"name": "", "args": {}}}"#);
        assert!(reply.command.is_error());
    }

    #[test]
    fn garbage_never_yields_empty_name() {
        for text in ["", "}{", "{", "null", "42", "[1,2]", "\\", "{\"command\": 3}", "}}}{{{"] {
            let reply = parse(text);
            assert!(!reply.command.name.is_empty(), "input {text:?}");
        }
    }
}
