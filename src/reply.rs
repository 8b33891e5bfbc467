//! Terminal reply assembly.
//!
//! Turns the buffered stdout of a terminated worker invocation into exactly
//! one [`Reply`]. Evaluated in priority order: no designated result line,
//! then unparseable result line, then success. Pure functions; process
//! lifecycle and HTTP mapping live elsewhere.

use serde_json::{Map, Value};

use crate::demux::{log_lines, payload_line, split_lines};

/// Placeholder used for `raw` when the worker produced no output at all.
pub const EMPTY_MARKER: &str = "[empty]";

/// One terminal reply per invocation.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    /// Designated result line parsed as a JSON object. The `logs` key holds
    /// the system-computed log lines; any `logs` the worker supplied in the
    /// payload is overwritten.
    Success(Map<String, Value>),
    /// No line starting with `{` was found.
    NoPayload { logs: Vec<String>, raw: String },
    /// The designated result line is not a JSON object.
    MalformedPayload { logs: Vec<String>, raw: String },
}

/// Assemble the terminal reply from fully-buffered stdout.
pub fn assemble(stdout: &str) -> Reply {
    let lines = split_lines(stdout);
    let logs = log_lines(&lines);
    let raw = raw_output(stdout);

    let Some(candidate) = payload_line(&lines) else {
        return Reply::NoPayload { logs, raw };
    };

    // Must parse to a JSON object: spreading fields of a bare string or
    // number into a response is undefined.
    match serde_json::from_str::<Value>(candidate) {
        Ok(Value::Object(mut map)) => {
            map.insert("logs".to_string(), Value::from(logs));
            Reply::Success(map)
        }
        _ => Reply::MalformedPayload { logs, raw },
    }
}

/// Raw output attached to error replies: the whole trimmed stdout, or the
/// `"[empty]"` marker when there was none.
fn raw_output(stdout: &str) -> String {
    let trimmed = stdout.trim();
    if trimmed.is_empty() {
        EMPTY_MARKER.to_string()
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_success_with_logs() {
        let stdout = "[init] loading index\n[info] retrieved 3 docs\n{\"answer\":\"Paris\"}\n";
        match assemble(stdout) {
            Reply::Success(map) => {
                assert_eq!(map["answer"], json!("Paris"));
                assert_eq!(
                    map["logs"],
                    json!(["[init] loading index", "[info] retrieved 3 docs"])
                );
            }
            other => panic!("expected success, got {:?}", other),
        }
    }

    #[test]
    fn test_no_payload_with_logs() {
        let stdout = "[warn] nothing found\n";
        assert_eq!(
            assemble(stdout),
            Reply::NoPayload {
                logs: vec!["[warn] nothing found".to_string()],
                raw: "[warn] nothing found".to_string(),
            }
        );
    }

    #[test]
    fn test_no_payload_empty_output() {
        assert_eq!(
            assemble(""),
            Reply::NoPayload {
                logs: vec![],
                raw: EMPTY_MARKER.to_string(),
            }
        );
    }

    #[test]
    fn test_no_payload_whitespace_only() {
        assert_eq!(
            assemble("  \n \n"),
            Reply::NoPayload {
                logs: vec![],
                raw: EMPTY_MARKER.to_string(),
            }
        );
    }

    #[test]
    fn test_malformed_payload() {
        let stdout = "{not valid json}\n";
        assert_eq!(
            assemble(stdout),
            Reply::MalformedPayload {
                logs: vec![],
                raw: "{not valid json}".to_string(),
            }
        );
    }

    #[test]
    fn test_malformed_payload_keeps_logs_and_raw() {
        let stdout = "[step] one\n{broken\n[step] two\n";
        assert_eq!(
            assemble(stdout),
            Reply::MalformedPayload {
                logs: vec!["[step] one".to_string(), "[step] two".to_string()],
                raw: "[step] one\n{broken\n[step] two".to_string(),
            }
        );
    }

    #[test]
    fn test_first_payload_line_wins() {
        let stdout = "{\"answer\":\"first\"}\n{\"answer\":\"second\"}\n";
        match assemble(stdout) {
            Reply::Success(map) => assert_eq!(map["answer"], json!("first")),
            other => panic!("expected success, got {:?}", other),
        }
    }

    #[test]
    fn test_second_payload_ignored_even_if_first_is_selected_only() {
        // A malformed second candidate must not turn a success into an error.
        let stdout = "{\"answer\":\"ok\"}\n{oops\n";
        assert!(matches!(assemble(stdout), Reply::Success(_)));
    }

    #[test]
    fn test_system_logs_override_worker_logs_field() {
        let stdout = "[real] log\n{\"answer\":\"x\",\"logs\":[\"forged\"]}\n";
        match assemble(stdout) {
            Reply::Success(map) => {
                assert_eq!(map["logs"], json!(["[real] log"]));
            }
            other => panic!("expected success, got {:?}", other),
        }
    }

    #[test]
    fn test_payload_with_trailing_garbage_is_malformed() {
        let stdout = "{\"0\": 1}trailing\n";
        assert!(matches!(assemble(stdout), Reply::MalformedPayload { .. }));
    }

    #[test]
    fn test_extra_payload_fields_preserved() {
        let stdout = "{\"answer\":\"Paris\",\"sources\":[\"doc1\"],\"score\":0.9}\n";
        match assemble(stdout) {
            Reply::Success(map) => {
                assert_eq!(map["answer"], json!("Paris"));
                assert_eq!(map["sources"], json!(["doc1"]));
                assert_eq!(map["score"], json!(0.9));
                assert!(map.contains_key("logs"));
            }
            other => panic!("expected success, got {:?}", other),
        }
    }

    #[test]
    fn test_inert_lines_in_raw_but_not_logs() {
        let stdout = "warning: deprecation\n[log] a\n";
        assert_eq!(
            assemble(stdout),
            Reply::NoPayload {
                logs: vec!["[log] a".to_string()],
                raw: "warning: deprecation\n[log] a".to_string(),
            }
        );
    }
}
