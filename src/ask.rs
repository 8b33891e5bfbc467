use anyhow::{bail, Result};
use serde_json::Value;

use crate::config::Config;
use crate::reply::{assemble, Reply};
use crate::worker::{EnvSnapshot, WorkerInvocation};

/// One-shot worker invocation from the terminal.
///
/// Runs the same pipeline as the HTTP handler: spawn, buffer, demultiplex,
/// assemble. Worker log lines go to stderr so stdout stays scriptable.
pub async fn run_ask(config: &Config, key: &str, query: &str, json: bool) -> Result<()> {
    if key.is_empty() || query.is_empty() {
        bail!("Missing key or query");
    }

    let invocation = WorkerInvocation::new(&config.worker, key, query, EnvSnapshot::current());
    let output = invocation
        .run()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to launch worker process: {}", e))?;

    match assemble(&output.stdout) {
        Reply::Success(map) => {
            if let Some(logs) = map.get("logs").and_then(Value::as_array) {
                for log in logs.iter().filter_map(Value::as_str) {
                    eprintln!("{}", log);
                }
            }
            if json {
                println!("{}", serde_json::to_string_pretty(&Value::Object(map))?);
            } else if let Some(answer) = map.get("answer").and_then(Value::as_str) {
                println!("{}", answer);
            } else {
                // No conventional answer field; show the whole payload.
                println!("{}", serde_json::to_string_pretty(&Value::Object(map))?);
            }
            Ok(())
        }
        Reply::NoPayload { logs, raw } => {
            for log in &logs {
                eprintln!("{}", log);
            }
            bail!("No valid JSON output from worker. Raw output:\n{}", raw);
        }
        Reply::MalformedPayload { logs, raw } => {
            for log in &logs {
                eprintln!("{}", log);
            }
            bail!("Failed to parse JSON output. Raw output:\n{}", raw);
        }
    }
}
