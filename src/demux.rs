//! Worker stdout demultiplexer.
//!
//! The worker writes diagnostic log lines and a single structured result to
//! the same stream. A line is a log line iff it starts with `[`, a payload
//! candidate iff it starts with `{`; everything else is inert. The first
//! payload candidate is the designated result line; later candidates are
//! ignored without error.
//!
//! All functions here operate on the fully-buffered stdout text of a
//! terminated invocation. Classification cannot happen while the stream is
//! still open: a line begun but not yet newline-terminated must not be
//! classified prematurely.

/// Classification of one stdout line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind {
    /// Diagnostic log line (`[` prefix), forwarded verbatim, never parsed.
    Log,
    /// Structured result candidate (`{` prefix).
    Payload,
    /// Anything else; kept only in the raw output.
    Other,
}

/// Classify a single line by its first character.
pub fn classify(line: &str) -> LineKind {
    if line.starts_with('[') {
        LineKind::Log
    } else if line.starts_with('{') {
        LineKind::Payload
    } else {
        LineKind::Other
    }
}

/// Split buffered stdout into lines. The buffer is trimmed as a whole before
/// splitting, so empty or whitespace-only output yields no lines.
pub fn split_lines(stdout: &str) -> Vec<&str> {
    let trimmed = stdout.trim();
    if trimmed.is_empty() {
        return Vec::new();
    }
    trimmed.split('\n').collect()
}

/// Log lines in their original stream order.
pub fn log_lines(lines: &[&str]) -> Vec<String> {
    lines
        .iter()
        .filter(|l| classify(l) == LineKind::Log)
        .map(|l| l.to_string())
        .collect()
}

/// The designated result line: first payload candidate, if any.
pub fn payload_line<'a>(lines: &[&'a str]) -> Option<&'a str> {
    lines
        .iter()
        .find(|l| classify(l) == LineKind::Payload)
        .copied()
}
