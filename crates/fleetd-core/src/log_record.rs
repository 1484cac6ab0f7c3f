use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Which of a child's two output streams a [`LogRecord`] was captured from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamKind {
    Stdout,
    Stderr,
}

/// A single immutable unit of buffered child output.
///
/// `text` may or may not end with `\n`: a record without a trailing newline
/// is "open" and may still be extended by [`crate::line_assembler`] until the
/// next newline arrives on the same stream.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LogRecord {
    pub kind: StreamKind,
    pub timestamp: DateTime<Utc>,
    pub text: String,
}

impl LogRecord {
    pub fn new(kind: StreamKind, timestamp: DateTime<Utc>, text: String) -> Self {
        Self { kind, timestamp, text }
    }

    pub fn is_open(&self) -> bool {
        !self.text.ends_with('\n')
    }

    /// Render as `<timestamp> | <text>` or bare `<text>`, per the `tail-text`
    /// route's `prefix_timestamp` query parameter.
    pub fn format_line(&self, prefix_timestamp: bool) -> String {
        if prefix_timestamp {
            format!("{} | {}", self.timestamp.to_rfc3339(), self.text)
        } else {
            self.text.clone()
        }
    }
}
