//! Text output formatting with colors.

use ccapi_fetch::ApiError;
use serde_json::Value;

use super::json::StatusOutput;

// ============================================================================
// ANSI Colors
// ============================================================================

const RESET: &str = "\x1b[0m";
const BOLD: &str = "\x1b[1m";
const DIM: &str = "\x1b[2m";
const GREEN: &str = "\x1b[32m";
const RED: &str = "\x1b[31m";

/// Text formatter with optional colors.
pub struct TextFormatter {
    use_colors: bool,
}

impl TextFormatter {
    /// Creates a new text formatter.
    pub fn new(use_colors: bool) -> Self {
        Self { use_colors }
    }

    /// Formats a response payload: strings verbatim, everything else as
    /// indented JSON.
    pub fn format_value(&self, value: &Value) -> String {
        match value {
            Value::String(text) => text.clone(),
            other => serde_json::to_string_pretty(other).unwrap_or_else(|_| other.to_string()),
        }
    }

    /// Formats a request error with its code.
    pub fn format_error(&self, error: &ApiError) -> String {
        let code = self.red(error.code());
        match error.status() {
            Some(status) => format!("{code} ({status}): {error}"),
            None => format!("{code}: {error}"),
        }
    }

    /// Formats client status.
    pub fn format_status(&self, status: &StatusOutput) -> String {
        let mut lines = vec![
            self.bold("ccapi status"),
            "─".repeat(40),
            format!("Context:   {}", status.context),
            format!("Build:     {}", status.build_id),
            format!("Origin:    {}", status.origin),
            format!("Dev mode:  {}", status.dev_mode),
            format!("Backend:   {}", status.token.backend),
        ];

        let token = if status.token.signed_in {
            format!(
                "{} {}",
                self.green("✓ signed in"),
                self.dim(status.token.access_token.as_deref().unwrap_or_default())
            )
        } else {
            self.red("✗ signed out")
        };
        lines.push(format!("Token:     {token}"));
        lines.join("\n")
    }

    /// Formats a check mark line.
    pub fn check(&self, ok: bool, text: &str) -> String {
        if ok {
            format!("{} {text}", self.green("✓"))
        } else {
            format!("{} {text}", self.red("✗"))
        }
    }

    // ========================================================================
    // Color/style helpers
    // ========================================================================

    fn bold(&self, text: &str) -> String {
        self.paint(BOLD, text)
    }

    fn dim(&self, text: &str) -> String {
        self.paint(DIM, text)
    }

    fn green(&self, text: &str) -> String {
        self.paint(GREEN, text)
    }

    fn red(&self, text: &str) -> String {
        self.paint(RED, text)
    }

    fn paint(&self, color: &str, text: &str) -> String {
        if self.use_colors {
            format!("{color}{text}{RESET}")
        } else {
            text.to_string()
        }
    }
}
