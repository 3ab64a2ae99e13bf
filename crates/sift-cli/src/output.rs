//! Shared output layer for human/JSON parity across all CLI commands.
//!
//! Every command handler receives an [`OutputMode`] and renders its result
//! accordingly: labeled text for humans, stable JSON for pipes and agents.

use serde::Serialize;
use std::io::{self, Write};

/// The two output modes supported by the CLI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Human-optimized output (tables, labels).
    Human,
    /// Machine-readable JSON (one object per command).
    Json,
}

impl OutputMode {
    /// Returns `true` if JSON output was requested.
    #[must_use]
    pub const fn is_json(self) -> bool {
        matches!(self, Self::Json)
    }
}

/// Render `value` to stdout in the requested mode.
///
/// JSON mode serializes the value directly; human mode calls the provided
/// closure.
///
/// # Errors
///
/// Returns an error if serialization or writing fails.
pub fn render<T: Serialize>(
    mode: OutputMode,
    value: &T,
    human: impl FnOnce(&T, &mut dyn Write) -> io::Result<()>,
) -> anyhow::Result<()> {
    let stdout = io::stdout();
    let mut w = stdout.lock();
    match mode {
        OutputMode::Json => {
            serde_json::to_writer_pretty(&mut w, value)?;
            writeln!(w)?;
        }
        OutputMode::Human => human(value, &mut w)?,
    }
    Ok(())
}

/// A structured error surfaced to the terminal or as JSON.
#[derive(Debug, Clone, Serialize)]
pub struct CliError {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
    pub code: String,
}

impl CliError {
    /// Build an error with a remediation hint and a stable code string.
    #[must_use]
    pub fn with_details(message: &str, hint: &str, code: &str) -> Self {
        Self {
            error: message.to_string(),
            hint: Some(hint.to_string()),
            code: code.to_string(),
        }
    }

    /// Build an error straight from a machine-readable [`ErrorCode`].
    #[must_use]
    pub fn from_error_code(code: sift_core::error::ErrorCode) -> Self {
        Self {
            error: code.message().to_string(),
            hint: code.hint().map(str::to_string),
            code: code.code().to_string(),
        }
    }
}

/// Render a [`CliError`] to stderr in the requested mode.
///
/// # Errors
///
/// Returns an error if serialization or writing fails.
pub fn render_error(mode: OutputMode, err: &CliError) -> anyhow::Result<()> {
    let stderr = io::stderr();
    let mut w = stderr.lock();
    if mode.is_json() {
        serde_json::to_writer_pretty(&mut w, err)?;
        writeln!(w)?;
    } else {
        writeln!(w, "error[{}]: {}", err.code, err.error)?;
        if let Some(hint) = &err.hint {
            writeln!(w, "hint: {hint}")?;
        }
    }
    Ok(())
}
