//! Structured error handling and exit codes.

use serde::Serialize;

/// Exit codes for the muxic application.
///
/// - 0: Success (run completed, whether or not duplicates were found)
/// - 1: General error (bad target, unreadable tree, broken I/O)
/// - 3: Partial success (completed with per-file, deletion or cache-save errors)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ExitCode {
    /// Success: run completed without errors.
    Success = 0,
    /// General error: the run was aborted.
    GeneralError = 1,
    /// Partial success: run completed but some recoverable errors occurred.
    PartialSuccess = 3,
}

impl ExitCode {
    /// Get the numeric exit code.
    #[must_use]
    pub fn as_i32(self) -> i32 {
        self as i32
    }

    /// Get the machine-readable code prefix.
    #[must_use]
    pub fn code_prefix(self) -> &'static str {
        match self {
            Self::Success => "MX000",
            Self::GeneralError => "MX001",
            Self::PartialSuccess => "MX003",
        }
    }
}

/// Structured error information for JSON output.
#[derive(Debug, Serialize)]
pub struct StructuredError {
    /// The error code (e.g., "MX001")
    pub code: String,
    /// The exit code number
    pub exit_code: i32,
    /// Human-readable error message
    pub message: String,
    /// Messages of the underlying causes, outermost first
    pub causes: Vec<String>,
}

impl StructuredError {
    /// Create a new structured error from an anyhow error and an exit code.
    #[must_use]
    pub fn new(err: &anyhow::Error, exit_code: ExitCode) -> Self {
        Self {
            code: exit_code.code_prefix().to_string(),
            exit_code: exit_code.as_i32(),
            message: err.to_string(),
            causes: err.chain().skip(1).map(ToString::to_string).collect(),
        }
    }
}
