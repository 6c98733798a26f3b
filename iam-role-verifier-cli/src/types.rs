//! CLI-specific type definitions.
//!
//! This module contains types that are specific to the CLI binary and should
//! not be part of the core library.

/// Exit codes for the CLI application.
///
/// - 0 indicates every check passed
/// - 1 indicates the run completed but found violations
/// - 2 indicates the run was aborted (fetch, parse, outputs or configuration failure)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCode {
    /// All checks passed
    Success,

    /// One or more expectations did not hold
    Violations,

    /// Verification could not be completed
    Error,
}

impl ExitCode {
    /// Convert to the integer exit code for process::exit()
    pub fn code(self) -> i32 {
        match self {
            Self::Success => 0,
            Self::Violations => 1,
            Self::Error => 2,
        }
    }

    /// Exit code for a finished run
    pub fn from_passed(passed: bool) -> Self {
        if passed {
            Self::Success
        } else {
            Self::Violations
        }
    }
}

impl From<ExitCode> for i32 {
    fn from(exit_code: ExitCode) -> Self {
        exit_code.code()
    }
}
