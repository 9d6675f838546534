//! Exit codes for the reconcile CLI.
//!
//! Automation reads the outcome from the code, not from the report:
//! - 0: every module reconciled and the candidate was accepted
//! - 1: an open error-severity conflict, an unresolvable module or a
//!   rejected candidate
//! - 2: malformed input (snapshot documents, configuration, manifest);
//!   takes precedence over 1

/// Exit codes for reconcile runs.
///
/// These codes are a stable contract for automation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(i32)]
pub enum ExitCode {
    /// Every module accepted.
    Accepted = 0,

    /// At least one module has blocking conflicts or was not accepted.
    Conflicts = 1,

    /// Some input could not be read or parsed.
    MalformedInput = 2,
}

impl ExitCode {
    /// Convert to i32 for process exit.
    pub fn as_i32(self) -> i32 {
        self as i32
    }

    pub fn is_success(self) -> bool {
        self == ExitCode::Accepted
    }

    /// Combine two outcomes; the more severe code wins.
    pub fn worst(self, other: ExitCode) -> ExitCode {
        self.max(other)
    }

    /// Get the code name as a string constant (for JSON output).
    pub fn code_name(&self) -> &'static str {
        match self {
            ExitCode::Accepted => "OK_ACCEPTED",
            ExitCode::Conflicts => "ERR_CONFLICTS",
            ExitCode::MalformedInput => "ERR_MALFORMED_INPUT",
        }
    }
}

impl From<ExitCode> for std::process::ExitCode {
    fn from(code: ExitCode) -> Self {
        std::process::ExitCode::from(code as u8)
    }
}

impl std::fmt::Display for ExitCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.code_name(), self.as_i32())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_code_values() {
        assert_eq!(ExitCode::Accepted.as_i32(), 0);
        assert_eq!(ExitCode::Conflicts.as_i32(), 1);
        assert_eq!(ExitCode::MalformedInput.as_i32(), 2);
    }

    #[test]
    fn test_malformed_takes_precedence() {
        assert_eq!(
            ExitCode::Conflicts.worst(ExitCode::MalformedInput),
            ExitCode::MalformedInput
        );
        assert_eq!(
            ExitCode::Accepted.worst(ExitCode::Conflicts),
            ExitCode::Conflicts
        );
        assert_eq!(
            ExitCode::MalformedInput.worst(ExitCode::Accepted),
            ExitCode::MalformedInput
        );
    }

    #[test]
    fn test_display() {
        assert_eq!(ExitCode::Conflicts.to_string(), "ERR_CONFLICTS (1)");
        assert!(ExitCode::Accepted.is_success());
        assert!(!ExitCode::MalformedInput.is_success());
    }
}
