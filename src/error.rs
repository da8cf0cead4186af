//! Error types for exec-runner.

use std::time::Duration;

use thiserror::Error;

use crate::execution::SuccessCodes;

/// Exit code reported when no process could be attempted at all.
pub const GENERIC_FAILURE_CODE: i32 = 1;

/// Exit code reported when the program could not be found (shell convention).
pub const NOT_FOUND_CODE: i32 = 127;

/// Exit code reported when the program exists but cannot be executed.
pub const NOT_EXECUTABLE_CODE: i32 = 126;

/// Exit code reported when a run is stopped by its timeout.
pub const TIMEOUT_CODE: i32 = 124;

/// Failure of a single process run.
///
/// Every variant maps to an integer exit code through
/// [`ExecError::exit_code`], so callers can branch on it the same way
/// regardless of why the run failed.
#[derive(Error, Debug)]
pub enum ExecError {
    /// The program name was empty or only whitespace.
    #[error("The \"program\" argument is required")]
    MissingProgram,

    /// The process exited with a code outside the accepted set.
    #[error("Expected success codes were \"{expected}\", but the process exited with \"{actual}\".")]
    UnexpectedExitCode {
        expected: SuccessCodes,
        actual: i32,
    },

    /// The OS refused to start the program.
    #[error("failed to start \"{program}\": {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// Waiting on the child failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The process outlived its timeout and was killed.
    #[error("process did not finish within {timeout:?} and was killed")]
    TimedOut { timeout: Duration },
}

impl ExecError {
    /// The exit code attributed to this failure.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::MissingProgram => GENERIC_FAILURE_CODE,
            Self::UnexpectedExitCode { actual, .. } => *actual,
            Self::Spawn { source, .. } => match source.kind() {
                std::io::ErrorKind::NotFound => NOT_FOUND_CODE,
                std::io::ErrorKind::PermissionDenied => NOT_EXECUTABLE_CODE,
                _ => GENERIC_FAILURE_CODE,
            },
            Self::Io(_) => GENERIC_FAILURE_CODE,
            Self::TimedOut { .. } => TIMEOUT_CODE,
        }
    }
}

/// Convenience Result type for exec-runner operations.
pub type Result<T> = std::result::Result<T, ExecError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::ErrorKind;

    #[test]
    fn test_missing_program() {
        let err = ExecError::MissingProgram;
        assert_eq!(err.exit_code(), 1);
        assert!(err.to_string().contains("\"program\""));
    }

    #[test]
    fn test_unexpected_exit_code_message() {
        let err = ExecError::UnexpectedExitCode {
            expected: SuccessCodes::from([0, 123]),
            actual: 5,
        };
        assert_eq!(err.exit_code(), 5);
        assert_eq!(
            err.to_string(),
            "Expected success codes were \"0,123\", but the process exited with \"5\"."
        );
    }

    #[test]
    fn test_spawn_codes() {
        let spawn = |kind| ExecError::Spawn {
            program: "_NOPE".into(),
            source: std::io::Error::new(kind, "boom"),
        };
        assert_eq!(spawn(ErrorKind::NotFound).exit_code(), 127);
        assert_eq!(spawn(ErrorKind::PermissionDenied).exit_code(), 126);
        assert_eq!(spawn(ErrorKind::Other).exit_code(), 1);
        assert!(spawn(ErrorKind::NotFound).to_string().contains("_NOPE"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(ErrorKind::BrokenPipe, "pipe closed");
        let err: ExecError = io_err.into();
        assert!(matches!(err, ExecError::Io(_)));
        assert_eq!(err.exit_code(), 1);
    }

    #[test]
    fn test_timeout_display() {
        let err = ExecError::TimedOut {
            timeout: Duration::from_millis(250),
        };
        assert_eq!(err.exit_code(), 124);
        assert!(err.to_string().contains("250ms"));
    }
}
