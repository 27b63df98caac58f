use std::process::ExitCode;

use super::commands::CommandResult;

/// Exit status for CLI commands.
///
/// - `Success` (0): the scan completed without error-severity diagnostics
/// - `Failure` (1): the scan completed, but files failed to parse or custom
///   function signatures are ambiguous
/// - `Error` (2): invalid configuration, invalid input or an I/O failure
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ExitStatus {
    Success,
    Failure,
    Error,
}

impl From<&CommandResult> for ExitStatus {
    fn from(result: &CommandResult) -> Self {
        if result.error_count > 0 {
            ExitStatus::Failure
        } else {
            ExitStatus::Success
        }
    }
}

impl From<ExitStatus> for ExitCode {
    fn from(status: ExitStatus) -> Self {
        match status {
            ExitStatus::Success => ExitCode::from(0),
            ExitStatus::Failure => ExitCode::from(1),
            ExitStatus::Error => ExitCode::from(2),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_code_values() {
        assert_eq!(ExitCode::from(ExitStatus::Success), ExitCode::from(0));
        assert_eq!(ExitCode::from(ExitStatus::Failure), ExitCode::from(1));
        assert_eq!(ExitCode::from(ExitStatus::Error), ExitCode::from(2));
    }

    #[test]
    fn errors_fail_the_run() {
        let clean = CommandResult::init(true);
        assert_eq!(ExitStatus::from(&clean), ExitStatus::Success);

        let failed = CommandResult {
            error_count: 1,
            ..CommandResult::init(true)
        };
        assert_eq!(ExitStatus::from(&failed), ExitStatus::Failure);
    }
}
