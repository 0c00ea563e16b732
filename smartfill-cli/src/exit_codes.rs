//! Exit codes following sysexits.h conventions.
//!
//! These codes let scripts tell a bad invocation apart from a missing photo
//! directory or an unusable cache.

use smartfill_core::SmartFillError;

/// Successful execution.
pub const SUCCESS: i32 = 0;

/// General error (catch-all).
pub const GENERAL_ERROR: i32 = 1;

/// Command line usage error (malformed frame size, bad option).
/// Maps to EX_USAGE from sysexits.h.
pub const USAGE_ERROR: i32 = 64;

/// Data format error (unparseable wall file).
/// Maps to EX_DATAERR from sysexits.h.
pub const DATA_ERROR: i32 = 65;

/// Cannot open input (photo directory or wall file).
/// Maps to EX_NOINPUT from sysexits.h.
pub const INPUT_ERROR: i32 = 66;

/// Analysis worker could not run.
/// Maps to EX_SOFTWARE from sysexits.h.
pub const SOFTWARE_ERROR: i32 = 70;

/// Cache read or write failed.
/// Maps to EX_IOERR from sysexits.h.
pub const IO_ERROR: i32 = 74;

/// Invalid SMARTFILL_* configuration.
/// Maps to EX_CONFIG from sysexits.h.
pub const CONFIG_ERROR: i32 = 78;

/// Text appended to `--help`.
pub const HELP_TEXT: &str = "Exit codes:
  0   success
  64  invalid arguments
  65  malformed wall file
  66  photo directory or wall file not found
  70  analysis worker failure
  74  cache I/O failure
  78  invalid SMARTFILL_* configuration";

/// Represents an exit code with optional error context.
pub struct ExitCode {
    pub code: i32,
    pub message: Option<String>,
}

impl ExitCode {
    pub const fn success() -> Self {
        Self {
            code: SUCCESS,
            message: None,
        }
    }

    pub fn from_anyhow(err: &anyhow::Error) -> Self {
        let message = format!("{err:#}");

        let typed = err
            .chain()
            .find_map(|cause| cause.downcast_ref::<SmartFillError>());
        let code = match typed {
            Some(SmartFillError::InvalidConfig(_)) => CONFIG_ERROR,
            Some(SmartFillError::CacheIo(_)) => IO_ERROR,
            Some(SmartFillError::WorkerUnavailable(_)) => SOFTWARE_ERROR,
            Some(SmartFillError::Library(_)) => INPUT_ERROR,
            _ => classify_message(&message),
        };

        Self {
            code,
            message: Some(message),
        }
    }
}

fn classify_message(message: &str) -> i32 {
    if message.contains("Invalid frame size") {
        USAGE_ERROR
    } else if message.contains("Failed to parse wall") {
        DATA_ERROR
    } else if message.contains("Failed to read") {
        INPUT_ERROR
    } else {
        GENERAL_ERROR
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::{anyhow, Context};

    #[test]
    fn test_typed_errors_win_over_message() {
        let err = Err::<(), _>(SmartFillError::InvalidConfig("SMARTFILL_EDGE_BAND must be > 0".into()))
            .context("Failed to read configuration")
            .unwrap_err();
        assert_eq!(ExitCode::from_anyhow(&err).code, CONFIG_ERROR);
    }

    #[test]
    fn test_message_classification() {
        assert_eq!(ExitCode::from_anyhow(&anyhow!("Invalid frame size: 4by6")).code, USAGE_ERROR);
        assert_eq!(
            ExitCode::from_anyhow(&anyhow!("Failed to parse wall file: x.json")).code,
            DATA_ERROR
        );
        assert_eq!(
            ExitCode::from_anyhow(&anyhow!("Failed to read wall file: x.json")).code,
            INPUT_ERROR
        );
        assert_eq!(ExitCode::from_anyhow(&anyhow!("boom")).code, GENERAL_ERROR);
    }
}
