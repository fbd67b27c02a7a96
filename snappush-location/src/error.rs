use std::process::ExitStatus;

use thiserror::Error;

/// Error surface for location parsing and command execution.
#[derive(Debug, Error)]
pub enum LocationError {
    #[error("I/O error during {context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("command failed ({status}): {command}{}", stderr_suffix(.stderr))]
    CommandFailed {
        command: String,
        status: ExitStatus,
        stderr: String,
    },

    #[error("invalid location '{spec}': {reason}")]
    InvalidSpec { spec: String, reason: &'static str },

    #[error("listing from {location} is not valid UTF-8")]
    NonUtf8Listing { location: String },
}

fn stderr_suffix(stderr: &str) -> String {
    if stderr.is_empty() {
        String::new()
    } else {
        format!(": {stderr}")
    }
}

pub(crate) fn io_err(context: impl Into<String>, source: std::io::Error) -> LocationError {
    LocationError::Io {
        context: context.into(),
        source,
    }
}
