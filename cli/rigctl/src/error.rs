//! Error handling and display for the CLI.

use colored::Colorize;
use thiserror::Error;

/// CLI-specific errors.
#[derive(Debug, Error)]
pub enum CliError {
    #[error("API error ({code}): {detail}")]
    Api {
        status: u16,
        code: String,
        detail: String,
        request_id: Option<String>,
    },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Build rejected: {0}")]
    Incompatible(#[from] rig_hardware::CompatibilityError),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl CliError {
    pub fn api(
        status: u16,
        code: impl Into<String>,
        detail: impl Into<String>,
        request_id: Option<String>,
    ) -> Self {
        Self::Api {
            status,
            code: code.into(),
            detail: detail.into(),
            request_id,
        }
    }

    /// Turn a 404 from the service into a readable message.
    pub fn not_found_as(self, what: impl FnOnce() -> String) -> Self {
        match self {
            CliError::Api { status: 404, .. } => CliError::NotFound(what()),
            other => other,
        }
    }
}

/// Print an error in a user-friendly format.
pub fn print_error(err: &anyhow::Error) {
    eprintln!("{} {}", "Error:".red().bold(), err);

    if let Some(cli_err) = err.downcast_ref::<CliError>() {
        match cli_err {
            CliError::Api { status: 403, .. } => {
                eprintln!(
                    "\n{}",
                    "Hint: The device belongs to another user.".yellow()
                );
            }
            CliError::Api {
                request_id: Some(request_id),
                ..
            } => {
                eprintln!("\nRequest ID: {}", request_id);
            }
            CliError::Network(_) => {
                eprintln!(
                    "\n{}",
                    "Hint: Check that the service is running and --api-url is correct.".yellow()
                );
            }
            CliError::Incompatible(_) => {
                eprintln!(
                    "\n{}",
                    "Hint: Run `rig preview --catalog <file>` to check against another catalog."
                        .yellow()
                );
            }
            _ => {}
        }
    }
}
