//! CLI commands.

mod devices;
mod preview;
mod services;

use anyhow::Result;
use clap::{Parser, Subcommand};

use crate::client::ApiClient;
use crate::output::OutputFormat;

/// rig CLI - Preview builds and inspect device hardware.
#[derive(Debug, Parser)]
#[command(name = "rig")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Output format.
    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Table)]
    format: OutputFormat,

    /// Base URL of the device-hardware service.
    #[arg(
        long,
        global = true,
        env = "RIG_API_URL",
        default_value = "http://127.0.0.1:8090"
    )]
    api_url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Validate a parts file and show its capacity, without a service.
    Preview(preview::PreviewCommand),

    /// Inspect assembled devices.
    Devices(devices::DevicesCommand),

    /// Show the delivered allocation of a running service.
    Usage(services::UsageCommand),

    /// Show CLI version.
    Version,
}

impl Cli {
    /// Run the CLI command.
    pub async fn run(self) -> Result<()> {
        let ctx = CommandContext {
            format: self.format,
            api_url: self.api_url,
        };

        match self.command {
            Commands::Preview(cmd) => cmd.run(ctx),
            Commands::Devices(cmd) => cmd.run(ctx).await,
            Commands::Usage(cmd) => cmd.run(ctx).await,
            Commands::Version => {
                println!("rig {}", env!("CARGO_PKG_VERSION"));
                Ok(())
            }
        }
    }
}

/// Shared command context.
pub struct CommandContext {
    pub format: OutputFormat,
    pub api_url: String,
}

impl CommandContext {
    pub fn client(&self) -> Result<ApiClient> {
        ApiClient::new(&self.api_url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_global_flags() {
        let device = rig_id::DeviceId::new().to_string();
        let cli = Cli::try_parse_from([
            "rig",
            "--format",
            "json",
            "--api-url",
            "http://hw:9000",
            "devices",
            "resources",
            device.as_str(),
        ])
        .unwrap();
        assert_eq!(cli.format, OutputFormat::Json);
        assert_eq!(cli.api_url, "http://hw:9000");
    }

    #[test]
    fn test_rejects_malformed_device_id() {
        let result = Cli::try_parse_from(["rig", "devices", "parts", "not-an-id"]);
        assert!(result.is_err());
    }
}
