//! Device commands.

use anyhow::Result;
use clap::{Args, Subcommand};
use rig_hardware::Resources;
use rig_id::DeviceId;
use serde::{Deserialize, Serialize};
use tabled::Tabled;

use crate::output::{percent, print_output, print_single, resource_rows, OutputFormat};

use super::CommandContext;

/// Device commands.
#[derive(Debug, Args)]
pub struct DevicesCommand {
    #[command(subcommand)]
    command: DevicesSubcommand,
}

#[derive(Debug, Subcommand)]
enum DevicesSubcommand {
    /// Show the utilization of each resource.
    Resources(DeviceArgs),

    /// List the hardware installed in a device.
    Parts(DeviceArgs),
}

#[derive(Debug, Args)]
struct DeviceArgs {
    /// Device ID.
    device: DeviceId,
}

impl DevicesCommand {
    pub async fn run(self, ctx: CommandContext) -> Result<()> {
        match self.command {
            DevicesSubcommand::Resources(args) => resources(ctx, args).await,
            DevicesSubcommand::Parts(args) => parts(ctx, args).await,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Tabled)]
struct PartResponse {
    #[tabled(rename = "ID")]
    id: String,

    #[tabled(rename = "Category")]
    category: String,

    #[tabled(rename = "Part")]
    catalog_key: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct ListPartsResponse {
    items: Vec<PartResponse>,
}

async fn resources(ctx: CommandContext, args: DeviceArgs) -> Result<()> {
    let client = ctx.client()?;

    let utilization: Resources = client
        .get(&format!("/v1/hardware/devices/{}/resources", args.device))
        .await
        .map_err(|e| e.not_found_as(|| format!("Device '{}' not found", args.device)))?;

    match ctx.format {
        OutputFormat::Table => print_output(&resource_rows(&utilization, percent), ctx.format),
        OutputFormat::Json => print_single(&utilization),
    }
    Ok(())
}

async fn parts(ctx: CommandContext, args: DeviceArgs) -> Result<()> {
    let client = ctx.client()?;

    let response: ListPartsResponse = client
        .get(&format!("/v1/hardware/devices/{}/parts", args.device))
        .await
        .map_err(|e| e.not_found_as(|| format!("Device '{}' has no hardware", args.device)))?;

    match ctx.format {
        OutputFormat::Table => print_output(&response.items, ctx.format),
        OutputFormat::Json => print_single(&response),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_resources_not_found() {
        let server = MockServer::start().await;
        let device = DeviceId::new();
        Mock::given(method("GET"))
            .and(path(format!("/v1/hardware/devices/{device}/resources")))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({
                "code": "device_not_found",
                "detail": "device not found",
            })))
            .mount(&server)
            .await;

        let ctx = CommandContext {
            format: OutputFormat::Json,
            api_url: server.uri(),
        };
        let err = resources(ctx, DeviceArgs { device }).await.unwrap_err();
        assert_eq!(
            err.to_string(),
            format!("Not found: Device '{device}' not found")
        );
    }

    #[tokio::test]
    async fn test_parts_listing() {
        let server = MockServer::start().await;
        let device = DeviceId::new();
        Mock::given(method("GET"))
            .and(path(format!("/v1/hardware/devices/{device}/parts")))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "items": [{
                    "id": "hw_01HZX",
                    "device_id": device,
                    "catalog_key": "Zero MX One",
                    "category": "mainboard",
                }],
            })))
            .expect(1)
            .mount(&server)
            .await;

        let ctx = CommandContext {
            format: OutputFormat::Table,
            api_url: server.uri(),
        };
        parts(ctx, DeviceArgs { device }).await.unwrap();
    }
}
