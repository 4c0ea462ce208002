//! Service usage command.

use anyhow::Result;
use clap::Args;
use rig_hardware::Resources;
use rig_id::ServiceId;
use serde::{Deserialize, Serialize};

use crate::output::{amount, print_output, print_single, resource_rows, OutputFormat};

use super::CommandContext;

#[derive(Debug, Args)]
pub struct UsageCommand {
    /// Service ID.
    service: ServiceId,
}

#[derive(Debug, Serialize, Deserialize)]
struct UsageResponse {
    service_id: ServiceId,
    #[serde(flatten)]
    delivered: Resources,
}

impl UsageCommand {
    pub async fn run(self, ctx: CommandContext) -> Result<()> {
        let client = ctx.client()?;
        let service = self.service;

        let usage: UsageResponse = client
            .get(&format!("/v1/hardware/services/{service}/usage"))
            .await
            .map_err(|e| e.not_found_as(|| format!("Service '{service}' is not running")))?;

        match ctx.format {
            OutputFormat::Table => {
                print_output(&resource_rows(&usage.delivered, amount), ctx.format)
            }
            OutputFormat::Json => print_single(&usage),
        }
        Ok(())
    }
}
