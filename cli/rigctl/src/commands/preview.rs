//! Offline build preview.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;
use rig_hardware::{preview_build, Catalog, PartSelection, Resources};
use serde::Serialize;

use crate::error::CliError;
use crate::output::{amount, print_output, print_single, print_success, resource_rows, OutputFormat};

use super::CommandContext;

/// Validate a parts file against a catalog.
#[derive(Debug, Args)]
pub struct PreviewCommand {
    /// JSON file with the parts selection.
    parts: PathBuf,

    /// Catalog document. Defaults to the bundled catalog.
    #[arg(long, env = "RIG_CATALOG_PATH")]
    catalog: Option<PathBuf>,
}

#[derive(Debug, Serialize)]
struct PreviewOutput {
    success: bool,
    performance: Resources,
}

impl PreviewCommand {
    pub fn run(self, ctx: CommandContext) -> Result<()> {
        let catalog = match &self.catalog {
            Some(path) => Catalog::load(path)?,
            None => Catalog::bundled()?,
        };
        let selection = read_selection(&self.parts)?;
        let performance = preview_build(&catalog, &selection).map_err(CliError::from)?;

        match ctx.format {
            OutputFormat::Table => {
                print_success("Parts are compatible");
                print_output(&resource_rows(&performance, amount), ctx.format);
            }
            OutputFormat::Json => print_single(&PreviewOutput {
                success: true,
                performance,
            }),
        }
        Ok(())
    }
}

fn read_selection(path: &Path) -> Result<PartSelection> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read parts file: {}", path.display()))?;
    serde_json::from_str(&contents)
        .with_context(|| format!("invalid parts file: {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn parts_file(json: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(json.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_read_selection() {
        let file = parts_file(
            r#"{
                "mainboard": "Zero MX One",
                "cpu": ["CoreOne A100"],
                "ram": ["Crossfire ZX100"],
                "disk": ["HDD Elements Zero"],
                "processorCooler": ["CPU Cooler Mini"],
                "powerPack": "Crossfire XSOne 250 Watt",
                "case": "Mini-ITX"
            }"#,
        );
        let selection = read_selection(file.path()).unwrap();
        let performance = preview_build(&Catalog::bundled().unwrap(), &selection).unwrap();
        assert_eq!(performance.cpu, 800.0);
    }

    #[test]
    fn test_incompatible_build_is_reported() {
        let file = parts_file(
            r#"{
                "mainboard": "Zero MX One",
                "ram": ["Crossfire ZX100"],
                "disk": ["HDD Elements Zero"],
                "powerPack": "Crossfire XSOne 250 Watt",
                "case": "Mini-ITX"
            }"#,
        );
        let cmd = PreviewCommand {
            parts: file.path().to_path_buf(),
            catalog: None,
        };
        let ctx = CommandContext {
            format: OutputFormat::Json,
            api_url: String::new(),
        };

        let err = cmd.run(ctx).unwrap_err();
        let cli_err = err.downcast_ref::<CliError>().unwrap();
        assert_eq!(cli_err.to_string(), "Build rejected: missing_cpu");
    }

    #[test]
    fn test_malformed_parts_file() {
        let file = parts_file(r#"{"cpu": 1}"#);
        let err = read_selection(file.path()).unwrap_err();
        assert!(err.to_string().starts_with("invalid parts file"));
    }
}
