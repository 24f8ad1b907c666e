//! Normalize command - run captured model output through the pipeline offline.

use std::fs;
use std::io::Read;
use std::path::PathBuf;

use clap::Args;

use invex_core::{extract_invoice, normalize_output, ExtractionError, ItemPolicy};

use super::extract::report;
use crate::output::{format_invoice, OutputFormat};

/// Arguments for the normalize command.
#[derive(Args)]
pub struct NormalizeArgs {
    /// File with raw model output (default or "-": stdin)
    input: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "json")]
    format: OutputFormat,

    /// Print the shape-repaired mapping instead of the validated record
    #[arg(long)]
    repaired_only: bool,

    /// Drop malformed line items instead of failing
    #[arg(long)]
    skip_invalid_items: bool,

    /// Report inconsistencies between totals and items
    #[arg(long)]
    validate: bool,
}

pub async fn run(args: NormalizeArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let mut config = super::load_config(config_path)?;
    if args.skip_invalid_items {
        config.normalize.item_policy = ItemPolicy::SkipInvalid;
    }

    let raw = match &args.input {
        Some(path) if path.as_os_str() != "-" => fs::read_to_string(path)?,
        _ => {
            let mut buffer = String::new();
            std::io::stdin().read_to_string(&mut buffer)?;
            buffer
        }
    };

    if args.repaired_only {
        let normalized = normalize_output(&raw, &config.normalize)
            .map_err(|e| ExtractionError::new(e, &raw))?;
        println!("{}", serde_json::to_string_pretty(&normalized.to_value()?)?);
        return Ok(());
    }

    let result = extract_invoice(&raw, &config.normalize)?;
    report(&result, args.validate);
    println!("{}", format_invoice(&result.invoice, args.format)?);

    Ok(())
}
