//! Extract command - send a single invoice document to the model.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use clap::Args;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, info};

use invex_core::{extract_invoice, prepare_document, ExtractionResult, InvexConfig, ItemPolicy};

use crate::client::ModelClient;
use crate::output::{format_invoice, OutputFormat};

/// Arguments for the extract command.
#[derive(Args)]
pub struct ExtractArgs {
    /// Input file (PDF or image)
    #[arg(required = true)]
    input: PathBuf,

    /// Output file (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "json")]
    format: OutputFormat,

    /// Override the configured primary model
    #[arg(short, long)]
    model: Option<String>,

    /// Drop malformed line items instead of failing
    #[arg(long)]
    skip_invalid_items: bool,

    /// Also write the raw model response to this file
    #[arg(long)]
    raw_output: Option<PathBuf>,

    /// Report inconsistencies between totals and items
    #[arg(long)]
    validate: bool,
}

pub async fn run(args: ExtractArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let start = Instant::now();

    let mut config = super::load_config(config_path)?;
    if let Some(model) = &args.model {
        config.model.primary_model = model.clone();
    }
    if args.skip_invalid_items {
        config.normalize.item_policy = ItemPolicy::SkipInvalid;
    }

    if !args.input.exists() {
        anyhow::bail!("Input file not found: {}", args.input.display());
    }

    info!("Processing file: {}", args.input.display());

    let client = ModelClient::from_env(&config.model)?;

    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::default_spinner().template("{spinner:.green} [{elapsed_precise}] {msg}")?);

    let result = extract_file(&args.input, &client, &config, &pb, args.raw_output.as_deref()).await;
    pb.finish_and_clear();
    let result = result?;

    report(&result, args.validate);

    let output = format_invoice(&result.invoice, args.format)?;
    if let Some(output_path) = &args.output {
        fs::write(output_path, &output)?;
        println!(
            "{} Output written to {}",
            style("✓").green(),
            output_path.display()
        );
    } else {
        println!("{}", output);
    }

    debug!("Total processing time: {:?}", start.elapsed());

    Ok(())
}

/// Read, prepare, send and normalize one document.
pub async fn extract_file(
    path: &Path,
    client: &ModelClient,
    config: &InvexConfig,
    pb: &ProgressBar,
    raw_output: Option<&Path>,
) -> anyhow::Result<ExtractionResult> {
    pb.set_message("Preparing document...");
    let bytes = fs::read(path)?;
    let input = prepare_document(bytes, &config.document)?;

    pb.set_message(format!("Waiting for {}...", config.model.primary_model));
    let raw = client.extract(&input).await?;

    if let Some(raw_path) = raw_output {
        fs::write(raw_path, &raw)?;
        debug!("Raw model output saved to {}", raw_path.display());
    }

    pb.set_message("Normalizing...");
    Ok(extract_invoice(&raw, &config.normalize)?)
}

/// Print warnings, skipped items and optional consistency issues to stderr.
pub fn report(result: &ExtractionResult, validate: bool) {
    for warning in &result.warnings {
        eprintln!("{} {}", style("⚠").yellow(), warning);
    }

    if validate {
        let issues = result.invoice.consistency_issues();
        if !issues.is_empty() {
            eprintln!("{}", style("Validation issues:").yellow());
            for issue in &issues {
                eprintln!("  - {}", issue);
            }
        }
    }
}
