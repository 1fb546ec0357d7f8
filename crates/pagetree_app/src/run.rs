use std::fs;

use anyhow::{bail, Context, Result};
use engine_logging::{engine_error, engine_info};

use pagetree_core::WalkSession;
use pagetree_engine::{ConfluenceClient, ExportAction, MarkdownPipeline, MigrationFlagAction};

use crate::cli::Cli;

/// Run the mode selected on the command line.
pub fn run(cli: &Cli) -> Result<()> {
    if let Some(template_path) = &cli.mark_migrated {
        return mark_migrated(cli, template_path);
    }
    if !cli.no_fetch {
        export(cli)?;
    }
    convert(cli)
}

fn export(cli: &Cli) -> Result<()> {
    let client = ConfluenceClient::new(cli.client_settings())
        .with_context(|| format!("invalid instance url {}", cli.url))?;
    let mut action = ExportAction::new(&client, cli.skip_attachments);
    let mut session = WalkSession::new(&client, &cli.out_dir, cli.walk_settings());
    session.walk_instance(&mut action).context("export failed")?;

    let summary = session.into_summary();
    engine_info!(
        "Exported {} pages and {} attachments from {} spaces ({} pages ignored)",
        action.pages_written(),
        action.attachments_written(),
        summary.spaces_processed,
        summary.pages_ignored
    );
    if !summary.spaces_without_root.is_empty() {
        engine_error!(
            "Spaces without a home page were skipped: {}",
            summary.spaces_without_root.join(", ")
        );
        bail!(
            "{} spaces have no home page",
            summary.spaces_without_root.len()
        );
    }
    Ok(())
}

fn convert(cli: &Cli) -> Result<()> {
    let pipeline = MarkdownPipeline::new(&cli.out_dir, cli.pipeline_settings())
        .with_context(|| format!("failed to index {}", cli.out_dir.display()))?;
    pipeline.convert_all().context("conversion failed")?;
    Ok(())
}

fn mark_migrated(cli: &Cli, template_path: &std::path::Path) -> Result<()> {
    let template = fs::read_to_string(template_path)
        .with_context(|| format!("failed to read template {}", template_path.display()))?;
    let client = ConfluenceClient::new(cli.client_settings())
        .with_context(|| format!("invalid instance url {}", cli.url))?;
    let pipeline = MarkdownPipeline::new(&cli.out_dir, cli.pipeline_settings())
        .with_context(|| format!("failed to index {}", cli.out_dir.display()))?;

    let mut action = MigrationFlagAction::new(&pipeline, &client, template);
    let mut session = WalkSession::new(&client, &cli.out_dir, cli.walk_settings());
    session
        .walk_instance(&mut action)
        .context("marking pages as migrated failed")?;
    engine_info!("Marked {} pages as migrated", action.marked());
    Ok(())
}
