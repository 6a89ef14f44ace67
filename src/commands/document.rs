use colored::Colorize;
use std::path::PathBuf;

use crate::document::IngestReport;
use crate::services::Services;

/// Runs the ingestion pipeline for the configured report, or for `pdf`
/// when one is given.
pub async fn handle_ingest(services: &Services, pdf: Option<PathBuf>) -> Result<(), String> {
    let source = &services.config.document;
    let path = pdf.unwrap_or_else(|| source.pdf_path.clone());
    let profile = &source.profile;

    println!("📄 Ingesting document: {}", path.display().to_string().bright_yellow());
    println!(
        "   Tagging as {} / {} / {} ({})",
        profile.access_level.to_string().bright_red(),
        profile.fund_id,
        profile.year,
        profile.source.dimmed()
    );

    let ingestor = services
        .ingestor()
        .map_err(|e| format!("Failed to set up ingestion: {}", e))?;
    let report = ingestor
        .ingest_pdf(&path, profile)
        .await
        .map_err(|e| format!("Ingestion failed: {}", e))?;

    match report {
        IngestReport::Skipped { path } => {
            println!(
                "{} File not found at {}. Nothing was indexed.",
                "⚠".yellow(),
                path.display()
            );
        }
        IngestReport::Completed { pages, chunks } => {
            println!(
                "{} Indexed {} chunks from {} pages.",
                "✓".green(),
                chunks.to_string().bright_green(),
                pages
            );
        }
    }
    Ok(())
}
