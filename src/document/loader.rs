use std::path::Path;

use super::DocumentError;

/// Extracts the text of each page of a PDF, in page order.
pub async fn load_pdf_pages(path: &Path) -> Result<Vec<String>, DocumentError> {
    let owned = path.to_path_buf();
    // pdf-extract is synchronous and CPU bound
    let pages = tokio::task::spawn_blocking(move || pdf_extract::extract_text_by_pages(&owned))
        .await
        .map_err(|e| DocumentError::Extraction(e.to_string()))?
        .map_err(|e| DocumentError::Extraction(e.to_string()))?;

    log::info!("Loaded {} pages from {}", pages.len(), path.display());
    Ok(pages)
}
