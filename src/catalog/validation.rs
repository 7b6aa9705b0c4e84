use std::path::Path;

use crate::models::Upload;

use super::error::{CatalogError, CatalogResult};

const PDF_EXTENSION: &str = "pdf";
const PDF_MIME: &str = "application/pdf";

/// Accept only PDF documents: the name must end in `.pdf` and the content
/// must carry the PDF signature. Returns the extension to use for the key.
pub(crate) fn validate_pdf(upload: &Upload) -> CatalogResult<&'static str> {
    let name = upload.file_name.trim();
    if name.is_empty() {
        return Err(CatalogError::validation("A PDF file is required."));
    }

    let has_pdf_extension = Path::new(name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case(PDF_EXTENSION))
        .unwrap_or(false);
    if !has_pdf_extension {
        return Err(CatalogError::validation(format!(
            "Only PDF files can be uploaded ('{name}')."
        )));
    }

    if upload.bytes.is_empty() {
        return Err(CatalogError::validation(format!("'{name}' is empty.")));
    }

    match infer::get(&upload.bytes) {
        Some(kind) if kind.mime_type() == PDF_MIME => Ok(PDF_EXTENSION),
        _ => Err(CatalogError::validation(format!(
            "'{name}' is not a valid PDF document."
        ))),
    }
}
