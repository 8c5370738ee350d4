//! Output-format to content-type mapping.

/// Closed MIME table keyed by `output_format`. Unknown or empty formats fall
/// back to plain text.
pub fn content_type_for(output_format: &str) -> &'static str {
    match output_format {
        "html" => "text/html",
        "csv" => "text/csv",
        "json" => "application/json",
        "pdf" => "application/pdf",
        "xml" => "application/xml",
        _ => "text/plain",
    }
}

/// File extension used in object names, aligned with the MIME table.
pub fn extension_for(output_format: &str) -> &'static str {
    match output_format {
        "html" => "html",
        "csv" => "csv",
        "json" => "json",
        "pdf" => "pdf",
        "xml" => "xml",
        _ => "txt",
    }
}
