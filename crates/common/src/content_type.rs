use mime::Mime;

/// Infer the content type of a staged component from its file name.
///
/// Only a fixed set of extensions is recognised; anything else is staged as
/// opaque binary.
pub fn from_name(name: &str) -> Mime {
    let ext = match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => ext.to_ascii_lowercase(),
        _ => return mime::APPLICATION_OCTET_STREAM,
    };

    let known = match ext.as_str() {
        "md" | "markdown" => "text/markdown",
        "txt" => "text/plain",
        "json" => "application/json",
        "pdf" => "application/pdf",
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "tif" | "tiff" => "image/tiff",
        "svg" => "image/svg+xml",
        "html" | "htm" => "text/html",
        "xml" => "application/xml",
        "csv" => "text/csv",
        _ => return mime::APPLICATION_OCTET_STREAM,
    };

    known.parse().unwrap_or(mime::APPLICATION_OCTET_STREAM)
}
