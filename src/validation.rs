//! Input validation for the file-lifecycle domain: names, paths, reasons.

use crate::error::{Error, Result, ValidationErrors};

fn single(field: &str, message: impl Into<String>) -> Error {
    Error::Validation(ValidationErrors::Single {
        field: field.to_string(),
        message: message.into(),
    })
}

/// Validates a file's display name: non-empty, printable, reasonably short.
/// Uniqueness is enforced at the project level by the caller's query, not here.
pub fn validate_file_name(name: &str) -> Result<()> {
    let name = name.trim();
    if name.is_empty() {
        return Err(single("name", "file name cannot be empty"));
    }
    if name.len() > 255 {
        return Err(single("name", "file name must be 255 characters or fewer"));
    }
    if name.contains('/') || name.contains('\\') {
        return Err(single("name", "file name cannot contain path separators"));
    }
    if name.chars().any(|c| c.is_control()) {
        return Err(single("name", "file name cannot contain control characters"));
    }
    Ok(())
}

/// Normalizes a logical path: ensures a leading `/`, collapses duplicate
/// `/`, strips a trailing `/` (unless it is the root), and rejects `..` segments.
pub fn normalize_path(path: &str) -> Result<String> {
    if path.chars().any(|c| c.is_control()) {
        return Err(single("path", "path cannot contain control characters"));
    }

    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    if segments.iter().any(|s| *s == "..") {
        return Err(single("path", "path cannot contain '..' segments"));
    }

    if segments.is_empty() {
        return Ok("/".to_string());
    }
    Ok(format!("/{}", segments.join("/")))
}

/// Validates a MIME type is present and has the `type/subtype` shape.
pub fn validate_mime_type(mime_type: &str) -> Result<()> {
    let mime_type = mime_type.trim();
    if mime_type.is_empty() {
        return Err(single("mimeType", "MIME type cannot be empty"));
    }
    if !mime_type.contains('/') || mime_type.starts_with('/') || mime_type.ends_with('/') {
        return Err(single("mimeType", "MIME type must be of the form type/subtype"));
    }
    Ok(())
}

/// Validates an optional free-form reason/message (lock reason, checkin message,
/// deletion reason): bounded length, no control characters.
pub fn validate_reason(reason: &str, field: &str, max_len: usize) -> Result<()> {
    if reason.len() > max_len {
        return Err(single(field, format!("must be {} characters or fewer", max_len)));
    }
    if reason.chars().any(|c| c.is_control() && c != '\n' && c != '\t') {
        return Err(single(field, "cannot contain control characters"));
    }
    Ok(())
}

/// Validates a hex-encoded SHA-256 content hash (64 lowercase hex chars).
pub fn validate_content_hash(hash: &str) -> Result<()> {
    if hash.len() != 64 || !hash.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()) {
        return Err(single("contentHash", "must be 64 lowercase hex characters"));
    }
    Ok(())
}
