//! Static extension → MIME type table.

/// Resolve the content type for a lower-cased extension without a leading dot.
///
/// Backed by the `mime_guess` table, so the result is deterministic for a
/// given build. Returns `None` for extensions the table does not know.
pub fn lookup(extension: &str) -> Option<&'static str> {
    mime_guess::from_ext(extension).first_raw()
}
