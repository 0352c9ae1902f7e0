//! Field sanitization applied before anything is put on the wire.

/// Replace every CR and LF with a space so the value cannot split a line.
pub fn sanitize_line(value: &str) -> String {
    value.replace(['\r', '\n'], " ")
}

/// Like [`sanitize_line`], and also replace the `|` field separator.
///
/// Used for values embedded in multi-field lines (names, editor IDs,
/// plugin file names).
pub fn sanitize_field(value: &str) -> String {
    value.replace(['\r', '\n', '|'], " ")
}
