//! Flat destination names for files copied out of a nested tree.
//!
//! Every classified file lands in a flat bucket directory, so files that share
//! a base name but come from different nesting paths would otherwise collide.
//! The accumulated lineage (archive and directory names, slash-joined) is
//! folded into the destination name as a bracketed prefix, with separators and
//! reserved characters replaced so the whole thing stays a single file name.

/// Make a lineage string safe to embed in a file name.
///
/// `/` and `\` become `@`; the reserved characters `: * ? " < > |` become `#`.
/// Everything else passes through untouched.
pub fn sanitize_prefix(prefix: &str) -> String {
    prefix
        .chars()
        .map(|c| match c {
            '/' | '\\' => '@',
            ':' | '*' | '?' | '"' | '<' | '>' | '|' => '#',
            other => other,
        })
        .collect()
}

/// Destination file name for a copied file.
///
/// `[lineage]name` when the file came out of a nested layer, the bare name for
/// top-level files (empty prefix).
pub fn dest_file_name(prefix: &str, file_name: &str) -> String {
    if prefix.is_empty() {
        file_name.to_string()
    } else {
        format!("[{}]{}", sanitize_prefix(prefix), file_name)
    }
}
