//! File classification by name and content.
//!
//! Every file gets exactly one classification, decided in priority order:
//! archive extension, then source extension, then a content-vs-extension
//! mismatch from the signature catalog, then Other. The extension lists are
//! matched exactly (lowercase only); the catalog comparison underneath is
//! case-insensitive. That asymmetry is deliberate and pinned by tests.

use std::io::Read;
use std::path::Path;

use crate::signatures;

/// Extensions treated as archives (copied to the archive bucket and handed to
/// the unpacker). Note `tgz`/`tbz2`/`txz` are archives here even though no
/// unpack operation exists for them.
const ARCHIVE_EXTENSIONS: &[&str] = &[
    "tar", "gz", "bz2", "xz", "zip", "rar", "7z", "tgz", "tbz2", "txz",
];

/// C and C++ source and header extensions.
const SOURCE_EXTENSIONS: &[&str] = &["c", "h", "cpp", "cc", "cxx", "hpp", "hxx"];

/// What a file turned out to be.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    /// C/C++ source or header, by extension.
    SourceCode,
    /// Nested archive, by extension.
    Archive,
    /// Content signature disagrees with the extension.
    DisguisedExtension,
    /// Everything else.
    Other,
}

impl FileKind {
    /// Label used in the per-file report lines.
    pub fn reason(self) -> &'static str {
        match self {
            FileKind::SourceCode => "C source file",
            FileKind::Archive => "archive",
            FileKind::DisguisedExtension => "modified extension file",
            FileKind::Other => "other file",
        }
    }
}

/// Extension of a file name, without the dot.
///
/// Follows `Path::extension` semantics: dotless names and leading-dot names
/// (`.bashrc`) have no extension.
pub fn extension_of(name: &str) -> Option<&str> {
    Path::new(name).extension().and_then(|ext| ext.to_str())
}

fn is_archive_name(name: &str) -> bool {
    extension_of(name)
        .map(|ext| ARCHIVE_EXTENSIONS.contains(&ext))
        .unwrap_or(false)
}

fn is_source_name(name: &str) -> bool {
    extension_of(name)
        .map(|ext| SOURCE_EXTENSIONS.contains(&ext))
        .unwrap_or(false)
}

/// Classify a file from its name and the first bytes of its content.
pub fn classify(name: &str, head: &[u8]) -> FileKind {
    if is_archive_name(name) {
        FileKind::Archive
    } else if is_source_name(name) {
        FileKind::SourceCode
    } else if signatures::is_disguised(head, extension_of(name)) {
        FileKind::DisguisedExtension
    } else {
        FileKind::Other
    }
}

/// Classify a file on disk.
///
/// Content is read only when the name alone does not decide; an unreadable
/// file yields an empty head, which the catalog treats as no opinion.
pub fn classify_file(path: &Path) -> FileKind {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    if is_archive_name(&name) {
        return FileKind::Archive;
    }
    if is_source_name(&name) {
        return FileKind::SourceCode;
    }
    classify(&name, &read_head(path))
}

/// First bytes of a file, up to the catalog's signature window.
///
/// Open or read failures yield whatever could be read, possibly nothing.
fn read_head(path: &Path) -> Vec<u8> {
    let mut head = Vec::with_capacity(signatures::HEAD_LEN);
    if let Ok(file) = std::fs::File::open(path) {
        file.take(signatures::HEAD_LEN as u64)
            .read_to_end(&mut head)
            .ok();
    }
    head
}
