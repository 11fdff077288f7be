//! Archive format tags and the name lookup that selects them.
//!
//! Unpacking is keyed by a format tag derived purely from the file name.
//! The lookup has no fallback: names it does not recognize simply have no
//! unpack operation, even when the classifier calls them archives
//! (`.tgz` and friends classify as archives but stay unmapped).

use std::fmt;

use crate::classify;

/// Formats with a known unpack operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveFormat {
    TarGz,
    TarBz2,
    TarXz,
    Tar,
    Gzip,
    Bzip2,
    Xz,
    Zip,
    SevenZip,
    Rar,
}

impl ArchiveFormat {
    /// Map a file name to its unpack format.
    ///
    /// Compound `.tar.*` names are checked before the single-extension forms,
    /// so `backup.tar.gz` is a tar extraction rather than a bare gzip
    /// decompress. Matching is case-sensitive like the archive-extension
    /// list. Returns `None` for names with no unpack operation.
    pub fn from_name(name: &str) -> Option<Self> {
        if name.ends_with(".tar.gz") {
            return Some(ArchiveFormat::TarGz);
        }
        if name.ends_with(".tar.bz2") {
            return Some(ArchiveFormat::TarBz2);
        }
        if name.ends_with(".tar.xz") {
            return Some(ArchiveFormat::TarXz);
        }

        match classify::extension_of(name)? {
            "tar" => Some(ArchiveFormat::Tar),
            "gz" => Some(ArchiveFormat::Gzip),
            "bz2" => Some(ArchiveFormat::Bzip2),
            "xz" => Some(ArchiveFormat::Xz),
            "zip" => Some(ArchiveFormat::Zip),
            "7z" => Some(ArchiveFormat::SevenZip),
            "rar" => Some(ArchiveFormat::Rar),
            _ => None,
        }
    }
}

impl fmt::Display for ArchiveFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ArchiveFormat::TarGz => "tar.gz",
            ArchiveFormat::TarBz2 => "tar.bz2",
            ArchiveFormat::TarXz => "tar.xz",
            ArchiveFormat::Tar => "tar",
            ArchiveFormat::Gzip => "gzip",
            ArchiveFormat::Bzip2 => "bzip2",
            ArchiveFormat::Xz => "xz",
            ArchiveFormat::Zip => "zip",
            ArchiveFormat::SevenZip => "7z",
            ArchiveFormat::Rar => "rar",
        };
        f.write_str(name)
    }
}
