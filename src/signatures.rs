//! Magic-byte signature catalog.
//!
//! An ordered priority list of known file-format signatures, each paired with
//! the extensions that content is allowed to carry. The list is evaluated top
//! to bottom and the first entry whose byte prefix matches decides the
//! verdict; later entries are never consulted, so the order itself is part of
//! the contract. A few entries are shadowed by an earlier entry with the same
//! prefix (the RIFF pair, the RAR v5 form) and are kept in place anyway.

/// How many leading bytes a signature check may look at.
pub const HEAD_LEN: usize = 16;

/// One known format: magic prefix plus the extensions its content may carry.
///
/// An empty extension list means the format conventionally has no extension
/// at all (a bare ELF binary, for instance).
struct Signature {
    magic: &'static [u8],
    extensions: &'static [&'static str],
}

/// Priority list, first match wins. Extensions are lowercase, without dots.
const SIGNATURES: &[Signature] = &[
    // Images
    Signature { magic: &[0x89, 0x50, 0x4E, 0x47], extensions: &["png"] },
    Signature { magic: &[0xFF, 0xD8, 0xFF], extensions: &["jpg", "jpeg"] },
    Signature { magic: &[0x47, 0x49, 0x46, 0x38], extensions: &["gif"] },
    Signature { magic: &[0x42, 0x4D], extensions: &["bmp"] },
    Signature { magic: &[0x49, 0x49, 0x2A, 0x00], extensions: &["tif", "tiff"] }, // TIFF little-endian
    Signature { magic: &[0x4D, 0x4D, 0x00, 0x2A], extensions: &["tif", "tiff"] }, // TIFF big-endian
    Signature { magic: &[0x52, 0x49, 0x46, 0x46], extensions: &["webp"] },

    // Audio / video containers
    // RIFF family; shadowed by the webp entry above, which shares the prefix.
    Signature { magic: &[0x52, 0x49, 0x46, 0x46], extensions: &["wav", "avi", "webp"] },
    Signature {
        magic: &[0x00, 0x00, 0x00, 0x18, 0x66, 0x74, 0x79, 0x70],
        extensions: &["mp4", "mov", "m4a", "m4v"],
    },
    Signature { magic: &[0x1A, 0x45, 0xDF, 0xA3], extensions: &["mkv", "webm"] }, // Matroska / WebM
    Signature { magic: &[0xFF, 0xFB], extensions: &["mp3"] }, // MPEG audio frame sync
    Signature { magic: &[0x4F, 0x67, 0x67, 0x53], extensions: &["ogg", "oga"] },
    Signature { magic: &[0x66, 0x4C, 0x61, 0x43], extensions: &["flac"] },

    // Documents / data
    Signature { magic: &[0x25, 0x50, 0x44, 0x46], extensions: &["pdf"] },
    Signature {
        magic: &[0x50, 0x4B, 0x03, 0x04],
        extensions: &["zip", "docx", "xlsx", "pptx", "jar", "apk"],
    },
    Signature {
        magic: &[0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1],
        extensions: &["doc", "xls", "ppt", "msi"], // legacy OLE container
    },

    // Compression / archives
    Signature { magic: &[0x1F, 0x8B, 0x08], extensions: &["gz"] },
    Signature { magic: &[0x42, 0x5A, 0x68], extensions: &["bz2"] },
    Signature { magic: &[0xFD, 0x37, 0x7A, 0x58, 0x5A, 0x00], extensions: &["xz"] },
    Signature { magic: &[0x28, 0xB5, 0x2F, 0xFD], extensions: &["zst"] },
    Signature { magic: &[0x37, 0x7A, 0xBC, 0xAF, 0x27, 0x1C], extensions: &["7z"] },
    Signature { magic: &[0x52, 0x61, 0x72, 0x21, 0x1A, 0x07], extensions: &["rar"] }, // RAR v4
    // RAR v5; shadowed by the v4 prefix above.
    Signature { magic: &[0x52, 0x61, 0x72, 0x21, 0x1A, 0x07, 0x00], extensions: &["rar"] },

    // Executables / libraries
    Signature { magic: &[0x7F, 0x45, 0x4C, 0x46], extensions: &[] }, // ELF, conventionally bare
    Signature {
        magic: &[0x4D, 0x5A], // PE (DOS MZ)
        extensions: &["exe", "dll", "sys", "ocx", "scr", "drv"],
    },
];

/// Whether a file's content signature contradicts its extension.
///
/// `head` holds the first bytes of the file (up to [`HEAD_LEN`]); `extension`
/// is the name's extension without the dot, if it has one. The first catalog
/// entry whose magic is a prefix of `head` decides:
///
/// 1. entry allows no extension -> disguised iff the file has one;
/// 2. file has no extension -> disguised (the content implies one);
/// 3. otherwise disguised iff the extension is outside the allowed set
///    (compared case-insensitively).
///
/// An empty `head` or a head no entry matches yields no opinion (`false`).
pub fn is_disguised(head: &[u8], extension: Option<&str>) -> bool {
    if head.is_empty() {
        return false;
    }

    for sig in SIGNATURES {
        if !head.starts_with(sig.magic) {
            continue;
        }

        if sig.extensions.is_empty() {
            return extension.is_some();
        }

        return match extension {
            None => true,
            Some(ext) => !sig
                .extensions
                .iter()
                .any(|allowed| ext.eq_ignore_ascii_case(allowed)),
        };
    }

    false
}
