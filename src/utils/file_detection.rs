use crate::core::ResourceKind;

/// Archive suffixes, matched case-insensitively against the end of a name.
/// Compound suffixes are listed so `.tar.gz` style names are recognised as a whole.
pub const ARCHIVE_EXTENSIONS: &[&str] = &[
    ".zip", ".rar", ".7z", ".tar", ".gz", ".tar.gz", ".bz2", ".tar.bz2", ".xz", ".tar.xz",
];

pub const IMAGE_EXTENSIONS: &[&str] = &[
    ".jpg", ".jpeg", ".png", ".gif", ".bmp", ".webp", ".svg",
];

pub const AUDIO_EXTENSIONS: &[&str] = &[
    ".mp3", ".wav", ".flac", ".aac", ".ogg", ".m4a", ".wma",
];

pub const VIDEO_EXTENSIONS: &[&str] = &[
    ".mp4", ".avi", ".mkv", ".mov", ".wmv", ".flv", ".webm", ".m4v", ".3gp", ".ogv",
];

pub const NOVEL_EXTENSIONS: &[&str] = &[".txt", ".epub", ".mobi"];

/// Returns the media whitelist for a resource kind. Kinds without single-file
/// media (games, websites) get an empty list.
pub fn media_extensions(kind: ResourceKind) -> &'static [&'static str] {
    match kind {
        ResourceKind::Image => IMAGE_EXTENSIONS,
        ResourceKind::Audio => AUDIO_EXTENSIONS,
        ResourceKind::Video => VIDEO_EXTENSIONS,
        ResourceKind::Novel => NOVEL_EXTENSIONS,
        ResourceKind::Game | ResourceKind::Website => &[],
    }
}

fn has_suffix(name: &str, suffixes: &[&str]) -> bool {
    let lower = name.to_lowercase();
    suffixes.iter().any(|ext| lower.ends_with(ext))
}

/// Determines if a path or file name denotes an archive.
pub fn is_archive_file(name: &str) -> bool {
    has_suffix(name, ARCHIVE_EXTENSIONS)
}

/// Determines if a path or file name is a media file for the given kind.
pub fn is_media_file(name: &str, kind: ResourceKind) -> bool {
    has_suffix(name, media_extensions(kind))
}

/// Determines if a file is an image file (used when scanning album folders).
pub fn is_image_file(name: &str) -> bool {
    has_suffix(name, IMAGE_EXTENSIONS)
}

/// `true` when the last path component carries a dot-delimited extension.
/// A leading dot alone (`.hidden`) does not count.
pub fn has_extension(name: &str) -> bool {
    let base = crate::utils::paths::file_name(name);
    match base.rfind('.') {
        Some(idx) => idx > 0 && idx + 1 < base.len(),
        None => false,
    }
}
