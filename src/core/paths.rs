//! Storage key rules shared by the upload adapter and the bulk migration.
//!
//! Database rows keep backend-relative paths (`products/photo.jpg`) while the
//! object store sees full keys (`media/products/photo.jpg`). Both sides must
//! derive one from the other the same way, so every join, strip and
//! extension swap goes through this module.

/// Extensions re-encoded to WebP, compared lowercase.
pub const CONVERTIBLE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png"];

/// Extension of every converted object.
pub const TARGET_EXTENSION: &str = "webp";

/// Cache lifetime attached to converted images (one week).
pub const IMAGE_CACHE_CONTROL: &str = "max-age=604800";

/// Raster formats accepted when discovering images on disk.
pub const IMAGE_FILE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "webp", "bmp"];

/// Byte offset of the extension dot in the last path segment, if any.
///
/// Leading dots of the file name do not count (`.png` has no extension).
fn extension_dot(key: &str) -> Option<usize> {
    let name_start = key.rfind('/').map(|i| i + 1).unwrap_or(0);
    let name = &key[name_start..];
    let leading_dots = name.len() - name.trim_start_matches('.').len();
    let dot = name[leading_dots..].rfind('.')?;
    Some(name_start + leading_dots + dot)
}

/// Lowercased extension of the last path segment, without the dot.
pub fn extension_of(key: &str) -> Option<String> {
    extension_dot(key).map(|dot| key[dot + 1..].to_ascii_lowercase())
}

pub fn is_convertible(key: &str) -> bool {
    extension_of(key)
        .map(|ext| CONVERTIBLE_EXTENSIONS.contains(&ext.as_str()))
        .unwrap_or(false)
}

pub fn is_image_file(key: &str) -> bool {
    extension_of(key)
        .map(|ext| IMAGE_FILE_EXTENSIONS.contains(&ext.as_str()))
        .unwrap_or(false)
}

/// Replaces the extension with `.webp`, keeping every directory component.
///
/// ```
/// use depoauto_ops::core::paths::swap_extension;
///
/// assert_eq!(swap_extension("a/b/photo.jpg"), "a/b/photo.webp");
/// assert_eq!(swap_extension("README"), "README.webp");
/// ```
pub fn swap_extension(key: &str) -> String {
    let base = match extension_dot(key) {
        Some(dot) => &key[..dot],
        None => key,
    };
    format!("{}.{}", base, TARGET_EXTENSION)
}

/// Content type for a stored object, derived from its extension.
pub fn content_type_for(key: &str) -> &'static str {
    match extension_of(key).as_deref() {
        Some("webp") => "image/webp",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("gif") => "image/gif",
        Some("bmp") => "image/bmp",
        Some("svg") => "image/svg+xml",
        Some("pdf") => "application/pdf",
        Some("zip") => "application/zip",
        Some("gz") => "application/gzip",
        Some("sql") | Some("txt") => "text/plain",
        Some("csv") => "text/csv",
        _ => "application/octet-stream",
    }
}

/// The backend "location": a key prefix under which all relative paths live.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StorageLocation {
    prefix: String,
}

impl StorageLocation {
    pub fn new(location: &str) -> Self {
        let trimmed = location.trim_end_matches('/');
        let prefix = if trimmed.is_empty() {
            String::new()
        } else {
            format!("{}/", trimmed)
        };
        Self { prefix }
    }

    /// Listing prefix: `"media/"`, or `""` at the bucket root.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn full_key(&self, relative: &str) -> String {
        format!("{}{}", self.prefix, relative.trim_start_matches('/'))
    }

    /// Inverse of [`full_key`](Self::full_key) for keys listed under the prefix.
    pub fn relative_path<'a>(&self, key: &'a str) -> &'a str {
        if self.prefix.is_empty() {
            return key;
        }
        key.strip_prefix(self.prefix.as_str())
            .unwrap_or(key)
            .trim_start_matches('/')
    }
}
