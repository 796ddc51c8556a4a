//! Local names for gallery folders and page images.

use std::path::Path;

const NAME_MAX: usize = 255;
const DEFAULT_EXTENSION: &str = "jpg";

/// Makes a gallery title or image name safe as a single path component.
///
/// Path separators, NUL, control characters and the characters most
/// filesystems reject (`<>:"|?*`) become `_`; runs of `_` collapse; leading
/// and trailing dots, spaces and underscores are trimmed; the result is cut to
/// 255 bytes on a char boundary.
pub fn sanitize_filename(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut prev_underscore = false;

    for c in name.chars() {
        let unsafe_char = c == '/'
            || c == '\\'
            || c.is_control()
            || matches!(c, '<' | '>' | ':' | '"' | '|' | '?' | '*');
        if unsafe_char || c == '_' {
            if !prev_underscore {
                out.push('_');
            }
            prev_underscore = true;
        } else {
            out.push(c);
            prev_underscore = false;
        }
    }

    let trimmed = out.trim_matches(|c| c == ' ' || c == '.' || c == '_');
    let mut take = trimmed.len().min(NAME_MAX);
    while take > 0 && !trimmed.is_char_boundary(take) {
        take -= 1;
    }
    trimmed[..take].to_string()
}

/// Extracts the last path segment of `url`, if any.
pub fn filename_from_url_path(url: &str) -> Option<String> {
    let parsed = url::Url::parse(url).ok()?;
    let segment = parsed.path_segments()?.filter(|s| !s.is_empty()).last()?;
    if segment == "." || segment == ".." {
        return None;
    }
    Some(segment.to_string())
}

/// Folder name for a gallery: the sanitized title, or the last URL segment
/// when the title is empty after sanitizing.
pub fn gallery_folder_name(title: &str, url: &str) -> String {
    let name = sanitize_filename(title);
    if !name.is_empty() {
        return name;
    }
    filename_from_url_path(url)
        .map(|s| sanitize_filename(&s))
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "gallery".to_string())
}

/// Image filename for an absolute page: zero-padded page number plus the
/// extension of `hint` (defaults to `jpg`).
pub fn page_filename(absolute_page: usize, hint: &str) -> String {
    let ext = Path::new(hint)
        .extension()
        .and_then(|e| e.to_str())
        .map(sanitize_filename)
        .filter(|e| !e.is_empty())
        .unwrap_or_else(|| DEFAULT_EXTENSION.to_string());
    format!("{:04}.{}", absolute_page, ext.to_ascii_lowercase())
}

/// Marker filename for a page that was given up on.
pub fn placeholder_filename(absolute_page: usize) -> String {
    format!("{:04}.skipped", absolute_page)
}
