//! Cut a gallery's page listing down to the configured window.

use super::{DownloadRange, RangeConfig};

/// Range that cannot be applied to the gallery at all.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RangeError {
    #[error("range start {start} is beyond the last page ({total})")]
    StartBeyondTotal { start: usize, total: usize },
}

/// Output of [`apply`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RangeResolution {
    /// Page URLs inside the window, relative page 1 first.
    pub window: Vec<String>,
    /// Relative page the job starts (or resumes) at.
    pub start_page: usize,
    pub range: DownloadRange,
    /// Non-fatal adjustments, e.g. an end past the last page.
    pub warnings: Vec<String>,
}

impl RangeResolution {
    /// Pages still to download: `(relative_page, url)` from `start_page` on.
    pub fn pending(&self) -> impl Iterator<Item = (usize, &str)> + '_ {
        self.window
            .iter()
            .enumerate()
            .skip(self.start_page.saturating_sub(1))
            .map(|(i, url)| (i + 1, url.as_str()))
    }

    /// URLs of [`RangeResolution::pending`].
    pub fn filtered(&self) -> Vec<String> {
        self.pending().map(|(_, url)| url.to_string()).collect()
    }

    /// Number of pages in the window.
    pub fn total(&self) -> usize {
        self.window.len()
    }
}

/// Resolve `cfg` against the full page list.
///
/// `start_page` is relative to the resulting window (1 = first page of the
/// window). With the range disabled the window is the whole gallery. With it
/// enabled, `end` past the last page is clamped (with a warning), `end` before
/// `start` means "to the last page", and otherwise the window holds
/// `end - start` pages (at least one).
pub fn apply(
    all_page_urls: &[String],
    start_page: usize,
    cfg: &RangeConfig,
) -> Result<RangeResolution, RangeError> {
    let total = all_page_urls.len();
    let start_page = start_page.max(1);

    if !cfg.enabled {
        return Ok(RangeResolution {
            window: all_page_urls.to_vec(),
            start_page,
            range: DownloadRange {
                enabled: false,
                start: None,
                end: None,
                relative_total: Some(total),
                absolute_total: Some(total),
                range_changed: false,
            },
            warnings: Vec::new(),
        });
    }

    let start = cfg.start_page();
    if start > total {
        return Err(RangeError::StartBeyondTotal { start, total });
    }

    let mut warnings = Vec::new();
    let mut end = cfg.end;
    if let Some(e) = end {
        if e > total {
            warnings.push(format!(
                "range end {} is past the last page, clamped to {}",
                e, total
            ));
            end = Some(total);
        }
    }
    if matches!(end, Some(e) if e < start) {
        end = None;
    }

    let relative_total = match end {
        Some(e) => (e - start).max(1),
        None => total - start + 1,
    };
    let first = start - 1;
    let window = all_page_urls[first..first + relative_total].to_vec();

    Ok(RangeResolution {
        window,
        start_page,
        range: DownloadRange {
            enabled: true,
            start: Some(start),
            end,
            relative_total: Some(relative_total),
            absolute_total: Some(total),
            range_changed: false,
        },
        warnings,
    })
}
