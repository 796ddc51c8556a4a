//! Page-range resolution.
//!
//! A gallery has `N` pages numbered 1..=N (absolute). When a range is
//! configured the job only sees the window `start..` of that listing and
//! numbers its pages 1..=relative_total (relative). Checkpoints store both
//! numbers so a resumed job can be remapped if the configured range changed.

mod resolve;

pub use resolve::{apply, RangeError, RangeResolution};

use serde::{Deserialize, Serialize};

/// Which queue entries a configured range applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RangeMode {
    /// Every gallery in the queue is cut to the range.
    #[default]
    AllUrls,
    /// Only the first gallery of the queue is cut; the rest download fully.
    FirstUrlOnly,
}

/// User-configured page range (absolute, 1-based, inclusive start).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RangeConfig {
    #[serde(alias = "download_range_enabled")]
    pub enabled: bool,
    #[serde(alias = "download_range_start")]
    pub start: Option<usize>,
    #[serde(alias = "download_range_end")]
    pub end: Option<usize>,
    #[serde(alias = "download_range_mode")]
    pub mode: RangeMode,
}

impl RangeConfig {
    pub fn disabled() -> Self {
        Self::default()
    }

    pub fn pages(start: usize, end: Option<usize>) -> Self {
        Self {
            enabled: true,
            start: Some(start),
            end,
            mode: RangeMode::AllUrls,
        }
    }

    /// The range that applies to the queue entry at `position` (0-based).
    pub fn for_position(&self, position: usize) -> RangeConfig {
        if self.mode == RangeMode::FirstUrlOnly && position > 0 {
            return RangeConfig::disabled();
        }
        *self
    }

    /// First absolute page; a missing or zero start means page 1.
    pub fn start_page(&self) -> usize {
        self.start.unwrap_or(1).max(1)
    }
}

/// Effective range of a job after resolution against the gallery's page count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DownloadRange {
    pub enabled: bool,
    pub start: Option<usize>,
    /// Inclusive-looking end as configured, after clamping. `None` when unbounded.
    pub end: Option<usize>,
    /// Number of pages in the window.
    pub relative_total: Option<usize>,
    /// Page count of the whole gallery.
    pub absolute_total: Option<usize>,
    /// The configured range differs from the one recorded in the checkpoint.
    #[serde(default)]
    pub range_changed: bool,
}

impl DownloadRange {
    /// Absolute page number for a relative page.
    pub fn absolute(&self, relative: usize) -> usize {
        match (self.enabled, self.start) {
            (true, Some(start)) => start + relative - 1,
            _ => relative,
        }
    }

    /// Relative page number for an absolute page, if it falls inside the window.
    pub fn relative_for(&self, absolute: usize) -> Option<usize> {
        let rel = match (self.enabled, self.start) {
            (true, Some(start)) if absolute >= start => absolute - start + 1,
            (true, Some(_)) => return None,
            _ => absolute,
        };
        match self.relative_total {
            Some(total) if rel > total => None,
            _ if rel == 0 => None,
            _ => Some(rel),
        }
    }

    /// Whether `other` (typically from a checkpoint) selects a different window.
    pub fn differs_from(&self, other: &DownloadRange) -> bool {
        self.enabled != other.enabled || self.start != other.start || self.end != other.end
    }
}
