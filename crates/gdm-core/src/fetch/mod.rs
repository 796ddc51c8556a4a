//! Collaborator boundaries used by the job loop.
//!
//! The engine never scrapes pages or touches image bytes itself: it asks a
//! [`GalleryFetcher`] for metadata and images, hands bytes to an
//! [`ImageStore`], and notifies an optional [`PostProcessor`]. Every failure
//! crossing these traits is a typed [`FetchError`] so the retry policy can
//! classify it.

mod error;

pub use error::FetchError;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Gallery-level metadata returned by [`GalleryFetcher::fetch_gallery`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GalleryInfo {
    /// One URL per gallery page, in page order.
    pub page_urls: Vec<String>,
    /// Page count reported by the site. Usually `page_urls.len()`.
    pub total_pages: usize,
    pub title: String,
    pub metadata: BTreeMap<String, String>,
}

/// Resolved image location for a single gallery page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageInfo {
    pub image_url: String,
    pub filename: String,
}

/// Transport security mode for an image fetch.
///
/// `Degraded` is only requested after an SSL failure when lower-security mode
/// is enabled in the retry configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransportMode {
    #[default]
    Strict,
    Degraded,
}

/// Result of handing image bytes to an [`ImageStore`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveOutcome {
    Saved(PathBuf),
    /// The store decided not to write (e.g. the file is already present).
    Skipped,
}

/// Remote side of a download: gallery metadata, page resolution and image bytes.
pub trait GalleryFetcher: Send + Sync {
    fn fetch_gallery(&self, url: &str) -> Result<GalleryInfo, FetchError>;

    fn fetch_image_info(&self, page_url: &str) -> Result<ImageInfo, FetchError>;

    fn fetch_image(&self, image_url: &str, mode: TransportMode) -> Result<Vec<u8>, FetchError>;
}

/// Local side of a download.
pub trait ImageStore: Send + Sync {
    /// Creates `folder` (and parents) if it does not exist yet.
    fn ensure_folder(&self, folder: &Path) -> Result<(), FetchError>;

    fn save(&self, bytes: &[u8], path: &Path) -> Result<SaveOutcome, FetchError>;

    fn path_exists(&self, path: &Path) -> bool;

    /// Leaves a marker for a page that was given up on, so the gap is visible on disk.
    fn write_placeholder(&self, folder: &Path, page: usize, reason: &str) -> Result<(), FetchError>;

    /// Removes a marker written by [`ImageStore::write_placeholder`] once the page is saved.
    fn remove_placeholder(&self, _folder: &Path, _page: usize) -> Result<(), FetchError> {
        Ok(())
    }
}

/// Hooks run after pages and jobs finish. Errors are logged by the caller and
/// never change the job's outcome.
pub trait PostProcessor: Send + Sync {
    fn on_page_saved(&self, path: &Path) -> anyhow::Result<()>;

    fn on_job_complete(&self, folder: &Path) -> anyhow::Result<()>;
}

/// Post-processor that does nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopPostProcessor;

impl PostProcessor for NoopPostProcessor {
    fn on_page_saved(&self, _path: &Path) -> anyhow::Result<()> {
        Ok(())
    }

    fn on_job_complete(&self, _folder: &Path) -> anyhow::Result<()> {
        Ok(())
    }
}
