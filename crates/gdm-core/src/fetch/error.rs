//! Typed failures crossing the fetcher and store boundaries.

use std::io;
use std::path::{Path, PathBuf};

/// Error returned by a [`super::GalleryFetcher`] or [`super::ImageStore`].
///
/// Variants line up with the retry classifier's error kinds; see
/// [`crate::retry::classify`].
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// Connection, timeout or server-side failure that may go away on retry.
    #[error("network error fetching {url}: {message}")]
    Network { url: String, message: String },
    /// TLS handshake or certificate failure.
    #[error("ssl error fetching {url}: {message}")]
    Ssl { url: String, message: String },
    /// The response arrived but could not be understood.
    #[error("could not parse response from {url}: {message}")]
    Parse { url: String, message: String },
    /// The destination folder disappeared while the job was running.
    #[error("download folder missing: {}", path.display())]
    FolderMissing { path: PathBuf },
    /// The configured page range does not fit the gallery.
    #[error("invalid download range: {0}")]
    RangeInvalid(String),
    #[error("disk full writing {}", path.display())]
    DiskFull {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("path too long: {}", path.display())]
    PathTooLong { path: PathBuf },
    #[error("{0}")]
    Other(String),
}

impl FetchError {
    pub fn network(url: impl Into<String>, message: impl Into<String>) -> Self {
        FetchError::Network {
            url: url.into(),
            message: message.into(),
        }
    }

    pub fn ssl(url: impl Into<String>, message: impl Into<String>) -> Self {
        FetchError::Ssl {
            url: url.into(),
            message: message.into(),
        }
    }

    pub fn parse(url: impl Into<String>, message: impl Into<String>) -> Self {
        FetchError::Parse {
            url: url.into(),
            message: message.into(),
        }
    }

    /// Maps an IO failure while writing `path` to the matching variant.
    ///
    /// ENOSPC and ENAMETOOLONG get their own variants; a missing parent
    /// directory becomes [`FetchError::FolderMissing`].
    pub fn from_io(path: &Path, err: io::Error) -> Self {
        #[cfg(unix)]
        match err.raw_os_error() {
            Some(libc::ENOSPC) => {
                return FetchError::DiskFull {
                    path: path.to_path_buf(),
                    source: err,
                }
            }
            Some(libc::ENAMETOOLONG) => {
                return FetchError::PathTooLong {
                    path: path.to_path_buf(),
                }
            }
            _ => {}
        }
        if err.kind() == io::ErrorKind::NotFound {
            let folder = path.parent().unwrap_or(path).to_path_buf();
            return FetchError::FolderMissing { path: folder };
        }
        FetchError::Other(format!("{}: {}", path.display(), err))
    }
}
