//! Filesystem image store.
//!
//! Images are written to a `.part` temp file next to the final path, synced,
//! then renamed into place, so a crash never leaves a truncated image under
//! its final name.

mod fs_store;

pub use fs_store::FsImageStore;

use std::path::{Path, PathBuf};

/// Temporary file suffix used before atomic rename.
pub const TEMP_SUFFIX: &str = ".part";

/// Path for the temp file: appends `.part` to the final path (e.g. `0001.jpg` → `0001.jpg.part`).
pub fn temp_path(final_path: &Path) -> PathBuf {
    let mut o = final_path.as_os_str().to_owned();
    o.push(TEMP_SUFFIX);
    PathBuf::from(o)
}
