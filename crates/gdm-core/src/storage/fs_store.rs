use super::temp_path;
use crate::fetch::{FetchError, ImageStore, SaveOutcome};
use crate::naming::placeholder_filename;
use std::fs;
use std::io::Write;
use std::path::Path;

/// [`ImageStore`] writing straight to the local filesystem.
#[derive(Debug, Clone, Default)]
pub struct FsImageStore {
    /// Replace files that already exist instead of reporting `Skipped`.
    pub overwrite: bool,
}

impl FsImageStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn write_temp(tmp: &Path, bytes: &[u8]) -> std::io::Result<()> {
        let mut f = fs::File::create(tmp)?;
        f.write_all(bytes)?;
        f.sync_all()
    }
}

impl ImageStore for FsImageStore {
    fn ensure_folder(&self, folder: &Path) -> Result<(), FetchError> {
        fs::create_dir_all(folder).map_err(|e| FetchError::from_io(folder, e))
    }

    fn save(&self, bytes: &[u8], path: &Path) -> Result<SaveOutcome, FetchError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.is_dir() {
                return Err(FetchError::FolderMissing {
                    path: parent.to_path_buf(),
                });
            }
        }
        if !self.overwrite && path.exists() {
            return Ok(SaveOutcome::Skipped);
        }

        let tmp = temp_path(path);
        let written = Self::write_temp(&tmp, bytes).and_then(|()| fs::rename(&tmp, path));
        if let Err(e) = written {
            let _ = fs::remove_file(&tmp);
            return Err(FetchError::from_io(path, e));
        }
        Ok(SaveOutcome::Saved(path.to_path_buf()))
    }

    fn path_exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn write_placeholder(&self, folder: &Path, page: usize, reason: &str) -> Result<(), FetchError> {
        let path = folder.join(placeholder_filename(page));
        fs::write(&path, format!("{}\n", reason)).map_err(|e| FetchError::from_io(&path, e))
    }

    fn remove_placeholder(&self, folder: &Path, page: usize) -> Result<(), FetchError> {
        let path = folder.join(placeholder_filename(page));
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(FetchError::from_io(&path, e)),
        }
    }
}
