//! Key file access.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use anyhow::Result;
use log::debug;

use crate::crypto::cipher::secure_random;
use crate::error::KeyError;

/// A PEM key file on disk.
///
/// Inputs are read whole; outputs are written with [`KeyFile::save`],
/// which never leaves a partially written file at the target path.
#[derive(Debug, Clone)]
pub struct KeyFile {
    path: PathBuf,
}

impl KeyFile {
    /// Creates a new KeyFile for the given path.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Returns `true` if the file exists.
    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Returns the path to the file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads the entire file into memory.
    ///
    /// # Errors
    ///
    /// Returns [`KeyError::ReadInput`] if the file cannot be read.
    pub fn load(&self) -> Result<Vec<u8>> {
        fs::read(&self.path).map_err(|source| {
            KeyError::ReadInput {
                path: self.path.clone(),
                source,
            }
            .into()
        })
    }

    /// Saves data to the file using atomic write.
    ///
    /// 1. Writes data to a temporary file with a random name next to the target
    /// 2. Syncs the temporary file to disk
    /// 3. Atomically replaces the target with it
    /// 4. Syncs the parent directory so the rename is persisted
    ///
    /// Parent directories are created if they don't exist. On Unix the file
    /// is created with mode `0600`.
    ///
    /// # Errors
    ///
    /// Returns [`KeyError::WriteOutput`] if any step fails.
    pub fn save(&self, data: &[u8]) -> Result<()> {
        self.write_atomic(data).map_err(|source| {
            KeyError::WriteOutput {
                path: self.path.clone(),
                source,
            }
            .into()
        })
    }

    fn write_atomic(&self, data: &[u8]) -> io::Result<()> {
        let dir = self.parent_dir();
        fs::create_dir_all(dir)?;

        let tmp_path = self.random_tmp_path()?;
        debug!("writing {} via {}", self.path.display(), tmp_path.display());

        let mut options = OpenOptions::new();
        options.write(true).create_new(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }
        let mut tmp_file = options.open(&tmp_path)?;

        let written = tmp_file
            .write_all(data)
            .and_then(|_| tmp_file.sync_all());
        drop(tmp_file);

        if let Err(e) = written.and_then(|_| self.atomic_replace(&tmp_path)) {
            let _ = fs::remove_file(&tmp_path);
            return Err(e);
        }

        #[cfg(not(target_os = "windows"))]
        File::open(dir)?.sync_all()?;

        Ok(())
    }

    /// Directory the file lives in; `.` for a bare file name.
    fn parent_dir(&self) -> &Path {
        match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        }
    }

    /// Generates a unique temporary file path in the same directory.
    ///
    /// Format: `.filename.tmp.<randomhex>`
    fn random_tmp_path(&self) -> io::Result<PathBuf> {
        let file_name = self.path.file_name().ok_or_else(|| {
            io::Error::new(io::ErrorKind::InvalidInput, "path has no file name")
        })?;

        let mut buf = [0u8; 8];
        secure_random(&mut buf).map_err(io::Error::other)?;

        let tmp_name = format!(
            ".{}.tmp.{}",
            file_name.to_string_lossy(),
            hex::encode(buf)
        );
        Ok(self.parent_dir().join(tmp_name))
    }

    /// Atomically replaces the target file with the temporary file.
    ///
    /// `ReplaceFileW` needs an existing target, so a fresh output is
    /// moved into place with a plain rename instead.
    #[cfg(target_os = "windows")]
    fn atomic_replace(&self, tmp_path: &Path) -> io::Result<()> {
        use std::ffi::OsStr;
        use std::os::windows::ffi::OsStrExt;
        use windows_sys::Win32::Storage::FileSystem::{REPLACEFILE_WRITE_THROUGH, ReplaceFileW};

        if !self.path.exists() {
            return fs::rename(tmp_path, &self.path);
        }

        fn to_wide(s: &OsStr) -> Vec<u16> {
            s.encode_wide().chain(std::iter::once(0)).collect()
        }

        let target_w = to_wide(self.path.as_os_str());
        let tmp_w = to_wide(tmp_path.as_os_str());

        // SAFETY:
        // - Strings are valid UTF-16 and null-terminated
        // - Pointers remain valid during the call
        // - Windows does not retain the pointers after return
        let result = unsafe {
            ReplaceFileW(
                target_w.as_ptr(),
                tmp_w.as_ptr(),
                std::ptr::null(),
                REPLACEFILE_WRITE_THROUGH,
                std::ptr::null(),
                std::ptr::null(),
            )
        };

        if result == 0 {
            return Err(io::Error::last_os_error());
        }

        Ok(())
    }

    /// On Unix, `rename()` is atomic when both paths are on the same filesystem.
    #[cfg(not(target_os = "windows"))]
    fn atomic_replace(&self, tmp_path: &Path) -> io::Result<()> {
        fs::rename(tmp_path, &self.path)
    }
}
