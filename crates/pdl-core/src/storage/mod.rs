//! Destination file shared by all range workers.
//!
//! INVARIANT: every worker writes only inside its own `[start, end]`, and all
//! writes are positioned (`pwrite` on Unix, `seek_write` on Windows) so no
//! shared cursor exists. Disjoint offsets make concurrent use safe without a
//! lock around the handle. Partition math is the
//! only thing standing between workers, so it must stay exact.

mod prealloc;

use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Cloneable handle to the single output file. Clones share one descriptor,
/// which is closed when the last clone is dropped.
#[derive(Debug, Clone)]
pub struct DestinationFile {
    file: Arc<File>,
    path: PathBuf,
}

impl DestinationFile {
    /// Create `path`, truncating any previous content.
    pub fn create(path: &Path) -> io::Result<Self> {
        let file = File::options()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)?;
        Ok(Self {
            file: Arc::new(file),
            path: path.to_path_buf(),
        })
    }

    /// Size the file to exactly `size` bytes before ranges are written.
    pub fn preallocate(&self, size: u64) -> io::Result<()> {
        prealloc::preallocate(&self.file, size)
    }

    /// One positioned write of `data` at `offset`. Returns the byte count the
    /// OS accepted, which may be short; callers decide whether that is fatal.
    pub fn write_at(&self, offset: u64, data: &[u8]) -> io::Result<usize> {
        positioned_write(&self.file, offset, data)
    }

    pub fn sync(&self) -> io::Result<()> {
        self.file.sync_all()
    }

    /// Current on-disk length.
    pub fn allocated_len(&self) -> io::Result<u64> {
        Ok(self.file.metadata()?.len())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[cfg(unix)]
fn positioned_write(file: &File, offset: u64, data: &[u8]) -> io::Result<usize> {
    use std::os::unix::fs::FileExt;
    loop {
        match file.write_at(data, offset) {
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            other => return other,
        }
    }
}

#[cfg(windows)]
fn positioned_write(file: &File, offset: u64, data: &[u8]) -> io::Result<usize> {
    use std::os::windows::fs::FileExt;
    loop {
        match file.seek_write(data, offset) {
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            other => return other,
        }
    }
}

/// Best-effort removal of an output that is not a complete copy.
pub fn discard(path: &Path) {
    match std::fs::remove_file(path) {
        Ok(()) => tracing::debug!(path = %path.display(), "removed incomplete destination"),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => tracing::warn!(path = %path.display(), "could not remove incomplete destination: {}", e),
    }
}

/// Removes an output file when dropped, unless [`PartialFile::keep`] ran first.
///
/// Declare it before the [`DestinationFile`] it guards so the handle is
/// closed ahead of the removal.
#[derive(Debug)]
pub(crate) struct PartialFile {
    path: PathBuf,
    armed: bool,
}

impl PartialFile {
    /// `remove_on_drop = false` turns the guard into a no-op (`keep_partial`).
    pub(crate) fn new(path: &Path, remove_on_drop: bool) -> Self {
        Self {
            path: path.to_path_buf(),
            armed: remove_on_drop,
        }
    }

    /// The output is complete; leave it in place.
    pub(crate) fn keep(mut self) {
        self.armed = false;
    }
}

impl Drop for PartialFile {
    fn drop(&mut self) {
        if self.armed {
            discard(&self.path);
        }
    }
}
