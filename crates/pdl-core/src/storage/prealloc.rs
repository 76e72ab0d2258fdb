//! Reserve disk blocks for the destination file up front.

use std::fs::File;
use std::io;
#[cfg(target_os = "linux")]
use std::os::unix::io::AsRawFd;

/// Grow `file` to `size` bytes. On Linux tries `posix_fallocate` first so the
/// blocks are really allocated (less fragmentation, early ENOSPC); falls back
/// to `set_len` when the filesystem refuses.
pub(super) fn preallocate(file: &File, size: u64) -> io::Result<()> {
    #[cfg(target_os = "linux")]
    {
        if let Ok(len) = libc::off_t::try_from(size) {
            let r = unsafe { libc::posix_fallocate(file.as_raw_fd(), 0, len) };
            if r == 0 {
                return Ok(());
            }
            tracing::debug!(errno = r, "posix_fallocate failed, falling back to set_len");
        }
    }
    file.set_len(size)
}
