use std::fs::{File, OpenOptions};
use crate::core::error::{Error, ErrorKind, Result};
use crate::storage::layout::IndexLayout;

/// Single writer guarantee for an index directory
pub struct FileLock {
    pub file: File,
}

impl FileLock {
    pub fn acquire(layout: &IndexLayout) -> Result<Self> {
        let lock_path = layout.lock_path();

        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&lock_path)?;

        #[cfg(unix)]
        {
            use std::os::unix::io::AsRawFd;
            use libc::{flock, LOCK_EX, LOCK_NB};

            let fd = file.as_raw_fd();
            unsafe {
                if flock(fd, LOCK_EX | LOCK_NB) != 0 {
                    return Err(Error::new(
                        ErrorKind::Locked,
                        format!("index directory {} is in use", layout.base_dir.display()),
                    ));
                }
            }
        }

        Ok(FileLock { file })
    }
}

impl Drop for FileLock {
    fn drop(&mut self) {
        #[cfg(unix)]
        {
            use std::os::unix::io::AsRawFd;

            // closing the descriptor releases the lock anyway
            let released = unsafe { libc::flock(self.file.as_raw_fd(), libc::LOCK_UN) } == 0;
            if !released {
                tracing::warn!(
                    error = %std::io::Error::last_os_error(),
                    "failed to release index directory lock"
                );
            }
        }
    }
}
