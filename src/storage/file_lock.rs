use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};
use crate::core::error::{Error, Result};

/// Advisory single-writer lock on a `<store>.lock` sidecar file.
///
/// Acquisition polls until `timeout` elapses and then fails with
/// `LockTimeout`. Released on drop.
pub struct FileLock {
    pub file: File,
    pub path: PathBuf,
}

impl FileLock {
    /// Sidecar path for a data file: same path plus `.lock`.
    pub fn lock_path(data_path: &Path) -> PathBuf {
        let mut name = data_path.as_os_str().to_os_string();
        name.push(".lock");
        PathBuf::from(name)
    }

    pub fn acquire(lock_path: &Path, timeout: Duration, retry: Duration) -> Result<Self> {
        let start = Instant::now();

        loop {
            if let Some(lock) = Self::try_acquire(lock_path)? {
                return Ok(lock);
            }
            let waited = start.elapsed();
            if waited >= timeout {
                return Err(Error::LockTimeout {
                    resource: lock_path.display().to_string(),
                    waited,
                });
            }
            thread::sleep(retry.min(timeout - waited));
        }
    }

    #[cfg(unix)]
    fn try_acquire(lock_path: &Path) -> Result<Option<Self>> {
        use std::os::unix::io::AsRawFd;
        use libc::{flock, LOCK_EX, LOCK_NB};

        let mut file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(lock_path)?;

        let fd = file.as_raw_fd();
        // SAFETY: fd is owned by `file` and stays open for the call
        let rc = unsafe { flock(fd, LOCK_EX | LOCK_NB) };
        if rc != 0 {
            let err = std::io::Error::last_os_error();
            return match err.raw_os_error() {
                Some(code) if code == libc::EWOULDBLOCK || code == libc::EINTR => Ok(None),
                _ => Err(err.into()),
            };
        }

        // Owner pid for whoever inspects a stuck lock
        file.set_len(0)?;
        write!(file, "{}", std::process::id())?;

        Ok(Some(FileLock {
            file,
            path: lock_path.to_path_buf(),
        }))
    }

    #[cfg(not(unix))]
    fn try_acquire(lock_path: &Path) -> Result<Option<Self>> {
        match OpenOptions::new().create_new(true).write(true).open(lock_path) {
            Ok(mut file) => {
                write!(file, "{}", std::process::id())?;
                Ok(Some(FileLock {
                    file,
                    path: lock_path.to_path_buf(),
                }))
            }
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

impl Drop for FileLock {
    fn drop(&mut self) {
        #[cfg(unix)]
        {
            use std::os::unix::io::AsRawFd;
            use libc::{flock, LOCK_UN};

            let fd = self.file.as_raw_fd();
            unsafe {
                flock(fd, LOCK_UN);
            }
        }

        #[cfg(not(unix))]
        {
            let _ = std::fs::remove_file(&self.path);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lock_path_appends_suffix() {
        assert_eq!(
            FileLock::lock_path(Path::new("/data/headers.csv")),
            PathBuf::from("/data/headers.csv.lock")
        );
    }

    #[test]
    fn second_holder_times_out() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("headers.csv.lock");

        let _held = FileLock::acquire(&path, Duration::from_secs(1), Duration::from_millis(10)).unwrap();
        let err = FileLock::acquire(&path, Duration::from_millis(50), Duration::from_millis(10))
            .err()
            .unwrap();
        assert!(matches!(err, Error::LockTimeout { .. }));
    }

    #[test]
    fn released_on_drop() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("headers.csv.lock");

        {
            let _held = FileLock::acquire(&path, Duration::from_secs(1), Duration::from_millis(10)).unwrap();
        }
        assert!(FileLock::acquire(&path, Duration::from_millis(50), Duration::from_millis(10)).is_ok());
    }
}
