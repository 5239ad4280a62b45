use std::fs::{File, OpenOptions};
use std::path::Path;
use crate::core::error::{Error, ErrorKind, Result};

/// `flock` on a shard directory's `.lock` file.
///
/// Exclusive holders are alone on the shard. Shared holders only exclude
/// exclusive ones. With `wait` the call blocks until the lock is free,
/// otherwise a held lock is an error.
pub struct FileLock {
    pub file: File,
}

impl FileLock {
    pub fn acquire(dir: &Path, exclusive: bool, wait: bool) -> Result<Self> {
        let lock_path = dir.join(".lock");

        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&lock_path)?;

        #[cfg(unix)]
        {
            use std::os::unix::io::AsRawFd;
            use libc::{flock, LOCK_EX, LOCK_NB, LOCK_SH};

            let fd = file.as_raw_fd();
            let mut op = if exclusive { LOCK_EX } else { LOCK_SH };
            if !wait {
                op |= LOCK_NB;
            }

            loop {
                if unsafe { flock(fd, op) } == 0 {
                    break;
                }
                let err = std::io::Error::last_os_error();
                if wait && err.kind() == std::io::ErrorKind::Interrupted {
                    continue;
                }
                if !wait && err.kind() == std::io::ErrorKind::WouldBlock {
                    return Err(Error::new(
                        ErrorKind::Io,
                        format!("shard {} is already open elsewhere", dir.display()),
                    ));
                }
                return Err(err.into());
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
            use libc::{flock, LOCK_UN};

            let fd = self.file.as_raw_fd();
            unsafe {
                flock(fd, LOCK_UN);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shared_holders_coexist_but_exclude_writers() {
        let dir = tempfile::tempdir().unwrap();
        let a = FileLock::acquire(dir.path(), false, false).unwrap();
        let b = FileLock::acquire(dir.path(), false, false).unwrap();

        let err = FileLock::acquire(dir.path(), true, false).err().unwrap();
        assert_eq!(err.kind, ErrorKind::Io);

        drop(a);
        drop(b);
        assert!(FileLock::acquire(dir.path(), true, false).is_ok());
    }

    #[test]
    fn waiting_writer_gets_the_lock_once_released() {
        let dir = tempfile::tempdir().unwrap();
        let held = FileLock::acquire(dir.path(), true, false).unwrap();

        std::thread::scope(|s| {
            let waiter = s.spawn(|| FileLock::acquire(dir.path(), true, true).map(|_| ()));
            std::thread::sleep(std::time::Duration::from_millis(50));
            drop(held);
            assert!(waiter.join().unwrap().is_ok());
        });
    }
}
