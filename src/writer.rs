use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
#[cfg(unix)]
use std::sync::OnceLock;

use tempfile::NamedTempFile;

use crate::error::ExportError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Destination {
    pub(crate) path: PathBuf,
    pub(crate) creatable: bool,
}

impl Destination {
    pub(crate) fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            creatable: false,
        }
    }

    pub(crate) fn creatable(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            creatable: true,
        }
    }

    pub(crate) fn parent_dir(&self) -> &Path {
        match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        }
    }

    fn prepare_parent(&self) -> Result<(), ExportError> {
        let parent = self.parent_dir();
        if parent.is_dir() {
            return Ok(());
        }
        if !self.creatable {
            return Err(ExportError::io(
                &self.path,
                io::Error::new(
                    io::ErrorKind::NotFound,
                    format!("parent directory {} does not exist", parent.display()),
                ),
            ));
        }
        fs::create_dir_all(parent).map_err(|err| ExportError::io(parent, err))
    }
}

/// Payload fully written to a temp file beside its destination.
///
/// Dropping it without [`StagedWrite::commit`] removes the temp file and leaves
/// the destination untouched.
#[derive(Debug)]
pub(crate) struct StagedWrite {
    dest_path: PathBuf,
    temp: NamedTempFile,
}

impl StagedWrite {
    pub(crate) fn commit(self) -> Result<(), ExportError> {
        let dest_path = self.dest_path;
        self.temp
            .persist(&dest_path)
            .map_err(|err| ExportError::io(&dest_path, err.error))?;
        Ok(())
    }

    #[cfg(test)]
    pub(crate) fn temp_path(&self) -> &Path {
        self.temp.path()
    }
}

pub(crate) fn stage(dest: &Destination, bytes: &[u8]) -> Result<StagedWrite, ExportError> {
    dest.prepare_parent()?;
    let io_err = |err| ExportError::io(&dest.path, err);

    let mut temp = tempfile::Builder::new()
        .prefix(".yt-playlist-export-")
        .suffix(".tmp")
        .tempfile_in(dest.parent_dir())
        .map_err(io_err)?;
    let permissions = match fs::metadata(&dest.path) {
        Ok(meta) => Some(meta.permissions()),
        Err(err) if err.kind() == io::ErrorKind::NotFound => new_file_permissions(),
        Err(err) => return Err(io_err(err)),
    };
    if let Some(permissions) = permissions {
        temp.as_file().set_permissions(permissions).map_err(io_err)?;
    }
    temp.write_all(bytes).map_err(io_err)?;
    temp.flush().map_err(io_err)?;
    temp.as_file().sync_all().map_err(io_err)?;

    Ok(StagedWrite {
        dest_path: dest.path.clone(),
        temp,
    })
}

// Temp files start out 0600; a replaced file keeps its mode, a new one gets
// 0666 minus the umask like a plain create would.
#[cfg(unix)]
fn new_file_permissions() -> Option<fs::Permissions> {
    use std::os::unix::fs::PermissionsExt;

    Some(fs::Permissions::from_mode(0o666 & !process_umask()))
}

#[cfg(not(unix))]
fn new_file_permissions() -> Option<fs::Permissions> {
    None
}

#[cfg(unix)]
fn process_umask() -> u32 {
    static UMASK: OnceLock<u32> = OnceLock::new();
    *UMASK.get_or_init(|| unsafe {
        let mask = libc::umask(0);
        libc::umask(mask);
        u32::from(mask)
    })
}

pub(crate) fn write_atomic(dest: &Destination, bytes: &[u8]) -> Result<(), ExportError> {
    stage(dest, bytes)?.commit()
}

/// Append `line` plus a newline to `dest` under an exclusive lock, creating the
/// file if needed. Existing content is never rewritten.
pub(crate) fn append_line(dest: &Destination, line: &[u8]) -> Result<(), ExportError> {
    dest.prepare_parent()?;
    let io_err = |err| ExportError::io(&dest.path, err);

    let mut file = OpenOptions::new()
        .read(true)
        .append(true)
        .create(true)
        .open(&dest.path)
        .map_err(io_err)?;
    let _lock = FileLock::exclusive(&file).map_err(io_err)?;

    let mut record = Vec::with_capacity(line.len() + 2);
    if !ends_with_newline(&mut file).map_err(io_err)? {
        record.push(b'\n');
    }
    record.extend_from_slice(line);
    record.push(b'\n');

    file.write_all(&record).map_err(io_err)?;
    file.flush().map_err(io_err)?;
    file.sync_all().map_err(io_err)?;
    Ok(())
}

fn ends_with_newline(file: &mut File) -> io::Result<bool> {
    if file.metadata()?.len() == 0 {
        return Ok(true);
    }
    file.seek(SeekFrom::End(-1))?;
    let mut last = [0u8; 1];
    file.read_exact(&mut last)?;
    Ok(last[0] == b'\n')
}

#[cfg(unix)]
struct FileLock {
    fd: libc::c_int,
}

#[cfg(unix)]
impl FileLock {
    fn exclusive(file: &File) -> io::Result<Self> {
        use std::os::unix::io::AsRawFd;

        let fd = file.as_raw_fd();
        if unsafe { libc::flock(fd, libc::LOCK_EX) } != 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(Self { fd })
    }
}

#[cfg(unix)]
impl Drop for FileLock {
    fn drop(&mut self) {
        unsafe {
            let _ = libc::flock(self.fd, libc::LOCK_UN);
        }
    }
}

#[cfg(not(unix))]
struct FileLock;

#[cfg(not(unix))]
impl FileLock {
    fn exclusive(_file: &File) -> io::Result<Self> {
        static WARNED: std::sync::Once = std::sync::Once::new();
        WARNED.call_once(|| {
            tracing::warn!(
                "advisory file locking is unavailable on this platform; appends are unlocked"
            );
        });
        Ok(Self)
    }
}
