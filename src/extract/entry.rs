use std::fmt;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::debug;

use crate::error::{ExtractError, Result};
use crate::io::ReadAt;
use crate::zip::{ZipArchive, ZipEntry};

use super::path::stripped_relative_path;

/// Uncompressed bytes moved per write
const COPY_BUFFER: usize = 64 * 1024;

/// What happened to one archive entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryOutcome {
    File(PathBuf),
    Directory(PathBuf),
    /// Stripping left nothing of the entry's path
    Skipped,
}

/// Extract one entry below `root`, dropping `strip_components` leading
/// segments of its stored name.
///
/// Existing files are truncated and overwritten. Recorded permission bits
/// are applied to the created file or directory; without them the umask
/// decides.
pub async fn extract_entry<R: ReadAt>(
    archive: &ZipArchive<R>,
    entry: &ZipEntry,
    root: &Path,
    strip_components: usize,
) -> Result<EntryOutcome> {
    let Some(relative) = stripped_relative_path(&entry.name, strip_components)? else {
        debug!(entry = %entry.name, strip_components, "skipping entry");
        return Ok(EntryOutcome::Skipped);
    };
    let path = root.join(relative);
    let mode = entry.permissions();

    if entry.is_directory() {
        create_dir_with_mode(&path, mode).await?;
        debug!(
            entry = %entry.name,
            path = %path.display(),
            mode = %OctalMode(mode),
            "created directory"
        );
        return Ok(EntryOutcome::Directory(path));
    }

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .await
            .map_err(|source| ExtractError::CreateDir {
                path: parent.to_path_buf(),
                source,
            })?;
    }

    let mut reader = archive
        .open_entry(entry)
        .await
        .map_err(|source| ExtractError::EntryOpen {
            name: entry.name.clone(),
            source,
        })?;

    let write_err = |source| ExtractError::Write {
        path: path.clone(),
        source,
    };

    let mut file = open_for_write(&path, mode).await.map_err(write_err)?;
    let mut buf = vec![0u8; COPY_BUFFER];
    let mut written = 0u64;
    loop {
        let n = reader
            .read(&mut buf)
            .await
            .map_err(|source| ExtractError::EntryRead {
                name: entry.name.clone(),
                source,
            })?;
        if n == 0 {
            break;
        }
        file.write_all(&buf[..n]).await.map_err(write_err)?;
        written += n as u64;
    }
    // tokio hands writes to a blocking thread; flush waits for them to land
    file.flush().await.map_err(write_err)?;
    drop(file);

    // the create call is subject to the umask
    if let Some(mode) = mode {
        restore_permissions(&path, mode).await?;
    }

    debug!(
        entry = %entry.name,
        path = %path.display(),
        bytes = written,
        mode = %OctalMode(mode),
        "wrote file"
    );
    Ok(EntryOutcome::File(path))
}

async fn create_dir_with_mode(path: &Path, mode: Option<u32>) -> Result<()> {
    let mut builder = fs::DirBuilder::new();
    builder.recursive(true);
    #[cfg(unix)]
    if let Some(mode) = mode {
        builder.mode(mode);
    }
    #[cfg(not(unix))]
    let _ = mode;

    builder
        .create(path)
        .await
        .map_err(|source| ExtractError::CreateDir {
            path: path.to_path_buf(),
            source,
        })
}

/// Open `path` for overwriting. A read-only file left by an earlier run is
/// made owner-writable and opened again once.
async fn open_for_write(path: &Path, mode: Option<u32>) -> std::io::Result<fs::File> {
    let mut options = fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    if let Some(mode) = mode {
        options.mode(mode);
    }
    #[cfg(not(unix))]
    let _ = mode;

    match options.open(path).await {
        Err(err) if err.kind() == ErrorKind::PermissionDenied => {
            let metadata = match fs::symlink_metadata(path).await {
                Ok(metadata) if metadata.is_file() => metadata,
                _ => return Err(err),
            };
            fs::set_permissions(path, owner_writable(metadata.permissions())).await?;
            options.open(path).await
        }
        result => result,
    }
}

fn owner_writable(mut permissions: std::fs::Permissions) -> std::fs::Permissions {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        permissions.set_mode(permissions.mode() | 0o200);
    }
    #[cfg(not(unix))]
    permissions.set_readonly(false);
    permissions
}

async fn restore_permissions(path: &Path, mode: u32) -> Result<()> {
    let permissions_err = |source| ExtractError::SetPermissions {
        path: path.to_path_buf(),
        mode,
        source,
    };

    #[cfg(unix)]
    let permissions = {
        use std::os::unix::fs::PermissionsExt;
        std::fs::Permissions::from_mode(mode)
    };

    // Only the read-only flag has a counterpart here
    #[cfg(not(unix))]
    let permissions = {
        let mut permissions = fs::metadata(path).await.map_err(permissions_err)?.permissions();
        permissions.set_readonly(mode & 0o222 == 0);
        permissions
    };

    fs::set_permissions(path, permissions)
        .await
        .map_err(permissions_err)
}

/// Logs a permission mode in octal without allocating
struct OctalMode(Option<u32>);

impl fmt::Display for OctalMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(mode) => write!(f, "{mode:o}"),
            None => f.write_str("default"),
        }
    }
}
