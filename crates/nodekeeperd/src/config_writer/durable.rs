//! Crash-safe replacement of configuration files.

use std::fs;
use std::io::{self, Write};
use std::path::Path;

use nodekeeper_config::backup_path;
use tempfile::{Builder, NamedTempFile};

#[cfg(unix)]
use std::os::unix::fs::PermissionsExt;

use super::errors::{ConfigWriterError, WriteStage};

/// Replaces `path` with `contents`, keeping the previous version as a backup.
///
/// The existing file (if any) is copied to its `.bak` sibling first. The new
/// content is staged in a temporary file in the same directory, fsync'd, and
/// renamed into place, so readers observe either the old or the new content.
pub(crate) fn durable_write(path: &Path, contents: &[u8]) -> Result<(), ConfigWriterError> {
    durable_write_with(path, contents, |staged, destination| {
        staged
            .persist(destination)
            .map(|_file| ())
            .map_err(|error| error.error)
    })
}

/// [`durable_write`] with an injectable final rename step.
pub(super) fn durable_write_with<P>(
    path: &Path,
    contents: &[u8],
    persist: P,
) -> Result<(), ConfigWriterError>
where
    P: FnOnce(NamedTempFile, &Path) -> io::Result<()>,
{
    let failed = |stage: WriteStage| {
        move |source: io::Error| ConfigWriterError::Write {
            path: path.to_path_buf(),
            stage,
            source,
        }
    };

    match fs::copy(path, backup_path(path)) {
        Ok(_) => {}
        Err(error) if error.kind() == io::ErrorKind::NotFound => {}
        Err(error) => return Err(failed(WriteStage::Backup)(error)),
    }

    let directory = path.parent().ok_or_else(|| {
        failed(WriteStage::Stage)(io::Error::new(
            io::ErrorKind::NotFound,
            "target path did not have a parent directory",
        ))
    })?;
    let name = path
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("nodekeeper");

    let mut builder = Builder::new();
    builder.prefix(name).suffix(".tmp");
    #[cfg(unix)]
    builder.permissions(fs::Permissions::from_mode(0o600));

    let mut staged = builder
        .tempfile_in(directory)
        .map_err(failed(WriteStage::Stage))?;
    // A replaced file keeps the mode its owner gave it.
    #[cfg(unix)]
    if let Ok(existing) = fs::metadata(path) {
        staged
            .as_file()
            .set_permissions(existing.permissions())
            .map_err(failed(WriteStage::Stage))?;
    }
    staged
        .write_all(contents)
        .and_then(|()| staged.as_file().sync_all())
        .map_err(failed(WriteStage::Stage))?;
    persist(staged, path).map_err(failed(WriteStage::Rename))
}
