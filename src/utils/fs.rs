use std::fs;
use std::io::Write as _;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

fn temp_path_for(path: &Path) -> PathBuf {
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "data".into());
    path.with_file_name(format!("{file_name}.tmp.{}", std::process::id()))
}

/// Temp file + fsync + rename, so readers never see a partial file.
///
/// With `owner_only` the file is created `0600` on unix.
pub fn write_atomic(path: &Path, bytes: &[u8], owner_only: bool) -> Result<()> {
    let temp_path = temp_path_for(path);

    let result = write_and_replace(&temp_path, path, bytes, owner_only);
    if result.is_err() {
        // Nothing else owns the temp file once the write has failed.
        let _ = fs::remove_file(&temp_path);
    }
    result
}

fn write_and_replace(temp_path: &Path, path: &Path, bytes: &[u8], owner_only: bool) -> Result<()> {
    let mut file = fs::File::create(temp_path)
        .with_context(|| format!("failed to create {}", temp_path.display()))?;

    #[cfg(unix)]
    if owner_only {
        use std::os::unix::fs::PermissionsExt;
        file.set_permissions(fs::Permissions::from_mode(0o600))?;
    }
    #[cfg(not(unix))]
    let _ = owner_only;

    file.write_all(bytes)
        .with_context(|| format!("failed to write {}", temp_path.display()))?;
    file.sync_all()?;
    drop(file);

    fs::rename(temp_path, path).with_context(|| {
        format!(
            "failed to replace {} with {}",
            path.display(),
            temp_path.display()
        )
    })
}
