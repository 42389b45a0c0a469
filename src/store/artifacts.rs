//! Screenshot artifacts, one PNG per snapshot id.

use std::fs;
use std::io::Cursor;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use image::{DynamicImage, ImageFormat};

use crate::utils::fs::write_atomic;

#[derive(Debug, Clone)]
pub struct ArtifactStore {
    dir: PathBuf,
}

impl ArtifactStore {
    pub fn new(dir: PathBuf) -> Result<Self> {
        fs::create_dir_all(&dir)
            .with_context(|| format!("failed to create artifact directory {}", dir.display()))?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, snapshot_id: &str) -> Result<PathBuf> {
        // Ids are uuids; refuse anything that could escape the directory.
        if snapshot_id.is_empty()
            || !snapshot_id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            bail!("invalid snapshot id for artifact: {snapshot_id:?}");
        }
        Ok(self.dir.join(format!("{snapshot_id}.png")))
    }

    /// Encodes `image` as PNG and writes it atomically.
    pub fn save_screenshot(&self, snapshot_id: &str, image: &DynamicImage) -> Result<PathBuf> {
        let final_path = self.path_for(snapshot_id)?;

        let mut encoded = Cursor::new(Vec::new());
        image
            .write_to(&mut encoded, ImageFormat::Png)
            .context("failed to encode screenshot as PNG")?;

        write_atomic(&final_path, encoded.get_ref(), false)?;
        Ok(final_path)
    }

    pub fn load_screenshot(&self, snapshot_id: &str) -> Result<Option<Vec<u8>>> {
        let path = self.path_for(snapshot_id)?;
        if !path.exists() {
            return Ok(None);
        }
        fs::read(&path)
            .map(Some)
            .with_context(|| format!("failed to read {}", path.display()))
    }

    /// Removes the artifact if present. Returns whether a file was deleted.
    pub fn delete(&self, snapshot_id: &str) -> Result<bool> {
        let path = self.path_for(snapshot_id)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(true),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(err) => Err(err).with_context(|| format!("failed to delete {}", path.display())),
        }
    }
}
