use anyhow::{Result, anyhow};
use async_trait::async_trait;
use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use tracing::info;

use crate::core::lifecycle::LifecycleComponent;

pub const LOCK_FILE: &str = ".writer.lock";

/// Take the exclusive writer lock on `path`. Released when the file is dropped.
pub fn acquire_writer_lock(path: &Path) -> Result<File> {
    let file = OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(false)
        .open(path)?;

    file.try_lock_exclusive().map_err(|_| {
        anyhow!(
            "another blindfold server is writing to {}",
            path.parent().unwrap_or(path).display()
        )
    })?;

    Ok(file)
}

/// Holds `<data_dir>/.writer.lock` for the lifetime of the server.
pub struct WriterLock {
    path: PathBuf,
    held: Option<File>,
}

impl WriterLock {
    pub fn new(data_dir: &Path) -> Self {
        Self {
            path: data_dir.join(LOCK_FILE),
            held: None,
        }
    }
}

#[async_trait]
impl LifecycleComponent for WriterLock {
    async fn on_init(&mut self) -> Result<()> {
        self.held = Some(acquire_writer_lock(&self.path)?);
        info!("Writer lock acquired: {}", self.path.display());
        Ok(())
    }

    async fn on_shutdown(&mut self) -> Result<()> {
        if let Some(file) = self.held.take() {
            file.unlock()?;
            info!("Writer lock released");
        }
        Ok(())
    }
}
