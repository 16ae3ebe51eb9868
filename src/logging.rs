use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;
use std::sync::{Arc, Mutex};

use anyhow::Result;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;
use tracing_subscriber::fmt::MakeWriter;

/// Writes every formatted line to stdout and, when configured, to the run log.
#[derive(Clone)]
pub(crate) struct TeeMakeWriter {
    pub log_file: Option<Arc<Mutex<File>>>,
}

impl TeeMakeWriter {
    pub fn stdout_only() -> Self {
        Self { log_file: None }
    }

    pub fn with_file(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            log_file: Some(Arc::new(Mutex::new(file))),
        })
    }
}

impl<'a> MakeWriter<'a> for TeeMakeWriter {
    type Writer = TeeWriter;

    fn make_writer(&'a self) -> Self::Writer {
        TeeWriter {
            log_file: self.log_file.clone(),
        }
    }
}

pub(crate) struct TeeWriter {
    log_file: Option<Arc<Mutex<File>>>,
}

impl std::io::Write for TeeWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        if let Some(file) = &self.log_file
            && let Ok(mut file) = file.lock()
        {
            // Log-file failures are dropped; stdout still gets the line.
            let _ = file.write_all(buf);
        }
        std::io::stdout().write_all(buf)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        if let Some(file) = &self.log_file
            && let Ok(mut file) = file.lock()
        {
            let _ = file.flush();
        }
        std::io::stdout().flush()
    }
}

/// Unknown level names fall back to `info`.
pub(crate) fn parse_level(level: &str) -> Level {
    level.trim().parse().unwrap_or(Level::INFO)
}

pub(crate) fn init_tracing(level: &str, log_file: Option<&Path>) -> Result<()> {
    let make_writer = match log_file {
        Some(path) => TeeMakeWriter::with_file(path)?,
        None => TeeMakeWriter::stdout_only(),
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(parse_level(level))
        .with_writer(make_writer)
        .finish();
    tracing::subscriber::set_global_default(subscriber).ok();
    Ok(())
}
