//! Logging setup shared by the solesource binaries.
//!
//! Events go to a size-rotated file under `<home>/logs/` and to stderr. A
//! log directory that cannot be created downgrades to stderr only; logging
//! never stops a command from running.

use anyhow::{Context, Result};
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

pub const DEFAULT_LOG_FILTER: &str = "solesource=info,solesource_core=info";
pub const HOME_ENV: &str = "SOLESOURCE_HOME";

const KEEP_ROTATED: usize = 4;
const MAX_FILE_BYTES: u64 = 5 * 1024 * 1024;

pub struct LogConfig<'a> {
    pub app_name: &'a str,
    pub verbose: bool,
    /// Interactive prompts own the terminal; stderr only shows warnings
    /// unless `verbose` is set.
    pub interactive: bool,
}

/// Install the global subscriber. Returns the active log file, if any.
///
/// `RUST_LOG` overrides [`DEFAULT_LOG_FILTER`]. Calling this twice is
/// harmless; the second subscriber is dropped.
pub fn init_logging(config: LogConfig<'_>) -> Option<PathBuf> {
    let filter = || {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER))
    };
    let stderr_filter = if config.interactive && !config.verbose {
        EnvFilter::new("warn")
    } else {
        filter()
    };

    let (file_layer, log_path) = match RotatingWriter::open(&logs_dir(), config.app_name) {
        Ok(writer) => {
            let path = writer.path();
            let layer = tracing_subscriber::fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_filter(filter());
            (Some(layer), Some(path))
        }
        Err(err) => {
            eprintln!("warning: file logging disabled: {:#}", err);
            (None, None)
        }
    };

    let _ = tracing_subscriber::registry()
        .with(file_layer)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(io::stderr)
                .with_target(false)
                .with_filter(stderr_filter),
        )
        .try_init();

    if let Some(path) = &log_path {
        tracing::debug!(path = %path.display(), app = config.app_name, "file logging enabled");
    }
    log_path
}

/// `$SOLESOURCE_HOME`, else `~/.solesource`. Falls back to the working
/// directory when no home directory is known.
pub fn solesource_home() -> PathBuf {
    if let Some(path) = std::env::var_os(HOME_ENV).filter(|p| !p.is_empty()) {
        return PathBuf::from(path);
    }
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".solesource")
}

pub fn logs_dir() -> PathBuf {
    solesource_home().join("logs")
}

// ============================================================================
// Rotating file writer
// ============================================================================

/// `<name>.log` rolls to `<name>.log.1` once it would exceed the size cap;
/// older files shift up and the oldest beyond the retention count is dropped.
struct RotatingFile {
    dir: PathBuf,
    stem: String,
    file: File,
    written: u64,
}

impl RotatingFile {
    fn open(dir: &Path, name: &str) -> io::Result<Self> {
        fs::create_dir_all(dir)?;
        let stem = file_stem(name);
        let (file, written) = open_append(&dir.join(format!("{}.log", stem)))?;
        Ok(Self {
            dir: dir.to_path_buf(),
            stem,
            file,
            written,
        })
    }

    fn active_path(&self) -> PathBuf {
        self.dir.join(format!("{}.log", self.stem))
    }

    fn numbered_path(&self, n: usize) -> PathBuf {
        self.dir.join(format!("{}.log.{}", self.stem, n))
    }

    fn roll(&mut self) -> io::Result<()> {
        self.file.flush()?;

        let oldest = self.numbered_path(KEEP_ROTATED);
        if oldest.exists() {
            fs::remove_file(&oldest)?;
        }
        for n in (1..KEEP_ROTATED).rev() {
            let from = self.numbered_path(n);
            if from.exists() {
                fs::rename(&from, self.numbered_path(n + 1))?;
            }
        }
        fs::rename(self.active_path(), self.numbered_path(1))?;

        let (file, written) = open_append(&self.active_path())?;
        self.file = file;
        self.written = written;
        Ok(())
    }
}

impl Write for RotatingFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.written > 0 && self.written + buf.len() as u64 > MAX_FILE_BYTES {
            self.roll()?;
        }
        let n = self.file.write(buf)?;
        self.written += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file.flush()
    }
}

fn open_append(path: &Path) -> io::Result<(File, u64)> {
    let file = OpenOptions::new().create(true).append(true).open(path)?;
    let len = file.metadata()?.len();
    Ok((file, len))
}

fn file_stem(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect()
}

/// Cloneable handle so `fmt::layer` can make a writer per event.
#[derive(Clone)]
struct RotatingWriter {
    inner: Arc<Mutex<RotatingFile>>,
}

impl RotatingWriter {
    fn open(dir: &Path, name: &str) -> Result<Self> {
        let file = RotatingFile::open(dir, name)
            .with_context(|| format!("cannot open log file in {}", dir.display()))?;
        Ok(Self {
            inner: Arc::new(Mutex::new(file)),
        })
    }

    fn path(&self) -> PathBuf {
        match self.inner.lock() {
            Ok(file) => file.active_path(),
            Err(poisoned) => poisoned.into_inner().active_path(),
        }
    }

    fn with_file<T>(&self, f: impl FnOnce(&mut RotatingFile) -> io::Result<T>) -> io::Result<T> {
        let mut file = self
            .inner
            .lock()
            .map_err(|_| io::Error::new(io::ErrorKind::Other, "log writer lock poisoned"))?;
        f(&mut *file)
    }
}

impl<'a> tracing_subscriber::fmt::MakeWriter<'a> for RotatingWriter {
    type Writer = RotatingWriter;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

impl Write for RotatingWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.with_file(|file| file.write(buf))
    }

    fn flush(&mut self) -> io::Result<()> {
        self.with_file(|file| file.flush())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_file_stem_sanitizes() {
        assert_eq!(file_stem("solesource"), "solesource");
        assert_eq!(file_stem("sole source/cli"), "sole_source_cli");
    }

    #[test]
    fn test_roll_shifts_files() {
        let dir = TempDir::new().unwrap();
        let mut file = RotatingFile::open(dir.path(), "app").unwrap();
        file.write_all(b"first\n").unwrap();
        file.roll().unwrap();
        file.write_all(b"second\n").unwrap();
        file.flush().unwrap();

        let rolled = fs::read_to_string(dir.path().join("app.log.1")).unwrap();
        let active = fs::read_to_string(dir.path().join("app.log")).unwrap();
        assert_eq!(rolled, "first\n");
        assert_eq!(active, "second\n");
    }

    #[test]
    fn test_roll_drops_oldest() {
        let dir = TempDir::new().unwrap();
        let mut file = RotatingFile::open(dir.path(), "app").unwrap();
        for i in 0..=KEEP_ROTATED + 1 {
            writeln!(file, "entry {}", i).unwrap();
            file.roll().unwrap();
        }
        assert!(dir.path().join(format!("app.log.{}", KEEP_ROTATED)).exists());
        assert!(!dir
            .path()
            .join(format!("app.log.{}", KEEP_ROTATED + 1))
            .exists());
    }
}
