use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Maximum log file size before rotation (5 MB)
const MAX_LOG_SIZE: u64 = 5 * 1024 * 1024;
/// Size to keep after rotation (1 MB of most recent logs)
const KEEP_SIZE: u64 = 1024 * 1024;

const LOG_FILE_NAME: &str = "macroalloc.log";

/// Rotate log file if it exceeds `max_size`, keeping the last `keep` bytes.
fn rotate_log_if_needed(log_path: &Path, max_size: u64, keep: u64) -> io::Result<()> {
    if !log_path.exists() {
        return Ok(());
    }

    let file_size = fs::metadata(log_path)?.len();
    if file_size <= max_size {
        return Ok(());
    }

    let mut file = File::open(log_path)?;
    file.seek(SeekFrom::Start(file_size.saturating_sub(keep)))?;
    let mut buffer = Vec::new();
    file.read_to_end(&mut buffer)?;
    drop(file);

    // Skip to the first newline to avoid partial lines
    let skip = buffer
        .iter()
        .position(|&b| b == b'\n')
        .map_or(0, |i| i + 1);

    let mut file = File::create(log_path)?;
    file.write_all(b"--- Log rotated (older entries removed) ---\n")?;
    file.write_all(&buffer[skip..])?;

    Ok(())
}

/// A writer factory that produces writers for the shared log file
#[derive(Clone)]
struct LogWriterFactory {
    file: Arc<Mutex<File>>,
}

/// A writer that holds a reference to the shared file
struct LogWriter {
    file: Arc<Mutex<File>>,
}

impl LogWriter {
    fn with_file<T>(&self, f: impl FnOnce(&mut File) -> io::Result<T>) -> io::Result<T> {
        let mut file = self
            .file
            .lock()
            .map_err(|_| io::Error::other("log file lock poisoned"))?;
        f(&mut file)
    }
}

impl Write for LogWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.with_file(|file| file.write(buf))
    }

    fn flush(&mut self) -> io::Result<()> {
        self.with_file(|file| file.flush())
    }
}

impl<'a> MakeWriter<'a> for LogWriterFactory {
    type Writer = LogWriter;

    fn make_writer(&'a self) -> Self::Writer {
        LogWriter {
            file: self.file.clone(),
        }
    }
}

/// Default filter: `level` for the CLI, warnings only from the engine.
/// `RUST_LOG` takes precedence.
fn env_filter(level: &str) -> EnvFilter {
    let default_filter = format!("macroalloc={level},macroalloc_core=warn");
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter))
}

/// Initialize logging.
///
/// Without a directory, events go to stderr. With one, they are appended to
/// `{log_dir}/macroalloc.log`; once that file exceeds 5MB only its last 1MB is kept.
pub fn init_logging(log_dir: Option<&Path>, level: &str) -> color_eyre::Result<Option<PathBuf>> {
    let Some(log_dir) = log_dir else {
        tracing_subscriber::registry()
            .with(env_filter(level))
            .with(fmt::layer().with_writer(io::stderr).with_target(false))
            .init();
        return Ok(None);
    };

    fs::create_dir_all(log_dir)?;
    let log_path = log_dir.join(LOG_FILE_NAME);

    if let Err(e) = rotate_log_if_needed(&log_path, MAX_LOG_SIZE, KEEP_SIZE) {
        eprintln!("Warning: Failed to rotate log file: {e}");
    }

    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)?;
    let writer_factory = LogWriterFactory {
        file: Arc::new(Mutex::new(file)),
    };

    tracing_subscriber::registry()
        .with(env_filter(level))
        .with(
            fmt::layer()
                .with_writer(writer_factory)
                .with_ansi(false)
                .with_target(true)
                .with_thread_ids(false),
        )
        .init();

    tracing::info!(log_path = %log_path.display(), "logging initialized");
    Ok(Some(log_path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_rotation_keeps_tail_on_line_boundary() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(LOG_FILE_NAME);
        let lines: String = (0..100).map(|i| format!("line {i:03}\n")).collect();
        fs::write(&path, &lines).unwrap();

        rotate_log_if_needed(&path, 200, 100).unwrap();

        let rotated = fs::read_to_string(&path).unwrap();
        let mut rotated_lines = rotated.lines();
        assert_eq!(
            rotated_lines.next(),
            Some("--- Log rotated (older entries removed) ---")
        );
        let kept: Vec<&str> = rotated_lines.collect();
        assert!(kept.iter().all(|l| l.starts_with("line ")));
        assert_eq!(kept.last(), Some(&"line 099"));
        assert!(kept.len() < 100);
    }

    #[test]
    fn test_small_log_untouched() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(LOG_FILE_NAME);
        fs::write(&path, "short\n").unwrap();
        rotate_log_if_needed(&path, MAX_LOG_SIZE, KEEP_SIZE).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "short\n");

        // Missing file is fine
        rotate_log_if_needed(&dir.path().join("absent.log"), 10, 5).unwrap();
    }
}
