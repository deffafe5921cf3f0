//! Rolling Logger
//!
//! File logger for shelf hosts.
//! Log lines go to a small set of size-rotated files (`app.log`, `app.1.log`, ...)
//! and the most recent lines are also kept in an in-memory circular buffer
//! so a host can show them without touching the disk.

use std::collections::VecDeque;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, OnceLock};

use tracing_subscriber::fmt::MakeWriter;

/// Writer installed by `init_logger`, kept for `recent_lines`
static WRITER: OnceLock<RollingWriter> = OnceLock::new();

/// Rotation and buffering limits
#[derive(Debug, Clone)]
pub struct RollingConfig {
    /// Rotate once the current file would grow past this size
    pub max_file_bytes: u64,
    /// Number of files kept on disk, including the current one
    pub max_files: usize,
    /// Number of lines kept in memory
    pub ring_capacity: usize,
    pub max_level: tracing::Level,
}

impl Default for RollingConfig {
    fn default() -> Self {
        Self {
            max_file_bytes: 1024 * 1024,
            max_files: 3,
            ring_capacity: 500,
            max_level: tracing::Level::INFO,
        }
    }
}

// ========================
// Rotated file set
// ========================

struct RollingFile {
    dir: PathBuf,
    app_name: String,
    max_file_bytes: u64,
    max_files: usize,
    file: Option<File>,
    written: u64,
}

impl RollingFile {
    fn open(dir: &Path, app_name: &str, config: &RollingConfig) -> io::Result<Self> {
        fs::create_dir_all(dir)?;
        let mut rolling = Self {
            dir: dir.to_path_buf(),
            app_name: app_name.to_string(),
            max_file_bytes: config.max_file_bytes.max(1),
            max_files: config.max_files.max(1),
            file: None,
            written: 0,
        };
        let current = rolling.path(0);
        rolling.written = fs::metadata(&current).map(|m| m.len()).unwrap_or(0);
        rolling.file = Some(OpenOptions::new().create(true).append(true).open(current)?);
        Ok(rolling)
    }

    /// Index 0 is the live file, higher indices are older
    fn path(&self, index: usize) -> PathBuf {
        if index == 0 {
            self.dir.join(format!("{}.log", self.app_name))
        } else {
            self.dir.join(format!("{}.{}.log", self.app_name, index))
        }
    }

    fn rotate(&mut self) -> io::Result<()> {
        self.file = None;

        let oldest = self.path(self.max_files - 1);
        if oldest.exists() {
            fs::remove_file(&oldest)?;
        }
        for index in (1..self.max_files).rev() {
            let from = self.path(index - 1);
            if from.exists() {
                fs::rename(&from, self.path(index))?;
            }
        }

        self.file = Some(
            OpenOptions::new()
                .create(true)
                .write(true)
                .truncate(true)
                .open(self.path(0))?,
        );
        self.written = 0;
        Ok(())
    }

    fn write_all(&mut self, buf: &[u8]) -> io::Result<()> {
        if self.written > 0 && self.written + buf.len() as u64 > self.max_file_bytes {
            self.rotate()?;
        }
        if let Some(file) = self.file.as_mut() {
            file.write_all(buf)?;
            self.written += buf.len() as u64;
        }
        Ok(())
    }

    fn flush(&mut self) -> io::Result<()> {
        match self.file.as_mut() {
            Some(file) => file.flush(),
            None => Ok(()),
        }
    }
}

// ========================
// Circular line buffer
// ========================

struct RingBuffer {
    lines: VecDeque<String>,
    capacity: usize,
}

impl RingBuffer {
    fn new(capacity: usize) -> Self {
        Self {
            lines: VecDeque::with_capacity(capacity.min(1024)),
            capacity: capacity.max(1),
        }
    }

    fn push(&mut self, line: String) {
        if self.lines.len() == self.capacity {
            self.lines.pop_front();
        }
        self.lines.push_back(line);
    }

    fn snapshot(&self) -> Vec<String> {
        self.lines.iter().cloned().collect()
    }
}

/// `MakeWriter` handing out clones that share one file set and one ring buffer
#[derive(Clone)]
pub struct RollingWriter {
    file: Arc<Mutex<RollingFile>>,
    ring: Arc<Mutex<RingBuffer>>,
}

impl RollingWriter {
    pub fn new(dir: impl AsRef<Path>, app_name: &str, config: &RollingConfig) -> io::Result<Self> {
        let file = RollingFile::open(dir.as_ref(), app_name, config)?;
        Ok(Self {
            file: Arc::new(Mutex::new(file)),
            ring: Arc::new(Mutex::new(RingBuffer::new(config.ring_capacity))),
        })
    }

    /// Most recent lines, oldest first
    pub fn recent_lines(&self) -> Vec<String> {
        self.ring
            .lock()
            .map(|ring| ring.snapshot())
            .unwrap_or_default()
    }
}

impl Write for RollingWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        {
            let mut file = self
                .file
                .lock()
                .map_err(|_| io::Error::new(io::ErrorKind::Other, "log file lock poisoned"))?;
            file.write_all(buf)?;
        }

        if let Ok(mut ring) = self.ring.lock() {
            for line in String::from_utf8_lossy(buf).lines() {
                let line = line.trim_end();
                if !line.is_empty() {
                    ring.push(line.to_string());
                }
            }
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        let mut file = self
            .file
            .lock()
            .map_err(|_| io::Error::new(io::ErrorKind::Other, "log file lock poisoned"))?;
        file.flush()
    }
}

impl<'a> MakeWriter<'a> for RollingWriter {
    type Writer = RollingWriter;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

// ========================
// Global logger
// ========================

/// Install the rolling logger with default limits
pub fn init_logger(log_dir: impl AsRef<Path>, app_name: &str) -> Result<(), String> {
    init_logger_with(log_dir, app_name, RollingConfig::default())
}

/// Install the rolling logger as the global `tracing` subscriber.
/// `log` records are bridged into the same subscriber.
pub fn init_logger_with(
    log_dir: impl AsRef<Path>,
    app_name: &str,
    config: RollingConfig,
) -> Result<(), String> {
    let writer = RollingWriter::new(log_dir, app_name, &config)
        .map_err(|e| format!("Failed to open log file: {}", e))?;

    tracing_subscriber::fmt()
        .with_writer(writer.clone())
        .with_ansi(false)
        .with_max_level(config.max_level)
        .try_init()
        .map_err(|e| format!("Failed to install logger: {}", e))?;

    WRITER
        .set(writer)
        .map_err(|_| "Logger already initialized".to_string())?;

    log::info!(
        "[{}] {} logger started",
        chrono::Local::now().format("%H:%M:%S%.3f"),
        app_name
    );
    Ok(())
}

pub fn info(message: &str) -> Result<(), String> {
    ensure_initialized()?;
    log::info!("{}", message);
    Ok(())
}

pub fn error(message: &str) -> Result<(), String> {
    ensure_initialized()?;
    log::error!("{}", message);
    Ok(())
}

/// Lines kept by the global logger, empty before `init_logger`
pub fn recent_lines() -> Vec<String> {
    WRITER.get().map(|w| w.recent_lines()).unwrap_or_default()
}

fn ensure_initialized() -> Result<(), String> {
    if WRITER.get().is_some() {
        Ok(())
    } else {
        Err("Logger not initialized".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_config() -> RollingConfig {
        RollingConfig {
            max_file_bytes: 64,
            max_files: 3,
            ring_capacity: 4,
            ..Default::default()
        }
    }

    #[test]
    fn test_writes_lines_to_live_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut writer = RollingWriter::new(dir.path(), "shelf", &small_config()).unwrap();

        writer.write_all(b"first line\n").unwrap();
        writer.flush().unwrap();

        let content = fs::read_to_string(dir.path().join("shelf.log")).unwrap();
        assert_eq!(content, "first line\n");
    }

    #[test]
    fn test_rotates_when_file_is_full() {
        let dir = tempfile::tempdir().unwrap();
        let mut writer = RollingWriter::new(dir.path(), "shelf", &small_config()).unwrap();

        let line = format!("{}\n", "x".repeat(40));
        for _ in 0..3 {
            writer.write_all(line.as_bytes()).unwrap();
        }
        writer.flush().unwrap();

        assert!(dir.path().join("shelf.log").exists());
        assert!(dir.path().join("shelf.1.log").exists());
        assert!(dir.path().join("shelf.2.log").exists());
        let live = fs::read_to_string(dir.path().join("shelf.log")).unwrap();
        assert_eq!(live, line);
    }

    #[test]
    fn test_keeps_at_most_max_files() {
        let dir = tempfile::tempdir().unwrap();
        let mut writer = RollingWriter::new(dir.path(), "shelf", &small_config()).unwrap();

        let line = format!("{}\n", "y".repeat(60));
        for _ in 0..6 {
            writer.write_all(line.as_bytes()).unwrap();
        }

        assert!(!dir.path().join("shelf.3.log").exists());
        let count = fs::read_dir(dir.path()).unwrap().count();
        assert_eq!(count, 3);
    }

    #[test]
    fn test_ring_buffer_keeps_latest_lines() {
        let dir = tempfile::tempdir().unwrap();
        let mut writer = RollingWriter::new(dir.path(), "shelf", &small_config()).unwrap();

        for i in 0..6 {
            writer.write_all(format!("line {}\n", i).as_bytes()).unwrap();
        }

        assert_eq!(
            writer.recent_lines(),
            vec!["line 2", "line 3", "line 4", "line 5"]
        );
    }

    #[test]
    fn test_helpers_require_init() {
        if WRITER.get().is_none() {
            assert!(info("not yet").is_err());
            assert!(recent_lines().is_empty());
        }
    }
}
