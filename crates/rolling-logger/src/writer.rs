//! Size-rotated log file behind a `MakeWriter`

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use tracing_subscriber::fmt::MakeWriter;

use crate::buffer::LineBuffer;
use crate::LoggerConfig;

#[derive(Debug)]
struct RollingFile {
    dir: PathBuf,
    app_name: String,
    max_file_bytes: u64,
    max_files: usize,
    file: Option<File>,
    size: u64,
}

impl RollingFile {
    fn open(dir: PathBuf, app_name: &str, config: &LoggerConfig) -> io::Result<Self> {
        fs::create_dir_all(&dir)?;
        let mut rolling = Self {
            dir,
            app_name: app_name.to_string(),
            max_file_bytes: config.max_file_bytes.max(1),
            max_files: config.max_files.max(1),
            file: None,
            size: 0,
        };
        let file = open_append(&rolling.path(0))?;
        rolling.size = file.metadata()?.len();
        rolling.file = Some(file);
        Ok(rolling)
    }

    /// `<app>.log` for index 0, `<app>.<n>.log` after that
    fn path(&self, index: usize) -> PathBuf {
        match index {
            0 => self.dir.join(format!("{}.log", self.app_name)),
            n => self.dir.join(format!("{}.{}.log", self.app_name, n)),
        }
    }

    fn rotate(&mut self) -> io::Result<()> {
        self.file = None;

        let oldest = self.path(self.max_files - 1);
        if oldest.exists() {
            fs::remove_file(&oldest)?;
        }
        for index in (0..self.max_files - 1).rev() {
            let from = self.path(index);
            if from.exists() {
                fs::rename(&from, self.path(index + 1))?;
            }
        }

        self.file = Some(open_append(&self.path(0))?);
        self.size = 0;
        Ok(())
    }

    fn write_all(&mut self, buf: &[u8]) -> io::Result<()> {
        let len = buf.len() as u64;
        if self.size > 0 && self.size + len > self.max_file_bytes {
            self.rotate()?;
        }
        let file = match self.file.as_mut() {
            Some(file) => file,
            None => {
                self.file = Some(open_append(&self.path(0))?);
                self.file.as_mut().ok_or_else(|| io::Error::other("log file unavailable"))?
            }
        };
        file.write_all(buf)?;
        self.size += len;
        Ok(())
    }

    fn flush(&mut self) -> io::Result<()> {
        match self.file.as_mut() {
            Some(file) => file.flush(),
            None => Ok(()),
        }
    }
}

fn open_append(path: &Path) -> io::Result<File> {
    OpenOptions::new().create(true).append(true).open(path)
}

#[derive(Debug)]
struct Shared {
    file: Mutex<RollingFile>,
    buffer: Mutex<LineBuffer>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    // A panic while logging must not silence the logger
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Cloneable handle; every clone writes to the same file and buffer
#[derive(Debug, Clone)]
pub struct RollingWriter {
    shared: Arc<Shared>,
}

impl RollingWriter {
    pub fn new(dir: impl Into<PathBuf>, app_name: &str, config: &LoggerConfig) -> io::Result<Self> {
        let file = RollingFile::open(dir.into(), app_name, config)?;
        Ok(Self {
            shared: Arc::new(Shared {
                file: Mutex::new(file),
                buffer: Mutex::new(LineBuffer::new(config.buffer_lines)),
            }),
        })
    }

    pub fn recent_lines(&self) -> Vec<String> {
        lock(&self.shared.buffer).lines()
    }

    pub fn current_path(&self) -> PathBuf {
        lock(&self.shared.file).path(0)
    }
}

impl Write for RollingWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        lock(&self.shared.file).write_all(buf)?;
        lock(&self.shared.buffer).push_text(&String::from_utf8_lossy(buf));
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        lock(&self.shared.file).flush()
    }
}

impl<'a> MakeWriter<'a> for RollingWriter {
    type Writer = RollingWriter;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(max_file_bytes: u64, max_files: usize) -> LoggerConfig {
        LoggerConfig {
            max_file_bytes,
            max_files,
            buffer_lines: 3,
        }
    }

    #[test]
    fn test_writes_and_buffers_lines() {
        let dir = tempfile::tempdir().unwrap();
        let mut writer = RollingWriter::new(dir.path(), "app", &config(1024, 3)).unwrap();

        writer.write_all(b"first\n").unwrap();
        writer.write_all(b"second\nthird\nfourth\n").unwrap();

        assert_eq!(writer.recent_lines(), vec!["second", "third", "fourth"]);
        let text = fs::read_to_string(dir.path().join("app.log")).unwrap();
        assert_eq!(text, "first\nsecond\nthird\nfourth\n");
    }

    #[test]
    fn test_rotates_by_size() {
        let dir = tempfile::tempdir().unwrap();
        let mut writer = RollingWriter::new(dir.path(), "app", &config(10, 3)).unwrap();

        writer.write_all(b"aaaaaaaa\n").unwrap();
        writer.write_all(b"bbbbbbbb\n").unwrap();
        writer.write_all(b"cccccccc\n").unwrap();
        writer.write_all(b"dddddddd\n").unwrap();

        let read = |name: &str| fs::read_to_string(dir.path().join(name)).unwrap();
        assert_eq!(read("app.log"), "dddddddd\n");
        assert_eq!(read("app.1.log"), "cccccccc\n");
        assert_eq!(read("app.2.log"), "bbbbbbbb\n");
        // Oldest file dropped past max_files
        assert!(!dir.path().join("app.3.log").exists());
    }

    #[test]
    fn test_appends_to_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("app.log"), "old\n").unwrap();

        let mut writer = RollingWriter::new(dir.path(), "app", &config(1024, 2)).unwrap();
        writer.write_all(b"new\n").unwrap();

        assert_eq!(fs::read_to_string(writer.current_path()).unwrap(), "old\nnew\n");
    }

    #[test]
    fn test_single_file_truncates_on_rotation() {
        let dir = tempfile::tempdir().unwrap();
        let mut writer = RollingWriter::new(dir.path(), "app", &config(4, 1)).unwrap();

        writer.write_all(b"abc\n").unwrap();
        writer.write_all(b"xyz\n").unwrap();

        assert_eq!(fs::read_to_string(dir.path().join("app.log")).unwrap(), "xyz\n");
        assert!(!dir.path().join("app.1.log").exists());
    }
}
