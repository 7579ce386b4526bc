use std::fs;
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Local;

use crate::config::Config;
use crate::convert::SkipReason;
use crate::stats::RunStats;

/// Simple file logger for conversion operations with buffered writes
pub struct FileLogger {
    path: PathBuf,
    writer: BufWriter<File>,
}

impl FileLogger {
    /// Create a new file logger, writing to ~/logs/video-converter/video_converter_<timestamp>.log
    pub(crate) fn new() -> Result<Self> {
        let log_dir = video_converter::config::LOG_DIR
            .as_deref()
            .context("Failed to get home directory")?;
        Self::in_dir(log_dir)
    }

    /// Create a new timestamped log file in the given directory.
    pub(crate) fn in_dir(log_dir: &Path) -> Result<Self> {
        fs::create_dir_all(log_dir)
            .with_context(|| format!("Failed to create log directory: {}", log_dir.display()))?;

        let path = log_dir.join(format!(
            "video_converter_{}.log",
            Local::now().format("%Y-%m-%d_%H-%M-%S")
        ));

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("Failed to create log file: {}", path.display()))?;

        Ok(Self {
            path,
            writer: BufWriter::new(file),
        })
    }

    pub(crate) fn path(&self) -> &Path {
        &self.path
    }

    fn timestamp() -> String {
        Local::now().format("%Y-%m-%d %H:%M:%S").to_string()
    }

    /// Log when starting the program
    pub(crate) fn log_init(&mut self, config: &Config) {
        let _ = writeln!(
            self.writer,
            "[{}] INIT \"{}\" -> \"{}\"",
            Self::timestamp(),
            config.input_dir.display(),
            config.output_dir.display()
        );
        if let Some((input, output)) = config.single_file() {
            let _ = writeln!(self.writer, "  input_file: {}", input.display());
            let _ = writeln!(self.writer, "  output_file: {}", output.display());
        }
        let _ = writeln!(self.writer, "  format: {}", config.format);
        let _ = writeln!(self.writer, "  quality: {}", config.quality);
        let _ = writeln!(self.writer, "  workers: {} (unused)", config.workers);
        let _ = writeln!(self.writer, "  watch: {}", config.watch);
        let _ = writeln!(self.writer, "  auto_convert: {}", config.auto_convert);
        let _ = writeln!(self.writer, "  dryrun: {}", config.dryrun);
        let _ = writeln!(self.writer, "  verbose: {}", config.verbose);
        let _ = self.writer.flush();
    }

    /// Log when starting a conversion
    pub(crate) fn log_start(&mut self, input: &Path, output: &Path) {
        let _ = writeln!(
            self.writer,
            "[{}] START   \"{}\" -> \"{}\"",
            Self::timestamp(),
            input.display(),
            output.display()
        );
        let _ = self.writer.flush();
    }

    /// Log when a conversion finishes successfully
    pub(crate) fn log_success(&mut self, output: &Path, duration: Duration) {
        let _ = writeln!(
            self.writer,
            "[{}] SUCCESS \"{}\" | Time: {}",
            Self::timestamp(),
            output.display(),
            video_converter::format_duration(duration)
        );
        let _ = self.writer.flush();
    }

    /// Log when a file is skipped
    pub(crate) fn log_skip(&mut self, input: &Path, reason: &SkipReason) {
        let _ = writeln!(
            self.writer,
            "[{}] SKIP    \"{}\" | {reason}",
            Self::timestamp(),
            input.display()
        );
        let _ = self.writer.flush();
    }

    /// Log when a conversion fails
    pub(crate) fn log_failure(&mut self, input: &Path, error: &str) {
        let _ = writeln!(
            self.writer,
            "[{}] ERROR   \"{}\" | {error}",
            Self::timestamp(),
            input.display()
        );
        let _ = self.writer.flush();
    }

    /// Log a directory walk error that ended a sweep
    pub(crate) fn log_walk_error(&mut self, error: &str) {
        let _ = writeln!(self.writer, "[{}] ERROR   Directory walk: {error}", Self::timestamp());
        let _ = self.writer.flush();
    }

    /// Log sweep statistics
    pub(crate) fn log_stats(&mut self, stats: &RunStats) {
        let _ = writeln!(self.writer, "[{}] STATISTICS", Self::timestamp());
        let _ = writeln!(self.writer, "  Files converted: {}", stats.files_converted);
        let _ = writeln!(self.writer, "  Files failed:    {}", stats.files_failed);
        let _ = writeln!(self.writer, "  Files skipped:   {}", stats.total_skipped());
        if stats.total_skipped() > 0 {
            let _ = writeln!(self.writer, "    - Already exists: {}", stats.files_skipped_existing);
            let _ = writeln!(self.writer, "    - Dry run:        {}", stats.files_skipped_dryrun);
        }
        let _ = writeln!(
            self.writer,
            "  Total time: {}",
            video_converter::format_duration(stats.total_duration)
        );
        let _ = self.writer.flush();
    }

    /// Log the end of the run
    pub(crate) fn log_end(&mut self) {
        let _ = writeln!(self.writer, "[{}] END", Self::timestamp());
        let _ = self.writer.flush();
    }
}
