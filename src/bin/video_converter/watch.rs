//! Polling watch mode and cooperative shutdown.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use colored::Colorize;

use crate::convert::VideoConverter;
use crate::ffmpeg::Transcoder;

/// How often a waiting loop checks for a stop request.
const STOP_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Shared flag for requesting a graceful stop.
///
/// Checked between files and on every watch tick.
#[derive(Debug, Clone, Default)]
pub struct StopSignal {
    flag: Arc<AtomicBool>,
}

impl StopSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set up Ctrl+C handler for graceful abort.
    /// The first Ctrl+C lets the current file finish, a second one exits immediately.
    pub fn install_ctrlc_handler(&self) -> Result<()> {
        let flag = Arc::clone(&self.flag);
        ctrlc::set_handler(move || {
            if flag.load(Ordering::SeqCst) {
                std::process::exit(130);
            }
            println!("\n{}", "Received Ctrl+C, finishing current file...".yellow().bold());
            flag.store(true, Ordering::SeqCst);
        })
        .context("Failed to set Ctrl+C handler")
    }

    pub fn trigger(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_triggered(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// Sleep for the given duration or until a stop is requested.
    /// Returns true if stopped.
    pub fn wait(&self, duration: Duration) -> bool {
        let deadline = Instant::now() + duration;
        loop {
            if self.is_triggered() {
                return true;
            }
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            thread::sleep((deadline - now).min(STOP_POLL_INTERVAL));
        }
    }
}

/// Run `sweep` once per `interval` tick while `auto_convert` is enabled,
/// until a stop is requested.
///
/// Sweeps never overlap: the next tick starts counting after the previous sweep returns.
/// Returns the number of sweeps performed.
pub fn run_watch_loop(stop: &StopSignal, interval: Duration, auto_convert: bool, mut sweep: impl FnMut()) -> usize {
    let mut sweeps = 0;
    while !stop.wait(interval) {
        if auto_convert {
            sweep();
            sweeps += 1;
        }
    }
    sweeps
}

impl<T: Transcoder> VideoConverter<T> {
    /// Poll the input directory until stopped.
    pub(crate) fn watch(&self) -> usize {
        println!("{}", "Watch mode active...".bold().cyan());
        println!("Monitoring: {}", self.config.input_dir.display());
        if !self.config.auto_convert {
            video_converter::print_warning!("Auto-convert is disabled, new files will not be converted");
        }

        let sweeps = run_watch_loop(&self.stop, self.config.watch_interval, self.config.auto_convert, || {
            let report = self.convert_directory();
            if report.stats.files_converted > 0 || report.stats.files_failed > 0 {
                report.stats.print_summary();
            }
        });

        println!("{}", format!("Watch mode stopped after {sweeps} sweep(s)").yellow());
        sweeps
    }
}
