use std::cell::RefCell;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use colored::Colorize;
use walkdir::WalkDir;

use video_converter::{print_error, print_warning};

use crate::config::Config;
use crate::ffmpeg::{self, Ffmpeg, Transcoder};
use crate::logger::FileLogger;
use crate::stats::RunStats;
use crate::watch::StopSignal;

/// Video file extensions picked up by a directory sweep.
const VIDEO_EXTENSIONS: &[&str] = &["mp4", "avi", "mov", "mkv", "wmv", "flv", "webm"];

/// Suffix appended to the file stem of converted files.
const CONVERTED_SUFFIX: &str = "_converted";

/// Video converter that runs ffmpeg for a single file or every video in a directory tree.
pub struct VideoConverter<T: Transcoder = Ffmpeg> {
    pub(crate) config: Config,
    pub(crate) transcoder: T,
    logger: Option<RefCell<FileLogger>>,
    pub(crate) stop: StopSignal,
}

/// Reasons why a file was not converted
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// Output file already exists
    OutputExists { path: PathBuf },
    /// Command was only printed
    DryRun,
}

/// Result of processing a single file
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConversionOutcome {
    /// File was converted successfully
    Converted { output: PathBuf, duration: Duration },
    /// File was skipped
    Skipped(SkipReason),
    /// ffmpeg could not be started or exited with an error
    Failed { error: String },
}

/// Everything that happened during one directory sweep.
#[derive(Debug, Default)]
pub struct SweepReport {
    /// Outcome for each matching input file in walk order
    pub(crate) results: Vec<(PathBuf, ConversionOutcome)>,
    /// Set when the directory walk failed and the sweep was cut short
    pub(crate) walk_error: Option<String>,
    /// Set when a stop was requested before the sweep finished
    pub(crate) stopped: bool,
    pub(crate) stats: RunStats,
}

/// Get the output path for a converted file: `<output_dir>/<stem>_converted.<format>`.
pub fn output_path_for(input: &Path, format: &str, output_dir: &Path) -> PathBuf {
    let name = video_converter::path_to_file_stem_string(input);
    output_dir.join(format!("{name}{CONVERTED_SUFFIX}.{format}"))
}

/// Check if a file is a video file based on its extension.
pub fn is_video_file(path: &Path) -> bool {
    let extension = video_converter::path_to_file_extension_string(path);
    VIDEO_EXTENSIONS.contains(&extension.as_str())
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::OutputExists { path } => {
                write!(f, "Output file already exists: \"{}\"", path.display())
            }
            Self::DryRun => write!(f, "Dry run"),
        }
    }
}

impl VideoConverter<Ffmpeg> {
    /// Create a converter that runs the ffmpeg executable and logs to a file.
    pub fn new(config: Config, stop: StopSignal) -> Self {
        let transcoder = Ffmpeg::new(config.verbose);
        let converter = Self::with_transcoder(config, transcoder, stop);
        match FileLogger::new() {
            Ok(logger) => converter.with_logger(logger),
            Err(e) => {
                print_warning!("File logging disabled: {e:#}");
                converter
            }
        }
    }
}

impl<T: Transcoder> VideoConverter<T> {
    /// Create a converter using the given transcoder, without a log file.
    pub fn with_transcoder(config: Config, transcoder: T, stop: StopSignal) -> Self {
        Self {
            config,
            transcoder,
            logger: None,
            stop,
        }
    }

    /// Write progress to the given log file.
    pub(crate) fn with_logger(mut self, logger: FileLogger) -> Self {
        self.logger = Some(RefCell::new(logger));
        self
    }

    /// Run the mode selected in the config.
    ///
    /// Watch mode loops until a stop is requested.
    /// Otherwise converts the given input file, or every video in the input directory.
    pub fn run(&self) -> Result<()> {
        self.prepare()?;

        if self.config.watch {
            self.watch();
        } else if let Some((input, output)) = self.config.single_file() {
            let outcome = self.convert_file(input, output);
            self.log_skipped(input, &outcome);
        } else {
            let report = self.convert_directory();
            if report.stopped {
                println!("\n{}", "Aborted by user".bold().red());
            } else if report.results.is_empty() && report.walk_error.is_none() {
                print_warning!("No video files found in: {}", self.config.input_dir.display());
            }
            report.stats.print_summary();
        }

        self.log_end();
        Ok(())
    }

    /// Check preconditions before doing any conversion work.
    ///
    /// Watch mode without auto-convert never converts, so it skips the ffmpeg check
    /// and does not create the output directory.
    fn prepare(&self) -> Result<()> {
        let converts = !self.config.watch || self.config.auto_convert;

        if converts && !self.transcoder.is_available() {
            anyhow::bail!("ffmpeg is not available. Install ffmpeg and make sure it is in PATH");
        }

        if self.config.verbose {
            self.print_config();
        }

        if converts && !self.config.dryrun {
            fs::create_dir_all(&self.config.output_dir).with_context(|| {
                format!(
                    "Failed to create output directory: {}",
                    self.config.output_dir.display()
                )
            })?;
        }

        self.log_init();
        Ok(())
    }

    fn print_config(&self) {
        println!("{}", "Video Converter".bold().magenta());
        println!("Input:   {}", self.config.input_dir.display());
        println!("Output:  {}", self.config.output_dir.display());
        println!("Format:  {}", self.config.format);
        println!("Quality: {}", self.config.quality);
        println!("Workers: {} (conversion is sequential)", self.config.workers);
        println!("Dryrun:  {}", video_converter::colorize_bool(self.config.dryrun));
        if let Some(logger) = &self.logger {
            println!("Log:     {}", logger.borrow().path().display());
        }
    }

    /// Convert all video files found recursively in the input directory.
    ///
    /// Failed files do not stop the sweep.
    /// A directory walk error ends the sweep and is stored in the report.
    pub fn convert_directory(&self) -> SweepReport {
        let mut report = SweepReport::default();
        let input_dir = &self.config.input_dir;

        for entry in WalkDir::new(input_dir).sort_by_file_name() {
            if self.stop.is_triggered() {
                report.stopped = true;
                break;
            }

            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    let error = format!("Failed to process directory {}: {e}", input_dir.display());
                    print_error!("{error}");
                    self.log_walk_error(&error);
                    report.walk_error = Some(error);
                    break;
                }
            };

            if entry.file_type().is_dir() || !is_video_file(entry.path()) {
                continue;
            }

            let input = entry.into_path();
            let output = output_path_for(&input, &self.config.format, &self.config.output_dir);

            let start = Instant::now();
            let outcome = self.convert_file(&input, &output);
            report.stats.add_result(&outcome, start.elapsed());
            report.results.push((input, outcome));
        }

        // An idle watch sweep only finds already converted files, keep those out of the log.
        let idle = report.stats.files_converted == 0 && report.stats.files_failed == 0;
        if !(self.config.watch && idle) {
            for (input, outcome) in &report.results {
                self.log_skipped(input, outcome);
            }
            self.log_stats(&report.stats);
        }
        report
    }

    /// Convert a single file with ffmpeg.
    ///
    /// Existing output files are never overwritten or reconverted.
    pub fn convert_file(&self, input: &Path, output: &Path) -> ConversionOutcome {
        if self.config.verbose {
            println!(
                "{}",
                format!(
                    "Converting: {} -> {}",
                    video_converter::path_to_string_relative(input),
                    video_converter::path_to_string_relative(output)
                )
                .bold()
                .magenta()
            );
        }

        if output.exists() {
            let reason = SkipReason::OutputExists {
                path: output.to_path_buf(),
            };
            let outcome = ConversionOutcome::Skipped(reason);
            self.print_outcome(input, &outcome);
            return outcome;
        }

        let args = ffmpeg::build_ffmpeg_args(input, output, self.config.quality);

        if self.config.dryrun {
            println!("[DRYRUN] {}", ffmpeg::command_line(&args));
            return ConversionOutcome::Skipped(SkipReason::DryRun);
        }

        if self.config.verbose {
            println!("Running: {}", ffmpeg::command_line(&args));
        }

        self.log_start(input, output);
        let start = Instant::now();
        let result = self.transcoder.transcode(&args);
        let duration = start.elapsed();

        let outcome = match result {
            Ok(()) => {
                self.log_success(output, duration);
                ConversionOutcome::Converted {
                    output: output.to_path_buf(),
                    duration,
                }
            }
            Err(e) => {
                let error = format!("{e:#}");
                self.log_failure(input, &error);
                ConversionOutcome::Failed { error }
            }
        };

        self.print_outcome(input, &outcome);
        outcome
    }

    /// Failures are always printed, other outcomes only in verbose mode.
    fn print_outcome(&self, input: &Path, outcome: &ConversionOutcome) {
        match outcome {
            ConversionOutcome::Converted { output, duration } => {
                if self.config.verbose {
                    println!(
                        "{}",
                        format!(
                            "✓ Converted in {}: {}",
                            video_converter::format_duration(*duration),
                            video_converter::path_to_string_relative(output)
                        )
                        .green()
                    );
                }
            }
            ConversionOutcome::Skipped(reason) => {
                if self.config.verbose {
                    println!("⊘ Skipped: {reason}");
                }
            }
            ConversionOutcome::Failed { error } => {
                print_error!(
                    "Conversion failed for {}: {error}",
                    video_converter::path_to_string_relative(input)
                );
            }
        }
    }

    fn log_init(&self) {
        if let Some(logger) = &self.logger {
            logger.borrow_mut().log_init(&self.config);
        }
    }

    fn log_start(&self, input: &Path, output: &Path) {
        if let Some(logger) = &self.logger {
            logger.borrow_mut().log_start(input, output);
        }
    }

    fn log_success(&self, output: &Path, duration: Duration) {
        if let Some(logger) = &self.logger {
            logger.borrow_mut().log_success(output, duration);
        }
    }

    fn log_skipped(&self, input: &Path, outcome: &ConversionOutcome) {
        if let (Some(logger), ConversionOutcome::Skipped(reason @ SkipReason::OutputExists { .. })) =
            (&self.logger, outcome)
        {
            logger.borrow_mut().log_skip(input, reason);
        }
    }

    fn log_failure(&self, input: &Path, error: &str) {
        if let Some(logger) = &self.logger {
            logger.borrow_mut().log_failure(input, error);
        }
    }

    fn log_walk_error(&self, error: &str) {
        if let Some(logger) = &self.logger {
            logger.borrow_mut().log_walk_error(error);
        }
    }

    fn log_stats(&self, stats: &RunStats) {
        if let Some(logger) = &self.logger {
            logger.borrow_mut().log_stats(stats);
        }
    }

    fn log_end(&self) {
        if let Some(logger) = &self.logger {
            logger.borrow_mut().log_end();
        }
    }
}




#[cfg(test)]
mod convert_tests {
    use super::test_support::FakeTranscoder;
    use super::*;

    use tempfile::{TempDir, tempdir};

    fn converter(config: Config) -> VideoConverter<FakeTranscoder> {
        VideoConverter::with_transcoder(config, FakeTranscoder::default(), StopSignal::new())
    }

    fn config_for(dir: &TempDir) -> Config {
        Config {
            input_dir: dir.path().join("input"),
            output_dir: dir.path().join("output"),
            ..Config::default()
        }
    }

    fn touch(path: &Path) {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, b"data").unwrap();
    }

    #[test]
    fn existing_output_is_skipped_without_invoking_ffmpeg() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("a.avi");
        let output = dir.path().join("b.mp4");
        touch(&input);
        touch(&output);

        let converter = converter(config_for(&dir));
        let outcome = converter.convert_file(&input, &output);

        assert_eq!(
            outcome,
            ConversionOutcome::Skipped(SkipReason::OutputExists { path: output.clone() })
        );
        assert_eq!(converter.transcoder.call_count(), 0);
        assert_eq!(fs::read(&output).unwrap(), b"data");
    }

    #[test]
    fn second_conversion_of_same_pair_is_skipped() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("clip.mkv");
        let output = dir.path().join("clip_converted.mp4");
        touch(&input);

        let converter = converter(config_for(&dir));
        let first = converter.convert_file(&input, &output);
        assert!(matches!(first, ConversionOutcome::Converted { ref output, .. } if output.exists()));

        let second = converter.convert_file(&input, &output);
        assert!(matches!(second, ConversionOutcome::Skipped(SkipReason::OutputExists { .. })));
        assert_eq!(converter.transcoder.call_count(), 1);
    }

    #[test]
    fn converted_file_uses_configured_quality() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("clip.mkv");
        let output = dir.path().join("clip_converted.mp4");
        touch(&input);

        let config = Config {
            quality: crate::ffmpeg::Quality::High,
            ..config_for(&dir)
        };
        let converter = converter(config);
        converter.convert_file(&input, &output);

        let calls = converter.transcoder.calls.borrow();
        assert_eq!(
            calls[0],
            ffmpeg::build_ffmpeg_args(&input, &output, crate::ffmpeg::Quality::High)
        );
    }

    #[test]
    fn failure_is_reported_not_fatal() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("broken.avi");
        let output = dir.path().join("broken_converted.mp4");
        touch(&input);

        let converter = VideoConverter::with_transcoder(
            config_for(&dir),
            FakeTranscoder {
                fail_on: Some("broken"),
                ..FakeTranscoder::default()
            },
            StopSignal::new(),
        );

        let outcome = converter.convert_file(&input, &output);
        assert_eq!(
            outcome,
            ConversionOutcome::Failed {
                error: "ffmpeg exited with status: 1".to_string()
            }
        );
        assert!(!output.exists());
    }

    #[test]
    fn dryrun_does_not_invoke_ffmpeg() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("clip.mov");
        touch(&input);

        let config = Config {
            dryrun: true,
            ..config_for(&dir)
        };
        let converter = converter(config);
        let outcome = converter.convert_file(&input, &dir.path().join("clip_converted.mp4"));

        assert_eq!(outcome, ConversionOutcome::Skipped(SkipReason::DryRun));
        assert_eq!(converter.transcoder.call_count(), 0);
    }

    #[test]
    fn sweep_converts_only_video_files() {
        let dir = tempdir().unwrap();
        let config = config_for(&dir);
        touch(&config.input_dir.join("clip.MOV"));
        touch(&config.input_dir.join("notes.txt"));
        fs::create_dir_all(&config.output_dir).unwrap();

        let converter = converter(config);
        let report = converter.convert_directory();

        let input_dir = &converter.config.input_dir;
        let output_dir = &converter.config.output_dir;
        assert_eq!(converter.transcoder.inputs(), vec![input_dir.join("clip.MOV")]);
        assert!(output_dir.join("clip_converted.mp4").exists());
        assert_eq!(fs::read(input_dir.join("notes.txt")).unwrap(), b"data");
        assert_eq!(report.results.len(), 1);
        assert_eq!(report.stats.files_converted, 1);
        assert!(report.walk_error.is_none());
        assert!(!report.stopped);
    }

    #[test]
    fn sweep_recurses_and_ignores_directories() {
        let dir = tempdir().unwrap();
        let config = config_for(&dir);
        touch(&config.input_dir.join("b.mkv"));
        touch(&config.input_dir.join("nested/deeper/a.webm"));
        fs::create_dir_all(config.input_dir.join("folder.mp4")).unwrap();
        fs::create_dir_all(&config.output_dir).unwrap();

        let converter = converter(config);
        let report = converter.convert_directory();

        let input_dir = &converter.config.input_dir;
        assert_eq!(
            converter.transcoder.inputs(),
            vec![input_dir.join("b.mkv"), input_dir.join("nested/deeper/a.webm")]
        );
        assert_eq!(report.stats.files_converted, 2);
    }

    #[test]
    fn sweep_skips_already_converted_files() {
        let dir = tempdir().unwrap();
        let config = config_for(&dir);
        touch(&config.input_dir.join("old.avi"));
        touch(&config.input_dir.join("new.avi"));
        touch(&config.output_dir.join("old_converted.mp4"));

        let converter = converter(config);
        let report = converter.convert_directory();

        assert_eq!(
            converter.transcoder.inputs(),
            vec![converter.config.input_dir.join("new.avi")]
        );
        assert_eq!(report.stats.files_converted, 1);
        assert_eq!(report.stats.files_skipped_existing, 1);
    }

    #[test]
    fn sweep_continues_after_failure() {
        let dir = tempdir().unwrap();
        let config = config_for(&dir);
        touch(&config.input_dir.join("a.mp4"));
        touch(&config.input_dir.join("b_broken.mp4"));
        touch(&config.input_dir.join("c.mp4"));
        fs::create_dir_all(&config.output_dir).unwrap();

        let converter = VideoConverter::with_transcoder(
            config,
            FakeTranscoder {
                fail_on: Some("broken"),
                ..FakeTranscoder::default()
            },
            StopSignal::new(),
        );
        let report = converter.convert_directory();

        assert_eq!(converter.transcoder.call_count(), 3);
        assert_eq!(report.stats.files_converted, 2);
        assert_eq!(report.stats.files_failed, 1);
        assert!(matches!(report.results[1].1, ConversionOutcome::Failed { .. }));
    }

    #[test]
    fn sweep_converts_file_named_only_by_extension() {
        let dir = tempdir().unwrap();
        let config = config_for(&dir);
        touch(&config.input_dir.join(".MOV"));
        fs::create_dir_all(&config.output_dir).unwrap();

        let converter = converter(config);
        let report = converter.convert_directory();

        assert_eq!(converter.transcoder.call_count(), 1);
        assert_eq!(report.stats.files_converted, 1);
        assert!(converter.config.output_dir.join("_converted.mp4").exists());
    }

    fn line_count(path: &Path) -> usize {
        fs::read_to_string(path).map_or(0, |content| content.lines().count())
    }

    #[test]
    fn idle_watch_sweeps_do_not_grow_log() {
        let dir = tempdir().unwrap();
        let config = Config {
            watch: true,
            auto_convert: true,
            ..config_for(&dir)
        };
        for index in 0..10 {
            touch(&config.input_dir.join(format!("clip{index}.mp4")));
            touch(&config.output_dir.join(format!("clip{index}_converted.mp4")));
        }
        touch(&config.input_dir.join("new.mkv"));

        let logger = FileLogger::in_dir(&dir.path().join("logs")).unwrap();
        let log_path = logger.path().to_path_buf();
        let converter = converter(config).with_logger(logger);

        let report = converter.convert_directory();
        assert_eq!(report.stats.files_converted, 1);
        let after_first_sweep = line_count(&log_path);
        assert!(after_first_sweep > 0);

        for _ in 0..20 {
            let report = converter.convert_directory();
            assert_eq!(report.stats.files_skipped_existing, 11);
        }

        assert_eq!(line_count(&log_path), after_first_sweep);
        assert_eq!(converter.transcoder.call_count(), 1);
    }

    #[test]
    fn one_shot_sweep_logs_skipped_files() {
        let dir = tempdir().unwrap();
        let config = config_for(&dir);
        touch(&config.input_dir.join("clip.mp4"));
        touch(&config.output_dir.join("clip_converted.mp4"));

        let logger = FileLogger::in_dir(&dir.path().join("logs")).unwrap();
        let log_path = logger.path().to_path_buf();
        let converter = converter(config).with_logger(logger);
        converter.convert_directory();

        let content = fs::read_to_string(&log_path).unwrap();
        assert!(content.contains("SKIP"));
        assert!(content.contains("STATISTICS"));
    }

    #[test]
    fn missing_input_directory_ends_sweep_with_walk_error() {
        let dir = tempdir().unwrap();
        let converter = converter(config_for(&dir));

        let report = converter.convert_directory();

        assert!(report.walk_error.is_some());
        assert!(report.results.is_empty());
        assert_eq!(converter.transcoder.call_count(), 0);
    }

    #[test]
    fn stopped_sweep_converts_nothing() {
        let dir = tempdir().unwrap();
        let config = config_for(&dir);
        touch(&config.input_dir.join("clip.mp4"));

        let converter = converter(config);
        converter.stop.trigger();
        let report = converter.convert_directory();

        assert!(report.stopped);
        assert_eq!(converter.transcoder.call_count(), 0);
    }

    #[test]
    fn run_fails_before_converting_when_ffmpeg_is_missing() {
        let dir = tempdir().unwrap();
        let config = config_for(&dir);
        touch(&config.input_dir.join("clip.mp4"));

        let converter = VideoConverter::with_transcoder(
            config,
            FakeTranscoder {
                unavailable: true,
                ..FakeTranscoder::default()
            },
            StopSignal::new(),
        );

        assert!(converter.run().is_err());
        assert_eq!(converter.transcoder.call_count(), 0);
        assert!(!converter.config.output_dir.exists());
    }

    #[test]
    fn run_watch_fails_when_ffmpeg_is_missing_and_auto_convert_is_set() {
        let dir = tempdir().unwrap();
        let config = Config {
            watch: true,
            auto_convert: true,
            ..config_for(&dir)
        };
        let converter = VideoConverter::with_transcoder(
            config,
            FakeTranscoder {
                unavailable: true,
                ..FakeTranscoder::default()
            },
            StopSignal::new(),
        );

        assert!(converter.run().is_err());
        assert!(!converter.config.output_dir.exists());
    }

    #[test]
    fn run_watch_without_auto_convert_needs_no_ffmpeg() {
        let dir = tempdir().unwrap();
        let config = Config {
            watch: true,
            ..config_for(&dir)
        };
        let converter = VideoConverter::with_transcoder(
            config,
            FakeTranscoder {
                unavailable: true,
                ..FakeTranscoder::default()
            },
            StopSignal::new(),
        );
        converter.stop.trigger();

        assert!(converter.run().is_ok());
        assert!(!converter.config.output_dir.exists());
        assert_eq!(converter.transcoder.call_count(), 0);
    }

    #[test]
    fn run_creates_output_directory_and_sweeps() {
        let dir = tempdir().unwrap();
        let config = config_for(&dir);
        touch(&config.input_dir.join("clip.MOV"));
        touch(&config.input_dir.join("notes.txt"));

        let converter = converter(config);
        converter.run().unwrap();

        assert_eq!(converter.transcoder.call_count(), 1);
        assert!(converter.config.output_dir.join("clip_converted.mp4").exists());
    }

    #[test]
    fn run_single_file_with_existing_output_skips() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("a.avi");
        let output = dir.path().join("b.mp4");
        touch(&input);
        touch(&output);

        let config = Config {
            input_file: Some(input),
            output_file: Some(output),
            ..config_for(&dir)
        };
        let converter = converter(config);

        assert!(converter.run().is_ok());
        assert_eq!(converter.transcoder.call_count(), 0);
    }

    #[test]
    fn run_single_file_ignores_extension_filter() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("recording.m4v");
        let output = dir.path().join("out").join("recording.mp4");
        touch(&input);
        fs::create_dir_all(output.parent().unwrap()).unwrap();

        let config = Config {
            input_file: Some(input.clone()),
            output_file: Some(output.clone()),
            ..config_for(&dir)
        };
        let converter = converter(config);
        converter.run().unwrap();

        assert_eq!(converter.transcoder.inputs(), vec![input]);
        assert!(output.exists());
    }
}
