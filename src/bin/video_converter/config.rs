use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Result;
use serde::Deserialize;

use video_converter::{print_error, print_warning};

use crate::VideoConverterArgs;
use crate::ffmpeg::Quality;

/// Default directory to read videos from.
const DEFAULT_INPUT_DIR: &str = "/app/input";

/// Default directory to write converted videos to.
const DEFAULT_OUTPUT_DIR: &str = "/app/output";

/// Default output container format.
const DEFAULT_FORMAT: &str = "mp4";

/// Default number of workers. Accepted for compatibility, conversion is always sequential.
const DEFAULT_WORKERS: usize = 2;

/// Default polling interval for watch mode in seconds.
const DEFAULT_WATCH_INTERVAL_SECS: u64 = 5;

/// User configuration from the config file.
#[derive(Debug, Default, Deserialize)]
pub struct VideoConverterConfig {
    #[serde(default)]
    auto_convert: bool,
    #[serde(default)]
    dryrun: bool,
    #[serde(default)]
    format: Option<String>,
    #[serde(default)]
    input_dir: Option<PathBuf>,
    #[serde(default)]
    output_dir: Option<PathBuf>,
    #[serde(default)]
    quality: Option<String>,
    #[serde(default)]
    verbose: bool,
    #[serde(default)]
    watch_interval: Option<u64>,
    #[serde(default)]
    workers: Option<usize>,
}

/// Final config combined from CLI arguments and user config file.
#[derive(Debug)]
pub struct Config {
    pub(crate) auto_convert: bool,
    pub(crate) dryrun: bool,
    pub(crate) format: String,
    pub(crate) input_dir: PathBuf,
    pub(crate) input_file: Option<PathBuf>,
    pub(crate) output_dir: PathBuf,
    pub(crate) output_file: Option<PathBuf>,
    pub(crate) quality: Quality,
    pub(crate) verbose: bool,
    pub(crate) watch: bool,
    pub(crate) watch_interval: Duration,
    pub(crate) workers: usize,
}

/// Wrapper needed for parsing the config file section.
#[derive(Debug, Default, Deserialize)]
struct UserConfig {
    #[serde(default)]
    video_converter: VideoConverterConfig,
}

impl VideoConverterConfig {
    /// Try to read user config from the file if it exists.
    /// Otherwise, fall back to default config.
    pub fn get_user_config() -> Self {
        video_converter::config::CONFIG_PATH
            .as_deref()
            .filter(|path| path.is_file())
            .and_then(|path| {
                fs::read_to_string(path)
                    .map_err(|e| {
                        print_error!("Error reading config file {}: {e}", path.display());
                    })
                    .ok()
            })
            .and_then(|config_string| {
                Self::from_toml_str(&config_string)
                    .map_err(|e| {
                        print_error!("Error reading config file: {e}");
                    })
                    .ok()
            })
            .unwrap_or_default()
    }

    /// Parse the `[video_converter]` section from a TOML string.
    pub fn from_toml_str(config_string: &str) -> Result<Self> {
        let config = toml::from_str::<UserConfig>(config_string)?;
        Ok(config.video_converter)
    }
}

impl Config {
    /// Create config from given command line args and user config file.
    pub(crate) fn from_args(args: &VideoConverterArgs, user_config: VideoConverterConfig) -> Self {
        let input_dir = non_empty_path(args.input_dir.as_ref())
            .or_else(|| non_empty_path(user_config.input_dir.as_ref()))
            .unwrap_or_else(|| PathBuf::from(DEFAULT_INPUT_DIR));

        let output_dir = non_empty_path(args.output_dir.as_ref())
            .or_else(|| non_empty_path(user_config.output_dir.as_ref()))
            .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_DIR));

        let format = args
            .format
            .clone()
            .or(user_config.format)
            .unwrap_or_else(|| DEFAULT_FORMAT.to_string());

        let quality = args
            .quality
            .as_deref()
            .or(user_config.quality.as_deref())
            .map_or_else(Quality::default, |name| {
                Quality::parse(name).unwrap_or_else(|| {
                    if !name.is_empty() {
                        print_warning!("Unknown quality '{name}', using {}", Quality::default());
                    }
                    Quality::default()
                })
            });

        let watch_interval = Duration::from_secs(
            user_config
                .watch_interval
                .unwrap_or(DEFAULT_WATCH_INTERVAL_SECS)
                .max(1),
        );

        Self {
            auto_convert: args.auto_convert || user_config.auto_convert,
            dryrun: args.print || user_config.dryrun,
            format,
            input_dir,
            input_file: non_empty_path(args.input_file.as_ref()),
            output_dir,
            output_file: non_empty_path(args.output_file.as_ref()),
            quality,
            verbose: args.verbose || user_config.verbose,
            watch: args.watch,
            watch_interval,
            workers: args.workers.or(user_config.workers).unwrap_or(DEFAULT_WORKERS),
        }
    }

    /// Input and output paths for single-file mode.
    /// Only set when both files were given.
    pub(crate) fn single_file(&self) -> Option<(&Path, &Path)> {
        match (&self.input_file, &self.output_file) {
            (Some(input), Some(output)) => Some((input.as_path(), output.as_path())),
            _ => None,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            auto_convert: false,
            dryrun: false,
            format: DEFAULT_FORMAT.to_string(),
            input_dir: PathBuf::from(DEFAULT_INPUT_DIR),
            input_file: None,
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            output_file: None,
            quality: Quality::default(),
            verbose: false,
            watch: false,
            watch_interval: Duration::from_secs(DEFAULT_WATCH_INTERVAL_SECS),
            workers: DEFAULT_WORKERS,
        }
    }
}

/// Treat missing and blank paths the same.
fn non_empty_path(path: Option<&PathBuf>) -> Option<PathBuf> {
    path.filter(|path| !path.as_os_str().is_empty()).cloned()
}
