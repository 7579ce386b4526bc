mod config;
mod convert;
mod ffmpeg;
mod logger;
mod stats;
mod watch;

use std::path::PathBuf;

use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;

use crate::config::{Config, VideoConverterConfig};
use crate::convert::VideoConverter;
use crate::ffmpeg::{Ffmpeg, Transcoder};
use crate::watch::StopSignal;

#[derive(Parser)]
#[command(
    author,
    version,
    name = env!("CARGO_BIN_NAME"),
    about = "Rota42 Video Converter - Convert videos using ffmpeg",
    long_about = "Batch video converter using ffmpeg.\n\
                  Converts a single file or every video in a directory tree, \
                  and can keep watching the input directory for new files."
)]
pub(crate) struct VideoConverterArgs {
    #[command(subcommand)]
    command: Option<VideoConverterCommand>,

    /// Input video directory [default: /app/input]
    #[arg(long, value_name = "DIR", value_hint = clap::ValueHint::DirPath)]
    input_dir: Option<PathBuf>,

    /// Output directory for converted videos [default: /app/output]
    #[arg(long, value_name = "DIR", value_hint = clap::ValueHint::DirPath)]
    output_dir: Option<PathBuf>,

    /// Specific file to convert, requires --output-file
    #[arg(long, value_name = "FILE", value_hint = clap::ValueHint::FilePath)]
    input_file: Option<PathBuf>,

    /// Output file for --input-file
    #[arg(long, value_name = "FILE", value_hint = clap::ValueHint::FilePath)]
    output_file: Option<PathBuf>,

    /// Output format (mp4, avi, mkv, webm) [default: mp4]
    #[arg(short, long, value_name = "FORMAT")]
    format: Option<String>,

    /// Video quality (low, medium, high) [default: medium]
    #[arg(short, long, value_name = "QUALITY")]
    quality: Option<String>,

    /// Number of parallel workers (accepted but unused, conversion is sequential) [default: 2]
    #[arg(long, value_name = "COUNT")]
    workers: Option<usize>,

    /// Print verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Keep monitoring the input directory
    #[arg(short, long)]
    watch: bool,

    /// Convert new files automatically in watch mode
    #[arg(short, long)]
    auto_convert: bool,

    /// Print commands without running them
    #[arg(short, long)]
    print: bool,

    /// Generate shell completion
    #[arg(short = 'l', long, name = "SHELL")]
    completion: Option<Shell>,
}

#[derive(Subcommand)]
enum VideoConverterCommand {
    /// Check that ffmpeg is available
    Health,
}

fn main() -> Result<()> {
    let args = VideoConverterArgs::parse();
    if let Some(ref shell) = args.completion {
        return video_converter::generate_shell_completion(
            *shell,
            VideoConverterArgs::command(),
            env!("CARGO_BIN_NAME"),
        );
    }

    match args.command {
        Some(VideoConverterCommand::Health) => health(),
        None => {
            let config = Config::from_args(&args, VideoConverterConfig::get_user_config());
            let stop = StopSignal::new();
            stop.install_ctrlc_handler()?;
            VideoConverter::new(config, stop).run()
        }
    }
}

/// Report whether ffmpeg can be invoked and exit with status 0 or 1.
fn health() -> Result<()> {
    if Ffmpeg::default().is_available() {
        println!("OK - FFmpeg disponível");
        Ok(())
    } else {
        println!("ERROR - FFmpeg não encontrado");
        std::process::exit(1);
    }
}
