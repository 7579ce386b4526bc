//! ffmpeg invocation: quality tiers, argument building and the process runner.

use std::ffi::OsString;
use std::path::Path;
use std::process::{Command, ExitStatus, Stdio};

use anyhow::{Context, Result};

/// Transcoder executable, resolved from `PATH`.
pub const FFMPEG: &str = "ffmpeg";

const VIDEO_CODEC: &str = "libx264";
const AUDIO_CODEC: &str = "aac";

/// Output quality tier.
///
/// Maps to an x264 constant rate factor and encoder preset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Quality {
    /// Smaller files, faster encode
    Low,
    #[default]
    Medium,
    /// Bigger files, slower encode
    High,
}

impl Quality {
    /// Constant rate factor. Lower is better quality and bigger file size.
    #[must_use]
    pub const fn crf(self) -> u8 {
        match self {
            Self::Low => 28,
            Self::Medium => 23,
            Self::High => 18,
        }
    }

    /// x264 encoder preset name.
    #[must_use]
    pub const fn preset(self) -> &'static str {
        match self {
            Self::Low => "fast",
            Self::Medium => "medium",
            Self::High => "slow",
        }
    }

    /// Parse an exact lowercase quality tier name.
    /// Returns `None` for anything else, including other casings.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "low" => Some(Self::Low),
            "medium" => Some(Self::Medium),
            "high" => Some(Self::High),
            _ => None,
        }
    }
}

impl From<&str> for Quality {
    /// Unrecognized names fall back to medium.
    fn from(value: &str) -> Self {
        Self::parse(value).unwrap_or_default()
    }
}

impl std::fmt::Display for Quality {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        };
        write!(f, "{name}")
    }
}

/// External video transcoder.
pub trait Transcoder {
    /// Check that the transcoder can be invoked at all.
    fn is_available(&self) -> bool;

    /// Run one transcode with the given arguments, blocking until the process exits.
    /// A non-zero exit status is an error.
    fn transcode(&self, args: &[OsString]) -> Result<()>;
}

/// Runs the `ffmpeg` executable found in `PATH`.
#[derive(Debug, Default, Clone, Copy)]
pub struct Ffmpeg {
    /// Show ffmpeg output instead of discarding it
    verbose: bool,
}

impl Ffmpeg {
    pub const fn new(verbose: bool) -> Self {
        Self { verbose }
    }
}

impl Transcoder for Ffmpeg {
    fn is_available(&self) -> bool {
        Command::new(FFMPEG)
            .arg("-version")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .is_ok_and(|status| status.success())
    }

    fn transcode(&self, args: &[OsString]) -> Result<()> {
        let mut cmd = Command::new(FFMPEG);
        cmd.args(args).stdin(Stdio::null());
        if self.verbose {
            cmd.stdout(Stdio::inherit()).stderr(Stdio::inherit());
        } else {
            cmd.stdout(Stdio::null()).stderr(Stdio::null());
        }

        let status = run_command_isolated(&mut cmd).context("Failed to execute ffmpeg")?;
        if !status.success() {
            anyhow::bail!(
                "ffmpeg exited with status: {}",
                status
                    .code()
                    .map_or_else(|| "terminated by signal".to_string(), |code| code.to_string())
            );
        }
        Ok(())
    }
}

/// Build the ffmpeg argument list for converting `input` to `output`.
///
/// The output path is always the last argument.
/// Existing output files are overwritten by ffmpeg,
/// the caller is responsible for skipping those beforehand.
pub fn build_ffmpeg_args(input: &Path, output: &Path, quality: Quality) -> Vec<OsString> {
    let mut args: Vec<OsString> = Vec::with_capacity(12);
    args.push("-i".into());
    args.push(input.into());
    args.push("-crf".into());
    args.push(quality.crf().to_string().into());
    args.push("-preset".into());
    args.push(quality.preset().into());
    args.extend(["-c:v", VIDEO_CODEC, "-c:a", AUDIO_CODEC].map(OsString::from));
    args.push("-y".into());
    args.push(output.into());
    args
}

/// Format the full ffmpeg command line for printing.
pub fn command_line(args: &[OsString]) -> String {
    std::iter::once(FFMPEG.to_string())
        .chain(args.iter().map(|arg| arg.to_string_lossy().into_owned()))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Run a command in a new process group to prevent Ctrl+C from propagating to it.
/// This allows the main program to handle the signal and finish the current file gracefully.
fn run_command_isolated(cmd: &mut Command) -> std::io::Result<ExitStatus> {
    #[cfg(windows)]
    {
        use std::os::windows::process::CommandExt;
        const CREATE_NEW_PROCESS_GROUP: u32 = 0x0000_0200;
        cmd.creation_flags(CREATE_NEW_PROCESS_GROUP);
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt;
        cmd.process_group(0);
    }
    cmd.status()
}
