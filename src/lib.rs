pub mod config;

use std::env;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Result;
use clap::Command;
use clap_complete::Shell;
use colored::{ColoredString, Colorize};

/// Format bool value as a coloured string.
#[must_use]
pub fn colorize_bool(value: bool) -> ColoredString {
    if value { "true".green() } else { "false".red() }
}

/// Convert the given path to be relative to the current working directory.
/// Returns the original path if the relative path cannot be created.
#[must_use]
pub fn get_relative_path_from_current_working_directory(path: &Path) -> PathBuf {
    env::current_dir().map_or_else(
        |_| path.to_path_buf(),
        |current_dir| path.strip_prefix(&current_dir).unwrap_or(path).to_path_buf(),
    )
}

/// Convert `OsStr` to String with invalid Unicode handling.
pub fn os_str_to_string(name: &OsStr) -> String {
    name.to_str().map_or_else(
        || name.to_string_lossy().replace('\u{FFFD}', ""),
        std::string::ToString::to_string,
    )
}

/// Convert given path to string with invalid Unicode handling.
pub fn path_to_string(path: &Path) -> String {
    path.to_str().map_or_else(
        || path.to_string_lossy().to_string().replace('\u{FFFD}', ""),
        std::string::ToString::to_string,
    )
}

/// Split the file name at its last dot into stem and extension.
///
/// Unlike `Path::file_stem`, a dotfile such as `.mp4` has an empty stem and `mp4` as extension.
fn split_file_name(path: &Path) -> (String, String) {
    let name = path.file_name().map(os_str_to_string).unwrap_or_default();
    match name.rfind('.') {
        Some(index) => (name[..index].to_string(), name[index + 1..].to_string()),
        None => (name, String::new()),
    }
}

/// Convert given path to file stem string with invalid Unicode handling.
///
/// ```rust
/// use std::path::Path;
/// use video_converter::path_to_file_stem_string;
///
/// assert_eq!(path_to_file_stem_string(Path::new("/videos/clip.final.MOV")), "clip.final");
/// assert_eq!(path_to_file_stem_string(Path::new("README")), "README");
/// assert_eq!(path_to_file_stem_string(Path::new("/videos/.MOV")), "");
/// ```
#[must_use]
pub fn path_to_file_stem_string(path: &Path) -> String {
    split_file_name(path).0
}

/// Convert given path to file extension lowercase string with invalid Unicode handling.
///
/// ```rust
/// use std::path::Path;
/// use video_converter::path_to_file_extension_string;
///
/// assert_eq!(path_to_file_extension_string(Path::new("clip.MOV")), "mov");
/// assert_eq!(path_to_file_extension_string(Path::new(".MOV")), "mov");
/// assert_eq!(path_to_file_extension_string(Path::new("notes")), "");
/// ```
#[must_use]
pub fn path_to_file_extension_string(path: &Path) -> String {
    split_file_name(path).1.to_lowercase()
}

/// Get relative path and convert to string with invalid unicode handling.
#[must_use]
pub fn path_to_string_relative(path: &Path) -> String {
    path_to_string(&get_relative_path_from_current_working_directory(path))
}

#[inline]
pub fn print_error(message: &str) {
    eprintln!("{}", format!("Error: {message}").red());
}

#[macro_export]
macro_rules! print_error {
    ($($arg:tt)*) => {
        $crate::print_error(&format!($($arg)*))
    };
}

#[inline]
pub fn print_warning(message: &str) {
    eprintln!("{}", message.yellow());
}

#[macro_export]
macro_rules! print_warning {
    ($($arg:tt)*) => {
        $crate::print_warning(&format!($($arg)*))
    };
}

/// Format duration as a human-readable string.
///
/// Durations under a minute keep one decimal since short clips convert quickly.
///
/// ```rust
/// use std::time::Duration;
/// use video_converter::format_duration;
///
/// assert_eq!(format_duration(Duration::from_millis(2500)), "2.5s");
/// assert_eq!(format_duration(Duration::from_secs(75)), "1m 15s");
/// assert_eq!(format_duration(Duration::from_secs(3723)), "1h 02m 03s");
/// ```
#[must_use]
pub fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    if secs >= 3600 {
        format!("{}h {:02}m {:02}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    } else if secs >= 60 {
        format!("{}m {:02}s", secs / 60, secs % 60)
    } else {
        format!("{:.1}s", duration.as_secs_f64())
    }
}

/// Write a shell completion script for the given shell to stdout.
pub fn generate_shell_completion(shell: Shell, mut command: Command, command_name: &str) -> Result<()> {
    clap_complete::generate(shell, &mut command, command_name, &mut std::io::stdout());
    Ok(())
}
