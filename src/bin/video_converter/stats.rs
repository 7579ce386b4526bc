use std::time::Duration;

use colored::Colorize;

use crate::convert::{ConversionOutcome, SkipReason};

/// Statistics for a conversion run
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RunStats {
    pub(crate) files_converted: usize,
    pub(crate) files_skipped_existing: usize,
    pub(crate) files_skipped_dryrun: usize,
    pub(crate) files_failed: usize,
    pub(crate) total_duration: Duration,
}

impl RunStats {
    pub(crate) fn add_result(&mut self, result: &ConversionOutcome, duration: Duration) {
        self.total_duration += duration;
        match result {
            ConversionOutcome::Converted { .. } => self.files_converted += 1,
            ConversionOutcome::Skipped(reason) => match reason {
                SkipReason::OutputExists { .. } => self.files_skipped_existing += 1,
                SkipReason::DryRun => self.files_skipped_dryrun += 1,
            },
            ConversionOutcome::Failed { .. } => self.files_failed += 1,
        }
    }

    pub(crate) const fn total_skipped(&self) -> usize {
        self.files_skipped_existing + self.files_skipped_dryrun
    }

    pub(crate) const fn total_files(&self) -> usize {
        self.files_converted + self.total_skipped() + self.files_failed
    }

    pub(crate) fn print_summary(&self) {
        println!("{}", "\n--- Conversion Summary ---".bold().magenta());
        println!("Video files found:      {}", self.total_files());
        println!("Files converted:        {}", self.files_converted);
        println!(
            "Files failed:           {}",
            if self.files_failed > 0 {
                self.files_failed.to_string().red()
            } else {
                "0".normal()
            }
        );
        println!("Files skipped:          {}", self.total_skipped());
        if self.total_skipped() > 0 {
            println!("  - Already exists:     {}", self.files_skipped_existing);
            if self.files_skipped_dryrun > 0 {
                println!("  - Dry run:            {}", self.files_skipped_dryrun);
            }
        }
        println!(
            "Total time:             {}",
            video_converter::format_duration(self.total_duration)
        );
    }
}
