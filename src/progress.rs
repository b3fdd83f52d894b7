//! Optional terminal progress for interactive runs: a row counter while extracting.

use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// Row counter. With a known limit it renders a bar, otherwise a spinner.
pub fn make_row_progress(limit: Option<u32>, label: &str) -> ProgressBar {
    let (pb, template) = match limit {
        Some(n) => (
            ProgressBar::new(n as u64),
            "{spinner:.green} {msg} {pos}/{len} [{bar:.cyan/blue}] {percent:>3}%  elapsed: {elapsed_precise}",
        ),
        None => (ProgressBar::new_spinner(), "{spinner:.green} {msg} {pos} rows  elapsed: {elapsed_precise}"),
    };
    if let Ok(style) = ProgressStyle::with_template(template) {
        pb.set_style(style.progress_chars("█▉▊▋▌▍▎▏  "));
    }
    if !label.is_empty() {
        pb.set_message(label.to_string());
    }
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}
