//! Terminal progress bar fed by the engine's percentage callback.

use std::sync::Arc;

use indicatif::{ProgressBar, ProgressStyle};
use snapsync::ProgressCallback;

/// A 0–100 progress bar.
pub struct PercentBar {
    bar: ProgressBar,
}

impl PercentBar {
    pub fn new(label: &str) -> Self {
        let bar = ProgressBar::new(100);
        let style = ProgressStyle::with_template("{msg:>12} [{bar:40.cyan/blue}] {pos:>3}%")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=> ");
        bar.set_style(style);
        bar.set_message(label.to_string());
        Self { bar }
    }

    /// Callback moving the bar to each reported percentage.
    pub fn callback(&self) -> ProgressCallback {
        let bar = self.bar.clone();
        Arc::new(move |percent: f64| bar.set_position(percent.round() as u64))
    }

    pub fn finish(&self, message: &str) {
        self.bar.finish_with_message(message.to_string());
    }

    pub fn abandon(&self) {
        self.bar.abandon();
    }
}

/// Spinner for work without a percentage.
pub fn spinner(message: &str) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    spinner.set_message(message.to_string());
    spinner.enable_steady_tick(std::time::Duration::from_millis(100));
    spinner
}
