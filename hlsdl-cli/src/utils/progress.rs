use hlsdl_engine::{DownloadEvent, RunState};
use indicatif::{ProgressBar, ProgressStyle};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use super::format_bytes;

fn segment_style() -> ProgressStyle {
    ProgressStyle::default_bar()
        .template("{spinner:.green} {msg}\n[{elapsed_precise}] [{bar:40.green/white}] {pos}/{len} segments ({eta})")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("=> ")
}

/// Renders a run's events as a single segment progress bar.
#[derive(Clone)]
pub struct ProgressManager {
    bar: Arc<Mutex<Option<ProgressBar>>>,
    bytes: Arc<Mutex<u64>>,
    disabled: bool,
}

impl ProgressManager {
    pub fn new() -> Self {
        Self {
            bar: Arc::new(Mutex::new(None)),
            bytes: Arc::new(Mutex::new(0)),
            disabled: false,
        }
    }

    pub fn new_disabled() -> Self {
        Self {
            disabled: true,
            ..Self::new()
        }
    }

    pub fn handle_event(&self, event: &DownloadEvent) {
        if self.disabled {
            return;
        }
        let Ok(mut bar) = self.bar.lock() else {
            return;
        };

        match event {
            DownloadEvent::SegmentsDiscovered { total } => {
                let new_bar = ProgressBar::new(*total as u64);
                new_bar.set_style(segment_style());
                new_bar.set_message("Downloading segments");
                new_bar.enable_steady_tick(Duration::from_millis(500));
                *bar = Some(new_bar);
            }
            DownloadEvent::SegmentCompleted { bytes, .. } => {
                if let Some(bar) = bar.as_ref() {
                    let downloaded = match self.bytes.lock() {
                        Ok(mut total) => {
                            *total += bytes;
                            *total
                        }
                        Err(_) => 0,
                    };
                    bar.set_message(format!("Downloading segments ({})", format_bytes(downloaded)));
                    bar.inc(1);
                }
            }
            DownloadEvent::SegmentFailed { index, .. } => {
                if let Some(bar) = bar.as_ref() {
                    bar.println(format!("segment {index} failed"));
                    bar.inc(1);
                }
            }
            DownloadEvent::StateChanged(RunState::Assembling) => {
                if let Some(bar) = bar.as_ref() {
                    bar.set_message("Assembling output");
                }
            }
            DownloadEvent::Finished(outcome) => {
                if let Some(bar) = bar.take() {
                    bar.finish_with_message(format!("Finished {}", outcome.output.display()));
                }
            }
            DownloadEvent::Failed(error) => {
                if let Some(bar) = bar.take() {
                    bar.abandon_with_message(format!("Failed: {error}"));
                }
            }
            _ => {}
        }
    }
}
