use std::cmp::min;
use std::fmt::Write;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use indicatif::{ProgressBar, ProgressState, ProgressStyle};
use mongoperf_core::prelude::DelegatedShutdownListener;

/// What the progress display measures against.
#[derive(Debug, Clone, Copy)]
pub(crate) enum ProgressPlan {
    /// Elapsed time against the configured duration.
    Duration(Duration),
    /// Recorded outcomes against the total of all finite repeats.
    Invocations(u64),
    /// Recorded outcomes with no known end.
    Open,
}

/// Displays progress on a background thread until the shutdown signal fires.
pub(crate) fn start_progress(
    plan: ProgressPlan,
    completed: Arc<AtomicU64>,
    shutdown_listener: DelegatedShutdownListener,
) {
    let spawned = std::thread::Builder::new()
        .name("progress".to_string())
        .spawn(move || {
            let start_time = Instant::now();
            let pb = progress_bar(plan);

            loop {
                if shutdown_listener.should_shutdown() {
                    log::trace!("Progress thread shutting down");
                    pb.finish_and_clear();
                    break;
                }

                let done = completed.load(Ordering::Relaxed);
                match plan {
                    ProgressPlan::Duration(planned_runtime) => {
                        pb.set_position(min(
                            start_time.elapsed().as_secs(),
                            planned_runtime.as_secs(),
                        ));
                        pb.set_message(format!("{} operations", done));
                    }
                    ProgressPlan::Invocations(_) | ProgressPlan::Open => pb.set_position(done),
                }
                pb.tick();
                std::thread::sleep(Duration::from_millis(250));
            }
        });

    if let Err(e) = spawned {
        log::warn!("Failed to start progress display: {}", e);
    }
}

fn progress_bar(plan: ProgressPlan) -> ProgressBar {
    match plan {
        ProgressPlan::Duration(planned_runtime) => {
            let hours = planned_runtime.as_secs() / 3600;
            let minutes = (planned_runtime.as_secs() % 3600) / 60;
            let seconds = planned_runtime.as_secs() % 60;
            let style = ProgressStyle::with_template(
                "{spinner:.green} [{wide_bar:.cyan/blue}] [{elapsed_precise} / {planned_runtime}] {msg}",
            )
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .with_key(
                "planned_runtime",
                move |_state: &ProgressState, w: &mut dyn Write| {
                    let _ = write!(w, "{:02}:{:02}:{:02}", hours, minutes, seconds);
                },
            )
            .progress_chars("#>-");

            ProgressBar::new(planned_runtime.as_secs()).with_style(style)
        }
        ProgressPlan::Invocations(total) => {
            let style = ProgressStyle::with_template(
                "{spinner:.green} [{wide_bar:.cyan/blue}] {pos}/{len} operations [{elapsed_precise}]",
            )
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-");

            ProgressBar::new(total).with_style(style)
        }
        ProgressPlan::Open => {
            let style =
                ProgressStyle::with_template("{spinner:.green} [{elapsed_precise}] {pos} operations")
                    .unwrap_or_else(|_| ProgressStyle::default_spinner());

            ProgressBar::new_spinner().with_style(style)
        }
    }
}
