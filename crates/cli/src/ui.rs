//! Terminal rendering of develop events

use crate::events::{DevelopEvent, EventSink};
use indicatif::{ProgressBar, ProgressStyle};
use owo_colors::OwoColorize;
use std::sync::Arc;
use std::time::Duration;

/// Render one event as a timestamped, colored line
pub fn render(event: &DevelopEvent) -> String {
    let timestamp = chrono::Local::now().format("%H:%M:%S").to_string();
    let text = event.to_string();

    let line = match event {
        DevelopEvent::Ready => text.green().bold().to_string(),
        DevelopEvent::ChangeDetected { .. } => text.yellow().to_string(),
        DevelopEvent::MiddlewareStarted { .. } | DevelopEvent::PackagingStarted { .. } => {
            text.dimmed().to_string()
        }
        DevelopEvent::Deployed { .. } => format!("{} {}", "✓".green(), text),
        DevelopEvent::Endpoint { .. } => text.cyan().to_string(),
        DevelopEvent::Error { .. } => format!("{} {}", "✗".red(), text.red()),
        _ => text,
    };

    format!("{} {}", timestamp.dimmed(), line)
}

/// Sink printing every event to the terminal; errors go to stderr
pub fn terminal_sink() -> EventSink {
    Arc::new(|event: DevelopEvent| {
        let line = render(&event);
        if event.is_error() {
            eprintln!("{}", line);
        } else {
            println!("{}", line);
        }
    })
}

/// Progress bar for the initial packaging of `len` functions
pub fn packaging_progress(len: u64) -> ProgressBar {
    let bar = ProgressBar::new(len);
    bar.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} ({percent}%) {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█▓▒░"),
    );
    bar.enable_steady_tick(Duration::from_millis(100));
    bar.set_message("Building initial artifacts, this might take a while.");
    bar
}
