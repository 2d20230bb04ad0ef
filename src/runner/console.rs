use super::events::TrackerEvent;
use super::tracker::{LogEntry, LogLevel, RunStatus};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::collections::BTreeMap;
use std::io::IsTerminal;
use std::time::Duration;
use tokio::sync::broadcast::{self, error::RecvError};

/// Prints tracker updates as they arrive
pub struct ConsoleEventListener;

impl ConsoleEventListener {
    /// Runs until the tracker (the sending side) is dropped
    pub async fn listen(mut receiver: broadcast::Receiver<TrackerEvent>) {
        let spinner = if std::io::stdout().is_terminal() {
            ProgressBar::new_spinner()
        } else {
            // Piped output: no escape codes
            ProgressBar::with_draw_target(None, ProgressDrawTarget::hidden())
        };
        if let Ok(style) = ProgressStyle::default_spinner()
            .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏ ")
            .template("  {spinner} {msg}")
        {
            spinner.set_style(style);
        }

        loop {
            let event = match receiver.recv().await {
                Ok(event) => event,
                Err(RecvError::Lagged(skipped)) => {
                    log::warn!("Console fell behind, {} updates skipped", skipped);
                    continue;
                }
                Err(RecvError::Closed) => break,
            };

            match event {
                TrackerEvent::RunStarted { name } => {
                    spinner.suspend(|| {
                        println!("\n{} Run: {}", "▶".green().bold(), name.cyan());
                    });
                }
                TrackerEvent::Log(entry) => spinner.suspend(|| print_entry(&entry)),
                TrackerEvent::LineStatus { line, status } => match status {
                    RunStatus::Running => {
                        spinner.set_message(format!("line {} running...", line));
                        spinner.enable_steady_tick(Duration::from_millis(100));
                    }
                    RunStatus::Pass | RunStatus::Fail => {
                        spinner.disable_steady_tick();
                        spinner.set_message("");
                        spinner.tick();
                    }
                },
                TrackerEvent::LineStatusesCleared => {}
                TrackerEvent::RunEnded { .. } => {
                    spinner.finish_and_clear();
                }
            }
        }

        spinner.finish_and_clear();
    }
}

/// `[HH:MM:SS] text`, coloured by level
pub fn print_entry(entry: &LogEntry) {
    let time = format!("[{}]", entry.time).dimmed();
    match entry.level {
        LogLevel::Info => println!("{} {}", time, entry.text),
        LogLevel::Success => println!("{} {} {}", time, "✓".green(), entry.text.green().bold()),
        LogLevel::Error => println!("{} {} {}", time, "✗".red(), entry.text.red()),
    }
}

/// Per-line summary, in line order
pub fn print_line_statuses(statuses: &BTreeMap<usize, RunStatus>) {
    if statuses.is_empty() {
        println!("  {}", "No step lines were painted".dimmed());
        return;
    }
    for (line, status) in statuses {
        let label = match status {
            RunStatus::Pass => "✓ pass".green(),
            RunStatus::Fail => "✗ fail".red().bold(),
            RunStatus::Running => "… running".yellow(),
        };
        println!("  line {:>4}  {}", line, label);
    }
}
