use anyhow::Context;
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

use flow_inspector::hierarchy::{self, DeviceFrame, Element, UiNode};
use flow_inspector::inspector::{self, DeviceBackend, HttpBackend, InspectorSession, Selection};
use flow_inspector::locator::Reliability;
use flow_inspector::runner::{self, ConsoleEventListener, ExecutionStreamTracker, RunOutcome};
use flow_inspector::script::{self, ScriptBuffer};
use flow_inspector::utils::Config;

#[derive(Parser)]
#[command(name = "flow-inspector")]
#[command(version = "0.1.0")]
#[command(about = "Inspect device screens and author flow scripts", long_about = None)]
struct Cli {
    /// Config file (YAML)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Backend URL (overrides config and environment)
    #[arg(short, long, global = true)]
    backend: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve locators for a point of a saved hierarchy (JSON or uiautomator XML)
    Locate {
        /// Hierarchy file
        hierarchy: PathBuf,

        /// Screen size as WIDTHxHEIGHT
        #[arg(short, long, default_value = "1080x2400")]
        size: String,

        /// Horizontal position, percent of screen width
        #[arg(short)]
        x: f64,

        /// Vertical position, percent of screen height
        #[arg(short)]
        y: f64,

        /// Action used for the emitted statements
        #[arg(short, long)]
        action: Option<String>,
    },

    /// Print the step → line table of a script
    Steps {
        /// Script file
        script: PathBuf,
    },

    /// Feed a recorded execution stream through the tracker
    Replay {
        /// Script the run was started from
        script: PathBuf,

        /// Raw stream transcript (`data: ` records)
        transcript: PathBuf,

        /// Transport chunk size to simulate
        #[arg(long, default_value = "4096")]
        chunk_size: usize,
    },

    /// Select on the live device screen
    Inspect {
        /// Horizontal position, percent of screen width
        #[arg(short)]
        x: f64,

        /// Vertical position, percent of screen height
        #[arg(short)]
        y: f64,

        /// Append the best step to this script
        #[arg(long)]
        append: Option<PathBuf>,

        /// App ID for a new script created by --append
        #[arg(long)]
        app_id: Option<String>,

        /// Execute the appended step on the device
        #[arg(long, default_value = "false", requires = "append")]
        run: bool,
    },

    /// Validate and run a script on the device, streaming progress
    Run {
        /// Script file
        script: PathBuf,
    },

    /// Refresh the hierarchy periodically and summarise each snapshot
    Watch {
        /// Refresh interval in milliseconds
        #[arg(short, long)]
        interval_ms: Option<u64>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();
    let mut config = Config::load(cli.config.as_deref()).context("Failed to load config")?;
    if let Some(url) = cli.backend {
        config.backend_url = url;
    }

    match cli.command {
        Commands::Locate {
            hierarchy,
            size,
            x,
            y,
            action,
        } => {
            let frame = DeviceFrame::from_size_string(&size, None)
                .with_context(|| format!("Invalid screen size: {}", size))?;
            let root = load_hierarchy(&hierarchy)?;

            let mut session = InspectorSession::new(frame, ScriptBuffer::default()).with_config(&config);
            let count = session.apply_hierarchy(&root);
            println!(
                "{} Loaded {} elements from {}",
                "▶".green().bold(),
                count,
                hierarchy.display()
            );

            let selection = session.select_at(x, y);
            print_selection(&selection, action.as_deref().unwrap_or(&config.default_action));
        }

        Commands::Steps { script } => {
            let text = read_script(&script)?;
            let lines: Vec<&str> = text.lines().collect();
            let steps = script::map_step_lines(&text);

            if steps.is_empty() {
                println!("{} No steps found (missing '---' separator?)", "⚠".yellow());
            }
            for (i, line) in steps.iter().enumerate() {
                let content = lines.get(line - 1).map(|l| l.trim()).unwrap_or_default();
                println!("  {:>3} → line {:<4} {}", i + 1, line, content.dimmed());
            }
        }

        Commands::Replay {
            script,
            transcript,
            chunk_size,
        } => {
            let text = read_script(&script)?;
            let bytes = std::fs::read(&transcript)
                .with_context(|| format!("Failed to read {}", transcript.display()))?;

            let chunks: Vec<flow_inspector::Result<Vec<u8>>> = bytes
                .chunks(chunk_size.max(1))
                .map(|chunk| Ok(chunk.to_vec()))
                .collect();
            let (_never_cancel, cancel_rx) = watch::channel(false);

            let mut tracker = ExecutionStreamTracker::new();
            tracker.start_run(&text, &display_name(&script));
            let outcome = tracker
                .consume(futures::stream::iter(chunks), cancel_rx)
                .await
                .context("Replay aborted")?;

            for entry in tracker.log() {
                runner::print_entry(entry);
            }
            println!("\n{} Line statuses", "■".blue().bold());
            runner::print_line_statuses(tracker.statuses());
            println!("\n{} Outcome: {:?}", "■".blue().bold(), outcome);
        }

        Commands::Inspect {
            x,
            y,
            append,
            app_id,
            run,
        } => {
            let backend = HttpBackend::from_config(&config)?;
            let frame = backend.device_frame().await.context("Failed to get device info")?;
            println!(
                "{} Device: {} ({}x{})",
                "▶".green().bold(),
                frame.model.cyan(),
                frame.width,
                frame.height
            );

            let buffer = match &append {
                Some(path) if path.exists() => ScriptBuffer::new(read_script(path)?),
                Some(_) => ScriptBuffer::new_flow(app_id.as_deref().unwrap_or("com.example.app")),
                None => ScriptBuffer::default(),
            };
            let mut session = InspectorSession::new(frame, buffer).with_config(&config);

            let root = backend
                .fetch_hierarchy()
                .await
                .context("Failed to fetch hierarchy")?;
            session.apply_hierarchy(&root);

            let selection = session.select_at(x, y);
            print_selection(&selection, &config.default_action);

            if let Some(path) = append {
                let result = if run {
                    session
                        .tap_and_run(&backend, x, y)
                        .await
                        .map(|(inserted, log_line)| (inserted, Some(log_line)))
                } else {
                    Ok((session.auto_insert(x, y), None))
                };

                // The appended text is kept even when the device rejects the step
                std::fs::write(&path, session.script().text())
                    .with_context(|| format!("Failed to write {}", path.display()))?;
                let (inserted, executed) = result.context("Step failed")?;

                println!(
                    "\n{} Appended step {} ({}) to {}",
                    "✓".green(),
                    inserted.number,
                    inserted.label,
                    path.display()
                );
                if let Some(log_line) = executed {
                    println!("{} Executed: {}", "✓".green(), log_line);
                }
            }
        }

        Commands::Run { script } => {
            let text = read_script(&script)?;
            let report = script::validate_script(&text);
            if !report.valid {
                println!("{} Validation failed: {}", "✗".red(), report.message.red());
                if let Some(line) = report.line {
                    println!("  Check line {}", line.to_string().yellow());
                }
                anyhow::bail!("Script is not valid");
            }

            let backend = HttpBackend::from_config(&config)?;
            let name = display_name(&script);

            let (cancel_tx, cancel_rx) = watch::channel(false);
            ctrlc::set_handler(move || {
                println!("\n{} Stopping run...", "⏹".yellow());
                let _ = cancel_tx.send(true);
            })?;

            let mut tracker = ExecutionStreamTracker::new();
            let listener = tokio::spawn(ConsoleEventListener::listen(tracker.subscribe()));

            tracker.start_run(&text, &name);
            let outcome = match backend.run_script(&text, &name).await {
                Ok(stream) => tracker.consume(stream, cancel_rx).await,
                Err(e) => Err(e),
            };
            drop(tracker);
            let _ = listener.await;

            match outcome.context("Run aborted")? {
                RunOutcome::Completed { exit_code: 0 } | RunOutcome::Cancelled => {}
                RunOutcome::Completed { exit_code } => {
                    anyhow::bail!("Run failed with exit code {}", exit_code)
                }
                RunOutcome::Incomplete => anyhow::bail!("Run ended without an exit code"),
            }
        }

        Commands::Watch { interval_ms } => {
            let backend: Arc<dyn DeviceBackend> = Arc::new(HttpBackend::from_config(&config)?);
            let refresher = Arc::new(inspector::HierarchyRefresher::new(backend));
            let period = Duration::from_millis(interval_ms.unwrap_or(config.hierarchy_refresh_ms));

            let (stop_tx, mut stop_rx) = watch::channel(false);
            ctrlc::set_handler(move || {
                let _ = stop_tx.send(true);
            })?;

            println!(
                "{} Watching hierarchy every {}ms (Ctrl+C to stop)",
                "▶".green().bold(),
                period.as_millis()
            );
            let mut snapshots = refresher.subscribe();
            let handle = refresher.spawn_periodic(period);

            loop {
                tokio::select! {
                    changed = snapshots.changed() => {
                        if changed.is_err() {
                            break;
                        }
                        let latest = snapshots.borrow_and_update().clone();
                        if let Some(snapshot) = latest {
                            let with_text = snapshot.elements.iter().filter(|e| e.text().is_some()).count();
                            println!(
                                "[{}] {} elements, {} with text",
                                snapshot.fetched_at.format("%H:%M:%S").to_string().dimmed(),
                                snapshot.elements.len(),
                                with_text
                            );
                        }
                    }
                    _ = stop_rx.changed() => break,
                }
            }
            handle.abort();
        }
    }

    Ok(())
}

fn read_script(path: &Path) -> anyhow::Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}

/// JSON snapshot (bare or wrapped in `output`) or a raw uiautomator XML dump
fn load_hierarchy(path: &Path) -> anyhow::Result<UiNode> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let root = if content.trim_start().starts_with('<') {
        hierarchy::xml::parse_dump(&content)?
    } else {
        inspector::decode_hierarchy(&content)?
    };
    Ok(root)
}

fn describe(element: &Element) -> String {
    if element.is_tapped_point() {
        return "no element (point)".to_string();
    }
    let class = element
        .class_name()
        .and_then(|c| c.rsplit('.').next())
        .unwrap_or("View");
    let b = element.bounds;
    match element.text().or_else(|| element.node.resource_id()) {
        Some(label) => format!(
            "{} \"{}\" [{},{}][{},{}]",
            class, label, b.left, b.top, b.right, b.bottom
        ),
        None => format!("{} [{},{}][{},{}]", class, b.left, b.top, b.right, b.bottom),
    }
}

fn print_selection(selection: &Selection, action: &str) {
    println!(
        "\n{} Selected: {}",
        "●".cyan(),
        describe(&selection.element).white().bold()
    );
    println!("  Locators:");
    for (i, locator) in selection.locators.iter().enumerate() {
        let reliability = match locator.reliability {
            Reliability::High => "high".green(),
            Reliability::Medium => "medium".yellow(),
            Reliability::Low => "low".red(),
        };
        println!(
            "  {} {:<18} {:<40} [{}]",
            format!("{}.", i).dimmed(),
            locator.label,
            locator.syntax,
            reliability
        );
        let yaml = script::emit(action, &locator.selector.to_params());
        for line in yaml.lines() {
            println!("       {}", line.dimmed());
        }
    }
}
