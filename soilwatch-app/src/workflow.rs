use crate::console::{self, ConsoleCommand};
use crate::plotting;
use anyhow::{Context, Result};
use log::{info, warn};
use soilwatch_core::{
    adapter,
    export::DEFAULT_EXPORT_FILE,
    feed::{FeedSource, HttpFeed},
    session::{SessionBuilder, SessionHandle, SessionState},
    SoilwatchError,
};
use soilwatch_schemas::{file_formats::Settings, reading::MetricGroup};
use std::{
    path::{Path, PathBuf},
    time::Duration,
};
use tokio::{
    io::{AsyncBufReadExt, BufReader},
    time::{self, Instant},
};

/// When an unattended session should end on its own.
#[derive(Debug, Clone, Copy, Default)]
pub struct StopAfter {
    pub cycles: Option<u64>,
    pub duration: Option<Duration>,
}

/// Runs a live session until the user quits, a limit is hit, or Ctrl-C arrives.
///
/// On the way out the full log is exported and every panel is plotted.
pub async fn run_watch(settings: &Settings, limits: StopAfter, interactive: bool) -> Result<()> {
    println!("\n--- [Workflow] Starting Sensor Session ---");
    let feed = HttpFeed::new(settings.endpoint.clone())?;
    println!("Polling {} every {}s", feed.endpoint(), settings.poll_interval_secs);

    let handle = SessionBuilder::new()
        .with_settings(settings)
        .build(feed)?
        .spawn();
    let output_dir = PathBuf::from(&settings.output_dir);

    if interactive {
        println!("{}", console::HELP);
    }
    drive_session(&handle, &output_dir, limits, interactive).await?;

    println!("\n--- [Workflow] Stopping Session ---");
    let state = handle.stop().await?;
    finish_session(&state, &output_dir)
}

async fn drive_session(
    handle: &SessionHandle,
    output_dir: &Path,
    limits: StopAfter,
    interactive: bool,
) -> Result<()> {
    let deadline = limits.duration.map(|d| Instant::now() + d);
    let mut watcher = time::interval(Duration::from_secs(1));
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = interactive;

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                println!("\nInterrupted.");
                return Ok(());
            }
            _ = sleep_until(deadline) => {
                info!("Session duration elapsed");
                return Ok(());
            }
            _ = watcher.tick(), if limits.cycles.is_some() => {
                let snapshot = handle.snapshot().await?;
                if limits.cycles.is_some_and(|max| snapshot.stats.cycles >= max) {
                    info!("Completed {} poll cycle(s)", snapshot.stats.cycles);
                    return Ok(());
                }
            }
            line = lines.next_line(), if stdin_open => {
                let Some(line) = line.context("Failed to read from stdin")? else {
                    stdin_open = false;
                    continue;
                };
                if line.trim().is_empty() {
                    continue;
                }
                match ConsoleCommand::parse(&line) {
                    Ok(ConsoleCommand::Quit) => return Ok(()),
                    Ok(command) => run_command(handle, output_dir, command).await?,
                    Err(message) => println!("[Console] {}", message),
                }
            }
        }
    }
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

/// Carries out one console command. Only a closed session is fatal.
async fn run_command(handle: &SessionHandle, output_dir: &Path, command: ConsoleCommand) -> Result<()> {
    let result = match command {
        ConsoleCommand::Older => handle.older().await.map(|moved| {
            if !moved {
                println!("[Console] Already at the oldest window.");
            }
        }),
        ConsoleCommand::Newer => handle.newer().await.map(|moved| {
            if !moved {
                println!("[Console] Already showing the latest readings.");
            }
        }),
        ConsoleCommand::Toggle(group) => handle.toggle_chart(group).await.map(|visible| {
            println!("[Console] {} chart {}.", group, if visible { "shown" } else { "hidden" });
        }),
        ConsoleCommand::Show(only) => show_tables(handle, only).await,
        ConsoleCommand::Status => handle
            .snapshot()
            .await
            .map(|snapshot| println!("{}", console::render_status(&snapshot))),
        ConsoleCommand::Plot => match handle.visible_charts().await {
            Ok(charts) if charts.is_empty() => {
                println!("[Console] No charts are toggled on; try 'toggle temperature'.");
                Ok(())
            }
            Ok(charts) => {
                if let Err(e) = plotting::plot_charts(output_dir, &charts) {
                    println!("[Plotting] Error: {:#}", e);
                }
                Ok(())
            }
            Err(e) => Err(e),
        },
        ConsoleCommand::Export(target) => {
            let (dir, file_name) = export_target(output_dir, target.as_deref());
            handle.export(dir, file_name).await.map(|(path, rows)| {
                println!("[Export] Wrote {} reading(s) to '{}'.", rows, path.display());
            })
        }
        ConsoleCommand::Help => {
            println!("{}", console::HELP);
            Ok(())
        }
        ConsoleCommand::Quit => Ok(()),
    };

    match result {
        Err(SoilwatchError::SessionClosed) => Err(SoilwatchError::SessionClosed.into()),
        Err(e) => {
            println!("[Console] Error: {}", e);
            Ok(())
        }
        Ok(()) => Ok(()),
    }
}

async fn show_tables(handle: &SessionHandle, only: Option<MetricGroup>) -> Result<(), SoilwatchError> {
    let groups = match only {
        Some(group) => vec![group],
        None => MetricGroup::ALL.to_vec(),
    };
    for group in groups {
        let rows = handle.table(group).await?;
        println!("{}", console::render_table(group, &rows));
    }
    Ok(())
}

/// Splits a user-supplied export target into directory and file name.
///
/// A bare name lands in `output_dir`; a path with a directory part is used as given.
pub fn export_target(output_dir: &Path, target: Option<&str>) -> (PathBuf, String) {
    let Some(target) = target else {
        return (output_dir.to_path_buf(), DEFAULT_EXPORT_FILE.to_string());
    };
    let path = Path::new(target);
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| DEFAULT_EXPORT_FILE.to_string());
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => (parent.to_path_buf(), file_name),
        _ => (output_dir.to_path_buf(), file_name),
    }
}

fn finish_session(state: &SessionState, output_dir: &Path) -> Result<()> {
    let (path, rows) = state
        .export(output_dir, DEFAULT_EXPORT_FILE)
        .with_context(|| format!("Failed to export readings to {:?}", output_dir))?;
    println!("[Export] Wrote {} reading(s) to '{}'.", rows, path.display());

    let charts = MetricGroup::ALL
        .into_iter()
        .map(|group| state.chart(group))
        .collect::<Result<Vec<_>, _>>()?;
    let images = plotting::plot_charts(output_dir, &charts)?;

    print_summary_report(state, &path, images.len());
    Ok(())
}

fn print_summary_report(state: &SessionState, export_path: &Path, images: usize) {
    let snapshot = state.snapshot();
    let stats = snapshot.stats;

    println!("\n\n--- [Final Summary Report] ---");
    println!("========================================");
    println!("Ingestion:");
    println!("  - Readings in log: {}", snapshot.log_len);
    println!("  - Poll cycles: {} ({} idle)", stats.cycles, stats.idle_cycles);
    println!("  - Fetch failures: {}", stats.fetch_failures);
    println!("  - Malformed entries rejected: {}", stats.malformed_rejections);

    if let (Some(first), Some(last)) = (state.log().get(0), state.log().records().last()) {
        let format = state.time_format();
        println!(
            "  - Span: {} {} to {} {}",
            format.date(&first.timestamp),
            format.time(&first.timestamp),
            format.date(&last.timestamp),
            format.time(&last.timestamp)
        );
    }

    println!("----------------------------------------");
    println!("Latest Readings:");
    match state.log().records().last() {
        Some(latest) => {
            for group in MetricGroup::ALL {
                let values: Vec<String> = group
                    .metrics()
                    .into_iter()
                    .map(|m| latest.value(m).to_string())
                    .collect();
                println!("  - {}: {}", group.title(), values.join(", "));
            }
        }
        None => println!("  - No readings were received."),
    }

    println!("----------------------------------------");
    println!("Outputs:");
    println!("  - Export: {}", export_path.display());
    println!("  - Chart images: {}", images);
    println!("========================================");
}

/// Fetches the feed once and reports which entries would be rejected.
pub async fn run_check(settings: &Settings) -> Result<()> {
    println!("\n--- [Workflow] Checking Feed ---");
    let feed = HttpFeed::new(settings.endpoint.clone())?;
    let timeout = Duration::from_secs(settings.fetch_timeout_secs);
    let entries = time::timeout(timeout, feed.fetch())
        .await
        .map_err(|_| SoilwatchError::FetchTimeout(timeout))??;

    let mut malformed = 0usize;
    for (index, entry) in entries.iter().enumerate() {
        if let Err(reason) = adapter::adapt(entry) {
            malformed += 1;
            warn!("Entry {} is malformed: {}", index, reason);
            println!("  - Entry {}: {}", index, reason);
        }
    }

    println!(
        "Feed at {} holds {} entr{}; {} valid, {} malformed.",
        feed.endpoint(),
        entries.len(),
        if entries.len() == 1 { "y" } else { "ies" },
        entries.len() - malformed,
        malformed
    );
    if malformed > 0 {
        println!("Ingestion stops at the first malformed entry until it is corrected upstream.");
    }
    Ok(())
}
