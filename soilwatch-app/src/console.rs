//! Line-oriented console standing in for the dashboard's buttons and tables.

use soilwatch_core::{session::SessionSnapshot, views::TableRow};
use soilwatch_schemas::reading::MetricGroup;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleCommand {
    /// Page the charts one window into history.
    Older,
    /// Page the charts one window toward the present.
    Newer,
    Toggle(MetricGroup),
    /// Print every table, or just one.
    Show(Option<MetricGroup>),
    Status,
    Plot,
    Export(Option<String>),
    Help,
    Quit,
}

impl ConsoleCommand {
    pub fn parse(line: &str) -> Result<Self, String> {
        let mut words = line.split_whitespace();
        let verb = words.next().unwrap_or("").to_ascii_lowercase();
        let arg = words.next();
        let group = |arg: Option<&str>| -> Result<MetricGroup, String> {
            let slug = arg.ok_or_else(|| "expected a panel: moisture, co2, temperature or humidity".to_string())?;
            MetricGroup::from_slug(slug).ok_or_else(|| format!("unknown panel '{}'", slug))
        };

        match verb.as_str() {
            "older" | "prev" | "previous" | "<" => Ok(ConsoleCommand::Older),
            "newer" | "next" | ">" => Ok(ConsoleCommand::Newer),
            "toggle" | "chart" => group(arg).map(ConsoleCommand::Toggle),
            "show" | "table" => match arg {
                None => Ok(ConsoleCommand::Show(None)),
                Some(_) => group(arg).map(|g| ConsoleCommand::Show(Some(g))),
            },
            "status" => Ok(ConsoleCommand::Status),
            "plot" => Ok(ConsoleCommand::Plot),
            "export" => Ok(ConsoleCommand::Export(arg.map(str::to_string))),
            "help" | "?" => Ok(ConsoleCommand::Help),
            "quit" | "exit" | "q" => Ok(ConsoleCommand::Quit),
            "" => Err("empty command".to_string()),
            other => Err(format!("unknown command '{}' (try 'help')", other)),
        }
    }
}

pub const HELP: &str = "\
Commands:
  show [panel]      print the latest readings (all panels, or one)
  toggle <panel>    show or hide a panel's chart
  older | prev      page charts one window back in time
  newer | next      page charts one window toward now
  plot              render visible charts to PNG
  export [file]     write every reading to a workbook (.csv for CSV)
  status            print ingestion counters
  quit              stop polling, export and exit
Panels: moisture, co2, temperature, humidity";

/// Renders one panel's rolling table as aligned text.
pub fn render_table(group: MetricGroup, rows: &[TableRow]) -> String {
    let mut headers: Vec<String> = if group.is_multi_channel() {
        (1..=3).map(|i| format!("Sensor {}", i)).collect()
    } else {
        vec![group.label_prefix().to_string()]
    };
    headers.push("Date".to_string());
    headers.push("Time".to_string());

    let mut out = format!("{}\n", group.title());
    out.push_str(
        &headers
            .iter()
            .map(|h| format!("{:>12}", h))
            .collect::<Vec<_>>()
            .join(" "),
    );
    out.push('\n');
    if rows.is_empty() {
        out.push_str("  (no readings yet)\n");
    }
    for row in rows {
        let cells: Vec<String> = row
            .values
            .iter()
            .map(|v| format!("{:>12}", v))
            .chain([format!("{:>12}", row.date), format!("{:>12}", row.time)])
            .collect();
        out.push_str(&cells.join(" "));
        out.push('\n');
    }
    out
}

pub fn render_status(snapshot: &SessionSnapshot) -> String {
    let stats = &snapshot.stats;
    let visible: Vec<&str> = MetricGroup::ALL
        .iter()
        .filter(|&&g| snapshot.visibility.is_visible(g))
        .map(|g| g.slug())
        .collect();
    format!(
        "[Status] {} reading(s), cursor {} | window offset {} -> records {}..{} | \
         cycles {} (idle {}, fetch failures {}, malformed {}) | charts: {}",
        snapshot.log_len,
        snapshot.next_unprocessed,
        snapshot.window_offset,
        snapshot.window_range.start,
        snapshot.window_range.end,
        stats.cycles,
        stats.idle_cycles,
        stats.fetch_failures,
        stats.malformed_rejections,
        if visible.is_empty() { "none".to_string() } else { visible.join(", ") },
    )
}
