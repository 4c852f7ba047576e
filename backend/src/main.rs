//! Reports CLI - congress attendance pivots and spreadsheet export
//!
//! # Commands
//!
//! ```bash
//! reports serve                                   # Start HTTP server (port 3000)
//! reports fetch --kind membership-by-region --state Lagos
//! reports build rows.json --kind membership-by-institution --known A,B,C --xlsx out.xlsx
//! reports kinds                                   # List report kinds
//! ```

use clap::{Parser, Subcommand, ValueEnum};
use reports::{
    export_file_name, export_report, load_rows, output_path, records_from_rows, render_page,
    ApiClient, ColumnAxis, Config, ExportFormat, Report, ReportFilter, ReportKind, ReportPeriod,
};
use std::fs;
use std::path::{Path, PathBuf};
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "reports")]
#[command(about = "Build congress attendance pivot reports", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    Xlsx,
    Csv,
    Html,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// List report kinds and their layouts
    Kinds,

    /// Build a report from a local JSON or CSV file
    Build {
        /// Input file (JSON rows or CSV)
        input: PathBuf,

        /// Report kind
        #[arg(short, long, value_enum)]
        kind: ReportKind,

        /// Known grouping keys, comma separated
        #[arg(long, value_delimiter = ',')]
        known: Vec<String>,

        /// Congress start date (YYYY-MM-DD); daily reports need both dates
        #[arg(long)]
        start: Option<String>,

        /// Congress end date (YYYY-MM-DD)
        #[arg(long)]
        end: Option<String>,

        /// Write the spreadsheet here (a directory gets the dated file name)
        #[arg(long)]
        xlsx: Option<PathBuf>,

        /// Write the grid as CSV here (a directory gets the dated file name)
        #[arg(long)]
        csv: Option<PathBuf>,

        /// Write an HTML page here (a directory gets the dated file name)
        #[arg(long)]
        html: Option<PathBuf>,

        /// Print the report as JSON instead of a text table
        #[arg(long)]
        json: bool,
    },

    /// Fetch a report from the congress API and export it
    Fetch {
        /// Report kind
        #[arg(short, long, value_enum)]
        kind: ReportKind,

        /// Restrict to one state
        #[arg(short, long)]
        state: Option<String>,

        /// Override the congress start date
        #[arg(long)]
        start: Option<String>,

        /// Override the congress end date
        #[arg(long)]
        end: Option<String>,

        /// Output directory (default: REPORTS_OUT_DIR)
        #[arg(short, long)]
        out_dir: Option<PathBuf>,

        /// Output format
        #[arg(short, long, value_enum, default_value = "xlsx")]
        format: OutputFormat,
    },

    /// Start HTTP server
    Serve {
        /// Port to listen on (default: REPORTS_PORT)
        #[arg(short, long)]
        port: Option<u16>,
    },
}

#[tokio::main]
async fn main() {
    fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,reports=debug")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = Config::load();

    let result = match cli.command {
        Commands::Kinds => cmd_kinds(),

        Commands::Build {
            input,
            kind,
            known,
            start,
            end,
            xlsx,
            csv,
            html,
            json,
        } => cmd_build(
            &input,
            kind,
            &known,
            ReportPeriod::new(start, end),
            BuildOutputs {
                xlsx: xlsx.as_deref(),
                csv: csv.as_deref(),
                html: html.as_deref(),
                json,
            },
        ),

        Commands::Fetch {
            kind,
            state,
            start,
            end,
            out_dir,
            format,
        } => {
            let filter = state.map(ReportFilter::for_state).unwrap_or_default();
            let out_dir = out_dir.unwrap_or_else(|| config.out_dir.clone());
            cmd_fetch(&config, kind, filter, ReportPeriod::new(start, end), &out_dir, format).await
        }

        Commands::Serve { port } => {
            let mut config = config;
            if let Some(port) = port {
                config.port = port;
            }
            reports::server::start_server(config).await
        }
    };

    if let Err(e) = result {
        eprintln!("❌ Error: {}", e);
        std::process::exit(1);
    }
}

fn cmd_kinds() -> Result<(), Box<dyn std::error::Error>> {
    for kind in ReportKind::ALL {
        let layout = kind.layout();
        println!("📄 {} - {}", kind, layout.title);
        println!("   Rows:       {} ({})", layout.row_label, layout.grouping_field);
        match layout.columns {
            ColumnAxis::Category => {
                println!("   Categories: {}", kind.categories().labels().join(", "))
            }
            ColumnAxis::CongressDay => println!("   Columns:    one per congress day"),
        }
        println!("   Resource:   {}", layout.resource);
        println!("   File:       {}-<start>-to-<end>.xlsx", layout.file_stem);
        println!();
    }
    Ok(())
}

struct BuildOutputs<'a> {
    xlsx: Option<&'a Path>,
    csv: Option<&'a Path>,
    html: Option<&'a Path>,
    json: bool,
}

fn cmd_build(
    input: &Path,
    kind: ReportKind,
    known: &[String],
    period: ReportPeriod,
    outputs: BuildOutputs<'_>,
) -> Result<(), Box<dyn std::error::Error>> {
    eprintln!("📄 Building {} from: {}", kind, input.display());

    let layout = kind.layout();
    let rows = load_rows(input)?;
    let records = records_from_rows(&rows, &layout);
    let known: Vec<String> = known
        .iter()
        .map(|k| k.trim().to_string())
        .filter(|k| !k.is_empty())
        .collect();

    eprintln!("   Records: {}", records.len());
    eprintln!("   Known {}: {}", layout.row_label.to_lowercase(), known.len());

    if layout.columns == ColumnAxis::CongressDay && (period.start.is_none() || period.end.is_none()) {
        eprintln!("⚠️  {} needs --start and --end, no day columns", kind);
    }

    let report = Report::for_period(kind, &records, &known, &period);
    eprintln!("✅ {} rows, grand total {}", report.row_count(), report.totals.grand_total());

    if let Some(path) = outputs.xlsx {
        let path = output_path(path, layout.file_stem, &period, ExportFormat::Xlsx.extension());
        write_export(&report, &path, ExportFormat::Xlsx)?;
    }
    if let Some(path) = outputs.csv {
        let path = output_path(path, layout.file_stem, &period, ExportFormat::Csv.extension());
        write_export(&report, &path, ExportFormat::Csv)?;
    }
    if let Some(path) = outputs.html {
        let path = output_path(path, layout.file_stem, &period, "html");
        fs::write(&path, render_page(layout.title, &report.grid, None))?;
        eprintln!("💾 HTML written to: {}", path.display());
    }

    if outputs.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_grid(&report.grid.rows);
    }

    if period.is_unset() {
        eprintln!("   Period: not set");
    } else {
        eprintln!("   Period: {} to {}", period.start_label(), period.end_label());
    }

    Ok(())
}

/// Write one export to an explicit path, skipping empty reports.
fn write_export(report: &Report, path: &Path, format: ExportFormat) -> Result<(), Box<dyn std::error::Error>> {
    if report.is_empty() {
        eprintln!("⚠️  Report is empty, skipping {}", path.display());
        return Ok(());
    }
    fs::write(path, format.to_bytes(&report.grid)?)?;
    eprintln!("💾 Output written to: {}", path.display());
    Ok(())
}

async fn cmd_fetch(
    config: &Config,
    kind: ReportKind,
    filter: ReportFilter,
    period_override: ReportPeriod,
    out_dir: &Path,
    format: OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    let layout = kind.layout();
    eprintln!("🌐 Fetching {} from: {}", kind, config.api_base);
    if let Some(state) = filter.state() {
        eprintln!("   State: {}", state);
    }

    let client = ApiClient::from_config(config)?;
    let fetched = client.fetch_full(kind, &filter).await?;
    let period = period_override.or(fetched.period);
    let report = Report::for_period(kind, &fetched.records, &fetched.known_keys, &period);

    eprintln!("   Records: {}", fetched.records.len());
    eprintln!("   Rows:    {}", report.row_count());

    match format {
        OutputFormat::Xlsx | OutputFormat::Csv => {
            let export_format = match format {
                OutputFormat::Csv => ExportFormat::Csv,
                _ => ExportFormat::Xlsx,
            };
            match export_report(&report, out_dir, layout.file_stem, &period, export_format)? {
                Some(path) => eprintln!("💾 Saved to: {}", path.display()),
                None => eprintln!("⚠️  No data yet, nothing exported"),
            }
        }
        OutputFormat::Html => {
            fs::create_dir_all(out_dir)?;
            let path = out_dir.join(export_file_name(layout.file_stem, &period, "html"));
            fs::write(&path, render_page(layout.title, &report.grid, None))?;
            eprintln!("💾 Saved to: {}", path.display());
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
    }

    eprintln!("\n✨ Done!");
    Ok(())
}

/// Print the grid as a left-aligned text table.
fn print_grid(rows: &[Vec<String>]) {
    let columns = rows.iter().map(Vec::len).max().unwrap_or(0);
    let widths: Vec<usize> = (0..columns)
        .map(|c| {
            rows.iter()
                .filter_map(|row| row.get(c))
                .map(|cell| cell.chars().count())
                .max()
                .unwrap_or(0)
        })
        .collect();

    for row in rows {
        let line: Vec<String> = row
            .iter()
            .zip(&widths)
            .map(|(cell, width)| format!("{:<width$}", cell, width = width))
            .collect();
        println!("{}", line.join("  ").trim_end());
    }
}
