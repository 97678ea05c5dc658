//! Command-line front end for the local query bridge
//!
//! ```bash
//! # Load two files and run a query
//! localquery sales.xlsx people.json --sql "SELECT * FROM 'sales.csv' LIMIT 5"
//!
//! # Interactive: one statement per line on stdin
//! localquery sales.csv
//! ```

use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use lq_bridge::EngineBridge;
use lq_core::{SourceFile, TabularBackend};
use lq_data::{EngineConfig, SqliteEngineFactory};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

mod output;

use output::{format_rows, format_schema, OutputFormat};

/// Query local CSV, Excel and JSON files with SQL
#[derive(Parser, Debug)]
#[command(name = "localquery", version, about)]
struct Args {
    /// Files to load; each becomes a table named after the file
    #[arg(required = true, value_name = "FILE")]
    files: Vec<PathBuf>,

    /// SQL to run after loading; may be repeated. Reads stdin when absent.
    #[arg(short, long)]
    sql: Vec<String>,

    /// Print rows as JSON lines
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();
    let format = if args.json { OutputFormat::JsonLines } else { OutputFormat::Tsv };

    let bridge = EngineBridge::spawn(SqliteEngineFactory::new(EngineConfig::default()))?;
    bridge.wait_ready().await?;
    info!("Engine ready");

    for path in &args.files {
        let bytes = std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        let handle = bridge
            .ingest(SourceFile::new(name, bytes))
            .await
            .with_context(|| format!("Failed to load {}", path.display()))?;
        print!("{}", format_schema(&handle));
    }

    if !args.sql.is_empty() {
        for sql in &args.sql {
            let rows = bridge.query(sql).await?;
            print!("{}", format_rows(&rows, format)?);
        }
        return Ok(());
    }

    run_repl(&bridge, format).await
}

/// Run each non-empty stdin line as a statement; failures are reported and
/// the loop continues
async fn run_repl(bridge: &EngineBridge, format: OutputFormat) -> Result<()> {
    let stdin = io::stdin();
    let mut stdout = io::stdout();

    write!(stdout, "> ")?;
    stdout.flush()?;
    for line in stdin.lock().lines() {
        let line = line?;
        let sql = line.trim();
        if sql.eq_ignore_ascii_case(".quit") {
            break;
        }

        if !sql.is_empty() {
            match bridge.query(sql).await {
                Ok(rows) => write!(stdout, "{}", format_rows(&rows, format)?)?,
                Err(e) => {
                    error!("Query failed: {}", e);
                    writeln!(stdout, "error: {}", e)?;
                }
            }
        }

        write!(stdout, "> ")?;
        stdout.flush()?;
    }
    Ok(())
}
