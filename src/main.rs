use anyhow::{Context, Result};
use clap::Parser;
use std::{fs, path::PathBuf};
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};
use workstation_import::{config::PartialConfig, run_import};

/// Import a semicolon-delimited workstation export into DuckDB.
#[derive(Parser, Debug)]
#[command(name = "workstation-import", version)]
struct Cli {
    /// YAML config file; command-line flags override its values
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Export file (.csv or .zip with one .csv)
    #[arg(short, long)]
    source: Option<PathBuf>,

    /// Text encoding of the export, e.g. utf-8 or windows-1250
    #[arg(short, long)]
    encoding: Option<String>,

    #[arg(short, long)]
    workstation_id: Option<i64>,

    /// OEE ratio used to derive planned cycle time when the export has none
    #[arg(long)]
    default_oee_ratio: Option<f64>,

    /// Header lines to skip
    #[arg(long)]
    skip_rows: Option<usize>,

    /// DuckDB file (in-memory when omitted)
    #[arg(short, long)]
    database: Option<PathBuf>,

    #[arg(long)]
    staging_table: Option<String>,

    #[arg(long)]
    destination_table: Option<String>,

    /// Also write the imported rows to this Parquet file
    #[arg(long)]
    parquet_out: Option<PathBuf>,

    /// Write the run report as JSON here
    #[arg(long)]
    report: Option<PathBuf>,

    /// Remove this workstation's existing rows before inserting
    #[arg(long)]
    replace_existing: bool,

    /// Import even if the import log already has this file
    #[arg(long)]
    force: bool,
}

impl Cli {
    fn overrides(&self) -> PartialConfig {
        PartialConfig {
            source: self.source.clone(),
            encoding: self.encoding.clone(),
            workstation_id: self.workstation_id,
            default_oee_ratio: self.default_oee_ratio,
            skip_rows: self.skip_rows,
            database: self.database.clone(),
            staging_table: self.staging_table.clone(),
            destination_table: self.destination_table.clone(),
            parquet_out: self.parquet_out.clone(),
            replace_existing: self.replace_existing.then_some(true),
            force: self.force.then_some(true),
        }
    }
}

fn main() -> Result<()> {
    // ─── 1) init logging ─────────────────────────────────────────────
    let env = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,workstation_import=info"));
    fmt::Subscriber::builder()
        .with_env_filter(env)
        .with_span_events(fmt::format::FmtSpan::CLOSE)
        .init();

    // ─── 2) config: file, then flags ─────────────────────────────────
    let cli = Cli::parse();
    let base = match &cli.config {
        Some(path) => PartialConfig::from_yaml_file(path)?,
        None => PartialConfig::default(),
    };
    let cfg = base.merge(cli.overrides()).resolve()?;
    info!(
        source = %cfg.source.display(),
        encoding = %cfg.encoding,
        workstation = cfg.workstation_id,
        "startup"
    );

    // ─── 3) run ──────────────────────────────────────────────────────
    let report = run_import(&cfg)?;

    // ─── 4) report ───────────────────────────────────────────────────
    let json = report.to_json()?;
    match &cli.report {
        Some(path) => {
            fs::write(path, &json).with_context(|| format!("writing report {:?}", path))?;
            info!(path = %path.display(), "report written");
        }
        None => println!("{}", json),
    }

    info!("all done");
    Ok(())
}
