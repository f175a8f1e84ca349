use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};

use stockaudit_infra::{AuditConfig, CsvDataSource, ExportOptions, export_csv};
use stockaudit_valuation::{AuditFilter, AuditReport, AuditRow};

#[derive(Debug, Parser)]
#[command(name = "stockaudit")]
#[command(about = "FIFO inventory valuation audit", long_about = None)]
struct Cli {
    /// Configuration file (defaults to ./stockaudit.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Directory with the CSV data files; overrides `data_dir`
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Value the stock of a count reference (latest closed count by default)
    Audit {
        /// Count reference, MM/YYYY
        #[arg(long, short)]
        reference: Option<String>,

        /// Restrict output to one product name
        #[arg(long, short)]
        product: Option<String>,

        /// Include fully consumed layers
        #[arg(long, default_value_t = false)]
        all: bool,

        /// Write to a file instead of stdout
        #[arg(long, short)]
        output: Option<PathBuf>,

        /// Emit JSON rows instead of CSV
        #[arg(long, default_value_t = false)]
        json: bool,
    },

    /// List closed count references, newest first
    References,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut cfg = AuditConfig::load(cli.config.as_deref()).context("failed to load configuration")?;
    if let Some(dir) = cli.data_dir {
        cfg.data_dir = dir;
    }
    stockaudit_observability::init_with(cfg.log.format);

    let source = CsvDataSource::load(&cfg.data_dir, cfg.import_delimiter())
        .with_context(|| format!("failed to load data from {}", cfg.data_dir.display()))?;
    if !source.unmatched_invoice_lines.is_empty() {
        tracing::warn!(
            count = source.unmatched_invoice_lines.len(),
            "invoice lines without supplier link were left out of the ledger"
        );
    }
    let service = source.audit_service();

    match cli.cmd {
        Commands::References => {
            let refs = service.list_available_references()?;
            let mut out = io::stdout().lock();
            for r in refs {
                writeln!(out, "{r}")?;
            }
        }

        Commands::Audit {
            reference,
            product,
            all,
            output,
            json,
        } => {
            let report = service.generate_audit(reference.as_deref())?;

            if let Some(name) = &product {
                if !report.product_names().contains(&name.as_str()) {
                    bail!("product '{name}' does not appear in audit {}", report.reference);
                }
            }

            let filter = AuditFilter {
                product_name: product,
                show_all: all || cfg.report.show_all,
            };

            let writer: Box<dyn Write> = match &output {
                Some(path) => Box::new(BufWriter::new(
                    File::create(path).with_context(|| format!("failed to create {}", path.display()))?,
                )),
                None => Box::new(io::stdout().lock()),
            };

            let written = if json {
                write_json(&report, &filter, writer)?
            } else {
                export_csv(report.view(&filter), writer, &ExportOptions::from(&cfg))?
            };

            log_summary(&report, written);
        }
    }

    Ok(())
}

fn write_json(report: &AuditReport, filter: &AuditFilter, mut writer: impl Write) -> Result<usize> {
    let rows: Vec<&AuditRow> = report.view(filter).collect();
    serde_json::to_writer_pretty(&mut writer, &rows)?;
    writeln!(writer)?;
    writer.flush()?;
    Ok(rows.len())
}

fn log_summary(report: &AuditReport, written: usize) {
    for warning in &report.warnings {
        tracing::warn!(
            product_id = %warning.product_id,
            excess = warning.excess(),
            "{warning}"
        );
    }

    let totals = report.totals();
    tracing::info!(
        reference = %report.reference,
        cutoff = %report.cutoff,
        rows = written,
        value_total = totals.value_total,
        value_consumed = totals.value_consumed,
        value_remaining = totals.value_remaining,
        "audit written"
    );
}
