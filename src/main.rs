use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use reqwest::Client;
use sheetdash::{
    chart::{dashboard_charts, Chart},
    config::{Config, DEFAULT_CONFIG_PATH},
    export::{report_deck, write_parquet},
    fetch::Source,
    kpi::Kpis,
    FatalInputError, Loader, NormalizedTable,
};
use std::{
    fs,
    path::{Path, PathBuf},
    process::ExitCode,
};
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, EnvFilter};

/// Load a spreadsheet tab and build the fiscal-control dashboard from it.
#[derive(Parser, Debug)]
#[command(name = "sheetdash")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// YAML configuration file
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Debug logging (overridden by RUST_LOG)
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print KPIs and the column types
    Summary,
    /// Write every chart as SVG
    Charts {
        #[arg(short, long, default_value = "charts")]
        out: PathBuf,
    },
    /// Write the PowerPoint deck, and optionally a Parquet snapshot
    Export {
        #[arg(long, default_value = "dashboard_fiscalizacao.pptx")]
        pptx: PathBuf,
        #[arg(long)]
        parquet: Option<PathBuf>,
        /// Put every row on the table slide instead of the configured maximum
        #[arg(long)]
        all_rows: bool,
    },
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let args = Args::parse();

    // ─── 1) init logging ─────────────────────────────────────────────
    let default_filter = if args.verbose {
        "info,sheetdash=debug"
    } else {
        "info,sheetdash=info"
    };
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    fmt::Subscriber::builder()
        .with_env_filter(env)
        .with_writer(std::io::stderr)
        .init();

    // ─── 2) config + source ──────────────────────────────────────────
    let cfg = Config::load(&args.config)?;
    let client = Client::new();
    let source = Source::from_config(&client, &cfg.source).context("configuring sheet source")?;
    let mut loader = Loader::new(
        source,
        cfg.source.sheet.clone(),
        cfg.normalize.options(),
        cfg.cache.ttl(),
    );

    // ─── 3) load ─────────────────────────────────────────────────────
    let table = match loader.load().await {
        Ok(table) => table,
        Err(err) => {
            if let Some(fatal) = err.downcast_ref::<FatalInputError>() {
                error!(error = %fatal, "input rejected");
                eprintln!("Erro nos dados da planilha: {}", fatal);
                return Ok(ExitCode::from(2));
            }
            return Err(err);
        }
    };
    if table.is_empty() {
        warn!(sheet = loader.sheet(), "no data");
        println!("Nenhum dado encontrado.");
        return Ok(ExitCode::SUCCESS);
    }

    // ─── 4) command ──────────────────────────────────────────────────
    match args.command {
        Command::Summary => print_summary(&table, &cfg),
        Command::Charts { out } => write_charts(&charts(&table, &cfg), &out)?,
        Command::Export {
            pptx,
            parquet,
            all_rows,
        } => {
            let kpis = Kpis::compute(&table, &cfg.export.kpi_spec());
            let max_rows = if all_rows {
                None
            } else {
                Some(cfg.export.max_table_rows)
            };
            report_deck(
                &cfg.export.title,
                &cfg.export.subtitle,
                &table,
                &kpis,
                &charts(&table, &cfg),
                max_rows,
            )
            .save(&pptx)?;
            if let Some(path) = parquet {
                write_parquet(&table, &path)?;
            }
        }
    }

    info!("done");
    Ok(ExitCode::SUCCESS)
}

fn charts(table: &NormalizedTable, cfg: &Config) -> Vec<Chart> {
    dashboard_charts(
        table,
        cfg.export.top_values,
        &cfg.export.totals_keyword,
        cfg.export.evolution_axes(),
    )
}

fn print_summary(table: &NormalizedTable, cfg: &Config) {
    let kpis = Kpis::compute(table, &cfg.export.kpi_spec());
    for line in kpis.lines() {
        println!("{}", line);
    }
    println!();
    for column in table.columns() {
        let kind = if column.data.is_numeric() {
            "numérica"
        } else {
            "texto"
        };
        println!("{:<40} {}", column.name, kind);
    }
}

/// `<n>-<slug of title>.svg`, ASCII only.
fn chart_file_name(idx: usize, title: &str) -> String {
    let slug: String = title
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_lowercase() } else { '-' })
        .collect::<String>()
        .split('-')
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("-");
    format!("{:02}-{}.svg", idx + 1, slug)
}

fn write_charts(charts: &[Chart], out: &Path) -> Result<()> {
    fs::create_dir_all(out).with_context(|| format!("creating {}", out.display()))?;
    for (idx, chart) in charts.iter().enumerate() {
        let path = out.join(chart_file_name(idx, &chart.title));
        fs::write(&path, chart.to_svg(800, 450))
            .with_context(|| format!("writing {}", path.display()))?;
        info!(path = %path.display(), "wrote chart");
    }
    Ok(())
}
